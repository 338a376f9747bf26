//! Top-level application: the consumer loop.
//!
//! `AppState` owns the `SelectionController` and everything the visualizer
//! shows.  `run` wires a gesture source to the relay, then drives display
//! and gesture ticks from the window loop, each on its own cadence.

use std::sync::mpsc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use frame_relay::Relay;
use key_select::{Action, FingerState, Highlight, KeyGrid, SelectionController, SelectionState};

use crate::gesture::{Capture, ScriptedSource, SimGestureSource, SimInput, SourceError};
use crate::producer::{spawn_producer, ProducerHandle};
use crate::visualizer::{UiEvent, Visualizer};

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

/// Where finger samples come from.
#[derive(Clone, Debug, PartialEq)]
pub enum InputMode {
    /// Keyboard-held fingers from the visualizer window.
    Simulated,
    /// A fixed sample sequence, played once.
    Scripted(Vec<Option<FingerState>>),
    /// LeapMotion hardware.
    #[cfg(feature = "leap")]
    Leap,
}

impl Default for InputMode {
    #[cfg(feature = "leap")]
    fn default() -> Self { InputMode::Leap }
    #[cfg(not(feature = "leap"))]
    fn default() -> Self { InputMode::Simulated }
}

/// Configuration for the full application.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub grid:                 KeyGrid,
    pub input:                InputMode,
    /// Period of the gesture tick (controller update).
    pub gesture_interval:     Duration,
    /// Pace of the simulated and scripted sources.
    pub capture_interval:     Duration,
    /// Passed through to the hardware detector.
    pub detection_confidence: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            grid:                 KeyGrid::qwerty(),
            input:                InputMode::default(),
            gesture_interval:     Duration::from_millis(100),
            capture_interval:     Duration::from_millis(33),
            detection_confidence: 0.75,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("could not open window: {0}")]
    Window(String),
    #[error("could not start gesture producer: {0}")]
    Spawn(#[from] std::io::Error),
    #[error(transparent)]
    Source(#[from] SourceError),
}

// ════════════════════════════════════════════════════════════════════════════
// Ticker
// ════════════════════════════════════════════════════════════════════════════

/// Fixed-interval schedule polled from a faster loop.
#[derive(Debug)]
pub struct Ticker {
    interval: Duration,
    next_due: Instant,
}

impl Ticker {
    /// First tick is due immediately.
    pub fn new(interval: Duration, now: Instant) -> Self {
        Ticker { interval, next_due: now }
    }

    /// True at most once per interval.  A loop that falls behind resumes
    /// from `now` rather than firing a burst of catch-up ticks.
    pub fn due(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due += self.interval;
        if self.next_due <= now {
            self.next_due = now + self.interval;
        }
        true
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    controller:      SelectionController,
    last_action:     Action,
    /// Sample used by the most recent gesture tick.
    gesture:         Option<FingerState>,
    capture_stopped: bool,

    pub status:      String,
}

impl AppState {
    pub fn new(cfg: &AppConfig) -> Self {
        AppState {
            controller:      SelectionController::new(cfg.grid.clone()),
            last_action:     Action::NoOp,
            gesture:         None,
            capture_stopped: false,
            status:          format!("Ready: {}x{} grid", cfg.grid.height(), cfg.grid.width()),
        }
    }

    // ── gesture tick ─────────────────────────────────────────────────────

    pub fn on_gesture_tick(&mut self, sample: Option<FingerState>) {
        self.gesture = sample;
        let tick = self.controller.tick(sample);
        if let Some(last) = tick.actions.last() {
            self.last_action = last.clone();
        }
        if !self.capture_stopped {
            self.status = tick.status;
        }
    }

    /// The producer has exited: keep serving the last state, say so once.
    pub fn on_capture_stopped(&mut self) {
        if !self.capture_stopped {
            self.capture_stopped = true;
            warn!("gesture capture stopped; no new samples will arrive");
            self.status = "Capture stopped: no new gesture samples".to_string();
        }
    }

    /// Pointer click on a grid cell types it directly.  Empty cells ignore it.
    pub fn click_cell(&mut self, row: usize, col: usize) {
        if let Some(ch) = self.controller.grid().cell(row, col) {
            self.controller.type_char(ch);
            self.status = format!("Typed '{}'", ch);
        }
    }

    // ── Accessors for the render loop ─────────────────────────────────────

    pub fn grid(&self)            -> &KeyGrid        { self.controller.grid() }
    pub fn selection(&self)       -> &SelectionState { self.controller.state() }
    pub fn typed_text(&self)      -> &str            { self.controller.typed_text() }
    pub fn last_action(&self)     -> &Action         { &self.last_action }
    pub fn gesture(&self)         -> Option<FingerState> { self.gesture }
    pub fn capture_stopped(&self) -> bool            { self.capture_stopped }

    pub fn highlight(&self, row: usize, col: usize) -> Highlight {
        self.controller.highlight(row, col)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

fn start_source(
    cfg:    &AppConfig,
    sim_rx: mpsc::Receiver<SimInput>,
    relay:  &Relay<Capture>,
) -> Result<ProducerHandle, AppError> {
    let handle = match &cfg.input {
        InputMode::Simulated => {
            spawn_producer(SimGestureSource::new(sim_rx, cfg.capture_interval), relay.clone())?
        }
        InputMode::Scripted(samples) => {
            spawn_producer(
                ScriptedSource::new(samples.iter().copied(), cfg.capture_interval),
                relay.clone(),
            )?
        }
        #[cfg(feature = "leap")]
        InputMode::Leap => {
            let source = crate::gesture::LeapGestureSource::open(cfg.detection_confidence)?;
            spawn_producer(source, relay.clone())?
        }
    };
    Ok(handle)
}

/// Run the full application.
///
/// The gesture source runs on its own thread and publishes into a relay.
/// This loop, at the window's ~60 fps, shows any newer frame and, every
/// `gesture_interval`, feeds the latest sample to the controller.
pub fn run(cfg: AppConfig) -> Result<(), AppError> {
    let relay: Relay<Capture> = Relay::new();

    let (sim_tx, sim_rx) = mpsc::channel::<SimInput>();
    let mut producer = start_source(&cfg, sim_rx, &relay)?;

    let mut vis = Visualizer::new(sim_tx)?;
    let mut app = AppState::new(&cfg);
    let mut gesture_ticker = Ticker::new(cfg.gesture_interval, Instant::now());
    let mut frame_seq = 0u64;

    info!(
        grid = %cfg.grid,
        gesture_ms = cfg.gesture_interval.as_millis() as u64,
        "consumer loop started"
    );

    while vis.is_open() {
        // 1. Window input
        let mut quit = false;
        for event in vis.poll_input(app.grid()) {
            match event {
                UiEvent::Quit                   => quit = true,
                UiEvent::CellClicked { row, col } => app.click_cell(row, col),
            }
        }
        if quit { break; }

        // 2. Display cadence: only re-blit a frame we haven't shown
        if let Some(latest) = relay.fetch_newer(frame_seq) {
            frame_seq = latest.seq();
            vis.show_capture(latest);
        }

        // 3. Gesture cadence
        if gesture_ticker.due(Instant::now()) {
            let sample = relay.fetch_latest().and_then(|c| c.fingers);
            app.on_gesture_tick(sample);
        }

        if producer.is_finished() {
            app.on_capture_stopped();
        }

        // 4. Render
        vis.render(&app);
    }

    producer.stop();
    info!(text = app.typed_text(), "session ended");
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const DOWN:  FingerState = FingerState::new(false, false, false, false);
    const INDEX: FingerState = FingerState::new(true,  false, false, false);
    const PINKY: FingerState = FingerState::new(false, false, true,  false);
    const THUMB: FingerState = FingerState::new(false, false, false, true);

    fn make_app() -> AppState {
        AppState::new(&AppConfig { grid: "AB/CD".parse().unwrap(), ..AppConfig::default() })
    }

    #[test]
    fn gesture_ticks_type_a_character() {
        let mut app = make_app();
        for s in [INDEX, DOWN, PINKY, DOWN, THUMB] {
            app.on_gesture_tick(Some(s));
        }
        assert_eq!(app.typed_text(), "A");
        assert_eq!(app.last_action(), &Action::Commit('A'));
        assert_eq!(app.gesture(), Some(THUMB));
    }

    #[test]
    fn last_action_survives_quiet_ticks() {
        let mut app = make_app();
        app.on_gesture_tick(Some(INDEX));
        app.on_gesture_tick(None);
        app.on_gesture_tick(None);
        assert_eq!(app.last_action(), &Action::ColumnSelect(0));
        assert_eq!(app.status, "No gesture detected");
    }

    #[test]
    fn starts_with_no_action() {
        let app = make_app();
        assert_eq!(app.last_action(), &Action::NoOp);
        assert_eq!(app.selection(), &SelectionState::default());
    }

    #[test]
    fn click_types_cell_without_touching_selection() {
        let mut app = make_app();
        app.on_gesture_tick(Some(INDEX));
        app.click_cell(1, 1);
        assert_eq!(app.typed_text(), "D");
        assert_eq!(app.selection().selected_column, Some(0));
    }

    #[test]
    fn click_on_missing_cell_is_ignored() {
        let mut app = make_app();
        app.click_cell(5, 5);
        assert_eq!(app.typed_text(), "");
    }

    #[test]
    fn capture_stop_pins_status_but_ticks_continue() {
        let mut app = make_app();
        app.on_capture_stopped();
        app.on_capture_stopped();
        app.on_gesture_tick(Some(INDEX));
        assert!(app.capture_stopped());
        assert!(app.status.starts_with("Capture stopped"));
        assert_eq!(app.selection().selected_column, Some(0));
    }

    #[test]
    fn ticker_fires_once_per_interval() {
        let t0 = Instant::now();
        let mut t = Ticker::new(Duration::from_millis(100), t0);
        assert!(t.due(t0));
        assert!(!t.due(t0 + Duration::from_millis(50)));
        assert!(t.due(t0 + Duration::from_millis(100)));
        assert!(!t.due(t0 + Duration::from_millis(150)));
    }

    #[test]
    fn ticker_does_not_burst_after_stall() {
        let t0 = Instant::now();
        let mut t = Ticker::new(Duration::from_millis(100), t0);
        assert!(t.due(t0));
        let late = t0 + Duration::from_millis(1_000);
        assert!(t.due(late));
        assert!(!t.due(late + Duration::from_millis(10)));
        assert!(t.due(late + Duration::from_millis(100)));
    }

    #[test]
    fn default_config_is_qwerty_at_100ms() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.grid, KeyGrid::qwerty());
        assert_eq!(cfg.gesture_interval, Duration::from_millis(100));
        assert!((cfg.detection_confidence - 0.75).abs() < f32::EPSILON);
    }
}
