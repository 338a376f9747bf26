//! Gesture sources: anything that, once per capture cycle, yields a frame for
//! display and the finger readings detected in it.
//!
//! The producer loop (see [`crate::producer`]) calls [`GestureSource::capture`]
//! repeatedly and publishes each [`Capture`]; consumers don't need to know
//! whether it came from real hardware, the keyboard simulator, or a script.

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use thiserror::Error;

use key_select::FingerState;

use crate::frame::{text_width, Frame};

/// Size of the synthetic hand frames the sim, script and Leap sources render.
pub const CAPTURE_W: usize = 320;
pub const CAPTURE_H: usize = 240;

// ════════════════════════════════════════════════════════════════════════════
// Capture
// ════════════════════════════════════════════════════════════════════════════

/// One capture cycle's output.
#[derive(Clone, Debug)]
pub struct Capture {
    pub frame:   Frame,
    /// `None` when no hand is visible.
    pub fingers: Option<FingerState>,
    /// Capture rate measured by the producer loop.
    pub fps:     f32,
}

#[derive(Debug, Error)]
pub enum SourceError {
    /// The input side (window, device channel) went away.
    #[error("gesture input disconnected")]
    Disconnected,
    /// A finite source ran out of samples.
    #[error("gesture script exhausted")]
    Exhausted,
    #[error("capture device error: {0}")]
    Device(String),
}

// ════════════════════════════════════════════════════════════════════════════
// GestureSource trait — unified interface for hw, sim and scripts
// ════════════════════════════════════════════════════════════════════════════

/// A blocking capture+detect step, called in a loop on the producer thread.
///
/// An `Err` is terminal: the producer stops and publishes nothing further.
pub trait GestureSource: Send + 'static {
    fn capture(&mut self) -> Result<Capture, SourceError>;
}

/// Render a stand-in camera frame: four finger bars, lit when up.
pub fn finger_frame(fingers: Option<FingerState>) -> Frame {
    const BG:       u32 = 0xFF101820;
    const PALM:     u32 = 0xFF3A4A5A;
    const UP:       u32 = 0xFF36D07A;
    const DOWN:     u32 = 0xFF2A3440;
    const TEXT:     u32 = 0xFFB0B8C0;

    let mut frame = Frame::new(CAPTURE_W, CAPTURE_H, BG);

    let Some(f) = fingers else {
        let msg = "NO HAND";
        let x = (CAPTURE_W - text_width(msg, 3)) / 2;
        frame.draw_text(msg, x, CAPTURE_H / 2 - 8, 3, TEXT);
        return frame;
    };

    // Palm
    frame.fill_rect(90, 140, 160, 70, PALM);

    // (label, up?, bar x, full height)
    let bars = [
        ("T", f.thumb,  50,  60),
        ("I", f.index,  100, 110),
        ("M", f.middle, 150, 120),
        ("P", f.pinky,  215, 80),
    ];
    for (label, up, x, full) in bars {
        let h = if up { full } else { full / 4 };
        frame.fill_rect(x, 140 - h, 28, h, if up { UP } else { DOWN });
        frame.draw_text(label, x + 8, 218, 3, TEXT);
    }
    frame
}

// ════════════════════════════════════════════════════════════════════════════
// SimGestureSource — keyboard simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Raw input event from the simulation window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimInput {
    KeyDown(SimKey),
    KeyUp(SimKey),
}

/// Simulated fingers (mapped from minifb keys by the visualizer).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimKey {
    Index,      // J
    Middle,     // K
    Pinky,      // L
    Thumb,      // Space
    /// Toggle whether a hand is "in view" at all.
    Hand,       // H
}

/// Gesture source driven by [`SimInput`] events from the visualizer window.
///
/// Fingers are up while their key is held.  The source paces itself at
/// `interval` per capture, like a camera would.
pub struct SimGestureSource {
    rx:           Receiver<SimInput>,
    interval:     Duration,
    held:         FingerState,
    hand_visible: bool,
}

impl SimGestureSource {
    pub fn new(rx: Receiver<SimInput>, interval: Duration) -> Self {
        SimGestureSource {
            rx,
            interval,
            held:         FingerState::default(),
            hand_visible: true,
        }
    }

    fn apply(&mut self, input: SimInput) {
        let (key, down) = match input {
            SimInput::KeyDown(k) => (k, true),
            SimInput::KeyUp(k)   => (k, false),
        };
        match key {
            SimKey::Index  => self.held.index  = down,
            SimKey::Middle => self.held.middle = down,
            SimKey::Pinky  => self.held.pinky  = down,
            SimKey::Thumb  => self.held.thumb  = down,
            SimKey::Hand if down => self.hand_visible = !self.hand_visible,
            SimKey::Hand => {}
        }
    }
}

impl GestureSource for SimGestureSource {
    fn capture(&mut self) -> Result<Capture, SourceError> {
        thread::sleep(self.interval);
        loop {
            match self.rx.try_recv() {
                Ok(input)                       => self.apply(input),
                Err(TryRecvError::Empty)        => break,
                Err(TryRecvError::Disconnected) => return Err(SourceError::Disconnected),
            }
        }
        let fingers = self.hand_visible.then_some(self.held);
        Ok(Capture { frame: finger_frame(fingers), fingers, fps: 0.0 })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ScriptedSource — fixed replay
// ════════════════════════════════════════════════════════════════════════════

/// Replays a fixed list of samples, one per `interval`, then reports
/// [`SourceError::Exhausted`].
pub struct ScriptedSource {
    samples:  VecDeque<Option<FingerState>>,
    interval: Duration,
}

impl ScriptedSource {
    pub fn new(samples: impl IntoIterator<Item = Option<FingerState>>, interval: Duration) -> Self {
        ScriptedSource { samples: samples.into_iter().collect(), interval }
    }
}

impl GestureSource for ScriptedSource {
    fn capture(&mut self) -> Result<Capture, SourceError> {
        let fingers = self.samples.pop_front().ok_or(SourceError::Exhausted)?;
        if !self.interval.is_zero() {
            thread::sleep(self.interval);
        }
        Ok(Capture { frame: finger_frame(fingers), fingers, fps: 0.0 })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapGestureSource — real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Consecutive device polls that delivered no tracking frame, kept across
/// captures.  Failed polls and non-tracking messages both count.
#[cfg_attr(not(feature = "leap"), allow(dead_code))]
#[derive(Debug)]
struct IdlePolls {
    streak: u32,
    limit:  u32,
}

#[cfg_attr(not(feature = "leap"), allow(dead_code))]
impl IdlePolls {
    fn new(limit: u32) -> Self {
        IdlePolls { streak: 0, limit }
    }

    fn tracked(&mut self) {
        self.streak = 0;
    }

    /// Count one idle poll; true once the device should be treated as gone.
    fn idle(&mut self) -> bool {
        self.streak = self.streak.saturating_add(1);
        self.streak >= self.limit
    }
}

/// Gesture source backed by a real LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
/// A finger counts as up when its extension ratio (tip-to-base distance over
/// a typical finger length) exceeds `confidence`.
///
/// Each capture waits at most `POLLS_PER_CAPTURE` polls and then reports no
/// hand, so the producer loop gets to see its stop flag.  After
/// `MAX_IDLE_POLLS` polls in a row without a tracking frame the device is
/// considered lost.
#[cfg(feature = "leap")]
pub struct LeapGestureSource {
    connection: leaprs::Connection,
    confidence: f32,
    idle:       IdlePolls,
}

#[cfg(feature = "leap")]
const POLL_TIMEOUT_MS: u32 = 100;
#[cfg(feature = "leap")]
const POLLS_PER_CAPTURE: u32 = 3;
#[cfg(feature = "leap")]
const MAX_IDLE_POLLS: u32 = 50;

#[cfg(feature = "leap")]
impl LeapGestureSource {
    pub fn open(confidence: f32) -> Result<Self, SourceError> {
        use leaprs::{Connection, ConnectionConfig};

        let mut connection = Connection::create(ConnectionConfig::default())
            .map_err(|e| SourceError::Device(format!("LeapC connection: {:?}", e)))?;
        connection.open()
            .map_err(|e| SourceError::Device(format!("LeapMotion device: {:?}", e)))?;
        tracing::info!(confidence, "LeapMotion connection open");
        Ok(LeapGestureSource { connection, confidence, idle: IdlePolls::new(MAX_IDLE_POLLS) })
    }
}

#[cfg(feature = "leap")]
impl GestureSource for LeapGestureSource {
    fn capture(&mut self) -> Result<Capture, SourceError> {
        use leaprs::Event;

        let confidence = self.confidence;
        for _ in 0..POLLS_PER_CAPTURE {
            let problem = match self.connection.poll(POLL_TIMEOUT_MS) {
                Ok(msg) => {
                    if let Event::Tracking(frame) = msg.event() {
                        self.idle.tracked();
                        let fingers = frame.hands().next().map(|hand| {
                            // Thumb, index, middle, ring, pinky.
                            let up: Vec<u8> = hand.digits()
                                .map(|d| u8::from(finger_extension(&d) > confidence))
                                .collect();
                            FingerState::from_fingers_up(&up).unwrap_or_else(|| {
                                tracing::warn!(digits = up.len(), "malformed hand reading; treating as all down");
                                FingerState::default()
                            })
                        });
                        return Ok(Capture { frame: finger_frame(fingers), fingers, fps: 0.0 });
                    }
                    "no tracking frames from LeapMotion device".to_string()
                }
                Err(e) => format!("LeapC poll: {:?}", e),
            };
            if self.idle.idle() {
                return Err(SourceError::Device(problem));
            }
        }
        tracing::debug!(streak = self.idle.streak, "no tracking frame this capture");
        Ok(Capture { frame: finger_frame(None), fingers: None, fps: 0.0 })
    }
}

#[cfg(feature = "leap")]
fn finger_extension(digit: &leaprs::Digit) -> f32 {
    // Ratio of (tip – metacarpal base) distance to full finger length.
    // 1.0 = fully extended, ~0.0 = fully curled.
    let base = digit.metacarpal().prev_joint();
    let tip  = digit.distal().next_joint();
    let dx   = tip.x - base.x;
    let dy   = tip.y - base.y;
    let dz   = tip.z - base.z;
    let dist = (dx*dx + dy*dy + dz*dz).sqrt();
    // Normalise to ~0–1 using typical finger length ≈ 80 mm
    (dist / 80.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn sim_tracks_held_keys() {
        let (tx, rx) = mpsc::channel();
        let mut sim = SimGestureSource::new(rx, Duration::ZERO);

        tx.send(SimInput::KeyDown(SimKey::Index)).unwrap();
        tx.send(SimInput::KeyDown(SimKey::Thumb)).unwrap();
        let c = sim.capture().unwrap();
        assert_eq!(c.fingers, Some(FingerState::new(true, false, false, true)));

        tx.send(SimInput::KeyUp(SimKey::Index)).unwrap();
        let c = sim.capture().unwrap();
        assert_eq!(c.fingers, Some(FingerState::new(false, false, false, true)));
    }

    #[test]
    fn sim_hand_toggle_hides_fingers() {
        let (tx, rx) = mpsc::channel();
        let mut sim = SimGestureSource::new(rx, Duration::ZERO);
        tx.send(SimInput::KeyDown(SimKey::Hand)).unwrap();
        tx.send(SimInput::KeyUp(SimKey::Hand)).unwrap();
        assert_eq!(sim.capture().unwrap().fingers, None);
        tx.send(SimInput::KeyDown(SimKey::Hand)).unwrap();
        assert!(sim.capture().unwrap().fingers.is_some());
    }

    #[test]
    fn sim_disconnect_is_terminal() {
        let (tx, rx) = mpsc::channel::<SimInput>();
        let mut sim = SimGestureSource::new(rx, Duration::ZERO);
        drop(tx);
        assert!(matches!(sim.capture(), Err(SourceError::Disconnected)));
    }

    #[test]
    fn script_replays_then_exhausts() {
        let a = Some(FingerState::new(true, false, false, false));
        let mut src = ScriptedSource::new([a, None], Duration::ZERO);
        assert_eq!(src.capture().unwrap().fingers, a);
        assert_eq!(src.capture().unwrap().fingers, None);
        assert!(matches!(src.capture(), Err(SourceError::Exhausted)));
    }

    #[test]
    fn idle_polls_give_up_at_limit() {
        let mut idle = IdlePolls::new(3);
        assert!(!idle.idle());
        assert!(!idle.idle());
        assert!(idle.idle());
    }

    #[test]
    fn tracking_frame_resets_idle_streak() {
        let mut idle = IdlePolls::new(3);
        idle.idle();
        idle.idle();
        idle.tracked();
        assert!(!idle.idle());
        assert!(!idle.idle());
        assert!(idle.idle());
    }

    #[test]
    fn idle_streak_spans_captures() {
        // Bounded captures of 3 polls each must still reach a limit of 50.
        let mut idle = IdlePolls::new(50);
        let gave_up_after = (1..=20).find(|_| (0..3).any(|_| idle.idle()));
        assert_eq!(gave_up_after, Some(17));
    }

    #[test]
    fn finger_frame_has_capture_size() {
        let f = finger_frame(Some(FingerState::default()));
        assert_eq!((f.width, f.height), (CAPTURE_W, CAPTURE_H));
        assert_eq!(f.pixels.len(), CAPTURE_W * CAPTURE_H);
    }
}
