//! Software-rendered visualizer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────┬──────────────────────────────┐
//! │  LIVE FEED              FPS: 30  │  GESTURE STATE               │
//! │                                  │  1_0_0_1                     │
//! │  [latest captured frame]         │  last action / status        │
//! │                                  │  column / row                │
//! │                                  │  [typed text             ]   │
//! │                                  │  [Q][W][E][R][T][Y][U][I][O] │
//! │                                  │  [A][S][D][F][G][H][J][K][L] │
//! │                                  │  [Z][X][C][V][B][N][M][P]    │
//! ├──────────────────────────────────┴──────────────────────────────┤
//! │  key legend                                                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::mpsc::Sender;

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use frame_relay::Latest;
use key_select::{Highlight, KeyGrid};

use crate::app::{AppError, AppState};
use crate::frame::{blend, text_width, Frame};
use crate::gesture::{Capture, SimInput, SimKey};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:     usize = 1200;
pub const WIN_H:     usize = 620;
const VIDEO_X:       usize = 20;
const VIDEO_Y:       usize = 50;
const VIDEO_W:       usize = 640;
const VIDEO_H:       usize = 480;
const PANEL_X:       usize = 690;
const PANEL_W:       usize = WIN_W - PANEL_X - 20;
const TEXT_BOX_Y:    usize = 200;
const TEXT_BOX_H:    usize = 40;
const GRID_Y:        usize = 270;
const KEY_W:         usize = 48;
const KEY_H:         usize = 40;
const KEY_GAP:       usize = 4;
const LEGEND_Y:      usize = WIN_H - 28;

const BG_COLOR:      u32 = 0xFF242424;
const PANEL_BG:      u32 = 0xFF2B2B2B;
const VIDEO_BG:      u32 = 0xFF212121;
const TITLE_COLOR:   u32 = 0xFFDCE4EE;
const DIM_TEXT:      u32 = 0xFF8A8F96;
const ACCENT:        u32 = 0xFF3B8ED0;
const FPS_COLOR:     u32 = 0xFF00FF00;
const STOP_COLOR:    u32 = 0xFFE05050;
const ROW_TEXT:      u32 = 0xFF3FBF5A;
const KEY_DEFAULT:   u32 = 0xFF1F6AA5;
const KEY_COLUMN:    u32 = 0xFF144870;
const KEY_ROW:       u32 = 0xFF2E6B2E;
const KEY_CELL:      u32 = 0xFFC93025;

/// Finger → simulated key binding.
const SIM_KEYS: [(Key, SimKey); 5] = [
    (Key::J,     SimKey::Index),
    (Key::K,     SimKey::Middle),
    (Key::L,     SimKey::Pinky),
    (Key::Space, SimKey::Thumb),
    (Key::H,     SimKey::Hand),
];

/// Window input the app loop cares about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiEvent {
    Quit,
    CellClicked { row: usize, col: usize },
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window:         Window,
    canvas:         Frame,
    sim_tx:         Sender<SimInput>,
    /// Latest capture shown in the feed panel.  Shares the relay's buffer.
    video:          Option<Latest<Capture>>,
    mouse_was_down: bool,
}

impl Visualizer {
    pub fn new(sim_tx: Sender<SimInput>) -> Result<Self, AppError> {
        let mut window = Window::new(
            "Hand Gesture Keyboard",
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| AppError::Window(e.to_string()))?;

        window.set_target_fps(60);

        Ok(Visualizer {
            window,
            canvas: Frame::new(WIN_W, WIN_H, BG_COLOR),
            sim_tx,
            video: None,
            mouse_was_down: false,
        })
    }

    /// Returns false when the window should close.
    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Forward finger keys to the sim source and collect app-level events.
    pub fn poll_input(&mut self, grid: &KeyGrid) -> Vec<UiEvent> {
        let mut events = Vec::new();
        if !self.window.is_open() || self.window.is_key_pressed(Key::Escape, KeyRepeat::No) {
            events.push(UiEvent::Quit);
            return events;
        }

        for (key, sim) in SIM_KEYS {
            // A closed sim channel just means another source is active.
            if self.window.is_key_pressed(key, KeyRepeat::No) {
                let _ = self.sim_tx.send(SimInput::KeyDown(sim));
            }
            if self.window.is_key_released(key) {
                let _ = self.sim_tx.send(SimInput::KeyUp(sim));
            }
        }

        // Click = press edge of the left button.
        let down = self.window.get_mouse_down(MouseButton::Left);
        if down && !self.mouse_was_down {
            if let Some((mx, my)) = self.window.get_mouse_pos(MouseMode::Discard) {
                if let Some((row, col)) = cell_at(grid, mx as usize, my as usize) {
                    events.push(UiEvent::CellClicked { row, col });
                }
            }
        }
        self.mouse_was_down = down;

        events
    }

    pub fn show_capture(&mut self, capture: Latest<Capture>) {
        self.video = Some(capture);
    }

    /// Render one frame.
    pub fn render(&mut self, app: &AppState) {
        self.canvas.clear(BG_COLOR);

        self.draw_video(app.capture_stopped());
        self.draw_panel(app);

        self.canvas.draw_text(
            "J=INDEX(COLUMN)  K=MIDDLE(BACKSPACE)  L=PINKY(ROW)  SPACE=THUMB(ENTER)  H=HAND  CLICK=TYPE  ESC=QUIT",
            VIDEO_X, LEGEND_Y, 2, DIM_TEXT,
        );

        self.window.update_with_buffer(&self.canvas.pixels, WIN_W, WIN_H).ok();
    }

    // ── Live feed ─────────────────────────────────────────────────────────

    fn draw_video(&mut self, stopped: bool) {
        self.canvas.draw_text("LIVE CAMERA FEED", VIDEO_X, 18, 3, TITLE_COLOR);
        self.canvas.fill_rect(VIDEO_X, VIDEO_Y, VIDEO_W, VIDEO_H, VIDEO_BG);

        if let Some(capture) = &self.video {
            self.canvas.blit_scaled(&capture.frame, VIDEO_X, VIDEO_Y, VIDEO_W, VIDEO_H);
            let fps = format!("FPS: {}", capture.fps.round() as u32);
            let x = VIDEO_X + VIDEO_W - text_width(&fps, 2) - 10;
            self.canvas.draw_text(&fps, x, VIDEO_Y + 10, 2, FPS_COLOR);
        } else {
            self.canvas.draw_text("WAITING FOR CAMERA...", VIDEO_X + 20, VIDEO_Y + 20, 2, DIM_TEXT);
        }

        if stopped {
            let msg = "CAPTURE STOPPED";
            let x = VIDEO_X + (VIDEO_W - text_width(msg, 4)) / 2;
            self.canvas.draw_text(msg, x, VIDEO_Y + VIDEO_H / 2 - 10, 4, STOP_COLOR);
        }
        self.canvas.draw_border(VIDEO_X, VIDEO_Y, VIDEO_W, VIDEO_H, ACCENT);
    }

    // ── Control panel ─────────────────────────────────────────────────────

    fn draw_panel(&mut self, app: &AppState) {
        let x = PANEL_X;
        self.canvas.fill_rect(x - 10, VIDEO_Y - 10, PANEL_W + 20, VIDEO_H + 20, PANEL_BG);
        self.canvas.draw_text("GESTURE CONTROL PANEL", x, 18, 3, TITLE_COLOR);

        // Gesture readout
        self.canvas.draw_text("GESTURE STATE (INDEX_MIDDLE_PINKY_THUMB)", x, VIDEO_Y, 2, DIM_TEXT);
        let readout = app.gesture().map_or("NO HAND".to_string(), |f| f.to_string());
        self.canvas.draw_text(&readout, x, VIDEO_Y + 20, 5, ACCENT);

        // Last action + status
        let action = format!("LAST ACTION: {}", app.last_action().label());
        self.canvas.draw_text(&action, x, VIDEO_Y + 60, 2, TITLE_COLOR);
        self.canvas.draw_text(&app.status, x, VIDEO_Y + 80, 2, DIM_TEXT);

        // Selection
        let sel = app.selection();
        let col = sel.selected_column.map_or("NONE".to_string(), |c| c.to_string());
        let row = sel.selected_row.map_or("NONE".to_string(), |r| r.to_string());
        self.canvas.draw_text(&format!("COLUMN: {}", col), x, VIDEO_Y + 110, 2, ACCENT);
        self.canvas.draw_text(&format!("ROW: {}", row), x + 160, VIDEO_Y + 110, 2, ROW_TEXT);

        // Typed text
        self.canvas.draw_text("TEXT INPUT", x, TEXT_BOX_Y - 18, 2, DIM_TEXT);
        self.canvas.fill_rect(x, TEXT_BOX_Y, PANEL_W, TEXT_BOX_H, VIDEO_BG);
        self.canvas.draw_border(x, TEXT_BOX_Y, PANEL_W, TEXT_BOX_H, ACCENT);
        let visible = tail(app.typed_text(), (PANEL_W - 20) / text_width("W", 3));
        if visible.is_empty() {
            self.canvas.draw_text("TYPE WITH GESTURES...", x + 10, TEXT_BOX_Y + 13, 3, blend(DIM_TEXT, VIDEO_BG, 0.4));
        } else {
            self.canvas.draw_text(visible, x + 10, TEXT_BOX_Y + 13, 3, TITLE_COLOR);
        }

        self.draw_grid(app);
    }

    fn draw_grid(&mut self, app: &AppState) {
        self.canvas.draw_text("VIRTUAL KEYBOARD", PANEL_X, GRID_Y - 18, 2, DIM_TEXT);
        for (r, row) in app.grid().rows().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                // Placeholders are not drawn.
                let Some(ch) = cell else { continue };
                let (kx, ky) = key_origin(r, c);
                let color = match app.highlight(r, c) {
                    Highlight::Cell   => KEY_CELL,
                    Highlight::Row    => KEY_ROW,
                    Highlight::Column => KEY_COLUMN,
                    Highlight::None   => KEY_DEFAULT,
                };
                self.canvas.fill_rect(kx, ky, KEY_W, KEY_H, color);
                self.canvas.draw_border(kx, ky, KEY_W, KEY_H, blend(color, 0xFFFFFFFF, 0.25));
                let label = ch.to_string();
                let lx = kx + (KEY_W - text_width(&label, 3)) / 2 + 2;
                self.canvas.draw_text(&label, lx, ky + (KEY_H - 15) / 2, 3, TITLE_COLOR);
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Geometry helpers
// ────────────────────────────────────────────────────────────────────────────

fn key_origin(row: usize, col: usize) -> (usize, usize) {
    (PANEL_X + col * (KEY_W + KEY_GAP), GRID_Y + row * (KEY_H + KEY_GAP))
}

/// The grid cell under window position `(x, y)`, if any.
fn cell_at(grid: &KeyGrid, x: usize, y: usize) -> Option<(usize, usize)> {
    if x < PANEL_X || y < GRID_Y { return None; }
    let col = (x - PANEL_X) / (KEY_W + KEY_GAP);
    let row = (y - GRID_Y)  / (KEY_H + KEY_GAP);
    let (kx, ky) = key_origin(row, col);
    let inside = x < kx + KEY_W && y < ky + KEY_H;
    (inside && grid.contains(row, col)).then_some((row, col))
}

/// The last `max_chars` characters of `text`.
fn tail(text: &str, max_chars: usize) -> &str {
    let n = text.chars().count();
    if n <= max_chars { return text; }
    let skip = n - max_chars;
    let start = text.char_indices().nth(skip).map_or(text.len(), |(i, _)| i);
    &text[start..]
}
