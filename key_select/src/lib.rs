//! # key_select
//!
//! Turns a stream of per-frame finger readings into debounced keyboard
//! actions over a row/column [`KeyGrid`].
//!
//! ## Finger → Action mapping
//!
//! | Finger | Rising edge action |
//! |---|---|
//! | Index  | Select next column |
//! | Pinky  | Select next row |
//! | Middle | Backspace |
//! | Thumb  | Enter the selected cell, clear the selection |
//!
//! ## Quick start
//!
//! ```rust
//! use key_select::{Action, FingerState, KeyGrid, SelectionController};
//!
//! let grid: KeyGrid = "AB/CD".parse().unwrap();
//! let mut ctl = SelectionController::new(grid);
//!
//! ctl.tick(Some(FingerState::new(true, false, false, false)));  // column 0
//! ctl.tick(None);
//! ctl.tick(Some(FingerState::new(false, false, true, false)));  // row 0
//! let tick = ctl.tick(Some(FingerState::new(false, false, false, true)));
//!
//! assert_eq!(tick.actions, vec![Action::Commit('A')]);
//! assert_eq!(ctl.typed_text(), "A");
//! ```

pub mod finger;
pub mod grid;
pub mod controller;

pub use controller::{Action, CommitRefusal, Highlight, SelectionController, SelectionState, Tick};
pub use finger::{FingerParseError, FingerState};
pub use grid::{GridError, KeyGrid, EMPTY_CELL};
