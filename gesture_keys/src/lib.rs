//! # gesture_keys
//!
//! Type with hand gestures.  A gesture source (camera+detector, LeapMotion,
//! or keyboard simulation) runs on its own thread and publishes each capture
//! into a latest-value [`frame_relay::Relay`].  The window loop shows the
//! newest frame and, on a fixed interval, feeds the newest finger sample to a
//! [`key_select::SelectionController`].
//!
//! ## Gesture → Action mapping
//!
//! | Finger (rising edge) | Action |
//! |---|---|
//! | Index  | Select next column |
//! | Pinky  | Select next row |
//! | Middle | Backspace |
//! | Thumb  | Enter the selected key, clear the selection |
//!
//! Clicking a key on screen types it directly.
//!
//! ## Feature flags
//!
//! * (default) — **Simulation mode**: held keys stand in for raised fingers.
//! * `leap` — **Hardware mode**: polls a real LeapMotion controller via LeapC.
//!
//! ### Simulation keyboard shortcuts
//!
//! | Key | Finger |
//! |---|---|
//! | `J` (hold) | Index |
//! | `K` (hold) | Middle |
//! | `L` (hold) | Pinky |
//! | `Space` (hold) | Thumb |
//! | `H` | Toggle hand in view |
//! | `Escape` | Quit |

pub mod frame;
pub mod gesture;
pub mod producer;
pub mod visualizer;
pub mod app;
