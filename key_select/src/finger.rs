//! Per-sample finger readings.
//!
//! A [`FingerState`] is one detection cycle's worth of up/down readings for the
//! four tracked fingers.  It is a plain value: the detector produces one, the
//! controller compares it against the previous one, and nothing mutates it.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

// ════════════════════════════════════════════════════════════════════════════
// FingerState
// ════════════════════════════════════════════════════════════════════════════

/// Up/down reading for the four tracked fingers.
///
/// `Default` is all-down, which is also what "no hand visible" means.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FingerState {
    pub index:  bool,
    pub middle: bool,
    pub pinky:  bool,
    pub thumb:  bool,
}

impl FingerState {
    pub const fn new(index: bool, middle: bool, pinky: bool, thumb: bool) -> Self {
        FingerState { index, middle, pinky, thumb }
    }

    /// Normalise a detector's five-finger vector.
    ///
    /// The input is in anatomical order `[thumb, index, middle, ring, pinky]`
    /// with `1` meaning up.  The ring finger is not tracked.  Returns `None`
    /// for anything that isn't exactly five 0/1 values.
    pub fn from_fingers_up(fingers: &[u8]) -> Option<Self> {
        if fingers.len() != 5 || fingers.iter().any(|&f| f > 1) {
            return None;
        }
        Some(FingerState {
            thumb:  fingers[0] == 1,
            index:  fingers[1] == 1,
            middle: fingers[2] == 1,
            pinky:  fingers[4] == 1,
        })
    }

    /// Fingers that are up now but were down in `previous`.
    pub fn rising_edges(self, previous: FingerState) -> FingerState {
        FingerState {
            index:  self.index  && !previous.index,
            middle: self.middle && !previous.middle,
            pinky:  self.pinky  && !previous.pinky,
            thumb:  self.thumb  && !previous.thumb,
        }
    }

    pub fn any_up(self) -> bool {
        self.index || self.middle || self.pinky || self.thumb
    }

    /// Role labels for whichever fingers are up, in evaluation order.
    pub fn up_names(self) -> Vec<&'static str> {
        let mut names = Vec::with_capacity(4);
        if self.index  { names.push("Index (Column)"); }
        if self.middle { names.push("Middle (Backspace)"); }
        if self.pinky  { names.push("Pinky (Row)"); }
        if self.thumb  { names.push("Thumb (Enter)"); }
        names
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Packed text form: "index_middle_pinky_thumb", e.g. "1_0_0_1"
// ────────────────────────────────────────────────────────────────────────────

impl fmt::Display for FingerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}",
            u8::from(self.index),
            u8::from(self.middle),
            u8::from(self.pinky),
            u8::from(self.thumb),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FingerParseError {
    #[error("expected 4 fields separated by '_', found {0}")]
    FieldCount(usize),
    #[error("field {position} is {value:?}, expected 0 or 1")]
    BadField { position: usize, value: String },
}

impl FromStr for FingerState {
    type Err = FingerParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.trim().split('_').collect();
        if fields.len() != 4 {
            return Err(FingerParseError::FieldCount(fields.len()));
        }

        let mut bits = [false; 4];
        for (position, (slot, field)) in bits.iter_mut().zip(&fields).enumerate() {
            *slot = match *field {
                "0" => false,
                "1" => true,
                other => {
                    return Err(FingerParseError::BadField {
                        position,
                        value: other.to_string(),
                    })
                }
            };
        }
        Ok(FingerState::new(bits[0], bits[1], bits[2], bits[3]))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
