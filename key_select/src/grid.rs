//! The static key layout that selection indices address.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Character used in layout strings for an unselectable placeholder cell.
pub const EMPTY_CELL: char = '_';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("key grid has no rows")]
    NoRows,
    #[error("first row of the key grid is empty")]
    EmptyFirstRow,
}

/// Rows of character cells; `None` is an empty placeholder.
///
/// Rows may have different lengths.  The column count used for selection is
/// the width of row 0, so a column index is only meaningful against the row it
/// is combined with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyGrid {
    rows: Vec<Vec<Option<char>>>,
}

impl KeyGrid {
    pub fn new(rows: Vec<Vec<Option<char>>>) -> Result<Self, GridError> {
        match rows.first() {
            None                     => Err(GridError::NoRows),
            Some(r) if r.is_empty()  => Err(GridError::EmptyFirstRow),
            Some(_)                  => Ok(KeyGrid { rows }),
        }
    }

    /// The 3×9 letter layout, with one placeholder in the bottom-right corner.
    pub fn qwerty() -> Self {
        KeyGrid::from_rows(&["QWERTYUIO", "ASDFGHJKL", "ZXCVBNMP_"])
    }

    fn from_rows(rows: &[&str]) -> Self {
        KeyGrid {
            rows: rows.iter().map(|r| parse_row(r)).collect(),
        }
    }

    pub fn width(&self) -> usize { self.rows[0].len() }
    pub fn height(&self) -> usize { self.rows.len() }

    /// Length of `row`, or 0 if the row doesn't exist.
    pub fn row_len(&self, row: usize) -> usize {
        self.rows.get(row).map_or(0, Vec::len)
    }

    /// The character at `(row, col)`, `None` for placeholders and out-of-range
    /// positions alike.  Use [`KeyGrid::contains`] to tell them apart.
    pub fn cell(&self, row: usize, col: usize) -> Option<char> {
        self.rows.get(row).and_then(|r| r.get(col)).copied().flatten()
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        col < self.row_len(row)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Option<char>]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

impl Default for KeyGrid {
    fn default() -> Self { KeyGrid::qwerty() }
}

fn parse_row(row: &str) -> Vec<Option<char>> {
    row.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == EMPTY_CELL { None } else { Some(c) })
        .collect()
}

/// Layout strings: rows separated by `/` or `,`, one character per cell,
/// [`EMPTY_CELL`] for placeholders.  `"AB/CD"` is a 2×2 grid.
impl FromStr for KeyGrid {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rows: Vec<Vec<Option<char>>> = s
            .split(['/', ','])
            .map(parse_row)
            .collect();
        // A trailing separator shouldn't add a phantom row.
        let keep = rows.iter().rposition(|r| !r.is_empty()).map_or(0, |last| last + 1);
        rows.truncate(keep);
        KeyGrid::new(rows)
    }
}

impl fmt::Display for KeyGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 { f.write_str("/")?; }
            for cell in row {
                write!(f, "{}", cell.unwrap_or(EMPTY_CELL))?;
            }
        }
        Ok(())
    }
}
