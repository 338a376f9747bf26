//! Selection state machine.
//!
//! [`SelectionController::tick`] consumes one finger sample per call and turns
//! *rising edges* (down → up transitions) into discrete [`Action`]s.  Holding a
//! pose never repeats its action, so the result is independent of how often
//! the consumer loop samples.
//!
//! | Finger | Rising edge |
//! |---|---|
//! | Index  | select column `column_counter % width`, then advance the counter |
//! | Middle | backspace (no-op on empty text) |
//! | Pinky  | select row `row_counter % height`, then advance the counter |
//! | Thumb  | commit the selected cell, then clear selections and counters |
//!
//! The controller is owned by a single consumer loop and has no
//! synchronisation of its own.

use thiserror::Error;
use tracing::{debug, info};

use crate::finger::FingerState;
use crate::grid::KeyGrid;

// ════════════════════════════════════════════════════════════════════════════
// Action
// ════════════════════════════════════════════════════════════════════════════

/// What a tick did, for the presentation layer to render.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Action {
    ColumnSelect(usize),
    RowSelect(usize),
    Backspace,
    Commit(char),
    /// Nothing happened.  Never appears in a [`Tick`]'s action list.
    #[default]
    NoOp,
}

impl Action {
    /// Short label for the "last action" readout.
    pub fn label(&self) -> String {
        match self {
            Action::ColumnSelect(c) => format!("Column {} selected", c),
            Action::RowSelect(r)    => format!("Row {} selected", r),
            Action::Backspace       => "Backspace".to_string(),
            Action::Commit(ch)      => format!("Entered '{}'", ch),
            Action::NoOp            => "None".to_string(),
        }
    }
}

/// Why a thumb rising edge didn't produce a [`Action::Commit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum CommitRefusal {
    #[error("incomplete selection: need both a row and a column")]
    Incomplete,
    #[error("selection (row {row}, column {col}) is outside the key grid")]
    OutOfBounds { row: usize, col: usize },
    #[error("selected cell (row {row}, column {col}) is empty")]
    EmptyCell { row: usize, col: usize },
}

// ════════════════════════════════════════════════════════════════════════════
// SelectionState
// ════════════════════════════════════════════════════════════════════════════

/// Everything the controller mutates.  Created at defaults, never persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub column_counter:  usize,
    pub row_counter:     usize,
    pub selected_column: Option<usize>,
    pub selected_row:    Option<usize>,
    pub typed_text:      String,
    /// Last sample seen; the baseline for edge detection.
    pub previous:        FingerState,
}

impl SelectionState {
    fn clear_selection(&mut self) {
        self.selected_column = None;
        self.selected_row    = None;
        self.column_counter  = 0;
        self.row_counter     = 0;
    }
}

/// How a grid cell should be drawn given the current selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Highlight {
    None,
    Column,
    Row,
    /// Both row and column selected and this is their intersection.
    Cell,
}

/// Result of one [`SelectionController::tick`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tick {
    /// Actions in evaluation order: index, middle, pinky, thumb.
    pub actions: Vec<Action>,
    pub status:  String,
}

// ════════════════════════════════════════════════════════════════════════════
// SelectionController
// ════════════════════════════════════════════════════════════════════════════

pub struct SelectionController {
    grid:  KeyGrid,
    state: SelectionState,
}

impl SelectionController {
    pub fn new(grid: KeyGrid) -> Self {
        SelectionController { grid, state: SelectionState::default() }
    }

    pub fn grid(&self) -> &KeyGrid { &self.grid }
    pub fn state(&self) -> &SelectionState { &self.state }
    pub fn typed_text(&self) -> &str { &self.state.typed_text }

    /// Process one sample.  `None` (no hand) is the same as all fingers down.
    pub fn tick(&mut self, sample: Option<FingerState>) -> Tick {
        let current = sample.unwrap_or_default();
        let edges   = current.rising_edges(self.state.previous);

        let mut actions = Vec::new();
        let mut refusal = None;

        if edges.index {
            let col = self.state.column_counter % self.grid.width();
            self.state.selected_column = Some(col);
            self.state.column_counter += 1;
            debug!(col, "column selected");
            actions.push(Action::ColumnSelect(col));
        }

        if edges.middle {
            self.backspace();
            actions.push(Action::Backspace);
        }

        if edges.pinky {
            let row = self.state.row_counter % self.grid.height();
            self.state.selected_row = Some(row);
            self.state.row_counter += 1;
            debug!(row, "row selected");
            actions.push(Action::RowSelect(row));
        }

        if edges.thumb {
            match self.commit() {
                Ok(ch) => actions.push(Action::Commit(ch)),
                Err(why) => {
                    info!(%why, "commit refused");
                    refusal = Some(why);
                }
            }
        }

        // Exactly once, after all four comparisons used the same baseline.
        self.state.previous = current;

        let status = match refusal {
            Some(why) => why.to_string(),
            None      => active_summary(current),
        };
        Tick { actions, status }
    }

    /// Append a character directly, bypassing the gesture selection.
    pub fn type_char(&mut self, ch: char) {
        self.state.typed_text.push(ch);
        debug!(%ch, text = %self.state.typed_text, "typed");
    }

    pub fn clear_selection(&mut self) {
        self.state.clear_selection();
    }

    /// Swap in a new layout.  Selections are left alone; if they no longer fit
    /// the next commit is refused with [`CommitRefusal::OutOfBounds`].
    pub fn replace_grid(&mut self, grid: KeyGrid) {
        self.grid = grid;
    }

    pub fn highlight(&self, row: usize, col: usize) -> Highlight {
        let row_hit = self.state.selected_row    == Some(row);
        let col_hit = self.state.selected_column == Some(col);
        match (row_hit, col_hit) {
            (true,  true)  => Highlight::Cell,
            (true,  false) => Highlight::Row,
            (false, true)  => Highlight::Column,
            (false, false) => Highlight::None,
        }
    }

    fn backspace(&mut self) {
        // Empty text is a no-op.
        let removed = self.state.typed_text.pop();
        debug!(?removed, "backspace");
    }

    fn commit(&mut self) -> Result<char, CommitRefusal> {
        let (row, col) = match (self.state.selected_row, self.state.selected_column) {
            (Some(r), Some(c)) => (r, c),
            _                  => return Err(CommitRefusal::Incomplete),
        };
        if !self.grid.contains(row, col) {
            return Err(CommitRefusal::OutOfBounds { row, col });
        }
        let ch = self.grid.cell(row, col).ok_or(CommitRefusal::EmptyCell { row, col })?;

        self.state.typed_text.push(ch);
        self.state.clear_selection();
        info!(%ch, text = %self.state.typed_text, "character entered");
        Ok(ch)
    }
}

fn active_summary(current: FingerState) -> String {
    if current.any_up() {
        format!("Active: {}", current.up_names().join(", "))
    } else {
        "No gesture detected".to_string()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const DOWN:   FingerState = FingerState::new(false, false, false, false);
    const INDEX:  FingerState = FingerState::new(true,  false, false, false);
    const MIDDLE: FingerState = FingerState::new(false, true,  false, false);
    const PINKY:  FingerState = FingerState::new(false, false, true,  false);
    const THUMB:  FingerState = FingerState::new(false, false, false, true);

    fn make_ctl() -> SelectionController {
        SelectionController::new("AB/CD".parse().unwrap())
    }

    /// Feed `samples`, collecting every action in order.
    fn run(ctl: &mut SelectionController, samples: &[FingerState]) -> Vec<Action> {
        samples.iter().flat_map(|&s| ctl.tick(Some(s)).actions).collect()
    }

    #[test]
    fn select_row_column_and_commit() {
        let mut ctl = make_ctl();
        let actions = run(&mut ctl, &[INDEX, DOWN, PINKY, DOWN, THUMB]);
        assert_eq!(
            actions,
            vec![Action::ColumnSelect(0), Action::RowSelect(0), Action::Commit('A')]
        );
        let s = ctl.state();
        assert_eq!(s.typed_text, "A");
        assert_eq!(s.selected_row, None);
        assert_eq!(s.selected_column, None);
        assert_eq!(s.column_counter, 0);
        assert_eq!(s.row_counter, 0);
    }

    #[test]
    fn thumb_without_row_does_not_commit() {
        let mut ctl = make_ctl();
        run(&mut ctl, &[INDEX, DOWN]);
        let tick = ctl.tick(Some(THUMB));
        assert!(tick.actions.is_empty());
        assert_eq!(tick.status, CommitRefusal::Incomplete.to_string());
        assert_eq!(ctl.typed_text(), "");
        // Selection survives a refused commit.
        assert_eq!(ctl.state().selected_column, Some(0));
    }

    #[test]
    fn held_finger_fires_once() {
        let mut ctl = make_ctl();
        let actions = run(&mut ctl, &[INDEX; 10]);
        assert_eq!(actions, vec![Action::ColumnSelect(0)]);
        assert_eq!(ctl.state().column_counter, 1);
    }

    #[test]
    fn column_selection_cycles_with_grid_width() {
        let mut ctl = make_ctl();
        let cols: Vec<Action> = run(&mut ctl, &[INDEX, DOWN, INDEX, DOWN, INDEX, DOWN, INDEX]);
        assert_eq!(
            cols,
            vec![
                Action::ColumnSelect(0),
                Action::ColumnSelect(1),
                Action::ColumnSelect(0),
                Action::ColumnSelect(1),
            ]
        );
    }

    #[test]
    fn row_selection_cycles_with_grid_height() {
        let mut ctl = SelectionController::new(KeyGrid::qwerty());
        let rows = run(&mut ctl, &[PINKY, DOWN, PINKY, DOWN, PINKY, DOWN, PINKY]);
        assert_eq!(
            rows,
            vec![
                Action::RowSelect(0),
                Action::RowSelect(1),
                Action::RowSelect(2),
                Action::RowSelect(0),
            ]
        );
    }

    #[test]
    fn backspace_on_empty_is_noop() {
        let mut ctl = make_ctl();
        let tick = ctl.tick(Some(MIDDLE));
        assert_eq!(tick.actions, vec![Action::Backspace]);
        assert_eq!(ctl.typed_text(), "");
    }

    #[test]
    fn backspace_removes_last_char() {
        let mut ctl = make_ctl();
        ctl.type_char('X');
        ctl.type_char('Y');
        run(&mut ctl, &[MIDDLE, DOWN]);
        assert_eq!(ctl.typed_text(), "X");
    }

    #[test]
    fn none_sample_counts_as_all_down() {
        let mut ctl = make_ctl();
        ctl.tick(Some(INDEX));
        let tick = ctl.tick(None);
        assert!(tick.actions.is_empty());
        assert_eq!(tick.status, "No gesture detected");
        // Index back up after the gap is a fresh edge.
        assert_eq!(ctl.tick(Some(INDEX)).actions, vec![Action::ColumnSelect(1)]);
    }

    #[test]
    fn simultaneous_edges_in_finger_order() {
        let mut ctl = make_ctl();
        run(&mut ctl, &[INDEX, DOWN]);
        // Pinky and thumb rise together: row first, then commit.
        let all = FingerState::new(false, false, true, true);
        let tick = ctl.tick(Some(all));
        assert_eq!(tick.actions, vec![Action::RowSelect(0), Action::Commit('A')]);
    }

    #[test]
    fn four_edges_in_one_tick() {
        let mut ctl = make_ctl();
        ctl.type_char('Z');
        let tick = ctl.tick(Some(FingerState::new(true, true, true, true)));
        assert_eq!(
            tick.actions,
            vec![
                Action::ColumnSelect(0),
                Action::Backspace,
                Action::RowSelect(0),
                Action::Commit('A'),
            ]
        );
        assert_eq!(ctl.typed_text(), "A");
    }

    #[test]
    fn empty_cell_not_committed() {
        let mut ctl = SelectionController::new("AB/C_".parse().unwrap());
        let actions = run(&mut ctl, &[INDEX, DOWN, INDEX, PINKY, DOWN, PINKY]);
        assert_eq!(actions, vec![Action::ColumnSelect(0), Action::ColumnSelect(1),
                                 Action::RowSelect(0), Action::RowSelect(1)]);
        let tick = ctl.tick(Some(THUMB));
        assert!(tick.actions.is_empty());
        assert_eq!(tick.status, CommitRefusal::EmptyCell { row: 1, col: 1 }.to_string());
        assert_eq!(ctl.typed_text(), "");
    }

    #[test]
    fn stale_selection_after_grid_shrink_is_refused() {
        let mut ctl = SelectionController::new(KeyGrid::qwerty());
        // Column 2, row 2.
        run(&mut ctl, &[INDEX, DOWN, INDEX, DOWN, INDEX, DOWN,
                        PINKY, DOWN, PINKY, DOWN, PINKY, DOWN]);
        assert_eq!(ctl.state().selected_column, Some(2));
        assert_eq!(ctl.state().selected_row, Some(2));

        ctl.replace_grid("AB/CD".parse().unwrap());
        let tick = ctl.tick(Some(THUMB));
        assert!(tick.actions.is_empty());
        assert_eq!(tick.status, CommitRefusal::OutOfBounds { row: 2, col: 2 }.to_string());
    }

    #[test]
    fn commits_never_exceed_thumb_edges() {
        // Pseudo-random walk over all 16 finger combinations.
        let mut ctl = SelectionController::new(KeyGrid::qwerty());
        let mut seed: u32 = 0x2545_F491;
        let mut prev_thumb = false;
        let mut thumb_edges = 0;
        let mut commits = 0;
        for _ in 0..2000 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let bits = seed & 0xF;
            let sample = FingerState::new(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0, bits & 8 != 0);

            let had_both = {
                let s = ctl.state();
                s.selected_row.is_some() && s.selected_column.is_some()
            };
            if sample.thumb && !prev_thumb { thumb_edges += 1; }
            prev_thumb = sample.thumb;

            for action in ctl.tick(Some(sample)).actions {
                if let Action::Commit(_) = action {
                    commits += 1;
                    // Either already doubly selected, or completed this tick.
                    assert!(had_both || sample.index || sample.pinky);
                    let s = ctl.state();
                    assert_eq!((s.selected_row, s.selected_column), (None, None));
                    assert_eq!((s.row_counter, s.column_counter), (0, 0));
                }
            }
        }
        assert!(commits <= thumb_edges);
        assert!(commits > 0);
    }

    #[test]
    fn status_lists_active_fingers() {
        let mut ctl = make_ctl();
        let tick = ctl.tick(Some(FingerState::new(true, false, false, true)));
        // Thumb edge with only a column is refused, so the refusal wins.
        assert_eq!(tick.status, CommitRefusal::Incomplete.to_string());
        let tick = ctl.tick(Some(FingerState::new(true, false, false, true)));
        assert_eq!(tick.status, "Active: Index (Column), Thumb (Enter)");
    }

    #[test]
    fn highlight_prefers_cell_over_row_over_column() {
        let mut ctl = make_ctl();
        run(&mut ctl, &[INDEX, DOWN, PINKY, DOWN]);
        assert_eq!(ctl.highlight(0, 0), Highlight::Cell);
        assert_eq!(ctl.highlight(0, 1), Highlight::Row);
        assert_eq!(ctl.highlight(1, 0), Highlight::Column);
        assert_eq!(ctl.highlight(1, 1), Highlight::None);
    }

    #[test]
    fn clear_selection_resets_counters() {
        let mut ctl = make_ctl();
        run(&mut ctl, &[INDEX, DOWN, INDEX, PINKY]);
        ctl.clear_selection();
        let s = ctl.state();
        assert_eq!((s.selected_row, s.selected_column), (None, None));
        assert_eq!((s.row_counter, s.column_counter), (0, 0));
    }
}
