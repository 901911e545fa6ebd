//! Board structure and structural mutators
//!
//! A board is a `rows x columns` grid of cells plus one category label per
//! column and the play state (which cells have been used). Cells are keyed by
//! position, so every structural edit renumbers `cells`, `categories` and
//! `used_cells` together.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use super::cell::{Axis, Cell, CellKey};
use crate::config::BoardConfig;
use crate::error::ValidationError;

/// Current time in Unix milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A named trivia board
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub name: String,
    pub rows: usize,
    pub columns: usize,

    /// One label per column
    pub categories: Vec<String>,

    /// Exactly one cell per grid position, row-major
    pub cells: Vec<Cell>,

    /// Play state keyed by current position
    #[serde(default)]
    pub used_cells: BTreeMap<CellKey, bool>,

    pub created_at: i64,
    pub updated_at: i64,
}

impl Board {
    /// Create a default grid with fresh id and timestamps
    pub fn new(name: impl Into<String>, config: &BoardConfig) -> Self {
        let now = now_millis();
        let mut cells = Vec::with_capacity(config.rows * config.columns);
        for row in 0..config.rows {
            for col in 0..config.columns {
                cells.push(Cell::new(row, col, config.points_for_row(row)));
            }
        }

        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            rows: config.rows,
            columns: config.columns,
            categories: vec![config.default_category.clone(); config.columns],
            cells,
            used_cells: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// New board carrying this board's content under a fresh id; play state is not copied
    pub fn duplicate(&self, name: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            rows: self.rows,
            columns: self.columns,
            categories: self.categories.clone(),
            cells: self.cells.clone(),
            used_cells: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance `updated_at`; strictly increasing even within one millisecond
    pub fn touch(&mut self) {
        self.updated_at = now_millis().max(self.updated_at + 1);
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.iter().find(|c| c.row == row && c.col == col)
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut Cell> {
        self.cells.iter_mut().find(|c| c.row == row && c.col == col)
    }

    pub fn contains(&self, key: CellKey) -> bool {
        key.row < self.rows && key.col < self.columns
    }

    pub fn is_used(&self, row: usize, col: usize) -> bool {
        self.used_cells
            .get(&CellKey::new(row, col))
            .copied()
            .unwrap_or(false)
    }

    fn extent(&self, axis: Axis) -> usize {
        match axis {
            Axis::Row => self.rows,
            Axis::Column => self.columns,
        }
    }

    fn set_extent(&mut self, axis: Axis, value: usize) {
        match axis {
            Axis::Row => self.rows = value,
            Axis::Column => self.columns = value,
        }
    }

    // ------------------------------------------------------------------
    // Structural edits
    // ------------------------------------------------------------------

    /// Append a row at the bottom
    pub fn add_row(&mut self, config: &BoardConfig) {
        self.insert_line(Axis::Row, self.rows, config);
    }

    /// Drop the bottom row; no-op on a single-row board
    pub fn remove_row(&mut self) -> bool {
        self.remove_line(Axis::Row, self.rows.saturating_sub(1))
    }

    /// Append a column (and category) on the right
    pub fn add_column(&mut self, config: &BoardConfig) {
        self.insert_line(Axis::Column, self.columns, config);
    }

    /// Drop the rightmost column; no-op on a single-column board
    pub fn remove_column(&mut self) -> bool {
        self.remove_line(Axis::Column, self.columns.saturating_sub(1))
    }

    /// Insert a row so that the new cells sit at `index` (clamped to `rows`)
    pub fn add_row_at(&mut self, index: usize, config: &BoardConfig) {
        self.insert_line(Axis::Row, index, config);
    }

    pub fn remove_row_at(&mut self, index: usize) -> bool {
        self.remove_line(Axis::Row, index)
    }

    /// Insert a column so that the new cells sit at `index` (clamped to `columns`)
    pub fn add_column_at(&mut self, index: usize, config: &BoardConfig) {
        self.insert_line(Axis::Column, index, config);
    }

    pub fn remove_column_at(&mut self, index: usize) -> bool {
        self.remove_line(Axis::Column, index)
    }

    fn insert_line(&mut self, axis: Axis, index: usize, config: &BoardConfig) {
        let index = index.min(self.extent(axis));

        for cell in &mut self.cells {
            let coord = cell.coord(axis);
            if coord >= index {
                cell.set_coord(axis, coord + 1);
            }
        }

        self.used_cells = std::mem::take(&mut self.used_cells)
            .into_iter()
            .map(|(key, used)| {
                let coord = key.coord(axis);
                if coord >= index {
                    (key.with_coord(axis, coord + 1), used)
                } else {
                    (key, used)
                }
            })
            .collect();

        let across = match axis {
            Axis::Row => self.columns,
            Axis::Column => self.rows,
        };
        for other in 0..across {
            let key = match axis {
                Axis::Row => CellKey::new(index, other),
                Axis::Column => CellKey::new(other, index),
            };
            self.cells
                .push(Cell::new(key.row, key.col, config.points_for_row(key.row)));
        }

        if axis == Axis::Column {
            self.categories.insert(index, config.default_category.clone());
        }

        self.set_extent(axis, self.extent(axis) + 1);
        self.cells.sort_by_key(Cell::key);
        self.touch();

        log::debug!(
            "Inserted {:?} at {} on board {} ({}x{})",
            axis,
            index,
            self.id,
            self.rows,
            self.columns
        );
    }

    fn remove_line(&mut self, axis: Axis, index: usize) -> bool {
        let extent = self.extent(axis);
        if extent <= 1 || index >= extent {
            return false;
        }

        self.cells.retain(|cell| cell.coord(axis) != index);
        for cell in &mut self.cells {
            let coord = cell.coord(axis);
            if coord > index {
                cell.set_coord(axis, coord - 1);
            }
        }

        self.used_cells = std::mem::take(&mut self.used_cells)
            .into_iter()
            .filter(|(key, _)| key.coord(axis) != index)
            .map(|(key, used)| {
                let coord = key.coord(axis);
                if coord > index {
                    (key.with_coord(axis, coord - 1), used)
                } else {
                    (key, used)
                }
            })
            .collect();

        if axis == Axis::Column && index < self.categories.len() {
            self.categories.remove(index);
        }

        self.set_extent(axis, extent - 1);
        self.touch();

        log::debug!(
            "Removed {:?} {} from board {} ({}x{})",
            axis,
            index,
            self.id,
            self.rows,
            self.columns
        );
        true
    }

    // ------------------------------------------------------------------
    // Content edits
    // ------------------------------------------------------------------

    pub fn set_category_at(&mut self, index: usize, value: impl Into<String>) -> bool {
        match self.categories.get_mut(index) {
            Some(label) => {
                *label = value.into();
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Replace the cell at the same `(row, col)`; false when no such cell exists
    pub fn update_cell(&mut self, updated: Cell) -> bool {
        match self.cell_mut(updated.row, updated.col) {
            Some(cell) => {
                *cell = updated;
                self.touch();
                true
            }
            None => false,
        }
    }

    pub fn set_cell_points(&mut self, row: usize, col: usize, points: u32) -> bool {
        match self.cell_mut(row, col) {
            Some(cell) => {
                cell.points = points;
                self.touch();
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Play state
    // ------------------------------------------------------------------

    /// Idempotent; unknown positions are ignored
    pub fn mark_cell_used(&mut self, row: usize, col: usize) -> bool {
        let key = CellKey::new(row, col);
        if !self.contains(key) {
            return false;
        }
        self.used_cells.insert(key, true);
        true
    }

    /// Clear every used flag; returns how many entries were dropped
    pub fn reset_played_cells(&mut self) -> usize {
        let cleared = self.used_cells.len();
        self.used_cells.clear();
        cleared
    }

    /// Re-key elements with missing or repeated ids in every slide
    ///
    /// Records saved by older hosts may omit element ids. Does not touch
    /// `updated_at`; returns how many elements were re-keyed.
    pub fn rekey_elements(&mut self) -> usize {
        self.cells
            .iter_mut()
            .flat_map(|cell| cell.slides.iter_mut())
            .map(|slide| slide.rekey_elements())
            .sum()
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Check the one-cell-per-position and one-category-per-column invariants
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.categories.len() != self.columns {
            return Err(ValidationError::CategoryCount {
                expected: self.columns,
                found: self.categories.len(),
            });
        }

        let mut seen = BTreeSet::new();
        for cell in &self.cells {
            if !self.contains(cell.key()) {
                return Err(ValidationError::OutOfGrid {
                    row: cell.row,
                    col: cell.col,
                    rows: self.rows,
                    columns: self.columns,
                });
            }
            if !seen.insert(cell.key()) {
                return Err(ValidationError::DuplicateCell {
                    row: cell.row,
                    col: cell.col,
                });
            }
            if cell.slides.is_empty() {
                return Err(ValidationError::EmptyCell {
                    row: cell.row,
                    col: cell.col,
                });
            }
        }

        if seen.len() != self.rows * self.columns {
            return Err(ValidationError::CellCount {
                expected: self.rows * self.columns,
                found: seen.len(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(rows: usize, columns: usize) -> (Board, BoardConfig) {
        let config = BoardConfig {
            rows,
            columns,
            ..Default::default()
        };
        (Board::new("Test", &config), config)
    }

    #[test]
    fn test_new_board_covers_grid() {
        let (board, _) = board(5, 6);
        assert_eq!(board.cells.len(), 30);
        assert_eq!(board.categories.len(), 6);
        assert!(board.validate().is_ok());
        assert_eq!(board.cell(4, 0).unwrap().points, 500);
    }

    #[test]
    fn test_add_row_appends_default_cells() {
        let (mut board, config) = board(2, 3);
        board.add_row(&config);

        assert_eq!(board.rows, 3);
        assert!(board.validate().is_ok());
        let cell = board.cell(2, 1).unwrap();
        assert_eq!(cell.points, 300);
        assert_eq!(cell.slides.len(), 1);
    }

    #[test]
    fn test_remove_row_drops_last_row_and_its_play_state() {
        let (mut board, _) = board(3, 2);
        board.mark_cell_used(2, 1);
        board.mark_cell_used(0, 0);

        assert!(board.remove_row());
        assert_eq!(board.rows, 2);
        assert!(board.cell(2, 1).is_none());
        assert!(!board.used_cells.contains_key(&CellKey::new(2, 1)));
        assert!(board.is_used(0, 0));
        assert!(board.validate().is_ok());
    }

    #[test]
    fn test_removal_floor_is_noop() {
        let (mut board, _) = board(1, 1);
        let before = board.clone();

        assert!(!board.remove_row());
        assert!(!board.remove_column());
        assert!(!board.remove_row_at(0));
        assert!(!board.remove_column_at(0));
        assert_eq!(board, before);
    }

    #[test]
    fn test_remove_out_of_range_is_noop() {
        let (mut board, _) = board(3, 3);
        let before = board.clone();
        assert!(!board.remove_row_at(3));
        assert!(!board.remove_column_at(10));
        assert_eq!(board, before);
    }

    #[test]
    fn test_add_row_at_shifts_rows_and_used_cells() {
        let (mut board, config) = board(3, 2);
        board.cell_mut(1, 0).unwrap().points = 999;
        board.mark_cell_used(1, 0);
        board.mark_cell_used(0, 1);

        board.add_row_at(1, &config);

        assert_eq!(board.rows, 4);
        assert_eq!(board.cell(2, 0).unwrap().points, 999);
        assert_eq!(board.cell(1, 0).unwrap().points, 200);
        assert!(board.is_used(2, 0));
        assert!(!board.is_used(1, 0));
        assert!(board.is_used(0, 1));
        assert!(board.validate().is_ok());
    }

    #[test]
    fn test_add_row_at_clamps_index() {
        let (mut board, config) = board(2, 2);
        board.add_row_at(99, &config);
        assert_eq!(board.rows, 3);
        assert!(board.cell(2, 0).is_some());
        assert!(board.validate().is_ok());
    }

    #[test]
    fn test_remove_column_at_shifts_left() {
        let (mut board, _) = board(2, 4);
        for (i, label) in ["A", "B", "C", "D"].iter().enumerate() {
            board.set_category_at(i, *label);
        }
        board.cell_mut(0, 3).unwrap().points = 42;
        board.mark_cell_used(1, 3);
        board.mark_cell_used(1, 1);

        assert!(board.remove_column_at(1));

        assert_eq!(board.columns, 3);
        assert_eq!(board.categories, vec!["A", "C", "D"]);
        assert_eq!(board.cell(0, 2).unwrap().points, 42);
        assert!(board.is_used(1, 2));
        assert!(!board.is_used(1, 1));
        assert_eq!(board.used_cells.len(), 1);
        assert!(board.validate().is_ok());
    }

    #[test]
    fn test_cells_stay_row_major() {
        let (mut board, config) = board(2, 2);
        board.add_column(&config);
        board.add_row_at(0, &config);

        let keys: Vec<_> = board.cells.iter().map(Cell::key).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_mark_cell_used_ignores_unknown_cell() {
        let (mut board, _) = board(2, 2);
        assert!(!board.mark_cell_used(5, 5));
        assert!(board.used_cells.is_empty());

        assert!(board.mark_cell_used(1, 1));
        assert!(board.mark_cell_used(1, 1));
        assert_eq!(board.used_cells.len(), 1);

        assert_eq!(board.reset_played_cells(), 1);
        assert!(!board.is_used(1, 1));
    }

    #[test]
    fn test_set_category_out_of_range() {
        let (mut board, _) = board(1, 2);
        assert!(!board.set_category_at(2, "Nope"));
        assert!(board.set_category_at(1, "History"));
        assert_eq!(board.categories[1], "History");
    }

    #[test]
    fn test_touch_is_strictly_increasing() {
        let (mut board, _) = board(1, 1);
        board.updated_at = i64::MAX / 2;
        let before = board.updated_at;
        board.touch();
        assert_eq!(board.updated_at, before + 1);
    }

    #[test]
    fn test_validate_reports_missing_cell() {
        let (mut board, _) = board(2, 2);
        board.cells.pop();
        assert_eq!(
            board.validate(),
            Err(ValidationError::CellCount { expected: 4, found: 3 })
        );
    }

    #[test]
    fn test_duplicate_drops_play_state() {
        let (mut board, _) = board(2, 2);
        board.mark_cell_used(0, 0);
        let copy = board.duplicate("Copy");

        assert_ne!(copy.id, board.id);
        assert_eq!(copy.cells, board.cells);
        assert!(copy.used_cells.is_empty());
        assert_eq!(copy.name, "Copy");
    }

    #[test]
    fn test_rekey_elements_walks_every_slide() {
        let (mut board, _) = board(1, 2);
        for cell in &mut board.cells {
            cell.slides[0].elements[0].id.clear();
        }
        let stamp = board.updated_at;

        assert_eq!(board.rekey_elements(), 2);
        assert!(board.cells.iter().all(|c| !c.slides[0].elements[0].id.is_empty()));
        assert_eq!(board.updated_at, stamp);
    }
}
