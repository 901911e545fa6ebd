//! Board registry
//!
//! Owns the collection of named boards and the pointer to the active one.
//! Every board edit goes through the registry against the active board and
//! is written through to storage immediately. The collection is never empty.

pub mod storage;

pub use storage::{BoardStorage, MemoryStorage};

#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStorage;

#[cfg(target_arch = "wasm32")]
pub use storage::LocalStorage;

use crate::config::{BoardConfig, ACTIVE_BOARD_STORAGE_KEY, BOARDS_STORAGE_KEY};
use crate::error::StorageError;
use crate::models::{Board, Cell, CellKey};

/// Result of clicking a cell on the grid
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellActivation {
    /// Edit mode: the cell is selected for editing
    Edit(CellKey),

    /// Play mode: the cell was unused, is now marked used and selected
    Play(CellKey),

    /// Play mode: the cell was already played; nothing changes
    AlreadyUsed(CellKey),

    /// No cell at that position
    Missing,
}

pub struct BoardRegistry {
    boards: Vec<Board>,
    active_id: String,
    storage: Box<dyn BoardStorage>,
    config: BoardConfig,
    edit_mode: bool,
    selected: Option<CellKey>,
}

impl BoardRegistry {
    /// Load the collection from `storage`, falling back to one default board
    pub fn open(storage: Box<dyn BoardStorage>, config: BoardConfig) -> Self {
        let config = config.normalized();

        let mut boards = match load_boards(storage.as_ref()) {
            Ok(boards) => boards,
            Err(e) => {
                log::warn!("Could not load saved boards, starting fresh: {}", e);
                Vec::new()
            }
        };
        for board in &boards {
            if let Err(e) = board.validate() {
                log::warn!("Loaded board {} ({}) is inconsistent: {}", board.id, board.name, e);
            }
        }
        if boards.is_empty() {
            boards.push(Board::new(config.default_board_name.clone(), &config));
        }

        let saved_active = storage.read(ACTIVE_BOARD_STORAGE_KEY).unwrap_or_else(|e| {
            log::warn!("Could not read active board id: {}", e);
            None
        });
        let active_id = saved_active
            .filter(|id| boards.iter().any(|b| &b.id == id))
            .unwrap_or_else(|| boards[0].id.clone());

        log::info!("Board registry opened with {} board(s), active {}", boards.len(), active_id);

        Self {
            boards,
            active_id,
            storage,
            config,
            edit_mode: false,
            selected: None,
        }
    }

    /// Registry backed by a fresh in-memory store
    pub fn in_memory(config: BoardConfig) -> Self {
        Self::open(Box::new(MemoryStorage::new()), config)
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn boards(&self) -> &[Board] {
        &self.boards
    }

    pub fn board(&self, id: &str) -> Option<&Board> {
        self.boards.iter().find(|b| b.id == id)
    }

    pub fn active_id(&self) -> &str {
        &self.active_id
    }

    fn active_index(&self) -> usize {
        self.boards
            .iter()
            .position(|b| b.id == self.active_id)
            .unwrap_or(0)
    }

    pub fn active(&self) -> &Board {
        &self.boards[self.active_index()]
    }

    fn active_mut(&mut self) -> &mut Board {
        let index = self.active_index();
        &mut self.boards[index]
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Write the whole collection and the active id to storage
    pub fn persist(&mut self) -> Result<(), StorageError> {
        let json = serde_json::to_string(&self.boards)?;
        self.storage.write(BOARDS_STORAGE_KEY, &json)?;
        self.storage.write(ACTIVE_BOARD_STORAGE_KEY, &self.active_id)?;
        log::debug!("Persisted {} board(s), {} bytes", self.boards.len(), json.len());
        Ok(())
    }

    /// Write-through after a mutation; failures are logged, state stays in memory
    fn write_through(&mut self) {
        if let Err(e) = self.persist() {
            log::error!("Failed to persist boards: {}", e);
        }
    }

    // ------------------------------------------------------------------
    // Collection operations
    // ------------------------------------------------------------------

    /// Duplicate the active board's layout and content under a new name and activate it
    pub fn create(&mut self, name: &str) -> String {
        let name = if name.trim().is_empty() {
            self.config.default_board_name.clone()
        } else {
            name.to_string()
        };

        let board = self.active().duplicate(name);
        let id = board.id.clone();
        log::info!("Created board {} ({}) from {}", board.name, id, self.active_id);

        self.boards.push(board);
        self.active_id = id.clone();
        self.selected = None;
        self.write_through();
        id
    }

    pub fn rename(&mut self, id: &str, name: &str) -> bool {
        let Some(board) = self.boards.iter_mut().find(|b| b.id == id) else {
            return false;
        };
        board.name = name.to_string();
        board.touch();
        self.write_through();
        true
    }

    /// Delete a board; the last board is replaced by a fresh default one
    pub fn delete(&mut self, id: &str) -> bool {
        let Some(index) = self.boards.iter().position(|b| b.id == id) else {
            return false;
        };
        self.boards.remove(index);
        log::info!("Deleted board {}", id);

        if self.boards.is_empty() {
            self.boards
                .push(Board::new(self.config.default_board_name.clone(), &self.config));
        }
        if self.active_id == id {
            self.active_id = self.boards[0].id.clone();
            self.selected = None;
        }

        self.write_through();
        true
    }

    /// Switch the active board; unknown ids change nothing
    pub fn set_active(&mut self, id: &str) -> bool {
        if !self.boards.iter().any(|b| b.id == id) {
            return false;
        }
        if self.active_id != id {
            self.active_id = id.to_string();
            self.selected = None;
            self.write_through();
        }
        true
    }

    /// Copy the active board's content into another board, keeping its id, name and creation time
    pub fn overwrite(&mut self, target_id: &str) -> bool {
        if target_id == self.active_id {
            return false;
        }
        let source = self.active().clone();
        let Some(target) = self.boards.iter_mut().find(|b| b.id == target_id) else {
            return false;
        };

        target.rows = source.rows;
        target.columns = source.columns;
        target.categories = source.categories;
        target.cells = source.cells;
        target.used_cells = source.used_cells;
        target.touch();
        log::info!("Overwrote board {} with {}", target_id, self.active_id);

        self.write_through();
        true
    }

    // ------------------------------------------------------------------
    // Active board edits
    // ------------------------------------------------------------------

    fn edit_active<R>(&mut self, f: impl FnOnce(&mut Board, &BoardConfig) -> R) -> R {
        let config = self.config.clone();
        let result = f(self.active_mut(), &config);
        self.write_through();
        result
    }

    /// Run a mutation that reports whether anything changed; persist only then
    fn edit_active_if(&mut self, f: impl FnOnce(&mut Board) -> bool) -> bool {
        let changed = f(self.active_mut());
        if changed {
            self.write_through();
        }
        changed
    }

    pub fn add_row(&mut self) {
        self.edit_active(|board, config| board.add_row(config));
    }

    pub fn remove_row(&mut self) -> bool {
        self.edit_active_if(Board::remove_row)
    }

    pub fn add_column(&mut self) {
        self.edit_active(|board, config| board.add_column(config));
    }

    pub fn remove_column(&mut self) -> bool {
        self.edit_active_if(Board::remove_column)
    }

    pub fn add_row_at(&mut self, index: usize) {
        self.edit_active(|board, config| board.add_row_at(index, config));
    }

    pub fn remove_row_at(&mut self, index: usize) -> bool {
        self.edit_active_if(|board| board.remove_row_at(index))
    }

    pub fn add_column_at(&mut self, index: usize) {
        self.edit_active(|board, config| board.add_column_at(index, config));
    }

    pub fn remove_column_at(&mut self, index: usize) -> bool {
        self.edit_active_if(|board| board.remove_column_at(index))
    }

    pub fn set_category_at(&mut self, index: usize, value: &str) -> bool {
        self.edit_active_if(|board| board.set_category_at(index, value))
    }

    /// Replace a cell of the active board by `(row, col)`
    pub fn update_cell(&mut self, cell: Cell) -> bool {
        self.edit_active_if(|board| board.update_cell(cell))
    }

    pub fn set_cell_points(&mut self, row: usize, col: usize, points: u32) -> bool {
        self.edit_active_if(|board| board.set_cell_points(row, col, points))
    }

    pub fn mark_cell_used(&mut self, row: usize, col: usize) -> bool {
        self.edit_active_if(|board| board.mark_cell_used(row, col))
    }

    pub fn reset_played_cells(&mut self) -> usize {
        let cleared = self.active_mut().reset_played_cells();
        if cleared > 0 {
            self.write_through();
        }
        cleared
    }

    // ------------------------------------------------------------------
    // Play/edit flow
    // ------------------------------------------------------------------

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn set_edit_mode(&mut self, edit_mode: bool) {
        self.edit_mode = edit_mode;
    }

    pub fn select_cell(&mut self, key: Option<CellKey>) {
        self.selected = key;
    }

    /// Selected cell looked up on the active board; `None` if it no longer exists
    pub fn selected_cell(&self) -> Option<&Cell> {
        let key = self.selected?;
        self.active().cell(key.row, key.col)
    }

    /// Handle a click on a grid cell according to the current mode
    pub fn activate_cell(&mut self, row: usize, col: usize) -> CellActivation {
        let key = CellKey::new(row, col);
        if self.active().cell(row, col).is_none() {
            return CellActivation::Missing;
        }

        if self.edit_mode {
            self.selected = Some(key);
            return CellActivation::Edit(key);
        }

        if self.active().is_used(row, col) {
            return CellActivation::AlreadyUsed(key);
        }

        self.mark_cell_used(row, col);
        self.selected = Some(key);
        CellActivation::Play(key)
    }
}

fn load_boards(storage: &dyn BoardStorage) -> Result<Vec<Board>, StorageError> {
    let Some(json) = storage.read(BOARDS_STORAGE_KEY)? else {
        return Ok(Vec::new());
    };

    let mut boards: Vec<Board> = serde_json::from_str(&json)?;
    for board in &mut boards {
        let rekeyed = board.rekey_elements();
        if rekeyed > 0 {
            log::warn!("Board {}: assigned ids to {} elements", board.id, rekeyed);
        }
    }
    Ok(boards)
}
