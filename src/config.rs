//! Defaults for new boards, slide editing and persistence
//!
//! Compile-time constants live here next to `BoardConfig`, the runtime
//! knobs a host can override when it constructs an editor.

use serde::{Deserialize, Serialize};

/// Rows in a freshly created board
pub const DEFAULT_ROWS: usize = 5;

/// Columns (categories) in a freshly created board
pub const DEFAULT_COLUMNS: usize = 6;

/// Point value step; row `r` is worth `(r + 1) * step`
pub const DEFAULT_POINT_STEP: u32 = 100;

/// Label given to new categories
pub const DEFAULT_CATEGORY: &str = "Category";

/// Name used when a board is created without one
pub const DEFAULT_BOARD_NAME: &str = "Untitled Board";

/// Font size applied to text elements that carry no explicit value
pub const DEFAULT_FONT_SIZE: f64 = 16.0;

/// Smallest font size the editor will shrink a text element to
pub const MIN_FONT_SIZE: f64 = 8.0;

/// Increment used by the A+/A- controls
pub const FONT_SIZE_STEP: f64 = 2.0;

/// Storage key holding the serialized board collection
pub const BOARDS_STORAGE_KEY: &str = "jeopardy-boards";

/// Storage key holding the id of the active board
pub const ACTIVE_BOARD_STORAGE_KEY: &str = "jeopardy-active-board";

/// IndexedDB database holding media blobs in the browser build
pub const MEDIA_DATABASE_NAME: &str = "jeopardy-media";

/// Runtime configuration for board creation
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BoardConfig {
    /// Rows of a default board
    pub rows: usize,

    /// Columns of a default board
    pub columns: usize,

    /// Points added per row
    pub point_step: u32,

    /// Label for newly inserted categories
    pub default_category: String,

    /// Fallback board name
    pub default_board_name: String,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            columns: DEFAULT_COLUMNS,
            point_step: DEFAULT_POINT_STEP,
            default_category: DEFAULT_CATEGORY.to_string(),
            default_board_name: DEFAULT_BOARD_NAME.to_string(),
        }
    }
}

impl BoardConfig {
    /// Points for a cell in the given row, saturating at `u32::MAX`
    pub fn points_for_row(&self, row: usize) -> u32 {
        let rank = u32::try_from(row).unwrap_or(u32::MAX).saturating_add(1);
        rank.saturating_mul(self.point_step)
    }

    /// Rows and columns never drop below one, whatever the host asked for
    pub fn normalized(mut self) -> Self {
        self.rows = self.rows.max(1);
        self.columns = self.columns.max(1);
        self
    }
}
