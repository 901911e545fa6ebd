//! Error types for storage, media and uploads
//!
//! Structural no-ops and missing ids are not errors in this crate; they are
//! reported through `bool`/`Option` returns. The enums here cover the
//! failures a caller has to surface to the user.

use thiserror::Error;

use crate::media::MediaKind;

/// Failures of the blob store or the handle registry
#[derive(Debug, Error)]
pub enum MediaError {
    /// Id is empty or contains characters the backend cannot key on
    #[error("Invalid media id: {0:?}")]
    InvalidId(String),

    /// Underlying read or write failed
    #[error("Media storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A dereferenceable handle could not be created
    #[error("Could not create media handle: {0}")]
    Handle(String),

    /// Browser storage (IndexedDB) rejected the request
    #[error("Media backend error: {0}")]
    Backend(String),
}

/// Failures of the durable board storage
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Board storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Board collection is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),

    /// Backend cannot be reached (no window, storage disabled, quota)
    #[error("Board storage unavailable: {0}")]
    Unavailable(String),
}

/// Upload rejected by the media policy before reaching the store
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyViolation {
    #[error("Unsupported file type")]
    UnsupportedType(String),

    #[error("File too large. Max for {kind}: {max_mb}MB")]
    TooLarge {
        kind: MediaKind,
        size: u64,
        max_mb: u64,
    },
}

/// Failure of an upload or paste into an edit session
#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("No cell is open for editing")]
    NotEditing,

    #[error("Slide {0} does not exist")]
    NoSuchSlide(usize),

    /// The session that started the upload was closed before it was placed
    #[error("The editor was closed before the upload finished")]
    SessionClosed,
}

/// Board invariant violations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Expected {expected} categories, found {found}")]
    CategoryCount { expected: usize, found: usize },

    #[error("Expected {expected} cells, found {found}")]
    CellCount { expected: usize, found: usize },

    #[error("Cell ({row}, {col}) lies outside the {rows}x{columns} grid")]
    OutOfGrid {
        row: usize,
        col: usize,
        rows: usize,
        columns: usize,
    },

    #[error("Cell ({row}, {col}) appears more than once")]
    DuplicateCell { row: usize, col: usize },

    #[error("Cell ({row}, {col}) has no slides")]
    EmptyCell { row: usize, col: usize },
}
