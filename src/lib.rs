//! Trivia Board WASM Module
//!
//! Core of a Jeopardy-style board editor: the board grid with its structural
//! edits, slide content, the media store, the staged-cell edit session and
//! the persisted board registry.

pub mod api;
pub mod config;
pub mod error;
pub mod media;
pub mod models;
pub mod registry;
pub mod session;

// Re-export commonly used types
pub use api::BoardEditor;
pub use config::BoardConfig;
pub use error::{MediaError, PolicyViolation, StorageError, UploadError, ValidationError};
pub use media::{MediaBlob, MediaLibrary, MediaStore, MediaView, MemoryMediaStore};
pub use models::{Board, Cell, CellKey, Element, ElementKind, ElementPatch, Slide};
pub use registry::{BoardRegistry, BoardStorage, MemoryStorage};
pub use session::{CloseOutcome, CommitOutcome, EditSession};

use wasm_bindgen::prelude::*;

// This is like the `main` function, but for WASM modules.
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    #[cfg(feature = "console_log")]
    if let Err(e) = console_log::init_with_level(log::Level::Debug) {
        web_sys::console::warn_1(&format!("Logger already initialized: {}", e).into());
    }

    log::info!("Trivia Board WASM module initialized");
}
