//! Trivia Board WASM API
//!
//! JavaScript-facing surface of the board core.
//!
//! # Module Structure
//!
//! - `helpers`: serialization across the JS boundary and error conversion
//! - `editor`: the `BoardEditor` class exported to JavaScript

pub mod helpers;
pub mod editor;

pub use editor::BoardEditor;
