//! Models module for the trivia board editor
//!
//! This module contains the persisted data model: boards, their cells,
//! and the slides and elements inside each cell.

pub mod board;
pub mod cell;
pub mod slide;

// Re-export commonly used types
pub use board::{now_millis, Board};
pub use cell::{Axis, Cell, CellKey};
pub use slide::{new_element_id, Element, ElementKind, ElementPatch, Slide, TextAlign};
