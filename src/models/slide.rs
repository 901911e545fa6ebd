//! Slide and element types
//!
//! A cell's content is an ordered list of slides. Each slide is a free-form
//! canvas of positioned elements; text elements carry their text inline,
//! media elements carry a reference string (direct URL, data URI, or a media
//! store reference).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::config::{DEFAULT_FONT_SIZE, MIN_FONT_SIZE};

/// Width given to elements persisted without one
pub const DEFAULT_ELEMENT_WIDTH: f64 = 200.0;

/// Height given to elements persisted without one
pub const DEFAULT_ELEMENT_HEIGHT: f64 = 100.0;

fn default_width() -> f64 {
    DEFAULT_ELEMENT_WIDTH
}

fn default_height() -> f64 {
    DEFAULT_ELEMENT_HEIGHT
}

/// Generate an opaque element id (never reused)
pub fn new_element_id() -> String {
    Uuid::new_v4().to_string()
}

/// What an element renders as
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Text,
    Image,
    Audio,
    Video,
}

/// Horizontal alignment of a text element
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// One positioned item on a slide canvas
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    /// Opaque token, unique within its slide; assigned on insertion
    #[serde(default)]
    pub id: String,

    pub kind: ElementKind,

    /// Literal text for text elements, a reference string otherwise
    #[serde(default)]
    pub content: String,

    /// Position and size in canvas pixels; not bounds-checked
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,

    /// Absent on records created before font sizing existed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
}

impl Element {
    /// Create an empty text box at the given position
    pub fn text(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: new_element_id(),
            kind: ElementKind::Text,
            content: String::new(),
            x,
            y,
            width,
            height,
            font_size: Some(DEFAULT_FONT_SIZE),
            text_align: None,
        }
    }

    /// Create a media element pointing at `content`
    pub fn media(kind: ElementKind, content: String, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: new_element_id(),
            kind,
            content,
            x,
            y,
            width,
            height,
            font_size: None,
            text_align: None,
        }
    }

    /// Font size to render with, falling back to the default
    pub fn effective_font_size(&self) -> f64 {
        self.font_size.unwrap_or(DEFAULT_FONT_SIZE)
    }

    pub fn effective_text_align(&self) -> TextAlign {
        self.text_align.unwrap_or_default()
    }

    /// Merge a partial update into this element
    pub fn apply(&mut self, patch: &ElementPatch) {
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(width) = patch.width {
            self.width = width;
        }
        if let Some(height) = patch.height {
            self.height = height;
        }
        if let Some(font_size) = patch.font_size {
            self.font_size = Some(font_size.max(MIN_FONT_SIZE));
        }
        if let Some(text_align) = patch.text_align {
            self.text_align = Some(text_align);
        }
    }

    /// Change the font size by `delta`, never going below the minimum
    pub fn adjust_font_size(&mut self, delta: f64) -> f64 {
        let size = (self.effective_font_size() + delta).max(MIN_FONT_SIZE);
        self.font_size = Some(size);
        size
    }
}

/// Partial update for an element; `None` fields are left untouched
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementPatch {
    pub content: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub font_size: Option<f64>,
    pub text_align: Option<TextAlign>,
}

impl ElementPatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Patch produced by a drag: position only
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    /// Patch produced by a resize: resizing from a corner also moves the origin
    pub fn bounds(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            width: Some(width),
            height: Some(height),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One page of a cell's content; display order is element order
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Slide {
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Slide {
    /// A slide holding a single empty text box, as new cells and slides start
    pub fn with_default_text() -> Self {
        Self {
            elements: vec![Element::text(20.0, 20.0, DEFAULT_ELEMENT_WIDTH, DEFAULT_ELEMENT_HEIGHT)],
        }
    }

    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|el| el.id == id)
    }

    pub fn element_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.elements.iter_mut().find(|el| el.id == id)
    }

    /// Append an element under a freshly generated id and return that id
    pub fn push_element(&mut self, mut element: Element) -> String {
        element.id = new_element_id();
        let id = element.id.clone();
        self.elements.push(element);
        id
    }

    /// Returns false when no element has this id
    pub fn update_element(&mut self, id: &str, patch: &ElementPatch) -> bool {
        match self.element_mut(id) {
            Some(element) => {
                element.apply(patch);
                true
            }
            None => false,
        }
    }

    pub fn remove_element(&mut self, id: &str) -> bool {
        let before = self.elements.len();
        self.elements.retain(|el| el.id != id);
        self.elements.len() != before
    }

    /// Give a fresh id to every element whose id is empty or repeats an
    /// earlier one; returns how many were re-keyed
    pub fn rekey_elements(&mut self) -> usize {
        let mut seen = HashSet::new();
        let mut rekeyed = 0;
        for element in &mut self.elements {
            if element.id.is_empty() || !seen.insert(element.id.clone()) {
                element.id = new_element_id();
                seen.insert(element.id.clone());
                rekeyed += 1;
            }
        }
        rekeyed
    }
}
