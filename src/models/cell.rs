//! Board cells and their positional keys

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::slide::Slide;

/// Grid axis a structural edit operates on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Row,
    Column,
}

/// Position of a cell on the grid, written `"row-col"` in persisted play state
///
/// Ordering is row-major, which is also the order cells are rendered in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey {
    pub row: usize,
    pub col: usize,
}

impl CellKey {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    pub fn coord(&self, axis: Axis) -> usize {
        match axis {
            Axis::Row => self.row,
            Axis::Column => self.col,
        }
    }

    /// Copy of this key with the coordinate on `axis` replaced
    pub fn with_coord(mut self, axis: Axis, value: usize) -> Self {
        match axis {
            Axis::Row => self.row = value,
            Axis::Column => self.col = value,
        }
        self
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.row, self.col)
    }
}

impl FromStr for CellKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (row, col) = s
            .split_once('-')
            .ok_or_else(|| format!("cell key {:?} is not of the form row-col", s))?;
        let row = row
            .parse()
            .map_err(|e| format!("invalid row in cell key {:?}: {}", s, e))?;
        let col = col
            .parse()
            .map_err(|e| format!("invalid column in cell key {:?}: {}", s, e))?;
        Ok(Self { row, col })
    }
}

impl Serialize for CellKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CellKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One question slot on the board
///
/// Identity is the `(row, col)` pair; there is no separate id.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
    pub points: u32,
    #[serde(default)]
    pub slides: Vec<Slide>,
}

impl Cell {
    /// Create a cell with a single default slide
    pub fn new(row: usize, col: usize, points: u32) -> Self {
        Self {
            row,
            col,
            points,
            slides: vec![Slide::with_default_text()],
        }
    }

    pub fn key(&self) -> CellKey {
        CellKey::new(self.row, self.col)
    }

    pub fn coord(&self, axis: Axis) -> usize {
        self.key().coord(axis)
    }

    pub(crate) fn set_coord(&mut self, axis: Axis, value: usize) {
        match axis {
            Axis::Row => self.row = value,
            Axis::Column => self.col = value,
        }
    }
}
