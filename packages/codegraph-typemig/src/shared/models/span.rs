//! Source location types
//!
//! Byte offsets into a printed source file.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open byte range `[start, end)` in a source file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Create an empty range at offset 0
    pub fn zero() -> Self {
        Self::new(0, 0)
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `other` lies within `self` (equal ranges contain each other)
    pub fn contains(&self, other: &TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// `other` lies within `self` and is smaller
    pub fn strictly_contains(&self, other: &TextRange) -> bool {
        self.contains(other) && self != other
    }

    pub fn overlaps(&self, other: &TextRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
