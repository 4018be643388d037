//! Source location spans.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Source location span with byte offsets and line/column positions.
///
/// Byte offsets are 0-indexed and end-exclusive; lines and columns are
/// 1-indexed, matching editor conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub start_line: usize,
    /// Start column (1-indexed).
    pub start_col: usize,
    /// End line (1-indexed).
    pub end_line: usize,
    /// End column (1-indexed).
    pub end_col: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: tree_sitter::Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            start_col: start.column + 1,
            end_line: end.row + 1,
            end_col: end.column + 1,
        }
    }

    /// A zero-width span at a byte offset, for synthetic positions.
    pub fn point(byte: usize, line: usize, col: usize) -> Self {
        Self {
            start_byte: byte,
            end_byte: byte,
            start_line: line,
            start_col: col,
            end_line: line,
            end_col: col,
        }
    }

    /// Whether the span is internally consistent (start does not exceed end).
    pub fn is_ordered(&self) -> bool {
        self.start_byte <= self.end_byte
    }

    /// Whether the span's byte range lies within a buffer of `len` bytes.
    pub fn fits(&self, len: usize) -> bool {
        self.is_ordered() && self.end_byte <= len
    }

    /// Whether this span's byte range overlaps another's.
    ///
    /// Ranges are end-exclusive, so adjacent spans do not overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start_byte < other.end_byte && other.start_byte < self.end_byte
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}
