//! Source positions.

use std::fmt;

/// A line/column location in script source, both 1-based.
///
/// Compact (8 bytes) and `Copy`; every statement and clause stores one.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, PartialOrd, Ord)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    /// Placeholder for synthesized nodes that have no source.
    pub const DUMMY: Position = Position { line: 0, column: 0 };

    #[inline]
    pub const fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }

    /// Whether this is the placeholder position.
    #[inline]
    pub const fn is_dummy(self) -> bool {
        self.line == 0 && self.column == 0
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Capability shared by every node in the statement tree.
pub trait HasPosition {
    /// Location of the node in source.
    fn position(&self) -> Position;
}

impl HasPosition for Position {
    #[inline]
    fn position(&self) -> Position {
        *self
    }
}
