/*!
# Source position types (Position, Span)

Centralized location types used across the analyzer. Lines and columns are
1-based, columns are counted in characters (not bytes) so Cyrillic identifiers
report the same column an editor shows.
*/

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position in source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }

    /// Начало файла.
    pub fn start() -> Self {
        Self::new(1, 1, 0)
    }

    /// Сдвинуть позицию вперёд на текст `text` (учитывая переводы строк).
    pub fn advance(self, text: &str) -> Self {
        let mut pos = self;
        for ch in text.chars() {
            if ch == '\n' {
                pos.line += 1;
                pos.column = 1;
            } else {
                pos.column += 1;
            }
        }
        pos.offset += text.len();
        pos
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Span in source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn point(at: Position) -> Self {
        Self::new(at, at)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Compact span representation (offset + length) within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackedSpan {
    pub start: u32,
    pub len: u32,
}

impl PackedSpan {
    pub fn new(start: u32, len: u32) -> Self { Self { start, len } }
    pub fn end(&self) -> u32 { self.start + self.len }
    pub fn as_range(&self) -> std::ops::Range<usize> { self.start as usize..self.end() as usize }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_counts_chars_and_lines() {
        let p = Position::start().advance("Если");
        assert_eq!(p.line, 1);
        assert_eq!(p.column, 5);
        assert_eq!(p.offset, "Если".len());

        let p = p.advance(" А\nБ");
        assert_eq!(p.line, 2);
        assert_eq!(p.column, 2);
    }

    #[test]
    fn span_display() {
        let span = Span::new(Position::new(3, 1, 0), Position::new(5, 4, 0));
        assert_eq!(span.to_string(), "3:1-5:4");
    }

    #[test]
    fn packed_span_range() {
        let ps = PackedSpan::new(3, 2);
        assert_eq!(ps.end(), 5);
        assert_eq!(ps.as_range(), 3..5);
    }
}
