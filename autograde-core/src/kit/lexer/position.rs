//! Source position tracking

/// A 1-based line/column pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Coordinate {
    pub line: usize,
    pub column: usize,
}

impl Coordinate {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Start of a file
    pub fn start() -> Self {
        Self { line: 1, column: 1 }
    }

    /// Advance past one character
    pub fn advance(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Source span (start inclusive, end exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: Coordinate,
    pub end: Coordinate,
}

impl Span {
    pub fn range(start: Coordinate, end: Coordinate) -> Self {
        Self { start, end }
    }

    pub fn at(pos: Coordinate) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }
}
