//! Source location tracking

use serde::Serialize;

/// A span represents a range in the source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Span {
    /// Start byte offset
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
    /// File ID
    pub file_id: usize,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize, file_id: usize) -> Self {
        Self { start, end, file_id }
    }

    /// Create a dummy span (for builtins and tests)
    pub fn dummy() -> Self {
        Self { start: 0, end: 0, file_id: 0 }
    }

    /// Merge two spans
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            file_id: self.file_id,
        }
    }

    /// Get the length of the span
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the span is empty
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::dummy()
    }
}

/// Maps character offsets to 1-based row/column pairs.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Offset of the first character of every line
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, c) in source.chars().enumerate() {
            if c == '\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// Row and column (both 1-based) of a character offset
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let row = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        (row + 1, offset - self.line_starts[row] + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge() {
        let a = Span::new(4, 8, 1);
        let b = Span::new(2, 6, 1);
        assert_eq!(a.merge(&b), Span::new(2, 8, 1));
    }

    #[test]
    fn test_line_index() {
        let index = LineIndex::new("fn a() {}\nfn b() {\n  x\n}");
        assert_eq!(index.position(0), (1, 1));
        assert_eq!(index.position(3), (1, 4));
        assert_eq!(index.position(10), (2, 1));
        assert_eq!(index.position(21), (3, 3));
    }
}
