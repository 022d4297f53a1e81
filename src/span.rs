use serde::{Deserialize, Serialize};

/// A source location: byte offset range plus the 1-based line/column of its
/// start. The front-end computes line/column once; the core never sees the
/// source text, so it cannot recover them from offsets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
    pub line: u32,
    pub col: u32,
}

impl Span {
    pub fn new(start: u32, end: u32, line: u32, col: u32) -> Self {
        Self {
            start,
            end,
            line,
            col,
        }
    }

    pub fn dummy() -> Self {
        Self {
            start: 0,
            end: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn merge(self, other: Span) -> Span {
        let (line, col) = if other.line < self.line {
            (other.line, other.col)
        } else {
            (self.line, self.col)
        };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line,
            col,
        }
    }
}
