use std::fmt;

use miette::SourceSpan;

/// A region of the source text, as byte offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A span covering a single byte
    pub fn single(pos: usize) -> Self {
        Self::new(pos, pos + 1)
    }

    /// An empty span marking a position (e.g. end of input)
    pub fn marker(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    /// The smallest span containing both `self` and `other`
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        (span.start, span.end - span.start).into()
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
