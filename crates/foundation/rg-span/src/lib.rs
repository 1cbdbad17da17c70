//! Source locations attached to elaborated operations and diagnostics.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A unique identifier for a source file
#[derive(Copy, Clone, Debug, Default, Display, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[display("#{_0}")]
pub struct FileId(pub u32);

impl FileId {
    /// Creates a file identifier.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Index usable with `codespan_reporting::files::SimpleFiles`.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A byte offset span in a source file
#[derive(
    Copy, Clone, Debug, Default, Display, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize,
)]
#[display("{start}..{end}")]
pub struct Span {
    /// Start offset (inclusive).
    pub start: u32,
    /// End offset (exclusive).
    pub end: u32,
}

impl Span {
    /// Creates a span from two byte offsets.
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// The span as a byte range.
    pub fn range(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }

    /// Length in bytes.
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Whether the span covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Smallest span covering both `self` and `other`.
    #[must_use]
    pub fn to(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// A span with associated file
#[derive(Copy, Clone, Debug, Default, Display, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[display("{file}:{span}")]
pub struct FileSpan {
    /// File the span points into.
    pub file: FileId,
    /// Byte range inside the file.
    pub span: Span,
}

impl FileSpan {
    /// Attaches a span to a file.
    pub fn new(file: FileId, span: Span) -> Self {
        Self { file, span }
    }

    /// The span as a byte range.
    pub fn range(&self) -> Range<usize> {
        self.span.range()
    }
}
