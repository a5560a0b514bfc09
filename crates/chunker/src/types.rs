use serde::{Deserialize, Serialize};

/// One span of a parent document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextChunk {
    /// Position of this span within its document (0-based)
    pub chunk_index: usize,

    /// Offset of the first character (inclusive)
    pub start: usize,

    /// Offset past the last character (exclusive)
    pub end: usize,

    /// The span text
    pub text: String,
}

impl TextChunk {
    /// Create a new chunk
    #[must_use]
    pub const fn new(chunk_index: usize, start: usize, end: usize, text: String) -> Self {
        Self {
            chunk_index,
            start,
            end,
            text,
        }
    }

    /// Number of characters in this span
    #[must_use]
    pub const fn char_len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if the span covers a character offset
    #[must_use]
    pub const fn contains_offset(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }
}
