use crate::config::{ChunkingOptions, ChunkingStrategy};
use crate::error::Result;
use crate::types::TextChunk;
use unicode_segmentation::UnicodeSegmentation;

/// A pure text splitting policy.
///
/// Implementations must be deterministic: the same input always yields the
/// same sequence, and splitting has no side effects.
pub trait ChunkStrategy: Send + Sync {
    /// Stable name used in logs
    fn name(&self) -> &'static str;

    /// Split `text` into indexed spans. Empty input yields no spans.
    fn split(&self, text: &str) -> Vec<TextChunk>;
}

/// Build the strategy described by validated options
pub fn strategy_for(options: &ChunkingOptions) -> Result<Box<dyn ChunkStrategy>> {
    options.validate()?;
    match options.strategy {
        ChunkingStrategy::FixedChars => Ok(Box::new(FixedChars::new(
            options.chunk_size,
            options.chunk_overlap,
        ))),
    }
}

/// Fixed-size character windows.
///
/// Characters are extended grapheme clusters, so a window never cuts a
/// combining sequence in half.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedChars {
    size: usize,
    overlap: usize,
}

impl FixedChars {
    /// Callers validate `0 <= overlap < size` beforehand.
    #[must_use]
    pub const fn new(size: usize, overlap: usize) -> Self {
        Self { size, overlap }
    }
}

impl ChunkStrategy for FixedChars {
    fn name(&self) -> &'static str {
        ChunkingStrategy::FixedChars.as_str()
    }

    fn split(&self, text: &str) -> Vec<TextChunk> {
        if text.is_empty() || self.size == 0 {
            return Vec::new();
        }

        // Byte offset of every character boundary, plus the end of the text.
        let bounds: Vec<usize> = text
            .grapheme_indices(true)
            .map(|(offset, _)| offset)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_count = bounds.len() - 1;
        let stride = self.size.saturating_sub(self.overlap).max(1);

        let mut chunks = Vec::with_capacity(char_count / stride + 1);
        let mut start = 0;
        loop {
            let end = (start + self.size).min(char_count);
            chunks.push(TextChunk::new(
                chunks.len(),
                start,
                end,
                text[bounds[start]..bounds[end]].to_string(),
            ));
            if end == char_count {
                break;
            }
            start += stride;
        }

        chunks
    }
}
