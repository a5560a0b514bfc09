use crate::config::ChunkingOptions;
use crate::error::Result;
use crate::strategy::{strategy_for, ChunkStrategy};
use crate::types::TextChunk;

/// Main chunker interface for splitting documents
pub struct Chunker {
    strategy: Box<dyn ChunkStrategy>,
}

impl Chunker {
    /// Create a chunker from validated options
    pub fn new(options: &ChunkingOptions) -> Result<Self> {
        let strategy = strategy_for(options)?;
        Ok(Self { strategy })
    }

    /// Use a custom splitting policy
    #[must_use]
    pub fn with_strategy(strategy: Box<dyn ChunkStrategy>) -> Self {
        Self { strategy }
    }

    /// Name of the active strategy
    #[must_use]
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Split text into indexed spans
    #[must_use]
    pub fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let chunks = self.strategy.split(text);
        log::debug!(
            "Chunked {} bytes into {} spans ({})",
            text.len(),
            chunks.len(),
            self.strategy.name()
        );
        chunks
    }

    /// One-shot chunking with explicit options
    pub fn chunk_with(text: &str, options: &ChunkingOptions) -> Result<Vec<TextChunk>> {
        Ok(Self::new(options)?.chunk(text))
    }
}

impl std::fmt::Debug for Chunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunker")
            .field("strategy", &self.strategy.name())
            .finish()
    }
}
