use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};

/// Default span length, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 300;

/// Default number of characters shared by consecutive spans.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Configuration for text chunking behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingOptions {
    /// Chunking strategy to use
    pub strategy: ChunkingStrategy,

    /// Span length in characters (the last span may be shorter)
    pub chunk_size: usize,

    /// Characters shared between consecutive spans
    pub chunk_overlap: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            strategy: ChunkingStrategy::FixedChars,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingOptions {
    /// Fixed-size character windows with the given overlap
    #[must_use]
    pub const fn fixed_chars(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            strategy: ChunkingStrategy::FixedChars,
            chunk_size,
            chunk_overlap,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ChunkerError::invalid_config("chunk_size must be > 0"));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(ChunkerError::invalid_config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }

        Ok(())
    }

    /// Distance between the starts of two consecutive spans
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.chunk_size.saturating_sub(self.chunk_overlap)
    }
}

/// Strategy for chunking text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingStrategy {
    /// Fixed-size character windows with a fixed overlap
    #[default]
    #[serde(alias = "FixedChars")]
    FixedChars,
}

impl ChunkingStrategy {
    /// Get human-readable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FixedChars => "fixed_chars",
        }
    }
}
