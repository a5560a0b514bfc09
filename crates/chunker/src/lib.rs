//! # RAG Chunker
//!
//! Splits raw document text into overlapping, indexed spans. Every span
//! becomes one stored record tied to its parent document.
//!
//! ## Example
//!
//! ```rust
//! use rag_chunker::{Chunker, ChunkingOptions};
//!
//! let chunker = Chunker::new(&ChunkingOptions::fixed_chars(32, 8)).unwrap();
//! let chunks = chunker.chunk("To reset your password, go to Settings -> Security.");
//!
//! for chunk in chunks {
//!     println!("#{} [{}..{}] {}", chunk.chunk_index, chunk.start, chunk.end, chunk.text);
//! }
//! ```

mod chunker;
mod config;
mod error;
mod strategy;
mod types;

pub use chunker::Chunker;
pub use config::{ChunkingOptions, ChunkingStrategy, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use error::{ChunkerError, Result};
pub use strategy::{strategy_for, ChunkStrategy, FixedChars};
pub use types::TextChunk;
