use crate::types::RecordId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VectorStoreError {
    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Record not found: {0}")]
    NotFound(RecordId),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector component {index} is not a finite number")]
    NonFiniteComponent { index: usize },

    #[error("Chunk {chunk_index} of '{parent}' is already stored as record {existing}")]
    DuplicateChunk {
        parent: String,
        chunk_index: usize,
        existing: RecordId,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Corrupt record table: {0}")]
    CorruptRecords(String),
}

impl VectorStoreError {
    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::EmbeddingError(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
