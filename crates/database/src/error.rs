use rag_chunker::ChunkerError;
use rag_search::SearchError;
use rag_vector_store::{RecordId, VectorStoreError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(String),

    #[error("Vector store error: {0}")]
    VectorStoreError(VectorStoreError),

    #[error("Search error: {0}")]
    SearchError(SearchError),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector component {index} is not a finite number")]
    NonFiniteVector { index: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Record not found: {0}")]
    NotFound(RecordId),

    #[error("Chunk {chunk_index} of '{parent}' appears more than once in the batch")]
    DuplicateChunk { parent: String, chunk_index: usize },

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Unsupported snapshot format version {found} (expected {expected})")]
    FormatVersionMismatch { found: u32, expected: u32 },

    #[error("Snapshot does not match the live configuration: {0}")]
    ConfigMismatch(String),
}

impl DatabaseError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn config_mismatch(msg: impl Into<String>) -> Self {
        Self::ConfigMismatch(msg.into())
    }
}

// Lift the taxonomy-level variants out of the lower crates so callers can match
// on `DimensionMismatch` / `NotFound` regardless of which layer raised them.
impl From<VectorStoreError> for DatabaseError {
    fn from(err: VectorStoreError) -> Self {
        match err {
            VectorStoreError::DimensionMismatch { expected, actual } => {
                Self::DimensionMismatch { expected, actual }
            }
            VectorStoreError::NotFound(id) => Self::NotFound(id),
            VectorStoreError::NonFiniteComponent { index } => Self::NonFiniteVector { index },
            VectorStoreError::InvalidConfig(msg) => Self::InvalidConfiguration(msg),
            VectorStoreError::EmbeddingError(msg) => Self::EmbeddingError(msg),
            other => Self::VectorStoreError(other),
        }
    }
}

impl From<ChunkerError> for DatabaseError {
    fn from(err: ChunkerError) -> Self {
        match err {
            ChunkerError::InvalidConfig(msg) => Self::InvalidConfiguration(msg),
        }
    }
}

impl From<SearchError> for DatabaseError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::VectorStoreError(inner) => inner.into(),
            SearchError::SerializationError(inner) => Self::SerializationError(inner),
            other => Self::SearchError(other),
        }
    }
}
