use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] rag_vector_store::VectorStoreError),

    #[error("Invalid search options: {0}")]
    InvalidOptions(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
