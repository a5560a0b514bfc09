//! # RAG Vector Store
//!
//! Dense chunk records and approximate candidate generation for retrieval.
//!
//! ## Features
//!
//! - **Record table** with tombstones and in-place replacement
//! - **Banded random-hyperplane LSH** for sub-linear candidate lookup
//! - **Embedding capability** trait with a deterministic hash-based model
//!
//! ## Architecture
//!
//! ```text
//! DocumentEmbedding[]
//!     │
//!     ├──> VectorStore (dense ids, metadata, tombstones)
//!     │
//!     └──> LshIndex
//!            ├─> band 0: sign bits → bucket → {ids}
//!            ├─> ...
//!            └─> band N: sign bits → bucket → {ids}
//! ```
//!
//! ## Example
//!
//! ```rust
//! use rag_vector_store::{DocumentEmbedding, LshConfig, LshIndex, VectorStore};
//!
//! let mut store = VectorStore::new(2, true, 16);
//! let mut index = LshIndex::new(2, LshConfig::default()).unwrap();
//!
//! let id = store.add(DocumentEmbedding::new("doc:1", 0, "hello", vec![3.0, 4.0])).unwrap();
//! index.insert(id, &store.get(id).unwrap().vector).unwrap();
//!
//! let found = index.candidates(&[0.6, 0.8], 10).unwrap();
//! assert_eq!(found.ids, vec![id]);
//! ```

mod embeddings;
mod error;
mod lsh_index;
mod store;
mod types;
pub mod vector;

pub use embeddings::{EmbeddingModel, HashEmbeddingModel};
pub use error::{Result, VectorStoreError};
pub use lsh_index::{Candidates, LshConfig, LshIndex};
pub use store::VectorStore;
pub use types::{DocumentEmbedding, DocumentMetadata, Record, RecordId};
