//! # RAG Search
//!
//! Ranking layer on top of the vector store: hybrid scoring, metadata
//! filtering, parent grouping and a bounded query cache.
//!
//! ## Pipeline
//!
//! ```text
//! candidates (LSH)
//!     │
//!     ├─> drop tombstoned / filtered records
//!     ├─> score: alpha * cosine + (1 - alpha) * token Jaccard
//!     ├─> sort: score desc, record id asc
//!     ├─> group by parent (optional, best chunk wins)
//!     └─> truncate to top_k ──> QueryCache
//! ```
//!
//! ## Example
//!
//! ```rust
//! use rag_search::{rank, MetadataFilter, SearchOptions};
//! use rag_vector_store::{DocumentEmbedding, DocumentMetadata, Record, RecordId};
//!
//! let record = Record::from_embedding(
//!     RecordId(0),
//!     DocumentEmbedding::new("kb:reset", 0, "Reset your password", vec![1.0, 0.0])
//!         .with_metadata(DocumentMetadata::default().department("Support")),
//! );
//!
//! let options = SearchOptions::new(3)
//!     .hybrid("password reset", 0.5)
//!     .with_filter(MetadataFilter::department("Support"));
//! let results = rank([&record], &[1.0, 0.0], &options);
//! assert_eq!(results[0].parent_external_id, "kb:reset");
//! ```

mod error;
mod filter;
mod hybrid;
mod pipeline;
mod query_cache;
mod types;

pub use error::{Result, SearchError};
pub use filter::MetadataFilter;
pub use hybrid::{fuse, jaccard, tokenize, HybridScorer, Score};
pub use pipeline::rank;
pub use query_cache::{CacheKey, QueryCache};
pub use types::{SearchOptions, SearchResult, DEFAULT_ALPHA};
