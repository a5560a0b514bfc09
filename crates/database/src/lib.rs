//! # RAG Database
//!
//! Retrieval store for generation pipelines: chunked documents, approximate
//! nearest-neighbour lookup, hybrid ranking, snapshots and metrics.
//!
//! ## Pipeline
//!
//! ```text
//! write:  text ──> Chunker ──> EmbeddingModel ──> [write lock] VectorStore + LshIndex
//!
//! read:   query vector (+ text)
//!            │
//!            ├──> QueryCache ── hit ──> results
//!            │
//!            └──> [read lock] LshIndex candidates
//!                    └─> hybrid score ─> filter ─> group ─> top_k ──> QueryCache
//!
//! persist: snapshot (records + counters) ──> tmp file ──> rename
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use rag_db::{Database, DatabaseConfig, DocumentMetadata, HashEmbeddingModel, MetadataFilter, SearchOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let model = HashEmbeddingModel::new(64)?;
//!     let db = Database::new(DatabaseConfig::new(64))?;
//!
//!     db.upsert_text_document(
//!         "doc:password_reset",
//!         "To reset your password, go to Settings -> Security -> Reset Password.",
//!         DocumentMetadata::default().department("Support").active(true),
//!         &model,
//!     )
//!     .await?;
//!
//!     let query = "How can I reset my password?";
//!     let options = SearchOptions::new(5)
//!         .hybrid(query, 0.7)
//!         .with_filter(MetadataFilter::department("Support"))
//!         .grouped();
//!     for hit in db.search(&model.embed_sync(query), &options)? {
//!         println!("{} score={:.3} chunk={}", hit.parent_external_id, hit.score, hit.evidence_chunk_index);
//!     }
//!
//!     db.save(std::env::temp_dir()).await?;
//!     Ok(())
//! }
//! ```

mod config;
mod database;
mod error;
mod metrics;
mod persistence;
mod stats;

pub use config::{DatabaseConfig, DatabaseOptions};
pub use database::Database;
pub use error::{DatabaseError, Result};
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use persistence::{
    parse_snapshot, read_snapshot, resolve_snapshot_path, write_snapshot, PersistedLsh,
    PersistedRecord, Snapshot, SNAPSHOT_FILE_NAME, SNAPSHOT_FORMAT_VERSION,
};
pub use stats::UpsertReport;

pub use rag_chunker::{ChunkingOptions, ChunkingStrategy};
pub use rag_search::{MetadataFilter, SearchOptions, SearchResult};
pub use rag_vector_store::{
    DocumentEmbedding, DocumentMetadata, EmbeddingModel, HashEmbeddingModel, LshConfig, Record,
    RecordId,
};
