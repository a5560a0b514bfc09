use crate::config::DatabaseConfig;
use crate::error::{DatabaseError, Result};
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::persistence::{read_snapshot, resolve_snapshot_path, write_snapshot, Snapshot};
use crate::stats::UpsertReport;
use parking_lot::RwLock;
use rag_chunker::{Chunker, ChunkingOptions};
use rag_search::{rank, CacheKey, QueryCache, SearchOptions, SearchResult};
use rag_vector_store::vector::{first_non_finite, normalized};
use rag_vector_store::{
    DocumentEmbedding, DocumentMetadata, EmbeddingModel, LshIndex, Record, RecordId, VectorStore,
};
use std::borrow::Cow;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Record table and LSH buckets, always mutated together under one lock.
#[derive(Debug)]
struct IndexState {
    store: VectorStore,
    lsh: LshIndex,
}

impl IndexState {
    fn empty(config: &DatabaseConfig) -> Result<Self> {
        Ok(Self {
            store: VectorStore::new(
                config.dimension,
                config.options.normalize_vectors_on_add,
                config.options.initial_capacity,
            ),
            lsh: LshIndex::new(config.dimension, config.lsh)?,
        })
    }

    fn from_records(config: &DatabaseConfig, records: Vec<Record>) -> Result<Self> {
        let store = VectorStore::from_records(
            config.dimension,
            config.options.normalize_vectors_on_add,
            records,
        )?;
        let mut lsh = LshIndex::new(config.dimension, config.lsh)?;
        for record in store.iter_active() {
            lsh.insert(record.id, &record.vector)?;
        }
        Ok(Self { store, lsh })
    }

    /// Fails before touching anything if `additions` new ids would not fit.
    fn ensure_room(&self, additions: usize) -> Result<()> {
        let needed = self.store.len().saturating_add(additions);
        if u32::try_from(needed).is_err() {
            return Err(DatabaseError::invalid_config(format!(
                "record table cannot hold {needed} records"
            )));
        }
        Ok(())
    }

    fn insert(&mut self, embedding: DocumentEmbedding) -> Result<RecordId> {
        let id = self.store.add(embedding)?;
        let vector = &self.store.get(id)?.vector;
        self.lsh.insert(id, vector)?;
        Ok(id)
    }

    fn replace(&mut self, id: RecordId, embedding: DocumentEmbedding) -> Result<()> {
        let previous = self.store.replace(id, embedding)?;
        self.lsh.remove(id, &previous.vector)?;
        let vector = &self.store.get(id)?.vector;
        self.lsh.insert(id, vector)?;
        Ok(())
    }

    fn tombstone(&mut self, id: RecordId) -> Result<bool> {
        if !self.store.tombstone(id)? {
            return Ok(false);
        }
        let vector = &self.store.get(id)?.vector;
        self.lsh.remove(id, vector)?;
        Ok(true)
    }

    fn compact(&mut self) -> Result<usize> {
        let removed = self.store.compact();
        self.lsh.clear();
        for record in self.store.iter_active() {
            self.lsh.insert(record.id, &record.vector)?;
        }
        Ok(removed)
    }
}

/// Retrieval database: chunked documents, LSH candidate lookup and hybrid
/// ranking behind one handle.
///
/// Reads run in parallel under a shared lock; ingestion, tombstoning and
/// compaction take the write lock, so readers never see a record that is in
/// the table but missing from its buckets. Share it between tasks with
/// `Arc<Database>`.
#[derive(Debug)]
pub struct Database {
    config: DatabaseConfig,
    state: RwLock<IndexState>,
    cache: QueryCache,
    metrics: MetricsCollector,
    persistence: tokio::sync::Mutex<()>,
}

impl Database {
    pub fn new(config: DatabaseConfig) -> Result<Self> {
        config.validate()?;
        let state = IndexState::empty(&config)?;
        log::info!(
            "Database ready: dim={}, lsh={}x{} (seed {}), cache={}",
            config.dimension,
            config.lsh.bands,
            config.lsh.bits_per_band,
            config.lsh.seed,
            config.options.query_cache_capacity
        );
        Ok(Self {
            cache: QueryCache::new(config.options.query_cache_capacity),
            state: RwLock::new(state),
            metrics: MetricsCollector::new(),
            persistence: tokio::sync::Mutex::new(()),
            config,
        })
    }

    pub const fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Right length and no NaN or infinite components.
    fn check_vector(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.config.dimension {
            return Err(DatabaseError::DimensionMismatch {
                expected: self.config.dimension,
                actual: vector.len(),
            });
        }
        if let Some(index) = first_non_finite(vector) {
            return Err(DatabaseError::NonFiniteVector { index });
        }
        Ok(())
    }

    /// Chunk, embed and store a document with the default chunking.
    pub async fn upsert_text_document(
        &self,
        external_id: &str,
        text: &str,
        metadata: DocumentMetadata,
        model: &dyn EmbeddingModel,
    ) -> Result<UpsertReport> {
        let chunking = self.config.options.default_chunking.clone();
        self.upsert_text_document_with(external_id, text, metadata, model, &chunking)
            .await
    }

    /// Chunk, embed and store a document, replacing any previous version.
    ///
    /// Chunk `i` reuses the record id previously holding chunk `i` of the same
    /// document; chunks beyond the new count are tombstoned. All embedding
    /// happens before the index is touched, so dropping the future or an
    /// embedding failure leaves the stored document unchanged.
    pub async fn upsert_text_document_with(
        &self,
        external_id: &str,
        text: &str,
        metadata: DocumentMetadata,
        model: &dyn EmbeddingModel,
        chunking: &ChunkingOptions,
    ) -> Result<UpsertReport> {
        if model.dimension() != self.config.dimension {
            return Err(DatabaseError::DimensionMismatch {
                expected: self.config.dimension,
                actual: model.dimension(),
            });
        }

        let chunks = Chunker::new(chunking)?.chunk(text);
        let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
        let vectors = model.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(DatabaseError::EmbeddingError(format!(
                "model returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let mut embeddings = Vec::with_capacity(chunks.len());
        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            self.check_vector(&vector)?;
            embeddings.push(
                DocumentEmbedding::new(external_id, chunk.chunk_index, chunk.text, vector)
                    .with_metadata(metadata.clone()),
            );
        }

        let report = self.commit_document(external_id, embeddings)?;
        log::debug!(
            "Upserted '{}': {} chunks ({} replaced, {} inserted, {} tombstoned)",
            external_id,
            report.chunks,
            report.replaced,
            report.inserted,
            report.tombstoned
        );
        Ok(report)
    }

    fn commit_document(
        &self,
        external_id: &str,
        embeddings: Vec<DocumentEmbedding>,
    ) -> Result<UpsertReport> {
        let mut state = self.state.write();
        let previous = state.store.parent_chunks(external_id);
        let additions = embeddings
            .iter()
            .filter(|e| state.store.find_active(external_id, e.chunk_index).is_none())
            .count();
        state.ensure_room(additions)?;

        let mut report = UpsertReport::new();
        report.chunks = embeddings.len();
        for embedding in embeddings {
            match state.store.find_active(external_id, embedding.chunk_index) {
                Some(id) => {
                    state.replace(id, embedding)?;
                    report.add_replaced(id);
                }
                None => {
                    let id = state.insert(embedding)?;
                    self.metrics.on_insert();
                    report.add_inserted(id);
                }
            }
        }

        for (chunk_index, id) in previous {
            if chunk_index >= report.chunks && state.tombstone(id)? {
                self.metrics.on_tombstone();
                report.add_tombstoned(1);
            }
        }
        Ok(report)
    }

    /// Store pre-embedded chunks as one indivisible write.
    ///
    /// A chunk whose `(parent, chunk_index)` is already active replaces that
    /// record in place. The whole batch is validated first: a wrong dimension,
    /// a non-finite component or a key repeated inside the batch rejects it
    /// without storing anything.
    pub fn add_batch(&self, embeddings: Vec<DocumentEmbedding>) -> Result<UpsertReport> {
        let mut keys: HashSet<(&str, usize)> = HashSet::with_capacity(embeddings.len());
        for embedding in &embeddings {
            self.check_vector(&embedding.vector)?;
            if !keys.insert((embedding.parent_external_id.as_str(), embedding.chunk_index)) {
                return Err(DatabaseError::DuplicateChunk {
                    parent: embedding.parent_external_id.clone(),
                    chunk_index: embedding.chunk_index,
                });
            }
        }
        drop(keys);

        let mut state = self.state.write();
        let additions = embeddings
            .iter()
            .filter(|e| {
                state
                    .store
                    .find_active(&e.parent_external_id, e.chunk_index)
                    .is_none()
            })
            .count();
        state.ensure_room(additions)?;

        let mut report = UpsertReport::new();
        report.chunks = embeddings.len();
        for embedding in embeddings {
            match state
                .store
                .find_active(&embedding.parent_external_id, embedding.chunk_index)
            {
                Some(id) => {
                    state.replace(id, embedding)?;
                    report.add_replaced(id);
                }
                None => {
                    let id = state.insert(embedding)?;
                    report.add_inserted(id);
                }
            }
        }
        self.metrics.on_insert_many(report.inserted as u64);
        drop(state);

        log::debug!(
            "Batch stored: {} inserted, {} replaced",
            report.inserted,
            report.replaced
        );
        Ok(report)
    }

    /// Top-k search for a query embedding.
    ///
    /// Cached results are returned as-is, even if the index changed since
    /// they were computed.
    pub fn search(&self, query_vector: &[f32], options: &SearchOptions) -> Result<Vec<SearchResult>> {
        let started = Instant::now();
        options.validate()?;
        self.check_vector(query_vector)?;

        let query: Cow<'_, [f32]> = if self.config.options.normalize_query_on_search {
            Cow::Owned(normalized(query_vector))
        } else {
            Cow::Borrowed(query_vector)
        };

        let key = if self.cache.is_enabled() {
            Some(CacheKey::new(&query, options)?)
        } else {
            None
        };
        if let Some(hit) = key.as_ref().and_then(|key| self.cache.get(key)) {
            self.metrics.on_cache_hit();
            self.metrics.on_query(started.elapsed());
            return Ok(hit.as_ref().clone());
        }

        let results = {
            let state = self.state.read();
            let candidates = state
                .lsh
                .candidates(&query, self.config.lsh.max_candidates)?;
            log::debug!(
                "Search: {} candidates (full scan: {})",
                candidates.ids.len(),
                candidates.full_scan
            );
            rank(
                candidates
                    .ids
                    .iter()
                    .filter_map(|id| state.store.get(*id).ok()),
                &query,
                options,
            )
        };

        if let Some(key) = key {
            self.cache.put(key, Arc::new(results.clone()));
        }
        self.metrics.on_query(started.elapsed());
        Ok(results)
    }

    /// Tombstone one record. Returns `false` if it already was.
    pub fn tombstone(&self, id: RecordId) -> Result<bool> {
        let mut state = self.state.write();
        let changed = state.tombstone(id)?;
        if changed {
            self.metrics.on_tombstone();
        }
        Ok(changed)
    }

    /// Tombstone every active chunk of a document. Returns how many there were;
    /// an unknown document yields 0.
    pub fn tombstone_document(&self, external_id: &str) -> Result<usize> {
        let mut state = self.state.write();
        let mut removed = 0;
        for (_, id) in state.store.parent_chunks(external_id) {
            if state.tombstone(id)? {
                self.metrics.on_tombstone();
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Any stored record, tombstoned ones included.
    pub fn get_record(&self, id: RecordId) -> Result<Record> {
        Ok(self.state.read().store.get(id)?.clone())
    }

    /// Physically drop tombstoned records and renumber the rest.
    ///
    /// Record ids handed out earlier are invalid afterwards, so the query
    /// cache is cleared as well.
    pub fn compact(&self) -> Result<usize> {
        let removed = {
            let mut state = self.state.write();
            state.compact()?
        };
        self.cache.clear();
        log::info!("Compacted index: {removed} tombstoned records dropped");
        Ok(removed)
    }

    /// Write a snapshot to `path` (or `<path>/ragdb.snapshot.json` for a
    /// directory). Returns the file written.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let _persist = self.persistence.lock().await;
        let path = resolve_snapshot_path(path.as_ref()).await;

        let snapshot = {
            let state = self.state.read();
            Snapshot::capture(
                self.config.dimension,
                &self.config.lsh,
                state.store.iter(),
                self.metrics.snapshot(),
            )
        };
        let records = snapshot.records.len();
        write_snapshot(&path, &snapshot).await?;

        log::info!("Saved {records} records to {}", path.display());
        Ok(path)
    }

    /// Replace the whole index with a snapshot.
    ///
    /// The snapshot is read, checked against this database's dimension and
    /// LSH configuration, and fully rebuilt before anything is swapped in; a
    /// failing load leaves the current index untouched.
    pub async fn load(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let _persist = self.persistence.lock().await;
        let path = resolve_snapshot_path(path.as_ref()).await;

        let snapshot = read_snapshot(&path).await?;
        snapshot.check_compatible(self.config.dimension, &self.config.lsh)?;
        let (records, mut metrics) = snapshot.into_records()?;
        let fresh = IndexState::from_records(&self.config, records)?;

        metrics.records_active = fresh.store.active_len() as u64;
        metrics.records_total = metrics.records_total.max(fresh.store.len() as u64);
        let records = fresh.store.len();

        {
            let mut state = self.state.write();
            *state = fresh;
            self.metrics.restore(&metrics);
        }
        self.cache.clear();

        log::info!("Loaded {records} records from {}", path.display());
        Ok(path)
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
