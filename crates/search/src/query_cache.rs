use crate::error::{Result, SearchError};
use crate::types::{SearchOptions, SearchResult};
use lru::LruCache;
use parking_lot::Mutex;
use rag_vector_store::vector::first_non_finite;
use rag_vector_store::VectorStoreError;
use sha2::{Digest, Sha256};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Quantization step applied to query components before hashing
const QUANTUM: f64 = 1e-6;

/// Content hash of `(quantized query vector, serialized options)`.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey([u8; 32]);

impl CacheKey {
    /// Fails on NaN or infinite components, which have no quantized form.
    pub fn new(query_vector: &[f32], options: &SearchOptions) -> Result<Self> {
        if let Some(index) = first_non_finite(query_vector) {
            return Err(SearchError::VectorStoreError(
                VectorStoreError::NonFiniteComponent { index },
            ));
        }
        let mut hasher = Sha256::new();
        hasher.update((query_vector.len() as u64).to_le_bytes());
        for &component in query_vector {
            let quantized = (f64::from(component) / QUANTUM).round() as i64;
            hasher.update(quantized.to_le_bytes());
        }
        hasher.update(serde_json::to_vec(options)?);
        Ok(Self(hasher.finalize().into()))
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheKey(")?;
        for byte in &self.0[..6] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "..)")
    }
}

/// Bounded FIFO memo of ranked results.
///
/// Eviction drops the least-recently-inserted entry; lookups do not refresh an
/// entry. Capacity 0 disables caching. Entries are never invalidated by
/// writes to the index.
pub struct QueryCache {
    entries: Option<Mutex<LruCache<CacheKey, Arc<Vec<SearchResult>>>>>,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries
            .as_ref()
            .map_or(0, |entries| entries.lock().cap().get())
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<Vec<SearchResult>>> {
        let entries = self.entries.as_ref()?;
        let hit = entries.lock().peek(key).cloned();
        if hit.is_some() {
            log::debug!("Query cache hit {key:?}");
        }
        hit
    }

    pub fn put(&self, key: CacheKey, results: Arc<Vec<SearchResult>>) {
        let Some(entries) = self.entries.as_ref() else {
            return;
        };
        let mut entries = entries.lock();
        // Re-inserting counts as a fresh insertion.
        entries.pop(&key);
        entries.push(key, results);
    }

    pub fn clear(&self) {
        if let Some(entries) = self.entries.as_ref() {
            entries.lock().clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| entries.lock().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}
