use crate::error::{Result, VectorStoreError};
use crate::types::{DocumentEmbedding, Record, RecordId};
use crate::vector::{first_non_finite, normalize_in_place};
use std::collections::{BTreeMap, HashMap};

/// Dense record table.
///
/// Ids are positions in the table, so they are only reused after
/// [`VectorStore::compact`]. Tombstoned records stay in place and are skipped
/// by [`VectorStore::iter_active`].
#[derive(Debug, Clone)]
pub struct VectorStore {
    dimension: usize,
    normalize_on_add: bool,
    records: Vec<Record>,
    /// parent external id -> chunk index -> active record
    parents: HashMap<String, BTreeMap<usize, RecordId>>,
    active: usize,
}

impl VectorStore {
    #[must_use]
    pub fn new(dimension: usize, normalize_on_add: bool, capacity: usize) -> Self {
        Self {
            dimension,
            normalize_on_add,
            records: Vec::with_capacity(capacity),
            parents: HashMap::new(),
            active: 0,
        }
    }

    /// Rebuild a table from persisted records.
    ///
    /// Records must be in id order with dense ids, carry `dimension`
    /// components, and hold unique `(parent, chunk_index)` keys among the
    /// active ones. Vectors are taken as stored, without renormalizing.
    pub fn from_records(
        dimension: usize,
        normalize_on_add: bool,
        records: Vec<Record>,
    ) -> Result<Self> {
        let mut store = Self::new(dimension, normalize_on_add, records.len());
        for (position, record) in records.into_iter().enumerate() {
            if record.id.index() != position {
                return Err(VectorStoreError::CorruptRecords(format!(
                    "record at position {position} has id {}",
                    record.id
                )));
            }
            store.check_vector(&record.vector)?;
            if record.is_active() {
                store.link(&record)?;
            }
            store.records.push(record);
        }
        Ok(store)
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Records ever stored, tombstoned ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub const fn active_len(&self) -> usize {
        self.active
    }

    #[must_use]
    pub fn tombstoned_len(&self) -> usize {
        self.records.len() - self.active
    }

    /// Right length and every component finite.
    pub fn check_vector(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if let Some(index) = first_non_finite(vector) {
            return Err(VectorStoreError::NonFiniteComponent { index });
        }
        Ok(())
    }

    /// Append a new active record.
    pub fn add(&mut self, embedding: DocumentEmbedding) -> Result<RecordId> {
        self.check_vector(&embedding.vector)?;
        if let Some(existing) =
            self.find_active(&embedding.parent_external_id, embedding.chunk_index)
        {
            return Err(VectorStoreError::DuplicateChunk {
                parent: embedding.parent_external_id,
                chunk_index: embedding.chunk_index,
                existing,
            });
        }

        let id = self.next_id()?;
        let mut record = Record::from_embedding(id, embedding);
        if self.normalize_on_add {
            normalize_in_place(&mut record.vector);
        }
        self.link(&record)?;
        self.records.push(record);
        Ok(id)
    }

    /// Overwrite an active record in place, keeping its id.
    ///
    /// Returns the replaced record.
    pub fn replace(&mut self, id: RecordId, embedding: DocumentEmbedding) -> Result<Record> {
        self.check_vector(&embedding.vector)?;
        let current = self.get_active(id)?;
        let moves_key = current.parent_external_id != embedding.parent_external_id
            || current.chunk_index != embedding.chunk_index;
        if moves_key {
            if let Some(existing) =
                self.find_active(&embedding.parent_external_id, embedding.chunk_index)
            {
                return Err(VectorStoreError::DuplicateChunk {
                    parent: embedding.parent_external_id,
                    chunk_index: embedding.chunk_index,
                    existing,
                });
            }
        }

        let mut record = Record::from_embedding(id, embedding);
        if self.normalize_on_add {
            normalize_in_place(&mut record.vector);
        }
        let previous = std::mem::replace(&mut self.records[id.index()], record);
        if moves_key {
            self.unlink(&previous.parent_external_id, previous.chunk_index, id);
            let record = &self.records[id.index()];
            let chunks = self
                .parents
                .entry(record.parent_external_id.clone())
                .or_default();
            chunks.insert(record.chunk_index, id);
        }
        Ok(previous)
    }

    /// Mark a record inactive. Returns `false` if it already was.
    pub fn tombstone(&mut self, id: RecordId) -> Result<bool> {
        let record = self
            .records
            .get_mut(id.index())
            .ok_or(VectorStoreError::NotFound(id))?;
        if record.tombstoned {
            return Ok(false);
        }
        record.tombstoned = true;
        let parent = record.parent_external_id.clone();
        let chunk_index = record.chunk_index;
        self.unlink(&parent, chunk_index, id);
        self.active -= 1;
        Ok(true)
    }

    /// Any stored record, tombstoned or not.
    pub fn get(&self, id: RecordId) -> Result<&Record> {
        self.records
            .get(id.index())
            .ok_or(VectorStoreError::NotFound(id))
    }

    pub fn get_active(&self, id: RecordId) -> Result<&Record> {
        self.get(id)
            .ok()
            .filter(|record| record.is_active())
            .ok_or(VectorStoreError::NotFound(id))
    }

    #[must_use]
    pub fn find_active(&self, parent_external_id: &str, chunk_index: usize) -> Option<RecordId> {
        self.parents
            .get(parent_external_id)
            .and_then(|chunks| chunks.get(&chunk_index))
            .copied()
    }

    /// Active chunks of one parent, ordered by chunk index.
    #[must_use]
    pub fn parent_chunks(&self, parent_external_id: &str) -> Vec<(usize, RecordId)> {
        self.parents
            .get(parent_external_id)
            .map(|chunks| chunks.iter().map(|(idx, id)| (*idx, *id)).collect())
            .unwrap_or_default()
    }

    /// Active records in id (insertion) order.
    pub fn iter_active(&self) -> impl Iterator<Item = &Record> + '_ {
        self.records.iter().filter(|record| record.is_active())
    }

    /// Every stored record in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> + '_ {
        self.records.iter()
    }

    /// Drop tombstoned records and renumber the survivors densely.
    ///
    /// Returns the number of records removed. Any id handed out before is
    /// invalid afterwards.
    pub fn compact(&mut self) -> usize {
        let before = self.records.len();
        self.records.retain(Record::is_active);
        self.parents.clear();
        for (position, record) in self.records.iter_mut().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let id = RecordId(position as u32);
            record.id = id;
            self.parents
                .entry(record.parent_external_id.clone())
                .or_default()
                .insert(record.chunk_index, id);
        }
        self.active = self.records.len();
        before - self.records.len()
    }

    fn next_id(&self) -> Result<RecordId> {
        u32::try_from(self.records.len())
            .map(RecordId)
            .map_err(|_| VectorStoreError::invalid_config("record table is full"))
    }

    fn link(&mut self, record: &Record) -> Result<()> {
        let chunks = self
            .parents
            .entry(record.parent_external_id.clone())
            .or_default();
        if let Some(existing) = chunks.get(&record.chunk_index) {
            return Err(VectorStoreError::DuplicateChunk {
                parent: record.parent_external_id.clone(),
                chunk_index: record.chunk_index,
                existing: *existing,
            });
        }
        chunks.insert(record.chunk_index, record.id);
        self.active += 1;
        Ok(())
    }

    fn unlink(&mut self, parent: &str, chunk_index: usize, id: RecordId) {
        if let Some(chunks) = self.parents.get_mut(parent) {
            if chunks.get(&chunk_index) == Some(&id) {
                chunks.remove(&chunk_index);
            }
            if chunks.is_empty() {
                self.parents.remove(parent);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentMetadata;
    use pretty_assertions::assert_eq;

    fn chunk(parent: &str, idx: usize, vector: Vec<f32>) -> DocumentEmbedding {
        DocumentEmbedding::new(parent, idx, format!("{parent} chunk {idx}"), vector)
    }

    #[test]
    fn test_add_and_get() {
        let mut store = VectorStore::new(3, false, 4);
        let a = store.add(chunk("doc:a", 0, vec![1.0, 0.0, 0.0])).unwrap();
        let b = store.add(chunk("doc:a", 1, vec![0.0, 1.0, 0.0])).unwrap();

        assert_eq!(a, RecordId(0));
        assert_eq!(b, RecordId(1));
        assert_eq!(store.len(), 2);
        assert_eq!(store.active_len(), 2);
        assert_eq!(store.get(b).unwrap().chunk_index, 1);
        assert_eq!(store.find_active("doc:a", 1), Some(b));
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut store = VectorStore::new(3, false, 0);
        let err = store.add(chunk("doc:a", 0, vec![1.0, 0.0])).unwrap_err();
        assert_eq!(
            err,
            VectorStoreError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        );
        assert!(store.is_empty());

        let id = store.add(chunk("doc:a", 0, vec![1.0, 0.0, 0.0])).unwrap();
        assert!(store.replace(id, chunk("doc:a", 0, vec![1.0])).is_err());
        assert_eq!(store.get(id).unwrap().vector, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_non_finite_vector_rejected() {
        let mut store = VectorStore::new(2, true, 0);
        let err = store.add(chunk("doc:a", 0, vec![f32::NAN, 1.0])).unwrap_err();
        assert_eq!(err, VectorStoreError::NonFiniteComponent { index: 0 });
        assert!(store.is_empty());

        let id = store.add(chunk("doc:a", 0, vec![1.0, 0.0])).unwrap();
        let err = store
            .replace(id, chunk("doc:a", 0, vec![0.0, f32::INFINITY]))
            .unwrap_err();
        assert_eq!(err, VectorStoreError::NonFiniteComponent { index: 1 });
        assert_eq!(store.get(id).unwrap().vector, vec![1.0, 0.0]);
    }

    #[test]
    fn test_duplicate_active_chunk_rejected() {
        let mut store = VectorStore::new(2, false, 0);
        store.add(chunk("doc:a", 0, vec![1.0, 0.0])).unwrap();
        let err = store.add(chunk("doc:a", 0, vec![0.0, 1.0])).unwrap_err();
        assert!(matches!(err, VectorStoreError::DuplicateChunk { .. }));
    }

    #[test]
    fn test_normalize_on_add() {
        let mut store = VectorStore::new(2, true, 0);
        let id = store.add(chunk("doc:a", 0, vec![3.0, 4.0])).unwrap();
        let zero = store.add(chunk("doc:a", 1, vec![0.0, 0.0])).unwrap();
        let v = &store.get(id).unwrap().vector;
        assert!((v[0] - 0.6).abs() < 1e-6 && (v[1] - 0.8).abs() < 1e-6);
        assert_eq!(store.get(zero).unwrap().vector, vec![0.0, 0.0]);
    }

    #[test]
    fn test_replace_keeps_id() {
        let mut store = VectorStore::new(2, false, 0);
        let id = store.add(chunk("doc:a", 0, vec![1.0, 0.0])).unwrap();
        let replacement = chunk("doc:a", 0, vec![0.0, 1.0])
            .with_metadata(DocumentMetadata::default().department("Support"));
        let previous = store.replace(id, replacement).unwrap();

        assert_eq!(previous.vector, vec![1.0, 0.0]);
        let current = store.get(id).unwrap();
        assert_eq!(current.vector, vec![0.0, 1.0]);
        assert_eq!(current.metadata.department.as_deref(), Some("Support"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_tombstone_excludes_from_active() {
        let mut store = VectorStore::new(2, false, 0);
        let a = store.add(chunk("doc:a", 0, vec![1.0, 0.0])).unwrap();
        let b = store.add(chunk("doc:b", 0, vec![0.0, 1.0])).unwrap();

        assert!(store.tombstone(a).unwrap());
        assert!(!store.tombstone(a).unwrap());
        assert_eq!(store.active_len(), 1);
        assert_eq!(store.tombstoned_len(), 1);
        assert_eq!(store.len(), 2);
        assert!(store.get(a).unwrap().tombstoned);
        assert!(store.get_active(a).is_err());
        assert_eq!(store.iter_active().map(|r| r.id).collect::<Vec<_>>(), vec![b]);
        assert_eq!(store.find_active("doc:a", 0), None);

        // The key is free again.
        let c = store.add(chunk("doc:a", 0, vec![1.0, 1.0])).unwrap();
        assert_eq!(c, RecordId(2));
    }

    #[test]
    fn test_unknown_id_not_found() {
        let mut store = VectorStore::new(2, false, 0);
        assert_eq!(
            store.tombstone(RecordId(7)).unwrap_err(),
            VectorStoreError::NotFound(RecordId(7))
        );
        assert!(store.get(RecordId(0)).is_err());
    }

    #[test]
    fn test_compact_renumbers() {
        let mut store = VectorStore::new(2, false, 0);
        let a = store.add(chunk("doc:a", 0, vec![1.0, 0.0])).unwrap();
        store.add(chunk("doc:b", 0, vec![0.0, 1.0])).unwrap();
        store.add(chunk("doc:c", 0, vec![1.0, 1.0])).unwrap();
        store.tombstone(a).unwrap();

        assert_eq!(store.compact(), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.active_len(), 2);
        assert_eq!(store.find_active("doc:b", 0), Some(RecordId(0)));
        assert_eq!(store.find_active("doc:c", 0), Some(RecordId(1)));
        assert_eq!(store.get(RecordId(1)).unwrap().parent_external_id, "doc:c");
    }

    #[test]
    fn test_from_records_validates_ids() {
        let mut store = VectorStore::new(2, false, 0);
        store.add(chunk("doc:a", 0, vec![1.0, 0.0])).unwrap();
        store.add(chunk("doc:b", 0, vec![0.0, 1.0])).unwrap();
        store.tombstone(RecordId(0)).unwrap();

        let records: Vec<Record> = store.iter().cloned().collect();
        let restored = VectorStore::from_records(2, false, records.clone()).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.active_len(), 1);

        let mut shuffled = records;
        shuffled.swap(0, 1);
        assert!(matches!(
            VectorStore::from_records(2, false, shuffled),
            Err(VectorStoreError::CorruptRecords(_))
        ));
    }

    #[test]
    fn test_parent_chunks_sorted() {
        let mut store = VectorStore::new(1, false, 0);
        store.add(chunk("doc:a", 2, vec![1.0])).unwrap();
        store.add(chunk("doc:a", 0, vec![1.0])).unwrap();
        store.add(chunk("doc:b", 0, vec![1.0])).unwrap();
        let chunks: Vec<usize> = store
            .parent_chunks("doc:a")
            .into_iter()
            .map(|(idx, _)| idx)
            .collect();
        assert_eq!(chunks, vec![0, 2]);
        assert!(store.parent_chunks("doc:z").is_empty());
    }
}
