use rag_vector_store::RecordId;
use serde::{Deserialize, Serialize};

/// Outcome of ingesting one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertReport {
    /// Chunks produced by the chunker
    pub chunks: usize,

    /// Existing records overwritten in place
    pub replaced: usize,

    /// New records appended
    pub inserted: usize,

    /// Stale chunks of a previous version tombstoned
    pub tombstoned: usize,

    /// Record ids now holding the document, by chunk index
    pub record_ids: Vec<RecordId>,
}

impl UpsertReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_replaced(&mut self, id: RecordId) {
        self.replaced += 1;
        self.record_ids.push(id);
    }

    pub fn add_inserted(&mut self, id: RecordId) {
        self.inserted += 1;
        self.record_ids.push(id);
    }

    pub fn add_tombstoned(&mut self, count: usize) {
        self.tombstoned += count;
    }

    /// Whether the document had no chunks before this upsert
    pub fn is_new_document(&self) -> bool {
        self.replaced == 0 && self.tombstoned == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_counts_and_ids() {
        let mut report = UpsertReport::new();
        report.add_inserted(RecordId(4));
        report.add_inserted(RecordId(5));
        assert!(report.is_new_document());

        report.add_replaced(RecordId(1));
        report.add_tombstoned(2);
        assert!(!report.is_new_document());
        assert_eq!(report.record_ids, vec![RecordId(4), RecordId(5), RecordId(1)]);
        assert_eq!((report.inserted, report.replaced, report.tombstoned), (2, 1, 2));
    }
}
