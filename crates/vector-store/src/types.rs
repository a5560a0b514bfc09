use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Dense internal record id shared by the vector table and the LSH buckets.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u32);

impl RecordId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Metadata attached to every chunk of a document.
///
/// `department`, `is_active` and `source` are well-known fields; anything else
/// goes into the open `fields` map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default)]
    pub department: Option<String>,

    #[serde(default)]
    pub is_active: bool,

    #[serde(default)]
    pub source: Option<String>,

    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl DocumentMetadata {
    #[must_use]
    pub fn department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    #[must_use]
    pub const fn active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Look up a value by name, well-known fields first.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "department" => self.department.as_deref(),
            "source" => self.source.as_deref(),
            _ => self.fields.get(key).map(String::as_str),
        }
    }
}

/// A pre-embedded chunk ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentEmbedding {
    pub external_id: String,
    pub parent_external_id: String,
    pub chunk_index: usize,
    pub text: String,
    pub vector: Vec<f32>,
    pub metadata: DocumentMetadata,
}

impl DocumentEmbedding {
    /// A chunk whose parent is the document named by `external_id`.
    pub fn new(
        external_id: impl Into<String>,
        chunk_index: usize,
        text: impl Into<String>,
        vector: Vec<f32>,
    ) -> Self {
        let external_id = external_id.into();
        Self {
            parent_external_id: external_id.clone(),
            external_id,
            chunk_index,
            text: text.into(),
            vector,
            metadata: DocumentMetadata::default(),
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent_external_id: impl Into<String>) -> Self {
        self.parent_external_id = parent_external_id.into();
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: DocumentMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// One stored chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: RecordId,
    pub external_id: String,
    pub parent_external_id: String,
    pub chunk_index: usize,
    pub text: String,
    pub vector: Vec<f32>,
    pub metadata: DocumentMetadata,
    pub tombstoned: bool,
}

impl Record {
    #[must_use]
    pub fn from_embedding(id: RecordId, embedding: DocumentEmbedding) -> Self {
        Self {
            id,
            external_id: embedding.external_id,
            parent_external_id: embedding.parent_external_id,
            chunk_index: embedding.chunk_index,
            text: embedding.text,
            vector: embedding.vector,
            metadata: embedding.metadata,
            tombstoned: false,
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.tombstoned
    }
}
