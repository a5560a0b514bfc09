//! Declarative metadata predicates.
//!
//! Filters are plain values: evaluation reads metadata only, so one filter can
//! be shared across threads and hashed into query-cache keys.

use rag_vector_store::DocumentMetadata;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataFilter {
    /// `department == value`
    Department(String),
    /// `source == value`
    Source(String),
    /// `is_active == value`
    Active(bool),
    /// Named value equals `value` (well-known fields included)
    FieldEquals { key: String, value: String },
    /// Named value is present
    HasField(String),
    /// Every inner filter matches (empty list matches)
    All(Vec<MetadataFilter>),
    /// At least one inner filter matches (empty list never matches)
    Any(Vec<MetadataFilter>),
    Not(Box<MetadataFilter>),
}

impl MetadataFilter {
    pub fn department(value: impl Into<String>) -> Self {
        Self::Department(value.into())
    }

    pub fn source(value: impl Into<String>) -> Self {
        Self::Source(value.into())
    }

    #[must_use]
    pub const fn active(value: bool) -> Self {
        Self::Active(value)
    }

    pub fn field(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::FieldEquals {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Conjunction, flattening nested `All`s.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::All(mut inner) => {
                inner.push(other);
                Self::All(inner)
            }
            first => Self::All(vec![first, other]),
        }
    }

    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match self {
            Self::Any(mut inner) => {
                inner.push(other);
                Self::Any(inner)
            }
            first => Self::Any(vec![first, other]),
        }
    }

    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    #[must_use]
    pub fn matches(&self, metadata: &DocumentMetadata) -> bool {
        match self {
            Self::Department(value) => metadata.department.as_deref() == Some(value.as_str()),
            Self::Source(value) => metadata.source.as_deref() == Some(value.as_str()),
            Self::Active(value) => metadata.is_active == *value,
            Self::FieldEquals { key, value } => metadata.get(key) == Some(value.as_str()),
            Self::HasField(key) => metadata.get(key).is_some(),
            Self::All(inner) => inner.iter().all(|f| f.matches(metadata)),
            Self::Any(inner) => inner.iter().any(|f| f.matches(metadata)),
            Self::Not(inner) => !inner.matches(metadata),
        }
    }
}
