use crate::error::{Result, SearchError};
use crate::filter::MetadataFilter;
use rag_vector_store::{DocumentMetadata, RecordId};
use serde::{Deserialize, Serialize};

/// Default fusion weight of the vector score
pub const DEFAULT_ALPHA: f32 = 0.7;

/// Per-query options. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Maximum number of results (must be > 0)
    pub top_k: usize,

    /// Blend lexical relevance into the score
    pub use_hybrid: bool,

    /// Raw query text for lexical scoring
    pub text_query: Option<String>,

    /// Vector weight in `[0, 1]`; the lexical weight is `1 - alpha`
    pub alpha: f32,

    /// Metadata predicate applied before ranking
    pub filter: Option<MetadataFilter>,

    /// Collapse chunks of the same parent into one result
    pub group_by_parent_document: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            use_hybrid: false,
            text_query: None,
            alpha: DEFAULT_ALPHA,
            filter: None,
            group_by_parent_document: false,
        }
    }
}

impl SearchOptions {
    /// Vector-only search returning at most `top_k` results
    #[must_use]
    pub fn new(top_k: usize) -> Self {
        Self {
            top_k,
            ..Self::default()
        }
    }

    /// Enable hybrid scoring with the given query text and vector weight
    #[must_use]
    pub fn hybrid(mut self, text_query: impl Into<String>, alpha: f32) -> Self {
        self.use_hybrid = true;
        self.text_query = Some(text_query.into());
        self.alpha = alpha;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub const fn grouped(mut self) -> Self {
        self.group_by_parent_document = true;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(SearchError::InvalidOptions("top_k must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(SearchError::InvalidOptions(format!(
                "alpha must be within [0, 1], got {}",
                self.alpha
            )));
        }
        Ok(())
    }

    /// Query text that takes part in scoring, if any.
    ///
    /// `None` unless hybrid mode is on and the text has a non-blank token.
    #[must_use]
    pub fn lexical_query(&self) -> Option<&str> {
        if !self.use_hybrid {
            return None;
        }
        self.text_query
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

/// One ranked hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Record holding the evidence chunk
    pub record_id: RecordId,

    /// External id of the evidence chunk
    pub external_id: String,

    /// Owning document
    pub parent_external_id: String,

    /// Fused ranking score
    pub score: f32,

    /// Cosine similarity component
    pub vector_score: f32,

    /// Lexical overlap component (0 when not in play)
    pub lexical_score: f32,

    /// Chunk index of the evidence chunk
    pub evidence_chunk_index: usize,

    /// Text of the evidence chunk
    pub evidence_text: String,

    pub metadata: DocumentMetadata,
}
