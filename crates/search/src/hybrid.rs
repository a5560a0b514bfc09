use crate::types::SearchOptions;
use rag_vector_store::vector::cosine_similarity;
use rag_vector_store::Record;
use std::collections::HashSet;

/// Lowercased whitespace tokens with leading/trailing punctuation trimmed.
pub fn tokenize(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|raw| raw.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Jaccard overlap of two token sets, in `[0, 1]`. Two empty sets score 0.
#[must_use]
pub fn jaccard(query: &HashSet<String>, document: &HashSet<String>) -> f32 {
    if query.is_empty() && document.is_empty() {
        return 0.0;
    }
    let intersection = query.intersection(document).count();
    let union = query.len() + document.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}

/// `alpha * vector + (1 - alpha) * lexical`.
///
/// The endpoints return the pure component so that `alpha == 1` ranks exactly
/// like vector-only search.
#[must_use]
pub fn fuse(alpha: f32, vector_score: f32, lexical_score: f32) -> f32 {
    if alpha >= 1.0 {
        vector_score
    } else if alpha <= 0.0 {
        lexical_score
    } else {
        alpha * vector_score + (1.0 - alpha) * lexical_score
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub fused: f32,
    pub vector: f32,
    pub lexical: f32,
}

/// Scores records against one query.
///
/// Query tokens are computed once per query; records are tokenized on demand.
#[derive(Debug)]
pub struct HybridScorer<'q> {
    query_vector: &'q [f32],
    query_tokens: Option<HashSet<String>>,
    alpha: f32,
}

impl<'q> HybridScorer<'q> {
    pub fn new(query_vector: &'q [f32], options: &SearchOptions) -> Self {
        let query_tokens = options.lexical_query().map(tokenize);
        Self {
            query_vector,
            query_tokens,
            alpha: options.alpha,
        }
    }

    /// Whether lexical overlap takes part in the score
    pub fn is_hybrid(&self) -> bool {
        self.query_tokens.is_some()
    }

    pub fn score(&self, record: &Record) -> Score {
        let vector = cosine_similarity(self.query_vector, &record.vector);
        match &self.query_tokens {
            None => Score {
                fused: vector,
                vector,
                lexical: 0.0,
            },
            Some(query_tokens) => {
                let lexical = jaccard(query_tokens, &tokenize(&record.text));
                Score {
                    fused: fuse(self.alpha, vector, lexical),
                    vector,
                    lexical,
                }
            }
        }
    }
}
