//! Candidate → result pipeline: score, filter, sort, group, truncate.

use crate::hybrid::{HybridScorer, Score};
use crate::types::{SearchOptions, SearchResult};
use rag_vector_store::Record;
use std::cmp::Ordering;
use std::collections::HashSet;

struct Scored<'a> {
    record: &'a Record,
    score: Score,
}

/// Descending score, ties broken by lower record id.
fn by_rank(a: &Scored<'_>, b: &Scored<'_>) -> Ordering {
    b.score
        .fused
        .total_cmp(&a.score.fused)
        .then_with(|| a.record.id.cmp(&b.record.id))
}

/// Rank candidate records for one query.
///
/// Tombstoned records and records rejected by the filter are dropped before
/// they can take a slot. With grouping on, each parent keeps only its
/// best-ranked chunk as evidence.
pub fn rank<'a, I>(candidates: I, query_vector: &[f32], options: &SearchOptions) -> Vec<SearchResult>
where
    I: IntoIterator<Item = &'a Record>,
{
    let scorer = HybridScorer::new(query_vector, options);

    let mut scored: Vec<Scored<'a>> = candidates
        .into_iter()
        .filter(|record| record.is_active())
        .filter(|record| {
            options
                .filter
                .as_ref()
                .map_or(true, |filter| filter.matches(&record.metadata))
        })
        .map(|record| Scored {
            record,
            score: scorer.score(record),
        })
        .collect();

    scored.sort_by(by_rank);

    let mut seen_parents: HashSet<&str> = HashSet::new();
    let mut results = Vec::with_capacity(options.top_k.min(scored.len()));
    for hit in scored {
        if results.len() >= options.top_k {
            break;
        }
        if options.group_by_parent_document
            && !seen_parents.insert(hit.record.parent_external_id.as_str())
        {
            continue;
        }
        results.push(to_result(&hit));
    }

    log::debug!(
        "Ranked {} results (hybrid={}, grouped={})",
        results.len(),
        scorer.is_hybrid(),
        options.group_by_parent_document
    );
    results
}

fn to_result(hit: &Scored<'_>) -> SearchResult {
    let record = hit.record;
    SearchResult {
        record_id: record.id,
        external_id: record.external_id.clone(),
        parent_external_id: record.parent_external_id.clone(),
        score: hit.score.fused,
        vector_score: hit.score.vector,
        lexical_score: hit.score.lexical,
        evidence_chunk_index: record.chunk_index,
        evidence_text: record.text.clone(),
        metadata: record.metadata.clone(),
    }
}
