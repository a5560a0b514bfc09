use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rag_db::{
    ChunkingOptions, Database, DatabaseConfig, DatabaseError, DatabaseOptions, DocumentEmbedding,
    DocumentMetadata, EmbeddingModel, HashEmbeddingModel, LshConfig, MetadataFilter,
    SearchOptions,
};
use std::collections::HashSet;
use std::sync::Arc;

const DIM: usize = 64;

/// Two-bit bands put every loosely related vector into a shared bucket, so a
/// handful of test documents are always candidates for each other.
fn coarse_lsh() -> LshConfig {
    LshConfig::new(16, 2, 1024, 1337)
}

fn database(cache: usize) -> Database {
    let config = DatabaseConfig::new(DIM)
        .with_lsh(coarse_lsh())
        .with_options(DatabaseOptions::default().with_query_cache_capacity(cache));
    Database::new(config).expect("database")
}

fn model() -> HashEmbeddingModel {
    HashEmbeddingModel::new(DIM).expect("model")
}

fn support() -> DocumentMetadata {
    DocumentMetadata::default().department("Support").active(true)
}

fn sales() -> DocumentMetadata {
    DocumentMetadata::default().department("Sales").active(true)
}

fn axis(hot: usize, tilt: f32) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[hot] = 1.0;
    v[(hot + 1) % DIM] = tilt;
    v
}

struct FailingModel;

#[async_trait]
impl EmbeddingModel for FailingModel {
    fn dimension(&self) -> usize {
        DIM
    }

    async fn embed(&self, _text: &str) -> rag_vector_store::Result<Vec<f32>> {
        Err(rag_vector_store::VectorStoreError::embedding("upstream unavailable"))
    }
}

/// Emits a NaN in every vector, as a broken upstream model might.
struct NanModel;

#[async_trait]
impl EmbeddingModel for NanModel {
    fn dimension(&self) -> usize {
        DIM
    }

    async fn embed(&self, _text: &str) -> rag_vector_store::Result<Vec<f32>> {
        let mut v = axis(0, 0.0);
        v[3] = f32::NAN;
        Ok(v)
    }
}

#[tokio::test]
async fn password_reset_document_is_found() {
    let db = database(0);
    let model = model();
    db.upsert_text_document(
        "doc:reset",
        "Reset your password via Settings -> Security.",
        support(),
        &model,
    )
    .await
    .expect("upsert reset");
    db.upsert_text_document(
        "doc:pricing",
        "Pricing for business customers is handled by Sales.",
        sales(),
        &model,
    )
    .await
    .expect("upsert pricing");

    let query = "Reset your password";
    let results = db
        .search(&model.embed_sync(query), &SearchOptions::new(5).hybrid(query, 0.7))
        .expect("search");

    assert!(!results.is_empty());
    assert_eq!(results[0].parent_external_id, "doc:reset");
    assert_eq!(results[0].external_id, "doc:reset");
    assert_eq!(results[0].evidence_chunk_index, 0);
}

#[tokio::test]
async fn exact_text_query_found_with_fine_grained_lsh() {
    let config = DatabaseConfig::new(DIM)
        .with_lsh(LshConfig::new(12, 8, 1024, 1337))
        .with_options(DatabaseOptions::default().with_query_cache_capacity(0));
    let db = Database::new(config).expect("database");
    let model = model();
    let text = "Hello world. This is a test document about password reset.";
    db.upsert_text_document("doc:1", text, support(), &model)
        .await
        .expect("upsert");

    let results = db
        .search(&model.embed_sync(text), &SearchOptions::new(5))
        .expect("search");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].parent_external_id, "doc:1");
    assert!((results[0].score - 1.0).abs() < 1e-5);
}

#[test]
fn department_filter_counts_only_matching_chunks() {
    let db = database(0);
    db.add_batch(vec![
        DocumentEmbedding::new("kb:1", 0, "support one", axis(0, 0.05)).with_metadata(support()),
        DocumentEmbedding::new("kb:2", 0, "support two", axis(0, 0.10)).with_metadata(support()),
        DocumentEmbedding::new("kb:3", 0, "sales one", axis(0, 0.0)).with_metadata(sales()),
    ])
    .expect("batch");

    let options = SearchOptions::new(10).with_filter(MetadataFilter::department("Support"));
    let results = db.search(&axis(0, 0.0), &options).expect("search");

    assert_eq!(results.len(), 2);
    assert!(results
        .iter()
        .all(|r| r.metadata.department.as_deref() == Some("Support")));
}

#[tokio::test]
async fn hybrid_filter_never_returns_other_department() {
    let db = database(0);
    let model = model();
    db.upsert_text_document("doc:a", "Reset password via Settings -> Security.", support(), &model)
        .await
        .expect("upsert a");
    db.upsert_text_document(
        "doc:b",
        "Reset pricing for business customers via Sales.",
        sales(),
        &model,
    )
    .await
    .expect("upsert b");

    let query = "Reset password";
    let options = SearchOptions::new(10)
        .hybrid(query, 0.7)
        .with_filter(MetadataFilter::active(true).and(MetadataFilter::department("Support")));
    let results = db.search(&model.embed_sync(query), &options).expect("search");

    assert!(results.iter().all(|r| r.parent_external_id != "doc:b"));
}

#[test]
fn alpha_one_ranks_like_vector_only() {
    let db = database(0);
    db.add_batch(
        (0..6)
            .map(|i| {
                DocumentEmbedding::new(format!("doc:{i}"), 0, "reset password", axis(0, i as f32 * 0.1))
            })
            .collect(),
    )
    .expect("batch");

    let query = axis(0, 0.25);
    let vector_only = db.search(&query, &SearchOptions::new(4)).expect("vector");
    let hybrid = db
        .search(&query, &SearchOptions::new(4).hybrid("reset password", 1.0))
        .expect("hybrid");

    let a: Vec<_> = vector_only.iter().map(|r| (r.record_id, r.score)).collect();
    let b: Vec<_> = hybrid.iter().map(|r| (r.record_id, r.score)).collect();
    assert_eq!(a, b);
}

#[test]
fn alpha_zero_ranks_by_lexical_score() {
    let db = database(0);
    db.add_batch(vec![
        DocumentEmbedding::new("close", 0, "shipping returns", axis(0, 0.0)),
        DocumentEmbedding::new("half", 0, "reset shipping", axis(0, 0.3)),
        DocumentEmbedding::new("exact", 0, "reset password", axis(0, 0.6)),
    ])
    .expect("batch");

    let results = db
        .search(&axis(0, 0.0), &SearchOptions::new(3).hybrid("reset password", 0.0))
        .expect("search");

    let order: Vec<&str> = results.iter().map(|r| r.parent_external_id.as_str()).collect();
    assert_eq!(order, vec!["exact", "half", "close"]);
    assert!(results.iter().all(|r| r.score == r.lexical_score));
}

#[tokio::test]
async fn grouping_returns_one_result_per_document() {
    let db = database(0);
    let model = model();
    let chunking = ChunkingOptions::fixed_chars(24, 6);
    for (id, text) in [
        ("doc:long", "password reset steps: open settings, pick security, press reset, confirm by email"),
        ("doc:other", "password hints live in the security settings page of the account"),
    ] {
        let report = db
            .upsert_text_document_with(id, text, support(), &model, &chunking)
            .await
            .expect("upsert");
        assert!(report.chunks > 1);
    }

    let query = "password reset settings";
    let options = SearchOptions::new(5).hybrid(query, 0.5).grouped();
    let results = db.search(&model.embed_sync(query), &options).expect("search");

    let parents: HashSet<&str> = results.iter().map(|r| r.parent_external_id.as_str()).collect();
    assert_eq!(parents.len(), results.len());
    assert!(results.len() <= 2);
}

#[tokio::test]
async fn reupsert_reuses_ids_and_tombstones_surplus_chunks() {
    let db = database(0);
    let model = model();
    let chunking = ChunkingOptions::fixed_chars(10, 0);

    let first = db
        .upsert_text_document_with("doc", "aaaaaaaaaabbbbbbbbbbcccccccccc", support(), &model, &chunking)
        .await
        .expect("first");
    assert_eq!(first.chunks, 3);
    assert_eq!(first.inserted, 3);
    assert!(first.is_new_document());

    let second = db
        .upsert_text_document_with("doc", "dddddddddd", support(), &model, &chunking)
        .await
        .expect("second");
    assert_eq!(second.replaced, 1);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.tombstoned, 2);
    assert_eq!(second.record_ids[0], first.record_ids[0]);
    assert!(!second.is_new_document());

    let record = db.get_record(first.record_ids[0]).expect("record");
    assert_eq!(record.text, "dddddddddd");
    assert!(db.get_record(first.record_ids[2]).expect("old chunk").tombstoned);

    let metrics = db.get_metrics();
    assert_eq!(metrics.records_active, 1);
    assert_eq!(metrics.records_total, 3);
}

#[tokio::test]
async fn embedding_failure_leaves_document_untouched() {
    let db = database(0);
    let model = model();
    db.upsert_text_document("doc", "original text", support(), &model)
        .await
        .expect("upsert");

    let err = db
        .upsert_text_document("doc", "replacement text", support(), &FailingModel)
        .await
        .expect_err("failing model");
    assert!(matches!(err, DatabaseError::EmbeddingError(_)));

    let results = db
        .search(&model.embed_sync("original text"), &SearchOptions::new(1))
        .expect("search");
    assert_eq!(results[0].evidence_text, "original text");
    assert_eq!(db.get_metrics().records_total, 1);
}

#[tokio::test]
async fn non_finite_embedding_leaves_document_untouched() {
    let db = database(8);
    let model = model();
    db.upsert_text_document("doc", "original text", support(), &model)
        .await
        .expect("upsert");

    let err = db
        .upsert_text_document("doc", "replacement text", support(), &NanModel)
        .await
        .expect_err("nan model");
    assert!(matches!(err, DatabaseError::NonFiniteVector { index: 3 }));

    let results = db
        .search(&model.embed_sync("original text"), &SearchOptions::new(1))
        .expect("search");
    assert_eq!(results[0].evidence_text, "original text");
    assert!(results[0].score.is_finite());
    assert_eq!(db.get_metrics().records_total, 1);
}

#[tokio::test]
async fn model_dimension_must_match() {
    let db = database(0);
    let small = HashEmbeddingModel::new(8).expect("model");
    let err = db
        .upsert_text_document("doc", "text", support(), &small)
        .await
        .expect_err("dimension");
    assert!(matches!(
        err,
        DatabaseError::DimensionMismatch {
            expected: DIM,
            actual: 8
        }
    ));
}

#[tokio::test]
async fn tombstone_hides_record_and_keeps_total() {
    let db = database(0);
    let model = model();
    let report = db
        .upsert_text_document("doc:gone", "Reset your password", support(), &model)
        .await
        .expect("upsert");
    db.upsert_text_document("doc:kept", "Reset your email", support(), &model)
        .await
        .expect("upsert");

    let before = db.get_metrics();
    assert!(db.tombstone(report.record_ids[0]).expect("tombstone"));
    let after = db.get_metrics();

    assert_eq!(after.records_active, before.records_active - 1);
    assert_eq!(after.records_total, before.records_total);

    let results = db
        .search(&model.embed_sync("Reset your password"), &SearchOptions::new(10))
        .expect("search");
    assert!(results.iter().all(|r| r.parent_external_id != "doc:gone"));
}

#[test]
fn disabled_cache_never_hits() {
    let db = database(0);
    db.add_batch(vec![DocumentEmbedding::new("a", 0, "a", axis(0, 0.0))])
        .expect("batch");
    for _ in 0..3 {
        db.search(&axis(0, 0.0), &SearchOptions::new(1)).expect("search");
    }
    let metrics = db.get_metrics();
    assert_eq!(metrics.queries_total, 3);
    assert_eq!(metrics.cache_hits, 0);
}

#[test]
fn cached_results_may_be_stale_after_writes() {
    let db = database(16);
    db.add_batch(vec![DocumentEmbedding::new("old", 0, "old", axis(0, 0.2))])
        .expect("batch");
    let first = db.search(&axis(0, 0.0), &SearchOptions::new(1)).expect("search");

    db.add_batch(vec![DocumentEmbedding::new("new", 0, "new", axis(0, 0.0))])
        .expect("batch");
    let second = db.search(&axis(0, 0.0), &SearchOptions::new(1)).expect("search");

    assert_eq!(first, second);
    assert_eq!(second[0].parent_external_id, "old");
    assert_eq!(db.get_metrics().cache_hits, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_readers_and_writers() {
    let db = Arc::new(database(0));
    let mut handles = Vec::new();

    for writer in 0..4 {
        let db = Arc::clone(&db);
        handles.push(tokio::spawn(async move {
            let batch = (0..25)
                .map(|i| {
                    DocumentEmbedding::new(format!("w{writer}:{i}"), 0, "chunk", axis(writer, i as f32 * 0.01))
                })
                .collect();
            db.add_batch(batch).expect("batch");
        }));
    }
    for reader in 0..4 {
        let db = Arc::clone(&db);
        handles.push(tokio::spawn(async move {
            let own = format!("w{reader}:");
            for _ in 0..25 {
                let results = db
                    .search(&axis(reader, 0.0), &SearchOptions::new(100))
                    .expect("search");

                // A batch becomes visible all at once or not at all.
                let seen = results
                    .iter()
                    .filter(|r| r.parent_external_id.starts_with(&own))
                    .count();
                assert!(seen == 0 || seen == 25, "partial batch: {seen} of 25");

                for hit in &results {
                    let record = db.get_record(hit.record_id).expect("result id is stored");
                    assert!(!record.tombstoned);
                    assert_eq!(record.parent_external_id, hit.parent_external_id);
                }

                let metrics = db.get_metrics();
                assert!(
                    metrics.records_active <= metrics.records_total,
                    "active {} > total {}",
                    metrics.records_active,
                    metrics.records_total
                );
                tokio::task::yield_now().await;
            }
        }));
    }
    for handle in handles {
        handle.await.expect("task");
    }

    let metrics = db.get_metrics();
    assert_eq!(metrics.records_active, 100);
    assert_eq!(metrics.records_total, 100);
    assert_eq!(metrics.queries_total, 100);
}
