use rag_db::{
    Database, DatabaseConfig, DatabaseOptions, DocumentMetadata, HashEmbeddingModel, LshConfig,
    MetadataFilter, SearchOptions,
};

fn trim(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let model = HashEmbeddingModel::new(64)?;
    let config = DatabaseConfig::new(64)
        .with_lsh(LshConfig::new(12, 8, 1024, 1337))
        .with_options(
            DatabaseOptions::default()
                .with_initial_capacity(2048)
                .with_query_cache_capacity(256),
        );
    let db = Database::new(config)?;

    db.upsert_text_document(
        "doc:password_reset",
        "To reset your password, go to Settings -> Security -> Reset Password. \
         You will receive a confirmation code via email.",
        DocumentMetadata::default()
            .department("Support")
            .active(true)
            .source("kb"),
        &model,
    )
    .await?;

    db.upsert_text_document(
        "doc:pricing_business",
        "Business pricing depends on monthly turnover. Contact Sales for a quote. \
         Discounts are available for enterprise customers.",
        DocumentMetadata::default()
            .department("Sales")
            .active(true)
            .source("kb"),
        &model,
    )
    .await?;

    let query = "How can I reset my password?";
    let options = SearchOptions::new(5)
        .hybrid(query, 0.7)
        .with_filter(MetadataFilter::active(true).and(MetadataFilter::department("Support")))
        .grouped();

    println!("Query: {query}");
    for hit in db.search(&model.embed_sync(query), &options)? {
        println!(
            "- {} score={:.3} evidenceChunk={}",
            hit.parent_external_id, hit.score, hit.evidence_chunk_index
        );
        println!("  Evidence: {}", trim(&hit.evidence_text, 140));
    }

    let snapshot = std::env::temp_dir().join("ragdb.quickstart.snapshot.json");
    db.save(&snapshot).await?;
    db.load(&snapshot).await?;

    let metrics = db.get_metrics();
    println!(
        "Metrics: active={}/{}, queries={}, avg={:.2}ms",
        metrics.records_active,
        metrics.records_total,
        metrics.queries_total,
        metrics.avg_query_latency_ms
    );
    Ok(())
}
