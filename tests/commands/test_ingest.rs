//! Tests for ingest command

use acolyte_rag::commands::ingest;
use acolyte_rag::{IndexSource, VectorIndex};
use httpmock::prelude::*;
use serde_json::json;

use super::local_config;

#[tokio::test]
async fn test_ingest_builds_index_then_skips() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start_async().await;
    let generate = server.mock(|when, then| {
        when.method(POST).path("/api/generate");
        then.status(200).json_body(json!({ "response": "a short summary" }));
    });

    let doc = dir.path().join("guide.md");
    std::fs::write(&doc, "Intro\n# Setup\nInstall it.\n# Use\nRun it.").unwrap();

    let config = local_config(dir.path(), &server.base_url());
    let report = ingest::run(config.clone(), &doc).await.unwrap();

    assert_eq!(report.source, IndexSource::Built);
    assert_eq!(report.sections.len(), 3);
    assert_eq!(report.summaries, vec!["a short summary"; 3]);
    assert!(VectorIndex::exists(&config.index_path));
    generate.assert_calls(3);

    let again = ingest::run(config, &doc).await.unwrap();
    assert_eq!(again.source, IndexSource::Loaded);
    generate.assert_calls(3);
}

#[tokio::test]
async fn test_ingest_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_config(dir.path(), "http://127.0.0.1:9");

    let err = ingest::run(config, &dir.path().join("missing.md"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("missing.md"));
}

#[tokio::test]
async fn test_ingest_model_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/api/generate");
        then.status(500).body("model not loaded");
    });

    let doc = dir.path().join("guide.md");
    std::fs::write(&doc, "Intro\n# Setup").unwrap();

    let config = local_config(dir.path(), &server.base_url());
    assert!(ingest::run(config.clone(), &doc).await.is_err());
    assert!(!VectorIndex::exists(&config.index_path));
}
