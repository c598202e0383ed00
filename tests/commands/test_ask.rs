//! Tests for ask and retrieve commands

use acolyte_rag::commands::{ask, ingest};
use acolyte_rag::Error;
use httpmock::prelude::*;
use serde_json::json;

use super::local_config;

#[tokio::test]
async fn test_ask_without_index_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_config(dir.path(), "http://127.0.0.1:9");

    let err = ask::run(config, "anything?").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::IndexNotBuilt)
    ));
    assert!(err.to_string().contains("ingest"));
}

#[tokio::test]
async fn test_ask_answers_from_ingested_document() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start_async().await;

    let summaries = server.mock(|when, then| {
        when.method(POST)
            .path("/api/generate")
            .body_includes("Summarize the following text");
        then.status(200).json_body(json!({ "response": "setup summary" }));
    });
    let variants = server.mock(|when, then| {
        when.method(POST)
            .path("/api/generate")
            .body_includes("Original question");
        then.status(200)
            .json_body(json!({ "response": "how to install\ninstallation steps" }));
    });
    let answer = server.mock(|when, then| {
        when.method(POST)
            .path("/api/generate")
            .body_includes("Contexts:")
            .body_includes("[text] Setup\\nInstall it.");
        then.status(200).json_body(json!({ "response": "Install it." }));
    });

    let doc = dir.path().join("guide.md");
    std::fs::write(&doc, "Intro\n# Setup\nInstall it.").unwrap();

    let config = local_config(dir.path(), &server.base_url());
    ingest::run(config.clone(), &doc).await.unwrap();

    let reply = ask::run(config.clone(), "How do I install?").await.unwrap();
    assert_eq!(reply, "Install it.");

    summaries.assert_calls(2);
    variants.assert_calls(1);
    answer.assert_calls(1);

    let context = ask::run_retrieve(config, "install").await.unwrap();
    assert_eq!(context.direct.len(), 2);
    assert!(context.expanded.iter().all(|s| s == "setup summary"));
}
