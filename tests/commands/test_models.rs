//! Tests for models command

use acolyte_rag::commands::models;
use httpmock::prelude::*;
use serde_json::json;

use super::local_config;

#[test]
fn test_models_lists_ollama_models() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start();
    let tags = server.mock(|when, then| {
        when.method(GET).path("/api/tags");
        then.status(200)
            .json_body(json!({ "models": [{ "name": "llama3.1:latest" }] }));
    });

    let config = local_config(dir.path(), &server.base_url());
    tokio_test::block_on(models::run(&config)).unwrap();

    // health check + listing
    tags.assert_calls(2);
}

#[tokio::test]
async fn test_models_tolerates_missing_ollama() {
    let dir = tempfile::tempdir().unwrap();
    let config = local_config(dir.path(), "http://127.0.0.1:9");

    assert!(models::run(&config).await.is_ok());
}
