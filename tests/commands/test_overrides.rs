//! Tests for CLI configuration overrides

use acolyte_rag::commands::ConfigOverrides;
use acolyte_rag::ChatBackend;

#[test]
fn test_overrides_replace_file_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yml");
    std::fs::write(&path, "chat_model: gemini-pro\nindex:\n  path: from_file\n").unwrap();

    let config = ConfigOverrides {
        config_file: Some(path),
        chat_model: Some("llama3.1".into()),
        embedding_model: Some("local-hash".into()),
        index_path: Some(dir.path().join("from_cli")),
        trust_index: true,
    }
    .resolve()
    .unwrap();

    assert_eq!(config.chat_backend, ChatBackend::Llama31);
    assert_eq!(config.generation.temperature, 0.8);
    assert!(config.uses_local_embeddings());
    assert_eq!(config.index_path, dir.path().join("from_cli"));
    assert!(config.trust_persisted_index);
    assert!(config.validate().is_ok());
}

#[test]
fn test_overrides_reject_unknown_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yml");
    std::fs::write(&path, "embedding_model: local-hash\n").unwrap();

    let result = ConfigOverrides {
        config_file: Some(path),
        chat_model: Some("gpt-4o".into()),
        ..Default::default()
    }
    .resolve();

    let err = result.unwrap_err();
    assert!(err.to_string().contains("gpt-4o"));
}

#[test]
fn test_overrides_missing_config_file() {
    let result = ConfigOverrides {
        config_file: Some("/nonexistent/acolyte/config.yml".into()),
        ..Default::default()
    }
    .resolve();

    assert!(result.is_err());
}
