//! Command tests against mocked model servers.

mod test_ask;
mod test_ingest;
mod test_models;
mod test_overrides;

use std::path::Path;

use acolyte_rag::commands::ConfigOverrides;
use acolyte_rag::RagConfig;

/// Local-only configuration pointing Ollama at `ollama_url`.
pub fn local_config(dir: &Path, ollama_url: &str) -> RagConfig {
    let path = dir.join("config.yml");
    std::fs::write(
        &path,
        format!(
            "chat_model: llama3.1\nembedding_model: local-hash\nindex:\n  path: {}\nollama:\n  url: {}\n",
            dir.join("index").display(),
            ollama_url
        ),
    )
    .unwrap();

    ConfigOverrides {
        config_file: Some(path),
        ..Default::default()
    }
    .resolve()
    .unwrap()
}
