//! List supported chat backends and embedding models.

use anyhow::Result;

use crate::config::{ChatBackend, RagConfig, DEFAULT_EMBEDDING_MODEL, LOCAL_EMBEDDING_MODEL};
use crate::integrations::OllamaClient;

pub async fn run(config: &RagConfig) -> Result<()> {
    println!("Chat models:");
    for backend in ChatBackend::ALL {
        let marker = if backend == config.chat_backend { "*" } else { " " };
        println!(
            " {} {:<14} {:<18} temperature {}",
            marker,
            backend.selector(),
            backend.model_name(),
            backend.temperature()
        );
    }

    println!("\nEmbedding models:");
    for model in [DEFAULT_EMBEDDING_MODEL, LOCAL_EMBEDDING_MODEL] {
        let marker = if model == config.embedding_model { "*" } else { " " };
        println!(" {} {}", marker, model);
    }

    let ollama = OllamaClient::with_url(&config.ollama_url)?;
    if ollama.is_running().await {
        let local = ollama.list_models().await?;
        println!("\nOllama at {} ({} models):", config.ollama_url, local.len());
        for name in local {
            println!("   {}", name);
        }
    } else {
        println!("\nOllama not reachable at {}", config.ollama_url);
    }

    Ok(())
}
