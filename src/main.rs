//! Acolyte RAG CLI - main entry point

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use acolyte_rag::commands::{self, ConfigOverrides};
use acolyte_rag::metrics;
use tracing::warn;

#[derive(Parser)]
#[command(name = "acolyte_rag")]
#[command(about = "Summarize, index and query documents with an LLM", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config.yml (defaults to ./config.yml or ../config.yml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Chat model: llama3.1 | gemini-pro | gemini-flash
    #[arg(short, long, global = true, env = "ACOLYTE_CHAT_MODEL")]
    model: Option<String>,

    /// Embedding model (models/embedding-001 or local-hash)
    #[arg(long, global = true, env = "ACOLYTE_EMBEDDING_MODEL")]
    embedding_model: Option<String>,

    /// Index directory
    #[arg(long, global = true)]
    index_path: Option<PathBuf>,

    /// Load a persisted index without verifying its checksum and embedding model
    #[arg(long, global = true, default_value_t = false)]
    trust_index: bool,

    /// Address to expose Prometheus metrics (e.g., 0.0.0.0:9898)
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split, summarize and index a Markdown document
    Ingest {
        /// Document to ingest
        file: PathBuf,
    },

    /// Answer a question using the index
    Ask {
        /// Question text
        query: String,
    },

    /// Show the context retrieved for a question
    Retrieve {
        /// Question text
        query: String,
    },

    /// List supported chat and embedding models
    Models,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ingest { .. } => "ingest",
            Commands::Ask { .. } => "ask",
            Commands::Retrieve { .. } => "retrieve",
            Commands::Models => "models",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("acolyte_rag=info".parse()?))
        .init();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr.as_deref() {
        match addr.parse::<SocketAddr>() {
            Ok(socket) => metrics::spawn_metrics_server(socket),
            Err(err) => warn!(%addr, "Invalid metrics address: {}", err),
        }
    }

    let overrides = ConfigOverrides {
        config_file: cli.config,
        chat_model: cli.model,
        embedding_model: cli.embedding_model,
        index_path: cli.index_path,
        trust_index: cli.trust_index,
    };

    let command_name = cli.command.name();
    let start = Instant::now();

    let result = execute_command(cli.command, &overrides).await;

    metrics::record_command_result(command_name, start.elapsed(), result.is_ok());

    result
}

async fn execute_command(command: Commands, overrides: &ConfigOverrides) -> anyhow::Result<()> {
    let config = overrides.resolve()?;

    match command {
        Commands::Ingest { file } => {
            commands::ingest::run(config, &file).await?;
        }
        Commands::Ask { query } => {
            commands::ask::run(config, &query).await?;
        }
        Commands::Retrieve { query } => {
            commands::ask::run_retrieve(config, &query).await?;
        }
        Commands::Models => {
            commands::models::run(&config).await?;
        }
    }

    Ok(())
}
