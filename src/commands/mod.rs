//! Command implementations
//!
//! Each module corresponds to a subcommand in the CLI.

pub mod ask;
pub mod ingest;
pub mod models;

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::{ChatBackend, RagConfig};

pub use ask::{run as ask_run, run_retrieve as retrieve_run};
pub use ingest::run as ingest_run;
pub use models::run as models_run;

/// Command-line values that take precedence over config.yml and the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub chat_model: Option<String>,
    pub embedding_model: Option<String>,
    pub index_path: Option<PathBuf>,
    pub trust_index: bool,
}

impl ConfigOverrides {
    /// Load the base configuration and apply overrides. Not validated.
    pub fn resolve(&self) -> Result<RagConfig> {
        let mut config = match &self.config_file {
            Some(path) => RagConfig::load_from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => RagConfig::load()?,
        };

        if let Some(selector) = &self.chat_model {
            let backend: ChatBackend = selector.parse()?;
            config = config.with_chat_backend(backend);
        }
        if let Some(model) = &self.embedding_model {
            config = config.with_embedding_model(model.clone());
        }
        if let Some(path) = &self.index_path {
            config = config.with_index_path(path.clone());
        }
        if self.trust_index {
            config = config.with_trust_persisted_index(true);
        }

        Ok(config)
    }
}
