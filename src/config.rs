//! Configuration for the RAG workflow
//!
//! Loads configuration from config.yml (optional) and the environment.
//! Values written as `${VAR}` in the YAML file are resolved from the environment.

use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::{Error, Result};

/// Environment variable holding the Google Generative AI key.
pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";
pub const DEFAULT_INDEX_PATH: &str = "rag_index";
pub const DEFAULT_EMBEDDING_MODEL: &str = "models/embedding-001";
/// Offline hashing embedder, needs no credential.
pub const LOCAL_EMBEDDING_MODEL: &str = "local-hash";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_TOP_K: usize = 4;
pub const DEFAULT_QUERY_VARIANTS: usize = 3;

/// Supported chat backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatBackend {
    /// Llama 3.1 served by a local Ollama instance
    Llama31,
    /// Gemini Pro
    GeminiPro,
    /// Gemini 1.5 Flash (default)
    GeminiFlash,
}

impl ChatBackend {
    pub const ALL: [ChatBackend; 3] = [
        ChatBackend::Llama31,
        ChatBackend::GeminiPro,
        ChatBackend::GeminiFlash,
    ];

    /// Name accepted on the command line and in config.yml.
    pub fn selector(&self) -> &'static str {
        match self {
            ChatBackend::Llama31 => "llama3.1",
            ChatBackend::GeminiPro => "gemini-pro",
            ChatBackend::GeminiFlash => "gemini-flash",
        }
    }

    /// Model identifier sent to the provider.
    pub fn model_name(&self) -> &'static str {
        match self {
            ChatBackend::Llama31 => "llama3.1",
            ChatBackend::GeminiPro => "gemini-pro",
            ChatBackend::GeminiFlash => "gemini-1.5-flash",
        }
    }

    /// Default sampling temperature for the backend.
    pub fn temperature(&self) -> f32 {
        match self {
            ChatBackend::Llama31 => 0.8,
            ChatBackend::GeminiPro => 0.1,
            ChatBackend::GeminiFlash => 0.0,
        }
    }

    pub fn is_gemini(&self) -> bool {
        !matches!(self, ChatBackend::Llama31)
    }
}

impl Default for ChatBackend {
    fn default() -> Self {
        ChatBackend::GeminiFlash
    }
}

impl fmt::Display for ChatBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.selector())
    }
}

impl FromStr for ChatBackend {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "llama3.1" | "llama" | "ollama" => Ok(ChatBackend::Llama31),
            "gemini-pro" | "chatgooglegenerativeai" => Ok(ChatBackend::GeminiPro),
            "gemini-flash" | "gemini-1.5-flash" | "gemini" => Ok(ChatBackend::GeminiFlash),
            other => Err(Error::Config(format!(
                "unsupported chat model '{}' (expected one of: llama3.1, gemini-pro, gemini-flash)",
                other
            ))),
        }
    }
}

/// Sampling parameters passed to the chat model.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 8192,
        }
    }
}

impl GenerationConfig {
    pub fn for_backend(backend: ChatBackend) -> Self {
        Self {
            temperature: backend.temperature(),
            ..Self::default()
        }
    }
}

/// YAML config structures
#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    chat_model: Option<String>,
    embedding_model: Option<String>,
    api_key: Option<String>,
    index: Option<IndexSection>,
    retrieval: Option<RetrievalSection>,
    generation: Option<GenerationSection>,
    ollama: Option<OllamaSection>,
}

#[derive(Debug, Default, Deserialize)]
struct IndexSection {
    path: Option<String>,
    trust_persisted: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RetrievalSection {
    top_k: Option<usize>,
    query_variants: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct GenerationSection {
    temperature: Option<f32>,
    top_p: Option<f32>,
    top_k: Option<u32>,
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct OllamaSection {
    url: Option<String>,
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct RagConfig {
    pub api_key: Option<String>,
    pub chat_backend: ChatBackend,
    pub embedding_model: String,
    pub generation: GenerationConfig,
    pub index_path: PathBuf,
    /// Skip the integrity check when loading a persisted index.
    pub trust_persisted_index: bool,
    /// Matches returned by each similarity search.
    pub top_k: usize,
    /// Number of rewritten queries requested from the model.
    pub query_variants: usize,
    pub ollama_url: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        let chat_backend = ChatBackend::default();
        Self {
            api_key: None,
            chat_backend,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            generation: GenerationConfig::for_backend(chat_backend),
            index_path: PathBuf::from(DEFAULT_INDEX_PATH),
            trust_persisted_index: false,
            top_k: DEFAULT_TOP_K,
            query_variants: DEFAULT_QUERY_VARIANTS,
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
        }
    }
}

impl RagConfig {
    /// Build a configuration for the given models, reading the API key from the environment.
    ///
    /// Fails with [`Error::MissingCredential`] when a Gemini component is selected and
    /// `GOOGLE_API_KEY` is absent.
    pub fn new(chat_backend: ChatBackend, embedding_model: &str) -> Result<Self> {
        Self::load_dotenv();

        let config = Self {
            api_key: Self::resolve_env_string(None, API_KEY_VAR),
            chat_backend,
            embedding_model: embedding_model.to_string(),
            generation: GenerationConfig::for_backend(chat_backend),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from config.yml (current or parent directory), falling back to
    /// defaults plus environment when no file exists.
    ///
    /// The result is not validated; call [`RagConfig::validate`] after applying overrides.
    pub fn load() -> Result<Self> {
        for candidate in ["config.yml", "../config.yml"] {
            if Path::new(candidate).exists() {
                return Self::load_from_file(candidate);
            }
        }

        Self::load_dotenv();
        Ok(Self {
            api_key: Self::resolve_env_string(None, API_KEY_VAR),
            ..Self::default()
        })
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_dotenv();

        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_yaml_str(&content)
    }

    fn from_yaml_str(content: &str) -> Result<Self> {
        let yaml: YamlConfig = serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse config file: {}", e)))?;

        let chat_backend = match yaml.chat_model.as_deref() {
            Some(selector) => selector.parse()?,
            None => ChatBackend::default(),
        };

        let index = yaml.index.unwrap_or_default();
        let retrieval = yaml.retrieval.unwrap_or_default();
        let generation = yaml.generation.unwrap_or_default();
        let ollama = yaml.ollama.unwrap_or_default();

        let defaults = GenerationConfig::for_backend(chat_backend);

        Ok(Self {
            api_key: Self::resolve_env_string(yaml.api_key, API_KEY_VAR),
            chat_backend,
            embedding_model: yaml
                .embedding_model
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            generation: GenerationConfig {
                temperature: generation.temperature.unwrap_or(defaults.temperature),
                top_p: generation.top_p.unwrap_or(defaults.top_p),
                top_k: generation.top_k.unwrap_or(defaults.top_k),
                max_output_tokens: generation
                    .max_output_tokens
                    .unwrap_or(defaults.max_output_tokens),
            },
            index_path: index
                .path
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INDEX_PATH)),
            trust_persisted_index: index.trust_persisted.unwrap_or(false),
            top_k: retrieval.top_k.unwrap_or(DEFAULT_TOP_K),
            query_variants: retrieval.query_variants.unwrap_or(DEFAULT_QUERY_VARIANTS),
            ollama_url: ollama
                .url
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
        })
    }

    /// Resolve a value: prefer env var if config value looks like ${VAR}
    fn resolve_env_string(value: Option<String>, env_key: &str) -> Option<String> {
        if let Some(ref v) = value {
            if v.starts_with("${") && v.ends_with('}') {
                let var_name = &v[2..v.len() - 1];
                return std::env::var(var_name).ok().filter(|s| !s.trim().is_empty());
            }
            if !v.trim().is_empty() {
                return value;
            }
        }
        std::env::var(env_key).ok().filter(|s| !s.trim().is_empty())
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Switch chat backend, resetting the temperature to the backend default.
    pub fn with_chat_backend(mut self, backend: ChatBackend) -> Self {
        self.chat_backend = backend;
        self.generation.temperature = backend.temperature();
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn with_index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_path = path.into();
        self
    }

    pub fn with_trust_persisted_index(mut self, trust: bool) -> Self {
        self.trust_persisted_index = trust;
        self
    }

    /// True when the selected embedding model is the offline hashing embedder.
    pub fn uses_local_embeddings(&self) -> bool {
        self.embedding_model == LOCAL_EMBEDDING_MODEL
    }

    /// Whether any selected component talks to the Gemini API.
    pub fn requires_api_key(&self) -> bool {
        self.chat_backend.is_gemini() || !self.uses_local_embeddings()
    }

    /// Check required credentials and numeric bounds.
    pub fn validate(&self) -> Result<()> {
        if self.requires_api_key() && self.api_key.as_deref().map_or(true, |k| k.trim().is_empty())
        {
            return Err(Error::MissingCredential(API_KEY_VAR.to_string()));
        }
        if self.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be at least 1".to_string()));
        }
        if self.query_variants == 0 {
            return Err(Error::Config(
                "retrieval.query_variants must be at least 1".to_string(),
            ));
        }
        if self.embedding_model.trim().is_empty() {
            return Err(Error::Config("embedding_model is empty".to_string()));
        }
        Ok(())
    }
}
