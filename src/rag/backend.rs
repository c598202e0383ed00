//! Chat and embedding backends used by the workflow.
//!
//! The workflow only sees the [`ChatModel`] and [`Embedder`] traits; the
//! concrete provider is picked from [`RagConfig`] by [`build_chat_model`]
//! and [`build_embedder`].

use async_trait::async_trait;
use tracing::info;

use crate::config::{ChatBackend, GenerationConfig, RagConfig, API_KEY_VAR, LOCAL_EMBEDDING_MODEL};
use crate::integrations::{GeminiClient, OllamaClient};
use crate::metrics;
use crate::{Error, Result};

/// Dimension of the offline hashing embedder.
pub const LOCAL_EMBEDDING_DIM: usize = 256;

/// A language model that turns one prompt into one completion.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Model identifier, for logging.
    fn name(&self) -> &str;
}

/// Text embedding provider.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed texts that will be stored in the index.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a search query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Identifier recorded in the index manifest.
    fn model(&self) -> &str;
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        metrics::record_model_call("chat");
        self.chat(prompt).await
    }

    fn name(&self) -> &str {
        self.model()
    }
}

#[async_trait]
impl Embedder for GeminiClient {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        metrics::record_model_call("embedding");
        GeminiClient::embed_documents(self, texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        metrics::record_model_call("embedding");
        GeminiClient::embed_query(self, text).await
    }

    fn model(&self) -> &str {
        GeminiClient::model(self)
    }
}

/// Chat model served by Ollama.
#[derive(Debug, Clone)]
pub struct OllamaChat {
    client: OllamaClient,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OllamaChat {
    pub fn new(client: OllamaClient, model: &str, generation: &GenerationConfig) -> Self {
        Self {
            client,
            model: model.to_string(),
            temperature: generation.temperature,
            max_tokens: generation.max_output_tokens,
        }
    }
}

#[async_trait]
impl ChatModel for OllamaChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        metrics::record_model_call("chat");
        self.client
            .generate(prompt, &self.model, self.temperature, self.max_tokens)
            .await
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Deterministic, fast embedding for offline/local use.
///
/// Tokens are hashed into buckets with FNV-1a, so vectors are stable across
/// builds and a persisted index stays valid.
#[derive(Debug, Clone)]
pub struct LocalEmbedder {
    dim: usize,
}

impl Default for LocalEmbedder {
    fn default() -> Self {
        Self::new(LOCAL_EMBEDDING_DIM)
    }
}

impl LocalEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(8) }
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dim];
        for token in text.split_whitespace() {
            let token = token
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if token.is_empty() {
                continue;
            }
            let idx = (fnv1a(token.as_bytes()) % self.dim as u64) as usize;
            vec[idx] += 1.0;
        }

        normalize(&mut vec);
        vec
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed(text))
    }

    fn model(&self) -> &str {
        LOCAL_EMBEDDING_MODEL
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vec.iter_mut() {
            *v /= norm;
        }
    }
}

fn api_key(config: &RagConfig) -> Result<String> {
    config
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| Error::MissingCredential(API_KEY_VAR.to_string()))
}

/// Instantiate the chat model selected in the configuration.
pub fn build_chat_model(config: &RagConfig) -> Result<Box<dyn ChatModel>> {
    let backend = config.chat_backend;
    info!(
        "Chat model: {} ({})",
        backend.model_name(),
        if backend.is_gemini() { "gemini" } else { "ollama" }
    );

    match backend {
        ChatBackend::Llama31 => {
            let client = OllamaClient::with_url(&config.ollama_url)?;
            Ok(Box::new(OllamaChat::new(
                client,
                backend.model_name(),
                &config.generation,
            )))
        }
        ChatBackend::GeminiPro | ChatBackend::GeminiFlash => {
            let client = GeminiClient::new(api_key(config)?, backend.model_name())?
                .with_generation(config.generation.clone());
            Ok(Box::new(client))
        }
    }
}

/// Instantiate the embedding model selected in the configuration.
pub fn build_embedder(config: &RagConfig) -> Result<Box<dyn Embedder>> {
    info!("Embedding model: {}", config.embedding_model);

    if config.uses_local_embeddings() {
        return Ok(Box::new(LocalEmbedder::default()));
    }

    let client = GeminiClient::new(api_key(config)?, &config.embedding_model)?;
    Ok(Box::new(client))
}
