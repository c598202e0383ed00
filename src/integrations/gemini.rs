//! Google Gemini API Client.
//!
//! Supports:
//! - text generation (`generateContent`) with sampling parameters
//! - query embeddings (`embedContent`)
//! - batched document embeddings (`batchEmbedContents`)

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{GenerationConfig, API_KEY_VAR};
use crate::{Error, Result};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Sent as a header, never in the URL.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Upper bound on requests in one `batchEmbedContents` call.
const MAX_EMBED_BATCH: usize = 100;

/// Google Gemini client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    generation: GenerationConfig,
}

impl GeminiClient {
    /// Create a client with an API key and model.
    pub fn new<S: Into<String>>(api_key: S, model: &str) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::MissingCredential(API_KEY_VAR.to_string()));
        }

        let http = Client::builder()
            .user_agent("acolyte_rag/0.1.0")
            .build()
            .map_err(|e| Error::Config(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            base_url: GEMINI_API_URL.to_string(),
            model: model.to_string(),
            generation: GenerationConfig::default(),
        })
    }

    /// Point the client at a different API root.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Set sampling parameters for generation calls.
    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// `models/<name>` form expected by the REST API.
    fn model_path(&self) -> String {
        if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        }
    }

    /// Send one message and return the reply.
    pub async fn chat(&self, message: &str) -> Result<String> {
        let payload = GeminiRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: message.to_string(),
                }],
            }],
            generation_config: Some(GenerationParams::from(&self.generation)),
        };

        let response: GeminiResponse = self
            .post_json("generateContent", &payload, Error::ModelError)
            .await?;

        response
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<String>()
            })
            .filter(|text| !text.is_empty())
            .ok_or_else(|| Error::ModelError("Empty response from Gemini".to_string()))
    }

    /// Embed a search query.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let payload = EmbedRequest {
            model: self.model_path(),
            content: EmbedContent {
                parts: vec![Part {
                    text: text.to_string(),
                }],
            },
            task_type: TASK_RETRIEVAL_QUERY,
        };

        let response: EmbedResponse = self
            .post_json("embedContent", &payload, Error::EmbeddingError)
            .await?;

        Ok(response.embedding.values)
    }

    /// Embed documents for storage, batching requests.
    pub async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_EMBED_BATCH) {
            let payload = BatchEmbedRequest {
                requests: batch
                    .iter()
                    .map(|text| EmbedRequest {
                        model: self.model_path(),
                        content: EmbedContent {
                            parts: vec![Part { text: text.clone() }],
                        },
                        task_type: TASK_RETRIEVAL_DOCUMENT,
                    })
                    .collect(),
            };

            let response: BatchEmbedResponse = self
                .post_json("batchEmbedContents", &payload, Error::EmbeddingError)
                .await?;

            if response.embeddings.len() != batch.len() {
                return Err(Error::EmbeddingError(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    response.embeddings.len()
                )));
            }

            vectors.extend(response.embeddings.into_iter().map(|e| e.values));
        }

        debug!("Gemini embedded {} documents", vectors.len());
        Ok(vectors)
    }

    async fn post_json<T, R>(&self, action: &str, payload: &T, err: fn(String) -> Error) -> Result<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}:{}", self.base_url, self.model_path(), action);

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| err(format!("Gemini request failed: {}", e.without_url())))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| err(format!("Failed to read response: {}", e.without_url())))?;

        if !status.is_success() {
            return Err(err(format!("Gemini error {}: {}", status, text)));
        }

        serde_json::from_str(&text)
            .map_err(|e| err(format!("Invalid Gemini response: {} - {}", e, text)))
    }
}

const TASK_RETRIEVAL_QUERY: &str = "RETRIEVAL_QUERY";
const TASK_RETRIEVAL_DOCUMENT: &str = "RETRIEVAL_DOCUMENT";

// === Request structures ===

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "generationConfig")]
    generation_config: Option<GenerationParams>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationParams {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

impl From<&GenerationConfig> for GenerationParams {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
            max_output_tokens: config.max_output_tokens,
            response_mime_type: "text/plain",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest {
    model: String,
    content: EmbedContent,
    task_type: &'static str,
}

#[derive(Debug, Serialize)]
struct EmbedContent {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

// === Response structures ===

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}
