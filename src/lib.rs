//! Retrieval-augmented generation over summarized document sections.
//!
//! This library provides tools to:
//! - Split Markdown documents into sections at `#`/`##` headings
//! - Summarize each section with a chat model (Gemini or Ollama)
//! - Embed the summaries and persist them as a checksummed vector index
//! - Retrieve context by direct similarity search and multi-query expansion
//! - Answer questions from the retrieved context

pub mod config;
pub mod error;
pub mod integrations;
pub mod metrics;
pub mod prompts;
pub mod rag;

// Re-export common types
pub use config::{ChatBackend, GenerationConfig, RagConfig};
pub use error::{Error, Result};
pub use integrations::{GeminiClient, OllamaClient};
pub use prompts::{load_prompt, Prompt};
pub use rag::{ChatModel, Embedder, IndexSource, LoadReport, RagWorkflow, RetrievedContext, VectorIndex};

pub mod commands;
