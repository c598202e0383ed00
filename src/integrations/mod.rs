//! External integrations module.
//!
//! Provides clients for:
//! - Google Gemini (generation, embeddings)
//! - Ollama (local LLM)

pub mod gemini;
pub mod ollama;

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
