//! Error types for the RAG workflow

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing credential: {0} is not set")]
    MissingCredential(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Index has not been built or loaded; call load() or build_or_load_index() first")]
    IndexNotBuilt,

    #[error("Index integrity check failed: {0}")]
    IndexIntegrity(String),

    #[error("Index is locked by another process")]
    IndexLocked,

    #[error("Index already exists at {0}")]
    IndexExists(String),

    #[error("Failed to acquire index lock: {0}")]
    LockError(String),

    #[error("Model API error: {0}")]
    ModelError(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}
