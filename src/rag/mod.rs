//! Retrieval-augmented generation over summarized document sections.

pub mod backend;
pub mod index;
pub mod lock;
pub mod retriever;
pub mod splitter;
pub mod workflow;

pub use backend::{build_chat_model, build_embedder, ChatModel, Embedder, LocalEmbedder, OllamaChat};
pub use index::{cosine_similarity, EntryMetadata, IndexedEntry, SearchHit, VectorIndex};
pub use lock::IndexLock;
pub use retriever::{MultiQueryRetriever, RetrievedContext};
pub use splitter::SectionSplitter;
pub use workflow::{IndexSource, LoadReport, RagWorkflow, Record};
