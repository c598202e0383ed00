//! RAG workflow controller.
//!
//! Construction is explicit and has no side effects; every stage runs only
//! when the caller invokes it:
//!
//! ```text
//! RagWorkflow::from_config(config)?
//!     .load(text)             split -> summarize -> build_or_load_index
//!     .retrieve(query)        direct search + query expansion
//!     .answer(query, context) one chat call over the retrieved context
//! ```

use std::path::Path;

use tracing::{debug, info};
use uuid::Uuid;

use super::backend::{build_chat_model, build_embedder, ChatModel, Embedder};
use super::index::{EntryMetadata, IndexedEntry, VectorIndex, ENTRY_TYPE_TEXT};
use super::retriever::{MultiQueryRetriever, RetrievedContext};
use super::splitter::SectionSplitter;
use crate::config::RagConfig;
use crate::metrics;
use crate::prompts::Prompt;
use crate::{Error, Result};

/// A section kept verbatim so it can be returned as context instead of its summary.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: Uuid,
    pub original: String,
}

/// How the index in use came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource {
    /// Summaries were embedded and a new index was written.
    Built,
    /// An index already persisted at the path was loaded.
    Loaded,
}

/// Result of [`RagWorkflow::load`].
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// Sections produced from the input. Empty when ingestion was skipped.
    pub sections: Vec<String>,
    /// One summary per section, index-aligned.
    pub summaries: Vec<String>,
    pub source: IndexSource,
}

impl LoadReport {
    fn loaded() -> Self {
        Self {
            sections: Vec::new(),
            summaries: Vec::new(),
            source: IndexSource::Loaded,
        }
    }
}

pub struct RagWorkflow {
    config: RagConfig,
    chat: Box<dyn ChatModel>,
    embedder: Box<dyn Embedder>,
    splitter: SectionSplitter,
    sections: Vec<String>,
    summaries: Vec<String>,
    records: Vec<Record>,
    index: Option<VectorIndex>,
}

impl RagWorkflow {
    /// Validate `config` and connect the configured chat and embedding backends.
    pub fn from_config(config: RagConfig) -> Result<Self> {
        config.validate()?;
        let chat = build_chat_model(&config)?;
        let embedder = build_embedder(&config)?;
        Ok(Self::with_backends(config, chat, embedder))
    }

    /// Use the given backends instead of the ones named in `config`.
    pub fn with_backends(
        config: RagConfig,
        chat: Box<dyn ChatModel>,
        embedder: Box<dyn Embedder>,
    ) -> Self {
        Self {
            config,
            chat,
            embedder,
            splitter: SectionSplitter::default(),
            sections: Vec::new(),
            summaries: Vec::new(),
            records: Vec::new(),
            index: None,
        }
    }

    pub fn with_splitter(mut self, splitter: SectionSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    pub fn summaries(&self) -> &[String] {
        &self.summaries
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn index(&self) -> Option<&VectorIndex> {
        self.index.as_ref()
    }

    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }

    /// Ingest `text` and index it at the configured path.
    ///
    /// When an index is already persisted there it is loaded and no
    /// summarization or embedding happens. On failure the workflow state is
    /// left untouched.
    pub async fn load(&mut self, text: &str) -> Result<LoadReport> {
        let path = self.config.index_path.clone();

        if VectorIndex::exists(&path) {
            info!(
                "Index already present at {}, skipping ingestion",
                path.display()
            );
            self.index = Some(self.load_index(&path).await?);
            return Ok(LoadReport::loaded());
        }

        let sections = self.splitter.split(text);
        info!("Split document into {} sections", sections.len());

        let summaries = self.summarize(&sections).await?;
        let records: Vec<Record> = sections
            .iter()
            .map(|section| Record {
                id: Uuid::new_v4(),
                original: section.clone(),
            })
            .collect();

        let index = self.build_index(&summaries, &records).await?;
        let (index, source) = self.persist(index, &path).await?;
        if source == IndexSource::Loaded {
            self.index = Some(index);
            return Ok(LoadReport::loaded());
        }

        self.sections = sections.clone();
        self.summaries = summaries.clone();
        self.records = records;
        self.index = Some(index);

        Ok(LoadReport {
            sections,
            summaries,
            source: IndexSource::Built,
        })
    }

    /// Summarize each section with one chat call, in order.
    pub async fn summarize(&self, sections: &[String]) -> Result<Vec<String>> {
        metrics::observe_stage("summarize", async {
            let mut summaries = Vec::with_capacity(sections.len());
            for (i, section) in sections.iter().enumerate() {
                let prompt = Prompt::Summary
                    .render(&[("element_type", ENTRY_TYPE_TEXT), ("element", section)])?;
                let summary = self.chat.complete(&prompt).await?;
                debug!("Summarized section {}/{}", i + 1, sections.len());
                summaries.push(summary);
            }
            info!("Produced {} summaries", summaries.len());
            Ok(summaries)
        })
        .await
    }

    /// Load the index persisted at `path`, or build one from the stored
    /// summaries and persist it there.
    pub async fn build_or_load_index(&mut self, path: &Path) -> Result<IndexSource> {
        if VectorIndex::exists(path) {
            self.index = Some(self.load_index(path).await?);
            return Ok(IndexSource::Loaded);
        }

        if self.summaries.is_empty() {
            return Err(Error::InvalidArgument(
                "no summaries to index, ingest a document first".to_string(),
            ));
        }

        let index = self.build_index(&self.summaries, &self.records).await?;
        let (index, source) = self.persist(index, path).await?;
        self.index = Some(index);
        Ok(source)
    }

    async fn load_index(&self, path: &Path) -> Result<VectorIndex> {
        metrics::observe_stage("index_load", async {
            VectorIndex::load(
                path,
                self.embedder.model(),
                self.config.trust_persisted_index,
            )
        })
        .await
    }

    /// Save `index` at `path`. If another writer completed an index there
    /// first, that one is loaded instead and `index` is discarded.
    async fn persist(&self, index: VectorIndex, path: &Path) -> Result<(VectorIndex, IndexSource)> {
        match index.save(path) {
            Ok(()) => Ok((index, IndexSource::Built)),
            Err(Error::IndexExists(_)) => {
                info!("Using the index another writer saved at {}", path.display());
                Ok((self.load_index(path).await?, IndexSource::Loaded))
            }
            Err(e) => Err(e),
        }
    }

    async fn build_index(&self, summaries: &[String], records: &[Record]) -> Result<VectorIndex> {
        metrics::observe_stage("index_build", async {
            let embeddings = self.embedder.embed_documents(summaries).await?;
            if embeddings.len() != summaries.len() {
                return Err(Error::EmbeddingError(format!(
                    "expected {} embeddings, got {}",
                    summaries.len(),
                    embeddings.len()
                )));
            }

            let entries = summaries
                .iter()
                .zip(records)
                .zip(embeddings)
                .map(|((summary, record), embedding)| IndexedEntry {
                    page_content: summary.clone(),
                    metadata: EntryMetadata {
                        id: record.id,
                        kind: ENTRY_TYPE_TEXT.to_string(),
                        original_content: record.original.clone(),
                    },
                    embedding,
                })
                .collect();

            let index = VectorIndex::from_entries(self.embedder.model(), entries)?;
            info!(
                "Built index: {} entries, dimension {}",
                index.len(),
                index.dimension()
            );
            Ok(index)
        })
        .await
    }

    fn require_index(&self) -> Result<&VectorIndex> {
        self.index.as_ref().ok_or(Error::IndexNotBuilt)
    }

    /// Gather context for `query` by direct similarity search and query expansion.
    pub async fn retrieve(&self, query: &str) -> Result<RetrievedContext> {
        let index = self.require_index()?;

        metrics::observe_stage("retrieve", async {
            let embedding = self.embedder.embed_query(query).await?;
            let direct: Vec<String> = index
                .similarity_search(&embedding, self.config.top_k)?
                .into_iter()
                .map(|hit| hit.entry.metadata.original_content)
                .collect();

            let expanded: Vec<String> =
                MultiQueryRetriever::new(self.chat.as_ref(), self.embedder.as_ref(), index)
                    .with_top_k(self.config.top_k)
                    .with_variants(self.config.query_variants)
                    .retrieve(query)
                    .await?
                    .into_iter()
                    .map(|entry| entry.page_content)
                    .collect();

            info!(
                "Retrieved {} direct and {} expanded contexts",
                direct.len(),
                expanded.len()
            );
            Ok(RetrievedContext { direct, expanded })
        })
        .await
    }

    /// Ask the chat model to answer `query` from `context`.
    pub async fn answer(&self, query: &str, context: &str) -> Result<String> {
        metrics::observe_stage("answer", async {
            let prompt = Prompt::Answer.render(&[("contexts", context), ("query", query)])?;
            self.chat.complete(&prompt).await
        })
        .await
    }

    /// Retrieve context for `query` and answer it.
    pub async fn generate_response(&self, query: &str) -> Result<String> {
        let context = self.retrieve(query).await?;
        self.answer(query, &context.render()).await
    }
}
