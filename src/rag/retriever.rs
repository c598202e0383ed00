//! Query expansion retrieval.
//!
//! The chat model rewrites the question into several variants, each variant
//! is searched in the index, and the union of hits is returned with
//! duplicates removed.

use std::collections::HashSet;

use tracing::{debug, info};

use super::backend::{ChatModel, Embedder};
use super::index::{IndexedEntry, VectorIndex};
use crate::config::{DEFAULT_QUERY_VARIANTS, DEFAULT_TOP_K};
use crate::prompts::Prompt;
use crate::Result;

/// Separator between entries of the expanded context block.
pub const EXPANDED_SEPARATOR: &str = "\n---\n";

pub struct MultiQueryRetriever<'a> {
    chat: &'a dyn ChatModel,
    embedder: &'a dyn Embedder,
    index: &'a VectorIndex,
    top_k: usize,
    variants: usize,
}

impl<'a> MultiQueryRetriever<'a> {
    pub fn new(chat: &'a dyn ChatModel, embedder: &'a dyn Embedder, index: &'a VectorIndex) -> Self {
        Self {
            chat,
            embedder,
            index,
            top_k: DEFAULT_TOP_K,
            variants: DEFAULT_QUERY_VARIANTS,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_variants(mut self, variants: usize) -> Self {
        self.variants = variants.max(1);
        self
    }

    /// Ask the chat model for alternative phrasings of `question`.
    ///
    /// Falls back to the original question when the model returns nothing usable.
    pub async fn generate_queries(&self, question: &str) -> Result<Vec<String>> {
        let count = self.variants.to_string();
        let prompt = Prompt::MultiQuery.render(&[("count", &count), ("question", question)])?;
        let reply = self.chat.complete(&prompt).await?;

        let mut queries = parse_queries(&reply);
        queries.truncate(self.variants);
        if queries.is_empty() {
            debug!("Model produced no query variants, using the original question");
            queries.push(question.to_string());
        }

        debug!("Generated queries: {:?}", queries);
        Ok(queries)
    }

    /// Entries matching any generated query, first-seen order, unique by entry id.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<IndexedEntry>> {
        let queries = self.generate_queries(question).await?;

        let mut seen = HashSet::new();
        let mut results = Vec::new();
        for query in &queries {
            let embedding = self.embedder.embed_query(query).await?;
            for hit in self.index.similarity_search(&embedding, self.top_k)? {
                if seen.insert(hit.entry.metadata.id) {
                    results.push(hit.entry);
                }
            }
        }

        info!(
            "Multi-query retrieval: {} queries, {} unique entries",
            queries.len(),
            results.len()
        );
        Ok(results)
    }
}

/// One query per non-empty line, list markers stripped.
pub fn parse_queries(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(|line| strip_list_marker(line.trim()).trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return rest;
    }

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return rest;
        }
    }
    line
}

/// Context gathered for one query: direct search hits and expansion hits,
/// kept as two independent blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievedContext {
    /// Original section text of the direct similarity matches.
    pub direct: Vec<String>,
    /// Summaries returned by query expansion.
    pub expanded: Vec<String>,
}

impl RetrievedContext {
    /// Direct matches as `[text]<section>` lines.
    pub fn direct_block(&self) -> String {
        self.direct
            .iter()
            .map(|section| format!("[text]{}", section))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn expanded_block(&self) -> String {
        self.expanded.join(EXPANDED_SEPARATOR)
    }

    /// Context passed to the answer prompt: direct block, then expanded block.
    pub fn render(&self) -> String {
        [self.direct_block(), self.expanded_block()]
            .into_iter()
            .filter(|block| !block.is_empty())
            .collect::<Vec<_>>()
            .join(EXPANDED_SEPARATOR)
    }

    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.expanded.is_empty()
    }
}
