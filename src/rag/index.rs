//! Similarity index over section summaries, persisted as a directory.
//!
//! Layout of an index directory:
//! - `entries.json`: the indexed entries (summary, metadata, embedding)
//! - `manifest.json`: format version, embedding model, dimension, entry count
//!   and the SHA-256 of `entries.json`
//!
//! The manifest is written last, so a directory without one is treated as absent.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::lock::IndexLock;
use crate::{Error, Result};

/// Type tag stored on every entry.
pub const ENTRY_TYPE_TEXT: &str = "text";
pub const FORMAT_VERSION: u32 = 1;
pub const ENTRIES_FILE: &str = "entries.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Metadata attached to an indexed summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    /// Section text the summary was produced from.
    pub original_content: String,
}

/// Embedded summary stored in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedEntry {
    /// The summary text that was embedded.
    pub page_content: String,
    pub metadata: EntryMetadata,
    pub embedding: Vec<f32>,
}

/// One similarity search match.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub entry: IndexedEntry,
    pub score: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexManifest {
    format_version: u32,
    embedding_model: String,
    dimension: usize,
    entries: usize,
    sha256: String,
    created_at: DateTime<Utc>,
}

/// In-memory vector index with brute-force cosine search.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    embedding_model: String,
    dimension: usize,
    entries: Vec<IndexedEntry>,
}

impl VectorIndex {
    /// Build an index from entries produced by `embedding_model`.
    ///
    /// Entries must be non-empty, share one non-zero dimension and carry unique ids.
    pub fn from_entries(embedding_model: &str, entries: Vec<IndexedEntry>) -> Result<Self> {
        let dimension = match entries.first() {
            Some(first) => first.embedding.len(),
            None => {
                return Err(Error::InvalidArgument(
                    "cannot build an index without entries".to_string(),
                ))
            }
        };

        if dimension == 0 {
            return Err(Error::EmbeddingError(
                "embedding model returned an empty vector".to_string(),
            ));
        }

        let mut ids = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if entry.embedding.len() != dimension {
                return Err(Error::EmbeddingError(format!(
                    "dimension mismatch: expected {}, got {}",
                    dimension,
                    entry.embedding.len()
                )));
            }
            if !ids.insert(entry.metadata.id) {
                return Err(Error::InvalidArgument(format!(
                    "duplicate entry id {}",
                    entry.metadata.id
                )));
            }
        }

        Ok(Self {
            embedding_model: embedding_model.to_string(),
            dimension,
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    pub fn entries(&self) -> &[IndexedEntry] {
        &self.entries
    }

    pub fn get(&self, id: &Uuid) -> Option<&IndexedEntry> {
        self.entries.iter().find(|e| e.metadata.id == *id)
    }

    /// Top `k` entries by cosine similarity, best first. Ties keep insertion order.
    pub fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension {
            return Err(Error::EmbeddingError(format!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (idx, cosine_similarity(query, &entry.embedding)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        debug!("Similarity search returned {} hits", scored.len());

        Ok(scored
            .into_iter()
            .map(|(idx, score)| SearchHit {
                entry: self.entries[idx].clone(),
                score,
            })
            .collect())
    }

    /// Whether a persisted index is present at `dir`.
    pub fn exists(dir: &Path) -> bool {
        dir.join(MANIFEST_FILE).is_file()
    }

    /// Persist to `dir`, holding an exclusive lock for the duration of the write.
    ///
    /// Never overwrites: if another writer completed an index at `dir` first,
    /// this fails with [`Error::IndexExists`].
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        let _lock = IndexLock::acquire(dir)?;

        if Self::exists(dir) {
            warn!("Index at {} was written by another process", dir.display());
            return Err(Error::IndexExists(dir.display().to_string()));
        }

        let entries_bytes = serde_json::to_vec(&self.entries)?;
        let manifest = IndexManifest {
            format_version: FORMAT_VERSION,
            embedding_model: self.embedding_model.clone(),
            dimension: self.dimension,
            entries: self.entries.len(),
            sha256: sha256_hex(&entries_bytes),
            created_at: Utc::now(),
        };
        let manifest_bytes = serde_json::to_vec_pretty(&manifest)?;

        write_atomic(&dir.join(ENTRIES_FILE), &entries_bytes)?;
        write_atomic(&dir.join(MANIFEST_FILE), &manifest_bytes)?;

        info!(
            "Saved index with {} entries to {}",
            self.entries.len(),
            dir.display()
        );
        Ok(())
    }

    /// Load a persisted index from `dir`.
    ///
    /// Unless `trust` is set, the manifest is checked against the entries file
    /// (format version, SHA-256, entry count, dimension) and the recorded
    /// embedding model must equal `expected_model`. Any mismatch is
    /// [`Error::IndexIntegrity`].
    pub fn load(dir: &Path, expected_model: &str, trust: bool) -> Result<Self> {
        let manifest: IndexManifest = serde_json::from_slice(&fs::read(dir.join(MANIFEST_FILE))?)
            .map_err(|e| Error::IndexIntegrity(format!("unreadable manifest: {}", e)))?;
        let entries_bytes = fs::read(dir.join(ENTRIES_FILE))?;

        if trust {
            warn!(
                "Loading index from {} without integrity verification (trust_persisted_index is set)",
                dir.display()
            );
        } else {
            verify_manifest(&manifest, &entries_bytes, expected_model)?;
        }

        let entries: Vec<IndexedEntry> = serde_json::from_slice(&entries_bytes)
            .map_err(|e| Error::IndexIntegrity(format!("unreadable entries: {}", e)))?;

        if !trust && entries.len() != manifest.entries {
            return Err(Error::IndexIntegrity(format!(
                "manifest lists {} entries, found {}",
                manifest.entries,
                entries.len()
            )));
        }

        let index = Self::from_entries(&manifest.embedding_model, entries)
            .map_err(|e| Error::IndexIntegrity(e.to_string()))?;

        if !trust && index.dimension != manifest.dimension {
            return Err(Error::IndexIntegrity(format!(
                "manifest dimension {} does not match entries ({})",
                manifest.dimension, index.dimension
            )));
        }

        info!(
            "Loaded index with {} entries from {}",
            index.len(),
            dir.display()
        );
        Ok(index)
    }
}

fn verify_manifest(manifest: &IndexManifest, entries_bytes: &[u8], expected_model: &str) -> Result<()> {
    if manifest.format_version != FORMAT_VERSION {
        return Err(Error::IndexIntegrity(format!(
            "unsupported format version {}",
            manifest.format_version
        )));
    }

    let actual = sha256_hex(entries_bytes);
    if actual != manifest.sha256 {
        return Err(Error::IndexIntegrity(format!(
            "checksum mismatch: manifest {}, entries {}",
            manifest.sha256, actual
        )));
    }

    if manifest.embedding_model != expected_model {
        return Err(Error::IndexIntegrity(format!(
            "index was built with '{}', current embedding model is '{}'",
            manifest.embedding_model, expected_model
        )));
    }

    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;

    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}
