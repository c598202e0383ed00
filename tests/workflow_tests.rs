//! Workflow contract tests with deterministic stand-in models.
//!
//! The chat model and embedder are replaced by in-process stand-ins that
//! count calls and record prompts, so these tests never touch the network.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use acolyte_rag::config::{ChatBackend, RagConfig, LOCAL_EMBEDDING_MODEL};
use acolyte_rag::rag::{
    ChatModel, Embedder, IndexSource, LocalEmbedder, RagWorkflow, RetrievedContext, SectionSplitter,
    VectorIndex,
};
use acolyte_rag::{Error, Result};

// ============================================================================
// Stand-ins
// ============================================================================

#[derive(Clone, Default)]
struct RecordingChat {
    prompts: Arc<Mutex<Vec<String>>>,
    summary_calls: Arc<AtomicUsize>,
}

impl RecordingChat {
    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn summary_calls(&self) -> usize {
        self.summary_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for RecordingChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        if prompt.starts_with("Summarize the following text:") {
            let n = self.summary_calls.fetch_add(1, Ordering::SeqCst);
            return Ok(format!("summary {}", n));
        }
        if prompt.contains("Original question:") {
            return Ok("first variant\nsecond variant".to_string());
        }
        Ok("final answer".to_string())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

#[derive(Clone, Default)]
struct CountingEmbedder {
    inner: LocalEmbedder,
    document_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Embedder for CountingEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.document_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.inner.embed(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.inner.embed(text))
    }

    fn model(&self) -> &str {
        LOCAL_EMBEDDING_MODEL
    }
}

fn config(index_path: &Path) -> RagConfig {
    RagConfig {
        chat_backend: ChatBackend::Llama31,
        embedding_model: LOCAL_EMBEDDING_MODEL.to_string(),
        index_path: index_path.to_path_buf(),
        ..Default::default()
    }
}

fn workflow(index_path: &Path, chat: &RecordingChat, embedder: &CountingEmbedder) -> RagWorkflow {
    RagWorkflow::with_backends(
        config(index_path),
        Box::new(chat.clone()),
        Box::new(embedder.clone()),
    )
}

const DOCUMENT: &str = "Preface about the guide\n# Installation\nRun the installer.\n## Usage\nCall the binary.";

// ============================================================================
// Splitting
// ============================================================================

#[test]
fn two_heading_markers_yield_three_sections() {
    let sections = SectionSplitter::new().split(DOCUMENT);

    assert_eq!(
        sections,
        vec![
            "Preface about the guide",
            " Installation\nRun the installer.",
            " Usage\nCall the binary.",
        ]
    );
}

// ============================================================================
// Ingestion
// ============================================================================

#[tokio::test]
async fn ingestion_produces_aligned_summaries_and_records() {
    let dir = tempfile::tempdir().unwrap();
    let chat = RecordingChat::default();
    let embedder = CountingEmbedder::default();
    let mut wf = workflow(&dir.path().join("index"), &chat, &embedder);

    let report = wf.load(DOCUMENT).await.unwrap();

    assert_eq!(report.source, IndexSource::Built);
    assert_eq!(wf.sections().len(), 3);
    assert_eq!(wf.summaries().len(), 3);
    assert_eq!(wf.records().len(), 3);
    assert_eq!(chat.summary_calls(), 3);

    for (i, (section, record)) in wf.sections().iter().zip(wf.records()).enumerate() {
        assert_eq!(&record.original, section);
        assert_eq!(wf.summaries()[i], format!("summary {}", i));

        let entry = wf.index().unwrap().get(&record.id).unwrap();
        assert_eq!(entry.page_content, wf.summaries()[i]);
        assert_eq!(&entry.metadata.original_content, section);
        assert_eq!(entry.metadata.kind, "text");
    }

    let prompts = chat.prompts();
    assert!(prompts[1].ends_with(" Installation\nRun the installer.\n"));
}

// ============================================================================
// State errors
// ============================================================================

#[tokio::test]
async fn answering_before_ingestion_is_state_error() {
    let dir = tempfile::tempdir().unwrap();
    let chat = RecordingChat::default();
    let wf = workflow(&dir.path().join("index"), &chat, &CountingEmbedder::default());

    let err = wf.generate_response("What is this?").await.unwrap_err();

    assert!(matches!(err, Error::IndexNotBuilt));
    assert!(chat.prompts().is_empty());
}

// ============================================================================
// Persisted index reuse
// ============================================================================

#[tokio::test]
async fn existing_index_skips_summarization_and_embedding() {
    let dir = tempfile::tempdir().unwrap();
    let index_path = dir.path().join("index");

    let first_chat = RecordingChat::default();
    let first_embedder = CountingEmbedder::default();
    let mut first = workflow(&index_path, &first_chat, &first_embedder);
    first.load(DOCUMENT).await.unwrap();
    let original = first.index().unwrap().entries().to_vec();

    let second_chat = RecordingChat::default();
    let second_embedder = CountingEmbedder::default();
    let mut second = workflow(&index_path, &second_chat, &second_embedder);
    let report = second.load("completely different text\n# Other").await.unwrap();

    assert_eq!(report.source, IndexSource::Loaded);
    assert!(report.sections.is_empty());
    assert_eq!(second_chat.summary_calls(), 0);
    assert!(second_chat.prompts().is_empty());
    assert_eq!(second_embedder.document_calls.load(Ordering::SeqCst), 0);
    assert_eq!(second.index().unwrap().entries(), original.as_slice());
}

#[tokio::test]
async fn tampered_index_is_rejected_unless_trusted() {
    let dir = tempfile::tempdir().unwrap();
    let index_path = dir.path().join("index");

    let chat = RecordingChat::default();
    let embedder = CountingEmbedder::default();
    workflow(&index_path, &chat, &embedder)
        .load(DOCUMENT)
        .await
        .unwrap();

    let entries = index_path.join("entries.json");
    let content = std::fs::read_to_string(&entries).unwrap();
    std::fs::write(&entries, content.replace("installer", "uninstaller")).unwrap();

    let mut strict = workflow(&index_path, &chat, &embedder);
    assert!(matches!(
        strict.load(DOCUMENT).await,
        Err(Error::IndexIntegrity(_))
    ));
    assert!(!strict.has_index());

    let mut trusting = RagWorkflow::with_backends(
        config(&index_path).with_trust_persisted_index(true),
        Box::new(chat.clone()),
        Box::new(embedder.clone()),
    );
    assert_eq!(
        trusting.load(DOCUMENT).await.unwrap().source,
        IndexSource::Loaded
    );
}

// ============================================================================
// Answering
// ============================================================================

#[tokio::test]
async fn answer_receives_snippets_in_retrieval_order() {
    let dir = tempfile::tempdir().unwrap();
    let chat = RecordingChat::default();
    let wf = workflow(&dir.path().join("index"), &chat, &CountingEmbedder::default());

    let context = RetrievedContext {
        direct: vec!["snippet one".to_string()],
        expanded: vec!["snippet two".to_string()],
    };

    let answer = wf.answer("What happened?", &context.render()).await.unwrap();
    assert_eq!(answer, "final answer");

    let prompts = chat.prompts();
    let prompt = prompts.last().unwrap();
    let one = prompt.find("snippet one").unwrap();
    let two = prompt.find("snippet two").unwrap();
    assert!(one < two);
    assert!(prompt.contains("Question: What happened?"));
}

#[tokio::test]
async fn generate_response_passes_both_retrieval_blocks() {
    let dir = tempfile::tempdir().unwrap();
    let chat = RecordingChat::default();
    let embedder = CountingEmbedder::default();
    let mut wf = workflow(&dir.path().join("index"), &chat, &embedder);
    wf.load(DOCUMENT).await.unwrap();

    let answer = wf.generate_response("How do I run the installer?").await.unwrap();
    assert_eq!(answer, "final answer");

    let prompts = chat.prompts();
    let final_prompt = prompts.last().unwrap();
    assert!(final_prompt.contains("[text] Installation\nRun the installer."));
    assert!(final_prompt.contains("\n---\nsummary "));

    let direct = final_prompt.find("[text]").unwrap();
    let expanded = final_prompt.find("\n---\nsummary ").unwrap();
    assert!(direct < expanded);
}

#[tokio::test]
async fn retrieve_queries_index_not_memory() {
    let dir = tempfile::tempdir().unwrap();
    let index_path = dir.path().join("index");
    let chat = RecordingChat::default();
    let embedder = CountingEmbedder::default();

    workflow(&index_path, &chat, &embedder)
        .load(DOCUMENT)
        .await
        .unwrap();

    let mut reopened = workflow(&index_path, &chat, &embedder);
    assert_eq!(
        reopened.build_or_load_index(&index_path).await.unwrap(),
        IndexSource::Loaded
    );
    assert!(reopened.sections().is_empty());

    let context = reopened.retrieve("installer").await.unwrap();
    assert_eq!(context.direct.len(), 3);
    assert!(context
        .direct
        .iter()
        .any(|s| s == " Installation\nRun the installer."));
    assert!(VectorIndex::exists(&index_path));
}
