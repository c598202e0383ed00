//! Answer questions over a persisted index.

use anyhow::{Context, Result};
use tracing::info;

use crate::config::RagConfig;
use crate::rag::{RagWorkflow, RetrievedContext, VectorIndex};

/// Load the persisted index for `config`, if one exists.
async fn open_workflow(config: RagConfig) -> Result<RagWorkflow> {
    let index_path = config.index_path.clone();
    let mut workflow = RagWorkflow::from_config(config)?;

    if VectorIndex::exists(&index_path) {
        workflow.build_or_load_index(&index_path).await?;
    } else {
        info!("No index at {}", index_path.display());
    }
    Ok(workflow)
}

/// Answer `query` and print the result.
pub async fn run(config: RagConfig, query: &str) -> Result<String> {
    let workflow = open_workflow(config).await?;
    let answer = workflow
        .generate_response(query)
        .await
        .context("run `acolyte_rag ingest <file>` before asking questions")?;

    println!("{}", answer.trim_end());
    Ok(answer)
}

/// Print the context that would be passed to the answer prompt.
pub async fn run_retrieve(config: RagConfig, query: &str) -> Result<RetrievedContext> {
    let workflow = open_workflow(config).await?;
    let context = workflow
        .retrieve(query)
        .await
        .context("run `acolyte_rag ingest <file>` before retrieving")?;

    println!("Direct matches ({}):", context.direct.len());
    if !context.direct.is_empty() {
        println!("{}", context.direct_block());
    }
    println!("\nQuery expansion ({}):", context.expanded.len());
    if !context.expanded.is_empty() {
        println!("{}", context.expanded_block());
    }
    Ok(context)
}
