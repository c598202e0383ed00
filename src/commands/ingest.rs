//! Ingest a document: split, summarize, embed and persist the index.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::RagConfig;
use crate::rag::{IndexSource, LoadReport, RagWorkflow};

/// Ingest `file` with `config`, printing a short report.
pub async fn run(config: RagConfig, file: &Path) -> Result<LoadReport> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    info!("Ingesting {} ({} bytes)", file.display(), text.len());

    let index_path = config.index_path.clone();
    let mut workflow = RagWorkflow::from_config(config)?;
    let report = workflow.load(&text).await?;

    print_report(&report, &index_path);
    Ok(report)
}

fn print_report(report: &LoadReport, index_path: &Path) {
    match report.source {
        IndexSource::Loaded => {
            println!(
                "Index already exists at {}; ingestion skipped.",
                index_path.display()
            );
            println!("Remove the directory to re-ingest.");
        }
        IndexSource::Built => {
            println!(
                "Indexed {} sections into {}",
                report.sections.len(),
                index_path.display()
            );
            for (i, summary) in report.summaries.iter().enumerate() {
                println!("  {}. {}", i + 1, first_line(summary));
            }
        }
    }
}

fn first_line(text: &str) -> &str {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_skips_blank_lines() {
        assert_eq!(first_line("\n\n  Rust is fast.\nMore"), "Rust is fast.");
        assert_eq!(first_line(""), "");
    }
}
