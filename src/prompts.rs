//! Prompt templates for summarization, query expansion and answering.
//!
//! Built-in templates can be overridden by Markdown files in the `prompts/`
//! directory at the project root.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{Error, Result};

const SUMMARY_TEMPLATE: &str = "Summarize the following {element_type}:\n{element}\n";

const MULTI_QUERY_TEMPLATE: &str = "You are an AI language model assistant. Your task is to generate \
{count} different versions of the given user question to retrieve relevant documents from a vector \
database. By generating multiple perspectives on the user question, your goal is to help the user \
overcome some of the limitations of the distance-based similarity search. Provide these alternative \
questions separated by newlines.
Original question: {question}
";

const ANSWER_TEMPLATE: &str = r#"You are a helpful assistant who answers user queries using the contexts provided. If the question cannot be answered using the information provided say "I don't know".

Assess the complexity and scope of the query to determine whether a concise or detailed response is more appropriate:
- For simple, straightforward questions, provide a brief, to-the-point answer.
- For complex or open-ended questions, offer a more comprehensive response.

Format your answer based on the nature of the information:
- Use bullet points for lists or step-by-step instructions.
- Use numbered lists for sequential information or ranked items.
- Use code blocks for any code snippets or technical commands.
- Use italics or bold for emphasis on key points when appropriate.

If your answer is detailed, consider structuring it with clear headings or sections for better readability.

Contexts:
{contexts}

Question: {query}

Based on the above guidelines, provide your response below:
"#;

/// Available prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// Single-section summary.
    Summary,
    /// Query rewriting for multi-query retrieval.
    MultiQuery,
    /// Final answer over retrieved contexts.
    Answer,
}

impl Prompt {
    /// Override file name (Markdown).
    pub fn filename(&self) -> &'static str {
        match self {
            Prompt::Summary => "summary.md",
            Prompt::MultiQuery => "multi_query.md",
            Prompt::Answer => "answer.md",
        }
    }

    /// Template compiled into the binary.
    pub fn builtin(&self) -> &'static str {
        match self {
            Prompt::Summary => SUMMARY_TEMPLATE,
            Prompt::MultiQuery => MULTI_QUERY_TEMPLATE,
            Prompt::Answer => ANSWER_TEMPLATE,
        }
    }

    /// Placeholders the template must fill.
    pub fn variables(&self) -> &'static [&'static str] {
        match self {
            Prompt::Summary => &["element_type", "element"],
            Prompt::MultiQuery => &["count", "question"],
            Prompt::Answer => &["contexts", "query"],
        }
    }

    /// Override file if present, otherwise the built-in template.
    ///
    /// An override that exists but cannot be read is an error.
    pub fn template(&self) -> Result<String> {
        self.template_in(&prompts_dir()).map(|(text, _)| text)
    }

    /// Template text and a label naming where it came from.
    fn template_in(&self, dir: &Path) -> Result<(String, String)> {
        let path = dir.join(self.filename());
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                debug!("Using prompt override {}", path.display());
                Ok((text, path.display().to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Ok((self.builtin().to_string(), "built-in template".to_string()))
            }
            Err(e) => Err(Error::InvalidArgument(format!(
                "Failed to load prompt {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Fill the template with `(name, value)` pairs.
    ///
    /// Every variable of the prompt must be supplied and must appear in the template.
    pub fn render(&self, vars: &[(&str, &str)]) -> Result<String> {
        self.render_in(&prompts_dir(), vars)
    }

    fn render_in(&self, dir: &Path, vars: &[(&str, &str)]) -> Result<String> {
        let (template, source) = self.template_in(dir)?;
        render_template(&source, &template, self.variables(), vars)
    }
}

fn render_template(
    source: &str,
    template: &str,
    required: &[&str],
    vars: &[(&str, &str)],
) -> Result<String> {
    for name in required {
        if !vars.iter().any(|(key, _)| key == name) {
            return Err(Error::InvalidArgument(format!(
                "missing prompt variable '{}'",
                name
            )));
        }
        if !template.contains(&format!("{{{}}}", name)) {
            return Err(Error::InvalidArgument(format!(
                "{} has no {{{}}} placeholder",
                source, name
            )));
        }
    }

    // Single pass so that values containing `{...}` are never re-expanded.
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replaced = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

/// Load a prompt by file name.
pub fn load_prompt(filename: &str) -> Result<String> {
    let path = prompts_dir().join(filename);
    std::fs::read_to_string(&path).map_err(|e| {
        Error::InvalidArgument(format!("Failed to load prompt {}: {}", filename, e))
    })
}

/// Path to the prompts directory.
pub fn prompts_dir() -> PathBuf {
    let candidates = [
        PathBuf::from("prompts"),
        PathBuf::from("../prompts"),
        PathBuf::from("../../prompts"),
    ];

    for path in candidates {
        if path.exists() {
            return path;
        }
    }

    PathBuf::from("prompts")
}

/// All prompts.
pub fn list_prompts() -> Vec<Prompt> {
    vec![Prompt::Summary, Prompt::MultiQuery, Prompt::Answer]
}
