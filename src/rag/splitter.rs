use once_cell::sync::Lazy;
use regex::Regex;

use crate::{Error, Result};

/// Newline followed by one or two `#`: Markdown `#`/`##` headings.
pub const HEADING_PATTERN: &str = r"\n##?";

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(HEADING_PATTERN).expect("heading pattern is valid"));

/// Splits a document into sections at heading markers.
///
/// Sections are the exact substrings between markers, in document order.
/// The marker itself is dropped, so `"a\n# B\nc"` yields `["a", " B\nc"]`.
/// Empty spans are kept, so the number of sections is always one more than
/// the number of markers.
#[derive(Debug, Clone)]
pub struct SectionSplitter {
    pattern: Regex,
}

impl Default for SectionSplitter {
    fn default() -> Self {
        Self {
            pattern: HEADING_RE.clone(),
        }
    }
}

impl SectionSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split on a custom regular expression instead of Markdown headings.
    pub fn with_pattern(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| Error::InvalidArgument(format!("invalid section pattern: {}", e)))?;
        Ok(Self { pattern })
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.pattern.split(text).map(str::to_string).collect()
    }
}
