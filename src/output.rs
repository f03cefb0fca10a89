//! Result types returned by the conversion entry points.

use crate::error::FootnoteError;
use crate::transform::Footnote;
use serde::{Deserialize, Serialize};

/// Everything a conversion produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// The rendered document: Markdown, or Pandoc JSON when
    /// [`crate::config::OutputFormat::Json`] was requested.
    pub content: String,
    /// Footnotes created from links, in number order.
    pub footnotes: Vec<Footnote>,
    /// Title lookups, in footnote-number order. Empty unless
    /// `resolve_titles` was enabled.
    pub titles: Vec<FootnoteResult>,
    pub metadata: DocumentMetadata,
    pub stats: ConversionStats,
}

/// Outcome of the title lookup for one footnote URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootnoteResult {
    pub number: u32,
    pub url: String,
    /// The page title, or a placeholder such as `Untitled Webpage`.
    pub title: String,
    pub retries: u8,
    pub duration_ms: u64,
    pub error: Option<FootnoteError>,
}

impl FootnoteResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Facts about the converted document itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// The input as given: path, URL or `-`.
    pub source: String,
    /// `<title>` of the page (or `title` metadata of a JSON AST).
    pub title: Option<String>,
}

/// Counters for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    pub svgs_removed: usize,
    pub divs_removed: usize,
    pub links_converted: usize,
    pub footnotes: usize,
    pub images_removed: usize,
    pub raw_fragments_removed: usize,
    pub containers_pruned: usize,
    pub heading_artifacts_removed: usize,
    pub commas_inserted: usize,
    pub titles_resolved: usize,
    pub titles_failed: usize,
    pub total_duration_ms: u64,
    pub fetch_duration_ms: u64,
}
