//! Configuration types for HTML-to-Markdown conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Every knob lives in one struct so a
//! config can be shared across the concurrent title lookups and logged as a
//! whole.

use crate::error::Html2MdError;
use crate::progress::ProgressCallback;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration for an HTML-to-Markdown conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_html2md::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .resolve_titles(true)
///     .concurrency(4)
///     .fetch_timeout_secs(5)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// What the input holds. Default: [`InputFormat::Html`].
    pub input_format: InputFormat,

    /// What to produce. Default: [`OutputFormat::Markdown`].
    pub output_format: OutputFormat,

    /// Remove `<svg>`/`<path>` icons and text-less `<div>`s before reading.
    /// Default: true. Ignored for JSON input.
    pub clean_html: bool,

    /// Insert `<sup>,</sup>` between adjacent footnote markers. Default: true.
    pub separate_adjacent_footnotes: bool,

    /// Fetch every footnote URL and replace the bare link in its definition
    /// with `[title](url) retrieved on DATE`. Default: false.
    ///
    /// Requires Markdown output; JSON output carries no definition list.
    pub resolve_titles: bool,

    /// Number of concurrent title lookups. Default: 8.
    pub concurrency: usize,

    /// Per-request timeout for a title lookup, in seconds. Default: 10.
    pub fetch_timeout_secs: u64,

    /// Retry attempts for a title lookup after a transport error, HTTP 429
    /// or 5xx. Default: 1. At most [`MAX_RETRIES`].
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s.
    pub retry_backoff_ms: u64,

    /// `User-Agent` header sent with every request. Default: `Mozilla/5.0`.
    ///
    /// Many sites reject requests without a browser-like agent.
    pub user_agent: String,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Date written after `retrieved on`. Default: None (today, local time).
    pub retrieved_on: Option<NaiveDate>,

    /// Emit YAML front matter with the page title. Default: false.
    pub include_metadata: bool,

    /// Optional callback for title-resolution progress events.
    ///
    /// Inject an `Arc<dyn ConversionProgressCallback>` to receive events as
    /// each footnote URL is looked up.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            input_format: InputFormat::default(),
            output_format: OutputFormat::default(),
            clean_html: true,
            separate_adjacent_footnotes: true,
            resolve_titles: false,
            concurrency: 8,
            fetch_timeout_secs: 10,
            max_retries: 1,
            retry_backoff_ms: 500,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            download_timeout_secs: 120,
            retrieved_on: None,
            include_metadata: false,
            progress_callback: None,
        }
    }
}

/// Default `User-Agent` header.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

/// Upper bound for [`ConversionConfig::max_retries`].
pub const MAX_RETRIES: u32 = 10;

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("input_format", &self.input_format)
            .field("output_format", &self.output_format)
            .field("clean_html", &self.clean_html)
            .field("separate_adjacent_footnotes", &self.separate_adjacent_footnotes)
            .field("resolve_titles", &self.resolve_titles)
            .field("concurrency", &self.concurrency)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("user_agent", &self.user_agent)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("retrieved_on", &self.retrieved_on)
            .field("include_metadata", &self.include_metadata)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The `retrieved on` date: the configured one, or today.
    pub fn retrieval_date(&self) -> NaiveDate {
        self.retrieved_on
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn input_format(mut self, format: InputFormat) -> Self {
        self.config.input_format = format;
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    pub fn clean_html(mut self, v: bool) -> Self {
        self.config.clean_html = v;
        self
    }

    pub fn separate_adjacent_footnotes(mut self, v: bool) -> Self {
        self.config.separate_adjacent_footnotes = v;
        self
    }

    pub fn resolve_titles(mut self, v: bool) -> Self {
        self.config.resolve_titles = v;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn retrieved_on(mut self, date: NaiveDate) -> Self {
        self.config.retrieved_on = Some(date);
        self
    }

    pub fn include_metadata(mut self, v: bool) -> Self {
        self.config.include_metadata = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Html2MdError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(Html2MdError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.resolve_titles && c.fetch_timeout_secs == 0 {
            return Err(Html2MdError::InvalidConfig(
                "Fetch timeout must be ≥ 1s when resolving titles".into(),
            ));
        }
        if c.resolve_titles && c.output_format != OutputFormat::Markdown {
            return Err(Html2MdError::InvalidConfig(
                "Title resolution needs Markdown output (JSON has no footnote list)".into(),
            ));
        }
        if c.max_retries > MAX_RETRIES {
            return Err(Html2MdError::InvalidConfig(format!(
                "Max retries must be ≤ {MAX_RETRIES} (got {})",
                c.max_retries
            )));
        }
        if c.user_agent.trim().is_empty() {
            return Err(Html2MdError::InvalidConfig("User agent must not be empty".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Format of the conversion input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InputFormat {
    /// An HTML page (default).
    #[default]
    Html,
    /// A Pandoc JSON AST, e.g. from `pandoc -f html -t json`.
    Json,
}

/// Format of the conversion output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Markdown with `[^n]` footnotes (default).
    #[default]
    Markdown,
    /// Pandoc JSON AST with the footnotes as inline `Note` nodes.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ConversionConfig::default();
        assert!(c.clean_html);
        assert!(c.separate_adjacent_footnotes);
        assert!(!c.resolve_titles);
        assert_eq!(c.concurrency, 8);
        assert_eq!(c.user_agent, "Mozilla/5.0");
        assert_eq!(c.input_format, InputFormat::Html);
        assert_eq!(c.output_format, OutputFormat::Markdown);
    }

    #[test]
    fn concurrency_is_clamped_to_one() {
        let c = ConversionConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn titles_require_markdown_output() {
        let err = ConversionConfig::builder()
            .resolve_titles(true)
            .output_format(OutputFormat::Json)
            .build()
            .unwrap_err();
        assert!(matches!(err, Html2MdError::InvalidConfig(_)));
    }

    #[test]
    fn zero_fetch_timeout_rejected_only_with_titles() {
        assert!(ConversionConfig::builder().fetch_timeout_secs(0).build().is_ok());
        assert!(ConversionConfig::builder()
            .fetch_timeout_secs(0)
            .resolve_titles(true)
            .build()
            .is_err());
    }

    #[test]
    fn retries_are_capped() {
        assert!(ConversionConfig::builder().max_retries(MAX_RETRIES).build().is_ok());
        let err = ConversionConfig::builder()
            .max_retries(u32::MAX)
            .build()
            .unwrap_err();
        assert!(matches!(err, Html2MdError::InvalidConfig(_)));
    }

    #[test]
    fn fixed_retrieval_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let c = ConversionConfig::builder().retrieved_on(date).build().unwrap();
        assert_eq!(c.retrieval_date(), date);
    }

    #[test]
    fn debug_hides_callback() {
        let c = ConversionConfig::builder()
            .progress_callback(std::sync::Arc::new(crate::progress::NoopProgressCallback))
            .build()
            .unwrap();
        assert!(format!("{c:?}").contains("<dyn ConversionProgressCallback>"));
    }
}
