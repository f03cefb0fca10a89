//! Error types for the edgequake-html2md library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Html2MdError`]: **Fatal**: the conversion cannot proceed at all
//!   (missing input file, unreadable download, malformed JSON AST, invalid
//!   configuration). Returned as `Err(Html2MdError)` from the top-level
//!   `convert*` functions.
//!
//! * [`FootnoteError`]: **Non-fatal**: the title lookup for a single
//!   footnote URL failed (timeout, HTTP error, bot-protection page). Stored
//!   inside [`crate::output::FootnoteResult`]; the footnote keeps a
//!   placeholder title and the rest of the document is unaffected.
//!
//! The document transformer itself never fails: every rewrite rule is total
//! over its input.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-html2md library.
#[derive(Debug, Error)]
pub enum Html2MdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path, '-' or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The input was read but does not look like an HTML (or text) document.
    #[error("Input '{source_name}' is not an HTML document: {detail}")]
    NotHtml { source_name: String, detail: String },

    /// The input bytes are not valid UTF-8.
    #[error("Input '{source_name}' is not valid UTF-8 text")]
    NotUtf8 { source_name: String },

    // ── Document errors ───────────────────────────────────────────────────
    /// The HTML parser could not consume the input stream.
    #[error("Failed to parse HTML: {0}")]
    HtmlParse(String),

    /// A Pandoc JSON AST could not be decoded.
    #[error("Invalid Pandoc JSON AST: {0}")]
    InvalidAst(#[from] serde_json::Error),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single footnote title lookup.
///
/// Stored alongside [`crate::output::FootnoteResult`] when the lookup fails.
/// The footnote still renders, with a placeholder title.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum FootnoteError {
    /// Transport-level failure after all retries.
    #[error("Footnote {number}: request to {url} failed after {retries} retries: {detail}")]
    FetchFailed {
        number: u32,
        url: String,
        retries: u8,
        detail: String,
    },

    /// The server answered with a non-success status.
    #[error("Footnote {number}: {url} returned HTTP {status}")]
    HttpStatus { number: u32, url: String, status: u16 },

    /// The request did not finish in time.
    #[error("Footnote {number}: {url} timed out after {secs}s")]
    Timeout { number: u32, url: String, secs: u64 },

    /// The response is neither HTML nor PDF.
    #[error("Footnote {number}: unknown content type for {url}: {content_type}")]
    UnknownContentType {
        number: u32,
        url: String,
        content_type: String,
    },

    /// The page is a bot-protection interstitial rather than the real content.
    #[error("Footnote {number}: bot protection page detected at {url}")]
    BotProtection { number: u32, url: String },
}

impl FootnoteError {
    pub fn number(&self) -> u32 {
        match self {
            FootnoteError::FetchFailed { number, .. }
            | FootnoteError::HttpStatus { number, .. }
            | FootnoteError::Timeout { number, .. }
            | FootnoteError::UnknownContentType { number, .. }
            | FootnoteError::BotProtection { number, .. } => *number,
        }
    }
}
