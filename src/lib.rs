//! # edgequake-html2md
//!
//! Convert saved HTML pages to Markdown with numbered link footnotes.
//!
//! ## Why this crate?
//!
//! Generic HTML-to-Markdown tools keep links inline, so an article with a
//! hundred links turns into a wall of `[text](https://…)`. They also carry
//! over everything a saved web page is made of besides prose: inline SVG
//! icons, favicons, image tags, layout `<div>`s and attribute leftovers.
//! This crate removes that clutter and replaces every hyperlink with a
//! numbered footnote whose definition is the link target. A URL that is
//! linked twice gets the same number both times. Optionally the title of
//! each linked page is fetched and written into its footnote, which turns
//! the footnote list into a bibliography.
//!
//! ## Pipeline Overview
//!
//! ```text
//! HTML / Pandoc JSON
//!  │
//!  ├─ 1. Input      resolve local file, stdin or download from URL
//!  ├─ 2. Clean      drop <svg>/<path> icons and text-less <div>s (DOM)
//!  ├─ 3. Read       html5ever DOM → Pandoc-style document tree
//!  ├─ 4. Transform  links → numbered footnotes, remove images and clutter
//!  ├─ 5. Write      Markdown with [^n] markers (or Pandoc JSON)
//!  ├─ 6. Polish     whitespace cleanup, <sup>,</sup> between adjacent markers
//!  └─ 7. Titles     optional concurrent title lookups with retry/backoff
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_html2md::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .resolve_titles(true)
//!         .build()?;
//!     let output = convert("page.html", &config).await?;
//!     println!("{}", output.content);
//!     eprintln!("{} footnotes, {} titles failed",
//!         output.stats.footnotes,
//!         output.stats.titles_failed);
//!     Ok(())
//! }
//! ```
//!
//! The transformation also works on a Pandoc JSON AST, so the crate can act
//! as a Pandoc filter (see the `html2md-filter` binary):
//!
//! ```rust
//! use edgequake_html2md::reader::json::read_json;
//! use edgequake_html2md::transform::transform;
//!
//! let doc = read_json(r#"{"pandoc-api-version":[1,23,1],"meta":{},"blocks":[]}"#).unwrap();
//! let transformed = transform(doc);
//! assert!(transformed.footnotes.is_empty());
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `html2md` and `html2md-filter` binaries (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-html2md = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod ast;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod reader;
pub mod transform;
pub mod writer;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use ast::Pandoc;
pub use config::{ConversionConfig, ConversionConfigBuilder, InputFormat, OutputFormat};
pub use convert::{convert, convert_str, convert_sync, convert_to_file, write_atomic};
pub use error::{FootnoteError, Html2MdError};
pub use output::{ConversionOutput, ConversionStats, DocumentMetadata, FootnoteResult};
pub use pipeline::clean::clean_html;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use transform::{Footnote, FootnoteTable, Transformed};
