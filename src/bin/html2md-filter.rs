//! Pandoc JSON filter.
//!
//! Reads a Pandoc JSON AST on stdin, applies the footnote transformation
//! and writes the transformed AST to stdout:
//!
//! ```text
//! pandoc -f html -t json page.html | html2md-filter | pandoc -f json -t gfm
//! pandoc --filter html2md-filter -f html -t gfm page.html
//! ```
//!
//! Pandoc passes the target format as the first argument when the binary is
//! used with `--filter`; it is accepted and ignored.

use anyhow::{Context, Result};
use edgequake_html2md::reader::json::read_json;
use edgequake_html2md::transform::transform;
use edgequake_html2md::writer::json::write_json;
use std::io::{self, Read, Write};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // stdout carries the AST, so logs go to stderr and stay quiet by default.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read Pandoc JSON from stdin")?;

    let doc = read_json(&input).context("Failed to parse Pandoc JSON")?;
    let transformed = transform(doc);
    info!(
        footnotes = transformed.footnotes.len(),
        "Filter applied"
    );

    let json = write_json(&transformed.document).context("Failed to serialise Pandoc JSON")?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(json.as_bytes())
        .context("Failed to write to stdout")?;
    handle.flush().context("Failed to flush stdout")
}
