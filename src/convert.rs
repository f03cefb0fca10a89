//! Conversion entry points.
//!
//! [`convert`] runs the whole pipeline for a path, URL or stdin;
//! [`convert_str`] does the same for HTML (or JSON) already in memory. Both
//! return a [`ConversionOutput`]; only fatal problems (unreadable input,
//! malformed JSON, bad configuration) are errors. Failed title lookups are
//! reported per footnote inside the output.

use crate::ast::Pandoc;
use crate::config::{ConversionConfig, InputFormat, OutputFormat};
use crate::error::Html2MdError;
use crate::output::{ConversionOutput, ConversionStats, DocumentMetadata};
use crate::pipeline::clean::{clean_dom, CleanStats};
use crate::pipeline::{footnotes, input, postprocess, titles};
use crate::reader::{html, json};
use crate::transform::transform;
use crate::writer::json::write_json;
use crate::writer::markdown::{write_markdown_with, MarkdownOptions};
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Convert an HTML file, URL or stdin (`-`) to Markdown.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input`: Local file path, HTTP/HTTPS URL, or `-` for stdin
/// * `config`: Conversion configuration
///
/// # Errors
/// Returns `Err(Html2MdError)` only for fatal errors:
/// - File not found / permission denied / download failed
/// - Not an HTML document, or not UTF-8
/// - Malformed Pandoc JSON (with [`InputFormat::Json`])
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Html2MdError> {
    let start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting conversion: {}", input_str);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let text = input::load_input(
        input_str,
        config.input_format,
        config.download_timeout_secs,
        &config.user_agent,
    )
    .await?;

    run(input_str, &text, config, start).await
}

/// Convert a document held in memory.
///
/// `text` is HTML, or a Pandoc JSON AST when `config.input_format` is
/// [`InputFormat::Json`].
///
/// # Example
/// ```rust,no_run
/// use edgequake_html2md::{convert_str, ConversionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let html = r#"<p>See <a href="https://www.rust-lang.org">Rust</a>.</p>"#;
/// let output = convert_str(html, &ConversionConfig::default()).await?;
/// assert_eq!(output.content, "See [^1].\n\n[^1]: https://www.rust-lang.org\n");
/// # Ok(())
/// # }
/// ```
pub async fn convert_str(
    text: &str,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Html2MdError> {
    run("<string>", text, config, Instant::now()).await
}

/// Convert and write the result directly to a file.
///
/// Uses an atomic write (temp file in the target directory, then rename) so
/// a failed run never leaves a partial file behind.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Html2MdError> {
    let output = convert(input_str, config).await?;
    write_atomic(output_path.as_ref(), &output.content).await?;
    Ok(output)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Html2MdError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Html2MdError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

/// Write `content` to `path` via a temp file in the same directory.
pub async fn write_atomic(path: &Path, content: &str) -> Result<(), Html2MdError> {
    let path = path.to_path_buf();
    let content = content.to_string();
    tokio::task::spawn_blocking(move || write_atomic_blocking(&path, &content))
        .await
        .map_err(|e| Html2MdError::Internal(format!("write task failed: {e}")))?
}

fn write_atomic_blocking(path: &Path, content: &str) -> Result<(), Html2MdError> {
    let write_err = |source: std::io::Error| Html2MdError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(content.as_bytes()).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run(
    source: &str,
    text: &str,
    config: &ConversionConfig,
    start: Instant,
) -> Result<ConversionOutput, Html2MdError> {
    // ── Step 2: Read (and clean) the document ────────────────────────────
    let (doc, clean_stats) = read_document(text, config)?;
    let title = doc.title();

    // ── Step 3: Transform ────────────────────────────────────────────────
    let transformed = transform(doc);
    let t = &transformed.stats;
    let mut stats = ConversionStats {
        svgs_removed: clean_stats.svgs_removed,
        divs_removed: clean_stats.divs_removed,
        links_converted: t.links_converted,
        footnotes: transformed.footnotes.len(),
        images_removed: t.images_removed,
        raw_fragments_removed: t.raw_fragments_removed,
        containers_pruned: t.containers_pruned,
        heading_artifacts_removed: t.heading_artifacts_removed,
        ..ConversionStats::default()
    };

    // ── Step 4: Write ────────────────────────────────────────────────────
    let mut titles_found = Vec::new();
    let content = match config.output_format {
        OutputFormat::Json => write_json(&transformed.document)?,
        OutputFormat::Markdown => {
            let options = MarkdownOptions {
                front_matter: config.include_metadata,
            };
            let markdown =
                write_markdown_with(&transformed.document, &transformed.footnotes, &options);
            let mut markdown = postprocess::clean_markdown(&markdown);

            // ── Step 5: Footnote markers ─────────────────────────────────
            if config.separate_adjacent_footnotes {
                let (separated, count) = footnotes::separate_adjacent_markers(&markdown);
                debug!("Inserted {} footnote separators", count);
                markdown = separated;
                stats.commas_inserted = count;
            }

            // ── Step 6: Footnote titles ──────────────────────────────────
            if config.resolve_titles && !transformed.footnotes.is_empty() {
                let fetch_start = Instant::now();
                titles_found =
                    titles::resolve_titles(transformed.footnotes.footnotes(), config).await?;
                stats.fetch_duration_ms = fetch_start.elapsed().as_millis() as u64;
                stats.titles_resolved = titles_found.iter().filter(|r| r.is_ok()).count();
                stats.titles_failed = titles_found.len() - stats.titles_resolved;
                markdown =
                    footnotes::apply_titles(&markdown, &titles_found, config.retrieval_date());
            }
            markdown
        }
    };

    stats.total_duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Conversion complete: {} footnotes, {} images removed, {}ms total",
        stats.footnotes, stats.images_removed, stats.total_duration_ms
    );

    Ok(ConversionOutput {
        content,
        footnotes: transformed.footnotes.into_footnotes(),
        titles: titles_found,
        metadata: DocumentMetadata {
            source: source.to_string(),
            title,
        },
        stats,
    })
}

/// Parse the input into a document tree. Synchronous: the DOM is not `Send`
/// and must not live across an await point.
fn read_document(
    text: &str,
    config: &ConversionConfig,
) -> Result<(Pandoc, CleanStats), Html2MdError> {
    match config.input_format {
        InputFormat::Json => Ok((json::read_json(text)?, CleanStats::default())),
        InputFormat::Html => {
            let dom = html::parse_dom(text)?;
            let stats = if config.clean_html {
                clean_dom(&dom)
            } else {
                CleanStats::default()
            };
            Ok((html::dom_to_pandoc(&dom), stats))
        }
    }
}
