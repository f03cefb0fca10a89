//! CLI binary for edgequake-html2md.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use edgequake_html2md::pipeline::footnotes::{append_error_log, error_log_name};
use edgequake_html2md::pipeline::input::load_input;
use edgequake_html2md::{
    clean_html, convert, write_atomic, ConversionConfig, ConversionOutput,
    ConversionProgressCallback, InputFormat, OutputFormat, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback for title lookups: a live bar plus one log
/// line per footnote. Lookups finish out of order, so start times are kept
/// per footnote number.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<u32, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} links  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Titles");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed(&self, number: u32) -> f64 {
        let ms = self
            .start_times
            .lock()
            .map(|mut m| m.remove(&number))
            .ok()
            .flatten()
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);
        ms as f64 / 1000.0
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_resolution_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Looking up titles for {total} links…"))
        ));
    }

    fn on_footnote_start(&self, number: u32, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(number, Instant::now());
        }
        self.bar.set_message(format!("[^{number}]"));
    }

    fn on_footnote_complete(&self, number: u32, total: usize, title: &str) {
        let secs = self.elapsed(number);
        let title: String = if title.chars().count() > 60 {
            title.chars().take(59).chain(std::iter::once('…')).collect()
        } else {
            title.to_string()
        };
        self.bar.println(format!(
            "  {} [^{:<3}] {:>3}  {}  {}",
            green("✓"),
            number,
            total,
            title,
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_footnote_error(&self, number: u32, total: usize, error: &str) {
        let secs = self.elapsed(number);
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Keep long errors to one terminal line.
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} [^{:<3}] {:>3}  {}  {}",
            red("✗"),
            number,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_resolution_complete(&self, total: usize, success_count: usize) {
        let failed = total.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} titles resolved",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} titles resolved  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic conversion (stdout)
  html2md page.html

  # Convert to file
  html2md page.html -o page.md

  # Look up the title of every linked page
  html2md --titles page.html -o page.md

  # Convert from URL or stdin
  html2md https://example.org/article -o article.md
  curl -s https://example.org | html2md -

  # Start from a Pandoc JSON AST, or emit one
  pandoc -f html -t json page.html | html2md --from json -
  html2md --to json page.html | pandoc -f json -t docx -o page.docx

  # Only strip icons and empty <div>s, keep HTML
  html2md --clean-only page.html -o page.clean.html

  # Structured output with per-footnote results
  html2md --json --titles page.html > output.json

ENVIRONMENT VARIABLES:
  Every option can also be set through its HTML2MD_* variable, e.g.
  HTML2MD_CONCURRENCY=4. RUST_LOG overrides the log filter.
"#;

/// Convert saved HTML pages to Markdown with numbered link footnotes.
#[derive(Parser, Debug)]
#[command(
    name = "html2md",
    version,
    about = "Convert HTML pages to Markdown with numbered link footnotes",
    long_about = "Convert an HTML page (local file, URL or stdin) to Markdown. Every hyperlink \
becomes a numbered footnote whose definition is the link URL; repeated URLs share one number. \
Images, icons, empty containers and layout attributes are removed. Optionally, the title of \
every linked page is looked up and written into the footnote.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local HTML file, HTTP/HTTPS URL, or `-` for stdin.
    input: String,

    /// Write output to this file instead of stdout.
    #[arg(short, long, env = "HTML2MD_OUTPUT")]
    output: Option<PathBuf>,

    /// Input format.
    #[arg(long, env = "HTML2MD_FROM", value_enum, default_value = "html")]
    from: FromArg,

    /// Output format.
    #[arg(long, env = "HTML2MD_TO", value_enum, default_value = "markdown")]
    to: ToArg,

    /// Skip the icon / empty-<div> cleaning pass.
    #[arg(long, env = "HTML2MD_NO_CLEAN")]
    no_clean: bool,

    /// Only clean the HTML and write it back out; no Markdown conversion.
    #[arg(long, conflicts_with_all = ["from", "to", "titles", "json"])]
    clean_only: bool,

    /// Fetch every footnote URL and write its title into the footnote.
    #[arg(long, env = "HTML2MD_TITLES")]
    titles: bool,

    /// Number of concurrent title lookups.
    #[arg(short, long, env = "HTML2MD_CONCURRENCY", default_value_t = 8)]
    concurrency: usize,

    /// Per-request timeout for title lookups, in seconds.
    #[arg(long, env = "HTML2MD_FETCH_TIMEOUT", default_value_t = 10,
          value_parser = clap::value_parser!(u64).range(1..))]
    fetch_timeout: u64,

    /// Retries per title lookup on transient failures.
    #[arg(long, env = "HTML2MD_MAX_RETRIES", default_value_t = 1,
          value_parser = clap::value_parser!(u32).range(0..=edgequake_html2md::config::MAX_RETRIES as i64))]
    max_retries: u32,

    /// Base delay before the first retry, in milliseconds (doubles each retry).
    #[arg(long, env = "HTML2MD_RETRY_BACKOFF", default_value_t = 500)]
    retry_backoff: u64,

    /// User-Agent header for downloads and title lookups.
    #[arg(long, env = "HTML2MD_USER_AGENT", default_value = "Mozilla/5.0")]
    user_agent: String,

    /// Date written after "retrieved on" (YYYY-MM-DD). Default: today.
    #[arg(long, env = "HTML2MD_RETRIEVED_ON")]
    retrieved_on: Option<NaiveDate>,

    /// Do not put <sup>,</sup> between adjacent footnote markers.
    #[arg(long, env = "HTML2MD_NO_COMMAS")]
    no_commas: bool,

    /// Prepend YAML front-matter with the page title.
    #[arg(long, env = "HTML2MD_METADATA")]
    metadata: bool,

    /// Output structured JSON (ConversionOutput) instead of the document.
    #[arg(long, env = "HTML2MD_JSON")]
    json: bool,

    /// File that failed title lookups are appended to
    /// (default: errors-YYYY-MM-DD-HH-MM.txt, only created on failure).
    #[arg(long, env = "HTML2MD_ERROR_LOG", value_name = "PATH")]
    error_log: Option<PathBuf>,

    /// Do not write an error log for failed title lookups.
    #[arg(long, env = "HTML2MD_NO_ERROR_LOG", conflicts_with = "error_log")]
    no_error_log: bool,

    /// Disable progress bar.
    #[arg(long, env = "HTML2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "HTML2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "HTML2MD_QUIET")]
    quiet: bool,

    /// HTTP download timeout for URL input, in seconds.
    #[arg(long, env = "HTML2MD_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FromArg {
    Html,
    Json,
}

impl From<FromArg> for InputFormat {
    fn from(v: FromArg) -> Self {
        match v {
            FromArg::Html => InputFormat::Html,
            FromArg::Json => InputFormat::Json,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ToArg {
    #[value(alias = "md")]
    Markdown,
    Json,
}

impl From<ToArg> for OutputFormat {
    fn from(v: ToArg) -> Self {
        match v {
            ToArg::Markdown => OutputFormat::Markdown,
            ToArg::Json => OutputFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = cli.titles && !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Clean-only mode ──────────────────────────────────────────────────
    if cli.clean_only {
        let html = load_input(
            &cli.input,
            InputFormat::Html,
            cli.download_timeout,
            &cli.user_agent,
        )
        .await
        .context("Failed to read input")?;
        let cleaned = clean_html(&html).context("Failed to clean HTML")?;
        emit(cli.output.as_deref(), &cleaned).await?;
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let output = convert(&cli.input, &config)
        .await
        .context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        emit(cli.output.as_deref(), &format!("{json}\n")).await?;
    } else {
        emit(cli.output.as_deref(), &output.content).await?;
    }

    // ── Error log ────────────────────────────────────────────────────────
    if cli.titles && !cli.no_error_log {
        write_error_log(cli.error_log.as_deref(), &output, cli.quiet)?;
    }

    if !cli.quiet {
        print_summary(&cli, &output);
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .input_format(cli.from.into())
        .output_format(cli.to.into())
        .clean_html(!cli.no_clean)
        .resolve_titles(cli.titles)
        .separate_adjacent_footnotes(!cli.no_commas)
        .concurrency(cli.concurrency)
        .fetch_timeout_secs(cli.fetch_timeout)
        .max_retries(cli.max_retries)
        .retry_backoff_ms(cli.retry_backoff)
        .user_agent(cli.user_agent.clone())
        .include_metadata(cli.metadata)
        .download_timeout_secs(cli.download_timeout);

    if let Some(date) = cli.retrieved_on {
        builder = builder.retrieved_on(date);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Write to `path` atomically, or to stdout.
async fn emit(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => write_atomic(path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(content.as_bytes())
                .context("Failed to write to stdout")?;
            handle.flush().context("Failed to flush stdout")
        }
    }
}

fn write_error_log(requested: Option<&Path>, output: &ConversionOutput, quiet: bool) -> Result<()> {
    let path = match requested {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(error_log_name(&chrono::Local::now())),
    };
    let written = append_error_log(&path, &output.titles)
        .with_context(|| format!("Failed to write error log {}", path.display()))?;
    if written && !quiet {
        eprintln!("   errors logged to {}", bold(&path.display().to_string()));
    }
    Ok(())
}

fn print_summary(cli: &Cli, output: &ConversionOutput) {
    let s = &output.stats;
    let target = cli
        .output
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "stdout".to_string());
    eprintln!(
        "{}  {} footnotes  {}ms  →  {}",
        if s.titles_failed == 0 { green("✔") } else { cyan("⚠") },
        s.footnotes,
        s.total_duration_ms,
        bold(&target),
    );
    eprintln!(
        "   {} images, {} icons, {} empty containers removed  /  {} commas inserted",
        dim(&s.images_removed.to_string()),
        dim(&(s.svgs_removed + s.raw_fragments_removed).to_string()),
        dim(&(s.divs_removed + s.containers_pruned).to_string()),
        dim(&s.commas_inserted.to_string()),
    );
    if cli.titles {
        eprintln!(
            "   {} titles resolved, {} failed, {}ms fetching",
            s.titles_resolved,
            if s.titles_failed == 0 {
                s.titles_failed.to_string()
            } else {
                red(&s.titles_failed.to_string())
            },
            s.fetch_duration_ms,
        );
    }
}
