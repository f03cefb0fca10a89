//! Title resolution: fetch each footnote URL and find a human-readable title.
//!
//! The only stage besides input download with network I/O. Every distinct
//! footnote URL is requested once; lookups run concurrently, bounded by
//! `config.concurrency`, and results are sorted back into footnote-number
//! order so the output does not depend on which server answered first.
//!
//! ## Title rules
//!
//! | Content-Type | Title |
//! |--------------|-------|
//! | `text/html` | `<title>` text, trimmed; `Untitled Webpage` if absent |
//! | `application/pdf` | document-info `/Title`; `Untitled PDF` if absent |
//! | anything else | `Unknown Resource`, recorded as an error |
//!
//! A page whose title announces a bot-protection interstitial ("Verifying if
//! your connection is secure…", anything mentioning Cloudflare) is an error:
//! its title says nothing about the linked resource.
//!
//! ## Retry Strategy
//!
//! Transport errors, timeouts, HTTP 429 and 5xx are retried with exponential
//! backoff (`retry_backoff_ms * 2^(attempt-1)`, saturating). At most
//! [`MAX_RETRIES`](crate::config::MAX_RETRIES) retries are allowed. Other
//! non-success statuses fail immediately. A failed lookup never aborts the
//! conversion; the footnote gets the `Error retrieving title` placeholder.
//!
//! ## HTTP status codes
//!
//! Any response outside 2xx is a [`FootnoteError::HttpStatus`] error, even
//! when the server sends an HTML error page with a `<title>`. A "404 Not
//! Found" page title names the error, not the linked resource, so the
//! footnote gets `Error retrieving title` and the failure goes to the error
//! log.

use crate::config::ConversionConfig;
use crate::error::{FootnoteError, Html2MdError};
use crate::output::FootnoteResult;
use crate::reader::html::{find_title, parse_dom};
use crate::transform::Footnote;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::bytes::Regex as BytesRegex;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

pub const UNTITLED_WEBPAGE: &str = "Untitled Webpage";
pub const UNTITLED_PDF: &str = "Untitled PDF";
pub const UNKNOWN_RESOURCE: &str = "Unknown Resource";
pub const ERROR_RETRIEVING_TITLE: &str = "Error retrieving title";

/// Look up titles for every footnote.
///
/// Returns one [`FootnoteResult`] per footnote, in number order. Only a
/// failure to set up the HTTP client is fatal.
pub async fn resolve_titles(
    footnotes: &[Footnote],
    config: &ConversionConfig,
) -> Result<Vec<FootnoteResult>, Html2MdError> {
    let total = footnotes.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_resolution_start(total);
    }

    let client = build_client(config)?;
    let mut results: Vec<FootnoteResult> = stream::iter(
        footnotes
            .iter()
            .map(|footnote| resolve_one(&client, footnote, total, config)),
    )
    .buffer_unordered(config.concurrency.max(1))
    .collect()
    .await;
    results.sort_by_key(|r| r.number);

    let resolved = results.iter().filter(|r| r.is_ok()).count();
    info!(
        "Resolved {}/{} footnote titles ({} failed)",
        resolved,
        total,
        total - resolved
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_resolution_complete(total, resolved);
    }
    Ok(results)
}

fn build_client(config: &ConversionConfig) -> Result<reqwest::Client, Html2MdError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.fetch_timeout_secs))
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| Html2MdError::Internal(format!("Failed to build HTTP client: {e}")))
}

async fn resolve_one(
    client: &reqwest::Client,
    footnote: &Footnote,
    total: usize,
    config: &ConversionConfig,
) -> FootnoteResult {
    let start = Instant::now();
    let number = footnote.number;
    let url = footnote.url.as_str();
    if let Some(ref cb) = config.progress_callback {
        cb.on_footnote_start(number, total);
    }

    let (outcome, retries) = fetch_with_retry(client, number, url, config).await;
    let outcome = outcome.and_then(|page| title_for(number, url, &page));

    let (title, error) = match outcome {
        Ok(title) => {
            debug!("Footnote {}: {:?}", number, title);
            if let Some(ref cb) = config.progress_callback {
                cb.on_footnote_complete(number, total, &title);
            }
            (title, None)
        }
        Err(e) => {
            warn!("{}", e);
            if let Some(ref cb) = config.progress_callback {
                cb.on_footnote_error(number, total, &e.to_string());
            }
            (placeholder_for(&e).to_string(), Some(e))
        }
    };

    FootnoteResult {
        number,
        url: url.to_string(),
        title,
        retries,
        duration_ms: start.elapsed().as_millis() as u64,
        error,
    }
}

/// Title written for a footnote whose lookup failed.
pub fn placeholder_for(error: &FootnoteError) -> &'static str {
    match error {
        FootnoteError::UnknownContentType { .. } => UNKNOWN_RESOURCE,
        _ => ERROR_RETRIEVING_TITLE,
    }
}

// ── Fetching ─────────────────────────────────────────────────────────────

/// A successfully downloaded resource.
struct Page {
    content_type: String,
    body: Vec<u8>,
}

enum FetchFailure {
    Timeout,
    Transport(String),
    Status(u16),
}

impl FetchFailure {
    fn is_retryable(&self) -> bool {
        match self {
            FetchFailure::Timeout | FetchFailure::Transport(_) => true,
            FetchFailure::Status(s) => *s == 429 || *s >= 500,
        }
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchFailure::Timeout
        } else {
            FetchFailure::Transport(e.to_string())
        }
    }
}

async fn fetch_with_retry(
    client: &reqwest::Client,
    number: u32,
    url: &str,
    config: &ConversionConfig,
) -> (Result<Page, FootnoteError>, u8) {
    let mut last: Option<FetchFailure> = None;
    let mut attempts_made = 0u32;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config
                .retry_backoff_ms
                .saturating_mul(2u64.saturating_pow(attempt - 1));
            warn!(
                "Footnote {}: retry {}/{} after {}ms",
                number, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }
        attempts_made = attempt;

        match fetch(client, url).await {
            Ok(page) => return (Ok(page), retry_count(attempt)),
            Err(failure) => {
                let retryable = failure.is_retryable();
                last = Some(failure);
                if !retryable {
                    break;
                }
            }
        }
    }

    let retries = retry_count(attempts_made);
    let url = url.to_string();
    let error = match last {
        Some(FetchFailure::Timeout) => FootnoteError::Timeout {
            number,
            url,
            secs: config.fetch_timeout_secs,
        },
        Some(FetchFailure::Status(status)) => FootnoteError::HttpStatus {
            number,
            url,
            status,
        },
        Some(FetchFailure::Transport(detail)) => FootnoteError::FetchFailed {
            number,
            url,
            retries,
            detail,
        },
        None => FootnoteError::FetchFailed {
            number,
            url,
            retries,
            detail: "no attempt was made".into(),
        },
    };
    (Err(error), retries)
}

fn retry_count(attempts: u32) -> u8 {
    u8::try_from(attempts).unwrap_or(u8::MAX)
}

async fn fetch(client: &reqwest::Client, url: &str) -> Result<Page, FetchFailure> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(FetchFailure::from_reqwest)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchFailure::Status(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = response
        .bytes()
        .await
        .map_err(FetchFailure::from_reqwest)?;

    Ok(Page {
        content_type,
        body: body.to_vec(),
    })
}

// ── Title extraction ─────────────────────────────────────────────────────

fn title_for(number: u32, url: &str, page: &Page) -> Result<String, FootnoteError> {
    let content_type = page.content_type.to_ascii_lowercase();
    if content_type.contains("application/pdf") {
        Ok(pdf_title(&page.body).unwrap_or_else(|| UNTITLED_PDF.to_string()))
    } else if content_type.contains("text/html") {
        let title = html_title(&page.body).unwrap_or_else(|| UNTITLED_WEBPAGE.to_string());
        if is_bot_protection(&title) {
            return Err(FootnoteError::BotProtection {
                number,
                url: url.to_string(),
            });
        }
        Ok(title)
    } else {
        Err(FootnoteError::UnknownContentType {
            number,
            url: url.to_string(),
            content_type: page.content_type.clone(),
        })
    }
}

fn html_title(body: &[u8]) -> Option<String> {
    let html = String::from_utf8_lossy(body);
    let dom = parse_dom(&html).ok()?;
    find_title(&dom).map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn is_bot_protection(title: &str) -> bool {
    let lower = title.to_lowercase();
    lower.starts_with("verifying if your connection") || lower.contains("cloudflare")
}

static RE_PDF_TITLE_LITERAL: Lazy<BytesRegex> =
    Lazy::new(|| BytesRegex::new(r"(?s-u)/Title\s*\(((?:\\.|[^\\)])*)\)").unwrap());

static RE_PDF_TITLE_HEX: Lazy<BytesRegex> =
    Lazy::new(|| BytesRegex::new(r"(?-u)/Title\s*<([0-9A-Fa-f\s]*)>").unwrap());

/// `/Title` entry of a PDF's document-information dictionary.
///
/// Only uncompressed info dictionaries are found; a title stored inside a
/// compressed object stream reads as absent.
pub fn pdf_title(pdf: &[u8]) -> Option<String> {
    let raw = if let Some(caps) = RE_PDF_TITLE_LITERAL.captures(pdf) {
        unescape_pdf_literal(&caps[1])
    } else {
        let caps = RE_PDF_TITLE_HEX.captures(pdf)?;
        decode_hex(&caps[1])
    };
    let title = decode_pdf_text(&raw);
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}

fn unescape_pdf_literal(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let b = raw[i];
        if b != b'\\' || i + 1 >= raw.len() {
            out.push(b);
            i += 1;
            continue;
        }
        let next = raw[i + 1];
        i += 2;
        match next {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'0'..=b'7' => {
                let mut value = u32::from(next - b'0');
                let mut digits = 1;
                while digits < 3 && i < raw.len() && (b'0'..=b'7').contains(&raw[i]) {
                    value = value * 8 + u32::from(raw[i] - b'0');
                    i += 1;
                    digits += 1;
                }
                out.push((value & 0xff) as u8);
            }
            b'\n' => {}
            other => out.push(other),
        }
    }
    out
}

fn decode_hex(hex: &[u8]) -> Vec<u8> {
    let digits: Vec<u8> = hex
        .iter()
        .filter_map(|&b| (b as char).to_digit(16).map(|d| d as u8))
        .collect();
    digits
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
        .collect()
}

/// PDF text strings are UTF-16BE with a BOM, or PDFDocEncoding (treated as
/// Latin-1).
fn decode_pdf_text(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|p| u16::from_be_bytes([p[0], p[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }
    bytes.iter().map(|&b| b as char).collect()
}
