//! Input resolution: read a local file, stdin or an HTTP(S) URL into text.
//!
//! Pages are small enough to hold in memory, so a download is read straight
//! into a buffer. Every source goes through the same checks before parsing:
//! binary content (a PDF, an image, a NUL byte near the start) is rejected
//! with [`Html2MdError::NotHtml`] and bytes that are not UTF-8 with
//! [`Html2MdError::NotUtf8`], so callers get a meaningful error instead of a
//! page of mojibake.

use crate::config::InputFormat;
use crate::error::Html2MdError;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

/// Name used for standard input.
pub const STDIN: &str = "-";

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Read `input` (path, URL or `-`) into a string.
pub async fn load_input(
    input: &str,
    format: InputFormat,
    timeout_secs: u64,
    user_agent: &str,
) -> Result<String, Html2MdError> {
    let bytes = if input == STDIN {
        read_stdin().await?
    } else if is_url(input) {
        download_url(input, format, timeout_secs, user_agent).await?
    } else if input.contains("://") {
        return Err(Html2MdError::InvalidInput {
            input: input.to_string(),
        });
    } else {
        read_local(input).await?
    };
    decode(input, bytes, format)
}

/// Validate and decode raw input bytes.
pub fn decode(source: &str, bytes: Vec<u8>, format: InputFormat) -> Result<String, Html2MdError> {
    if format == InputFormat::Html {
        sniff_binary(source, &bytes)?;
    }
    let text = String::from_utf8(bytes).map_err(|_| Html2MdError::NotUtf8 {
        source_name: source.to_string(),
    })?;
    let text = match text.strip_prefix('\u{FEFF}') {
        Some(rest) => rest.to_string(),
        None => text,
    };
    debug!("Loaded {} bytes from {}", text.len(), source);
    Ok(text)
}

fn sniff_binary(source: &str, bytes: &[u8]) -> Result<(), Html2MdError> {
    let not_html = |detail: &str| Html2MdError::NotHtml {
        source_name: source.to_string(),
        detail: detail.to_string(),
    };
    if bytes.starts_with(b"%PDF") {
        return Err(not_html("looks like a PDF document"));
    }
    let head = &bytes[..bytes.len().min(1024)];
    if head.contains(&0) {
        return Err(not_html("contains binary data"));
    }
    Ok(())
}

async fn read_stdin() -> Result<Vec<u8>, Html2MdError> {
    let mut buf = Vec::new();
    tokio::io::stdin()
        .read_to_end(&mut buf)
        .await
        .map_err(|e| Html2MdError::Internal(format!("Failed to read stdin: {e}")))?;
    Ok(buf)
}

async fn read_local(path_str: &str) -> Result<Vec<u8>, Html2MdError> {
    let path = PathBuf::from(path_str);
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            debug!("Resolved local file: {}", path.display());
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(Html2MdError::PermissionDenied { path })
        }
        Err(_) => Err(Html2MdError::FileNotFound { path }),
    }
}

/// Download a URL into memory.
async fn download_url(
    url: &str,
    format: InputFormat,
    timeout_secs: u64,
    user_agent: &str,
) -> Result<Vec<u8>, Html2MdError> {
    info!("Downloading page from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .user_agent(user_agent)
        .build()
        .map_err(|e| Html2MdError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let map_err = |e: reqwest::Error| {
        if e.is_timeout() {
            Html2MdError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Html2MdError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(map_err)?;

    if !response.status().is_success() {
        return Err(Html2MdError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    if format == InputFormat::Html {
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !is_textual(&content_type) {
            return Err(Html2MdError::NotHtml {
                source_name: url.to_string(),
                detail: format!("server sent Content-Type '{content_type}'"),
            });
        }
    }

    let bytes = response.bytes().await.map_err(map_err)?;
    info!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}

/// Content types an HTML page may plausibly be served as. A missing header
/// is accepted and left to the byte sniffing.
fn is_textual(content_type: &str) -> bool {
    content_type.is_empty()
        || content_type.contains("html")
        || content_type.starts_with("text/")
        || content_type.contains("xml")
}
