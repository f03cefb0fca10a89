//! Footnote post-processing on the rendered Markdown.
//!
//! Two text-level passes run after the writer:
//!
//! * [`separate_adjacent_markers`] puts a visible comma between markers that
//!   touch (`[^1][^2]` → `[^1]<sup>,</sup>[^2]`), so consecutive citations
//!   do not read as one number;
//! * [`apply_titles`] rewrites bare-URL definitions (`[^3]: https://…`) into
//!   titled links once [`crate::pipeline::titles`] has looked them up.
//!
//! Both passes skip fenced code blocks, and marker separation also skips
//! inline code spans, so code samples that happen to contain `[^1][^2]` or a
//! definition-shaped line come out as written.
//!
//! [`format_error_log`] renders failed lookups for the error log file and
//! [`append_error_log`] appends them to it.

use crate::error::Html2MdError;
use crate::output::FootnoteResult;
use crate::pipeline::segments::{map_outside_code_spans, map_prose};
use chrono::{DateTime, NaiveDate, TimeZone};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fmt::Display;
use std::io::Write;
use std::path::Path;

/// Separator inserted between adjacent footnote markers.
pub const MARKER_SEPARATOR: &str = "<sup>,</sup>";

static RE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\^[^\]\s]+\]").unwrap());

/// `[^label]: http(s)://…` at the start of a line.
static RE_URL_DEFINITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\[\^([^\]\s]+)\]:[ \t]+(https?://\S+)[ \t]*$").unwrap());

/// Insert [`MARKER_SEPARATOR`] between every pair of touching markers.
///
/// Returns the new text and the number of separators inserted. A run of
/// three markers gets two separators.
pub fn separate_adjacent_markers(markdown: &str) -> (String, usize) {
    let mut count = 0;
    let out = map_prose(markdown, |prose| {
        map_outside_code_spans(prose, |text| {
            let (separated, n) = separate_in(text);
            count += n;
            separated
        })
    });
    (out, count)
}

fn separate_in(markdown: &str) -> (String, usize) {
    let mut out = String::with_capacity(markdown.len());
    let mut last = 0;
    let mut prev_end: Option<usize> = None;
    let mut count = 0;

    for m in RE_MARKER.find_iter(markdown) {
        out.push_str(&markdown[last..m.start()]);
        if prev_end == Some(m.start()) {
            out.push_str(MARKER_SEPARATOR);
            count += 1;
        }
        out.push_str(m.as_str());
        last = m.end();
        prev_end = Some(m.end());
    }
    out.push_str(&markdown[last..]);
    (out, count)
}

/// Rewrite every URL definition that has a lookup result.
///
/// `[^n]: url` becomes `[^n]: [title](url) retrieved on YYYY-MM-DD`.
/// Definitions without a matching result are left untouched.
pub fn apply_titles(markdown: &str, results: &[FootnoteResult], date: NaiveDate) -> String {
    let by_number: HashMap<u32, &FootnoteResult> = results.iter().map(|r| (r.number, r)).collect();
    let date = date.format("%Y-%m-%d").to_string();

    map_prose(markdown, |prose| {
        RE_URL_DEFINITION
            .replace_all(prose, |caps: &Captures<'_>| {
                let label = &caps[1];
                let url = &caps[2];
                let result = label
                    .parse::<u32>()
                    .ok()
                    .and_then(|n| by_number.get(&n))
                    .filter(|r| r.url == url);
                match result {
                    Some(r) => format!(
                        "[^{label}]: [{}]({url}) retrieved on {date}",
                        escape_link_text(&r.title)
                    ),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    })
}

fn escape_link_text(title: &str) -> String {
    let single_line = title.split_whitespace().collect::<Vec<_>>().join(" ");
    single_line.replace('[', "\\[").replace(']', "\\]")
}

/// File name for an error log started at `at`: `errors-YYYY-MM-DD-HH-MM.txt`.
pub fn error_log_name<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    format!("errors-{}.txt", at.format("%Y-%m-%d-%H-%M"))
}

/// Two lines per failed lookup: the error, then the definition it concerned.
pub fn format_error_log(results: &[FootnoteResult]) -> String {
    let mut log = String::new();
    for r in results {
        if let Some(e) = &r.error {
            log.push_str(&format!("{e}\n"));
            log.push_str(&format!("Original footnote: [^{}]: {}\n", r.number, r.url));
        }
    }
    log
}

/// Append the failed lookups in `results` to the log at `path`.
///
/// Returns `false` without touching the file system when nothing failed.
pub fn append_error_log(path: &Path, results: &[FootnoteResult]) -> Result<bool, Html2MdError> {
    let log = format_error_log(results);
    if log.is_empty() {
        return Ok(false);
    }
    let write_failed = |source| Html2MdError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(write_failed)?;
    file.write_all(log.as_bytes()).map_err(write_failed)?;
    Ok(true)
}
