//! Post-processing: deterministic cleanup of the assembled Markdown.
//!
//! The writer emits structurally correct Markdown, but the text it carries
//! comes from arbitrary web pages: Windows line endings inside `<pre>`
//! blocks, zero-width spaces and soft hyphens sprinkled by CMS editors,
//! trailing blanks, and runs of empty paragraphs left behind once clutter has
//! been removed. These rules normalise all of that without touching content.
//!
//! ## Rule Order
//!
//! Line endings are normalised before trimming so `\r` is never mistaken for
//! content, and blank lines are collapsed after trimming so whitespace-only
//! lines count as blank.
//!
//! Rules 2 to 5 only see prose: fenced code blocks keep their trailing
//! blanks, blank-line runs and invisible characters byte for byte.

use crate::pipeline::segments::map_prose;
use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all post-processing rules to the writer output.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, etc.)
/// 3. Trim trailing whitespace per line
/// 4. Drop lines holding only an empty emphasis pair left by removed content
/// 5. Collapse 2+ consecutive blank lines down to 1
/// 6. Ensure the file ends with exactly one newline
pub fn clean_markdown(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = map_prose(&s, |prose| {
        let p = remove_invisible_chars(prose);
        let p = trim_trailing_whitespace(&p);
        let p = remove_empty_emphasis_lines(&p);
        collapse_blank_lines(&p)
    });
    ensure_final_newline(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .split_inclusive('\n')
        .map(|line| match line.strip_suffix('\n') {
            Some(content) => format!("{}\n", content.trim_end()),
            None => line.trim_end().to_string(),
        })
        .collect()
}

// ── Rule 4: Remove empty emphasis lines ──────────────────────────────────────
//
// A `<strong>` wrapping only an icon becomes `****` once the icon is gone.

static RE_EMPTY_EMPHASIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(?:\*\*\*\*|<u></u>)$").unwrap());

fn remove_empty_emphasis_lines(input: &str) -> String {
    RE_EMPTY_EMPHASIS.replace_all(input, "").to_string()
}

// ── Rule 5: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 6: Ensure file ends with single newline ─────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed.trim_start_matches('\n'))
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
