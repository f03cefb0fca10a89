//! Split rendered Markdown into prose and code.
//!
//! The text-level passes after the writer (cleanup, marker separation, title
//! rewriting) must leave code exactly as the page had it. [`map_prose`]
//! hands them only the text outside fenced code blocks; [`map_outside_code_spans`]
//! further skips inline code spans within a prose run.
//!
//! A fence may follow indentation, blockquote markers and list markers, since
//! the writer nests code blocks inside lists, quotes and footnote bodies. A
//! code region runs from the start of the opening fence line to the end of
//! the closing fence line, excluding its newline. An unclosed fence runs to
//! the end of the input.

use once_cell::sync::Lazy;
use regex::Regex;

/// Optional container prefix, then a fence of three or more backticks or tildes.
static RE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t>]*(?:(?:[-+*:]|\d{1,9}[.)])[ \t]+)*(`{3,}|~{3,})(.*)$").unwrap()
});

/// One piece of a Markdown document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Prose(&'a str),
    Code(&'a str),
}

/// Split `markdown` into alternating prose and fenced-code segments.
///
/// Concatenating the segments gives back the input.
pub fn split_fenced(markdown: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut prose_start = 0;
    let mut open: Option<(usize, char, usize)> = None;
    let mut offset = 0;

    for line in markdown.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        let content = line.trim_end_matches(['\n', '\r']);

        match open {
            None => {
                if let Some((c, len)) = fence_of(content) {
                    // An info string must not contain the fence character.
                    let info = RE_FENCE
                        .captures(content)
                        .and_then(|caps| caps.get(2))
                        .map_or("", |m| m.as_str());
                    if c == '`' && info.contains('`') {
                        continue;
                    }
                    if line_start > prose_start {
                        segments.push(Segment::Prose(&markdown[prose_start..line_start]));
                    }
                    open = Some((line_start, c, len));
                }
            }
            Some((code_start, c, len)) => {
                if is_closing(content, c, len) {
                    let code_end = line_start + content.len();
                    segments.push(Segment::Code(&markdown[code_start..code_end]));
                    prose_start = code_end;
                    open = None;
                }
            }
        }
    }

    match open {
        Some((code_start, ..)) => segments.push(Segment::Code(&markdown[code_start..])),
        None if prose_start < markdown.len() => {
            segments.push(Segment::Prose(&markdown[prose_start..]))
        }
        None => {}
    }
    segments
}

/// Apply `f` to every prose segment and reassemble the document.
pub fn map_prose<F>(markdown: &str, mut f: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut out = String::with_capacity(markdown.len());
    for segment in split_fenced(markdown) {
        match segment {
            Segment::Prose(text) => out.push_str(&f(text)),
            Segment::Code(code) => out.push_str(code),
        }
    }
    out
}

/// Apply `f` to the text between inline code spans of a prose run.
///
/// A backtick run opens a span only if a run of the same length closes it;
/// otherwise it is literal text. Backslash-escaped backticks never open one.
pub fn map_outside_code_spans<F>(text: &str, mut f: F) -> String
where
    F: FnMut(&str) -> String,
{
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut plain_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => {
                let run = backtick_run(bytes, i);
                match find_closing_run(bytes, i + run, run) {
                    Some(end) => {
                        out.push_str(&f(&text[plain_start..i]));
                        out.push_str(&text[i..end]);
                        plain_start = end;
                        i = end;
                    }
                    None => i += run,
                }
            }
            _ => i += 1,
        }
    }
    if plain_start < text.len() {
        out.push_str(&f(&text[plain_start..]));
    }
    out
}

fn fence_of(line: &str) -> Option<(char, usize)> {
    let caps = RE_FENCE.captures(line)?;
    let fence = caps.get(1)?.as_str();
    let c = fence.chars().next()?;
    Some((c, fence.len()))
}

fn is_closing(line: &str, c: char, len: usize) -> bool {
    let rest = line.trim_start_matches([' ', '\t', '>']);
    let run = rest.chars().take_while(|&x| x == c).count();
    run >= len && rest[run..].trim().is_empty()
}

fn backtick_run(bytes: &[u8], from: usize) -> usize {
    bytes[from..].iter().take_while(|&&b| b == b'`').count()
}

/// End index (exclusive) of the first run of exactly `len` backticks at or after `from`.
fn find_closing_run(bytes: &[u8], from: usize, len: usize) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'`' {
            let run = backtick_run(bytes, i);
            if run == len {
                return Some(i + run);
            }
            i += run;
        } else {
            i += 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_around_fenced_block() {
        let md = "intro\n\n```rust\nlet x = 1;   \n```\n\nafter\n";
        assert_eq!(
            split_fenced(md),
            vec![
                Segment::Prose("intro\n\n"),
                Segment::Code("```rust\nlet x = 1;   \n```"),
                Segment::Prose("\n\nafter\n"),
            ]
        );
    }

    #[test]
    fn closing_fence_must_be_long_enough() {
        let md = "````\n```\nstill code\n````\nprose";
        assert_eq!(
            split_fenced(md),
            vec![
                Segment::Code("````\n```\nstill code\n````"),
                Segment::Prose("\nprose"),
            ]
        );
    }

    #[test]
    fn tilde_fence_and_unclosed_fence() {
        assert_eq!(
            split_fenced("~~~\na\n~~~"),
            vec![Segment::Code("~~~\na\n~~~")]
        );
        assert_eq!(
            split_fenced("x\n```\nnever closed\n"),
            vec![Segment::Prose("x\n"), Segment::Code("```\nnever closed\n")]
        );
    }

    #[test]
    fn fences_nested_in_lists_and_quotes() {
        let md = "- ```\n  a  \n  ```\n> ```\n> b  \n> ```\n";
        let segments = split_fenced(md);
        assert_eq!(segments[0], Segment::Code("- ```\n  a  \n  ```"));
        assert_eq!(segments[2], Segment::Code("> ```\n> b  \n> ```"));
    }

    #[test]
    fn inline_backticks_are_not_a_fence() {
        let md = "use ```x``` here\n";
        assert_eq!(split_fenced(md), vec![Segment::Prose(md)]);
    }

    #[test]
    fn segments_reassemble_to_input() {
        let md = "a\n```\nb\n```\nc\n~~~~\nd";
        let joined: String = split_fenced(md)
            .into_iter()
            .map(|s| match s {
                Segment::Prose(t) | Segment::Code(t) => t,
            })
            .collect();
        assert_eq!(joined, md);
    }

    #[test]
    fn map_prose_leaves_code_alone() {
        let md = "x  \n```\ny  \n```\n";
        let out = map_prose(md, |p| p.replace(' ', ""));
        assert_eq!(out, "x\n```\ny  \n```\n");
    }

    #[test]
    fn code_spans_are_skipped() {
        let out = map_outside_code_spans("a `b c` d ``e ` f`` g", |t| t.to_uppercase());
        assert_eq!(out, "A `b c` D ``e ` f`` G");
    }

    #[test]
    fn unmatched_and_escaped_backticks_are_text() {
        assert_eq!(map_outside_code_spans("a ` b", |t| t.to_uppercase()), "A ` B");
        assert_eq!(
            map_outside_code_spans(r"a \`b\` c", |t| t.to_uppercase()),
            r"A \`B\` C"
        );
    }
}
