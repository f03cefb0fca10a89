//! Markdown writer with footnote markers.
//!
//! Produces Pandoc-flavoured Markdown: `[^n]` markers in the text and a
//! trailing list of `[^n]: body` definitions in number order. Notes built
//! from links (a single paragraph holding a URL the [`FootnoteTable`] knows)
//! reuse the table's number, so every occurrence of one URL shares one marker
//! and one definition. Any other note, e.g. one already present in a Pandoc
//! JSON input, is numbered after the table's last entry.
//!
//! Attributes are not rendered; Divs and Spans contribute their content only.

use crate::ast::{
    Alignment, Block, Cell, Inline, ListAttributes, MathType, Pandoc, QuoteType, Row, Table,
};
use crate::transform::{footnote_url, FootnoteTable};
use std::collections::BTreeMap;

/// Rendering switches.
#[derive(Debug, Clone, Default)]
pub struct MarkdownOptions {
    /// Emit a YAML front-matter block carrying the document title.
    pub front_matter: bool,
}

/// Render `doc` with default options.
pub fn write_markdown(doc: &Pandoc, footnotes: &FootnoteTable) -> String {
    write_markdown_with(doc, footnotes, &MarkdownOptions::default())
}

pub fn write_markdown_with(
    doc: &Pandoc,
    footnotes: &FootnoteTable,
    options: &MarkdownOptions,
) -> String {
    let mut writer = MarkdownWriter::new(footnotes);
    let body = writer.blocks(&doc.blocks, "\n\n");

    let mut out = String::new();
    if options.front_matter {
        if let Some(title) = doc.title() {
            // A JSON string literal is a valid YAML double-quoted scalar.
            let quoted = serde_json::to_string(&title).unwrap_or_default();
            out.push_str(&format!("---\ntitle: {quoted}\n---\n\n"));
        }
    }
    out.push_str(&body);

    if !writer.definitions.is_empty() {
        let defs: Vec<String> = writer
            .definitions
            .iter()
            .map(|(n, text)| format!("[^{n}]: {text}"))
            .collect();
        out.push_str("\n\n");
        out.push_str(&defs.join("\n\n"));
    }
    out.push('\n');
    out
}

struct MarkdownWriter<'a> {
    table: &'a FootnoteTable,
    definitions: BTreeMap<u32, String>,
    next_free: u32,
}

impl<'a> MarkdownWriter<'a> {
    fn new(table: &'a FootnoteTable) -> Self {
        Self {
            table,
            definitions: BTreeMap::new(),
            next_free: table.len() as u32 + 1,
        }
    }

    // ── Blocks ───────────────────────────────────────────────────────────

    fn blocks(&mut self, blocks: &[Block], sep: &str) -> String {
        blocks
            .iter()
            .map(|b| self.block(b))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(sep)
    }

    fn block(&mut self, block: &Block) -> String {
        match block {
            Block::Plain(inlines) | Block::Para(inlines) => {
                escape_block_starts(self.inlines(inlines).trim())
            }
            Block::LineBlock(lines) => lines
                .iter()
                .map(|l| format!("| {}", self.inlines(l)))
                .collect::<Vec<_>>()
                .join("\n"),
            Block::CodeBlock(attr, code) => {
                let fence = fence_for(code, '`', 3);
                let lang = attr.classes.first().map(String::as_str).unwrap_or("");
                format!("{fence}{lang}\n{code}\n{fence}")
            }
            Block::RawBlock(format, text) if format.is_html() => text.clone(),
            Block::RawBlock(..) => String::new(),
            Block::BlockQuote(content) => {
                let inner = self.blocks(content, "\n\n");
                inner
                    .lines()
                    .map(|l| if l.is_empty() { ">".to_string() } else { format!("> {l}") })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            Block::BulletList(items) => {
                let loose = is_loose(items);
                let rendered: Vec<String> = items
                    .iter()
                    .map(|item| {
                        let text = self.blocks(item, if loose { "\n\n" } else { "\n" });
                        hang("- ", &text)
                    })
                    .collect();
                rendered.join(if loose { "\n\n" } else { "\n" })
            }
            Block::OrderedList(ListAttributes(start, ..), items) => {
                let loose = is_loose(items);
                let rendered: Vec<String> = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let text = self.blocks(item, if loose { "\n\n" } else { "\n" });
                        hang(&format!("{}. ", start + i as i32), &text)
                    })
                    .collect();
                rendered.join(if loose { "\n\n" } else { "\n" })
            }
            Block::DefinitionList(entries) => entries
                .iter()
                .map(|(term, defs)| {
                    let mut text = escape_block_starts(self.inlines(term).trim());
                    for def in defs {
                        let body = self.blocks(def, "\n\n");
                        text.push('\n');
                        text.push_str(&hang(":   ", &body));
                    }
                    text
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
            Block::Header(level, _, content) => {
                let marks = "#".repeat((*level).clamp(1, 6) as usize);
                format!("{marks} {}", self.inlines(content).trim())
            }
            Block::HorizontalRule => "---".to_string(),
            Block::Table(table) => self.table(table),
            Block::Figure(_, caption, content) => {
                let mut text = self.blocks(content, "\n\n");
                let caption = self.blocks(&caption.1, " ");
                if !caption.is_empty() {
                    if !text.is_empty() {
                        text.push_str("\n\n");
                    }
                    text.push_str(&format!("*{caption}*"));
                }
                text
            }
            Block::Div(_, content) => self.blocks(content, "\n\n"),
        }
    }

    fn table(&mut self, Table(_, caption, colspecs, head, bodies, foot): &Table) -> String {
        let mut rows: Vec<&Row> = head.1.iter().collect();
        let header_row = if rows.is_empty() { None } else { Some(rows.remove(0)) };
        for body in bodies {
            rows.extend(body.2.iter());
            rows.extend(body.3.iter());
        }
        rows.extend(foot.1.iter());

        let width = std::iter::once(colspecs.len())
            .chain(header_row.iter().chain(rows.iter()).map(|r| r.1.len()))
            .max()
            .unwrap_or(0)
            .max(1);

        let header = match header_row {
            Some(row) => self.row(row, width),
            None => vec![String::new(); width],
        };
        let separator: Vec<String> = (0..width)
            .map(|i| {
                let align = colspecs.get(i).map(|c| c.0).unwrap_or(Alignment::AlignDefault);
                match align {
                    Alignment::AlignLeft => ":---".to_string(),
                    Alignment::AlignRight => "---:".to_string(),
                    Alignment::AlignCenter => ":---:".to_string(),
                    Alignment::AlignDefault => "---".to_string(),
                }
            })
            .collect();

        let mut lines = vec![pipe_row(&header), pipe_row(&separator)];
        for row in rows {
            let cells = self.row(row, width);
            lines.push(pipe_row(&cells));
        }

        let caption = self.blocks(&caption.1, " ");
        if !caption.is_empty() {
            lines.push(String::new());
            lines.push(format!(": {caption}"));
        }
        lines.join("\n")
    }

    fn row(&mut self, Row(_, cells): &Row, width: usize) -> Vec<String> {
        let mut out: Vec<String> = cells.iter().map(|c| self.cell(c)).collect();
        out.resize(width, String::new());
        out
    }

    fn cell(&mut self, Cell(_, _, _, _, content): &Cell) -> String {
        self.blocks(content, " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .replace('|', "\\|")
    }

    // ── Inlines ──────────────────────────────────────────────────────────

    fn inlines(&mut self, inlines: &[Inline]) -> String {
        let mut out = String::new();
        for inline in inlines {
            self.inline(inline, &mut out);
        }
        out
    }

    fn inline(&mut self, inline: &Inline, out: &mut String) {
        match inline {
            Inline::Str(s) => out.push_str(&escape(s)),
            Inline::Emph(c) => wrap(out, "*", &self.inlines(c), "*"),
            Inline::Strong(c) => wrap(out, "**", &self.inlines(c), "**"),
            Inline::Underline(c) => wrap(out, "<u>", &self.inlines(c), "</u>"),
            Inline::Strikeout(c) => wrap(out, "~~", &self.inlines(c), "~~"),
            Inline::Superscript(c) => wrap(out, "^", &self.inlines(c), "^"),
            Inline::Subscript(c) => wrap(out, "~", &self.inlines(c), "~"),
            Inline::SmallCaps(c) | Inline::Span(_, c) | Inline::Cite(_, c) => {
                let text = self.inlines(c);
                out.push_str(&text);
            }
            Inline::Quoted(QuoteType::SingleQuote, c) => wrap(out, "'", &self.inlines(c), "'"),
            Inline::Quoted(QuoteType::DoubleQuote, c) => wrap(out, "\"", &self.inlines(c), "\""),
            Inline::Code(_, code) => out.push_str(&code_span(code)),
            Inline::Space | Inline::SoftBreak => out.push(' '),
            Inline::LineBreak => out.push_str("\\\n"),
            Inline::Math(MathType::InlineMath, tex) => wrap(out, "$", tex, "$"),
            Inline::Math(MathType::DisplayMath, tex) => wrap(out, "$$", tex, "$$"),
            Inline::RawInline(format, text) if format.is_html() => out.push_str(text),
            Inline::RawInline(..) => {}
            Inline::Link(_, content, target) => {
                let text = self.inlines(content);
                out.push_str(&format!("[{text}]({})", target.url()));
            }
            Inline::Image(_, alt, target) => {
                let alt = self.inlines(alt);
                out.push_str(&format!("![{alt}]({})", target.url()));
            }
            Inline::Note(content) => {
                let n = self.note(content);
                out.push_str(&format!("[^{n}]"));
            }
        }
    }

    /// Number for a note, recording its definition on first sight.
    fn note(&mut self, content: &[Block]) -> u32 {
        if let Some(url) = footnote_url(content) {
            if let Some(n) = self.table.lookup(url) {
                self.definitions.entry(n).or_insert_with(|| url.to_string());
                return n;
            }
        }
        let n = self.next_free;
        self.next_free += 1;
        let body = self.blocks(content, "\n\n");
        self.definitions.insert(n, indent_rest(&body, "    "));
        n
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn wrap(out: &mut String, open: &str, text: &str, close: &str) {
    out.push_str(open);
    out.push_str(text);
    out.push_str(close);
}

fn is_loose(items: &[Vec<Block>]) -> bool {
    items
        .iter()
        .any(|item| item.iter().any(|b| matches!(b, Block::Para(_))))
}

/// Prefix the first line with `marker` and indent the rest to match.
fn hang(marker: &str, text: &str) -> String {
    let pad = " ".repeat(marker.chars().count());
    let mut out = String::from(marker);
    out.push_str(&indent_rest(text, &pad));
    out
}

fn indent_rest(text: &str, pad: &str) -> String {
    let mut lines = text.lines();
    let mut out = lines.next().unwrap_or("").to_string();
    for line in lines {
        out.push('\n');
        if !line.is_empty() {
            out.push_str(pad);
            out.push_str(line);
        }
    }
    out
}

fn pipe_row(cells: &[String]) -> String {
    format!("| {} |", cells.join(" | "))
}

/// A fence of `c` longer than any run of `c` at the start of a line in `text`.
fn fence_for(text: &str, c: char, min: usize) -> String {
    let longest = text
        .lines()
        .map(|l| l.trim_start().chars().take_while(|&x| x == c).count())
        .max()
        .unwrap_or(0);
    c.to_string().repeat(min.max(longest + 1))
}

fn code_span(code: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in code.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    let ticks = "`".repeat(longest + 1);
    if code.starts_with('`') || code.ends_with('`') {
        format!("{ticks} {code} {ticks}")
    } else {
        format!("{ticks}{code}{ticks}")
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '`' | '[' | ']' | '<') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Backslash-escape text that would open a block if it started a line:
/// headings, quotes, bullets, ordered-list numbers, rules, setext underlines
/// and tilde fences. Applies to the first line and to each line after a hard
/// break.
fn escape_block_starts(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    let mut after_break = true;
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if after_break {
            out.push_str(&escape_line_start(line));
        } else {
            out.push_str(line);
        }
        after_break = line.ends_with('\\');
    }
    out
}

fn escape_line_start(line: &str) -> String {
    let rest = line.trim_start_matches(' ');
    let indent = &line[..line.len() - rest.len()];
    if indent.len() > 3 {
        return line.to_string();
    }
    match block_marker_at(rest) {
        Some(pos) => format!("{indent}{}\\{}", &rest[..pos], &rest[pos..]),
        None => line.to_string(),
    }
}

/// Byte offset in `line` where a backslash defuses a block marker, if any.
fn block_marker_at(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let first = *bytes.first()?;
    let ends_marker = |at: usize| matches!(bytes.get(at), None | Some(b' ' | b'\t'));

    match first {
        b'>' => Some(0),
        b'#' => {
            let run = bytes.iter().take_while(|&&b| b == b'#').count();
            (run <= 6 && ends_marker(run)).then_some(0)
        }
        b'-' | b'+' if ends_marker(1) => Some(0),
        b'-' | b'=' | b'~' => {
            let marks = bytes.iter().filter(|&&b| b == first).count();
            let only_marks = bytes.iter().all(|&b| b == first || b == b' ' || b == b'\t');
            let fence = first == b'~' && line.starts_with("~~~");
            let underline = only_marks && (first == b'=' || marks >= 2);
            (fence || underline).then_some(0)
        }
        b'0'..=b'9' => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            let delimiter = matches!(bytes.get(digits), Some(b'.' | b')'));
            (digits <= 9 && delimiter && ends_marker(digits + 1)).then_some(digits)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Attr, Caption, ColSpec, MetaValue, TableBody, TableFoot, TableHead, Target};
    use crate::transform::transform;

    fn para(inlines: Vec<Inline>) -> Block {
        Block::Para(inlines)
    }

    fn link(text: &str, url: &str) -> Inline {
        Inline::Link(
            Attr::default(),
            vec![Inline::str(text)],
            Target(url.into(), String::new()),
        )
    }

    fn render(blocks: Vec<Block>) -> String {
        let t = transform(Pandoc::new(blocks));
        write_markdown(&t.document, &t.footnotes)
    }

    #[test]
    fn links_become_numbered_markers_with_definitions() {
        let md = render(vec![para(vec![
            Inline::str("See"),
            Inline::Space,
            link("a", "https://a.example"),
            Inline::Space,
            Inline::str("and"),
            Inline::Space,
            link("b", "https://b.example"),
            link("again", "https://a.example"),
        ])]);
        assert_eq!(
            md,
            "See [^1] and [^2][^1]\n\n[^1]: https://a.example\n\n[^2]: https://b.example\n"
        );
    }

    #[test]
    fn foreign_notes_follow_table_numbers() {
        let doc = Pandoc::new(vec![para(vec![
            Inline::Note(vec![para(vec![Inline::str("A"), Inline::Space, Inline::str("remark")])]),
            link("x", "https://x.example"),
        ])]);
        let t = transform(doc);
        let md = write_markdown(&t.document, &t.footnotes);
        assert_eq!(md, "[^2][^1]\n\n[^1]: https://x.example\n\n[^2]: A remark\n");
    }

    #[test]
    fn headings_and_emphasis() {
        let md = render(vec![
            Block::Header(2, Attr::default(), vec![Inline::str("Title")]),
            para(vec![
                Inline::Emph(vec![Inline::str("soft")]),
                Inline::Space,
                Inline::Strong(vec![Inline::str("hard")]),
                Inline::Space,
                Inline::Code(Attr::default(), "a`b".into()),
            ]),
        ]);
        assert_eq!(md, "## Title\n\n*soft* **hard** ``a`b``\n");
    }

    #[test]
    fn markdown_specials_are_escaped() {
        let md = render(vec![para(vec![Inline::str("a_b*[c]")])]);
        assert_eq!(md, "a\\_b\\*\\[c\\]\n");
    }

    #[test]
    fn tight_and_nested_lists() {
        let md = render(vec![Block::BulletList(vec![
            vec![Block::Plain(vec![Inline::str("one")])],
            vec![
                Block::Plain(vec![Inline::str("two")]),
                Block::OrderedList(
                    ListAttributes::default(),
                    vec![vec![Block::Plain(vec![Inline::str("inner")])]],
                ),
            ],
        ])]);
        assert_eq!(md, "- one\n- two\n  1. inner\n");
    }

    #[test]
    fn code_block_uses_language_and_long_fence() {
        let md = render(vec![Block::CodeBlock(
            Attr {
                classes: vec!["md".into()],
                ..Attr::default()
            },
            "```\nx\n```".into(),
        )]);
        assert_eq!(md, "````md\n```\nx\n```\n````\n");
    }

    #[test]
    fn pipe_table_with_header() {
        let cell = |s: &str| Cell::new(vec![Block::Plain(vec![Inline::str(s)])]);
        let table = Table(
            Attr::default(),
            Caption::default(),
            vec![ColSpec::default(), ColSpec(Alignment::AlignRight, crate::ast::ColWidth::ColWidthDefault)],
            TableHead(Attr::default(), vec![Row(Attr::default(), vec![cell("A"), cell("B")])]),
            vec![TableBody(
                Attr::default(),
                0,
                vec![],
                vec![Row(Attr::default(), vec![cell("1"), cell("x|y")])],
            )],
            TableFoot::default(),
        );
        let md = render(vec![Block::Table(Box::new(table))]);
        assert_eq!(md, "| A | B |\n| --- | ---: |\n| 1 | x\\|y |\n");
    }

    #[test]
    fn front_matter_carries_title() {
        let mut doc = Pandoc::new(vec![para(vec![Inline::str("x")])]);
        doc.meta.insert(
            "title".into(),
            MetaValue::MetaInlines(vec![Inline::str("My"), Inline::Space, Inline::str("\"Page\"")]),
        );
        let md = write_markdown_with(
            &doc,
            &FootnoteTable::new(),
            &MarkdownOptions { front_matter: true },
        );
        assert_eq!(md, "---\ntitle: \"My \\\"Page\\\"\"\n---\n\nx\n");
    }

    #[test]
    fn empty_blocks_leave_no_gaps() {
        let md = render(vec![
            para(vec![Inline::str("a")]),
            Block::Plain(vec![]),
            para(vec![Inline::str("b")]),
        ]);
        assert_eq!(md, "a\n\nb\n");
    }

    #[test]
    fn blockquote_prefixes_every_line() {
        let md = render(vec![Block::BlockQuote(vec![
            para(vec![Inline::str("a")]),
            para(vec![Inline::str("b")]),
        ])]);
        assert_eq!(md, "> a\n>\n> b\n");
    }

    fn words(text: &str) -> Block {
        let mut inlines = Vec::new();
        for (i, w) in text.split(' ').enumerate() {
            if i > 0 {
                inlines.push(Inline::Space);
            }
            inlines.push(Inline::str(w));
        }
        para(inlines)
    }

    #[test]
    fn paragraph_text_never_opens_a_block() {
        let md = render(vec![
            words("1. Intro"),
            words("# not heading"),
            words("- dash"),
            words("+ plus"),
            words("> quoted"),
            words("2024) was"),
            words("---"),
            words("~~~ tilde"),
        ]);
        assert_eq!(
            md,
            "1\\. Intro\n\n\\# not heading\n\n\\- dash\n\n\\+ plus\n\n\\> quoted\n\n\
             2024\\) was\n\n\\---\n\n\\~~~ tilde\n"
        );
    }

    #[test]
    fn ordinary_leading_characters_stay_plain() {
        let md = render(vec![
            words("-5 degrees"),
            words("#hashtag here"),
            words("2024 was"),
            words("3.5 percent"),
            words("####### seven"),
        ]);
        assert_eq!(
            md,
            "-5 degrees\n\n#hashtag here\n\n2024 was\n\n3.5 percent\n\n####### seven\n"
        );
    }

    #[test]
    fn line_after_hard_break_is_escaped() {
        let md = render(vec![para(vec![
            Inline::str("a"),
            Inline::LineBreak,
            Inline::str("#"),
            Inline::Space,
            Inline::str("b"),
        ])]);
        assert_eq!(md, "a\\\n\\# b\n");
    }

    #[test]
    fn list_item_text_is_escaped_inside_the_marker() {
        let md = render(vec![Block::BulletList(vec![vec![words("1. first")]])]);
        assert_eq!(md, "- 1\\. first\n");
    }
}
