//! The document transformer: per-node rewrite rules over the document tree.
//!
//! A single depth-first pass in document order. Children are rewritten before
//! their parent, so a container sees its content already cleaned (an `<div>`
//! whose only child was an image is empty by the time the pruning rule looks
//! at it).
//!
//! ## Rules
//!
//! 1. Span, Div, inline Code and Table lose their identifier, classes and
//!    key/value attributes.
//! 2. HTML `RawInline` fragments matching a clutter pattern become an empty
//!    `Str`; HTML `RawBlock` fragments matching the svg/img/favicon patterns
//!    become an empty `Plain`.
//! 3. Every Image is deleted.
//! 4. A Span or Div left with no children is deleted.
//! 5. Every Link becomes a footnote whose body is the link URL. Numbers come
//!    from the [`FootnoteTable`]: the same URL always gets the same number.
//! 6. A Header whose last item is a `Str` made of one balanced `{…}` token
//!    loses that item.
//! 7. Document metadata passes through unchanged.
//!
//! The only mutable state is the footnote table, owned by the [`Transformer`]
//! for the duration of one conversion.

use crate::ast::{Attr, Block, Caption, Cell, Inline, Pandoc, Row, Table, Target};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

// ── Footnote table ───────────────────────────────────────────────────────

/// One numbered footnote: the URL a link pointed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footnote {
    pub number: u32,
    pub url: String,
}

/// URL → footnote number, assigned in first-seen order starting at 1.
///
/// Scoped to one conversion; a fresh table is created for every document.
#[derive(Debug, Clone, Default)]
pub struct FootnoteTable {
    by_url: HashMap<String, u32>,
    footnotes: Vec<Footnote>,
}

impl FootnoteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number for `url`, assigning the next one on first sight.
    pub fn number_for(&mut self, url: &str) -> u32 {
        if let Some(&n) = self.by_url.get(url) {
            return n;
        }
        let n = self.footnotes.len() as u32 + 1;
        self.by_url.insert(url.to_string(), n);
        self.footnotes.push(Footnote {
            number: n,
            url: url.to_string(),
        });
        n
    }

    /// Number already assigned to `url`, without assigning one.
    pub fn lookup(&self, url: &str) -> Option<u32> {
        self.by_url.get(url).copied()
    }

    /// Footnotes in assignment order.
    pub fn footnotes(&self) -> &[Footnote] {
        &self.footnotes
    }

    pub fn len(&self) -> usize {
        self.footnotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.footnotes.is_empty()
    }

    pub fn into_footnotes(self) -> Vec<Footnote> {
        self.footnotes
    }
}

// ── Result types ─────────────────────────────────────────────────────────

/// Counters describing what a transformation pass removed or rewrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformStats {
    pub links_converted: usize,
    pub images_removed: usize,
    pub raw_fragments_removed: usize,
    pub containers_pruned: usize,
    pub heading_artifacts_removed: usize,
}

/// Output of [`transform`]: the rewritten tree plus its footnote table.
#[derive(Debug, Clone)]
pub struct Transformed {
    pub document: Pandoc,
    pub footnotes: FootnoteTable,
    pub stats: TransformStats,
}

/// Rewrite `doc` with a fresh footnote table.
pub fn transform(doc: Pandoc) -> Transformed {
    let mut transformer = Transformer::new();
    let document = transformer.run(doc);
    debug!(
        footnotes = transformer.footnotes.len(),
        links = transformer.stats.links_converted,
        images = transformer.stats.images_removed,
        "document transformed"
    );
    Transformed {
        document,
        footnotes: transformer.footnotes,
        stats: transformer.stats,
    }
}

// ── Clutter patterns ─────────────────────────────────────────────────────

static RE_TAIL_ARTIFACT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\\">\w+\.[A-Za-z]{2,}"#).unwrap());

const BLOCK_CLUTTER: [&str; 3] = ["<svg", "<img", "favicon"];
const INLINE_CLASS_CLUTTER: [&str; 2] = ["overflow-hidden", "text-center"];

fn is_inline_clutter(text: &str) -> bool {
    is_block_clutter(text)
        || INLINE_CLASS_CLUTTER.iter().any(|p| text.contains(p))
        || RE_TAIL_ARTIFACT.is_match(text)
}

fn is_block_clutter(text: &str) -> bool {
    BLOCK_CLUTTER.iter().any(|p| text.contains(p))
}

/// True when `text` is exactly one balanced `{…}` group.
fn is_brace_token(text: &str) -> bool {
    if !text.starts_with('{') || !text.ends_with('}') {
        return false;
    }
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i + c.len_utf8() == text.len();
                }
            }
            _ => {}
        }
    }
    false
}

// ── Transformer ──────────────────────────────────────────────────────────

/// Walks one document, holding the footnote table for that conversion.
#[derive(Debug, Default)]
pub struct Transformer {
    footnotes: FootnoteTable,
    stats: TransformStats,
}

impl Transformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn footnotes(&self) -> &FootnoteTable {
        &self.footnotes
    }

    pub fn stats(&self) -> &TransformStats {
        &self.stats
    }

    /// Rewrite a whole document. Metadata is returned as is.
    pub fn run(&mut self, doc: Pandoc) -> Pandoc {
        Pandoc {
            api_version: doc.api_version,
            meta: doc.meta,
            blocks: self.blocks(doc.blocks),
        }
    }

    fn blocks(&mut self, blocks: Vec<Block>) -> Vec<Block> {
        blocks.into_iter().filter_map(|b| self.block(b)).collect()
    }

    fn inlines(&mut self, inlines: Vec<Inline>) -> Vec<Inline> {
        inlines.into_iter().filter_map(|i| self.inline(i)).collect()
    }

    fn block(&mut self, block: Block) -> Option<Block> {
        match block {
            Block::Plain(c) => Some(Block::Plain(self.inlines(c))),
            Block::Para(c) => Some(Block::Para(self.inlines(c))),
            Block::LineBlock(lines) => Some(Block::LineBlock(
                lines.into_iter().map(|l| self.inlines(l)).collect(),
            )),
            Block::CodeBlock(..) | Block::HorizontalRule => Some(block),
            Block::RawBlock(format, text) => {
                if format.is_html() && is_block_clutter(&text) {
                    self.stats.raw_fragments_removed += 1;
                    Some(Block::Plain(Vec::new()))
                } else {
                    Some(Block::RawBlock(format, text))
                }
            }
            Block::BlockQuote(c) => Some(Block::BlockQuote(self.blocks(c))),
            Block::OrderedList(attrs, items) => {
                Some(Block::OrderedList(attrs, self.items(items)))
            }
            Block::BulletList(items) => Some(Block::BulletList(self.items(items))),
            Block::DefinitionList(entries) => Some(Block::DefinitionList(
                entries
                    .into_iter()
                    .map(|(term, defs)| (self.inlines(term), self.items(defs)))
                    .collect(),
            )),
            Block::Header(level, attr, content) => {
                let mut content = self.inlines(content);
                if matches!(content.last(), Some(Inline::Str(s)) if is_brace_token(s)) {
                    content.pop();
                    self.stats.heading_artifacts_removed += 1;
                }
                Some(Block::Header(level, attr, content))
            }
            Block::Table(table) => Some(Block::Table(Box::new(self.table(*table)))),
            Block::Figure(attr, caption, content) => Some(Block::Figure(
                attr,
                self.caption(caption),
                self.blocks(content),
            )),
            Block::Div(_, content) => {
                let content = self.blocks(content);
                if content.is_empty() {
                    self.stats.containers_pruned += 1;
                    None
                } else {
                    Some(Block::Div(Attr::default(), content))
                }
            }
        }
    }

    fn inline(&mut self, inline: Inline) -> Option<Inline> {
        match inline {
            Inline::Str(_)
            | Inline::Space
            | Inline::SoftBreak
            | Inline::LineBreak
            | Inline::Math(..) => Some(inline),
            Inline::Emph(c) => Some(Inline::Emph(self.inlines(c))),
            Inline::Underline(c) => Some(Inline::Underline(self.inlines(c))),
            Inline::Strong(c) => Some(Inline::Strong(self.inlines(c))),
            Inline::Strikeout(c) => Some(Inline::Strikeout(self.inlines(c))),
            Inline::Superscript(c) => Some(Inline::Superscript(self.inlines(c))),
            Inline::Subscript(c) => Some(Inline::Subscript(self.inlines(c))),
            Inline::SmallCaps(c) => Some(Inline::SmallCaps(self.inlines(c))),
            Inline::Quoted(q, c) => Some(Inline::Quoted(q, self.inlines(c))),
            Inline::Cite(citations, c) => Some(Inline::Cite(citations, self.inlines(c))),
            Inline::Code(_, text) => Some(Inline::Code(Attr::default(), text)),
            Inline::RawInline(format, text) => {
                if format.is_html() && is_inline_clutter(&text) {
                    self.stats.raw_fragments_removed += 1;
                    Some(Inline::Str(String::new()))
                } else {
                    Some(Inline::RawInline(format, text))
                }
            }
            Inline::Link(_, content, Target(url, _)) => {
                // Content is walked for its side effects on numbering, then dropped.
                let _ = self.inlines(content);
                self.stats.links_converted += 1;
                self.footnotes.number_for(&url);
                Some(footnote_for(url))
            }
            Inline::Image(..) => {
                self.stats.images_removed += 1;
                None
            }
            Inline::Note(content) => Some(Inline::Note(self.blocks(content))),
            Inline::Span(_, content) => {
                let content = self.inlines(content);
                if content.is_empty() {
                    self.stats.containers_pruned += 1;
                    None
                } else {
                    Some(Inline::Span(Attr::default(), content))
                }
            }
        }
    }

    fn items(&mut self, items: Vec<Vec<Block>>) -> Vec<Vec<Block>> {
        items.into_iter().map(|item| self.blocks(item)).collect()
    }

    fn caption(&mut self, Caption(short, long): Caption) -> Caption {
        Caption(short.map(|s| self.inlines(s)), self.blocks(long))
    }

    fn rows(&mut self, rows: Vec<Row>) -> Vec<Row> {
        rows.into_iter()
            .map(|Row(attr, cells)| {
                let cells = cells
                    .into_iter()
                    .map(|Cell(a, align, rs, cs, content)| {
                        Cell(a, align, rs, cs, self.blocks(content))
                    })
                    .collect();
                Row(attr, cells)
            })
            .collect()
    }

    fn table(&mut self, table: Table) -> Table {
        let Table(_, caption, colspecs, mut head, bodies, mut foot) = table;
        let caption = self.caption(caption);
        head.1 = self.rows(head.1);
        let bodies = bodies
            .into_iter()
            .map(|mut body| {
                body.2 = self.rows(body.2);
                body.3 = self.rows(body.3);
                body
            })
            .collect();
        foot.1 = self.rows(foot.1);
        Table(Attr::default(), caption, colspecs, head, bodies, foot)
    }
}

/// The footnote node a link is replaced with: one paragraph holding the URL.
fn footnote_for(url: String) -> Inline {
    Inline::Note(vec![Block::Para(vec![Inline::Str(url)])])
}

/// URL carried by a footnote built from a link, if `note` has that shape.
pub fn footnote_url(note: &[Block]) -> Option<&str> {
    match note {
        [Block::Para(inlines)] | [Block::Plain(inlines)] => match inlines.as_slice() {
            [Inline::Str(url)] => Some(url),
            _ => None,
        },
        _ => None,
    }
}
