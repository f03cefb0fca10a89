//! Pandoc-shaped document tree.
//!
//! The types mirror `pandoc-types` 1.23 closely enough that the serde
//! encoding *is* Pandoc's JSON AST (`pandoc -t json`): every `Block` and
//! `Inline` serialises as `{"t": "<Kind>", "c": <payload>}`, attributes as
//! `[id, [classes], [[key, value], …]]`, and tuple payloads as JSON arrays.
//! That lets the same tree come from the built-in HTML reader or from a real
//! Pandoc run, and go back out to either writer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pandoc API version written into JSON output.
pub const PANDOC_API_VERSION: [u32; 3] = [1, 23, 1];

/// A whole document: metadata plus the top-level block sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pandoc {
    #[serde(rename = "pandoc-api-version")]
    pub api_version: Vec<u32>,
    pub meta: BTreeMap<String, MetaValue>,
    pub blocks: Vec<Block>,
}

impl Default for Pandoc {
    fn default() -> Self {
        Self {
            api_version: PANDOC_API_VERSION.to_vec(),
            meta: BTreeMap::new(),
            blocks: Vec::new(),
        }
    }
}

impl Pandoc {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            ..Self::default()
        }
    }

    /// Plain-text rendering of the `title` metadata field, if present.
    pub fn title(&self) -> Option<String> {
        let title = match self.meta.get("title")? {
            MetaValue::MetaString(s) => s.clone(),
            MetaValue::MetaInlines(inlines) => stringify(inlines),
            MetaValue::MetaBlocks(blocks) => blocks
                .iter()
                .filter_map(Block::inlines)
                .map(|i| stringify(i))
                .collect::<Vec<_>>()
                .join(" "),
            _ => return None,
        };
        let title = title.trim().to_string();
        (!title.is_empty()).then_some(title)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "c")]
pub enum MetaValue {
    MetaMap(BTreeMap<String, MetaValue>),
    MetaList(Vec<MetaValue>),
    MetaBool(bool),
    MetaString(String),
    MetaInlines(Vec<Inline>),
    MetaBlocks(Vec<Block>),
}

// ── Attributes ───────────────────────────────────────────────────────────

/// Identifier, classes and key/value pairs attached to an element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AttrRepr", into = "AttrRepr")]
pub struct Attr {
    pub identifier: String,
    pub classes: Vec<String>,
    pub attributes: Vec<(String, String)>,
}

type AttrRepr = (String, Vec<String>, Vec<(String, String)>);

impl From<AttrRepr> for Attr {
    fn from((identifier, classes, attributes): AttrRepr) -> Self {
        Self {
            identifier,
            classes,
            attributes,
        }
    }
}

impl From<Attr> for AttrRepr {
    fn from(attr: Attr) -> Self {
        (attr.identifier, attr.classes, attr.attributes)
    }
}

impl Attr {
    pub fn is_empty(&self) -> bool {
        self.identifier.is_empty() && self.classes.is_empty() && self.attributes.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Link or image target: `(url, title)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target(pub String, pub String);

impl Target {
    pub fn url(&self) -> &str {
        &self.0
    }

    pub fn title(&self) -> &str {
        &self.1
    }
}

/// Raw-markup format tag, e.g. `"html"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Format(pub String);

impl Format {
    pub fn html() -> Self {
        Self("html".to_string())
    }

    pub fn is_html(&self) -> bool {
        self.0.eq_ignore_ascii_case("html")
    }
}

// ── Inlines ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "c")]
pub enum Inline {
    Str(String),
    Emph(Vec<Inline>),
    Underline(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikeout(Vec<Inline>),
    Superscript(Vec<Inline>),
    Subscript(Vec<Inline>),
    SmallCaps(Vec<Inline>),
    Quoted(QuoteType, Vec<Inline>),
    Cite(Vec<Citation>, Vec<Inline>),
    Code(Attr, String),
    Space,
    SoftBreak,
    LineBreak,
    Math(MathType, String),
    RawInline(Format, String),
    Link(Attr, Vec<Inline>, Target),
    Image(Attr, Vec<Inline>, Target),
    Note(Vec<Block>),
    Span(Attr, Vec<Inline>),
}

impl Inline {
    pub fn str(text: impl Into<String>) -> Self {
        Inline::Str(text.into())
    }

    pub fn raw_html(text: impl Into<String>) -> Self {
        Inline::RawInline(Format::html(), text.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum QuoteType {
    SingleQuote,
    DoubleQuote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum MathType {
    DisplayMath,
    InlineMath,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub citation_id: String,
    pub citation_prefix: Vec<Inline>,
    pub citation_suffix: Vec<Inline>,
    pub citation_mode: CitationMode,
    pub citation_note_num: i32,
    pub citation_hash: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum CitationMode {
    AuthorInText,
    SuppressAuthor,
    NormalCitation,
}

// ── Blocks ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "c")]
pub enum Block {
    Plain(Vec<Inline>),
    Para(Vec<Inline>),
    LineBlock(Vec<Vec<Inline>>),
    CodeBlock(Attr, String),
    RawBlock(Format, String),
    BlockQuote(Vec<Block>),
    OrderedList(ListAttributes, Vec<Vec<Block>>),
    BulletList(Vec<Vec<Block>>),
    DefinitionList(Vec<(Vec<Inline>, Vec<Vec<Block>>)>),
    Header(i32, Attr, Vec<Inline>),
    HorizontalRule,
    Table(Box<Table>),
    Figure(Attr, Caption, Vec<Block>),
    Div(Attr, Vec<Block>),
}

impl Block {
    /// The inline content of a `Plain` or `Para`.
    pub fn inlines(&self) -> Option<&Vec<Inline>> {
        match self {
            Block::Plain(inlines) | Block::Para(inlines) => Some(inlines),
            _ => None,
        }
    }
}

/// `(start number, numbering style, delimiter)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListAttributes(pub i32, pub ListNumberStyle, pub ListNumberDelim);

impl Default for ListAttributes {
    fn default() -> Self {
        Self(1, ListNumberStyle::DefaultStyle, ListNumberDelim::DefaultDelim)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum ListNumberStyle {
    DefaultStyle,
    Example,
    Decimal,
    LowerRoman,
    UpperRoman,
    LowerAlpha,
    UpperAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum ListNumberDelim {
    DefaultDelim,
    Period,
    OneParen,
    TwoParens,
}

// ── Tables ───────────────────────────────────────────────────────────────

/// Pandoc's table payload, boxed inside [`Block::Table`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table(
    pub Attr,
    pub Caption,
    pub Vec<ColSpec>,
    pub TableHead,
    pub Vec<TableBody>,
    pub TableFoot,
);

/// Optional short caption plus the caption blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Caption(pub Option<Vec<Inline>>, pub Vec<Block>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColSpec(pub Alignment, pub ColWidth);

impl Default for ColSpec {
    fn default() -> Self {
        Self(Alignment::AlignDefault, ColWidth::ColWidthDefault)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t")]
pub enum Alignment {
    AlignLeft,
    AlignRight,
    AlignCenter,
    AlignDefault,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "c")]
pub enum ColWidth {
    ColWidth(f64),
    ColWidthDefault,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableHead(pub Attr, pub Vec<Row>);

/// `(attr, row-head columns, intermediate head rows, body rows)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableBody(pub Attr, pub i32, pub Vec<Row>, pub Vec<Row>);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableFoot(pub Attr, pub Vec<Row>);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row(pub Attr, pub Vec<Cell>);

/// `(attr, alignment, row span, column span, content)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell(pub Attr, pub Alignment, pub i32, pub i32, pub Vec<Block>);

impl Cell {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self(Attr::default(), Alignment::AlignDefault, 1, 1, blocks)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// Flatten inlines to their visible text, dropping markup.
pub fn stringify(inlines: &[Inline]) -> String {
    let mut out = String::new();
    stringify_into(inlines, &mut out);
    out
}

fn stringify_into(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Str(s) | Inline::Code(_, s) | Inline::Math(_, s) => out.push_str(s),
            Inline::Space | Inline::SoftBreak | Inline::LineBreak => out.push(' '),
            Inline::Emph(c)
            | Inline::Underline(c)
            | Inline::Strong(c)
            | Inline::Strikeout(c)
            | Inline::Superscript(c)
            | Inline::Subscript(c)
            | Inline::SmallCaps(c)
            | Inline::Cite(_, c)
            | Inline::Link(_, c, _)
            | Inline::Image(_, c, _)
            | Inline::Span(_, c) => stringify_into(c, out),
            Inline::Quoted(QuoteType::SingleQuote, c) => {
                out.push('\'');
                stringify_into(c, out);
                out.push('\'');
            }
            Inline::Quoted(QuoteType::DoubleQuote, c) => {
                out.push('"');
                stringify_into(c, out);
                out.push('"');
            }
            Inline::RawInline(..) | Inline::Note(_) => {}
        }
    }
}
