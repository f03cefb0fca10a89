//! HTML reader: parse a page with html5ever and map the DOM onto the
//! document tree.
//!
//! The mapping follows what Pandoc's own HTML reader produces for the
//! constructs saved web pages actually use. Elements with no structural
//! counterpart are kept as raw HTML (`RawInline`/`RawBlock`) rather than
//! silently dropped, so the transformer can decide whether they are clutter.
//! `<svg>` and embedded media are captured whole; other unknown inline tags
//! contribute their opening and closing tags as separate raw fragments with
//! the parsed children in between.

use crate::ast::{
    Attr, Block, Caption, Cell, ColSpec, Format, Inline, ListAttributes, ListNumberDelim,
    ListNumberStyle, MetaValue, Pandoc, QuoteType, Row, Table, TableBody, TableFoot, TableHead,
    Target,
};
use crate::error::Html2MdError;
use html5ever::driver::ParseOpts;
use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{parse_document, Attribute};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use tracing::debug;

/// Containers mapped to `Div`.
const DIV_LIKE: &[&str] = &[
    "div", "section", "article", "main", "header", "footer", "nav", "aside", "center",
    "address", "details", "summary", "form", "fieldset", "hgroup", "search", "dialog",
];

/// Elements whose content never reaches the document.
const SKIPPED: &[&str] = &[
    "head", "script", "style", "noscript", "template", "meta", "link", "base", "title",
];

/// Embedded content kept verbatim as a `RawBlock` at block level.
const RAW_BLOCK_ELEMENTS: &[&str] = &["iframe", "video", "audio", "canvas", "object", "embed"];

/// Inline elements kept verbatim as a single `RawInline`.
const RAW_WHOLE_INLINE: &[&str] = &["svg", "math", "picture"];

/// Phrase elements that only wrap their text.
const TRANSPARENT: &[&str] = &[
    "abbr", "cite", "small", "big", "mark", "time", "font", "bdi", "bdo", "dfn", "var", "data",
    "nobr", "html", "body",
];

const VOID: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta",
    "param", "source", "track", "wbr",
];

// ── DOM helpers ──────────────────────────────────────────────────────────

/// Parse an HTML document into an `RcDom`.
pub fn parse_dom(html: &str) -> Result<RcDom, Html2MdError> {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            drop_doctype: false,
            ..Default::default()
        },
        ..Default::default()
    };
    parse_document(RcDom::default(), opts)
        .from_utf8()
        .read_from(&mut html.as_bytes())
        .map_err(|e| Html2MdError::HtmlParse(e.to_string()))
}

/// Local tag name of an element node.
pub fn element_name(node: &Handle) -> Option<&str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(&*name.local),
        _ => None,
    }
}

/// Parent of `node`, if it is still attached to one.
pub fn parent_of(node: &Handle) -> Option<Handle> {
    let weak = node.parent.take();
    let parent = weak.as_ref().and_then(|w| w.upgrade());
    node.parent.set(weak);
    parent
}

fn attribute(node: &Handle, key: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| &*a.name.local == key)
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

/// The element's attributes as an `Attr`, leaving out `skip`.
fn attr_of(node: &Handle, skip: &[&str]) -> Attr {
    let mut attr = Attr::default();
    if let NodeData::Element { attrs, .. } = &node.data {
        for a in attrs.borrow().iter() {
            let key: &str = &a.name.local;
            match key {
                "id" => attr.identifier = a.value.to_string(),
                "class" => {
                    attr.classes = a.value.split_whitespace().map(str::to_string).collect();
                }
                k if skip.contains(&k) => {}
                k => attr.attributes.push((k.to_string(), a.value.to_string())),
            }
        }
    }
    attr
}

/// All text below `node`; `<br>` becomes a newline.
pub fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn collect_text(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        NodeData::Element { .. } if element_name(node) == Some("br") => out.push('\n'),
        _ => {
            for child in node.children.borrow().iter() {
                collect_text(child, out);
            }
        }
    }
}

/// First `<title>` outside of any `<svg>`, trimmed.
pub fn find_title(dom: &RcDom) -> Option<String> {
    fn walk(node: &Handle) -> Option<String> {
        for child in node.children.borrow().iter() {
            match element_name(child) {
                Some("svg") => continue,
                Some("title") => {
                    let text = text_content(child).trim().to_string();
                    if !text.is_empty() {
                        return Some(text);
                    }
                }
                _ => {}
            }
            if let Some(found) = walk(child) {
                return Some(found);
            }
        }
        None
    }
    walk(&dom.document)
}

fn outer_html(node: &Handle) -> String {
    let mut bytes = Vec::new();
    let handle: SerializableHandle = node.clone().into();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::IncludeNode,
        ..Default::default()
    };
    match serialize(&mut bytes, &handle, opts) {
        Ok(()) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    }
}

fn open_tag(name: &str, attrs: &[Attribute]) -> String {
    let mut tag = format!("<{name}");
    for a in attrs {
        tag.push(' ');
        tag.push_str(&a.name.local);
        tag.push_str("=\"");
        tag.push_str(&a.value.replace('&', "&amp;").replace('"', "&quot;"));
        tag.push('"');
    }
    tag.push('>');
    tag
}

// ── Text ─────────────────────────────────────────────────────────────────

fn is_html_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0c')
}

/// Split text into `Str` words separated by `Space`.
fn text_inlines(text: &str, out: &mut Vec<Inline>) {
    let mut word = String::new();
    for c in text.chars() {
        if is_html_space(c) {
            if !word.is_empty() {
                out.push(Inline::Str(std::mem::take(&mut word)));
            }
            if !matches!(out.last(), Some(Inline::Space)) {
                out.push(Inline::Space);
            }
        } else {
            word.push(c);
        }
    }
    if !word.is_empty() {
        out.push(Inline::Str(word));
    }
}

/// Collapse runs of spaces and trim them from both ends.
fn normalize(inlines: Vec<Inline>) -> Vec<Inline> {
    let mut out: Vec<Inline> = Vec::with_capacity(inlines.len());
    for inline in inlines {
        let is_space = matches!(inline, Inline::Space | Inline::SoftBreak);
        if is_space && matches!(out.last(), None | Some(Inline::Space | Inline::SoftBreak | Inline::LineBreak)) {
            continue;
        }
        out.push(inline);
    }
    while matches!(out.last(), Some(Inline::Space | Inline::SoftBreak)) {
        out.pop();
    }
    out
}

// ── Block assembly ───────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Wrap {
    Para,
    Plain,
}

/// Collects blocks, gathering loose inline content into paragraphs.
struct BlockSink {
    blocks: Vec<Block>,
    pending: Vec<Inline>,
    wrap: Wrap,
}

impl BlockSink {
    fn new(wrap: Wrap) -> Self {
        Self {
            blocks: Vec::new(),
            pending: Vec::new(),
            wrap,
        }
    }

    fn flush(&mut self) {
        let inlines = normalize(std::mem::take(&mut self.pending));
        if inlines.is_empty() {
            return;
        }
        self.blocks.push(match self.wrap {
            Wrap::Para => Block::Para(inlines),
            Wrap::Plain => Block::Plain(inlines),
        });
    }

    fn push(&mut self, block: Block) {
        self.flush();
        self.blocks.push(block);
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }
}

// ── Reader ───────────────────────────────────────────────────────────────

/// Parse `html` and convert it to a document tree.
pub fn read_html(html: &str) -> Result<Pandoc, Html2MdError> {
    let dom = parse_dom(html)?;
    Ok(dom_to_pandoc(&dom))
}

/// Convert an already parsed (and possibly cleaned) DOM.
pub fn dom_to_pandoc(dom: &RcDom) -> Pandoc {
    let mut doc = Pandoc::new(blocks_of(&dom.document, Wrap::Para));
    if let Some(title) = find_title(dom) {
        let mut inlines = Vec::new();
        text_inlines(&title, &mut inlines);
        doc.meta
            .insert("title".to_string(), MetaValue::MetaInlines(normalize(inlines)));
    }
    debug!(blocks = doc.blocks.len(), "HTML read");
    doc
}

fn blocks_of(node: &Handle, wrap: Wrap) -> Vec<Block> {
    let mut sink = BlockSink::new(wrap);
    for child in node.children.borrow().iter() {
        block_node(child, &mut sink);
    }
    sink.finish()
}

fn block_node(node: &Handle, sink: &mut BlockSink) {
    match &node.data {
        NodeData::Text { contents } => text_inlines(&contents.borrow(), &mut sink.pending),
        NodeData::Comment { contents } => {
            sink.push(Block::RawBlock(Format::html(), format!("<!--{contents}-->")))
        }
        NodeData::Element { .. } => {
            let name = element_name(node).unwrap_or_default();
            block_element(node, name, sink);
        }
        _ => {
            for child in node.children.borrow().iter() {
                block_node(child, sink);
            }
        }
    }
}

fn block_element(node: &Handle, name: &str, sink: &mut BlockSink) {
    match name {
        n if SKIPPED.contains(&n) => {}
        "html" | "body" => {
            for child in node.children.borrow().iter() {
                block_node(child, sink);
            }
        }
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = name[1..].parse().unwrap_or(1);
            sink.push(Block::Header(level, attr_of(node, &[]), normalize(inlines_of(node))));
        }
        "p" => {
            sink.flush();
            let inlines = normalize(inlines_of(node));
            if !inlines.is_empty() {
                sink.push(Block::Para(inlines));
            }
        }
        "pre" => sink.push(code_block(node)),
        "blockquote" => sink.push(Block::BlockQuote(blocks_of(node, Wrap::Para))),
        "ul" => sink.push(Block::BulletList(list_items(node))),
        "ol" => sink.push(Block::OrderedList(list_attributes(node), list_items(node))),
        "dl" => sink.push(Block::DefinitionList(definition_items(node))),
        "hr" => sink.push(Block::HorizontalRule),
        "table" => sink.push(Block::Table(Box::new(table(node)))),
        "figure" => sink.push(figure(node)),
        n if DIV_LIKE.contains(&n) => {
            sink.push(Block::Div(attr_of(node, &[]), blocks_of(node, Wrap::Para)))
        }
        n if RAW_BLOCK_ELEMENTS.contains(&n) => {
            sink.push(Block::RawBlock(Format::html(), outer_html(node)))
        }
        _ => inline_element(node, name, &mut sink.pending),
    }
}

fn code_block(pre: &Handle) -> Block {
    let mut attr = attr_of(pre, &[]);
    if attr.classes.is_empty() {
        let code = pre
            .children
            .borrow()
            .iter()
            .find(|c| element_name(c) == Some("code"))
            .cloned();
        if let Some(code) = code {
            attr.classes = attr_of(&code, &[])
                .classes
                .into_iter()
                .map(|c| c.strip_prefix("language-").map(str::to_string).unwrap_or(c))
                .collect();
        }
    }
    let text = text_content(pre);
    let text = text.strip_prefix('\n').unwrap_or(&text);
    Block::CodeBlock(attr, text.trim_end_matches('\n').to_string())
}

fn list_attributes(ol: &Handle) -> ListAttributes {
    let start = attribute(ol, "start")
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(1);
    let style = match attribute(ol, "type").as_deref() {
        Some("1") => ListNumberStyle::Decimal,
        Some("a") => ListNumberStyle::LowerAlpha,
        Some("A") => ListNumberStyle::UpperAlpha,
        Some("i") => ListNumberStyle::LowerRoman,
        Some("I") => ListNumberStyle::UpperRoman,
        _ => ListNumberStyle::DefaultStyle,
    };
    ListAttributes(start, style, ListNumberDelim::DefaultDelim)
}

fn list_items(list: &Handle) -> Vec<Vec<Block>> {
    let mut items: Vec<Vec<Block>> = Vec::new();
    for child in list.children.borrow().iter() {
        if element_name(child) == Some("li") {
            items.push(blocks_of(child, Wrap::Plain));
            continue;
        }
        // Stray content between items (e.g. a nested list placed directly in
        // the parent list) belongs to the preceding item.
        let mut sink = BlockSink::new(Wrap::Plain);
        block_node(child, &mut sink);
        let blocks = sink.finish();
        if blocks.is_empty() {
            continue;
        }
        match items.last_mut() {
            Some(last) => last.extend(blocks),
            None => items.push(blocks),
        }
    }
    items
}

fn definition_items(dl: &Handle) -> Vec<(Vec<Inline>, Vec<Vec<Block>>)> {
    let mut items: Vec<(Vec<Inline>, Vec<Vec<Block>>)> = Vec::new();
    collect_definitions(dl, &mut items);
    items
}

fn collect_definitions(node: &Handle, items: &mut Vec<(Vec<Inline>, Vec<Vec<Block>>)>) {
    for child in node.children.borrow().iter() {
        match element_name(child) {
            Some("dt") => items.push((normalize(inlines_of(child)), Vec::new())),
            Some("dd") => {
                let blocks = blocks_of(child, Wrap::Plain);
                match items.last_mut() {
                    Some((_, defs)) => defs.push(blocks),
                    None => items.push((Vec::new(), vec![blocks])),
                }
            }
            Some("div") => collect_definitions(child, items),
            _ => {}
        }
    }
}

fn table(node: &Handle) -> Table {
    let mut caption = Caption::default();
    let mut head: Vec<(Row, bool)> = Vec::new();
    let mut body: Vec<(Row, bool)> = Vec::new();
    let mut foot: Vec<(Row, bool)> = Vec::new();

    for child in node.children.borrow().iter() {
        match element_name(child) {
            Some("caption") => caption = Caption(None, blocks_of(child, Wrap::Plain)),
            Some("thead") => head.extend(rows(child)),
            Some("tbody") => body.extend(rows(child)),
            Some("tfoot") => foot.extend(rows(child)),
            Some("tr") => body.push(row(child)),
            _ => {}
        }
    }

    if head.is_empty() && body.first().is_some_and(|(_, all_th)| *all_th) {
        head.push(body.remove(0));
    }

    let columns = head
        .iter()
        .chain(&body)
        .chain(&foot)
        .map(|(Row(_, cells), _)| cells.iter().map(|c| c.3.max(1) as usize).sum::<usize>())
        .max()
        .unwrap_or(0);

    let strip = |rows: Vec<(Row, bool)>| rows.into_iter().map(|(r, _)| r).collect::<Vec<_>>();
    Table(
        attr_of(node, &[]),
        caption,
        vec![ColSpec::default(); columns],
        TableHead(Attr::default(), strip(head)),
        vec![TableBody(Attr::default(), 0, Vec::new(), strip(body))],
        TableFoot(Attr::default(), strip(foot)),
    )
}

fn rows(section: &Handle) -> Vec<(Row, bool)> {
    section
        .children
        .borrow()
        .iter()
        .filter(|c| element_name(c) == Some("tr"))
        .map(row)
        .collect()
}

/// A table row, plus whether every cell in it is a `<th>`.
fn row(tr: &Handle) -> (Row, bool) {
    let mut cells = Vec::new();
    let mut all_th = true;
    for child in tr.children.borrow().iter() {
        let name = element_name(child);
        if !matches!(name, Some("td" | "th")) {
            continue;
        }
        all_th &= name == Some("th");
        let span = |key: &str| {
            attribute(child, key)
                .and_then(|v| v.trim().parse::<i32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(1)
        };
        let mut cell = Cell::new(blocks_of(child, Wrap::Plain));
        cell.2 = span("rowspan");
        cell.3 = span("colspan");
        cells.push(cell);
    }
    let all_th = all_th && !cells.is_empty();
    (Row(Attr::default(), cells), all_th)
}

fn figure(node: &Handle) -> Block {
    let mut caption = Caption::default();
    let mut sink = BlockSink::new(Wrap::Para);
    for child in node.children.borrow().iter() {
        if element_name(child) == Some("figcaption") {
            caption = Caption(None, blocks_of(child, Wrap::Plain));
        } else {
            block_node(child, &mut sink);
        }
    }
    Block::Figure(attr_of(node, &[]), caption, sink.finish())
}

// ── Inlines ──────────────────────────────────────────────────────────────

fn inlines_of(node: &Handle) -> Vec<Inline> {
    let mut out = Vec::new();
    for child in node.children.borrow().iter() {
        inline_node(child, &mut out);
    }
    out
}

fn inline_node(node: &Handle, out: &mut Vec<Inline>) {
    match &node.data {
        NodeData::Text { contents } => text_inlines(&contents.borrow(), out),
        NodeData::Comment { contents } => out.push(Inline::raw_html(format!("<!--{contents}-->"))),
        NodeData::Element { .. } => {
            let name = element_name(node).unwrap_or_default();
            if !SKIPPED.contains(&name) {
                inline_element(node, name, out);
            }
        }
        _ => {}
    }
}

fn inline_element(node: &Handle, name: &str, out: &mut Vec<Inline>) {
    match name {
        "a" => match attribute(node, "href") {
            Some(href) => {
                let title = attribute(node, "title").unwrap_or_default();
                out.push(Inline::Link(
                    attr_of(node, &["href", "title"]),
                    normalize(inlines_of(node)),
                    Target(href, title),
                ));
            }
            None => out.push(Inline::Span(attr_of(node, &[]), inlines_of(node))),
        },
        "img" => {
            let mut alt = Vec::new();
            text_inlines(&attribute(node, "alt").unwrap_or_default(), &mut alt);
            out.push(Inline::Image(
                attr_of(node, &["src", "alt", "title"]),
                normalize(alt),
                Target(
                    attribute(node, "src").unwrap_or_default(),
                    attribute(node, "title").unwrap_or_default(),
                ),
            ));
        }
        "span" => out.push(Inline::Span(attr_of(node, &[]), inlines_of(node))),
        "code" | "tt" | "samp" => out.push(Inline::Code(attr_of(node, &[]), text_content(node))),
        "em" | "i" => out.push(Inline::Emph(inlines_of(node))),
        "strong" | "b" => out.push(Inline::Strong(inlines_of(node))),
        "u" | "ins" => out.push(Inline::Underline(inlines_of(node))),
        "s" | "del" | "strike" => out.push(Inline::Strikeout(inlines_of(node))),
        "sup" => out.push(Inline::Superscript(inlines_of(node))),
        "sub" => out.push(Inline::Subscript(inlines_of(node))),
        "q" => out.push(Inline::Quoted(QuoteType::DoubleQuote, inlines_of(node))),
        "br" => out.push(Inline::LineBreak),
        "wbr" => {}
        n if RAW_WHOLE_INLINE.contains(&n) || RAW_BLOCK_ELEMENTS.contains(&n) => {
            out.push(Inline::raw_html(outer_html(node)))
        }
        n if TRANSPARENT.contains(&n) || DIV_LIKE.contains(&n) || is_block_level(n) => {
            // Block structure cannot live inside inline content; keep the text.
            let before = out.len();
            out.extend(inlines_of(node));
            if is_block_level(n) || DIV_LIKE.contains(&n) {
                out.insert(before, Inline::Space);
                out.push(Inline::Space);
            }
        }
        n => {
            let attrs = match &node.data {
                NodeData::Element { attrs, .. } => attrs.borrow().clone(),
                _ => Vec::new(),
            };
            out.push(Inline::raw_html(open_tag(n, &attrs)));
            if !VOID.contains(&n) {
                out.extend(inlines_of(node));
                out.push(Inline::raw_html(format!("</{n}>")));
            }
        }
    }
}

fn is_block_level(name: &str) -> bool {
    matches!(
        name,
        "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "pre" | "blockquote" | "ul" | "ol"
            | "li" | "dl" | "dt" | "dd" | "table" | "thead" | "tbody" | "tfoot" | "tr" | "td"
            | "th" | "caption" | "figure" | "figcaption" | "hr"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::stringify;

    fn body(html: &str) -> Vec<Block> {
        read_html(html).unwrap().blocks
    }

    #[test]
    fn paragraph_words_and_spaces() {
        let blocks = body("<p>  Hello   <em>big</em>\n world </p>");
        assert_eq!(
            blocks,
            vec![Block::Para(vec![
                Inline::str("Hello"),
                Inline::Space,
                Inline::Emph(vec![Inline::str("big")]),
                Inline::Space,
                Inline::str("world"),
            ])]
        );
    }

    #[test]
    fn title_goes_to_metadata() {
        let doc = read_html("<html><head><title> My Page </title></head><body><p>x</p></body></html>")
            .unwrap();
        assert_eq!(doc.title().as_deref(), Some("My Page"));
        assert_eq!(doc.blocks, vec![Block::Para(vec![Inline::str("x")])]);
    }

    #[test]
    fn headings_keep_level_and_id() {
        let blocks = body(r#"<h2 id="s1" class="t">Section <a href="https://a.example">one</a></h2>"#);
        match &blocks[0] {
            Block::Header(2, attr, content) => {
                assert_eq!(attr.identifier, "s1");
                assert_eq!(attr.classes, vec!["t".to_string()]);
                assert!(matches!(&content[2], Inline::Link(_, _, t) if t.url() == "https://a.example"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn anchor_without_href_is_span() {
        let blocks = body(r#"<p><a id="top"></a>Text</p>"#);
        assert_eq!(
            blocks,
            vec![Block::Para(vec![
                Inline::Span(
                    Attr {
                        identifier: "top".into(),
                        ..Attr::default()
                    },
                    vec![]
                ),
                Inline::str("Text"),
            ])]
        );
    }

    #[test]
    fn images_carry_alt_and_src() {
        let blocks = body(r#"<p><img src="a.png" alt="An image" class="hero"></p>"#);
        match &blocks[0] {
            Block::Para(inlines) => match &inlines[0] {
                Inline::Image(attr, alt, target) => {
                    assert_eq!(target.url(), "a.png");
                    assert_eq!(stringify(alt), "An image");
                    assert_eq!(attr.classes, vec!["hero".to_string()]);
                }
                other => panic!("unexpected {other:?}"),
            },
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn divs_and_loose_text() {
        let blocks = body("<div class=\"wrap\">loose <b>text</b><p>para</p></div>");
        match &blocks[0] {
            Block::Div(attr, content) => {
                assert_eq!(attr.classes, vec!["wrap".to_string()]);
                assert_eq!(
                    content,
                    &vec![
                        Block::Para(vec![
                            Inline::str("loose"),
                            Inline::Space,
                            Inline::Strong(vec![Inline::str("text")]),
                        ]),
                        Block::Para(vec![Inline::str("para")]),
                    ]
                );
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn svg_is_one_raw_inline() {
        let blocks = body(r#"<p>Go<svg viewBox="0 0 1 1"><path d="M0"></path></svg></p>"#);
        match &blocks[0] {
            Block::Para(inlines) => {
                assert_eq!(inlines.len(), 2);
                assert!(matches!(&inlines[1], Inline::RawInline(f, t) if f.is_html() && t.starts_with("<svg")));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_inline_tags_become_raw_open_and_close() {
        let blocks = body(r#"<p><button class="overflow-hidden">Copy</button></p>"#);
        assert_eq!(
            blocks,
            vec![Block::Para(vec![
                Inline::raw_html(r#"<button class="overflow-hidden">"#),
                Inline::str("Copy"),
                Inline::raw_html("</button>"),
            ])]
        );
    }

    #[test]
    fn iframe_is_raw_block() {
        let blocks = body(r#"<iframe src="https://v.example"></iframe>"#);
        assert!(matches!(&blocks[0], Block::RawBlock(f, t) if f.is_html() && t.starts_with("<iframe")));
    }

    #[test]
    fn lists_and_nesting() {
        let blocks = body("<ol start=\"3\"><li>a</li><li>b<ul><li>c</li></ul></li></ol>");
        match &blocks[0] {
            Block::OrderedList(ListAttributes(3, _, _), items) => {
                assert_eq!(items.len(), 2);
                assert_eq!(items[0], vec![Block::Plain(vec![Inline::str("a")])]);
                assert!(matches!(&items[1][1], Block::BulletList(inner) if inner.len() == 1));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn pre_becomes_code_block_with_language() {
        let blocks = body("<pre><code class=\"language-rust\">fn main() {}\n</code></pre>");
        match &blocks[0] {
            Block::CodeBlock(attr, text) => {
                assert_eq!(attr.classes, vec!["rust".to_string()]);
                assert_eq!(text, "fn main() {}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn table_with_header_row() {
        let blocks = body(
            "<table id=\"t\"><tr><th>A</th><th>B</th></tr><tr><td>1</td><td colspan=\"2\">2</td></tr></table>",
        );
        let Block::Table(t) = &blocks[0] else {
            panic!("expected a table");
        };
        assert_eq!(t.0.identifier, "t");
        assert_eq!(t.2.len(), 3);
        assert_eq!(t.3 .1.len(), 1);
        assert_eq!(t.4[0].3.len(), 1);
        assert_eq!(t.4[0].3[0].1[1].3, 2);
    }

    #[test]
    fn scripts_and_styles_are_skipped() {
        let blocks = body("<script>var x = 1;</script><style>p{}</style><p>ok</p>");
        assert_eq!(blocks, vec![Block::Para(vec![Inline::str("ok")])]);
    }

    #[test]
    fn comments_are_raw_html() {
        let blocks = body("<!-- note --><p>x</p>");
        assert_eq!(blocks[0], Block::RawBlock(Format::html(), "<!-- note -->".into()));
    }

    #[test]
    fn non_breaking_space_stays_in_word() {
        let blocks = body("<p>a\u{a0}b</p>");
        assert_eq!(blocks, vec![Block::Para(vec![Inline::str("a\u{a0}b")])]);
    }
}
