//! HTML pre-cleaning: drop icon markup and content-less `<div>`s.
//!
//! Saved web pages carry a lot of inline SVG (icons, logos, decorative
//! glyphs) wrapped in layout `<div>`s that hold nothing else. Left in place,
//! those wrappers turn into empty blocks and stray raw fragments downstream.
//! This stage works on the parsed DOM before the document tree is built:
//!
//! 1. every `<svg>` and `<path>` element is removed; when the nearest
//!    enclosing `<div>` is left without visible text, it goes too;
//! 2. every remaining `<div>` without visible text is removed.
//!
//! "Visible text" means a non-whitespace text node that is not inside an
//! `<svg>` or `<path>`. Elements such as an empty `<span>` or an `<img>` do
//! not count.

use crate::error::Html2MdError;
use crate::reader::html::{element_name, parse_dom, parent_of};
use html5ever::serialize::{serialize, SerializeOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use std::rc::Rc;
use tracing::debug;

/// What the cleaner removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub svgs_removed: usize,
    pub divs_removed: usize,
}

/// Parse `html`, clean it, and serialise it back to HTML.
pub fn clean_html(html: &str) -> Result<String, Html2MdError> {
    let dom = parse_dom(html)?;
    clean_dom(&dom);
    serialize_dom(&dom)
}

/// Clean a parsed DOM in place.
pub fn clean_dom(dom: &RcDom) -> CleanStats {
    let mut stats = CleanStats::default();

    let mut icons = Vec::new();
    collect_elements(&dom.document, &["svg", "path"], &mut icons);
    for icon in &icons {
        // A <path> inside an <svg> that is already gone.
        if !is_attached(icon) {
            continue;
        }
        let wrapper = nearest_ancestor(icon, "div");
        if detach(icon) {
            stats.svgs_removed += 1;
        }
        if let Some(div) = wrapper {
            if !has_visible_text(&div) && detach(&div) {
                stats.divs_removed += 1;
            }
        }
    }

    let mut divs = Vec::new();
    collect_elements(&dom.document, &["div"], &mut divs);
    for div in &divs {
        if is_attached(div) && !has_visible_text(div) && detach(div) {
            stats.divs_removed += 1;
        }
    }

    debug!(
        svgs = stats.svgs_removed,
        divs = stats.divs_removed,
        "HTML cleaned"
    );
    stats
}

/// Serialise the document node's children back to an HTML string.
pub fn serialize_dom(dom: &RcDom) -> Result<String, Html2MdError> {
    let mut bytes = Vec::new();
    let handle: SerializableHandle = dom.document.clone().into();
    serialize(&mut bytes, &handle, SerializeOpts::default())
        .map_err(|e| Html2MdError::Internal(format!("HTML serialisation failed: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| Html2MdError::Internal(format!("serialised HTML is not UTF-8: {e}")))
}

/// Elements named in `names`, in document order.
fn collect_elements(node: &Handle, names: &[&str], out: &mut Vec<Handle>) {
    for child in node.children.borrow().iter() {
        if element_name(child).is_some_and(|n| names.contains(&n)) {
            out.push(child.clone());
        }
        collect_elements(child, names, out);
    }
}

fn nearest_ancestor(node: &Handle, name: &str) -> Option<Handle> {
    let mut current = parent_of(node);
    while let Some(candidate) = current {
        if element_name(&candidate) == Some(name) {
            return Some(candidate);
        }
        current = parent_of(&candidate);
    }
    None
}

/// True while `node` is still reachable from the document root.
fn is_attached(node: &Handle) -> bool {
    let mut current = parent_of(node);
    while let Some(parent) = current {
        if matches!(parent.data, NodeData::Document) {
            return true;
        }
        current = parent_of(&parent);
    }
    false
}

/// Unlink `node` from its parent. Returns false if it was already detached.
fn detach(node: &Handle) -> bool {
    let Some(parent) = node.parent.take().and_then(|weak| weak.upgrade()) else {
        return false;
    };
    parent
        .children
        .borrow_mut()
        .retain(|child| !Rc::ptr_eq(child, node));
    true
}

fn has_visible_text(node: &Handle) -> bool {
    match &node.data {
        NodeData::Text { contents } => !contents.borrow().trim().is_empty(),
        NodeData::Element { .. } if matches!(element_name(node), Some("svg" | "path")) => false,
        NodeData::Element { .. } | NodeData::Document => {
            node.children.borrow().iter().any(has_visible_text)
        }
        _ => false,
    }
}
