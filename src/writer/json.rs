//! Pandoc JSON AST writer.
//!
//! In JSON the footnotes stay inline as `Note` nodes; Pandoc numbers them
//! itself when it renders the final format.

use crate::ast::Pandoc;
use crate::error::Html2MdError;

pub fn write_json(doc: &Pandoc) -> Result<String, Html2MdError> {
    Ok(serde_json::to_string(doc)?)
}

/// Pretty-printed variant, used by the CLI when writing to a terminal.
pub fn write_json_pretty(doc: &Pandoc) -> Result<String, Html2MdError> {
    Ok(serde_json::to_string_pretty(doc)?)
}
