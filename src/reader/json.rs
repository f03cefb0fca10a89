//! Pandoc JSON AST reader.

use crate::ast::{Pandoc, PANDOC_API_VERSION};
use crate::error::Html2MdError;
use tracing::{debug, warn};

/// Decode a Pandoc JSON document.
///
/// Documents written by a Pandoc with a different major API version are
/// still accepted; the mismatch is logged since unknown node kinds will fail
/// to decode anyway.
pub fn read_json(text: &str) -> Result<Pandoc, Html2MdError> {
    let doc: Pandoc = serde_json::from_str(text)?;
    if doc.api_version.first() != PANDOC_API_VERSION.first()
        || doc.api_version.get(1) != PANDOC_API_VERSION.get(1)
    {
        warn!(
            found = ?doc.api_version,
            expected = ?PANDOC_API_VERSION,
            "Pandoc API version differs"
        );
    }
    debug!(blocks = doc.blocks.len(), "JSON AST read");
    Ok(doc)
}
