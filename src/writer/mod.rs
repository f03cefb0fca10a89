//! Writers: render a transformed document tree.
//!
//! | Writer | Output |
//! |--------|--------|
//! | [`markdown`] | Markdown with `[^n]` markers and a trailing definition list |
//! | [`json`] | Pandoc JSON AST, for use as a Pandoc filter |

pub mod json;
pub mod markdown;
