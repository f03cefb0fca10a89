//! Readers: build a [`Pandoc`](crate::ast::Pandoc) tree from an input format.
//!
//! | Reader | Input |
//! |--------|-------|
//! | [`html`] | HTML page, parsed with html5ever |
//! | [`json`] | Pandoc JSON AST (`pandoc -t json`) |

pub mod html;
pub mod json;
