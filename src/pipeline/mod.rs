//! Pipeline stages around the document transformer.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and skipped through configuration.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ clean ──▶ reader ──▶ transform ──▶ writer ──▶ postprocess ──▶ footnotes ──▶ titles
//! (path/URL) (DOM)    (tree)     (notes)       (md)       (cleanup)       (commas)      (HTTP)
//! ```
//!
//! 1. [`input`]: read a local file, stdin or a URL into text
//! 2. [`clean`]: drop icon markup and text-less `<div>`s from the DOM
//! 3. [`crate::reader`] and [`crate::transform`]: build and rewrite the tree
//! 4. [`postprocess`]: deterministic text cleanup of the written Markdown
//! 5. [`footnotes`]: commas between adjacent markers, titled definitions
//! 6. [`titles`]: concurrent title lookups with retry/backoff; the only
//!    stage besides input download with network I/O
//!
//! Steps 4 and 5 work on text; [`segments`] keeps them out of fenced code
//! blocks and inline code spans.

pub mod clean;
pub mod footnotes;
pub mod input;
pub mod postprocess;
pub mod segments;
pub mod titles;
