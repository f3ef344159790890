//! # Daybook Markdown
//!
//! Converts note text between Markdown and a structured document tree.
//!
//! ```text
//!  Markdown ──► lexer (lines) ──► parser ──► Document ──► serializer ──► Markdown
//!                 │                  ▲
//!                 └── tokenizer ─────┘  (inline runs, logos)
//! ```
//!
//! Parsing never fails. Anything malformed degrades to literal text or a
//! flattened structure and is reported through `parse_with_diagnostics`.
//! Serialization is canonical, so for any input `m`:
//!
//! ```
//! use daybook_markdown::{parse, serialize};
//!
//! let m = "# Day\n\n* one\n* two\n\n__done__";
//! let once = serialize(&parse(m));
//! assert_eq!(serialize(&parse(&once)), once);
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod serializer;
pub mod tokenizer;

#[cfg(test)]
mod tests_roundtrip;

pub use ast::{inline_text, Block, Document, Inline, ListItem, TaskItem};
pub use error::{ParseAnomalies, ParseAnomaly};
pub use parser::{parse, parse_with_diagnostics, ParseOutput, Parser};
pub use serializer::{serialize, Serializer};
pub use tokenizer::{tokenize, Token};
