//! Text Position Module
//!
//! Byte-offset bookkeeping for the raw document text:
//!
//! - `LineIndex`: line number -> offset of the line's first byte, and the
//!   reverse lookup used to stamp line/column info on parsed nodes
//! - `Span`: half-open `[start, end)` byte range
//!
//! Every offset in this crate is a UTF-8 byte offset into the text the
//! collaborator handed in, so spans can slice that text directly.

pub mod line;
pub mod span;

pub use line::{LineIndex, LineInfo};
pub use span::Span;
