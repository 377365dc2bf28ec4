//! Highlighting: from selected nodes to text ranges
//!
//! - `resolver`: node -> span in the source text
//! - `matches`: the resolved spans and a wraparound cursor

pub mod matches;
pub mod resolver;

pub use matches::MatchSet;
pub use resolver::{resolve_span, resolve_spans, select_nodes, SelectedNode};
