//! DOM Module - Arena-based XML Document
//!
//! Implements an efficient DOM representation using:
//! - Arena allocation for nodes
//! - NodeId (u32) indices for cache-friendly traversal
//! - String interning for names and values
//! - Namespace resolution stack
//! - Line/column positions for every node with a start in the source

pub mod document;
pub mod namespace;
pub mod node;
pub mod strings;
pub mod writer;

pub use document::{DocType, ParseOptions, XmlDocument};
pub use node::{NodeId, NodeKind, XmlNode};
pub use strings::StringPool;

use std::ops::Range;

/// Read access to a parsed document.
///
/// XPath evaluation and span resolution only go through this trait.
pub trait DocumentAccess {
    /// The document node is always the first arena slot
    fn document_node_id(&self) -> NodeId {
        0
    }

    fn root_element_id(&self) -> Option<NodeId>;

    fn get_node(&self, id: NodeId) -> Option<&XmlNode>;

    /// Qualified name; the prefix for namespace nodes, the target for PIs
    fn node_name(&self, id: NodeId) -> &str;

    fn node_local_name(&self, id: NodeId) -> &str;

    /// Namespace URI of an element or attribute ("" when none)
    fn node_namespace(&self, id: NodeId) -> &str;

    /// Stored value: character content, attribute value, PI data or
    /// namespace URI. Empty for elements and the document node.
    fn node_value(&self, id: NodeId) -> &str;

    /// Namespace nodes of an element
    fn namespace_ids(&self, id: NodeId) -> Range<NodeId>;

    /// Attribute nodes of an element
    fn attribute_ids(&self, id: NodeId) -> Range<NodeId>;

    fn children_vec(&self, id: NodeId) -> Vec<NodeId>;

    fn descendants_vec(&self, id: NodeId) -> Vec<NodeId>;

    fn node_count(&self) -> usize;

    /// The DOCTYPE declaration, if the source had one
    fn doctype(&self) -> Option<&document::DocType> {
        None
    }

    #[inline]
    fn node_kind_of(&self, id: NodeId) -> Option<NodeKind> {
        self.get_node(id).map(|n| n.kind)
    }

    #[inline]
    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id).and_then(|n| n.parent)
    }

    #[inline]
    fn next_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id).and_then(|n| n.next_sibling)
    }

    #[inline]
    fn prev_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id).and_then(|n| n.prev_sibling)
    }
}

/// XPath string-value of a node: the concatenated text of all descendant
/// text and CDATA nodes for elements and the document, the stored value
/// for everything else.
pub fn node_string_value<D: DocumentAccess + ?Sized>(doc: &D, id: NodeId) -> String {
    match doc.node_kind_of(id) {
        Some(NodeKind::Element | NodeKind::Document) => {
            let mut out = String::new();
            for d in doc.descendants_vec(id) {
                if matches!(doc.node_kind_of(d), Some(NodeKind::Text | NodeKind::CData)) {
                    out.push_str(doc.node_value(d));
                }
            }
            out
        }
        Some(_) => doc.node_value(id).to_string(),
        None => String::new(),
    }
}
