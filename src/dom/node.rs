//! XML Node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references.
//!
//! Namespace and attribute nodes live in the same arena as everything else,
//! directly after their element: `[element, ns.., attrs.., children..]`.
//! IDs are therefore assigned in XPath document order.

use crate::index::LineInfo;

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// Type of XML node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Namespace,
    Text,
    CData,
    Comment,
    ProcessingInstruction,
}

impl NodeKind {
    /// Lowercase name used in logs and at the NIF boundary
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Element => "element",
            NodeKind::Attribute => "attribute",
            NodeKind::Namespace => "namespace",
            NodeKind::Text => "text",
            NodeKind::CData => "cdata",
            NodeKind::Comment => "comment",
            NodeKind::ProcessingInstruction => "processing_instruction",
        }
    }
}

/// An XML node in the arena
#[derive(Debug, Clone)]
pub struct XmlNode {
    pub kind: NodeKind,
    /// Parent node. For attribute and namespace nodes, the owning element.
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    /// Qualified name (elements, attributes), prefix (namespace nodes),
    /// target (PIs)
    pub name_id: u32,
    /// Part of the name after the colon
    pub local_name_id: u32,
    /// Namespace URI of elements and attributes, 0 when none
    pub namespace_id: u32,
    /// Text/comment/CDATA content, attribute value, PI data, namespace URI
    pub value_id: u32,
    /// Number of namespace nodes following an element
    pub ns_count: u32,
    /// Number of attribute nodes following the namespace nodes
    pub attr_count: u32,
    /// Where the node starts in the source; None for document and
    /// namespace nodes
    pub line_info: Option<LineInfo>,
}

impl XmlNode {
    fn with_kind(kind: NodeKind, parent: Option<NodeId>) -> Self {
        XmlNode {
            kind,
            parent,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id: 0,
            local_name_id: 0,
            namespace_id: 0,
            value_id: 0,
            ns_count: 0,
            attr_count: 0,
            line_info: None,
        }
    }

    pub fn document() -> Self {
        Self::with_kind(NodeKind::Document, None)
    }

    pub fn element(name_id: u32, local_name_id: u32, namespace_id: u32, parent: NodeId) -> Self {
        XmlNode {
            name_id,
            local_name_id,
            namespace_id,
            ..Self::with_kind(NodeKind::Element, Some(parent))
        }
    }

    pub fn attribute(
        name_id: u32,
        local_name_id: u32,
        namespace_id: u32,
        value_id: u32,
        owner: NodeId,
    ) -> Self {
        XmlNode {
            name_id,
            local_name_id,
            namespace_id,
            value_id,
            ..Self::with_kind(NodeKind::Attribute, Some(owner))
        }
    }

    pub fn namespace(prefix_id: u32, uri_id: u32, owner: NodeId) -> Self {
        XmlNode {
            name_id: prefix_id,
            local_name_id: prefix_id,
            value_id: uri_id,
            ..Self::with_kind(NodeKind::Namespace, Some(owner))
        }
    }

    /// Text, CDATA or comment node holding `value_id`
    pub fn character_data(kind: NodeKind, value_id: u32, parent: NodeId) -> Self {
        XmlNode {
            value_id,
            ..Self::with_kind(kind, Some(parent))
        }
    }

    pub fn processing_instruction(target_id: u32, data_id: u32, parent: NodeId) -> Self {
        XmlNode {
            name_id: target_id,
            local_name_id: target_id,
            value_id: data_id,
            ..Self::with_kind(NodeKind::ProcessingInstruction, Some(parent))
        }
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Attribute and namespace nodes hang off an element without being
    /// its children
    #[inline]
    pub fn is_child_kind(&self) -> bool {
        !matches!(self.kind, NodeKind::Attribute | NodeKind::Namespace | NodeKind::Document)
    }

    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_creation() {
        let doc = XmlNode::document();
        assert_eq!(doc.kind, NodeKind::Document);
        assert!(doc.parent.is_none());
        assert!(!doc.is_child_kind());
    }

    #[test]
    fn test_element_node() {
        let elem = XmlNode::element(1, 2, 0, 0);
        assert_eq!(elem.kind, NodeKind::Element);
        assert_eq!(elem.parent, Some(0));
        assert_eq!(elem.name_id, 1);
        assert!(elem.is_element());
    }

    #[test]
    fn test_namespace_node_name_is_prefix() {
        let ns = XmlNode::namespace(3, 4, 1);
        assert_eq!(ns.name_id, 3);
        assert_eq!(ns.value_id, 4);
        assert!(!ns.is_child_kind());
    }
}
