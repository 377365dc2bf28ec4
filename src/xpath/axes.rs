//! XPath Axes Implementation
//!
//! All 13 XPath 1.0 axes. Forward axes return nodes in document order,
//! reverse axes nearest-first, so a predicate position is simply the index
//! in the returned vector plus one.
//!
//! The arena stores every subtree contiguously in document order, which
//! turns `following` and `preceding` into ID range scans.

use super::parser::{Axis, NodeTest};
use crate::dom::{DocumentAccess, NodeId, NodeKind};

/// Navigate along an axis from a context node
pub fn navigate<D: DocumentAccess>(doc: &D, context: NodeId, axis: Axis) -> Vec<NodeId> {
    match axis {
        Axis::Child => doc.children_vec(context),
        Axis::Descendant => doc.descendants_vec(context),
        Axis::DescendantOrSelf => {
            let descendants = doc.descendants_vec(context);
            let mut result = Vec::with_capacity(1 + descendants.len());
            result.push(context);
            result.extend(descendants);
            result
        }
        Axis::Parent => doc.parent_of(context).into_iter().collect(),
        Axis::Ancestor => ancestor_axis(doc, context),
        Axis::AncestorOrSelf => {
            let mut result = vec![context];
            result.extend(ancestor_axis(doc, context));
            result
        }
        Axis::FollowingSibling => sibling_axis(doc, context, |d, n| d.next_sibling_of(n)),
        Axis::PrecedingSibling => sibling_axis(doc, context, |d, n| d.prev_sibling_of(n)),
        Axis::Following => following_axis(doc, context),
        Axis::Preceding => preceding_axis(doc, context),
        Axis::Self_ => vec![context],
        Axis::Attribute => doc.attribute_ids(context).collect(),
        Axis::Namespace => doc.namespace_ids(context).collect(),
    }
}

fn ancestor_axis<D: DocumentAccess>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut current = context;
    while let Some(parent) = doc.parent_of(current) {
        result.push(parent);
        current = parent;
    }
    result
}

/// Attribute and namespace nodes have no siblings
fn sibling_axis<D: DocumentAccess>(
    doc: &D,
    context: NodeId,
    step: impl Fn(&D, NodeId) -> Option<NodeId>,
) -> Vec<NodeId> {
    let mut result = Vec::new();
    if !is_tree_node(doc, context) {
        return result;
    }
    let mut sibling = step(doc, context);
    while let Some(id) = sibling {
        result.push(id);
        sibling = step(doc, id);
    }
    result
}

/// Everything after the context node's subtree, minus attribute and
/// namespace nodes. For an attribute or namespace node, that includes its
/// owner's descendants.
fn following_axis<D: DocumentAccess>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let start = if is_tree_node(doc, context) {
        let subtree_last = doc.descendants_vec(context).last().copied().unwrap_or(context);
        subtree_last + 1
    } else {
        context + 1
    };
    let end = doc.node_count() as NodeId;
    (start..end).filter(|&id| is_tree_node(doc, id)).collect()
}

/// Everything before the context node except its ancestors, nearest first
fn preceding_axis<D: DocumentAccess>(doc: &D, context: NodeId) -> Vec<NodeId> {
    let ancestors = ancestor_axis(doc, context);
    (1..context)
        .rev()
        .filter(|&id| is_tree_node(doc, id) && !ancestors.contains(&id))
        .collect()
}

fn is_tree_node<D: DocumentAccess>(doc: &D, id: NodeId) -> bool {
    doc.get_node(id).is_some_and(|n| n.is_child_kind())
}

/// Check a node against a step's node test.
///
/// `resolve` maps a prefix to its namespace URI; callers make sure every
/// prefix in the expression resolves before evaluation starts.
pub fn matches_node_test<D: DocumentAccess>(
    doc: &D,
    node: NodeId,
    axis: Axis,
    test: &NodeTest,
    resolve: &dyn Fn(&str) -> Option<String>,
) -> bool {
    let Some(kind) = doc.node_kind_of(node) else {
        return false;
    };
    let principal = match axis {
        Axis::Attribute => NodeKind::Attribute,
        Axis::Namespace => NodeKind::Namespace,
        _ => NodeKind::Element,
    };

    match test {
        NodeTest::Node => true,
        NodeTest::Text => matches!(kind, NodeKind::Text | NodeKind::CData),
        NodeTest::Comment => kind == NodeKind::Comment,
        NodeTest::ProcessingInstruction(target) => {
            kind == NodeKind::ProcessingInstruction
                && target.as_deref().map_or(true, |t| doc.node_name(node) == t)
        }
        NodeTest::Any => kind == principal,
        NodeTest::Name(name) => {
            kind == principal
                && doc.node_local_name(node) == name
                && doc.node_namespace(node).is_empty()
        }
        NodeTest::QName(prefix, local) => {
            kind == principal
                && doc.node_local_name(node) == local
                && resolve(prefix).is_some_and(|uri| doc.node_namespace(node) == uri)
        }
        NodeTest::NamespaceWildcard(prefix) => {
            kind == principal && resolve(prefix).is_some_and(|uri| doc.node_namespace(node) == uri)
        }
    }
}
