//! XML Document - Arena-based DOM representation
//!
//! Efficient DOM storage with:
//! - Arena allocation for nodes, in document order
//! - NodeId indices for traversal
//! - String interning for names and values
//! - A 1-based line/column position on every node that has a start in the
//!   source text
//!
//! Parsing is strict: the first well-formedness or namespace error aborts
//! with an `XmlError` pointing at the offending line and column.

use super::namespace::NamespaceResolver;
use super::node::{NodeId, NodeKind, XmlNode};
use super::strings::StringPool;
use super::DocumentAccess;
use crate::core::attributes::split_name;
use crate::core::scanner::is_whitespace;
use crate::error::XmlError;
use crate::index::LineIndex;
use crate::reader::events::{StartElement, XmlEvent};
use crate::reader::slice::SliceReader;
use std::ops::Range;

/// Options controlling how text is turned into a tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Keep whitespace-only text nodes inside elements. Off by default, so
    /// indentation does not show up as text nodes or as element siblings.
    pub preserve_whitespace: bool,
}

/// A DOCTYPE declaration, kept verbatim so a rewrite can put it back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocType {
    /// `<!DOCTYPE` through the closing `>`
    pub markup: String,
    /// Number of document-level nodes written before it
    pub position: usize,
}

/// A parsed XML document
#[derive(Debug)]
pub struct XmlDocument {
    nodes: Vec<XmlNode>,
    strings: StringPool,
    root_element: Option<NodeId>,
    doctype: Option<DocType>,
}

impl XmlDocument {
    /// Parse a document, building a throwaway line index for positions
    pub fn parse(text: &str, options: &ParseOptions) -> Result<Self, XmlError> {
        let index = LineIndex::build(text);
        Self::parse_with_index(text, &index, options)
    }

    /// Parse a document using an index already built for `text`
    pub fn parse_with_index(
        text: &str,
        index: &LineIndex,
        options: &ParseOptions,
    ) -> Result<Self, XmlError> {
        let mut builder = Builder::new(text, index, options);
        builder.run()?;
        Ok(builder.doc)
    }

    /// The document node, parent of the root element
    #[inline]
    pub fn document_node(&self) -> &XmlNode {
        &self.nodes[0]
    }

    #[inline]
    pub fn root_element_id(&self) -> Option<NodeId> {
        self.root_element
    }

    #[inline]
    pub fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    #[inline]
    pub fn strings(&self) -> &StringPool {
        &self.strings
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterate over child nodes (not attributes or namespace nodes)
    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        ChildIter {
            doc: self,
            next: self.get_node(id).and_then(|n| n.first_child),
        }
    }

    /// Iterate over descendants in document order
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let end = self.subtree_end(id);
        (id + 1..end).filter(move |&n| self.nodes[n as usize].is_child_kind())
    }

    /// One past the last arena slot belonging to the subtree of `id`.
    ///
    /// The arena is in document order, so a subtree is a contiguous range
    /// that ends where the next node outside it begins.
    fn subtree_end(&self, id: NodeId) -> NodeId {
        let mut current = id;
        loop {
            let Some(node) = self.get_node(current) else {
                return self.nodes.len() as NodeId;
            };
            if node.is_child_kind() {
                if let Some(next) = node.next_sibling {
                    return next;
                }
            }
            match node.parent {
                Some(parent) if node.is_child_kind() => current = parent,
                // attribute and namespace nodes own nothing
                Some(_) => return id + 1,
                None => return self.nodes.len() as NodeId,
            }
        }
    }

    /// Look up an attribute value on an element by qualified name
    pub fn get_attribute(&self, element: NodeId, name: &str) -> Option<&str> {
        self.attribute_ids(element)
            .find(|&a| self.strings.get(self.nodes[a as usize].name_id) == name)
            .map(|a| self.strings.get(self.nodes[a as usize].value_id))
    }

    fn push(&mut self, node: XmlNode) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        id
    }

    /// Append `node` as the last child of `parent`
    fn append_child(&mut self, parent: NodeId, node: XmlNode) -> NodeId {
        let id = self.push(node);
        let prev = self.nodes[parent as usize].last_child;
        if let Some(prev) = prev {
            self.nodes[prev as usize].next_sibling = Some(id);
            self.nodes[id as usize].prev_sibling = Some(prev);
        } else {
            self.nodes[parent as usize].first_child = Some(id);
        }
        self.nodes[parent as usize].last_child = Some(id);
        id
    }
}

/// Iterator over an element's children
pub struct ChildIter<'d> {
    doc: &'d XmlDocument,
    next: Option<NodeId>,
}

impl<'d> Iterator for ChildIter<'d> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.get_node(current).and_then(|n| n.next_sibling);
        Some(current)
    }
}

// =============================================================================
// Tree builder
// =============================================================================

struct Builder<'t> {
    text: &'t str,
    index: &'t LineIndex,
    options: &'t ParseOptions,
    doc: XmlDocument,
    resolver: NamespaceResolver,
    /// Open elements with the name their end tag must repeat
    open: Vec<(NodeId, &'t str)>,
}

impl<'t> Builder<'t> {
    fn new(text: &'t str, index: &'t LineIndex, options: &'t ParseOptions) -> Self {
        let mut strings = StringPool::new();
        let resolver = NamespaceResolver::new(&mut strings);
        Builder {
            text,
            index,
            options,
            doc: XmlDocument {
                nodes: vec![XmlNode::document()],
                strings,
                root_element: None,
                doctype: None,
            },
            resolver,
            open: Vec::new(),
        }
    }

    fn error(&self, message: impl Into<String>, position: usize) -> XmlError {
        let at = self.index.locate(position);
        XmlError {
            message: message.into(),
            line: at.line,
            column: at.column,
        }
    }

    fn parent(&self) -> NodeId {
        self.open.last().map_or(0, |&(id, _)| id)
    }

    fn run(&mut self) -> Result<(), XmlError> {
        let mut reader = SliceReader::new(self.text);

        loop {
            let event = reader
                .next_event()
                .map_err(|e| self.error(e.message, e.position))?;

            match event {
                XmlEvent::EndDocument => break,
                XmlEvent::StartElement(elem) => {
                    let id = self.open_element(&elem)?;
                    self.open.push((id, elem.name));
                }
                XmlEvent::EmptyElement(elem) => {
                    self.open_element(&elem)?;
                    self.resolver.pop_scope();
                }
                XmlEvent::EndElement(end) => match self.open.pop() {
                    Some((_, name)) if name == end.name => self.resolver.pop_scope(),
                    Some((_, name)) => {
                        return Err(self.error(
                            format!(
                                "The '{}' start tag does not match the end tag of '{}'.",
                                name, end.name
                            ),
                            end.offset,
                        ))
                    }
                    None => return Err(self.error("Unexpected end tag.", end.offset)),
                },
                XmlEvent::Text(text) => {
                    let blank = text.content.bytes().all(is_whitespace);
                    if self.open.is_empty() {
                        if !blank {
                            return Err(self.error("Data at the root level is invalid.", text.offset));
                        }
                    } else if !blank || self.options.preserve_whitespace {
                        self.character_data(NodeKind::Text, &text.content, text.offset);
                    }
                }
                XmlEvent::CData(cdata) => {
                    if self.open.is_empty() {
                        return Err(self.error("Data at the root level is invalid.", cdata.offset));
                    }
                    self.character_data(NodeKind::CData, &cdata.content, cdata.offset);
                }
                XmlEvent::Comment(comment) => {
                    self.character_data(NodeKind::Comment, &comment.content, comment.offset);
                }
                XmlEvent::ProcessingInstruction { target, data, offset } => {
                    let target_id = self.doc.strings.intern(target);
                    let data_id = self.doc.strings.intern(data);
                    let mut node = XmlNode::processing_instruction(target_id, data_id, self.parent());
                    node.line_info = Some(self.index.locate(offset));
                    self.doc.append_child(self.parent(), node);
                }
                XmlEvent::DocType(markup) => {
                    let position = self.doc.children_vec(0).len();
                    self.doc.doctype = Some(DocType {
                        markup: markup.to_string(),
                        position,
                    });
                }
                XmlEvent::XmlDeclaration => {}
            }
        }

        if !self.open.is_empty() {
            let names: Vec<&str> = self.open.iter().map(|&(_, name)| name).collect();
            return Err(self.error(
                format!(
                    "Unexpected end of file has occurred. The following elements are not closed: {}.",
                    names.join(", ")
                ),
                self.text.len(),
            ));
        }
        if self.doc.root_element.is_none() {
            return Err(self.error("Root element is missing.", self.text.len()));
        }
        Ok(())
    }

    fn character_data(&mut self, kind: NodeKind, content: &str, offset: usize) {
        let value_id = self.doc.strings.intern(content);
        let parent = self.parent();
        let mut node = XmlNode::character_data(kind, value_id, parent);
        node.line_info = Some(self.index.locate(offset));
        self.doc.append_child(parent, node);
    }

    /// Add an element with its namespace and attribute nodes. Leaves the
    /// element's namespace scope open.
    fn open_element(&mut self, elem: &StartElement<'t>) -> Result<NodeId, XmlError> {
        if self.open.is_empty() && self.doc.root_element.is_some() {
            return Err(self.error("There are multiple root elements.", elem.offset));
        }

        self.resolver.push_scope();
        for attr in elem.attributes.iter().filter(|a| a.is_namespace_decl()) {
            let prefix = attr.declared_prefix().unwrap_or_default();
            if !prefix.is_empty() && attr.value.is_empty() {
                return Err(self.error("Cannot use a prefix with an empty namespace.", attr.offset));
            }
            let prefix_id = self.doc.strings.intern(prefix);
            let uri_id = self.doc.strings.intern(&attr.value);
            self.resolver.declare(prefix_id, uri_id);
        }

        let (prefix, local) = split_name(elem.name);
        let namespace_id = match prefix {
            Some(p) => self.resolve_prefix(p, elem.offset)?,
            None => self.resolver.resolve_default().unwrap_or(0),
        };

        let parent = self.parent();
        let name_id = self.doc.strings.intern(elem.name);
        let local_id = self.doc.strings.intern(local);
        let mut node = XmlNode::element(name_id, local_id, namespace_id, parent);
        node.line_info = Some(self.index.locate(elem.offset));
        let id = self.doc.append_child(parent, node);
        if parent == 0 {
            self.doc.root_element = Some(id);
        }

        let in_scope = self.resolver.in_scope();
        for &(prefix_id, uri_id) in &in_scope {
            self.doc.push(XmlNode::namespace(prefix_id, uri_id, id));
        }

        let mut attr_count = 0;
        for attr in elem.plain_attributes() {
            let (prefix, local) = split_name(attr.name);
            let namespace_id = match prefix {
                Some(p) => self.resolve_prefix(p, attr.offset)?,
                None => 0,
            };
            let name_id = self.doc.strings.intern(attr.name);
            let local_id = self.doc.strings.intern(local);
            let value_id = self.doc.strings.intern(&attr.value);
            let mut node = XmlNode::attribute(name_id, local_id, namespace_id, value_id, id);
            node.line_info = Some(self.index.locate(attr.offset));
            self.doc.push(node);
            attr_count += 1;
        }

        let element = &mut self.doc.nodes[id as usize];
        element.ns_count = in_scope.len() as u32;
        element.attr_count = attr_count;
        Ok(id)
    }

    fn resolve_prefix(&mut self, prefix: &str, offset: usize) -> Result<u32, XmlError> {
        let prefix_id = self.doc.strings.intern(prefix);
        self.resolver
            .resolve(prefix_id)
            .ok_or_else(|| self.error(format!("'{}' is an undeclared prefix.", prefix), offset))
    }
}

// =============================================================================
// DocumentAccess trait implementation
// =============================================================================

impl DocumentAccess for XmlDocument {
    fn root_element_id(&self) -> Option<NodeId> {
        self.root_element
    }

    fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    fn node_name(&self, id: NodeId) -> &str {
        self.get_node(id).map_or("", |n| self.strings.get(n.name_id))
    }

    fn node_local_name(&self, id: NodeId) -> &str {
        self.get_node(id).map_or("", |n| self.strings.get(n.local_name_id))
    }

    fn node_namespace(&self, id: NodeId) -> &str {
        self.get_node(id).map_or("", |n| self.strings.get(n.namespace_id))
    }

    fn node_value(&self, id: NodeId) -> &str {
        self.get_node(id).map_or("", |n| self.strings.get(n.value_id))
    }

    fn namespace_ids(&self, id: NodeId) -> Range<NodeId> {
        match self.get_node(id) {
            Some(n) if n.is_element() => id + 1..id + 1 + n.ns_count,
            _ => 0..0,
        }
    }

    fn attribute_ids(&self, id: NodeId) -> Range<NodeId> {
        match self.get_node(id) {
            Some(n) if n.is_element() => {
                let start = id + 1 + n.ns_count;
                start..start + n.attr_count
            }
            _ => 0..0,
        }
    }

    fn children_vec(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).collect()
    }

    fn descendants_vec(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id).collect()
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn doctype(&self) -> Option<&DocType> {
        self.doctype.as_ref()
    }
}
