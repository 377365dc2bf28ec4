//! XML Writer
//!
//! Re-serializes a parsed document with indentation. Used to reformat the
//! text buffer and to produce a namespace-free copy of it.
//!
//! Indentation follows the usual writer rules: every element starts on its
//! own line, except inside mixed content (an element with a text or CDATA
//! child), where children are written exactly as they come.

use super::{DocumentAccess, NodeId, NodeKind};
use crate::core::entities::{escape_attribute, escape_text};

/// Serialization settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// One level of indentation
    pub indent: String,
    pub omit_declaration: bool,
    /// Write local names only and drop every namespace declaration
    pub strip_namespaces: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            indent: "  ".to_string(),
            omit_declaration: false,
            strip_namespaces: false,
        }
    }
}

const DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

/// Serialize the whole document
pub fn write_document<D: DocumentAccess + ?Sized>(doc: &D, options: &WriteOptions) -> String {
    let mut writer = Writer {
        doc,
        options,
        out: String::new(),
    };
    if !options.omit_declaration {
        writer.out.push_str(DECLARATION);
    }
    let children = doc.children_vec(doc.document_node_id());
    for (position, child) in children.into_iter().enumerate() {
        if let Some(doctype) = doc.doctype().filter(|d| d.position == position) {
            writer.top_level_break();
            writer.out.push_str(&doctype.markup);
        }
        writer.top_level_break();
        writer.node(child, 0, true);
    }
    writer.out
}

struct Writer<'a, D: ?Sized> {
    doc: &'a D,
    options: &'a WriteOptions,
    out: String,
}

impl<'a, D: DocumentAccess + ?Sized> Writer<'a, D> {
    fn top_level_break(&mut self) {
        if !self.out.is_empty() {
            self.newline(0);
        }
    }

    fn newline(&mut self, depth: usize) {
        self.out.push('\n');
        for _ in 0..depth {
            self.out.push_str(&self.options.indent);
        }
    }

    fn node(&mut self, id: NodeId, depth: usize, indent: bool) {
        let doc = self.doc;
        match doc.node_kind_of(id) {
            Some(NodeKind::Element) => self.element(id, depth, indent),
            Some(NodeKind::Text) => self.out.push_str(&escape_text(doc.node_value(id))),
            Some(NodeKind::CData) => {
                self.out.push_str("<![CDATA[");
                self.out.push_str(doc.node_value(id));
                self.out.push_str("]]>");
            }
            Some(NodeKind::Comment) => {
                self.out.push_str("<!--");
                self.out.push_str(doc.node_value(id));
                self.out.push_str("-->");
            }
            Some(NodeKind::ProcessingInstruction) => {
                self.out.push_str("<?");
                self.out.push_str(doc.node_name(id));
                let data = doc.node_value(id);
                if !data.is_empty() {
                    self.out.push(' ');
                    self.out.push_str(data);
                }
                self.out.push_str("?>");
            }
            _ => {}
        }
    }

    fn element(&mut self, id: NodeId, depth: usize, indent: bool) {
        let doc = self.doc;
        let strip = self.options.strip_namespaces;
        let name = if strip { doc.node_local_name(id) } else { doc.node_name(id) };

        self.out.push('<');
        self.out.push_str(name);

        if !strip {
            for (prefix, uri) in declarations(doc, id) {
                self.out.push_str(" xmlns");
                if !prefix.is_empty() {
                    self.out.push(':');
                    self.out.push_str(prefix);
                }
                self.attribute_value(uri);
            }
        }

        let mut written: Vec<&str> = Vec::new();
        for attr in doc.attribute_ids(id) {
            let attr_name = if strip { doc.node_local_name(attr) } else { doc.node_name(attr) };
            // a stripped `p:a` can collide with a plain `a`; first one wins
            if strip && written.contains(&attr_name) {
                continue;
            }
            written.push(attr_name);
            self.out.push(' ');
            self.out.push_str(attr_name);
            self.attribute_value(doc.node_value(attr));
        }

        let children = doc.children_vec(id);
        if children.is_empty() {
            self.out.push_str(" />");
            return;
        }
        self.out.push('>');

        let mixed = children
            .iter()
            .any(|&c| matches!(doc.node_kind_of(c), Some(NodeKind::Text | NodeKind::CData)));
        let indent_children = indent && !mixed;

        for &child in &children {
            if indent_children {
                self.newline(depth + 1);
            }
            self.node(child, depth + 1, indent_children);
        }
        if indent_children {
            self.newline(depth);
        }

        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push('>');
    }

    fn attribute_value(&mut self, value: &str) {
        self.out.push_str("=\"");
        self.out.push_str(&escape_attribute(value));
        self.out.push('"');
    }
}

/// Namespace bindings an element has to declare so that its in-scope
/// namespaces match the parsed tree: everything its parent does not
/// already have, plus `xmlns=""` when it drops an inherited default.
fn declarations<D: DocumentAccess + ?Sized>(doc: &D, id: NodeId) -> Vec<(&str, &str)> {
    let inherited: Vec<(&str, &str)> = match doc.parent_of(id) {
        Some(parent) => doc
            .namespace_ids(parent)
            .map(|n| (doc.node_name(n), doc.node_value(n)))
            .collect(),
        None => Vec::new(),
    };

    let own: Vec<(&str, &str)> = doc
        .namespace_ids(id)
        .map(|n| (doc.node_name(n), doc.node_value(n)))
        .filter(|&(prefix, _)| prefix != "xml")
        .collect();

    let mut out: Vec<(&str, &str)> = own
        .iter()
        .copied()
        .filter(|binding| !inherited.contains(binding))
        .collect();

    let had_default = inherited.iter().any(|&(p, _)| p.is_empty());
    let has_default = own.iter().any(|&(p, _)| p.is_empty());
    if had_default && !has_default {
        out.push(("", ""));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ParseOptions, XmlDocument};
    use pretty_assertions::assert_eq;

    fn reformat(text: &str, options: &WriteOptions) -> String {
        let doc = XmlDocument::parse(text, &ParseOptions::default()).unwrap();
        write_document(&doc, options)
    }

    fn bare() -> WriteOptions {
        WriteOptions {
            omit_declaration: true,
            ..WriteOptions::default()
        }
    }

    #[test]
    fn test_indents_element_content() {
        let out = reformat("<r><a><b>x</b></a><c/></r>", &bare());
        assert_eq!(out, "<r>\n  <a>\n    <b>x</b>\n  </a>\n  <c />\n</r>");
    }

    #[test]
    fn test_declaration_and_top_level_comment() {
        let out = reformat("<!--top--><r/>", &WriteOptions::default());
        assert_eq!(out, "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!--top-->\n<r />");
    }

    #[test]
    fn test_mixed_content_written_inline() {
        let out = reformat("<r><p>one <b>two</b> three</p></r>", &bare());
        assert_eq!(out, "<r>\n  <p>one <b>two</b> three</p>\n</r>");
    }

    #[test]
    fn test_escaping() {
        let out = reformat(r#"<r a="x &quot;y&quot; &lt;">1 &lt; 2 &amp; 3</r>"#, &bare());
        assert_eq!(out, r#"<r a="x &quot;y&quot; &lt;">1 &lt; 2 &amp; 3</r>"#);
    }

    #[test]
    fn test_namespace_declarations_reproduced() {
        let text = r#"<r xmlns="urn:d" xmlns:p="urn:p"><p:c/><c xmlns=""/></r>"#;
        let out = reformat(text, &bare());
        assert_eq!(
            out,
            "<r xmlns=\"urn:d\" xmlns:p=\"urn:p\">\n  <p:c />\n  <c xmlns=\"\" />\n</r>"
        );
        // the output parses back to the same shape
        assert!(XmlDocument::parse(&out, &ParseOptions::default()).is_ok());
    }

    #[test]
    fn test_strip_namespaces() {
        let text = r#"<r xmlns="urn:d" xmlns:p="urn:p" p:a="1"><p:c a="2"/></r>"#;
        let out = reformat(
            text,
            &WriteOptions {
                strip_namespaces: true,
                ..bare()
            },
        );
        assert_eq!(out, "<r a=\"1\">\n  <c a=\"2\" />\n</r>");
    }

    #[test]
    fn test_strip_drops_colliding_attribute() {
        let text = r#"<r xmlns:p="urn:p" a="1" p:a="2"/>"#;
        let out = reformat(
            text,
            &WriteOptions {
                strip_namespaces: true,
                ..bare()
            },
        );
        assert_eq!(out, "<r a=\"1\" />");
    }

    #[test]
    fn test_cdata_and_pi() {
        let out = reformat("<r><?go now?><![CDATA[<x>]]></r>", &bare());
        assert_eq!(out, "<r><?go now?><![CDATA[<x>]]></r>");
    }

    #[test]
    fn test_doctype_written_back_in_place() {
        let text = "<?xml version=\"1.0\"?>\n<!-- before -->\n<!DOCTYPE r [<!ELEMENT r ANY>]>\n<?pi d?><r/>";
        assert_eq!(
            reformat(text, &WriteOptions::default()),
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!-- before -->\n<!DOCTYPE r [<!ELEMENT r ANY>]>\n<?pi d?>\n<r />"
        );
        assert_eq!(reformat("<!DOCTYPE r><r/>", &bare()), "<!DOCTYPE r>\n<r />");
    }
}
