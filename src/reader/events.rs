//! XML Event Types
//!
//! Event types for pull-parser style XML processing. Every event carries the
//! byte offset its node reports a line/column position for.

use crate::core::attributes::{split_name, Attribute};
use std::borrow::Cow;

/// XML parsing event
#[derive(Debug, Clone)]
pub enum XmlEvent<'a> {
    /// `<name attrs...>`
    StartElement(StartElement<'a>),
    /// `</name>`
    EndElement(EndElement<'a>),
    /// `<name attrs.../>`
    EmptyElement(StartElement<'a>),
    Text(CharData<'a>),
    CData(CharData<'a>),
    Comment(CharData<'a>),
    /// `<?target data?>`
    ProcessingInstruction {
        target: &'a str,
        data: &'a str,
        offset: usize,
    },
    XmlDeclaration,
    /// `<!DOCTYPE ...>` as written, internal subset included
    DocType(&'a str),
    EndDocument,
}

/// Start element event data
#[derive(Debug, Clone)]
pub struct StartElement<'a> {
    /// Qualified name as written
    pub name: &'a str,
    /// Attributes and namespace declarations, in source order
    pub attributes: Vec<Attribute<'a>>,
    /// Offset of the first byte of the name
    pub offset: usize,
}

impl<'a> StartElement<'a> {
    pub fn new(name: &'a str, attributes: Vec<Attribute<'a>>, offset: usize) -> Self {
        StartElement {
            name,
            attributes,
            offset,
        }
    }

    pub fn prefix(&self) -> Option<&'a str> {
        split_name(self.name).0
    }

    pub fn local_name(&self) -> &'a str {
        split_name(self.name).1
    }

    /// `xmlns` / `xmlns:p` declarations as (prefix, uri) pairs
    pub fn namespace_decls(&self) -> impl Iterator<Item = (&'a str, &str)> + '_ {
        self.attributes
            .iter()
            .filter_map(|a| a.declared_prefix().map(|p| (p, a.value.as_ref())))
    }

    /// Attributes that are not namespace declarations
    pub fn plain_attributes(&self) -> impl Iterator<Item = &Attribute<'a>> {
        self.attributes.iter().filter(|a| !a.is_namespace_decl())
    }

    pub fn get_attribute_value(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_ref())
    }
}

/// End element event data
#[derive(Debug, Clone)]
pub struct EndElement<'a> {
    pub name: &'a str,
    pub offset: usize,
}

/// Character content (text, CDATA or comment) with its anchor offset
#[derive(Debug, Clone)]
pub struct CharData<'a> {
    pub content: Cow<'a, str>,
    pub offset: usize,
}

impl<'a> XmlEvent<'a> {
    pub fn is_start_element(&self) -> bool {
        matches!(self, XmlEvent::StartElement(_) | XmlEvent::EmptyElement(_))
    }

    pub fn as_start_element(&self) -> Option<&StartElement<'a>> {
        match self {
            XmlEvent::StartElement(e) | XmlEvent::EmptyElement(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            XmlEvent::Text(t) | XmlEvent::CData(t) => Some(t.content.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::attributes::parse_attributes;

    #[test]
    fn test_start_element() {
        let elem = StartElement::new("div", vec![], 1);
        assert_eq!(elem.local_name(), "div");
        assert!(elem.prefix().is_none());
    }

    #[test]
    fn test_namespaced_element() {
        let elem = StartElement::new("svg:rect", vec![], 1);
        assert_eq!(elem.local_name(), "rect");
        assert_eq!(elem.prefix(), Some("svg"));
    }

    #[test]
    fn test_declarations_split_from_attributes() {
        let attrs = parse_attributes(r#" xmlns:a="urn:a" id="7""#, 2).unwrap();
        let elem = StartElement::new("r", attrs, 1);
        let decls: Vec<_> = elem.namespace_decls().collect();
        assert_eq!(decls, vec![("a", "urn:a")]);
        let plain: Vec<_> = elem.plain_attributes().map(|a| a.name).collect();
        assert_eq!(plain, vec!["id"]);
        assert_eq!(elem.get_attribute_value("id"), Some("7"));
    }
}
