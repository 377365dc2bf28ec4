//! Zero-Copy Slice Reader
//!
//! Turns tokens into events over a borrowed `&str`. Names and undecoded
//! content are slices of the input.

use super::events::{CharData, EndElement, StartElement, XmlEvent};
use crate::core::attributes::parse_attributes;
use crate::core::tokenizer::{ParseError, Token, TokenKind, Tokenizer};

/// Zero-copy XML reader
pub struct SliceReader<'a> {
    input: &'a str,
    tokenizer: Tokenizer<'a>,
    error: Option<ParseError>,
}

impl<'a> SliceReader<'a> {
    pub fn new(input: &'a str) -> Self {
        SliceReader {
            input,
            tokenizer: Tokenizer::new(input),
            error: None,
        }
    }

    /// The error that stopped the reader, if any
    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    /// Get the next XML event
    pub fn next_event(&mut self) -> Result<XmlEvent<'a>, ParseError> {
        let token = self.tokenizer.next_token()?;
        let offset = token.anchor;

        let event = match token.kind {
            TokenKind::Eof => XmlEvent::EndDocument,
            TokenKind::StartTag => XmlEvent::StartElement(Self::start_element(token)?),
            TokenKind::EmptyTag => XmlEvent::EmptyElement(Self::start_element(token)?),
            TokenKind::EndTag => XmlEvent::EndElement(EndElement {
                name: token.name.unwrap_or_default(),
                offset,
            }),
            TokenKind::Text => XmlEvent::Text(CharData {
                content: token.content.unwrap_or_default(),
                offset,
            }),
            TokenKind::CData => XmlEvent::CData(CharData {
                content: token.content.unwrap_or_default(),
                offset,
            }),
            TokenKind::Comment => XmlEvent::Comment(CharData {
                content: token.content.unwrap_or_default(),
                offset,
            }),
            TokenKind::ProcessingInstruction => {
                let data = match token.content {
                    Some(std::borrow::Cow::Borrowed(data)) => data,
                    _ => "",
                };
                XmlEvent::ProcessingInstruction {
                    target: token.name.unwrap_or_default(),
                    data,
                    offset,
                }
            }
            TokenKind::XmlDeclaration => XmlEvent::XmlDeclaration,
            TokenKind::DocType => {
                let (start, end) = token.span;
                XmlEvent::DocType(self.input.get(start..end).unwrap_or_default())
            }
        };
        Ok(event)
    }

    fn start_element(token: Token<'a>) -> Result<StartElement<'a>, ParseError> {
        let attributes = match token.attributes {
            Some((raw, base)) => parse_attributes(raw, base)?,
            None => Vec::new(),
        };
        Ok(StartElement::new(token.name.unwrap_or_default(), attributes, token.anchor))
    }
}

/// Stops at the end of the document or at the first error, which is then
/// available from [`SliceReader::error`].
impl<'a> Iterator for SliceReader<'a> {
    type Item = XmlEvent<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.error.is_some() {
            return None;
        }
        match self.next_event() {
            Ok(XmlEvent::EndDocument) => None,
            Ok(event) => Some(event),
            Err(err) => {
                self.error = Some(err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_element() {
        let events: Vec<_> = SliceReader::new("<root>hello</root>").collect();
        assert_eq!(events.len(), 3);

        assert!(matches!(&events[0], XmlEvent::StartElement(e) if e.name == "root" && e.offset == 1));
        assert!(matches!(&events[1], XmlEvent::Text(t) if t.content == "hello" && t.offset == 6));
        assert!(matches!(&events[2], XmlEvent::EndElement(e) if e.name == "root"));
    }

    #[test]
    fn test_empty_element() {
        let events: Vec<_> = SliceReader::new("<br/>").collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], XmlEvent::EmptyElement(e) if e.name == "br"));
    }

    #[test]
    fn test_attributes() {
        let events: Vec<_> = SliceReader::new(r#"<div id="main" class="container"/>"#).collect();
        let XmlEvent::EmptyElement(e) = &events[0] else {
            panic!("Expected EmptyElement");
        };
        assert_eq!(e.get_attribute_value("id"), Some("main"));
        assert_eq!(e.attributes[1].offset, 15);
    }

    #[test]
    fn test_cdata() {
        let events: Vec<_> = SliceReader::new("<script><![CDATA[alert('hi')]]></script>").collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1].as_text(), Some("alert('hi')"));
    }

    #[test]
    fn test_processing_instruction() {
        let events: Vec<_> = SliceReader::new("<r><?pi some data?></r>").collect();
        assert!(matches!(
            &events[1],
            XmlEvent::ProcessingInstruction { target: "pi", data: "some data", offset: 5 }
        ));
    }

    #[test]
    fn test_error_is_kept() {
        let mut reader = SliceReader::new(r#"<a x="1" x="2"/>"#);
        assert!(reader.next().is_none());
        assert_eq!(
            reader.error().map(|e| e.message.as_str()),
            Some("Duplicate attribute 'x'")
        );
    }
}
