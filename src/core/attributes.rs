//! XML Attribute Parsing
//!
//! Parses the attribute list of a start tag, keeping the byte offset of each
//! attribute name so parsed nodes can report where they came from.

use super::entities::decode_attribute;
use super::scanner::{is_name_char, is_name_start_char, is_whitespace};
use super::tokenizer::ParseError;
use memchr::memchr;
use std::borrow::Cow;

/// A parsed attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// Qualified name as written
    pub name: &'a str,
    /// Value with references decoded and whitespace normalized
    pub value: Cow<'a, str>,
    /// Absolute byte offset of the first byte of the name
    pub offset: usize,
}

impl<'a> Attribute<'a> {
    /// Prefix before the colon, if any
    pub fn prefix(&self) -> Option<&'a str> {
        split_name(self.name).0
    }

    /// Name after the colon
    pub fn local_name(&self) -> &'a str {
        split_name(self.name).1
    }

    /// `xmlns` or `xmlns:p`: a namespace declaration, not a real attribute
    pub fn is_namespace_decl(&self) -> bool {
        self.name == "xmlns" || self.name.starts_with("xmlns:")
    }

    /// The prefix a namespace declaration binds ("" for the default)
    pub fn declared_prefix(&self) -> Option<&'a str> {
        if self.name == "xmlns" {
            Some("")
        } else {
            self.name.strip_prefix("xmlns:")
        }
    }
}

/// Split a qualified name at the first colon
#[inline]
pub fn split_name(name: &str) -> (Option<&str>, &str) {
    match memchr(b':', name.as_bytes()) {
        Some(colon) => (Some(&name[..colon]), &name[colon + 1..]),
        None => (None, name),
    }
}

/// Parse attributes from the inside of a tag.
///
/// `input` is the text between the element name and the closing `>` or
/// `/>`, and `base` its absolute offset in the document.
pub fn parse_attributes(input: &str, base: usize) -> Result<Vec<Attribute<'_>>, ParseError> {
    let bytes = input.as_bytes();
    let mut attrs: Vec<Attribute<'_>> = Vec::new();
    let mut pos = 0;

    loop {
        let ws_start = pos;
        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }
        if pos >= bytes.len() || bytes[pos] == b'/' {
            break;
        }
        if pos == ws_start {
            return Err(ParseError::new("Whitespace required between attributes", base + pos));
        }

        let name_start = pos;
        if !is_name_start_char(bytes[pos]) {
            return Err(ParseError::new(
                "Attribute name must start with letter, underscore, or colon",
                base + pos,
            ));
        }
        while pos < bytes.len() && is_name_char(bytes[pos]) {
            pos += 1;
        }
        let name = &input[name_start..pos];

        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }
        if bytes.get(pos) != Some(&b'=') {
            return Err(ParseError::new(
                format!("Attribute '{}' has no value", name),
                base + pos,
            ));
        }
        pos += 1;
        while pos < bytes.len() && is_whitespace(bytes[pos]) {
            pos += 1;
        }

        let quote = match bytes.get(pos) {
            Some(&q @ (b'"' | b'\'')) => q,
            _ => {
                return Err(ParseError::new(
                    format!("Value of attribute '{}' must be quoted", name),
                    base + pos,
                ))
            }
        };
        let value_start = pos + 1;
        let close = memchr(quote, &bytes[value_start..])
            .map(|i| value_start + i)
            .ok_or_else(|| ParseError::new("Unterminated attribute value", base + pos))?;
        let raw = &input[value_start..close];
        if let Some(lt) = memchr(b'<', raw.as_bytes()) {
            return Err(ParseError::new(
                "'<' is not allowed in attribute values",
                base + value_start + lt,
            ));
        }
        let value = decode_attribute(raw)
            .map_err(|e| ParseError::new(e.message, base + value_start + e.offset))?;

        if attrs.iter().any(|a| a.name == name) {
            return Err(ParseError::new(
                format!("Duplicate attribute '{}'", name),
                base + name_start,
            ));
        }

        attrs.push(Attribute {
            name,
            value,
            offset: base + name_start,
        });
        pos = close + 1;
    }

    Ok(attrs)
}
