//! XML Entity Handling
//!
//! Decoding for character data and attribute values:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//! - Line-end normalization (CRLF and lone CR become LF)
//!
//! And the matching escapers used when node values are compared against or
//! written back into markup. Everything returns `Cow` so the common case of
//! nothing-to-do stays zero-copy.

use memchr::{memchr, memchr2, memchr3};
use std::borrow::Cow;
use thiserror::Error;

/// A malformed or unknown reference, `offset` relative to the decoded input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EntityError {
    pub offset: usize,
    pub message: String,
}

impl EntityError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        EntityError {
            offset,
            message: message.into(),
        }
    }
}

/// Decode character data: entity references plus line-end normalization.
#[inline]
pub fn decode_text(input: &str) -> Result<Cow<'_, str>, EntityError> {
    if memchr2(b'&', b'\r', input.as_bytes()).is_none() {
        return Ok(Cow::Borrowed(input));
    }
    decode(input, false).map(Cow::Owned)
}

/// Decode an attribute value: like text, but literal tab/CR/LF become a
/// single space each (CRLF counts as one).
#[inline]
pub fn decode_attribute(input: &str) -> Result<Cow<'_, str>, EntityError> {
    let bytes = input.as_bytes();
    if memchr3(b'&', b'\r', b'\n', bytes).is_none() && memchr(b'\t', bytes).is_none() {
        return Ok(Cow::Borrowed(input));
    }
    decode(input, true).map(Cow::Owned)
}

fn decode(input: &str, attribute: bool) -> Result<String, EntityError> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '&' => {
                let rest = &input[i + 1..];
                let semi = memchr(b';', rest.as_bytes())
                    .ok_or_else(|| EntityError::new(i, "Unterminated entity reference"))?;
                let name = &rest[..semi];
                out.push(decode_reference(name).ok_or_else(|| {
                    EntityError::new(i, format!("Reference to undeclared entity '{}'", name))
                })?);
                // skip the name and ';'
                for _ in 0..name.chars().count() + 1 {
                    chars.next();
                }
            }
            '\r' => {
                if matches!(chars.peek(), Some((_, '\n'))) {
                    chars.next();
                }
                out.push(if attribute { ' ' } else { '\n' });
            }
            '\n' | '\t' if attribute => out.push(' '),
            _ => out.push(c),
        }
    }

    Ok(out)
}

/// Resolve the text between '&' and ';'
fn decode_reference(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let digits = name.strip_prefix('#')?;
            let codepoint = match digits.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse::<u32>().ok()?,
            };
            char::from_u32(codepoint).filter(|&c| is_xml_char(c))
        }
    }
}

/// XML 1.0 Char production
#[inline]
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Escape all five markup characters: `& < > " '`.
///
/// This is the form a node value takes when it is written back as markup
/// with quotes escaped, so its length approximates the raw text's.
pub fn escape_markup(input: &str) -> Cow<'_, str> {
    escape(input, |c| matches!(c, b'&' | b'<' | b'>' | b'"' | b'\''))
}

/// Escape for element content: `& < >`
pub fn escape_text(input: &str) -> Cow<'_, str> {
    escape(input, |c| matches!(c, b'&' | b'<' | b'>'))
}

/// Escape for a double-quoted attribute value: `& < "`
pub fn escape_attribute(input: &str) -> Cow<'_, str> {
    escape(input, |c| matches!(c, b'&' | b'<' | b'"'))
}

fn escape(input: &str, needs: impl Fn(u8) -> bool) -> Cow<'_, str> {
    let bytes = input.as_bytes();
    let Some(first) = bytes.iter().position(|&b| needs(b)) else {
        return Cow::Borrowed(input);
    };

    let mut out = String::with_capacity(input.len() + 16);
    out.push_str(&input[..first]);
    for c in input[first..].chars() {
        match c {
            '&' if needs(b'&') => out.push_str("&amp;"),
            '<' if needs(b'<') => out.push_str("&lt;"),
            '>' if needs(b'>') => out.push_str("&gt;"),
            '"' if needs(b'"') => out.push_str("&quot;"),
            '\'' if needs(b'\'') => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}
