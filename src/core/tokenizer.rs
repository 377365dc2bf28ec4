//! XML Tokenizer - pull tokenizer over a UTF-8 document
//!
//! Extracts markup tokens in document order:
//! - Element start/end/empty tags
//! - Text content
//! - CDATA sections
//! - Comments
//! - Processing instructions and the XML declaration
//! - DOCTYPE (skipped over, the internal subset is not interpreted)
//!
//! Every token records the byte offsets of its whole markup and of the part
//! a line/column position is reported for (the name of a tag, the first
//! byte of a comment's content, and so on).
//!
//! The tokenizer is always strict: the first well-formedness problem stops
//! it with a `ParseError`.

use super::entities::decode_text;
use super::scanner::Scanner;
use std::borrow::Cow;

/// Type of XML token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `<element ...>`
    StartTag,
    /// `</element>`
    EndTag,
    /// `<element .../>`
    EmptyTag,
    Text,
    /// `<![CDATA[...]]>`
    CData,
    /// `<!--...-->`
    Comment,
    /// `<?target ...?>`
    ProcessingInstruction,
    /// `<?xml ...?>` at the very start
    XmlDeclaration,
    DocType,
    Eof,
}

/// A token with its source positions
#[derive(Debug, Clone)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Whole markup `[start, end)`
    pub span: (usize, usize),
    /// Tag name or PI target
    pub name: Option<&'a str>,
    /// Text, CDATA, comment or PI data (text has references decoded)
    pub content: Option<Cow<'a, str>>,
    /// Offset a node built from this token reports its position at
    pub anchor: usize,
    /// For tags: the raw attribute list between the name and `>` / `/>`
    pub attributes: Option<(&'a str, usize)>,
}

impl<'a> Token<'a> {
    fn new(kind: TokenKind, span: (usize, usize), anchor: usize) -> Self {
        Token {
            kind,
            span,
            name: None,
            content: None,
            anchor,
            attributes: None,
        }
    }

    fn with_name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }

    fn with_content(mut self, content: Cow<'a, str>) -> Self {
        self.content = Some(content);
        self
    }
}

/// A well-formedness error at an absolute byte position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        ParseError {
            message: message.into(),
            position,
        }
    }
}

/// Pull tokenizer
pub struct Tokenizer<'a> {
    input: &'a str,
    scanner: Scanner<'a>,
    done: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Tokenizer {
            input,
            scanner: Scanner::new(input.as_bytes()),
            done: false,
        }
    }

    /// Current byte position
    pub fn position(&self) -> usize {
        self.scanner.position()
    }

    /// Get the next token. After `Eof` every call returns `Eof` again.
    pub fn next_token(&mut self) -> Result<Token<'a>, ParseError> {
        let pos = self.scanner.position();
        if self.done || self.scanner.is_eof() {
            self.done = true;
            return Ok(Token::new(TokenKind::Eof, (pos, pos), pos));
        }

        if self.scanner.peek() == Some(b'<') {
            self.parse_markup()
        } else {
            self.parse_text()
        }
    }

    fn parse_markup(&mut self) -> Result<Token<'a>, ParseError> {
        let start = self.scanner.position();
        self.scanner.advance(1);

        match self.scanner.peek() {
            Some(b'/') => self.parse_end_tag(start),
            Some(b'!') => self.parse_bang_markup(start),
            Some(b'?') => self.parse_pi(start),
            Some(_) => self.parse_start_tag(start),
            None => Err(ParseError::new("Unexpected end of input after '<'", start)),
        }
    }

    fn parse_start_tag(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        let name_start = self.scanner.position();
        let name = self.read_name("Invalid element name")?;

        let end = self
            .scanner
            .find_tag_end_quoted()
            .ok_or_else(|| ParseError::new(format!("Unclosed start tag <{}>", name), start))?;

        let is_empty = self.input.as_bytes()[end - 1] == b'/' && end - 1 >= name_start + name.len();
        let attr_end = if is_empty { end - 1 } else { end };
        let attr_start = name_start + name.len();

        self.scanner.set_position(end + 1);

        let kind = if is_empty { TokenKind::EmptyTag } else { TokenKind::StartTag };
        let mut token = Token::new(kind, (start, end + 1), name_start).with_name(name);
        token.attributes = Some((&self.input[attr_start..attr_end], attr_start));
        Ok(token)
    }

    fn parse_end_tag(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(1);
        let name_start = self.scanner.position();
        let name = self.read_name("Invalid element name in end tag")?;

        self.scanner.skip_whitespace();
        if self.scanner.peek() != Some(b'>') {
            return Err(ParseError::new(
                format!("Expected '>' to close end tag </{}>", name),
                self.scanner.position(),
            ));
        }
        self.scanner.advance(1);

        Ok(Token::new(TokenKind::EndTag, (start, self.scanner.position()), name_start).with_name(name))
    }

    fn parse_bang_markup(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(1);

        if self.scanner.starts_with(b"--") {
            self.parse_comment(start)
        } else if self.scanner.starts_with(b"[CDATA[") {
            self.parse_cdata(start)
        } else if self.scanner.starts_with(b"DOCTYPE") {
            self.parse_doctype(start)
        } else {
            Err(ParseError::new(
                "Invalid declaration - expected comment, CDATA, or DOCTYPE",
                start,
            ))
        }
    }

    fn parse_comment(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(2);
        let content_start = self.scanner.position();

        let close = self
            .scanner
            .find_seq(b"--")
            .ok_or_else(|| ParseError::new("Unclosed comment", start))?;
        if self.input.as_bytes().get(close + 2) != Some(&b'>') {
            return Err(ParseError::new("'--' is not allowed inside a comment", close));
        }

        let content = &self.input[content_start..close];
        self.scanner.set_position(close + 3);
        Ok(Token::new(TokenKind::Comment, (start, close + 3), content_start)
            .with_content(Cow::Borrowed(content)))
    }

    fn parse_cdata(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(7);
        let content_start = self.scanner.position();

        let close = self
            .scanner
            .find_seq(b"]]>")
            .ok_or_else(|| ParseError::new("Unclosed CDATA section", start))?;

        let content = &self.input[content_start..close];
        self.scanner.set_position(close + 3);
        Ok(Token::new(TokenKind::CData, (start, close + 3), content_start)
            .with_content(Cow::Borrowed(content)))
    }

    /// Skip `<!DOCTYPE name ... [subset]>`, honoring quotes and the
    /// bracketed internal subset.
    fn parse_doctype(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(7);
        let bytes = self.input.as_bytes();
        let mut pos = self.scanner.position();
        let mut depth = 0usize;
        let mut quote: Option<u8> = None;

        while pos < bytes.len() {
            let b = bytes[pos];
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None => match b {
                    b'"' | b'\'' => quote = Some(b),
                    b'[' => depth += 1,
                    b']' => depth = depth.saturating_sub(1),
                    b'>' if depth == 0 => {
                        self.scanner.set_position(pos + 1);
                        return Ok(Token::new(TokenKind::DocType, (start, pos + 1), start + 2));
                    }
                    _ => {}
                },
            }
            pos += 1;
        }

        Err(ParseError::new("Unclosed DOCTYPE declaration", start))
    }

    fn parse_pi(&mut self, start: usize) -> Result<Token<'a>, ParseError> {
        self.scanner.advance(1);
        let target_start = self.scanner.position();
        let target = self.read_name("Invalid processing instruction target")?;

        let close = self
            .scanner
            .find_seq(b"?>")
            .ok_or_else(|| ParseError::new("Unclosed processing instruction", start))?;

        let after = self.scanner.position();
        if after < close && !super::scanner::is_whitespace(self.input.as_bytes()[after]) {
            return Err(ParseError::new("Invalid character after PI target name", after));
        }
        let data = self.input[after..close].trim_start_matches([' ', '\t', '\r', '\n']);

        let kind = if target == "xml" {
            if start != 0 {
                return Err(ParseError::new(
                    "XML declaration allowed only at the start of the document",
                    start,
                ));
            }
            TokenKind::XmlDeclaration
        } else if target.eq_ignore_ascii_case("xml") {
            return Err(ParseError::new(
                "Processing instruction target cannot be 'xml' (reserved name)",
                target_start,
            ));
        } else {
            TokenKind::ProcessingInstruction
        };

        self.scanner.set_position(close + 2);
        Ok(Token::new(kind, (start, close + 2), target_start)
            .with_name(target)
            .with_content(Cow::Borrowed(data)))
    }

    fn parse_text(&mut self) -> Result<Token<'a>, ParseError> {
        let start = self.scanner.position();
        let end = self.scanner.find_tag_start().unwrap_or(self.scanner.len());
        let raw = &self.input[start..end];

        if let Some(i) = memchr::memmem::find(raw.as_bytes(), b"]]>") {
            return Err(ParseError::new("']]>' is not allowed in text content", start + i));
        }

        let decoded = decode_text(raw).map_err(|e| ParseError::new(e.message, start + e.offset))?;
        self.scanner.set_position(end);
        Ok(Token::new(TokenKind::Text, (start, end), start).with_content(decoded))
    }

    fn read_name(&mut self, message: &str) -> Result<&'a str, ParseError> {
        let start = self.scanner.position();
        match self.scanner.read_name() {
            Some(bytes) => Ok(&self.input[start..start + bytes.len()]),
            None => Err(ParseError::new(message, start)),
        }
    }
}

/// Iterator adapter: stops at `Eof` or after yielding the first error
impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Token<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_token() {
            Ok(token) if token.kind == TokenKind::Eof => None,
            Ok(token) => Some(Ok(token)),
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
