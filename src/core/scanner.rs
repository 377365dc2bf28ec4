//! Byte scanner for markup delimiters
//!
//! Thin cursor over the document bytes. All searches go through memchr,
//! which uses SSE2/AVX2/NEON where the target has them.

use memchr::{memchr, memchr3, memmem};

/// Cursor over the raw document bytes
pub struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    #[inline]
    pub fn new(input: &'a [u8]) -> Self {
        Scanner { input, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.input.len()
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    #[inline]
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    #[inline]
    pub fn starts_with(&self, needle: &[u8]) -> bool {
        self.input[self.pos.min(self.input.len())..].starts_with(needle)
    }

    /// Skip XML whitespace (space, tab, LF, CR)
    #[inline]
    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if !is_whitespace(b) {
                break;
            }
            self.pos += 1;
        }
    }

    /// Position of the next '<'
    #[inline]
    pub fn find_tag_start(&self) -> Option<usize> {
        memchr(b'<', self.rest()).map(|i| self.pos + i)
    }

    /// Position of the next occurrence of `byte`
    #[inline]
    pub fn find_byte(&self, byte: u8) -> Option<usize> {
        memchr(byte, self.rest()).map(|i| self.pos + i)
    }

    /// Position of the next occurrence of `needle`
    #[inline]
    pub fn find_seq(&self, needle: &[u8]) -> Option<usize> {
        memmem::find(self.rest(), needle).map(|i| self.pos + i)
    }

    /// Position of the '>' closing the current tag, skipping quoted values.
    ///
    /// Jumps from quote to quote with memchr instead of walking byte by byte.
    pub fn find_tag_end_quoted(&self) -> Option<usize> {
        let mut pos = self.pos;
        loop {
            let hit = pos + memchr3(b'>', b'"', b'\'', self.input.get(pos..)?)?;
            match self.input[hit] {
                b'>' => return Some(hit),
                quote => {
                    let close = memchr(quote, &self.input[hit + 1..])?;
                    pos = hit + 1 + close + 1;
                }
            }
        }
    }

    /// Read an XML name at the cursor, advancing past it.
    ///
    /// Non-ASCII bytes are accepted as name characters, so the returned
    /// slice always ends on a UTF-8 boundary of a valid `&str` input.
    pub fn read_name(&mut self) -> Option<&'a [u8]> {
        let start = self.pos;
        let first = self.peek()?;
        if !is_name_start_char(first) {
            return None;
        }
        self.pos += 1;
        while let Some(b) = self.peek() {
            if !is_name_char(b) {
                break;
            }
            self.pos += 1;
        }
        Some(&self.input[start..self.pos])
    }

    #[inline]
    fn rest(&self) -> &'a [u8] {
        &self.input[self.pos.min(self.input.len())..]
    }
}

#[inline]
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// Letters, underscore, colon and any UTF-8 lead/continuation byte
#[inline]
pub fn is_name_start_char(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

#[inline]
pub fn is_name_char(b: u8) -> bool {
    is_name_start_char(b) || matches!(b, b'0'..=b'9' | b'-' | b'.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_tag_start() {
        let scanner = Scanner::new(b"hello <world>");
        assert_eq!(scanner.find_tag_start(), Some(6));
    }

    #[test]
    fn test_find_tag_end_quoted() {
        let scanner = Scanner::new(b"<a attr=\">test\">content");
        assert_eq!(scanner.find_tag_end_quoted(), Some(15));
    }

    #[test]
    fn test_find_tag_end_mixed_quotes() {
        let scanner = Scanner::new(b"<a x='\">' y=\"'>\">");
        assert_eq!(scanner.find_tag_end_quoted(), Some(16));
    }

    #[test]
    fn test_find_tag_end_unterminated_quote() {
        let scanner = Scanner::new(b"<a x='oops>");
        assert_eq!(scanner.find_tag_end_quoted(), None);
    }

    #[test]
    fn test_read_name() {
        let mut scanner = Scanner::new(b"ns:element-name>");
        assert_eq!(scanner.read_name(), Some(b"ns:element-name" as &[u8]));
        assert_eq!(scanner.position(), 15);
    }

    #[test]
    fn test_read_name_rejects_digit_start() {
        let mut scanner = Scanner::new(b"1abc");
        assert_eq!(scanner.read_name(), None);
        assert_eq!(scanner.position(), 0);
    }

    #[test]
    fn test_find_seq() {
        let mut scanner = Scanner::new(b"<!-- a - b -->");
        scanner.set_position(4);
        assert_eq!(scanner.find_seq(b"-->"), Some(11));
    }
}
