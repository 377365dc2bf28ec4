//! Line Index
//!
//! Maps 1-based line numbers to the byte offset of the line's first byte.
//! `\n`, `\r\n` and a lone `\r` each end a line, the same rule the XML
//! parser uses when it stamps line/column positions on nodes.

use crate::error::LineIndexError;
use memchr::memchr2;

/// A 1-based line/column position.
///
/// Columns count bytes from the start of the line, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineInfo {
    pub line: usize,
    pub column: usize,
}

impl LineInfo {
    #[inline]
    pub const fn new(line: usize, column: usize) -> Self {
        LineInfo { line, column }
    }
}

/// Start offsets of every line in a text.
///
/// Invariants: `offsets[0] == 0`, offsets strictly increase, and there is
/// one entry per line (line terminators + 1). The index is immutable; any
/// edit to the text needs a fresh [`LineIndex::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    offsets: Vec<usize>,
    text_len: usize,
}

impl LineIndex {
    /// Build the index in a single pass over the text.
    pub fn build(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut offsets = Vec::with_capacity(bytes.len() / 32 + 1);
        offsets.push(0);

        let mut pos = 0;
        while let Some(i) = memchr2(b'\n', b'\r', &bytes[pos..]) {
            let at = pos + i;
            let next = if bytes[at] == b'\r' && bytes.get(at + 1) == Some(&b'\n') {
                at + 2
            } else {
                at + 1
            };
            offsets.push(next);
            pos = next;
        }

        LineIndex {
            offsets,
            text_len: bytes.len(),
        }
    }

    /// Number of lines in the text
    #[inline]
    pub fn line_count(&self) -> usize {
        self.offsets.len()
    }

    /// Length of the indexed text in bytes
    #[inline]
    pub fn text_len(&self) -> usize {
        self.text_len
    }

    /// Byte offset of the first byte of `line` (1-based).
    pub fn char_offset(&self, line: usize) -> Result<usize, LineIndexError> {
        if line == 0 || line > self.offsets.len() {
            return Err(LineIndexError::OutOfRange {
                line,
                lines: self.offsets.len(),
            });
        }
        Ok(self.offsets[line - 1])
    }

    /// Line/column of a byte offset. Offsets past the end clamp to the end
    /// of the text.
    pub fn locate(&self, offset: usize) -> LineInfo {
        let offset = offset.min(self.text_len);
        // partition_point gives the number of line starts <= offset, which
        // is at least 1 because offsets[0] == 0
        let line = self.offsets.partition_point(|&start| start <= offset);
        let start = self.offsets[line - 1];
        LineInfo::new(line, offset - start + 1)
    }

    /// Slice of all line start offsets
    #[inline]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_single_line() {
        let index = LineIndex::build("<root/>");
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.char_offset(1), Ok(0));
    }

    #[test]
    fn test_empty_text_has_one_line() {
        let index = LineIndex::build("");
        assert_eq!(index.offsets(), &[0]);
    }

    #[test]
    fn test_mixed_terminators() {
        let index = LineIndex::build("a\nbc\r\nd\re");
        assert_eq!(index.offsets(), &[0, 2, 6, 8]);
        assert_eq!(index.char_offset(3), Ok(6));
    }

    #[test]
    fn test_trailing_newline_starts_a_line() {
        let index = LineIndex::build("a\n");
        assert_eq!(index.offsets(), &[0, 2]);
    }

    #[test]
    fn test_out_of_range() {
        let index = LineIndex::build("a\nb");
        assert_eq!(
            index.char_offset(0),
            Err(LineIndexError::OutOfRange { line: 0, lines: 2 })
        );
        assert_eq!(
            index.char_offset(3),
            Err(LineIndexError::OutOfRange { line: 3, lines: 2 })
        );
    }

    #[test]
    fn test_locate() {
        let index = LineIndex::build("<a>\n  <b/>\n</a>");
        assert_eq!(index.locate(0), LineInfo::new(1, 1));
        assert_eq!(index.locate(7), LineInfo::new(2, 4));
        assert_eq!(index.locate(11), LineInfo::new(3, 1));
        assert_eq!(index.locate(999), LineInfo::new(3, 5));
    }

    #[test]
    fn test_locate_on_terminator_belongs_to_its_line() {
        let index = LineIndex::build("ab\r\ncd");
        assert_eq!(index.locate(2), LineInfo::new(1, 3));
        assert_eq!(index.locate(3), LineInfo::new(1, 4));
        assert_eq!(index.locate(4), LineInfo::new(2, 1));
    }

    /// Line starts computed the slow way, by walking the text.
    fn naive_line_starts(text: &str) -> Vec<usize> {
        let bytes = text.as_bytes();
        let mut starts = vec![0];
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\r' if bytes.get(i + 1) == Some(&b'\n') => {
                    starts.push(i + 2);
                    i += 2;
                }
                b'\r' | b'\n' => {
                    starts.push(i + 1);
                    i += 1;
                }
                _ => i += 1,
            }
        }
        starts
    }

    proptest! {
        #[test]
        fn char_offset_matches_naive_split(text in "[a-z<>/ \r\n]{0,200}") {
            let index = LineIndex::build(&text);
            let expected = naive_line_starts(&text);
            prop_assert_eq!(index.line_count(), expected.len());
            for (i, start) in expected.iter().enumerate() {
                prop_assert_eq!(index.char_offset(i + 1), Ok(*start));
            }
        }

        #[test]
        fn locate_inverts_char_offset(text in "[a-z \r\n]{0,120}", pick in 0usize..120) {
            let index = LineIndex::build(&text);
            let offset = pick.min(text.len());
            let info = index.locate(offset);
            let start = index.char_offset(info.line).unwrap();
            prop_assert_eq!(start + info.column - 1, offset);
        }
    }
}
