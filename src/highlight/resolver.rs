//! Span resolution
//!
//! Maps selected nodes back onto the text they were parsed from. Nodes
//! carry only a start position (line/column), so the end of each span is
//! recovered by scanning the raw text, with a rule per node kind.
//!
//! Element spans are best-effort: the forward scan for the end of a start
//! tag does not understand quoting, so a `>` or `/` inside an attribute
//! value ends the scan early.

use log::debug;
use memchr::{memchr, memchr2, memmem, memrchr};

use super::matches::MatchSet;
use crate::core::entities::escape_markup;
use crate::dom::{DocumentAccess, NodeId, NodeKind};
use crate::error::LineIndexError;
use crate::index::{LineIndex, LineInfo, Span};

/// What the resolver needs to know about one selected node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedNode {
    pub kind: NodeKind,
    /// Qualified name of elements and attributes
    pub name: String,
    /// Character content of text, CDATA and comment nodes
    pub value: String,
    pub line_info: Option<LineInfo>,
    /// Start of the following sibling, when the node has one
    pub next_sibling: Option<LineInfo>,
}

impl SelectedNode {
    pub fn from_document<D: DocumentAccess>(doc: &D, id: NodeId) -> Self {
        let node = doc.get_node(id);
        let position = |n: NodeId| doc.get_node(n).and_then(|n| n.line_info);
        let next_sibling = match doc.node_kind_of(id) {
            Some(kind) if is_tree_kind(kind) => doc.next_sibling_of(id).and_then(position),
            _ => None,
        };
        SelectedNode {
            kind: node.map_or(NodeKind::Document, |n| n.kind),
            name: doc.node_name(id).to_string(),
            value: doc.node_value(id).to_string(),
            line_info: node.and_then(|n| n.line_info),
            next_sibling,
        }
    }
}

fn is_tree_kind(kind: NodeKind) -> bool {
    !matches!(kind, NodeKind::Attribute | NodeKind::Namespace | NodeKind::Document)
}

/// Selected nodes of `doc`, in the order given
pub fn select_nodes<D: DocumentAccess>(doc: &D, ids: &[NodeId]) -> Vec<SelectedNode> {
    ids.iter().map(|&id| SelectedNode::from_document(doc, id)).collect()
}

/// Resolve every node to its span in `text`.
///
/// Nodes whose span cannot be derived are left out; spans keep the order
/// of `nodes`. A line outside `index` fails the whole call.
pub fn resolve_spans(
    nodes: &[SelectedNode],
    index: &LineIndex,
    text: &str,
) -> Result<MatchSet, LineIndexError> {
    let mut spans = Vec::with_capacity(nodes.len());
    for node in nodes {
        if let Some(span) = resolve_span(node, index, text)? {
            debug!("match({},{}) {} {}", span.start, span.end, node.kind.as_str(), node.name);
            spans.push(span);
        }
    }
    Ok(MatchSet::new(spans))
}

/// Span of a single node, or None when it has no place in the text
pub fn resolve_span(
    node: &SelectedNode,
    index: &LineIndex,
    text: &str,
) -> Result<Option<Span>, LineIndexError> {
    let Some(info) = node.line_info else {
        return Ok(None);
    };
    // the byte before the node's anchor: `<` for elements, the separator
    // before an attribute name, the delimiter before character data
    let Some(ix) = anchor(index, info)? else {
        return Ok(None);
    };

    let bytes = text.as_bytes();
    let span = match node.kind {
        NodeKind::Comment | NodeKind::CData => {
            let start = ix + 1;
            Some(Span::new(start, start + node.value.len()))
        }
        NodeKind::Text => {
            let start = ix + 1;
            let mut end = raw_text_end(bytes, start, &node.value);
            // raw character data never contains `<`
            if let Some(lt) = bytes.get(start..).and_then(|rest| memchr(b'<', rest)) {
                end = end.min(start + lt);
            }
            Some(Span::new(start, end))
        }
        NodeKind::Attribute => attribute_span(bytes, ix + 1, &node.name),
        NodeKind::Element => match node.next_sibling {
            Some(sibling) => match anchor(index, sibling)? {
                Some(sib) => element_span_before(bytes, ix, sib + 1),
                None => None,
            },
            None => element_span_forward(bytes, ix, &node.name),
        },
        _ => None,
    };

    Ok(span.and_then(|s| accept(s, text)))
}

fn anchor(index: &LineIndex, info: LineInfo) -> Result<Option<usize>, LineIndexError> {
    let line_start = index.char_offset(info.line)?;
    Ok((line_start + info.column).checked_sub(2))
}

/// End of a text value written back as markup, measured in the raw text.
/// The parser turns `\r\n` and a lone `\r` into `\n`, so each `\n` of the
/// value consumes whichever line break the raw text actually has.
fn raw_text_end(bytes: &[u8], start: usize, value: &str) -> usize {
    let mut pos = start;
    for c in escape_markup(value).chars() {
        if c == '\n' && bytes.get(pos) == Some(&b'\r') {
            pos += if bytes.get(pos + 1) == Some(&b'\n') { 2 } else { 1 };
        } else {
            pos += c.len_utf8();
        }
    }
    pos
}

/// `name = "value"` starting at `start`
fn attribute_span(bytes: &[u8], start: usize, name: &str) -> Option<Span> {
    let from = start + name.len() + 1;
    let rest = bytes.get(from..)?;
    let open = from + memchr2(b'\'', b'"', rest)?;
    let quote = bytes[open];
    let close = open + 1 + memchr(quote, bytes.get(open + 1..)?)?;
    Some(Span::new(start, close + 1))
}

/// Element followed by a sibling starting at `sibling`: the element ends
/// at the last `>` before it
fn element_span_before(bytes: &[u8], ix: usize, sibling: usize) -> Option<Span> {
    let window = bytes.get(ix + 1..=sibling.min(bytes.len().checked_sub(1)?))?;
    let gt = ix + 1 + memrchr(b'>', window)?;
    Some(Span::new(ix, gt + 1))
}

/// Last element among its siblings: scan past the start tag, then look for
/// the matching end tag by name
fn element_span_forward(bytes: &[u8], ix: usize, name: &str) -> Option<Span> {
    let from = ix + name.len() + 1;
    let stop = from + memchr2(b'>', b'/', bytes.get(from..)?)?;

    if bytes[stop] == b'/' {
        let gt = stop + memchr(b'>', &bytes[stop..])?;
        return Some(Span::new(ix, gt + 1));
    }

    let end_tag = format!("</{}>", name);
    match memmem::find(&bytes[stop..], end_tag.as_bytes()) {
        Some(i) => Some(Span::new(ix, stop + i + end_tag.len())),
        None => Some(Span::new(ix, stop + 1)),
    }
}

/// Keep non-empty spans, with the end clamped into the text and onto a
/// char boundary
fn accept(span: Span, text: &str) -> Option<Span> {
    let mut end = span.end.min(text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }
    let span = Span::new(span.start, end);
    if span.is_empty() || !text.is_char_boundary(span.start) {
        return None;
    }
    Some(span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ParseOptions, XmlDocument};
    use crate::xpath::QueryEngine;
    use pretty_assertions::assert_eq;

    /// Text covered by each span selected by `xpath`
    fn highlight(text: &str, xpath: &str) -> Vec<String> {
        let index = LineIndex::build(text);
        let doc = XmlDocument::parse_with_index(text, &index, &ParseOptions::default()).unwrap();
        let ids = QueryEngine::default().select(&doc, xpath, &[]).unwrap();
        let matches = resolve_spans(&select_nodes(&doc, &ids), &index, text).unwrap();
        matches
            .spans()
            .iter()
            .map(|s| s.slice(text).unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_attribute_literal() {
        assert_eq!(highlight(r#"<a x="hello"/>"#, "/a/@x"), vec![r#"x="hello""#]);
    }

    #[test]
    fn test_attribute_spacing_and_quotes() {
        let text = "<a  y = 'v'\n   z=\"w\"/>";
        assert_eq!(highlight(text, "/a/@*"), vec!["y = 'v'", "z=\"w\""]);
    }

    #[test]
    fn test_element_with_following_sibling() {
        let text = "<r>\n  <a k=\"1\">x</a>\n  <b/>\n</r>";
        assert_eq!(highlight(text, "/r/a"), vec!["<a k=\"1\">x</a>"]);
    }

    #[test]
    fn test_self_closing_last_element() {
        let text = "<r><a/><b  /></r>";
        assert_eq!(highlight(text, "/r/*"), vec!["<a/>", "<b  />"]);
    }

    #[test]
    fn test_last_element_finds_end_tag() {
        let text = "<r>\n  <item>\n    <v>1</v>\n  </item>\n</r>";
        assert_eq!(highlight(text, "//item"), vec!["<item>\n    <v>1</v>\n  </item>"]);
        assert_eq!(highlight(text, "/r"), vec![text]);
    }

    #[test]
    fn test_prefixed_element_end_tag() {
        let text = r#"<p:r xmlns:p="urn:p"><p:a>t</p:a></p:r>"#;
        let index = LineIndex::build(text);
        let doc = XmlDocument::parse(text, &ParseOptions::default()).unwrap();
        let bindings = vec![("q".to_string(), "urn:p".to_string())];
        let ids = QueryEngine::default().select(&doc, "//q:a", &bindings).unwrap();
        let matches = resolve_spans(&select_nodes(&doc, &ids), &index, text).unwrap();
        assert_eq!(matches.spans()[0].slice(text), Some("<p:a>t</p:a>"));
    }

    #[test]
    fn test_slash_in_attribute_value_is_best_effort() {
        // the scan stops at the `/` inside the value and treats the tag as
        // self-closing, so only the start tag is covered
        let text = r#"<r><a href="x/y">t</a></r>"#;
        assert_eq!(highlight(text, "/r/a"), vec![r#"<a href="x/y">"#]);
    }

    #[test]
    fn test_text_node() {
        let text = "<r><a>hello</a>\n<b>x &amp; y</b></r>";
        assert_eq!(highlight(text, "//a/text()"), vec!["hello"]);
        assert_eq!(highlight(text, "//b/text()"), vec!["x &amp; y"]);
    }

    #[test]
    fn test_text_spanning_crlf_lines() {
        let text = "<r>ab\r\ncd\r\nef</r>";
        assert_eq!(highlight(text, "/r/text()"), vec!["ab\r\ncd\r\nef"]);

        let nested = "<r>\r\n<a>ab\r\ncd</a>\r\n<b>x</b>\r\n</r>";
        assert_eq!(highlight(nested, "//a/text()"), vec!["ab\r\ncd"]);
        assert_eq!(highlight(nested, "//b/text()"), vec!["x"]);
    }

    #[test]
    fn test_text_with_lone_cr() {
        let text = "<r>a\rb\r\rc</r>";
        assert_eq!(highlight(text, "/r/text()"), vec!["a\rb\r\rc"]);
    }

    #[test]
    fn test_text_with_unescaped_quote_is_clamped() {
        // the escaped form is longer than the source; the end stops at `<`
        let text = r#"<r>say "hi"</r>"#;
        assert_eq!(highlight(text, "/r/text()"), vec![r#"say "hi""#]);
    }

    #[test]
    fn test_comment_and_cdata() {
        let text = "<r><!-- note --><![CDATA[a < b]]></r>";
        assert_eq!(highlight(text, "/r/comment()"), vec![" note "]);
        assert_eq!(highlight(text, "/r/text()"), vec!["a < b"]);
    }

    #[test]
    fn test_namespace_nodes_have_no_span() {
        let text = r#"<r xmlns:p="urn:p"/>"#;
        assert!(highlight(text, "/r/namespace::*").is_empty());
        assert!(highlight(text, "/").is_empty());
    }

    #[test]
    fn test_order_follows_input() {
        let text = "<r><a/><b/></r>";
        let index = LineIndex::build(text);
        let doc = XmlDocument::parse(text, &ParseOptions::default()).unwrap();
        let mut ids = QueryEngine::default().select(&doc, "/r/*", &[]).unwrap();
        ids.reverse();
        let matches = resolve_spans(&select_nodes(&doc, &ids), &index, text).unwrap();
        assert_eq!(matches.spans(), &[Span::new(7, 11), Span::new(3, 7)]);
    }

    #[test]
    fn test_multibyte_text() {
        let text = "<r><a>h\u{e9}llo</a><b>\u{65e5}\u{672c}</b></r>";
        assert_eq!(highlight(text, "//a/text()"), vec!["h\u{e9}llo"]);
        assert_eq!(highlight(text, "//b"), vec!["<b>\u{65e5}\u{672c}</b>"]);
    }

    #[test]
    fn test_missing_line_info_is_skipped() {
        let node = SelectedNode {
            kind: NodeKind::Element,
            name: "a".to_string(),
            value: String::new(),
            line_info: None,
            next_sibling: None,
        };
        let index = LineIndex::build("<a/>");
        assert!(resolve_spans(&[node], &index, "<a/>").unwrap().is_empty());
    }

    #[test]
    fn test_line_out_of_range_fails() {
        let node = SelectedNode {
            kind: NodeKind::Element,
            name: "a".to_string(),
            value: String::new(),
            line_info: Some(LineInfo::new(5, 2)),
            next_sibling: None,
        };
        let index = LineIndex::build("<a/>");
        assert_eq!(
            resolve_spans(&[node], &index, "<a/>"),
            Err(LineIndexError::OutOfRange { line: 5, lines: 1 })
        );
    }

    #[test]
    fn test_scan_off_the_end_is_skipped() {
        let node = SelectedNode {
            kind: NodeKind::Attribute,
            name: "x".to_string(),
            value: "v".to_string(),
            line_info: Some(LineInfo::new(1, 4)),
            next_sibling: None,
        };
        let text = "<a x=";
        let index = LineIndex::build(text);
        assert!(resolve_spans(&[node], &index, text).unwrap().is_empty());
    }

    #[test]
    fn test_spans_are_never_empty() {
        let text = "<r><a></a><b>t</b><!----></r>";
        let index = LineIndex::build(text);
        let doc = XmlDocument::parse(text, &ParseOptions::default()).unwrap();
        let ids = QueryEngine::default().select(&doc, "//node()", &[]).unwrap();
        let matches = resolve_spans(&select_nodes(&doc, &ids), &index, text).unwrap();
        assert!(matches.spans().iter().all(|s| s.end > s.start));
    }
}
