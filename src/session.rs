//! Document sessions
//!
//! A session is one open document: its text, the namespace table the user
//! edits, the last set of matches, and a status line describing the last
//! operation. The parsed tree and line index are a cache keyed by the
//! current text and are dropped on every change to it, so spans are never
//! resolved against stale positions.

use std::sync::LazyLock;

use log::{debug, warn};
use regex::Regex;

use crate::dom::writer::{write_document, WriteOptions};
use crate::dom::{ParseOptions, XmlDocument};
use crate::error::{EvalError, NamespaceError, XmlError};
use crate::highlight::{resolve_spans, select_nodes, MatchSet};
use crate::index::{LineIndex, LineInfo, Span};
use crate::rewrite::rewrite_expression;
use crate::xmlns::{discover_namespaces, NamespaceTable};
use crate::xpath::QueryEngine;

/// `name = value` on a single line, as an attribute match reads
static ATTRIBUTE_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*([^ \t=]+)[ \t]*=(.+)$").expect("Invalid attribute pattern")
});

/// Session settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub parse: ParseOptions,
    /// Effective expressions at least this long are left out of the status
    pub status_expression_limit: usize,
    /// Compiled expressions kept per session
    pub compiled_cache_size: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions {
            parse: ParseOptions::default(),
            status_expression_limit: 64,
            compiled_cache_size: 64,
        }
    }
}

/// Outcome of a successful evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// The expression after default-prefix rewriting
    pub expression: String,
    /// Nodes selected by the query
    pub selected: usize,
    /// Selected nodes that could be mapped to a span
    pub highlighted: usize,
}

pub struct DocumentSession {
    text: String,
    options: SessionOptions,
    namespaces: NamespaceTable,
    index: Option<LineIndex>,
    document: Option<XmlDocument>,
    matches: MatchSet,
    status: String,
    engine: QueryEngine,
}

impl DocumentSession {
    pub fn new(text: impl Into<String>, options: SessionOptions) -> Self {
        Self::with_namespaces(text, NamespaceTable::new(), options)
    }

    /// Session whose discovery starts from an existing table, so prefixes
    /// chosen there carry over
    pub fn with_namespaces(
        text: impl Into<String>,
        namespaces: NamespaceTable,
        options: SessionOptions,
    ) -> Self {
        let engine = QueryEngine::new(options.compiled_cache_size);
        let mut session = DocumentSession {
            text: String::new(),
            options,
            namespaces,
            index: None,
            document: None,
            matches: MatchSet::default(),
            status: String::new(),
            engine,
        };
        session.set_text(text);
        session
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    pub fn matches(&self) -> &MatchSet {
        &self.matches
    }

    /// Replace the text and rediscover its namespaces
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.replace_text(text.into());
        if self.text.is_empty() {
            self.status.clear();
            return;
        }
        // a parse failure is reported in the status; the table stays
        if self.refresh_namespaces().is_err() {
            debug!("keeping {} namespace binding(s) from before the edit", self.namespaces.len());
        }
    }

    /// Rebuild the namespace table from the current text. On a parse
    /// failure the previous table stays in effect.
    pub fn refresh_namespaces(&mut self) -> Result<(), XmlError> {
        if let Err(e) = self.ensure_parsed() {
            warn!("cannot discover namespaces: {}", e);
            self.status = format!("Cannot parse: {}", e);
            return Err(e);
        }
        if let Some(document) = self.document.as_ref() {
            self.namespaces = discover_namespaces(document, &self.namespaces);
        }
        self.status = "OK.".to_string();
        Ok(())
    }

    /// Run `raw` against the document and store the resulting matches.
    ///
    /// The status line is updated either way.
    pub fn evaluate(&mut self, raw: &str) -> Result<Evaluation, EvalError> {
        self.matches = MatchSet::default();
        match self.run_query(raw) {
            Ok((evaluation, matches)) => {
                self.matches = matches;
                self.status = selection_status(
                    &evaluation.expression,
                    evaluation.selected,
                    self.options.status_expression_limit,
                );
                Ok(evaluation)
            }
            Err(e) => {
                self.status = failure_status(&e);
                Err(e)
            }
        }
    }

    fn run_query(&mut self, raw: &str) -> Result<(Evaluation, MatchSet), EvalError> {
        if raw.is_empty() {
            return Err(EvalError::NoExpression);
        }
        if self.text.is_empty() {
            return Err(EvalError::NoDocument);
        }

        let default_prefix = self.namespaces.default().map(|d| d.prefix.as_str());
        let expression = rewrite_expression(raw, default_prefix);
        let bindings = self.namespaces.bindings();

        self.ensure_parsed()?;
        let (Some(document), Some(index)) = (self.document.as_ref(), self.index.as_ref()) else {
            return Err(EvalError::NoDocument);
        };
        let ids = self.engine.select(document, &expression, &bindings)?;
        let matches = resolve_spans(&select_nodes(document, &ids), index, &self.text)?;
        debug!("{} selected {} node(s), {} span(s)", expression, ids.len(), matches.len());

        let evaluation = Evaluation {
            expression,
            selected: ids.len(),
            highlighted: matches.len(),
        };
        Ok((evaluation, matches))
    }

    pub fn next_match(&mut self) -> Option<Span> {
        self.matches.next()
    }

    pub fn previous_match(&mut self) -> Option<Span> {
        self.matches.previous()
    }

    /// Line and column of a byte offset in the current text, e.g. to
    /// scroll to the current match
    pub fn locate(&mut self, offset: usize) -> LineInfo {
        self.ensure_index().locate(offset)
    }

    /// Remove every matched range from the text. Ranges inside one that
    /// was already removed are skipped. Returns the number removed.
    pub fn delete_matches(&mut self) -> usize {
        let mut spans = self.matches.spans().to_vec();
        spans.sort();

        let mut kept = String::with_capacity(self.text.len());
        let mut last: Option<Span> = None;
        let mut removed = 0;
        for span in spans {
            if last.is_some_and(|prev| prev.overlaps(&span)) {
                continue;
            }
            let copied = last.map_or(0, |prev| prev.end);
            let Some(before) = self.text.get(copied..span.start) else {
                continue;
            };
            kept.push_str(before);
            last = Some(span);
            removed += 1;
        }
        if let Some(prev) = last {
            kept.push_str(self.text.get(prev.end..).unwrap_or_default());
            self.replace_text(kept);
        }
        self.matches = MatchSet::default();
        self.status = format!("{} nodes removed.", removed);
        removed
    }

    /// The matched text as XML fragments: element matches verbatim,
    /// attribute matches as `<name>value</name>`, anything else wrapped in
    /// `<text>`
    pub fn extract_matches(&mut self) -> String {
        let mut extracted = String::new();
        let mut count = 0;
        for span in self.matches.spans() {
            let Some(t) = span.slice(&self.text) else {
                continue;
            };
            if t.starts_with('<') {
                extracted.push_str(t);
            } else if let Some(caps) = ATTRIBUTE_TEXT.captures(t) {
                let name = &caps[1];
                extracted.push('<');
                extracted.push_str(name);
                extracted.push('>');
                extracted.push_str(unquote(&caps[2]));
                extracted.push_str("</");
                extracted.push_str(name);
                extracted.push_str(">\n");
            } else {
                extracted.push_str("<text>");
                extracted.push_str(t);
                extracted.push_str("</text>");
            }
            count += 1;
        }
        self.status = format!("{} nodes extracted.", count);
        extracted
    }

    /// A new session holding the extracted matches, wrapped in a root
    /// element that declares this session's namespaces
    pub fn extract_to_session(&mut self) -> DocumentSession {
        let extracted = self.extract_matches();
        let namespaces = self.namespaces.clone();
        let text = namespaces.envelope(&extracted);
        let mut session = DocumentSession::with_namespaces(text, namespaces, self.options.clone());
        if let Err(e) = session.reformat() {
            debug!("extracted text left as is: {}", e);
        }
        session
    }

    /// Re-serialize the document indented by two spaces, then rediscover
    pub fn reformat(&mut self) -> Result<(), XmlError> {
        self.rewrite_document(&WriteOptions::default())?;
        self.refresh_namespaces()?;
        self.status = "Formatted.".to_string();
        Ok(())
    }

    /// Re-serialize with local names only and no namespace declarations,
    /// then rediscover (the table ends up empty)
    pub fn strip_namespaces(&mut self) -> Result<(), XmlError> {
        let options = WriteOptions {
            strip_namespaces: true,
            ..WriteOptions::default()
        };
        self.rewrite_document(&options)?;
        self.refresh_namespaces()
    }

    fn rewrite_document(&mut self, options: &WriteOptions) -> Result<(), XmlError> {
        if let Err(e) = self.ensure_parsed() {
            self.status = format!("Cannot parse: {}", e);
            return Err(e);
        }
        if let Some(document) = self.document.as_ref() {
            let text = write_document(document, options);
            self.replace_text(text);
        }
        Ok(())
    }

    pub fn add_namespace(&mut self, prefix: &str, uri: &str) -> Result<(), NamespaceError> {
        self.namespaces.add_namespace(prefix, uri)
    }

    pub fn remove_namespace(&mut self, prefix: &str) -> bool {
        self.namespaces.remove_by_prefix(prefix)
    }

    pub fn set_default_namespace(&mut self, prefix: &str) -> Result<(), NamespaceError> {
        self.namespaces.set_default(prefix)
    }

    pub fn clear_default_namespace(&mut self) {
        self.namespaces.clear_default();
    }

    pub fn rename_namespace(&mut self, old: &str, new: &str) -> Result<(), NamespaceError> {
        self.namespaces.rename_prefix(old, new)
    }

    /// Swap in new text, dropping everything derived from the old one
    fn replace_text(&mut self, text: String) {
        if self.document.is_some() || self.index.is_some() {
            debug!("dropping cached parse of {} bytes", self.text.len());
        }
        self.text = text;
        self.index = None;
        self.document = None;
        self.matches = MatchSet::default();
    }

    fn ensure_index(&mut self) -> &LineIndex {
        self.index.get_or_insert_with(|| LineIndex::build(&self.text))
    }

    fn ensure_parsed(&mut self) -> Result<(), XmlError> {
        if self.document.is_some() {
            return Ok(());
        }
        let index = self.index.get_or_insert_with(|| LineIndex::build(&self.text));
        let document = XmlDocument::parse_with_index(&self.text, index, &self.options.parse)?;
        debug!("parsed {} nodes", document.node_count());
        self.document = Some(document);
        Ok(())
    }
}

/// `"{expr}: N nodes selected"`, without the expression when it is long
fn selection_status(expression: &str, selected: usize, limit: usize) -> String {
    let what = match selected {
        0 => "Zero nodes".to_string(),
        1 => "1 node".to_string(),
        n => format!("{} nodes", n),
    };
    if expression.len() < limit {
        format!("{}: {} selected", expression, what)
    } else {
        format!("{} selected", what)
    }
}

fn failure_status(error: &EvalError) -> String {
    match error {
        EvalError::NoExpression | EvalError::NoDocument => format!("Cannot evaluate: {}", error),
        EvalError::Parse(e) => format!("Cannot parse: {}", e),
        EvalError::Query(_) | EvalError::LineIndex(_) => format!("Exception: {}", error),
    }
}

/// Strip one pair of matching quotes (and the blanks around them)
fn unquote(value: &str) -> &str {
    let trimmed = value.trim_matches(|c| c == ' ' || c == '\t');
    let bytes = trimmed.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(&q @ (b'"' | b'\'')), Some(&last)) if bytes.len() > 2 && last == q => {
            &trimmed[1..trimmed.len() - 1]
        }
        _ => value,
    }
}
