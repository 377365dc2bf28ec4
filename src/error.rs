//! Error types
//!
//! One enum per layer. Unresolvable spans are not errors; nodes that cannot
//! be mapped back to text are simply left out of the match set.

use thiserror::Error;

/// A line number outside the index was requested.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineIndexError {
    #[error("line {line} is out of range (document has {lines} lines)")]
    OutOfRange { line: usize, lines: usize },
}

/// Rejected edits to a namespace table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamespaceError {
    #[error("duplicate prefix: {prefix}")]
    DuplicatePrefix { prefix: String },

    #[error("illegal prefix: {prefix:?}")]
    IllegalPrefix { prefix: String },

    #[error("no namespace is bound to prefix {prefix}")]
    UnknownPrefix { prefix: String },

    #[error("namespace URI for prefix {prefix} is empty")]
    EmptyNamespace { prefix: String },

    #[error("namespace {uri} is already bound to prefix {prefix}")]
    DuplicateNamespace { uri: String, prefix: String },
}

/// The text is not well-formed XML.
///
/// Line and column are 1-based and point at the byte where the problem was
/// detected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (line {line}, position {column})")]
pub struct XmlError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

/// Failure compiling or evaluating an XPath expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("invalid expression: {0}")]
    Syntax(String),

    #[error("Namespace prefix '{0}' is not defined.")]
    UnknownPrefix(String),

    #[error("Expression must evaluate to a node-set.")]
    NotANodeSet,

    #[error("unknown function: {0}()")]
    UnknownFunction(String),

    #[error("not supported: {0}")]
    Unsupported(String),

    #[error("{0}")]
    Other(String),
}

/// Failure of a session-level evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("There is no XPath expression.")]
    NoExpression,

    #[error("There is no XML document.")]
    NoDocument,

    #[error(transparent)]
    Parse(#[from] XmlError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    LineIndex(#[from] LineIndexError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_errors_render_like_the_evaluator_reports_them() {
        assert_eq!(
            QueryError::UnknownPrefix("foo".to_string()).to_string(),
            "Namespace prefix 'foo' is not defined."
        );
        assert_eq!(
            QueryError::NotANodeSet.to_string(),
            "Expression must evaluate to a node-set."
        );
    }

    #[test]
    fn xml_error_carries_position() {
        let err = XmlError {
            message: "Unclosed tag: <a>".to_string(),
            line: 3,
            column: 7,
        };
        assert_eq!(err.to_string(), "Unclosed tag: <a> (line 3, position 7)");
    }
}
