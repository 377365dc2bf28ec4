//! Elixir Term Conversion Utilities
//!
//! Converts session results and errors to Elixir terms. Failures are
//! `{:error, reason}` tuples, with `reason` an atom or `{atom, detail}`.

use rustler::{Encoder, Env, NewBinary, NifResult, Term};

use crate::error::{EvalError, NamespaceError, QueryError};
use crate::highlight::MatchSet;
use crate::index::Span;
use crate::session::Evaluation;
use crate::xmlns::NamespaceTable;

rustler::atoms! {
    ok,
    error,
    prefix,
    uri,
    contrived,
    default,
    expression,
    selected,
    matches,
    current,
    status,
    no_expression,
    no_document,
    parse_error,
    syntax,
    unknown_prefix,
    not_a_node_set,
    unknown_function,
    unsupported,
    other,
    line_out_of_range,
    duplicate_prefix,
    illegal_prefix,
    empty_namespace,
    duplicate_namespace,
}

/// `{:ok, value}`
pub fn ok_tuple<'a>(env: Env<'a>, value: Term<'a>) -> Term<'a> {
    (ok(), value).encode(env)
}

/// `{:error, reason}`
pub fn error_tuple<'a>(env: Env<'a>, reason: Term<'a>) -> Term<'a> {
    (error(), reason).encode(env)
}

/// `{start, end}` byte offsets, or nil
pub fn span_to_term<'a>(env: Env<'a>, span: Option<Span>) -> Term<'a> {
    span.map(|s| (s.start, s.end)).encode(env)
}

pub fn spans_to_term<'a>(env: Env<'a>, spans: &[Span]) -> Term<'a> {
    let mut list = Term::list_new_empty(env);
    for span in spans.iter().rev() {
        list = list.list_prepend((span.start, span.end).encode(env));
    }
    list
}

/// List of `%{prefix:, uri:, contrived:, default:}` maps in table order
pub fn namespaces_to_term<'a>(env: Env<'a>, table: &NamespaceTable) -> NifResult<Term<'a>> {
    let mut list = Term::list_new_empty(env);
    for entry in table.entries().iter().rev() {
        let pairs = [
            (prefix().encode(env), str_to_binary(env, &entry.prefix)),
            (uri().encode(env), str_to_binary(env, &entry.uri)),
            (contrived().encode(env), entry.contrived.encode(env)),
            (default().encode(env), entry.is_default.encode(env)),
        ];
        list = list.list_prepend(Term::map_from_pairs(env, &pairs)?);
    }
    Ok(list)
}

/// `%{expression:, selected:, matches:, current:, status:}`
pub fn evaluation_to_term<'a>(
    env: Env<'a>,
    evaluation: &Evaluation,
    found: &MatchSet,
    status_line: &str,
) -> NifResult<Term<'a>> {
    let pairs = [
        (expression().encode(env), str_to_binary(env, &evaluation.expression)),
        (selected().encode(env), evaluation.selected.encode(env)),
        (matches().encode(env), spans_to_term(env, found.spans())),
        (current().encode(env), span_to_term(env, found.current())),
        (status().encode(env), str_to_binary(env, status_line)),
    ];
    Term::map_from_pairs(env, &pairs)
}

pub fn eval_error_to_term<'a>(env: Env<'a>, err: &EvalError) -> Term<'a> {
    match err {
        EvalError::NoExpression => no_expression().encode(env),
        EvalError::NoDocument => no_document().encode(env),
        EvalError::Parse(e) => (parse_error(), e.to_string()).encode(env),
        EvalError::Query(e) => query_error_to_term(env, e),
        EvalError::LineIndex(e) => (line_out_of_range(), e.to_string()).encode(env),
    }
}

pub fn query_error_to_term<'a>(env: Env<'a>, err: &QueryError) -> Term<'a> {
    match err {
        QueryError::Syntax(msg) => (syntax(), msg.as_str()).encode(env),
        QueryError::UnknownPrefix(p) => (unknown_prefix(), p.as_str()).encode(env),
        QueryError::NotANodeSet => not_a_node_set().encode(env),
        QueryError::UnknownFunction(name) => (unknown_function(), name.as_str()).encode(env),
        QueryError::Unsupported(msg) => (unsupported(), msg.as_str()).encode(env),
        QueryError::Other(msg) => (other(), msg.as_str()).encode(env),
    }
}

pub fn namespace_error_to_term<'a>(env: Env<'a>, err: &NamespaceError) -> Term<'a> {
    match err {
        NamespaceError::DuplicatePrefix { prefix: p } => (duplicate_prefix(), p.as_str()).encode(env),
        NamespaceError::IllegalPrefix { prefix: p } => (illegal_prefix(), p.as_str()).encode(env),
        NamespaceError::UnknownPrefix { prefix: p } => (unknown_prefix(), p.as_str()).encode(env),
        NamespaceError::EmptyNamespace { prefix: p } => (empty_namespace(), p.as_str()).encode(env),
        NamespaceError::DuplicateNamespace { uri: u, .. } => (duplicate_namespace(), u.as_str()).encode(env),
    }
}

/// Convert a string to a binary term (more efficient than .encode())
#[inline]
pub fn str_to_binary<'a>(env: Env<'a>, s: &str) -> Term<'a> {
    let bytes = s.as_bytes();
    let mut binary = NewBinary::new(env, bytes.len());
    binary.as_mut_slice().copy_from_slice(bytes);
    binary.into()
}
