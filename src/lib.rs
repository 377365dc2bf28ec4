//! xpathviz - XPath selection to text positions
//!
//! Evaluates XPath 1.0 against an XML text and maps every selected node
//! back to the byte range it occupies in that text, for highlighting.
//!
//! Pipeline per evaluation:
//! 1. Namespace discovery fills the prefix table after every text change
//! 2. The expression rewriter injects the default prefix into bare names
//! 3. The XPath engine selects nodes from the line-stamped DOM
//! 4. The span resolver turns nodes into ranges of the original text
//!
//! `DocumentSession` bundles all of it per document; the NIFs below expose
//! sessions to Elixir as `XPathViz.Native`.

use rustler::{Encoder, Env, NifResult, ResourceArc, Term};

pub mod core;
pub mod dom;
pub mod error;
pub mod highlight;
pub mod index;
pub mod reader;
pub mod resource;
pub mod rewrite;
pub mod session;
pub mod term;
pub mod xmlns;
pub mod xpath;

pub use dom::{ParseOptions, XmlDocument};
pub use error::{EvalError, LineIndexError, NamespaceError, QueryError, XmlError};
pub use highlight::{resolve_spans, MatchSet, SelectedNode};
pub use index::{LineIndex, LineInfo, Span};
pub use rewrite::rewrite_expression;
pub use session::{DocumentSession, Evaluation, SessionOptions};
pub use xmlns::{discover_namespaces, NamespaceTable, XmlnsInfo};
pub use xpath::QueryEngine;

use resource::{SessionRef, SessionResource};
use term::{
    error_tuple, eval_error_to_term, evaluation_to_term, namespace_error_to_term,
    namespaces_to_term, ok_tuple, span_to_term, str_to_binary,
};

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// ============================================================================
// Session Lifecycle
// ============================================================================

/// Run `f` on the locked session, or return `{:error, :mutex_poisoned}`
fn locked<'a, F>(env: Env<'a>, session: &SessionRef, f: F) -> NifResult<Term<'a>>
where
    F: FnOnce(&mut DocumentSession) -> NifResult<Term<'a>>,
{
    match session.with_session(f) {
        Ok(result) => result,
        Err(reason) => {
            let reason = rustler::types::atom::Atom::from_str(env, reason)?;
            Ok(error_tuple(env, reason.encode(env)))
        }
    }
}

/// Open a session on `text`; namespaces are discovered right away
#[rustler::nif(schedule = "DirtyCpu")]
fn session_new(text: &str) -> SessionRef {
    ResourceArc::new(SessionResource::new(text))
}

/// Replace the text, dropping matches and rediscovering namespaces
#[rustler::nif(schedule = "DirtyCpu")]
fn session_set_text<'a>(env: Env<'a>, session: SessionRef, text: &str) -> NifResult<Term<'a>> {
    locked(env, &session, |s| {
        s.set_text(text);
        Ok(str_to_binary(env, s.status()))
    })
}

#[rustler::nif]
fn session_text<'a>(env: Env<'a>, session: SessionRef) -> NifResult<Term<'a>> {
    locked(env, &session, |s| Ok(str_to_binary(env, s.text())))
}

#[rustler::nif]
fn session_status<'a>(env: Env<'a>, session: SessionRef) -> NifResult<Term<'a>> {
    locked(env, &session, |s| Ok(str_to_binary(env, s.status())))
}

// ============================================================================
// Evaluation and Navigation
// ============================================================================

/// Evaluate an expression; `{:ok, %{matches: [{start, end}], ...}}` or
/// `{:error, reason}`
#[rustler::nif(schedule = "DirtyCpu")]
fn evaluate<'a>(env: Env<'a>, session: SessionRef, expression: &str) -> NifResult<Term<'a>> {
    locked(env, &session, |s| match s.evaluate(expression) {
        Ok(evaluation) => {
            let result = evaluation_to_term(env, &evaluation, s.matches(), s.status())?;
            Ok(ok_tuple(env, result))
        }
        Err(e) => Ok(error_tuple(env, eval_error_to_term(env, &e))),
    })
}

#[rustler::nif]
fn next_match<'a>(env: Env<'a>, session: SessionRef) -> NifResult<Term<'a>> {
    locked(env, &session, |s| Ok(span_to_term(env, s.next_match())))
}

#[rustler::nif]
fn previous_match<'a>(env: Env<'a>, session: SessionRef) -> NifResult<Term<'a>> {
    locked(env, &session, |s| Ok(span_to_term(env, s.previous_match())))
}

/// Default-prefix rewriting on its own, for previewing the effective query
#[rustler::nif(name = "rewrite_expression")]
fn rewrite_expression_nif<'a>(env: Env<'a>, raw: &str, default_prefix: Option<&str>) -> Term<'a> {
    str_to_binary(env, &rewrite_expression(raw, default_prefix))
}

// ============================================================================
// Namespace Table
// ============================================================================

#[rustler::nif]
fn namespaces<'a>(env: Env<'a>, session: SessionRef) -> NifResult<Term<'a>> {
    locked(env, &session, |s| namespaces_to_term(env, s.namespaces()))
}

#[rustler::nif]
fn add_namespace<'a>(env: Env<'a>, session: SessionRef, prefix: &str, uri: &str) -> NifResult<Term<'a>> {
    locked(env, &session, |s| match s.add_namespace(prefix, uri) {
        Ok(()) => Ok(term::ok().encode(env)),
        Err(e) => Ok(error_tuple(env, namespace_error_to_term(env, &e))),
    })
}

#[rustler::nif]
fn remove_namespace<'a>(env: Env<'a>, session: SessionRef, prefix: &str) -> NifResult<Term<'a>> {
    locked(env, &session, |s| Ok(s.remove_namespace(prefix).encode(env)))
}

#[rustler::nif]
fn set_default_namespace<'a>(env: Env<'a>, session: SessionRef, prefix: &str) -> NifResult<Term<'a>> {
    locked(env, &session, |s| match s.set_default_namespace(prefix) {
        Ok(()) => Ok(term::ok().encode(env)),
        Err(e) => Ok(error_tuple(env, namespace_error_to_term(env, &e))),
    })
}

#[rustler::nif]
fn clear_default_namespace<'a>(env: Env<'a>, session: SessionRef) -> NifResult<Term<'a>> {
    locked(env, &session, |s| {
        s.clear_default_namespace();
        Ok(term::ok().encode(env))
    })
}

#[rustler::nif]
fn rename_namespace<'a>(env: Env<'a>, session: SessionRef, old: &str, new: &str) -> NifResult<Term<'a>> {
    locked(env, &session, |s| match s.rename_namespace(old, new) {
        Ok(()) => Ok(term::ok().encode(env)),
        Err(e) => Ok(error_tuple(env, namespace_error_to_term(env, &e))),
    })
}

// ============================================================================
// Editing
// ============================================================================

/// Remove the matched ranges from the text; returns the count removed
#[rustler::nif]
fn delete_matches<'a>(env: Env<'a>, session: SessionRef) -> NifResult<Term<'a>> {
    locked(env, &session, |s| Ok(s.delete_matches().encode(env)))
}

#[rustler::nif]
fn extract_matches<'a>(env: Env<'a>, session: SessionRef) -> NifResult<Term<'a>> {
    locked(env, &session, |s| {
        let extracted = s.extract_matches();
        Ok(str_to_binary(env, &extracted))
    })
}

/// New session holding the extracted matches and a copy of the table
#[rustler::nif(schedule = "DirtyCpu")]
fn extract_to_session<'a>(env: Env<'a>, session: SessionRef) -> NifResult<Term<'a>> {
    locked(env, &session, |s| {
        let extracted = s.extract_to_session();
        Ok(ResourceArc::new(SessionResource::from_session(extracted)).encode(env))
    })
}

#[rustler::nif(schedule = "DirtyCpu")]
fn reformat<'a>(env: Env<'a>, session: SessionRef) -> NifResult<Term<'a>> {
    locked(env, &session, |s| match s.reformat() {
        Ok(()) => Ok(term::ok().encode(env)),
        Err(e) => Ok(error_tuple(env, (term::parse_error(), e.to_string()).encode(env))),
    })
}

#[rustler::nif(schedule = "DirtyCpu")]
fn strip_namespaces<'a>(env: Env<'a>, session: SessionRef) -> NifResult<Term<'a>> {
    locked(env, &session, |s| match s.strip_namespaces() {
        Ok(()) => Ok(term::ok().encode(env)),
        Err(e) => Ok(error_tuple(env, (term::parse_error(), e.to_string()).encode(env))),
    })
}

rustler::init!("Elixir.XPathViz.Native");
