//! Query engine with a compiled-expression cache
//!
//! Sessions evaluate the same expression repeatedly while the user steps
//! through edits, so compiled expressions are kept in an LRU keyed by the
//! expression text.

use std::num::NonZeroUsize;
use std::sync::Arc;

use log::debug;
use lru::LruCache;

use super::compiler::{self, CompiledExpr};
use super::eval::{check_prefixes, evaluate_compiled, EvalContext};
use super::value::XPathValue;
use crate::dom::{DocumentAccess, NodeId};
use crate::error::QueryError;

pub struct QueryEngine {
    cache: LruCache<String, Arc<CompiledExpr>>,
}

impl QueryEngine {
    /// Engine caching up to `capacity` compiled expressions (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        QueryEngine {
            cache: LruCache::new(capacity),
        }
    }

    /// Compile `xpath`, reusing a cached compilation when there is one
    pub fn compile(&mut self, xpath: &str) -> Result<Arc<CompiledExpr>, QueryError> {
        if let Some(compiled) = self.cache.get(xpath) {
            return Ok(Arc::clone(compiled));
        }
        let compiled = Arc::new(compiler::compile(xpath)?);
        debug!("compiled {:?} into {} ops", xpath, compiled.ops.len());
        self.cache.put(xpath.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Evaluate with the document node as context
    pub fn evaluate<D: DocumentAccess>(
        &mut self,
        doc: &D,
        xpath: &str,
        bindings: &[(String, String)],
    ) -> Result<XPathValue, QueryError> {
        let compiled = self.compile(xpath)?;
        check_prefixes(&compiled, bindings)?;
        evaluate_compiled(&compiled, &EvalContext::new(doc, bindings))
    }

    /// Evaluate an expression that must produce a node-set; nodes come back
    /// in document order
    pub fn select<D: DocumentAccess>(
        &mut self,
        doc: &D,
        xpath: &str,
        bindings: &[(String, String)],
    ) -> Result<Vec<NodeId>, QueryError> {
        self.evaluate(doc, xpath, bindings)?
            .into_nodeset()
            .ok_or(QueryError::NotANodeSet)
    }
}

impl Default for QueryEngine {
    fn default() -> Self {
        QueryEngine::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ParseOptions, XmlDocument};

    fn doc() -> XmlDocument {
        XmlDocument::parse(r#"<r xmlns:p="urn:p"><p:a/><b/></r>"#, &ParseOptions::default()).unwrap()
    }

    #[test]
    fn test_select_returns_nodes() {
        let mut engine = QueryEngine::default();
        let d = doc();
        let bindings = vec![("x".to_string(), "urn:p".to_string())];
        let nodes = engine.select(&d, "/r/x:a", &bindings).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(d.node_name(nodes[0]), "p:a");
    }

    #[test]
    fn test_non_node_set_is_rejected() {
        let mut engine = QueryEngine::default();
        assert_eq!(
            engine.select(&doc(), "count(//b)", &[]).unwrap_err(),
            QueryError::NotANodeSet
        );
    }

    #[test]
    fn test_cache_reuses_and_evicts() {
        let mut engine = QueryEngine::new(2);
        let first = engine.compile("//a").unwrap();
        let again = engine.compile("//a").unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        engine.compile("//b").unwrap();
        engine.compile("//c").unwrap();
        assert_eq!(engine.cache.len(), 2);
        let recompiled = engine.compile("//a").unwrap();
        assert!(!Arc::ptr_eq(&first, &recompiled));
    }

    #[test]
    fn test_bindings_checked_on_cached_expression() {
        let mut engine = QueryEngine::default();
        let d = doc();
        let bindings = vec![("x".to_string(), "urn:p".to_string())];
        assert!(engine.select(&d, "//x:a", &bindings).is_ok());
        assert_eq!(
            engine.select(&d, "//x:a", &[]).unwrap_err(),
            QueryError::UnknownPrefix("x".to_string())
        );
    }

    #[test]
    fn test_syntax_errors_are_not_cached() {
        let mut engine = QueryEngine::default();
        assert!(engine.compile("//a[").is_err());
        assert_eq!(engine.cache.len(), 0);
    }
}
