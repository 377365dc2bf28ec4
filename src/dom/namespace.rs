//! Namespace Resolution
//!
//! Stack-based resolver used while building the DOM. Besides resolving
//! prefixes it can list every binding in scope, which is what the namespace
//! nodes of an element are made from.

use super::strings::StringPool;

/// Well-known namespace URIs
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
}

#[derive(Debug, Clone)]
struct NsBinding {
    prefix_id: u32,
    /// 0 for `xmlns=""`, which takes the default namespace out of scope
    uri_id: u32,
    depth: u32,
}

/// Stack-based namespace resolver
#[derive(Debug)]
pub struct NamespaceResolver {
    bindings: Vec<NsBinding>,
    depth: u32,
    xml_prefix_id: u32,
    xmlns_prefix_id: u32,
}

impl NamespaceResolver {
    /// Create a resolver with the `xml` prefix pre-bound
    pub fn new(strings: &mut StringPool) -> Self {
        let xml_prefix_id = strings.intern("xml");
        let xmlns_prefix_id = strings.intern("xmlns");
        let xml_uri_id = strings.intern(ns::XML);

        NamespaceResolver {
            bindings: vec![NsBinding {
                prefix_id: xml_prefix_id,
                uri_id: xml_uri_id,
                depth: 0,
            }],
            depth: 0,
            xml_prefix_id,
            xmlns_prefix_id,
        }
    }

    /// Enter a new element scope
    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Leave an element scope, dropping bindings declared in it
    pub fn pop_scope(&mut self) {
        while self.bindings.last().is_some_and(|b| b.depth >= self.depth) {
            self.bindings.pop();
        }
        self.depth = self.depth.saturating_sub(1);
    }

    /// Bind a prefix (0 = default namespace) in the current scope.
    /// Declarations of the reserved `xml` and `xmlns` prefixes are ignored.
    pub fn declare(&mut self, prefix_id: u32, uri_id: u32) {
        if prefix_id == self.xml_prefix_id || prefix_id == self.xmlns_prefix_id {
            return;
        }
        self.bindings.push(NsBinding {
            prefix_id,
            uri_id,
            depth: self.depth,
        });
    }

    /// Resolve a prefix to a URI ID
    pub fn resolve(&self, prefix_id: u32) -> Option<u32> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix_id == prefix_id)
            .map(|b| b.uri_id)
            .filter(|&uri| uri != 0)
    }

    pub fn resolve_default(&self) -> Option<u32> {
        self.resolve(0)
    }

    /// Every binding in scope as (prefix ID, URI ID).
    ///
    /// Innermost scope first, declaration order within a scope; `xml` is
    /// always last. Shadowed and undeclared prefixes are left out.
    pub fn in_scope(&self) -> Vec<(u32, u32)> {
        let mut seen: Vec<u32> = Vec::new();
        let mut out = Vec::new();
        let mut end = self.bindings.len();

        while end > 0 {
            let depth = self.bindings[end - 1].depth;
            let mut start = end;
            while start > 0 && self.bindings[start - 1].depth == depth {
                start -= 1;
            }
            for b in &self.bindings[start..end] {
                if seen.contains(&b.prefix_id) {
                    continue;
                }
                seen.push(b.prefix_id);
                if b.uri_id != 0 {
                    out.push((b.prefix_id, b.uri_id));
                }
            }
            end = start;
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xml_prefix_prebound() {
        let mut strings = StringPool::new();
        let resolver = NamespaceResolver::new(&mut strings);
        let xml = strings.intern("xml");
        assert_eq!(resolver.resolve(xml).map(|id| strings.get(id)), Some(ns::XML));
    }

    #[test]
    fn test_scope_pop() {
        let mut strings = StringPool::new();
        let mut resolver = NamespaceResolver::new(&mut strings);
        let prefix = strings.intern("foo");
        let uri = strings.intern("http://example.com/foo");

        resolver.push_scope();
        resolver.declare(prefix, uri);
        assert_eq!(resolver.resolve(prefix), Some(uri));

        resolver.pop_scope();
        assert_eq!(resolver.resolve(prefix), None);
    }

    #[test]
    fn test_shadow_binding() {
        let mut strings = StringPool::new();
        let mut resolver = NamespaceResolver::new(&mut strings);
        let prefix = strings.intern("ns");
        let uri1 = strings.intern("urn:1");
        let uri2 = strings.intern("urn:2");

        resolver.push_scope();
        resolver.declare(prefix, uri1);
        resolver.push_scope();
        resolver.declare(prefix, uri2);
        assert_eq!(resolver.resolve(prefix), Some(uri2));
        resolver.pop_scope();
        assert_eq!(resolver.resolve(prefix), Some(uri1));
    }

    #[test]
    fn test_default_undeclared() {
        let mut strings = StringPool::new();
        let mut resolver = NamespaceResolver::new(&mut strings);
        let uri = strings.intern("urn:d");

        resolver.push_scope();
        resolver.declare(0, uri);
        resolver.push_scope();
        resolver.declare(0, 0);
        assert_eq!(resolver.resolve_default(), None);
        assert_eq!(resolver.in_scope().len(), 1);
        resolver.pop_scope();
        assert_eq!(resolver.resolve_default(), Some(uri));
    }

    #[test]
    fn test_in_scope_order() {
        let mut strings = StringPool::new();
        let mut resolver = NamespaceResolver::new(&mut strings);
        let (a, b, c) = (strings.intern("a"), strings.intern("b"), strings.intern("c"));
        let (ua, ub, uc) = (strings.intern("urn:a"), strings.intern("urn:b"), strings.intern("urn:c"));
        let xml = strings.intern("xml");
        let xml_uri = strings.intern(ns::XML);

        resolver.push_scope();
        resolver.declare(a, ua);
        resolver.push_scope();
        resolver.declare(b, ub);
        resolver.declare(c, uc);

        assert_eq!(
            resolver.in_scope(),
            vec![(b, ub), (c, uc), (a, ua), (xml, xml_uri)]
        );
    }
}
