//! Namespace discovery
//!
//! Builds a fresh [`NamespaceTable`] from the namespace nodes of a parsed
//! document. Every distinct URI gets exactly one prefix; unprefixed
//! (default) namespaces get a made-up one so they can be addressed in
//! XPath at all.

use log::{debug, warn};

use super::table::{NamespaceTable, XmlnsInfo};
use crate::dom::{DocumentAccess, NodeKind};
use crate::xpath;

/// In-scope namespace nodes other than `xml`, minus those merely inherited
/// from the parent element
pub const DISCOVERY_QUERY: &str = "//namespace::*[name() != 'xml'][not(../../namespace::*=.)]";

/// Collect the document's namespaces into a new table.
///
/// `previous` is consulted so that a prefix made up for a default
/// namespace (or renamed by the user) survives rediscovery. If the query
/// fails the previous table is returned unchanged.
pub fn discover_namespaces<D: DocumentAccess>(doc: &D, previous: &NamespaceTable) -> NamespaceTable {
    let nodes = match xpath::evaluate(doc, DISCOVERY_QUERY, &[]).map(|v| v.into_nodeset()) {
        Ok(Some(nodes)) => nodes,
        Ok(None) => return previous.clone(),
        Err(e) => {
            warn!("namespace discovery failed: {}", e);
            return previous.clone();
        }
    };

    let mut table = NamespaceTable::new();
    let mut counter = 1;

    for node in nodes {
        if doc.node_kind_of(node) != Some(NodeKind::Namespace) {
            continue;
        }
        let uri = doc.node_value(node);
        if table.contains_ns(uri) {
            continue;
        }

        let natural = doc.node_name(node);
        let mut dupes = 0;
        let mut prefix = natural.to_string();
        while prefix.is_empty() || table.contains_prefix(&prefix) {
            let reused = match previous.find_ns(uri) {
                Some(old) if prefix.is_empty() && !old.prefix.is_empty() => Some(old.prefix.clone()),
                _ => None,
            };
            prefix = match reused {
                Some(old) => old,
                None if natural.is_empty() => {
                    counter += 1;
                    format!("ns{}", counter - 1)
                }
                None => {
                    dupes += 1;
                    format!("{}-{}", natural, dupes - 1)
                }
            };
        }

        let is_default = natural.is_empty() && table.default().is_none();
        debug!(
            "discovered namespace {} as {:?}{}",
            uri,
            prefix,
            if is_default { " (default)" } else { "" }
        );
        let mut info = XmlnsInfo::new(prefix, uri, natural.is_empty());
        info.is_default = is_default;
        table.push_unchecked(info);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ParseOptions, XmlDocument};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn discover(xml: &str, previous: &NamespaceTable) -> NamespaceTable {
        let doc = XmlDocument::parse(xml, &ParseOptions::default()).unwrap();
        discover_namespaces(&doc, previous)
    }

    fn summary(table: &NamespaceTable) -> Vec<(String, String, bool, bool)> {
        table
            .iter()
            .map(|e| (e.prefix.clone(), e.uri.clone(), e.contrived, e.is_default))
            .collect()
    }

    fn entry(prefix: &str, uri: &str, contrived: bool, is_default: bool) -> (String, String, bool, bool) {
        (prefix.to_string(), uri.to_string(), contrived, is_default)
    }

    #[test]
    fn test_no_namespaces() {
        assert!(discover("<r><a/></r>", &NamespaceTable::new()).is_empty());
    }

    #[test]
    fn test_default_namespace_gets_contrived_prefix() {
        let table = discover(r#"<r xmlns="urn:d" xmlns:p="urn:p"><p:a/></r>"#, &NamespaceTable::new());
        assert_eq!(
            summary(&table),
            vec![entry("ns1", "urn:d", true, true), entry("p", "urn:p", false, false)]
        );
    }

    #[test]
    fn test_inherited_declarations_are_not_repeated() {
        let table = discover(
            r#"<r xmlns:p="urn:p"><a><b xmlns:q="urn:q"/></a></r>"#,
            &NamespaceTable::new(),
        );
        assert_eq!(
            summary(&table),
            vec![entry("p", "urn:p", false, false), entry("q", "urn:q", false, false)]
        );
    }

    #[test]
    fn test_colliding_prefix_gets_suffix() {
        let table = discover(
            r#"<r xmlns:p="urn:one"><a xmlns:p="urn:two"/><b xmlns:p="urn:three"/></r>"#,
            &NamespaceTable::new(),
        );
        assert_eq!(
            summary(&table),
            vec![
                entry("p", "urn:one", false, false),
                entry("p-0", "urn:two", false, false),
                entry("p-1", "urn:three", false, false),
            ]
        );
    }

    #[test]
    fn test_only_first_default_is_default() {
        let table = discover(r#"<r xmlns="urn:a"><x xmlns="urn:b"/></r>"#, &NamespaceTable::new());
        assert_eq!(
            summary(&table),
            vec![entry("ns1", "urn:a", true, true), entry("ns2", "urn:b", true, false)]
        );
    }

    #[test]
    fn test_same_uri_under_two_prefixes_keeps_first() {
        let table = discover(r#"<r xmlns:a="urn:x"><b:c xmlns:b="urn:x"/></r>"#, &NamespaceTable::new());
        assert_eq!(summary(&table), vec![entry("a", "urn:x", false, false)]);
    }

    #[test]
    fn test_previous_prefix_is_reused_for_default() {
        let mut previous = NamespaceTable::new();
        previous.add(XmlnsInfo::new("soap", "urn:d", true)).unwrap();
        let table = discover(r#"<r xmlns="urn:d"/>"#, &previous);
        assert_eq!(summary(&table), vec![entry("soap", "urn:d", true, true)]);
    }

    #[test]
    fn test_reused_prefix_that_is_taken_falls_back() {
        let mut previous = NamespaceTable::new();
        previous.add(XmlnsInfo::new("p", "urn:d", true)).unwrap();
        let table = discover(r#"<r xmlns:p="urn:p"><a xmlns="urn:d"/></r>"#, &previous);
        assert_eq!(
            summary(&table),
            vec![entry("p", "urn:p", false, false), entry("ns1", "urn:d", true, true)]
        );
    }

    fn check_invariants(table: &NamespaceTable) -> Result<(), TestCaseError> {
        let prefixes: HashSet<&str> = table.iter().map(|e| e.prefix.as_str()).collect();
        let uris: HashSet<&str> = table.iter().map(|e| e.uri.as_str()).collect();
        prop_assert_eq!(prefixes.len(), table.len());
        prop_assert_eq!(uris.len(), table.len());
        prop_assert!(table.iter().filter(|e| e.is_default).count() <= 1);
        prop_assert!(table.iter().all(|e| !e.prefix.is_empty()));
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_prefixes_unique_and_single_default(
            decls in proptest::collection::vec(
                (prop_oneof![Just(""), Just("p"), Just("q")], 0usize..4),
                1..8,
            ),
            added in proptest::collection::vec(
                (prop_oneof![Just("p"), Just("q"), Just("x"), Just("y")], 0usize..6),
                0..6,
            ),
        ) {
            // one nested element per declaration
            let mut xml = String::new();
            for (prefix, uri) in &decls {
                if prefix.is_empty() {
                    xml.push_str(&format!("<e xmlns=\"urn:{}\">", uri));
                } else {
                    xml.push_str(&format!("<e xmlns:{}=\"urn:{}\">", prefix, uri));
                }
            }
            for _ in &decls {
                xml.push_str("</e>");
            }

            let mut table = discover(&xml, &NamespaceTable::new());
            check_invariants(&table)?;

            // user edits followed by a rediscovery keep the table consistent
            for (prefix, uri) in &added {
                let uri = format!("urn:{}", uri);
                if table.add_namespace(prefix, &uri).is_err() {
                    prop_assert!(table.contains_prefix(prefix) || table.contains_ns(&uri));
                }
                check_invariants(&table)?;
            }
            let rediscovered = discover(&xml, &table);
            check_invariants(&rediscovered)?;
        }
    }
}
