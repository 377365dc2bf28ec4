//! Namespace prefix table
//!
//! The prefixes a user can write in XPath expressions, one entry per
//! namespace URI found in the document plus any the user added by hand.
//! At most one entry is the default: its prefix gets injected into bare
//! names by the expression rewriter.

use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::core::entities::escape_markup;
use crate::error::NamespaceError;

/// Prefixes users may type: an ASCII letter, then letters and digits
static LEGAL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]*$").expect("Invalid prefix pattern"));

/// One prefix binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlnsInfo {
    pub prefix: String,
    pub uri: String,
    /// The prefix was made up (by discovery or the user) rather than
    /// taken from the document
    pub contrived: bool,
    pub is_default: bool,
}

impl XmlnsInfo {
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>, contrived: bool) -> Self {
        XmlnsInfo {
            prefix: prefix.into(),
            uri: uri.into(),
            contrived,
            is_default: false,
        }
    }
}

/// Ordered list of prefix bindings. `Clone` is the deep copy handed to a
/// new session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceTable {
    entries: Vec<XmlnsInfo>,
}

impl NamespaceTable {
    pub fn new() -> Self {
        NamespaceTable { entries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[XmlnsInfo] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &XmlnsInfo> {
        self.entries.iter()
    }

    pub fn contains_prefix(&self, prefix: &str) -> bool {
        self.find_prefix(prefix).is_some()
    }

    pub fn contains_ns(&self, uri: &str) -> bool {
        self.find_ns(uri).is_some()
    }

    pub fn find_prefix(&self, prefix: &str) -> Option<&XmlnsInfo> {
        self.entries.iter().find(|e| e.prefix == prefix)
    }

    /// First entry bound to `uri`
    pub fn find_ns(&self, uri: &str) -> Option<&XmlnsInfo> {
        self.entries.iter().find(|e| e.uri == uri)
    }

    /// Append an entry. Both the prefix and the URI must be new; a second
    /// default flag is dropped so the table keeps a single default.
    pub fn add(&mut self, mut info: XmlnsInfo) -> Result<(), NamespaceError> {
        if self.contains_prefix(&info.prefix) {
            return Err(NamespaceError::DuplicatePrefix { prefix: info.prefix });
        }
        if let Some(owner) = self.find_ns(&info.uri) {
            return Err(NamespaceError::DuplicateNamespace {
                uri: info.uri,
                prefix: owner.prefix.clone(),
            });
        }
        if info.is_default && self.default().is_some() {
            info.is_default = false;
        }
        self.entries.push(info);
        Ok(())
    }

    /// Add a user-supplied binding
    pub fn add_namespace(&mut self, prefix: &str, uri: &str) -> Result<(), NamespaceError> {
        check_legal(prefix)?;
        if uri.is_empty() {
            return Err(NamespaceError::EmptyNamespace {
                prefix: prefix.to_string(),
            });
        }
        self.add(XmlnsInfo::new(prefix, uri, true))?;
        debug!("added namespace {}={}", prefix, uri);
        Ok(())
    }

    /// Remove every entry with `prefix`; returns whether any existed
    pub fn remove_by_prefix(&mut self, prefix: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.prefix != prefix);
        let removed = self.entries.len() != before;
        if removed {
            debug!("removed namespace prefix {}", prefix);
        }
        removed
    }

    /// Change an entry's prefix. Another entry may already use `new` only
    /// if it is bound to the same URI.
    pub fn rename_prefix(&mut self, old: &str, new: &str) -> Result<(), NamespaceError> {
        check_legal(new)?;
        let index = self
            .entries
            .iter()
            .position(|e| e.prefix == old)
            .ok_or_else(|| NamespaceError::UnknownPrefix {
                prefix: old.to_string(),
            })?;
        if let Some(owner) = self.find_prefix(new) {
            if owner.uri != self.entries[index].uri {
                return Err(NamespaceError::DuplicatePrefix {
                    prefix: new.to_string(),
                });
            }
        }
        self.entries[index].prefix = new.to_string();
        Ok(())
    }

    pub fn clear_default(&mut self) {
        for entry in &mut self.entries {
            entry.is_default = false;
        }
    }

    /// Make `prefix` the one default entry
    pub fn set_default(&mut self, prefix: &str) -> Result<(), NamespaceError> {
        if !self.contains_prefix(prefix) {
            return Err(NamespaceError::UnknownPrefix {
                prefix: prefix.to_string(),
            });
        }
        for entry in &mut self.entries {
            entry.is_default = entry.prefix == prefix;
        }
        Ok(())
    }

    pub fn default(&self) -> Option<&XmlnsInfo> {
        self.entries.iter().find(|e| e.is_default)
    }

    /// `(prefix, uri)` pairs for the XPath engine. The default entry is
    /// bound under its prefix like every other one.
    pub fn bindings(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|e| (e.prefix.clone(), e.uri.clone()))
            .collect()
    }

    /// Wrap `text` in a `<root>` element declaring every binding, so
    /// extracted fragments stay well-formed and keep their namespaces
    pub fn envelope(&self, text: &str) -> String {
        let mut out = String::from("<root ");
        for entry in &self.entries {
            if entry.is_default {
                out.push_str("xmlns='");
            } else {
                out.push_str("xmlns:");
                out.push_str(&entry.prefix);
                out.push_str("='");
            }
            out.push_str(&escape_markup(&entry.uri));
            out.push_str("'\n");
        }
        out.push('>');
        out.push_str(text);
        out.push_str("</root>");
        out
    }

    pub(crate) fn push_unchecked(&mut self, info: XmlnsInfo) {
        self.entries.push(info);
    }
}

fn check_legal(prefix: &str) -> Result<(), NamespaceError> {
    if LEGAL_PREFIX.is_match(prefix) {
        Ok(())
    } else {
        Err(NamespaceError::IllegalPrefix {
            prefix: prefix.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table() -> NamespaceTable {
        let mut t = NamespaceTable::new();
        t.add(XmlnsInfo::new("a", "urn:a", false)).unwrap();
        t.add(XmlnsInfo::new("ns1", "urn:d", true)).unwrap();
        t
    }

    #[test]
    fn test_lookup() {
        let t = table();
        assert!(t.contains_prefix("a"));
        assert!(!t.contains_prefix("b"));
        assert_eq!(t.find_ns("urn:d").map(|e| e.prefix.as_str()), Some("ns1"));
        assert!(t.contains_ns("urn:a"));
    }

    #[test]
    fn test_add_rejects_duplicate_prefix() {
        let mut t = table();
        let err = t.add(XmlnsInfo::new("a", "urn:other", true)).unwrap_err();
        assert_eq!(err, NamespaceError::DuplicatePrefix { prefix: "a".to_string() });
    }

    #[test]
    fn test_add_rejects_bound_uri() {
        let mut t = NamespaceTable::new();
        t.add_namespace("a", "urn:x").unwrap();
        assert_eq!(
            t.add_namespace("b", "urn:x"),
            Err(NamespaceError::DuplicateNamespace {
                uri: "urn:x".to_string(),
                prefix: "a".to_string(),
            })
        );
        assert_eq!(t.len(), 1);
        assert!(!t.contains_prefix("b"));
    }

    #[test]
    fn test_new_is_empty() {
        let t = NamespaceTable::new();
        assert!(t.is_empty());
        assert!(t.default().is_none());
        assert_eq!(t, <NamespaceTable as Default>::default());
    }

    #[test]
    fn test_add_namespace_validates_prefix() {
        let mut t = table();
        assert!(t.add_namespace("x1", "urn:x").is_ok());
        assert!(t.find_prefix("x1").unwrap().contrived);
        for bad in ["", "1x", "x-y", "x:y"] {
            assert_eq!(
                t.add_namespace(bad, "urn:x"),
                Err(NamespaceError::IllegalPrefix { prefix: bad.to_string() })
            );
        }
        assert!(matches!(
            t.add_namespace("y", ""),
            Err(NamespaceError::EmptyNamespace { .. })
        ));
    }

    #[test]
    fn test_remove_by_prefix() {
        let mut t = table();
        assert!(t.remove_by_prefix("a"));
        assert!(!t.remove_by_prefix("a"));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_rename_prefix() {
        let mut t = table();
        t.rename_prefix("ns1", "d").unwrap();
        assert_eq!(t.find_ns("urn:d").unwrap().prefix, "d");
        assert_eq!(
            t.rename_prefix("d", "a"),
            Err(NamespaceError::DuplicatePrefix { prefix: "a".to_string() })
        );
        assert!(matches!(t.rename_prefix("d", "9"), Err(NamespaceError::IllegalPrefix { .. })));
        assert!(matches!(t.rename_prefix("zz", "q"), Err(NamespaceError::UnknownPrefix { .. })));
    }

    #[test]
    fn test_single_default() {
        let mut t = table();
        t.set_default("a").unwrap();
        t.set_default("ns1").unwrap();
        assert_eq!(t.iter().filter(|e| e.is_default).count(), 1);
        assert_eq!(t.default().unwrap().prefix, "ns1");
        t.clear_default();
        assert!(t.default().is_none());
        assert!(t.set_default("missing").is_err());
    }

    #[test]
    fn test_bindings_include_default() {
        let mut t = table();
        t.set_default("ns1").unwrap();
        assert_eq!(
            t.bindings(),
            vec![
                ("a".to_string(), "urn:a".to_string()),
                ("ns1".to_string(), "urn:d".to_string()),
            ]
        );
    }

    #[test]
    fn test_envelope() {
        let mut t = table();
        t.set_default("ns1").unwrap();
        assert_eq!(
            t.envelope("<x/>"),
            "<root xmlns:a='urn:a'\nxmlns='urn:d'\n><x/></root>"
        );
    }

    #[test]
    fn test_clone_is_independent() {
        let original = table();
        let mut copy = original.clone();
        copy.remove_by_prefix("a");
        assert_eq!(original.len(), 2);
        assert_eq!(copy.len(), 1);
    }
}
