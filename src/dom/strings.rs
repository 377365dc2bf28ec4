//! String Interning Pool
//!
//! Deduplicated storage for names, values and namespace URIs. All strings
//! live in one growing buffer; an ID is an index into the entry table.
//!
//! ID 0 is reserved for the empty string, so "no prefix", "no namespace"
//! and "no value" all compare equal to 0.

use std::collections::HashMap;
use std::hash::{BuildHasher, RandomState};

/// String interning pool
#[derive(Debug)]
pub struct StringPool {
    /// (offset, len) into `data`, indexed by ID
    entries: Vec<(u32, u32)>,
    data: String,
    /// Hash of content -> IDs with that hash (collisions are rare)
    hash_index: HashMap<u64, Vec<u32>>,
    hasher: RandomState,
}

impl Default for StringPool {
    fn default() -> Self {
        Self::new()
    }
}

impl StringPool {
    pub fn new() -> Self {
        let mut entries = Vec::with_capacity(256);
        entries.push((0, 0));
        StringPool {
            entries,
            data: String::with_capacity(4096),
            hash_index: HashMap::new(),
            hasher: RandomState::new(),
        }
    }

    /// Intern a string, returning its ID
    pub fn intern(&mut self, s: &str) -> u32 {
        if s.is_empty() {
            return 0;
        }

        let hash = self.hasher.hash_one(s);
        if let Some(ids) = self.hash_index.get(&hash) {
            for &id in ids {
                if self.get(id) == s {
                    return id;
                }
            }
        }

        let id = self.entries.len() as u32;
        self.entries.push((self.data.len() as u32, s.len() as u32));
        self.data.push_str(s);
        self.hash_index.entry(hash).or_default().push(id);
        id
    }

    /// Look up an ID without interning. Returns None for strings never seen.
    pub fn find(&self, s: &str) -> Option<u32> {
        if s.is_empty() {
            return Some(0);
        }
        let hash = self.hasher.hash_one(s);
        self.hash_index
            .get(&hash)?
            .iter()
            .copied()
            .find(|&id| self.get(id) == s)
    }

    /// Resolve an ID. Unknown IDs resolve to the empty string.
    #[inline]
    pub fn get(&self, id: u32) -> &str {
        match self.entries.get(id as usize) {
            Some(&(offset, len)) => &self.data[offset as usize..(offset + len) as usize],
            None => "",
        }
    }

    /// Number of interned strings, including the reserved empty entry
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedupes() {
        let mut pool = StringPool::new();
        let a = pool.intern("item");
        let b = pool.intern("other");
        assert_ne!(a, b);
        assert_eq!(pool.intern("item"), a);
        assert_eq!(pool.get(a), "item");
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_empty_is_zero() {
        let mut pool = StringPool::new();
        assert_eq!(pool.intern(""), 0);
        assert_eq!(pool.get(0), "");
        assert!(pool.is_empty());
    }

    #[test]
    fn test_find() {
        let mut pool = StringPool::new();
        let id = pool.intern("urn:x");
        assert_eq!(pool.find("urn:x"), Some(id));
        assert_eq!(pool.find("urn:y"), None);
    }

    #[test]
    fn test_unknown_id() {
        let pool = StringPool::new();
        assert_eq!(pool.get(42), "");
    }
}
