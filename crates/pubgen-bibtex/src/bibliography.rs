/*
 * bibliography.rs
 * Copyright (c) 2025 Posit, PBC
 */

use crate::error::Result;
use crate::parser::parse_file;
use crate::record::BibEntry;
use std::collections::BTreeMap;
use std::path::Path;

/// Entries keyed by citation key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bibliography {
    entries: BTreeMap<String, BibEntry>,
}

impl Bibliography {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every source in order; later sources win on duplicate keys.
    pub fn load_all<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut bibliography = Self::new();
        for path in paths {
            bibliography.merge(parse_file(path.as_ref())?);
        }
        Ok(bibliography)
    }

    /// Add an entry, replacing any entry with the same key.
    pub fn insert(&mut self, entry: BibEntry) -> Option<BibEntry> {
        self.entries.insert(entry.key().to_string(), entry)
    }

    pub fn merge(&mut self, other: Bibliography) {
        for (key, entry) in other.entries {
            if self.entries.insert(key, entry).is_some() {
                tracing::debug!("Replaced an entry with one from a later source");
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&BibEntry> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BibEntry> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::EntryKind;

    fn entry(key: &str, title: &str) -> BibEntry {
        let mut entry = BibEntry::new(EntryKind::Misc, key);
        entry.add_field("title", title);
        entry
    }

    #[test]
    fn test_merge_later_wins() {
        let mut first = Bibliography::new();
        first.insert(entry("a", "old"));
        first.insert(entry("b", "kept"));
        let mut second = Bibliography::new();
        second.insert(entry("a", "new"));
        first.merge(second);

        assert_eq!(first.len(), 2);
        assert_eq!(first.get("a").map(BibEntry::title), Some("new"));
        assert_eq!(first.get("b").map(BibEntry::title), Some("kept"));
        assert_eq!(first.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
