//! Per-package interned name pool.
//!
//! Every string stored in a package (object names, class names, property
//! names) lives once in the package's [`NameTable`] and is referenced by a
//! [`NameRef`] index. Name equality is case-insensitive, matching the engine
//! convention, while the original spelling is preserved for display.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The reserved terminator name. A freshly built table always holds it at
/// index 0 so the property terminator tag can be encoded in any package.
pub const NONE_NAME: &str = "None";

/// Index into a package's [`NameTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameRef(pub u32);

impl NameRef {
    /// The table slot this reference points at.
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for NameRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name#{}", self.0)
    }
}

/// Ordered, index-addressable string pool.
///
/// Interning deduplicates case-insensitively: `intern("Tree")` followed by
/// `intern("TREE")` returns the same [`NameRef`], and `get` yields the first
/// spelling seen.
#[derive(Clone, Debug, Default)]
pub struct NameTable {
    entries: Vec<String>,
    lookup: HashMap<String, u32>,
}

impl NameTable {
    /// Create a table pre-seeded with [`NONE_NAME`] at index 0.
    pub fn new() -> Self {
        let mut table = Self {
            entries: Vec::new(),
            lookup: HashMap::new(),
        };
        table.intern(NONE_NAME);
        table
    }

    /// Build a table from entries read off disk, in table order.
    ///
    /// Duplicate spellings are kept positionally so indices stored in the
    /// package remain valid; only the first occurrence is found by `find`.
    pub fn from_entries(entries: Vec<String>) -> Self {
        let mut lookup = HashMap::with_capacity(entries.len());
        for (i, name) in entries.iter().enumerate() {
            lookup.entry(name.to_ascii_lowercase()).or_insert(i as u32);
        }
        Self { entries, lookup }
    }

    /// Intern a string, returning the existing reference if an equal
    /// (case-insensitive) name is already present.
    pub fn intern(&mut self, name: &str) -> NameRef {
        let key = name.to_ascii_lowercase();
        if let Some(&index) = self.lookup.get(&key) {
            return NameRef(index);
        }
        let index = self.entries.len() as u32;
        self.entries.push(name.to_string());
        self.lookup.insert(key, index);
        NameRef(index)
    }

    /// Resolve a reference to its spelling.
    pub fn get(&self, name: NameRef) -> Result<&str, TypeError> {
        self.entries
            .get(name.0 as usize)
            .map(String::as_str)
            .ok_or(TypeError::NameOutOfRange {
                index: name.0,
                len: self.entries.len(),
            })
    }

    /// Find an existing name without interning.
    pub fn find(&self, name: &str) -> Option<NameRef> {
        self.lookup.get(&name.to_ascii_lowercase()).map(|&i| NameRef(i))
    }

    /// Returns `true` if `name` resolves to the terminator name.
    pub fn is_none(&self, name: NameRef) -> bool {
        matches!(self.get(name), Ok(s) if s.eq_ignore_ascii_case(NONE_NAME))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in table order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_table_holds_none_at_zero() {
        let table = NameTable::new();
        assert_eq!(table.get(NameRef(0)).unwrap(), NONE_NAME);
        assert!(table.is_none(NameRef(0)));
    }

    #[test]
    fn intern_deduplicates_case_insensitively() {
        let mut table = NameTable::new();
        let a = table.intern("StaticMesh");
        let b = table.intern("STATICMESH");
        assert_eq!(a, b);
        assert_eq!(table.get(a).unwrap(), "StaticMesh");
    }

    #[test]
    fn intern_assigns_sequential_indices() {
        let mut table = NameTable::new();
        let a = table.intern("Alpha");
        let b = table.intern("Beta");
        assert_eq!(a, NameRef(1));
        assert_eq!(b, NameRef(2));
    }

    #[test]
    fn get_out_of_range_errors() {
        let table = NameTable::new();
        let err = table.get(NameRef(99)).unwrap_err();
        assert!(matches!(err, TypeError::NameOutOfRange { index: 99, .. }));
    }

    #[test]
    fn find_does_not_intern() {
        let mut table = NameTable::new();
        table.intern("Tree");
        assert_eq!(table.find("tree"), table.find("Tree"));
        assert!(table.find("Rock").is_none());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn from_entries_preserves_positions() {
        let table = NameTable::from_entries(vec![
            "None".into(),
            "Mesh".into(),
            "Mesh".into(),
        ]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(NameRef(2)).unwrap(), "Mesh");
        assert_eq!(table.find("mesh"), Some(NameRef(1)));
    }
}
