//! Stream-local string interning.
//!
//! Node blocks never carry text inline; they carry a [`StringId`] that is
//! resolved against the string table written at the end of the stream. IDs
//! are only meaningful inside the stream that defines them, so a table is
//! cleared at the start of every encode and decode pass.

use std::collections::{BTreeMap, HashMap};

use super::format::FIRST_STRING_ID;
use crate::util::{Error, Result};

/// Identifier of an interned string inside one stream.
pub type StringId = u32;

/// Bidirectional string <-> ID map.
#[derive(Debug, Clone)]
pub struct StringTable {
    ids: HashMap<String, StringId>,
    strings: BTreeMap<StringId, String>,
    next_id: StringId,
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StringTable {
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            strings: BTreeMap::new(),
            next_id: FIRST_STRING_ID,
        }
    }

    /// Return the ID of `value`, assigning the next sequential one if the
    /// value has not been seen in this pass.
    pub fn intern(&mut self, value: &str) -> StringId {
        if let Some(&id) = self.ids.get(value) {
            return id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.ids.insert(value.to_string(), id);
        self.strings.insert(id, value.to_string());
        id
    }

    /// Look up the text for `id`.
    pub fn resolve(&self, id: StringId) -> Result<&str> {
        self.strings
            .get(&id)
            .map(String::as_str)
            .ok_or(Error::StringNotFound(id))
    }

    /// Register a pair read from a stream.
    pub fn insert(&mut self, id: StringId, value: String) {
        if id >= self.next_id {
            self.next_id = id.saturating_add(1);
        }
        self.ids.insert(value.clone(), id);
        self.strings.insert(id, value);
    }

    /// Drop every entry and restart IDs at the initial value.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.strings.clear();
        self.next_id = FIRST_STRING_ID;
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Entries in ascending ID order.
    pub fn iter(&self) -> impl Iterator<Item = (StringId, &str)> {
        self.strings.iter().map(|(&id, s)| (id, s.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedup() {
        let mut table = StringTable::new();
        let a = table.intern("diffuse");
        let b = table.intern("ambient");
        let c = table.intern("diffuse");
        assert_eq!(a, FIRST_STRING_ID);
        assert_eq!(b, FIRST_STRING_ID + 1);
        assert_eq!(a, c);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_resolve_unknown() {
        let table = StringTable::new();
        assert!(matches!(table.resolve(3), Err(Error::StringNotFound(3))));
    }

    #[test]
    fn test_clear_restarts_ids() {
        let mut table = StringTable::new();
        table.intern("a");
        table.intern("b");
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.intern("b"), FIRST_STRING_ID);
    }

    #[test]
    fn test_insert_then_intern() {
        let mut table = StringTable::new();
        table.insert(5, "five".to_string());
        assert_eq!(table.resolve(5).unwrap(), "five");
        assert_eq!(table.intern("five"), 5);
        assert_eq!(table.intern("six"), 6);
    }

    #[test]
    fn test_iter_in_id_order() {
        let mut table = StringTable::new();
        table.intern("z");
        table.intern("a");
        let entries: Vec<_> = table.iter().collect();
        assert_eq!(entries, vec![(1, "z"), (2, "a")]);
    }
}
