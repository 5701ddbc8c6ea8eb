//! BTreeMap-based secondary indexes
//!
//! One `IndexTree` per foreign-key column. Keys are typed field values,
//! entries are row ordinals within the table, always sorted ascending.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::schema::FieldValue;

/// Position of a row within its table
pub type RowOrdinal = usize;

/// A single column index
#[derive(Debug, Default, Clone)]
pub struct IndexTree {
    tree: BTreeMap<FieldValue, Vec<RowOrdinal>>,
}

impl IndexTree {
    pub fn new() -> Self {
        Self {
            tree: BTreeMap::new(),
        }
    }

    /// Insert an ordinal for a key, keeping ordinals sorted ascending.
    pub fn insert(&mut self, key: FieldValue, ordinal: RowOrdinal) {
        let ordinals = self.tree.entry(key).or_default();
        match ordinals.binary_search(&ordinal) {
            Ok(_) => {}
            Err(pos) => ordinals.insert(pos, ordinal),
        }
    }

    /// Ordinals for an exact key match, sorted ascending
    pub fn lookup_eq(&self, key: &FieldValue) -> &[RowOrdinal] {
        self.tree.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ordinals for keys in `[min, max]`, either bound optional.
    ///
    /// Returns ordinals sorted ascending.
    pub fn lookup_range(&self, min: Option<&FieldValue>, max: Option<&FieldValue>) -> Vec<RowOrdinal> {
        let lower = min.map_or(Bound::Unbounded, Bound::Included);
        let upper = max.map_or(Bound::Unbounded, Bound::Included);

        let mut result: Vec<RowOrdinal> = self
            .tree
            .range((lower, upper))
            .flat_map(|(_, ordinals)| ordinals.iter().copied())
            .collect();
        result.sort_unstable();
        result
    }

    /// Number of distinct keys
    pub fn key_count(&self) -> usize {
        self.tree.len()
    }

    /// Total number of indexed rows
    pub fn entry_count(&self) -> usize {
        self.tree.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let mut tree = IndexTree::new();
        tree.insert(FieldValue::Int(1), 7);
        tree.insert(FieldValue::Int(1), 2);
        tree.insert(FieldValue::Int(1), 2);
        tree.insert(FieldValue::Int(2), 5);

        assert_eq!(tree.lookup_eq(&FieldValue::Int(1)), &[2, 7]);
        assert_eq!(tree.lookup_eq(&FieldValue::Int(3)), &[] as &[RowOrdinal]);
        assert_eq!(tree.key_count(), 2);
        assert_eq!(tree.entry_count(), 3);
    }

    #[test]
    fn test_typed_keys_do_not_coerce() {
        let mut tree = IndexTree::new();
        tree.insert(FieldValue::Text("3001".into()), 0);
        assert!(tree.lookup_eq(&FieldValue::Int(3001)).is_empty());
    }

    #[test]
    fn test_range_lookup_sorted() {
        let mut tree = IndexTree::new();
        tree.insert(FieldValue::Int(10), 4);
        tree.insert(FieldValue::Int(20), 1);
        tree.insert(FieldValue::Int(30), 0);

        let hits = tree.lookup_range(Some(&FieldValue::Int(10)), Some(&FieldValue::Int(20)));
        assert_eq!(hits, vec![1, 4]);
        assert_eq!(tree.lookup_range(None, None), vec![0, 1, 4]);
    }
}
