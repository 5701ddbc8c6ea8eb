//! Entity tables
//!
//! A table owns its rows in insertion order, a primary-key map, and one
//! secondary index per foreign-key column. Tables are only mutated while
//! their generation is being built.

use std::collections::BTreeMap;

use crate::record::{
    with_entity, Color, Element, Entity, Inventory, InventoryMinifig, InventoryPart, InventorySet,
    Minifig, Part, PartCategory, PartRelationship, Record, Set, Theme,
};
use crate::schema::{schema_for, EntityKind, FieldValue, ForeignKey, RowKey};

use super::errors::{StorageError, StorageResult};
use super::index::{IndexTree, RowOrdinal};

/// Rows of one entity kind
#[derive(Debug, Clone)]
pub struct Table<T> {
    rows: Vec<T>,
    keyed: bool,
    primary: BTreeMap<RowKey, RowOrdinal>,
    indexes: BTreeMap<&'static str, IndexTree>,
}

impl<T: Entity> Table<T> {
    pub fn new() -> Self {
        let schema = schema_for(T::KIND);
        let indexes = schema
            .indexed_columns()
            .map(|column| (column, IndexTree::new()))
            .collect();
        Self {
            rows: Vec::new(),
            keyed: schema.is_keyed(),
            primary: BTreeMap::new(),
            indexes,
        }
    }

    /// Append a row. Fails with `BRICK_DUPLICATE_KEY` if its key is taken.
    /// Rows of a keyless kind are always appended.
    pub(crate) fn insert(&mut self, row: T) -> StorageResult<()> {
        let key = self.keyed.then(|| row.key());
        if let Some(key) = &key {
            if self.primary.contains_key(key) {
                return Err(StorageError::duplicate_key(T::KIND, key));
            }
        }

        let ordinal = self.rows.len();
        for (column, index) in self.indexes.iter_mut() {
            match row.field(column) {
                Some(value) if !value.is_null() => index.insert(value, ordinal),
                _ => {}
            }
        }
        if let Some(key) = key {
            self.primary.insert(key, ordinal);
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn get(&self, key: &RowKey) -> Option<&T> {
        self.primary.get(key).map(|&ordinal| &self.rows[ordinal])
    }

    pub fn contains_key(&self, key: &RowKey) -> bool {
        self.primary.contains_key(key)
    }

    /// All rows in insertion order
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn row(&self, ordinal: RowOrdinal) -> Option<&T> {
        self.rows.get(ordinal)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_indexed(&self, column: &str) -> bool {
        self.indexes.contains_key(column)
    }

    /// Ordinals of rows whose `column` equals `value`, ascending.
    ///
    /// `None` if the column carries no index.
    pub fn lookup(&self, column: &str, value: &FieldValue) -> Option<&[RowOrdinal]> {
        self.indexes.get(column).map(|index| index.lookup_eq(value))
    }

    pub fn index(&self, column: &str) -> Option<&IndexTree> {
        self.indexes.get(column)
    }
}

impl<T: Entity> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Kind-erased view of a table, used where code walks every kind
pub trait AnyTable {
    fn kind(&self) -> EntityKind;
    fn len(&self) -> usize;
    fn contains_key(&self, key: &RowKey) -> bool;
    fn key_at(&self, ordinal: RowOrdinal) -> Option<RowKey>;
    fn field_at(&self, ordinal: RowOrdinal, field: &str) -> Option<FieldValue>;
    fn record_at(&self, ordinal: RowOrdinal) -> Option<Record>;
}

impl<T: Entity> AnyTable for Table<T> {
    fn kind(&self) -> EntityKind {
        T::KIND
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn contains_key(&self, key: &RowKey) -> bool {
        self.primary.contains_key(key)
    }

    fn key_at(&self, ordinal: RowOrdinal) -> Option<RowKey> {
        self.rows.get(ordinal).map(|row| {
            if self.keyed {
                row.key()
            } else {
                RowKey::single(FieldValue::Int(ordinal as i64))
            }
        })
    }

    fn field_at(&self, ordinal: RowOrdinal, field: &str) -> Option<FieldValue> {
        self.rows.get(ordinal).and_then(|row| row.field(field))
    }

    fn record_at(&self, ordinal: RowOrdinal) -> Option<Record> {
        self.rows.get(ordinal).map(|row| row.clone().into_record())
    }
}

/// Every table of one generation
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub(crate) part_categories: Table<PartCategory>,
    pub(crate) colors: Table<Color>,
    pub(crate) themes: Table<Theme>,
    pub(crate) parts: Table<Part>,
    pub(crate) part_relationships: Table<PartRelationship>,
    pub(crate) elements: Table<Element>,
    pub(crate) minifigs: Table<Minifig>,
    pub(crate) sets: Table<Set>,
    pub(crate) inventories: Table<Inventory>,
    pub(crate) inventory_parts: Table<InventoryPart>,
    pub(crate) inventory_sets: Table<InventorySet>,
    pub(crate) inventory_minifigs: Table<InventoryMinifig>,
}

impl Tables {
    pub fn get<T: Entity>(&self) -> &Table<T> {
        T::table(self)
    }

    pub fn by_kind(&self, kind: EntityKind) -> &dyn AnyTable {
        match kind {
            EntityKind::PartCategory => &self.part_categories,
            EntityKind::Color => &self.colors,
            EntityKind::Theme => &self.themes,
            EntityKind::Part => &self.parts,
            EntityKind::PartRelationship => &self.part_relationships,
            EntityKind::Element => &self.elements,
            EntityKind::Minifig => &self.minifigs,
            EntityKind::Set => &self.sets,
            EntityKind::Inventory => &self.inventories,
            EntityKind::InventoryPart => &self.inventory_parts,
            EntityKind::InventorySet => &self.inventory_sets,
            EntityKind::InventoryMinifig => &self.inventory_minifigs,
        }
    }

    pub(crate) fn insert(&mut self, record: Record) -> StorageResult<()> {
        fn insert_into<T: Entity>(tables: &mut Tables, row: T) -> StorageResult<()> {
            T::table_mut(tables).insert(row)
        }
        with_entity!(record, r => insert_into(self, r))
    }

    pub fn contains(&self, kind: EntityKind, key: &RowKey) -> bool {
        self.by_kind(kind).contains_key(key)
    }

    /// Whether `value` names an existing row in any target of `fk`
    pub fn resolves(&self, fk: &ForeignKey, value: &FieldValue) -> bool {
        let key = RowKey::single(value.clone());
        fk.targets.iter().any(|&target| self.contains(target, &key))
    }

    pub fn row_count(&self, kind: EntityKind) -> usize {
        self.by_kind(kind).len()
    }

    pub fn total_rows(&self) -> usize {
        EntityKind::ALL.iter().map(|&kind| self.row_count(kind)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageErrorCode;

    fn line(inventory_id: i64, part_num: &str, quantity: i64) -> InventoryPart {
        InventoryPart {
            inventory_id,
            part_num: part_num.into(),
            color_id: 4,
            quantity,
            is_spare: false,
        }
    }

    #[test]
    fn test_foreign_key_columns_are_indexed() {
        let table: Table<InventoryPart> = Table::new();
        assert!(table.is_indexed("inventory_id"));
        assert!(table.is_indexed("part_num"));
        assert!(table.is_indexed("color_id"));
        assert!(!table.is_indexed("quantity"));
    }

    #[test]
    fn test_insert_and_index_lookup() {
        let mut table = Table::new();
        table.insert(line(1, "3001", 2)).unwrap();
        table.insert(line(2, "3001", 1)).unwrap();
        table.insert(line(1, "3002", 5)).unwrap();

        let hits = table.lookup("inventory_id", &FieldValue::Int(1)).unwrap();
        assert_eq!(hits, &[0, 2]);
        assert_eq!(table.lookup("quantity", &FieldValue::Int(2)), None);
    }

    #[test]
    fn test_repeated_lines_are_kept() {
        let mut table = Table::new();
        table.insert(line(1, "3001", 2)).unwrap();
        table.insert(line(1, "3001", 3)).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup("part_num", &FieldValue::from("3001")).unwrap(), &[0, 1]);
        assert_eq!(table.key_at(1), Some(RowKey::from(1i64)));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let link = |quantity| InventorySet {
            inventory_id: 1,
            set_num: "6020-1".into(),
            quantity,
        };
        let mut table = Table::new();
        table.insert(link(2)).unwrap();
        let err = table.insert(link(9)).unwrap_err();
        assert_eq!(err.code(), StorageErrorCode::BrickDuplicateKey);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].quantity, 2);
        assert!(table.get(&RowKey::from((1i64, "6020-1"))).is_some());
    }

    #[test]
    fn test_multi_target_resolution() {
        let mut tables = Tables::default();
        tables
            .insert(Record::Minifig(Minifig {
                fig_num: "fig-000001".into(),
                name: "Pilot".into(),
                num_parts: 4,
            }))
            .unwrap();

        let fk = schema_for(EntityKind::Inventory).foreign_key("set_num").unwrap();
        assert!(tables.resolves(fk, &FieldValue::Text("fig-000001".into())));
        assert!(!tables.resolves(fk, &FieldValue::Text("10179-1".into())));
    }
}
