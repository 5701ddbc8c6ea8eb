//! Generations
//!
//! A generation is one complete, immutable materialization of a dataset
//! snapshot. It is assembled in a `GenerationBuilder` that nothing else
//! can observe, then frozen into a `Generation` at commit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::record::{Entity, Record};
use crate::schema::{EntityKind, FieldValue, ForeignKey, RowKey, SchemaRegistry};

use super::errors::{StorageError, StorageResult};
use super::table::{Table, Tables};

/// Unique identifier of one generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenerationId(Uuid);

impl GenerationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for GenerationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An immutable, fully populated set of entity tables
#[derive(Debug)]
pub struct Generation {
    id: GenerationId,
    /// Dataset version; `None` only for the empty generation served
    /// before the first commit
    version: Option<String>,
    created_at: DateTime<Utc>,
    tables: Tables,
}

impl Generation {
    /// The generation served before anything has been committed
    pub(crate) fn empty() -> Self {
        Self {
            id: GenerationId::new(),
            version: None,
            created_at: Utc::now(),
            tables: Tables::default(),
        }
    }

    pub fn id(&self) -> GenerationId {
        self.id
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    pub fn table<T: Entity>(&self) -> &Table<T> {
        self.tables.get::<T>()
    }

    pub fn contains(&self, kind: EntityKind, key: &RowKey) -> bool {
        self.tables.contains(kind, key)
    }

    pub fn row_count(&self, kind: EntityKind) -> usize {
        self.tables.row_count(kind)
    }

    pub fn total_rows(&self) -> usize {
        self.tables.total_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.total_rows() == 0
    }

    /// Every record, table by table in `registry` load order
    pub fn records<'a>(
        &'a self,
        registry: &'a SchemaRegistry,
    ) -> impl Iterator<Item = Record> + 'a {
        registry.load_order().iter().flat_map(move |&kind| {
            let table = self.tables.by_kind(kind);
            (0..table.len()).filter_map(move |ordinal| table.record_at(ordinal))
        })
    }

    /// Fails with `BRICK_CLOSURE_VIOLATION` on the first foreign key that
    /// names no row within this generation.
    pub fn verify_closure(&self, registry: &SchemaRegistry) -> StorageResult<()> {
        verify_closure(&self.tables, registry)
    }
}

fn verify_closure(tables: &Tables, registry: &SchemaRegistry) -> StorageResult<()> {
    for &kind in registry.load_order() {
        let schema = registry.schema(kind);
        let table = tables.by_kind(kind);
        for fk in schema.foreign_keys {
            for ordinal in 0..table.len() {
                let value = match table.field_at(ordinal, fk.field) {
                    Some(value) if !value.is_null() => value,
                    _ => continue,
                };
                if !tables.resolves(fk, &value) {
                    let key = table.key_at(ordinal).unwrap_or_else(|| RowKey::new(Vec::new()));
                    return Err(StorageError::closure_violation(kind, &key, fk.field, &value));
                }
            }
        }
    }
    Ok(())
}

/// A generation under construction
///
/// Only the ingestion pipeline (or the catalog file loader) holds one;
/// readers never see its contents until the engine commits it.
#[derive(Debug)]
pub struct GenerationBuilder {
    id: GenerationId,
    version: String,
    created_at: DateTime<Utc>,
    tables: Tables,
}

impl GenerationBuilder {
    pub(crate) fn new(version: String) -> Self {
        Self::restore(GenerationId::new(), version, Utc::now())
    }

    /// Builder that reproduces a previously committed generation
    pub(crate) fn restore(id: GenerationId, version: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            version,
            created_at,
            tables: Tables::default(),
        }
    }

    pub fn id(&self) -> GenerationId {
        self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Insert one record. A repeated primary key is rejected and the
    /// first row stays.
    pub fn insert(&mut self, record: Record) -> StorageResult<()> {
        self.tables.insert(record)
    }

    pub fn contains(&self, kind: EntityKind, key: &RowKey) -> bool {
        self.tables.contains(kind, key)
    }

    pub fn resolves(&self, fk: &ForeignKey, value: &FieldValue) -> bool {
        self.tables.resolves(fk, value)
    }

    pub fn row_count(&self, kind: EntityKind) -> usize {
        self.tables.row_count(kind)
    }

    pub(crate) fn finish(self) -> Generation {
        Generation {
            id: self.id,
            version: Some(self.version),
            created_at: self.created_at,
            tables: self.tables,
        }
    }
}
