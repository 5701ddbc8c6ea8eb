//! Catalog file layout
//!
//! `catalog.db` is a SQLite database holding one generation:
//!
//! - one table per entity kind, named after the kind, one column per
//!   declared field (int and bool as INTEGER, text and code as TEXT)
//! - a primary key constraint on keyed kinds; keyless kinds keep rows in
//!   insertion order by rowid
//! - an index on every foreign-key column
//! - a `metadata` key/value table describing the generation
//!
//! Rows are written and read back in rowid order, so a reload reproduces
//! the committed generation row for row.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::types::{Value, ValueRef};
use serde::{Deserialize, Serialize};

use crate::schema::{EntitySchema, FieldDef, FieldType, FieldValue};

use super::generation::GenerationId;

/// Current on-disk format version
pub const FORMAT_VERSION: u32 = 2;

/// Name of the key/value table describing the generation
pub const METADATA_TABLE: &str = "metadata";

/// Generation description stored in the `metadata` table, one row per field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogMetadata {
    pub format_version: u32,
    pub generation_id: GenerationId,
    /// Dataset version the generation materializes
    pub version: String,
    pub created_at: DateTime<Utc>,
    /// Rows per table name
    pub row_counts: BTreeMap<String, usize>,
    /// CRC32 over every row in load order
    pub content_checksum: u32,
}

/// `CREATE TABLE` and `CREATE INDEX` statements for one kind
pub fn table_ddl(schema: &EntitySchema) -> String {
    let table = schema.kind.table_name();
    let mut columns: Vec<String> = schema.fields.iter().map(column_ddl).collect();
    if schema.is_keyed() {
        let key: Vec<String> = schema.primary_key.iter().map(|c| quote(c)).collect();
        columns.push(format!("PRIMARY KEY ({})", key.join(", ")));
    }

    let mut ddl = format!("CREATE TABLE {} ({});\n", quote(table), columns.join(", "));
    for fk in schema.foreign_keys {
        ddl.push_str(&format!(
            "CREATE INDEX {} ON {} ({});\n",
            quote(&format!("idx_{}_{}", table, fk.field)),
            quote(table),
            quote(fk.field)
        ));
    }
    ddl
}

/// `INSERT` statement taking every declared field in order
pub fn insert_sql(schema: &EntitySchema) -> String {
    let names: Vec<String> = schema.fields.iter().map(|f| quote(f.name)).collect();
    let slots: Vec<String> = (1..=schema.fields.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote(schema.kind.table_name()),
        names.join(", "),
        slots.join(", ")
    )
}

/// `SELECT` of every declared field in insertion order
pub fn select_sql(schema: &EntitySchema) -> String {
    let names: Vec<String> = schema.fields.iter().map(|f| quote(f.name)).collect();
    format!(
        "SELECT {} FROM {} ORDER BY rowid",
        names.join(", "),
        quote(schema.kind.table_name())
    )
}

pub fn to_sql(value: FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(b) => Value::Integer(i64::from(b)),
        FieldValue::Int(v) => Value::Integer(v),
        FieldValue::Text(s) => Value::Text(s),
    }
}

/// Typed value of a stored column, or a description of why it is not one
pub fn from_sql(field: &FieldDef, value: ValueRef<'_>) -> Result<FieldValue, String> {
    match (field.field_type, value) {
        (_, ValueRef::Null) => Ok(FieldValue::Null),
        (FieldType::Int, ValueRef::Integer(v)) => Ok(FieldValue::Int(v)),
        (FieldType::Bool, ValueRef::Integer(0)) => Ok(FieldValue::Bool(false)),
        (FieldType::Bool, ValueRef::Integer(1)) => Ok(FieldValue::Bool(true)),
        (FieldType::Text | FieldType::Code, ValueRef::Text(bytes)) => std::str::from_utf8(bytes)
            .map(|s| FieldValue::Text(s.to_string()))
            .map_err(|e| format!("column '{}' is not UTF-8: {}", field.name, e)),
        (expected, other) => Err(format!(
            "column '{}' holds {:?}, expected {}",
            field.name,
            other.data_type(),
            expected.type_name()
        )),
    }
}

fn column_ddl(field: &FieldDef) -> String {
    let affinity = match field.field_type {
        FieldType::Int | FieldType::Bool => "INTEGER",
        FieldType::Text | FieldType::Code => "TEXT",
    };
    if field.required {
        format!("{} {} NOT NULL", quote(field.name), affinity)
    } else {
        format!("{} {}", quote(field.name), affinity)
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{schema_for, EntityKind};

    #[test]
    fn test_keyed_table_ddl() {
        let ddl = table_ddl(schema_for(EntityKind::Part));
        assert!(ddl.starts_with("CREATE TABLE \"parts\" ("));
        assert!(ddl.contains("\"part_num\" TEXT NOT NULL"));
        assert!(ddl.contains("PRIMARY KEY (\"part_num\")"));
        assert!(ddl.contains("CREATE INDEX \"idx_parts_part_cat_id\" ON \"parts\" (\"part_cat_id\")"));
    }

    #[test]
    fn test_keyless_table_has_no_primary_key() {
        let ddl = table_ddl(schema_for(EntityKind::InventoryPart));
        assert!(!ddl.contains("PRIMARY KEY"));
        assert!(ddl.contains("\"idx_inventory_parts_inventory_id\""));
    }

    #[test]
    fn test_bool_column_round_trips_as_integer() {
        let field = FieldDef::required("is_trans", FieldType::Bool);
        assert_eq!(to_sql(FieldValue::Bool(true)), Value::Integer(1));
        assert_eq!(from_sql(&field, ValueRef::Integer(1)), Ok(FieldValue::Bool(true)));
        assert!(from_sql(&field, ValueRef::Integer(7)).is_err());
        assert!(from_sql(&field, ValueRef::Text(b"t")).is_err());
    }
}
