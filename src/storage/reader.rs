//! Catalog file reader
//!
//! Opens `catalog.db` read-only, runs SQLite's structural check, then
//! rebuilds the generation table by table. Row counts and the content
//! checksum recorded in the metadata must match what was read back. Any
//! failure is fatal: a damaged catalog file is never served.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use serde_json::{Map, Value};

use crate::normalize::NormalizedRow;
use crate::record::Record;
use crate::schema::{EntityKind, FieldValue, SchemaRegistry};

use super::checksum::ContentChecksum;
use super::errors::{StorageError, StorageResult};
use super::generation::{Generation, GenerationBuilder};
use super::layout::{from_sql, select_sql, CatalogMetadata, FORMAT_VERSION, METADATA_TABLE};

/// Read-only handle on `catalog.db`
pub struct CatalogReader {
    path: PathBuf,
    conn: Connection,
}

impl CatalogReader {
    pub fn open(path: &Path) -> StorageResult<Self> {
        if !path.is_file() {
            return Err(StorageError::read_failed(
                format!("Failed to open catalog file: {}", path.display()),
                std::io::Error::new(std::io::ErrorKind::NotFound, "not a file"),
            ));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| corrupt("Catalog file is not a SQLite database", e))?;

        Ok(Self {
            path: path.to_path_buf(),
            conn,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The generation description stored in the `metadata` table
    pub fn metadata(&self) -> StorageResult<CatalogMetadata> {
        let sql = format!("SELECT key, value FROM \"{}\"", METADATA_TABLE);
        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| corrupt("Catalog file has no readable metadata table", e))?;
        let pairs = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(|e| corrupt("Failed to read catalog metadata", e))?;

        let mut fields = Map::new();
        for pair in pairs {
            let (key, raw) = pair.map_err(|e| corrupt("Failed to read catalog metadata", e))?;
            let value: Value = serde_json::from_str(&raw).map_err(|e| {
                StorageError::corruption_in_table(
                    METADATA_TABLE,
                    format!("Invalid metadata value for '{}': {}", key, e),
                )
            })?;
            fields.insert(key, value);
        }

        serde_json::from_value(Value::Object(fields)).map_err(|e| {
            StorageError::corruption_in_table(METADATA_TABLE, format!("Invalid metadata: {}", e))
        })
    }

    /// Rebuild the generation stored in the file.
    ///
    /// The file must pass SQLite's quick check, row counts and the content
    /// checksum must match the metadata, and the loaded rows must satisfy
    /// referential closure.
    pub fn load(self, registry: &SchemaRegistry) -> StorageResult<Generation> {
        self.quick_check()?;

        let metadata = self.metadata()?;
        if metadata.format_version != FORMAT_VERSION {
            return Err(StorageError::data_corruption(format!(
                "Unsupported catalog format version {}",
                metadata.format_version
            )));
        }

        let mut builder = GenerationBuilder::restore(
            metadata.generation_id,
            metadata.version.clone(),
            metadata.created_at,
        );
        let mut checksum = ContentChecksum::new();
        for &kind in registry.load_order() {
            self.load_table(kind, registry, &mut builder, &mut checksum)?;
        }

        for (table, &expected) in &metadata.row_counts {
            let kind = EntityKind::from_table_name(table).ok_or_else(|| {
                StorageError::data_corruption(format!("Unknown table '{}' in metadata", table))
            })?;
            let actual = builder.row_count(kind);
            if actual != expected {
                return Err(StorageError::corruption_in_table(
                    table,
                    format!("{} rows stored, metadata records {}", actual, expected),
                ));
            }
        }

        let actual = checksum.finalize();
        if actual != metadata.content_checksum {
            return Err(StorageError::data_corruption(format!(
                "Content checksum mismatch: stored {:08x}, computed {:08x}",
                metadata.content_checksum, actual
            )));
        }

        let generation = builder.finish();
        generation.verify_closure(registry).map_err(|e| {
            StorageError::data_corruption(format!("Persisted generation is not closed: {}", e))
        })?;
        Ok(generation)
    }

    fn quick_check(&self) -> StorageResult<()> {
        let verdict: String = self
            .conn
            .query_row("PRAGMA quick_check", [], |row| row.get(0))
            .map_err(|e| corrupt("Catalog file failed the integrity check", e))?;
        if verdict != "ok" {
            return Err(StorageError::data_corruption(format!(
                "Catalog file failed the integrity check: {}",
                verdict
            )));
        }
        Ok(())
    }

    fn load_table(
        &self,
        kind: EntityKind,
        registry: &SchemaRegistry,
        builder: &mut GenerationBuilder,
        checksum: &mut ContentChecksum,
    ) -> StorageResult<()> {
        let table = kind.table_name();
        let schema = registry.schema(kind);
        let mut stmt = self
            .conn
            .prepare(&select_sql(schema))
            .map_err(|e| corrupt_table(table, e))?;
        let mut rows = stmt.query([]).map_err(|e| corrupt_table(table, e))?;

        while let Some(row) = rows.next().map_err(|e| corrupt_table(table, e))? {
            let mut fields = NormalizedRow::new(kind);
            for (i, field) in schema.fields.iter().enumerate() {
                let raw = row.get_ref(i).map_err(|e| corrupt_table(table, e))?;
                match from_sql(field, raw) {
                    Ok(FieldValue::Null) => {}
                    Ok(value) => fields.set(field.name, value),
                    Err(reason) => return Err(StorageError::corruption_in_table(table, reason)),
                }
            }

            let record = Record::from_row(kind, &fields)
                .map_err(|e| StorageError::corruption_in_table(table, e.to_string()))?;
            checksum.update(&record)?;
            builder
                .insert(record)
                .map_err(|e| StorageError::corruption_in_table(table, e.to_string()))?;
        }
        Ok(())
    }
}

fn corrupt(message: &str, e: rusqlite::Error) -> StorageError {
    StorageError::data_corruption(format!("{}: {}", message, e))
}

fn corrupt_table(table: &str, e: rusqlite::Error) -> StorageError {
    StorageError::corruption_in_table(table, e.to_string())
}
