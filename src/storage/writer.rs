//! Catalog file writer
//!
//! A generation is written to a scratch SQLite database next to
//! `catalog.db` in one transaction, the connection is closed and the file
//! fsynced, then it is renamed over the old file. The directory is fsynced
//! after the rename so the replacement survives a crash.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use rusqlite::{params, params_from_iter, Connection, Transaction};

use crate::schema::{FieldValue, SchemaRegistry};

use super::checksum::ContentChecksum;
use super::errors::{StorageError, StorageResult};
use super::generation::Generation;
use super::layout::{insert_sql, table_ddl, to_sql, CatalogMetadata, FORMAT_VERSION, METADATA_TABLE};

/// File name of the persisted generation inside the data directory
pub const CATALOG_FILE: &str = "catalog.db";

/// Writes whole generations to one catalog file
#[derive(Debug, Clone)]
pub struct CatalogWriter {
    path: PathBuf,
    temp_path: PathBuf,
}

impl CatalogWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let temp_path = path.with_extension("db.tmp");
        Self { path, temp_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the catalog file with `generation`.
    ///
    /// Returns the size of the new file in bytes. On error the previous
    /// file is left in place.
    pub fn write(&self, generation: &Generation, registry: &SchemaRegistry) -> StorageResult<u64> {
        let version = generation.version().ok_or_else(|| {
            StorageError::write_failed(
                "refusing to persist a generation without a dataset version",
                io::Error::new(io::ErrorKind::InvalidInput, "missing version"),
            )
        })?;

        let mut checksum = ContentChecksum::new();
        for record in generation.records(registry) {
            checksum.update(&record)?;
        }

        let metadata = CatalogMetadata {
            format_version: FORMAT_VERSION,
            generation_id: generation.id(),
            version: version.to_string(),
            created_at: generation.created_at(),
            row_counts: registry
                .load_order()
                .iter()
                .map(|&kind| (kind.table_name().to_string(), generation.row_count(kind)))
                .collect(),
            content_checksum: checksum.finalize(),
        };

        let written = match self.write_temp(&metadata, generation, registry) {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = fs::remove_file(&self.temp_path);
                return Err(e);
            }
        };

        fs::rename(&self.temp_path, &self.path).map_err(|e| {
            StorageError::write_failed(
                format!("Failed to replace catalog file: {}", self.path.display()),
                e,
            )
        })?;
        if let Some(dir) = self.path.parent() {
            fsync_dir(dir)?;
        }

        Ok(written)
    }

    fn write_temp(
        &self,
        metadata: &CatalogMetadata,
        generation: &Generation,
        registry: &SchemaRegistry,
    ) -> StorageResult<u64> {
        // a scratch file left by a crash must not leak old tables
        if self.temp_path.exists() {
            fs::remove_file(&self.temp_path).map_err(|e| {
                StorageError::write_failed(
                    format!("Failed to remove stale scratch file: {}", self.temp_path.display()),
                    e,
                )
            })?;
        }

        let mut conn = Connection::open(&self.temp_path)
            .map_err(|e| sql_error("Failed to create catalog file", e))?;
        let tx = conn
            .transaction()
            .map_err(|e| sql_error("Failed to begin catalog transaction", e))?;

        write_metadata(&tx, metadata)?;
        for &kind in registry.load_order() {
            let schema = registry.schema(kind);
            tx.execute_batch(&table_ddl(schema))
                .map_err(|e| sql_error(&format!("Failed to create table '{}'", kind), e))?;

            let mut insert = tx
                .prepare(&insert_sql(schema))
                .map_err(|e| sql_error(&format!("Failed to prepare insert into '{}'", kind), e))?;
            let table = generation.tables().by_kind(kind);
            for ordinal in 0..table.len() {
                let values = schema
                    .fields
                    .iter()
                    .map(|f| to_sql(table.field_at(ordinal, f.name).unwrap_or(FieldValue::Null)));
                insert
                    .execute(params_from_iter(values))
                    .map_err(|e| sql_error(&format!("Failed to insert into '{}'", kind), e))?;
            }
        }

        tx.commit()
            .map_err(|e| sql_error("Failed to commit catalog transaction", e))?;
        conn.close()
            .map_err(|(_, e)| sql_error("Failed to close catalog file", e))?;

        let file = File::open(&self.temp_path).map_err(|e| {
            StorageError::write_failed(
                format!("Failed to reopen catalog file: {}", self.temp_path.display()),
                e,
            )
        })?;
        file.sync_all()
            .map_err(|e| StorageError::write_failed("Failed to fsync catalog file", e))?;
        let size = file
            .metadata()
            .map_err(|e| StorageError::write_failed("Failed to stat catalog file", e))?
            .len();

        Ok(size)
    }
}

fn write_metadata(tx: &Transaction<'_>, metadata: &CatalogMetadata) -> StorageResult<()> {
    tx.execute_batch(&format!(
        "CREATE TABLE \"{}\" (key TEXT PRIMARY KEY, value TEXT NOT NULL);",
        METADATA_TABLE
    ))
    .map_err(|e| sql_error("Failed to create metadata table", e))?;

    let encoded = serde_json::to_value(metadata).map_err(|e| {
        StorageError::write_failed(
            "Failed to encode catalog metadata",
            io::Error::new(io::ErrorKind::InvalidData, e),
        )
    })?;
    let fields = encoded.as_object().ok_or_else(|| {
        StorageError::write_failed(
            "Failed to encode catalog metadata",
            io::Error::new(io::ErrorKind::InvalidData, "metadata is not an object"),
        )
    })?;

    let sql = format!("INSERT INTO \"{}\" (key, value) VALUES (?1, ?2)", METADATA_TABLE);
    for (key, value) in fields {
        tx.execute(&sql, params![key.as_str(), value.to_string()])
            .map_err(|e| sql_error("Failed to write catalog metadata", e))?;
    }
    Ok(())
}

fn sql_error(message: &str, e: rusqlite::Error) -> StorageError {
    StorageError::write_failed(message, io::Error::new(io::ErrorKind::Other, e))
}

fn fsync_dir(dir: &Path) -> StorageResult<()> {
    let handle = File::open(dir).map_err(|e| {
        StorageError::io_error(format!("Failed to open directory: {}", dir.display()), e)
    })?;
    handle
        .sync_all()
        .map_err(|e| StorageError::io_error("Failed to fsync directory", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{InventoryPart, PartCategory, Record};
    use crate::storage::GenerationBuilder;
    use tempfile::TempDir;

    fn sample_generation() -> Generation {
        let mut builder = GenerationBuilder::new("v1".into());
        builder
            .insert(Record::PartCategory(PartCategory {
                id: 1,
                name: "Bricks".into(),
            }))
            .unwrap();
        builder.finish()
    }

    #[test]
    fn test_write_replaces_file_and_removes_temp() {
        let dir = TempDir::new().unwrap();
        let writer = CatalogWriter::new(dir.path().join(CATALOG_FILE));

        let written = writer.write(&sample_generation(), SchemaRegistry::catalog()).unwrap();
        assert!(written > 0);
        assert_eq!(fs::metadata(writer.path()).unwrap().len(), written);
        assert!(!dir.path().join("catalog.db.tmp").exists());
    }

    #[test]
    fn test_file_is_plain_sqlite() {
        let dir = TempDir::new().unwrap();
        let writer = CatalogWriter::new(dir.path().join(CATALOG_FILE));
        writer.write(&sample_generation(), SchemaRegistry::catalog()).unwrap();

        let conn = Connection::open(writer.path()).unwrap();
        let name: String = conn
            .query_row("SELECT name FROM part_categories WHERE id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(name, "Bricks");

        let version: String = conn
            .query_row("SELECT value FROM metadata WHERE key = 'version'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, "\"v1\"");

        let tables: i64 = conn
            .query_row("SELECT count(*) FROM sqlite_master WHERE type = 'table'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(tables, 13);
    }

    #[test]
    fn test_keyless_lines_keep_duplicates() {
        let dir = TempDir::new().unwrap();
        let writer = CatalogWriter::new(dir.path().join(CATALOG_FILE));

        let mut builder = GenerationBuilder::new("v1".into());
        for quantity in [2, 3] {
            builder
                .insert(Record::InventoryPart(InventoryPart {
                    inventory_id: 1,
                    part_num: "3001".into(),
                    color_id: 4,
                    quantity,
                    is_spare: false,
                }))
                .unwrap();
        }
        writer.write(&builder.finish(), SchemaRegistry::catalog()).unwrap();

        let conn = Connection::open(writer.path()).unwrap();
        let total: i64 = conn
            .query_row("SELECT sum(quantity) FROM inventory_parts", [], |r| r.get(0))
            .unwrap();
        assert_eq!(total, 5);
    }

    #[test]
    fn test_stale_scratch_file_replaced() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("catalog.db.tmp"), b"left over").unwrap();
        let writer = CatalogWriter::new(dir.path().join(CATALOG_FILE));
        writer.write(&sample_generation(), SchemaRegistry::catalog()).unwrap();
        assert!(!dir.path().join("catalog.db.tmp").exists());
        assert!(writer.path().exists());
    }

    #[test]
    fn test_unversioned_generation_not_persisted() {
        let dir = TempDir::new().unwrap();
        let writer = CatalogWriter::new(dir.path().join(CATALOG_FILE));
        let err = writer
            .write(&Generation::empty(), SchemaRegistry::catalog())
            .unwrap_err();
        assert!(!err.is_fatal());
        assert!(!writer.path().exists());
    }
}
