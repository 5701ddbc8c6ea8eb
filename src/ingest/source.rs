//! Dataset sources
//!
//! A source hands the pipeline one finite row stream per entity kind plus
//! a version identifier for the whole snapshot. Fetching and unpacking a
//! dataset archive happens before a source is constructed.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::normalize::RawRow;
use crate::schema::EntityKind;

/// Marker file naming the dataset version inside a dataset directory
pub const VERSION_FILE: &str = "VERSION";

/// A failure reading the dataset.
///
/// Row defects (`is_row_defect`) cost only the row they occur on; every
/// other variant is fatal to the rebuild.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path}:{line}: malformed JSON: {source}")]
    Malformed {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("{origin}:{line}: row is not a JSON object")]
    NotAnObject { origin: String, line: usize },

    #[error("{path}: unreadable CSV header: {source}")]
    CsvHeader {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}:{line}: malformed CSV record: {source}")]
    CsvRecord {
        path: PathBuf,
        line: usize,
        #[source]
        source: csv::Error,
    },

    #[error("dataset declares an empty version")]
    EmptyVersion,
}

impl SourceError {
    /// Whether the error concerns one row only
    pub fn is_row_defect(&self) -> bool {
        matches!(
            self,
            SourceError::Malformed { .. }
                | SourceError::NotAnObject { .. }
                | SourceError::CsvRecord { .. }
        )
    }
}

/// One entity kind's rows, in source order
pub type RowStream<'a> = Box<dyn Iterator<Item = Result<RawRow, SourceError>> + 'a>;

pub trait DatasetSource {
    /// Identifier of the whole snapshot
    fn version(&self) -> Result<String, SourceError>;

    /// Rows of `kind`. A kind the dataset does not carry yields no rows.
    fn rows(&self, kind: EntityKind) -> Result<RowStream<'_>, SourceError>;
}

/// In-memory dataset, for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    version: String,
    tables: HashMap<EntityKind, Vec<Value>>,
}

impl MemorySource {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            tables: HashMap::new(),
        }
    }

    /// Append rows of `kind`. Non-object values surface as source errors.
    pub fn with_rows(mut self, kind: EntityKind, rows: impl IntoIterator<Item = Value>) -> Self {
        self.push_rows(kind, rows);
        self
    }

    pub fn push_rows(&mut self, kind: EntityKind, rows: impl IntoIterator<Item = Value>) {
        self.tables.entry(kind).or_default().extend(rows);
    }

    pub fn row_count(&self, kind: EntityKind) -> usize {
        self.tables.get(&kind).map_or(0, Vec::len)
    }
}

impl DatasetSource for MemorySource {
    fn version(&self) -> Result<String, SourceError> {
        if self.version.trim().is_empty() {
            return Err(SourceError::EmptyVersion);
        }
        Ok(self.version.clone())
    }

    fn rows(&self, kind: EntityKind) -> Result<RowStream<'_>, SourceError> {
        let rows = self.tables.get(&kind).map(Vec::as_slice).unwrap_or(&[]);
        Ok(Box::new(rows.iter().enumerate().map(move |(i, value)| {
            match value {
                Value::Object(map) => Ok(map.clone()),
                _ => Err(SourceError::NotAnObject {
                    origin: kind.table_name().to_string(),
                    line: i + 1,
                }),
            }
        })))
    }
}

/// A directory holding `<table>.jsonl` files and an optional `VERSION`
///
/// Each line of a table file is one JSON object. A missing table file
/// means the table is empty. Without a `VERSION` file the version is a
/// SHA-256 fingerprint of the table files.
#[derive(Debug, Clone)]
pub struct JsonlDirectorySource {
    dir: PathBuf,
}

impl JsonlDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn table_path(&self, kind: EntityKind) -> PathBuf {
        self.dir.join(format!("{}.jsonl", kind.table_name()))
    }

    /// `sha256:` followed by the first 16 hex digits of the digest over
    /// every present table file, in declaration order
    pub fn fingerprint(&self) -> Result<String, SourceError> {
        fingerprint(EntityKind::ALL.iter().map(|&kind| (kind, self.table_path(kind))))
    }
}

impl DatasetSource for JsonlDirectorySource {
    fn version(&self) -> Result<String, SourceError> {
        read_version(&self.dir, || self.fingerprint())
    }

    fn rows(&self, kind: EntityKind) -> Result<RowStream<'_>, SourceError> {
        let path = self.table_path(kind);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Box::new(std::iter::empty())),
            Err(e) => return Err(SourceError::Io { path, source: e }),
        };

        let lines = BufReader::new(file).lines().enumerate();
        Ok(Box::new(lines.filter_map(move |(i, line)| {
            let line_no = i + 1;
            let line = match line {
                Ok(line) => line,
                Err(e) => return Some(Err(SourceError::Io { path: path.clone(), source: e })),
            };
            if line.trim().is_empty() {
                return None;
            }
            Some(parse_line(&path, line_no, &line))
        })))
    }
}

/// Content of `dir/VERSION`, or `fallback()` when it is absent or blank
pub(crate) fn read_version(
    dir: &Path,
    fallback: impl FnOnce() -> Result<String, SourceError>,
) -> Result<String, SourceError> {
    let path = dir.join(VERSION_FILE);
    match fs::read_to_string(&path) {
        Ok(content) if !content.trim().is_empty() => Ok(content.trim().to_string()),
        Ok(_) => fallback(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => fallback(),
        Err(e) => Err(SourceError::Io { path, source: e }),
    }
}

/// SHA-256 over the named table files; missing files are skipped
pub(crate) fn fingerprint(
    files: impl IntoIterator<Item = (EntityKind, PathBuf)>,
) -> Result<String, SourceError> {
    let mut hasher = Sha256::new();
    for (kind, path) in files {
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(SourceError::Io { path, source: e }),
        };
        hasher.update(kind.table_name().as_bytes());
        let mut buf = [0u8; 8192];
        loop {
            let n = file
                .read(&mut buf)
                .map_err(|e| SourceError::Io { path: path.clone(), source: e })?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
    }

    let digest = hasher.finalize();
    let hex: String = digest.iter().take(8).map(|b| format!("{:02x}", b)).collect();
    Ok(format!("sha256:{}", hex))
}

fn parse_line(path: &Path, line: usize, text: &str) -> Result<RawRow, SourceError> {
    let value: Value = serde_json::from_str(text).map_err(|e| SourceError::Malformed {
        path: path.to_path_buf(),
        line,
        source: e,
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(SourceError::NotAnObject {
            origin: path.display().to_string(),
            line,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_memory_source_streams_rows_in_order() {
        let source = MemorySource::new("v1").with_rows(
            EntityKind::Color,
            vec![json!({"id": 1, "name": "Blue"}), json!({"id": 4, "name": "Red"})],
        );
        let rows: Vec<RawRow> = source
            .rows(EntityKind::Color)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["name"], json!("Red"));
        assert_eq!(source.rows(EntityKind::Set).unwrap().count(), 0);
    }

    #[test]
    fn test_memory_source_rejects_non_objects() {
        let source = MemorySource::new("v1").with_rows(EntityKind::Color, vec![json!([1, 2])]);
        let first = source.rows(EntityKind::Color).unwrap().next().unwrap();
        assert!(matches!(first, Err(SourceError::NotAnObject { line: 1, .. })));
        assert!(matches!(MemorySource::new(" ").version(), Err(SourceError::EmptyVersion)));
    }

    #[test]
    fn test_directory_source_reads_jsonl_and_version() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(VERSION_FILE), "2024-06-01\n").unwrap();
        fs::write(
            temp_dir.path().join("colors.jsonl"),
            "{\"id\": 4, \"name\": \"Red\"}\n\n{\"id\": 1, \"name\": \"Blue\"}\n",
        )
        .unwrap();

        let source = JsonlDirectorySource::new(temp_dir.path());
        assert_eq!(source.version().unwrap(), "2024-06-01");
        assert_eq!(source.rows(EntityKind::Color).unwrap().count(), 2);
        assert_eq!(source.rows(EntityKind::Theme).unwrap().count(), 0);
    }

    #[test]
    fn test_directory_source_malformed_line() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("colors.jsonl"), "{\"id\": 4}\n{oops\n").unwrap();

        let source = JsonlDirectorySource::new(temp_dir.path());
        let results: Vec<_> = source.rows(EntityKind::Color).unwrap().collect();
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(SourceError::Malformed { line: 2, .. })));
        assert!(results[1].as_ref().unwrap_err().is_row_defect());

        let io = SourceError::Io {
            path: temp_dir.path().to_path_buf(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(!io.is_row_defect());
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let temp_dir = TempDir::new().unwrap();
        let source = JsonlDirectorySource::new(temp_dir.path());
        fs::write(source.table_path(EntityKind::Color), "{\"id\": 4}\n").unwrap();

        let first = source.version().unwrap();
        assert!(first.starts_with("sha256:"));
        assert_eq!(first, source.version().unwrap());

        fs::write(source.table_path(EntityKind::Color), "{\"id\": 5}\n").unwrap();
        assert_ne!(first, source.version().unwrap());
    }
}
