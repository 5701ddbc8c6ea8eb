//! CSV dataset directories
//!
//! Reads the catalog's published dump layout: one `<table>.csv` per
//! entity kind with a header row, optionally gzip-compressed as
//! `<table>.csv.gz`. Every cell is handed to the normalizer as text; an
//! empty cell is an absent value.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use serde_json::Value;

use crate::normalize::RawRow;
use crate::schema::EntityKind;

use super::source::{fingerprint, read_version, DatasetSource, RowStream, SourceError};

/// A directory of `<table>.csv` / `<table>.csv.gz` files and an optional
/// `VERSION`
///
/// A plain file wins over a compressed one of the same table. A missing
/// table means the table is empty.
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    dir: PathBuf,
}

impl CsvDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The file holding `kind`, if the directory carries one
    pub fn table_path(&self, kind: EntityKind) -> Option<PathBuf> {
        let plain = self.dir.join(format!("{}.csv", kind.table_name()));
        if plain.exists() {
            return Some(plain);
        }
        let packed = self.dir.join(format!("{}.csv.gz", kind.table_name()));
        packed.exists().then_some(packed)
    }

    pub fn fingerprint(&self) -> Result<String, SourceError> {
        fingerprint(
            EntityKind::ALL
                .iter()
                .filter_map(|&kind| self.table_path(kind).map(|path| (kind, path))),
        )
    }
}

impl DatasetSource for CsvDirectorySource {
    fn version(&self) -> Result<String, SourceError> {
        read_version(&self.dir, || self.fingerprint())
    }

    fn rows(&self, kind: EntityKind) -> Result<RowStream<'_>, SourceError> {
        let path = match self.table_path(kind) {
            Some(path) => path,
            None => return Ok(Box::new(std::iter::empty())),
        };
        let file = File::open(&path).map_err(|e| SourceError::Io {
            path: path.clone(),
            source: e,
        })?;
        let input: Box<dyn Read> = if path.extension().map_or(false, |ext| ext == "gz") {
            Box::new(GzDecoder::new(BufReader::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(input);
        let headers = reader.headers().cloned().map_err(|e| header_error(&path, e))?;

        Ok(Box::new(reader.into_records().enumerate().map(move |(i, record)| {
            // header is line 1
            let line = i + 2;
            match record {
                Ok(record) => Ok(to_row(&headers, &record)),
                Err(e) => Err(record_error(&path, line, e)),
            }
        })))
    }
}

fn to_row(headers: &csv::StringRecord, record: &csv::StringRecord) -> RawRow {
    headers
        .iter()
        .zip(record.iter())
        .map(|(name, cell)| (name.trim().to_string(), Value::String(cell.to_string())))
        .collect()
}

fn header_error(path: &Path, e: csv::Error) -> SourceError {
    if e.is_io_error() {
        return io_error(path, e);
    }
    SourceError::CsvHeader {
        path: path.to_path_buf(),
        source: e,
    }
}

/// Transport failures stay fatal; anything else is the record's fault
fn record_error(path: &Path, line: usize, e: csv::Error) -> SourceError {
    if e.is_io_error() {
        return io_error(path, e);
    }
    SourceError::CsvRecord {
        path: path.to_path_buf(),
        line,
        source: e,
    }
}

fn io_error(path: &Path, e: csv::Error) -> SourceError {
    let source = match e.into_kind() {
        csv::ErrorKind::Io(source) => source,
        other => io::Error::new(io::ErrorKind::Other, format!("{:?}", other)),
    };
    SourceError::Io {
        path: path.to_path_buf(),
        source,
    }
}
