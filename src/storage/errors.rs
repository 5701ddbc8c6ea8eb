//! Storage error types
//!
//! Error codes:
//! - BRICK_STORAGE_IO_ERROR (ERROR severity)
//! - BRICK_STORAGE_WRITE_FAILED (ERROR severity)
//! - BRICK_STORAGE_READ_FAILED (ERROR severity)
//! - BRICK_DUPLICATE_KEY (REJECT severity) - one row, never the generation
//! - BRICK_CLOSURE_VIOLATION (ERROR severity) - generation refused at commit
//! - BRICK_DATA_CORRUPTION (FATAL severity)

use std::fmt;
use std::io;

use crate::schema::{EntityKind, FieldValue, RowKey};

/// Severity levels for storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The offending row is rejected, the generation continues
    Reject,
    /// Operation fails, the served generation is unaffected
    Error,
    /// brickdb must not serve from this data
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Storage-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// Disk I/O failure
    BrickStorageIoError,
    /// Catalog file write failed
    BrickStorageWriteFailed,
    /// Catalog file read failed
    BrickStorageReadFailed,
    /// Primary key already present in the generation
    BrickDuplicateKey,
    /// A foreign key does not resolve within the generation
    BrickClosureViolation,
    /// Checksum, schema or SQLite failure in the catalog file
    BrickDataCorruption,
}

impl StorageErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::BrickStorageIoError => "BRICK_STORAGE_IO_ERROR",
            StorageErrorCode::BrickStorageWriteFailed => "BRICK_STORAGE_WRITE_FAILED",
            StorageErrorCode::BrickStorageReadFailed => "BRICK_STORAGE_READ_FAILED",
            StorageErrorCode::BrickDuplicateKey => "BRICK_DUPLICATE_KEY",
            StorageErrorCode::BrickClosureViolation => "BRICK_CLOSURE_VIOLATION",
            StorageErrorCode::BrickDataCorruption => "BRICK_DATA_CORRUPTION",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            StorageErrorCode::BrickStorageIoError => Severity::Error,
            StorageErrorCode::BrickStorageWriteFailed => Severity::Error,
            StorageErrorCode::BrickStorageReadFailed => Severity::Error,
            StorageErrorCode::BrickDuplicateKey => Severity::Reject,
            StorageErrorCode::BrickClosureViolation => Severity::Error,
            StorageErrorCode::BrickDataCorruption => Severity::Fatal,
        }
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Storage error with context
#[derive(Debug)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
    /// Optional details about the error context
    details: Option<String>,
    source: Option<io::Error>,
}

impl StorageError {
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: StorageErrorCode::BrickStorageIoError,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    pub fn write_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: StorageErrorCode::BrickStorageWriteFailed,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    pub fn read_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: StorageErrorCode::BrickStorageReadFailed,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    pub fn duplicate_key(kind: EntityKind, key: &RowKey) -> Self {
        Self {
            code: StorageErrorCode::BrickDuplicateKey,
            message: format!("duplicate primary key in table '{}'", kind),
            details: Some(format!("key: {}", key)),
            source: None,
        }
    }

    pub fn closure_violation(
        kind: EntityKind,
        key: &RowKey,
        field: &str,
        value: &FieldValue,
    ) -> Self {
        Self {
            code: StorageErrorCode::BrickClosureViolation,
            message: format!(
                "{}.{} = '{}' does not resolve within the generation",
                kind, field, value
            ),
            details: Some(format!("key: {}", key)),
            source: None,
        }
    }

    pub fn data_corruption(message: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::BrickDataCorruption,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Corruption found in one table of the catalog file
    pub fn corruption_in_table(table: &str, reason: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::BrickDataCorruption,
            message: reason.into(),
            details: Some(format!("table: {}", table)),
            source: None,
        }
    }

    pub fn code(&self) -> StorageErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns whether this error is fatal (catalog data cannot be trusted)
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
