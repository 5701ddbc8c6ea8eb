//! Rejection report
//!
//! Every row the pipeline refuses is listed with its kind, natural key
//! (or ordinal position when no key can be derived), the offending field
//! and a reason code.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::Violation;
use crate::schema::EntityKind;
use crate::storage::GenerationId;

/// File name of the last report inside the data directory
pub const REPORT_FILE: &str = "report.json";

/// Why a row was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    MissingField,
    TypeMismatch,
    NonPositive,
    TooLong,
    InvalidFormat,
    DuplicateKey,
    ForeignKeyUnresolved,
    HierarchyCycle,
    MalformedRow,
}

impl RejectReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::MissingField => "missing_field",
            RejectReason::TypeMismatch => "type_mismatch",
            RejectReason::NonPositive => "non_positive",
            RejectReason::TooLong => "too_long",
            RejectReason::InvalidFormat => "invalid_format",
            RejectReason::DuplicateKey => "duplicate_key",
            RejectReason::ForeignKeyUnresolved => "foreign_key_unresolved",
            RejectReason::HierarchyCycle => "hierarchy_cycle",
            RejectReason::MalformedRow => "malformed_row",
        }
    }
}

impl From<Violation> for RejectReason {
    fn from(v: Violation) -> Self {
        match v {
            Violation::MissingField => RejectReason::MissingField,
            Violation::TypeMismatch => RejectReason::TypeMismatch,
            Violation::NonPositive => RejectReason::NonPositive,
            Violation::TooLong => RejectReason::TooLong,
            Violation::InvalidFormat => RejectReason::InvalidFormat,
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Where a rejected row sits in its table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowLocator {
    /// Natural key, key columns joined by `/`
    Key(String),
    /// Zero-based position in the source stream
    Ordinal(usize),
}

impl fmt::Display for RowLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowLocator::Key(key) => write!(f, "{}", key),
            RowLocator::Ordinal(n) => write!(f, "#{}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRow {
    pub kind: EntityKind,
    pub locator: RowLocator,
    pub field: Option<String>,
    pub reason: RejectReason,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounts {
    pub seen: usize,
    pub accepted: usize,
    pub rejected: usize,
}

/// Outcome of one ingestion run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub version: String,
    pub generation_id: GenerationId,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub committed: bool,
    /// Keyed by table name
    pub counts: BTreeMap<String, KindCounts>,
    pub rejected: Vec<RejectedRow>,
}

impl IngestReport {
    pub fn new(version: impl Into<String>, generation_id: GenerationId) -> Self {
        Self {
            version: version.into(),
            generation_id,
            started_at: Utc::now(),
            elapsed_ms: 0,
            committed: false,
            counts: BTreeMap::new(),
            rejected: Vec::new(),
        }
    }

    fn counts_mut(&mut self, kind: EntityKind) -> &mut KindCounts {
        self.counts.entry(kind.table_name().to_string()).or_default()
    }

    pub(crate) fn saw(&mut self, kind: EntityKind) {
        self.counts_mut(kind).seen += 1;
    }

    pub(crate) fn accepted(&mut self, kind: EntityKind) {
        self.counts_mut(kind).accepted += 1;
    }

    pub(crate) fn reject(&mut self, row: RejectedRow) {
        self.counts_mut(row.kind).rejected += 1;
        self.rejected.push(row);
    }

    pub fn counts_for(&self, kind: EntityKind) -> KindCounts {
        self.counts.get(kind.table_name()).copied().unwrap_or_default()
    }

    pub fn rows_seen(&self) -> usize {
        self.counts.values().map(|c| c.seen).sum()
    }

    pub fn rows_accepted(&self) -> usize {
        self.counts.values().map(|c| c.accepted).sum()
    }

    pub fn rows_rejected(&self) -> usize {
        self.rejected.len()
    }

    /// Rejected over seen, 0.0 when nothing was seen
    pub fn rejection_rate(&self) -> f64 {
        match self.rows_seen() {
            0 => 0.0,
            seen => self.rows_rejected() as f64 / seen as f64,
        }
    }

    pub fn rejected_with(&self, reason: RejectReason) -> impl Iterator<Item = &RejectedRow> {
        self.rejected.iter().filter(move |r| r.reason == reason)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_to_file(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json().map_err(std::io::Error::from)?;
        fs::write(path, json)
    }

    pub fn read_from_file(path: &Path) -> std::io::Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(std::io::Error::from)
    }
}
