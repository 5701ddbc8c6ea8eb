//! Ingestion errors
//!
//! Only run-level failures live here. A bad row is never an error: it is
//! rejected and listed in the `IngestReport`.

use thiserror::Error;

use crate::storage::StorageError;
use crate::version::VersionError;

use super::report::IngestReport;
use super::source::SourceError;

pub type IngestResult<T> = Result<T, IngestError>;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Strict mode: too many rows were rejected. The scratch generation
    /// was discarded and the served generation is untouched.
    #[error("ingestion aborted: rejection rate {rate:.4} exceeds {threshold:.4} ({rejected} of {seen} rows)")]
    Aborted {
        rate: f64,
        threshold: f64,
        rejected: usize,
        seen: usize,
        report: Box<IngestReport>,
    },

    #[error("ingestion cancelled")]
    Cancelled,

    #[error("dataset source failed: {0}")]
    Source(#[from] SourceError),

    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("version tracking failed: {0}")]
    Version(#[from] VersionError),
}

impl IngestError {
    /// The partial report of an aborted run
    pub fn report(&self) -> Option<&IngestReport> {
        match self {
            IngestError::Aborted { report, .. } => Some(report),
            _ => None,
        }
    }
}
