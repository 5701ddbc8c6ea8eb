//! Version tracking errors

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for version tracking
pub type VersionResult<T> = Result<T, VersionError>;

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("version manifest I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("version manifest is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unsupported version manifest format {0}")]
    UnsupportedFormat(u8),

    #[error("generation {0} carries no dataset version")]
    Unversioned(String),
}

impl VersionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        VersionError::Io {
            path: path.into(),
            source,
        }
    }
}
