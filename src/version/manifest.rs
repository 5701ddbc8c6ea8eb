//! Version manifest
//!
//! `version.json` in the data directory names the dataset snapshot the
//! served generation was built from:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "version": "2024-06-01",
//!   "generation_id": "1b4e28ba-2fa1-11d2-883f-0016d3cca427",
//!   "recorded_at": "2024-06-01T12:00:00Z",
//!   "total_rows": 1832
//! }
//! ```

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{Generation, GenerationId};

use super::errors::{VersionError, VersionResult};

/// File name of the manifest inside the data directory
pub const MANIFEST_FILE: &str = "version.json";

pub const MANIFEST_FORMAT_VERSION: u8 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionManifest {
    pub format_version: u8,
    /// Dataset version identifier (VERSION marker or content fingerprint)
    pub version: String,
    pub generation_id: GenerationId,
    pub recorded_at: DateTime<Utc>,
    pub total_rows: usize,
}

impl VersionManifest {
    /// Manifest for a committed generation
    ///
    /// # Errors
    ///
    /// `Unversioned` for the empty placeholder generation.
    pub fn for_generation(generation: &Generation) -> VersionResult<Self> {
        let version = generation
            .version()
            .ok_or_else(|| VersionError::Unversioned(generation.id().to_string()))?;
        Ok(Self {
            format_version: MANIFEST_FORMAT_VERSION,
            version: version.to_string(),
            generation_id: generation.id(),
            recorded_at: Utc::now(),
            total_rows: generation.total_rows(),
        })
    }

    pub fn to_json(&self) -> VersionResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> VersionResult<Self> {
        let manifest: Self = serde_json::from_str(json)?;
        if manifest.format_version != MANIFEST_FORMAT_VERSION {
            return Err(VersionError::UnsupportedFormat(manifest.format_version));
        }
        Ok(manifest)
    }

    /// Write through a temp file, fsync, then rename into place
    pub fn write_to_file(&self, path: &Path) -> VersionResult<()> {
        let json = self.to_json()?;
        let temp_path = path.with_extension("json.tmp");

        let mut file = File::create(&temp_path).map_err(|e| VersionError::io(&temp_path, e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| VersionError::io(&temp_path, e))?;
        file.sync_all().map_err(|e| VersionError::io(&temp_path, e))?;

        fs::rename(&temp_path, path).map_err(|e| VersionError::io(path, e))?;
        Ok(())
    }

    /// Read a manifest; `Ok(None)` when the file does not exist
    pub fn read_from_file(path: &Path) -> VersionResult<Option<Self>> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_json(&content).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(VersionError::io(path, e)),
        }
    }
}
