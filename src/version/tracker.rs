//! Served-version tracking
//!
//! The tracker only answers "is this snapshot already served?" and records
//! the answer after a commit. Deciding to rebuild is the caller's job.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use crate::observability::{log_event_with_fields, Event, Logger};
use crate::storage::Generation;

use super::errors::VersionResult;
use super::manifest::{VersionManifest, MANIFEST_FILE};

#[derive(Debug)]
pub struct VersionTracker {
    path: Option<PathBuf>,
    current: RwLock<Option<VersionManifest>>,
}

impl VersionTracker {
    /// Tracker that forgets everything when dropped
    pub fn in_memory() -> Self {
        Self {
            path: None,
            current: RwLock::new(None),
        }
    }

    /// Tracker persisted as `version.json` under `data_dir`
    pub fn open(data_dir: &Path) -> VersionResult<Self> {
        let path = data_dir.join(MANIFEST_FILE);
        let current = VersionManifest::read_from_file(&path)?;
        Ok(Self {
            path: Some(path),
            current: RwLock::new(current),
        })
    }

    pub fn current(&self) -> Option<VersionManifest> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn current_version(&self) -> Option<String> {
        self.current().map(|m| m.version)
    }

    /// True iff no generation built from `candidate` is currently served
    pub fn needs_rebuild(&self, candidate: &str) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(true, |m| m.version != candidate)
    }

    /// Forget a manifest that does not describe the `served` generation
    ///
    /// Happens when the catalog file was removed or replaced behind the
    /// tracker's back. Returns whether the manifest was dropped.
    pub fn reconcile(&self, served: &Generation) -> bool {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let stale = matches!(current.as_ref(), Some(m) if m.generation_id != served.id());
        if stale {
            if let Some(manifest) = current.take() {
                Logger::warn(
                    "VERSION_MANIFEST_STALE",
                    &[
                        ("version", manifest.version.as_str()),
                        ("generation_id", manifest.generation_id.to_string().as_str()),
                    ],
                );
            }
        }
        stale
    }

    /// Record `generation` as the served snapshot
    pub fn record(&self, generation: &Generation) -> VersionResult<VersionManifest> {
        let manifest = VersionManifest::for_generation(generation)?;
        if let Some(path) = &self.path {
            manifest.write_to_file(path)?;
        }
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(manifest.clone());

        log_event_with_fields(
            Event::VersionRecorded,
            &[
                ("version", manifest.version.as_str()),
                ("generation_id", manifest.generation_id.to_string().as_str()),
            ],
        );
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{PartCategory, Record};
    use crate::storage::StorageEngine;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn committed(engine: &StorageEngine, version: &str) -> Arc<Generation> {
        let mut builder = engine.begin_generation(version);
        builder
            .insert(Record::PartCategory(PartCategory { id: 1, name: "Bricks".into() }))
            .unwrap();
        engine.commit_generation(builder).unwrap()
    }

    #[test]
    fn test_needs_rebuild_until_recorded() {
        let engine = StorageEngine::in_memory();
        let tracker = VersionTracker::in_memory();
        assert!(tracker.needs_rebuild("v1"));

        let generation = committed(&engine, "v1");
        tracker.record(&generation).unwrap();
        assert!(!tracker.needs_rebuild("v1"));
        assert!(tracker.needs_rebuild("v2"));
        assert_eq!(tracker.current_version().as_deref(), Some("v1"));
    }

    #[test]
    fn test_unversioned_generation_is_refused() {
        let engine = StorageEngine::in_memory();
        let tracker = VersionTracker::in_memory();
        assert!(tracker.record(&engine.current_generation()).is_err());
        assert!(tracker.current().is_none());
    }

    #[test]
    fn test_persists_across_open() {
        let temp_dir = TempDir::new().unwrap();
        let engine = StorageEngine::in_memory();
        let generation = committed(&engine, "v7");

        VersionTracker::open(temp_dir.path())
            .unwrap()
            .record(&generation)
            .unwrap();

        let reopened = VersionTracker::open(temp_dir.path()).unwrap();
        assert!(!reopened.needs_rebuild("v7"));
        assert_eq!(reopened.current().unwrap().generation_id, generation.id());
    }

    #[test]
    fn test_reconcile_drops_stale_manifest() {
        let engine = StorageEngine::in_memory();
        let tracker = VersionTracker::in_memory();
        let first = committed(&engine, "v1");
        tracker.record(&first).unwrap();

        assert!(!tracker.reconcile(&first));
        let second = committed(&engine, "v2");
        assert!(tracker.reconcile(&second));
        assert!(tracker.needs_rebuild("v1"));
    }
}
