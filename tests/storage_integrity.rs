//! Storage Integrity Tests
//!
//! - A committed generation survives a restart row for row
//! - Corruption of the catalog file is never ignored
//! - A run that does not commit leaves the catalog file untouched
//! - The recorded dataset version survives a restart

mod common;

use brickdb::ingest::{rebuild, IngestConfig, IngestError, IngestionPipeline, RebuildOutcome};
use brickdb::query::{Catalog, RollupOptions};
use brickdb::record::{Record, Set};
use brickdb::schema::{EntityKind, SchemaRegistry};
use brickdb::storage::{StorageEngine, StorageErrorCode, CATALOG_FILE};
use brickdb::version::VersionTracker;
use rusqlite::Connection;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

use common::{fixture, load, FIXTURE_ROWS};

fn create_temp_data_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

// =============================================================================
// Persistence
// =============================================================================

/// Reopening serves the generation that was committed.
#[test]
fn test_committed_generation_survives_reopen() {
    let temp_dir = create_temp_data_dir();
    let registry = SchemaRegistry::catalog();

    let (id, rows) = {
        let engine = StorageEngine::open(temp_dir.path()).unwrap();
        let outcome = load(&engine, &fixture("v1"));
        let rows: Vec<Record> = outcome.generation.records(registry).collect();
        (outcome.generation.id(), rows)
    };

    let engine = StorageEngine::open(temp_dir.path()).unwrap();
    let served = engine.current_generation();
    assert_eq!(served.id(), id);
    assert_eq!(served.version(), Some("v1"));
    assert_eq!(served.total_rows(), FIXTURE_ROWS);
    assert_eq!(served.records(registry).collect::<Vec<_>>(), rows);

    let catalog = Catalog::current(&engine);
    assert_eq!(catalog.entity::<Set>().find("100-1").unwrap().num_parts, 14);
    assert_eq!(
        catalog
            .set_piece_count("100-1", RollupOptions::default())
            .unwrap(),
        14
    );
}

/// A fresh data directory serves the empty generation.
#[test]
fn test_open_empty_directory() {
    let temp_dir = create_temp_data_dir();
    let data_dir = temp_dir.path().join("nested/data");

    let engine = StorageEngine::open(&data_dir).unwrap();
    assert!(data_dir.exists());
    assert!(engine.current_generation().is_empty());
    assert!(!data_dir.join(CATALOG_FILE).exists());
}

// =============================================================================
// Corruption
// =============================================================================

/// A row edited behind the engine's back fails the open.
#[test]
fn test_corruption_causes_explicit_failure() {
    let temp_dir = create_temp_data_dir();
    let catalog_path = temp_dir.path().join(CATALOG_FILE);

    {
        let engine = StorageEngine::open(temp_dir.path()).unwrap();
        load(&engine, &fixture("v1"));
    }

    let conn = Connection::open(&catalog_path).unwrap();
    let changed = conn
        .execute("UPDATE inventory_parts SET quantity = quantity + 1 WHERE rowid = 1", [])
        .unwrap();
    assert_eq!(changed, 1);
    drop(conn);

    let err = StorageEngine::open(temp_dir.path()).unwrap_err();
    assert_eq!(err.code(), StorageErrorCode::BrickDataCorruption);
    assert!(err.is_fatal());
}

/// Bytes that are not a SQLite database fail the open.
#[test]
fn test_foreign_file_causes_explicit_failure() {
    let temp_dir = create_temp_data_dir();
    fs::write(temp_dir.path().join(CATALOG_FILE), b"{\"sets\": []}\n").unwrap();

    let err = StorageEngine::open(temp_dir.path()).unwrap_err();
    assert_eq!(err.code(), StorageErrorCode::BrickDataCorruption);
}

/// A truncated file is corruption, not a shorter catalog.
#[test]
fn test_truncation_causes_explicit_failure() {
    let temp_dir = create_temp_data_dir();
    let catalog_path = temp_dir.path().join(CATALOG_FILE);

    {
        let engine = StorageEngine::open(temp_dir.path()).unwrap();
        load(&engine, &fixture("v1"));
    }

    let contents = fs::read(&catalog_path).unwrap();
    fs::write(&catalog_path, &contents[..contents.len() / 2]).unwrap();

    let err = StorageEngine::open(temp_dir.path()).unwrap_err();
    assert_eq!(err.code(), StorageErrorCode::BrickDataCorruption);
}

// =============================================================================
// Failed Runs
// =============================================================================

/// An aborted run does not rewrite the catalog file.
#[test]
fn test_aborted_run_leaves_file_unchanged() {
    let temp_dir = create_temp_data_dir();
    let catalog_path = temp_dir.path().join(CATALOG_FILE);

    let engine = StorageEngine::open(temp_dir.path()).unwrap();
    load(&engine, &fixture("v1"));
    let before = fs::read(&catalog_path).unwrap();

    let mut source = fixture("v2");
    source.push_rows(
        EntityKind::Part,
        (0..20).map(|n| json!({"part_num": format!("x{}", n), "name": "Orphan", "part_cat_id": "999"})),
    );
    let config = IngestConfig {
        max_rejection_rate: Some(0.05),
        min_rows_for_rate: 10,
    };
    let result = IngestionPipeline::new(&engine, config).run(&source);
    assert!(matches!(result, Err(IngestError::Aborted { .. })));

    assert_eq!(fs::read(&catalog_path).unwrap(), before);
    assert!(!temp_dir.path().join("catalog.db.tmp").exists());

    drop(engine);
    let reopened = StorageEngine::open(temp_dir.path()).unwrap();
    assert_eq!(reopened.current_generation().version(), Some("v1"));
}

// =============================================================================
// Version Tracking
// =============================================================================

/// After a restart the same snapshot is not loaded again.
#[test]
fn test_rebuild_skips_served_version_after_restart() {
    let temp_dir = create_temp_data_dir();

    {
        let engine = StorageEngine::open(temp_dir.path()).unwrap();
        let tracker = VersionTracker::open(temp_dir.path()).unwrap();
        let outcome = rebuild(&fixture("v1"), &engine, &tracker, IngestConfig::default()).unwrap();
        assert!(matches!(outcome, RebuildOutcome::Rebuilt(_)));
    }

    let engine = StorageEngine::open(temp_dir.path()).unwrap();
    let tracker = VersionTracker::open(temp_dir.path()).unwrap();
    assert_eq!(tracker.current_version().as_deref(), Some("v1"));

    let outcome = rebuild(&fixture("v1"), &engine, &tracker, IngestConfig::default()).unwrap();
    match outcome {
        RebuildOutcome::Skipped { version } => assert_eq!(version, "v1"),
        other => panic!("expected Skipped, got {:?}", other),
    }

    let outcome = rebuild(&fixture("v2"), &engine, &tracker, IngestConfig::default()).unwrap();
    assert!(matches!(outcome, RebuildOutcome::Rebuilt(_)));
    assert_eq!(tracker.current_version().as_deref(), Some("v2"));
}

/// A manifest for a generation that is no longer served forces a reload.
#[test]
fn test_stale_manifest_forces_rebuild() {
    let temp_dir = create_temp_data_dir();

    {
        let engine = StorageEngine::open(temp_dir.path()).unwrap();
        let tracker = VersionTracker::open(temp_dir.path()).unwrap();
        rebuild(&fixture("v1"), &engine, &tracker, IngestConfig::default()).unwrap();
    }
    fs::remove_file(temp_dir.path().join(CATALOG_FILE)).unwrap();

    let engine = StorageEngine::open(temp_dir.path()).unwrap();
    let tracker = VersionTracker::open(temp_dir.path()).unwrap();
    let outcome = rebuild(&fixture("v1"), &engine, &tracker, IngestConfig::default()).unwrap();
    assert!(matches!(outcome, RebuildOutcome::Rebuilt(_)));
    assert_eq!(engine.current_generation().version(), Some("v1"));
}
