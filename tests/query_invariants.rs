//! Query Invariant Tests
//!
//! - A reader sees one generation for as long as it holds its handle
//! - Lookups, filters, joins and aggregates agree with the loaded rows

mod common;

use brickdb::query::{Catalog, Filter, QueryError, Reducer, RollupOptions};
use brickdb::record::{Inventory, InventoryPart, Part, PartCategory, Set, Theme};
use brickdb::schema::{EntityKind, FieldValue};
use brickdb::storage::StorageEngine;
use serde_json::json;
use std::sync::{mpsc, Arc};
use std::thread;

use common::{fixture, load};

fn loaded() -> (StorageEngine, Catalog) {
    let engine = StorageEngine::in_memory();
    load(&engine, &fixture("v1"));
    let catalog = Catalog::current(&engine);
    (engine, catalog)
}

// =============================================================================
// Snapshot Isolation
// =============================================================================

/// A pinned handle keeps answering from its generation after a swap.
#[test]
fn test_pinned_reader_survives_commit() {
    let (engine, pinned) = loaded();

    let mut next = fixture("v2");
    next.push_rows(
        EntityKind::Set,
        vec![json!({"set_num": "300-1", "name": "Helicopter", "year": "2011", "theme_id": "3", "num_parts": "40"})],
    );
    load(&engine, &next);

    assert_eq!(pinned.version(), Some("v1"));
    assert_eq!(pinned.entity::<Set>().count(), 2);
    assert!(pinned.entity::<Set>().get("300-1").is_none());

    let fresh = Catalog::current(&engine);
    assert_eq!(fresh.version(), Some("v2"));
    assert_eq!(fresh.entity::<Set>().count(), 3);
    assert_ne!(fresh.generation_id(), pinned.generation_id());
}

/// A reader on another thread keeps its generation while a commit lands.
#[test]
fn test_reader_thread_isolated_from_commit() {
    let engine = Arc::new(StorageEngine::in_memory());
    load(&engine, &fixture("v1"));

    let (pinned_tx, pinned_rx) = mpsc::channel();
    let (committed_tx, committed_rx) = mpsc::channel::<()>();

    let reader = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            let catalog = Catalog::current(&engine);
            let before = catalog.entity::<Set>().count();
            pinned_tx.send(()).unwrap();

            committed_rx.recv().unwrap();
            let after = catalog.entity::<Set>().count();
            (catalog.version().map(str::to_string), before, after)
        })
    };

    pinned_rx.recv().unwrap();
    let mut next = fixture("v2");
    next.push_rows(
        EntityKind::Set,
        vec![json!({"set_num": "300-1", "name": "Helicopter", "year": "2011", "theme_id": "3", "num_parts": "40"})],
    );
    load(&engine, &next);
    committed_tx.send(()).unwrap();

    let (version, before, after) = reader.join().unwrap();
    assert_eq!(version.as_deref(), Some("v1"));
    assert_eq!(before, 2);
    assert_eq!(after, 2);

    let fresh = Catalog::current(&engine);
    assert_eq!(fresh.version(), Some("v2"));
    assert_eq!(fresh.entity::<Set>().count(), 3);
}

/// Many readers loading while commits land always see a whole generation.
#[test]
fn test_concurrent_readers_see_whole_generations() {
    let engine = Arc::new(StorageEngine::in_memory());
    load(&engine, &fixture("v1"));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..200 {
                    let catalog = Catalog::current(&engine);
                    let sets = catalog.entity::<Set>().count();
                    match catalog.version() {
                        Some("v1") => assert_eq!(sets, 2),
                        Some("v2") => assert_eq!(sets, 3),
                        other => panic!("unexpected version {:?}", other),
                    }
                }
            })
        })
        .collect();

    for round in 0..5 {
        let mut source = fixture(if round % 2 == 0 { "v2" } else { "v1" });
        if round % 2 == 0 {
            source.push_rows(
                EntityKind::Set,
                vec![json!({"set_num": "300-1", "name": "Helicopter", "year": "2011", "theme_id": "3", "num_parts": "40"})],
            );
        }
        load(&engine, &source);
    }

    for reader in readers {
        reader.join().unwrap();
    }
}

/// Before any load the served generation is empty, not an error.
#[test]
fn test_empty_engine_serves_empty_catalog() {
    let engine = StorageEngine::in_memory();
    let catalog = Catalog::current(&engine);

    assert_eq!(catalog.version(), None);
    assert_eq!(catalog.entity::<Set>().count(), 0);
    assert!(catalog.entity::<Set>().find("100-1").is_err());
}

// =============================================================================
// Lookup And Filter
// =============================================================================

#[test]
fn test_find_and_not_found() {
    let (_engine, catalog) = loaded();

    let station = catalog.entity::<Set>().find("100-1").unwrap();
    assert_eq!(station.name, "Police Station");
    assert_eq!(station.theme_id, 3);

    let err = catalog.entity::<Set>().find("9999-1").unwrap_err();
    assert_eq!(err.kind, EntityKind::Set);

    let err = catalog
        .set_part_totals("9999-1", RollupOptions::default())
        .unwrap_err();
    assert!(matches!(err, QueryError::NotFound(_)));
}

#[test]
fn test_filter_is_typed() {
    let (_engine, catalog) = loaded();

    let older = catalog
        .entity::<Set>()
        .filter(Filter::new().lt("year", 2010))
        .unwrap();
    let names: Vec<_> = older.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Patrol Car"]);

    // text never equals an int
    let none = catalog
        .entity::<Set>()
        .filter(Filter::new().eq("year", "2009"))
        .unwrap();
    assert!(none.is_empty());

    let printed = catalog
        .entity::<Part>()
        .filter(Filter::new().not_null("parent_part_num"))
        .unwrap();
    assert_eq!(printed.count(), 1);
    assert_eq!(printed.first().unwrap().part_num, "3001pr1");
}

#[test]
fn test_filter_unknown_field_rejected() {
    let (_engine, catalog) = loaded();

    let err = catalog
        .entity::<Set>()
        .filter(Filter::new().eq("colour", 4))
        .err()
        .unwrap();
    assert!(matches!(err, QueryError::UnknownField { .. }));
}

// =============================================================================
// Joins And Aggregates
// =============================================================================

#[test]
fn test_join_parts_to_categories() {
    let (_engine, catalog) = loaded();

    let join = catalog.entity::<Part>().join::<PartCategory>().unwrap();
    let mut pairs: Vec<_> = join
        .iter()
        .map(|(part, cat)| (part.part_num.as_str(), cat.name.as_str()))
        .collect();
    pairs.sort();

    assert_eq!(
        pairs,
        vec![
            ("3001", "Bricks"),
            ("3001pr1", "Bricks"),
            ("3020", "Plates"),
            ("973", "Minifig Torsos"),
        ]
    );
}

#[test]
fn test_reverse_join_inventory_lines() {
    let (_engine, catalog) = loaded();

    let station = catalog
        .entity::<Inventory>()
        .filter(Filter::new().eq("set_num", "100-1"))
        .unwrap();
    let lines = station.join::<InventoryPart>().unwrap();
    assert_eq!(lines.count(), 2);
}

#[test]
fn test_aggregate_quantity_by_inventory() {
    let (_engine, catalog) = loaded();

    let rows = catalog
        .entity::<InventoryPart>()
        .aggregate(&["inventory_id"], Reducer::sum("quantity"))
        .unwrap();
    let sums: Vec<_> = rows
        .iter()
        .map(|row| (row.group[0].clone(), row.value.clone()))
        .collect();

    assert_eq!(
        sums,
        vec![
            (FieldValue::Int(1), FieldValue::Int(5)),
            (FieldValue::Int(2), FieldValue::Int(5)),
            (FieldValue::Int(3), FieldValue::Int(1)),
        ]
    );

    let err = catalog
        .entity::<Set>()
        .aggregate(&[], Reducer::sum("name"))
        .unwrap_err();
    assert!(matches!(err, QueryError::NotNumeric { .. }));
}

#[test]
fn test_theme_ancestors_walk_to_root() {
    let (_engine, catalog) = loaded();

    let names: Vec<_> = catalog
        .theme_ancestors(3)
        .unwrap()
        .into_iter()
        .map(|t: &Theme| t.name.as_str())
        .collect();
    assert_eq!(names, vec!["City", "Town"]);
}
