//! Shared dataset fixture for integration tests
//!
//! A small but complete catalog: a station set holding two patrol
//! sub-sets and one officer minifig, with a theme chain three deep.

#![allow(dead_code)]

use brickdb::ingest::{IngestConfig, IngestOutcome, IngestionPipeline, MemorySource};
use brickdb::schema::EntityKind;
use brickdb::storage::StorageEngine;
use serde_json::json;

pub fn fixture(version: &str) -> MemorySource {
    MemorySource::new(version)
        .with_rows(
            EntityKind::PartCategory,
            vec![
                json!({"id": "11", "name": "Bricks"}),
                json!({"id": "14", "name": "Plates"}),
                json!({"id": "60", "name": "Minifig Torsos"}),
            ],
        )
        .with_rows(
            EntityKind::Color,
            vec![
                json!({"id": "4", "name": "Red", "rgb": "C91A09", "is_trans": "f"}),
                json!({"id": "1", "name": "Blue", "rgb": "0055bf", "is_trans": "f"}),
                json!({"id": "47", "name": "Trans-Clear", "rgb": "FCFCFC", "is_trans": "t"}),
            ],
        )
        .with_rows(
            EntityKind::Theme,
            vec![
                json!({"id": "3", "name": "Police", "parent_id": "2"}),
                json!({"id": "2", "name": "City", "parent_id": "1"}),
                json!({"id": "1", "name": "Town", "parent_id": ""}),
            ],
        )
        .with_rows(
            EntityKind::Part,
            vec![
                json!({"part_num": "3001", "name": "Brick 2 x 4", "part_cat_id": "11"}),
                json!({"part_num": "3001pr1", "name": "Brick 2 x 4 Police Print", "part_cat_id": "11", "parent_part_num": "3001"}),
                json!({"part_num": "3020", "name": "Plate 2 x 4", "part_cat_id": "14"}),
                json!({"part_num": "973", "name": "Torso", "part_cat_id": "60"}),
            ],
        )
        .with_rows(
            EntityKind::PartRelationship,
            vec![json!({"rel_type": "P", "child_part_num": "3001pr1", "parent_part_num": "3001"})],
        )
        .with_rows(
            EntityKind::Element,
            vec![json!({"element_id": "300121", "part_num": "3001", "color_id": "4"})],
        )
        .with_rows(
            EntityKind::Minifig,
            vec![json!({"fig_num": "fig-000001", "name": "Police Officer", "num_parts": "4"})],
        )
        .with_rows(
            EntityKind::Set,
            vec![
                json!({"set_num": "100-1", "name": "Police Station", "year": "2010", "theme_id": "3", "num_parts": "14"}),
                json!({"set_num": "200-1", "name": "Patrol Car", "year": "2009", "theme_id": "3", "num_parts": "5"}),
            ],
        )
        .with_rows(
            EntityKind::Inventory,
            vec![
                json!({"id": "1", "version": "1", "set_num": "100-1"}),
                json!({"id": "2", "version": "1", "set_num": "200-1"}),
                json!({"id": "3", "version": "1", "set_num": "fig-000001"}),
            ],
        )
        .with_rows(
            EntityKind::InventoryPart,
            vec![
                json!({"inventory_id": "1", "part_num": "3001", "color_id": "4", "quantity": "3", "is_spare": "f"}),
                json!({"inventory_id": "1", "part_num": "3020", "color_id": "1", "quantity": "2", "is_spare": "t"}),
                json!({"inventory_id": "2", "part_num": "3001", "color_id": "4", "quantity": "5", "is_spare": "f"}),
                json!({"inventory_id": "3", "part_num": "973", "color_id": "1", "quantity": "1", "is_spare": "f"}),
            ],
        )
        .with_rows(
            EntityKind::InventorySet,
            vec![json!({"inventory_id": "1", "set_num": "200-1", "quantity": "2"})],
        )
        .with_rows(
            EntityKind::InventoryMinifig,
            vec![json!({"inventory_id": "1", "fig_num": "fig-000001", "quantity": "1"})],
        )
}

/// Rows in `fixture`
pub const FIXTURE_ROWS: usize = 27;

pub fn load(engine: &StorageEngine, source: &MemorySource) -> IngestOutcome {
    IngestionPipeline::new(engine, IngestConfig::default())
        .run(source)
        .expect("fixture loads")
}
