//! brickdb - a versioned, referentially-checked store for a brick catalog
//!
//! A dataset snapshot (one row stream per table) is normalized, checked
//! and loaded into a fresh generation in dependency order, then served
//! through a typed query layer by a single pointer swap.
//!
//! ```ignore
//! use brickdb::ingest::{IngestConfig, IngestionPipeline, JsonlDirectorySource};
//! use brickdb::query::{Catalog, Filter, RollupOptions};
//! use brickdb::record::Set;
//! use brickdb::storage::StorageEngine;
//!
//! let engine = StorageEngine::open(data_dir)?;
//! IngestionPipeline::new(&engine, IngestConfig::default())
//!     .run(&JsonlDirectorySource::new(dataset_dir))?;
//!
//! let catalog = Catalog::current(&engine);
//! let falcon = catalog.entity::<Set>().find("10179-1")?;
//! let pieces = catalog.set_piece_count("10179-1", RollupOptions::default())?;
//! ```

pub mod cli;
pub mod ingest;
pub mod normalize;
pub mod observability;
pub mod query;
pub mod record;
pub mod schema;
pub mod storage;
pub mod version;
