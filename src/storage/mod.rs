//! Storage subsystem for brickdb
//!
//! Holds catalog data as generations: immutable, fully populated sets of
//! entity tables with primary-key maps and foreign-key indexes. A new
//! generation is built in isolation and made visible by one pointer swap.
//!
//! # Design Principles
//!
//! - Generations are never mutated after commit
//! - Referential closure is verified before a generation is served
//! - Persisted as one SQLite file per generation, replaced by rename
//! - Content checksum over every persisted row
//! - Halt on corruption: a damaged catalog file is never served

mod checksum;
mod engine;
mod errors;
mod generation;
mod index;
mod layout;
mod reader;
mod table;
mod writer;

pub use checksum::ContentChecksum;
pub use engine::StorageEngine;
pub use errors::{Severity, StorageError, StorageErrorCode, StorageResult};
pub use generation::{Generation, GenerationBuilder, GenerationId};
pub use index::{IndexTree, RowOrdinal};
pub use layout::{CatalogMetadata, FORMAT_VERSION};
pub use reader::CatalogReader;
pub use table::{AnyTable, Table, Tables};
pub use writer::{CatalogWriter, CATALOG_FILE};
