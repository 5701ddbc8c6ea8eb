//! Schema registry
//!
//! Static description of every entity kind: its fields, primary key and
//! foreign-key edges, plus the load order those edges imply.
//!
//! # Design Principles
//!
//! - Declarations are compile-time data, never loaded from the dataset
//! - A cycle among non-hierarchical foreign keys is a declaration defect
//!   and fails registry construction
//! - Hierarchical self references (parent theme, parent part) are left out
//!   of the load order and resolved in a second pass during ingestion

mod errors;
mod registry;
mod types;
mod value;

pub use errors::{SchemaError, SchemaErrorCode, SchemaResult};
pub use registry::{schema_for, SchemaRegistry, ALL_TABLES};
pub use types::{EntityKind, EntitySchema, FieldCheck, FieldDef, FieldType, ForeignKey};
pub use value::{FieldValue, RowKey};
