//! Query layer
//!
//! Read-only access to one pinned generation: primary-key lookup,
//! predicate filtering, joins over declared relations, group-by
//! aggregation and containment roll-ups.
//!
//! # Design Principles
//!
//! - A `Catalog` never observes a later commit
//! - Results are lazy and restartable; nothing holds a cursor
//! - Predicates never coerce between types

mod aggregate;
mod errors;
mod handle;
mod predicate;
mod rollup;

pub use aggregate::{AggregateRow, Reducer};
pub use errors::{NotFound, QueryError, QueryResult};
pub use handle::{Catalog, Direction, EntityHandle, Join, MatchIter, Matches, Relation};
pub use predicate::{Filter, FilterOp, Predicate};
pub use rollup::{PartColor, PartTotals, RollupOptions};
