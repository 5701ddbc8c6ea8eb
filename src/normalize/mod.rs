//! Row normalization
//!
//! Turns loosely typed dataset rows into validated, typed records:
//! - numeric fields parse with strict base-10 semantics
//! - empty strings and nulls mean "absent", never zero
//! - fields not declared by the table are ignored

mod errors;
mod normalizer;
mod row;

pub use errors::{RowValidationError, Violation};
pub use normalizer::{RawRow, RowNormalizer};
pub use row::NormalizedRow;
