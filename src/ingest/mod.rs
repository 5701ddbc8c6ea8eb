//! Dataset ingestion
//!
//! Streams a dataset snapshot into a fresh generation in dependency order,
//! rejecting bad rows individually and committing the result atomically.
//!
//! # Design Principles
//!
//! - A bad row is reported, never fatal on its own
//! - Foreign keys are checked against rows already loaded in the scratch
//!   generation, so load order is mandatory
//! - Nothing becomes visible to readers before commit

mod errors;
mod pipeline;
mod report;
mod source;
mod tabular;

pub use errors::{IngestError, IngestResult};
pub use pipeline::{rebuild, CancelFlag, IngestConfig, IngestOutcome, IngestionPipeline, RebuildOutcome};
pub use report::{IngestReport, KindCounts, RejectReason, RejectedRow, RowLocator, REPORT_FILE};
pub use source::{DatasetSource, JsonlDirectorySource, MemorySource, RowStream, SourceError, VERSION_FILE};
pub use tabular::CsvDirectorySource;
