//! Ingestion pipeline
//!
//! One run is a full rebuild:
//! 1. open a scratch generation
//! 2. for each kind in load order, normalize rows and check every foreign
//!    key against what is already loaded
//! 3. resolve self-referencing hierarchies once their kind is complete
//! 4. apply the strict-mode rejection threshold
//! 5. commit (closure check, persist, swap)
//!
//! A rejected row never stops the run. Source failures, cancellation and
//! an exceeded threshold discard the scratch generation and leave the
//! served one in place.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use crate::normalize::{RawRow, RowNormalizer};
use crate::observability::{log_event_with_fields, metrics, Event, ObservationScope};
use crate::record::Record;
use crate::schema::{EntityKind, EntitySchema, FieldValue, ForeignKey, RowKey};
use crate::storage::{Generation, GenerationBuilder, StorageEngine, StorageErrorCode};
use crate::version::VersionTracker;

use super::errors::{IngestError, IngestResult};
use super::report::{IngestReport, RejectReason, RejectedRow, RowLocator};
use super::source::DatasetSource;

/// Rows between two cancellation checks within one kind
const CANCEL_CHECK_INTERVAL: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IngestConfig {
    /// Strict mode: abort when rejected/seen exceeds this. `None` never aborts.
    pub max_rejection_rate: Option<f64>,
    /// Runs smaller than this are never aborted on rate
    pub min_rows_for_rate: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_rejection_rate: None,
            min_rows_for_rate: 100,
        }
    }
}

impl IngestConfig {
    pub fn strict(max_rejection_rate: f64) -> Self {
        Self {
            max_rejection_rate: Some(max_rejection_rate),
            ..Self::default()
        }
    }
}

/// Shared flag to abandon a run before it commits
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A committed run
#[derive(Debug)]
pub struct IngestOutcome {
    pub generation: Arc<Generation>,
    pub report: IngestReport,
}

#[derive(Debug)]
pub enum RebuildOutcome {
    /// The snapshot is already served
    Skipped { version: String },
    Rebuilt(IngestOutcome),
}

pub struct IngestionPipeline<'e> {
    engine: &'e StorageEngine,
    normalizer: RowNormalizer<'static>,
    config: IngestConfig,
    cancel: CancelFlag,
}

impl<'e> IngestionPipeline<'e> {
    pub fn new(engine: &'e StorageEngine, config: IngestConfig) -> Self {
        Self {
            engine,
            normalizer: RowNormalizer::new(engine.registry()),
            config,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Load `source` into a new generation and serve it
    pub fn run(&self, source: &dyn DatasetSource) -> IngestResult<IngestOutcome> {
        let version = source.version()?;
        self.run_version(source, version)
    }

    fn run_version(&self, source: &dyn DatasetSource, version: String) -> IngestResult<IngestOutcome> {
        let started = Instant::now();
        let scope = ObservationScope::with_fields("INGEST", &[("version", version.as_str())]);
        let mut builder = self.engine.begin_generation(version.as_str());
        let mut report = IngestReport::new(version, builder.id());

        let loaded = self.load_all(source, &mut builder, &mut report);
        report.elapsed_ms = started.elapsed().as_millis() as u64;
        record_metrics(&report);

        if let Err(e) = loaded {
            let reason = match &e {
                IngestError::Cancelled => {
                    log_event_with_fields(
                        Event::IngestCancelled,
                        &[("version", report.version.as_str())],
                    );
                    "cancelled"
                }
                _ => "source_failed",
            };
            scope.fail(&e.to_string());
            self.engine.discard_generation(builder, reason);
            return Err(e);
        }

        if let Some(threshold) = self.config.max_rejection_rate {
            let seen = report.rows_seen();
            let rejected = report.rows_rejected();
            let rate = report.rejection_rate();
            if seen >= self.config.min_rows_for_rate && rate > threshold {
                metrics().increment_aborted();
                log_event_with_fields(
                    Event::IngestAborted,
                    &[
                        ("version", report.version.as_str()),
                        ("rate", format!("{:.4}", rate).as_str()),
                        ("threshold", format!("{:.4}", threshold).as_str()),
                    ],
                );
                scope.fail("rejection_threshold_exceeded");
                self.engine.discard_generation(builder, "rejection_threshold_exceeded");
                return Err(IngestError::Aborted {
                    rate,
                    threshold,
                    rejected,
                    seen,
                    report: Box::new(report),
                });
            }
        }

        let generation = match self.engine.commit_generation(builder) {
            Ok(generation) => generation,
            Err(e) => {
                scope.fail(&e.to_string());
                return Err(e.into());
            }
        };

        report.committed = true;
        report.elapsed_ms = started.elapsed().as_millis() as u64;
        let accepted = report.rows_accepted().to_string();
        let rejected = report.rows_rejected().to_string();
        scope.complete_with_fields(&[("accepted", accepted.as_str()), ("rejected", rejected.as_str())]);

        Ok(IngestOutcome { generation, report })
    }

    fn check_cancelled(&self) -> IngestResult<()> {
        if self.cancel.is_cancelled() {
            return Err(IngestError::Cancelled);
        }
        Ok(())
    }

    fn load_all(
        &self,
        source: &dyn DatasetSource,
        builder: &mut GenerationBuilder,
        report: &mut IngestReport,
    ) -> IngestResult<()> {
        for &kind in self.engine.registry().load_order() {
            self.check_cancelled()?;
            self.load_kind(kind, source, builder, report)?;
        }
        self.check_cancelled()
    }

    fn load_kind(
        &self,
        kind: EntityKind,
        source: &dyn DatasetSource,
        builder: &mut GenerationBuilder,
        report: &mut IngestReport,
    ) -> IngestResult<()> {
        let schema = self.engine.registry().schema(kind);
        let scope = ObservationScope::with_fields("LOAD_ENTITY", &[("table", kind.table_name())]);

        // Hierarchical kinds are held back until every row has been seen
        let hierarchy = schema.hierarchy();
        let mut pending: Vec<Record> = Vec::new();
        let mut pending_index: HashMap<RowKey, usize> = HashMap::new();

        for (ordinal, row) in source.rows(kind)?.enumerate() {
            if ordinal % CANCEL_CHECK_INTERVAL == 0 {
                self.check_cancelled()?;
            }
            report.saw(kind);
            let raw = match row {
                Ok(raw) => raw,
                Err(e) if e.is_row_defect() => {
                    reject(
                        report,
                        RejectedRow {
                            kind,
                            locator: RowLocator::Ordinal(ordinal),
                            field: None,
                            reason: RejectReason::MalformedRow,
                            message: e.to_string(),
                        },
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let record = match self.normalizer.normalize(kind, &raw) {
                Ok(record) => record,
                Err(e) => {
                    reject(
                        report,
                        RejectedRow {
                            kind,
                            locator: locate(schema, &raw, ordinal),
                            field: Some(e.field().to_string()),
                            reason: e.violation().into(),
                            message: e.to_string(),
                        },
                    );
                    continue;
                }
            };

            let key = record.key();
            let locator = if key.is_empty() {
                RowLocator::Ordinal(ordinal)
            } else {
                RowLocator::Key(key.to_string())
            };
            if let Some(fk) = unresolved_reference(schema, &record, builder) {
                reject(report, unresolved_row(kind, locator, fk, &record));
                continue;
            }

            if hierarchy.is_some() {
                if pending_index.contains_key(&key) {
                    reject(report, duplicate_row(kind, locator, &key));
                } else {
                    pending_index.insert(key, pending.len());
                    pending.push(record);
                }
                continue;
            }

            match builder.insert(record) {
                Ok(()) => report.accepted(kind),
                Err(e) if e.code() == StorageErrorCode::BrickDuplicateKey => {
                    reject(report, duplicate_row(kind, locator, &key));
                }
                Err(e) => return Err(e.into()),
            }
        }

        if let Some(fk) = hierarchy {
            let verdicts = hierarchy_verdicts(&pending, &pending_index, fk);
            for (record, verdict) in pending.into_iter().zip(verdicts) {
                match verdict {
                    None => {
                        builder.insert(record)?;
                        report.accepted(kind);
                    }
                    Some(reason) => reject(report, hierarchy_row(kind, fk, &record, reason)),
                }
            }
        }

        let counts = report.counts_for(kind);
        let accepted = counts.accepted.to_string();
        let rejected = counts.rejected.to_string();
        scope.complete_with_fields(&[("accepted", accepted.as_str()), ("rejected", rejected.as_str())]);
        Ok(())
    }
}

/// Run the pipeline unless `tracker` says the source's version is already
/// served, then record the new version.
pub fn rebuild(
    source: &dyn DatasetSource,
    engine: &StorageEngine,
    tracker: &VersionTracker,
    config: IngestConfig,
) -> IngestResult<RebuildOutcome> {
    tracker.reconcile(&engine.current_generation());

    let version = source.version()?;
    if !tracker.needs_rebuild(&version) {
        metrics().increment_skipped();
        log_event_with_fields(Event::RebuildSkipped, &[("version", version.as_str())]);
        return Ok(RebuildOutcome::Skipped { version });
    }

    let outcome = IngestionPipeline::new(engine, config).run_version(source, version)?;
    tracker.record(&outcome.generation)?;
    Ok(RebuildOutcome::Rebuilt(outcome))
}

fn record_metrics(report: &IngestReport) {
    let m = metrics();
    m.add_rows_seen(report.rows_seen() as u64);
    m.add_rows_accepted(report.rows_accepted() as u64);
    m.add_rows_rejected(report.rows_rejected() as u64);
}

fn reject(report: &mut IngestReport, row: RejectedRow) {
    let locator = row.locator.to_string();
    log_event_with_fields(
        Event::RowRejected,
        &[
            ("table", row.kind.table_name()),
            ("row", locator.as_str()),
            ("field", row.field.as_deref().unwrap_or("")),
            ("reason", row.reason.code()),
        ],
    );
    report.reject(row);
}

/// Natural key from the raw row if every key column is present, else
/// the row's ordinal position
fn locate(schema: &EntitySchema, raw: &RawRow, ordinal: usize) -> RowLocator {
    if !schema.is_keyed() {
        return RowLocator::Ordinal(ordinal);
    }
    let parts: Option<Vec<String>> = schema
        .primary_key
        .iter()
        .map(|column| match raw.get(*column) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        })
        .collect();
    match parts {
        Some(parts) => RowLocator::Key(parts.join("/")),
        None => RowLocator::Ordinal(ordinal),
    }
}

/// First non-hierarchical foreign key of `record` that does not resolve
fn unresolved_reference(
    schema: &'static EntitySchema,
    record: &Record,
    builder: &GenerationBuilder,
) -> Option<&'static ForeignKey> {
    schema
        .foreign_keys
        .iter()
        .filter(|fk| !fk.hierarchical)
        .find(|fk| match record.field(fk.field) {
            Some(value) if !value.is_null() => !builder.resolves(fk, &value),
            _ => false,
        })
}

fn target_names(fk: &ForeignKey) -> String {
    fk.targets
        .iter()
        .map(|t| t.table_name())
        .collect::<Vec<_>>()
        .join(" or ")
}

fn unresolved_row(kind: EntityKind, locator: RowLocator, fk: &ForeignKey, record: &Record) -> RejectedRow {
    let value = record.field(fk.field).unwrap_or(FieldValue::Null);
    RejectedRow {
        kind,
        locator,
        field: Some(fk.field.to_string()),
        reason: RejectReason::ForeignKeyUnresolved,
        message: format!("{} {} not found in {}", fk.field, value, target_names(fk)),
    }
}

fn duplicate_row(kind: EntityKind, locator: RowLocator, key: &RowKey) -> RejectedRow {
    RejectedRow {
        kind,
        locator,
        field: None,
        reason: RejectReason::DuplicateKey,
        message: format!("primary key {} already loaded", key),
    }
}

fn hierarchy_row(kind: EntityKind, fk: &ForeignKey, record: &Record, reason: RejectReason) -> RejectedRow {
    let parent = record.field(fk.field).unwrap_or(FieldValue::Null);
    let message = match reason {
        RejectReason::HierarchyCycle => format!("{} {} closes a cycle", fk.field, parent),
        _ => format!("{} {} is missing or rejected", fk.field, parent),
    };
    RejectedRow {
        kind,
        locator: RowLocator::Key(record.key().to_string()),
        field: Some(fk.field.to_string()),
        reason,
        message,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Pending,
    Accepted,
    Rejected(RejectReason),
}

enum Parent {
    Root,
    At(usize),
    Missing,
}

fn parent_of(record: &Record, fk: &ForeignKey, index: &HashMap<RowKey, usize>) -> Parent {
    match record.field(fk.field) {
        None | Some(FieldValue::Null) => Parent::Root,
        Some(value) => match index.get(&RowKey::single(value)) {
            Some(&i) => Parent::At(i),
            None => Parent::Missing,
        },
    }
}

/// Accept (`None`) or reject each pending row of a self-referencing kind.
///
/// Members of a parent cycle get `HierarchyCycle`. A row whose parent is
/// absent, or whose ancestor chain reaches a rejected row, gets
/// `ForeignKeyUnresolved`.
fn hierarchy_verdicts(
    pending: &[Record],
    index: &HashMap<RowKey, usize>,
    fk: &ForeignKey,
) -> Vec<Option<RejectReason>> {
    let mut marks = vec![Mark::Pending; pending.len()];

    for start in 0..pending.len() {
        if marks[start] != Mark::Pending {
            continue;
        }

        let mut path: Vec<usize> = Vec::new();
        let mut position: HashMap<usize, usize> = HashMap::new();
        let mut current = start;

        let outcome = loop {
            match marks[current] {
                Mark::Accepted => break Mark::Accepted,
                Mark::Rejected(_) => break Mark::Rejected(RejectReason::ForeignKeyUnresolved),
                Mark::Pending => {}
            }
            if let Some(&pos) = position.get(&current) {
                for &member in &path[pos..] {
                    marks[member] = Mark::Rejected(RejectReason::HierarchyCycle);
                }
                path.truncate(pos);
                break Mark::Rejected(RejectReason::ForeignKeyUnresolved);
            }
            position.insert(current, path.len());
            path.push(current);

            match parent_of(&pending[current], fk, index) {
                Parent::Root => break Mark::Accepted,
                Parent::Missing => break Mark::Rejected(RejectReason::ForeignKeyUnresolved),
                Parent::At(parent) => current = parent,
            }
        };

        for &node in &path {
            marks[node] = outcome;
        }
    }

    marks
        .into_iter()
        .map(|mark| match mark {
            Mark::Rejected(reason) => Some(reason),
            _ => None,
        })
        .collect()
}
