//! CLI command implementations
//!
//! Each command loads the config, opens the data directory, does one
//! thing and prints one JSON object. Fetching the dataset archive is not
//! a command: `dataset_dir` must already hold the unpacked table files.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::ingest::{
    rebuild, CsvDirectorySource, DatasetSource, IngestConfig, IngestError, IngestReport,
    IngestionPipeline, JsonlDirectorySource, RebuildOutcome, REPORT_FILE,
};
use crate::observability::{log_event_with_fields, set_min_severity, Event, Severity};
use crate::query::{Catalog, RollupOptions};
use crate::storage::StorageEngine;
use crate::version::VersionTracker;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding catalog.db, version.json and report.json (required)
    pub data_dir: String,

    /// Directory of unpacked table files (required)
    pub dataset_dir: String,

    /// Layout of `dataset_dir` (optional, default "jsonl")
    #[serde(default)]
    pub dataset_format: DatasetFormat,

    /// Strict mode threshold (optional, default: no threshold)
    #[serde(default)]
    pub max_rejection_rate: Option<f64>,

    /// Minimum rows before the threshold applies (optional, default 100)
    #[serde(default = "default_min_rows_for_rate")]
    pub min_rows_for_rate: usize,

    /// Minimum log severity (optional, default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// How the dataset directory stores its tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetFormat {
    /// `<table>.jsonl`
    #[default]
    Jsonl,
    /// `<table>.csv` or `<table>.csv.gz`
    Csv,
}

fn default_min_rows_for_rate() -> usize {
    100
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.data_dir.trim().is_empty() {
            return Err(CliError::config_error("data_dir must not be empty"));
        }

        if self.dataset_dir.trim().is_empty() {
            return Err(CliError::config_error("dataset_dir must not be empty"));
        }

        if let Some(rate) = self.max_rejection_rate {
            if !(0.0..=1.0).contains(&rate) {
                return Err(CliError::config_error(format!(
                    "Invalid max_rejection_rate: {}. Must be between 0 and 1.",
                    rate
                )));
            }
        }

        self.severity()?;

        Ok(())
    }

    /// Parsed `log_level`
    pub fn severity(&self) -> CliResult<Severity> {
        self.log_level
            .parse()
            .map_err(|e: String| CliError::config_error(format!("Invalid log_level: {}", e)))
    }

    /// Get data directory as Path
    pub fn data_path(&self) -> &Path {
        Path::new(&self.data_dir)
    }

    /// Get dataset directory as Path
    pub fn dataset_path(&self) -> &Path {
        Path::new(&self.dataset_dir)
    }

    /// The dataset reader for `dataset_format`
    pub fn source(&self) -> Box<dyn DatasetSource> {
        match self.dataset_format {
            DatasetFormat::Jsonl => Box::new(JsonlDirectorySource::new(self.dataset_path())),
            DatasetFormat::Csv => Box::new(CsvDirectorySource::new(self.dataset_path())),
        }
    }

    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            max_rejection_rate: self.max_rejection_rate,
            min_rows_for_rate: self.min_rows_for_rate,
        }
    }
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    let result = run_command(cli.command);
    if let Err(e) = &result {
        write_error(e.code_str(), e.message())?;
    }
    result
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Load { config, force } => load(&config, force),
        Command::Status { config } => status(&config),
        Command::Report { config } => report(&config),
        Command::Inventory {
            config,
            set_num,
            include_spares,
            exclude_minifigs,
        } => {
            let options = RollupOptions {
                include_spares,
                include_minifigs: !exclude_minifigs,
            };
            inventory(&config, &set_num, options)
        }
    }
}

fn boot(config_path: &Path) -> CliResult<(Config, StorageEngine, VersionTracker)> {
    let config = Config::load(config_path)?;
    set_min_severity(config.severity()?);
    log_event_with_fields(
        Event::ConfigLoaded,
        &[
            ("data_dir", config.data_dir.as_str()),
            ("dataset_dir", config.dataset_dir.as_str()),
        ],
    );

    let engine = StorageEngine::open(config.data_path())?;
    let tracker = VersionTracker::open(config.data_path())?;
    Ok((config, engine, tracker))
}

/// Rebuild the catalog from `dataset_dir`
///
/// The load report is written to `report.json` in the data directory,
/// for aborted loads too.
pub fn load(config_path: &Path, force: bool) -> CliResult<()> {
    write_response(execute_load(config_path, force)?)
}

/// Show what the data directory serves
pub fn status(config_path: &Path) -> CliResult<()> {
    write_response(execute_status(config_path)?)
}

/// Print the last load report
pub fn report(config_path: &Path) -> CliResult<()> {
    write_response(execute_report(config_path)?)
}

/// Print a set's rolled-up part totals
pub fn inventory(config_path: &Path, set_num: &str, options: RollupOptions) -> CliResult<()> {
    write_response(execute_inventory(config_path, set_num, options)?)
}

fn execute_load(config_path: &Path, force: bool) -> CliResult<Value> {
    let (config, engine, tracker) = boot(config_path)?;
    let source = config.source();
    let report_path = config.data_path().join(REPORT_FILE);

    let result = if force {
        IngestionPipeline::new(&engine, config.ingest_config())
            .run(source.as_ref())
            .and_then(|outcome| {
                tracker.record(&outcome.generation)?;
                Ok(RebuildOutcome::Rebuilt(outcome))
            })
    } else {
        rebuild(source.as_ref(), &engine, &tracker, config.ingest_config())
    };

    match result {
        Ok(RebuildOutcome::Skipped { version }) => Ok(json!({
            "skipped": true,
            "version": version,
        })),
        Ok(RebuildOutcome::Rebuilt(outcome)) => {
            outcome.report.write_to_file(&report_path)?;
            Ok(summary(&outcome.report))
        }
        Err(e) => {
            if let IngestError::Aborted { report, .. } = &e {
                report.write_to_file(&report_path)?;
            }
            Err(e.into())
        }
    }
}

fn summary(report: &IngestReport) -> Value {
    json!({
        "skipped": false,
        "version": report.version,
        "generation_id": report.generation_id.to_string(),
        "rows_seen": report.rows_seen(),
        "rows_accepted": report.rows_accepted(),
        "rows_rejected": report.rows_rejected(),
        "elapsed_ms": report.elapsed_ms,
    })
}

fn execute_status(config_path: &Path) -> CliResult<Value> {
    let (_config, engine, tracker) = boot(config_path)?;
    let generation = engine.current_generation();

    let tables: serde_json::Map<String, Value> = engine
        .registry()
        .load_order()
        .iter()
        .map(|&kind| (kind.table_name().to_string(), json!(generation.row_count(kind))))
        .collect();

    Ok(json!({
        "version": generation.version(),
        "generation_id": generation.id().to_string(),
        "created_at": generation.created_at().to_rfc3339(),
        "tracked_version": tracker.current_version(),
        "total_rows": generation.total_rows(),
        "tables": tables,
    }))
}

fn execute_report(config_path: &Path) -> CliResult<Value> {
    let config = Config::load(config_path)?;
    let path = config.data_path().join(REPORT_FILE);
    if !path.exists() {
        return Err(CliError::no_report());
    }
    let report = IngestReport::read_from_file(&path)?;
    Ok(serde_json::to_value(&report)?)
}

fn execute_inventory(config_path: &Path, set_num: &str, options: RollupOptions) -> CliResult<Value> {
    let (_config, engine, _tracker) = boot(config_path)?;
    let catalog = Catalog::current(&engine);
    let totals = catalog.set_part_totals(set_num, options)?;

    let parts: Vec<Value> = totals
        .iter()
        .map(|(key, quantity)| {
            json!({
                "part_num": key.part_num,
                "color_id": key.color_id,
                "quantity": quantity,
            })
        })
        .collect();

    Ok(json!({
        "set_num": set_num,
        "version": catalog.version(),
        "pieces": totals.values().sum::<i64>(),
        "parts": parts,
    }))
}
