//! Storage engine and the served generation pointer
//!
//! The served generation is an `Arc<Generation>` in an `ArcSwap`: readers
//! load it without taking a lock and keep their `Arc` for as long as they
//! need a consistent view. Commits are serialized by a writer-only mutex
//! held across closure check, persist and swap, so the file on disk and
//! the served pointer always name the same generation.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;

use crate::observability::{log_event_with_fields, metrics, Event, ObservationScope};
use crate::schema::SchemaRegistry;

use super::errors::{StorageError, StorageResult};
use super::generation::{Generation, GenerationBuilder};
use super::reader::CatalogReader;
use super::writer::{CatalogWriter, CATALOG_FILE};

/// Embedded catalog store
pub struct StorageEngine {
    registry: &'static SchemaRegistry,
    served: ArcSwap<Generation>,
    /// Held by a commit from closure check to swap
    commit_lock: Mutex<()>,
    /// Persistence target; `None` for a purely in-memory engine
    writer: Option<CatalogWriter>,
}

impl StorageEngine {
    /// Engine without persistence, serving the empty generation
    pub fn in_memory() -> Self {
        Self::with_registry(SchemaRegistry::catalog())
    }

    /// In-memory engine over an explicit registry
    pub fn with_registry(registry: &'static SchemaRegistry) -> Self {
        Self {
            registry,
            served: ArcSwap::from_pointee(Generation::empty()),
            commit_lock: Mutex::new(()),
            writer: None,
        }
    }

    /// Open the engine on `data_dir`, serving the generation in
    /// `catalog.db` if one exists.
    ///
    /// # Errors
    ///
    /// `BRICK_DATA_CORRUPTION` (fatal) if the catalog file is damaged.
    pub fn open(data_dir: &Path) -> StorageResult<Self> {
        let registry = SchemaRegistry::catalog();

        if !data_dir.exists() {
            fs::create_dir_all(data_dir).map_err(|e| {
                StorageError::write_failed(
                    format!("Failed to create data directory: {}", data_dir.display()),
                    e,
                )
            })?;
        }

        let path = data_dir.join(CATALOG_FILE);
        let generation = if path.exists() {
            CatalogReader::open(&path)?.load(registry).map_err(|e| {
                if e.is_fatal() {
                    log_event_with_fields(
                        Event::StorageCorruption,
                        &[
                            ("path", path.display().to_string().as_str()),
                            ("error", e.to_string().as_str()),
                        ],
                    );
                }
                e
            })?
        } else {
            Generation::empty()
        };

        log_event_with_fields(
            Event::StorageOpened,
            &[
                ("path", path.display().to_string().as_str()),
                ("version", generation.version().unwrap_or("")),
                ("rows", generation.total_rows().to_string().as_str()),
            ],
        );

        Ok(Self {
            registry,
            served: ArcSwap::from_pointee(generation),
            commit_lock: Mutex::new(()),
            writer: Some(CatalogWriter::new(path)),
        })
    }

    pub fn registry(&self) -> &'static SchemaRegistry {
        self.registry
    }

    /// Path of the catalog file, if the engine persists
    pub fn catalog_path(&self) -> Option<&Path> {
        self.writer.as_ref().map(CatalogWriter::path)
    }

    /// Open a scratch generation for `version`.
    ///
    /// Nothing inserted into it is visible until `commit_generation`.
    pub fn begin_generation(&self, version: impl Into<String>) -> GenerationBuilder {
        let builder = GenerationBuilder::new(version.into());
        log_event_with_fields(
            Event::GenerationBegin,
            &[
                ("generation_id", builder.id().to_string().as_str()),
                ("version", builder.version()),
            ],
        );
        builder
    }

    /// Verify, persist and serve `builder`'s generation.
    ///
    /// On any error the previously served generation stays served and the
    /// catalog file is unchanged. Concurrent commits run one at a time; the
    /// last to finish is served.
    pub fn commit_generation(&self, builder: GenerationBuilder) -> StorageResult<Arc<Generation>> {
        let generation = builder.finish();
        let id = generation.id().to_string();
        let _commit = self.commit_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let scope =
            ObservationScope::with_fields("GENERATION_COMMIT", &[("generation_id", id.as_str())]);

        if let Err(e) = generation.verify_closure(self.registry) {
            scope.fail(&e.to_string());
            self.log_discarded(&id, "closure_violation");
            return Err(e);
        }

        if let Some(writer) = &self.writer {
            if let Err(e) = writer.write(&generation, self.registry) {
                scope.fail(&e.to_string());
                self.log_discarded(&id, "persist_failed");
                return Err(e);
            }
        }

        let generation = Arc::new(generation);
        let previous = self.served.swap(Arc::clone(&generation));

        scope.complete_with_fields(&[("rows", generation.total_rows().to_string().as_str())]);
        metrics().increment_committed();
        log_event_with_fields(
            Event::GenerationCommitted,
            &[
                ("generation_id", id.as_str()),
                ("version", generation.version().unwrap_or("")),
            ],
        );
        log_event_with_fields(
            Event::GenerationRetired,
            &[
                ("generation_id", previous.id().to_string().as_str()),
                ("readers", (Arc::strong_count(&previous) - 1).to_string().as_str()),
            ],
        );

        Ok(generation)
    }

    /// Abandon a scratch generation. The served generation is unaffected.
    pub fn discard_generation(&self, builder: GenerationBuilder, reason: &str) {
        self.log_discarded(&builder.id().to_string(), reason);
    }

    /// The generation currently served to readers
    pub fn current_generation(&self) -> Arc<Generation> {
        self.served.load_full()
    }

    fn log_discarded(&self, id: &str, reason: &str) {
        log_event_with_fields(
            Event::GenerationDiscarded,
            &[("generation_id", id), ("reason", reason)],
        );
    }
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("catalog_path", &self.catalog_path())
            .field("served", &self.current_generation().id())
            .finish()
    }
}
