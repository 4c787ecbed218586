//! Reference indexing engine backed by SQLite.
//!
//! `FsEngine` walks discovery entry points on blocking worker threads,
//! classifies files by extension, and keeps a small file index with `sqlx`.
//! It does not extract metadata or generate snapshots; it only picks up
//! snapshots that already exist as `<snapshot_dir>/<id>.jpg`.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, OnceLock, Weak},
};

use {
    parking_lot::RwLock,
    tokio::runtime::Handle,
    tracing::Level,
};

use crate::{
    error::domain::EngineError,
    library::{
        engine::{EngineCallbacks, EngineLogger, IndexingEngine, TracingLogger},
        models::{FileKind, FileRecord},
    },
};

pub mod schema;
pub mod store;
pub mod walker;

use {
    store::{FileStore, Upsert},
    walker::{collect_media_files, read_stamp},
};

/// State available once the engine is initialized.
struct Storage {
    /// File index.
    store: FileStore,
    /// Directory holding snapshots.
    snapshot_dir: PathBuf,
    /// Receiver of engine events.
    callbacks: Weak<dyn EngineCallbacks>,
}

/// State shared with discovery workers.
struct Shared {
    /// Runtime used for database access and discovery workers.
    runtime: Handle,
    /// Set once by `initialize`.
    storage: OnceLock<Storage>,
    /// Current log sink.
    logger: RwLock<Arc<dyn EngineLogger>>,
}

/// Filesystem indexing engine.
///
/// Methods block on the database through the runtime handle, so they must be
/// called from outside async contexts (the UI thread or blocking workers).
pub struct FsEngine {
    shared: Arc<Shared>,
}

impl FsEngine {
    /// Creates an engine that runs its work on `runtime`.
    #[must_use]
    pub fn new(runtime: Handle) -> Self {
        Self {
            shared: Arc::new(Shared {
                runtime,
                storage: OnceLock::new(),
                logger: RwLock::new(Arc::new(TracingLogger)),
            }),
        }
    }

    /// Engine factory suitable for `MediaLibrary::new`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Creation` when the runtime cannot run blocking
    /// work (a current-thread runtime would deadlock discovery).
    pub fn create(runtime: Handle) -> Result<Arc<dyn IndexingEngine>, EngineError> {
        if matches!(
            runtime.runtime_flavor(),
            tokio::runtime::RuntimeFlavor::CurrentThread
        ) {
            return Err(EngineError::Creation {
                reason: "a multi-threaded runtime is required".to_string(),
            });
        }
        Ok(Arc::new(Self::new(runtime)))
    }

    fn storage(&self) -> Result<&Storage, EngineError> {
        self.shared.storage.get().ok_or(EngineError::NotInitialized)
    }

    fn files_of_kind(&self, kind: FileKind) -> Result<Vec<FileRecord>, EngineError> {
        let storage = self.storage()?;
        let mut records = self
            .shared
            .runtime
            .block_on(storage.store.files_of_kind(kind))?;

        for record in &mut records {
            let snapshot = storage.snapshot_dir.join(format!("{}.jpg", record.id));
            if snapshot.is_file() {
                record.snapshot = Some(snapshot);
            }
        }
        Ok(records)
    }
}

impl Shared {
    fn log(&self, level: Level, message: &str) {
        self.logger.read().log(level, message);
    }

    /// Walks `entry_point` and reports every new or changed file.
    ///
    /// Runs on a blocking worker. Stops early if the callbacks receiver is
    /// gone.
    fn run_discovery(&self, storage: &Storage, entry_point: &Path) {
        let logger = self.logger.read().clone();
        let files = collect_media_files(entry_point, logger.as_ref());
        self.log(
            Level::DEBUG,
            &format!("Found {} media files under {:?}", files.len(), entry_point),
        );

        for (path, kind) in files {
            let Some(callbacks) = storage.callbacks.upgrade() else {
                self.log(Level::DEBUG, "Callbacks receiver dropped, aborting discovery");
                return;
            };

            let stamp = match read_stamp(&path) {
                Ok(stamp) => stamp,
                Err(e) => {
                    self.log(Level::WARN, &format!("Skipping file: {}", e));
                    continue;
                }
            };

            match self.runtime.block_on(storage.store.upsert(&path, kind, stamp)) {
                Ok(Upsert::Added(record)) => callbacks.on_file_added(&record),
                Ok(Upsert::Updated(record)) => callbacks.on_file_updated(&record),
                Ok(Upsert::Unchanged) => {}
                Err(e) => self.log(Level::WARN, &format!("Failed to index {:?}: {}", path, e)),
            }
        }

        if let Some(callbacks) = storage.callbacks.upgrade() {
            callbacks.on_discovery_completed(entry_point);
        }
    }
}

impl IndexingEngine for FsEngine {
    fn initialize(
        &self,
        database_path: &Path,
        snapshot_dir: &Path,
        callbacks: Weak<dyn EngineCallbacks>,
    ) -> Result<(), EngineError> {
        if self.shared.storage.get().is_some() {
            return Err(EngineError::AlreadyInitialized);
        }

        let store = self.shared.runtime.block_on(FileStore::open(database_path))?;
        self.shared
            .storage
            .set(Storage {
                store,
                snapshot_dir: snapshot_dir.to_path_buf(),
                callbacks,
            })
            .map_err(|_| EngineError::AlreadyInitialized)?;

        self.shared.log(
            Level::INFO,
            &format!("Opened media database {:?}", database_path),
        );
        Ok(())
    }

    fn set_logger(&self, logger: Arc<dyn EngineLogger>) {
        *self.shared.logger.write() = logger;
    }

    fn discover(&self, entry_point: &Path) -> Result<(), EngineError> {
        let storage = self.storage()?;
        if !entry_point.is_dir() {
            return Err(EngineError::InvalidLocation {
                path: entry_point.to_path_buf(),
            });
        }

        self.shared
            .runtime
            .block_on(storage.store.add_entry_point(entry_point))?;

        // Started is reported before returning so callers observe an active
        // discovery as soon as `discover` succeeds.
        if let Some(callbacks) = storage.callbacks.upgrade() {
            callbacks.on_discovery_started(entry_point);
        }

        let shared = self.shared.clone();
        let entry_point = entry_point.to_path_buf();
        self.shared.runtime.spawn_blocking(move || {
            if let Some(storage) = shared.storage.get() {
                shared.run_discovery(storage, &entry_point);
            }
        });
        Ok(())
    }

    fn reload(&self) -> Result<(), EngineError> {
        let storage = self.storage()?;
        let entry_points = self.shared.runtime.block_on(storage.store.entry_points())?;

        for entry_point in entry_points {
            if let Err(e) = self.discover(&entry_point) {
                self.shared.log(
                    Level::WARN,
                    &format!("Failed to reload {:?}: {}", entry_point, e),
                );
            }
        }
        Ok(())
    }

    fn audio_files(&self) -> Result<Vec<FileRecord>, EngineError> {
        self.files_of_kind(FileKind::Audio)
    }

    fn video_files(&self) -> Result<Vec<FileRecord>, EngineError> {
        self.files_of_kind(FileKind::Video)
    }
}
