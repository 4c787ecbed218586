//! In-memory engine used by the core's tests.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Weak},
};

use parking_lot::{Mutex, RwLock};

use crate::{
    error::domain::EngineError,
    library::{
        engine::{EngineCallbacks, EngineLogger, IndexingEngine},
        models::{FileKind, FileRecord},
    },
};

/// Scriptable engine: queries return canned records, calls are recorded.
#[derive(Default)]
pub(crate) struct MockEngine {
    pub audio: RwLock<Vec<FileRecord>>,
    pub video: RwLock<Vec<FileRecord>>,
    pub fail_queries: RwLock<bool>,
    pub panic_queries: RwLock<bool>,
    pub fail_initialize: RwLock<bool>,
    pub initialized_with: Mutex<Option<(PathBuf, PathBuf)>>,
    pub discovered: Mutex<Vec<PathBuf>>,
    pub reloads: Mutex<usize>,
    pub logger_set: Mutex<bool>,
    callbacks: Mutex<Option<Weak<dyn EngineCallbacks>>>,
}

impl MockEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_audio(records: Vec<FileRecord>) -> Arc<Self> {
        let engine = Self::new();
        *engine.audio.write() = records;
        engine
    }

    /// Callbacks handed over by `initialize`, if still alive.
    pub fn callbacks(&self) -> Option<Arc<dyn EngineCallbacks>> {
        self.callbacks.lock().as_ref().and_then(Weak::upgrade)
    }
}

/// Builds a record for tests.
pub(crate) fn record(id: i64, path: &str, kind: FileKind) -> FileRecord {
    FileRecord {
        id,
        path: PathBuf::from(path),
        kind,
        size: 1024,
        modified: 1_700_000_000,
        title: None,
        snapshot: None,
    }
}

impl IndexingEngine for MockEngine {
    fn initialize(
        &self,
        database_path: &Path,
        snapshot_dir: &Path,
        callbacks: Weak<dyn EngineCallbacks>,
    ) -> Result<(), EngineError> {
        if *self.fail_initialize.read() {
            return Err(EngineError::Query {
                reason: "database locked".to_string(),
            });
        }
        *self.initialized_with.lock() =
            Some((database_path.to_path_buf(), snapshot_dir.to_path_buf()));
        *self.callbacks.lock() = Some(callbacks);
        Ok(())
    }

    fn set_logger(&self, _logger: Arc<dyn EngineLogger>) {
        *self.logger_set.lock() = true;
    }

    fn discover(&self, entry_point: &Path) -> Result<(), EngineError> {
        self.discovered.lock().push(entry_point.to_path_buf());
        Ok(())
    }

    fn reload(&self) -> Result<(), EngineError> {
        *self.reloads.lock() += 1;
        Ok(())
    }

    fn audio_files(&self) -> Result<Vec<FileRecord>, EngineError> {
        if *self.panic_queries.read() {
            panic!("audio index corrupted");
        }
        if *self.fail_queries.read() {
            return Err(EngineError::Query {
                reason: "index offline".to_string(),
            });
        }
        Ok(self.audio.read().clone())
    }

    fn video_files(&self) -> Result<Vec<FileRecord>, EngineError> {
        if *self.panic_queries.read() {
            panic!("video index corrupted");
        }
        if *self.fail_queries.read() {
            return Err(EngineError::Query {
                reason: "index offline".to_string(),
            });
        }
        Ok(self.video.read().clone())
    }
}
