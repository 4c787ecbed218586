//! Boundary to the media indexing engine.
//!
//! The engine discovers files, keeps the database, and answers queries. The
//! core only consumes it through `IndexingEngine` and receives its events
//! through `EngineCallbacks`, which may be invoked from any engine thread.

use std::{
    path::Path,
    sync::{Arc, Weak},
};

use tracing::{Level, debug, error, info, trace, warn};

use crate::{error::domain::EngineError, library::models::FileRecord};

pub mod fs;
#[cfg(test)]
pub(crate) mod mock;

pub use fs::FsEngine;

/// Events an engine reports back to the core.
pub trait EngineCallbacks: Send + Sync {
    /// A file was indexed for the first time.
    fn on_file_added(&self, file: &FileRecord);
    /// An already indexed file changed.
    fn on_file_updated(&self, file: &FileRecord);
    /// A discovery of `entry_point` started.
    fn on_discovery_started(&self, entry_point: &Path);
    /// A discovery of `entry_point` finished.
    fn on_discovery_completed(&self, entry_point: &Path);
}

/// Sink for the engine's own log messages.
pub trait EngineLogger: Send + Sync {
    /// Records one message at `level`.
    fn log(&self, level: Level, message: &str);
}

/// `EngineLogger` forwarding to `tracing` under the `medialib::engine` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl EngineLogger for TracingLogger {
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::ERROR => error!(target: "medialib::engine", "{}", message),
            Level::WARN => warn!(target: "medialib::engine", "{}", message),
            Level::INFO => info!(target: "medialib::engine", "{}", message),
            Level::DEBUG => debug!(target: "medialib::engine", "{}", message),
            Level::TRACE => trace!(target: "medialib::engine", "{}", message),
        }
    }
}

/// Media indexing engine consumed by `MediaLibrary`.
///
/// Query methods are called from blocking worker threads; implementations
/// may block.
pub trait IndexingEngine: Send + Sync {
    /// Opens the database and starts reporting events to `callbacks`.
    ///
    /// # Arguments
    ///
    /// * `database_path` - Database file to open or create.
    /// * `snapshot_dir` - Directory holding generated snapshots.
    /// * `callbacks` - Receiver of engine events. Held weakly so the engine
    ///   never keeps the library alive.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the storage cannot be opened.
    fn initialize(
        &self,
        database_path: &Path,
        snapshot_dir: &Path,
        callbacks: Weak<dyn EngineCallbacks>,
    ) -> Result<(), EngineError>;

    /// Replaces the engine's log sink.
    fn set_logger(&self, logger: Arc<dyn EngineLogger>);

    /// Starts discovering `entry_point` in the background.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the discovery cannot be started.
    fn discover(&self, entry_point: &Path) -> Result<(), EngineError>;

    /// Re-discovers every known entry point.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the known entry points cannot be listed.
    fn reload(&self) -> Result<(), EngineError>;

    /// Lists every indexed audio file.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the query fails.
    fn audio_files(&self) -> Result<Vec<FileRecord>, EngineError>;

    /// Lists every indexed video file.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the query fails.
    fn video_files(&self) -> Result<Vec<FileRecord>, EngineError>;
}
