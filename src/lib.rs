//! medialib - media library change-notification core
//!
//! Sits between a media indexing engine and a single-threaded UI event loop.
//! High-frequency file events from the engine are coalesced into
//! low-frequency "library changed" notifications, single-item updates are
//! routed to the first observer that claims them, and media queries run on
//! worker threads with their results delivered back on the UI thread.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod library;

// Re-export key types for convenience
pub use {
    config::{LibrarySettings, SettingsManager},
    dispatch::{UiDispatcher, UiLoop, ui_channel},
    error::{EngineError, LibraryError},
    library::{
        ChangeObserver, ContentSource, ControllerOptions, FsEngine, IndexingEngine,
        ItemUpdatedObserver, LibraryConfig, LibraryController, MediaItem, MediaKind,
        MediaLibrary,
    },
};
