//! Media library change-notification core.
//!
//! This module sits between the indexing engine and the UI: it coalesces
//! engine events into library-changed notifications, routes item updates to
//! observers, and answers media queries on the UI thread.

pub mod coalescer;
pub mod config;
pub mod controller;
pub mod engine;
pub mod media_library;
mod media_library_tests;
pub mod models;
pub mod query;
pub mod registry;

pub use {
    coalescer::{ChangeCoalescer, DEFAULT_CHANGE_THRESHOLD, Flush},
    config::LibraryConfig,
    controller::{ContentSource, ControllerOptions, LibraryController},
    engine::{EngineCallbacks, EngineLogger, FsEngine, IndexingEngine, TracingLogger},
    media_library::MediaLibrary,
    models::{FileKind, FileRecord, MappingError, MediaItem, MediaKind},
    query::MediaQuery,
    registry::{ChangeObserver, ItemUpdatedObserver, ListenerRegistry},
};
