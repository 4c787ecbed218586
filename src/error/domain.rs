//! Domain-specific error types using `thiserror`.
//!
//! `LibraryError` covers construction and startup of the media library.
//! `EngineError` covers every operation crossing the indexing-engine boundary.

use std::{io::Error as IoError, path::PathBuf};

use {sqlx::Error as SqlxError, thiserror::Error};

use crate::library::engine::fs::schema::SchemaError;

/// Errors raised by an indexing engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine could not be created.
    #[error("Engine creation failed: {reason}")]
    Creation { reason: String },
    /// An operation was attempted before `initialize`.
    #[error("Engine is not initialized")]
    NotInitialized,
    /// `initialize` was called twice.
    #[error("Engine is already initialized")]
    AlreadyInitialized,
    /// A discovery location is missing or not a directory.
    #[error("Invalid discovery location: {path:?}")]
    InvalidLocation { path: PathBuf },
    /// A path cannot be stored because it is not valid UTF-8.
    #[error("Path is not valid UTF-8: {path:?}")]
    NonUtf8Path { path: PathBuf },
    /// Database connection or query error.
    #[error("Database error: {0}")]
    Database(#[from] SqlxError),
    /// Schema initialization error.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
    /// Filesystem access error.
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: IoError,
    },
    /// A query could not be answered.
    #[error("Query failed: {reason}")]
    Query { reason: String },
}

/// Fatal errors surfaced while creating or starting the media library.
#[derive(Error, Debug)]
pub enum LibraryError {
    /// The engine factory failed.
    #[error("Failed to initialize media library engine: {0}")]
    EngineCreation(#[source] EngineError),
    /// No application data directory could be determined.
    #[error("Failed to fetch application data directory")]
    MissingDataDirectory,
    /// A storage directory could not be created.
    #[error("Failed to create directory {path:?}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: IoError,
    },
    /// The engine refused to initialize.
    #[error("Failed to initialize engine storage: {0}")]
    EngineInitialization(#[source] EngineError),
}
