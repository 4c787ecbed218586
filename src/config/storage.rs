//! On-disk layout of the media library's persistent state.

use std::{
    fs::DirBuilder,
    io::{Error as IoError, ErrorKind::AlreadyExists},
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::error::domain::LibraryError;

/// File name of the media database inside the data directory.
pub const DATABASE_FILE_NAME: &str = "medialib.db";

/// Name of the snapshot directory inside the data directory.
pub const SNAPSHOT_DIR_NAME: &str = "snapshots";

/// Paths of the media database and snapshot directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    /// Application data directory.
    pub data_dir: PathBuf,
    /// Media database file.
    pub database_path: PathBuf,
    /// Snapshot directory.
    pub snapshot_dir: PathBuf,
}

impl StorageLayout {
    /// Derives the layout rooted at `data_dir`.
    #[must_use]
    pub fn new(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            database_path: data_dir.join(DATABASE_FILE_NAME),
            snapshot_dir: data_dir.join(SNAPSHOT_DIR_NAME),
        }
    }

    /// Creates the data and snapshot directories, owner-only, if absent.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::CreateDirectory` for any failure other than the
    /// directory already existing.
    pub fn prepare(&self) -> Result<(), LibraryError> {
        create_private_dir(&self.data_dir, true)?;
        create_private_dir(&self.snapshot_dir, false)?;
        Ok(())
    }
}

fn create_private_dir(path: &Path, recursive: bool) -> Result<(), LibraryError> {
    let mut builder = DirBuilder::new();
    builder.recursive(recursive);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }

    match builder.create(path) {
        Ok(()) => {
            debug!("Created directory {:?}", path);
            Ok(())
        }
        Err(e) if e.kind() == AlreadyExists && path.is_dir() => Ok(()),
        Err(source) => Err(create_error(path, source)),
    }
}

fn create_error(path: &Path, source: IoError) -> LibraryError {
    LibraryError::CreateDirectory {
        path: path.to_path_buf(),
        source,
    }
}
