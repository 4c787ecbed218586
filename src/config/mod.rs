//! Settings and persistent storage layout.
//!
//! User settings follow the XDG Base Directory specification. The storage
//! layout fixes where the media database and snapshots live.

pub mod settings;
pub mod storage;

pub use {
    settings::{LibrarySettings, SettingsError, SettingsManager, get_config_path, get_data_dir},
    storage::{DATABASE_FILE_NAME, SNAPSHOT_DIR_NAME, StorageLayout},
};
