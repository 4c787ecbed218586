//! User preference management with XDG Base Directory compliance.
//!
//! Settings live in `$XDG_CONFIG_HOME/medialib/settings.json`. The media
//! database and snapshots live under the application data directory.

use std::{
    env::var,
    fs::{create_dir_all, read_to_string, write},
    io::Error as StdError,
    path::PathBuf,
};

use {
    parking_lot::{RwLock, RwLockReadGuard},
    serde::{Deserialize, Serialize},
    serde_json::{Error as SerdeJsonError, from_str, to_string_pretty},
    thiserror::Error,
    tracing::debug,
};

use crate::library::{LibraryConfig, coalescer::DEFAULT_CHANGE_THRESHOLD};

/// Directory name used under the XDG base directories.
const APP_DIR_NAME: &str = "medialib";

/// Error type for settings operations.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Failed to read or write settings file.
    #[error("IO error: {0}")]
    IoError(#[from] StdError),
    /// Failed to serialize or deserialize settings.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] SerdeJsonError),
    /// Invalid settings value.
    #[error("Invalid settings value: {reason}")]
    InvalidValue { reason: String },
}

/// Serializable library settings with default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Directories discovered at startup.
    pub discovery_directories: Vec<PathBuf>,
    /// Number of added files that forces a library-changed notification.
    pub change_threshold: usize,
    /// Overrides the application data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_directory: Option<PathBuf>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            discovery_directories: vec![],
            change_threshold: DEFAULT_CHANGE_THRESHOLD,
            data_directory: None,
        }
    }
}

impl LibrarySettings {
    /// Resolves the application data directory.
    ///
    /// # Returns
    ///
    /// The configured override, else the XDG data directory, or `None` when
    /// no location can be determined.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_directory.clone().or_else(get_data_dir)
    }

    /// Checks values that would break the library at runtime.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidValue` for a zero change threshold.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.change_threshold == 0 {
            return Err(SettingsError::InvalidValue {
                reason: "change_threshold must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl From<&LibrarySettings> for LibraryConfig {
    fn from(settings: &LibrarySettings) -> Self {
        Self {
            change_threshold: settings.change_threshold,
        }
    }
}

/// Handles loading, saving, and validation of library settings.
#[derive(Debug)]
pub struct SettingsManager {
    /// Thread-safe settings storage.
    settings: RwLock<LibrarySettings>,
    /// Path to the configuration file on disk.
    config_path: PathBuf,
}

impl SettingsManager {
    /// Creates a new settings manager with the default config path.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if settings cannot be loaded from disk.
    pub fn new() -> Result<Self, SettingsError> {
        Self::with_config_path(get_config_path())
    }

    /// Creates a new settings manager with a custom config path.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Path of the settings file.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the file exists but cannot be read, parsed,
    /// or validated.
    pub fn with_config_path(config_path: PathBuf) -> Result<Self, SettingsError> {
        if let Some(parent) = config_path.parent() {
            create_dir_all(parent)?;
        }

        let settings: LibrarySettings = if config_path.exists() {
            debug!("Loading settings from existing file: {:?}", config_path);
            let contents = read_to_string(&config_path)?;
            from_str(&contents)?
        } else {
            debug!("Using default settings, no file at {:?}", config_path);
            LibrarySettings::default()
        };
        settings.validate()?;

        Ok(SettingsManager {
            settings: RwLock::new(settings),
            config_path,
        })
    }

    /// Gets the current settings.
    pub fn get_settings(&self) -> RwLockReadGuard<'_, LibrarySettings> {
        self.settings.read()
    }

    /// Gets the configuration file path.
    pub fn get_config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Validates, applies and saves new settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the settings are invalid or cannot be saved.
    pub fn update_settings(&self, new_settings: LibrarySettings) -> Result<(), SettingsError> {
        new_settings.validate()?;
        *self.settings.write() = new_settings;
        self.save_settings()
    }

    fn save_settings(&self) -> Result<(), SettingsError> {
        debug!("Saving settings to file: {:?}", self.config_path);
        let contents = to_string_pretty(&*self.settings.read())?;
        write(&self.config_path, contents)?;
        Ok(())
    }
}

/// Path of the settings file.
#[must_use]
pub fn get_config_path() -> PathBuf {
    let mut config_dir = xdg_home("XDG_CONFIG_HOME", ".config").unwrap_or_else(|| PathBuf::from("."));
    config_dir.push(APP_DIR_NAME);
    config_dir.push("settings.json");
    config_dir
}

/// Default application data directory.
///
/// Uses `XDG_DATA_HOME`, falling back to `$HOME/.local/share`.
///
/// # Returns
///
/// `None` when neither variable is set.
#[must_use]
pub fn get_data_dir() -> Option<PathBuf> {
    let mut data_dir = xdg_home("XDG_DATA_HOME", ".local/share")?;
    data_dir.push(APP_DIR_NAME);
    Some(data_dir)
}

/// Resolves an XDG base directory from `variable`, else `$HOME/<fallback>`.
fn xdg_home(variable: &str, fallback: &str) -> Option<PathBuf> {
    if let Ok(dir) = var(variable)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }

    var("HOME")
        .ok()
        .filter(|home| !home.is_empty())
        .map(|home| PathBuf::from(home).join(fallback))
}
