//! Recursive collection of media files under a discovery entry point.

use std::{
    fs::{Metadata, metadata, read_dir},
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};

use tracing::Level;

use crate::{
    error::domain::EngineError,
    library::{
        engine::{EngineLogger, fs::store::FileStamp},
        models::FileKind,
    },
};

/// Audio file extensions indexed by the engine.
const AUDIO_EXTENSIONS: &[&str] = &[
    "flac", "mp3", "aac", "m4a", "opus", "ogg", "wav", "aiff", "aif", "mpc", "wma",
];

/// Video file extensions indexed by the engine.
const VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "mov", "webm", "m4v", "mpg", "mpeg", "ts", "wmv", "3gp",
];

/// Classifies a path by extension.
///
/// # Returns
///
/// `Some(kind)` for media files, `None` for anything the engine ignores.
pub fn classify(path: &Path) -> Option<FileKind> {
    let extension = path.extension()?.to_str()?;
    if AUDIO_EXTENSIONS
        .iter()
        .any(|ext| ext.eq_ignore_ascii_case(extension))
    {
        Some(FileKind::Audio)
    } else if VIDEO_EXTENSIONS
        .iter()
        .any(|ext| ext.eq_ignore_ascii_case(extension))
    {
        Some(FileKind::Video)
    } else {
        None
    }
}

/// Extracts the size and modification time the engine tracks.
pub fn stamp_of(metadata: &Metadata) -> FileStamp {
    let modified = metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .and_then(|elapsed| i64::try_from(elapsed.as_secs()).ok())
        .unwrap_or_default();

    FileStamp {
        size: metadata.len(),
        modified,
    }
}

/// Reads the stamp of the file at `path`.
///
/// # Errors
///
/// Returns `EngineError::Io` if the file cannot be stat'ed.
pub fn read_stamp(path: &Path) -> Result<FileStamp, EngineError> {
    metadata(path)
        .map(|meta| stamp_of(&meta))
        .map_err(|source| EngineError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Collects media files below `root`, skipping hidden and non UTF-8 entries.
///
/// Unreadable directories are reported to `logger` and skipped; the walk
/// never fails as a whole. Results are sorted by path.
pub fn collect_media_files(root: &Path, logger: &dyn EngineLogger) -> Vec<(PathBuf, FileKind)> {
    let mut pending = vec![root.to_path_buf()];
    let mut files = Vec::new();

    while let Some(dir) = pending.pop() {
        let entries = match read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                logger.log(Level::WARN, &format!("Failed to read {:?}: {}", dir, e));
                continue;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if is_hidden(&path) {
                continue;
            }
            if path.to_str().is_none() {
                logger.log(Level::WARN, &format!("Skipping non UTF-8 path {:?}", path));
                continue;
            }

            match entry.file_type() {
                Ok(file_type) if file_type.is_dir() => pending.push(path),
                Ok(file_type) if file_type.is_file() => {
                    if let Some(kind) = classify(&path) {
                        files.push((path, kind));
                    }
                }
                _ => {}
            }
        }
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    files
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}
