//! Data models shared by the engine boundary and the GUI boundary.
//!
//! `FileRecord` is what an indexing engine stores and returns. `MediaItem` is
//! the transient representation handed to observers and query callbacks.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::PathBuf,
    str::FromStr,
};

use {
    serde::{Deserialize, Serialize},
    thiserror::Error,
};

/// Kind of file as classified by the indexing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    /// Audio-only media.
    Audio,
    /// Video media.
    Video,
    /// The engine could not classify the file.
    Unknown,
}

impl FileKind {
    /// Stable name used when persisting the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Audio => "audio",
            FileKind::Video => "video",
            FileKind::Unknown => "unknown",
        }
    }
}

impl Display for FileKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "audio" => FileKind::Audio,
            "video" => FileKind::Video,
            _ => FileKind::Unknown,
        })
    }
}

/// A file known to the indexing engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Engine-assigned identifier.
    pub id: i64,
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Classification of the file.
    pub kind: FileKind,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time in seconds since the Unix epoch.
    pub modified: i64,
    /// Title, when the engine knows one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Snapshot (thumbnail) path, when one was generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PathBuf>,
}

/// Kind of a UI-facing media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    /// Audio track.
    Audio,
    /// Video.
    Video,
}

/// Media item as seen by GUI observers and query callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Identifier of the underlying file record.
    pub id: i64,
    /// Absolute path of the media file.
    pub path: PathBuf,
    /// Display title.
    pub title: String,
    /// Audio or video.
    pub kind: MediaKind,
    /// File size in bytes.
    pub size: u64,
    /// Snapshot (thumbnail) path, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PathBuf>,
}

/// Reasons a `FileRecord` cannot become a `MediaItem`.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MappingError {
    /// The engine did not classify the file as audio or video.
    #[error("Unsupported file kind for {path:?}: {kind}")]
    UnsupportedKind { path: PathBuf, kind: FileKind },
    /// The path has no file name to derive a title from.
    #[error("Invalid media path: {path:?}")]
    InvalidPath { path: PathBuf },
}

impl TryFrom<&FileRecord> for MediaItem {
    type Error = MappingError;

    fn try_from(record: &FileRecord) -> Result<Self, Self::Error> {
        let kind = match record.kind {
            FileKind::Audio => MediaKind::Audio,
            FileKind::Video => MediaKind::Video,
            FileKind::Unknown => {
                return Err(MappingError::UnsupportedKind {
                    path: record.path.clone(),
                    kind: record.kind,
                });
            }
        };

        let title = match record.title.as_deref().filter(|t| !t.trim().is_empty()) {
            Some(title) => title.to_string(),
            None => record
                .path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .filter(|stem| !stem.is_empty())
                .ok_or_else(|| MappingError::InvalidPath {
                    path: record.path.clone(),
                })?
                .to_string(),
        };

        Ok(MediaItem {
            id: record.id,
            path: record.path.clone(),
            title,
            kind,
            size: record.size,
            snapshot: record.snapshot.clone(),
        })
    }
}
