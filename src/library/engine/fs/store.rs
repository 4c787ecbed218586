//! SQLite access for indexed files and discovery entry points.

use std::path::{Path, PathBuf};

use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use crate::{
    error::domain::EngineError,
    library::{
        engine::fs::schema::{SchemaManager, create_connection_pool},
        models::{FileKind, FileRecord},
    },
};

/// Size and modification time observed on disk for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    /// File size in bytes.
    pub size: u64,
    /// Modification time in seconds since the Unix epoch.
    pub modified: i64,
}

/// Outcome of indexing one file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upsert {
    /// The file was not indexed before.
    Added(FileRecord),
    /// The file was indexed with a different size or modification time.
    Updated(FileRecord),
    /// The index already matches the file.
    Unchanged,
}

/// Persistent file index.
#[derive(Debug, Clone)]
pub struct FileStore {
    pool: SqlitePool,
}

impl FileStore {
    /// Opens the database at `database_path` and ensures its schema.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the database cannot be opened or migrated.
    pub async fn open(database_path: &Path) -> Result<Self, EngineError> {
        let pool = create_connection_pool(database_path).await?;
        SchemaManager::new(pool.clone()).initialize_schema().await?;
        Ok(Self { pool })
    }

    /// Looks up a file by path.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the query fails.
    pub async fn find_by_path(&self, path: &Path) -> Result<Option<FileRecord>, EngineError> {
        let row = sqlx::query("SELECT id, path, kind, size, modified, title FROM files WHERE path = ?")
            .bind(path_to_db(path)?)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    /// Inserts a newly discovered file.
    ///
    /// # Returns
    ///
    /// The stored record, including its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the insert fails.
    pub async fn insert(
        &self,
        path: &Path,
        kind: FileKind,
        stamp: FileStamp,
    ) -> Result<FileRecord, EngineError> {
        let result = sqlx::query("INSERT INTO files (path, kind, size, modified) VALUES (?, ?, ?, ?)")
            .bind(path_to_db(path)?)
            .bind(kind.as_str())
            .bind(size_to_db(stamp.size))
            .bind(stamp.modified)
            .execute(&self.pool)
            .await?;

        Ok(FileRecord {
            id: result.last_insert_rowid(),
            path: path.to_path_buf(),
            kind,
            size: stamp.size,
            modified: stamp.modified,
            title: None,
            snapshot: None,
        })
    }

    /// Indexes a file found on disk, inserting or refreshing its row.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if a query fails.
    pub async fn upsert(
        &self,
        path: &Path,
        kind: FileKind,
        stamp: FileStamp,
    ) -> Result<Upsert, EngineError> {
        match self.find_by_path(path).await? {
            None => Ok(Upsert::Added(self.insert(path, kind, stamp).await?)),
            Some(mut record) if record.size != stamp.size || record.modified != stamp.modified => {
                self.update_stamp(record.id, stamp).await?;
                record.size = stamp.size;
                record.modified = stamp.modified;
                Ok(Upsert::Updated(record))
            }
            Some(_) => Ok(Upsert::Unchanged),
        }
    }

    /// Stores a new size and modification time for an indexed file.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the update fails.
    pub async fn update_stamp(&self, id: i64, stamp: FileStamp) -> Result<(), EngineError> {
        sqlx::query(
            "UPDATE files SET size = ?, modified = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(size_to_db(stamp.size))
        .bind(stamp.modified)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Lists every file of `kind`, ordered by path.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the query fails.
    pub async fn files_of_kind(&self, kind: FileKind) -> Result<Vec<FileRecord>, EngineError> {
        let rows = sqlx::query(
            "SELECT id, path, kind, size, modified, title FROM files WHERE kind = ? ORDER BY path",
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    /// Remembers a discovery entry point for later reloads.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the insert fails.
    pub async fn add_entry_point(&self, path: &Path) -> Result<(), EngineError> {
        sqlx::query("INSERT OR IGNORE INTO entry_points (path) VALUES (?)")
            .bind(path_to_db(path)?)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Lists the remembered entry points in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `EngineError` if the query fails.
    pub async fn entry_points(&self) -> Result<Vec<PathBuf>, EngineError> {
        let paths: Vec<String> = sqlx::query_scalar("SELECT path FROM entry_points ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(paths.into_iter().map(PathBuf::from).collect())
    }
}

fn record_from_row(row: &SqliteRow) -> Result<FileRecord, EngineError> {
    let kind: String = row.try_get("kind")?;
    let size: i64 = row.try_get("size")?;
    let path: String = row.try_get("path")?;

    Ok(FileRecord {
        id: row.try_get("id")?,
        path: PathBuf::from(path),
        kind: kind.parse().unwrap_or(FileKind::Unknown),
        size: u64::try_from(size).unwrap_or_default(),
        modified: row.try_get("modified")?,
        title: row.try_get("title")?,
        snapshot: None,
    })
}

/// Paths are stored as UTF-8 text; other paths are rejected.
fn path_to_db(path: &Path) -> Result<&str, EngineError> {
    path.to_str().ok_or_else(|| EngineError::NonUtf8Path {
        path: path.to_path_buf(),
    })
}

fn size_to_db(size: u64) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}
