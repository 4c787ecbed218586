//! Database schema definition and versioning for the filesystem engine.

use std::path::Path;

use {
    sqlx::{
        SqlitePool,
        sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous},
    },
    thiserror::Error,
    tracing::debug,
};

/// Error type for schema operations.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),
    /// Schema migration error.
    #[error("Schema migration error: {reason}")]
    MigrationError { reason: String },
}

/// Current schema version.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Creates and checks the engine's tables.
pub struct SchemaManager {
    pool: SqlitePool,
}

impl SchemaManager {
    /// Creates a new schema manager.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initializes the database schema.
    ///
    /// Creates the tables on a fresh database and verifies the version of an
    /// existing one.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if table creation fails or the stored version is
    /// not the current one.
    pub async fn initialize_schema(&self) -> Result<(), SchemaError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        let current_version: Option<i32> =
            sqlx::query_scalar("SELECT version FROM schema_version LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;

        match current_version {
            None => {
                debug!("Fresh database, creating schema version {}", CURRENT_SCHEMA_VERSION);
                self.create_tables().await?;
                sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
                    .bind(CURRENT_SCHEMA_VERSION)
                    .execute(&self.pool)
                    .await?;
            }
            Some(version) if version == CURRENT_SCHEMA_VERSION => {}
            Some(version) => {
                return Err(SchemaError::MigrationError {
                    reason: format!("Schema migration from version {} not implemented", version),
                });
            }
        }

        Ok(())
    }

    async fn create_tables(&self) -> Result<(), SchemaError> {
        sqlx::query(
            r#"
            CREATE TABLE files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                path TEXT NOT NULL UNIQUE,
                kind TEXT NOT NULL,
                size INTEGER NOT NULL,
                modified INTEGER NOT NULL,
                title TEXT,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE entry_points (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                path TEXT NOT NULL UNIQUE,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX idx_files_kind ON files (kind)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Gets the stored schema version, or 0 if not initialized.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` if the version cannot be read.
    pub async fn get_current_version(&self) -> Result<i32, SchemaError> {
        let version: Option<i32> = sqlx::query_scalar("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;

        Ok(version.unwrap_or(0))
    }
}

/// Opens (creating if missing) the SQLite database at `database_path`.
///
/// # Errors
///
/// Returns `SchemaError` if the connection pool cannot be created.
pub async fn create_connection_pool(database_path: &Path) -> Result<SqlitePool, SchemaError> {
    let options = SqliteConnectOptions::new()
        .filename(database_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

    let pool = SqlitePool::connect_with(options).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;
    use tokio::runtime::Runtime;

    use crate::library::engine::fs::schema::{
        CURRENT_SCHEMA_VERSION, SchemaError, SchemaManager, create_connection_pool,
    };

    #[test]
    fn test_schema_error_display() {
        let migration_error = SchemaError::MigrationError {
            reason: "test error".to_string(),
        };
        assert_eq!(
            migration_error.to_string(),
            "Schema migration error: test error"
        );
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let dir = tempdir().unwrap();
        let runtime = Runtime::new().unwrap();

        runtime.block_on(async {
            let pool = create_connection_pool(&dir.path().join("medialib.db"))
                .await
                .unwrap();
            let manager = SchemaManager::new(pool);
            assert_eq!(manager.get_current_version().await.ok(), None);

            manager.initialize_schema().await.unwrap();
            manager.initialize_schema().await.unwrap();
            assert_eq!(
                manager.get_current_version().await.unwrap(),
                CURRENT_SCHEMA_VERSION
            );
        });
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let dir = tempdir().unwrap();
        let runtime = Runtime::new().unwrap();

        runtime.block_on(async {
            let pool = create_connection_pool(&dir.path().join("medialib.db"))
                .await
                .unwrap();
            sqlx::query("CREATE TABLE schema_version (version INTEGER NOT NULL)")
                .execute(&pool)
                .await
                .unwrap();
            sqlx::query("INSERT INTO schema_version (version) VALUES (99)")
                .execute(&pool)
                .await
                .unwrap();

            let result = SchemaManager::new(pool).initialize_schema().await;
            assert!(matches!(result, Err(SchemaError::MigrationError { .. })));
        });
    }
}
