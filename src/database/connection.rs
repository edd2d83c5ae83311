/*!
 * Database connection management.
 *
 * A single SQLite connection behind a mutex. Async callers go through
 * `spawn_blocking` so the runtime is never blocked on disk I/O, and every
 * transaction holds the lock for its whole duration, which serializes
 * concurrent saves of the same chapter.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::schema;

/// Default database filename
const DEFAULT_DB_FILENAME: &str = "novellama.db";

/// Default database directory name under user's data directory
const DEFAULT_DB_DIRNAME: &str = "novellama";

/// Database connection wrapper with thread-safe access
#[derive(Clone)]
pub struct DatabaseConnection {
    /// Path to the database file
    db_path: PathBuf,
    /// Thread-safe connection wrapped in Arc<Mutex>
    connection: Arc<Mutex<Connection>>,
}

impl DatabaseConnection {
    /// Create a new database connection at the default location
    pub fn new_default() -> Result<Self> {
        let db_path = Self::default_database_path()?;
        Self::new(&db_path)
    }

    /// Create a new database connection at the specified path
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }

        info!("Opening database at: {:?}", db_path);

        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open database: {:?}", db_path))?;

        // Initialize schema
        schema::initialize_schema(&conn)?;

        Ok(Self {
            db_path,
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        debug!("Creating in-memory database");

        let conn =
            Connection::open_in_memory().context("Failed to create in-memory database")?;

        // Initialize schema
        schema::initialize_schema(&conn)?;

        Ok(Self {
            db_path: PathBuf::from(":memory:"),
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Get the default database path
    pub fn default_database_path() -> Result<PathBuf> {
        // Try to use the system data directory
        let base_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

        let db_dir = base_dir.join(DEFAULT_DB_DIRNAME);
        let db_path = db_dir.join(DEFAULT_DB_FILENAME);

        Ok(db_path)
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn lock(connection: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
        connection
            .lock()
            .map_err(|e| anyhow::anyhow!("Database lock poisoned: {}", e))
    }

    /// Run `f` on the connection from the calling thread
    ///
    /// Only for synchronous callers; async code uses `execute_async`.
    pub fn execute<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        f(&*Self::lock(&self.connection)?)
    }

    /// Run `f` on the connection inside `spawn_blocking`
    pub async fn execute_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = self.connection.clone();

        tokio::task::spawn_blocking(move || f(&*Self::lock(&connection)?))
            .await
            .context("Database task panicked")?
    }

    /// Run `f` in one transaction inside `spawn_blocking`
    ///
    /// Commits when `f` succeeds and rolls back when it fails. The lock is
    /// held until the commit, so transactions never interleave.
    pub async fn transaction_async<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let connection = self.connection.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = Self::lock(&connection)?;
            let tx = conn.transaction()?;
            let result = f(&tx)?;
            tx.commit()?;
            Ok(result)
        })
        .await
        .context("Database transaction task panicked")?
    }

    /// Open the database at `path`, or at the default location when `None`
    pub fn open(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::new(path),
            None => Self::new_default(),
        }
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DatabaseStats> {
        self.execute(|conn| {
            let count = |sql: &str| -> Result<i64> {
                conn.query_row(sql, [], |row| row.get(0))
                    .with_context(|| format!("Failed to run: {}", sql))
            };

            let novel_count = count("SELECT COUNT(*) FROM novels")?;
            let chapter_count = count("SELECT COUNT(*) FROM chapters")?;
            let translated_chapters =
                count("SELECT COUNT(*) FROM chapters WHERE TRIM(translated_text) <> ''")?;
            let revision_count = count("SELECT COUNT(*) FROM chapter_revisions")?;
            let reference_count = count("SELECT COUNT(*) FROM novel_references")?;

            let file_size = if self.db_path.to_string_lossy() != ":memory:" {
                std::fs::metadata(&self.db_path)
                    .map(|m| m.len())
                    .unwrap_or(0)
            } else {
                0
            };

            Ok(DatabaseStats {
                novel_count,
                chapter_count,
                translated_chapters,
                revision_count,
                reference_count,
                file_size_bytes: file_size,
            })
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseStats {
    pub novel_count: i64,
    pub chapter_count: i64,
    /// Chapters with a non-blank translation
    pub translated_chapters: i64,
    pub revision_count: i64,
    pub reference_count: i64,
    /// Database file size in bytes
    pub file_size_bytes: u64,
}

impl std::fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Novels: {}, Chapters: {} ({} translated), Revisions: {}, References: {}, Size: {} KB",
            self.novel_count,
            self.chapter_count,
            self.translated_chapters,
            self.revision_count,
            self.reference_count,
            self.file_size_bytes / 1024
        )
    }
}
