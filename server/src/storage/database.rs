//! SQLite database handle.
//!
//! Owns the single connection to the relational store and makes sure the
//! `test_case` table exists before anything else touches it.

use std::path::Path;

use rusqlite::Connection;

/// Path value that selects a private in-memory database.
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Busy timeout applied to every connection.
const BUSY_TIMEOUT_MS: u64 = 5_000;

/// Schema for the only persisted entity.
///
/// `AUTOINCREMENT` keeps ids from being reused after the highest row is deleted.
const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS test_case (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    gherkin_script TEXT,
    created_at INTEGER NOT NULL
);";

/// A database instance.
///
/// This is the entry point for working with the relational store. It owns the
/// underlying connection; callers borrow it through [`Database::connection`].
pub struct Database {
    connection: Connection,
}

impl Database {
    /// Open the database at `path`, creating the file and its parent directory
    /// if they don't exist yet.
    ///
    /// The special path `:memory:` opens a private in-memory database.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if path.as_os_str() == IN_MEMORY_PATH {
            return Self::open_in_memory();
        }
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let connection = Connection::open(path)?;
        connection.execute_batch("PRAGMA journal_mode = wal;")?;
        Self::initialize(connection)
    }

    /// Open a fresh in-memory database. Contents vanish when it is dropped.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::initialize(Connection::open_in_memory()?)
    }

    /// Borrow the underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }

    fn initialize(connection: Connection) -> Result<Self, DatabaseError> {
        connection.busy_timeout(std::time::Duration::from_millis(BUSY_TIMEOUT_MS))?;
        connection.execute_batch(SCHEMA)?;
        Ok(Self { connection })
    }
}

/// Errors that can occur during database operations.
#[derive(Debug)]
pub enum DatabaseError {
    /// Creating the database directory failed.
    Io(std::io::Error),
    /// SQLite rejected an operation.
    Sqlite(rusqlite::Error),
    /// Another thread panicked while holding the connection.
    LockPoisoned,
}

impl std::fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::Sqlite(e) => write!(f, "sqlite error: {e}"),
            Self::LockPoisoned => write!(f, "database lock poisoned"),
        }
    }
}

impl std::error::Error for DatabaseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Sqlite(e) => Some(e),
            Self::LockPoisoned => None,
        }
    }
}

impl From<std::io::Error> for DatabaseError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sqlite(e)
    }
}
