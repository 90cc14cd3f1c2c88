//! Durable storage for `TestCase` records.
//!
//! # Invariants
//!
//! - `id` is assigned by SQLite on insert and never changes afterwards.
//! - `created_at_ms` is written once, on insert, from the store's time source.
//! - There is no update path: a record is created, read, and eventually deleted.
//!
//! Every operation touches at most one row, so no multi-statement transactions
//! are needed.

use std::sync::{Mutex, MutexGuard};

use rusqlite::{OptionalExtension, Row, params};

use crate::storage::database::{Database, DatabaseError};
use crate::storage::time::{SystemTimeSource, TimeSource};

/// A stored test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Generated primary key.
    pub id: i64,
    /// Free-form label; may be absent.
    pub name: Option<String>,
    /// Script text; may be absent and may be arbitrarily large.
    pub script: Option<String>,
    /// Creation time in milliseconds since Unix epoch.
    pub created_at_ms: i64,
}

/// Fields supplied by the caller when creating a test case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTestCase {
    pub name: Option<String>,
    pub script: Option<String>,
}

/// Create, list, fetch and delete operations over the `test_case` table.
///
/// The store is shared across request handlers; the connection is guarded by a
/// mutex so each call has exclusive use of it for the duration of one statement.
pub struct TestCaseStore {
    database: Mutex<Database>,
    time: Box<dyn TimeSource>,
}

impl TestCaseStore {
    /// Wrap `database`, stamping new records with the system clock.
    #[must_use]
    pub fn new(database: Database) -> Self {
        Self::with_time_source(database, Box::new(SystemTimeSource))
    }

    /// Wrap `database`, stamping new records with `time`.
    #[must_use]
    pub fn with_time_source(database: Database, time: Box<dyn TimeSource>) -> Self {
        Self {
            database: Mutex::new(database),
            time,
        }
    }

    /// Persist a new test case and return it with its generated fields.
    pub fn create(&self, new: NewTestCase) -> Result<TestCase, DatabaseError> {
        let created_at_ms = self.time.now_ms();
        let database = self.lock()?;
        database.connection().execute(
            "INSERT INTO test_case (name, gherkin_script, created_at) VALUES (?1, ?2, ?3)",
            params![new.name, new.script, created_at_ms],
        )?;
        let id = database.connection().last_insert_rowid();
        tracing::debug!(id, "created test case");

        Ok(TestCase {
            id,
            name: new.name,
            script: new.script,
            created_at_ms,
        })
    }

    /// Every stored test case, in the table's natural order.
    pub fn list_all(&self) -> Result<Vec<TestCase>, DatabaseError> {
        let database = self.lock()?;
        let mut statement = database
            .connection()
            .prepare_cached("SELECT id, name, gherkin_script, created_at FROM test_case")?;
        let rows = statement.query_map([], read_test_case)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// The test case with `id`, or `None` if there isn't one.
    pub fn get_by_id(&self, id: i64) -> Result<Option<TestCase>, DatabaseError> {
        let database = self.lock()?;
        let mut statement = database.connection().prepare_cached(
            "SELECT id, name, gherkin_script, created_at FROM test_case WHERE id = ?1",
        )?;
        Ok(statement.query_row(params![id], read_test_case).optional()?)
    }

    /// Delete the test case with `id`. Deleting a missing id is a no-op.
    pub fn delete_by_id(&self, id: i64) -> Result<(), DatabaseError> {
        let database = self.lock()?;
        let removed = database
            .connection()
            .execute("DELETE FROM test_case WHERE id = ?1", params![id])?;
        tracing::debug!(id, removed, "deleted test case");
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database>, DatabaseError> {
        self.database.lock().map_err(|_| DatabaseError::LockPoisoned)
    }
}

fn read_test_case(row: &Row<'_>) -> rusqlite::Result<TestCase> {
    Ok(TestCase {
        id: row.get(0)?,
        name: row.get(1)?,
        script: row.get(2)?,
        created_at_ms: row.get(3)?,
    })
}
