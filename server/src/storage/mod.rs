//! Relational storage for test cases.
//!
//! A single SQLite file holds one table:
//!
//! | column           | type                               |
//! |------------------|------------------------------------|
//! | `id`             | INTEGER PRIMARY KEY AUTOINCREMENT  |
//! | `name`           | TEXT NULL                          |
//! | `gherkin_script` | TEXT NULL                          |
//! | `created_at`     | INTEGER (ms since Unix epoch)      |
//!
//! # Usage
//!
//! ```ignore
//! use nocode_server::storage::{Database, NewTestCase, TestCaseStore};
//!
//! let store = TestCaseStore::new(Database::open(path)?);
//! let created = store.create(NewTestCase { name: Some("login".into()), script: None })?;
//! assert_eq!(store.get_by_id(created.id)?, Some(created));
//! ```

mod database;
mod test_case_store;
pub mod time;

pub use database::{Database, DatabaseError, IN_MEMORY_PATH};
pub use test_case_store::{NewTestCase, TestCase, TestCaseStore};
