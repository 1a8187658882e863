//! Database client seam.
//!
//! The import pipeline issues exactly three statement shapes: idempotent
//! `CREATE TABLE`, `SELECT COUNT(*)`, and batched `INSERT`. The `Database`
//! trait captures that surface so tests can substitute recording or
//! SQLite-backed doubles for the shipped MySQL client.

mod mysql;

pub use mysql::MySqlDatabase;

use crate::error::ImportError;

/// Connection parameters for the target database.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub dbname: String,
}

/// Minimal synchronous database client.
///
/// One connection, one statement at a time. Implementations quote
/// identifiers for their own dialect.
pub trait Database {
    /// Execute a statement, discarding any result set.
    fn execute(&mut self, sql: &str) -> Result<(), ImportError>;

    /// Current row count of a table. An empty result set is an error here;
    /// the caller decides whether that defaults to zero.
    fn count_rows(&mut self, table: &str) -> Result<u64, ImportError>;
}
