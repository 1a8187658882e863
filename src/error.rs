//! Error types for the import pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while importing SQL dump files.
///
/// Only a few of these abort the run: `NoDumpFiles` and `StructureTooLong`
/// are fatal, and a failed database connection surfaces as `Database` before
/// any file is touched. Everything else is handled where it occurs (a file
/// is skipped, or a single statement is dropped) and reported through the
/// message sink.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The import directory contains no SQL dump files.
    #[error("no SQL dump files found in directory: {0}")]
    NoDumpFiles(PathBuf),

    /// A `CREATE TABLE` block did not terminate within the scan bound.
    #[error("table structure in {file} exceeds {limit} lines without ENGINE=InnoDB terminator")]
    StructureTooLong { file: PathBuf, limit: usize },

    /// An `INSERT INTO` line is missing the column-list delimiter or the
    /// statement terminator.
    #[error("malformed INSERT line: {0}")]
    MalformedInsertLine(String),

    /// Captured structure text is not valid UTF-8.
    #[error("table structure in {0} is not valid UTF-8")]
    StructureNotUtf8(PathBuf),

    /// Connection or statement failure reported by the database client.
    #[error("database error: {0}")]
    Database(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
