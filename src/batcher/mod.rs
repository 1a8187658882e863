//! Batched execution of row-insertion statements.
//!
//! Dump files carry one single-row INSERT per line. Executing them verbatim
//! is slow and executing the whole file at once blows past
//! `max_allowed_packet`, so the batcher re-groups value tuples into combined
//! INSERTs of at most `batch_size` rows each.

use crate::db::Database;
use crate::parser::{self, line_preview};
use crate::report::{MessageKind, MessageSink};

/// Default maximum rows combined into one INSERT execution.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Outcome counters for one file's insert pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchStats {
    /// Rows from batches that executed successfully.
    pub rows_inserted: u64,
    /// Leading rows fast-forwarded past because a prior run inserted them.
    pub rows_skipped: u64,
    /// Rows lost to batches the database rejected.
    pub rows_failed: u64,
    pub batches_executed: u64,
    pub batches_failed: u64,
    /// Lines dropped for a missing delimiter, missing terminator, or a
    /// header that disagrees with the file's first INSERT line.
    pub malformed_lines: u64,
}

/// Accumulates value tuples from INSERT lines and flushes one combined
/// statement per full batch.
///
/// Feed every line of the file in order, then call [`finish`] to flush the
/// remainder. Lines without `INSERT INTO` are ignored. Batch failures are
/// reported through the sink and processing continues; nothing here aborts
/// the run.
///
/// [`finish`]: InsertBatcher::finish
pub struct InsertBatcher<'a> {
    db: &'a mut dyn Database,
    sink: &'a dyn MessageSink,
    batch_size: usize,
    skip_rows: u64,
    header: Option<Vec<u8>>,
    values: Vec<u8>,
    rows_in_batch: usize,
    stats: BatchStats,
}

impl<'a> InsertBatcher<'a> {
    pub fn new(
        db: &'a mut dyn Database,
        sink: &'a dyn MessageSink,
        batch_size: usize,
        skip_rows: u64,
    ) -> Self {
        Self {
            db,
            sink,
            batch_size,
            skip_rows,
            header: None,
            values: Vec::new(),
            rows_in_batch: 0,
            stats: BatchStats::default(),
        }
    }

    /// Process one line of the dump file.
    pub fn feed_line(&mut self, line: &[u8]) {
        if !parser::is_insert_line(line) {
            return;
        }

        // Once the header is known, skipped lines are discarded unparsed.
        if self.header.is_some() && self.stats.rows_skipped < self.skip_rows {
            self.stats.rows_skipped += 1;
            return;
        }

        let parts = match parser::split_insert_line(line) {
            Ok(parts) => parts,
            Err(e) => {
                self.sink.emit(MessageKind::Error, &e.to_string());
                self.stats.malformed_lines += 1;
                return;
            }
        };

        match &self.header {
            None => self.header = Some(parts.header.to_vec()),
            Some(header) if header.as_slice() != parts.header => {
                self.sink.emit(
                    MessageKind::Error,
                    &format!(
                        "INSERT header differs from the file's first INSERT line, dropped: {}",
                        line_preview(line)
                    ),
                );
                self.stats.malformed_lines += 1;
                return;
            }
            Some(_) => {}
        }

        // The first INSERT line both provides the header and carries data
        // row 1, so its tuple honors the skip count like any other row.
        if self.stats.rows_skipped < self.skip_rows {
            self.stats.rows_skipped += 1;
            return;
        }

        self.values.extend_from_slice(parts.values);
        self.values.push(b',');
        self.rows_in_batch += 1;

        if self.rows_in_batch >= self.batch_size {
            self.flush(Some(line));
        }
    }

    /// Flush any remaining rows and return the pass counters.
    ///
    /// A file with zero INSERT lines, or one where every row was skipped,
    /// issues no statement at all.
    pub fn finish(mut self) -> BatchStats {
        self.flush(None);
        self.stats
    }

    fn flush(&mut self, trigger: Option<&[u8]>) {
        if self.rows_in_batch == 0 {
            return;
        }
        let header = match &self.header {
            Some(header) => header,
            None => return,
        };

        let mut sql = Vec::with_capacity(header.len() + 10 + self.values.len());
        sql.extend_from_slice(header);
        sql.extend_from_slice(b"`) VALUES ");
        // Drop the trailing comma left by the last accumulated tuple.
        sql.extend_from_slice(&self.values[..self.values.len() - 1]);

        let rows = self.rows_in_batch as u64;
        let outcome = match std::str::from_utf8(&sql) {
            Ok(text) => self.db.execute(text).err().map(|e| e.to_string()),
            Err(_) => Some("batch INSERT dropped: accumulated values are not valid UTF-8".into()),
        };

        match outcome {
            None => {
                self.stats.rows_inserted += rows;
                self.stats.batches_executed += 1;
            }
            Some(message) => {
                self.stats.rows_failed += rows;
                self.stats.batches_failed += 1;
                self.sink.emit(MessageKind::Error, &message);
                if let Some(line) = trigger {
                    self.sink
                        .emit(MessageKind::Error, &format!("at line: {}", line_preview(line)));
                }
            }
        }

        self.values.clear();
        self.rows_in_batch = 0;
    }
}
