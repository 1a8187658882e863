//! Import orchestration.
//!
//! Discovers per-table dump files in a directory and drives the full
//! sequence for each one: structure extraction, idempotent table creation,
//! row-skip counting, then the batched insert pass. Files are processed
//! independently; one bad file is reported and skipped without aborting
//! the run.

use serde::Serialize;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::batcher::{BatchStats, InsertBatcher, DEFAULT_BATCH_SIZE};
use crate::db::Database;
use crate::error::ImportError;
use crate::parser::{determine_buffer_size, LineReader};
use crate::progress::ProgressReader;
use crate::report::{MessageKind, MessageSink};
use crate::schema;

/// Compression format detected from file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl Compression {
    /// Detect compression format from file extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("gz" | "gzip") => Compression::Gzip,
            Some("bz2" | "bzip2") => Compression::Bzip2,
            Some("xz" | "lzma") => Compression::Xz,
            Some("zst" | "zstd") => Compression::Zstd,
            _ => Compression::None,
        }
    }

    /// Wrap a reader with the appropriate decompressor
    pub fn wrap_reader<'a>(&self, reader: Box<dyn Read + 'a>) -> std::io::Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Compression::None => reader,
            Compression::Gzip => Box::new(flate2::read::GzDecoder::new(reader)),
            Compression::Bzip2 => Box::new(bzip2::read::BzDecoder::new(reader)),
            Compression::Xz => Box::new(xz2::read::XzDecoder::new(reader)),
            Compression::Zstd => Box::new(zstd::stream::read::Decoder::new(reader)?),
        })
    }
}

/// A dump file selected for import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpFile {
    pub path: PathBuf,
    /// Target table, from the file name with the compression extension and
    /// `.sql` suffix stripped.
    pub table: String,
    pub compression: Compression,
}

impl DumpFile {
    /// Classify a path as a dump file, or `None` when the name does not
    /// match `<table>.sql` with an optional compression extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let compression = Compression::from_path(path);
        let file_name = path.file_name()?.to_str()?;

        let base = match compression {
            Compression::None => Path::new(file_name),
            _ => Path::new(Path::new(file_name).file_stem()?),
        };

        if !base.extension()?.eq_ignore_ascii_case("sql") {
            return None;
        }
        let table = base.file_stem()?.to_str()?.to_string();
        if table.is_empty() {
            return None;
        }

        Some(Self {
            path: path.to_path_buf(),
            table,
            compression,
        })
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Find dump files directly inside `dir`, sorted by path.
///
/// The `.sql` match is case-insensitive and subdirectories are not entered.
/// An empty result is the fatal `NoDumpFiles` condition.
pub fn discover_dump_files(dir: &Path) -> Result<Vec<DumpFile>, ImportError> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() {
            if let Some(dump) = DumpFile::from_path(&path) {
                files.push(dump);
            }
        }
    }

    if files.is_empty() {
        return Err(ImportError::NoDumpFiles(dir.to_path_buf()));
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Imported,
    Skipped,
}

/// Per-file outcome, also serialized into the `--json` summary.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: String,
    pub table: String,
    pub status: FileStatus,
    pub rows_inserted: u64,
    pub rows_skipped: u64,
    pub rows_failed: u64,
    pub batches_executed: u64,
    pub batches_failed: u64,
    pub malformed_lines: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    fn imported(dump: &DumpFile, stats: &BatchStats) -> Self {
        Self {
            file: dump.file_name(),
            table: dump.table.clone(),
            status: FileStatus::Imported,
            rows_inserted: stats.rows_inserted,
            rows_skipped: stats.rows_skipped,
            rows_failed: stats.rows_failed,
            batches_executed: stats.batches_executed,
            batches_failed: stats.batches_failed,
            malformed_lines: stats.malformed_lines,
            error: None,
        }
    }

    fn skipped(dump: &DumpFile, error: String) -> Self {
        Self {
            file: dump.file_name(),
            table: dump.table.clone(),
            status: FileStatus::Skipped,
            rows_inserted: 0,
            rows_skipped: 0,
            rows_failed: 0,
            batches_executed: 0,
            batches_failed: 0,
            malformed_lines: 0,
            error: Some(error),
        }
    }
}

/// Whole-run totals.
#[derive(Debug, Default, Serialize)]
pub struct RunStats {
    pub files_imported: usize,
    pub files_skipped: usize,
    pub total_rows_inserted: u64,
    pub total_rows_skipped: u64,
    pub total_rows_failed: u64,
    pub files: Vec<FileReport>,
}

impl RunStats {
    fn record(&mut self, report: FileReport) {
        match report.status {
            FileStatus::Imported => self.files_imported += 1,
            FileStatus::Skipped => self.files_skipped += 1,
        }
        self.total_rows_inserted += report.rows_inserted;
        self.total_rows_skipped += report.rows_skipped;
        self.total_rows_failed += report.rows_failed;
        self.files.push(report);
    }

    pub fn has_failures(&self) -> bool {
        self.files_skipped > 0
            || self
                .files
                .iter()
                .any(|f| f.batches_failed > 0 || f.malformed_lines > 0)
    }
}

pub struct Importer<'a> {
    db: &'a mut dyn Database,
    sink: &'a dyn MessageSink,
    batch_size: usize,
    progress_fn: Option<Rc<dyn Fn(u64, u64)>>,
}

impl<'a> Importer<'a> {
    pub fn new(db: &'a mut dyn Database, sink: &'a dyn MessageSink) -> Self {
        Self {
            db,
            sink,
            batch_size: DEFAULT_BATCH_SIZE,
            progress_fn: None,
        }
    }

    /// Maximum rows per combined INSERT. Bounded below by 1.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Progress callback for the insert pass, called with
    /// `(bytes_read, file_size)` of the current file.
    pub fn with_progress<F: Fn(u64, u64) + 'static>(mut self, f: F) -> Self {
        self.progress_fn = Some(Rc::new(f));
        self
    }

    /// Import every dump file in `dir`.
    ///
    /// Returns an error only for the fatal conditions: no dump files, or a
    /// structure block that exceeds the scan bound. Everything else is
    /// reported through the sink and reflected in the returned stats.
    pub fn run(mut self, dir: &Path) -> Result<RunStats, ImportError> {
        let files = discover_dump_files(dir)?;
        let mut stats = RunStats::default();

        for dump in &files {
            let report = self.import_file(dump)?;
            stats.record(report);
        }

        self.sink.emit(MessageKind::Heading, "Import summary");
        let summary = format!(
            "{} of {} files imported, {} rows inserted",
            stats.files_imported,
            stats.files.len(),
            stats.total_rows_inserted
        );
        if stats.files_skipped > 0 {
            self.sink.emit(MessageKind::Error, &summary);
        } else {
            self.sink.emit(MessageKind::Success, &summary);
        }

        Ok(stats)
    }

    fn import_file(&mut self, dump: &DumpFile) -> Result<FileReport, ImportError> {
        self.sink
            .emit(MessageKind::Heading, &format!("Processing {}", dump.file_name()));

        let structure = match self.structure_pass(dump) {
            Ok(Some(structure)) => structure,
            Ok(None) => {
                let message = format!("No table structure found in {}", dump.file_name());
                self.sink.emit(MessageKind::Error, &message);
                return Ok(FileReport::skipped(dump, message));
            }
            Err(fatal @ ImportError::StructureTooLong { .. }) => return Err(fatal),
            Err(e) => {
                let message = format!("Could not read {}: {e}", dump.file_name());
                self.sink.emit(MessageKind::Error, &message);
                return Ok(FileReport::skipped(dump, message));
            }
        };

        let ddl = schema::make_idempotent(&structure);
        if let Err(e) = self.db.execute(&ddl) {
            let message = format!("Error creating table structure: {e}");
            self.sink.emit(MessageKind::Error, &message);
            return Ok(FileReport::skipped(dump, message));
        }

        // Resume heuristic: rows already present are assumed to be the
        // file's leading rows. A failed or empty count means nothing to
        // skip.
        let skip_rows = self.db.count_rows(&dump.table).unwrap_or(0);

        let batch_stats = match self.insert_pass(dump, skip_rows) {
            Ok(batch_stats) => batch_stats,
            Err(e) => {
                let message = format!("Could not read {}: {e}", dump.file_name());
                self.sink.emit(MessageKind::Error, &message);
                return Ok(FileReport::skipped(dump, message));
            }
        };

        self.sink.emit(
            MessageKind::Success,
            &format!("Total {} rows inserted", batch_stats.rows_inserted),
        );
        Ok(FileReport::imported(dump, &batch_stats))
    }

    /// First pass: open the file and capture the leading DDL block.
    fn structure_pass(&self, dump: &DumpFile) -> Result<Option<String>, ImportError> {
        let file = File::open(&dump.path)?;
        let reader = dump.compression.wrap_reader(Box::new(file))?;
        schema::extract_structure(reader, &dump.path)
    }

    /// Second pass: re-open the file from the start and feed every line to
    /// the batcher. Never shares stream position with the structure pass.
    fn insert_pass(&mut self, dump: &DumpFile, skip_rows: u64) -> Result<BatchStats, ImportError> {
        let file = File::open(&dump.path)?;
        let file_size = file.metadata()?.len();

        let reader: Box<dyn Read> = match &self.progress_fn {
            Some(cb) => {
                let cb = Rc::clone(cb);
                let progress = ProgressReader::new(file, move |bytes| cb(bytes, file_size));
                dump.compression.wrap_reader(Box::new(progress))?
            }
            None => dump.compression.wrap_reader(Box::new(file))?,
        };

        let mut lines = LineReader::with_capacity(determine_buffer_size(file_size), reader);
        let mut batcher = InsertBatcher::new(&mut *self.db, self.sink, self.batch_size, skip_rows);

        loop {
            match lines.next_line() {
                Ok(Some(line)) => batcher.feed_line(line),
                Ok(None) => break,
                Err(e) => {
                    // Stop feeding but still flush what accumulated; the
                    // rows read so far are good.
                    self.sink.emit(
                        MessageKind::Error,
                        &format!("Read error in {}: {e}", dump.file_name()),
                    );
                    break;
                }
            }
        }

        Ok(batcher.finish())
    }
}
