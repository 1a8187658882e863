use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::db::{DbConfig, MySqlDatabase};
use crate::importer::{Importer, RunStats};
use crate::report::{render, ConsoleSink, MessageKind, MessageSink, NullSink};

/// JSON output structure for the import command
#[derive(Serialize)]
struct ImportJsonOutput<'a> {
    directory: String,
    database: String,
    batch_size: usize,
    elapsed_secs: f64,
    summary: &'a RunStats,
}

/// Sink that routes messages through a progress bar so they print
/// above it instead of tearing the render.
struct BarSink {
    bar: ProgressBar,
    colors: bool,
}

impl MessageSink for BarSink {
    fn emit(&self, kind: MessageKind, text: &str) {
        self.bar.println(render(kind, text, self.colors));
    }
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    dir: PathBuf,
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
    database: String,
    batch_size: usize,
    progress: bool,
    json: bool,
    no_color: bool,
) -> anyhow::Result<()> {
    let config = DbConfig {
        host,
        port,
        user,
        password,
        dbname: database.clone(),
    };

    let mut db = MySqlDatabase::connect(&config).with_context(|| {
        format!(
            "failed to connect to database '{}' at {}:{}",
            config.dbname, config.host, config.port
        )
    })?;

    let colors = !no_color && console::colors_enabled();
    let start_time = Instant::now();

    let stats = if json {
        run_import(&mut db, &NullSink, &dir, batch_size, None)?
    } else if progress {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%)",
            )
            .unwrap()
            .progress_chars("█▓▒░  ")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.enable_steady_tick(Duration::from_millis(100));

        let sink = BarSink {
            bar: pb.clone(),
            colors,
        };
        let bar = pb.clone();
        let stats = run_import(
            &mut db,
            &sink,
            &dir,
            batch_size,
            Some(Box::new(move |bytes, total| {
                if bar.length() != Some(total) {
                    bar.set_length(total);
                }
                bar.set_position(bytes);
            })),
        )?;
        pb.finish_and_clear();
        stats
    } else {
        let sink = ConsoleSink::new(colors);
        run_import(&mut db, &sink, &dir, batch_size, None)?
    };

    let elapsed = start_time.elapsed();

    if json {
        let output = ImportJsonOutput {
            directory: dir.display().to_string(),
            database,
            batch_size,
            elapsed_secs: elapsed.as_secs_f64(),
            summary: &stats,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Elapsed time: {:.3?}", elapsed);
    }

    Ok(())
}

fn run_import(
    db: &mut MySqlDatabase,
    sink: &dyn MessageSink,
    dir: &Path,
    batch_size: usize,
    progress_fn: Option<Box<dyn Fn(u64, u64) + 'static>>,
) -> anyhow::Result<RunStats> {
    let mut importer = Importer::new(db, sink).with_batch_size(batch_size);
    if let Some(callback) = progress_fn {
        importer = importer.with_progress(callback);
    }
    let stats = importer
        .run(dir)
        .with_context(|| format!("import from {} failed", dir.display()))?;
    Ok(stats)
}
