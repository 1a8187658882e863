mod import;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sql-importer")]
#[command(version)]
#[command(about = "Import per-table SQL dump files into a MySQL database", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import all SQL dump files from a directory
    Import {
        /// Directory containing <table>.sql dump files
        /// Supports .gz, .bz2, .xz, .zst compression
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Database host
        #[arg(long, default_value = "localhost")]
        host: String,

        /// Database port
        #[arg(short = 'P', long, default_value_t = 3306)]
        port: u16,

        /// Database user
        #[arg(short, long, default_value = "root")]
        user: String,

        /// Database password (omit for passwordless accounts)
        #[arg(short, long)]
        password: Option<String>,

        /// Database to import into
        #[arg(short, long)]
        database: String,

        /// Rows per combined INSERT; size batches to stay under the
        /// server's max_allowed_packet
        #[arg(short, long, default_value_t = 500)]
        batch_size: usize,

        /// Show a byte-based progress bar during the insert pass
        #[arg(long)]
        progress: bool,

        /// Output the run summary as JSON instead of human-readable text
        #[arg(long)]
        json: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Import {
            dir,
            host,
            port,
            user,
            password,
            database,
            batch_size,
            progress,
            json,
            no_color,
        } => import::run(
            dir, host, port, user, password, database, batch_size, progress, json, no_color,
        ),
        Commands::Completions { shell } => {
            generate(
                shell,
                &mut Cli::command(),
                "sql-importer",
                &mut io::stdout(),
            );
            Ok(())
        }
    }
}
