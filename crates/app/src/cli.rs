use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "translate-helper",
    version,
    about = "Progress tracking and reporting for sentence translation",
    long_about = None
)]
pub struct Cli {
    /// SQLite database for local progress (env: TRANSLATE_DB_URL)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Remote log endpoint (env: TRANSLATE_API_URL)
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Catalog manifest file (env: TRANSLATE_MANIFEST)
    #[arg(long, global = true)]
    pub manifest: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Pick the next unit to work on
    Select {
        /// Seed the random pick, for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Record local progress on a unit
    Record {
        unit: String,
        #[arg(long)]
        total: u32,
        #[arg(long)]
        completed: u32,
    },
    /// Show local completion status
    Progress {
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Forget all local progress
    Clear,
    /// Show remote statistics, falling back to the last known numbers
    Stats {
        /// Bypass the log cache
        #[arg(long)]
        refresh: bool,
        /// List every catalog unit, including untouched ones
        #[arg(long)]
        catalog: bool,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Render the project report from the remote log
    Report {
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// List units with enough entries to count as done
    DoneFiles {
        #[arg(long, default_value_t = services::DEFAULT_DONE_THRESHOLD)]
        threshold: usize,
        /// Write file names here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Regenerate the manifest from a directory of CSV files
    Manifest {
        #[arg(long, default_value = "inputs/")]
        inputs: PathBuf,
        /// File names to leave out, one per line
        #[arg(long, default_value = "done_files.txt")]
        done_files: PathBuf,
        /// Output path; defaults to the configured manifest
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Html,
    Json,
}
