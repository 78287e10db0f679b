pub mod ingest;
pub mod init;
pub mod mapping;
pub mod status;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "capta", about = "Workbook ingestion for the captações operations database.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up capta: choose a data directory and initialize the database.
    Init {
        /// Path for capta data (default: ~/Documents/capta)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Ingest a workbook (XLSX/XLS/ODS/CSV) of captação rows.
    Ingest {
        /// Path to the workbook
        file: String,
        /// Override a proposed mapping: "Source Header=target_key" (repeatable)
        #[arg(long = "map", value_name = "HEADER=KEY")]
        map: Vec<String>,
        /// Deselect the mapping proposed for a source header (repeatable)
        #[arg(long = "unmap", value_name = "HEADER")]
        unmap: Vec<String>,
        /// Rows per insert batch
        #[arg(long = "chunk-size", default_value_t = crate::commit::DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        /// Stop after the duplicate check; nothing is written
        #[arg(long = "dry-run")]
        dry_run: bool,
        /// Skip the confirmation prompt
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
    /// Show the proposed column mapping for a workbook without ingesting.
    Mapping {
        /// Path to the workbook
        file: String,
    },
    /// Show current database and summary statistics.
    Status,
}
