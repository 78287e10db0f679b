use std::io::Write;
use std::path::Path;

use colored::Colorize;

use crate::cli::mapping::print_mapping_table;
use crate::db::SqliteStore;
use crate::error::{CaptaError, Result};
use crate::fmt::percent;
use crate::models::UploadResult;
use crate::session::{IngestState, IngestionSession};
use crate::settings::db_path;

/// How many error lines and duplicate samples the final panel shows.
const DISPLAY_MAX: usize = 10;

pub fn run(
    file: &str,
    map: &[String],
    unmap: &[String],
    chunk_size: usize,
    dry_run: bool,
    yes: bool,
) -> Result<()> {
    let mut session = IngestionSession::new();
    session.load_file(Path::new(file))?;

    for pair in map {
        let (source, key) = pair.split_once('=').ok_or_else(|| {
            CaptaError::Other(format!("--map expects \"Source Header=field_key\", got '{pair}'"))
        })?;
        session.map_column(source.trim(), key.trim())?;
    }
    for source in unmap {
        session.unmap_column(source)?;
    }

    print_mapping_table(&session.mappings);
    session.confirm_mapping()?;
    session.validate_rows()?;

    let total = session.rows.len();
    let valid = session.records.len();
    println!(
        "{total} data rows: {valid} valid, {} with errors",
        total - valid
    );
    for err in session.validation_errors.iter().take(DISPLAY_MAX) {
        println!("  {}", err.red());
    }
    if session.validation_errors.len() > DISPLAY_MAX {
        println!("  … and {} more", session.validation_errors.len() - DISPLAY_MAX);
    }

    let mut store = SqliteStore::open(&db_path())?;
    session.check_duplicates(&store)?;

    println!(
        "{} new row(s) to insert, {} already in the database",
        session.records.len(),
        session.duplicate_count
    );
    if !session.duplicate_sample.is_empty() {
        println!("Duplicates to be ignored (first {}):", session.duplicate_sample.len());
        for line in &session.duplicate_sample {
            println!("  {line}");
        }
    }

    if dry_run {
        session.cancel()?;
        println!("Dry run — nothing written.");
        return Ok(());
    }

    if !yes && !confirm("Proceed with commit?")? {
        session.cancel()?;
        println!("Cancelled — nothing written.");
        return Ok(());
    }

    let result = session.commit(&mut store, chunk_size, |p| {
        println!(
            "batch {}/{} — {} ({} inserted)",
            p.batch,
            p.total_batches,
            percent(p.batch, p.total_batches),
            p.inserted_so_far
        );
    })?;

    let commit_failed = session.state() == IngestState::Failed;
    print_result(&result);
    session.dismiss()?;
    if commit_failed {
        return Err(CaptaError::CommitFailed(result.errors.join("; ")));
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(matches!(
        input.trim().to_ascii_lowercase().as_str(),
        "y" | "yes" | "s" | "sim"
    ))
}

fn print_result(result: &UploadResult) {
    println!();
    if result.errors.is_empty() {
        println!("{}", "Upload complete".green().bold());
    } else {
        println!("{}", "Upload finished with errors".yellow().bold());
    }
    println!("Rows in file:       {}", result.total_rows);
    println!("Inserted:           {}", result.inserted);
    println!("Duplicates ignored: {}", result.duplicates_ignored);
    for line in &result.duplicate_sample {
        println!("  {line}");
    }
    println!("Rows with errors:   {}", result.error_rows);
    for err in result.errors.iter().take(DISPLAY_MAX) {
        println!("  {}", err.red());
    }
    if result.errors.len() > DISPLAY_MAX {
        println!("  … and {} more", result.errors.len() - DISPLAY_MAX);
    }
}
