use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::{CaptaError, Result};
use crate::mapping::{available_targets, validate_mappings, ColumnMapping};
use crate::session::IngestionSession;

pub fn run(file: &str) -> Result<()> {
    let mut session = IngestionSession::new();
    session.load_file(Path::new(file))?;

    println!(
        "{} columns, {} data rows",
        session.headers.len(),
        session.rows.len()
    );
    print_mapping_table(&session.mappings);

    if let Err(CaptaError::MappingIncomplete(missing)) = validate_mappings(&session.mappings) {
        println!(
            "{} {}",
            "Unmapped required fields:".yellow(),
            missing.join(", ")
        );
        for m in session.mappings.iter().filter(|m| !m.is_selected) {
            let fields: Vec<&str> = available_targets(&session.mappings, m.source_index)
                .iter()
                .map(|f| f.key)
                .collect();
            println!("  '{}' could map to: {}", m.source, fields.join(", "));
        }
        println!("Use `capta ingest --map \"Header=field_key\"` to bind them.");
    }
    Ok(())
}

pub fn print_mapping_table(mappings: &[ColumnMapping]) {
    let mut table = Table::new();
    table.set_header(vec!["Source Column", "Target Field", "Score", "Selected"]);
    for m in mappings {
        let target = m.target.map(|t| t.key).unwrap_or("—");
        let score = match (m.score, m.is_selected) {
            (Some(s), _) => format!("{s:.2}"),
            (None, true) => "manual".to_string(),
            (None, false) => "—".to_string(),
        };
        table.add_row(vec![
            Cell::new(&m.source),
            Cell::new(target),
            Cell::new(score),
            Cell::new(if m.is_selected { "yes" } else { "no" }),
        ]);
    }
    println!("{table}");
}
