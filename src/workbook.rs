use std::io::BufReader;
use std::path::Path;

use calamine::{Data, Range, Reader};

use crate::error::{CaptaError, Result};
use crate::models::{Cell, RawRow};
use crate::normalize::excel_serial_to_date;

/// Decoded first sheet: header names in file order plus the data rows.
#[derive(Debug)]
pub struct ParsedSheet {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Decode a workbook (XLSX/XLS/XLSB/ODS) or CSV file into headers and
/// raw rows. The first row is the header row; fully empty data rows are
/// dropped. Fails if the file is unreadable or contains no data rows.
pub fn parse_file(path: &Path) -> Result<ParsedSheet> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => parse_csv(path),
        "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => parse_workbook(path),
        other => Err(CaptaError::UnknownFormat(format!(
            "{} (expected xlsx, xls, xlsm, xlsb, ods or csv)",
            if other.is_empty() { "no extension" } else { other }
        ))),
    }
}

fn parse_workbook(path: &Path) -> Result<ParsedSheet> {
    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|e| CaptaError::Workbook(format!("Failed to open {}: {e}", path.display())))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(CaptaError::EmptyWorkbook)?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| CaptaError::Workbook(format!("Failed to read sheet {sheet_name}: {e}")))?;
    sheet_from_range(&range)
}

/// Build a ParsedSheet from an in-memory cell range. Split out from the
/// file entry point so it can be exercised without workbook fixtures.
pub fn sheet_from_range(range: &Range<Data>) -> Result<ParsedSheet> {
    let mut rows_iter = range.rows();
    let header_row = rows_iter.next().ok_or(CaptaError::EmptyWorkbook)?;
    let headers: Vec<String> = header_row.iter().map(header_name).collect();

    let mut rows = Vec::new();
    for (i, row) in rows_iter.enumerate() {
        let cells: Vec<Cell> = (0..headers.len())
            .map(|c| row.get(c).map(to_cell).unwrap_or(Cell::Empty))
            .collect();
        if cells.iter().all(Cell::is_empty) {
            continue;
        }
        // Header is line 1, first data row is line 2
        rows.push(RawRow { line: i + 2, cells });
    }
    if rows.is_empty() {
        return Err(CaptaError::EmptyWorkbook);
    }
    Ok(ParsedSheet { headers, rows })
}

fn parse_csv(path: &Path) -> Result<ParsedSheet> {
    let file = std::fs::File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let mut headers: Vec<String> = Vec::new();
    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        if i == 0 {
            headers = record.iter().map(|h| h.trim().to_string()).collect();
            continue;
        }
        let cells: Vec<Cell> = (0..headers.len())
            .map(|c| match record.get(c).map(str::trim) {
                Some("") | None => Cell::Empty,
                Some(v) => Cell::Text(v.to_string()),
            })
            .collect();
        if cells.iter().all(Cell::is_empty) {
            continue;
        }
        rows.push(RawRow { line: i + 1, cells });
    }
    if rows.is_empty() {
        return Err(CaptaError::EmptyWorkbook);
    }
    Ok(ParsedSheet { headers, rows })
}

fn header_name(data: &Data) -> String {
    match data {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        _ => String::new(),
    }
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) => {
            if s.trim().is_empty() {
                Cell::Empty
            } else {
                Cell::Text(s.clone())
            }
        }
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        // The format already types these as dates; plain serials stay Number
        Data::DateTime(dt) => match excel_serial_to_date(dt.as_f64()) {
            Some(date) => Cell::DateLike(date),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => match chrono::NaiveDate::parse_from_str(s.get(..10).unwrap_or(""), "%Y-%m-%d") {
            Ok(date) => Cell::DateLike(date),
            Err(_) => Cell::Text(s.clone()),
        },
        Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}
