use chrono::NaiveDate;

use crate::mapping::ColumnMapping;
use crate::models::{Cell, FieldType, NormalizedRecord, RawRow, TARGET_FIELDS};

/// Convert a spreadsheet date serial to a date. Serial 1 is 1900-01-01;
/// the epoch is 1899-12-30 to account for the 1900 leap year bug.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(chrono::Duration::days(serial as i64))
}

/// Accepts `DD/MM/YYYY`, `DD-MM-YYYY` and `YYYY-MM-DD`.
pub fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d-%m-%Y"))
        .ok()
}

/// Parse a decimal out of a text cell. Handles currency prefixes,
/// parenthesized negatives and Brazilian separators: `"R$ 1.234,56"`,
/// `"(500,00)"`, `"1000.50"`.
pub fn parse_decimal_text(raw: &str) -> Option<f64> {
    let s = raw.trim().trim_start_matches("R$").trim_start_matches('$');
    let s = s.trim();
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return parse_decimal_text(inner).map(|v| -v);
    }
    let s: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    let normalized = if s.contains('.') && s.contains(',') {
        // 1.234,56 — dots are thousands separators
        s.replace('.', "").replace(',', ".")
    } else if s.contains(',') {
        s.replace(',', ".")
    } else {
        s
    };
    if normalized.is_empty() {
        return None;
    }
    normalized.parse().ok()
}

fn coerce_date(cell: &Cell) -> Result<Option<String>, ()> {
    let date = match cell {
        Cell::Empty => return Ok(None),
        Cell::DateLike(d) => Some(*d),
        Cell::Number(serial) => excel_serial_to_date(*serial),
        Cell::Text(s) => {
            if s.trim().is_empty() {
                return Ok(None);
            }
            parse_date_text(s)
        }
        Cell::Bool(_) => None,
    };
    match date {
        Some(d) => Ok(Some(d.format("%Y-%m-%d").to_string())),
        None => Err(()),
    }
}

fn coerce_decimal(cell: &Cell) -> Result<Option<f64>, ()> {
    match cell {
        Cell::Empty => Ok(None),
        Cell::Number(f) => Ok(Some(*f)),
        Cell::Text(s) => {
            if s.trim().is_empty() {
                return Ok(None);
            }
            parse_decimal_text(s).map(Some).ok_or(())
        }
        Cell::DateLike(_) | Cell::Bool(_) => Err(()),
    }
}

fn coerce_text(cell: &Cell) -> Option<String> {
    let text = match cell {
        Cell::Empty => return None,
        Cell::Text(s) => s.trim().to_string(),
        Cell::Number(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Cell::Number(f) => f.to_string(),
        Cell::DateLike(d) => d.format("%Y-%m-%d").to_string(),
        Cell::Bool(b) => b.to_string(),
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[derive(Default)]
struct Draft {
    data_captacao: Option<String>,
    cod_assessor: Option<String>,
    cod_cliente: Option<String>,
    tipo_captacao: Option<String>,
    cod_auxiliar: Option<String>,
    valor_captacao: Option<f64>,
    data_atualizacao: Option<String>,
    tipo_pessoa: Option<String>,
}

impl Draft {
    fn set_text(&mut self, key: &str, value: String) {
        match key {
            "data_captacao" => self.data_captacao = Some(value),
            "cod_assessor" => self.cod_assessor = Some(value),
            "cod_cliente" => self.cod_cliente = Some(value),
            "tipo_captacao" => self.tipo_captacao = Some(value),
            "cod_auxiliar" => self.cod_auxiliar = Some(value),
            "data_atualizacao" => self.data_atualizacao = Some(value),
            "tipo_pessoa" => self.tipo_pessoa = Some(value),
            _ => {}
        }
    }

    fn has(&self, key: &str) -> bool {
        match key {
            "data_captacao" => self.data_captacao.is_some(),
            "cod_assessor" => self.cod_assessor.is_some(),
            "cod_cliente" => self.cod_cliente.is_some(),
            "tipo_captacao" => self.tipo_captacao.is_some(),
            "cod_auxiliar" => self.cod_auxiliar.is_some(),
            "valor_captacao" => self.valor_captacao.is_some(),
            "data_atualizacao" => self.data_atualizacao.is_some(),
            "tipo_pessoa" => self.tipo_pessoa.is_some(),
            _ => false,
        }
    }

    fn finalize(self) -> Option<NormalizedRecord> {
        Some(NormalizedRecord {
            data_captacao: self.data_captacao?,
            cod_assessor: self.cod_assessor?,
            cod_cliente: self.cod_cliente?,
            tipo_captacao: self.tipo_captacao?,
            cod_auxiliar: self.cod_auxiliar?,
            valor_captacao: self.valor_captacao?,
            data_atualizacao: self.data_atualizacao?,
            tipo_pessoa: self.tipo_pessoa?,
        })
    }
}

/// Outcome of the validation pass over a whole upload.
#[derive(Debug, Default)]
pub struct ValidationOutcome {
    pub records: Vec<NormalizedRecord>,
    pub errors: Vec<String>,
    /// Rows that contributed errors instead of a record.
    pub rejected_rows: usize,
}

/// Normalize every raw row through the confirmed mapping. A row either
/// yields one record or one-plus error strings, never both; a bad row
/// never stops the others.
pub fn normalize_rows(rows: &[RawRow], mappings: &[ColumnMapping]) -> ValidationOutcome {
    let mut outcome = ValidationOutcome::default();
    for row in rows {
        match normalize_row(row, mappings) {
            Ok(record) => outcome.records.push(record),
            Err(mut errors) => {
                outcome.errors.append(&mut errors);
                outcome.rejected_rows += 1;
            }
        }
    }
    outcome
}

fn normalize_row(
    row: &RawRow,
    mappings: &[ColumnMapping],
) -> std::result::Result<NormalizedRecord, Vec<String>> {
    let mut draft = Draft::default();
    let mut errors = Vec::new();

    for m in mappings.iter().filter(|m| m.is_selected) {
        let Some(field) = m.target else { continue };
        let cell = row.cells.get(m.source_index).unwrap_or(&Cell::Empty);
        match field.field_type {
            FieldType::Date => match coerce_date(cell) {
                Ok(Some(date)) => draft.set_text(field.key, date),
                Ok(None) => {}
                Err(()) => errors.push(format!(
                    "Line {}: invalid date in column {}",
                    row.line, m.source
                )),
            },
            FieldType::Decimal => match coerce_decimal(cell) {
                Ok(Some(value)) => draft.valor_captacao = Some(value),
                Ok(None) => {}
                Err(()) => errors.push(format!(
                    "Line {}: invalid numeric value in column {}",
                    row.line, m.source
                )),
            },
            FieldType::Text => {
                if let Some(text) = coerce_text(cell) {
                    draft.set_text(field.key, text);
                }
            }
        }
    }

    let missing: Vec<&str> = TARGET_FIELDS
        .iter()
        .filter(|f| f.required && !draft.has(f.key))
        .map(|f| f.key)
        .collect();
    if !missing.is_empty() {
        errors.push(format!(
            "Line {}: missing required fields: {}",
            row.line,
            missing.join(", ")
        ));
    }

    if errors.is_empty() {
        // finalize cannot fail here: every required field was just checked
        draft.finalize().ok_or_else(Vec::new)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::propose_mappings;

    const HEADERS: &[&str] = &[
        "Data Captação",
        "Cod Assessor",
        "Cod Cliente",
        "Tipo",
        "Aux",
        "Valor",
        "Data Atualização",
        "Tipo Pessoa",
    ];

    fn mappings() -> Vec<ColumnMapping> {
        propose_mappings(&HEADERS.iter().map(|s| s.to_string()).collect::<Vec<_>>())
    }

    fn text_row(line: usize, values: &[&str]) -> RawRow {
        RawRow {
            line,
            cells: values
                .iter()
                .map(|v| {
                    if v.is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(v.to_string())
                    }
                })
                .collect(),
        }
    }

    #[test]
    fn test_excel_serial_to_date() {
        assert_eq!(
            excel_serial_to_date(45366.0),
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
        assert_eq!(excel_serial_to_date(0.0), None);
        assert_eq!(excel_serial_to_date(-5.0), None);
    }

    #[test]
    fn test_date_formats_normalize_to_same_day() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15);
        assert_eq!(parse_date_text("15/03/2024"), expected);
        assert_eq!(parse_date_text("15-03-2024"), expected);
        assert_eq!(parse_date_text("2024-03-15"), expected);
        assert_eq!(excel_serial_to_date(45366.0), expected);
    }

    #[test]
    fn test_parse_date_text_rejects_bad_dates() {
        assert_eq!(parse_date_text("32/01/2024"), None);
        assert_eq!(parse_date_text("15/13/2024"), None);
        assert_eq!(parse_date_text("30/02/2024"), None);
        assert_eq!(parse_date_text("not a date"), None);
        // month-first is not a supported layout
        assert_eq!(parse_date_text("03/15/2024"), None);
    }

    #[test]
    fn test_parse_decimal_text() {
        assert_eq!(parse_decimal_text("1000.50"), Some(1000.5));
        assert_eq!(parse_decimal_text("R$ 1.234,56"), Some(1234.56));
        assert_eq!(parse_decimal_text("1234,56"), Some(1234.56));
        assert_eq!(parse_decimal_text("(500,00)"), Some(-500.0));
        assert_eq!(parse_decimal_text("  -42.5 "), Some(-42.5));
        assert_eq!(parse_decimal_text("abc"), None);
        assert_eq!(parse_decimal_text(""), None);
    }

    #[test]
    fn test_complete_row_normalizes() {
        let row = text_row(
            2,
            &["15/03/2024", "A001", "C500", "APORTE", "X", "1000.50", "16/03/2024", "PF"],
        );
        let outcome = normalize_rows(&[row], &mappings());
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.records.len(), 1);
        let r = &outcome.records[0];
        assert_eq!(r.data_captacao, "2024-03-15");
        assert_eq!(r.data_atualizacao, "2024-03-16");
        assert_eq!(r.cod_assessor, "A001");
        assert_eq!(r.cod_cliente, "C500");
        assert_eq!(r.tipo_captacao, "APORTE");
        assert_eq!(r.cod_auxiliar, "X");
        assert_eq!(r.valor_captacao, 1000.5);
        assert_eq!(r.tipo_pessoa, "PF");
    }

    #[test]
    fn test_numeric_serial_and_numeric_code_cells() {
        let mut row = text_row(2, &["", "A001", "", "APORTE", "X", "", "16/03/2024", "PF"]);
        row.cells[0] = Cell::Number(45366.0); // 2024-03-15
        row.cells[2] = Cell::Number(500.0); // client code typed as a number
        row.cells[5] = Cell::Number(1000.5);
        let outcome = normalize_rows(&[row], &mappings());
        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        let r = &outcome.records[0];
        assert_eq!(r.data_captacao, "2024-03-15");
        assert_eq!(r.cod_cliente, "500");
        assert_eq!(r.valor_captacao, 1000.5);
    }

    #[test]
    fn test_invalid_date_is_line_addressed() {
        let row = text_row(
            7,
            &["2024/15/03", "A001", "C500", "APORTE", "X", "10", "16/03/2024", "PF"],
        );
        let outcome = normalize_rows(&[row], &mappings());
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.rejected_rows, 1);
        assert!(outcome.errors[0].contains("Line 7: invalid date in column Data Captação"));
    }

    #[test]
    fn test_invalid_number_is_line_addressed() {
        let row = text_row(
            3,
            &["15/03/2024", "A001", "C500", "APORTE", "X", "mil reais", "16/03/2024", "PF"],
        );
        let outcome = normalize_rows(&[row], &mappings());
        assert!(outcome.errors[0].contains("Line 3: invalid numeric value in column Valor"));
    }

    #[test]
    fn test_missing_required_fields_aggregated() {
        let row = text_row(5, &["15/03/2024", "", "C500", "APORTE", "X", "10", "16/03/2024", ""]);
        let outcome = normalize_rows(&[row], &mappings());
        assert_eq!(outcome.records.len(), 0);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("Line 5: missing required fields:"));
        assert!(outcome.errors[0].contains("cod_assessor"));
        assert!(outcome.errors[0].contains("tipo_pessoa"));
    }

    #[test]
    fn test_whitespace_only_text_counts_as_missing() {
        let row = text_row(4, &["15/03/2024", "   ", "C500", "APORTE", "X", "10", "16/03/2024", "PF"]);
        let outcome = normalize_rows(&[row], &mappings());
        assert!(outcome.errors[0].contains("cod_assessor"));
    }

    #[test]
    fn test_one_bad_row_never_stops_the_rest() {
        let rows = vec![
            text_row(2, &["bad", "A001", "C500", "APORTE", "X", "10", "16/03/2024", "PF"]),
            text_row(3, &["15/03/2024", "A002", "C501", "APORTE", "X", "20", "16/03/2024", "PJ"]),
        ];
        let outcome = normalize_rows(&rows, &mappings());
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.rejected_rows, 1);
        assert_eq!(outcome.records[0].cod_cliente, "C501");
    }
}
