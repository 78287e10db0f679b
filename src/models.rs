use chrono::NaiveDate;

/// Value type a target field expects after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Date,
    Decimal,
    Text,
}

/// One column of the fixed destination schema.
#[derive(Debug, PartialEq, Eq)]
pub struct TargetField {
    pub key: &'static str,
    pub label: &'static str,
    pub field_type: FieldType,
    pub required: bool,
}

/// The captações destination schema, in display order.
pub const TARGET_FIELDS: &[TargetField] = &[
    TargetField { key: "data_captacao", label: "Data Captação", field_type: FieldType::Date, required: true },
    TargetField { key: "cod_assessor", label: "Código Assessor", field_type: FieldType::Text, required: true },
    TargetField { key: "cod_cliente", label: "Código Cliente", field_type: FieldType::Text, required: true },
    TargetField { key: "tipo_captacao", label: "Tipo Captação", field_type: FieldType::Text, required: true },
    TargetField { key: "cod_auxiliar", label: "Código Auxiliar", field_type: FieldType::Text, required: true },
    TargetField { key: "valor_captacao", label: "Valor Captação", field_type: FieldType::Decimal, required: true },
    TargetField { key: "data_atualizacao", label: "Data Atualização", field_type: FieldType::Date, required: true },
    TargetField { key: "tipo_pessoa", label: "Tipo Pessoa", field_type: FieldType::Text, required: true },
];

pub fn field_by_key(key: &str) -> Option<&'static TargetField> {
    TARGET_FIELDS.iter().find(|f| f.key == key)
}

/// Untyped spreadsheet cell as it comes out of the parser. Date serials
/// stay `Number` until normalization, since their meaning depends on the
/// field the column is mapped to.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    DateLike(NaiveDate),
    Bool(bool),
    Empty,
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

/// One workbook data row. `line` is the 1-based spreadsheet line,
/// retained for error reporting; `cells` is parallel to the header list.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub line: usize,
    pub cells: Vec<Cell>,
}

/// A fully validated row. Dates are canonical `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub data_captacao: String,
    pub cod_assessor: String,
    pub cod_cliente: String,
    pub tipo_captacao: String,
    pub cod_auxiliar: String,
    pub valor_captacao: f64,
    pub data_atualizacao: String,
    pub tipo_pessoa: String,
}

/// The six-field tuple that decides whether two rows are the same
/// real-world transaction. Amount participates by bit pattern: exact
/// f64 equality, no rounding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey {
    pub data_captacao: String,
    pub data_atualizacao: String,
    pub cod_cliente: String,
    pub tipo_captacao: String,
    pub cod_assessor: String,
    valor_bits: u64,
}

impl NaturalKey {
    pub fn of(record: &NormalizedRecord) -> Self {
        Self::from_parts(
            &record.data_captacao,
            &record.data_atualizacao,
            &record.cod_cliente,
            &record.tipo_captacao,
            &record.cod_assessor,
            record.valor_captacao,
        )
    }

    pub fn from_parts(
        data_captacao: &str,
        data_atualizacao: &str,
        cod_cliente: &str,
        tipo_captacao: &str,
        cod_assessor: &str,
        valor_captacao: f64,
    ) -> Self {
        NaturalKey {
            data_captacao: data_captacao.to_string(),
            data_atualizacao: data_atualizacao.to_string(),
            cod_cliente: cod_cliente.to_string(),
            tipo_captacao: tipo_captacao.to_string(),
            cod_assessor: cod_assessor.to_string(),
            valor_bits: valor_captacao.to_bits(),
        }
    }
}

/// Final per-upload summary shown to the operator. Not persisted.
#[derive(Debug, Clone, Default)]
pub struct UploadResult {
    pub total_rows: usize,
    pub inserted: usize,
    pub duplicates_ignored: usize,
    pub duplicate_sample: Vec<String>,
    pub errors: Vec<String>,
    pub error_rows: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_has_eight_required_fields() {
        assert_eq!(TARGET_FIELDS.len(), 8);
        assert!(TARGET_FIELDS.iter().all(|f| f.required));
    }

    #[test]
    fn test_field_by_key() {
        assert_eq!(field_by_key("valor_captacao").map(|f| f.field_type), Some(FieldType::Decimal));
        assert!(field_by_key("nope").is_none());
    }

    #[test]
    fn test_natural_key_exact_amount_equality() {
        let a = NaturalKey::from_parts("2024-03-15", "2024-03-16", "C500", "APORTE", "A001", 1000.50);
        let b = NaturalKey::from_parts("2024-03-15", "2024-03-16", "C500", "APORTE", "A001", 1000.50);
        let c = NaturalKey::from_parts("2024-03-15", "2024-03-16", "C500", "APORTE", "A001", 1000.51);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_cell_is_empty() {
        assert!(Cell::Empty.is_empty());
        assert!(Cell::Text("   ".to_string()).is_empty());
        assert!(!Cell::Text("x".to_string()).is_empty());
        assert!(!Cell::Number(0.0).is_empty());
    }
}
