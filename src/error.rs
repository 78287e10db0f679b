use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptaError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Workbook has no data rows (empty or header-only sheet)")]
    EmptyWorkbook,

    #[error("Unsupported file format: {0}")]
    UnknownFormat(String),

    #[error("Unknown target field: {0}")]
    UnknownField(String),

    #[error("Unknown source column: {0}")]
    UnknownColumn(String),

    #[error("Required fields without a mapped column: {}", .0.join(", "))]
    MappingIncomplete(Vec<String>),

    #[error("No rows passed validation")]
    NoValidRows,

    #[error("All batches failed to commit: {0}")]
    CommitFailed(String),

    #[error("Invalid ingestion step: {0}")]
    InvalidTransition(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CaptaError>;
