use crate::types::Column;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unreadable report {file}: {reason}")]
    Ingest { file: String, reason: String },

    #[error("Column '{}' not available", .0.header())]
    MissingColumn(Column),

    #[error("Insufficient data: need at least {required} records, have {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Region '{0}' not found")]
    RegionNotFound(String),

    #[error("Period '{0}' not found")]
    UnknownPeriod(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ReportError {
    /// Errors that mean "this one table cannot be drawn" rather than a
    /// failure of the run.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(
            self,
            ReportError::MissingColumn(_) | ReportError::InsufficientData { .. }
        )
    }
}

pub type ReportResult<T> = Result<T, ReportError>;
