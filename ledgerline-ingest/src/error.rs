//! Error types for statement ingestion

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Statement type not recognized")]
    DetectionFailed,

    #[error("Cannot resolve date `{token}`: {reason}")]
    DateResolutionFailed { token: String, reason: String },

    #[error("Transaction line before any dated line: `{line}`")]
    OrphanTransaction { line: String },

    #[error("Amounts found before a column header: `{line}`")]
    ColumnLayoutMissing { line: String },

    #[error("Text extraction error: {0}")]
    TextExtraction(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, IngestError>;
