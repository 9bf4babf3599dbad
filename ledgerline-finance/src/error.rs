//! Error types for normalization, CSV I/O and categorization

use thiserror::Error;

use ledgerline_ingest::{IngestError, StatementKind};

#[derive(Error, Debug)]
pub enum FinanceError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("Record does not match the {expected} schema: {description}")]
    SchemaMismatch {
        expected: StatementKind,
        description: String,
    },

    #[error("Input is already in the normalized format")]
    AlreadyNormalized,

    #[error("Unrecognized CSV headers: {0:?}")]
    UnknownHeaders(Vec<String>),

    #[error("Invalid row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, FinanceError>;
