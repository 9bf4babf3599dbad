//! ledgerline-ingest: statement text sources, variant detection, date resolution and line parsers.

pub mod dates;
pub mod detect;
pub mod error;
pub mod metadata;
pub mod parsers;
pub mod rules;
pub mod source;
pub mod text;
pub mod types;

pub use detect::detect;
pub use error::{IngestError, Result};
pub use metadata::{AccountInfo, AccountUse, account_info};
pub use parsers::{parse_as, parse_statement};
pub use rules::{DetectionRules, KeywordRules};
pub use source::{PdfToText, PlainTextFile, TextSource, source_for};
pub use types::{
    CardEntryKind, CardTransaction, DepositTransaction, Movement, ParseReport, ParseWarning,
    RawTransaction, StatementContext, StatementKind, StatementPeriod,
};
