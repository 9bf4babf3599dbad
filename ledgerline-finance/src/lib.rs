//! ledgerline-finance: canonical ledger normalization, CSV tables, lookup categorizer and the batch driver

pub mod batch;
pub mod categorizer;
pub mod error;
pub mod ledger_csv;
pub mod normalizer;

pub use batch::{DocumentOutcome, DocumentOutput, process_batch, process_document};
pub use categorizer::Categorizer;
pub use error::{FinanceError, Result};
pub use ledger_csv::{Table, read_table, write_canonical, write_raw};
pub use normalizer::{CanonicalTransaction, normalize, normalize_table};
