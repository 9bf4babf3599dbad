//! One-document pipeline and the batch loop around it.
//!
//! Documents are independent: each run gets its own context, and a failing
//! document never stops the others.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use ledgerline_ingest::{
    KeywordRules, ParseWarning, RawTransaction, StatementKind, parse_statement, source_for,
};

use crate::error::{FinanceError, Result};
use crate::ledger_csv::{Table, read_table};
use crate::normalizer::{CanonicalTransaction, normalize, normalize_table};

pub const EXTRACTED_SUFFIX: &str = ".extracted.csv";

/// Everything produced for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentOutput {
    pub source: PathBuf,
    pub kind: StatementKind,
    /// Raw records; `None` when the input was an extracted CSV already.
    pub raw: Option<Vec<RawTransaction>>,
    pub canonical: Vec<CanonicalTransaction>,
    pub warnings: Vec<ParseWarning>,
}

/// Outcome of one document in a batch.
#[derive(Debug)]
pub struct DocumentOutcome {
    pub source: PathBuf,
    pub result: Result<DocumentOutput>,
}

/// Is `path` a previously written raw extraction?
pub fn is_extracted_csv(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(EXTRACTED_SUFFIX))
}

/// Document path without its extension (or without `.extracted.csv`).
fn stem_path(path: &Path) -> PathBuf {
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        if let Some(stem) = name.strip_suffix(EXTRACTED_SUFFIX) {
            return path.with_file_name(stem);
        }
    }
    path.with_extension("")
}

/// The statement a `.extracted.csv` file was extracted from.
pub fn statement_for_extracted(path: &Path) -> PathBuf {
    let stem = stem_path(path);
    let mut name = stem.into_os_string();
    name.push(".pdf");
    PathBuf::from(name)
}

/// Default ledger output for a document: `<stem>.csv` next to it.
pub fn default_output(path: &Path) -> PathBuf {
    let mut name = stem_path(path).into_os_string();
    name.push(".csv");
    PathBuf::from(name)
}

/// Intermediate file next to `output`, e.g. `extracted` gives `<stem>.extracted.csv`.
pub fn artifact_path(output: &Path, stage: &str) -> PathBuf {
    output.with_extension(format!("{stage}.csv"))
}

/// Extract, parse and normalize one document.
///
/// PDFs go through `pdftotext`, other text files are read directly, and
/// `.extracted.csv` files skip parsing and are normalized as read.
pub fn process_document(
    path: &Path,
    rules: &KeywordRules,
    statement_year: Option<i32>,
) -> Result<DocumentOutput> {
    if is_extracted_csv(path) {
        let table = read_table(path)?;
        let kind = match &table {
            Table::Raw { kind, .. } => *kind,
            Table::Canonical(_) => return Err(FinanceError::AlreadyNormalized),
        };
        let canonical = normalize_table(table, &statement_for_extracted(path))?;
        info!(path = %path.display(), rows = canonical.len(), "normalized extracted table");
        return Ok(DocumentOutput {
            source: path.to_path_buf(),
            kind,
            raw: None,
            canonical,
            warnings: Vec::new(),
        });
    }

    let pages = source_for(path)?.pages(path)?;
    let report = parse_statement(&pages, rules, statement_year)?;
    let canonical = normalize(&report.transactions, report.kind, path)?;

    Ok(DocumentOutput {
        source: path.to_path_buf(),
        kind: report.kind,
        raw: Some(report.transactions),
        canonical,
        warnings: report.warnings,
    })
}

/// Run every document, collecting each outcome.
pub fn process_batch(
    paths: &[PathBuf],
    rules: &KeywordRules,
    statement_year: Option<i32>,
) -> Vec<DocumentOutcome> {
    paths
        .iter()
        .map(|path| {
            let result = process_document(path, rules, statement_year);
            if let Err(e) = &result {
                warn!(path = %path.display(), error = %e, "document failed");
            }
            DocumentOutcome {
                source: path.clone(),
                result,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracted_csv_names() {
        let p = Path::new("/stmts/2023-09.extracted.csv");
        assert!(is_extracted_csv(p));
        assert!(!is_extracted_csv(Path::new("/stmts/2023-09.csv")));
        assert_eq!(statement_for_extracted(p), PathBuf::from("/stmts/2023-09.pdf"));
        assert_eq!(default_output(p), PathBuf::from("/stmts/2023-09.csv"));
    }

    #[test]
    fn test_output_and_artifact_paths() {
        let out = default_output(Path::new("visa/nov.pdf"));
        assert_eq!(out, PathBuf::from("visa/nov.csv"));
        assert_eq!(artifact_path(&out, "extracted"), PathBuf::from("visa/nov.extracted.csv"));
        assert_eq!(artifact_path(&out, "processed"), PathBuf::from("visa/nov.processed.csv"));
    }
}
