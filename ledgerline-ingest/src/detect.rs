//! Statement variant detection from page headers.

use tracing::debug;

use crate::error::{IngestError, Result};
use crate::rules::{DetectionRules, find_word_marker};
use crate::text::normalize_whitespace;
use crate::types::StatementKind;

/// Classify a document by the markers in the header of its first pages.
///
/// Markers match whole words only. Credit-card markers are tried first, then savings, then chequing: the
/// deposit-account table headers appear on both deposit variants, so the
/// more specific savings markers must win over the chequing fallback.
pub fn detect<S: AsRef<str>>(pages: &[S], rules: &DetectionRules) -> Result<StatementKind> {
    let order = [
        (StatementKind::CreditCard, &rules.credit_card),
        (StatementKind::Savings, &rules.savings),
        (StatementKind::Chequing, &rules.chequing),
    ];

    for (index, page) in pages.iter().take(rules.pages.max(1)).enumerate() {
        let window = header_window(page.as_ref(), rules.header_window);
        for (kind, markers) in &order {
            if let Some(marker) = find_word_marker(&window, markers) {
                debug!(page = index + 1, %kind, marker, "statement type detected");
                return Ok(*kind);
            }
        }
    }

    Err(IngestError::DetectionFailed)
}

fn header_window(page: &str, chars: usize) -> String {
    normalize_whitespace(page).chars().take(chars).collect()
}
