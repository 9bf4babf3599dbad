//! Keyword tables driving detection and line classification.
//!
//! The defaults cover the reference statements; other producers can ship
//! their own table (see `ledgerline init-rules`). Line markers match as
//! case-insensitive substrings; detection markers must match whole words.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Markers used to pick the statement variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionRules {
    /// How many leading pages to inspect.
    pub pages: usize,
    /// Characters of (whitespace-collapsed) page text to inspect per page.
    pub header_window: usize,
    pub credit_card: Vec<String>,
    pub savings: Vec<String>,
    pub chequing: Vec<String>,
}

impl Default for DetectionRules {
    fn default() -> Self {
        Self {
            pages: 2,
            header_window: 600,
            credit_card: strings(&[
                "visa",
                "mastercard",
                "master card",
                "credit card",
                "cardholder agreement",
            ]),
            savings: strings(&["savings account", "saving account", "esavings"]),
            chequing: strings(&[
                "chequing account",
                "checking account",
                "banking account",
                "cheques & debits",
                "deposits & credits",
                "chequing",
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordRules {
    pub detection: DetectionRules,
    /// Summary rows that look like transactions but never are.
    pub discard_markers: Vec<String>,
    /// Headers, footers and section titles.
    pub furniture_markers: Vec<String>,
    /// Credit-card descriptions that mean money came back onto the card.
    pub payment_keywords: Vec<String>,
    /// Months before the period start that still belong to the start year.
    pub lookback_months: u32,
}

impl Default for KeywordRules {
    fn default() -> Self {
        Self {
            detection: DetectionRules::default(),
            discard_markers: strings(&[
                "opening balance",
                "closing balance",
                "balance forward",
                "previous statement balance",
                "new balance",
                "total deposits",
                "total cheques",
                "total withdrawals",
            ]),
            furniture_markers: strings(&[
                "account activity",
                "account fees",
                "date description",
                "cheques & debits",
                "deposits & credits",
                "transaction date",
                "posting date",
                "activity description",
                "subtotal",
                "monthly activity",
                "account statement",
                "account number",
                "royal bank",
                "continued",
                "page ",
            ]),
            payment_keywords: strings(&[
                "payment - thank you",
                "payment thank you",
                "paiement - merci",
                "paiement merci",
                "refund",
                "credit voucher",
            ]),
            lookback_months: 1,
        }
    }
}

impl KeywordRules {
    pub fn is_discard(&self, line: &str) -> bool {
        find_marker(line, &self.discard_markers).is_some()
    }

    pub fn is_furniture(&self, line: &str) -> bool {
        find_marker(line, &self.furniture_markers).is_some()
    }

    pub fn is_payment(&self, description: &str) -> bool {
        find_marker(description, &self.payment_keywords).is_some()
    }
}

/// First marker contained in `text`, ignoring case.
pub fn find_marker<'a>(text: &str, markers: &'a [String]) -> Option<&'a str> {
    let lower = text.to_lowercase();
    markers
        .iter()
        .map(String::as_str)
        .find(|m| !m.is_empty() && lower.contains(&m.to_lowercase()))
}

/// First marker found in `text` as whole words, ignoring case.
///
/// `visa` matches "RBC Visa Infinite" but not "advisable".
pub fn find_word_marker<'a>(text: &str, markers: &'a [String]) -> Option<&'a str> {
    markers
        .iter()
        .map(String::as_str)
        .find(|m| word_pattern(m).is_some_and(|re| re.is_match(text)))
}

fn word_pattern(marker: &str) -> Option<Regex> {
    let marker = marker.trim();
    let first = marker.chars().next()?;
    let last = marker.chars().last()?;
    let edge = |c: char| if c.is_alphanumeric() { r"\b" } else { "" };
    Regex::new(&format!(
        "(?i){}{}{}",
        edge(first),
        regex::escape(marker),
        edge(last)
    ))
    .ok()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
