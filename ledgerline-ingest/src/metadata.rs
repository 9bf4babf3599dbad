//! Account identification: numbers, personal/business use, statement type.

use regex::Regex;
use serde::Serialize;

use crate::detect::detect;
use crate::error::Result;
use crate::rules::DetectionRules;
use crate::text::normalize_whitespace;
use crate::types::StatementKind;

pub const NOT_FOUND: &str = "NOT_FOUND";

/// Characters of the first pages inspected for the account use.
const USE_WINDOW: usize = 400;
const USE_PAGES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountUse {
    Personal,
    Business,
}

impl std::fmt::Display for AccountUse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountUse::Personal => write!(f, "personal"),
            AccountUse::Business => write!(f, "business"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountInfo {
    /// Distinct account identifiers in order of appearance, or `[NOT_FOUND]`.
    pub account_numbers: Vec<String>,
    pub account_use: AccountUse,
    /// `None` when the document is not a recognized statement.
    pub kind: Option<StatementKind>,
}

/// Collect account metadata from the page text of one statement.
pub fn account_info<S: AsRef<str>>(pages: &[S], rules: &DetectionRules) -> Result<AccountInfo> {
    let numbers = account_numbers(pages)?;
    let account_use = account_use(pages)?;
    let kind = detect(pages, rules).ok();
    Ok(AccountInfo {
        account_numbers: numbers,
        account_use,
        kind,
    })
}

/// Account identifiers per page. The first pattern that matches a page wins
/// for that page: printed account numbers, then masked card numbers, then
/// "card ending in" phrases.
pub fn account_numbers<S: AsRef<str>>(pages: &[S]) -> Result<Vec<String>> {
    let account_re = Regex::new(r"(?i)(?:Your\s+)?Account\s+(?:Number|No)[\s:.]+(\d[\d\s\-]+)")?;
    let card_re = Regex::new(r"(\d{4}\s+(?:[0-9*]{4}\s+){2}\d{4})")?;
    let ending_re = Regex::new(r"(?i)(?:Card\s+ending|ending\s+in)[\s:]+(\d{4})")?;

    let mut found: Vec<String> = Vec::new();
    let mut push = |value: String| {
        if !value.is_empty() && !found.contains(&value) {
            found.push(value);
        }
    };

    for page in pages {
        let page = page.as_ref();

        let accounts: Vec<String> = account_re
            .captures_iter(page)
            .map(|caps| clean_account_number(&caps[1]))
            .filter(|n| !n.is_empty())
            .collect();
        if !accounts.is_empty() {
            accounts.into_iter().for_each(&mut push);
            continue;
        }

        // Unmasked 16-digit runs are usually reference numbers.
        let cards: Vec<String> = card_re
            .captures_iter(page)
            .map(|caps| normalize_whitespace(&caps[1]))
            .filter(|n| n.contains('*'))
            .collect();
        if !cards.is_empty() {
            cards.into_iter().for_each(&mut push);
            continue;
        }

        for caps in ending_re.captures_iter(page) {
            push(format!("****{}", &caps[1]));
        }
    }

    if found.is_empty() {
        found.push(NOT_FOUND.to_string());
    }
    Ok(found)
}

/// Trim the capture back to digits separated by single spaces or dashes;
/// the lazy pattern can swallow a trailing line break and the next column.
fn clean_account_number(raw: &str) -> String {
    let first_line = raw.lines().next().unwrap_or_default();
    let first_run = first_line.split("  ").next().unwrap_or_default();
    normalize_whitespace(first_run.trim_end_matches(['-', ' ']))
}

/// Personal unless the header of the first pages says business/commercial.
pub fn account_use<S: AsRef<str>>(pages: &[S]) -> Result<AccountUse> {
    let personal_re = Regex::new(r"(?i)\bpersonal\b")?;
    let business_re = Regex::new(r"(?i)\b(?:business|commercial)\b")?;

    for page in pages.iter().take(USE_PAGES) {
        let window: String = page.as_ref().chars().take(USE_WINDOW).collect();
        if personal_re.is_match(&window) {
            return Ok(AccountUse::Personal);
        }
        if business_re.is_match(&window) {
            return Ok(AccountUse::Business);
        }
    }
    Ok(AccountUse::Personal)
}
