//! Statement period detection and abbreviated date resolution.
//!
//! Statement rows print dates without a year (`NOV17`, `21 Mar`). The year
//! comes from the period named in the statement header; a period that starts
//! in November or December rolls early-year months into the following year.

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{IngestError, Result};
use crate::types::{StatementContext, StatementPeriod};

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Order of the parts inside an abbreviated date token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOrder {
    /// `NOV17`, `NOV 17`, `NOV-17`
    MonthDay,
    /// `21Mar`, `21 Mar`
    DayMonth,
}

/// Month number for an English month name or an abbreviation of at least
/// three letters (`Sep`, `Sept`, `September`).
pub fn month_from_name(name: &str) -> Option<u32> {
    let name = name.trim().trim_end_matches('.').to_lowercase();
    if name.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|full| full.starts_with(&name))
        .map(|i| i as u32 + 1)
}

/// Split an abbreviated token into `(month, day)`.
pub fn split_token(token: &str, order: TokenOrder) -> Option<(u32, u32)> {
    let compact: String = token
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    let (month_part, day_part) = match order {
        TokenOrder::MonthDay => {
            let split = compact.find(|c: char| c.is_ascii_digit())?;
            (&compact[..split], &compact[split..])
        }
        TokenOrder::DayMonth => {
            let split = compact.find(|c: char| !c.is_ascii_digit())?;
            (&compact[split..], &compact[..split])
        }
    };

    if day_part.is_empty() || day_part.len() > 2 || !day_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if !month_part.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let month = month_from_name(month_part)?;
    let day: u32 = day_part.parse().ok()?;
    (1..=31).contains(&day).then_some((month, day))
}

/// Find the statement period named anywhere in `text`.
pub fn derive_period(text: &str) -> Result<Option<StatementPeriod>> {
    let period_re = Regex::new(concat!(
        r"(?i)(?:from\s+)?\b(?P<sm>[a-z]{3,9})\.?\s+(?P<sd>\d{1,2}),?\s*(?P<sy>\d{4})?",
        r"\s+to\s+",
        r"(?P<em>[a-z]{3,9})\.?\s+(?P<ed>\d{1,2}),?\s*(?P<ey>\d{4})\b"
    ))?;

    for caps in period_re.captures_iter(text) {
        let (Some(start_month), Some(end_month)) =
            (month_from_name(&caps["sm"]), month_from_name(&caps["em"]))
        else {
            continue;
        };
        let Ok(end_year) = caps["ey"].parse::<i32>() else {
            continue;
        };

        let start_year = match caps.name("sy").and_then(|m| m.as_str().parse::<i32>().ok()) {
            Some(y) => y,
            None if start_month > end_month => end_year - 1,
            None => end_year,
        };

        return Ok(Some(StatementPeriod {
            start_year,
            start_month,
            end_year,
            end_month,
        }));
    }

    Ok(None)
}

/// First period found across the pages, in page order.
pub fn derive_period_from_pages<S: AsRef<str>>(pages: &[S]) -> Result<Option<StatementPeriod>> {
    for page in pages {
        if let Some(period) = derive_period(page.as_ref())? {
            return Ok(Some(period));
        }
    }
    Ok(None)
}

/// Year a transaction month belongs to within `period`.
///
/// Months earlier than the start month roll into the next year when the
/// period starts in November/December or ends in a later year. Months no
/// more than `lookback_months` before the start (posting lag) stay put.
pub fn resolve_year(month: u32, period: &StatementPeriod, lookback_months: u32) -> i32 {
    let crosses_year = period.start_month >= 11 || period.end_year > period.start_year;
    let before_start = month < period.start_month;
    let lagging = before_start && period.start_month - month <= lookback_months;

    if crosses_year && before_start && !lagging {
        period.start_year + 1
    } else {
        period.start_year
    }
}

/// Resolve an abbreviated token using the context's variant and period.
pub fn resolve(token: &str, context: &StatementContext) -> Result<NaiveDate> {
    let (month, day) = split_token(token, context.kind().token_order()).ok_or_else(|| {
        IngestError::DateResolutionFailed {
            token: token.to_string(),
            reason: "not a date token".to_string(),
        }
    })?;

    let period = context
        .period()
        .ok_or_else(|| IngestError::DateResolutionFailed {
            token: token.to_string(),
            reason: "statement period not found, year is ambiguous".to_string(),
        })?;

    let year = resolve_year(month, &period, context.lookback_months());
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| IngestError::DateResolutionFailed {
        token: token.to_string(),
        reason: format!("no such day in {year}"),
    })
}
