//! Line parsers, one per statement variant.

pub mod credit_card;
pub mod deposit_account;

use tracing::{debug, info, warn};

use crate::dates::derive_period_from_pages;
use crate::detect::detect;
use crate::error::Result;
use crate::rules::KeywordRules;
use crate::types::{
    ParseReport, ParseWarning, RawTransaction, StatementContext, StatementKind, StatementPeriod,
};

/// Detect the variant of `pages` and parse them.
///
/// `statement_year` pins the year for documents whose header does not name
/// a period.
pub fn parse_statement<S: AsRef<str>>(
    pages: &[S],
    rules: &KeywordRules,
    statement_year: Option<i32>,
) -> Result<ParseReport> {
    let kind = detect(pages, &rules.detection)?;
    parse_as(kind, pages, rules, statement_year)
}

/// Parse `pages` as a known variant.
pub fn parse_as<S: AsRef<str>>(
    kind: StatementKind,
    pages: &[S],
    rules: &KeywordRules,
    statement_year: Option<i32>,
) -> Result<ParseReport> {
    let period = match statement_year {
        Some(year) => Some(StatementPeriod::for_year(year)),
        None => derive_period_from_pages(pages)?,
    };
    let mut context = StatementContext::new(kind, period, rules.lookback_months);

    let scan = match kind {
        StatementKind::CreditCard => credit_card::parse(pages, &mut context, rules)?,
        StatementKind::Chequing | StatementKind::Savings => {
            deposit_account::parse(pages, &mut context, rules)?
        }
    };

    let has_text = pages.iter().any(|p| !p.as_ref().trim().is_empty());
    let report = scan.finish(kind, period, has_text);
    info!(
        %kind,
        transactions = report.transactions.len(),
        ignored = report.ignored_lines,
        discarded = report.discarded_lines,
        "statement parsed"
    );
    Ok(report)
}

/// Running tallies shared by the variant parsers.
#[derive(Debug, Default)]
pub(crate) struct Scan {
    transactions: Vec<RawTransaction>,
    ignored_lines: usize,
    discarded_lines: usize,
    warnings: Vec<ParseWarning>,
    /// The previous non-blank line was the last record or one of its
    /// continuation lines.
    can_continue: bool,
}

impl Scan {
    pub(crate) fn emit(&mut self, txn: RawTransaction) {
        self.transactions.push(txn);
        self.can_continue = true;
    }

    pub(crate) fn ignore(&mut self, line: &str) {
        debug!(line = line.trim(), "ignored line");
        self.ignored_lines += 1;
        self.can_continue = false;
    }

    pub(crate) fn discard(&mut self, line: &str) {
        debug!(line = line.trim(), "discarded summary line");
        self.discarded_lines += 1;
        self.can_continue = false;
    }

    pub(crate) fn warn(&mut self, warning: ParseWarning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }

    pub(crate) fn break_run(&mut self) {
        self.can_continue = false;
    }

    /// Append `line` to the last record when the continuation heuristic agrees.
    pub(crate) fn try_continue(&mut self, line: &str) -> bool {
        if !self.can_continue {
            return false;
        }
        let Some(last) = self.transactions.last_mut() else {
            return false;
        };
        if !crate::text::continues_description(last.description(), line) {
            return false;
        }
        let text = crate::text::normalize_whitespace(line);
        let description = last.description_mut();
        if !description.is_empty() {
            description.push(' ');
        }
        description.push_str(&text);
        true
    }

    /// Append a note to the last record regardless of the heuristic.
    pub(crate) fn annotate_last(&mut self, note: &str) -> bool {
        match self.transactions.last_mut() {
            Some(last) => {
                last.description_mut().push_str(note);
                true
            }
            None => false,
        }
    }

    /// Date-order check; the source promises non-decreasing dates.
    pub(crate) fn check_order(&mut self, context: &mut StatementContext, date: chrono::NaiveDate, line: &str) {
        if let Some(previous) = context.record_date(date) {
            self.warn(ParseWarning::OutOfOrderDate {
                line: crate::text::normalize_whitespace(line),
                previous,
                resolved: date,
            });
        }
    }

    fn finish(mut self, kind: StatementKind, period: Option<StatementPeriod>, has_text: bool) -> ParseReport {
        if self.transactions.is_empty() && has_text {
            self.warn(ParseWarning::ZeroTransactionsExtracted {
                ignored_lines: self.ignored_lines,
            });
        }
        ParseReport {
            kind,
            period,
            transactions: self.transactions,
            ignored_lines: self.ignored_lines,
            discarded_lines: self.discarded_lines,
            warnings: self.warnings,
        }
    }
}
