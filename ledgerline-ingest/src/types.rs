use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::TokenOrder;

/// Closed set of statement layouts the parsers understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatementKind {
    CreditCard,
    Chequing,
    Savings,
}

impl StatementKind {
    /// Chequing and savings statements share one column schema.
    pub fn is_deposit_account(self) -> bool {
        matches!(self, StatementKind::Chequing | StatementKind::Savings)
    }

    /// Order of the month and day inside abbreviated date tokens.
    pub fn token_order(self) -> TokenOrder {
        match self {
            StatementKind::CreditCard => TokenOrder::MonthDay,
            StatementKind::Chequing | StatementKind::Savings => TokenOrder::DayMonth,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StatementKind::CreditCard => "credit-card",
            StatementKind::Chequing => "chequing",
            StatementKind::Savings => "savings",
        }
    }

    /// Column headers of the raw extraction output for this variant.
    pub fn raw_headers(self) -> &'static [&'static str] {
        if self.is_deposit_account() {
            &["Date", "Description", "Withdrawals", "Deposits", "Balance"]
        } else {
            &["Transaction Date", "Posting Date", "Description", "Amount"]
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether a credit-card line moved money onto or off the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardEntryKind {
    Charge,
    Payment,
}

/// Credit-card row: two dates and an unsigned amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardTransaction {
    pub trans_date: NaiveDate,
    pub post_date: NaiveDate,
    pub description: String,
    /// Magnitude as printed; direction lives in `kind`.
    pub amount: f64,
    pub kind: CardEntryKind,
}

/// Money movement of a deposit-account row. Exactly one side per record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Movement {
    Withdrawal(f64),
    Deposit(f64),
}

/// Chequing/savings row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub movement: Movement,
    /// Running balance, informational only.
    pub balance: Option<f64>,
}

impl DepositTransaction {
    pub fn withdrawal(&self) -> Option<f64> {
        match self.movement {
            Movement::Withdrawal(v) => Some(v),
            Movement::Deposit(_) => None,
        }
    }

    pub fn deposit(&self) -> Option<f64> {
        match self.movement {
            Movement::Deposit(v) => Some(v),
            Movement::Withdrawal(_) => None,
        }
    }
}

/// Output of the line parsers, still in the variant's own schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "schema", rename_all = "kebab-case")]
pub enum RawTransaction {
    CreditCard(CardTransaction),
    Deposit(DepositTransaction),
}

impl RawTransaction {
    /// The date the ledger row is booked under.
    pub fn date(&self) -> NaiveDate {
        match self {
            RawTransaction::CreditCard(t) => t.trans_date,
            RawTransaction::Deposit(t) => t.date,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            RawTransaction::CreditCard(t) => &t.description,
            RawTransaction::Deposit(t) => &t.description,
        }
    }

    pub(crate) fn description_mut(&mut self) -> &mut String {
        match self {
            RawTransaction::CreditCard(t) => &mut t.description,
            RawTransaction::Deposit(t) => &mut t.description,
        }
    }

    /// True when the record uses the schema of `kind`.
    pub fn fits(&self, kind: StatementKind) -> bool {
        match self {
            RawTransaction::CreditCard(_) => kind == StatementKind::CreditCard,
            RawTransaction::Deposit(_) => kind.is_deposit_account(),
        }
    }
}

/// Months (and years) covered by one statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementPeriod {
    pub start_year: i32,
    pub start_month: u32,
    pub end_year: i32,
    pub end_month: u32,
}

impl StatementPeriod {
    /// A whole calendar year, used when the caller pins the year explicitly.
    pub fn for_year(year: i32) -> Self {
        Self {
            start_year: year,
            start_month: 1,
            end_year: year,
            end_month: 12,
        }
    }
}

/// Per-document parse state. Created for one document and dropped with it.
#[derive(Debug, Clone)]
pub struct StatementContext {
    kind: StatementKind,
    period: Option<StatementPeriod>,
    last_date: Option<NaiveDate>,
    lookback_months: u32,
}

impl StatementContext {
    pub fn new(kind: StatementKind, period: Option<StatementPeriod>, lookback_months: u32) -> Self {
        Self {
            kind,
            period,
            last_date: None,
            lookback_months,
        }
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn period(&self) -> Option<StatementPeriod> {
        self.period
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.last_date
    }

    pub fn lookback_months(&self) -> u32 {
        self.lookback_months
    }

    /// Move the carry-forward cursor. Returns the previous date when `date`
    /// goes backwards.
    pub(crate) fn record_date(&mut self, date: NaiveDate) -> Option<NaiveDate> {
        let previous = self.last_date.replace(date);
        previous.filter(|p| date < *p)
    }
}

/// Non-fatal findings collected while parsing one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum ParseWarning {
    ZeroTransactionsExtracted { ignored_lines: usize },
    OutOfOrderDate {
        line: String,
        previous: NaiveDate,
        resolved: NaiveDate,
    },
    DroppedPendingDescription { text: String },
    DescriptionlessAmount { line: String },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::ZeroTransactionsExtracted { ignored_lines } => write!(
                f,
                "no transactions extracted ({ignored_lines} lines ignored); the layout may have drifted"
            ),
            ParseWarning::OutOfOrderDate { line, previous, resolved } => write!(
                f,
                "date {resolved} precedes {previous}: `{line}`"
            ),
            ParseWarning::DroppedPendingDescription { text } => {
                write!(f, "description without amounts dropped: `{text}`")
            }
            ParseWarning::DescriptionlessAmount { line } => {
                write!(f, "amount line without description skipped: `{line}`")
            }
        }
    }
}

/// Everything the line parser learned about one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseReport {
    pub kind: StatementKind,
    pub period: Option<StatementPeriod>,
    pub transactions: Vec<RawTransaction>,
    /// Page furniture: headers, footers, page numbers.
    pub ignored_lines: usize,
    /// Summary rows such as opening/closing balance.
    pub discarded_lines: usize,
    pub warnings: Vec<ParseWarning>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_record_date_reports_regression() {
        let mut ctx = StatementContext::new(StatementKind::Chequing, None, 1);
        assert_eq!(ctx.record_date(d(2023, 9, 20)), None);
        assert_eq!(ctx.record_date(d(2023, 9, 21)), None);
        assert_eq!(ctx.record_date(d(2023, 9, 2)), Some(d(2023, 9, 21)));
        assert_eq!(ctx.last_date(), Some(d(2023, 9, 2)));
    }

    #[test]
    fn test_schema_fits_kind() {
        let txn = RawTransaction::Deposit(DepositTransaction {
            date: d(2023, 9, 20),
            description: "Online transfer".to_string(),
            movement: Movement::Withdrawal(2000.0),
            balance: None,
        });
        assert!(txn.fits(StatementKind::Chequing));
        assert!(txn.fits(StatementKind::Savings));
        assert!(!txn.fits(StatementKind::CreditCard));
    }

    #[test]
    fn test_report_serializes_warning_tags() {
        let w = ParseWarning::ZeroTransactionsExtracted { ignored_lines: 4 };
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["warning"], "zero_transactions_extracted");
        assert_eq!(json["ignored_lines"], 4);
    }
}
