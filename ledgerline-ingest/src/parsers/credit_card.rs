//! Credit-card statement parser (text)
//!
//! Expected rows after PDF-to-text:
//!   TRANSACTION POSTING
//!   DATE        DATE     ACTIVITY DESCRIPTION                          AMOUNT ($)
//!   NOV 18      NOV 20   AMAZON.CA AMAZON.CA ON                            $45.67
//!                        Foreign Currency-USD 12.34 Exchange rate-1.3456
//!   DEC 01      DEC 02   PAYMENT - THANK YOU / PAIEMENT - MERCI         -$500.00

use regex::Regex;

use super::Scan;
use crate::dates::resolve;
use crate::error::Result;
use crate::rules::KeywordRules;
use crate::text::{is_numeric_only, normalize_whitespace, parse_amount};
use crate::types::{CardEntryKind, CardTransaction, RawTransaction, StatementContext};

struct CardPatterns {
    line: Regex,
    currency: Regex,
    card_number: Regex,
}

impl CardPatterns {
    fn new() -> Result<Self> {
        Ok(Self {
            line: Regex::new(concat!(
                r"^\s*(?P<trans>[A-Za-z]{3}[-\s]?\d{1,2})\s+",
                r"(?P<post>[A-Za-z]{3}[-\s]?\d{1,2})\s+",
                r"(?P<desc>[^$]+?)\s*",
                r"(?P<polarity>-)?\s*\$(?P<amt>[\d,]+\.\d{2})\b"
            ))?,
            currency: Regex::new(
                r"(?i)Foreign\s+Currency\s*-\s*(?P<code>[A-Z]{3})\s+(?P<amt>[\d,]+\.\d{2})\s+Exchange\s+rate\s*-\s*(?P<rate>[\d.]+)",
            )?,
            card_number: Regex::new(r"\d{4}\s+\d{2}\*{2}\s+\*{4}\s+\d{4}")?,
        })
    }
}

/// Parse credit-card page text into raw records.
pub(crate) fn parse<S: AsRef<str>>(
    pages: &[S],
    context: &mut StatementContext,
    rules: &KeywordRules,
) -> Result<Scan> {
    let patterns = CardPatterns::new()?;
    let mut scan = Scan::default();

    for page in pages {
        for line in page.as_ref().lines() {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(caps) = patterns.currency.captures(line) {
                let note = format!(" ({} {} @{})", &caps["amt"], caps["code"].to_uppercase(), &caps["rate"]);
                if !scan.annotate_last(&note) {
                    scan.ignore(line);
                }
                continue;
            }

            if let Some(txn) = match_transaction(&patterns, line, context, rules, &mut scan)? {
                scan.emit(RawTransaction::CreditCard(txn));
                continue;
            }

            // Only lines without the date pair can be summary rows.
            if rules.is_discard(line) {
                scan.discard(line);
                continue;
            }

            if is_numeric_only(line) {
                // Authorization numbers sit between a row and its wrapped text.
                scan.ignored_lines += 1;
                continue;
            }

            if rules.is_furniture(line) || patterns.card_number.is_match(line) {
                scan.ignore(line);
                continue;
            }

            if !scan.try_continue(line) {
                scan.ignore(line);
            }
        }
        scan.break_run();
    }

    Ok(scan)
}

fn match_transaction(
    patterns: &CardPatterns,
    line: &str,
    context: &mut StatementContext,
    rules: &KeywordRules,
    scan: &mut Scan,
) -> Result<Option<CardTransaction>> {
    let Some(caps) = patterns.line.captures(line) else {
        return Ok(None);
    };

    // Words like "THE 12" fit the shape but are not dates.
    let order = context.kind().token_order();
    if crate::dates::split_token(&caps["trans"], order).is_none()
        || crate::dates::split_token(&caps["post"], order).is_none()
    {
        return Ok(None);
    }

    let trans_date = resolve(&caps["trans"], context)?;
    let post_date = resolve(&caps["post"], context)?;
    scan.check_order(context, post_date, line);

    let Some(amount) = parse_amount(&caps["amt"]) else {
        return Ok(None);
    };
    let description = normalize_whitespace(&caps["desc"]);

    let kind = if caps.name("polarity").is_some() || rules.is_payment(&description) {
        CardEntryKind::Payment
    } else {
        CardEntryKind::Charge
    };

    Ok(Some(CardTransaction {
        trans_date,
        post_date,
        description,
        amount,
        kind,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;
    use crate::types::{StatementKind, StatementPeriod};
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn run(text: &str, period: Option<StatementPeriod>) -> Result<Scan> {
        let mut ctx = StatementContext::new(StatementKind::CreditCard, period, 1);
        parse(&[text], &mut ctx, &KeywordRules::default())
    }

    fn nov_dec_2023() -> Option<StatementPeriod> {
        Some(StatementPeriod {
            start_year: 2023,
            start_month: 11,
            end_year: 2023,
            end_month: 12,
        })
    }

    fn card(scan: &Scan, i: usize) -> &CardTransaction {
        match &scan.transactions[i] {
            RawTransaction::CreditCard(t) => t,
            other => panic!("expected card row, got {other:?}"),
        }
    }

    #[test]
    fn test_parses_basic_rows() {
        let text = r#"
TRANSACTION POSTING ACTIVITY DESCRIPTION                          AMOUNT ($)
NOV 18      NOV 20   AMAZON.CA AMAZON.CA ON                            $45.67
DEC01       DEC02    PAYMENT - THANK YOU / PAIEMENT - MERCI         -$500.00
"#;
        let scan = run(text, nov_dec_2023()).unwrap();
        assert_eq!(scan.transactions.len(), 2);

        let first = card(&scan, 0);
        assert_eq!(first.trans_date, d(2023, 11, 18));
        assert_eq!(first.post_date, d(2023, 11, 20));
        assert_eq!(first.description, "AMAZON.CA AMAZON.CA ON");
        assert_eq!(first.amount, 45.67);
        assert_eq!(first.kind, CardEntryKind::Charge);

        let second = card(&scan, 1);
        assert_eq!(second.amount, 500.0);
        assert_eq!(second.kind, CardEntryKind::Payment);
    }

    #[test]
    fn test_payment_keyword_without_minus() {
        let text = "DEC 03 DEC 04 PAYMENT THANK YOU $120.00";
        let scan = run(text, nov_dec_2023()).unwrap();
        assert_eq!(card(&scan, 0).kind, CardEntryKind::Payment);
    }

    #[test]
    fn test_january_rows_roll_over() {
        let text = "DEC 30   JAN 02   UBER TRIP TORONTO   $18.20\nJAN 03   JAN 04   TIM HORTONS   $2.50";
        let scan = run(text, nov_dec_2023()).unwrap();
        assert_eq!(card(&scan, 0).trans_date, d(2023, 12, 30));
        assert_eq!(card(&scan, 0).post_date, d(2024, 1, 2));
        assert_eq!(card(&scan, 1).trans_date, d(2024, 1, 3));
        assert!(scan.warnings.is_empty());
    }

    #[test]
    fn test_wrapped_description_and_currency_line() {
        let text = r#"
NOV 18   NOV 20   GITHUB, INC. GITHUB.COM SAN                       $13.42
                  FRANCISCO CA
74500013290583928374
                  Foreign Currency-USD 10.00 Exchange rate-1.342000
"#;
        let scan = run(text, nov_dec_2023()).unwrap();
        assert_eq!(scan.transactions.len(), 1);
        assert_eq!(
            card(&scan, 0).description,
            "GITHUB, INC. GITHUB.COM SAN FRANCISCO CA (10.00 USD @1.342000)"
        );
        assert_eq!(scan.ignored_lines, 1);
    }

    #[test]
    fn test_side_box_after_amount_is_ignored() {
        let text = "NOV 18   NOV 20   IKEA OTTAWA   $99.00      Previous Account Balance $1,000.00";
        let scan = run(text, nov_dec_2023()).unwrap();
        assert_eq!(card(&scan, 0).amount, 99.0);
        assert_eq!(card(&scan, 0).description, "IKEA OTTAWA");
    }

    #[test]
    fn test_card_headers_and_summary_rows() {
        let text = r#"
JOHN DOE 4516 07** **** 4390
NEW BALANCE                                   $1,234.56
SUBTOTAL OF MONTHLY ACTIVITY                  $1,234.56
NOV 21   NOV 22   COSTCO WHOLESALE   $210.11
"#;
        let scan = run(text, nov_dec_2023()).unwrap();
        assert_eq!(scan.transactions.len(), 1);
        assert_eq!(scan.discarded_lines, 1);
        assert_eq!(scan.ignored_lines, 2);
        assert_eq!(card(&scan, 0).description, "COSTCO WHOLESALE");
    }

    #[test]
    fn test_merchant_named_like_summary_row_is_kept() {
        let text = r#"
NEW BALANCE                                   $1,234.56
NOV 18   NOV 20   NEW BALANCE ATHLETICS TORONTO ON   $129.99
NOV 19   NOV 21   AMAZON.CA AMAZON.CA ON             $45.67
"#;
        let scan = run(text, nov_dec_2023()).unwrap();
        assert_eq!(scan.transactions.len(), 2);
        assert_eq!(scan.discarded_lines, 1);
        assert_eq!(card(&scan, 0).description, "NEW BALANCE ATHLETICS TORONTO ON");
        assert_eq!(card(&scan, 0).amount, 129.99);
    }

    #[test]
    fn test_non_month_words_are_not_dates() {
        let text = "THE 12 DAYS OF CHRISTMAS 25 OFF $3.00";
        let scan = run(text, nov_dec_2023()).unwrap();
        assert!(scan.transactions.is_empty());
    }

    #[test]
    fn test_missing_period_is_fatal() {
        let text = "NOV 18   NOV 20   AMAZON.CA   $45.67";
        assert!(matches!(run(text, None), Err(IngestError::DateResolutionFailed { .. })));
    }
}
