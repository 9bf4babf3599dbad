//! CSV tables: raw extraction output, canonical ledger rows, and reading
//! either back.
//!
//! Raw credit-card tables keep the statement's sign (charges positive,
//! payments negative). Raw deposit tables keep separate withdrawal and
//! deposit columns plus the running balance.

use std::io;
use std::path::Path;

use chrono::NaiveDate;
use tracing::debug;

use ledgerline_ingest::{
    CardEntryKind, CardTransaction, DepositTransaction, IngestError, Movement, RawTransaction,
    StatementKind,
};

use crate::categorizer::Categorizer;
use crate::error::{FinanceError, Result};
use crate::normalizer::CanonicalTransaction;

pub const CANONICAL_HEADERS: [&str; 4] = ["Date", "File", "Description", "Amount"];
pub const CATEGORY_HEADER: &str = "Category";

/// A CSV table read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub enum Table {
    /// Raw extraction output. Deposit tables come back as `Chequing`; both
    /// deposit variants share one schema.
    Raw {
        kind: StatementKind,
        transactions: Vec<RawTransaction>,
    },
    Canonical(Vec<CanonicalTransaction>),
}

/// Two fractional digits, never `-0.00`.
pub fn format_amount(value: f64) -> String {
    let text = format!("{value:.2}");
    if text == "-0.00" { "0.00".to_string() } else { text }
}

/// Write raw records in the schema of `kind`.
pub fn write_raw<W: io::Write>(
    writer: W,
    kind: StatementKind,
    transactions: &[RawTransaction],
    include_header: bool,
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    if include_header {
        wtr.write_record(kind.raw_headers())?;
    }

    for txn in transactions {
        if !txn.fits(kind) {
            return Err(FinanceError::SchemaMismatch {
                expected: kind,
                description: txn.description().to_string(),
            });
        }
        match txn {
            RawTransaction::CreditCard(t) => {
                let signed = match t.kind {
                    CardEntryKind::Charge => t.amount,
                    CardEntryKind::Payment => -t.amount,
                };
                wtr.write_record([
                    t.trans_date.to_string(),
                    t.post_date.to_string(),
                    t.description.clone(),
                    format_amount(signed),
                ])?;
            }
            RawTransaction::Deposit(t) => {
                wtr.write_record([
                    t.date.to_string(),
                    t.description.clone(),
                    t.withdrawal().map(format_amount).unwrap_or_default(),
                    t.deposit().map(format_amount).unwrap_or_default(),
                    t.balance.map(format_amount).unwrap_or_default(),
                ])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Write canonical rows, with a `Category` column when a categorizer is given.
pub fn write_canonical<W: io::Write>(
    writer: W,
    rows: &[CanonicalTransaction],
    categorizer: Option<&Categorizer>,
    include_header: bool,
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    if include_header {
        let mut header: Vec<&str> = CANONICAL_HEADERS.to_vec();
        if categorizer.is_some() {
            header.push(CATEGORY_HEADER);
        }
        wtr.write_record(&header)?;
    }

    for row in rows {
        let mut record = vec![
            row.date.to_string(),
            row.file.clone(),
            row.description.clone(),
            format_amount(row.amount),
        ];
        if let Some(cat) = categorizer {
            record.push(cat.categorize(&row.description, row.amount).unwrap_or_default().to_string());
        }
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Read a raw or canonical table from `path`.
pub fn read_table(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path)?;
    read_table_from(file)
}

/// Read a raw or canonical table. The header row decides which.
pub fn read_table_from<R: io::Read>(reader: R) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let records: Vec<csv::StringRecord> = rdr.records().collect::<std::result::Result<_, _>>()?;
    debug!(?headers, rows = records.len(), "read csv table");

    if headers_match(&headers, &CANONICAL_HEADERS) || is_categorized(&headers) {
        return read_canonical(&records).map(Table::Canonical);
    }
    if headers_match(&headers, StatementKind::CreditCard.raw_headers()) {
        return Ok(Table::Raw {
            kind: StatementKind::CreditCard,
            transactions: read_card_rows(&records)?,
        });
    }
    if headers_match(&headers, StatementKind::Chequing.raw_headers()) {
        return Ok(Table::Raw {
            kind: StatementKind::Chequing,
            transactions: read_deposit_rows(&records)?,
        });
    }

    Err(FinanceError::UnknownHeaders(headers))
}

fn headers_match(found: &[String], expected: &[&str]) -> bool {
    found.len() == expected.len()
        && found
            .iter()
            .zip(expected)
            .all(|(f, e)| f.eq_ignore_ascii_case(e))
}

fn is_categorized(found: &[String]) -> bool {
    match found.split_last() {
        Some((last, rest)) => {
            last.eq_ignore_ascii_case(CATEGORY_HEADER) && headers_match(rest, &CANONICAL_HEADERS)
        }
        None => false,
    }
}

fn field(record: &csv::StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or("")
}

fn parse_date(row: usize, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| FinanceError::InvalidRow {
        row,
        reason: format!("bad date `{value}`"),
    })
}

/// Signed decimal, tolerating thousands separators and a dollar sign.
fn parse_number(row: usize, value: &str) -> Result<f64> {
    let cleaned: String = value.chars().filter(|c| *c != ',' && *c != '$').collect();
    cleaned.parse::<f64>().map_err(|_| FinanceError::InvalidRow {
        row,
        reason: format!("bad amount `{value}`"),
    })
}

fn optional_number(row: usize, value: &str) -> Result<Option<f64>> {
    if value.is_empty() {
        Ok(None)
    } else {
        parse_number(row, value).map(Some)
    }
}

/// Blank dates repeat the previous row's date.
fn carry_date(
    row: usize,
    value: &str,
    last: &mut Option<NaiveDate>,
    record: &csv::StringRecord,
) -> Result<NaiveDate> {
    if value.is_empty() {
        return last.ok_or_else(|| {
            FinanceError::Ingest(IngestError::OrphanTransaction {
                line: record.iter().collect::<Vec<_>>().join(","),
            })
        });
    }
    let date = parse_date(row, value)?;
    *last = Some(date);
    Ok(date)
}

fn read_card_rows(records: &[csv::StringRecord]) -> Result<Vec<RawTransaction>> {
    let mut last = None;
    let mut out = Vec::with_capacity(records.len());

    for (i, record) in records.iter().enumerate() {
        let row = i + 1;
        let trans_date = carry_date(row, field(record, 0), &mut last, record)?;
        let post_date = match field(record, 1) {
            "" => trans_date,
            value => parse_date(row, value)?,
        };
        let signed = parse_number(row, field(record, 3))?;
        let kind = if signed < 0.0 {
            CardEntryKind::Payment
        } else {
            CardEntryKind::Charge
        };

        out.push(RawTransaction::CreditCard(CardTransaction {
            trans_date,
            post_date,
            description: field(record, 2).to_string(),
            amount: signed.abs(),
            kind,
        }));
    }

    Ok(out)
}

/// Rows with no withdrawal and no deposit (opening and closing balance
/// lines) are skipped.
fn read_deposit_rows(records: &[csv::StringRecord]) -> Result<Vec<RawTransaction>> {
    let mut last = None;
    let mut skipped = 0;
    let mut out = Vec::with_capacity(records.len());

    for (i, record) in records.iter().enumerate() {
        let row = i + 1;
        let withdrawal = optional_number(row, field(record, 2))?;
        let deposit = optional_number(row, field(record, 3))?;

        let movement = match (withdrawal, deposit) {
            (Some(w), None) => Movement::Withdrawal(w),
            (None, Some(d)) => Movement::Deposit(d),
            (Some(_), Some(_)) => {
                return Err(FinanceError::InvalidRow {
                    row,
                    reason: "both withdrawal and deposit set".to_string(),
                });
            }
            (None, None) => {
                if !field(record, 0).is_empty() {
                    last = Some(parse_date(row, field(record, 0))?);
                }
                debug!(row, description = field(record, 1), "skipped row without movement");
                skipped += 1;
                continue;
            }
        };

        let date = carry_date(row, field(record, 0), &mut last, record)?;
        out.push(RawTransaction::Deposit(DepositTransaction {
            date,
            description: field(record, 1).to_string(),
            movement,
            balance: optional_number(row, field(record, 4))?,
        }));
    }

    if skipped > 0 {
        debug!(skipped, "deposit rows without movement");
    }
    Ok(out)
}

fn read_canonical(records: &[csv::StringRecord]) -> Result<Vec<CanonicalTransaction>> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let row = i + 1;
            Ok(CanonicalTransaction {
                date: parse_date(row, field(record, 0))?,
                file: field(record, 1).to_string(),
                description: field(record, 2).to_string(),
                amount: parse_number(row, field(record, 3))?,
            })
        })
        .collect()
}
