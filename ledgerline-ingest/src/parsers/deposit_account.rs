//! Chequing/savings statement parser (text)
//!
//! Expected extracted-text section:
//!   Date     Description                    Cheques & Debits   Deposits & Credits     Balance
//!            Opening balance                                                         1,000.00
//!   02 May   Payroll deposit ACME                                     2,500.00       3,500.00
//!            Online Banking payment - 6271       150.00                              3,350.00
//!
//! Rows omit the date when it repeats. Amounts are placed in a column by
//! their position under the header; delimited dumps
//! (`date, description, withdrawal, deposit, balance`) are accepted too.

use tracing::debug;

use super::Scan;
use crate::dates::{TokenOrder, month_from_name, resolve, split_token};
use crate::error::{IngestError, Result};
use crate::rules::KeywordRules;
use crate::text::{char_column, is_amount_token, normalize_whitespace, parse_amount};
use crate::types::{DepositTransaction, Movement, ParseWarning, RawTransaction, StatementContext};

/// Character columns `[start, end)` of a header label or a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    end: usize,
}

impl Span {
    fn gap(&self, other: &Span) -> usize {
        if self.end <= other.start {
            other.start - self.end
        } else if other.end <= self.start {
            self.start - other.end
        } else {
            0
        }
    }

    fn centre_distance(&self, other: &Span) -> usize {
        (self.start + self.end).abs_diff(other.start + other.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Withdrawal,
    Deposit,
    Balance,
}

/// Column positions taken from the table header line.
#[derive(Debug, Clone, PartialEq)]
struct ColumnLayout {
    columns: Vec<(Column, Span)>,
}

const WITHDRAWAL_LABELS: [&str; 3] = ["cheques & debits", "withdrawals", "debits"];
const DEPOSIT_LABELS: [&str; 3] = ["deposits & credits", "deposits", "credits"];

impl ColumnLayout {
    fn from_header(line: &str) -> Option<Self> {
        if line.split_whitespace().any(is_amount_token) {
            return None;
        }
        let lower = line.to_lowercase();
        let withdrawal = find_label(&lower, &WITHDRAWAL_LABELS)?;
        let deposit = find_label(&lower, &DEPOSIT_LABELS)?;

        let mut columns = vec![(Column::Withdrawal, withdrawal), (Column::Deposit, deposit)];
        if let Some(balance) = find_label(&lower, &["balance"]) {
            columns.push((Column::Balance, balance));
        }
        Some(Self { columns })
    }

    /// Assign each amount to the nearest header not already taken.
    fn place(&self, amounts: &[(f64, Span)]) -> Vec<(Column, f64)> {
        let mut taken: Vec<Column> = Vec::new();
        let mut placed = Vec::new();

        for (value, span) in amounts {
            let mut candidates: Vec<&(Column, Span)> = self.columns.iter().collect();
            candidates.sort_by_key(|(_, header)| (header.gap(span), header.centre_distance(span)));
            if let Some((column, _)) = candidates.into_iter().find(|(c, _)| !taken.contains(c)) {
                taken.push(*column);
                placed.push((*column, *value));
            }
        }
        placed
    }
}

fn find_label(lower: &str, labels: &[&str]) -> Option<Span> {
    labels.iter().find_map(|label| {
        lower.find(label).map(|byte| {
            let start = char_column(lower, byte);
            Span {
                start,
                end: start + label.chars().count(),
            }
        })
    })
}

/// One physical line split into its parts.
#[derive(Debug, Default, PartialEq)]
struct DepositLine {
    date_token: Option<String>,
    description: String,
    withdrawal: Option<f64>,
    deposit: Option<f64>,
    balance: Option<f64>,
}

impl DepositLine {
    fn has_movement(&self) -> bool {
        self.withdrawal.is_some() || self.deposit.is_some()
    }
}

/// `date, description, withdrawal, deposit, balance` with `,` or tab cells.
fn split_cells(line: &str) -> Option<DepositLine> {
    let sep = if line.contains('\t') {
        '\t'
    } else if line.contains(',') {
        ','
    } else {
        return None;
    };

    let cells: Vec<&str> = line.split(sep).collect();
    let n = cells.len();
    if n < 5 {
        return None;
    }

    let date_cell = cells[0].trim();
    if !date_cell.is_empty() && split_token(date_cell, TokenOrder::DayMonth).is_none() {
        return None;
    }

    let mut amounts = [None; 3];
    for (slot, cell) in amounts.iter_mut().zip(&cells[n - 3..]) {
        let cell = cell.trim();
        if cell.is_empty() {
            continue;
        }
        *slot = Some(parse_amount(cell)?);
    }

    let separator = sep.to_string();
    Some(DepositLine {
        date_token: (!date_cell.is_empty()).then(|| date_cell.to_string()),
        description: normalize_whitespace(&cells[1..n - 3].join(separator.as_str())),
        withdrawal: amounts[0],
        deposit: amounts[1],
        balance: amounts[2],
    })
}

/// Whitespace-separated tokens with their byte offsets.
fn tokens(line: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, c) in line.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                out.push((s, &line[s..i]));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        out.push((s, &line[s..]));
    }
    out
}

/// Leading `21Mar` / `21 Mar` token: (token text, token count, end byte).
fn leading_date(line: &str, toks: &[(usize, &str)]) -> Option<(String, usize, usize)> {
    let (first_at, first) = *toks.first()?;
    if first.chars().any(|c| c.is_ascii_alphabetic()) {
        return split_token(first, TokenOrder::DayMonth)
            .map(|_| (first.to_string(), 1, first_at + first.len()));
    }
    let (second_at, second) = *toks.get(1)?;
    if first.len() <= 2
        && first.chars().all(|c| c.is_ascii_digit())
        && second.chars().all(|c| c.is_ascii_alphabetic())
        && month_from_name(second).is_some()
    {
        let end = second_at + second.len();
        return Some((line[first_at..end].to_string(), 2, end));
    }
    None
}

/// Split a column-layout line. Amounts need a known layout.
fn split_layout(line: &str, layout: Option<&ColumnLayout>) -> Result<Option<DepositLine>> {
    let toks = tokens(line);
    let date = leading_date(line, &toks);
    let (date_token, date_tokens, desc_start) = match date {
        Some((token, count, end)) => (Some(token), count, end),
        None => (None, 0, 0),
    };

    let mut first_amount = toks.len();
    while first_amount > date_tokens
        && toks.len() - first_amount < 3
        && is_amount_token(toks[first_amount - 1].1)
    {
        first_amount -= 1;
    }

    let desc_end = toks.get(first_amount).map_or(line.len(), |(at, _)| *at);
    let mut parsed = DepositLine {
        description: normalize_whitespace(&line[desc_start..desc_end]),
        date_token,
        ..DepositLine::default()
    };

    let amounts: Vec<(f64, Span)> = toks[first_amount..]
        .iter()
        .filter_map(|(at, tok)| {
            let start = char_column(line, *at);
            parse_amount(tok).map(|v| {
                (
                    v,
                    Span {
                        start,
                        end: start + tok.chars().count(),
                    },
                )
            })
        })
        .collect();
    if amounts.is_empty() {
        return Ok(Some(parsed));
    }

    let Some(layout) = layout else {
        if parsed.date_token.is_some() {
            return Err(IngestError::ColumnLayoutMissing {
                line: normalize_whitespace(line),
            });
        }
        // Summary boxes above the table carry amounts too.
        return Ok(None);
    };

    for (column, value) in layout.place(&amounts) {
        match column {
            Column::Withdrawal => parsed.withdrawal = Some(value),
            Column::Deposit => parsed.deposit = Some(value),
            Column::Balance => parsed.balance = Some(value),
        }
    }
    Ok(Some(parsed))
}

fn is_month_heading(line: &str) -> bool {
    let t = line.trim();
    t.chars().all(|c| c.is_ascii_alphabetic()) && t.len() >= 3 && month_from_name(t).is_some()
}

/// Leading date token on a delimited or column-layout line.
fn starts_with_date(line: &str) -> bool {
    match split_cells(line) {
        Some(cells) => cells.date_token.is_some(),
        None => leading_date(line, &tokens(line)).is_some(),
    }
}

/// Description lines waiting for the amounts of their entry.
#[derive(Debug)]
struct Pending {
    lines: Vec<String>,
    /// Started on a dated line. Undated text may instead be the wrapped
    /// tail of the previous record.
    dated: bool,
}

fn hold(pending: &mut Option<Pending>, text: String, dated: bool) {
    match pending.as_mut() {
        Some(held) => held.lines.push(text),
        None => {
            *pending = Some(Pending {
                lines: vec![text],
                dated,
            })
        }
    }
}

/// Decide where held text goes once the next line is known.
///
/// `amount_line` is `Some(dated)` when the next line carries amounts, and
/// the returned text prefixes that line's description. Undated text that
/// no amount line claims falls back to continuing the previous record.
fn settle_pending(
    pending: &mut Option<Pending>,
    amount_line: Option<bool>,
    scan: &mut Scan,
) -> Option<String> {
    let held = pending.take()?;
    match (held.dated, amount_line) {
        (true, Some(_)) | (false, Some(false)) => Some(held.lines.join(" ")),
        (true, None) => {
            scan.warn(ParseWarning::DroppedPendingDescription {
                text: held.lines.join(" "),
            });
            None
        }
        (false, _) => {
            for line in &held.lines {
                if !scan.try_continue(line) {
                    scan.ignore(line);
                }
            }
            None
        }
    }
}

/// Parse chequing/savings page text into raw records.
pub(crate) fn parse<S: AsRef<str>>(
    pages: &[S],
    context: &mut StatementContext,
    rules: &KeywordRules,
) -> Result<Scan> {
    let mut scan = Scan::default();
    let mut layout: Option<ColumnLayout> = None;
    let mut pending: Option<Pending> = None;

    for page in pages {
        for line in page.as_ref().lines() {
            if line.trim().is_empty() {
                continue;
            }

            if let Some(found) = ColumnLayout::from_header(line) {
                debug!(?found, "column header");
                layout = Some(found);
                settle_pending(&mut pending, None, &mut scan);
                scan.ignore(line);
                continue;
            }

            // A dated line is a transaction whatever its description says.
            if rules.is_discard(line) && !starts_with_date(line) {
                settle_pending(&mut pending, None, &mut scan);
                scan.discard(line);
                continue;
            }

            let parsed = match split_cells(line) {
                Some(cells) => Some(cells),
                None => split_layout(line, layout.as_ref())?,
            };
            let Some(parsed) = parsed else {
                settle_pending(&mut pending, None, &mut scan);
                scan.ignore(line);
                continue;
            };

            if parsed.has_movement() {
                let dated = parsed.date_token.is_some();
                let prefix = settle_pending(&mut pending, Some(dated), &mut scan);
                emit_line(parsed, line, context, prefix, &mut scan)?;
            } else if parsed.balance.is_some() {
                settle_pending(&mut pending, None, &mut scan);
                scan.ignore(line);
            } else if let Some(token) = parsed.date_token {
                // Dated text without amounts: the amounts follow on a later line.
                let date = resolve(&token, context)?;
                scan.check_order(context, date, line);
                settle_pending(&mut pending, None, &mut scan);
                if !parsed.description.is_empty() {
                    hold(&mut pending, parsed.description, true);
                }
                scan.break_run();
            } else if rules.is_furniture(line) || is_month_heading(line) {
                settle_pending(&mut pending, None, &mut scan);
                scan.ignore(line);
            } else {
                hold(&mut pending, parsed.description, false);
            }
        }
        settle_pending(&mut pending, None, &mut scan);
        scan.break_run();
    }

    Ok(scan)
}

fn emit_line(
    parsed: DepositLine,
    line: &str,
    context: &mut StatementContext,
    prefix: Option<String>,
    scan: &mut Scan,
) -> Result<()> {
    let date = match parsed.date_token.as_deref() {
        Some(token) => {
            let date = resolve(token, context)?;
            scan.check_order(context, date, line);
            date
        }
        None => context.last_date().ok_or_else(|| IngestError::OrphanTransaction {
            line: normalize_whitespace(line),
        })?,
    };

    let description = match prefix {
        Some(prefix) if parsed.description.is_empty() => prefix,
        Some(prefix) => format!("{prefix} {}", parsed.description),
        None => parsed.description,
    };
    if description.is_empty() {
        scan.warn(ParseWarning::DescriptionlessAmount {
            line: normalize_whitespace(line),
        });
        scan.ignore(line);
        return Ok(());
    }

    let movements = [
        parsed.withdrawal.map(Movement::Withdrawal),
        parsed.deposit.map(Movement::Deposit),
    ];
    let count = movements.iter().flatten().count();
    for (i, movement) in movements.into_iter().flatten().enumerate() {
        scan.emit(RawTransaction::Deposit(DepositTransaction {
            date,
            description: description.clone(),
            movement,
            // The printed balance follows the last movement on the line.
            balance: if i + 1 == count { parsed.balance } else { None },
        }));
    }
    Ok(())
}
