//! Map raw statement records onto the canonical ledger schema.
//!
//! Sign convention: positive is money received, negative is money spent.
//! Card charges become negative, card payments positive; deposit-account
//! withdrawals negative, deposits positive. Running balances are dropped.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use ledgerline_ingest::{CardEntryKind, Movement, RawTransaction, StatementKind};

use crate::error::{FinanceError, Result};
use crate::ledger_csv::Table;

/// One row of the normalized ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTransaction {
    pub date: NaiveDate,
    /// Name of the source document, without directories.
    pub file: String,
    pub description: String,
    pub amount: f64,
}

/// Normalize the records of one document, preserving their order and count.
pub fn normalize(
    raw: &[RawTransaction],
    kind: StatementKind,
    source: &Path,
) -> Result<Vec<CanonicalTransaction>> {
    let file = file_name(source);
    raw.iter().map(|txn| normalize_one(txn, kind, &file)).collect()
}

fn normalize_one(txn: &RawTransaction, kind: StatementKind, file: &str) -> Result<CanonicalTransaction> {
    if !txn.fits(kind) {
        return Err(FinanceError::SchemaMismatch {
            expected: kind,
            description: txn.description().to_string(),
        });
    }

    let amount = match txn {
        RawTransaction::CreditCard(t) => match t.kind {
            CardEntryKind::Charge => -t.amount,
            CardEntryKind::Payment => t.amount,
        },
        RawTransaction::Deposit(t) => match t.movement {
            Movement::Withdrawal(v) => -v,
            Movement::Deposit(v) => v,
        },
    };

    Ok(CanonicalTransaction {
        date: txn.date(),
        file: file.to_string(),
        description: txn.description().to_string(),
        amount,
    })
}

/// Normalize a table read back from CSV. Canonical tables are refused so
/// the signs are never flipped twice.
pub fn normalize_table(table: Table, source: &Path) -> Result<Vec<CanonicalTransaction>> {
    match table {
        Table::Raw { kind, transactions } => normalize(&transactions, kind, source),
        Table::Canonical(_) => Err(FinanceError::AlreadyNormalized),
    }
}

/// Final path component, or the whole path when it has none.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerline_ingest::{CardTransaction, DepositTransaction};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn card(amount: f64, kind: CardEntryKind) -> RawTransaction {
        RawTransaction::CreditCard(CardTransaction {
            trans_date: d(2023, 11, 18),
            post_date: d(2023, 11, 20),
            description: "AMAZON.CA".to_string(),
            amount,
            kind,
        })
    }

    fn deposit(movement: Movement) -> RawTransaction {
        RawTransaction::Deposit(DepositTransaction {
            date: d(2023, 9, 20),
            description: "Online transfer".to_string(),
            movement,
            balance: Some(922.29),
        })
    }

    #[test]
    fn test_card_signs_inverted() {
        let raw = [card(45.67, CardEntryKind::Charge), card(500.0, CardEntryKind::Payment)];
        let rows = normalize(&raw, StatementKind::CreditCard, Path::new("visa.pdf")).unwrap();
        assert_eq!(rows[0].amount, -45.67);
        assert_eq!(rows[1].amount, 500.0);
        assert_eq!(rows[0].date, d(2023, 11, 18));
    }

    #[test]
    fn test_deposit_signs() {
        let raw = [deposit(Movement::Withdrawal(2000.0)), deposit(Movement::Deposit(374.0))];
        let rows = normalize(&raw, StatementKind::Chequing, Path::new("chq.pdf")).unwrap();
        assert!(rows[0].amount < 0.0);
        assert!(rows[1].amount > 0.0);
        assert_eq!(rows[1].amount, 374.0);
    }

    #[test]
    fn test_file_is_name_only() {
        let raw = [deposit(Movement::Deposit(1.0))];
        let rows = normalize(&raw, StatementKind::Savings, Path::new("/data/2023/sav-sep.pdf")).unwrap();
        assert_eq!(rows[0].file, "sav-sep.pdf");
    }

    #[test]
    fn test_schema_mismatch() {
        let raw = [deposit(Movement::Deposit(1.0))];
        let err = normalize(&raw, StatementKind::CreditCard, Path::new("x.pdf")).unwrap_err();
        assert!(matches!(err, FinanceError::SchemaMismatch { expected: StatementKind::CreditCard, .. }));
    }

    #[test]
    fn test_canonical_table_rejected() {
        let table = Table::Canonical(vec![CanonicalTransaction {
            date: d(2023, 9, 20),
            file: "x.pdf".to_string(),
            description: "Online transfer".to_string(),
            amount: -2000.0,
        }]);
        assert!(matches!(
            normalize_table(table, Path::new("x.pdf")),
            Err(FinanceError::AlreadyNormalized)
        ));
    }

    #[test]
    fn test_empty_input() {
        let rows = normalize(&[], StatementKind::Chequing, Path::new("x.pdf")).unwrap();
        assert!(rows.is_empty());
    }
}
