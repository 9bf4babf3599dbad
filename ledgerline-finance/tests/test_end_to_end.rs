use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use ledgerline_finance::batch::{artifact_path, default_output, process_batch};
use ledgerline_finance::{
    Categorizer, FinanceError, Table, normalize_table, process_document, read_table,
    write_canonical, write_raw,
};
use ledgerline_ingest::{IngestError, KeywordRules, StatementKind};

const CHEQUING_PAGE_ONE: &str = "\
Your RBC personal banking account statement
From September 1, 2023 to September 30, 2023
Opening balance, , , , 3296.29
20 Sep, Online transfer, 2000.00, , 1296.29
Page 1 of 2
";

const CHEQUING_PAGE_TWO: &str = "\
, Misc Payment, 374.00, , 922.29
, Payroll deposit, , 1500.00, 2422.29
Closing balance, , , , 2422.29
Page 2 of 2
";

const VISA_STATEMENT: &str = r#"
RBC Visa Platinum
STATEMENT FROM NOV 17, 2023 TO DEC 15, 2023
PREVIOUS STATEMENT BALANCE                                   $1,000.00
TRANSACTION POSTING ACTIVITY DESCRIPTION                     AMOUNT ($)
DATE        DATE
NOV 18      NOV 20   AMAZON.CA AMAZON.CA ON                       $45.67
DEC 01      DEC 02   PAYMENT - THANK YOU / PAIEMENT - MERCI     -$500.00
JAN 02      JAN 03   UBER TRIP TORONTO                            $18.20
NEW BALANCE                                                    $563.87
"#;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn write_doc(dir: &Path, name: &str, pages: &[&str]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, pages.join("\u{0c}")).unwrap();
    path
}

/// Two pages: opening balance, one dated row, two carried rows, closing balance.
#[test]
fn test_two_page_chequing_statement() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_doc(dir.path(), "chequing-2023-09.txt", &[CHEQUING_PAGE_ONE, CHEQUING_PAGE_TWO]);

    let out = process_document(&path, &KeywordRules::default(), None).unwrap();
    assert_eq!(out.kind, StatementKind::Chequing);
    assert!(out.warnings.is_empty());

    let rows = &out.canonical;
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.date == d(2023, 9, 20)));
    assert!(rows.iter().all(|r| r.file == "chequing-2023-09.txt"));
    assert_eq!(
        rows.iter().map(|r| r.amount).collect::<Vec<_>>(),
        vec![-2000.0, -374.0, 1500.0]
    );
    assert_eq!(out.raw.as_ref().map(Vec::len), Some(3));
}

#[test]
fn test_credit_card_statement_signs() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_doc(dir.path(), "visa-2023-12.txt", &[VISA_STATEMENT]);

    let out = process_document(&path, &KeywordRules::default(), None).unwrap();
    assert_eq!(out.kind, StatementKind::CreditCard);

    let rows = &out.canonical;
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].amount, -45.67);
    assert_eq!(rows[1].amount, 500.0);
    assert_eq!(rows[2].date, d(2024, 1, 2));
    assert_eq!(rows[1].description, "PAYMENT - THANK YOU / PAIEMENT - MERCI");
}

#[test]
fn test_extracted_csv_reprocesses_to_same_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_doc(dir.path(), "visa-2023-12.txt", &[VISA_STATEMENT]);
    let rules = KeywordRules::default();
    let first = process_document(&path, &rules, None).unwrap();

    let extracted = artifact_path(&default_output(&path), "extracted");
    let file = fs::File::create(&extracted).unwrap();
    write_raw(file, first.kind, first.raw.as_deref().unwrap(), true).unwrap();

    let second = process_document(&extracted, &rules, None).unwrap();
    assert!(second.raw.is_none());
    assert_eq!(second.canonical.len(), first.canonical.len());
    for (a, b) in first.canonical.iter().zip(&second.canonical) {
        assert_eq!(a.date, b.date);
        assert_eq!(a.amount, b.amount);
        assert_eq!(a.description, b.description);
    }
    assert_eq!(second.canonical[0].file, "visa-2023-12.pdf");
}

#[test]
fn test_normalized_output_is_not_normalized_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_doc(dir.path(), "chq.txt", &[CHEQUING_PAGE_ONE, CHEQUING_PAGE_TWO]);
    let out = process_document(&path, &KeywordRules::default(), None).unwrap();

    let ledger = dir.path().join("chq.csv");
    write_canonical(fs::File::create(&ledger).unwrap(), &out.canonical, None, true).unwrap();

    let table = read_table(&ledger).unwrap();
    assert!(matches!(table, Table::Canonical(ref rows) if rows.len() == 3));
    assert!(matches!(
        normalize_table(table, &ledger),
        Err(FinanceError::AlreadyNormalized)
    ));

    let renamed = dir.path().join("chq.extracted.csv");
    fs::rename(&ledger, &renamed).unwrap();
    assert!(matches!(
        process_document(&renamed, &KeywordRules::default(), None),
        Err(FinanceError::AlreadyNormalized)
    ));
}

#[test]
fn test_categorized_ledger() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_doc(dir.path(), "chq.txt", &[CHEQUING_PAGE_ONE, CHEQUING_PAGE_TWO]);
    let out = process_document(&path, &KeywordRules::default(), None).unwrap();

    let categories = Categorizer::from_reader(
        "Description,Amount,Category\n\
         Payroll deposit,1500.00,Income\n\
         Online transfer,-2000.00,Transfers\n"
            .as_bytes(),
    )
    .unwrap();

    let mut buf = Vec::new();
    write_canonical(&mut buf, &out.canonical, Some(&categories), true).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Date,File,Description,Amount,Category");
    assert_eq!(lines[1], "2023-09-20,chq.txt,Online transfer,-2000.00,Transfers");
    assert_eq!(lines[2], "2023-09-20,chq.txt,Misc Payment,-374.00,");
    assert_eq!(lines[3], "2023-09-20,chq.txt,Payroll deposit,1500.00,Income");
}

#[test]
fn test_batch_continues_after_failure() {
    let dir = tempfile::tempdir().unwrap();
    let good = write_doc(dir.path(), "visa.txt", &[VISA_STATEMENT]);
    let bad = write_doc(dir.path(), "notes.txt", &["grocery list\nmilk\neggs"]);
    let missing = dir.path().join("missing.txt");

    let outcomes = process_batch(&[bad, good, missing], &KeywordRules::default(), None);
    assert_eq!(outcomes.len(), 3);
    assert!(matches!(
        outcomes[0].result,
        Err(FinanceError::Ingest(IngestError::DetectionFailed))
    ));
    assert!(matches!(&outcomes[1].result, Ok(out) if out.canonical.len() == 3));
    assert!(matches!(
        outcomes[2].result,
        Err(FinanceError::Ingest(IngestError::Io(_)))
    ));
}

#[test]
fn test_statement_without_period_needs_year() {
    let dir = tempfile::tempdir().unwrap();
    let text = "RBC Visa Platinum\nNOV 18   NOV 20   AMAZON.CA   $45.67\n";
    let path = write_doc(dir.path(), "visa.txt", &[text]);
    let rules = KeywordRules::default();

    assert!(matches!(
        process_document(&path, &rules, None),
        Err(FinanceError::Ingest(IngestError::DateResolutionFailed { .. }))
    ));
    let out = process_document(&path, &rules, Some(2022)).unwrap();
    assert_eq!(out.canonical[0].date, d(2022, 11, 18));
}
