//! Integration tests that run the adapters against the fixtures in
//! `test-data/`: form JSON in, bracket CSV and TOML config alongside.

use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use tax_core::calculations::{BracketTable, LiabilityCalculator};
use tax_core::summary::FilingSummary;
use tax_core::{IncomeCategory, Section};
use tax_data::{AppConfig, BracketLoader, FormData, run_batch};

const BRACKETS_CSV: &str = include_str!("../test-data/pk_brackets.csv");
const FILING_SINGLE: &str = include_str!("../test-data/filing_single.json");
const FILINGS: &str = include_str!("../test-data/filings.json");

fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("test-data")
        .join(name)
}

// ─── brackets ────────────────────────────────────────────────────────────────

#[test]
fn test_csv_tables_match_builtin_tables() {
    let records = BracketLoader::parse(BRACKETS_CSV.as_bytes()).expect("fixture parses");
    let tables = BracketLoader::build(&records).expect("fixture tables are valid");

    assert_eq!(records.len(), 13);
    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0].brackets(), BracketTable::standard().brackets());
    assert_eq!(tables[1].brackets(), BracketTable::extended().brackets());
}

// ─── single filing ───────────────────────────────────────────────────────────

#[test]
fn test_single_filing_end_to_end() {
    let form = FormData::from_json_str(FILING_SINGLE).expect("fixture parses");
    let record = form.to_record();

    let assessment = LiabilityCalculator::default().assess(&record);

    // business income is toggled off and ignored
    assert_eq!(assessment.totals.total_income, dec!(3800000));
    assert_eq!(assessment.totals.total_deductions, dec!(150000));
    assert_eq!(assessment.totals.total_withholding, dec!(250000));
    // 330000 + 50000 * 20% = 340000, then IT sector * 0.85
    assert_eq!(assessment.outcome.tax_before_credits, dec!(340000));
    assert_eq!(assessment.outcome.calculated_tax, dec!(289000));
    assert_eq!(assessment.outcome.paid_tax, dec!(250000));
    assert_eq!(assessment.outcome.balance_due, dec!(39000));
    assert_eq!(assessment.outcome.refund_due, dec!(0));
}

#[test]
fn test_single_filing_record_is_clean() {
    let record = FormData::from_json_str(FILING_SINGLE)
        .expect("fixture parses")
        .to_record();

    assert_eq!(record.validate(), Ok(()));
}

#[test]
fn test_summary_uses_configured_line_codes() {
    let config = AppConfig::load(&fixture_path("pk-tax.toml")).expect("config fixture loads");
    let calculator = config.calculator(None).expect("standard table");
    let record = FormData::from_json_str(FILING_SINGLE)
        .expect("fixture parses")
        .to_record();

    let summary = FilingSummary::build(&record, &calculator, &config.line_codes);

    assert_eq!(summary.taxpayer_name.as_deref(), Some("Ayesha Khan"));
    let sections: Vec<Section> = summary.sections.iter().map(|s| s.section).collect();
    assert_eq!(
        sections,
        vec![
            Section::Income,
            Section::Deduction,
            Section::Withholding,
            Section::Expense,
            Section::Asset,
        ]
    );
    let income_codes: Vec<Option<&str>> = summary.sections[0]
        .lines
        .iter()
        .map(|l| l.code.as_deref())
        .collect();
    assert_eq!(income_codes, vec![Some("1000"), Some("2000")]);
    assert_eq!(summary.sections[3].subtotal, dec!(576000));
    assert_eq!(summary.assessment, calculator.assess(&record));
    assert_eq!(
        config.line_codes.code_for(IncomeCategory::Business),
        None
    );
}

// ─── batch ───────────────────────────────────────────────────────────────────

#[test]
fn test_batch_keeps_going_past_bad_record() {
    let forms = FormData::parse_many(FILINGS).expect("fixture is valid JSON");

    let entries = run_batch(forms, &LiabilityCalculator::default());

    assert_eq!(entries.len(), 3);

    assert_eq!(entries[0].taxpayer.as_deref(), Some("Bilal Ahmed"));
    assert_eq!(entries[0].assessment.outcome.calculated_tax, dec!(30000));
    assert_eq!(entries[0].assessment.outcome.balance_due, dec!(20000));

    assert!(entries[1].error.is_some());
    assert_eq!(entries[1].assessment.outcome.calculated_tax, dec!(0));

    // 810000 + 7000000 * 25% = 2560000, less 50000 first-time filer
    assert_eq!(entries[2].assessment.outcome.calculated_tax, dec!(2510000));
    assert_eq!(entries[2].assessment.outcome.refund_due, dec!(90000));
}

#[test]
fn test_batch_with_extended_table_from_csv() {
    let table = BracketLoader::load_table(BRACKETS_CSV.as_bytes(), Some("extended"))
        .expect("extended table in fixture");
    let calculator = AppConfig::default()
        .calculator(Some(table))
        .expect("valid config");
    let forms = FormData::parse_many(FILINGS).expect("fixture is valid JSON");

    let entries = run_batch(forms, &calculator);

    // Below 6M both tables agree.
    assert_eq!(entries[0].assessment.outcome.calculated_tax, dec!(30000));
    // 2310000 + 1000000 * 32% = 2630000, less 50000
    assert_eq!(entries[2].assessment.outcome.calculated_tax, dec!(2580000));
    assert_eq!(entries[2].assessment.outcome.refund_due, dec!(20000));
}

#[test]
fn test_batch_results_serialize_as_camel_case() {
    let forms = FormData::parse_many(FILINGS).expect("fixture is valid JSON");
    let entries = run_batch(forms, &LiabilityCalculator::default());

    let json = serde_json::to_value(&entries[0]).expect("entries serialize");

    assert_eq!(json["taxpayer"], "Bilal Ahmed");
    assert!(json["assessment"]["outcome"].get("balanceDue").is_some());
    assert!(json["assessment"]["totals"].get("taxableIncome").is_some());
    assert!(json["error"].is_null());
}
