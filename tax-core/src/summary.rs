//! Printable summary of a filing, keyed to the authority's line codes.
//!
//! The summary re-derives its totals through [`LiabilityCalculator::assess`]
//! so the printed liability always matches the on-screen one.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::common::saturating_sum;
use crate::calculations::{Assessment, LiabilityCalculator};
use crate::{Category, FilingRecord, LineItem, Section};

/// Maps `"<section>.<category>"` keys (e.g. `income.salary`) to the codes
/// printed beside each line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineCodes(BTreeMap<String, String>);

impl LineCodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        key: impl Into<String>,
        code: impl Into<String>,
    ) {
        self.0.insert(key.into(), code.into());
    }

    pub fn code_for<C: Category>(
        &self,
        category: C,
    ) -> Option<&str> {
        self.0.get(&category.line_key()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for LineCodes {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryLine {
    pub code: Option<String>,
    pub label: &'static str,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarySection {
    pub section: Section,
    pub lines: Vec<SummaryLine>,
    /// Sum of the listed lines as entered, before any clamping.
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingSummary {
    pub taxpayer_name: Option<String>,
    pub cnic: Option<String>,
    pub tax_year: Option<i32>,
    pub sections: Vec<SummarySection>,
    pub assessment: Assessment,
}

fn section_of<C: Category>(
    items: &[LineItem<C>],
    codes: &LineCodes,
) -> SummarySection {
    let lines: Vec<SummaryLine> = items
        .iter()
        .filter(|item| item.active)
        .map(|item| SummaryLine {
            code: codes.code_for(item.category).map(str::to_string),
            label: item.category.label(),
            amount: item.amount,
        })
        .collect();
    let subtotal = saturating_sum(lines.iter().map(|l| l.amount));

    SummarySection {
        section: C::SECTION,
        lines,
        subtotal,
    }
}

impl FilingSummary {
    /// Lists the active lines of every section, then attaches the assessment.
    ///
    /// Sections with no active lines are left out.
    pub fn build(
        record: &FilingRecord,
        calculator: &LiabilityCalculator,
        codes: &LineCodes,
    ) -> Self {
        let sections = [
            section_of(&record.income, codes),
            section_of(&record.deductions, codes),
            section_of(&record.withholding, codes),
            section_of(&record.expenses, codes),
            section_of(&record.assets, codes),
        ]
        .into_iter()
        .filter(|s| !s.lines.is_empty())
        .collect();

        Self {
            taxpayer_name: record.taxpayer.as_ref().map(|t| t.name.clone()),
            cnic: record.taxpayer.as_ref().map(|t| t.cnic.clone()),
            tax_year: record.tax_year,
            sections,
            assessment: calculator.assess(record),
        }
    }
}

fn opt_display(value: Option<&str>) -> &str {
    value.unwrap_or("—")
}

impl fmt::Display for FilingSummary {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        writeln!(f, "Taxpayer:  {}", opt_display(self.taxpayer_name.as_deref()))?;
        writeln!(f, "CNIC:      {}", opt_display(self.cnic.as_deref()))?;
        match self.tax_year {
            Some(year) => writeln!(f, "Tax year:  {year}")?,
            None => writeln!(f, "Tax year:  —")?,
        }

        for section in &self.sections {
            writeln!(f)?;
            writeln!(f, "{}", section.section.title())?;
            for line in &section.lines {
                writeln!(
                    f,
                    "  {:<8} {:<32} {:>16}",
                    opt_display(line.code.as_deref()),
                    line.label,
                    line.amount
                )?;
            }
            writeln!(f, "  {:<8} {:<32} {:>16}", "", "Subtotal", section.subtotal)?;
        }

        let totals = &self.assessment.totals;
        let outcome = &self.assessment.outcome;
        writeln!(f)?;
        writeln!(f, "Total income:        {:>16}", totals.total_income)?;
        writeln!(f, "Total deductions:    {:>16}", totals.total_deductions)?;
        writeln!(f, "Taxable income:      {:>16}", totals.taxable_income)?;
        writeln!(f, "Tax before credits:  {:>16}", outcome.tax_before_credits)?;
        writeln!(f, "Tax liability:       {:>16}", outcome.calculated_tax)?;
        writeln!(f, "Tax paid:            {:>16}", outcome.paid_tax)?;
        writeln!(f, "Balance due:         {:>16}", outcome.balance_due)?;
        writeln!(f, "Refund due:          {:>16}", outcome.refund_due)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{
        AssetCategory, DeductionCategory, ExpenseCategory, IncomeCategory, Taxpayer,
        WithholdingCategory,
    };

    fn codes() -> LineCodes {
        let mut codes = LineCodes::new();
        codes.insert("income.salary", "1000");
        codes.insert("deduction.zakat", "9001");
        codes
    }

    fn record() -> FilingRecord {
        let mut record = FilingRecord {
            tax_year: Some(2025),
            taxpayer: Some(Taxpayer {
                name: "Bilal Ahmed".to_string(),
                cnic: "35202-1234567-1".to_string(),
            }),
            ..FilingRecord::default()
        }
        .with_income(IncomeCategory::Salary, dec!(1500000))
        .with_deduction(DeductionCategory::Zakat, dec!(300000))
        .with_withholding(WithholdingCategory::Salary, dec!(20000))
        .with_expense(ExpenseCategory::Rent, dec!(240000))
        .with_asset(AssetCategory::Vehicles, dec!(3500000));
        record
            .income
            .push(LineItem::inactive(IncomeCategory::Rental, dec!(400000)));
        record
    }

    #[test]
    fn build_lists_active_lines_with_codes() {
        let summary = FilingSummary::build(&record(), &LiabilityCalculator::default(), &codes());

        let income = &summary.sections[0];
        assert_eq!(income.section, Section::Income);
        assert_eq!(
            income.lines,
            vec![SummaryLine {
                code: Some("1000".to_string()),
                label: "Salary",
                amount: dec!(1500000),
            }]
        );
        assert_eq!(income.subtotal, dec!(1500000));
    }

    #[test]
    fn build_keeps_expenses_and_assets_for_display_only() {
        let summary = FilingSummary::build(&record(), &LiabilityCalculator::default(), &codes());

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
        assert_eq!(summary.assessment.totals.total_income, dec!(1500000));
    }

    #[test]
    fn build_matches_assess() {
        let calculator = LiabilityCalculator::default();
        let record = record();

        let summary = FilingSummary::build(&record, &calculator, &codes());

        assert_eq!(summary.assessment, calculator.assess(&record));
        // 1200000 taxable -> 30000; paid 20000 from withholding
        assert_eq!(summary.assessment.outcome.balance_due, dec!(10000));
    }

    #[test]
    fn build_omits_empty_sections() {
        let record = FilingRecord::default().with_income(IncomeCategory::Foreign, dec!(10));

        let summary =
            FilingSummary::build(&record, &LiabilityCalculator::default(), &LineCodes::new());

        assert_eq!(summary.sections.len(), 1);
        assert_eq!(summary.sections[0].lines[0].code, None);
        assert_eq!(summary.taxpayer_name, None);
    }

    #[test]
    fn display_renders_codes_and_totals() {
        let summary = FilingSummary::build(&record(), &LiabilityCalculator::default(), &codes());

        let text = summary.to_string();

        assert!(text.contains("Taxpayer:  Bilal Ahmed"));
        assert!(text.contains("1000"));
        assert!(text.contains("Salary"));
        assert!(text.contains("Motor vehicles"));
        assert!(!text.contains("Rental income"));
        assert!(text.contains("Tax liability:"));
        assert!(text.contains("30000"));
    }

    #[test]
    fn subtotal_saturates_in_the_direction_of_the_sum() {
        let record = FilingRecord::default()
            .with_asset(AssetCategory::Property, Decimal::MIN)
            .with_asset(AssetCategory::Cash, dec!(-1))
            .with_expense(ExpenseCategory::Rent, Decimal::MAX)
            .with_expense(ExpenseCategory::Travel, dec!(1));

        let summary =
            FilingSummary::build(&record, &LiabilityCalculator::default(), &LineCodes::new());

        let subtotals: Vec<(Section, Decimal)> = summary
            .sections
            .iter()
            .map(|s| (s.section, s.subtotal))
            .collect();
        assert_eq!(
            subtotals,
            vec![
                (Section::Expense, Decimal::MAX),
                (Section::Asset, Decimal::MIN),
            ]
        );
    }

    #[test]
    fn line_codes_collect_from_pairs() {
        let codes: LineCodes = vec![("asset.cash".to_string(), "7010".to_string())]
            .into_iter()
            .collect();

        assert_eq!(codes.code_for(AssetCategory::Cash), Some("7010"));
        assert_eq!(codes.code_for(AssetCategory::Other), None);
        assert_eq!(codes.len(), 1);
    }
}
