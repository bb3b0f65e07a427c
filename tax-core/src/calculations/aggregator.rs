//! Collapses the toggle-gated line items of a [`FilingRecord`] into totals.
//!
//! Only active items count. An inactive item contributes nothing no matter
//! what amount is stored against it, and a category that is missing from the
//! record simply contributes zero. Expenses and assets are never read here.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use tax_core::calculations::Aggregator;
//! use tax_core::{DeductionCategory, FilingRecord, IncomeCategory, LineItem};
//!
//! let mut record = FilingRecord::default()
//!     .with_income(IncomeCategory::Salary, dec!(1500000))
//!     .with_deduction(DeductionCategory::Zakat, dec!(25000));
//! record.income.push(LineItem::inactive(IncomeCategory::Rental, dec!(999999)));
//!
//! let totals = Aggregator::default().totals(&record);
//!
//! assert_eq!(totals.total_income, dec!(1500000));
//! assert_eq!(totals.taxable_income, dec!(1475000));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::calculations::common::{checked_sum, non_negative, saturating_sum};
use crate::{
    Category, DeductionCategory, FilingRecord, IncomeCategory, LineItem, WithholdingCategory,
};

/// How the aggregator treats a negative amount on an active item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AmountPolicy {
    /// Negative amounts contribute zero.
    #[default]
    ClampNegative,
    /// Amounts are summed exactly as stored.
    PassThrough,
}

/// The four scalar totals derived from a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingTotals {
    pub total_income: Decimal,
    pub total_deductions: Decimal,
    pub total_withholding: Decimal,
    pub taxable_income: Decimal,
}

/// Total income less deductions, never below zero.
///
/// The difference can only leave the range of [`Decimal`] when the operands
/// have opposite signs. A positive overflow saturates at [`Decimal::MAX`]; a
/// negative one floors at zero like any other negative difference.
pub fn taxable_income(
    total_income: Decimal,
    total_deductions: Decimal,
) -> Decimal {
    match total_income.checked_sub(total_deductions) {
        Some(diff) => non_negative(diff),
        None if total_income > total_deductions => {
            warn!(
                total_income = %total_income,
                total_deductions = %total_deductions,
                "taxable income overflows; saturating"
            );
            Decimal::MAX
        }
        None => Decimal::ZERO,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Aggregator {
    policy: AmountPolicy,
}

impl Aggregator {
    pub fn new(policy: AmountPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> AmountPolicy {
        self.policy
    }

    pub fn total_income(
        &self,
        items: &[LineItem<IncomeCategory>],
    ) -> Decimal {
        self.total(items)
    }

    pub fn total_deductions(
        &self,
        items: &[LineItem<DeductionCategory>],
    ) -> Decimal {
        self.total(items)
    }

    pub fn total_withholding(
        &self,
        items: &[LineItem<WithholdingCategory>],
    ) -> Decimal {
        self.total(items)
    }

    /// Sums the active items of any section.
    ///
    /// Never fails: on overflow the total saturates at [`Decimal::MAX`] or,
    /// for passed-through negative amounts, at [`Decimal::MIN`].
    pub fn total<C: Category>(
        &self,
        items: &[LineItem<C>],
    ) -> Decimal {
        let contributions: Vec<Decimal> =
            items.iter().map(|item| self.contribution(item)).collect();

        checked_sum(contributions.iter().copied()).unwrap_or_else(|| {
            let section = C::SECTION;
            warn!(
                section = %section,
                items = items.len(),
                "section total overflows; saturating"
            );
            saturating_sum(contributions)
        })
    }

    /// Income, deductions and withholding of `record`, plus taxable income.
    ///
    /// The section totals are reported as summed. Taxable income is taken from
    /// the totals floored at zero, the same inputs the liability calculator
    /// works from, so a negative deduction total never raises it.
    pub fn totals(
        &self,
        record: &FilingRecord,
    ) -> FilingTotals {
        let total_income = self.total_income(&record.income);
        let total_deductions = self.total_deductions(&record.deductions);

        FilingTotals {
            total_income,
            total_deductions,
            total_withholding: self.total_withholding(&record.withholding),
            taxable_income: taxable_income(
                non_negative(total_income),
                non_negative(total_deductions),
            ),
        }
    }

    fn contribution<C: Category>(
        &self,
        item: &LineItem<C>,
    ) -> Decimal {
        if !item.active {
            return Decimal::ZERO;
        }

        match self.policy {
            AmountPolicy::ClampNegative if item.amount < Decimal::ZERO => {
                warn!(
                    category = %item.category.line_key(),
                    amount = %item.amount,
                    "negative amount ignored"
                );
                Decimal::ZERO
            }
            _ => item.amount,
        }
    }
}
