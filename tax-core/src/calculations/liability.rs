//! Liability calculation: bracket tax, special credits and settlement.
//!
//! # Steps
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | Taxable income = max(0, total income - total deductions) |
//! | 2    | Bracket tax from the progressive schedule |
//! | 3a   | First-time filer: subtract the flat reduction, floor at 0 |
//! | 3b   | IT sector: multiply the result of 3a by the sector factor |
//! | 4    | Balance due = max(0, tax - paid); refund due = max(0, paid - tax) |
//!
//! Step 3a always runs before 3b. The export-industry flag is accepted but
//! has no effect on the amount.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use tax_core::SpecialCredits;
//! use tax_core::calculations::LiabilityCalculator;
//!
//! let calculator = LiabilityCalculator::default();
//! let credits = SpecialCredits {
//!     first_time_filer: true,
//!     it_sector: true,
//!     ..SpecialCredits::none()
//! };
//!
//! let outcome = calculator.calculate(dec!(2400000), dec!(0), dec!(90000), credits);
//!
//! assert_eq!(outcome.tax_before_credits, dec!(150000));
//! assert_eq!(outcome.calculated_tax, dec!(85000));
//! assert_eq!(outcome.refund_due, dec!(5000));
//! ```

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::calculations::aggregator::{Aggregator, FilingTotals, taxable_income};
use crate::calculations::brackets::{BracketTable, BracketTableError};
use crate::calculations::common::{non_negative, round_half_up};
use crate::observer::{CalculationObserver, NoopObserver};
use crate::{FilingRecord, SpecialCredits, TaxOutcome};

/// Failures inside the calculation boundary.
///
/// These never reach callers of [`LiabilityCalculator::calculate`]; they are
/// logged and replaced by a zeroed outcome.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LiabilityError {
    #[error(transparent)]
    Brackets(#[from] BracketTableError),

    #[error("credit adjustment overflows for tax {0}")]
    CreditOverflow(Decimal),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CreditPolicyError {
    #[error("first-time filer reduction must be non-negative, got {0}")]
    NegativeReduction(Decimal),

    #[error("IT sector factor must be between 0 and 1, got {0}")]
    InvalidSectorFactor(Decimal),
}

/// The amounts behind each special credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditPolicy {
    /// Flat amount taken off a first-time filer's tax.
    pub first_time_filer_reduction: Decimal,

    /// Multiplier applied to an IT-sector taxpayer's tax (0.85 = 15% off).
    pub it_sector_factor: Decimal,
}

impl Default for CreditPolicy {
    fn default() -> Self {
        Self {
            first_time_filer_reduction: dec!(50000),
            it_sector_factor: dec!(0.85),
        }
    }
}

impl CreditPolicy {
    pub fn validate(&self) -> Result<(), CreditPolicyError> {
        if self.first_time_filer_reduction < Decimal::ZERO {
            return Err(CreditPolicyError::NegativeReduction(
                self.first_time_filer_reduction,
            ));
        }
        if self.it_sector_factor < Decimal::ZERO || self.it_sector_factor > Decimal::ONE {
            return Err(CreditPolicyError::InvalidSectorFactor(
                self.it_sector_factor,
            ));
        }
        Ok(())
    }
}

/// Totals and outcome for one record, derived together so every consumer
/// sees the same numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub totals: FilingTotals,
    pub outcome: TaxOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct LiabilityCalculator {
    table: BracketTable,
    credits: CreditPolicy,
    aggregator: Aggregator,
}

impl LiabilityCalculator {
    pub fn new(table: BracketTable) -> Self {
        Self {
            table,
            ..Self::default()
        }
    }

    pub fn with_credit_policy(
        mut self,
        credits: CreditPolicy,
    ) -> Self {
        self.credits = credits;
        self
    }

    pub fn with_aggregator(
        mut self,
        aggregator: Aggregator,
    ) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn table(&self) -> &BracketTable {
        &self.table
    }

    pub fn credit_policy(&self) -> &CreditPolicy {
        &self.credits
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Computes the outcome. Never fails.
    ///
    /// Negative inputs are treated as zero. If the calculation cannot
    /// complete, a warning is logged and a zeroed outcome echoing `paid_tax`
    /// is returned.
    pub fn calculate(
        &self,
        total_income: Decimal,
        total_deductions: Decimal,
        paid_tax: Decimal,
        credits: SpecialCredits,
    ) -> TaxOutcome {
        self.calculate_observed(
            total_income,
            total_deductions,
            paid_tax,
            credits,
            &NoopObserver,
        )
    }

    /// As [`calculate`](Self::calculate), reporting the result or the
    /// fallback to `observer`.
    pub fn calculate_observed(
        &self,
        total_income: Decimal,
        total_deductions: Decimal,
        paid_tax: Decimal,
        credits: SpecialCredits,
        observer: &dyn CalculationObserver,
    ) -> TaxOutcome {
        match self.try_calculate(total_income, total_deductions, paid_tax, credits) {
            Ok(outcome) => {
                observer.outcome(&outcome);
                outcome
            }
            Err(error) => {
                warn!(
                    %error,
                    total_income = %total_income,
                    total_deductions = %total_deductions,
                    "tax calculation failed; returning zeroed outcome"
                );
                observer.fallback(&error);
                TaxOutcome::zeroed(paid_tax)
            }
        }
    }

    /// The fallible calculation behind [`calculate`](Self::calculate).
    pub fn try_calculate(
        &self,
        total_income: Decimal,
        total_deductions: Decimal,
        paid_tax: Decimal,
        credits: SpecialCredits,
    ) -> Result<TaxOutcome, LiabilityError> {
        let total_income = self.clamp_input("total_income", total_income);
        let total_deductions = self.clamp_input("total_deductions", total_deductions);
        let paid_tax = self.clamp_input("paid_tax", paid_tax);

        let taxable_income = taxable_income(total_income, total_deductions);
        let tax_before_credits = self.table.tax_for(taxable_income)?;
        let calculated_tax = non_negative(self.apply_credits(tax_before_credits, credits)?);
        let (balance_due, refund_due) = settle(calculated_tax, paid_tax);

        debug!(
            table = self.table.name(),
            taxable_income = %taxable_income,
            tax_before_credits = %tax_before_credits,
            calculated_tax = %calculated_tax,
            "liability calculated"
        );

        Ok(TaxOutcome {
            taxable_income,
            tax_before_credits,
            calculated_tax,
            paid_tax,
            balance_due,
            refund_due,
        })
    }

    /// Aggregates `record` and calculates its outcome.
    ///
    /// Paid tax is the declared amount when the record has one, otherwise the
    /// total of its active withholding items.
    pub fn assess(
        &self,
        record: &FilingRecord,
    ) -> Assessment {
        self.assess_observed(record, &NoopObserver)
    }

    /// As [`assess`](Self::assess), also reporting validation issues in the
    /// record to `observer`. Issues never stop the calculation.
    pub fn assess_observed(
        &self,
        record: &FilingRecord,
        observer: &dyn CalculationObserver,
    ) -> Assessment {
        if let Err(issues) = record.validate() {
            for issue in &issues {
                debug!(%issue, "validation issue");
                observer.validation_issue(issue);
            }
        }

        let totals = self.aggregator.totals(record);
        let paid_tax = record.paid_tax.unwrap_or(totals.total_withholding);
        let outcome = self.calculate_observed(
            totals.total_income,
            totals.total_deductions,
            paid_tax,
            record.credits,
            observer,
        );

        Assessment { totals, outcome }
    }

    /// Applies the special credits in their fixed order.
    fn apply_credits(
        &self,
        tax: Decimal,
        credits: SpecialCredits,
    ) -> Result<Decimal, LiabilityError> {
        let mut adjusted = tax;

        if credits.first_time_filer {
            adjusted = adjusted
                .checked_sub(self.credits.first_time_filer_reduction)
                .map(non_negative)
                .ok_or(LiabilityError::CreditOverflow(adjusted))?;
        }

        if credits.it_sector {
            adjusted = adjusted
                .checked_mul(self.credits.it_sector_factor)
                .map(round_half_up)
                .ok_or(LiabilityError::CreditOverflow(adjusted))?;
        }

        if credits.export_industry {
            debug!("export industry credit has no numeric effect");
        }

        Ok(adjusted)
    }

    fn clamp_input(
        &self,
        name: &'static str,
        value: Decimal,
    ) -> Decimal {
        if value < Decimal::ZERO {
            warn!(input = name, value = %value, "negative input treated as zero");
        }
        non_negative(value)
    }
}

/// Splits the difference between tax and payments into (balance due, refund
/// due). At most one of the two is non-zero.
pub fn settle(
    calculated_tax: Decimal,
    paid_tax: Decimal,
) -> (Decimal, Decimal) {
    if calculated_tax >= paid_tax {
        (calculated_tax - paid_tax, Decimal::ZERO)
    } else {
        (Decimal::ZERO, paid_tax - calculated_tax)
    }
}
