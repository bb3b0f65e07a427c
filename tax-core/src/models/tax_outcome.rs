use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Result of a liability calculation. Every field is non-negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxOutcome {
    pub taxable_income: Decimal,
    /// Bracket tax before special credits.
    pub tax_before_credits: Decimal,
    pub calculated_tax: Decimal,
    pub paid_tax: Decimal,
    pub balance_due: Decimal,
    pub refund_due: Decimal,
}

impl TaxOutcome {
    /// The neutral result returned when a calculation cannot complete.
    pub fn zeroed(paid_tax: Decimal) -> Self {
        let paid_tax = paid_tax.max(Decimal::ZERO);
        Self {
            taxable_income: Decimal::ZERO,
            tax_before_credits: Decimal::ZERO,
            calculated_tax: Decimal::ZERO,
            paid_tax,
            balance_due: Decimal::ZERO,
            refund_due: Decimal::ZERO,
        }
    }
}
