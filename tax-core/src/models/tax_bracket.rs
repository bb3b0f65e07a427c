use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One slab of a progressive schedule.
///
/// Income in `(min_income, max_income]` is taxed at
/// `base_tax + (income - min_income) * tax_rate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub min_income: Decimal,
    pub max_income: Option<Decimal>,
    pub tax_rate: Decimal,
    pub base_tax: Decimal,
}

impl TaxBracket {
    pub fn contains(
        &self,
        income: Decimal,
    ) -> bool {
        income > self.min_income && self.max_income.is_none_or(|max| income <= max)
    }
}
