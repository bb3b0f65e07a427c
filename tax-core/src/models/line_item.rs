use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One toggle-gated amount on the form.
///
/// The amount of an inactive item is kept for draft recovery but never
/// contributes to any total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem<C> {
    pub category: C,
    pub active: bool,
    pub amount: Decimal,
}

impl<C> LineItem<C> {
    pub fn active(
        category: C,
        amount: Decimal,
    ) -> Self {
        Self {
            category,
            active: true,
            amount,
        }
    }

    pub fn inactive(
        category: C,
        amount: Decimal,
    ) -> Self {
        Self {
            category,
            active: false,
            amount,
        }
    }
}
