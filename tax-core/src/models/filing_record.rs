use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    AssetCategory, DeductionCategory, ExpenseCategory, IncomeCategory, LineItem, SpecialCredits,
    Taxpayer, WithholdingCategory,
};

/// Everything the form collects for one return.
///
/// The calculation code only ever borrows a record; it never mutates the
/// caller's form state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilingRecord {
    pub tax_year: Option<i32>,
    pub taxpayer: Option<Taxpayer>,
    pub income: Vec<LineItem<IncomeCategory>>,
    pub deductions: Vec<LineItem<DeductionCategory>>,
    pub expenses: Vec<LineItem<ExpenseCategory>>,
    pub assets: Vec<LineItem<AssetCategory>>,
    pub withholding: Vec<LineItem<WithholdingCategory>>,
    /// Tax already paid, as declared on the form. When absent the sum of
    /// active withholding items is used instead.
    pub paid_tax: Option<Decimal>,
    pub credits: SpecialCredits,
}

impl FilingRecord {
    pub fn with_income(
        mut self,
        category: IncomeCategory,
        amount: Decimal,
    ) -> Self {
        self.income.push(LineItem::active(category, amount));
        self
    }

    pub fn with_deduction(
        mut self,
        category: DeductionCategory,
        amount: Decimal,
    ) -> Self {
        self.deductions.push(LineItem::active(category, amount));
        self
    }

    pub fn with_expense(
        mut self,
        category: ExpenseCategory,
        amount: Decimal,
    ) -> Self {
        self.expenses.push(LineItem::active(category, amount));
        self
    }

    pub fn with_asset(
        mut self,
        category: AssetCategory,
        amount: Decimal,
    ) -> Self {
        self.assets.push(LineItem::active(category, amount));
        self
    }

    pub fn with_withholding(
        mut self,
        category: WithholdingCategory,
        amount: Decimal,
    ) -> Self {
        self.withholding.push(LineItem::active(category, amount));
        self
    }

    pub fn with_paid_tax(
        mut self,
        paid_tax: Decimal,
    ) -> Self {
        self.paid_tax = Some(paid_tax);
        self
    }

    pub fn with_credits(
        mut self,
        credits: SpecialCredits,
    ) -> Self {
        self.credits = credits;
        self
    }
}
