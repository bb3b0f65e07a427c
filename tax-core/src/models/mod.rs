mod category;
mod filing_record;
mod line_item;
mod special_credits;
mod tax_bracket;
mod tax_outcome;
mod taxpayer;

pub use category::{
    AssetCategory, Category, DeductionCategory, ExpenseCategory, IncomeCategory, Section,
    WithholdingCategory,
};
pub use filing_record::FilingRecord;
pub use line_item::LineItem;
pub use special_credits::SpecialCredits;
pub use tax_bracket::TaxBracket;
pub use tax_outcome::TaxOutcome;
pub use taxpayer::Taxpayer;
