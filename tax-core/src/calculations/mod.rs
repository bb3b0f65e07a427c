//! Aggregation and liability calculation.
//!
//! The [`Aggregator`] turns a record's line items into totals and the
//! [`LiabilityCalculator`] turns totals into a [`TaxOutcome`](crate::TaxOutcome).

pub mod aggregator;
pub mod brackets;
pub mod common;
pub mod liability;

pub use aggregator::{Aggregator, AmountPolicy, FilingTotals, taxable_income};
pub use brackets::{BracketTable, BracketTableError};
pub use liability::{
    Assessment, CreditPolicy, CreditPolicyError, LiabilityCalculator, LiabilityError, settle,
};
