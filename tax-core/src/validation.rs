//! Advisory shape checks on a [`FilingRecord`].
//!
//! Nothing here blocks a calculation. Range checks on individual form fields
//! belong to the form layer; these checks catch records that were stored or
//! imported in a shape the form would not have produced.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{Category, FilingRecord, LineItem, Section};

static CNIC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{5}-\d{7}-\d|\d{13})$").expect("CNIC pattern is a valid regex")
});

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationIssue {
    #[error("{section} '{category}' has a negative amount ({amount})")]
    NegativeAmount {
        section: Section,
        category: &'static str,
        amount: Decimal,
    },

    #[error("{section} '{category}' appears more than once")]
    DuplicateCategory {
        section: Section,
        category: &'static str,
    },

    #[error("declared paid tax is negative ({0})")]
    NegativePaidTax(Decimal),

    #[error("CNIC '{0}' is not in the form 12345-1234567-1")]
    InvalidCnic(String),
}

/// Whether `cnic` has the shape of a CNIC number: 13 digits, optionally
/// grouped 5-7-1 with dashes. No checksum or registry lookup is done.
///
/// ```
/// use tax_core::validation::is_valid_cnic;
///
/// assert!(is_valid_cnic("35202-1234567-1"));
/// assert!(is_valid_cnic("3520212345671"));
/// assert!(!is_valid_cnic("35202-123456-1"));
/// ```
pub fn is_valid_cnic(cnic: &str) -> bool {
    CNIC_PATTERN.is_match(cnic.trim())
}

fn check_section<C: Category>(
    items: &[LineItem<C>],
    issues: &mut Vec<ValidationIssue>,
) {
    let mut seen = HashSet::new();

    for item in items {
        let category = item.category.as_str();

        if item.amount < Decimal::ZERO {
            issues.push(ValidationIssue::NegativeAmount {
                section: C::SECTION,
                category,
                amount: item.amount,
            });
        }
        if !seen.insert(category) {
            issues.push(ValidationIssue::DuplicateCategory {
                section: C::SECTION,
                category,
            });
        }
    }
}

impl FilingRecord {
    /// Collects every shape problem in the record.
    ///
    /// An empty CNIC is treated as not yet entered and is not reported.
    pub fn validate(&self) -> Result<(), Vec<ValidationIssue>> {
        let mut issues = Vec::new();

        check_section(&self.income, &mut issues);
        check_section(&self.deductions, &mut issues);
        check_section(&self.expenses, &mut issues);
        check_section(&self.assets, &mut issues);
        check_section(&self.withholding, &mut issues);

        if let Some(paid) = self.paid_tax.filter(|p| *p < Decimal::ZERO) {
            issues.push(ValidationIssue::NegativePaidTax(paid));
        }

        if let Some(taxpayer) = &self.taxpayer {
            let cnic = taxpayer.cnic.trim();
            if !cnic.is_empty() && !is_valid_cnic(cnic) {
                issues.push(ValidationIssue::InvalidCnic(taxpayer.cnic.clone()));
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }
}
