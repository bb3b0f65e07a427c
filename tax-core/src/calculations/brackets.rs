//! Progressive bracket (slab) tables.
//!
//! Two schedules ship with the crate:
//!
//! | Taxable income up to | Base tax | Rate on excess | `standard` | `extended` |
//! |----------------------|----------|----------------|------------|------------|
//! | 600,000              | 0        | 0%             | yes        | yes        |
//! | 1,200,000            | 0        | 5%             | yes        | yes        |
//! | 2,400,000            | 30,000   | 10%            | yes        | yes        |
//! | 3,600,000            | 150,000  | 15%            | yes        | yes        |
//! | 6,000,000            | 330,000  | 20%            | yes        | yes        |
//! | above                | 810,000  | 25%            | yes        |            |
//! | 12,000,000           | 810,000  | 25%            |            | yes        |
//! | above                | 2,310,000| 32%            |            | yes        |
//!
//! `standard` is the schedule used for filings. `extended` is the one shown
//! by the standalone calculator screen; it disagrees above 12,000,000.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use tax_core::calculations::BracketTable;
//!
//! let table = BracketTable::standard();
//!
//! assert_eq!(table.tax_for(dec!(1200000)), Ok(dec!(30000)));
//! assert_eq!(table.tax_for(dec!(2400000)), Ok(dec!(150000)));
//! ```

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use thiserror::Error;

use crate::TaxBracket;
use crate::calculations::common::round_half_up;

/// Problems with a bracket table, reported when one is built from data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BracketTableError {
    #[error("bracket table has no brackets")]
    Empty,

    #[error("first bracket must start at 0, got {0}")]
    NonZeroStart(Decimal),

    #[error("bracket {index} starts at {found} but the previous bracket ends at {expected}")]
    Gap {
        index: usize,
        expected: Decimal,
        found: Decimal,
    },

    #[error("bracket {index} has upper bound {max} not above its lower bound {min}")]
    EmptyRange {
        index: usize,
        min: Decimal,
        max: Decimal,
    },

    #[error("only the last bracket may be open-ended (bracket {0} is not last)")]
    OpenBracketNotLast(usize),

    #[error("the last bracket must be open-ended")]
    ClosedTopBracket,

    #[error("bracket {index} has rate {rate} outside [0, 1]")]
    InvalidRate { index: usize, rate: Decimal },

    #[error("bracket {index} has negative base tax {base_tax}")]
    NegativeBaseTax { index: usize, base_tax: Decimal },

    #[error("bracket {index} has base tax {found} but the brackets below it add up to {expected}")]
    Discontinuous {
        index: usize,
        expected: Decimal,
        found: Decimal,
    },

    #[error("no bracket found for taxable income {0}")]
    NoMatchingBracket(Decimal),

    #[error("tax for taxable income {0} overflows")]
    Overflow(Decimal),

    #[error("unknown bracket table '{0}'")]
    UnknownTable(String),
}

/// An ordered, contiguous progressive schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BracketTable {
    name: String,
    brackets: Vec<TaxBracket>,
}

fn bracket(
    min_income: Decimal,
    max_income: Option<Decimal>,
    tax_rate: Decimal,
    base_tax: Decimal,
) -> TaxBracket {
    TaxBracket {
        min_income,
        max_income,
        tax_rate,
        base_tax,
    }
}

impl BracketTable {
    pub const STANDARD: &'static str = "standard";
    pub const EXTENDED: &'static str = "extended";

    /// Builds a table, checking that the brackets form one contiguous
    /// schedule from zero with an open top bracket, and that each base tax is
    /// the tax owed at the top of the bracket below it.
    pub fn new(
        name: impl Into<String>,
        brackets: Vec<TaxBracket>,
    ) -> Result<Self, BracketTableError> {
        Self::validate(&brackets)?;
        Ok(Self {
            name: name.into(),
            brackets,
        })
    }

    /// The six-slab schedule applied to filings.
    pub fn standard() -> Self {
        Self {
            name: Self::STANDARD.to_string(),
            brackets: vec![
                bracket(dec!(0), Some(dec!(600000)), dec!(0), dec!(0)),
                bracket(dec!(600000), Some(dec!(1200000)), dec!(0.05), dec!(0)),
                bracket(dec!(1200000), Some(dec!(2400000)), dec!(0.10), dec!(30000)),
                bracket(dec!(2400000), Some(dec!(3600000)), dec!(0.15), dec!(150000)),
                bracket(dec!(3600000), Some(dec!(6000000)), dec!(0.20), dec!(330000)),
                bracket(dec!(6000000), None, dec!(0.25), dec!(810000)),
            ],
        }
    }

    /// The seven-slab schedule shown by the standalone calculator.
    pub fn extended() -> Self {
        Self {
            name: Self::EXTENDED.to_string(),
            brackets: vec![
                bracket(dec!(0), Some(dec!(600000)), dec!(0), dec!(0)),
                bracket(dec!(600000), Some(dec!(1200000)), dec!(0.05), dec!(0)),
                bracket(dec!(1200000), Some(dec!(2400000)), dec!(0.10), dec!(30000)),
                bracket(dec!(2400000), Some(dec!(3600000)), dec!(0.15), dec!(150000)),
                bracket(dec!(3600000), Some(dec!(6000000)), dec!(0.20), dec!(330000)),
                bracket(dec!(6000000), Some(dec!(12000000)), dec!(0.25), dec!(810000)),
                bracket(dec!(12000000), None, dec!(0.32), dec!(2310000)),
            ],
        }
    }

    /// Looks up one of the built-in schedules by name.
    pub fn builtin(name: &str) -> Result<Self, BracketTableError> {
        match name {
            Self::STANDARD => Ok(Self::standard()),
            Self::EXTENDED => Ok(Self::extended()),
            other => Err(BracketTableError::UnknownTable(other.to_string())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn brackets(&self) -> &[TaxBracket] {
        &self.brackets
    }

    /// Tax on `taxable_income` under this schedule.
    ///
    /// The slab whose range `(min_income, max_income]` holds the income is
    /// found, and its base tax plus the rate on the excess over `min_income`
    /// is charged.
    ///
    /// # Arguments
    ///
    /// * `taxable_income` - Income after deductions; zero and negative
    ///   amounts owe nothing
    ///
    /// # Returns
    ///
    /// The tax rounded half-up to two decimal places.
    ///
    /// # Errors
    ///
    /// [`BracketTableError::Overflow`] if the tax does not fit in a
    /// [`Decimal`], or [`BracketTableError::NoMatchingBracket`] if no slab
    /// covers the income. A table that passed [`BracketTable::new`] always
    /// has a covering slab.
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_decimal_macros::dec;
    /// use tax_core::calculations::BracketTable;
    ///
    /// let table = BracketTable::standard();
    ///
    /// assert_eq!(table.tax_for(dec!(-5)), Ok(dec!(0)));
    /// assert_eq!(table.tax_for(dec!(600000)), Ok(dec!(0)));
    /// // 150000 + (3000000 - 2400000) * 15%
    /// assert_eq!(table.tax_for(dec!(3000000)), Ok(dec!(240000)));
    /// ```
    pub fn tax_for(
        &self,
        taxable_income: Decimal,
    ) -> Result<Decimal, BracketTableError> {
        if taxable_income <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }

        let bracket = self
            .brackets
            .iter()
            .find(|b| b.contains(taxable_income))
            .ok_or(BracketTableError::NoMatchingBracket(taxable_income))?;

        let tax = (taxable_income - bracket.min_income)
            .checked_mul(bracket.tax_rate)
            .and_then(|marginal| marginal.checked_add(bracket.base_tax))
            .ok_or(BracketTableError::Overflow(taxable_income))?;

        Ok(round_half_up(tax))
    }

    fn validate(brackets: &[TaxBracket]) -> Result<(), BracketTableError> {
        let first = brackets.first().ok_or(BracketTableError::Empty)?;
        if first.min_income != Decimal::ZERO {
            return Err(BracketTableError::NonZeroStart(first.min_income));
        }

        let last_index = brackets.len() - 1;
        let mut expected_min = Decimal::ZERO;
        let mut expected_base: Option<Decimal> = None;

        for (index, b) in brackets.iter().enumerate() {
            if b.min_income != expected_min {
                return Err(BracketTableError::Gap {
                    index,
                    expected: expected_min,
                    found: b.min_income,
                });
            }
            if b.tax_rate < Decimal::ZERO || b.tax_rate > Decimal::ONE {
                return Err(BracketTableError::InvalidRate {
                    index,
                    rate: b.tax_rate,
                });
            }
            if b.base_tax < Decimal::ZERO {
                return Err(BracketTableError::NegativeBaseTax {
                    index,
                    base_tax: b.base_tax,
                });
            }
            if let Some(expected) =
                expected_base.filter(|e| round_half_up(*e) != round_half_up(b.base_tax))
            {
                return Err(BracketTableError::Discontinuous {
                    index,
                    expected,
                    found: b.base_tax,
                });
            }

            match b.max_income {
                Some(max) if max <= b.min_income => {
                    return Err(BracketTableError::EmptyRange {
                        index,
                        min: b.min_income,
                        max,
                    });
                }
                Some(_) if index == last_index => return Err(BracketTableError::ClosedTopBracket),
                Some(max) => {
                    let owed_in_bracket = (max - b.min_income).saturating_mul(b.tax_rate);
                    expected_base = Some(b.base_tax.saturating_add(owed_in_bracket));
                    expected_min = max;
                }
                None if index != last_index => {
                    return Err(BracketTableError::OpenBracketNotLast(index));
                }
                None => {}
            }
        }

        Ok(())
    }
}

impl Default for BracketTable {
    fn default() -> Self {
        Self::standard()
    }
}
