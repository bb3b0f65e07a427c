//! Recalculation of many saved forms in one pass.

use rust_decimal::Decimal;
use serde::Serialize;
use tax_core::calculations::{Assessment, FilingTotals, LiabilityCalculator};
use tax_core::observer::{CalculationEvent, MemoryObserver};
use tax_core::TaxOutcome;
use tracing::{info, warn};

use crate::form::{FormData, FormDataError};

/// The result for one record of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    /// Position of the record in the input, starting at 0.
    pub index: usize,
    pub taxpayer: Option<String>,
    pub assessment: Assessment,
    /// Validation issues and fallbacks reported while assessing.
    pub issues: Vec<String>,
    /// Set when the record could not be read; the assessment is then zeroed.
    pub error: Option<String>,
}

impl BatchEntry {
    pub fn is_clean(&self) -> bool {
        self.error.is_none() && self.issues.is_empty()
    }
}

fn zeroed_assessment() -> Assessment {
    Assessment {
        totals: FilingTotals {
            total_income: Decimal::ZERO,
            total_deductions: Decimal::ZERO,
            total_withholding: Decimal::ZERO,
            taxable_income: Decimal::ZERO,
        },
        outcome: TaxOutcome::zeroed(Decimal::ZERO),
    }
}

/// Assesses every form. A record that cannot be read gets a zeroed
/// assessment and an error; the rest of the batch carries on.
pub fn run_batch(
    forms: Vec<Result<FormData, FormDataError>>,
    calculator: &LiabilityCalculator,
) -> Vec<BatchEntry> {
    let entries: Vec<BatchEntry> = forms
        .into_iter()
        .enumerate()
        .map(|(index, form)| match form {
            Ok(form) => {
                let record = form.to_record();
                let observer = MemoryObserver::default();
                let assessment = calculator.assess_observed(&record, &observer);
                let issues = observer
                    .drain()
                    .into_iter()
                    .filter_map(|event| match event {
                        CalculationEvent::ValidationIssue(msg) | CalculationEvent::Fallback(msg) => {
                            Some(msg)
                        }
                        CalculationEvent::Outcome(_) => None,
                    })
                    .collect();

                BatchEntry {
                    index,
                    taxpayer: record.taxpayer.map(|t| t.name),
                    assessment,
                    issues,
                    error: None,
                }
            }
            Err(error) => {
                warn!(index, %error, "unreadable record in batch; using zeroed outcome");
                BatchEntry {
                    index,
                    taxpayer: None,
                    assessment: zeroed_assessment(),
                    issues: Vec::new(),
                    error: Some(error.to_string()),
                }
            }
        })
        .collect();

    let failed = entries.iter().filter(|e| e.error.is_some()).count();
    info!(records = entries.len(), failed, "batch assessed");

    entries
}
