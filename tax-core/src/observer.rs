//! Observability port for callers of the calculation functions.
//!
//! The calculation code never writes to shared state on its own. A caller
//! that wants a record of validation issues, fallbacks and results passes a
//! [`CalculationObserver`] into the `*_observed` entry points.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::TaxOutcome;
use crate::calculations::LiabilityError;
use crate::validation::ValidationIssue;

/// Receives events from a calculation. Every method defaults to a no-op.
pub trait CalculationObserver: Send + Sync {
    fn validation_issue(
        &self,
        _issue: &ValidationIssue,
    ) {
    }

    /// The calculation failed and a zeroed outcome was returned instead.
    fn fallback(
        &self,
        _error: &LiabilityError,
    ) {
    }

    fn outcome(
        &self,
        _outcome: &TaxOutcome,
    ) {
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl CalculationObserver for NoopObserver {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum CalculationEvent {
    ValidationIssue(String),
    Fallback(String),
    Outcome(TaxOutcome),
}

/// Keeps the most recent events in memory, dropping the oldest once
/// `capacity` is reached.
#[derive(Debug)]
pub struct MemoryObserver {
    capacity: usize,
    events: Mutex<VecDeque<CalculationEvent>>,
}

impl MemoryObserver {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: Mutex::new(VecDeque::new()),
        }
    }

    /// A copy of the buffered events, oldest first.
    pub fn events(&self) -> Vec<CalculationEvent> {
        self.lock().iter().cloned().collect()
    }

    /// Removes and returns the buffered events, oldest first.
    pub fn drain(&self) -> Vec<CalculationEvent> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// True if any buffered event is a validation issue or a fallback.
    pub fn has_problems(&self) -> bool {
        self.lock()
            .iter()
            .any(|e| !matches!(e, CalculationEvent::Outcome(_)))
    }

    fn push(
        &self,
        event: CalculationEvent,
    ) {
        let mut events = self.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<CalculationEvent>> {
        // A panic while holding the lock cannot leave the deque inconsistent.
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryObserver {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl CalculationObserver for MemoryObserver {
    fn validation_issue(
        &self,
        issue: &ValidationIssue,
    ) {
        self.push(CalculationEvent::ValidationIssue(issue.to_string()));
    }

    fn fallback(
        &self,
        error: &LiabilityError,
    ) {
        self.push(CalculationEvent::Fallback(error.to_string()));
    }

    fn outcome(
        &self,
        outcome: &TaxOutcome,
    ) {
        self.push(CalculationEvent::Outcome(outcome.clone()));
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::Section;

    fn issue() -> ValidationIssue {
        ValidationIssue::NegativeAmount {
            section: Section::Income,
            category: "salary",
            amount: dec!(-1),
        }
    }

    #[test]
    fn memory_observer_records_events_in_order() {
        let observer = MemoryObserver::default();

        observer.validation_issue(&issue());
        observer.outcome(&TaxOutcome::zeroed(Decimal::ZERO));

        let events = observer.events();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            CalculationEvent::ValidationIssue(issue().to_string())
        );
        assert_eq!(
            events[1],
            CalculationEvent::Outcome(TaxOutcome::zeroed(Decimal::ZERO))
        );
        assert!(observer.has_problems());
    }

    #[test]
    fn memory_observer_drops_oldest_when_full() {
        let observer = MemoryObserver::new(2);

        observer.outcome(&TaxOutcome::zeroed(dec!(1)));
        observer.outcome(&TaxOutcome::zeroed(dec!(2)));
        observer.outcome(&TaxOutcome::zeroed(dec!(3)));

        assert_eq!(
            observer.events(),
            vec![
                CalculationEvent::Outcome(TaxOutcome::zeroed(dec!(2))),
                CalculationEvent::Outcome(TaxOutcome::zeroed(dec!(3))),
            ]
        );
    }

    #[test]
    fn memory_observer_drain_empties_the_buffer() {
        let observer = MemoryObserver::default();
        observer.outcome(&TaxOutcome::zeroed(Decimal::ZERO));

        assert_eq!(observer.drain().len(), 1);
        assert!(observer.is_empty());
        assert!(!observer.has_problems());
    }

    #[test]
    fn zero_capacity_still_keeps_the_latest_event() {
        let observer = MemoryObserver::new(0);
        observer.outcome(&TaxOutcome::zeroed(dec!(5)));

        assert_eq!(observer.len(), 1);
    }
}
