use crate::outcome::{RunSummary, TestOutcome, TestStatus};
use crate::{Result, TestError};
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug)]
enum CollectorState {
    Collecting(Vec<TestOutcome>),
    Finalized(RunSummary),
}

/// Accumulates outcomes for one run.
///
/// `record` may be called concurrently from parallel workers (share the
/// collector through an `Arc`); appends are serialized behind a mutex so
/// completion order is preserved. Once [`finalize`](Self::finalize) has run
/// the collector is read-only.
#[derive(Debug)]
pub struct ResultCollector {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    state: Mutex<CollectorState>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::started_at(Utc::now())
    }

    pub fn started_at(started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            state: Mutex::new(CollectorState::Collecting(Vec::new())),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    fn lock(&self) -> Result<MutexGuard<'_, CollectorState>> {
        self.state
            .lock()
            .map_err(|e| TestError::CollectorPoisoned(e.to_string()))
    }

    pub fn record(&self, outcome: TestOutcome) -> Result<()> {
        let mut state = self.lock()?;
        let outcomes = match &mut *state {
            CollectorState::Collecting(outcomes) => outcomes,
            CollectorState::Finalized(_) => return Err(TestError::CollectorClosed),
        };

        validate(&outcome)?;
        debug!(test = %outcome.name, status = %outcome.status, "recorded outcome");
        outcomes.push(outcome);
        Ok(())
    }

    /// Computes the run summary. Calling it again returns the same summary.
    pub fn finalize(&self) -> Result<RunSummary> {
        self.finalize_at(Utc::now())
    }

    pub fn finalize_at(&self, finished_at: DateTime<Utc>) -> Result<RunSummary> {
        let mut state = self.lock()?;
        let outcomes = match &mut *state {
            CollectorState::Finalized(summary) => return Ok(summary.clone()),
            CollectorState::Collecting(outcomes) => std::mem::take(outcomes),
        };

        let summary =
            RunSummary::from_outcomes(self.run_id, self.started_at, finished_at, outcomes);
        info!(
            run_id = %summary.run_id,
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            skipped = summary.skipped,
            "finalized test run"
        );
        *state = CollectorState::Finalized(summary.clone());
        Ok(summary)
    }

    pub fn is_finalized(&self) -> bool {
        self.lock()
            .map(|state| matches!(*state, CollectorState::Finalized(_)))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        match self.lock() {
            Ok(state) => match &*state {
                CollectorState::Collecting(outcomes) => outcomes.len(),
                CollectorState::Finalized(summary) => summary.total,
            },
            Err(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResultCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(outcome: &TestOutcome) -> Result<()> {
    if outcome.name.trim().is_empty() {
        return Err(TestError::InvalidOutcome(
            "test name must not be empty".to_string(),
        ));
    }

    let has_error = outcome
        .error_message
        .as_deref()
        .is_some_and(|m| !m.trim().is_empty());

    match (outcome.status, has_error) {
        (TestStatus::Failed, false) => Err(TestError::InvalidOutcome(format!(
            "failed test '{}' has no error message",
            outcome.name
        ))),
        (status, true) if status != TestStatus::Failed => Err(TestError::InvalidOutcome(format!(
            "{} test '{}' must not carry an error message",
            status, outcome.name
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    #[test]
    fn test_record_rejects_failed_without_error() {
        let collector = ResultCollector::new();
        let mut outcome = TestOutcome::failed("Checkout", 10, "x");
        outcome.error_message = Some("   ".to_string());

        let err = collector.record(outcome).unwrap_err();
        assert!(matches!(err, TestError::InvalidOutcome(_)));
        assert!(collector.is_empty());
    }

    #[test]
    fn test_record_rejects_error_on_passed_test() {
        let collector = ResultCollector::new();
        let mut outcome = TestOutcome::passed("Login", 10);
        outcome.error_message = Some("stale".to_string());

        assert!(matches!(
            collector.record(outcome),
            Err(TestError::InvalidOutcome(_))
        ));
    }

    #[test]
    fn test_record_after_finalize_is_closed() {
        let collector = ResultCollector::new();
        collector.record(TestOutcome::passed("Login", 2300)).unwrap();
        let first = collector.finalize().unwrap();

        let err = collector
            .record(TestOutcome::passed("Late", 1))
            .unwrap_err();
        assert!(matches!(err, TestError::CollectorClosed));

        let second = collector.finalize().unwrap();
        assert_eq!(first, second);
        assert_eq!(second.total, 1);
    }

    #[test]
    fn test_closed_takes_precedence_over_invalid() {
        let collector = ResultCollector::new();
        collector.finalize().unwrap();
        let mut outcome = TestOutcome::failed("x", 1, "e");
        outcome.error_message = None;
        assert!(matches!(
            collector.record(outcome),
            Err(TestError::CollectorClosed)
        ));
    }

    #[test]
    fn test_huge_duration_finalizes_and_stays_usable() {
        let outcome: TestOutcome = serde_json::from_str(
            r#"{"name":"Soak","status":"passed","durationMs":9007199254740991}"#,
        )
        .unwrap();
        let collector = ResultCollector::new();
        collector.record(outcome).unwrap();

        let summary = collector.finalize().unwrap();
        assert_eq!(summary.duration_ms, 9_007_199_254_740_991);
        assert_eq!(collector.finalize().unwrap(), summary);
        assert!(matches!(
            collector.record(TestOutcome::passed("Late", 1)),
            Err(TestError::CollectorClosed)
        ));
    }

    #[test]
    fn test_poisoned_state_is_not_a_contract_violation() {
        let collector = Arc::new(ResultCollector::new());
        let poisoner = collector.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.state.lock().unwrap();
            panic!("worker died while holding the collector");
        })
        .join();

        let err = collector.record(TestOutcome::passed("Login", 1)).unwrap_err();
        assert!(matches!(err, TestError::CollectorPoisoned(_)));
        assert!(!err.is_contract_violation());
        assert!(collector.finalize().is_err());
    }

    #[test]
    fn test_concurrent_record_loses_nothing() {
        let collector = Arc::new(ResultCollector::new());
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let collector = Arc::clone(&collector);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        collector
                            .record(TestOutcome::passed(format!("w{}-t{}", worker, i), 1))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let summary = collector.finalize().unwrap();
        assert_eq!(summary.total, 400);
        assert_eq!(summary.passed, 400);
    }

    fn arb_outcome() -> impl Strategy<Value = TestOutcome> {
        ("[a-z]{1,12}", 0u64..10_000, 0u8..3).prop_map(|(name, duration, kind)| match kind {
            0 => TestOutcome::passed(name, duration),
            1 => TestOutcome::failed(name, duration, "assertion failed"),
            _ => TestOutcome::skipped(name),
        })
    }

    proptest! {
        #[test]
        fn prop_counts_match_outcomes(outcomes in proptest::collection::vec(arb_outcome(), 0..64)) {
            let collector = ResultCollector::new();
            for outcome in &outcomes {
                collector.record(outcome.clone()).unwrap();
            }
            let summary = collector.finalize().unwrap();
            let count = |s: TestStatus| outcomes.iter().filter(|o| o.status == s).count();

            prop_assert_eq!(summary.total, summary.passed + summary.failed + summary.skipped);
            prop_assert_eq!(summary.passed, count(TestStatus::Passed));
            prop_assert_eq!(summary.failed, count(TestStatus::Failed));
            prop_assert_eq!(summary.skipped, count(TestStatus::Skipped));
            prop_assert_eq!(&summary.outcomes, &outcomes);
            let longest = outcomes.iter().map(|o| o.duration_ms).max().unwrap_or(0);
            prop_assert!(summary.duration_ms >= longest);
        }
    }
}
