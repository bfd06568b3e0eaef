//! Per-item outcomes and the aggregated run report.
//!
//! Counting is a single pass and does not depend on completion order. The
//! final outcome list is sorted by relative path so rendering is stable across
//! concurrent runs.

use serde::Serialize;

use crate::errors::TransferError;
use crate::model::{Action, Candidate, SkipReason};

/// Final state of one planned item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferOutcome {
    pub candidate: Candidate,
    pub action: Action,
    pub succeeded: bool,
    pub error: Option<TransferError>,
}

/// Coarse classification used for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Succeeded,
    Skipped,
    Failed,
    Cancelled,
}

impl TransferOutcome {
    pub fn success(candidate: Candidate, action: Action) -> Self {
        Self {
            candidate,
            action,
            succeeded: true,
            error: None,
        }
    }

    pub fn failure(candidate: Candidate, action: Action, error: TransferError) -> Self {
        Self {
            candidate,
            action,
            succeeded: false,
            error: Some(error),
        }
    }

    pub fn skipped(candidate: Candidate, reason: SkipReason) -> Self {
        Self {
            candidate,
            action: Action::skip(reason),
            succeeded: false,
            error: None,
        }
    }

    pub fn status(&self) -> OutcomeStatus {
        match (&self.action, &self.error) {
            (_, Some(_)) => OutcomeStatus::Failed,
            (Action::Skip { reason: SkipReason::Cancelled }, None) => OutcomeStatus::Cancelled,
            (Action::Skip { .. }, None) => OutcomeStatus::Skipped,
            (_, None) if self.succeeded => OutcomeStatus::Succeeded,
            (_, None) => OutcomeStatus::Failed,
        }
    }
}

/// Summary of a whole run. Built once by [`ResultAggregator::finish`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    attempted: usize,
    succeeded: usize,
    skipped: usize,
    failed: usize,
    cancelled: usize,
    outcomes: Vec<TransferOutcome>,
}

impl TransferReport {
    /// Number of planned items (all outcomes, skipped ones included).
    pub fn attempted(&self) -> usize {
        self.attempted
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled
    }

    pub fn outcomes(&self) -> &[TransferOutcome] {
        &self.outcomes
    }

    /// Outcomes that carry an error.
    pub fn failures(&self) -> impl Iterator<Item = &TransferOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status() == OutcomeStatus::Failed)
    }

    /// True when every item succeeded or was cleanly skipped.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Process exit code: 0 without failures, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

/// Single-writer accumulator for outcomes.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    succeeded: usize,
    skipped: usize,
    failed: usize,
    cancelled: usize,
    outcomes: Vec<TransferOutcome>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: TransferOutcome) {
        match outcome.status() {
            OutcomeStatus::Succeeded => self.succeeded += 1,
            OutcomeStatus::Skipped => self.skipped += 1,
            OutcomeStatus::Failed => self.failed += 1,
            OutcomeStatus::Cancelled => self.cancelled += 1,
        }
        self.outcomes.push(outcome);
    }

    pub fn finish(mut self) -> TransferReport {
        self.outcomes.sort_by(|a, b| {
            a.candidate
                .relative_path
                .cmp(&b.candidate.relative_path)
                .then_with(|| a.candidate.reference.cmp(&b.candidate.reference))
        });
        TransferReport {
            attempted: self.outcomes.len(),
            succeeded: self.succeeded,
            skipped: self.skipped,
            failed: self.failed,
            cancelled: self.cancelled,
            outcomes: self.outcomes,
        }
    }
}

/// Aggregate an outcome stream into a report.
pub fn aggregate<I>(outcomes: I) -> TransferReport
where
    I: IntoIterator<Item = TransferOutcome>,
{
    let mut agg = ResultAggregator::new();
    for outcome in outcomes {
        agg.record(outcome);
    }
    agg.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<TransferOutcome> {
        vec![
            TransferOutcome::success(Candidate::new("a", "a"), Action::TransferBinary),
            TransferOutcome::skipped(Candidate::new("b", "b"), SkipReason::AttributeExcluded),
            TransferOutcome::failure(
                Candidate::new("c", "c"),
                Action::TransferBinary,
                TransferError::Remote("boom".into()),
            ),
            TransferOutcome::skipped(Candidate::new("d", "d"), SkipReason::Cancelled),
            TransferOutcome::success(Candidate::new("e", "e"), Action::TransferBinary),
        ]
    }

    #[test]
    fn counts_each_status() {
        let report = aggregate(sample());
        assert_eq!(report.attempted(), 5);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.cancelled(), 1);
        assert_eq!(report.exit_code(), 1);
        let failures: Vec<_> = report.failures().map(|o| o.candidate.relative_path.as_str()).collect();
        assert_eq!(failures, vec!["c"]);
    }

    #[test]
    fn aggregation_is_order_independent() {
        let forward = aggregate(sample());
        let mut reversed = sample();
        reversed.reverse();
        let mut rotated = sample();
        rotated.rotate_left(2);
        assert_eq!(forward, aggregate(reversed));
        assert_eq!(forward, aggregate(rotated));
    }

    #[test]
    fn empty_run_is_success() {
        let report = aggregate(Vec::new());
        assert_eq!(report.attempted(), 0);
        assert!(report.is_success());
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn report_serializes_counts_and_reasons() {
        let json = serde_json::to_value(aggregate(sample())).unwrap();
        assert_eq!(json["failed"], 1);
        assert_eq!(json["outcomes"][1]["action"]["reason"], "attribute-excluded");
        assert_eq!(json["outcomes"][2]["error"]["kind"], "remote");
    }
}
