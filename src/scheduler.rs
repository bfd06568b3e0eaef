//! Bounded-concurrency execution of a transfer plan.
//!
//! - Sequential (default): one transfer at a time on the calling thread, in plan order.
//! - Bounded(N): a pool of N worker threads; items are dispatched FIFO in plan order.
//! - Unbounded (`0`): one worker per planned item, at most [`MAX_UNBOUNDED_WORKERS`].
//!
//! Per-item errors are caught at the worker boundary and recorded on the item's
//! outcome. With fail-fast, the first failure raises a halt flag: items already
//! running finish and report, items not yet started report `cancelled`.
//! Outcomes flow to a single receiver over an mpsc channel.

use rayon::ThreadPoolBuilder;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::errors::{TransferEngineError, TransferError};
use crate::model::{Action, Candidate, SkipReason};
use crate::report::{TransferOutcome, TransferReport, aggregate};
use crate::shutdown;

/// Performs one transfer against the store. Injected by the caller.
pub trait Transfer: Sync {
    fn transfer(&self, candidate: &Candidate, action: &Action) -> Result<(), TransferError>;
}

impl<F> Transfer for F
where
    F: Fn(&Candidate, &Action) -> Result<(), TransferError> + Sync,
{
    fn transfer(&self, candidate: &Candidate, action: &Action) -> Result<(), TransferError> {
        self(candidate, action)
    }
}

/// Thread ceiling for [`Concurrency::Unbounded`].
pub const MAX_UNBOUNDED_WORKERS: usize = 256;

/// Maximum number of transfers in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Concurrency {
    #[default]
    Sequential,
    Bounded(NonZeroUsize),
    Unbounded,
}

impl Concurrency {
    /// Map a caller-supplied request: unset → sequential, `0` → unbounded.
    pub fn from_requested(requested: Option<usize>) -> Self {
        match requested {
            None => Concurrency::Sequential,
            Some(0) => Concurrency::Unbounded,
            Some(n) => NonZeroUsize::new(n).map_or(Concurrency::Sequential, Concurrency::Bounded),
        }
    }

    /// Worker threads needed for `items` planned transfers; `None` means run inline.
    pub fn workers_for(&self, items: usize) -> Option<usize> {
        match *self {
            Concurrency::Sequential => None,
            Concurrency::Bounded(n) => Some(n.get().min(items).max(1)),
            Concurrency::Unbounded => Some(items.clamp(1, MAX_UNBOUNDED_WORKERS)),
        }
    }
}

/// One planned item: the candidate, its action, and an optional pre-decided
/// conflict that turns the item into a failure without calling the transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTransfer {
    pub candidate: Candidate,
    pub action: Action,
    pub conflict: Option<TransferError>,
}

impl PlannedTransfer {
    pub fn new(candidate: Candidate, action: Action) -> Self {
        Self {
            candidate,
            action,
            conflict: None,
        }
    }

    pub fn rejected(candidate: Candidate, action: Action, error: TransferError) -> Self {
        Self {
            candidate,
            action,
            conflict: Some(error),
        }
    }
}

/// Executes plans under a concurrency bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferScheduler {
    concurrency: Concurrency,
    fail_fast: bool,
}

impl TransferScheduler {
    pub fn new(concurrency: Concurrency) -> Self {
        Self {
            concurrency,
            fail_fast: false,
        }
    }

    /// Stop dispatching new work after the first failure.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    /// Execute `plan`, returning the aggregated report. Only worker-pool setup
    /// can fail here; per-item errors end up in the report.
    pub fn run<T: Transfer + ?Sized>(
        &self,
        plan: Vec<PlannedTransfer>,
        transfer: &T,
    ) -> Result<TransferReport, TransferEngineError> {
        let halt = AtomicBool::new(false);
        let items = plan.len();
        let fail_fast = self.fail_fast;

        let Some(workers) = self.concurrency.workers_for(items) else {
            info!(items, fail_fast, "Running transfers sequentially");
            let outcomes = plan
                .into_iter()
                .map(|item| execute(item, transfer, &halt, fail_fast));
            return Ok(aggregate(outcomes));
        };

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("transfer-{i}"))
            .build()
            .map_err(|e| TransferEngineError::WorkerPool(e.to_string()))?;
        info!(items, workers, fail_fast, "Dispatching transfers to worker pool");

        let (tx, rx) = mpsc::channel::<TransferOutcome>();
        pool.scope_fifo(|scope| {
            for item in plan {
                let tx = tx.clone();
                let halt = &halt;
                scope.spawn_fifo(move |_| {
                    let outcome = execute(item, transfer, halt, fail_fast);
                    // Receiver outlives the scope; a send error cannot happen here.
                    let _ = tx.send(outcome);
                });
            }
        });
        drop(tx);

        Ok(aggregate(rx))
    }
}

fn execute<T: Transfer + ?Sized>(
    item: PlannedTransfer,
    transfer: &T,
    halt: &AtomicBool,
    fail_fast: bool,
) -> TransferOutcome {
    let PlannedTransfer {
        candidate,
        action,
        conflict,
    } = item;

    if let Action::Skip { reason } = action {
        debug!(path = %candidate.relative_path, %reason, "Skipping");
        return TransferOutcome::skipped(candidate, reason);
    }
    if halt.load(Ordering::Acquire) || shutdown::is_requested() {
        debug!(path = %candidate.relative_path, "Not started; run cancelled");
        return TransferOutcome::skipped(candidate, SkipReason::Cancelled);
    }

    if let Some(err) = conflict {
        warn!(code = err.code(), path = %candidate.relative_path, error = %err, "Transfer rejected");
        if fail_fast {
            halt.store(true, Ordering::Release);
        }
        return TransferOutcome::failure(candidate, action, err);
    }

    debug!(path = %candidate.relative_path, %action, "Starting transfer");
    match transfer.transfer(&candidate, &action) {
        Ok(()) => {
            info!(path = %candidate.relative_path, %action, "Transferred");
            TransferOutcome::success(candidate, action)
        }
        Err(err) => {
            error!(code = err.code(), path = %candidate.relative_path, error = %err, "Transfer failed");
            if fail_fast {
                halt.store(true, Ordering::Release);
            }
            TransferOutcome::failure(candidate, action, err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    fn plan(n: usize) -> Vec<PlannedTransfer> {
        (1..=n)
            .map(|i| {
                PlannedTransfer::new(
                    Candidate::new(format!("item{i}"), format!("/src/item{i}")),
                    Action::TransferBinary,
                )
            })
            .collect()
    }

    #[test]
    fn concurrency_mapping() {
        assert_eq!(Concurrency::from_requested(None), Concurrency::Sequential);
        assert_eq!(Concurrency::from_requested(Some(0)), Concurrency::Unbounded);
        assert_eq!(
            Concurrency::from_requested(Some(3)),
            Concurrency::Bounded(NonZeroUsize::new(3).unwrap())
        );
        assert_eq!(Concurrency::Sequential.workers_for(10), None);
        assert_eq!(Concurrency::from_requested(Some(8)).workers_for(3), Some(3));
        assert_eq!(Concurrency::Unbounded.workers_for(7), Some(7));
        assert_eq!(Concurrency::Unbounded.workers_for(0), Some(1));
        assert_eq!(Concurrency::Unbounded.workers_for(100_000), Some(MAX_UNBOUNDED_WORKERS));
    }

    #[test]
    fn sequential_runs_in_plan_order() {
        let seen = Mutex::new(Vec::new());
        let transfer = |c: &Candidate, _: &Action| -> Result<(), TransferError> {
            seen.lock().unwrap().push(c.relative_path.clone());
            Ok(())
        };
        let report = TransferScheduler::default().run(plan(4), &transfer).unwrap();
        assert_eq!(report.succeeded(), 4);
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["item1", "item2", "item3", "item4"]
        );
    }

    #[test]
    fn bounded_never_exceeds_limit() {
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let transfer = |_: &Candidate, _: &Action| -> Result<(), TransferError> {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        };
        let scheduler = TransferScheduler::new(Concurrency::from_requested(Some(3)));
        let report = scheduler.run(plan(12), &transfer).unwrap();
        assert_eq!(report.attempted(), 12);
        assert_eq!(report.succeeded(), 12);
        let peak = peak.load(Ordering::SeqCst);
        assert!((1..=3).contains(&peak), "peak in-flight was {peak}");
    }

    #[test]
    fn unbounded_attempts_everything_once() {
        let calls = AtomicUsize::new(0);
        let transfer = |_: &Candidate, _: &Action| -> Result<(), TransferError> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        let report = TransferScheduler::new(Concurrency::Unbounded)
            .run(plan(9), &transfer)
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 9);
        assert_eq!(report.succeeded(), 9);
    }

    #[test]
    fn fail_soft_attempts_all_siblings() {
        let transfer = |c: &Candidate, _: &Action| -> Result<(), TransferError> {
            if c.relative_path == "item2" {
                Err(TransferError::Remote("rejected".into()))
            } else {
                Ok(())
            }
        };
        let report = TransferScheduler::new(Concurrency::from_requested(Some(2)))
            .run(plan(5), &transfer)
            .unwrap();
        assert_eq!(report.failed(), 1);
        assert_eq!(report.succeeded(), 4);
        assert_eq!(report.cancelled(), 0);
        assert!(!report.is_success());
    }

    #[test]
    fn sequential_fail_fast_cancels_the_rest() {
        let calls = AtomicUsize::new(0);
        let transfer = |c: &Candidate, _: &Action| -> Result<(), TransferError> {
            calls.fetch_add(1, Ordering::SeqCst);
            if c.relative_path == "item2" {
                Err(TransferError::Remote("rejected".into()))
            } else {
                Ok(())
            }
        };
        let report = TransferScheduler::default()
            .with_fail_fast(true)
            .run(plan(5), &transfer)
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.cancelled(), 3);
        let cancelled: Vec<_> = report
            .outcomes()
            .iter()
            .filter(|o| o.action == Action::skip(SkipReason::Cancelled))
            .map(|o| o.candidate.relative_path.as_str())
            .collect();
        assert_eq!(cancelled, vec!["item3", "item4", "item5"]);
    }

    #[test]
    fn conflicts_count_as_failures_without_calling_transfer() {
        let calls = AtomicUsize::new(0);
        let transfer = |_: &Candidate, _: &Action| -> Result<(), TransferError> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        let mut items = plan(2);
        items.push(PlannedTransfer::rejected(
            Candidate::new("item3", "/src/item3"),
            Action::TransferBinary,
            TransferError::AlreadyExists("remote/item3".into()),
        ));
        items.push(PlannedTransfer::new(
            Candidate::new("item4", "/src/item4"),
            Action::skip(SkipReason::AttributeExcluded),
        ));
        let report = TransferScheduler::default().run(items, &transfer).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.attempted(), 4);
    }
}
