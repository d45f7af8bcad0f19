// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bounded-concurrency batch execution on the tokio runtime.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{Id, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::report::{BatchItem, BatchReport, ItemError};
use crate::error::{Error, Result};

/// What happens to in-flight operations when the batch is interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelPolicy {
    /// Abort in-flight tasks; they are reported as cancelled.
    #[default]
    Abandon,
    /// Let in-flight tasks finish and record their outcomes.
    Drain,
}

/// Live counters for a running batch.
///
/// Workers update these atomically; read them from another task to observe
/// progress.
#[derive(Debug, Default)]
pub struct BatchProgress {
    total: AtomicUsize,
    started: AtomicUsize,
    running: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    cancelled: AtomicUsize,
}

impl BatchProgress {
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Acquire)
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::Acquire)
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::Acquire)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Acquire)
    }

    /// Items that ended without an outcome because the batch was
    /// interrupted, whether or not they had started.
    pub fn cancelled(&self) -> usize {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Reaches `total()` once `run` returns.
    pub fn completed(&self) -> usize {
        self.succeeded() + self.failed() + self.cancelled()
    }

    /// Operations currently executing. Aborted operations leave this count
    /// when their task is dropped.
    pub fn running(&self) -> usize {
        self.running.load(Ordering::Acquire)
    }

    fn begin(&self, total: usize) {
        self.total.store(total, Ordering::Release);
        self.started.store(0, Ordering::Release);
        self.running.store(0, Ordering::Release);
        self.succeeded.store(0, Ordering::Release);
        self.failed.store(0, Ordering::Release);
        self.cancelled.store(0, Ordering::Release);
    }

    fn record_started(self: &Arc<Self>) -> RunningGuard {
        self.started.fetch_add(1, Ordering::AcqRel);
        self.running.fetch_add(1, Ordering::AcqRel);
        RunningGuard(Arc::clone(self))
    }

    fn record_cancelled(&self, count: usize) {
        self.cancelled.fetch_add(count, Ordering::AcqRel);
    }

    fn record_outcome(&self, success: bool) {
        if success {
            self.succeeded.fetch_add(1, Ordering::AcqRel);
        } else {
            self.failed.fetch_add(1, Ordering::AcqRel);
        }
    }
}

/// Decrements the running count when an operation's task finishes,
/// panics or is aborted.
struct RunningGuard(Arc<BatchProgress>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.running.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Runs independent operations with at most `concurrency_limit` in flight.
///
/// One item's failure never affects another item, and the batch itself never
/// fails because some items did: every outcome lands in the returned
/// [`BatchReport`], in input order.
#[derive(Debug, Clone)]
pub struct BatchExecutor {
    concurrency_limit: usize,
    deadline: Option<Duration>,
    cancellation: CancellationToken,
    cancel_policy: CancelPolicy,
    progress: Option<Arc<BatchProgress>>,
}

impl BatchExecutor {
    /// # Errors
    /// [`Error::InvalidConcurrency`] if `concurrency_limit` is zero.
    pub fn new(concurrency_limit: usize) -> Result<Self> {
        if concurrency_limit == 0 {
            return Err(Error::InvalidConcurrency(concurrency_limit));
        }
        Ok(Self {
            concurrency_limit,
            deadline: None,
            cancellation: CancellationToken::new(),
            cancel_policy: CancelPolicy::default(),
            progress: None,
        })
    }

    /// Stop launching items once `deadline` has elapsed since `run` started.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_cancel_policy(mut self, policy: CancelPolicy) -> Self {
        self.cancel_policy = policy;
        self
    }

    pub fn with_progress(mut self, progress: Arc<BatchProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Run `operation` once per input.
    ///
    /// Inputs are launched in order as slots free up; completion order is
    /// arbitrary. When the deadline expires or the cancellation token fires,
    /// no further items are launched, in-flight items are handled per the
    /// [`CancelPolicy`], and every item without an outcome is reported as
    /// [`ItemError::Cancelled`].
    pub async fn run<I, O, E, F, Fut>(&self, inputs: Vec<I>, operation: F) -> BatchReport<I, O, E>
    where
        I: Clone + Send + 'static,
        O: Send + 'static,
        E: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<O, E>> + Send + 'static,
    {
        let total = inputs.len();
        if total == 0 {
            return BatchReport::empty();
        }

        let started_at = Instant::now();
        // A deadline too far out to represent is no deadline.
        let deadline = self.deadline.and_then(|d| started_at.checked_add(d));
        let operation = Arc::new(operation);
        let progress = self.progress.clone().unwrap_or_default();
        progress.begin(total);

        info!(
            items = total,
            concurrency_limit = self.concurrency_limit,
            deadline_ms = self.deadline.map(|d| d.as_millis() as u64),
            "Batch starting"
        );

        let mut slots: Vec<Option<std::result::Result<O, ItemError<E>>>> =
            (0..total).map(|_| None).collect();
        let mut next_index = 0;
        let mut in_flight = JoinSet::new();
        let mut task_index: HashMap<Id, usize> = HashMap::new();
        let mut interrupted = false;

        let expired = async {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(expired);

        loop {
            if !interrupted
                && (self.cancellation.is_cancelled()
                    || deadline.is_some_and(|at| Instant::now() >= at))
            {
                interrupted = true;
                self.interrupt(&mut in_flight);
            }

            if !interrupted {
                while in_flight.len() < self.concurrency_limit && next_index < total {
                    let index = next_index;
                    let input = inputs[index].clone();
                    next_index += 1;
                    let operation = Arc::clone(&operation);
                    let progress = Arc::clone(&progress);
                    let handle = in_flight.spawn(async move {
                        let _running = progress.record_started();
                        let outcome = operation(input).await;
                        progress.record_outcome(outcome.is_ok());
                        (index, outcome)
                    });
                    task_index.insert(handle.id(), index);
                }
            }

            if in_flight.is_empty() {
                break;
            }

            tokio::select! {
                biased;

                _ = self.cancellation.cancelled(), if !interrupted => {
                    interrupted = true;
                    self.interrupt(&mut in_flight);
                }
                _ = &mut expired, if !interrupted => {
                    interrupted = true;
                    self.interrupt(&mut in_flight);
                }
                joined = in_flight.join_next_with_id() => match joined {
                    Some(Ok((id, (index, outcome)))) => {
                        task_index.remove(&id);
                        if outcome.is_err() {
                            debug!(index, "Batch item failed");
                        }
                        record(&mut slots, index, outcome.map_err(ItemError::Failed));
                    }
                    Some(Err(join_error)) => {
                        let Some(index) = task_index.remove(&join_error.id()) else {
                            continue;
                        };
                        if join_error.is_panic() {
                            let message = panic_message(join_error.into_panic());
                            warn!(index, panic = %message, "Batch item panicked");
                            progress.record_outcome(false);
                            record(&mut slots, index, Err(ItemError::Panicked(message)));
                        }
                        // Aborted tasks keep an empty slot and become `Cancelled`.
                    }
                    None => break,
                },
            }
        }

        let unfinished = slots.iter().filter(|slot| slot.is_none()).count();
        progress.record_cancelled(unfinished);

        let items: Vec<_> = inputs
            .into_iter()
            .zip(slots)
            .enumerate()
            .map(|(index, (input, slot))| {
                BatchItem::new(index, input, slot.unwrap_or(Err(ItemError::Cancelled)))
            })
            .collect();
        let report = BatchReport::from_items(items);

        info!(
            items = report.len(),
            succeeded = report.succeeded_count(),
            failed = report.failed_count(),
            cancelled = report.cancelled_count(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Batch finished"
        );

        report
    }

    fn interrupt<T: 'static>(&self, in_flight: &mut JoinSet<T>) {
        warn!(
            in_flight = in_flight.len(),
            policy = ?self.cancel_policy,
            "Batch interrupted; no further items will be launched"
        );
        if self.cancel_policy == CancelPolicy::Abandon {
            in_flight.abort_all();
        }
    }
}

/// Validate `concurrency_limit` and run a batch with default options.
///
/// # Errors
/// [`Error::InvalidConcurrency`] if `concurrency_limit` is zero; no
/// operation runs in that case.
pub async fn run_batch<I, O, E, F, Fut>(
    inputs: Vec<I>,
    operation: F,
    concurrency_limit: usize,
) -> Result<BatchReport<I, O, E>>
where
    I: Clone + Send + 'static,
    O: Send + 'static,
    E: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<O, E>> + Send + 'static,
{
    let executor = BatchExecutor::new(concurrency_limit)?;
    Ok(executor.run(inputs, operation).await)
}

fn record<T>(slots: &mut [Option<T>], index: usize, outcome: T) {
    debug_assert!(slots[index].is_none(), "batch item {index} completed twice");
    slots[index] = Some(outcome);
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
