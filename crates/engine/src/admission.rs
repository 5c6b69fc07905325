// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Participant loop: submit, wait for the turn, run the worker, record the result
//!
//! `attempt` never returns an error. Every failure is recovered here and
//! reported as an [`Outcome`], with the job record left terminal whenever the
//! store can still be reached.

use crate::coordinator::Coordinator;
use crate::error::CoordinatorError;
use crate::worker::Worker;
use baton_core::{Clock, JobId, JobStatus};
use baton_storage::Store;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::Instrument;

/// Failure reason recorded when the deadline passes before the turn is granted
pub const TIMEOUT_REASON: &str = "timed out waiting for turn";

/// Failure reason recorded when the worker is stopped because its lease could
/// not be renewed in time
pub const LEASE_LOST_REASON: &str = "lease lost";

/// Floor for poll and renewal periods so a zero interval cannot spin
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Tries at recording an outcome before the record is left as is
const FINISH_ATTEMPTS: u32 = 5;

/// How one participant's attempt ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    /// The worker returned an error or panicked
    Failed(String),
    /// The deadline passed before the turn was granted; the worker never ran
    TimedOut,
    /// The submission itself was refused
    Rejected(String),
}

impl Outcome {
    /// Terminal status this outcome corresponds to
    pub fn status(&self) -> JobStatus {
        match self {
            Outcome::Succeeded => JobStatus::Succeeded,
            Outcome::Failed(_) | Outcome::TimedOut | Outcome::Rejected(_) => JobStatus::Failed,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Outcome::Succeeded => None,
            Outcome::Failed(message) | Outcome::Rejected(message) => Some(message),
            Outcome::TimedOut => Some(TIMEOUT_REASON),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Succeeded => write!(f, "succeeded"),
            Outcome::Failed(message) => write!(f, "failed: {message}"),
            Outcome::TimedOut => write!(f, "timed out"),
            Outcome::Rejected(message) => write!(f, "rejected: {message}"),
        }
    }
}

/// Drives a [`Worker`] through one FIFO turn per job id
pub struct Admission<S, C, W> {
    coordinator: Coordinator<S, C>,
    worker: Arc<W>,
}

impl<S: Clone, C: Clone, W> Clone for Admission<S, C, W> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
            worker: Arc::clone(&self.worker),
        }
    }
}

impl<S: Store, C: Clock, W: Worker> Admission<S, C, W> {
    pub fn new(coordinator: Coordinator<S, C>, worker: Arc<W>) -> Self {
        Self {
            coordinator,
            worker,
        }
    }

    pub fn coordinator(&self) -> &Coordinator<S, C> {
        &self.coordinator
    }

    /// Submit `id` and wait up to `give_up_after` for its turn, polling every
    /// `retry_interval`
    pub async fn attempt(
        &self,
        id: &JobId,
        give_up_after: Duration,
        retry_interval: Duration,
    ) -> Outcome {
        let span = tracing::info_span!("admission.attempt", %id);
        async move {
            let outcome = self.wait_and_run(id, give_up_after, retry_interval).await;
            tracing::info!(%outcome, "attempt finished");
            outcome
        }
        .instrument(span)
        .await
    }

    async fn wait_and_run(
        &self,
        id: &JobId,
        give_up_after: Duration,
        retry_interval: Duration,
    ) -> Outcome {
        let clock = self.coordinator.clock();
        let start = clock.now();

        if let Err(e) = self.coordinator.submit_with_expiry(id, give_up_after).await {
            tracing::warn!(error = %e, "submission rejected");
            return Outcome::Rejected(e.to_string());
        }

        let retry_interval = retry_interval.max(MIN_PERIOD);
        let mut polls: u64 = 0;
        loop {
            polls += 1;
            match self.coordinator.poll_turn(id).await {
                Ok(true) => {
                    tracing::debug!(polls, "turn granted");
                    let claimed_at = clock.now();
                    match self.coordinator.start(id).await {
                        Ok(_) => return self.run_turn(id, claimed_at).await,
                        Err(e) if e.is_turn_lost() => {
                            tracing::debug!(error = %e, "turn moved on before claim");
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "could not mark job as running");
                            let message = e.to_string();
                            self.finish(id, JobStatus::Failed, Some(message.clone()))
                                .await;
                            return Outcome::Failed(message);
                        }
                    }
                }
                Ok(false) => {}
                Err(e) => tracing::warn!(error = %e, "poll failed, retrying"),
            }

            let waited = clock.now().saturating_duration_since(start);
            match give_up_after.checked_sub(waited) {
                Some(remaining) if !remaining.is_zero() => {
                    tokio::time::sleep(retry_interval.min(remaining)).await;
                }
                _ => break,
            }
        }

        tracing::warn!(polls, ?give_up_after, "gave up waiting for turn");
        self.finish(id, JobStatus::Failed, Some(TIMEOUT_REASON.to_string()))
            .await;
        Outcome::TimedOut
    }

    async fn run_turn(&self, id: &JobId, claimed_at: Instant) -> Outcome {
        match self.run_worker(id, claimed_at).await {
            Ok(()) => {
                self.finish(id, JobStatus::Succeeded, None).await;
                Outcome::Succeeded
            }
            Err(message) => {
                tracing::warn!(error = %message, "worker failed");
                self.finish(id, JobStatus::Failed, Some(message.clone()))
                    .await;
                Outcome::Failed(message)
            }
        }
    }

    /// Run the worker on its own task so a panic surfaces as an error,
    /// renewing the turn lease while it runs
    ///
    /// When renewals keep failing the worker is aborted before the lease can
    /// lapse under it, so no two workers ever run at once.
    async fn run_worker(&self, id: &JobId, claimed_at: Instant) -> Result<(), String> {
        let worker = Arc::clone(&self.worker);
        let job = id.clone();
        let mut handle = tokio::spawn(
            async move { worker.run(&job).await.map_err(|e| e.to_string()) }
                .in_current_span(),
        );

        let joined = match self.coordinator.config().turn_lease {
            None => handle.await,
            Some(lease) => {
                let clock = self.coordinator.clock();
                let period = (lease / 2).max(MIN_PERIOD);
                // Measured from before the claim, so never later than the stored lease
                let mut lease_until = claimed_at + lease;
                let mut ticker = tokio::time::interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                // First tick completes immediately
                ticker.tick().await;
                loop {
                    tokio::select! {
                        joined = &mut handle => break joined,
                        _ = ticker.tick() => {
                            let renew_started = clock.now();
                            match self.coordinator.renew(id).await {
                                Ok(_) => lease_until = renew_started + lease,
                                Err(e) => {
                                    tracing::warn!(error = %e, "lease renewal failed");
                                    if clock.now() + period >= lease_until {
                                        tracing::error!("lease about to lapse, stopping worker");
                                        handle.abort();
                                        // Wait for the abort to land before giving up the turn
                                        let _ = handle.await;
                                        return Err(LEASE_LOST_REASON.to_string());
                                    }
                                }
                            }
                        }
                    }
                }
            }
        };

        match joined {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(panic_message(e.into_panic())),
            Err(e) => Err(format!("worker task failed: {e}")),
        }
    }

    /// Record the outcome, retrying lock timeouts and store errors with
    /// doubling backoff so the record still ends terminal
    async fn finish(&self, id: &JobId, status: JobStatus, error: Option<String>) {
        let mut backoff = self.coordinator.config().lock_retry_interval.max(MIN_PERIOD);
        for attempt in 1..=FINISH_ATTEMPTS {
            let e = match self.coordinator.complete(id, status, error.clone()).await {
                Ok(_) => return,
                Err(e) => e,
            };

            // An earlier try may have written the record before failing
            if attempt > 1 {
                if let CoordinatorError::IllegalTransition { from, .. } = &e {
                    if *from == status {
                        return;
                    }
                }
            }

            if !e.is_transient() || attempt == FINISH_ATTEMPTS {
                tracing::error!(error = %e, %status, attempt, "failed to record job outcome");
                return;
            }
            tracing::warn!(error = %e, %status, attempt, "recording outcome failed, retrying");
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let detail = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };
    format!("worker panicked: {detail}")
}

#[cfg(test)]
#[path = "admission_tests.rs"]
mod tests;
