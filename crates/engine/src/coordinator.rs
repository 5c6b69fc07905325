// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue coordinator: FIFO admission over per-participant job records
//!
//! There is no queue document. The queue is derived on every read: the
//! first in line is the waiting pending record with the smallest
//! `submitted_at`. Every read-modify-write runs inside the critical section
//! so that "read ordering, decide, write" is atomic across participants.

use crate::config::CoordinatorConfig;
use crate::error::CoordinatorError;
use crate::guard::CriticalSection;
use baton_core::{utc_after, Clock, Filter, JobId, JobRecord, JobStatus, ID_FIELD};
use baton_storage::Store;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;
use tracing::Instrument;

/// Failure reason recorded when a submission is stamped before the current
/// first in line
pub const OUT_OF_ORDER_REASON: &str = "out of order submission";

/// Ordering and admission control for participants sharing one store
#[derive(Clone)]
pub struct Coordinator<S, C> {
    store: S,
    clock: C,
    guard: CriticalSection<S, C>,
    config: CoordinatorConfig,
}

impl<S: Store, C: Clock> Coordinator<S, C> {
    pub fn new(store: S, clock: C, config: CoordinatorConfig) -> Self {
        let guard = CriticalSection::new(store.clone(), clock.clone(), &config);
        Self {
            store,
            clock,
            guard,
            config,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn guard(&self) -> &CriticalSection<S, C> {
        &self.guard
    }

    /// Enqueue `id` as a pending job stamped with the current time
    pub async fn submit(&self, id: &JobId) -> Result<JobRecord, CoordinatorError> {
        self.submit_record(id, None).await
    }

    /// Enqueue `id`, leaving the queue on its own once `give_up_after` passes
    pub async fn submit_with_expiry(
        &self,
        id: &JobId,
        give_up_after: Duration,
    ) -> Result<JobRecord, CoordinatorError> {
        self.submit_record(id, Some(give_up_after)).await
    }

    async fn submit_record(
        &self,
        id: &JobId,
        give_up_after: Option<Duration>,
    ) -> Result<JobRecord, CoordinatorError> {
        let span = tracing::info_span!("coordinator.submit", %id);
        self.guard
            .run(move || async move {
                let first = self.load_first_in_line().await?;
                let mut record = JobRecord::new(id.clone(), self.clock.utc_now());
                if let Some(give_up_after) = give_up_after {
                    record = record.with_expiry(give_up_after);
                }

                // Only possible when participants' clocks disagree
                if let Some(first) = first.filter(|f| record.submitted_at < f.submitted_at) {
                    record.status = JobStatus::Failed;
                    record.run_time = Some(Duration::ZERO);
                    record.error = Some(OUT_OF_ORDER_REASON.to_string());
                    self.store.insert(record.to_document()?).await?;
                    tracing::warn!(
                        submitted_at = %record.submitted_at,
                        first_in_line = %first.id,
                        first_submitted_at = %first.submitted_at,
                        "submission stamped before first in line"
                    );
                    return Err(CoordinatorError::OutOfOrderSubmission {
                        id: record.id,
                        submitted_at: record.submitted_at,
                        first_in_line: first.id,
                        first_submitted_at: first.submitted_at,
                    });
                }

                self.store.insert(record.to_document()?).await?;
                tracing::info!(submitted_at = %record.submitted_at, "submitted");
                Ok(record)
            })
            .instrument(span)
            .await
    }

    /// Whether `id` may take the turn now
    ///
    /// False while another job holds the turn, when the queue is empty, or
    /// when `id` is not first in line.
    pub async fn poll_turn(&self, id: &JobId) -> Result<bool, CoordinatorError> {
        let span = tracing::debug_span!("coordinator.poll_turn", %id);
        self.guard
            .run(move || async move {
                let granted = match self.turn_for(id, self.clock.utc_now()).await? {
                    Turn::Granted => true,
                    Turn::HeldBy(holder) => {
                        tracing::trace!(%holder, "turn is held");
                        false
                    }
                    Turn::NotFirst => false,
                };
                tracing::trace!(granted, "polled");
                Ok(granted)
            })
            .instrument(span)
            .await
    }

    /// Claim the turn for `id` and mark it running
    ///
    /// The grant is re-checked under the lock. Fails with `TurnHeld` or
    /// `NotFirstInLine` when the queue moved after `id` last polled, e.g. its
    /// record expired or a lapsed lease let another job in.
    pub async fn start(&self, id: &JobId) -> Result<JobRecord, CoordinatorError> {
        let span = tracing::info_span!("coordinator.start", %id);
        self.guard
            .run(move || async move {
                let record = self.load_one(id).await?;
                ensure_transition(&record, JobStatus::InProgress)?;

                let now = self.clock.utc_now();
                match self.turn_for(id, now).await? {
                    Turn::Granted => {}
                    Turn::HeldBy(holder) => {
                        return Err(CoordinatorError::TurnHeld {
                            id: id.clone(),
                            holder,
                        })
                    }
                    Turn::NotFirst => return Err(CoordinatorError::NotFirstInLine(id.clone())),
                }

                let mut record = record;
                record.status = JobStatus::InProgress;
                record.started_at = Some(now);
                record.lease_expires_at = self.lease_from(now);
                self.save(&record).await?;

                tracing::info!("started");
                Ok(record)
            })
            .instrument(span)
            .await
    }

    /// Push back the lease of a running job
    pub async fn renew(&self, id: &JobId) -> Result<JobRecord, CoordinatorError> {
        let span = tracing::debug_span!("coordinator.renew", %id);
        self.guard
            .run(move || async move {
                let mut record = self.load_one(id).await?;
                if record.status != JobStatus::InProgress {
                    return Err(CoordinatorError::IllegalTransition {
                        id: record.id,
                        from: record.status,
                        to: JobStatus::InProgress,
                    });
                }

                record.lease_expires_at = self.lease_from(self.clock.utc_now());
                self.save(&record).await?;
                tracing::trace!(lease_expires_at = ?record.lease_expires_at, "renewed");
                Ok(record)
            })
            .instrument(span)
            .await
    }

    /// Record the terminal status of `id`
    ///
    /// `error` is kept only for failed jobs. Fails with `NotFound` when `id`
    /// was never submitted and with `IllegalTransition` when the record is
    /// already terminal or `status` is not a legal terminal move.
    pub async fn complete(
        &self,
        id: &JobId,
        status: JobStatus,
        error: Option<String>,
    ) -> Result<JobRecord, CoordinatorError> {
        let span = tracing::info_span!("coordinator.complete", %id, %status);
        self.guard
            .run(move || async move {
                let record = self.load_one(id).await?;
                if !status.is_terminal() {
                    return Err(CoordinatorError::IllegalTransition {
                        id: record.id,
                        from: record.status,
                        to: status,
                    });
                }
                ensure_transition(&record, status)?;

                let mut record = record;
                record.status = status;
                record.run_time = Some(record.elapsed(self.clock.utc_now()));
                record.error = match status {
                    JobStatus::Failed => error,
                    _ => None,
                };
                self.save(&record).await?;

                tracing::info!(
                    run_time_ms = record.run_time.map(|d| d.as_millis() as u64),
                    error = record.error.as_deref(),
                    "completed"
                );
                Ok(record)
            })
            .instrument(span)
            .await
    }

    /// The job that would be granted next, if any
    pub async fn first_in_line(&self) -> Result<Option<JobRecord>, CoordinatorError> {
        self.guard
            .run(move || async move { self.load_first_in_line().await })
            .await
    }

    /// Every job record ordered by submission, read in a single store call
    pub async fn jobs(&self) -> Result<Vec<JobRecord>, CoordinatorError> {
        let lock_id = Value::String(self.config.lock_key.clone());
        let mut jobs = self
            .store
            .find_many(&Filter::new())
            .await?
            .into_iter()
            .filter(|doc| doc.get(ID_FIELD) != Some(&lock_id))
            .map(JobRecord::from_document)
            .collect::<Result<Vec<_>, _>>()?;
        jobs.sort_by(|a, b| a.queue_key().cmp(&b.queue_key()));
        Ok(jobs)
    }

    /// Whether `id` may take the turn at `now`
    async fn turn_for(&self, id: &JobId, now: DateTime<Utc>) -> Result<Turn, CoordinatorError> {
        let running = self.load(&status_filter(JobStatus::InProgress)).await?;
        if let Some(holder) = running.into_iter().find(|r| r.holds_turn(now)) {
            return Ok(Turn::HeldBy(holder.id));
        }

        let pending = self.load(&status_filter(JobStatus::Pending)).await?;
        if first_waiting(pending, now).is_some_and(|first| &first.id == id) {
            Ok(Turn::Granted)
        } else {
            Ok(Turn::NotFirst)
        }
    }

    async fn load(&self, filter: &Filter) -> Result<Vec<JobRecord>, CoordinatorError> {
        self.store
            .find_many(filter)
            .await?
            .into_iter()
            .map(|doc| JobRecord::from_document(doc).map_err(CoordinatorError::from))
            .collect()
    }

    async fn load_one(&self, id: &JobId) -> Result<JobRecord, CoordinatorError> {
        match self.store.find_one(&Filter::by_id(id)).await? {
            Some(doc) => Ok(JobRecord::from_document(doc)?),
            None => Err(CoordinatorError::NotFound(id.clone())),
        }
    }

    async fn load_first_in_line(&self) -> Result<Option<JobRecord>, CoordinatorError> {
        let pending = self.load(&status_filter(JobStatus::Pending)).await?;
        Ok(first_waiting(pending, self.clock.utc_now()))
    }

    async fn save(&self, record: &JobRecord) -> Result<(), CoordinatorError> {
        let updated = self
            .store
            .update_one(&Filter::by_id(&record.id), record.to_document()?)
            .await?;
        match updated {
            Some(_) => Ok(()),
            None => Err(CoordinatorError::NotFound(record.id.clone())),
        }
    }

    fn lease_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.config.turn_lease.map(|lease| utc_after(now, lease))
    }
}

enum Turn {
    Granted,
    HeldBy(JobId),
    NotFirst,
}

fn status_filter(status: JobStatus) -> Filter {
    Filter::new().eq("status", status)
}

/// Earliest still-waiting record; equal timestamps fall back to id order
fn first_waiting(records: Vec<JobRecord>, now: DateTime<Utc>) -> Option<JobRecord> {
    records
        .into_iter()
        .filter(|r| r.is_waiting(now))
        .min_by(|a, b| a.queue_key().cmp(&b.queue_key()))
}

fn ensure_transition(record: &JobRecord, to: JobStatus) -> Result<(), CoordinatorError> {
    if record.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(CoordinatorError::IllegalTransition {
            id: record.id.clone(),
            from: record.status,
            to,
        })
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
