// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory lock built from insert-if-absent and delete
//!
//! Holding the lock means "our lock document is in the store". Acquisition
//! retries on `DuplicateKey` until the configured timeout. The lock is not
//! re-entrant: a holder that acquires again waits until its own timeout.
//!
//! A participant that dies between acquire and release leaves the lock
//! document behind; nothing reclaims it.

use crate::config::CoordinatorConfig;
use crate::error::GuardError;
use baton_core::{Clock, Document, Filter, ID_FIELD};
use baton_storage::Store;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// Mutual exclusion across every participant sharing one store
#[derive(Clone)]
pub struct CriticalSection<S, C> {
    store: S,
    clock: C,
    key: String,
    retry_interval: Duration,
    timeout: Duration,
}

impl<S: Store, C: Clock> CriticalSection<S, C> {
    pub fn new(store: S, clock: C, config: &CoordinatorConfig) -> Self {
        Self {
            store,
            clock,
            key: config.lock_key.clone(),
            retry_interval: config.lock_retry_interval,
            timeout: config.lock_timeout,
        }
    }

    /// Id of the lock document
    pub fn key(&self) -> &str {
        &self.key
    }

    fn lock_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert(ID_FIELD.to_string(), Value::String(self.key.clone()));
        doc
    }

    /// Block until the lock document is ours or the timeout elapses
    pub async fn acquire(&self) -> Result<(), GuardError> {
        let start = self.clock.now();
        let mut attempts: u64 = 0;

        loop {
            attempts += 1;
            match self.store.insert(self.lock_document()).await {
                Ok(()) => {
                    tracing::trace!(key = %self.key, attempts, "lock acquired");
                    return Ok(());
                }
                Err(e) if e.is_duplicate_key() => {}
                Err(e) => return Err(e.into()),
            }

            let waited = self.clock.now().duration_since(start);
            if waited >= self.timeout {
                tracing::warn!(
                    key = %self.key,
                    attempts,
                    waited_ms = waited.as_millis() as u64,
                    "gave up waiting for lock"
                );
                return Err(GuardError::Timeout {
                    key: self.key.clone(),
                    waited,
                });
            }
            tokio::time::sleep(self.retry_interval.min(self.timeout - waited)).await;
        }
    }

    /// Remove the lock document. Returns false when the lock was not held.
    pub async fn release(&self) -> Result<bool, GuardError> {
        let removed = self
            .store
            .delete_one(&Filter::by_id(self.key.as_str()))
            .await?;
        if removed {
            tracing::trace!(key = %self.key, "lock released");
        } else {
            tracing::debug!(key = %self.key, "release of a lock that was not held");
        }
        Ok(removed)
    }

    /// Run `f` while holding the lock
    ///
    /// The lock is released after `f` finishes, whether it returned `Ok` or
    /// `Err`. A failed release is logged and does not replace `f`'s result.
    pub async fn run<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<GuardError>,
    {
        self.acquire().await?;
        let result = f().await;
        if let Err(e) = self.release().await {
            tracing::error!(key = %self.key, error = %e, "failed to release lock");
        }
        result
    }
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
