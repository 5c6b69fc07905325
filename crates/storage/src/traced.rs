// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced store wrapper for consistent observability

use crate::store::{Store, StoreError};
use async_trait::async_trait;
use baton_core::{Document, Filter};
use std::time::Instant;

/// Wrapper that adds tracing to any Store
#[derive(Clone)]
pub struct TracedStore<S> {
    inner: S,
}

impl<S> TracedStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[async_trait]
impl<S: Store> Store for TracedStore<S> {
    async fn insert(&self, doc: Document) -> Result<(), StoreError> {
        let id = doc.get(baton_core::ID_FIELD).cloned().unwrap_or_default();
        let start = Instant::now();
        let result = self.inner.insert(doc).await;

        match &result {
            Ok(()) => tracing::debug!(%id, elapsed_ms = elapsed_ms(start), "store.insert"),
            // Contention on the lock key is the normal case, not a failure
            Err(StoreError::DuplicateKey(_)) => {
                tracing::debug!(%id, elapsed_ms = elapsed_ms(start), "store.insert duplicate")
            }
            Err(e) => tracing::error!(%id, error = %e, "store.insert failed"),
        }

        result
    }

    async fn insert_many(&self, docs: Vec<Document>) -> Result<(), StoreError> {
        let count = docs.len();
        let result = self.inner.insert_many(docs).await;
        match &result {
            Ok(()) => tracing::debug!(count, "store.insert_many"),
            Err(e) => tracing::warn!(count, error = %e, "store.insert_many failed"),
        }
        result
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, StoreError> {
        let result = self.inner.find_one(filter).await;
        tracing::trace!(
            %filter,
            found = result.as_ref().map(|d| d.is_some()).ok(),
            "store.find_one"
        );
        result
    }

    async fn find_many(&self, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let result = self.inner.find_many(filter).await;
        tracing::trace!(
            %filter,
            count = result.as_ref().map(|v| v.len()).ok(),
            "store.find_many"
        );
        result
    }

    async fn count(&self, filter: &Filter) -> Result<usize, StoreError> {
        let result = self.inner.count(filter).await;
        tracing::trace!(%filter, count = result.as_ref().ok(), "store.count");
        result
    }

    async fn update_one(
        &self,
        filter: &Filter,
        patch: Document,
    ) -> Result<Option<Document>, StoreError> {
        let start = Instant::now();
        let result = self.inner.update_one(filter, patch).await;

        match &result {
            Ok(Some(_)) => {
                tracing::debug!(%filter, elapsed_ms = elapsed_ms(start), "store.update_one")
            }
            Ok(None) => tracing::warn!(%filter, "store.update_one matched nothing"),
            Err(e) => tracing::error!(%filter, error = %e, "store.update_one failed"),
        }

        result
    }

    async fn update_many(&self, filter: &Filter, patch: Document) -> Result<usize, StoreError> {
        let result = self.inner.update_many(filter, patch).await;
        match &result {
            Ok(count) => tracing::debug!(%filter, count, "store.update_many"),
            Err(e) => tracing::error!(%filter, error = %e, "store.update_many failed"),
        }
        result
    }

    async fn delete_one(&self, filter: &Filter) -> Result<bool, StoreError> {
        let result = self.inner.delete_one(filter).await;
        match &result {
            Ok(removed) => tracing::debug!(%filter, removed, "store.delete_one"),
            Err(e) => tracing::error!(%filter, error = %e, "store.delete_one failed"),
        }
        result
    }

    async fn delete_many(&self, filter: &Filter) -> Result<usize, StoreError> {
        let result = self.inner.delete_many(filter).await;
        match &result {
            Ok(count) => tracing::debug!(%filter, count, "store.delete_many"),
            Err(e) => tracing::error!(%filter, error = %e, "store.delete_many failed"),
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
