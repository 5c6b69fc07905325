// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process store shared between participants through cloned handles

use crate::store::{Store, StoreError};
use async_trait::async_trait;
use baton_core::{Document, Filter, ID_FIELD};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Insertion-ordered in-memory document store
///
/// Every method is atomic on its own. Clones share the same documents, so
/// handing a clone to each participant models one store reached from many
/// machines.
#[derive(Clone, Default)]
pub struct MemoryStore {
    docs: Arc<Mutex<Vec<Document>>>,
    insert_latency: Duration,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep before every insert, widening the window between a participant's
    /// read and its write the way a network round trip would
    pub fn with_insert_latency(mut self, latency: Duration) -> Self {
        self.insert_latency = latency;
        self
    }

    /// Build a store holding the given documents, in order
    pub(crate) fn from_documents(docs: Vec<Document>) -> Self {
        Self {
            docs: Arc::new(Mutex::new(docs)),
            insert_latency: Duration::ZERO,
        }
    }

    /// Copy of every stored document in insertion order
    pub fn snapshot(&self) -> Vec<Document> {
        self.lock().clone()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Vec<Document>> {
        self.docs.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) async fn simulate_latency(&self) {
        if !self.insert_latency.is_zero() {
            tokio::time::sleep(self.insert_latency).await;
        }
    }
}

pub(crate) fn doc_id(doc: &Document) -> Result<&Value, StoreError> {
    doc.get(ID_FIELD).ok_or(StoreError::MissingId)
}

fn contains_id(docs: &[Document], id: &Value) -> bool {
    docs.iter().any(|d| d.get(ID_FIELD) == Some(id))
}

pub(crate) fn insert_doc(docs: &mut Vec<Document>, doc: Document) -> Result<(), StoreError> {
    let id = doc_id(&doc)?;
    if contains_id(docs, id) {
        return Err(StoreError::DuplicateKey(id.to_string()));
    }
    docs.push(doc);
    Ok(())
}

/// Validate the whole batch before touching the store so a duplicate leaves
/// nothing behind
pub(crate) fn insert_all(docs: &mut Vec<Document>, batch: Vec<Document>) -> Result<(), StoreError> {
    for (i, doc) in batch.iter().enumerate() {
        let id = doc_id(doc)?;
        if contains_id(docs, id) || contains_id(&batch[..i], id) {
            return Err(StoreError::DuplicateKey(id.to_string()));
        }
    }
    docs.extend(batch);
    Ok(())
}

/// Apply `patch` to up to `limit` matches and return the updated documents.
/// The id field is immutable and is skipped if present in the patch.
pub(crate) fn update_matching(
    docs: &mut [Document],
    filter: &Filter,
    patch: &Document,
    limit: Option<usize>,
) -> Vec<Document> {
    let mut updated = Vec::new();
    for doc in docs.iter_mut().filter(|d| filter.matches(d)) {
        if limit.is_some_and(|n| updated.len() >= n) {
            break;
        }
        for (field, value) in patch {
            if field != ID_FIELD {
                doc.insert(field.clone(), value.clone());
            }
        }
        updated.push(doc.clone());
    }
    updated
}

/// Remove up to `limit` matches and return them
pub(crate) fn delete_matching(
    docs: &mut Vec<Document>,
    filter: &Filter,
    limit: Option<usize>,
) -> Vec<Document> {
    let mut removed = Vec::new();
    let mut kept = Vec::with_capacity(docs.len());
    for doc in docs.drain(..) {
        if filter.matches(&doc) && !limit.is_some_and(|n| removed.len() >= n) {
            removed.push(doc);
        } else {
            kept.push(doc);
        }
    }
    *docs = kept;
    removed
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert(&self, doc: Document) -> Result<(), StoreError> {
        self.simulate_latency().await;
        insert_doc(&mut self.lock(), doc)
    }

    async fn insert_many(&self, docs: Vec<Document>) -> Result<(), StoreError> {
        self.simulate_latency().await;
        insert_all(&mut self.lock(), docs)
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, StoreError> {
        Ok(self.lock().iter().find(|d| filter.matches(d)).cloned())
    }

    async fn find_many(&self, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .lock()
            .iter()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &Filter) -> Result<usize, StoreError> {
        Ok(self.lock().iter().filter(|d| filter.matches(d)).count())
    }

    async fn update_one(
        &self,
        filter: &Filter,
        patch: Document,
    ) -> Result<Option<Document>, StoreError> {
        Ok(update_matching(&mut self.lock(), filter, &patch, Some(1))
            .into_iter()
            .next())
    }

    async fn update_many(&self, filter: &Filter, patch: Document) -> Result<usize, StoreError> {
        Ok(update_matching(&mut self.lock(), filter, &patch, None).len())
    }

    async fn delete_one(&self, filter: &Filter) -> Result<bool, StoreError> {
        Ok(!delete_matching(&mut self.lock(), filter, Some(1)).is_empty())
    }

    async fn delete_many(&self, filter: &Filter) -> Result<usize, StoreError> {
        Ok(delete_matching(&mut self.lock(), filter, None).len())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
