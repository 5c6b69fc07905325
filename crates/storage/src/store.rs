// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store contract

use crate::wal::WalError;
use async_trait::async_trait;
use baton_core::{Document, Filter};
use thiserror::Error;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key: {0}")]
    DuplicateKey(String),
    #[error("document has no `id` field")]
    MissingId,
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),
}

impl StoreError {
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, StoreError::DuplicateKey(_))
    }
}

/// A keyed document store with per-call atomicity and no transactions
///
/// "First" always means first in insertion order.
#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    /// Insert a document, failing with `DuplicateKey` if its id is taken
    async fn insert(&self, doc: Document) -> Result<(), StoreError>;

    /// Insert all documents or none of them
    async fn insert_many(&self, docs: Vec<Document>) -> Result<(), StoreError>;

    /// First document matching the filter
    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, StoreError>;

    /// All documents matching the filter
    async fn find_many(&self, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    /// Number of documents matching the filter
    async fn count(&self, filter: &Filter) -> Result<usize, StoreError>;

    /// Overwrite the patch fields of the first match; `None` when nothing matched
    async fn update_one(
        &self,
        filter: &Filter,
        patch: Document,
    ) -> Result<Option<Document>, StoreError>;

    /// Overwrite the patch fields of every match, returning how many changed
    async fn update_many(&self, filter: &Filter, patch: Document) -> Result<usize, StoreError>;

    /// Remove the first match, returning whether anything was removed
    async fn delete_one(&self, filter: &Filter) -> Result<bool, StoreError>;

    /// Remove every match, returning how many were removed
    async fn delete_many(&self, filter: &Filter) -> Result<usize, StoreError>;
}
