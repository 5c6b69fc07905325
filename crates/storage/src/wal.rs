// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead log backed store
//!
//! Keeps the live documents in a [`MemoryStore`] and appends one log entry per
//! affected document for every successful mutation, so terminal job records
//! survive a restart for audit.

use crate::memory::{self, doc_id, MemoryStore};
use crate::store::{Store, StoreError};
use async_trait::async_trait;
use baton_core::{Document, Filter, ID_FIELD};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors that can occur in WAL operations
#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt WAL entry {seq}: {reason}")]
    Corrupt { seq: u64, reason: String },
}

/// A logged store mutation, resolved to concrete document ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WalOp {
    Insert { doc: Document },
    Update { id: Value, patch: Document },
    Delete { id: Value },
}

impl WalOp {
    /// Replay this operation onto a document list
    fn apply(self, docs: &mut Vec<Document>) -> Result<(), String> {
        match self {
            WalOp::Insert { doc } => memory::insert_doc(docs, doc).map_err(|e| e.to_string()),
            WalOp::Update { id, patch } => {
                let filter = Filter::by_id(id.clone());
                let updated = memory::update_matching(docs, &filter, &patch, Some(1));
                if updated.is_empty() {
                    return Err(format!("update of unknown id {}", id));
                }
                Ok(())
            }
            WalOp::Delete { id } => {
                memory::delete_matching(docs, &Filter::by_id(id), Some(1));
                Ok(())
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WalEntry {
    seq: u64,
    op: WalOp,
}

/// Append-only JSON-lines log of store mutations
///
/// Each line holds one `{seq, op}` entry. Sequence numbers start at 1 and grow
/// by one per entry; a gap or an unparseable line marks the log corrupt.
pub struct Wal {
    file: File,
    sequence: u64,
}

impl Wal {
    /// Open or create the log at `path`, continuing its sequence
    pub fn open(path: &Path) -> Result<Self, WalError> {
        let sequence = read_entries(path)?.last().map_or(0, |entry| entry.seq);
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file, sequence })
    }

    /// Durably record `op`, returning its sequence number
    pub fn append(&mut self, op: &WalOp) -> Result<u64, WalError> {
        let entry = WalEntry {
            seq: self.sequence + 1,
            op: op.clone(),
        };
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');
        self.file.write_all(&line)?;
        self.file.sync_data()?;
        self.sequence = entry.seq;
        Ok(self.sequence)
    }

    /// Sequence number of the last recorded entry
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Every operation recorded at `path`, in order. A missing file is an
    /// empty log.
    pub fn replay(path: &Path) -> Result<Vec<WalOp>, WalError> {
        Ok(read_entries(path)?
            .into_iter()
            .map(|entry| entry.op)
            .collect())
    }

    /// Rebuild the document list a log describes
    pub fn materialize(path: &Path) -> Result<Vec<Document>, WalError> {
        let mut docs = Vec::new();
        for WalEntry { seq, op } in read_entries(path)? {
            op.apply(&mut docs)
                .map_err(|reason| WalError::Corrupt { seq, reason })?;
        }
        Ok(docs)
    }
}

fn read_entries(path: &Path) -> Result<Vec<WalEntry>, WalError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut entries: Vec<WalEntry> = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let seq = entries.last().map_or(1, |entry| entry.seq + 1);
        let entry: WalEntry = serde_json::from_str(&line).map_err(|e| WalError::Corrupt {
            seq,
            reason: e.to_string(),
        })?;
        if entry.seq != seq {
            return Err(WalError::Corrupt {
                seq,
                reason: format!("found sequence {}", entry.seq),
            });
        }
        entries.push(entry);
    }
    Ok(entries)
}

/// Store that persists every mutation to a [`Wal`]
///
/// Apply and append happen under the log mutex, so log order is apply order.
#[derive(Clone)]
pub struct WalStore {
    memory: MemoryStore,
    wal: Arc<Mutex<Wal>>,
}

impl WalStore {
    /// Open the log at `path`, replaying any existing entries
    pub fn open(path: &Path) -> Result<Self, WalError> {
        let docs = Wal::materialize(path)?;
        let wal = Wal::open(path)?;
        tracing::debug!(
            path = %path.display(),
            documents = docs.len(),
            sequence = wal.sequence(),
            "opened WAL store"
        );
        Ok(Self {
            memory: MemoryStore::from_documents(docs),
            wal: Arc::new(Mutex::new(wal)),
        })
    }

    /// Copy of every live document in insertion order
    pub fn snapshot(&self) -> Vec<Document> {
        self.memory.snapshot()
    }

    /// Run a mutation against the live documents and log what it produced
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Vec<Document>) -> Result<(T, Vec<WalOp>), StoreError>,
    ) -> Result<T, StoreError> {
        let mut wal = self.wal.lock().unwrap_or_else(|e| e.into_inner());
        let mut docs = self.memory.lock();
        let (value, ops) = f(&mut *docs)?;
        for op in &ops {
            wal.append(op)?;
        }
        Ok(value)
    }
}

fn update_ops(updated: &[Document], patch: &Document) -> Vec<WalOp> {
    updated
        .iter()
        .filter_map(|doc| doc.get(ID_FIELD))
        .map(|id| WalOp::Update {
            id: id.clone(),
            patch: patch.clone(),
        })
        .collect()
}

fn delete_ops(removed: &[Document]) -> Vec<WalOp> {
    removed
        .iter()
        .filter_map(|doc| doc.get(ID_FIELD))
        .map(|id| WalOp::Delete { id: id.clone() })
        .collect()
}

#[async_trait]
impl Store for WalStore {
    async fn insert(&self, doc: Document) -> Result<(), StoreError> {
        self.memory.simulate_latency().await;
        self.mutate(|docs| {
            doc_id(&doc)?;
            let op = WalOp::Insert { doc: doc.clone() };
            memory::insert_doc(docs, doc)?;
            Ok(((), vec![op]))
        })
    }

    async fn insert_many(&self, batch: Vec<Document>) -> Result<(), StoreError> {
        self.memory.simulate_latency().await;
        self.mutate(|docs| {
            let ops = batch
                .iter()
                .map(|doc| WalOp::Insert { doc: doc.clone() })
                .collect();
            memory::insert_all(docs, batch)?;
            Ok(((), ops))
        })
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, StoreError> {
        self.memory.find_one(filter).await
    }

    async fn find_many(&self, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        self.memory.find_many(filter).await
    }

    async fn count(&self, filter: &Filter) -> Result<usize, StoreError> {
        self.memory.count(filter).await
    }

    async fn update_one(
        &self,
        filter: &Filter,
        patch: Document,
    ) -> Result<Option<Document>, StoreError> {
        self.mutate(|docs| {
            let updated = memory::update_matching(docs, filter, &patch, Some(1));
            let ops = update_ops(&updated, &patch);
            Ok((updated.into_iter().next(), ops))
        })
    }

    async fn update_many(&self, filter: &Filter, patch: Document) -> Result<usize, StoreError> {
        self.mutate(|docs| {
            let updated = memory::update_matching(docs, filter, &patch, None);
            Ok((updated.len(), update_ops(&updated, &patch)))
        })
    }

    async fn delete_one(&self, filter: &Filter) -> Result<bool, StoreError> {
        self.mutate(|docs| {
            let removed = memory::delete_matching(docs, filter, Some(1));
            Ok((!removed.is_empty(), delete_ops(&removed)))
        })
    }

    async fn delete_many(&self, filter: &Filter) -> Result<usize, StoreError> {
        self.mutate(|docs| {
            let removed = memory::delete_matching(docs, filter, None);
            Ok((removed.len(), delete_ops(&removed)))
        })
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
