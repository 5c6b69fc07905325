// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Shared store adapters
//!
//! The store offers primitive, individually atomic operations over
//! equality-filtered documents. Composing a read with a later write is the
//! caller's responsibility.

mod memory;
mod store;
mod traced;
mod wal;

pub use memory::MemoryStore;
pub use store::{Store, StoreError};
pub use traced::TracedStore;
pub use wal::{Wal, WalError, WalOp, WalStore};
