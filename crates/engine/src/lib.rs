// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Baton turn-taking engine
//!
//! Layers a FIFO, one-at-a-time admission protocol over a store that only
//! offers primitive, individually atomic operations:
//! - **CriticalSection** - advisory lock built from insert-if-absent and delete
//! - **Coordinator** - submit, poll for turn, start, complete
//! - **Admission** - the participant loop that drives a [`Worker`] through one turn

mod admission;
mod config;
mod coordinator;
mod error;
mod guard;
mod worker;

pub use admission::{Admission, Outcome, LEASE_LOST_REASON, TIMEOUT_REASON};
pub use config::CoordinatorConfig;
pub use coordinator::{Coordinator, OUT_OF_ORDER_REASON};
pub use error::{CoordinatorError, GuardError};
pub use guard::CriticalSection;
pub use worker::{WorkError, Worker};
