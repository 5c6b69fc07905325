// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! baton-core: shared data types for the baton turn-taking protocol
//!
//! This crate provides:
//! - Job records and their status state machine
//! - Equality-filtered JSON documents as exchanged with the shared store
//! - Clock and id sources that can be faked in tests

pub mod clock;
pub mod document;
pub mod id;
pub mod job;

pub use clock::{utc_after, Clock, FakeClock, SystemClock};
pub use document::{Document, Filter, ID_FIELD};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use job::{JobId, JobRecord, JobStatus};
