// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling
//!
//! Deadlines and polling use the monotonic [`Instant`]; values written to the
//! shared store use wall-clock UTC so other participants can compare them.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A clock that provides the current time
pub trait Clock: Clone + Send + Sync + 'static {
    /// Monotonic time, for deadlines local to one participant
    fn now(&self) -> Instant;

    /// Wall-clock time, for timestamps shared through the store
    fn utc_now(&self) -> DateTime<Utc>;
}

/// Real system clock
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Clone, Copy)]
struct FakeTime {
    instant: Instant,
    utc: DateTime<Utc>,
}

/// Fake clock for testing with controllable time
///
/// Both readings move together, so a test can reason about submission
/// timestamps and deadlines with one `advance` call.
#[derive(Clone)]
pub struct FakeClock {
    current: Arc<Mutex<FakeTime>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new(FakeTime {
                instant: Instant::now(),
                utc: Utc::now(),
            })),
        }
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        current.instant += duration;
        current.utc = utc_after(current.utc, duration);
    }

    /// Move only the wall clock, leaving monotonic time untouched.
    ///
    /// Simulates a participant whose system clock was stepped.
    pub fn skew_utc(&self, offset: chrono::Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        current.utc = current
            .utc
            .checked_add_signed(offset)
            .unwrap_or(current.utc);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).instant
    }

    fn utc_now(&self) -> DateTime<Utc> {
        self.current.lock().unwrap_or_else(|e| e.into_inner()).utc
    }
}

/// `at + duration`, saturating at the largest representable timestamp
pub fn utc_after(at: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| at.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
