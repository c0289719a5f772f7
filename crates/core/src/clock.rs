// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable timestamps

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock time for status reports.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Seconds since the Unix epoch.
    fn epoch_secs(&self) -> i64;
}

/// Clock backed by the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_secs(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default()
    }
}

/// Manually driven clock for tests.
#[derive(Clone, Debug)]
pub struct FakeClock {
    secs: Arc<Mutex<i64>>,
}

impl FakeClock {
    pub fn new(start: i64) -> Self {
        Self {
            secs: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, secs: i64) {
        *self.secs.lock() += secs;
    }

    pub fn set(&self, secs: i64) {
        *self.secs.lock() = secs;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(1_700_000_000)
    }
}

impl Clock for FakeClock {
    fn epoch_secs(&self) -> i64 {
        *self.secs.lock()
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
