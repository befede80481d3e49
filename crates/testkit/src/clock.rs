// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

use std::time::Duration;

use parking_lot::Mutex;
use tickrpc_core::{Clock, Instant};

/// A settable [`Clock`] for deterministic budget/EMA tests — no sleeping,
/// no timing flakiness.
pub struct ManualClock {
    offset: Mutex<Duration>,
    universal: Mutex<f64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { offset: Mutex::new(Duration::ZERO), universal: Mutex::new(0.0) }
    }

    /// Move the monotonic source forward by `d`.
    pub fn advance(&self, d: Duration) {
        *self.offset.lock() += d;
    }

    /// Set the value the next `universal_time()` call returns.
    pub fn set_universal_time(&self, time: f64) {
        *self.universal.lock() = time;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        Instant::from_epoch(*self.offset.lock())
    }

    fn universal_time(&self) -> f64 {
        *self.universal.lock()
    }
}
