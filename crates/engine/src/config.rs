// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

//! Runtime-mutable configuration for the tick loop and its adaptive
//! controller (§4.4 inputs, §4.4.3, §6 "Configuration surface... mutable at
//! runtime. No persisted state.").

use std::time::Duration;

/// The §4.4 inputs, builder-style so a host can configure an [`crate::Engine`]
/// with `engine.configure(|cfg| cfg.with_one_rpc_per_update(true))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickLoopConfig {
    pub one_rpc_per_update: bool,
    pub max_time_per_update: Duration,
    pub blocking_recv: bool,
    pub recv_timeout: Duration,
}

impl Default for TickLoopConfig {
    fn default() -> Self {
        Self {
            one_rpc_per_update: false,
            max_time_per_update: Duration::from_micros(10_000),
            blocking_recv: false,
            recv_timeout: Duration::ZERO,
        }
    }
}

impl TickLoopConfig {
    pub fn with_one_rpc_per_update(mut self, value: bool) -> Self {
        self.one_rpc_per_update = value;
        self
    }

    pub fn with_max_time_per_update(mut self, value: Duration) -> Self {
        self.max_time_per_update = value;
        self
    }

    pub fn with_blocking_recv(mut self, value: bool) -> Self {
        self.blocking_recv = value;
        self
    }

    pub fn with_recv_timeout(mut self, value: Duration) -> Self {
        self.recv_timeout = value;
        self
    }
}

/// The §4.4.3 adaptive rate controller's tunables, made configurable rather
/// than hard-coded so tests can exercise convergence without waiting on a
/// real 1/59s target (SPEC_FULL, Configuration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdaptiveControllerConfig {
    pub target_tick_period: Duration,
    pub step: Duration,
    pub floor: Duration,
    pub ceiling: Duration,
    pub idle_exec_threshold: Duration,
    pub idle_reset_to: Duration,
}

impl Default for AdaptiveControllerConfig {
    fn default() -> Self {
        Self {
            target_tick_period: Duration::from_nanos(1_000_000_000 / 59),
            step: Duration::from_micros(100),
            floor: Duration::from_micros(1_000),
            ceiling: Duration::from_micros(25_000),
            idle_exec_threshold: Duration::from_millis(1),
            idle_reset_to: Duration::from_micros(10_000),
        }
    }
}

/// The §4.7 smoothing factor, shared by every EMA the Statistics Surface
/// maintains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmaConfig {
    pub alpha: f64,
}

impl Default for EmaConfig {
    fn default() -> Self {
        Self { alpha: tickrpc_core::Ema::DEFAULT_ALPHA }
    }
}
