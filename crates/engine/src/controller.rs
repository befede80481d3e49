// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

//! The adaptive rate controller (§4.4.3): retunes `MaxTimePerUpdate` toward a
//! target tick period after every tick.

use std::time::Duration;

use crate::config::AdaptiveControllerConfig;

/// Stateless given the previous tick's measurements — holds only its tunables.
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveController {
    config: AdaptiveControllerConfig,
}

impl AdaptiveController {
    pub fn new(config: AdaptiveControllerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> AdaptiveControllerConfig {
        self.config
    }

    pub fn set_config(&mut self, config: AdaptiveControllerConfig) {
        self.config = config;
    }

    /// Compute the next `MaxTimePerUpdate` from the just-measured tick.
    ///
    /// `exec_time_per_update` is the execute phase's total duration this
    /// tick (`ExecTimePerRPCUpdate` in §4.4.3) — the idle guard fires when
    /// the tick barely did any work, not per individual RPC.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn adjust(&self, current: Duration, measured_tick: Duration, exec_time_per_update: Duration) -> Duration {
        let next = if measured_tick > self.config.target_tick_period {
            current.saturating_sub(self.config.step).max(self.config.floor)
        } else if exec_time_per_update < self.config.idle_exec_threshold {
            self.config.idle_reset_to
        } else {
            (current + self.config.step).min(self.config.ceiling)
        };

        if next != current {
            tracing::debug!(
                from_us = current.as_micros() as u64,
                to_us = next.as_micros() as u64,
                "adaptive controller adjusted max_time_per_update"
            );
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> AdaptiveController {
        AdaptiveController::new(AdaptiveControllerConfig::default())
    }

    #[test]
    fn a_slow_tick_decreases_the_budget() {
        let c = controller();
        let current = Duration::from_micros(10_000);
        let next = c.adjust(current, Duration::from_millis(20), Duration::from_millis(20));
        assert_eq!(next, current - Duration::from_micros(100));
    }

    #[test]
    fn the_budget_never_drops_below_the_floor() {
        let c = controller();
        let next = c.adjust(Duration::from_micros(1_050), Duration::from_millis(20), Duration::from_millis(20));
        assert_eq!(next, Duration::from_micros(1_000));
    }

    #[test]
    fn an_idle_tick_re_arms_to_ten_milliseconds() {
        let c = controller();
        let next = c.adjust(Duration::from_micros(1_000), Duration::from_micros(500), Duration::from_micros(200));
        assert_eq!(next, Duration::from_micros(10_000));
    }

    #[test]
    fn a_fast_but_busy_tick_increases_the_budget_up_to_the_ceiling() {
        let c = controller();
        let next =
            c.adjust(Duration::from_micros(24_950), Duration::from_micros(500), Duration::from_millis(2));
        assert_eq!(next, Duration::from_micros(25_000));
    }

    #[test]
    fn repeated_slow_ticks_converge_to_the_floor() {
        let c = controller();
        let mut current = Duration::from_micros(10_000);
        for _ in 0..200 {
            current = c.adjust(current, Duration::from_millis(20), Duration::from_millis(20));
        }
        assert_eq!(current, Duration::from_micros(1_000));
    }
}
