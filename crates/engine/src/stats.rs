// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

//! The Statistics Surface (§4.7): EMAs for bytes read/written per second, RPC
//! rate, time/poll/execute time per tick, stream RPC rate, and stream time
//! per tick, plus the observability-only counters from SPEC_FULL's restored
//! features.

use std::time::Duration;

use tickrpc_core::Ema;

use crate::config::EmaConfig;

/// An owned, `Copy` view of the statistics surface (SPEC_FULL restored
/// feature 4): observers read a snapshot rather than holding a reference into
/// live state, matching §5's "observers read them without synchronization...
/// word-sized" guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatsSnapshot {
    pub bytes_read_per_sec: f64,
    pub bytes_written_per_sec: f64,
    pub rpc_rate: f64,
    pub time_per_tick_secs: f64,
    pub poll_time_per_tick_secs: f64,
    pub exec_time_per_tick_secs: f64,
    pub stream_rpc_rate: f64,
    pub stream_time_per_tick_secs: f64,
    pub rpcs_executed_last_tick: u64,
    pub stream_rpcs_executed_last_tick: u64,
    /// Highest `resume_count` observed on any continuation so far
    /// (SPEC_FULL restored feature 1) — a gauge, never reset.
    pub max_resume_count_seen: u32,
    pub total_bytes_read: u64,
    pub total_bytes_written: u64,
}

pub struct Stats {
    bytes_read_per_sec: Ema,
    bytes_written_per_sec: Ema,
    rpc_rate: Ema,
    time_per_tick: Ema,
    poll_time_per_tick: Ema,
    exec_time_per_tick: Ema,
    stream_rpc_rate: Ema,
    stream_time_per_tick: Ema,
    last_bytes_read: u64,
    last_bytes_written: u64,
    rpcs_executed_last_tick: u64,
    stream_rpcs_executed_last_tick: u64,
    max_resume_count_seen: u32,
}

impl Stats {
    pub fn new(config: EmaConfig) -> Self {
        let fresh = || Ema::new(config.alpha).unwrap_or_default();
        Self {
            bytes_read_per_sec: fresh(),
            bytes_written_per_sec: fresh(),
            rpc_rate: fresh(),
            time_per_tick: fresh(),
            poll_time_per_tick: fresh(),
            exec_time_per_tick: fresh(),
            stream_rpc_rate: fresh(),
            stream_time_per_tick: fresh(),
            last_bytes_read: 0,
            last_bytes_written: 0,
            rpcs_executed_last_tick: 0,
            stream_rpcs_executed_last_tick: 0,
            max_resume_count_seen: 0,
        }
    }

    /// Fold one tick's measurements into every EMA. `total_bytes_*` are
    /// cumulative counters aggregated across attached transports (§4.7);
    /// this computes their per-tick delta to feed the rate EMAs.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn record_tick(
        &mut self,
        tick_elapsed: Duration,
        poll_elapsed: Duration,
        exec_elapsed: Duration,
        stream_elapsed: Duration,
        rpcs_executed: u64,
        stream_rpcs_executed: u64,
        total_bytes_read: u64,
        total_bytes_written: u64,
    ) {
        let seconds = tick_elapsed.as_secs_f64().max(f64::MIN_POSITIVE);
        let delta_read = total_bytes_read.saturating_sub(self.last_bytes_read);
        let delta_written = total_bytes_written.saturating_sub(self.last_bytes_written);
        self.last_bytes_read = total_bytes_read;
        self.last_bytes_written = total_bytes_written;

        self.bytes_read_per_sec.update(delta_read as f64 / seconds);
        self.bytes_written_per_sec.update(delta_written as f64 / seconds);
        self.rpc_rate.update(rpcs_executed as f64 / seconds);
        self.time_per_tick.update(tick_elapsed.as_secs_f64());
        self.poll_time_per_tick.update(poll_elapsed.as_secs_f64());
        self.exec_time_per_tick.update(exec_elapsed.as_secs_f64());
        self.stream_rpc_rate.update(stream_rpcs_executed as f64 / seconds);
        self.stream_time_per_tick.update(stream_elapsed.as_secs_f64());
        self.rpcs_executed_last_tick = rpcs_executed;
        self.stream_rpcs_executed_last_tick = stream_rpcs_executed;
    }

    pub(crate) fn note_resume_count(&mut self, resume_count: u32) {
        self.max_resume_count_seen = self.max_resume_count_seen.max(resume_count);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            bytes_read_per_sec: self.bytes_read_per_sec.value(),
            bytes_written_per_sec: self.bytes_written_per_sec.value(),
            rpc_rate: self.rpc_rate.value(),
            time_per_tick_secs: self.time_per_tick.value(),
            poll_time_per_tick_secs: self.poll_time_per_tick.value(),
            exec_time_per_tick_secs: self.exec_time_per_tick.value(),
            stream_rpc_rate: self.stream_rpc_rate.value(),
            stream_time_per_tick_secs: self.stream_time_per_tick.value(),
            rpcs_executed_last_tick: self.rpcs_executed_last_tick,
            stream_rpcs_executed_last_tick: self.stream_rpcs_executed_last_tick,
            max_resume_count_seen: self.max_resume_count_seen,
            total_bytes_read: self.last_bytes_read,
            total_bytes_written: self.last_bytes_written,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_rates_are_derived_from_the_cumulative_delta() {
        let mut stats = Stats::new(EmaConfig::default());
        stats.record_tick(Duration::from_secs(1), Duration::ZERO, Duration::ZERO, Duration::ZERO, 0, 0, 100, 50);
        let snap = stats.snapshot();
        assert_eq!(snap.bytes_read_per_sec, 100.0);
        assert_eq!(snap.bytes_written_per_sec, 50.0);

        stats.record_tick(Duration::from_secs(1), Duration::ZERO, Duration::ZERO, Duration::ZERO, 0, 0, 150, 50);
        let snap = stats.snapshot();
        assert_eq!(snap.bytes_read_per_sec, 62.5); // 0.25 * 50 + 0.75 * 100
        assert_eq!(snap.bytes_written_per_sec, 37.5); // 0.25 * 0 + 0.75 * 50
    }

    #[test]
    fn resume_count_gauge_tracks_the_maximum_seen() {
        let mut stats = Stats::new(EmaConfig::default());
        stats.note_resume_count(2);
        stats.note_resume_count(1);
        stats.note_resume_count(5);
        assert_eq!(stats.snapshot().max_resume_count_seen, 5);
    }
}
