// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

//! Process-wide logging setup. Library crates only ever emit through the
//! `tracing` facade (§6 `Logger`); installing a subscriber is a host
//! concern, performed exactly once.

use tracing_subscriber::{EnvFilter, fmt};

/// Output format for the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Installs a global `tracing` subscriber reading level filters from
/// `RUST_LOG` (defaulting to `info` when unset). Call once, from `main`.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt().with_env_filter(filter).with_target(true);

    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
