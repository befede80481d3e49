// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

//! Demo host: wires the engine to an in-memory transport and a single
//! illustrative procedure, then drives it at a fixed tick rate, logging the
//! Statistics Surface once a second.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tickrpc::{ClientId, Engine, Request};
use tickrpc_testkit::{MockServiceRegistry, MockTransport};
use tickrpc_tracing::LogFormat;

#[derive(Parser)]
#[command(about = "Demo TickRPC host: drives the engine against an in-memory transport")]
struct Args {
    /// Ticks per second to drive the engine at.
    #[arg(long, default_value_t = 59)]
    tick_rate: u32,

    /// Total number of ticks to run before exiting.
    #[arg(long, default_value_t = 120)]
    ticks: u32,

    /// Emit structured JSON logs instead of the pretty human format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    tickrpc_tracing::init(if args.json { LogFormat::Json } else { LogFormat::Pretty });

    let registry = Arc::new(MockServiceRegistry::new());
    registry.register_immediate("demo", "echo", serde_json::json!("pong"));

    let mut engine = Engine::new(registry);

    let transport = MockTransport::new();
    let client = transport.add_client(ClientId(1), "demo-client");
    engine.attach_rpc_transport(Box::new(transport));

    let tick_rate = args.tick_rate.max(1);
    let period = Duration::from_secs_f64(1.0 / tick_rate as f64);
    tracing::info!(tick_rate, ticks = args.ticks, "starting demo host");

    for tick in 0..args.ticks {
        client.push_request(Request::new("demo", "echo", vec![]));
        engine.tick();

        if tick % tick_rate == 0 {
            let stats = engine.stats();
            tracing::info!(
                tick,
                rpc_rate = stats.rpc_rate,
                time_per_tick_secs = stats.time_per_tick_secs,
                max_resume_count_seen = stats.max_resume_count_seen,
                "tick stats"
            );
        }

        thread::sleep(period);
    }

    tracing::info!(ticks = args.ticks, "demo host exiting");
}
