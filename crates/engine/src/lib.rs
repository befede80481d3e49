// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

//! The RPC Tick Loop (§4.4), Stream Tick Loop (§4.5), Statistics Surface
//! (§4.7), and Lifecycle & Event Surface (§4.8), assembled into the `Engine`
//! a host drives one tick at a time.

mod config;
mod controller;
#[allow(clippy::module_inception)]
mod engine;
mod stats;

pub use config::{AdaptiveControllerConfig, EmaConfig, TickLoopConfig};
pub use controller::AdaptiveController;
pub use engine::{Engine, RpcTransportHandle, StreamSetupError, StreamTransportHandle};
pub use stats::{Stats, StatsSnapshot};
