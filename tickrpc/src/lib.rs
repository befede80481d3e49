// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

//! Facade crate: re-exports the public surface of every `tickrpc-*` crate so
//! a host only ever depends on `tickrpc`, the way the reference workspace's
//! own top-level packaging crate bundles its subsystems behind one name.

pub use tickrpc_core::{
    Activation, Budget, BudgetTimer, Clock, ClientId, Context, ContextGuard, Ema, EncodedValue, Error, Instant,
    Request, Response, Result, Scene, StreamId, StreamMessage, SystemClock,
};

pub use tickrpc_scheduler::RoundRobinScheduler;

pub use tickrpc_continuation::{Call, CallPoll, RequestContinuation, RunFailure, RunOutcome};

pub use tickrpc_stream::{StreamRegistry, StreamSetupError, StreamTickSummary};

pub use tickrpc_transport::{
    decode_json_arguments, encode_value, Activity, DecodedArgs, DecodedValue, HandleOutcome, Observer,
    ProcedureHandle, RegistryCall, RegistryError, RpcClient, RpcTransport, ServiceRegistry, StreamClient,
    StreamTransport,
};

pub use tickrpc_engine::{
    AdaptiveController, AdaptiveControllerConfig, Engine, EmaConfig, RpcTransportHandle, Stats, StatsSnapshot,
    TickLoopConfig, StreamTransportHandle,
};
