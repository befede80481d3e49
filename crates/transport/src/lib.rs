// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

//! The external interfaces the engine consumes (§6): transports, the service
//! registry, and the lifecycle/event surface. Wire framing, encoding, and CLI
//! are entirely these collaborators' responsibility — the engine only ever
//! sees `Request`/`Response`/`StreamMessage` (defined in `tickrpc-core`).

mod events;
mod registry;
mod rpc;
mod stream;

pub use events::{Activity, Observer};
pub use registry::{
    DecodedArgs, DecodedValue, HandleOutcome, ProcedureHandle, RegistryCall, RegistryError, ServiceRegistry,
    decode_json_arguments, encode_value,
};
pub use rpc::{RpcClient, RpcTransport};
pub use stream::{StreamClient, StreamTransport};
pub use tickrpc_continuation::{CallPoll, RunFailure};
pub use tickrpc_core::{ClientId, Request, Response};
