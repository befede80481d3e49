// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

use std::sync::Arc;

use thiserror::Error;
use tickrpc_continuation::{Call, CallPoll, RunFailure};
use tickrpc_core::{EncodedValue, Response};

/// A decoded argument or return value.
///
/// The engine never interprets these values itself; it only ever compares
/// them for equality (stream deduplication in §4.3, stream diffing in §4.5).
/// `serde_json::Value` gives that comparison for free and matches the wire
/// encoding the reference transport and test service registry use.
pub type DecodedValue = serde_json::Value;
pub type DecodedArgs = Vec<DecodedValue>;

/// A resolved (service, procedure) pair, returned by
/// `ServiceRegistry::get_procedure_signature`. Cheap to clone and compare —
/// the stream registry keys its dedup table on `(ProcedureHandle, DecodedArgs)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcedureHandle {
    pub service: String,
    pub procedure: String,
}

impl ProcedureHandle {
    pub fn new(service: impl Into<String>, procedure: impl Into<String>) -> Self {
        Self { service: service.into(), procedure: procedure.into() }
    }
}

/// Failures resolving a procedure or decoding its arguments (§4.3, §7.5):
/// these surface synchronously as an error `Response` and never poison the
/// stream registry or the RPC tick loop.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no procedure {service}.{procedure}")]
    UnknownProcedure { service: String, procedure: String },
    #[error("bad arguments: {0}")]
    BadArguments(String),
}

/// The result of invoking a resolved procedure once.
pub enum HandleOutcome {
    /// The procedure completed and returned a value.
    Done(DecodedValue),
    /// The procedure is not ready yet; poll again next tick (§4.2). Stream
    /// procedures never return this (§4.5: "streaming never suspends").
    Pending,
    /// A domain error ("RPCException", §7.1): reported to the client
    /// without a stack trace.
    DomainError(String),
}

/// `GetProcedureSignature` / `GetArguments` / `HandleRequest` from §6.
pub trait ServiceRegistry: Send + Sync {
    fn get_procedure_signature(&self, service: &str, procedure: &str) -> Result<ProcedureHandle, RegistryError>;

    fn get_arguments(&self, handle: &ProcedureHandle, encoded: &[EncodedValue]) -> Result<DecodedArgs, RegistryError>;

    /// Invoke the procedure once. Implementations that model a
    /// multi-tick procedure return `Pending` until their internal state
    /// says otherwise; they must retain that state themselves (the
    /// registry is consulted every poll, not just once).
    fn handle_request(&self, handle: &ProcedureHandle, args: &DecodedArgs) -> Result<HandleOutcome, RunFailure>;
}

pub fn encode_value(value: &DecodedValue) -> EncodedValue {
    EncodedValue::new(serde_json::to_vec(value).unwrap_or_default())
}

pub fn decode_json_arguments(encoded: &[EncodedValue]) -> Result<DecodedArgs, RegistryError> {
    encoded
        .iter()
        .map(|arg| serde_json::from_slice(arg.as_bytes()).map_err(|e| RegistryError::BadArguments(e.to_string())))
        .collect()
}

/// Bridges a resolved procedure call into `tickrpc_continuation::Call`, so
/// the RPC tick loop can drive it through `RequestContinuation` the same way
/// as any other in-flight request.
pub struct RegistryCall {
    registry: Arc<dyn ServiceRegistry>,
    handle: ProcedureHandle,
    args: DecodedArgs,
}

impl RegistryCall {
    pub fn new(registry: Arc<dyn ServiceRegistry>, handle: ProcedureHandle, args: DecodedArgs) -> Self {
        Self { registry, handle, args }
    }
}

impl Call for RegistryCall {
    fn poll(&mut self) -> Result<CallPoll, RunFailure> {
        match self.registry.handle_request(&self.handle, &self.args)? {
            HandleOutcome::Done(value) => Ok(CallPoll::Done(Response::success(encode_value(&value), 0.0))),
            HandleOutcome::Pending => Ok(CallPoll::Pending),
            HandleOutcome::DomainError(message) => Ok(CallPoll::Done(Response::error(message))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_argument_round_trips() {
        let args = vec![EncodedValue::new(serde_json::to_vec(&serde_json::json!(42)).unwrap())];
        let decoded = decode_json_arguments(&args).unwrap();
        assert_eq!(decoded, vec![serde_json::json!(42)]);
    }

    #[test]
    fn bad_json_is_a_registry_error() {
        let args = vec![EncodedValue::new(b"not json".to_vec())];
        assert!(decode_json_arguments(&args).is_err());
    }
}
