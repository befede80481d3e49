// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

//! The Stream Registry (§4.3) and the Stream Tick Loop (§4.5): standing
//! subscriptions whose result is re-evaluated every tick and pushed only
//! when the value changes.

use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;
use tickrpc_core::{ClientId, Request, StreamId, StreamMessage};
use tickrpc_transport::{
    DecodedArgs, HandleOutcome, ProcedureHandle, RegistryError, Response, ServiceRegistry, StreamTransport,
};
use tracing::{debug, instrument, warn};

// Re-exported so downstream crates don't need a direct `tickrpc_core::Response` import
// just to read `StreamTickSummary::messages`.
pub use tickrpc_transport::Response as StreamResponse;

/// Failures setting up a stream, surfaced synchronously from `add_stream`
/// (§4.3, §7.5); these never poison the registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamSetupError {
    #[error("no stream channel for client {0:?}")]
    NoStreamChannel(ClientId),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// One active subscription: a resolved procedure and its frozen argument
/// tuple (§3).
#[derive(Debug, Clone)]
struct StreamRequest {
    id: StreamId,
    handle: ProcedureHandle,
    args: DecodedArgs,
}

#[derive(Default)]
struct ClientStreams {
    /// Insertion order, which the Stream Tick Loop's batch ordering
    /// follows (§4.5, §5).
    requests: Vec<StreamRequest>,
    /// `None` means "never sent" (§3). A key is present here iff the
    /// matching `StreamRequest` exists — enforced by construction, since
    /// both are mutated together in `add_stream`/`remove_stream`.
    cache: IndexMap<StreamId, Option<DecodedArgsValue>>,
    next_id: u64,
}

type DecodedArgsValue = tickrpc_transport::DecodedValue;

impl ClientStreams {
    fn find_matching(&self, handle: &ProcedureHandle, args: &DecodedArgs) -> Option<StreamId> {
        self.requests.iter().find(|r| &r.handle == handle && &r.args == args).map(|r| r.id)
    }

    fn allocate_id(&mut self) -> StreamId {
        let id = StreamId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// The outcome of one Stream Tick Loop pass (§4.5).
pub struct StreamTickSummary {
    /// One entry per stream client that produced at least one changed
    /// value this tick. Empty batches are never included (§4.5: "Empty
    /// batches are not sent").
    pub messages: Vec<(ClientId, StreamMessage)>,
    /// Every invocation this tick, sent or suppressed — `StreamRPCs` in
    /// §4.7.
    pub executed: usize,
}

/// Per-stream-client active subscriptions, deduplicated by `(procedure,
/// argument tuple)`, with a last-sent result cache (§3, §4.3).
pub struct StreamRegistry {
    registry: Arc<dyn ServiceRegistry>,
    by_client: IndexMap<ClientId, ClientStreams>,
}

impl StreamRegistry {
    pub fn new(registry: Arc<dyn ServiceRegistry>) -> Self {
        Self { registry, by_client: IndexMap::new() }
    }

    /// Resolve `request`'s procedure via the service registry and either
    /// return an existing stream id for an identical `(procedure,
    /// decoded-args)` pair, or allocate a fresh one (§4.3).
    #[instrument(level = "debug", skip(self, stream_transport, request), fields(rpc_client = rpc_client.0))]
    pub fn add_stream(
        &mut self,
        stream_transport: &dyn StreamTransport,
        rpc_client: ClientId,
        request: &Request,
    ) -> Result<StreamId, StreamSetupError> {
        if stream_transport.find(rpc_client).is_none() {
            return Err(StreamSetupError::NoStreamChannel(rpc_client));
        }

        let handle = self.registry.get_procedure_signature(&request.service, &request.procedure)?;
        let args = self.registry.get_arguments(&handle, &request.arguments)?;

        let bucket = self.by_client.entry(rpc_client).or_default();
        if let Some(existing) = bucket.find_matching(&handle, &args) {
            debug!(stream_id = existing.0, "deduplicated stream subscription");
            return Ok(existing);
        }

        let id = bucket.allocate_id();
        bucket.requests.push(StreamRequest { id, handle, args });
        bucket.cache.insert(id, None);
        Ok(id)
    }

    /// Remove a subscription. Idempotent: unknown ids are not an error
    /// (§4.3).
    #[instrument(level = "debug", skip(self), fields(rpc_client = rpc_client.0, stream_id = stream_id.0))]
    pub fn remove_stream(&mut self, rpc_client: ClientId, stream_id: StreamId) {
        if let Some(bucket) = self.by_client.get_mut(&rpc_client) {
            bucket.requests.retain(|r| r.id != stream_id);
            bucket.cache.shift_remove(&stream_id);
        }
    }

    /// Purge every subscription belonging to `rpc_client` (stream-client
    /// disconnect, SPEC_FULL §1 restored feature 3).
    pub fn remove_all_for_client(&mut self, rpc_client: ClientId) {
        self.by_client.shift_remove(&rpc_client);
    }

    pub fn stream_count(&self, rpc_client: ClientId) -> usize {
        self.by_client.get(&rpc_client).map(|b| b.requests.len()).unwrap_or(0)
    }

    /// The Stream Tick Loop (§4.5): invoke every active subscription,
    /// diff against the cache, and batch only the changed values.
    #[instrument(level = "trace", skip(self))]
    pub fn run_tick(&mut self) -> StreamTickSummary {
        let mut messages = Vec::new();
        let mut executed = 0usize;

        for (client, bucket) in self.by_client.iter_mut() {
            if bucket.requests.is_empty() {
                continue;
            }
            let mut batch = StreamMessage::new();
            for request in &bucket.requests {
                executed += 1;
                let response = match bucket_invoke(&*self.registry, request) {
                    Ok(value) => {
                        let last = bucket.cache.get(&request.id).cloned().flatten();
                        if last.as_ref() == Some(&value) {
                            continue;
                        }
                        bucket.cache.insert(request.id, Some(value.clone()));
                        Response::success(tickrpc_transport::encode_value(&value), 0.0)
                    }
                    Err(message) => {
                        warn!(stream_id = request.id.0, %message, "stream procedure failed");
                        Response::error(message)
                    }
                };
                batch.push(request.id, response);
            }
            if !batch.is_empty() {
                messages.push((*client, batch));
            }
        }

        StreamTickSummary { messages, executed }
    }
}

fn bucket_invoke(registry: &dyn ServiceRegistry, request: &StreamRequest) -> Result<DecodedArgsValue, String> {
    match registry.handle_request(&request.handle, &request.args) {
        Ok(HandleOutcome::Done(value)) => Ok(value),
        Ok(HandleOutcome::Pending) => Err("stream procedures must not suspend".to_string()),
        Ok(HandleOutcome::DomainError(message)) => Err(message),
        Err(failure) => Err(failure.message),
    }
}
