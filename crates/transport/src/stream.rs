// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

use std::sync::Arc;

use tickrpc_core::{ClientId, StreamMessage};

/// A stream client (§3): a parallel identity to an RPC client, correlated by
/// the shared unique id, carrying outgoing `StreamMessage` batches.
pub trait StreamClient: Send + Sync {
    fn id(&self) -> ClientId;
    fn connected(&self) -> bool;

    /// Write a batch of stream responses.
    fn write(&self, message: StreamMessage);
}

/// `StreamServer` from §6.
pub trait StreamTransport: Send {
    fn update(&mut self);

    fn clients(&self) -> Vec<Arc<dyn StreamClient>>;

    /// Resolve the stream client sharing `id` with an RPC client, if one
    /// is currently attached. Used by `AddStream` (§4.3), which fails
    /// with `NoStreamChannel` when this returns `None`.
    fn find(&self, id: ClientId) -> Option<Arc<dyn StreamClient>> {
        self.clients().into_iter().find(|c| c.id() == id)
    }
}
