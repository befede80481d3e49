// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

use std::sync::Arc;

use tickrpc_core::{ClientId, Request, Response};

/// An RPC client (§3): an identity, a connection state, and a bidirectional
/// message stream carrying request/response frames.
///
/// Owned by the transport; the engine only ever holds `Arc<dyn RpcClient>`
/// handles and must tolerate `connected()` flipping to `false` between any
/// two calls. Methods take `&self` because a transport may be fed from its
/// own I/O thread — implementations are expected to synchronize internally
/// (e.g. a bounded channel) rather than require external locking (§5).
pub trait RpcClient: Send + Sync {
    fn id(&self) -> ClientId;
    fn address(&self) -> &str;
    fn connected(&self) -> bool;

    /// Whether a complete request frame is ready to be read.
    fn data_available(&self) -> bool;

    /// Read one complete request frame, if any. Never blocks.
    fn read(&self) -> Option<Request>;

    /// Write a response frame.
    fn send(&self, response: Response);
}

/// `RPCServer` from §6: drives its own non-blocking maintenance pass (accept
/// new connections, progress handshakes) and enumerates currently attached
/// clients.
pub trait RpcTransport: Send {
    /// Non-blocking maintenance; never blocks on I/O.
    fn update(&mut self);

    fn clients(&self) -> Vec<Arc<dyn RpcClient>>;

    fn bytes_read(&self) -> u64;
    fn bytes_written(&self) -> u64;
}
