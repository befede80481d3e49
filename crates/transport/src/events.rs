// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

use tickrpc_core::ClientId;

/// One request read from a client, reported once per successful poll-phase
/// read (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activity {
    pub client: ClientId,
}

/// The lifecycle/event surface (§4.8): connect/disconnect hooks and activity
/// notifications routed to external observers.
///
/// Observers register before connections are accepted and must tolerate
/// being invoked from the tick thread (§5); they must never call back into
/// the engine's mutating operations. All methods have no-op defaults so an
/// observer only implements what it cares about.
pub trait Observer: Send {
    fn on_rpc_client_connected(&mut self, _client: ClientId) {}
    fn on_rpc_client_disconnected(&mut self, _client: ClientId) {}
    fn on_stream_client_connected(&mut self, _client: ClientId) {}
    fn on_stream_client_disconnected(&mut self, _client: ClientId) {}
    fn on_activity(&mut self, _activity: Activity) {}
}
