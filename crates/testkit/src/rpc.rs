// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use tickrpc_core::{ClientId, Request, Response};
use tickrpc_transport::{RpcClient, RpcTransport};

/// An in-memory [`RpcClient`]: requests are pushed in by the test, responses
/// are recorded for later inspection — no actual socket involved.
pub struct MockRpcClient {
    id: ClientId,
    address: String,
    connected: AtomicBool,
    inbound: Mutex<VecDeque<Request>>,
    outbound: Mutex<Vec<Response>>,
}

impl MockRpcClient {
    fn new(id: ClientId, address: impl Into<String>) -> Self {
        Self {
            id,
            address: address.into(),
            connected: AtomicBool::new(true),
            inbound: Mutex::new(VecDeque::new()),
            outbound: Mutex::new(Vec::new()),
        }
    }

    /// Make `request` available to the next poll pass.
    pub fn push_request(&self, request: Request) {
        self.inbound.lock().push_back(request);
    }

    /// Flip `connected()` to `false`, as if the transport detected a drop.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Every response written to this client so far, in send order.
    pub fn sent_responses(&self) -> Vec<Response> {
        self.outbound.lock().clone()
    }
}

impl RpcClient for MockRpcClient {
    fn id(&self) -> ClientId {
        self.id
    }

    fn address(&self) -> &str {
        &self.address
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn data_available(&self) -> bool {
        !self.inbound.lock().is_empty()
    }

    fn read(&self) -> Option<Request> {
        self.inbound.lock().pop_front()
    }

    fn send(&self, response: Response) {
        self.outbound.lock().push(response);
    }
}

/// An in-memory [`RpcTransport`] holding a fixed set of [`MockRpcClient`]s.
/// `update()` is a no-op — clients connect/disconnect only via direct calls
/// from the test.
#[derive(Default)]
pub struct MockTransport {
    clients: Mutex<Vec<Arc<MockRpcClient>>>,
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_client(&self, id: ClientId, address: impl Into<String>) -> Arc<MockRpcClient> {
        let client = Arc::new(MockRpcClient::new(id, address));
        self.clients.lock().push(client.clone());
        client
    }

    /// Simulate I/O so `Engine::stats().bytes_read_per_sec` has something
    /// to report.
    pub fn add_bytes_read(&self, n: u64) {
        self.bytes_read.fetch_add(n, Ordering::SeqCst);
    }

    pub fn add_bytes_written(&self, n: u64) {
        self.bytes_written.fetch_add(n, Ordering::SeqCst);
    }
}

impl RpcTransport for MockTransport {
    fn update(&mut self) {}

    fn clients(&self) -> Vec<Arc<dyn RpcClient>> {
        self.clients.lock().iter().map(|c| c.clone() as Arc<dyn RpcClient>).collect()
    }

    fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::SeqCst)
    }

    fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::SeqCst)
    }
}
