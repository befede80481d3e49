// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tickrpc_core::{ClientId, StreamMessage};
use tickrpc_transport::{StreamClient, StreamTransport};

/// An in-memory [`StreamClient`]: every batch written to it is recorded for
/// later inspection.
pub struct MockStreamClient {
    id: ClientId,
    connected: AtomicBool,
    written: Mutex<Vec<StreamMessage>>,
}

impl MockStreamClient {
    fn new(id: ClientId) -> Self {
        Self { id, connected: AtomicBool::new(true), written: Mutex::new(Vec::new()) }
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn written_messages(&self) -> Vec<StreamMessage> {
        self.written.lock().clone()
    }
}

impl StreamClient for MockStreamClient {
    fn id(&self) -> ClientId {
        self.id
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn write(&self, message: StreamMessage) {
        self.written.lock().push(message);
    }
}

/// An in-memory [`StreamTransport`] holding a fixed set of
/// [`MockStreamClient`]s.
#[derive(Default)]
pub struct MockStreamTransport {
    clients: Mutex<Vec<Arc<MockStreamClient>>>,
}

impl MockStreamTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_client(&self, id: ClientId) -> Arc<MockStreamClient> {
        let client = Arc::new(MockStreamClient::new(id));
        self.clients.lock().push(client.clone());
        client
    }
}

impl StreamTransport for MockStreamTransport {
    fn update(&mut self) {}

    fn clients(&self) -> Vec<Arc<dyn StreamClient>> {
        self.clients.lock().iter().map(|c| c.clone() as Arc<dyn StreamClient>).collect()
    }
}
