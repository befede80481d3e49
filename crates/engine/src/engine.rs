// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

//! The RPC Tick Loop (§4.4) and Stream Tick Loop (§4.5), wired together with
//! the Statistics Surface (§4.7) and Lifecycle & Event Surface (§4.8) into one
//! `Engine` the host drives one `tick()` at a time.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use tickrpc_continuation::{RequestContinuation, RunOutcome};
use tickrpc_core::{
    Activation, Budget, BudgetTimer, ClientId, Clock, Context, Request, Response, Scene, StreamId, StreamMessage,
    SystemClock,
};
use tickrpc_scheduler::RoundRobinScheduler;
use tickrpc_stream::StreamRegistry;
pub use tickrpc_stream::StreamSetupError;
use tickrpc_transport::{
    Activity, Observer, RegistryCall, RpcClient, RpcTransport, ServiceRegistry, StreamClient, StreamTransport,
};

use crate::config::{AdaptiveControllerConfig, EmaConfig, TickLoopConfig};
use crate::controller::AdaptiveController;
use crate::stats::{Stats, StatsSnapshot};

/// Returned by [`Engine::attach_rpc_transport`]; pass back to
/// [`Engine::detach_rpc_transport`] to unregister it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RpcTransportHandle(u64);

/// Returned by [`Engine::attach_stream_transport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamTransportHandle(u64);

/// The single-threaded, cooperatively scheduled RPC execution engine (§1).
///
/// Every method that mutates engine state takes `&mut self`; §5's
/// single-threaded model is enforced by the borrow checker rather than a
/// runtime lock. A host drives it by calling [`Engine::tick`] once per
/// simulation frame.
pub struct Engine {
    config: TickLoopConfig,
    controller: AdaptiveController,
    clock: Arc<dyn Clock>,
    registry: Arc<dyn ServiceRegistry>,
    scheduler: RoundRobinScheduler,
    rpc_transports: IndexMap<u64, Box<dyn RpcTransport>>,
    stream_transports: IndexMap<u64, Box<dyn StreamTransport>>,
    next_transport_id: u64,
    streams: StreamRegistry,
    observers: Vec<Box<dyn Observer>>,
    stats: Stats,
    queue: Vec<RequestContinuation>,
    known_rpc_clients: IndexMap<ClientId, Arc<dyn RpcClient>>,
    known_stream_clients: IndexMap<ClientId, Arc<dyn StreamClient>>,
    current_scene: Option<Scene>,
}

impl Engine {
    pub fn new(registry: Arc<dyn ServiceRegistry>) -> Self {
        Self::with_clock(registry, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(registry: Arc<dyn ServiceRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: TickLoopConfig::default(),
            controller: AdaptiveController::new(AdaptiveControllerConfig::default()),
            clock,
            streams: StreamRegistry::new(registry.clone()),
            registry,
            scheduler: RoundRobinScheduler::new(),
            rpc_transports: IndexMap::new(),
            stream_transports: IndexMap::new(),
            next_transport_id: 0,
            observers: Vec::new(),
            stats: Stats::new(EmaConfig::default()),
            queue: Vec::new(),
            known_rpc_clients: IndexMap::new(),
            known_stream_clients: IndexMap::new(),
            current_scene: None,
        }
    }

    pub fn config(&self) -> TickLoopConfig {
        self.config
    }

    /// Runtime-mutable configuration surface (§6): no persisted state, a
    /// plain value transformed by the caller.
    pub fn configure(&mut self, f: impl FnOnce(TickLoopConfig) -> TickLoopConfig) {
        self.config = f(self.config);
    }

    pub fn adaptive_controller_config(&self) -> AdaptiveControllerConfig {
        self.controller.config()
    }

    pub fn set_adaptive_controller_config(&mut self, config: AdaptiveControllerConfig) {
        self.controller.set_config(config);
    }

    /// Set the current game scene (§4.6), visible to every procedure
    /// invoked during subsequent ticks via `Context::current_scene`.
    pub fn set_scene(&mut self, scene: Option<Scene>) {
        self.current_scene = scene;
    }

    /// Attach an RPC transport (§9 "Servers list"). The tick loop drives
    /// every attached transport without holding an owning collection
    /// beyond this registration.
    pub fn attach_rpc_transport(&mut self, transport: Box<dyn RpcTransport>) -> RpcTransportHandle {
        let id = self.next_transport_id;
        self.next_transport_id += 1;
        self.rpc_transports.insert(id, transport);
        RpcTransportHandle(id)
    }

    /// Detach a transport (SPEC_FULL restored feature 2). Safe to call at
    /// any time: `tick()` holds `&mut self` for its whole duration, so a
    /// detach can never happen mid-iteration — it simply takes effect
    /// starting with the next tick.
    pub fn detach_rpc_transport(&mut self, handle: RpcTransportHandle) {
        self.rpc_transports.shift_remove(&handle.0);
    }

    pub fn attach_stream_transport(&mut self, transport: Box<dyn StreamTransport>) -> StreamTransportHandle {
        let id = self.next_transport_id;
        self.next_transport_id += 1;
        self.stream_transports.insert(id, transport);
        StreamTransportHandle(id)
    }

    pub fn detach_stream_transport(&mut self, handle: StreamTransportHandle) {
        self.stream_transports.shift_remove(&handle.0);
    }

    pub fn add_observer(&mut self, observer: Box<dyn Observer>) {
        self.observers.push(observer);
    }

    /// `AddStream` (§4.3): find the stream transport carrying `rpc_client`
    /// and register the subscription with it.
    pub fn add_stream(&mut self, rpc_client: ClientId, request: &Request) -> Result<StreamId, StreamSetupError> {
        for transport in self.stream_transports.values() {
            if transport.find(rpc_client).is_some() {
                return self.streams.add_stream(transport.as_ref(), rpc_client, request);
            }
        }
        Err(StreamSetupError::NoStreamChannel(rpc_client))
    }

    /// `RemoveStream` (§4.3): idempotent, unknown ids are not an error.
    pub fn remove_stream(&mut self, rpc_client: ClientId, stream_id: StreamId) {
        self.streams.remove_stream(rpc_client, stream_id);
    }

    pub fn stream_count(&self, rpc_client: ClientId) -> usize {
        self.streams.stream_count(rpc_client)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Drive one tick: RPC Tick Loop, then Stream Tick Loop, then update
    /// the Statistics Surface and adaptive controller (§2 control flow).
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn tick(&mut self) {
        self.sync_rpc_clients();
        self.sync_stream_clients();

        let budget = Budget::new(self.config.max_time_per_update)
            .unwrap_or_else(|_| Budget::new(Duration::from_micros(1)).expect("1us is never zero"));

        let tick_timer = BudgetTimer::start(&*self.clock);
        let mut active: Vec<RequestContinuation> = std::mem::take(&mut self.queue);
        let mut yielded: Vec<RequestContinuation> = Vec::new();
        let mut in_flight: HashSet<ClientId> = active.iter().map(|c| c.client()).collect();

        let mut poll_total = Duration::ZERO;
        let mut exec_total = Duration::ZERO;
        let mut rpc_executed: u64 = 0;

        // §4.1: one call to `round()` per tick, however many times the poll
        // phase itself is retried below (blocking wait, or a redundant
        // re-poll once the queue has already drained) — the cursor must
        // advance exactly once per tick, not once per poll attempt.
        let poll_order = self.scheduler.round();

        loop {
            // 4.4.2a: poll phase.
            let poll_timer = BudgetTimer::start(&*self.clock);
            loop {
                self.poll_once(&poll_order, &mut active, &mut in_flight);
                if !self.config.blocking_recv {
                    // §9 open question: non-blocking mode polls once per
                    // outer round and returns, budget notwithstanding.
                    break;
                }
                if !active.is_empty() {
                    break;
                }
                if poll_timer.elapsed(&*self.clock) >= self.config.recv_timeout {
                    break;
                }
                if budget.is_exhausted(tick_timer.elapsed(&*self.clock)) {
                    break;
                }
            }
            poll_total += poll_timer.elapsed(&*self.clock);

            if active.is_empty() {
                break;
            }

            // 4.4.2c: execute phase.
            let exec_timer = BudgetTimer::start(&*self.clock);
            let this_round = std::mem::take(&mut active);
            for cont in this_round {
                let client_id = cont.client();
                let connected = self.known_rpc_clients.get(&client_id).map(|c| c.connected()).unwrap_or(false);
                if !connected {
                    // §7.4: disconnect detected during execute, drop silently.
                    in_flight.remove(&client_id);
                    continue;
                }
                if budget.is_exhausted(tick_timer.elapsed(&*self.clock)) {
                    yielded.push(cont);
                    continue;
                }

                let activation = Activation { client: Some(client_id), scene: self.current_scene.clone() };
                let guard = Context::enter(activation);
                let outcome = cont.run();
                drop(guard);

                rpc_executed += 1;
                match outcome {
                    RunOutcome::Done(response) => {
                        in_flight.remove(&client_id);
                        self.send_response(client_id, response);
                    }
                    RunOutcome::Suspended(next) => {
                        self.stats.note_resume_count(next.resume_count());
                        yielded.push(next);
                    }
                    RunOutcome::Failed(failure) => {
                        in_flight.remove(&client_id);
                        let message = match &failure.trace {
                            Some(trace) => format!("{}\n{trace}", failure.message),
                            None => failure.message.clone(),
                        };
                        tracing::debug!(client = client_id.0, %message, "continuation failed unexpectedly");
                        self.send_response(client_id, Response::error(message));
                    }
                }
            }
            exec_total += exec_timer.elapsed(&*self.clock);

            if self.config.one_rpc_per_update || budget.is_exhausted(tick_timer.elapsed(&*self.clock)) {
                break;
            }
        }

        self.queue = yielded;

        let stream_timer = BudgetTimer::start(&*self.clock);
        let stream_summary = self.streams.run_tick();
        let stream_elapsed = stream_timer.elapsed(&*self.clock);
        for (client_id, message) in stream_summary.messages {
            self.send_stream_message(client_id, message);
        }

        let tick_elapsed = tick_timer.elapsed(&*self.clock);
        let (total_bytes_read, total_bytes_written) = self
            .rpc_transports
            .values()
            .fold((0u64, 0u64), |(r, w), t| (r + t.bytes_read(), w + t.bytes_written()));

        self.stats.record_tick(
            tick_elapsed,
            poll_total,
            exec_total,
            stream_elapsed,
            rpc_executed,
            stream_summary.executed as u64,
            total_bytes_read,
            total_bytes_written,
        );

        self.config.max_time_per_update =
            self.controller.adjust(self.config.max_time_per_update, tick_elapsed, exec_total);
    }

    /// One pass of the poll phase (§4.4.2a): visit every scheduled client
    /// once, in fair order, enqueueing at most one fresh continuation per
    /// client not already in flight.
    ///
    /// When `OneRPCPerUpdate` is set, polling stops as soon as one fresh
    /// continuation is enqueued — otherwise a single poll pass would still
    /// gather every client with pending data before the execute phase ever
    /// got a chance to bound itself to one (§8 scenario 3: "exactly one
    /// request executes... the round-robin head").
    fn poll_once(
        &mut self,
        order: &[ClientId],
        active: &mut Vec<RequestContinuation>,
        in_flight: &mut HashSet<ClientId>,
    ) {
        for &client_id in order {
            if in_flight.contains(&client_id) {
                continue;
            }
            let Some(client) = self.known_rpc_clients.get(&client_id) else {
                continue;
            };
            if !client.data_available() {
                continue;
            }
            let Some(request) = client.read() else {
                continue;
            };

            for observer in &mut self.observers {
                observer.on_activity(Activity { client: client_id });
            }

            match self.build_continuation(client_id, &request) {
                Ok(cont) => {
                    in_flight.insert(client_id);
                    active.push(cont);
                    if self.config.one_rpc_per_update {
                        break;
                    }
                }
                Err(response) => self.send_response(client_id, response),
            }
        }
    }

    /// Resolve a wire request into a fresh continuation. Resolution
    /// failures (unknown procedure, bad arguments) are reported as an
    /// immediate error response rather than a continuation that would
    /// only fail once polled — there is no partial state to preserve.
    fn build_continuation(&self, client_id: ClientId, request: &Request) -> Result<RequestContinuation, Response> {
        let handle = self
            .registry
            .get_procedure_signature(&request.service, &request.procedure)
            .map_err(|e| Response::error(e.to_string()))?;
        let args = self.registry.get_arguments(&handle, &request.arguments).map_err(|e| Response::error(e.to_string()))?;
        let call = RegistryCall::new(self.registry.clone(), handle, args);
        Ok(RequestContinuation::fresh(client_id, Box::new(call)))
    }

    /// §4.4.1: stamp the server timestamp and write the frame.
    fn send_response(&self, client_id: ClientId, response: Response) {
        let Some(client) = self.known_rpc_clients.get(&client_id) else {
            return;
        };
        let stamped = response.with_time(self.clock.universal_time());
        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!(client = client_id.0, is_error = stamped.is_error(), "sending response");
        }
        client.send(stamped);
    }

    /// The stream registry has no clock of its own (§6 keeps `Time` an
    /// engine-held collaborator), so the engine stamps every entry's
    /// timestamp here, immediately before writing the batch.
    fn send_stream_message(&self, client_id: ClientId, message: StreamMessage) {
        let Some(client) = self.known_stream_clients.get(&client_id) else {
            return;
        };
        let time = self.clock.universal_time();
        let stamped =
            StreamMessage { entries: message.entries.into_iter().map(|(id, r)| (id, r.with_time(time))).collect() };
        client.write(stamped);
    }

    /// §4.4 step 1 plus §4.8: drive every attached RPC transport's
    /// maintenance pass, then diff its client set against what was known
    /// before to fire connect/disconnect lifecycle events.
    fn sync_rpc_clients(&mut self) {
        for transport in self.rpc_transports.values_mut() {
            transport.update();
        }

        let mut present: IndexMap<ClientId, Arc<dyn RpcClient>> = IndexMap::new();
        for transport in self.rpc_transports.values() {
            for client in transport.clients() {
                present.insert(client.id(), client);
            }
        }

        let newly_connected: Vec<ClientId> = present
            .iter()
            .filter(|(id, client)| client.connected() && !self.known_rpc_clients.contains_key(id))
            .map(|(id, _)| *id)
            .collect();
        for id in newly_connected {
            let client = present.get(&id).expect("just filtered from present").clone();
            self.known_rpc_clients.insert(id, client);
            self.scheduler.add(id);
            for observer in &mut self.observers {
                observer.on_rpc_client_connected(id);
            }
        }

        let disconnected: Vec<ClientId> = self
            .known_rpc_clients
            .keys()
            .filter(|id| !present.get(id).map(|c| c.connected()).unwrap_or(false))
            .copied()
            .collect();
        for id in disconnected {
            self.known_rpc_clients.shift_remove(&id);
            self.scheduler.remove(id);
            for observer in &mut self.observers {
                observer.on_rpc_client_disconnected(id);
            }
        }
    }

    /// Same as `sync_rpc_clients` for the stream side, plus SPEC_FULL
    /// restored feature 3: a disconnected stream client's subscriptions are
    /// purged before the next Stream Tick Loop pass.
    fn sync_stream_clients(&mut self) {
        for transport in self.stream_transports.values_mut() {
            transport.update();
        }

        let mut present: IndexMap<ClientId, Arc<dyn StreamClient>> = IndexMap::new();
        for transport in self.stream_transports.values() {
            for client in transport.clients() {
                present.insert(client.id(), client);
            }
        }

        let newly_connected: Vec<ClientId> = present
            .iter()
            .filter(|(id, client)| client.connected() && !self.known_stream_clients.contains_key(id))
            .map(|(id, _)| *id)
            .collect();
        for id in newly_connected {
            let client = present.get(&id).expect("just filtered from present").clone();
            self.known_stream_clients.insert(id, client);
            for observer in &mut self.observers {
                observer.on_stream_client_connected(id);
            }
        }

        let disconnected: Vec<ClientId> = self
            .known_stream_clients
            .keys()
            .filter(|id| !present.get(id).map(|c| c.connected()).unwrap_or(false))
            .copied()
            .collect();
        for id in disconnected {
            self.known_stream_clients.shift_remove(&id);
            self.streams.remove_all_for_client(id);
            for observer in &mut self.observers {
                observer.on_stream_client_disconnected(id);
            }
        }
    }
}
