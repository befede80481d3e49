// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

//! `RequestContinuation` (§4.2): an owning handle for one request's
//! execution — the originating client, the resumable handler state, and a
//! method to attempt completion that either returns a `Response` or signals
//! "suspended; resume me later".
//!
//! §9 replaces the source's "throw a YieldException carrying a new
//! continuation" idiom with the explicit tagged [`RunOutcome`] below.

use tickrpc_core::{ClientId, Response};

/// One step of progress on a call: either it is finished, or it needs to be
/// polled again on a future tick.
pub enum CallPoll {
    Done(Response),
    Pending,
}

/// An unexpected failure while polling a call — the "bug or corrupt state"
/// branch of §7, distinguished from a domain error (which a procedure
/// reports by returning `Done(Response::error(..))`, not by failing here).
#[derive(Debug, Clone)]
pub struct RunFailure {
    pub message: String,
    pub trace: Option<String>,
}

impl RunFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), trace: None }
    }

    pub fn with_trace(message: impl Into<String>, trace: impl Into<String>) -> Self {
        Self { message: message.into(), trace: Some(trace.into()) }
    }
}

/// The resumable handler state captured by a [`RequestContinuation`].
///
/// A call is "fresh" when first constructed from a decoded wire request; it
/// is "resumed" when polled again after a prior `Pending`. Implementations
/// retain whatever partial state they need across suspensions — the
/// continuation itself only holds the boxed call, never the original wire
/// bytes (§4.2: "the original encoded request bytes need not be retained
/// once the procedure handle and decoded arguments are captured").
pub trait Call: Send {
    fn poll(&mut self) -> Result<CallPoll, RunFailure>;
}

/// The result of [`RequestContinuation::run`].
pub enum RunOutcome {
    Done(Response),
    Suspended(RequestContinuation),
    Failed(RunFailure),
}

/// An in-flight request: the originating client and its resumable call.
///
/// Disconnect checks are the caller's responsibility (the engine consults
/// its transport's client list before calling `run`); this type only tracks
/// *which* client the continuation belongs to, not whether it is still
/// connected, so this crate stays free of any transport dependency.
pub struct RequestContinuation {
    client: ClientId,
    call: Box<dyn Call>,
    resume_count: u32,
}

impl RequestContinuation {
    /// Construct a fresh continuation from a decoded call.
    pub fn fresh(client: ClientId, call: Box<dyn Call>) -> Self {
        Self { client, call, resume_count: 0 }
    }

    pub fn client(&self) -> ClientId {
        self.client
    }

    /// How many times this continuation has previously suspended.
    /// Observability only (SPEC_FULL §1) — never used to force-fail a
    /// continuation; §7 names no such failure mode.
    pub fn resume_count(&self) -> u32 {
        self.resume_count
    }

    /// Attempt to complete the call.
    #[tracing::instrument(level = "trace", skip(self), fields(client = self.client.0, resume_count = self.resume_count))]
    pub fn run(mut self) -> RunOutcome {
        match self.call.poll() {
            Ok(CallPoll::Done(response)) => RunOutcome::Done(response),
            Ok(CallPoll::Pending) => {
                self.resume_count += 1;
                RunOutcome::Suspended(self)
            }
            Err(failure) => RunOutcome::Failed(failure),
        }
    }
}
