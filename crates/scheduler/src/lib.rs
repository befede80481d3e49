// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

//! The round-robin client scheduler (§4.1): produces a fair iteration order
//! over the current client set such that across repeated iterations every
//! client gets an equal turn at being visited first.

use indexmap::IndexSet;
use tickrpc_core::ClientId;

/// An ordered client set with a rotating cursor.
///
/// Insertion order is the tie-break within a round, and two calls with no
/// intervening mutation produce identical orders (determinism, §4.1).
#[derive(Debug, Default)]
pub struct RoundRobinScheduler {
    members: IndexSet<ClientId>,
    cursor: usize,
}

impl RoundRobinScheduler {
    pub fn new() -> Self {
        Self { members: IndexSet::new(), cursor: 0 }
    }

    /// Append `client` to the set; no-op if already present.
    pub fn add(&mut self, client: ClientId) {
        self.members.insert(client);
    }

    /// Delete `client`; if the cursor pointed at it, the removal naturally
    /// slides the next surviving member into its slot, and any member that
    /// sat *before* the cursor has the cursor shifted left to compensate.
    pub fn remove(&mut self, client: ClientId) {
        let Some(idx) = self.members.get_index_of(&client) else {
            return;
        };
        self.members.shift_remove_index(idx);
        if self.members.is_empty() {
            self.cursor = 0;
        } else if idx < self.cursor {
            self.cursor -= 1;
        }
    }

    pub fn contains(&self, client: ClientId) -> bool {
        self.members.contains(&client)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Produce each current member exactly once, starting from the cursor,
    /// then advance the cursor by one position (mod the set size) so the
    /// next round starts with the next client.
    #[tracing::instrument(level = "trace", skip(self), fields(members = self.members.len()))]
    pub fn round(&mut self) -> Vec<ClientId> {
        let n = self.members.len();
        if n == 0 {
            return Vec::new();
        }
        let start = self.cursor % n;
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let idx = (start + i) % n;
            out.push(*self.members.get_index(idx).expect("idx < n"));
        }
        self.cursor = (self.cursor + 1) % n;
        out
    }
}
