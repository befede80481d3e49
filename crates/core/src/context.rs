// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

//! The per-tick, per-continuation ambient scope from §4.6: the originating
//! RPC client and the current game scene, accessible to a procedure handler
//! invoked deep inside the call chain without threading either value through
//! every call signature.
//!
//! §9 replaces the source's process-wide singleton with task-local scoping:
//! this is a single-threaded "current activation" scope (a `thread_local`),
//! not a global or a thread pool, consistent with §5's single-threaded
//! cooperative model.

use std::any::Any;
use std::cell::RefCell;
use std::sync::Arc;

use crate::ClientId;

/// An opaque handle to the host's current game scene. The engine never
/// inspects this value; handlers downcast it to their own concrete scene
/// type.
pub type Scene = Arc<dyn Any + Send + Sync>;

/// The ambient values in scope while a continuation runs.
#[derive(Clone, Default)]
pub struct Activation {
    pub client: Option<ClientId>,
    pub scene: Option<Scene>,
}

thread_local! {
    static ACTIVE: RefCell<Option<Activation>> = const { RefCell::new(None) };
}

/// Accessor for the current [`Activation`], set by [`Context::enter`].
pub struct Context;

impl Context {
    /// Set `activation` as current for the lifetime of the returned guard.
    /// The engine calls this immediately before invoking a continuation's
    /// `run`; dropping the guard clears it, including on suspension or an
    /// unexpected error, since `ContextGuard::drop` runs during unwinding
    /// too.
    pub fn enter(activation: Activation) -> ContextGuard {
        ACTIVE.with(|cell| *cell.borrow_mut() = Some(activation));
        ContextGuard { _private: () }
    }

    pub fn current_client() -> Option<ClientId> {
        ACTIVE.with(|cell| cell.borrow().as_ref().and_then(|a| a.client))
    }

    pub fn current_scene() -> Option<Scene> {
        ACTIVE.with(|cell| cell.borrow().as_ref().and_then(|a| a.scene.clone()))
    }
}

/// Clears the current activation when dropped.
pub struct ContextGuard {
    _private: (),
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        ACTIVE.with(|cell| *cell.borrow_mut() = None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_activation_outside_a_guard() {
        assert_eq!(Context::current_client(), None);
    }

    #[test]
    fn activation_is_visible_while_the_guard_is_alive() {
        let guard = Context::enter(Activation { client: Some(ClientId(7)), scene: None });
        assert_eq!(Context::current_client(), Some(ClientId(7)));
        drop(guard);
        assert_eq!(Context::current_client(), None);
    }

    #[test]
    fn dropping_the_guard_clears_even_on_early_return() {
        fn inner() -> Option<ClientId> {
            let _guard = Context::enter(Activation { client: Some(ClientId(1)), scene: None });
            return Context::current_client();
        }
        let seen = inner();
        assert_eq!(seen, Some(ClientId(1)));
        assert_eq!(Context::current_client(), None);
    }
}
