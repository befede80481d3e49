// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::{Mutex, RwLock};
use tickrpc_core::EncodedValue;
use tickrpc_transport::{
    DecodedArgs, DecodedValue, HandleOutcome, ProcedureHandle, RegistryError, RunFailure, ServiceRegistry,
    decode_json_arguments,
};

enum ProcedureBehavior {
    Immediate(DecodedValue),
    SuspendThenComplete { remaining: AtomicU32, value: DecodedValue },
    AlwaysDomainError(String),
    AlwaysUnexpectedError(String),
    Dynamic(Arc<Mutex<DecodedValue>>),
    Custom(Box<dyn Fn() -> HandleOutcome + Send + Sync>),
}

/// A hand-registered [`ServiceRegistry`] for continuation and stream tests:
/// register a procedure with the behavior the scenario needs, then drive it
/// through `Engine::tick()`.
#[derive(Default)]
pub struct MockServiceRegistry {
    procedures: RwLock<std::collections::HashMap<ProcedureHandle, ProcedureBehavior>>,
}

impl MockServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completes on the first poll with `value`.
    pub fn register_immediate(&self, service: &str, procedure: &str, value: DecodedValue) {
        self.procedures
            .write()
            .insert(ProcedureHandle::new(service, procedure), ProcedureBehavior::Immediate(value));
    }

    /// Returns `Pending` for `suspensions` polls, then completes with `value`.
    pub fn register_suspend_then_complete(&self, service: &str, procedure: &str, suspensions: u32, value: DecodedValue) {
        self.procedures.write().insert(
            ProcedureHandle::new(service, procedure),
            ProcedureBehavior::SuspendThenComplete { remaining: AtomicU32::new(suspensions), value },
        );
    }

    /// Every poll reports a domain error (§7.1): no stack trace attached.
    pub fn register_domain_error(&self, service: &str, procedure: &str, message: impl Into<String>) {
        self.procedures.write().insert(
            ProcedureHandle::new(service, procedure),
            ProcedureBehavior::AlwaysDomainError(message.into()),
        );
    }

    /// Every poll fails unexpectedly (§7.2): the engine attaches a message.
    pub fn register_unexpected_error(&self, service: &str, procedure: &str, message: impl Into<String>) {
        self.procedures.write().insert(
            ProcedureHandle::new(service, procedure),
            ProcedureBehavior::AlwaysUnexpectedError(message.into()),
        );
    }

    /// Completes immediately with whatever the returned cell currently
    /// holds — mutate it from the test to drive a stream-diffing scenario.
    pub fn register_dynamic(&self, service: &str, procedure: &str, initial: DecodedValue) -> Arc<Mutex<DecodedValue>> {
        let cell = Arc::new(Mutex::new(initial));
        self.procedures
            .write()
            .insert(ProcedureHandle::new(service, procedure), ProcedureBehavior::Dynamic(cell.clone()));
        cell
    }

    /// Runs `handler` on every poll and reports whatever it returns — lets a
    /// test couple a procedure's completion to a side effect, such as
    /// advancing a [`crate::ManualClock`] to simulate handler cost.
    pub fn register_custom(
        &self,
        service: &str,
        procedure: &str,
        handler: impl Fn() -> HandleOutcome + Send + Sync + 'static,
    ) {
        self.procedures
            .write()
            .insert(ProcedureHandle::new(service, procedure), ProcedureBehavior::Custom(Box::new(handler)));
    }
}

impl ServiceRegistry for MockServiceRegistry {
    fn get_procedure_signature(&self, service: &str, procedure: &str) -> Result<ProcedureHandle, RegistryError> {
        let handle = ProcedureHandle::new(service, procedure);
        if self.procedures.read().contains_key(&handle) {
            Ok(handle)
        } else {
            Err(RegistryError::UnknownProcedure { service: service.to_string(), procedure: procedure.to_string() })
        }
    }

    fn get_arguments(&self, _handle: &ProcedureHandle, encoded: &[EncodedValue]) -> Result<DecodedArgs, RegistryError> {
        decode_json_arguments(encoded)
    }

    fn handle_request(&self, handle: &ProcedureHandle, _args: &DecodedArgs) -> Result<HandleOutcome, RunFailure> {
        let procedures = self.procedures.read();
        let behavior = procedures
            .get(handle)
            .ok_or_else(|| RunFailure::new(format!("unregistered procedure {}.{}", handle.service, handle.procedure)))?;
        match behavior {
            ProcedureBehavior::Immediate(value) => Ok(HandleOutcome::Done(value.clone())),
            ProcedureBehavior::SuspendThenComplete { remaining, value } => {
                if remaining.load(Ordering::SeqCst) == 0 {
                    Ok(HandleOutcome::Done(value.clone()))
                } else {
                    remaining.fetch_sub(1, Ordering::SeqCst);
                    Ok(HandleOutcome::Pending)
                }
            }
            ProcedureBehavior::AlwaysDomainError(message) => Ok(HandleOutcome::DomainError(message.clone())),
            ProcedureBehavior::AlwaysUnexpectedError(message) => Err(RunFailure::new(message.clone())),
            ProcedureBehavior::Dynamic(cell) => Ok(HandleOutcome::Done(cell.lock().clone())),
            ProcedureBehavior::Custom(handler) => Ok(handler()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickrpc_transport::encode_value;

    #[test]
    fn unregistered_procedures_are_unknown() {
        let registry = MockServiceRegistry::new();
        assert!(registry.get_procedure_signature("orbit", "altitude").is_err());
    }

    #[test]
    fn suspend_then_complete_suspends_exactly_n_times() {
        let registry = MockServiceRegistry::new();
        registry.register_suspend_then_complete("orbit", "burn", 2, serde_json::json!("done"));
        let handle = registry.get_procedure_signature("orbit", "burn").unwrap();
        let args = vec![];
        assert!(matches!(registry.handle_request(&handle, &args).unwrap(), HandleOutcome::Pending));
        assert!(matches!(registry.handle_request(&handle, &args).unwrap(), HandleOutcome::Pending));
        match registry.handle_request(&handle, &args).unwrap() {
            HandleOutcome::Done(v) => assert_eq!(v, serde_json::json!("done")),
            _ => panic!("expected Done on the third poll"),
        }
    }

    #[test]
    fn dynamic_procedures_reflect_mutations() {
        let registry = MockServiceRegistry::new();
        let cell = registry.register_dynamic("orbit", "altitude", serde_json::json!(42));
        let handle = registry.get_procedure_signature("orbit", "altitude").unwrap();
        let args = vec![];
        match registry.handle_request(&handle, &args).unwrap() {
            HandleOutcome::Done(v) => assert_eq!(v, serde_json::json!(42)),
            _ => panic!("expected Done"),
        }
        *cell.lock() = serde_json::json!(43);
        match registry.handle_request(&handle, &args).unwrap() {
            HandleOutcome::Done(v) => assert_eq!(v, serde_json::json!(43)),
            _ => panic!("expected Done"),
        }
    }

    #[test]
    fn args_round_trip_through_json_decoding() {
        let registry = MockServiceRegistry::new();
        registry.register_immediate("orbit", "altitude", serde_json::json!(1));
        let handle = registry.get_procedure_signature("orbit", "altitude").unwrap();
        let encoded = vec![encode_value(&serde_json::json!(7))];
        let decoded = registry.get_arguments(&handle, &encoded).unwrap();
        assert_eq!(decoded, vec![serde_json::json!(7)]);
    }
}
