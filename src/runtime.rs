//! The engine instance shared by contexts.
//!
//! A runtime owns the object budget every context heap allocates against and the concurrency
//! discipline of [`ConcurrencyModel`]. Contexts hold an `Arc` to it; the runtime refuses
//! [`Runtime::destroy`] while any of them is alive.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::config::{ConcurrencyModel, RuntimeConfig};
use crate::diagnostics::Code;
use crate::error::ScriptError;
use crate::runner::ds::heap::HeapBudget;

#[derive(Debug)]
pub struct Runtime {
    id: Uuid,
    config: RuntimeConfig,
    budget: Arc<HeapBudget>,
    lock: Mutex<()>,
    contexts: AtomicUsize,
    active_requests: AtomicUsize,
    destroyed: AtomicBool,
}

/// Held for the duration of one context operation.
pub(crate) enum EngineClaim<'r> {
    Locked(MutexGuard<'r, ()>),
    Request(&'r AtomicUsize),
}

impl Drop for EngineClaim<'_> {
    fn drop(&mut self) {
        if let EngineClaim::Request(active) = self {
            active.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Result<Arc<Runtime>, ScriptError> {
        if config.max_objects == Some(0) {
            return Err(ScriptError::InvalidArgument(
                "max_objects must be positive".to_string(),
            ));
        }
        let runtime = Runtime {
            id: Uuid::new_v4(),
            budget: Arc::new(HeapBudget::new(config.max_objects)),
            lock: Mutex::new(()),
            contexts: AtomicUsize::new(0),
            active_requests: AtomicUsize::new(0),
            destroyed: AtomicBool::new(false),
            config,
        };
        diag_debug!(
            runtime.config.diagnostics,
            Code::RuntimeCreated,
            runtime = %runtime.id,
            concurrency = ?runtime.config.concurrency,
            "runtime created"
        );
        Ok(Arc::new(runtime))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn live_contexts(&self) -> usize {
        self.contexts.load(Ordering::Acquire)
    }

    pub fn active_requests(&self) -> usize {
        self.active_requests.load(Ordering::Acquire)
    }

    /// Objects currently alive across all contexts.
    pub fn live_objects(&self) -> usize {
        self.budget.live()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    pub(crate) fn heap_budget(&self) -> Arc<HeapBudget> {
        Arc::clone(&self.budget)
    }

    /// Takes the engine for one operation: the runtime lock under the serialized model, an
    /// active request otherwise.
    pub(crate) fn claim(&self) -> Result<EngineClaim<'_>, ScriptError> {
        match self.config.concurrency {
            ConcurrencyModel::Serialized => match self.lock.try_lock_for(self.config.lock_timeout) {
                Some(guard) => Ok(EngineClaim::Locked(guard)),
                None => {
                    diag_error!(
                        self.config.diagnostics,
                        Code::LockTimeout,
                        runtime = %self.id,
                        timeout_ms = self.config.lock_timeout.as_millis() as u64,
                        "timed out waiting for the runtime lock"
                    );
                    Err(ScriptError::System(format!(
                        "timed out after {:?} waiting for the runtime lock",
                        self.config.lock_timeout
                    )))
                }
            },
            ConcurrencyModel::Request => {
                self.active_requests.fetch_add(1, Ordering::AcqRel);
                Ok(EngineClaim::Request(&self.active_requests))
            }
        }
    }

    pub(crate) fn register_context(&self) -> Result<(), ScriptError> {
        if self.is_destroyed() {
            return Err(ScriptError::InvalidArgument(
                "runtime has been destroyed".to_string(),
            ));
        }
        self.contexts.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    pub(crate) fn unregister_context(&self) {
        self.contexts.fetch_sub(1, Ordering::AcqRel);
    }

    /// Marks the runtime destroyed. Fails while contexts created from it are still alive;
    /// calling it again afterwards is a no-op.
    pub fn destroy(&self) -> Result<(), ScriptError> {
        let _claim = self.claim()?;
        let live = self.live_contexts();
        if live > 0 {
            return Err(ScriptError::RuntimeInUse(live));
        }
        if !self.destroyed.swap(true, Ordering::AcqRel) {
            diag_debug!(
                self.config.diagnostics,
                Code::RuntimeDestroyed,
                runtime = %self.id,
                "runtime destroyed"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_serialized_claims_exclude_each_other() {
        let runtime = Runtime::new(RuntimeConfig::new().lock_timeout(Duration::from_millis(20))).unwrap();
        let first = runtime.claim().unwrap();
        assert!(matches!(runtime.claim(), Err(ScriptError::System(_))));
        drop(first);
        assert!(runtime.claim().is_ok());
    }

    #[test]
    fn test_request_model_counts_active_operations() {
        let runtime = Runtime::new(RuntimeConfig::new().concurrency(ConcurrencyModel::Request)).unwrap();
        let a = runtime.claim().unwrap();
        let b = runtime.claim().unwrap();
        assert_eq!(runtime.active_requests(), 2);
        drop(a);
        drop(b);
        assert_eq!(runtime.active_requests(), 0);
    }

    #[test]
    fn test_destroy_refuses_while_contexts_live() {
        let runtime = Runtime::new(RuntimeConfig::new()).unwrap();
        runtime.register_context().unwrap();
        assert_eq!(runtime.destroy(), Err(ScriptError::RuntimeInUse(1)));
        runtime.unregister_context();
        runtime.destroy().unwrap();
        assert!(runtime.register_context().is_err());
    }
}
