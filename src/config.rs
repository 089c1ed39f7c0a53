//! Runtime and context configuration.

use std::time::Duration;

use crate::diagnostics::DiagnosticConfig;
use crate::runner::ds::heap::HeapConfig;
use crate::runner::plugin::types::{DEFAULT_MAX_CALL_DEPTH, DEFAULT_MEMORY_BUDGET};

/// How contexts created from one runtime share the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyModel {
    /// One lock per runtime; every context operation holds it for its whole duration.
    Serialized,
    /// Contexts run concurrently; operations are only counted as active requests.
    Request,
}

impl Default for ConcurrencyModel {
    fn default() -> Self {
        ConcurrencyModel::Serialized
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Live objects allowed across every context of the runtime. None means unlimited.
    pub max_objects: Option<usize>,
    pub concurrency: ConcurrencyModel,
    /// Longest wait for the runtime lock under [`ConcurrencyModel::Serialized`].
    pub lock_timeout: Duration,
    pub diagnostics: DiagnosticConfig,
}

impl RuntimeConfig {
    pub fn new() -> Self {
        RuntimeConfig {
            max_objects: None,
            concurrency: ConcurrencyModel::default(),
            lock_timeout: Duration::from_secs(5),
            diagnostics: DiagnosticConfig::default(),
        }
    }

    pub fn max_objects(mut self, max_objects: usize) -> Self {
        self.max_objects = Some(max_objects);
        self
    }

    pub fn concurrency(mut self, model: ConcurrencyModel) -> Self {
        self.concurrency = model;
        self
    }

    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn diagnostics(mut self, diagnostics: DiagnosticConfig) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub const DEFAULT_STEP_BUDGET: u64 = 1_000_000;

#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Expected number of live objects; preallocates the heap.
    pub size_hint: usize,
    /// Steps allowed per evaluation. None disables the budget.
    pub step_budget: Option<u64>,
    /// String and element bytes one host operation may create. None disables the budget.
    pub memory_budget: Option<usize>,
    pub max_call_depth: usize,
    /// Allocations between two collections at a safe point.
    pub gc_threshold: usize,
    pub diagnostics: DiagnosticConfig,
}

impl ContextConfig {
    pub fn new() -> Self {
        ContextConfig {
            size_hint: 1024,
            step_budget: Some(DEFAULT_STEP_BUDGET),
            memory_budget: Some(DEFAULT_MEMORY_BUDGET),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            gc_threshold: HeapConfig::unlimited().gc_threshold,
            diagnostics: DiagnosticConfig::default(),
        }
    }

    pub fn size_hint(mut self, size_hint: usize) -> Self {
        self.size_hint = size_hint;
        self
    }

    pub fn step_budget(mut self, budget: u64) -> Self {
        self.step_budget = Some(budget);
        self
    }

    pub fn unbounded(mut self) -> Self {
        self.step_budget = None;
        self
    }

    pub fn memory_budget(mut self, bytes: usize) -> Self {
        self.memory_budget = Some(bytes);
        self
    }

    pub fn unlimited_memory(mut self) -> Self {
        self.memory_budget = None;
        self
    }

    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth.max(1);
        self
    }

    pub fn gc_threshold(mut self, allocations: usize) -> Self {
        self.gc_threshold = allocations;
        self
    }

    pub fn diagnostics(mut self, diagnostics: DiagnosticConfig) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Heap settings for one context. The object limit lives in the runtime's shared budget.
    pub fn heap_config(&self) -> HeapConfig {
        HeapConfig::unlimited().gc_threshold(self.gc_threshold)
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self::new()
    }
}
