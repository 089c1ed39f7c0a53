//! Heap management for the script runtime.
//!
//! Objects live in an arena of generation-checked slots. A handle ([`ObjectId`]) stays valid
//! until the slot is reclaimed by a collection; using it afterwards is reported as an internal
//! error instead of aliasing whatever reuses the slot.
//!
//! Collection is mark/sweep and only happens at safe points chosen by the owner of the heap
//! (between host operations), because the evaluator keeps unrooted handles on the Rust stack
//! while it runs. Everything reachable from the root slots plus the extra roots supplied to
//! [`Heap::collect`] survives.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::JsObject;
use crate::runner::ds::value::JsValue;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId {
    index: u32,
    generation: u32,
}

impl ObjectId {
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Slot in the root table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootId(usize);

/// Configuration for the heap manager.
#[derive(Debug, Clone)]
pub struct HeapConfig {
    /// Maximum number of live objects. None means unlimited.
    pub max_objects: Option<usize>,
    /// Allocations between two automatic collections.
    pub gc_threshold: usize,
}

impl HeapConfig {
    /// Create a new heap configuration with no object limit.
    pub fn unlimited() -> Self {
        HeapConfig {
            max_objects: None,
            gc_threshold: 10_000,
        }
    }

    /// Create a new heap configuration with an object limit.
    pub fn with_limit(max_objects: usize) -> Self {
        HeapConfig {
            max_objects: Some(max_objects),
            ..Self::unlimited()
        }
    }

    pub fn gc_threshold(mut self, allocations: usize) -> Self {
        self.gc_threshold = allocations.max(1);
        self
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self::unlimited()
    }
}

/// Object accounting shared by every heap created from one runtime.
#[derive(Debug)]
pub struct HeapBudget {
    max_objects: Option<usize>,
    live: AtomicUsize,
}

impl HeapBudget {
    pub fn new(max_objects: Option<usize>) -> Self {
        HeapBudget {
            max_objects,
            live: AtomicUsize::new(0),
        }
    }

    /// Reserve room for `count` objects; `false` if that would cross the limit.
    pub fn try_reserve(&self, count: usize) -> bool {
        match self.max_objects {
            None => {
                self.live.fetch_add(count, Ordering::Relaxed);
                true
            }
            Some(max) => {
                let mut current = self.live.load(Ordering::Relaxed);
                loop {
                    if current + count > max {
                        return false;
                    }
                    match self.live.compare_exchange_weak(
                        current,
                        current + count,
                        Ordering::AcqRel,
                        Ordering::Relaxed,
                    ) {
                        Ok(_) => return true,
                        Err(actual) => current = actual,
                    }
                }
            }
        }
    }

    pub fn release(&self, count: usize) {
        let _ = self
            .live
            .fetch_update(Ordering::AcqRel, Ordering::Relaxed, |live| {
                Some(live.saturating_sub(count))
            });
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::Relaxed)
    }

    pub fn max_objects(&self) -> Option<usize> {
        self.max_objects
    }
}

struct Slot {
    generation: u32,
    object: Option<JsObject>,
    marked: bool,
}

/// Arena of script objects.
pub struct Heap {
    config: HeapConfig,
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    roots: Vec<Option<JsValue>>,
    free_roots: Vec<usize>,
    budget: Option<Arc<HeapBudget>>,
    allocations_since_gc: usize,
}

impl Heap {
    /// Create a new heap with the given configuration.
    pub fn new(config: HeapConfig) -> Self {
        Heap {
            config,
            slots: vec![],
            free: vec![],
            live: 0,
            roots: vec![],
            free_roots: vec![],
            budget: None,
            allocations_since_gc: 0,
        }
    }

    /// Create a heap whose allocations also count against a shared budget.
    pub fn with_budget(config: HeapConfig, budget: Arc<HeapBudget>) -> Self {
        let mut heap = Heap::new(config);
        heap.budget = Some(budget);
        heap
    }

    pub fn with_capacity(mut self, size_hint: usize) -> Self {
        self.slots.reserve(size_hint);
        self
    }

    /// Allocate an object.
    ///
    /// Returns an error if the allocation would exceed the local or shared object limit.
    pub fn allocate(&mut self, object: JsObject) -> Result<ObjectId, JErrorType> {
        if let Some(max) = self.config.max_objects {
            if self.live >= max {
                return Err(JErrorType::OutOfMemory);
            }
        }
        if let Some(budget) = &self.budget {
            if !budget.try_reserve(1) {
                return Err(JErrorType::OutOfMemory);
            }
        }
        self.live += 1;
        self.allocations_since_gc += 1;
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.object = Some(object);
                slot.marked = false;
                Ok(ObjectId {
                    index,
                    generation: slot.generation,
                })
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    object: Some(object),
                    marked: false,
                });
                Ok(ObjectId {
                    index,
                    generation: 0,
                })
            }
        }
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.slot(id).is_some()
    }

    fn slot(&self, id: ObjectId) -> Option<&Slot> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation && s.object.is_some())
    }

    pub fn get(&self, id: ObjectId) -> Result<&JsObject, JErrorType> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.object.as_ref())
            .ok_or_else(|| JErrorType::Internal(format!("stale object handle {:?}", id)))
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Result<&mut JsObject, JErrorType> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.object.as_mut())
            .ok_or_else(|| JErrorType::Internal(format!("stale object handle {:?}", id)))
    }

    /// Get the number of live objects.
    pub fn live_objects(&self) -> usize {
        self.live
    }

    /// Get the maximum allowed objects, if any.
    pub fn get_max_objects(&self) -> Option<usize> {
        self.config.max_objects
    }

    // ------------------------------------------------------------------
    // Property access through the prototype chain
    // ------------------------------------------------------------------

    /// Looks `key` up on `id` and its prototypes.
    pub fn lookup(&self, id: ObjectId, key: &str) -> Result<Option<JsValue>, JErrorType> {
        let mut current = Some(id);
        let mut hops = 0;
        while let Some(cid) = current {
            let o = self.get(cid)?;
            if let Some(v) = o.get_own_property(key) {
                return Ok(Some(v));
            }
            current = o.prototype;
            hops += 1;
            if hops > 10_000 {
                return Err(JErrorType::Internal("prototype chain too long".to_string()));
            }
        }
        Ok(None)
    }

    pub fn has_property(&self, id: ObjectId, key: &str) -> Result<bool, JErrorType> {
        Ok(self.lookup(id, key)?.is_some())
    }

    /// Walks the prototype chain of `id`, returning whether `proto` is on it.
    pub fn inherits_from(&self, id: ObjectId, proto: ObjectId) -> Result<bool, JErrorType> {
        let mut current = self.get(id)?.prototype;
        while let Some(cid) = current {
            if cid == proto {
                return Ok(true);
            }
            current = self.get(cid)?.prototype;
        }
        Ok(false)
    }

    // ------------------------------------------------------------------
    // Roots
    // ------------------------------------------------------------------

    pub fn add_root(&mut self, value: JsValue) -> RootId {
        match self.free_roots.pop() {
            Some(i) => {
                self.roots[i] = Some(value);
                RootId(i)
            }
            None => {
                self.roots.push(Some(value));
                RootId(self.roots.len() - 1)
            }
        }
    }

    pub fn replace_root(&mut self, root: RootId, value: JsValue) -> Result<(), JErrorType> {
        match self.roots.get_mut(root.0) {
            Some(slot @ Some(_)) => {
                *slot = Some(value);
                Ok(())
            }
            _ => Err(JErrorType::Internal(format!("root {} is not held", root.0))),
        }
    }

    pub fn root_value(&self, root: RootId) -> Option<&JsValue> {
        self.roots.get(root.0).and_then(|r| r.as_ref())
    }

    pub fn remove_root(&mut self, root: RootId) -> Result<(), JErrorType> {
        match self.roots.get_mut(root.0) {
            Some(slot @ Some(_)) => {
                *slot = None;
                self.free_roots.push(root.0);
                Ok(())
            }
            _ => Err(JErrorType::Internal(format!(
                "root {} released twice",
                root.0
            ))),
        }
    }

    pub fn root_count(&self) -> usize {
        self.roots.iter().filter(|r| r.is_some()).count()
    }

    /// Drops every root slot; returns how many were still held.
    pub fn clear_roots(&mut self) -> usize {
        let held = self.root_count();
        self.roots.clear();
        self.free_roots.clear();
        held
    }

    // ------------------------------------------------------------------
    // Collection
    // ------------------------------------------------------------------

    /// Whether enough allocations happened since the last collection to warrant another one.
    pub fn should_collect(&self) -> bool {
        self.allocations_since_gc >= self.config.gc_threshold
    }

    /// Mark/sweep. Returns the number of reclaimed objects.
    pub fn collect(&mut self, extra_roots: &[JsValue]) -> usize {
        let mut stack: Vec<ObjectId> = vec![];
        for v in self.roots.iter().flatten().chain(extra_roots.iter()) {
            if let JsValue::Object(id) = v {
                stack.push(*id);
            }
        }
        let mut children = vec![];
        while let Some(id) = stack.pop() {
            let slot = match self.slots.get_mut(id.index as usize) {
                Some(s) if s.generation == id.generation && !s.marked => s,
                _ => continue,
            };
            if let Some(o) = &slot.object {
                slot.marked = true;
                o.trace(&mut children);
                stack.append(&mut children);
            }
        }
        let mut freed = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.object.is_none() {
                continue;
            }
            if slot.marked {
                slot.marked = false;
            } else {
                slot.object = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                freed += 1;
            }
        }
        self.live -= freed;
        if let Some(budget) = &self.budget {
            budget.release(freed);
        }
        self.allocations_since_gc = 0;
        freed
    }

    /// Drops every object and root. Handles into this heap become stale.
    pub fn clear(&mut self) {
        self.roots.clear();
        self.free_roots.clear();
        self.free.clear();
        self.slots.clear();
        if let Some(budget) = &self.budget {
            budget.release(self.live);
        }
        self.live = 0;
        self.allocations_since_gc = 0;
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new(HeapConfig::default())
    }
}

impl Drop for Heap {
    fn drop(&mut self) {
        if let Some(budget) = &self.budget {
            budget.release(self.live);
        }
    }
}

/// Pins one value against collection while set.
///
/// A handle is deliberately not `Clone`: it has exactly one owner, and it must be cleared with
/// the heap it was set on before that heap goes away. A handle dropped while still rooted keeps
/// its slot until the heap's owner reclaims leftover roots at teardown.
#[derive(Debug, Default)]
pub struct RootedHandle {
    root: Option<RootId>,
}

impl RootedHandle {
    pub fn new() -> Self {
        RootedHandle { root: None }
    }

    pub fn set(&mut self, heap: &mut Heap, value: JsValue) -> Result<(), JErrorType> {
        match self.root {
            Some(root) => heap.replace_root(root, value),
            None => {
                self.root = Some(heap.add_root(value));
                Ok(())
            }
        }
    }

    pub fn get<'h>(&self, heap: &'h Heap) -> Option<&'h JsValue> {
        self.root.and_then(|r| heap.root_value(r))
    }

    pub fn clear(&mut self, heap: &mut Heap) -> Result<(), JErrorType> {
        match self.root.take() {
            Some(root) => heap.remove_root(root),
            None => Ok(()),
        }
    }

    pub fn is_rooted(&self) -> bool {
        self.root.is_some()
    }
}

impl Drop for RootedHandle {
    fn drop(&mut self) {
        if let Some(root) = self.root {
            tracing::warn!(root = root.0, "rooted handle dropped without being cleared");
        }
    }
}
