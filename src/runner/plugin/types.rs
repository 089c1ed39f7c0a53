//! Core types shared by the evaluator and the built-in library.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::heap::{Heap, ObjectId};
use crate::runner::ds::object::{array_index, string_unit_at, JsObject, ObjectKind};
use crate::runner::ds::object_property::PropertyFlags;
use crate::runner::ds::operations::type_conversion;
use crate::runner::ds::realm::Realm;
use crate::runner::ds::value::JsValue;
use crate::runner::eval::function;
use crate::runner::plugin::registry::BuiltInRegistry;

/// Default ceiling for nested script calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// Default ceiling on string and element bytes created by one host operation.
pub const DEFAULT_MEMORY_BUDGET: usize = 256 << 20;

/// Execution state of one script context: the heap, the realm, the current scope, and the
/// counters that bound a single evaluation.
pub struct EvalContext {
    pub heap: Heap,
    pub realm: Realm,
    /// Innermost environment object; the host scope leaf between evaluations.
    pub scope: ObjectId,
    pub this_value: JsValue,
    steps: u64,
    step_budget: Option<u64>,
    allocated: usize,
    memory_budget: Option<usize>,
    pub call_depth: usize,
    pub max_call_depth: usize,
    /// Line and column of the statement that raised the error currently propagating.
    pub error_position: Option<(usize, usize)>,
}

impl EvalContext {
    /// Builds the realm on `heap` and installs the standard library.
    pub fn new(heap: Heap) -> Result<Self, JErrorType> {
        Self::with_registry(heap, &BuiltInRegistry::with_core())
    }

    pub fn with_registry(mut heap: Heap, registry: &BuiltInRegistry) -> Result<Self, JErrorType> {
        let mut realm = Realm::new(&mut heap)?;
        realm.install(&mut heap, registry)?;
        let global = realm.global;
        Ok(EvalContext {
            heap,
            realm,
            scope: global,
            this_value: JsValue::Object(global),
            steps: 0,
            step_budget: None,
            allocated: 0,
            memory_budget: None,
            call_depth: 0,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            error_position: None,
        })
    }

    pub fn set_step_budget(&mut self, budget: Option<u64>) {
        self.step_budget = budget;
    }

    pub fn step_budget(&self) -> Option<u64> {
        self.step_budget
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn reset_steps(&mut self) {
        self.steps = 0;
    }

    /// Accounts one interpreter step. Fails before the step would run past the budget.
    pub fn tick(&mut self) -> Result<(), JErrorType> {
        if let Some(budget) = self.step_budget {
            if self.steps >= budget {
                return Err(JErrorType::BudgetExceeded);
            }
        }
        self.steps += 1;
        Ok(())
    }

    pub fn set_memory_budget(&mut self, budget: Option<usize>) {
        self.memory_budget = budget;
    }

    pub fn memory_budget(&self) -> Option<usize> {
        self.memory_budget
    }

    /// String and element bytes charged since the last reset.
    pub fn allocated(&self) -> usize {
        self.allocated
    }

    pub fn reset_allocated(&mut self) {
        self.allocated = 0;
    }

    /// Accounts `bytes` of new string or element storage. Fails before the storage is
    /// created when it would run past the memory budget.
    pub fn charge(&mut self, bytes: usize) -> Result<(), JErrorType> {
        let total = self.allocated.saturating_add(bytes);
        if let Some(budget) = self.memory_budget {
            if total > budget {
                return Err(JErrorType::OutOfMemory);
            }
        }
        self.allocated = total;
        Ok(())
    }

    pub fn global(&self) -> ObjectId {
        self.realm.global
    }

    // ------------------------------------------------------------------
    // Allocation helpers
    // ------------------------------------------------------------------

    pub fn alloc(&mut self, object: JsObject) -> Result<ObjectId, JErrorType> {
        self.heap.allocate(object)
    }

    pub fn new_object(&mut self) -> Result<ObjectId, JErrorType> {
        let proto = self.realm.object_prototype;
        self.alloc(JsObject::ordinary(Some(proto)))
    }

    pub fn new_array(&mut self, elements: Vec<JsValue>) -> Result<ObjectId, JErrorType> {
        self.charge(elements.iter().map(JsValue::footprint).sum())?;
        let proto = self.realm.array_prototype;
        self.alloc(JsObject::new(ObjectKind::Array(elements), Some(proto)))
    }

    /// Creates an error object of the named constructor (`Error`, `TypeError`, ...).
    pub fn new_error(&mut self, name: &str, message: &str) -> Result<ObjectId, JErrorType> {
        let proto = self
            .realm
            .prototype_of(name)
            .unwrap_or(self.realm.error_prototype);
        let id = self.alloc(JsObject::new(ObjectKind::Error, Some(proto)))?;
        if !message.is_empty() {
            self.heap.get_mut(id)?.define_property(
                "message",
                JsValue::String(message.to_string()),
                PropertyFlags::hidden(),
            );
        }
        Ok(id)
    }

    /// Materializes a catchable error as the value a `catch` clause binds.
    pub fn error_to_value(&mut self, error: &JErrorType) -> Result<JsValue, JErrorType> {
        match error {
            JErrorType::Thrown(v) => Ok(v.clone()),
            e => match e.error_name() {
                Some(name) => Ok(JsValue::Object(self.new_error(name, &e.message())?)),
                None => Err(e.clone()),
            },
        }
    }

    // ------------------------------------------------------------------
    // Property access on arbitrary values
    // ------------------------------------------------------------------

    /// `base[key]`, boxing primitives through their prototypes.
    pub fn get_property(&mut self, base: &JsValue, key: &str) -> Result<JsValue, JErrorType> {
        let holder = match base {
            JsValue::Object(id) => *id,
            JsValue::String(s) => {
                if key == "length" {
                    return Ok(JsValue::from_i64(s.encode_utf16().count() as i64));
                }
                if let Some(i) = array_index(key) {
                    if let Some(c) = string_unit_at(s, i) {
                        return Ok(c);
                    }
                }
                self.realm.string_prototype
            }
            JsValue::Number(_) => self.realm.number_prototype,
            JsValue::Boolean(_) => self.realm.boolean_prototype,
            JsValue::Undefined | JsValue::Null => {
                return Err(JErrorType::TypeError(format!(
                    "cannot read property '{}' of {}",
                    key, base
                )))
            }
        };
        Ok(self
            .heap
            .lookup(holder, key)?
            .unwrap_or(JsValue::Undefined))
    }

    /// `base[key] = value`. Writes to read-only properties and frozen objects are ignored;
    /// writes to primitives are dropped.
    pub fn put_property(
        &mut self,
        base: &JsValue,
        key: &str,
        value: JsValue,
    ) -> Result<(), JErrorType> {
        match base {
            JsValue::Object(id) => {
                let growth = self.heap.get(*id)?.growth(key, &value);
                self.charge(growth)?;
                self.heap.get_mut(*id)?.put(key, value);
                Ok(())
            }
            JsValue::Undefined | JsValue::Null => Err(JErrorType::TypeError(format!(
                "cannot set property '{}' of {}",
                key, base
            ))),
            _ => Ok(()),
        }
    }

    pub fn call(
        &mut self,
        callee: &JsValue,
        this: JsValue,
        args: Vec<JsValue>,
    ) -> Result<JsValue, JErrorType> {
        function::call_value(callee, this, args, self)
    }

    pub fn is_callable(&self, value: &JsValue) -> bool {
        match value {
            JsValue::Object(id) => self
                .heap
                .get(*id)
                .map(|o| o.is_callable())
                .unwrap_or(false),
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Conversions
    // ------------------------------------------------------------------

    pub fn to_string(&mut self, value: &JsValue) -> Result<String, JErrorType> {
        type_conversion::to_string(value, self)
    }

    pub fn to_number(&mut self, value: &JsValue) -> Result<f64, JErrorType> {
        type_conversion::to_number(value, self)
    }

    pub fn to_boolean(&self, value: &JsValue) -> bool {
        type_conversion::to_boolean(value)
    }
}

/// Function signature for built-in methods.
/// Native functions receive the evaluation context, `this` value, and arguments.
pub type NativeFn =
    fn(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType>;

/// Built-in object definition.
/// Represents a built-in like `Array`, `Math` or `console`, installed into every new realm.
pub struct BuiltInObject {
    /// Name of the global binding (e.g., "Array", "Math").
    pub name: String,

    /// Constructor whose prototype this one's prototype inherits from ("Object" by default).
    pub prototype: Option<String>,

    /// Methods defined on the object itself (`Object.keys`).
    pub methods: Vec<(String, NativeFn)>,

    /// Methods defined on the prototype (`Array.prototype.push`).
    pub prototype_methods: Vec<(String, NativeFn)>,

    /// Static properties.
    pub properties: Vec<(String, JsValue)>,

    /// Properties of the prototype (`TypeError.prototype.name`).
    pub prototype_properties: Vec<(String, JsValue)>,

    /// Behaviour when called as a function. Objects without one are plain namespaces.
    pub constructor: Option<NativeFn>,

    /// Behaviour under `new`, when it differs from a plain call.
    pub construct: Option<NativeFn>,
}

impl BuiltInObject {
    /// Create a new built-in object with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        BuiltInObject {
            name: name.into(),
            prototype: Some("Object".to_string()),
            methods: Vec::new(),
            prototype_methods: Vec::new(),
            properties: Vec::new(),
            prototype_properties: Vec::new(),
            constructor: None,
            construct: None,
        }
    }

    /// Set the prototype chain parent.
    pub fn with_prototype(mut self, prototype: impl Into<String>) -> Self {
        self.prototype = Some(prototype.into());
        self
    }

    /// Add a native method.
    pub fn add_method(mut self, name: impl Into<String>, func: NativeFn) -> Self {
        self.methods.push((name.into(), func));
        self
    }

    /// Add a native method to the prototype.
    pub fn add_prototype_method(mut self, name: impl Into<String>, func: NativeFn) -> Self {
        self.prototype_methods.push((name.into(), func));
        self
    }

    /// Add a property.
    pub fn add_property(mut self, name: impl Into<String>, value: JsValue) -> Self {
        self.properties.push((name.into(), value));
        self
    }

    pub fn add_prototype_property(mut self, name: impl Into<String>, value: JsValue) -> Self {
        self.prototype_properties.push((name.into(), value));
        self
    }

    /// Set the constructor function; `new` behaves like a call unless
    /// [`with_construct`](Self::with_construct) overrides it.
    pub fn with_constructor(mut self, constructor: NativeFn) -> Self {
        self.constructor = Some(constructor);
        self
    }

    pub fn with_construct(mut self, construct: NativeFn) -> Self {
        self.construct = Some(construct);
        self
    }

    /// Whether installing this object creates a prototype object.
    pub fn has_prototype_object(&self) -> bool {
        self.constructor.is_some()
            || !self.prototype_methods.is_empty()
            || !self.prototype_properties.is_empty()
    }
}
