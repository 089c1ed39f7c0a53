//! A script session: engine state, scope chain and pending exception.
//!
//! Every public operation claims the runtime first (see [`crate::config::ConcurrencyModel`]),
//! runs, and then gives the collector a chance to run at the safe point on the way out.

use std::sync::Arc;

use tracing::debug_span;
use uuid::Uuid;

use crate::config::ContextConfig;
use crate::diagnostics::Code;
use crate::dom::{self, DocumentNode};
use crate::error::ScriptError;
use crate::marshal::{from_native, to_native, MarshalError};
use crate::parser::JsParser;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::heap::Heap;
use crate::runner::ds::object_property::PropertyFlags;
use crate::runner::ds::value::JsValue;
use crate::runner::eval::execute_program;
use crate::runner::plugin::types::EvalContext;
use crate::runtime::Runtime;
use crate::scope::{PathTarget, ScopeChain, ScopeKind, VarPath};
use crate::value::{Value, ValueMap};

pub struct Context {
    id: Uuid,
    runtime: Arc<Runtime>,
    config: ContextConfig,
    engine: EvalContext,
    scopes: ScopeChain,
    exception: Option<Value>,
    /// Set once a fatal error has been seen; every later operation fails with it.
    poisoned: Option<String>,
    torn_down: bool,
}

impl Context {
    /// Creates a context with its own heap, realm and global scope. Nothing is registered with
    /// the runtime unless every step succeeds.
    pub fn new(runtime: &Arc<Runtime>, config: ContextConfig) -> Result<Context, ScriptError> {
        let _claim = runtime.claim()?;
        if runtime.is_destroyed() {
            return Err(ScriptError::InvalidArgument(
                "runtime has been destroyed".to_string(),
            ));
        }
        let heap = Heap::with_budget(config.heap_config(), runtime.heap_budget())
            .with_capacity(config.size_hint);
        let mut engine = EvalContext::new(heap)?;
        engine.max_call_depth = config.max_call_depth;
        engine.set_step_budget(config.step_budget);
        engine.set_memory_budget(config.memory_budget);
        let scopes = ScopeChain::new(engine.global());
        runtime.register_context()?;

        let context = Context {
            id: Uuid::new_v4(),
            runtime: Arc::clone(runtime),
            config,
            engine,
            scopes,
            exception: None,
            poisoned: None,
            torn_down: false,
        };
        diag_debug!(
            context.config.diagnostics,
            Code::ContextCreated,
            context = %context.id,
            runtime = %context.runtime.id(),
            objects = context.engine.heap.live_objects(),
            "context created"
        );
        Ok(context)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Runs `op` with the engine claimed and collects garbage afterwards if the allocation
    /// threshold was crossed.
    fn operation<T>(
        &mut self,
        name: &'static str,
        op: impl FnOnce(&mut Self) -> Result<T, ScriptError>,
    ) -> Result<T, ScriptError> {
        if let Some(reason) = &self.poisoned {
            return Err(ScriptError::Fatal(reason.clone()));
        }
        let runtime = Arc::clone(&self.runtime);
        let _claim = runtime.claim()?;
        let span = debug_span!("context", id = %self.id, op = name);
        let _entered = span.enter();

        self.engine.error_position = None;
        self.engine.reset_allocated();
        let result = op(self);
        if let Err(ScriptError::Fatal(reason)) = &result {
            diag_error!(
                self.config.diagnostics,
                Code::Fatal,
                context = %self.id,
                reason = %reason,
                "context poisoned"
            );
            self.poisoned = Some(reason.clone());
        } else if self.engine.heap.should_collect() {
            self.collect();
        }
        result
    }

    fn collect(&mut self) -> usize {
        let mut roots = self.engine.realm.intrinsics();
        roots.extend(self.scopes.objects());
        let before = self.engine.heap.live_objects();
        let freed = self.engine.heap.collect(&roots);
        diag_debug!(
            self.config.diagnostics,
            Code::GarbageCollected,
            context = %self.id,
            before = before,
            freed = freed,
            "garbage collected"
        );
        freed
    }

    // ------------------------------------------------------------------
    // Errors
    // ------------------------------------------------------------------

    /// Turns an engine error into a host error. Script-level errors are captured as the
    /// pending exception.
    fn fail(&mut self, error: JErrorType, logging: bool) -> ScriptError {
        match error {
            JErrorType::BudgetExceeded => {
                if logging {
                    diag_warn!(
                        self.config.diagnostics,
                        Code::BudgetExceeded,
                        context = %self.id,
                        budget = self.engine.step_budget().unwrap_or(0),
                        "step budget exceeded"
                    );
                }
                ScriptError::BudgetExceeded
            }
            JErrorType::OutOfMemory => {
                if logging {
                    diag_warn!(
                        self.config.diagnostics,
                        Code::OutOfMemory,
                        context = %self.id,
                        allocated = self.engine.allocated(),
                        objects = self.engine.heap.live_objects(),
                        "memory budget exceeded"
                    );
                }
                ScriptError::OutOfMemory
            }
            JErrorType::Internal(reason) => ScriptError::Fatal(reason),
            error => {
                let exception = self.exception_map(&error);
                let message = exception
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                if logging {
                    let (line, column) = self.engine.error_position.unwrap_or((0, 0));
                    diag_error!(
                        self.config.diagnostics,
                        Code::ScriptException,
                        context = %self.id,
                        line = line,
                        column = column,
                        message = %message,
                        "uncaught script exception"
                    );
                }
                self.exception = Some(Value::Map(exception));
                ScriptError::Exception { message }
            }
        }
    }

    fn exception_map(&mut self, error: &JErrorType) -> ValueMap {
        let mut map = ValueMap::new();
        let (name, message) = match error {
            JErrorType::Thrown(value) => {
                let name = match value {
                    JsValue::Object(_) => match self.engine.get_property(value, "name") {
                        Ok(JsValue::String(s)) => Some(s),
                        _ => None,
                    },
                    _ => None,
                };
                let message = match value {
                    JsValue::Object(_) => self
                        .engine
                        .get_property(value, "message")
                        .and_then(|m| match m {
                            JsValue::Undefined => self.engine.to_string(value),
                            m => self.engine.to_string(&m),
                        }),
                    v => self.engine.to_string(v),
                };
                if let Ok(v) = from_native(value, &self.engine) {
                    map.set("value", v);
                }
                (name, message.unwrap_or_else(|_| error.message()))
            }
            e => (e.error_name().map(str::to_string), e.message()),
        };
        map.set("message", message);
        if let Some(name) = name {
            map.set("name", name);
        }
        if let Some((line, column)) = self.engine.error_position {
            map.set("lineNumber", line as i64);
            map.set("columnNumber", column as i64);
        }
        map
    }

    // ------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------

    /// Compiles and runs `source` against the leaf scope.
    ///
    /// The pending exception and the step counter are reset first. With `want_result` unset
    /// the completion value is discarded unconverted; with `logging` unset no diagnostics are
    /// emitted for failures.
    pub fn evaluate(&mut self, source: &str, want_result: bool, logging: bool) -> Result<Option<Value>, ScriptError> {
        self.operation("evaluate", |this| {
            let value = this.run(source, logging)?;
            if !want_result || value.is_nullish() {
                return Ok(None);
            }
            this.convert_result(&value, logging).map(Some)
        })
    }

    /// `evaluate(script, true, true)`.
    pub fn eval(&mut self, script: &str) -> Result<Option<Value>, ScriptError> {
        self.evaluate(script, true, true)
    }

    fn run(&mut self, source: &str, logging: bool) -> Result<JsValue, ScriptError> {
        self.exception = None;
        self.engine.reset_steps();
        let program = match JsParser::parse_to_ast_from_str(source) {
            Ok(p) => p,
            Err(e) => {
                if logging {
                    diag_error!(
                        self.config.diagnostics,
                        Code::SyntaxError,
                        context = %self.id,
                        line = e.line,
                        column = e.column,
                        message = %e.message,
                        "script does not compile"
                    );
                }
                return Err(ScriptError::Syntax {
                    message: e.message,
                    line: e.line,
                    column: e.column,
                });
            }
        };
        let leaf = self.scopes.leaf_object();
        let result = execute_program(&program, leaf, &mut self.engine);
        diag_debug!(
            self.config.diagnostics,
            Code::Evaluated,
            context = %self.id,
            steps = self.engine.steps(),
            ok = result.is_ok(),
            "evaluated"
        );
        result.map_err(|e| self.fail(e, logging))
    }

    fn convert_result(&self, value: &JsValue, logging: bool) -> Result<Value, ScriptError> {
        from_native(value, &self.engine).map_err(|e| {
            if logging {
                diag_warn!(
                    self.config.diagnostics,
                    Code::ConversionFailed,
                    context = %self.id,
                    reason = %e,
                    "result cannot be converted"
                );
            }
            ScriptError::from(e)
        })
    }

    /// Exception captured by the last evaluation, until the next one starts.
    pub fn last_exception(&self) -> Option<&Value> {
        self.exception.as_ref()
    }

    // ------------------------------------------------------------------
    // Variables
    // ------------------------------------------------------------------

    /// Declares `name` in the leaf scope, or assigns a dotted path in place. `None` binds
    /// undefined.
    pub fn create_var(&mut self, name: &str, value: Option<&Value>) -> Result<(), ScriptError> {
        let path = VarPath::parse(name)?;
        self.operation("create_var", |this| {
            let target = this.declaration_target(&path)?;
            let native = match value {
                Some(v) => to_native(v, &mut this.engine)?,
                None => JsValue::Undefined,
            };
            this.write(&path, target, native)
        })
    }

    /// Like [`Context::create_var`] with the value of a script expression.
    pub fn create_var_expr(&mut self, name: &str, expr: &str) -> Result<(), ScriptError> {
        let path = VarPath::parse(name)?;
        self.operation("create_var_expr", |this| {
            let target = this.declaration_target(&path)?;
            let native = this.run(expr, true)?;
            this.write(&path, target, native)
        })
    }

    /// Assigns the nearest binding of `name`, creating it in the leaf if there is none. Dotted
    /// paths are assigned in place and never create a leaf binding.
    pub fn set_var(&mut self, name: &str, value: &Value) -> Result<(), ScriptError> {
        let path = VarPath::parse(name)?;
        self.operation("set_var", |this| {
            let target = this.assignment_target(&path)?;
            let native = to_native(value, &mut this.engine)?;
            this.write(&path, target, native)
        })
    }

    pub fn set_var_expr(&mut self, name: &str, expr: &str) -> Result<(), ScriptError> {
        let path = VarPath::parse(name)?;
        self.operation("set_var_expr", |this| {
            let target = this.assignment_target(&path)?;
            let native = this.run(expr, true)?;
            this.write(&path, target, native)
        })
    }

    /// Value of `name`: None when it holds null, `NotFound` when it is undefined or unbound.
    pub fn get_var(&mut self, name: &str) -> Result<Option<Value>, ScriptError> {
        let path = VarPath::parse(name)?;
        self.operation("get_var", |this| {
            let value = this.read(&path, true)?;
            match from_native(&value, &this.engine) {
                Ok(v) => Ok(Some(v)),
                Err(MarshalError::Null) => Ok(None),
                Err(MarshalError::Undefined) => Err(ScriptError::NotFound(path.to_string())),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Ok when `name` is defined, a stored null included; `NotFound` when it is undefined or
    /// unbound. Runs quietly and leaves the pending exception as it was.
    pub fn check_var(&mut self, name: &str) -> Result<(), ScriptError> {
        let path = VarPath::parse(name)?;
        self.operation("check_var", |this| {
            let pending = this.exception.take();
            let result = this.read(&path, false).map(|_| ());
            this.exception = pending;
            result
        })
    }

    /// Makes the property `name` resolves to read-only for both scripts and host writes.
    pub fn set_read_only(&mut self, name: &str) -> Result<(), ScriptError> {
        let path = VarPath::parse(name)?;
        self.operation("set_read_only", |this| {
            let target = this.resolve(&path, true)?;
            let id = match &target.holder {
                JsValue::Object(id) => *id,
                _ => return Err(ScriptError::NotFound(path.to_string())),
            };
            let holder = this.engine.heap.get_mut(id)?;
            if !holder.add_flags(&target.key, PropertyFlags::READ_ONLY) {
                return Err(ScriptError::NotFound(path.to_string()));
            }
            Ok(())
        })
    }

    /// Binds a read-only view of `document` under `name` in the leaf scope.
    pub fn expose_document(&mut self, name: &str, document: &Arc<DocumentNode>) -> Result<(), ScriptError> {
        let path = VarPath::parse(name)?;
        if path.is_qualified() {
            return Err(ScriptError::InvalidArgument(format!(
                "'{}' must be a plain name",
                name
            )));
        }
        self.operation("expose_document", |this| {
            let target = this.scopes.leaf_target(path.first(), &this.engine)?;
            let root = dom::expose(document, &mut this.engine)?;
            this.write(&path, target, JsValue::Object(root))
        })
    }

    fn resolve(&mut self, path: &VarPath, logging: bool) -> Result<PathTarget, ScriptError> {
        match self.scopes.resolve(path, &mut self.engine) {
            Ok(Some(target)) => Ok(target),
            Ok(None) => Err(ScriptError::NotFound(path.to_string())),
            Err(e) => Err(self.fail(e, logging)),
        }
    }

    fn declaration_target(&mut self, path: &VarPath) -> Result<PathTarget, ScriptError> {
        if path.is_qualified() {
            self.resolve(path, true)
        } else {
            Ok(self.scopes.leaf_target(path.first(), &self.engine)?)
        }
    }

    fn assignment_target(&mut self, path: &VarPath) -> Result<PathTarget, ScriptError> {
        match self.resolve(path, true) {
            Err(ScriptError::NotFound(_)) if !path.is_qualified() => {
                Ok(self.scopes.leaf_target(path.first(), &self.engine)?)
            }
            other => other,
        }
    }

    fn write(&mut self, path: &VarPath, target: PathTarget, value: JsValue) -> Result<(), ScriptError> {
        if target.read_only {
            diag_debug!(
                self.config.diagnostics,
                Code::ReadOnlyWrite,
                context = %self.id,
                name = %path,
                "write to read-only target refused"
            );
            return Err(ScriptError::ReadOnly(path.to_string()));
        }
        match &target.holder {
            JsValue::Object(id) => {
                if !self.engine.heap.get_mut(*id)?.put(&target.key, value) {
                    return Err(ScriptError::ReadOnly(path.to_string()));
                }
                Ok(())
            }
            JsValue::Undefined | JsValue::Null => {
                let error = JErrorType::TypeError(format!(
                    "cannot set property '{}' of {}",
                    target.key, target.holder
                ));
                Err(self.fail(error, true))
            }
            _ => Err(ScriptError::InvalidArgument(format!(
                "'{}' does not name an object property",
                path
            ))),
        }
    }

    fn read(&mut self, path: &VarPath, logging: bool) -> Result<JsValue, ScriptError> {
        let target = self.resolve(path, logging)?;
        let value = match self.engine.get_property(&target.holder, &target.key) {
            Ok(v) => v,
            Err(e) => return Err(self.fail(e, logging)),
        };
        if let JsValue::Undefined = value {
            return Err(ScriptError::NotFound(path.to_string()));
        }
        Ok(value)
    }

    // ------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------

    pub fn push_scope(&mut self, name: &str, kind: ScopeKind) -> Result<(), ScriptError> {
        self.operation("push_scope", |this| {
            this.scopes.push_scope(name, kind, &mut this.engine)?;
            this.engine.scope = this.scopes.leaf_object();
            diag_debug!(
                this.config.diagnostics,
                Code::ScopePushed,
                context = %this.id,
                name = name,
                kind = ?kind,
                depth = this.scopes.depth(),
                "scope pushed"
            );
            Ok(())
        })
    }

    pub fn pop_scope(&mut self) -> Result<(), ScriptError> {
        self.operation("pop_scope", |this| {
            this.scopes.pop_scope(&mut this.engine)?;
            this.engine.scope = this.scopes.leaf_object();
            diag_debug!(
                this.config.diagnostics,
                Code::ScopePopped,
                context = %this.id,
                depth = this.scopes.depth(),
                "scope popped"
            );
            Ok(())
        })
    }

    pub fn clear_scopes(&mut self) -> Result<(), ScriptError> {
        self.operation("clear_scopes", |this| {
            this.scopes.clear_scopes(&mut this.engine)?;
            this.engine.scope = this.scopes.leaf_object();
            diag_debug!(
                this.config.diagnostics,
                Code::ScopesCleared,
                context = %this.id,
                "scopes cleared"
            );
            Ok(())
        })
    }

    pub fn scope_name(&self) -> &str {
        self.scopes.leaf_name()
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.depth()
    }

    // ------------------------------------------------------------------
    // Memory
    // ------------------------------------------------------------------

    /// Runs a collection now. Returns the number of objects reclaimed.
    pub fn collect_garbage(&mut self) -> Result<usize, ScriptError> {
        self.operation("collect_garbage", |this| Ok(this.collect()))
    }

    pub fn live_objects(&self) -> usize {
        self.engine.heap.live_objects()
    }

    /// Tears the context down now instead of at drop, reporting a failure to claim the
    /// runtime.
    pub fn destroy(mut self) -> Result<(), ScriptError> {
        let runtime = Arc::clone(&self.runtime);
        let claim = runtime.claim()?;
        self.teardown();
        drop(claim);
        Ok(())
    }

    /// Scopes top-down, then forgotten roots, then the heap.
    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        if self.poisoned.is_none() {
            if let Err(e) = self.scopes.clear_scopes(&mut self.engine) {
                diag_warn!(
                    self.config.diagnostics,
                    Code::ContextDestroyed,
                    context = %self.id,
                    error = %e,
                    "scope release failed during teardown"
                );
            }
        }
        let forgotten = self.engine.heap.clear_roots();
        if forgotten > 0 {
            diag_warn!(
                self.config.diagnostics,
                Code::ForgottenRoots,
                context = %self.id,
                roots = forgotten,
                "rooted handles still held at teardown"
            );
        }
        self.engine.heap.clear();
        self.runtime.unregister_context();
        diag_debug!(
            self.config.diagnostics,
            Code::ContextDestroyed,
            context = %self.id,
            "context destroyed"
        );
    }

    /// The underlying engine state, for embedding code that works with script values
    /// directly.
    pub fn engine(&mut self) -> &mut EvalContext {
        &mut self.engine
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if self.torn_down {
            return;
        }
        let runtime = Arc::clone(&self.runtime);
        let _claim = runtime.claim();
        self.teardown();
    }
}
