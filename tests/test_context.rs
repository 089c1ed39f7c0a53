//! Host API tests: marshalling, scopes, budgets, read-only bindings, exception capture and
//! runtime lifetime.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;
use voxscript::marshal::{MarshalError, MAX_DEPTH};
use voxscript::{
    ConcurrencyModel, Content, Context, ContextConfig, DocumentNode, Runtime, RuntimeConfig,
    ScopeKind, ScriptError, Value, ValueMap, ValueVector,
};

fn new_context() -> (Arc<Runtime>, Context) {
    let runtime = Runtime::new(RuntimeConfig::new()).unwrap();
    let ctx = Context::new(&runtime, ContextConfig::new()).unwrap();
    (runtime, ctx)
}

fn eval(ctx: &mut Context, code: &str) -> Option<Value> {
    match ctx.eval(code) {
        Ok(v) => v,
        Err(e) => panic!("{:?} failed: {}", code, e),
    }
}

fn get(ctx: &mut Context, name: &str) -> Value {
    match ctx.get_var(name) {
        Ok(Some(v)) => v,
        other => panic!("get_var({:?}) returned {:?}", name, other),
    }
}

// ============================================================================
// Marshalling
// ============================================================================

#[test]
fn test_scalar_round_trip() {
    let (_runtime, mut ctx) = new_context();
    let values = vec![
        Value::Boolean(true),
        Value::Integer(-42),
        Value::Long(5_000_000_000),
        Value::Double(2.5),
        Value::from("text with \u{0} inside"),
    ];
    for value in values {
        ctx.create_var("v", Some(&value)).unwrap();
        assert_eq!(get(&mut ctx, "v"), value);
    }
}

#[test]
fn test_float_comes_back_as_double() {
    let (_runtime, mut ctx) = new_context();
    ctx.create_var("f", Some(&Value::Float(1.25))).unwrap();
    let back = get(&mut ctx, "f");
    assert_eq!(back, Value::Double(1.25));
    assert!(back.approx_eq(&Value::Float(1.25)));
}

#[test]
fn test_composite_round_trip() {
    let (_runtime, mut ctx) = new_context();
    let mut inner = ValueVector::new();
    inner.push(1);
    inner.push("two");
    inner.push(false);
    let mut map = ValueMap::new();
    map.set("name", "menu");
    map.set("choices", inner);
    map.set("weight", 0.5);
    let value = Value::Map(map);

    ctx.create_var("m", Some(&value)).unwrap();
    assert_eq!(get(&mut ctx, "m"), value);
    assert_eq!(eval(&mut ctx, "m.choices[1]"), Some(Value::from("two")));
}

#[test]
fn test_script_results_convert() {
    let (_runtime, mut ctx) = new_context();
    assert_eq!(eval(&mut ctx, "1 + 2"), Some(Value::Integer(3)));
    assert_eq!(eval(&mut ctx, "Math.pow(2, 40)"), Some(Value::Long(1_099_511_627_776)));
    assert_eq!(eval(&mut ctx, "7 / 2"), Some(Value::Double(3.5)));
    assert_eq!(eval(&mut ctx, "'a' + 1"), Some(Value::from("a1")));
    assert_eq!(eval(&mut ctx, "null"), None);
    assert_eq!(eval(&mut ctx, "var unused = 1;"), None);

    let mut expected = ValueMap::new();
    expected.set("a", 1);
    expected.set("b", "x");
    assert_eq!(eval(&mut ctx, "({a: 1, b: 'x', f: function () {}})"), Some(Value::Map(expected)));
}

#[test]
fn test_result_can_be_discarded() {
    let (_runtime, mut ctx) = new_context();
    assert_eq!(ctx.evaluate("var counter = 3; counter * 2", false, true).unwrap(), None);
    assert_eq!(get(&mut ctx, "counter"), Value::Integer(3));
}

#[test]
fn test_out_of_range_integer_is_rejected() {
    let (_runtime, mut ctx) = new_context();
    let result = ctx.create_var("big", Some(&Value::ULong(u64::MAX)));
    assert!(matches!(
        result,
        Err(ScriptError::NotConvertible(MarshalError::IntegerOutOfRange(_)))
    ));
    assert!(ctx.check_var("big").is_err());
}

#[test]
fn test_content_is_shared_not_copied() {
    let released = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&released);
    let content = Content::with_destructor("audio/wav", vec![1, 2, 3], move |mime, data| {
        assert_eq!(mime, "audio/wav");
        assert_eq!(data, vec![1, 2, 3]);
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let (runtime, mut ctx) = new_context();
    ctx.create_var("clip", Some(&Value::Content(content.clone()))).unwrap();
    assert_eq!(content.ref_count(), 2);

    match get(&mut ctx, "clip") {
        Value::Content(back) => assert!(back.ptr_eq(&content)),
        other => panic!("expected content, got {:?}", other),
    }
    assert_eq!(eval(&mut ctx, "typeof clip"), Some(Value::from("object")));

    ctx.destroy().unwrap();
    runtime.destroy().unwrap();
    assert_eq!(content.ref_count(), 1);
    assert_eq!(released.load(Ordering::SeqCst), 0);
    drop(content);
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cyclic_result_is_not_convertible() {
    let (_runtime, mut ctx) = new_context();
    let result = ctx.eval("var o = {}; o.self = o; o");
    assert_eq!(result, Err(ScriptError::NotConvertible(MarshalError::Cycle)));
}

#[test]
fn test_deeply_nested_values_are_refused() {
    let runtime = Runtime::new(RuntimeConfig::new().max_objects(100_000)).unwrap();
    let mut ctx = Context::new(&runtime, ContextConfig::new()).unwrap();
    let too_deep = Err(ScriptError::NotConvertible(MarshalError::TooDeep(MAX_DEPTH)));

    let result = ctx.eval("var a = []; for (var i = 0; i < 10000; i++) { a = [a]; } a");
    assert_eq!(result, too_deep);
    assert_eq!(ctx.get_var("a"), too_deep.clone());
    assert_eq!(eval(&mut ctx, "a.length"), Some(Value::Integer(1)));

    let mut value = Value::from("leaf");
    for _ in 0..=MAX_DEPTH {
        value = Value::Vector(vec![value].into_iter().collect());
    }
    assert_eq!(ctx.set_var("b", &value), too_deep.map(|_| ()));
    assert!(ctx.check_var("b").is_err());
}

// ============================================================================
// Scopes
// ============================================================================

#[test]
fn test_inner_scope_shadows_outer() {
    let (_runtime, mut ctx) = new_context();
    ctx.create_var("x", Some(&Value::Integer(1))).unwrap();
    ctx.push_scope("dialog", ScopeKind::Nested).unwrap();
    ctx.create_var("x", Some(&Value::Integer(2))).unwrap();
    assert_eq!(eval(&mut ctx, "x"), Some(Value::Integer(2)));
    assert_eq!(eval(&mut ctx, "dialog.x"), Some(Value::Integer(2)));

    ctx.pop_scope().unwrap();
    assert_eq!(eval(&mut ctx, "x"), Some(Value::Integer(1)));
    assert!(ctx.check_var("dialog").is_err());
}

#[test]
fn test_script_var_lands_in_leaf_scope() {
    let (_runtime, mut ctx) = new_context();
    ctx.push_scope("session", ScopeKind::Nested).unwrap();
    eval(&mut ctx, "var caller = 'alice'");
    assert_eq!(eval(&mut ctx, "session.caller"), Some(Value::from("alice")));
    ctx.pop_scope().unwrap();
    assert_eq!(ctx.get_var("caller"), Err(ScriptError::NotFound("caller".to_string())));
}

#[test]
fn test_set_var_assigns_nearest_binding() {
    let (_runtime, mut ctx) = new_context();
    ctx.create_var("count", Some(&Value::Integer(0))).unwrap();
    ctx.push_scope("dialog", ScopeKind::Nested).unwrap();
    ctx.set_var("count", &Value::Integer(5)).unwrap();
    ctx.set_var("fresh", &Value::Boolean(true)).unwrap();
    ctx.pop_scope().unwrap();
    assert_eq!(get(&mut ctx, "count"), Value::Integer(5));
    assert!(ctx.check_var("fresh").is_err());
}

#[test]
fn test_alias_is_transparent() {
    let (_runtime, mut ctx) = new_context();
    ctx.push_scope("application", ScopeKind::Nested).unwrap();
    ctx.push_scope("app", ScopeKind::Alias).unwrap();
    assert_eq!(ctx.scope_depth(), 1);
    assert_eq!(ctx.scope_name(), "application");

    ctx.create_var("lang", Some(&Value::from("en"))).unwrap();
    assert_eq!(eval(&mut ctx, "app.lang === application.lang"), Some(Value::Boolean(true)));
    eval(&mut ctx, "app.retries = 3");
    assert_eq!(get(&mut ctx, "retries"), Value::Integer(3));
    assert_eq!(get(&mut ctx, "app.lang"), Value::from("en"));

    ctx.pop_scope().unwrap();
    assert!(ctx.check_var("app").is_err());
    assert_eq!(ctx.scope_name(), "application");
}

#[test]
fn test_clear_scopes_is_idempotent() {
    let (_runtime, mut ctx) = new_context();
    ctx.push_scope("application", ScopeKind::Nested).unwrap();
    ctx.push_scope("dialog", ScopeKind::Nested).unwrap();
    ctx.clear_scopes().unwrap();
    ctx.clear_scopes().unwrap();
    assert_eq!(ctx.scope_depth(), 0);
    assert_eq!(ctx.scope_name(), "global");
    assert!(ctx.check_var("application").is_err());
    assert!(ctx.pop_scope().is_ok());
}

#[test]
fn test_dotted_names() {
    let (_runtime, mut ctx) = new_context();
    eval(&mut ctx, "var config = { audio: { volume: 3 } }");
    ctx.push_scope("dialog", ScopeKind::Nested).unwrap();
    ctx.set_var("config.audio.volume", &Value::Integer(7)).unwrap();
    ctx.create_var("config.audio.rate", Some(&Value::Double(1.5))).unwrap();
    assert_eq!(get(&mut ctx, "config.audio.volume"), Value::Integer(7));
    assert_eq!(eval(&mut ctx, "config.audio.rate"), Some(Value::Double(1.5)));
    assert!(matches!(ctx.check_var("config.video"), Err(ScriptError::NotFound(_))));
    assert!(matches!(ctx.set_var("nothing.here", &Value::Integer(1)), Err(ScriptError::NotFound(_))));
    assert!(matches!(ctx.create_var("bad..name", None), Err(ScriptError::InvalidArgument(_))));
}

#[test]
fn test_var_expressions() {
    let (_runtime, mut ctx) = new_context();
    ctx.create_var_expr("total", "2 * 21").unwrap();
    assert_eq!(get(&mut ctx, "total"), Value::Integer(42));
    ctx.set_var_expr("total", "total + 1").unwrap();
    assert_eq!(get(&mut ctx, "total"), Value::Integer(43));
    assert!(matches!(ctx.create_var_expr("broken", "1 +"), Err(ScriptError::Syntax { .. })));
    assert!(ctx.check_var("broken").is_err());
}

#[test]
fn test_check_var_three_ways() {
    let (_runtime, mut ctx) = new_context();
    eval(&mut ctx, "var present = 0; var empty = null; var unset;");
    assert!(ctx.check_var("present").is_ok());
    assert!(ctx.check_var("empty").is_ok());
    assert_eq!(ctx.get_var("empty"), Ok(None));
    assert_eq!(ctx.check_var("unset"), Err(ScriptError::NotFound("unset".to_string())));
    assert_eq!(ctx.check_var("missing"), Err(ScriptError::NotFound("missing".to_string())));
    ctx.create_var("declared", None).unwrap();
    assert!(ctx.check_var("declared").is_err());
}

#[test]
fn test_check_var_keeps_pending_exception() {
    let (_runtime, mut ctx) = new_context();
    eval(&mut ctx, "var n = null;");
    ctx.eval("throw new Error('first')").unwrap_err();

    assert!(matches!(ctx.check_var("n.k"), Err(ScriptError::Exception { .. })));
    let exception = ctx.last_exception().unwrap().as_map().unwrap();
    assert_eq!(exception.get("message"), Some(&Value::from("first")));
}

// ============================================================================
// Read-only bindings
// ============================================================================

#[test]
fn test_read_only_binding_refuses_writes() {
    let (_runtime, mut ctx) = new_context();
    ctx.create_var("lang", Some(&Value::from("en"))).unwrap();
    ctx.set_read_only("lang").unwrap();

    eval(&mut ctx, "lang = 'fr'");
    assert_eq!(get(&mut ctx, "lang"), Value::from("en"));
    assert_eq!(
        ctx.set_var("lang", &Value::from("de")),
        Err(ScriptError::ReadOnly("lang".to_string()))
    );
    assert_eq!(
        ctx.create_var("lang", None),
        Err(ScriptError::ReadOnly("lang".to_string()))
    );
    assert_eq!(get(&mut ctx, "lang"), Value::from("en"));
    assert!(ctx.set_read_only("missing").is_err());
}

#[test]
fn test_read_only_parent_protects_nested_paths() {
    let (_runtime, mut ctx) = new_context();
    eval(&mut ctx, "var holder = { session: { id: 9 } }");
    ctx.set_read_only("holder").unwrap();
    assert!(matches!(ctx.set_var("holder.session.id", &Value::Integer(1)), Err(ScriptError::ReadOnly(_))));
}

#[test]
fn test_read_only_scope_can_still_be_popped() {
    let (_runtime, mut ctx) = new_context();
    ctx.push_scope("session", ScopeKind::Nested).unwrap();
    ctx.set_read_only("session").unwrap();
    assert!(matches!(
        ctx.create_var("x", Some(&Value::Integer(1))),
        Err(ScriptError::ReadOnly(_))
    ));
    ctx.pop_scope().unwrap();
    assert!(ctx.check_var("session").is_err());
}

// ============================================================================
// Step budget
// ============================================================================

#[test]
fn test_runaway_script_is_stopped() {
    let runtime = Runtime::new(RuntimeConfig::new()).unwrap();
    let mut ctx = Context::new(&runtime, ContextConfig::new().step_budget(500)).unwrap();
    let result = ctx.eval("var stage = 1; while (true) {} stage = 2;");
    assert_eq!(result, Err(ScriptError::BudgetExceeded));
    assert_eq!(get(&mut ctx, "stage"), Value::Integer(1));
    assert!(ctx.last_exception().is_none());

    assert_eq!(eval(&mut ctx, "stage + 1"), Some(Value::Integer(2)));
}

#[test]
fn test_budget_stops_mutation_inside_the_loop() {
    let runtime = Runtime::new(RuntimeConfig::new()).unwrap();
    let mut ctx = Context::new(&runtime, ContextConfig::new().step_budget(100)).unwrap();
    let result = ctx.eval("var i = 0; while (true) { i++; }");
    assert_eq!(result, Err(ScriptError::BudgetExceeded));
    match get(&mut ctx, "i") {
        Value::Integer(i) => assert!(i > 0 && i <= 100, "loop ran {} times", i),
        other => panic!("i is {}", other),
    }
}

#[test]
fn test_budget_skips_catch_and_finally() {
    let runtime = Runtime::new(RuntimeConfig::new()).unwrap();
    let mut ctx = Context::new(&runtime, ContextConfig::new().step_budget(2_000)).unwrap();
    let result = ctx.eval(
        "var reached = false;\n\
         try { for (;;) {} } catch (e) { reached = true; } finally { reached = true; }",
    );
    assert_eq!(result, Err(ScriptError::BudgetExceeded));
    assert_eq!(get(&mut ctx, "reached"), Value::Boolean(false));
}

#[test]
fn test_budget_counts_per_evaluation() {
    let runtime = Runtime::new(RuntimeConfig::new()).unwrap();
    let mut ctx = Context::new(&runtime, ContextConfig::new().step_budget(200)).unwrap();
    for _ in 0..5 {
        assert_eq!(
            eval(&mut ctx, "var n = 0; for (var i = 0; i < 50; i++) { n += i; } n"),
            Some(Value::Integer(1225))
        );
    }
}

// ============================================================================
// Memory budget
// ============================================================================

#[test]
fn test_string_doubling_runs_out_of_memory() {
    let runtime = Runtime::new(RuntimeConfig::new()).unwrap();
    let mut ctx = Context::new(&runtime, ContextConfig::new().memory_budget(1 << 20)).unwrap();
    let result = ctx.eval("var s = 'x'; for (var i = 0; i < 40; i++) { s = s + s; } s.length");
    assert_eq!(result, Err(ScriptError::OutOfMemory));
    assert!(ctx.last_exception().is_none());

    match eval(&mut ctx, "s.length") {
        Some(Value::Integer(len)) => assert!(len > 1 && len <= 1 << 20, "length {}", len),
        other => panic!("s.length is {:?}", other),
    }
    assert_eq!(eval(&mut ctx, "s = 'ok'; s.length"), Some(Value::Integer(2)));
}

#[test]
fn test_growing_arrays_run_out_of_memory() {
    let runtime = Runtime::new(RuntimeConfig::new()).unwrap();
    let config = ContextConfig::new().unbounded().memory_budget(1 << 16);
    let mut ctx = Context::new(&runtime, config).unwrap();
    assert_eq!(
        ctx.eval("var a = []; while (true) { a.push('abcdefgh'); }"),
        Err(ScriptError::OutOfMemory)
    );
    assert_eq!(
        ctx.eval("var b = []; while (true) { b[b.length] = 1; }"),
        Err(ScriptError::OutOfMemory)
    );
    assert_eq!(
        ctx.eval("var parts = []; for (var i = 0; i < 100; i++) { parts.push('p'); } parts.join('').length"),
        Ok(Some(Value::Integer(100)))
    );
}

#[test]
fn test_memory_budget_counts_per_operation() {
    let runtime = Runtime::new(RuntimeConfig::new()).unwrap();
    let mut ctx = Context::new(&runtime, ContextConfig::new().memory_budget(1 << 16)).unwrap();
    for _ in 0..20 {
        assert_eq!(
            eval(&mut ctx, "var t = ''; for (var i = 0; i < 100; i++) { t = t + 'ab'; } t.length"),
            Some(Value::Integer(200))
        );
    }
}

#[test]
fn test_unbounded_context_runs_long_loops() {
    let runtime = Runtime::new(RuntimeConfig::new()).unwrap();
    let mut ctx = Context::new(&runtime, ContextConfig::new().unbounded()).unwrap();
    assert_eq!(
        eval(&mut ctx, "var n = 0; while (n < 400000) { n++; } n"),
        Some(Value::Integer(400_000))
    );
}

// ============================================================================
// Exceptions
// ============================================================================

#[test]
fn test_thrown_error_is_captured() {
    let (_runtime, mut ctx) = new_context();
    let err = ctx.eval("throw new RangeError('too far')").unwrap_err();
    assert_eq!(err, ScriptError::Exception { message: "too far".to_string() });

    let exception = ctx.last_exception().unwrap().as_map().unwrap();
    assert_eq!(exception.get("name"), Some(&Value::from("RangeError")));
    assert_eq!(exception.get("message"), Some(&Value::from("too far")));
    assert_eq!(exception.get("lineNumber"), Some(&Value::Long(1)));
}

#[test]
fn test_engine_errors_are_captured_with_position() {
    let (_runtime, mut ctx) = new_context();
    let err = ctx.eval("var a = 1;\nvar b = 2;\nmissing();").unwrap_err();
    assert!(matches!(err, ScriptError::Exception { .. }));
    let exception = ctx.last_exception().unwrap().as_map().unwrap();
    assert_eq!(exception.get("name"), Some(&Value::from("ReferenceError")));
    assert_eq!(exception.get("lineNumber"), Some(&Value::Long(3)));
}

#[test]
fn test_thrown_object_is_kept() {
    let (_runtime, mut ctx) = new_context();
    ctx.eval("throw { code: 7, reason: 'hangup' }").unwrap_err();
    let exception = ctx.last_exception().unwrap().as_map().unwrap();
    let value = exception.get("value").unwrap().as_map().unwrap();
    assert_eq!(value.get("code"), Some(&Value::Integer(7)));
    assert_eq!(value.get("reason"), Some(&Value::from("hangup")));
}

#[test]
fn test_next_evaluation_clears_exception() {
    let (_runtime, mut ctx) = new_context();
    ctx.eval("throw new Error('first')").unwrap_err();
    assert!(ctx.last_exception().is_some());
    eval(&mut ctx, "1");
    assert!(ctx.last_exception().is_none());
}

#[test]
fn test_syntax_error_is_not_an_exception() {
    let (_runtime, mut ctx) = new_context();
    match ctx.eval("var = ;") {
        Err(ScriptError::Syntax { line, .. }) => assert_eq!(line, 1),
        other => panic!("expected syntax error, got {:?}", other),
    }
    assert!(ctx.last_exception().is_none());
}

#[test]
fn test_caught_exception_is_not_reported() {
    let (_runtime, mut ctx) = new_context();
    assert_eq!(
        eval(&mut ctx, "var r; try { throw new Error('x'); } catch (e) { r = e.message; } r"),
        Some(Value::from("x"))
    );
    assert!(ctx.last_exception().is_none());
}

#[test]
fn test_quiet_failure_still_captures() {
    let (_runtime, mut ctx) = new_context();
    let err = ctx.evaluate("throw 'silent'", true, false).unwrap_err();
    assert_eq!(err, ScriptError::Exception { message: "silent".to_string() });
    assert!(ctx.last_exception().is_some());
}

// ============================================================================
// Documents
// ============================================================================

fn prompt() -> Arc<DocumentNode> {
    Arc::new(
        DocumentNode::element("prompt")
            .with_attribute("bargein", "false")
            .with_child(DocumentNode::text("Welcome"))
            .with_child(DocumentNode::element("break").with_attribute("time", "1s")),
    )
}

#[test]
fn test_document_is_readable() {
    let (_runtime, mut ctx) = new_context();
    ctx.expose_document("doc", &prompt()).unwrap();
    assert_eq!(eval(&mut ctx, "doc.nodeName"), Some(Value::from("prompt")));
    assert_eq!(eval(&mut ctx, "doc.childNodes.length"), Some(Value::Integer(2)));
    assert_eq!(eval(&mut ctx, "doc.firstChild.nodeValue"), Some(Value::from("Welcome")));
    assert_eq!(eval(&mut ctx, "doc.getAttribute('bargein')"), Some(Value::from("false")));
    assert_eq!(eval(&mut ctx, "doc.lastChild.attributes.time"), Some(Value::from("1s")));
    assert_eq!(eval(&mut ctx, "doc.getAttribute('missing')"), None);
}

#[test]
fn test_document_is_read_only() {
    let (_runtime, mut ctx) = new_context();
    ctx.expose_document("doc", &prompt()).unwrap();
    eval(&mut ctx, "doc.nodeName = 'x'; doc.extra = 1;");
    assert!(matches!(ctx.eval("doc.childNodes.push(1)"), Err(ScriptError::Exception { .. })));
    assert_eq!(eval(&mut ctx, "doc.nodeName"), Some(Value::from("prompt")));
    assert_eq!(eval(&mut ctx, "doc.extra"), None);
    assert_eq!(eval(&mut ctx, "doc.childNodes.length"), Some(Value::Integer(2)));
    assert!(matches!(ctx.set_var("doc.nodeName", &Value::from("x")), Err(ScriptError::ReadOnly(_))));
    assert_eq!(
        ctx.get_var("doc"),
        Err(ScriptError::NotConvertible(MarshalError::ReadOnly))
    );
}

// ============================================================================
// Runtime and lifetime
// ============================================================================

#[test]
fn test_runtime_outlives_its_contexts() {
    let runtime = Runtime::new(RuntimeConfig::new()).unwrap();
    let a = Context::new(&runtime, ContextConfig::new()).unwrap();
    let b = Context::new(&runtime, ContextConfig::new()).unwrap();
    assert_eq!(runtime.live_contexts(), 2);
    assert_eq!(runtime.destroy(), Err(ScriptError::RuntimeInUse(2)));

    a.destroy().unwrap();
    drop(b);
    runtime.destroy().unwrap();
    runtime.destroy().unwrap();
    assert!(Context::new(&runtime, ContextConfig::new()).is_err());
}

#[test]
fn test_object_budget_is_shared() {
    let runtime = Runtime::new(RuntimeConfig::new().max_objects(20_000)).unwrap();
    let mut ctx = Context::new(&runtime, ContextConfig::new().unbounded()).unwrap();
    let result = ctx.eval("var keep = []; while (true) { keep.push({}); }");
    assert_eq!(result, Err(ScriptError::OutOfMemory));
    ctx.eval("keep = null").unwrap();
    ctx.collect_garbage().unwrap();
    assert_eq!(eval(&mut ctx, "var small = [1, 2, 3]; small.length"), Some(Value::Integer(3)));
}

#[test]
fn test_collection_keeps_scope_data() {
    let runtime = Runtime::new(RuntimeConfig::new()).unwrap();
    let mut ctx = Context::new(&runtime, ContextConfig::new().gc_threshold(100)).unwrap();
    ctx.push_scope("dialog", ScopeKind::Nested).unwrap();
    eval(&mut ctx, "var kept = { items: [1, 2, 3] }; for (var i = 0; i < 500; i++) { var t = { i: i }; }");
    let before = ctx.live_objects();
    let freed = ctx.collect_garbage().unwrap();
    assert!(ctx.live_objects() <= before);
    assert!(freed <= before);
    assert_eq!(eval(&mut ctx, "kept.items[2]"), Some(Value::Integer(3)));
}

#[test]
fn test_serialized_contexts_across_threads() {
    let runtime = Runtime::new(RuntimeConfig::new()).unwrap();
    let handles: Vec<_> = (0..4)
        .map(|n| {
            let runtime = Arc::clone(&runtime);
            thread::spawn(move || {
                let mut ctx = Context::new(&runtime, ContextConfig::new()).unwrap();
                ctx.create_var("n", Some(&Value::Integer(n))).unwrap();
                ctx.eval("var s = 0; for (var i = 0; i < 1000; i++) { s += n; } s")
                    .unwrap()
            })
        })
        .collect();
    for (n, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), Some(Value::Integer(1000 * n as i32)));
    }
    assert_eq!(runtime.live_contexts(), 0);
}

#[test]
fn test_request_model_allows_parallel_contexts() {
    let runtime = Runtime::new(RuntimeConfig::new().concurrency(ConcurrencyModel::Request)).unwrap();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let runtime = Arc::clone(&runtime);
            thread::spawn(move || {
                let mut ctx = Context::new(&runtime, ContextConfig::new()).unwrap();
                ctx.eval("[1, 2, 3].map(function (x) { return x * x; }).join(',')")
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), Some(Value::from("1,4,9")));
    }
    assert_eq!(runtime.active_requests(), 0);
}
