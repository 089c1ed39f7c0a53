//! Dialog-session scope layouts driven through the host API.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use voxscript::{Context, ContextConfig, Runtime, RuntimeConfig, ScopeKind, ScriptError, Value};

/// A read-only `session` scope holding the call id.
fn session_layout() -> (Arc<Runtime>, Context) {
    let runtime = Runtime::new(RuntimeConfig::new()).unwrap();
    let mut ctx = Context::new(&runtime, ContextConfig::new()).unwrap();
    ctx.push_scope("session", ScopeKind::Nested).unwrap();
    ctx.create_var("id", Some(&Value::from("call-17"))).unwrap();
    ctx.set_read_only("session").unwrap();
    (runtime, ctx)
}

fn eval(ctx: &mut Context, code: &str) -> Option<Value> {
    match ctx.eval(code) {
        Ok(v) => v,
        Err(e) => panic!("{:?} failed: {}", code, e),
    }
}

/// session > application > document > dialog, with `application` also reachable as `app`.
fn dialog_layout() -> (Arc<Runtime>, Context) {
    let runtime = Runtime::new(RuntimeConfig::new()).unwrap();
    let mut ctx = Context::new(&runtime, ContextConfig::new()).unwrap();
    for name in &["session", "application", "document", "dialog"] {
        ctx.push_scope(name, ScopeKind::Nested).unwrap();
        if *name == "application" {
            ctx.push_scope("app", ScopeKind::Alias).unwrap();
        }
    }
    (runtime, ctx)
}

#[test]
fn test_layout_depth_and_names() {
    let (_runtime, mut ctx) = dialog_layout();
    assert_eq!(ctx.scope_depth(), 4);
    assert_eq!(ctx.scope_name(), "dialog");
    assert_eq!(
        eval(&mut ctx, "typeof session.application.document.dialog"),
        Some(Value::from("object"))
    );
    assert_eq!(
        eval(&mut ctx, "session.application.app === session.application"),
        Some(Value::Boolean(true))
    );
}

#[test]
fn test_lookup_walks_to_nearest_scope() {
    let (_runtime, mut ctx) = dialog_layout();
    ctx.set_var("session.application.lang", &Value::from("en")).unwrap();
    ctx.set_var("session.application.document.lang", &Value::from("fr")).unwrap();
    assert_eq!(eval(&mut ctx, "lang"), Some(Value::from("fr")));
    assert_eq!(eval(&mut ctx, "app.lang"), Some(Value::from("en")));

    ctx.pop_scope().unwrap();
    ctx.pop_scope().unwrap();
    assert_eq!(ctx.scope_name(), "application");
    assert_eq!(eval(&mut ctx, "lang"), Some(Value::from("en")));
}

#[test]
fn test_dialog_variables_disappear_with_the_dialog() {
    let (_runtime, mut ctx) = dialog_layout();
    eval(&mut ctx, "var attempts = 1; attempts++;");
    assert_eq!(ctx.get_var("dialog.attempts"), Ok(Some(Value::Integer(2))));
    ctx.pop_scope().unwrap();
    ctx.push_scope("dialog", ScopeKind::Nested).unwrap();
    assert_eq!(
        ctx.check_var("attempts"),
        Err(ScriptError::NotFound("attempts".to_string()))
    );
}

#[test]
fn test_functions_capture_their_scope() {
    let (_runtime, mut ctx) = dialog_layout();
    ctx.pop_scope().unwrap();
    eval(&mut ctx, "var greeting = 'doc'; function greet() { return greeting; }");
    ctx.push_scope("dialog", ScopeKind::Nested).unwrap();
    ctx.create_var("greeting", Some(&Value::from("dialog"))).unwrap();
    assert_eq!(eval(&mut ctx, "greet() + '/' + greeting"), Some(Value::from("doc/dialog")));
}

#[test]
fn test_alias_pop_order() {
    let (_runtime, mut ctx) = dialog_layout();
    ctx.pop_scope().unwrap();
    ctx.pop_scope().unwrap();
    assert_eq!(ctx.scope_name(), "application");
    assert!(ctx.check_var("app").is_ok());

    ctx.pop_scope().unwrap();
    assert_eq!(ctx.scope_name(), "application");
    assert!(ctx.check_var("app").is_err());

    ctx.pop_scope().unwrap();
    assert_eq!(ctx.scope_name(), "session");
}

#[test]
fn test_read_only_session_refuses_writes() {
    let (_runtime, mut ctx) = session_layout();
    assert_eq!(ctx.scope_name(), "session");
    assert_eq!(ctx.get_var("id"), Ok(Some(Value::from("call-17"))));
    assert!(matches!(ctx.set_var("id", &Value::from("x")), Err(ScriptError::ReadOnly(_))));
    assert!(matches!(
        ctx.push_scope("application", ScopeKind::Nested),
        Err(ScriptError::ReadOnly(_))
    ));
    ctx.pop_scope().unwrap();
    assert!(ctx.check_var("session").is_err());
}

#[test]
fn test_clear_returns_to_global() {
    let (_runtime, mut ctx) = dialog_layout();
    ctx.clear_scopes().unwrap();
    assert_eq!(ctx.scope_depth(), 0);
    assert_eq!(eval(&mut ctx, "typeof session"), Some(Value::from("undefined")));
    ctx.push_scope("session", ScopeKind::Nested).unwrap();
    assert_eq!(ctx.scope_depth(), 1);
}

#[test]
fn test_scope_objects_are_not_convertible() {
    let (_runtime, mut ctx) = dialog_layout();
    assert!(matches!(ctx.get_var("session"), Err(ScriptError::NotConvertible(_))));
    assert!(matches!(ctx.eval("({ s: session })"), Err(ScriptError::NotConvertible(_))));
    assert!(matches!(ctx.eval("this"), Err(ScriptError::NotConvertible(_))));
}
