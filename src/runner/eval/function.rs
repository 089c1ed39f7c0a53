//! Function objects: creation, calls and construction.

use std::sync::Arc;

use crate::parser::ast::{FunctionData, StatementType};
use crate::parser::static_semantics::{get_hoisted_functions, get_var_declared_names};
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::heap::ObjectId;
use crate::runner::ds::object::{FunctionKind, JsObject, ObjectKind};
use crate::runner::ds::object_property::PropertyFlags;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::types::{EvalContext, NativeFn};

use super::statement::execute_statements;
use super::types::{CompletionType, ValueResult};

const TOO_MUCH_RECURSION: &str = "too much recursion";

enum Callable {
    Script(Arc<FunctionData>, ObjectId),
    Native(NativeFn, Option<NativeFn>),
}

fn callable_of(id: ObjectId, ctx: &EvalContext) -> Result<Option<Callable>, JErrorType> {
    Ok(match ctx.heap.get(id)?.as_function() {
        Some(FunctionKind::Script { data, scope }) => Some(Callable::Script(data.clone(), *scope)),
        Some(FunctionKind::Native {
            func, construct, ..
        }) => Some(Callable::Native(*func, *construct)),
        None => None,
    })
}

/// Creates a function object closing over `scope`, with a fresh `prototype` object.
pub fn instantiate_function(
    data: &Arc<FunctionData>,
    scope: ObjectId,
    ctx: &mut EvalContext,
) -> Result<ObjectId, JErrorType> {
    let prototype = ctx.new_object()?;
    let function_prototype = ctx.realm.function_prototype;
    let f = ctx.alloc(JsObject::new(
        ObjectKind::Function(FunctionKind::Script {
            data: data.clone(),
            scope,
        }),
        Some(function_prototype),
    ))?;
    ctx.heap.get_mut(prototype)?.define_property(
        "constructor",
        JsValue::Object(f),
        PropertyFlags::hidden(),
    );
    let fo = ctx.heap.get_mut(f)?;
    fo.define_property(
        "prototype",
        JsValue::Object(prototype),
        PropertyFlags::DONT_ENUM | PropertyFlags::DONT_DELETE,
    );
    fo.define_property(
        "length",
        JsValue::from_i64(data.params.len() as i64),
        PropertyFlags::constant(),
    );
    Ok(f)
}

/// Binds the `var` names and function declarations of `body` on `env`. Existing vars keep
/// their value; functions always replace the binding.
pub fn instantiate_declarations(
    body: &[StatementType],
    env: ObjectId,
    ctx: &mut EvalContext,
) -> Result<(), JErrorType> {
    for name in get_var_declared_names(body) {
        let env_object = ctx.heap.get_mut(env)?;
        if !env_object.has_own_property(&name) {
            env_object.put(&name, JsValue::Undefined);
        }
    }
    for data in get_hoisted_functions(body) {
        let f = instantiate_function(&data, env, ctx)?;
        ctx.heap.get_mut(env)?.put(data.name(), JsValue::Object(f));
    }
    Ok(())
}

fn enter_call(ctx: &mut EvalContext) -> Result<(), JErrorType> {
    ctx.tick()?;
    if ctx.call_depth >= ctx.max_call_depth {
        return Err(JErrorType::RangeError(TOO_MUCH_RECURSION.to_string()));
    }
    ctx.call_depth += 1;
    Ok(())
}

/// Calls `callee` with the given receiver and arguments.
pub fn call_value(
    callee: &JsValue,
    this: JsValue,
    args: Vec<JsValue>,
    ctx: &mut EvalContext,
) -> ValueResult {
    let callable = match callee {
        JsValue::Object(id) => callable_of(*id, ctx)?.map(|c| (*id, c)),
        _ => None,
    };
    let (id, callable) = match callable {
        Some(c) => c,
        None => {
            return Err(JErrorType::TypeError(format!(
                "{} is not a function",
                callee
            )))
        }
    };
    enter_call(ctx)?;
    let result = match callable {
        Callable::Script(data, scope) => call_script_function(id, &data, scope, this, args, ctx),
        Callable::Native(func, _) => func(ctx, this, args).and_then(|v| charge_string(v, ctx)),
    };
    ctx.call_depth -= 1;
    result
}

/// Built-ins build strings without seeing the memory budget; account for them on return.
fn charge_string(value: JsValue, ctx: &mut EvalContext) -> ValueResult {
    if let JsValue::String(s) = &value {
        ctx.charge(s.len())?;
    }
    Ok(value)
}

/// `new callee(...args)`.
pub fn construct_value(callee: &JsValue, args: Vec<JsValue>, ctx: &mut EvalContext) -> ValueResult {
    let not_a_constructor = || JErrorType::TypeError(format!("{} is not a constructor", callee));
    let id = callee.as_object().ok_or_else(not_a_constructor)?;
    let callable = callable_of(id, ctx)?.ok_or_else(not_a_constructor)?;
    if let Callable::Native(_, None) = callable {
        return Err(not_a_constructor());
    }
    enter_call(ctx)?;
    let result = match callable {
        Callable::Script(data, scope) => construct_script_object(id, &data, scope, args, ctx),
        Callable::Native(_, Some(construct)) => construct(ctx, JsValue::Undefined, args),
        Callable::Native(_, None) => Err(not_a_constructor()),
    };
    ctx.call_depth -= 1;
    result
}

fn construct_script_object(
    id: ObjectId,
    data: &Arc<FunctionData>,
    scope: ObjectId,
    args: Vec<JsValue>,
    ctx: &mut EvalContext,
) -> ValueResult {
    let prototype = match ctx.heap.lookup(id, "prototype")? {
        Some(JsValue::Object(p)) => p,
        _ => ctx.realm.object_prototype,
    };
    let object = JsValue::Object(ctx.alloc(JsObject::ordinary(Some(prototype)))?);
    let result = call_script_function(id, data, scope, object.clone(), args, ctx)?;
    Ok(match result {
        JsValue::Object(_) => result,
        _ => object,
    })
}

fn call_script_function(
    id: ObjectId,
    data: &Arc<FunctionData>,
    scope: ObjectId,
    this: JsValue,
    args: Vec<JsValue>,
    ctx: &mut EvalContext,
) -> ValueResult {
    let this = if this.is_nullish() {
        JsValue::Object(ctx.global())
    } else {
        this
    };
    let object_prototype = ctx.realm.object_prototype;
    let arguments = ctx.alloc(JsObject::new(
        ObjectKind::Array(args.clone()),
        Some(object_prototype),
    ))?;
    ctx.heap.get_mut(arguments)?.define_property(
        "callee",
        JsValue::Object(id),
        PropertyFlags::hidden(),
    );

    let env = ctx.alloc(JsObject::new(ObjectKind::Activation { parent: scope }, None))?;
    {
        let env_object = ctx.heap.get_mut(env)?;
        // Parameters and locals shadow the function's own name.
        if let Some(name) = &data.id {
            env_object.put(&name.name, JsValue::Object(id));
        }
        env_object.put("arguments", JsValue::Object(arguments));
        let mut args = args.into_iter();
        for param in &data.params {
            env_object.put(&param.name, args.next().unwrap_or(JsValue::Undefined));
        }
    }

    let saved_scope = std::mem::replace(&mut ctx.scope, env);
    let saved_this = std::mem::replace(&mut ctx.this_value, this);
    let result = match instantiate_declarations(&data.body, env, ctx) {
        Ok(()) => execute_statements(&data.body, ctx),
        Err(e) => Err(e),
    };
    ctx.scope = saved_scope;
    ctx.this_value = saved_this;

    let completion = result?;
    Ok(match completion.completion_type {
        CompletionType::Return => completion.get_value(),
        _ => JsValue::Undefined,
    })
}
