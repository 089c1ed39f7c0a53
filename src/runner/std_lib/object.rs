//! Object and Function built-ins.

use crate::parser::ast::{ExpressionType, StatementType};
use crate::parser::JsParser;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::heap::ObjectId;
use crate::runner::ds::object::{FunctionKind, JsObject, ObjectKind};
use crate::runner::ds::value::JsValue;
use crate::runner::eval::function::instantiate_function;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInObject, EvalContext};

use super::arg;

/// Register the Object and Function built-ins with the registry.
pub fn register(registry: &mut BuiltInRegistry) {
    let object = BuiltInObject::new("Object")
        .with_constructor(object_constructor)
        .add_method("keys", object_keys)
        .add_method("getPrototypeOf", object_get_prototype_of)
        .add_method("create", object_create)
        .add_prototype_method("hasOwnProperty", object_has_own_property)
        .add_prototype_method("isPrototypeOf", object_is_prototype_of)
        .add_prototype_method("propertyIsEnumerable", object_property_is_enumerable)
        .add_prototype_method("toString", object_to_string)
        .add_prototype_method("toLocaleString", object_to_string)
        .add_prototype_method("valueOf", object_value_of);
    registry.register_object(object);

    let function = BuiltInObject::new("Function")
        .with_constructor(function_constructor)
        .add_prototype_method("call", function_call)
        .add_prototype_method("apply", function_apply)
        .add_prototype_method("toString", function_to_string);
    registry.register_object(function);
}

/// ToObject: primitives are wrapped, `null` and `undefined` are rejected.
pub(crate) fn to_object(ctx: &mut EvalContext, value: &JsValue) -> Result<ObjectId, JErrorType> {
    let prototype = match value {
        JsValue::Object(id) => return Ok(*id),
        JsValue::Undefined | JsValue::Null => {
            return Err(JErrorType::TypeError(format!(
                "cannot convert {} to object",
                value
            )))
        }
        JsValue::String(_) => ctx.realm.string_prototype,
        JsValue::Number(_) => ctx.realm.number_prototype,
        JsValue::Boolean(_) => ctx.realm.boolean_prototype,
    };
    ctx.alloc(JsObject::new(
        ObjectKind::Primitive(value.clone()),
        Some(prototype),
    ))
}

fn object_constructor(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let value = arg(&args, 0);
    if value.is_nullish() {
        return Ok(JsValue::Object(ctx.new_object()?));
    }
    Ok(JsValue::Object(to_object(ctx, &value)?))
}

/// Object.keys
fn object_keys(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let id = to_object(ctx, &arg(&args, 0))?;
    let keys = ctx
        .heap
        .get(id)?
        .own_keys(true)
        .into_iter()
        .map(JsValue::String)
        .collect();
    Ok(JsValue::Object(ctx.new_array(keys)?))
}

/// Object.getPrototypeOf
fn object_get_prototype_of(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let id = to_object(ctx, &arg(&args, 0))?;
    Ok(match ctx.heap.get(id)?.prototype {
        Some(p) => JsValue::Object(p),
        None => JsValue::Null,
    })
}

/// Object.create(proto)
fn object_create(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let prototype = match arg(&args, 0) {
        JsValue::Object(id) => Some(id),
        JsValue::Null => None,
        other => {
            return Err(JErrorType::TypeError(format!(
                "object prototype may only be an object or null: {}",
                other
            )))
        }
    };
    Ok(JsValue::Object(ctx.alloc(JsObject::ordinary(prototype))?))
}

fn object_has_own_property(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let key = ctx.to_string(&arg(&args, 0))?;
    let id = to_object(ctx, &this)?;
    Ok(JsValue::Boolean(ctx.heap.get(id)?.has_own_property(&key)))
}

fn object_is_prototype_of(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let (proto, id) = match (&this, arg(&args, 0)) {
        (JsValue::Object(proto), JsValue::Object(id)) => (*proto, id),
        _ => return Ok(JsValue::Boolean(false)),
    };
    Ok(JsValue::Boolean(ctx.heap.inherits_from(id, proto)?))
}

fn object_property_is_enumerable(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let key = ctx.to_string(&arg(&args, 0))?;
    let id = to_object(ctx, &this)?;
    let object = ctx.heap.get(id)?;
    let enumerable = match object.get_own_descriptor(&key) {
        Some(d) => d.is_enumerable(),
        None => object.has_own_property(&key),
    };
    Ok(JsValue::Boolean(enumerable))
}

/// Object.prototype.toString: `[object Class]`.
fn object_to_string(ctx: &mut EvalContext, this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let class = match &this {
        JsValue::Undefined => "Undefined",
        JsValue::Null => "Null",
        JsValue::String(_) => "String",
        JsValue::Number(_) => "Number",
        JsValue::Boolean(_) => "Boolean",
        JsValue::Object(id) => ctx.heap.get(*id)?.class_name(),
    };
    Ok(JsValue::String(format!("[object {}]", class)))
}

fn object_value_of(ctx: &mut EvalContext, this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    Ok(JsValue::Object(to_object(ctx, &this)?))
}

// ============================================================================
// Function
// ============================================================================

/// `Function(p1, ..., pn, body)`: compiles a function in the global scope.
fn function_constructor(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let mut parts = Vec::with_capacity(args.len());
    for a in &args {
        parts.push(ctx.to_string(a)?);
    }
    let body = parts.pop().unwrap_or_default();
    let source = format!("(function anonymous({}) {{\n{}\n}})", parts.join(","), body);
    let program = JsParser::parse_to_ast_from_str(&source)
        .map_err(|e| JErrorType::SyntaxError(e.message))?;
    let data = match program.body.first() {
        Some(StatementType::ExpressionStatement {
            expression: ExpressionType::FunctionExpression(data),
            ..
        }) => data.clone(),
        _ => {
            return Err(JErrorType::SyntaxError(
                "malformed function source".to_string(),
            ))
        }
    };
    let global = ctx.global();
    Ok(JsValue::Object(instantiate_function(&data, global, ctx)?))
}

/// Function.prototype.call(thisArg, ...args)
fn function_call(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let mut args = args.into_iter();
    let this_arg = args.next().unwrap_or(JsValue::Undefined);
    ctx.call(&this, this_arg, args.collect())
}

/// Function.prototype.apply(thisArg, argArray)
fn function_apply(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let this_arg = arg(&args, 0);
    let call_args = match arg(&args, 1) {
        JsValue::Undefined | JsValue::Null => vec![],
        list @ JsValue::Object(_) => {
            let length = ctx.get_property(&list, "length")?;
            let length = ctx.to_number(&length)?;
            let length = if length.is_finite() && length > 0.0 {
                length as usize
            } else {
                0
            };
            let mut values = Vec::with_capacity(length);
            for i in 0..length {
                values.push(ctx.get_property(&list, &i.to_string())?);
            }
            values
        }
        _ => {
            return Err(JErrorType::TypeError(
                "second argument to Function.prototype.apply must be an array".to_string(),
            ))
        }
    };
    ctx.call(&this, this_arg, call_args)
}

fn function_to_string(ctx: &mut EvalContext, this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let not_a_function = || JErrorType::TypeError("Function.prototype.toString called on incompatible object".to_string());
    let id = this.as_object().ok_or_else(not_a_function)?;
    let text = match ctx.heap.get(id)?.as_function() {
        Some(FunctionKind::Native { name, .. }) => {
            format!("function {}() {{ [native code] }}", name)
        }
        Some(FunctionKind::Script { data, .. }) => {
            let params: Vec<&str> = data.params.iter().map(|p| p.name.as_str()).collect();
            format!("function {}({}) {{ [script code] }}", data.name(), params.join(", "))
        }
        None => return Err(not_a_function()),
    };
    Ok(JsValue::String(text))
}
