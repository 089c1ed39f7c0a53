//! Error built-in objects.
//!
//! Provides the Error constructor and its native subtypes. Calling a constructor with or without
//! `new` produces the same error object.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInObject, EvalContext, NativeFn};

use super::arg;

const SUBTYPES: &[(&str, NativeFn)] = &[
    ("TypeError", type_error_constructor),
    ("ReferenceError", reference_error_constructor),
    ("RangeError", range_error_constructor),
    ("SyntaxError", syntax_error_constructor),
    ("EvalError", eval_error_constructor),
    ("URIError", uri_error_constructor),
];

/// Register all error types with the registry.
pub fn register(registry: &mut BuiltInRegistry) {
    let error = BuiltInObject::new("Error")
        .with_constructor(error_constructor)
        .add_prototype_property("name", JsValue::String("Error".to_string()))
        .add_prototype_property("message", JsValue::String(String::new()))
        .add_prototype_method("toString", error_to_string);
    registry.register_object(error);

    for (name, constructor) in SUBTYPES {
        let subtype = BuiltInObject::new(*name)
            .with_prototype("Error")
            .with_constructor(*constructor)
            .add_prototype_property("name", JsValue::String(name.to_string()));
        registry.register_object(subtype);
    }
}

fn create_error(ctx: &mut EvalContext, name: &str, args: &[JsValue]) -> Result<JsValue, JErrorType> {
    let message = match arg(args, 0) {
        JsValue::Undefined => String::new(),
        m => ctx.to_string(&m)?,
    };
    Ok(JsValue::Object(ctx.new_error(name, &message)?))
}

fn error_constructor(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    create_error(ctx, "Error", &args)
}

fn type_error_constructor(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    create_error(ctx, "TypeError", &args)
}

fn reference_error_constructor(
    ctx: &mut EvalContext,
    _this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    create_error(ctx, "ReferenceError", &args)
}

fn range_error_constructor(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    create_error(ctx, "RangeError", &args)
}

fn syntax_error_constructor(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    create_error(ctx, "SyntaxError", &args)
}

fn eval_error_constructor(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    create_error(ctx, "EvalError", &args)
}

fn uri_error_constructor(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    create_error(ctx, "URIError", &args)
}

/// Error.prototype.toString: `name: message`, or whichever of the two is non-empty.
fn error_to_string(ctx: &mut EvalContext, this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    if this.as_object().is_none() {
        return Err(JErrorType::TypeError(
            "Error.prototype.toString called on non-object".to_string(),
        ));
    }
    let name = match ctx.get_property(&this, "name")? {
        JsValue::Undefined => "Error".to_string(),
        n => ctx.to_string(&n)?,
    };
    let message = match ctx.get_property(&this, "message")? {
        JsValue::Undefined => String::new(),
        m => ctx.to_string(&m)?,
    };
    Ok(JsValue::String(if message.is_empty() {
        name
    } else if name.is_empty() {
        message
    } else {
        format!("{}: {}", name, message)
    }))
}
