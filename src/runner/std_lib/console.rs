//! Console built-in object.
//!
//! Script output goes to the host's `tracing` subscriber under the `voxscript::script` target.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInObject, EvalContext};

/// Register the console object with the registry.
pub fn register(registry: &mut BuiltInRegistry) {
    let console = BuiltInObject::new("console")
        .add_method("log", console_log)
        .add_method("info", console_info)
        .add_method("warn", console_warn)
        .add_method("error", console_error)
        .add_method("debug", console_debug);

    registry.register_object(console);
}

/// Arguments converted with ToString and joined by single spaces.
fn format_args(ctx: &mut EvalContext, args: &[JsValue]) -> Result<String, JErrorType> {
    let mut parts = Vec::with_capacity(args.len());
    for a in args {
        parts.push(ctx.to_string(a)?);
    }
    Ok(parts.join(" "))
}

fn console_log(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let line = format_args(ctx, &args)?;
    tracing::info!(target: "voxscript::script", "{}", line);
    Ok(JsValue::Undefined)
}

fn console_info(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let line = format_args(ctx, &args)?;
    tracing::info!(target: "voxscript::script", "{}", line);
    Ok(JsValue::Undefined)
}

fn console_warn(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let line = format_args(ctx, &args)?;
    tracing::warn!(target: "voxscript::script", "{}", line);
    Ok(JsValue::Undefined)
}

fn console_error(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let line = format_args(ctx, &args)?;
    tracing::error!(target: "voxscript::script", "{}", line);
    Ok(JsValue::Undefined)
}

fn console_debug(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let line = format_args(ctx, &args)?;
    tracing::debug!(target: "voxscript::script", "{}", line);
    Ok(JsValue::Undefined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::heap::{Heap, HeapConfig};

    #[test]
    fn test_format_args_joins_with_spaces() {
        let mut ctx = EvalContext::new(Heap::new(HeapConfig::unlimited())).unwrap();
        let line = format_args(
            &mut ctx,
            &[
                JsValue::String("a".to_string()),
                JsValue::from_i64(1),
                JsValue::Null,
            ],
        )
        .unwrap();
        assert_eq!(line, "a 1 null");
    }
}
