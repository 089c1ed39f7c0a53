//! Core built-ins registration and the global functions.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::operations::type_conversion::{number_from_f64, string_to_number};
use crate::runner::ds::value::{JsNumberType, JsValue};
use crate::runner::plugin::registry::{BuiltInRegistry, GLOBAL_OBJECT_NAME};
use crate::runner::plugin::types::{BuiltInObject, EvalContext};

use super::{arg, array, console, error, math, number, object, string};

/// Register all core built-in objects with the registry.
pub fn register_core_builtins(registry: &mut BuiltInRegistry) {
    register_globals(registry);
    // Prototype parents first.
    object::register(registry);
    array::register(registry);
    string::register(registry);
    number::register(registry);
    math::register(registry);
    error::register(registry);
    console::register(registry);
}

fn register_globals(registry: &mut BuiltInRegistry) {
    let global = BuiltInObject::new(GLOBAL_OBJECT_NAME)
        .add_property("NaN", JsValue::Number(JsNumberType::NaN))
        .add_property("Infinity", JsValue::Number(JsNumberType::PositiveInfinity))
        .add_property("undefined", JsValue::Undefined)
        .add_method("parseInt", parse_int)
        .add_method("parseFloat", parse_float)
        .add_method("isNaN", is_nan)
        .add_method("isFinite", is_finite);
    registry.register_object(global);
}

/// parseInt(string, radix)
fn parse_int(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let input = ctx.to_string(&arg(&args, 0))?;
    let radix = ctx.to_number(&arg(&args, 1))?;
    let mut s = input.trim_start();
    let negative = s.starts_with('-');
    if negative || s.starts_with('+') {
        s = &s[1..];
    }
    let mut radix = if radix.is_nan() { 0 } else { radix.trunc() as i64 };
    if radix == 0 || radix == 16 {
        if s.starts_with("0x") || s.starts_with("0X") {
            s = &s[2..];
            radix = 16;
        }
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return Ok(JsValue::Number(JsNumberType::NaN));
    }
    let digits: Vec<u32> = s
        .chars()
        .map_while(|c| c.to_digit(radix as u32))
        .collect();
    if digits.is_empty() {
        return Ok(JsValue::Number(JsNumberType::NaN));
    }
    let value = digits
        .iter()
        .fold(0f64, |acc, d| acc * radix as f64 + *d as f64);
    let value = if negative { -value } else { value };
    Ok(JsValue::Number(number_from_f64(value)))
}

/// parseFloat(string): the longest prefix that reads as a decimal literal.
fn parse_float(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let input = ctx.to_string(&arg(&args, 0))?;
    let s = input.trim_start();
    let unsigned = s.trim_start_matches(|c| c == '+' || c == '-');
    if unsigned.starts_with("Infinity") {
        let f = if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
        return Ok(JsValue::from_f64(f));
    }
    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_exp = false;
    let bytes = s.as_bytes();
    while end < bytes.len() {
        let c = bytes[end];
        let accept = match c {
            b'0'..=b'9' => true,
            b'+' | b'-' => end == 0 || matches!(bytes[end - 1], b'e' | b'E'),
            b'.' if !seen_dot && !seen_exp => {
                seen_dot = true;
                true
            }
            b'e' | b'E' if !seen_exp && end > 0 => {
                seen_exp = true;
                true
            }
            _ => false,
        };
        if !accept {
            break;
        }
        end += 1;
    }
    // Back off a dangling exponent or sign.
    let mut candidate = &s[..end];
    while !candidate.is_empty() && candidate.parse::<f64>().is_err() {
        candidate = &candidate[..candidate.len() - 1];
    }
    if candidate.is_empty() {
        return Ok(JsValue::Number(JsNumberType::NaN));
    }
    Ok(JsValue::Number(number_from_f64(string_to_number(candidate))))
}

fn is_nan(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    Ok(JsValue::Boolean(ctx.to_number(&arg(&args, 0))?.is_nan()))
}

fn is_finite(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    Ok(JsValue::Boolean(ctx.to_number(&arg(&args, 0))?.is_finite()))
}
