use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::ObjectKind;
use crate::runner::ds::value::{JsNumberType, JsValue};
use crate::runner::plugin::types::EvalContext;

pub use crate::runner::ds::value::{TYPE_STR_NULL, TYPE_STR_UNDEFINED};
pub const TYPE_STR_BOOLEAN: &str = "boolean";
pub const TYPE_STR_STRING: &str = "string";
pub const TYPE_STR_NUMBER: &str = "number";
pub const TYPE_STR_OBJECT: &str = "object";
pub const TYPE_STR_FUNCTION: &str = "function";

/// Largest integer every f64 represents exactly.
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// `typeof` result.
pub fn get_type(a: &JsValue, ctx: &EvalContext) -> &'static str {
    match a {
        JsValue::Undefined => TYPE_STR_UNDEFINED,
        JsValue::Null => TYPE_STR_OBJECT,
        JsValue::Boolean(_) => TYPE_STR_BOOLEAN,
        JsValue::String(_) => TYPE_STR_STRING,
        JsValue::Number(_) => TYPE_STR_NUMBER,
        JsValue::Object(_) => {
            if ctx.is_callable(a) {
                TYPE_STR_FUNCTION
            } else {
                TYPE_STR_OBJECT
            }
        }
    }
}

pub enum PreferredType {
    Default,
    String,
    Number,
}

pub fn to_primitive(
    v: &JsValue,
    preferred_type: PreferredType,
    ctx: &mut EvalContext,
) -> Result<JsValue, JErrorType> {
    let id = match v {
        JsValue::Object(id) => *id,
        _ => return Ok(v.clone()),
    };
    let methods = match preferred_type {
        PreferredType::String => ["toString", "valueOf"],
        PreferredType::Default | PreferredType::Number => ["valueOf", "toString"],
    };
    for name in &methods {
        let method = ctx.get_property(v, name)?;
        if ctx.is_callable(&method) {
            let result = ctx.call(&method, JsValue::Object(id), vec![])?;
            if !matches!(result, JsValue::Object(_)) {
                return Ok(result);
            }
        }
    }
    Err(JErrorType::TypeError(
        "cannot convert object to primitive value".to_string(),
    ))
}

pub fn to_boolean(v: &JsValue) -> bool {
    match v {
        JsValue::Undefined | JsValue::Null => false,
        JsValue::Boolean(b) => *b,
        JsValue::String(s) => !s.is_empty(),
        JsValue::Number(n) => match n {
            JsNumberType::Integer(i) => *i != 0,
            JsNumberType::Float(f) => *f != 0.0,
            JsNumberType::NaN => false,
            JsNumberType::PositiveInfinity | JsNumberType::NegativeInfinity => true,
        },
        JsValue::Object(_) => true,
    }
}

/// Integral values within the exact range keep the integer representation.
pub fn number_from_f64(f: f64) -> JsNumberType {
    if f.fract() == 0.0
        && f.abs() <= MAX_SAFE_INTEGER as f64
        && !(f == 0.0 && f.is_sign_negative())
    {
        JsNumberType::Integer(f as i64)
    } else {
        JsNumberType::from_f64(f)
    }
}

pub fn number_from_i64(i: i64) -> JsNumberType {
    if (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&i) {
        JsNumberType::Integer(i)
    } else {
        JsNumberType::Float(i as f64)
    }
}

/// Parses a numeric string the way `Number("...")` does. Whitespace around the number is
/// ignored and the empty string is zero.
pub fn string_to_number(s: &str) -> f64 {
    let t = s.trim();
    if t.is_empty() {
        return 0.0;
    }
    match t {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if t.starts_with("0x") || t.starts_with("0X") {
        return u64::from_str_radix(&t[2..], 16)
            .map(|u| u as f64)
            .unwrap_or(f64::NAN);
    }
    // Rust accepts "inf" and "nan", the script language does not.
    if !t
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }
    t.parse::<f64>().unwrap_or(f64::NAN)
}

pub fn to_number(v: &JsValue, ctx: &mut EvalContext) -> Result<f64, JErrorType> {
    Ok(to_numeric(v, ctx)?.as_f64())
}

/// ToNumber, keeping exact integers as integers.
pub fn to_numeric(v: &JsValue, ctx: &mut EvalContext) -> Result<JsNumberType, JErrorType> {
    Ok(match v {
        JsValue::Undefined => JsNumberType::NaN,
        JsValue::Null => JsNumberType::Integer(0),
        JsValue::Boolean(b) => JsNumberType::Integer(if *b { 1 } else { 0 }),
        JsValue::Number(n) => *n,
        JsValue::String(s) => number_from_f64(string_to_number(s)),
        JsValue::Object(_) => {
            let p = to_primitive(v, PreferredType::Number, ctx)?;
            return to_numeric(&p, ctx);
        }
    })
}

pub fn to_string(v: &JsValue, ctx: &mut EvalContext) -> Result<String, JErrorType> {
    Ok(match v {
        JsValue::Undefined => TYPE_STR_UNDEFINED.to_string(),
        JsValue::Null => TYPE_STR_NULL.to_string(),
        JsValue::Boolean(b) => b.to_string(),
        JsValue::String(s) => s.clone(),
        JsValue::Number(n) => n.to_string(),
        JsValue::Object(_) => {
            let p = to_primitive(v, PreferredType::String, ctx)?;
            return to_string(&p, ctx);
        }
    })
}

/// The primitive held by a `new String/Number/Boolean` wrapper.
pub fn unwrap_primitive(v: &JsValue, ctx: &EvalContext) -> Option<JsValue> {
    match v {
        JsValue::Object(id) => match ctx.heap.get(*id).ok().map(|o| &o.kind) {
            Some(ObjectKind::Primitive(p)) => Some(p.clone()),
            _ => None,
        },
        _ => Some(v.clone()),
    }
}

pub fn f64_to_int32(f: f64) -> i32 {
    f64_to_uint32(f) as i32
}

pub fn f64_to_uint32(f: f64) -> u32 {
    if !f.is_finite() {
        return 0;
    }
    let m = f.trunc().rem_euclid(4_294_967_296.0);
    m as u32
}

pub fn to_int32(v: &JsValue, ctx: &mut EvalContext) -> Result<i32, JErrorType> {
    Ok(match to_numeric(v, ctx)? {
        JsNumberType::Integer(i) => i as i32,
        n => f64_to_int32(n.as_f64()),
    })
}

pub fn to_uint32(v: &JsValue, ctx: &mut EvalContext) -> Result<u32, JErrorType> {
    Ok(match to_numeric(v, ctx)? {
        JsNumberType::Integer(i) => i as u32,
        n => f64_to_uint32(n.as_f64()),
    })
}

/// ToInteger: NaN becomes zero, everything else truncates toward zero.
pub fn to_integer(v: &JsValue, ctx: &mut EvalContext) -> Result<f64, JErrorType> {
    let f = to_number(v, ctx)?;
    Ok(if f.is_nan() { 0.0 } else { f.trunc() })
}
