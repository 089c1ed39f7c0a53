//! String built-in.
//!
//! Provides String constructor and prototype methods. Positions and lengths count UTF-16 code
//! units.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::operations::type_conversion::{to_integer, to_uint32, unwrap_primitive};
use crate::runner::ds::value::{JsNumberType, JsValue};
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInObject, EvalContext};

use super::arg;
use super::object::to_object;

/// Register the String built-in with the registry.
pub fn register(registry: &mut BuiltInRegistry) {
    let string = BuiltInObject::new("String")
        .with_constructor(string_constructor)
        .with_construct(string_construct)
        .add_method("fromCharCode", string_from_char_code)
        .add_prototype_method("charAt", string_char_at)
        .add_prototype_method("charCodeAt", string_char_code_at)
        .add_prototype_method("indexOf", string_index_of)
        .add_prototype_method("lastIndexOf", string_last_index_of)
        .add_prototype_method("substring", string_substring)
        .add_prototype_method("substr", string_substr)
        .add_prototype_method("slice", string_slice)
        .add_prototype_method("split", string_split)
        .add_prototype_method("trim", string_trim)
        .add_prototype_method("toUpperCase", string_to_upper_case)
        .add_prototype_method("toLowerCase", string_to_lower_case)
        .add_prototype_method("replace", string_replace)
        .add_prototype_method("concat", string_concat)
        .add_prototype_method("toString", string_value_of)
        .add_prototype_method("valueOf", string_value_of);

    registry.register_object(string);
}

fn this_string(ctx: &mut EvalContext, this: &JsValue) -> Result<String, JErrorType> {
    match this {
        JsValue::String(s) => Ok(s.clone()),
        JsValue::Undefined | JsValue::Null => Err(JErrorType::TypeError(format!(
            "String.prototype method called on {}",
            this
        ))),
        _ => match unwrap_primitive(this, ctx) {
            Some(JsValue::String(s)) => Ok(s),
            _ => ctx.to_string(this),
        },
    }
}

fn units(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

fn from_units(units: &[u16]) -> JsValue {
    JsValue::String(String::from_utf16_lossy(units))
}

fn find_units(haystack: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| &haystack[i..i + needle.len()] == needle)
}

/// Clamps ToInteger(value) into `0..=len`.
fn clamp_position(ctx: &mut EvalContext, value: &JsValue, len: usize, default: usize) -> Result<usize, JErrorType> {
    if let JsValue::Undefined = value {
        return Ok(default);
    }
    let n = to_integer(value, ctx)?;
    Ok(n.max(0.0).min(len as f64) as usize)
}

/// Like [`clamp_position`] but negative values count from the end.
fn relative_position(ctx: &mut EvalContext, value: &JsValue, len: usize, default: usize) -> Result<usize, JErrorType> {
    if let JsValue::Undefined = value {
        return Ok(default);
    }
    let n = to_integer(value, ctx)?;
    Ok(if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    })
}

/// String(value)
fn string_constructor(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    match args.first() {
        None => Ok(JsValue::String(String::new())),
        Some(v) => Ok(JsValue::String(ctx.to_string(v)?)),
    }
}

/// new String(value)
fn string_construct(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let value = string_constructor(ctx, this, args)?;
    Ok(JsValue::Object(to_object(ctx, &value)?))
}

/// String.fromCharCode
fn string_from_char_code(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let mut codes = Vec::with_capacity(args.len());
    for a in &args {
        codes.push(to_uint32(a, ctx)? as u16);
    }
    Ok(from_units(&codes))
}

/// String.prototype.charAt
fn string_char_at(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let u = units(&this_string(ctx, &this)?);
    let pos = to_integer(&arg(&args, 0), ctx)?;
    if pos < 0.0 || pos >= u.len() as f64 {
        return Ok(JsValue::String(String::new()));
    }
    let i = pos as usize;
    Ok(from_units(&u[i..i + 1]))
}

/// String.prototype.charCodeAt
fn string_char_code_at(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let u = units(&this_string(ctx, &this)?);
    let pos = to_integer(&arg(&args, 0), ctx)?;
    if pos < 0.0 || pos >= u.len() as f64 {
        return Ok(JsValue::Number(JsNumberType::NaN));
    }
    Ok(JsValue::from_i64(u[pos as usize] as i64))
}

/// String.prototype.indexOf
fn string_index_of(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let u = units(&this_string(ctx, &this)?);
    let needle = units(&ctx.to_string(&arg(&args, 0))?);
    let from = clamp_position(ctx, &arg(&args, 1), u.len(), 0)?;
    Ok(JsValue::from_i64(
        find_units(&u, &needle, from).map(|i| i as i64).unwrap_or(-1),
    ))
}

/// String.prototype.lastIndexOf
fn string_last_index_of(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let u = units(&this_string(ctx, &this)?);
    let needle = units(&ctx.to_string(&arg(&args, 0))?);
    if needle.len() > u.len() {
        return Ok(JsValue::from_i64(-1));
    }
    let last_start = u.len() - needle.len();
    let from = clamp_position(ctx, &arg(&args, 1), last_start, last_start)?;
    let found = (0..=from)
        .rev()
        .find(|&i| u[i..i + needle.len()] == needle[..])
        .map(|i| i as i64)
        .unwrap_or(-1);
    Ok(JsValue::from_i64(found))
}

/// String.prototype.substring
fn string_substring(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let u = units(&this_string(ctx, &this)?);
    let a = clamp_position(ctx, &arg(&args, 0), u.len(), 0)?;
    let b = clamp_position(ctx, &arg(&args, 1), u.len(), u.len())?;
    let (start, end) = if a <= b { (a, b) } else { (b, a) };
    Ok(from_units(&u[start..end]))
}

/// String.prototype.substr(start, length)
fn string_substr(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let u = units(&this_string(ctx, &this)?);
    let start = relative_position(ctx, &arg(&args, 0), u.len(), 0)?;
    let remaining = u.len() - start;
    let count = clamp_position(ctx, &arg(&args, 1), remaining, remaining)?;
    Ok(from_units(&u[start..start + count]))
}

/// String.prototype.slice
fn string_slice(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let u = units(&this_string(ctx, &this)?);
    let start = relative_position(ctx, &arg(&args, 0), u.len(), 0)?;
    let end = relative_position(ctx, &arg(&args, 1), u.len(), u.len())?;
    if start >= end {
        return Ok(JsValue::String(String::new()));
    }
    Ok(from_units(&u[start..end]))
}

/// String.prototype.split(separator, limit)
fn string_split(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let s = this_string(ctx, &this)?;
    let limit = match arg(&args, 1) {
        JsValue::Undefined => usize::MAX,
        v => to_uint32(&v, ctx)? as usize,
    };
    let parts: Vec<JsValue> = match arg(&args, 0) {
        JsValue::Undefined => vec![JsValue::String(s)],
        sep => {
            let sep = units(&ctx.to_string(&sep)?);
            let u = units(&s);
            if sep.is_empty() {
                u.iter().map(|c| from_units(&[*c])).collect()
            } else {
                let mut parts = vec![];
                let mut start = 0;
                while let Some(i) = find_units(&u, &sep, start) {
                    parts.push(from_units(&u[start..i]));
                    start = i + sep.len();
                }
                parts.push(from_units(&u[start..]));
                parts
            }
        }
    };
    let parts = parts.into_iter().take(limit).collect();
    Ok(JsValue::Object(ctx.new_array(parts)?))
}

/// String.prototype.trim
fn string_trim(ctx: &mut EvalContext, this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    Ok(JsValue::String(this_string(ctx, &this)?.trim().to_string()))
}

/// String.prototype.toUpperCase
fn string_to_upper_case(ctx: &mut EvalContext, this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    Ok(JsValue::String(this_string(ctx, &this)?.to_uppercase()))
}

/// String.prototype.toLowerCase
fn string_to_lower_case(ctx: &mut EvalContext, this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    Ok(JsValue::String(this_string(ctx, &this)?.to_lowercase()))
}

/// String.prototype.replace(search, replacement): replaces the first occurrence of a plain
/// string. A function replacement is called with (match, offset, string).
fn string_replace(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let s = this_string(ctx, &this)?;
    let search = ctx.to_string(&arg(&args, 0))?;
    let replacement = arg(&args, 1);
    let u = units(&s);
    let needle = units(&search);
    let position = match find_units(&u, &needle, 0) {
        Some(p) => p,
        None => return Ok(JsValue::String(s)),
    };
    let inserted = if ctx.is_callable(&replacement) {
        let r = ctx.call(
            &replacement,
            JsValue::Undefined,
            vec![
                JsValue::String(search.clone()),
                JsValue::from_i64(position as i64),
                JsValue::String(s.clone()),
            ],
        )?;
        ctx.to_string(&r)?
    } else {
        ctx.to_string(&replacement)?
            .replace("$&", &search)
            .replace("$$", "$")
    };
    let mut out = String::from_utf16_lossy(&u[..position]);
    out.push_str(&inserted);
    out.push_str(&String::from_utf16_lossy(&u[position + needle.len()..]));
    Ok(JsValue::String(out))
}

/// String.prototype.concat
fn string_concat(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let mut s = this_string(ctx, &this)?;
    for a in &args {
        s.push_str(&ctx.to_string(a)?);
    }
    Ok(JsValue::String(s))
}

/// String.prototype.valueOf and toString
fn string_value_of(ctx: &mut EvalContext, this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    match unwrap_primitive(&this, ctx) {
        Some(JsValue::String(s)) => Ok(JsValue::String(s)),
        _ => Err(JErrorType::TypeError(
            "String.prototype.valueOf called on incompatible receiver".to_string(),
        )),
    }
}
