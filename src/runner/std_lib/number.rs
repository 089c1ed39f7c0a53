//! Number and Boolean built-ins.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::operations::type_conversion::{to_boolean, to_integer, to_numeric, unwrap_primitive};
use crate::runner::ds::value::{format_f64, JsNumberType, JsValue};
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInObject, EvalContext};

use super::arg;
use super::object::to_object;

/// Register the Number and Boolean built-ins with the registry.
pub fn register(registry: &mut BuiltInRegistry) {
    let number = BuiltInObject::new("Number")
        .with_constructor(number_constructor)
        .with_construct(number_construct)
        .add_property("MAX_VALUE", JsValue::Number(JsNumberType::Float(f64::MAX)))
        .add_property("MIN_VALUE", JsValue::Number(JsNumberType::Float(5e-324)))
        .add_property("NaN", JsValue::Number(JsNumberType::NaN))
        .add_property("POSITIVE_INFINITY", JsValue::Number(JsNumberType::PositiveInfinity))
        .add_property("NEGATIVE_INFINITY", JsValue::Number(JsNumberType::NegativeInfinity))
        .add_prototype_method("toString", number_to_string)
        .add_prototype_method("toFixed", number_to_fixed)
        .add_prototype_method("valueOf", number_value_of);
    registry.register_object(number);

    let boolean = BuiltInObject::new("Boolean")
        .with_constructor(boolean_constructor)
        .with_construct(boolean_construct)
        .add_prototype_method("toString", boolean_to_string)
        .add_prototype_method("valueOf", boolean_value_of);
    registry.register_object(boolean);
}

fn this_number(ctx: &EvalContext, this: &JsValue) -> Result<JsNumberType, JErrorType> {
    match unwrap_primitive(this, ctx) {
        Some(JsValue::Number(n)) => Ok(n),
        _ => Err(JErrorType::TypeError(
            "Number.prototype method called on incompatible receiver".to_string(),
        )),
    }
}

/// Number(value)
fn number_constructor(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    match args.first() {
        None => Ok(JsValue::from_i64(0)),
        Some(v) => Ok(JsValue::Number(to_numeric(v, ctx)?)),
    }
}

/// new Number(value)
fn number_construct(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let value = number_constructor(ctx, this, args)?;
    Ok(JsValue::Object(to_object(ctx, &value)?))
}

/// Digits of `n` in `radix`, with up to 20 fraction digits.
fn format_radix(n: f64, radix: u32) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let negative = n < 0.0;
    let n = n.abs();
    let mut integer = n.trunc();
    let mut fraction = n - integer;

    let mut int_digits = vec![];
    loop {
        let d = (integer % radix as f64) as usize;
        int_digits.push(DIGITS[d]);
        integer = (integer / radix as f64).trunc();
        if integer < 1.0 {
            break;
        }
    }
    int_digits.reverse();

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&String::from_utf8_lossy(&int_digits));
    if fraction > 0.0 {
        out.push('.');
        for _ in 0..20 {
            fraction *= radix as f64;
            let d = fraction.trunc() as usize;
            out.push(DIGITS[d] as char);
            fraction -= d as f64;
            if fraction <= 0.0 {
                break;
            }
        }
    }
    out
}

/// Number.prototype.toString(radix)
fn number_to_string(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let n = this_number(ctx, &this)?;
    let radix = match arg(&args, 0) {
        JsValue::Undefined => 10.0,
        r => to_integer(&r, ctx)?,
    };
    if !(2.0..=36.0).contains(&radix) {
        return Err(JErrorType::RangeError(
            "toString() radix must be between 2 and 36".to_string(),
        ));
    }
    let f = n.as_f64();
    if radix == 10.0 || !f.is_finite() {
        return Ok(JsValue::String(n.to_string()));
    }
    Ok(JsValue::String(format_radix(f, radix as u32)))
}

/// Number.prototype.toFixed(digits)
fn number_to_fixed(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let n = this_number(ctx, &this)?;
    let digits = to_integer(&arg(&args, 0), ctx)?;
    if !(0.0..=20.0).contains(&digits) {
        return Err(JErrorType::RangeError(
            "toFixed() digits argument must be between 0 and 20".to_string(),
        ));
    }
    let f = n.as_f64();
    if !f.is_finite() || f.abs() >= 1e21 {
        return Ok(JsValue::String(format_f64(f)));
    }
    Ok(JsValue::String(format!("{:.*}", digits as usize, f)))
}

/// Number.prototype.valueOf
fn number_value_of(ctx: &mut EvalContext, this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    Ok(JsValue::Number(this_number(ctx, &this)?))
}

// ============================================================================
// Boolean
// ============================================================================

fn this_boolean(ctx: &EvalContext, this: &JsValue) -> Result<bool, JErrorType> {
    match unwrap_primitive(this, ctx) {
        Some(JsValue::Boolean(b)) => Ok(b),
        _ => Err(JErrorType::TypeError(
            "Boolean.prototype method called on incompatible receiver".to_string(),
        )),
    }
}

/// Boolean(value)
fn boolean_constructor(_ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    Ok(JsValue::Boolean(to_boolean(&arg(&args, 0))))
}

/// new Boolean(value)
fn boolean_construct(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let value = boolean_constructor(ctx, this, args)?;
    Ok(JsValue::Object(to_object(ctx, &value)?))
}

fn boolean_to_string(ctx: &mut EvalContext, this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    Ok(JsValue::String(this_boolean(ctx, &this)?.to_string()))
}

fn boolean_value_of(ctx: &mut EvalContext, this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    Ok(JsValue::Boolean(this_boolean(ctx, &this)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_radix() {
        assert_eq!(format_radix(255.0, 16), "ff");
        assert_eq!(format_radix(-5.0, 2), "-101");
        assert_eq!(format_radix(0.5, 2), "0.1");
        assert_eq!(format_radix(0.0, 36), "0");
    }
}
