//! Math built-in object.
//!
//! Provides mathematical constants and functions.

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::operations::type_conversion::number_from_f64;
use crate::runner::ds::value::{JsNumberType, JsValue};
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInObject, EvalContext};

use super::arg;

/// Register the Math object with the registry.
pub fn register(registry: &mut BuiltInRegistry) {
    let math = BuiltInObject::new("Math")
        // Constants
        .add_property("E", float(std::f64::consts::E))
        .add_property("LN10", float(std::f64::consts::LN_10))
        .add_property("LN2", float(std::f64::consts::LN_2))
        .add_property("LOG10E", float(std::f64::consts::LOG10_E))
        .add_property("LOG2E", float(std::f64::consts::LOG2_E))
        .add_property("PI", float(std::f64::consts::PI))
        .add_property("SQRT1_2", float(std::f64::consts::FRAC_1_SQRT_2))
        .add_property("SQRT2", float(std::f64::consts::SQRT_2))
        // Methods
        .add_method("abs", math_abs)
        .add_method("floor", math_floor)
        .add_method("ceil", math_ceil)
        .add_method("round", math_round)
        .add_method("min", math_min)
        .add_method("max", math_max)
        .add_method("sqrt", math_sqrt)
        .add_method("pow", math_pow)
        .add_method("exp", math_exp)
        .add_method("log", math_log)
        .add_method("sin", math_sin)
        .add_method("cos", math_cos)
        .add_method("tan", math_tan)
        .add_method("asin", math_asin)
        .add_method("acos", math_acos)
        .add_method("atan", math_atan)
        .add_method("atan2", math_atan2)
        .add_method("random", math_random);

    registry.register_object(math);
}

fn float(f: f64) -> JsValue {
    JsValue::Number(JsNumberType::Float(f))
}

fn number(f: f64) -> JsValue {
    JsValue::Number(number_from_f64(f))
}

/// Applies `f` to the first argument converted to a number.
fn unary(ctx: &mut EvalContext, args: &[JsValue], f: fn(f64) -> f64) -> Result<JsValue, JErrorType> {
    let x = ctx.to_number(&arg(args, 0))?;
    Ok(number(f(x)))
}

fn math_abs(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::abs)
}

fn math_floor(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::floor)
}

fn math_ceil(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::ceil)
}

/// Math.round: halves round towards positive infinity.
fn math_round(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, |x| {
        if x.fract() == 0.0 || !x.is_finite() {
            x
        } else if (-0.5..0.0).contains(&x) {
            -0.0
        } else {
            (x + 0.5).floor()
        }
    })
}

fn math_sqrt(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::sqrt)
}

fn math_exp(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::exp)
}

fn math_log(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::ln)
}

fn math_sin(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::sin)
}

fn math_cos(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::cos)
}

fn math_tan(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::tan)
}

fn math_asin(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::asin)
}

fn math_acos(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::acos)
}

fn math_atan(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    unary(ctx, &args, f64::atan)
}

fn math_atan2(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let y = ctx.to_number(&arg(&args, 0))?;
    let x = ctx.to_number(&arg(&args, 1))?;
    Ok(number(y.atan2(x)))
}

fn math_pow(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let base = ctx.to_number(&arg(&args, 0))?;
    let exponent = ctx.to_number(&arg(&args, 1))?;
    if exponent.is_nan() {
        return Ok(JsValue::Number(JsNumberType::NaN));
    }
    Ok(number(base.powf(exponent)))
}

/// Math.min / Math.max share this fold; any NaN argument makes the result NaN.
fn extremum(
    ctx: &mut EvalContext,
    args: &[JsValue],
    start: f64,
    pick_new: fn(f64, f64) -> bool,
) -> Result<JsValue, JErrorType> {
    let mut result = start;
    for a in args {
        let x = ctx.to_number(a)?;
        if x.is_nan() {
            return Ok(JsValue::Number(JsNumberType::NaN));
        }
        if pick_new(x, result) {
            result = x;
        }
    }
    Ok(number(result))
}

fn math_min(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    extremum(ctx, &args, f64::INFINITY, |x, current| {
        x < current || (x == 0.0 && current == 0.0 && x.is_sign_negative())
    })
}

fn math_max(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    extremum(ctx, &args, f64::NEG_INFINITY, |x, current| {
        x > current || (x == 0.0 && current == 0.0 && current.is_sign_negative())
    })
}

/// Math.random: 53 random bits from a v4 UUID scaled into `[0, 1)`.
fn math_random(_ctx: &mut EvalContext, _this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let bits = uuid::Uuid::new_v4().as_u128() >> 75;
    Ok(float(bits as f64 / (1u64 << 53) as f64))
}
