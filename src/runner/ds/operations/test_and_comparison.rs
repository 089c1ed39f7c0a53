use crate::runner::ds::error::JErrorType;
use crate::runner::ds::operations::type_conversion::{
    string_to_number, to_numeric, to_primitive, PreferredType,
};
use crate::runner::ds::value::{JsNumberType, JsValue};
use crate::runner::plugin::types::EvalContext;

fn same_number(a: &JsNumberType, b: &JsNumberType) -> bool {
    match (a, b) {
        (JsNumberType::Integer(x), JsNumberType::Integer(y)) => x == y,
        _ => a.as_f64() == b.as_f64(),
    }
}

/// `===`
pub fn strict_equals(a: &JsValue, b: &JsValue) -> bool {
    match (a, b) {
        (JsValue::Undefined, JsValue::Undefined) | (JsValue::Null, JsValue::Null) => true,
        (JsValue::Boolean(x), JsValue::Boolean(y)) => x == y,
        (JsValue::String(x), JsValue::String(y)) => x == y,
        (JsValue::Number(x), JsValue::Number(y)) => same_number(x, y),
        (JsValue::Object(x), JsValue::Object(y)) => x == y,
        _ => false,
    }
}

/// `==`
pub fn loose_equals(a: &JsValue, b: &JsValue, ctx: &mut EvalContext) -> Result<bool, JErrorType> {
    Ok(match (a, b) {
        (JsValue::Undefined, JsValue::Null) | (JsValue::Null, JsValue::Undefined) => true,
        (JsValue::Number(x), JsValue::String(s)) | (JsValue::String(s), JsValue::Number(x)) => {
            x.as_f64() == string_to_number(s)
        }
        (JsValue::Boolean(_), _) => {
            let n = JsValue::Number(to_numeric(a, ctx)?);
            return loose_equals(&n, b, ctx);
        }
        (_, JsValue::Boolean(_)) => {
            let n = JsValue::Number(to_numeric(b, ctx)?);
            return loose_equals(a, &n, ctx);
        }
        (JsValue::Object(_), JsValue::Number(_)) | (JsValue::Object(_), JsValue::String(_)) => {
            let p = to_primitive(a, PreferredType::Default, ctx)?;
            return loose_equals(&p, b, ctx);
        }
        (JsValue::Number(_), JsValue::Object(_)) | (JsValue::String(_), JsValue::Object(_)) => {
            let p = to_primitive(b, PreferredType::Default, ctx)?;
            return loose_equals(a, &p, ctx);
        }
        _ => strict_equals(a, b),
    })
}

/// Abstract relational comparison `a < b`. `None` when either side is NaN.
pub fn less_than(a: &JsValue, b: &JsValue, ctx: &mut EvalContext) -> Result<Option<bool>, JErrorType> {
    let pa = to_primitive(a, PreferredType::Number, ctx)?;
    let pb = to_primitive(b, PreferredType::Number, ctx)?;
    if let (JsValue::String(x), JsValue::String(y)) = (&pa, &pb) {
        // Code-unit order.
        return Ok(Some(x.encode_utf16().lt(y.encode_utf16())));
    }
    let na = to_numeric(&pa, ctx)?;
    let nb = to_numeric(&pb, ctx)?;
    if let (JsNumberType::Integer(x), JsNumberType::Integer(y)) = (&na, &nb) {
        return Ok(Some(x < y));
    }
    let (fa, fb) = (na.as_f64(), nb.as_f64());
    if fa.is_nan() || fb.is_nan() {
        Ok(None)
    } else {
        Ok(Some(fa < fb))
    }
}
