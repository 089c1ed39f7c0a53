use std::fmt;
use std::fmt::{Display, Formatter};

use crate::runner::ds::heap::ObjectId;

pub const TYPE_STR_UNDEFINED: &str = "undefined";
pub const TYPE_STR_NULL: &str = "null";

/// A script value. Objects live in the context heap and are referred to by handle.
#[derive(Clone, PartialEq)]
pub enum JsValue {
    Undefined,
    Null,
    Boolean(bool),
    String(String),
    Number(JsNumberType),
    Object(ObjectId),
}

impl JsValue {
    pub fn is_nullish(&self) -> bool {
        matches!(self, JsValue::Undefined | JsValue::Null)
    }

    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            JsValue::Object(id) => Some(*id),
            _ => None,
        }
    }

    pub fn from_f64(f: f64) -> Self {
        JsValue::Number(JsNumberType::from_f64(f))
    }

    pub fn from_i64(i: i64) -> Self {
        JsValue::Number(JsNumberType::Integer(i))
    }

    /// Bytes this value occupies when stored in an object slot.
    pub fn footprint(&self) -> usize {
        let inline = std::mem::size_of::<JsValue>();
        match self {
            JsValue::String(s) => inline + s.len(),
            _ => inline,
        }
    }
}

impl Display for JsValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "{}", TYPE_STR_UNDEFINED),
            JsValue::Null => write!(f, "{}", TYPE_STR_NULL),
            JsValue::Boolean(b) => write!(f, "{}", b),
            JsValue::String(s) => write!(f, "{}", s),
            JsValue::Number(n) => write!(f, "{}", n),
            JsValue::Object(_) => write!(f, "[object Object]"),
        }
    }
}

impl fmt::Debug for JsValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "JsValue::Undefined"),
            JsValue::Null => write!(f, "JsValue::Null"),
            JsValue::Boolean(b) => write!(f, "JsValue::Boolean({})", b),
            JsValue::String(s) => write!(f, "JsValue::String({:?})", s),
            JsValue::Number(n) => write!(f, "JsValue::Number({:?})", n),
            JsValue::Object(id) => write!(f, "JsValue::Object({:?})", id),
        }
    }
}

/// Numbers keep an integer representation while arithmetic stays exact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JsNumberType {
    Integer(i64),
    Float(f64),
    NaN,
    PositiveInfinity,
    NegativeInfinity,
}

impl JsNumberType {
    pub fn from_f64(f: f64) -> Self {
        if f.is_nan() {
            JsNumberType::NaN
        } else if f == f64::INFINITY {
            JsNumberType::PositiveInfinity
        } else if f == f64::NEG_INFINITY {
            JsNumberType::NegativeInfinity
        } else {
            JsNumberType::Float(f)
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            JsNumberType::Integer(i) => *i as f64,
            JsNumberType::Float(f) => *f,
            JsNumberType::NaN => f64::NAN,
            JsNumberType::PositiveInfinity => f64::INFINITY,
            JsNumberType::NegativeInfinity => f64::NEG_INFINITY,
        }
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, JsNumberType::NaN)
    }

    /// The exact integer value, when there is one.
    pub fn as_exact_i64(&self) -> Option<i64> {
        match self {
            JsNumberType::Integer(i) => Some(*i),
            JsNumberType::Float(f) => {
                if f.fract() == 0.0 && f.abs() <= 9_007_199_254_740_991.0 {
                    Some(*f as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

impl Display for JsNumberType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JsNumberType::Integer(i) => write!(f, "{}", i),
            JsNumberType::Float(nf) => write!(f, "{}", format_f64(*nf)),
            JsNumberType::NaN => write!(f, "NaN"),
            JsNumberType::PositiveInfinity => write!(f, "Infinity"),
            JsNumberType::NegativeInfinity => write!(f, "-Infinity"),
        }
    }
}

/// Number-to-string in the script's format: integral values print without a fraction, very
/// large or very small magnitudes switch to exponent notation (`1e+21`, `1e-7`).
pub fn format_f64(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if f == 0.0 {
        return "0".to_string();
    }
    let abs = f.abs();
    if abs >= 1e21 || abs < 1e-6 {
        let s = format!("{:e}", f);
        return match s.find('e') {
            Some(pos) if !s[pos + 1..].starts_with('-') => {
                format!("{}e+{}", &s[..pos], &s[pos + 1..])
            }
            _ => s,
        };
    }
    if f.fract() == 0.0 {
        format!("{:.0}", f)
    } else {
        format!("{}", f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_f64() {
        assert_eq!(format_f64(3.0), "3");
        assert_eq!(format_f64(-0.0), "0");
        assert_eq!(format_f64(0.1), "0.1");
        assert_eq!(format_f64(1e21), "1e+21");
        assert_eq!(format_f64(1.5e-7), "1.5e-7");
        assert_eq!(format_f64(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_from_f64_normalizes_special_values() {
        assert_eq!(JsNumberType::from_f64(f64::NAN), JsNumberType::NaN);
        assert_eq!(
            JsNumberType::from_f64(f64::INFINITY),
            JsNumberType::PositiveInfinity
        );
        assert_eq!(JsNumberType::from_f64(2.5), JsNumberType::Float(2.5));
    }

    #[test]
    fn test_exact_integer() {
        assert_eq!(JsNumberType::Float(4.0).as_exact_i64(), Some(4));
        assert_eq!(JsNumberType::Float(4.5).as_exact_i64(), None);
        assert_eq!(JsNumberType::NaN.as_exact_i64(), None);
    }
}
