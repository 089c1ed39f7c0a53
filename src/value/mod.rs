//! Tagged values exchanged between the host and the script engine.
//!
//! A [`Value`] owns its children exclusively, so a map or vector can never contain itself.
//! Cloning copies maps, vectors and strings deeply; [`Content`] payloads are shared.

mod content;

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

pub use self::content::Content;
use crate::error::ScriptError;

/// Discriminant of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Boolean,
    Integer,
    Long,
    ULong,
    Float,
    Double,
    String,
    Ptr,
    Content,
    Map,
    Vector,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Boolean => "Boolean",
            ValueType::Integer => "Integer",
            ValueType::Long => "Long",
            ValueType::ULong => "ULong",
            ValueType::Float => "Float",
            ValueType::Double => "Double",
            ValueType::String => "String",
            ValueType::Ptr => "Ptr",
            ValueType::Content => "Content",
            ValueType::Map => "Map",
            ValueType::Vector => "Vector",
        };
        f.write_str(name)
    }
}

/// Opaque address owned by the caller. Never dereferenced and never freed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ptr(usize);

impl Ptr {
    pub fn from_raw<T>(ptr: *const T) -> Self {
        Ptr(ptr as usize)
    }

    pub fn addr(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Integer(i32),
    Long(i64),
    ULong(u64),
    Float(f32),
    Double(f64),
    /// May contain embedded NULs.
    String(String),
    Ptr(Ptr),
    Content(Content),
    Map(ValueMap),
    Vector(ValueVector),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Boolean(_) => ValueType::Boolean,
            Value::Integer(_) => ValueType::Integer,
            Value::Long(_) => ValueType::Long,
            Value::ULong(_) => ValueType::ULong,
            Value::Float(_) => ValueType::Float,
            Value::Double(_) => ValueType::Double,
            Value::String(_) => ValueType::String,
            Value::Ptr(_) => ValueType::Ptr,
            Value::Content(_) => ValueType::Content,
            Value::Map(_) => ValueType::Map,
            Value::Vector(_) => ValueType::Vector,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Any integer variant whose value fits `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i as i64),
            Value::Long(l) => Some(*l),
            Value::ULong(u) if *u <= i64::MAX as u64 => Some(*u as i64),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::ULong(u) => Some(*u),
            Value::Integer(i) if *i >= 0 => Some(*i as u64),
            Value::Long(l) if *l >= 0 => Some(*l as u64),
            _ => None,
        }
    }

    /// Any numeric variant as `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Long(l) => Some(*l as f64),
            Value::ULong(u) => Some(*u as f64),
            Value::Float(f) => Some(*f as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_ptr(&self) -> Option<Ptr> {
        match self {
            Value::Ptr(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_content(&self) -> Option<&Content> {
        match self {
            Value::Content(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut ValueMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&ValueVector> {
        match self {
            Value::Vector(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vector_mut(&mut self) -> Option<&mut ValueVector> {
        match self {
            Value::Vector(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }

    /// Structural equality that ignores the numeric variant and tolerates single-precision
    /// rounding, so `Float(0.1)` matches `Double(0.1)` and `Long(2)` matches `Integer(2)`.
    pub fn approx_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).map(|w| v.approx_eq(w)).unwrap_or(false))
            }
            (Value::Vector(a), Value::Vector(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(v, w)| v.approx_eq(w))
            }
            (a, b) if a.is_numeric() && b.is_numeric() => {
                let (x, y) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
                if x.is_nan() || y.is_nan() {
                    return x.is_nan() && y.is_nan();
                }
                if x == y {
                    return true;
                }
                let single = matches!(a, Value::Float(_)) || matches!(b, Value::Float(_));
                let tolerance = if single { f32::EPSILON as f64 } else { f64::EPSILON };
                (x - y).abs() <= tolerance * x.abs().max(y.abs())
            }
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}", l),
            Value::ULong(u) => write!(f, "{}", u),
            Value::Float(x) => write!(f, "{}", x),
            Value::Double(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Ptr(p) => write!(f, "<ptr {:#x}>", p.addr()),
            Value::Content(c) => write!(f, "<{} bytes of {}>", c.len(), c.mime_type()),
            Value::Map(m) => {
                f.write_str("{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{:?}: {}", k, v)?;
                }
                f.write_str("}")
            }
            Value::Vector(v) => {
                f.write_str("[")?;
                for (i, item) in v.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Value::ULong(u)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Content> for Value {
    fn from(c: Content) -> Self {
        Value::Content(c)
    }
}

impl From<ValueMap> for Value {
    fn from(m: ValueMap) -> Self {
        Value::Map(m)
    }
}

impl From<ValueVector> for Value {
    fn from(v: ValueVector) -> Self {
        Value::Vector(v)
    }
}

/// String-keyed map of owned values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueMap {
    entries: BTreeMap<String, Value>,
}

impl ValueMap {
    pub fn new() -> Self {
        ValueMap::default()
    }

    /// Inserts or replaces `key`, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    pub fn keys(&self) -> btree_map::Keys<'_, String, Value> {
        self.entries.keys()
    }
}

impl<K: Into<String>, V: Into<Value>> std::iter::FromIterator<(K, V)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ValueMap::new();
        for (k, v) in iter {
            map.set(k, v);
        }
        map
    }
}

/// Zero-indexed sequence of owned values. Items are appended or overwritten, never inserted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueVector {
    items: Vec<Value>,
}

impl ValueVector {
    pub fn new() -> Self {
        ValueVector::default()
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.items.push(value.into());
    }

    /// Overwrites the item at `index`; `index == len()` appends.
    pub fn set(&mut self, index: usize, value: impl Into<Value>) -> Result<(), ScriptError> {
        let len = self.items.len();
        if index < len {
            self.items[index] = value.into();
        } else if index == len {
            self.items.push(value.into());
        } else {
            return Err(ScriptError::InvalidArgument(format!(
                "vector index {} out of range for length {}",
                index, len
            )));
        }
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }
}

impl<V: Into<Value>> std::iter::FromIterator<V> for ValueVector {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        ValueVector {
            items: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_clone_is_deep_for_maps() {
        let mut inner = ValueMap::new();
        inner.set("n", 1);
        let mut outer = ValueMap::new();
        outer.set("inner", inner);
        let original = Value::Map(outer);

        let mut copy = original.clone();
        copy.as_map_mut()
            .and_then(|m| m.get_mut("inner"))
            .and_then(|v| v.as_map_mut())
            .unwrap()
            .set("n", 2);

        let n = original.as_map().unwrap().get("inner").unwrap().as_map().unwrap().get("n");
        assert_eq!(n, Some(&Value::Integer(1)));
    }

    #[test]
    fn test_content_clone_shares_payload() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = released.clone();
        let content = Content::with_destructor("audio/wav", vec![1, 2, 3], move |mime, data| {
            assert_eq!(mime, "audio/wav");
            assert_eq!(data, vec![1, 2, 3]);
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let value = Value::Content(content.clone());
        assert_eq!(content.ref_count(), 2);

        let copy = value.clone();
        assert!(copy.as_content().unwrap().ptr_eq(&content));
        assert_eq!(content.ref_count(), 3);

        drop(value);
        drop(copy);
        assert_eq!(released.load(Ordering::SeqCst), 0);
        drop(content);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_vector_set_overwrites_or_appends() {
        let mut v: ValueVector = vec![1, 2].into_iter().collect();
        v.set(0, "a").unwrap();
        v.set(2, true).unwrap();
        assert!(v.set(5, 0).is_err());
        assert_eq!(v.len(), 3);
        assert_eq!(v.get(0), Some(&Value::from("a")));
        assert_eq!(v.get(2), Some(&Value::Boolean(true)));
    }

    #[test]
    fn test_approx_eq_across_numeric_variants() {
        assert!(Value::Float(0.1).approx_eq(&Value::Double(0.1)));
        assert!(Value::Long(7).approx_eq(&Value::Integer(7)));
        assert!(Value::Double(f64::NAN).approx_eq(&Value::Double(f64::NAN)));
        assert!(!Value::Integer(1).approx_eq(&Value::from("1")));
    }

    #[test]
    fn test_display_renders_nested_values() {
        let mut m = ValueMap::new();
        m.set("list", vec![Value::Integer(1), Value::from("x")].into_iter().collect::<ValueVector>());
        m.set("ok", true);
        assert_eq!(Value::Map(m).to_string(), r#"{"list": [1, "x"], "ok": true}"#);
    }
}
