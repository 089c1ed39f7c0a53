//! Conversion between tagged values and script values.
//!
//! Composite conversions allocate script objects that nothing roots yet. Collections only run
//! at safe points between host operations, so a result stays valid until the caller stores it
//! somewhere reachable or roots it.

use thiserror::Error;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::heap::ObjectId;
use crate::runner::ds::object::{JsObject, ObjectKind};
use crate::runner::ds::value::{JsNumberType, JsValue};
use crate::runner::plugin::types::EvalContext;
use crate::value::{Value, ValueMap, ValueVector};

/// Largest integer magnitude a script number represents exactly.
pub const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// Deepest map, vector or object nesting converted in either direction.
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarshalError {
    /// The script value is `undefined`.
    #[error("value is undefined")]
    Undefined,
    /// The script value is `null`.
    #[error("value is null")]
    Null,
    #[error("integer {0} cannot be represented exactly as a script number")]
    IntegerOutOfRange(i128),
    #[error("{0} values cannot be converted")]
    Unsupported(&'static str),
    #[error("property '{0}' holds a scope object")]
    ScopeObject(String),
    #[error("object graph contains a cycle")]
    Cycle,
    #[error("value nests deeper than {0} levels")]
    TooDeep(usize),
    #[error("document nodes are read-only")]
    ReadOnly,
    #[error("{0}")]
    Engine(JErrorType),
}

impl From<JErrorType> for MarshalError {
    fn from(e: JErrorType) -> Self {
        MarshalError::Engine(e)
    }
}

fn exact_integer(i: i128) -> Result<JsValue, MarshalError> {
    if i.abs() > MAX_SAFE_INTEGER as i128 {
        return Err(MarshalError::IntegerOutOfRange(i));
    }
    Ok(JsValue::from_i64(i as i64))
}

/// Converts a tagged value into a script value, allocating objects for maps, vectors and
/// content.
pub fn to_native(value: &Value, ctx: &mut EvalContext) -> Result<JsValue, MarshalError> {
    to_native_at(value, ctx, 0)
}

fn to_native_at(value: &Value, ctx: &mut EvalContext, depth: usize) -> Result<JsValue, MarshalError> {
    if depth >= MAX_DEPTH && matches!(value, Value::Map(_) | Value::Vector(_)) {
        return Err(MarshalError::TooDeep(MAX_DEPTH));
    }
    Ok(match value {
        Value::Boolean(b) => JsValue::Boolean(*b),
        Value::Integer(i) => JsValue::from_i64(*i as i64),
        Value::Long(l) => exact_integer(*l as i128)?,
        Value::ULong(u) => exact_integer(*u as i128)?,
        Value::Float(f) => JsValue::from_f64(*f as f64),
        Value::Double(d) => JsValue::from_f64(*d),
        Value::String(s) => JsValue::String(s.clone()),
        Value::Ptr(_) => return Err(MarshalError::Unsupported("Ptr")),
        Value::Content(content) => {
            let proto = ctx.realm.object_prototype;
            let mut wrapper = JsObject::new(ObjectKind::Content(content.clone()), Some(proto));
            wrapper.frozen = true;
            JsValue::Object(ctx.alloc(wrapper)?)
        }
        Value::Map(map) => {
            let id = ctx.new_object()?;
            for (key, item) in map.iter() {
                let item = to_native_at(item, ctx, depth + 1)?;
                ctx.heap.get_mut(id)?.put(key, item);
            }
            JsValue::Object(id)
        }
        Value::Vector(vector) => {
            let mut elements = Vec::with_capacity(vector.len());
            for item in vector.iter() {
                elements.push(to_native_at(item, ctx, depth + 1)?);
            }
            JsValue::Object(ctx.new_array(elements)?)
        }
    })
}

/// Converts a script value back into a tagged value.
pub fn from_native(value: &JsValue, ctx: &EvalContext) -> Result<Value, MarshalError> {
    let mut path = vec![];
    convert(value, ctx, &mut path)
}

fn convert(value: &JsValue, ctx: &EvalContext, path: &mut Vec<ObjectId>) -> Result<Value, MarshalError> {
    match value {
        JsValue::Undefined => Err(MarshalError::Undefined),
        JsValue::Null => Err(MarshalError::Null),
        JsValue::Boolean(b) => Ok(Value::Boolean(*b)),
        JsValue::String(s) => Ok(Value::String(s.clone())),
        JsValue::Number(n) => Ok(number_value(n)),
        JsValue::Object(id) => {
            if path.contains(id) {
                return Err(MarshalError::Cycle);
            }
            if path.len() >= MAX_DEPTH {
                return Err(MarshalError::TooDeep(MAX_DEPTH));
            }
            path.push(*id);
            let result = convert_object(*id, ctx, path);
            path.pop();
            result
        }
    }
}

fn number_value(n: &JsNumberType) -> Value {
    match n {
        JsNumberType::Integer(i) => {
            if *i >= i32::MIN as i64 && *i <= i32::MAX as i64 {
                Value::Integer(*i as i32)
            } else {
                Value::Long(*i)
            }
        }
        other => Value::Double(other.as_f64()),
    }
}

fn convert_object(id: ObjectId, ctx: &EvalContext, path: &mut Vec<ObjectId>) -> Result<Value, MarshalError> {
    let object = ctx.heap.get(id)?;
    match &object.kind {
        ObjectKind::Function(_) => Err(MarshalError::Unsupported("function")),
        ObjectKind::Global | ObjectKind::Scope { .. } | ObjectKind::Activation { .. } => {
            Err(MarshalError::ScopeObject(String::new()))
        }
        ObjectKind::Content(content) => Ok(Value::Content(content.clone())),
        ObjectKind::Document(_) => Err(MarshalError::ReadOnly),
        ObjectKind::Primitive(inner) => convert(inner, ctx, path),
        ObjectKind::Array(elements) => {
            let mut vector = ValueVector::new();
            for element in elements {
                vector.push(convert(element, ctx, path)?);
            }
            Ok(Value::Vector(vector))
        }
        ObjectKind::Error => {
            let mut map = properties(id, ctx, path)?;
            for key in &["name", "message"] {
                if !map.contains_key(key) {
                    if let Some(JsValue::String(s)) = ctx.heap.lookup(id, key)? {
                        map.set(*key, s);
                    }
                }
            }
            Ok(Value::Map(map))
        }
        ObjectKind::Ordinary => Ok(Value::Map(properties(id, ctx, path)?)),
    }
}

/// Own enumerable properties. Functions, null and undefined are left out.
fn properties(id: ObjectId, ctx: &EvalContext, path: &mut Vec<ObjectId>) -> Result<ValueMap, MarshalError> {
    let object = ctx.heap.get(id)?;
    let mut map = ValueMap::new();
    for key in object.own_keys(true) {
        let item = match object.get_own_property(&key) {
            Some(v) => v,
            None => continue,
        };
        if let JsValue::Object(child) = &item {
            let child = ctx.heap.get(*child)?;
            if child.is_callable() {
                continue;
            }
            if child.is_scope() || matches!(child.kind, ObjectKind::Activation { .. }) {
                return Err(MarshalError::ScopeObject(key));
            }
        }
        match convert(&item, ctx, path) {
            Ok(v) => {
                map.set(key, v);
            }
            Err(MarshalError::Undefined) | Err(MarshalError::Null) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::heap::{Heap, HeapConfig};
    use crate::value::Content;
    use pretty_assertions::assert_eq;

    fn ctx() -> EvalContext {
        EvalContext::new(Heap::new(HeapConfig::unlimited())).unwrap()
    }

    fn round_trip(value: &Value, ctx: &mut EvalContext) -> Value {
        let native = to_native(value, ctx).unwrap();
        from_native(&native, ctx).unwrap()
    }

    #[test]
    fn test_scalars_round_trip() {
        let mut ctx = ctx();
        for v in vec![
            Value::Boolean(true),
            Value::Integer(-7),
            Value::Long(1 << 40),
            Value::ULong(42),
            Value::Float(1.5),
            Value::Double(-0.25),
            Value::from("with\0nul"),
        ] {
            let back = round_trip(&v, &mut ctx);
            assert!(back.approx_eq(&v), "{} came back as {}", v, back);
        }
    }

    #[test]
    fn test_integer_width_on_the_way_back() {
        let ctx = ctx();
        assert_eq!(from_native(&JsValue::from_i64(5), &ctx).unwrap(), Value::Integer(5));
        assert_eq!(
            from_native(&JsValue::from_i64(1 << 40), &ctx).unwrap(),
            Value::Long(1 << 40)
        );
        assert_eq!(from_native(&JsValue::from_f64(0.5), &ctx).unwrap(), Value::Double(0.5));
    }

    #[test]
    fn test_nested_composites_round_trip() {
        let mut ctx = ctx();
        let mut inner = ValueMap::new();
        inner.set("city", "Oslo");
        let mut map = ValueMap::new();
        map.set("caller", inner);
        map.set(
            "digits",
            vec![Value::Integer(1), Value::Integer(2)].into_iter().collect::<ValueVector>(),
        );
        let value = Value::Map(map);
        assert_eq!(round_trip(&value, &mut ctx), value);
    }

    #[test]
    fn test_unrepresentable_integers_fail() {
        let mut ctx = ctx();
        assert_eq!(
            to_native(&Value::Long(i64::MAX), &mut ctx),
            Err(MarshalError::IntegerOutOfRange(i64::MAX as i128))
        );
        assert!(to_native(&Value::ULong(MAX_SAFE_INTEGER as u64), &mut ctx).is_ok());
        assert_eq!(
            to_native(&Value::Ptr(crate::value::Ptr::from_raw(&0u8)), &mut ctx),
            Err(MarshalError::Unsupported("Ptr"))
        );
    }

    #[test]
    fn test_null_and_undefined_are_distinct() {
        let ctx = ctx();
        assert_eq!(from_native(&JsValue::Undefined, &ctx), Err(MarshalError::Undefined));
        assert_eq!(from_native(&JsValue::Null, &ctx), Err(MarshalError::Null));
    }

    #[test]
    fn test_content_is_shared_not_flattened() {
        let mut ctx = ctx();
        let content = Content::new("audio/basic", vec![0xff; 16]);
        let native = to_native(&Value::Content(content.clone()), &mut ctx).unwrap();
        assert_eq!(content.ref_count(), 2);

        let back = from_native(&native, &ctx).unwrap();
        let back = back.as_content().unwrap();
        assert!(back.ptr_eq(&content));
        assert_eq!(back.mime_type(), "audio/basic");
        assert_eq!(back.len(), 16);
        assert_eq!(content.ref_count(), 3);
    }

    #[test]
    fn test_collected_wrapper_releases_content() {
        let mut ctx = ctx();
        let content = Content::new("text/plain", b"hi".to_vec());
        to_native(&Value::Content(content.clone()), &mut ctx).unwrap();
        assert_eq!(content.ref_count(), 2);
        let roots = ctx.realm.intrinsics();
        ctx.heap.collect(&roots);
        assert_eq!(content.ref_count(), 1);
    }

    #[test]
    fn test_cycles_are_detected() {
        let mut ctx = ctx();
        let id = ctx.new_object().unwrap();
        ctx.heap.get_mut(id).unwrap().put("self", JsValue::Object(id));
        assert_eq!(from_native(&JsValue::Object(id), &ctx), Err(MarshalError::Cycle));
    }

    #[test]
    fn test_shared_children_are_not_cycles() {
        let mut ctx = ctx();
        let child = ctx.new_object().unwrap();
        let parent = ctx.new_object().unwrap();
        let o = ctx.heap.get_mut(parent).unwrap();
        o.put("a", JsValue::Object(child));
        o.put("b", JsValue::Object(child));
        let back = from_native(&JsValue::Object(parent), &ctx).unwrap();
        assert_eq!(back.as_map().unwrap().len(), 2);
    }

    #[test]
    fn test_null_array_element_fails() {
        let mut ctx = ctx();
        let array = ctx.new_array(vec![JsValue::from_i64(1), JsValue::Null]).unwrap();
        assert_eq!(from_native(&JsValue::Object(array), &ctx), Err(MarshalError::Null));
    }

    #[test]
    fn test_functions_and_nulls_are_omitted_from_maps() {
        let mut ctx = ctx();
        let id = ctx.new_object().unwrap();
        let array_prototype = JsValue::Object(ctx.realm.array_prototype);
        let push = ctx.get_property(&array_prototype, "push").unwrap();
        let o = ctx.heap.get_mut(id).unwrap();
        o.put("f", push);
        o.put("n", JsValue::Null);
        o.put("k", JsValue::from_i64(1));
        let back = from_native(&JsValue::Object(id), &ctx).unwrap();
        let keys: Vec<String> = back.as_map().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["k".to_string()]);
    }

    #[test]
    fn test_scope_valued_property_is_rejected() {
        let mut ctx = ctx();
        let id = ctx.new_object().unwrap();
        let global = ctx.global();
        ctx.heap.get_mut(id).unwrap().put("g", JsValue::Object(global));
        assert_eq!(
            from_native(&JsValue::Object(id), &ctx),
            Err(MarshalError::ScopeObject("g".to_string()))
        );
    }

    #[test]
    fn test_nesting_is_bounded_both_ways() {
        let mut ctx = ctx();
        let mut value = Value::Vector(ValueVector::new());
        for _ in 0..MAX_DEPTH {
            value = Value::Vector(vec![value].into_iter().collect());
        }
        assert_eq!(to_native(&value, &mut ctx), Err(MarshalError::TooDeep(MAX_DEPTH)));

        let mut native = JsValue::Object(ctx.new_array(vec![]).unwrap());
        for _ in 0..MAX_DEPTH {
            native = JsValue::Object(ctx.new_array(vec![native]).unwrap());
        }
        assert_eq!(from_native(&native, &ctx), Err(MarshalError::TooDeep(MAX_DEPTH)));
    }

    #[test]
    fn test_nesting_just_under_the_limit_converts() {
        let mut ctx = ctx();
        let mut native = JsValue::Object(ctx.new_array(vec![]).unwrap());
        for _ in 1..MAX_DEPTH {
            native = JsValue::Object(ctx.new_array(vec![native]).unwrap());
        }
        assert!(from_native(&native, &ctx).is_ok());
    }
}
