//! Array built-in.
//!
//! Provides Array constructor and prototype methods. The methods operate on objects with
//! array storage (arrays and `arguments`).

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::heap::ObjectId;
use crate::runner::ds::object::ObjectKind;
use crate::runner::ds::operations::test_and_comparison::strict_equals;
use crate::runner::ds::operations::type_conversion::{to_boolean, to_integer};
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInObject, EvalContext};

use super::arg;

/// Longest array `new Array(n)` will preallocate.
const MAX_CONSTRUCTED_LENGTH: usize = 1 << 20;

/// Register the Array built-in with the registry.
pub fn register(registry: &mut BuiltInRegistry) {
    let array = BuiltInObject::new("Array")
        .with_constructor(array_constructor)
        .add_method("isArray", is_array)
        .add_prototype_method("push", array_push)
        .add_prototype_method("pop", array_pop)
        .add_prototype_method("shift", array_shift)
        .add_prototype_method("unshift", array_unshift)
        .add_prototype_method("slice", array_slice)
        .add_prototype_method("splice", array_splice)
        .add_prototype_method("indexOf", array_index_of)
        .add_prototype_method("lastIndexOf", array_last_index_of)
        .add_prototype_method("forEach", array_for_each)
        .add_prototype_method("map", array_map)
        .add_prototype_method("filter", array_filter)
        .add_prototype_method("some", array_some)
        .add_prototype_method("every", array_every)
        .add_prototype_method("reduce", array_reduce)
        .add_prototype_method("join", array_join)
        .add_prototype_method("toString", array_to_string)
        .add_prototype_method("concat", array_concat)
        .add_prototype_method("reverse", array_reverse)
        .add_prototype_method("sort", array_sort);

    registry.register_object(array);
}

fn array_id(ctx: &EvalContext, this: &JsValue) -> Result<ObjectId, JErrorType> {
    if let JsValue::Object(id) = this {
        if let ObjectKind::Array(_) = ctx.heap.get(*id)?.kind {
            return Ok(*id);
        }
    }
    Err(JErrorType::TypeError(format!("{} is not an array", this)))
}

/// Snapshot of the elements of `this`.
fn elements(ctx: &EvalContext, this: &JsValue) -> Result<Vec<JsValue>, JErrorType> {
    let id = array_id(ctx, this)?;
    match &ctx.heap.get(id)?.kind {
        ObjectKind::Array(e) => Ok(e.clone()),
        _ => Ok(vec![]),
    }
}

fn elements_mut<'a>(
    ctx: &'a mut EvalContext,
    this: &JsValue,
) -> Result<&'a mut Vec<JsValue>, JErrorType> {
    let id = array_id(ctx, this)?;
    let object = ctx.heap.get_mut(id)?;
    if object.frozen {
        return Err(JErrorType::TypeError("array is read-only".to_string()));
    }
    match &mut object.kind {
        ObjectKind::Array(e) => Ok(e),
        _ => Err(JErrorType::TypeError(format!("{} is not an array", this))),
    }
}

fn element_at(ctx: &EvalContext, id: ObjectId, index: usize) -> Result<Option<JsValue>, JErrorType> {
    Ok(match &ctx.heap.get(id)?.kind {
        ObjectKind::Array(e) => e.get(index).cloned(),
        _ => None,
    })
}

fn length_of(ctx: &EvalContext, id: ObjectId) -> Result<usize, JErrorType> {
    Ok(match &ctx.heap.get(id)?.kind {
        ObjectKind::Array(e) => e.len(),
        _ => 0,
    })
}

/// Resolves a possibly negative position argument against `len`.
fn relative_index(
    ctx: &mut EvalContext,
    value: &JsValue,
    len: usize,
    default: usize,
) -> Result<usize, JErrorType> {
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

fn length_value(len: usize) -> JsValue {
    JsValue::from_i64(len as i64)
}

/// Array(...) and new Array(...)
fn array_constructor(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    if let [JsValue::Number(n)] = args.as_slice() {
        let len = match n.as_exact_i64() {
            Some(len) if len >= 0 && (len as usize) <= MAX_CONSTRUCTED_LENGTH => len as usize,
            _ => return Err(JErrorType::RangeError("invalid array length".to_string())),
        };
        return Ok(JsValue::Object(ctx.new_array(vec![JsValue::Undefined; len])?));
    }
    Ok(JsValue::Object(ctx.new_array(args)?))
}

/// Array.isArray
fn is_array(ctx: &mut EvalContext, _this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    Ok(JsValue::Boolean(array_id(ctx, &arg(&args, 0)).is_ok()))
}

fn charge_elements(ctx: &mut EvalContext, items: &[JsValue]) -> Result<(), JErrorType> {
    ctx.charge(items.iter().map(JsValue::footprint).sum())
}

/// Array.prototype.push
fn array_push(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    charge_elements(ctx, &args)?;
    let e = elements_mut(ctx, &this)?;
    e.extend(args);
    Ok(length_value(e.len()))
}

/// Array.prototype.pop
fn array_pop(ctx: &mut EvalContext, this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    Ok(elements_mut(ctx, &this)?.pop().unwrap_or(JsValue::Undefined))
}

/// Array.prototype.shift
fn array_shift(ctx: &mut EvalContext, this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let e = elements_mut(ctx, &this)?;
    if e.is_empty() {
        return Ok(JsValue::Undefined);
    }
    Ok(e.remove(0))
}

/// Array.prototype.unshift
fn array_unshift(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    charge_elements(ctx, &args)?;
    let e = elements_mut(ctx, &this)?;
    e.splice(0..0, args);
    Ok(length_value(e.len()))
}

/// Array.prototype.slice
fn array_slice(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let e = elements(ctx, &this)?;
    let start = relative_index(ctx, &arg(&args, 0), e.len(), 0)?;
    let end = relative_index(ctx, &arg(&args, 1), e.len(), e.len())?;
    let slice = if start < end {
        e[start..end].to_vec()
    } else {
        vec![]
    };
    Ok(JsValue::Object(ctx.new_array(slice)?))
}

/// Array.prototype.splice
fn array_splice(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let len = elements(ctx, &this)?.len();
    let start = relative_index(ctx, &arg(&args, 0), len, 0)?;
    let delete_count = match args.get(1) {
        None => len - start,
        Some(v) => {
            let n = to_integer(v, ctx)?;
            (n.max(0.0) as usize).min(len - start)
        }
    };
    let items: Vec<JsValue> = args.into_iter().skip(2).collect();
    charge_elements(ctx, &items)?;
    let removed: Vec<JsValue> = elements_mut(ctx, &this)?
        .splice(start..start + delete_count, items)
        .collect();
    Ok(JsValue::Object(ctx.new_array(removed)?))
}

/// Array.prototype.indexOf
fn array_index_of(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let e = elements(ctx, &this)?;
    let target = arg(&args, 0);
    let from = relative_index(ctx, &arg(&args, 1), e.len(), 0)?;
    let found = e
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, v)| strict_equals(v, &target))
        .map(|(i, _)| i as i64)
        .unwrap_or(-1);
    Ok(JsValue::from_i64(found))
}

/// Array.prototype.lastIndexOf
fn array_last_index_of(
    ctx: &mut EvalContext,
    this: JsValue,
    args: Vec<JsValue>,
) -> Result<JsValue, JErrorType> {
    let e = elements(ctx, &this)?;
    let target = arg(&args, 0);
    let found = e
        .iter()
        .rposition(|v| strict_equals(v, &target))
        .map(|i| i as i64)
        .unwrap_or(-1);
    Ok(JsValue::from_i64(found))
}

/// Calls `callback(element, index, array)` for every index present when iteration started
/// that still exists when reached. Stops early when `visit` returns `false`.
fn for_each_element<F>(
    ctx: &mut EvalContext,
    this: &JsValue,
    args: &[JsValue],
    mut visit: F,
) -> Result<(), JErrorType>
where
    F: FnMut(&mut EvalContext, usize, JsValue, JsValue) -> Result<bool, JErrorType>,
{
    let id = array_id(ctx, this)?;
    let callback = arg(args, 0);
    if !ctx.is_callable(&callback) {
        return Err(JErrorType::TypeError(format!("{} is not a function", callback)));
    }
    let this_arg = arg(args, 1);
    let len = length_of(ctx, id)?;
    for i in 0..len {
        let element = match element_at(ctx, id, i)? {
            Some(v) => v,
            None => break,
        };
        let result = ctx.call(
            &callback,
            this_arg.clone(),
            vec![element.clone(), JsValue::from_i64(i as i64), this.clone()],
        )?;
        if !visit(ctx, i, element, result)? {
            break;
        }
    }
    Ok(())
}

/// Array.prototype.forEach
fn array_for_each(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    for_each_element(ctx, &this, &args, |_, _, _, _| Ok(true))?;
    Ok(JsValue::Undefined)
}

/// Array.prototype.map
fn array_map(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let mut mapped = vec![];
    for_each_element(ctx, &this, &args, |_, _, _, result| {
        mapped.push(result);
        Ok(true)
    })?;
    Ok(JsValue::Object(ctx.new_array(mapped)?))
}

/// Array.prototype.filter
fn array_filter(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let mut kept = vec![];
    for_each_element(ctx, &this, &args, |_, _, element, result| {
        if to_boolean(&result) {
            kept.push(element);
        }
        Ok(true)
    })?;
    Ok(JsValue::Object(ctx.new_array(kept)?))
}

/// Array.prototype.some
fn array_some(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let mut found = false;
    for_each_element(ctx, &this, &args, |_, _, _, result| {
        found = to_boolean(&result);
        Ok(!found)
    })?;
    Ok(JsValue::Boolean(found))
}

/// Array.prototype.every
fn array_every(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let mut all = true;
    for_each_element(ctx, &this, &args, |_, _, _, result| {
        all = to_boolean(&result);
        Ok(all)
    })?;
    Ok(JsValue::Boolean(all))
}

/// Array.prototype.reduce
fn array_reduce(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let id = array_id(ctx, &this)?;
    let callback = arg(&args, 0);
    if !ctx.is_callable(&callback) {
        return Err(JErrorType::TypeError(format!("{} is not a function", callback)));
    }
    let len = length_of(ctx, id)?;
    let mut index = 0;
    let mut accumulator = match args.get(1) {
        Some(initial) => initial.clone(),
        None => match element_at(ctx, id, 0)? {
            Some(first) => {
                index = 1;
                first
            }
            None => {
                return Err(JErrorType::TypeError(
                    "reduce of empty array with no initial value".to_string(),
                ))
            }
        },
    };
    while index < len {
        let element = match element_at(ctx, id, index)? {
            Some(v) => v,
            None => break,
        };
        accumulator = ctx.call(
            &callback,
            JsValue::Undefined,
            vec![accumulator, element, JsValue::from_i64(index as i64), this.clone()],
        )?;
        index += 1;
    }
    Ok(accumulator)
}

/// Array.prototype.join
fn array_join(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let separator = match arg(&args, 0) {
        JsValue::Undefined => ",".to_string(),
        s => ctx.to_string(&s)?,
    };
    let e = elements(ctx, &this)?;
    let mut parts = Vec::with_capacity(e.len());
    for v in &e {
        parts.push(if v.is_nullish() {
            String::new()
        } else {
            ctx.to_string(v)?
        });
    }
    Ok(JsValue::String(parts.join(&separator)))
}

/// Array.prototype.toString
fn array_to_string(ctx: &mut EvalContext, this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    array_join(ctx, this, vec![])
}

/// Array.prototype.concat
fn array_concat(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let mut result = elements(ctx, &this)?;
    for a in &args {
        match array_id(ctx, a) {
            Ok(_) => result.extend(elements(ctx, a)?),
            Err(_) => result.push(a.clone()),
        }
    }
    Ok(JsValue::Object(ctx.new_array(result)?))
}

/// Array.prototype.reverse
fn array_reverse(ctx: &mut EvalContext, this: JsValue, _args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    elements_mut(ctx, &this)?.reverse();
    Ok(this)
}

/// Stable merge sort with a fallible "a sorts before or with b" predicate.
fn merge_sort<F>(items: Vec<JsValue>, before_or_equal: &mut F) -> Result<Vec<JsValue>, JErrorType>
where
    F: FnMut(&JsValue, &JsValue) -> Result<bool, JErrorType>,
{
    if items.len() <= 1 {
        return Ok(items);
    }
    let mut left = items;
    let right = left.split_off(left.len() / 2);
    let left = merge_sort(left, before_or_equal)?;
    let right = merge_sort(right, before_or_equal)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_left = match (left.peek(), right.peek()) {
            (Some(a), Some(b)) => before_or_equal(a, b)?,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        let next = if take_left { left.next() } else { right.next() };
        if let Some(v) = next {
            merged.push(v);
        }
    }
    Ok(merged)
}

/// Array.prototype.sort. `undefined` elements sort last.
fn array_sort(ctx: &mut EvalContext, this: JsValue, args: Vec<JsValue>) -> Result<JsValue, JErrorType> {
    let comparator = arg(&args, 0);
    if !comparator.is_nullish() && !ctx.is_callable(&comparator) {
        return Err(JErrorType::TypeError(
            "the comparison function must be either a function or undefined".to_string(),
        ));
    }
    let (defined, undefined): (Vec<JsValue>, Vec<JsValue>) = elements(ctx, &this)?
        .into_iter()
        .partition(|v| !matches!(v, JsValue::Undefined));

    let mut sorted = merge_sort(defined, &mut |a, b| {
        if comparator.is_nullish() {
            let a = ctx.to_string(a)?;
            let b = ctx.to_string(b)?;
            Ok(a.encode_utf16().le(b.encode_utf16()))
        } else {
            let order = ctx.call(&comparator, JsValue::Undefined, vec![a.clone(), b.clone()])?;
            let order = ctx.to_number(&order)?;
            Ok(!(order > 0.0))
        }
    })?;
    sorted.extend(undefined);

    *elements_mut(ctx, &this)? = sorted;
    Ok(this)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_sort_is_stable() {
        let items: Vec<JsValue> = vec![(2, "a"), (1, "b"), (2, "c"), (1, "d")]
            .into_iter()
            .map(|(k, tag)| JsValue::String(format!("{}{}", k, tag)))
            .collect();
        let key = |v: &JsValue| v.to_string().chars().next();
        let sorted = merge_sort(items, &mut |a, b| Ok(key(a) <= key(b))).unwrap();
        let sorted: Vec<String> = sorted.iter().map(|v| v.to_string()).collect();
        assert_eq!(sorted, vec!["1b", "1d", "2a", "2c"]);
    }
}
