use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::dom::DocumentNode;
use crate::parser::ast::FunctionData;
use crate::runner::ds::heap::ObjectId;
use crate::runner::ds::object_property::{PropertyDescriptor, PropertyFlags};
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::types::NativeFn;
use crate::value::Content;

/// Index writes further than this past the end of an array are kept as plain properties
/// instead of growing the element vector.
const MAX_DENSE_GAP: usize = 1 << 16;

pub enum FunctionKind {
    /// A closure over the environment object it was created in.
    Script {
        data: Arc<FunctionData>,
        scope: ObjectId,
    },
    Native {
        name: String,
        func: NativeFn,
        /// Behaviour under `new`; `None` means the function is not a constructor.
        construct: Option<NativeFn>,
    },
}

impl FunctionKind {
    pub fn name(&self) -> &str {
        match self {
            FunctionKind::Script { data, .. } => data.name(),
            FunctionKind::Native { name, .. } => name.as_str(),
        }
    }
}

impl fmt::Debug for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionKind::Script { data, scope } => {
                write!(f, "Script({:?}, scope={:?})", data.name(), scope)
            }
            FunctionKind::Native { name, .. } => write!(f, "Native({:?})", name),
        }
    }
}

#[derive(Debug)]
pub enum ObjectKind {
    Ordinary,
    /// The global object; root of every scope chain.
    Global,
    Array(Vec<JsValue>),
    Function(FunctionKind),
    Error,
    /// Wrapper created by `new String(..)`, `new Number(..)` or `new Boolean(..)`.
    Primitive(JsValue),
    /// A named dialog scope pushed by the host.
    Scope { parent: ObjectId, name: String },
    /// Function activation or `catch` scope.
    Activation { parent: ObjectId },
    /// Opaque wrapper around a host Content value. Dropping the wrapper releases its reference.
    Content(Content),
    /// Read-only view of a host document node.
    Document(Arc<DocumentNode>),
}

#[derive(Debug)]
pub struct JsObject {
    pub kind: ObjectKind,
    pub prototype: Option<ObjectId>,
    properties: HashMap<String, PropertyDescriptor>,
    order: Vec<String>,
    /// Frozen objects ignore every property write.
    pub frozen: bool,
}

/// The UTF-16 code unit of `s` at `index`, as a one-unit string.
pub fn string_unit_at(s: &str, index: usize) -> Option<JsValue> {
    s.encode_utf16()
        .nth(index)
        .map(|u| JsValue::String(String::from_utf16_lossy(&[u])))
}

/// Canonical array index: decimal digits without leading zeros.
pub fn array_index(key: &str) -> Option<usize> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse::<u32>().ok().map(|i| i as usize)
}

impl JsObject {
    pub fn new(kind: ObjectKind, prototype: Option<ObjectId>) -> Self {
        JsObject {
            kind,
            prototype,
            properties: HashMap::new(),
            order: vec![],
            frozen: false,
        }
    }

    pub fn ordinary(prototype: Option<ObjectId>) -> Self {
        JsObject::new(ObjectKind::Ordinary, prototype)
    }

    pub fn class_name(&self) -> &'static str {
        match &self.kind {
            ObjectKind::Array(_) => "Array",
            ObjectKind::Function(_) => "Function",
            ObjectKind::Error => "Error",
            ObjectKind::Primitive(JsValue::String(_)) => "String",
            ObjectKind::Primitive(JsValue::Number(_)) => "Number",
            ObjectKind::Primitive(JsValue::Boolean(_)) => "Boolean",
            ObjectKind::Global => "global",
            ObjectKind::Content(_) => "Content",
            ObjectKind::Document(_) => "Node",
            _ => "Object",
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.kind, ObjectKind::Function(_))
    }

    pub fn is_scope(&self) -> bool {
        matches!(self.kind, ObjectKind::Scope { .. } | ObjectKind::Global)
    }

    pub fn as_function(&self) -> Option<&FunctionKind> {
        match &self.kind {
            ObjectKind::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Next object in the scope chain when this object is used as an environment.
    pub fn env_parent(&self) -> Option<ObjectId> {
        match &self.kind {
            ObjectKind::Scope { parent, .. } | ObjectKind::Activation { parent } => Some(*parent),
            _ => None,
        }
    }

    pub fn get_own_property(&self, key: &str) -> Option<JsValue> {
        match &self.kind {
            ObjectKind::Array(elements) => {
                if key == "length" {
                    return Some(JsValue::from_i64(elements.len() as i64));
                }
                if let Some(index) = array_index(key) {
                    if let Some(v) = elements.get(index) {
                        return Some(v.clone());
                    }
                }
            }
            ObjectKind::Primitive(JsValue::String(s)) => {
                if key == "length" {
                    return Some(JsValue::from_i64(s.encode_utf16().count() as i64));
                }
                if let Some(index) = array_index(key) {
                    if let Some(c) = string_unit_at(s, index) {
                        return Some(c);
                    }
                }
            }
            _ => {}
        }
        self.properties.get(key).map(|p| p.value.clone())
    }

    pub fn get_own_descriptor(&self, key: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(key)
    }

    pub fn has_own_property(&self, key: &str) -> bool {
        self.get_own_property(key).is_some()
    }

    /// Whether a script write to `key` would be refused.
    pub fn is_read_only(&self, key: &str) -> bool {
        if self.frozen {
            return true;
        }
        self.properties
            .get(key)
            .map(|p| p.is_read_only())
            .unwrap_or(false)
    }

    /// Bytes a [`put`](Self::put) of `value` under `key` would add: new element slots or a
    /// new property. Overwriting an existing slot adds nothing.
    pub fn growth(&self, key: &str, value: &JsValue) -> usize {
        if self.frozen {
            return 0;
        }
        let slot = std::mem::size_of::<JsValue>();
        if let ObjectKind::Array(elements) = &self.kind {
            let len = elements.len();
            if key == "length" {
                let new_len = match value {
                    JsValue::Number(n) => n.as_exact_i64().filter(|l| *l >= 0).map(|l| l as usize),
                    _ => None,
                };
                return match new_len {
                    Some(l) if l > len && l <= len + MAX_DENSE_GAP => (l - len) * slot,
                    _ => 0,
                };
            }
            if let Some(index) = array_index(key) {
                if index < len {
                    return 0;
                }
                if index <= len + MAX_DENSE_GAP {
                    return (index - len) * slot + value.footprint();
                }
            }
        }
        if self.properties.contains_key(key) {
            0
        } else {
            key.len() + value.footprint()
        }
    }

    /// Ordinary assignment. Returns `false` when the write was refused (frozen object or
    /// read-only property); the object is left untouched in that case.
    pub fn put(&mut self, key: &str, value: JsValue) -> bool {
        if self.frozen {
            return false;
        }
        if let ObjectKind::Array(elements) = &mut self.kind {
            if key == "length" {
                if let JsValue::Number(n) = &value {
                    if let Some(len) = n.as_exact_i64() {
                        if len >= 0 && (len as usize) <= elements.len() + MAX_DENSE_GAP {
                            elements.resize(len as usize, JsValue::Undefined);
                            return true;
                        }
                    }
                }
                return false;
            }
            if let Some(index) = array_index(key) {
                if index < elements.len() {
                    elements[index] = value;
                    return true;
                }
                if index <= elements.len() + MAX_DENSE_GAP {
                    elements.resize(index, JsValue::Undefined);
                    elements.push(value);
                    return true;
                }
            }
        }
        match self.properties.get_mut(key) {
            Some(p) => {
                if p.is_read_only() {
                    return false;
                }
                p.value = value;
            }
            None => {
                self.properties
                    .insert(key.to_string(), PropertyDescriptor::new(value, PropertyFlags::empty()));
                self.order.push(key.to_string());
            }
        }
        true
    }

    /// Creates or replaces a property with the given attributes, bypassing read-only checks.
    pub fn define_property(&mut self, key: &str, value: JsValue, flags: PropertyFlags) {
        if let ObjectKind::Array(elements) = &mut self.kind {
            if let Some(index) = array_index(key) {
                if index < elements.len() {
                    elements[index] = value;
                    return;
                }
            }
        }
        if self
            .properties
            .insert(key.to_string(), PropertyDescriptor::new(value, flags))
            .is_none()
        {
            self.order.push(key.to_string());
        }
    }

    /// Adds attribute flags to an existing property. Returns `false` if there is no such
    /// property.
    pub fn add_flags(&mut self, key: &str, flags: PropertyFlags) -> bool {
        match self.properties.get_mut(key) {
            Some(p) => {
                p.flags |= flags;
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, key: &str) -> bool {
        if self.frozen {
            return false;
        }
        if let ObjectKind::Array(elements) = &mut self.kind {
            if key == "length" {
                return false;
            }
            if let Some(index) = array_index(key) {
                if index < elements.len() {
                    elements[index] = JsValue::Undefined;
                    return true;
                }
            }
        }
        match self.properties.get(key) {
            Some(p) if !p.is_deletable() => false,
            Some(_) => {
                self.properties.remove(key);
                self.order.retain(|k| k != key);
                true
            }
            None => true,
        }
    }

    /// Own property names in creation order, array indices first.
    pub fn own_keys(&self, enumerable_only: bool) -> Vec<String> {
        let mut keys = vec![];
        match &self.kind {
            ObjectKind::Array(elements) => {
                keys.extend((0..elements.len()).map(|i| i.to_string()));
            }
            ObjectKind::Primitive(JsValue::String(s)) => {
                keys.extend((0..s.encode_utf16().count()).map(|i| i.to_string()));
            }
            _ => {}
        }
        for k in &self.order {
            if let Some(p) = self.properties.get(k) {
                if !enumerable_only || p.is_enumerable() {
                    keys.push(k.to_string());
                }
            }
        }
        keys
    }

    /// Pushes every object handle this object keeps alive.
    pub fn trace(&self, out: &mut Vec<ObjectId>) {
        if let Some(p) = self.prototype {
            out.push(p);
        }
        for p in self.properties.values() {
            if let JsValue::Object(id) = &p.value {
                out.push(*id);
            }
        }
        match &self.kind {
            ObjectKind::Array(elements) => {
                for v in elements {
                    if let JsValue::Object(id) = v {
                        out.push(*id);
                    }
                }
            }
            ObjectKind::Function(FunctionKind::Script { scope, .. }) => out.push(*scope),
            ObjectKind::Scope { parent, .. } | ObjectKind::Activation { parent } => {
                out.push(*parent)
            }
            ObjectKind::Primitive(_)
            | ObjectKind::Ordinary
            | ObjectKind::Global
            | ObjectKind::Function(FunctionKind::Native { .. })
            | ObjectKind::Error
            | ObjectKind::Content(_)
            | ObjectKind::Document(_) => {}
        }
    }
}
