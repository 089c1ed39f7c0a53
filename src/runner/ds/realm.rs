use std::collections::HashMap;

use crate::runner::ds::error::JErrorType;
use crate::runner::ds::heap::{Heap, ObjectId};
use crate::runner::ds::object::{FunctionKind, JsObject, ObjectKind};
use crate::runner::ds::object_property::PropertyFlags;
use crate::runner::ds::value::JsValue;
use crate::runner::plugin::registry::{BuiltInRegistry, GLOBAL_OBJECT_NAME};
use crate::runner::plugin::types::{BuiltInObject, NativeFn};

/// The intrinsic objects of one context: the global object and the prototypes the evaluator
/// needs direct access to.
#[derive(Debug, Clone)]
pub struct Realm {
    pub global: ObjectId,
    pub object_prototype: ObjectId,
    pub function_prototype: ObjectId,
    pub array_prototype: ObjectId,
    pub error_prototype: ObjectId,
    pub string_prototype: ObjectId,
    pub number_prototype: ObjectId,
    pub boolean_prototype: ObjectId,
    prototypes: HashMap<String, ObjectId>,
}

impl Realm {
    /// Allocates the well-known prototypes and the global object.
    pub fn new(heap: &mut Heap) -> Result<Self, JErrorType> {
        let object_prototype = heap.allocate(JsObject::ordinary(None))?;
        let function_prototype = heap.allocate(JsObject::ordinary(Some(object_prototype)))?;
        let array_prototype = heap.allocate(JsObject::new(
            ObjectKind::Array(vec![]),
            Some(object_prototype),
        ))?;
        let error_prototype = heap.allocate(JsObject::ordinary(Some(object_prototype)))?;
        let string_prototype = heap.allocate(JsObject::new(
            ObjectKind::Primitive(JsValue::String(String::new())),
            Some(object_prototype),
        ))?;
        let number_prototype = heap.allocate(JsObject::new(
            ObjectKind::Primitive(JsValue::from_i64(0)),
            Some(object_prototype),
        ))?;
        let boolean_prototype = heap.allocate(JsObject::new(
            ObjectKind::Primitive(JsValue::Boolean(false)),
            Some(object_prototype),
        ))?;
        let global = heap.allocate(JsObject::new(ObjectKind::Global, Some(object_prototype)))?;

        let mut prototypes = HashMap::new();
        prototypes.insert("Object".to_string(), object_prototype);
        prototypes.insert("Function".to_string(), function_prototype);
        prototypes.insert("Array".to_string(), array_prototype);
        prototypes.insert("Error".to_string(), error_prototype);
        prototypes.insert("String".to_string(), string_prototype);
        prototypes.insert("Number".to_string(), number_prototype);
        prototypes.insert("Boolean".to_string(), boolean_prototype);

        Ok(Realm {
            global,
            object_prototype,
            function_prototype,
            array_prototype,
            error_prototype,
            string_prototype,
            number_prototype,
            boolean_prototype,
            prototypes,
        })
    }

    /// Prototype object of the named constructor.
    pub fn prototype_of(&self, constructor: &str) -> Option<ObjectId> {
        self.prototypes.get(constructor).copied()
    }

    /// Every intrinsic, so a collection can treat them as roots.
    pub fn intrinsics(&self) -> Vec<JsValue> {
        let mut all: Vec<JsValue> = self
            .prototypes
            .values()
            .map(|id| JsValue::Object(*id))
            .collect();
        all.push(JsValue::Object(self.global));
        all
    }

    pub fn new_native_function(
        &self,
        heap: &mut Heap,
        name: &str,
        func: NativeFn,
        construct: Option<NativeFn>,
    ) -> Result<ObjectId, JErrorType> {
        let id = heap.allocate(JsObject::new(
            ObjectKind::Function(FunctionKind::Native {
                name: name.to_string(),
                func,
                construct,
            }),
            Some(self.function_prototype),
        ))?;
        heap.get_mut(id)?.define_property(
            "length",
            JsValue::from_i64(0),
            PropertyFlags::constant(),
        );
        Ok(id)
    }

    /// Installs every registered built-in into this realm.
    pub fn install(&mut self, heap: &mut Heap, registry: &BuiltInRegistry) -> Result<(), JErrorType> {
        for builtin in registry.objects() {
            if builtin.name == GLOBAL_OBJECT_NAME {
                let global = self.global;
                self.install_members(heap, global, builtin)?;
            } else {
                self.install_object(heap, builtin)?;
            }
        }
        Ok(())
    }

    fn install_members(
        &self,
        heap: &mut Heap,
        target: ObjectId,
        builtin: &BuiltInObject,
    ) -> Result<(), JErrorType> {
        for (name, func) in &builtin.methods {
            let f = self.new_native_function(heap, name, *func, None)?;
            heap.get_mut(target)?
                .define_property(name, JsValue::Object(f), PropertyFlags::hidden());
        }
        for (name, value) in &builtin.properties {
            heap.get_mut(target)?
                .define_property(name, value.clone(), PropertyFlags::constant());
        }
        Ok(())
    }

    fn install_object(&mut self, heap: &mut Heap, builtin: &BuiltInObject) -> Result<(), JErrorType> {
        let prototype = if builtin.has_prototype_object() {
            let proto = match self.prototypes.get(&builtin.name) {
                Some(p) => *p,
                None => {
                    let parent = builtin
                        .prototype
                        .as_ref()
                        .and_then(|p| self.prototypes.get(p).copied())
                        .unwrap_or(self.object_prototype);
                    let p = heap.allocate(JsObject::ordinary(Some(parent)))?;
                    self.prototypes.insert(builtin.name.clone(), p);
                    p
                }
            };
            for (name, func) in &builtin.prototype_methods {
                let f = self.new_native_function(heap, name, *func, None)?;
                heap.get_mut(proto)?
                    .define_property(name, JsValue::Object(f), PropertyFlags::hidden());
            }
            for (name, value) in &builtin.prototype_properties {
                heap.get_mut(proto)?
                    .define_property(name, value.clone(), PropertyFlags::hidden());
            }
            Some(proto)
        } else {
            None
        };

        let object = match builtin.constructor {
            Some(ctor) => {
                let construct = builtin.construct.or(Some(ctor));
                self.new_native_function(heap, &builtin.name, ctor, construct)?
            }
            None => heap.allocate(JsObject::ordinary(Some(self.object_prototype)))?,
        };
        if let Some(proto) = prototype {
            heap.get_mut(object)?.define_property(
                "prototype",
                JsValue::Object(proto),
                PropertyFlags::constant(),
            );
            if builtin.constructor.is_some() {
                heap.get_mut(proto)?.define_property(
                    "constructor",
                    JsValue::Object(object),
                    PropertyFlags::hidden(),
                );
            }
        }
        self.install_members(heap, object, builtin)?;

        let global = self.global;
        heap.get_mut(global)?.define_property(
            &builtin.name,
            JsValue::Object(object),
            PropertyFlags::hidden(),
        );
        Ok(())
    }
}
