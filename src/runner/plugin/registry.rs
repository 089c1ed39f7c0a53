//! Built-in registry: the set of global objects installed into every new realm.

use super::types::{BuiltInObject, NativeFn};
use crate::runner::std_lib::register_core_builtins;

/// Name under which global functions and values (`parseInt`, `NaN`) are registered; its
/// members are installed directly on the global object.
pub const GLOBAL_OBJECT_NAME: &str = "global";

/// Registry for built-in objects.
/// Keeps registration order, which is also installation order: an object's prototype parent
/// must be registered before it.
pub struct BuiltInRegistry {
    objects: Vec<BuiltInObject>,
}

impl BuiltInRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        BuiltInRegistry {
            objects: Vec::new(),
        }
    }

    /// Create a registry with the standard library.
    pub fn with_core() -> Self {
        let mut registry = Self::new();
        register_core_builtins(&mut registry);
        registry
    }

    /// Register a built-in object, replacing an earlier one of the same name in place.
    pub fn register_object(&mut self, obj: BuiltInObject) {
        match self.objects.iter_mut().find(|o| o.name == obj.name) {
            Some(existing) => *existing = obj,
            None => self.objects.push(obj),
        }
    }

    /// Get a registered object by name.
    pub fn get_object(&self, name: &str) -> Option<&BuiltInObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    /// Get a mutable reference to a registered object.
    pub fn get_object_mut(&mut self, name: &str) -> Option<&mut BuiltInObject> {
        self.objects.iter_mut().find(|o| o.name == name)
    }

    /// Get a static method of a registered object.
    pub fn get_method(&self, object: &str, method: &str) -> Option<NativeFn> {
        self.get_object(object).and_then(|o| {
            o.methods
                .iter()
                .chain(o.prototype_methods.iter())
                .find(|(n, _)| n == method)
                .map(|(_, f)| *f)
        })
    }

    /// Check if an object exists in the registry.
    pub fn has_object(&self, name: &str) -> bool {
        self.get_object(name).is_some()
    }

    /// Check if a method exists on an object or its prototype.
    pub fn has_method(&self, object: &str, method: &str) -> bool {
        self.get_method(object, method).is_some()
    }

    /// Registered objects in installation order.
    pub fn objects(&self) -> impl Iterator<Item = &BuiltInObject> {
        self.objects.iter()
    }

    /// Get list of all registered object names.
    pub fn object_names(&self) -> Vec<&str> {
        self.objects.iter().map(|o| o.name.as_str()).collect()
    }
}

impl Default for BuiltInRegistry {
    fn default() -> Self {
        Self::with_core()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::value::JsValue;

    #[test]
    fn test_core_registry_contents() {
        let registry = BuiltInRegistry::with_core();
        for name in &[
            GLOBAL_OBJECT_NAME,
            "Object",
            "Function",
            "Array",
            "String",
            "Number",
            "Boolean",
            "Math",
            "Error",
            "TypeError",
            "console",
        ] {
            assert!(registry.has_object(name), "missing {}", name);
        }
        assert!(registry.has_method("Array", "push"));
        assert!(registry.has_method("Object", "keys"));
        assert!(!registry.has_method("Math", "nope"));
    }

    #[test]
    fn test_object_is_registered_before_its_subtypes() {
        let registry = BuiltInRegistry::with_core();
        let names = registry.object_names();
        let pos = |n: &str| names.iter().position(|x| *x == n);
        assert!(pos("Object") < pos("Array"));
        assert!(pos("Error") < pos("TypeError"));
    }

    #[test]
    fn test_register_replaces_in_place() {
        let mut registry = BuiltInRegistry::new();
        registry.register_object(BuiltInObject::new("A"));
        registry.register_object(BuiltInObject::new("B"));
        registry.register_object(BuiltInObject::new("A").add_property("x", JsValue::Null));
        assert_eq!(registry.object_names(), vec!["A", "B"]);
        assert_eq!(registry.get_object("A").map(|o| o.properties.len()), Some(1));
    }
}
