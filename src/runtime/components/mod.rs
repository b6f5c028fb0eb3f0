pub mod array;
pub mod assoc_array;
pub mod boxed;

use crate::runtime::callable::Callable;
use crate::runtime::value::{Object, Value, ValueKind};
use std::collections::HashMap;

/// Method tables keyed by component name, each keyed by lowercased method name.
pub struct ComponentRegistry {
    methods: HashMap<&'static str, HashMap<String, Callable>>,
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            methods: HashMap::new(),
        };
        registry.register("roArray", array::methods());
        registry.register("roAssociativeArray", assoc_array::methods());
        registry.register("roString", boxed::string_methods());
        registry.register("roInt", boxed::primitive_methods("getInt", ValueKind::Int32));
        registry.register(
            "roLongInteger",
            boxed::primitive_methods("getLongInt", ValueKind::Int64),
        );
        registry.register("roFloat", boxed::primitive_methods("getFloat", ValueKind::Float));
        registry.register(
            "roDouble",
            boxed::primitive_methods("getDouble", ValueKind::Double),
        );
        registry.register(
            "roBoolean",
            boxed::primitive_methods("getBoolean", ValueKind::Boolean),
        );
        registry.register(
            "roFunction",
            boxed::primitive_methods("getSub", ValueKind::Callable),
        );
        registry.register("roInvalid", boxed::primitive_methods("getInvalid", ValueKind::Invalid));
        registry
    }

    fn register(&mut self, component: &'static str, methods: Vec<Callable>) {
        let table = methods
            .into_iter()
            .map(|method| (method.name.to_ascii_lowercase(), method))
            .collect();
        self.methods.insert(component, table);
    }

    /// Finds `name` on the component behind `receiver` (boxing primitives first)
    /// and binds the method to it.
    pub fn lookup_method(&self, receiver: &Value, name: &str) -> Option<Callable> {
        let target = match receiver {
            Value::Object(_) => receiver.clone(),
            other if other.is_boxable() => other.boxed(),
            _ => return None,
        };
        let component = match &target {
            Value::Object(object) => object.component_name(),
            _ => return None,
        };
        self.methods
            .get(component)?
            .get(&name.to_ascii_lowercase())
            .map(|method| method.bound_to(target.clone()))
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.methods
            .keys()
            .any(|component| component.eq_ignore_ascii_case(name))
    }
}

/// Fresh instance for `CreateObject`, or `None` for unknown class names.
pub fn create_object(name: &str) -> Option<Value> {
    let value = match name.to_ascii_lowercase().as_str() {
        "roarray" => Value::new_array(Vec::new()),
        "roassociativearray" => Value::new_assoc_array(Vec::new()),
        "rostring" => Value::string("").boxed(),
        "roint" => Value::Int32(0).boxed(),
        "rolonginteger" => Value::Int64(0).boxed(),
        "rofloat" => Value::Float(0.0).boxed(),
        "rodouble" => Value::Double(0.0).boxed(),
        "roboolean" => Value::Boolean(false).boxed(),
        "roinvalid" => Value::Invalid.boxed(),
        _ => return None,
    };
    Some(value)
}

/// Collections a `for each` can walk.
pub fn iterate(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Object(Object::Array(array)) => Some(array.borrow().elements.clone()),
        Value::Object(Object::AssocArray(aa)) => Some(
            aa.borrow()
                .keys()
                .into_iter()
                .map(Value::String)
                .collect(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_find_boxed_methods() {
        let registry = ComponentRegistry::new();
        let method = registry
            .lookup_method(&Value::string("abc"), "LEN")
            .expect("roString.len");
        assert_eq!(method.name, "len");
        assert!(matches!(
            method.receiver.as_ref().map(Value::type_name).as_deref(),
            Some("roString")
        ));
        assert!(registry.lookup_method(&Value::Int32(1), "len").is_none());
        assert!(registry.lookup_method(&Value::Uninitialized, "toStr").is_none());
    }

    #[test]
    fn create_object_knows_core_components() {
        assert!(create_object("roArray").is_some_and(|v| v.type_name() == "roArray"));
        assert!(create_object("ROINT").is_some_and(|v| v.type_name() == "roInt"));
        assert!(create_object("roRegex").is_none());
        assert!(ComponentRegistry::new().has_component("roassociativearray"));
    }
}
