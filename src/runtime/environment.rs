use crate::language::ast::Identifier;
use crate::language::span::Location;
use crate::runtime::components::assoc_array::AssocArrayRef;
use crate::runtime::error::{BrsError, Operand, TypeMismatch};
use crate::runtime::value::{Object, Value, ValueKind};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    Global,
    Module,
    Function,
}

/// Lookup miss. The evaluator turns it into `Uninitialized`; scripts never see it.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Undefined variable '{0}'")]
pub struct NotFound(pub String);

type SharedScope = Rc<RefCell<HashMap<String, Value>>>;

/// Variable bindings for one call frame. Global and module scopes are shared by
/// every frame created from the same root.
#[derive(Clone)]
pub struct Environment {
    global: SharedScope,
    module: SharedScope,
    definitions: Rc<RefCell<HashMap<String, Location>>>,
    function: HashMap<String, Value>,
    m_pointer: AssocArrayRef,
    root_m: AssocArrayRef,
    /// Label a `goto` is searching for in this frame, lowercased; empty when idle.
    pub goto_label: String,
}

impl Environment {
    pub fn new(m_pointer: AssocArrayRef) -> Self {
        Self {
            global: Rc::default(),
            module: Rc::default(),
            definitions: Rc::default(),
            function: HashMap::new(),
            root_m: m_pointer.clone(),
            m_pointer,
            goto_label: String::new(),
        }
    }

    pub fn define(
        &mut self,
        scope: Scope,
        name: &str,
        value: Value,
        location: Option<&Location>,
    ) -> Result<(), BrsError> {
        let key = name.to_ascii_lowercase();
        match scope {
            Scope::Function => {
                if key == "global" && value.kind() != ValueKind::Interface {
                    if let Some(location) = location {
                        return Err(TypeMismatch::cast(
                            Operand::new(ValueKind::Interface, location),
                            Operand::new(value.kind(), location),
                        )
                        .into_error());
                    }
                }
                if key == "m" {
                    if let Value::Object(Object::AssocArray(aa)) = &value {
                        self.m_pointer = aa.clone();
                    }
                }
                self.function.insert(key, value);
            }
            Scope::Module => {
                if let Some(location) = location {
                    self.definitions
                        .borrow_mut()
                        .insert(key.clone(), location.clone());
                }
                self.module.borrow_mut().insert(key, value);
            }
            Scope::Global => {
                self.global.borrow_mut().insert(key, value);
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &Identifier) -> Result<Value, NotFound> {
        let key = name.name.to_ascii_lowercase();
        if key == "m" {
            return Ok(Value::Object(Object::AssocArray(self.m_pointer.clone())));
        }
        if key == "line_num" {
            return Ok(Value::Int32(name.location.start.line as i32));
        }
        if let Some(value) = self.function.get(&key) {
            return Ok(value.clone());
        }
        if let Some(value) = self.module.borrow().get(&key) {
            return Ok(value.clone());
        }
        if let Some(value) = self.global.borrow().get(&key) {
            return Ok(value.clone());
        }
        Err(NotFound(name.name.clone()))
    }

    pub fn has(&self, name: &str, scopes: &[Scope]) -> bool {
        let key = name.to_ascii_lowercase();
        if key == "m" {
            return true;
        }
        scopes.iter().any(|scope| match scope {
            Scope::Global => self.global.borrow().contains_key(&key),
            Scope::Module => self.module.borrow().contains_key(&key),
            Scope::Function => self.function.contains_key(&key),
        })
    }

    pub fn remove(&mut self, name: &str, scope: Scope) {
        let key = name.to_ascii_lowercase();
        match scope {
            Scope::Function => {
                self.function.remove(&key);
            }
            Scope::Module => {
                self.module.borrow_mut().remove(&key);
                self.definitions.borrow_mut().remove(&key);
            }
            Scope::Global => {}
        }
    }

    pub fn defined_location(&self, name: &str) -> Option<Location> {
        self.definitions
            .borrow()
            .get(&name.to_ascii_lowercase())
            .cloned()
    }

    pub fn m_pointer(&self) -> AssocArrayRef {
        self.m_pointer.clone()
    }

    pub fn set_m(&mut self, m_pointer: AssocArrayRef) {
        self.m_pointer = m_pointer;
    }

    pub fn root_m(&self) -> AssocArrayRef {
        self.root_m.clone()
    }

    /// Fresh frame for a call: empty function scope, same global/module scopes and `m`.
    pub fn create_sub_environment(&self) -> Environment {
        Environment {
            global: self.global.clone(),
            module: self.module.clone(),
            definitions: self.definitions.clone(),
            function: HashMap::new(),
            m_pointer: self.m_pointer.clone(),
            root_m: self.root_m.clone(),
            goto_label: String::new(),
        }
    }

    /// Bindings in one scope, sorted by name.
    pub fn list(&self, scope: Scope) -> Vec<(String, Value)> {
        let mut entries: Vec<(String, Value)> = match scope {
            Scope::Function => self
                .function
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            Scope::Module => self
                .module
                .borrow()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            Scope::Global => self
                .global
                .borrow()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}
