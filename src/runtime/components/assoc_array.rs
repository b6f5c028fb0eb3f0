use crate::runtime::callable::{Argument, Callable, Signature};
use crate::runtime::error::{BrsError, RuntimeResult};
use crate::runtime::value::{Object, Value, ValueKind};
use crate::runtime::Interpreter;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

pub type AssocArrayRef = Rc<RefCell<RoAssociativeArray>>;

/// `roAssociativeArray`: case-insensitive string keys, iterated in sorted order.
#[derive(Clone, Debug, Default)]
pub struct RoAssociativeArray {
    /// lowercased key -> (key as first written, value)
    entries: BTreeMap<String, (String, Value)>,
}

impl RoAssociativeArray {
    /// Builds from literal members; keys keep their spelling.
    pub fn new(entries: Vec<(String, Value)>) -> Self {
        let mut aa = Self::default();
        for (key, value) in entries {
            aa.set(&key, value, true);
        }
        aa
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .map(|(_, value)| value.clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_ascii_lowercase())
    }

    /// Stores `value`. With `preserve_case` the key is shown as written,
    /// otherwise a new key is shown lowercased. Existing keys keep their spelling.
    pub fn set(&mut self, key: &str, value: Value, preserve_case: bool) {
        let lowered = key.to_ascii_lowercase();
        let shown = if preserve_case {
            key.to_string()
        } else {
            lowered.clone()
        };
        match self.entries.get_mut(&lowered) {
            Some(entry) => {
                if preserve_case {
                    entry.0 = shown;
                }
                entry.1 = value;
            }
            None => {
                self.entries.insert(lowered, (shown, value));
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(&key.to_ascii_lowercase()).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.values().map(|(key, _)| key.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries
            .values()
            .map(|(key, value)| (key.as_str(), value))
    }

    pub fn to_brs_string(&self) -> String {
        let mut text = String::from("<Component: roAssociativeArray> =\n{\n");
        for (key, value) in self.iter() {
            text.push_str(&format!("    {}: {}\n", key, value.to_brs_string(true)));
        }
        text.push('}');
        text
    }
}

fn this_aa(interpreter: &Interpreter, this: &Value) -> RuntimeResult<AssocArrayRef> {
    match this {
        Value::Object(Object::AssocArray(aa)) => Ok(aa.clone()),
        other => Err(BrsError::new(
            format!("roAssociativeArray method called on {}", other.type_name()),
            interpreter.location().clone(),
        )
        .into()),
    }
}

fn key_arg(args: &[Value]) -> String {
    match args.first().map(Value::unbox) {
        Some(Value::String(key)) => key,
        _ => String::new(),
    }
}

fn count(interpreter: &mut Interpreter, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    let aa = this_aa(interpreter, this)?;
    let len = aa.borrow().len();
    Ok(Value::Int32(len as i32))
}

fn add_replace(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> RuntimeResult<Value> {
    let aa = this_aa(interpreter, this)?;
    let value = args.get(1).cloned().unwrap_or(Value::Invalid);
    aa.borrow_mut().set(&key_arg(args), value, true);
    Ok(Value::Invalid)
}

fn lookup(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> RuntimeResult<Value> {
    let aa = this_aa(interpreter, this)?;
    let found = aa.borrow().get(&key_arg(args));
    Ok(found.unwrap_or(Value::Invalid))
}

fn does_exist(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> RuntimeResult<Value> {
    let aa = this_aa(interpreter, this)?;
    let exists = aa.borrow().contains(&key_arg(args));
    Ok(Value::Boolean(exists))
}

fn delete(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> RuntimeResult<Value> {
    let aa = this_aa(interpreter, this)?;
    let removed = aa.borrow_mut().remove(&key_arg(args));
    Ok(Value::Boolean(removed))
}

fn clear(interpreter: &mut Interpreter, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    this_aa(interpreter, this)?.borrow_mut().clear();
    Ok(Value::Invalid)
}

fn keys(interpreter: &mut Interpreter, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    let aa = this_aa(interpreter, this)?;
    let keys = aa.borrow().keys().into_iter().map(Value::String).collect();
    Ok(Value::new_array(keys))
}

fn items(interpreter: &mut Interpreter, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    let aa = this_aa(interpreter, this)?;
    let items = aa
        .borrow()
        .iter()
        .map(|(key, value)| {
            Value::new_assoc_array(vec![
                ("key".to_string(), Value::string(key)),
                ("value".to_string(), value.clone()),
            ])
        })
        .collect();
    Ok(Value::new_array(items))
}

fn is_empty(interpreter: &mut Interpreter, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    let aa = this_aa(interpreter, this)?;
    let empty = aa.borrow().is_empty();
    Ok(Value::Boolean(empty))
}

fn append(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> RuntimeResult<Value> {
    let aa = this_aa(interpreter, this)?;
    if let Some(Value::Object(Object::AssocArray(other))) = args.first() {
        let entries: Vec<(String, Value)> = other
            .borrow()
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect();
        let mut target = aa.borrow_mut();
        for (key, value) in entries {
            target.set(&key, value, true);
        }
    }
    Ok(Value::Invalid)
}

fn key_signature(returns: ValueKind) -> Signature {
    Signature::new(vec![Argument::required("key", ValueKind::String)], returns)
}

pub fn methods() -> Vec<Callable> {
    vec![
        Callable::method(
            "count",
            vec![(Signature::new(Vec::new(), ValueKind::Int32), count)],
        ),
        Callable::method(
            "addReplace",
            vec![(
                Signature::new(
                    vec![
                        Argument::required("key", ValueKind::String),
                        Argument::required("value", ValueKind::Dynamic),
                    ],
                    ValueKind::Void,
                ),
                add_replace,
            )],
        ),
        Callable::method("lookup", vec![(key_signature(ValueKind::Dynamic), lookup)]),
        Callable::method(
            "doesExist",
            vec![(key_signature(ValueKind::Boolean), does_exist)],
        ),
        Callable::method("delete", vec![(key_signature(ValueKind::Boolean), delete)]),
        Callable::method(
            "clear",
            vec![(Signature::new(Vec::new(), ValueKind::Void), clear)],
        ),
        Callable::method(
            "keys",
            vec![(Signature::new(Vec::new(), ValueKind::Object), keys)],
        ),
        Callable::method(
            "items",
            vec![(Signature::new(Vec::new(), ValueKind::Object), items)],
        ),
        Callable::method(
            "isEmpty",
            vec![(Signature::new(Vec::new(), ValueKind::Boolean), is_empty)],
        ),
        Callable::method(
            "append",
            vec![(
                Signature::new(
                    vec![Argument::required("aa", ValueKind::Object)],
                    ValueKind::Void,
                ),
                append,
            )],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_case_insensitive() {
        let mut aa = RoAssociativeArray::default();
        aa.set("Name", Value::string("brs"), true);
        assert!(aa.contains("NAME"));
        assert!(matches!(aa.get("name"), Some(Value::String(text)) if text == "brs"));
        aa.set("NAME", Value::Int32(1), false);
        assert_eq!(aa.keys(), vec!["Name".to_string()]);
    }

    #[test]
    fn iteration_is_sorted_by_lowercased_key() {
        let aa = RoAssociativeArray::new(vec![
            ("zeta".to_string(), Value::Int32(1)),
            ("Alpha".to_string(), Value::Int32(2)),
            ("beta".to_string(), Value::Int32(3)),
        ]);
        assert_eq!(aa.keys(), vec!["Alpha", "beta", "zeta"]);
    }

    #[test]
    fn dotted_writes_lowercase_new_keys() {
        let mut aa = RoAssociativeArray::default();
        aa.set("MixedCase", Value::Boolean(true), false);
        assert_eq!(aa.keys(), vec!["mixedcase"]);
        assert!(aa.remove("MIXEDCASE"));
        assert!(aa.is_empty());
    }
}
