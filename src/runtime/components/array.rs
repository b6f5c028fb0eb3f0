use crate::runtime::callable::{Argument, Callable, Signature};
use crate::runtime::error::{BrsError, RuntimeErrorDetail, RuntimeResult};
use crate::runtime::value::{Object, Value, ValueKind};
use crate::runtime::Interpreter;
use std::cell::RefCell;
use std::rc::Rc;

pub type ArrayRef = Rc<RefCell<RoArray>>;

/// Largest element count an array may grow to.
pub const MAX_LEN: usize = 1 << 24;

/// `roArray`: a growable, heterogeneous list.
#[derive(Clone, Debug, Default)]
pub struct RoArray {
    pub elements: Vec<Value>,
}

impl RoArray {
    pub fn new(elements: Vec<Value>) -> Self {
        Self { elements }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Element at `index`, or `invalid` when out of range.
    pub fn get(&self, index: i64) -> Value {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.elements.get(index))
            .cloned()
            .unwrap_or(Value::Invalid)
    }

    /// Stores at `index`, padding with `invalid` when writing past the end.
    /// Negative indexes and indexes at or past [`MAX_LEN`] are out of bounds.
    pub fn set(&mut self, index: i64, value: Value) -> Result<(), RuntimeErrorDetail> {
        let index = usize::try_from(index)
            .ok()
            .filter(|index| *index < MAX_LEN)
            .ok_or(RuntimeErrorDetail::IndexOutOfBounds)?;
        if index >= self.elements.len() {
            self.elements.resize(index + 1, Value::Invalid);
        }
        self.elements[index] = value;
        Ok(())
    }

    pub fn to_brs_string(&self) -> String {
        let mut text = String::from("<Component: roArray> =\n[\n");
        for element in &self.elements {
            text.push_str("    ");
            text.push_str(&element.to_brs_string(true));
            text.push('\n');
        }
        text.push(']');
        text
    }
}

fn this_array(interpreter: &Interpreter, this: &Value) -> RuntimeResult<Rc<RefCell<RoArray>>> {
    match this {
        Value::Object(Object::Array(array)) => Ok(array.clone()),
        other => Err(BrsError::new(
            format!("roArray method called on {}", other.type_name()),
            interpreter.location().clone(),
        )
        .into()),
    }
}

fn no_args(returns: ValueKind) -> Signature {
    Signature::new(Vec::new(), returns)
}

fn count(interpreter: &mut Interpreter, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    let array = this_array(interpreter, this)?;
    let len = array.borrow().len();
    Ok(Value::Int32(len as i32))
}

fn push(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> RuntimeResult<Value> {
    let array = this_array(interpreter, this)?;
    if let Some(value) = args.first() {
        array.borrow_mut().elements.push(value.clone());
    }
    Ok(Value::Invalid)
}

fn pop(interpreter: &mut Interpreter, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    let array = this_array(interpreter, this)?;
    let popped = array.borrow_mut().elements.pop();
    Ok(popped.unwrap_or(Value::Invalid))
}

fn shift(interpreter: &mut Interpreter, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    let array = this_array(interpreter, this)?;
    let mut array = array.borrow_mut();
    if array.elements.is_empty() {
        Ok(Value::Invalid)
    } else {
        Ok(array.elements.remove(0))
    }
}

fn unshift(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> RuntimeResult<Value> {
    let array = this_array(interpreter, this)?;
    if let Some(value) = args.first() {
        array.borrow_mut().elements.insert(0, value.clone());
    }
    Ok(Value::Invalid)
}

fn peek(interpreter: &mut Interpreter, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    let array = this_array(interpreter, this)?;
    let last = array.borrow().elements.last().cloned();
    Ok(last.unwrap_or(Value::Invalid))
}

fn clear(interpreter: &mut Interpreter, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    this_array(interpreter, this)?.borrow_mut().elements.clear();
    Ok(Value::Invalid)
}

fn append(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> RuntimeResult<Value> {
    let array = this_array(interpreter, this)?;
    if let Some(Value::Object(Object::Array(other))) = args.first() {
        // snapshot first so `a.append(a)` does not alias the borrow
        let extra = other.borrow().elements.clone();
        array.borrow_mut().elements.extend(extra);
    }
    Ok(Value::Invalid)
}

fn join(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> RuntimeResult<Value> {
    let array = this_array(interpreter, this)?;
    let separator = match args.first() {
        Some(Value::String(text)) => text.clone(),
        _ => String::new(),
    };
    let array = array.borrow();
    let mut parts = Vec::with_capacity(array.len());
    for element in &array.elements {
        match element.unbox() {
            Value::String(text) => parts.push(text),
            _ => return Ok(Value::string("")),
        }
    }
    Ok(Value::String(parts.join(&separator)))
}

fn is_empty(interpreter: &mut Interpreter, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    let array = this_array(interpreter, this)?;
    let empty = array.borrow().is_empty();
    Ok(Value::Boolean(empty))
}

fn get_entry(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> RuntimeResult<Value> {
    let array = this_array(interpreter, this)?;
    match args.first().and_then(Value::as_i64) {
        Some(index) => Ok(array.borrow().get(index)),
        None => Ok(Value::Invalid),
    }
}

fn set_entry(interpreter: &mut Interpreter, this: &Value, args: &[Value]) -> RuntimeResult<Value> {
    let array = this_array(interpreter, this)?;
    let index = args.first().and_then(Value::as_i64);
    let (Some(index), Some(value)) = (index, args.get(1)) else {
        return Ok(Value::Invalid);
    };
    let stored = array.borrow_mut().set(index, value.clone());
    match stored {
        Ok(()) => Ok(Value::Invalid),
        Err(detail) => {
            let location = interpreter.location().clone();
            Err(interpreter.runtime_error(detail, &location))
        }
    }
}

fn reverse(interpreter: &mut Interpreter, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    this_array(interpreter, this)?.borrow_mut().elements.reverse();
    Ok(Value::Invalid)
}

pub fn methods() -> Vec<Callable> {
    vec![
        Callable::method("count", vec![(no_args(ValueKind::Int32), count)]),
        Callable::method(
            "push",
            vec![(
                Signature::new(
                    vec![Argument::required("tvalue", ValueKind::Dynamic)],
                    ValueKind::Void,
                ),
                push,
            )],
        ),
        Callable::method("pop", vec![(no_args(ValueKind::Dynamic), pop)]),
        Callable::method("shift", vec![(no_args(ValueKind::Dynamic), shift)]),
        Callable::method(
            "unshift",
            vec![(
                Signature::new(
                    vec![Argument::required("tvalue", ValueKind::Dynamic)],
                    ValueKind::Void,
                ),
                unshift,
            )],
        ),
        Callable::method("peek", vec![(no_args(ValueKind::Dynamic), peek)]),
        Callable::method("clear", vec![(no_args(ValueKind::Void), clear)]),
        Callable::method(
            "append",
            vec![(
                Signature::new(
                    vec![Argument::required("array", ValueKind::Object)],
                    ValueKind::Void,
                ),
                append,
            )],
        ),
        Callable::method(
            "join",
            vec![(
                Signature::new(
                    vec![Argument::required("separator", ValueKind::String)],
                    ValueKind::String,
                ),
                join,
            )],
        ),
        Callable::method("isEmpty", vec![(no_args(ValueKind::Boolean), is_empty)]),
        Callable::method(
            "getEntry",
            vec![(
                Signature::new(
                    vec![Argument::required("index", ValueKind::Dynamic)],
                    ValueKind::Dynamic,
                ),
                get_entry,
            )],
        ),
        Callable::method(
            "setEntry",
            vec![(
                Signature::new(
                    vec![
                        Argument::required("index", ValueKind::Dynamic),
                        Argument::required("tvalue", ValueKind::Dynamic),
                    ],
                    ValueKind::Void,
                ),
                set_entry,
            )],
        ),
        Callable::method("reverse", vec![(no_args(ValueKind::Void), reverse)]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_reads_are_invalid() {
        let array = RoArray::new(vec![Value::Int32(1)]);
        assert!(matches!(array.get(0), Value::Int32(1)));
        assert!(array.get(1).is_invalid());
        assert!(array.get(-1).is_invalid());
    }

    #[test]
    fn writes_past_the_end_grow_the_array() {
        let mut array = RoArray::default();
        array.set(2, Value::string("c")).expect("in bounds");
        assert_eq!(array.len(), 3);
        assert!(array.get(0).is_invalid());
        assert_eq!(
            array.to_brs_string(),
            "<Component: roArray> =\n[\n    invalid\n    invalid\n    \"c\"\n]"
        );
    }

    #[test]
    fn writes_outside_the_size_limit_are_rejected() {
        let mut array = RoArray::default();
        assert_eq!(
            array.set(-1, Value::Int32(1)),
            Err(RuntimeErrorDetail::IndexOutOfBounds)
        );
        assert_eq!(
            array.set(MAX_LEN as i64, Value::Int32(1)),
            Err(RuntimeErrorDetail::IndexOutOfBounds)
        );
        assert_eq!(
            array.set(2_000_000_000_000, Value::Int32(1)),
            Err(RuntimeErrorDetail::IndexOutOfBounds)
        );
        assert!(array.is_empty());
    }
}
