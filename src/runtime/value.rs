use crate::language::ast::Literal;
use crate::runtime::callable::Callable;
use crate::runtime::components::{
    array::{ArrayRef, RoArray},
    assoc_array::{AssocArrayRef, RoAssociativeArray},
};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Discriminant of every runtime value. Declaration order is the ordinal order
/// the equality rules compare against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueKind {
    Interface,
    Invalid,
    Boolean,
    String,
    Int32,
    Int64,
    Float,
    Double,
    Callable,
    Uninitialized,
    Dynamic,
    Void,
    Object,
}

impl ValueKind {
    pub fn display_name(self) -> &'static str {
        match self {
            ValueKind::Interface => "Interface",
            ValueKind::Invalid => "Invalid",
            ValueKind::Boolean => "Boolean",
            ValueKind::String => "String",
            ValueKind::Int32 => "Integer",
            ValueKind::Int64 => "LongInteger",
            ValueKind::Float => "Float",
            ValueKind::Double => "Double",
            ValueKind::Callable => "Function",
            ValueKind::Uninitialized => "<uninitialized>",
            ValueKind::Dynamic => "Dynamic",
            ValueKind::Void => "Void",
            ValueKind::Object => "Object",
        }
    }

    pub fn from_type_name(name: &str) -> Option<ValueKind> {
        let kind = match name.to_ascii_lowercase().as_str() {
            "interface" => ValueKind::Interface,
            "invalid" => ValueKind::Invalid,
            "boolean" => ValueKind::Boolean,
            "string" => ValueKind::String,
            "integer" => ValueKind::Int32,
            "longinteger" => ValueKind::Int64,
            "float" => ValueKind::Float,
            "double" => ValueKind::Double,
            "function" => ValueKind::Callable,
            "dynamic" => ValueKind::Dynamic,
            "void" => ValueKind::Void,
            "object" => ValueKind::Object,
            _ => return None,
        };
        Some(kind)
    }

    pub fn from_designator(designator: char) -> ValueKind {
        match designator {
            '$' => ValueKind::String,
            '%' => ValueKind::Int32,
            '!' => ValueKind::Float,
            '#' => ValueKind::Double,
            '&' => ValueKind::Int64,
            _ => ValueKind::Dynamic,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ValueKind::Int32 | ValueKind::Int64 | ValueKind::Float | ValueKind::Double
        )
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Clone, Debug)]
pub enum Value {
    Invalid,
    Boolean(bool),
    String(String),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Callable(Rc<Callable>),
    Uninitialized,
    Object(Object),
}

/// Heap components with reference semantics.
#[derive(Clone, Debug)]
pub enum Object {
    Array(ArrayRef),
    AssocArray(AssocArrayRef),
    /// A primitive or function wrapped so its interface methods can be called.
    Boxed(Rc<Value>),
}

impl Object {
    pub fn component_name(&self) -> &'static str {
        match self {
            Object::Array(_) => "roArray",
            Object::AssocArray(_) => "roAssociativeArray",
            Object::Boxed(inner) => boxed_component_name(inner),
        }
    }

    pub fn same_instance(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::Array(a), Object::Array(b)) => Rc::ptr_eq(a, b),
            (Object::AssocArray(a), Object::AssocArray(b)) => Rc::ptr_eq(a, b),
            (Object::Boxed(a), Object::Boxed(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn boxed_component_name(inner: &Value) -> &'static str {
    match inner {
        Value::Invalid => "roInvalid",
        Value::Boolean(_) => "roBoolean",
        Value::String(_) => "roString",
        Value::Int32(_) => "roInt",
        Value::Int64(_) => "roLongInteger",
        Value::Float(_) => "roFloat",
        Value::Double(_) => "roDouble",
        Value::Callable(_) => "roFunction",
        Value::Uninitialized | Value::Object(_) => "roInvalid",
    }
}

/// Rounds to single precision and 7 significant digits.
pub fn round_float(value: f64) -> f32 {
    let single = value as f32;
    if !single.is_finite() {
        return single;
    }
    format!("{:.6e}", single as f64)
        .parse::<f64>()
        .map(|rounded| rounded as f32)
        .unwrap_or(single)
}

/// Saturating, truncating conversion used wherever a float becomes an Int32.
pub fn float_to_int32(value: f64) -> i32 {
    value as i32
}

impl Value {
    pub fn float(value: f64) -> Value {
        Value::Float(round_float(value))
    }

    pub fn string(value: impl Into<String>) -> Value {
        Value::String(value.into())
    }

    pub fn new_array(elements: Vec<Value>) -> Value {
        Value::Object(Object::Array(Rc::new(RefCell::new(RoArray::new(elements)))))
    }

    pub fn new_assoc_array(entries: Vec<(String, Value)>) -> Value {
        Value::Object(Object::AssocArray(Rc::new(RefCell::new(
            RoAssociativeArray::new(entries),
        ))))
    }

    pub fn from_literal(literal: &Literal) -> Value {
        match literal {
            Literal::Invalid => Value::Invalid,
            Literal::Boolean(value) => Value::Boolean(*value),
            Literal::String(value) => Value::String(value.clone()),
            Literal::Integer(value) => Value::Int32(*value),
            Literal::LongInteger(value) => Value::Int64(*value),
            Literal::Float(value) => Value::float(*value as f64),
            Literal::Double(value) => Value::Double(*value),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Invalid => ValueKind::Invalid,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::String(_) => ValueKind::String,
            Value::Int32(_) => ValueKind::Int32,
            Value::Int64(_) => ValueKind::Int64,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::Callable(_) => ValueKind::Callable,
            Value::Uninitialized => ValueKind::Uninitialized,
            Value::Object(_) => ValueKind::Object,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Value::Invalid)
    }

    pub fn is_number(&self) -> bool {
        self.kind().is_numeric()
    }

    /// Numbers, including boxed numbers.
    pub fn is_number_comparable(&self) -> bool {
        self.is_number() || self.boxed_inner().is_some_and(Value::is_number)
    }

    pub fn is_string_comparable(&self) -> bool {
        matches!(self, Value::String(_))
            || self
                .boxed_inner()
                .is_some_and(|inner| matches!(inner, Value::String(_)))
    }

    pub fn is_boolean_comparable(&self) -> bool {
        matches!(self, Value::Boolean(_))
            || self
                .boxed_inner()
                .is_some_and(|inner| matches!(inner, Value::Boolean(_)))
    }

    /// Values with bespoke equality against primitives.
    pub fn is_comparable(&self) -> bool {
        matches!(self, Value::Uninitialized)
    }

    pub fn is_unboxable(&self) -> bool {
        self.boxed_inner().is_some()
    }

    pub fn is_boxable(&self) -> bool {
        !matches!(self, Value::Object(_) | Value::Uninitialized)
    }

    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            Value::Object(Object::Array(_)) | Value::Object(Object::AssocArray(_))
        )
    }

    fn boxed_inner(&self) -> Option<&Value> {
        match self {
            Value::Object(Object::Boxed(inner)) => Some(inner),
            _ => None,
        }
    }

    pub fn unbox(&self) -> Value {
        match self.boxed_inner() {
            Some(inner) => inner.clone(),
            None => self.clone(),
        }
    }

    pub fn boxed(&self) -> Value {
        if self.is_boxable() {
            Value::Object(Object::Boxed(Rc::new(self.clone())))
        } else {
            self.clone()
        }
    }

    /// Truthiness used by `and`/`or` and by `=` against booleans.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Boolean(value) => *value,
            Value::Int32(value) => *value != 0,
            Value::Int64(value) => *value != 0,
            Value::Float(value) => value.trunc() != 0.0,
            Value::Double(value) => value.trunc() != 0.0,
            Value::Object(Object::Boxed(inner)) => inner.to_bool(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(value) => Some(*value as f64),
            Value::Int64(value) => Some(*value as f64),
            Value::Float(value) => Some(*value as f64),
            Value::Double(value) => Some(*value),
            Value::Object(Object::Boxed(inner)) => inner.as_f64(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(value) => Some(*value as i64),
            Value::Int64(value) => Some(*value),
            Value::Float(value) => Some(*value as i64),
            Value::Double(value) => Some(*value as i64),
            Value::Object(Object::Boxed(inner)) => inner.as_i64(),
            _ => None,
        }
    }

    /// Zero or positive, or NaN. Print puts a space before these.
    pub fn is_positive(&self) -> bool {
        match self {
            Value::Int32(value) => *value >= 0,
            Value::Int64(value) => *value >= 0,
            Value::Float(value) => value.is_nan() || *value >= 0.0,
            Value::Double(value) => value.is_nan() || *value >= 0.0,
            Value::Object(Object::Boxed(inner)) => inner.is_positive(),
            _ => false,
        }
    }

    pub fn equal_to(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Invalid, Value::Invalid) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Boolean(a), rhs) if rhs.is_number() => *a == rhs.to_bool(),
            (lhs, Value::Boolean(b)) if lhs.is_number() => lhs.to_bool() == *b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Uninitialized, Value::String(text))
            | (Value::String(text), Value::Uninitialized) => {
                text.eq_ignore_ascii_case("<uninitialized>")
            }
            (Value::Callable(a), Value::Callable(b)) => a.same_function(b),
            (lhs, rhs) if lhs.is_number() && rhs.is_number() => numeric_equal(lhs, rhs),
            _ => false,
        }
    }

    pub fn less_than(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a < b,
            (lhs, rhs) if lhs.is_number() && rhs.is_number() => {
                numeric_order(lhs, rhs) == Some(std::cmp::Ordering::Less)
            }
            _ => false,
        }
    }

    pub fn greater_than(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a > b,
            (lhs, rhs) if lhs.is_number() && rhs.is_number() => {
                numeric_order(lhs, rhs) == Some(std::cmp::Ordering::Greater)
            }
            _ => false,
        }
    }

    /// Display text. Inside a container listing (`parent`), strings are quoted
    /// and nested components print only their header.
    pub fn to_brs_string(&self, parent: bool) -> String {
        match self {
            Value::Invalid => "invalid".to_string(),
            Value::Boolean(value) => value.to_string(),
            Value::String(value) if parent => format!("\"{}\"", value),
            Value::String(value) => value.clone(),
            Value::Int32(value) => value.to_string(),
            Value::Int64(value) => value.to_string(),
            Value::Float(value) => format_general(*value as f64),
            Value::Double(value) => format_double(*value),
            Value::Callable(callable) => {
                format!("<Function: {}>", callable.name.to_ascii_lowercase())
            }
            Value::Uninitialized => "<UNINITIALIZED>".to_string(),
            Value::Object(Object::Boxed(inner)) => inner.to_brs_string(parent),
            Value::Object(object) if parent => {
                format!("<Component: {}>", object.component_name())
            }
            Value::Object(Object::Array(array)) => array.borrow().to_brs_string(),
            Value::Object(Object::AssocArray(aa)) => aa.borrow().to_brs_string(),
        }
    }

    /// Name reported by the `Type()` builtin.
    pub fn type_name(&self) -> String {
        match self {
            Value::Object(object) => object.component_name().to_string(),
            Value::Callable(_) => "Function".to_string(),
            other => other.kind().display_name().to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_brs_string(false))
    }
}

fn both_integers(lhs: &Value, rhs: &Value) -> Option<(i64, i64)> {
    match (lhs, rhs) {
        (Value::Int32(_) | Value::Int64(_), Value::Int32(_) | Value::Int64(_)) => {
            Some((lhs.as_i64()?, rhs.as_i64()?))
        }
        _ => None,
    }
}

fn numeric_equal(lhs: &Value, rhs: &Value) -> bool {
    match both_integers(lhs, rhs) {
        Some((a, b)) => a == b,
        None => matches!((lhs.as_f64(), rhs.as_f64()), (Some(a), Some(b)) if a == b),
    }
}

fn numeric_order(lhs: &Value, rhs: &Value) -> Option<std::cmp::Ordering> {
    match both_integers(lhs, rhs) {
        Some((a, b)) => Some(a.cmp(&b)),
        None => lhs.as_f64()?.partial_cmp(&rhs.as_f64()?),
    }
}

/// C `%g` formatting with six significant digits.
pub fn format_general(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let scientific = format!("{:.5e}", value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((mantissa, exponent)) => match exponent.parse::<i32>() {
            Ok(exponent) => (mantissa, exponent),
            Err(_) => return scientific,
        },
        None => return scientific,
    };
    if !(-4..6).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
    } else {
        let decimals = (5 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// Shortest round-trip form with exponents past 1e21 and below 1e-6.
pub fn format_double(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = value.abs();
    if value != 0.0 && !(1e-6..1e21).contains(&magnitude) {
        let text = format!("{:e}", value);
        match text.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => text,
        }
    } else {
        format!("{}", value)
    }
}
