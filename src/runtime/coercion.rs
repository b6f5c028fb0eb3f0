use crate::runtime::value::{float_to_int32, round_float, Object, Value, ValueKind};

/// Converts `value` so it satisfies a parameter or return kind, or `None`
/// when no legal conversion exists.
pub fn try_coerce(value: &Value, target: ValueKind) -> Option<Value> {
    let kind = value.kind();
    if kind == target || target == ValueKind::Dynamic {
        return Some(value.clone());
    }
    match target {
        ValueKind::Object => match value {
            Value::Object(_) => Some(value.clone()),
            other if other.is_boxable() => Some(other.boxed()),
            _ => None,
        },
        ValueKind::Interface => match value {
            Value::Object(_) => Some(value.clone()),
            _ => None,
        },
        _ => match value {
            Value::Object(Object::Boxed(inner)) => try_coerce(inner, target),
            other if other.is_number() && target.is_numeric() => convert_number(other, target),
            _ => None,
        },
    }
}

/// Value-preserving numeric conversion. Precision may be lost but it never fails
/// for numeric inputs.
pub fn convert_number(value: &Value, target: ValueKind) -> Option<Value> {
    let converted = match (value, target) {
        (Value::Int32(v), ValueKind::Int64) => Value::Int64(*v as i64),
        (Value::Int32(v), ValueKind::Float) => Value::float(*v as f64),
        (Value::Int32(v), ValueKind::Double) => Value::Double(*v as f64),
        (Value::Int64(v), ValueKind::Int32) => Value::Int32(*v as i32),
        (Value::Int64(v), ValueKind::Float) => Value::float(*v as f64),
        (Value::Int64(v), ValueKind::Double) => Value::Double(*v as f64),
        (Value::Float(v), ValueKind::Int32) => Value::Int32(float_to_int32(*v as f64)),
        (Value::Float(v), ValueKind::Int64) => Value::Int64(*v as i64),
        (Value::Float(v), ValueKind::Double) => Value::Double(*v as f64),
        (Value::Double(v), ValueKind::Int32) => Value::Int32(float_to_int32(*v)),
        (Value::Double(v), ValueKind::Int64) => Value::Int64(*v as i64),
        (Value::Double(v), ValueKind::Float) => Value::Float(round_float(*v)),
        (other, kind) if other.kind() == kind => other.clone(),
        _ => return None,
    };
    Some(converted)
}

/// Assignment to a name with a type designator. Only an exact match (after
/// unboxing) or the `&` and `#` widenings are accepted.
pub fn coerce_for_designator(value: &Value, target: ValueKind) -> Option<Value> {
    if target == ValueKind::Dynamic {
        return Some(value.clone());
    }
    let unboxed = value.unbox();
    match (&unboxed, target) {
        (inner, kind) if inner.kind() == kind => Some(unboxed.clone()),
        (Value::Int32(v), ValueKind::Int64) => Some(Value::Int64(*v as i64)),
        (Value::Float(v), ValueKind::Double) => Some(Value::Double(*v as f64)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_to_integer_keeps_low_bits() {
        let narrowed = try_coerce(&Value::Int64(2147483647119), ValueKind::Int32);
        assert!(matches!(narrowed, Some(Value::Int32(-881))), "got {:?}", narrowed);
    }

    #[test]
    fn floats_saturate_when_narrowed() {
        assert!(matches!(
            try_coerce(&Value::Double(1e20), ValueKind::Int32),
            Some(Value::Int32(i32::MAX))
        ));
        assert!(matches!(
            try_coerce(&Value::Float(-2.9), ValueKind::Int32),
            Some(Value::Int32(-2))
        ));
    }

    #[test]
    fn primitives_box_for_object_targets() {
        let boxed = try_coerce(&Value::string("hi"), ValueKind::Object);
        assert!(
            matches!(&boxed, Some(Value::Object(Object::Boxed(_)))),
            "strings should box, got {:?}",
            boxed
        );
        let unboxed = boxed.and_then(|value| try_coerce(&value, ValueKind::String));
        assert!(matches!(unboxed, Some(Value::String(text)) if text == "hi"));
    }

    #[test]
    fn incompatible_kinds_do_not_coerce() {
        assert!(try_coerce(&Value::string("1"), ValueKind::Int32).is_none());
        assert!(try_coerce(&Value::Boolean(true), ValueKind::Int32).is_none());
        assert!(try_coerce(&Value::Uninitialized, ValueKind::String).is_none());
        assert!(try_coerce(&Value::Int32(1), ValueKind::Interface).is_none());
        assert!(try_coerce(&Value::Uninitialized, ValueKind::Dynamic).is_some());
    }

    #[test]
    fn designators_only_widen() {
        assert!(matches!(
            coerce_for_designator(&Value::Int32(4), ValueKind::Int64),
            Some(Value::Int64(4))
        ));
        assert!(matches!(
            coerce_for_designator(&Value::Float(1.5), ValueKind::Double),
            Some(Value::Double(v)) if v == 1.5
        ));
        assert!(coerce_for_designator(&Value::Int64(4), ValueKind::Int32).is_none());
        assert!(coerce_for_designator(&Value::Double(1.0), ValueKind::Float).is_none());
        assert!(coerce_for_designator(&Value::Int32(1), ValueKind::String).is_none());
        assert!(matches!(
            coerce_for_designator(&Value::Int32(3).boxed(), ValueKind::Int32),
            Some(Value::Int32(3))
        ));
    }
}
