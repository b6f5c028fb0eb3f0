//! Methods of the boxed primitives (`roString`, `roInt`, `roFloat`, ...).

use crate::language::ast::Literal;
use crate::runtime::callable::{Argument, Callable, MethodFn, Signature};
use crate::runtime::error::RuntimeResult;
use crate::runtime::value::{Value, ValueKind};
use crate::runtime::Interpreter;

fn text_of(this: &Value) -> String {
    match this.unbox() {
        Value::String(text) => text,
        other => other.to_brs_string(false),
    }
}

fn int_arg(args: &[Value], index: usize) -> i64 {
    args.get(index).and_then(Value::as_i64).unwrap_or(0)
}

fn string_arg(args: &[Value], index: usize) -> String {
    match args.get(index).map(Value::unbox) {
        Some(Value::String(text)) => text,
        _ => String::new(),
    }
}

/// Characters `[start, start + len)`, clamped to the string.
pub(crate) fn substring(text: &str, start: i64, len: Option<i64>) -> String {
    let start = start.max(0) as usize;
    let chars = text.chars().skip(start);
    match len {
        Some(len) => chars.take(len.max(0) as usize).collect(),
        None => chars.collect(),
    }
}

/// Zero-based char index of `needle` at or after `from`, or -1.
pub(crate) fn find_from(haystack: &str, needle: &str, from: i64) -> i64 {
    let from = from.max(0) as usize;
    let chars: Vec<char> = haystack.chars().collect();
    if from > chars.len() {
        return -1;
    }
    let tail: String = chars[from..].iter().collect();
    match tail.find(needle) {
        Some(byte_index) => (from + tail[..byte_index].chars().count()) as i64,
        None => -1,
    }
}

/// Leading integer, like `parseInt`: stops at the first non-digit.
pub(crate) fn leading_int(text: &str) -> i64 {
    let trimmed = text.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits: String = digits.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<i64>().map(|n| sign * n).unwrap_or(0)
}

/// Leading float, like `parseFloat`.
pub(crate) fn leading_float(text: &str) -> f64 {
    let trimmed = text.trim_start();
    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_exp = false;
    let bytes = trimmed.as_bytes();
    while end < bytes.len() {
        let c = bytes[end] as char;
        let accept = match c {
            '0'..='9' => true,
            '+' | '-' => end == 0 || matches!(bytes[end - 1] as char, 'e' | 'E'),
            '.' if !seen_dot && !seen_exp => {
                seen_dot = true;
                true
            }
            'e' | 'E' if !seen_exp && end > 0 => {
                seen_exp = true;
                true
            }
            _ => false,
        };
        if !accept {
            break;
        }
        end += 1;
    }
    let mut candidate = &trimmed[..end];
    while !candidate.is_empty() {
        if let Ok(value) = candidate.parse::<f64>() {
            return value;
        }
        candidate = &candidate[..candidate.len() - 1];
    }
    0.0
}

fn len(_: &mut Interpreter, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::Int32(text_of(this).chars().count() as i32))
}

fn left(_: &mut Interpreter, this: &Value, args: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::String(substring(&text_of(this), 0, Some(int_arg(args, 0)))))
}

fn right(_: &mut Interpreter, this: &Value, args: &[Value]) -> RuntimeResult<Value> {
    let text = text_of(this);
    let total = text.chars().count() as i64;
    let count = int_arg(args, 0).clamp(0, total);
    Ok(Value::String(substring(&text, total - count, None)))
}

fn mid(_: &mut Interpreter, this: &Value, args: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::String(substring(&text_of(this), int_arg(args, 0), None)))
}

fn mid_len(_: &mut Interpreter, this: &Value, args: &[Value]) -> RuntimeResult<Value> {
    let text = substring(&text_of(this), int_arg(args, 0), Some(int_arg(args, 1)));
    Ok(Value::String(text))
}

fn instr(_: &mut Interpreter, this: &Value, args: &[Value]) -> RuntimeResult<Value> {
    let index = find_from(&text_of(this), &string_arg(args, 0), 0);
    Ok(Value::Int32(index as i32))
}

fn instr_from(_: &mut Interpreter, this: &Value, args: &[Value]) -> RuntimeResult<Value> {
    let index = find_from(&text_of(this), &string_arg(args, 1), int_arg(args, 0));
    Ok(Value::Int32(index as i32))
}

fn trim(_: &mut Interpreter, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::string(text_of(this).trim()))
}

fn to_int(_: &mut Interpreter, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::Int32(leading_int(&text_of(this)) as i32))
}

fn to_float(_: &mut Interpreter, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::float(leading_float(&text_of(this))))
}

fn to_str(_: &mut Interpreter, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::String(text_of(this)))
}

fn ucase(_: &mut Interpreter, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::String(text_of(this).to_uppercase()))
}

fn lcase(_: &mut Interpreter, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::String(text_of(this).to_lowercase()))
}

fn split(_: &mut Interpreter, this: &Value, args: &[Value]) -> RuntimeResult<Value> {
    let text = text_of(this);
    let separator = string_arg(args, 0);
    let parts: Vec<Value> = if separator.is_empty() {
        text.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        text.split(separator.as_str()).map(Value::string).collect()
    };
    Ok(Value::new_array(parts))
}

/// `getInt()`, `getFloat()` and friends all hand back the wrapped primitive.
fn get_value(_: &mut Interpreter, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(this.unbox())
}

fn method0(name: &str, returns: ValueKind, func: MethodFn) -> Callable {
    Callable::method(name, vec![(Signature::new(Vec::new(), returns), func)])
}

pub fn string_methods() -> Vec<Callable> {
    let int = |name: &str| Argument::required(name, ValueKind::Int32);
    let text = |name: &str| Argument::required(name, ValueKind::String);
    vec![
        method0("len", ValueKind::Int32, len),
        Callable::method(
            "left",
            vec![(Signature::new(vec![int("len")], ValueKind::String), left)],
        ),
        Callable::method(
            "right",
            vec![(Signature::new(vec![int("len")], ValueKind::String), right)],
        ),
        Callable::method(
            "mid",
            vec![
                (Signature::new(vec![int("start_index")], ValueKind::String), mid),
                (
                    Signature::new(
                        vec![int("start_index"), int("num_chars")],
                        ValueKind::String,
                    ),
                    mid_len,
                ),
            ],
        ),
        Callable::method(
            "instr",
            vec![
                (Signature::new(vec![text("substring")], ValueKind::Int32), instr),
                (
                    Signature::new(vec![int("start_index"), text("substring")], ValueKind::Int32),
                    instr_from,
                ),
            ],
        ),
        method0("trim", ValueKind::String, trim),
        method0("toInt", ValueKind::Int32, to_int),
        method0("toFloat", ValueKind::Float, to_float),
        method0("toStr", ValueKind::String, to_str),
        method0("getString", ValueKind::String, get_value),
        method0("ucase", ValueKind::String, ucase),
        method0("lcase", ValueKind::String, lcase),
        Callable::method(
            "split",
            vec![(
                Signature::new(
                    vec![Argument::optional(
                        "separator",
                        ValueKind::String,
                        Literal::String(String::new()),
                    )],
                    ValueKind::Object,
                ),
                split,
            )],
        ),
    ]
}

/// `toStr` plus the getter named after the wrapped kind, e.g. `getInt` for `roInt`.
pub fn primitive_methods(getter: &str, returns: ValueKind) -> Vec<Callable> {
    vec![
        method0("toStr", ValueKind::String, to_str),
        method0(getter, returns, get_value),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substrings_clamp_to_bounds() {
        assert_eq!(substring("hello", 1, Some(3)), "ell");
        assert_eq!(substring("hello", 3, Some(10)), "lo");
        assert_eq!(substring("hello", 9, None), "");
    }

    #[test]
    fn find_counts_characters() {
        assert_eq!(find_from("héllo wörld", "wö", 0), 6);
        assert_eq!(find_from("abcabc", "b", 2), 4);
        assert_eq!(find_from("abc", "z", 0), -1);
    }

    #[test]
    fn leading_numbers_stop_at_garbage() {
        assert_eq!(leading_int("  42abc"), 42);
        assert_eq!(leading_int("-7"), -7);
        assert_eq!(leading_int("x1"), 0);
        assert_eq!(leading_float("3.5e2xyz"), 350.0);
        assert_eq!(leading_float("1.5e"), 1.5);
    }
}
