//! Global functions registered into the global scope of every interpreter.

use crate::language::ast::Literal;
use crate::runtime::callable::{Argument, Callable, NativeFn, Signature};
use crate::runtime::components::{
    boxed::{find_from, leading_float, substring},
    create_object,
};
use crate::runtime::error::{format_location, BrsError, RuntimeErrorDetail, RuntimeResult};
use crate::runtime::value::{format_general, Object, Value, ValueKind};
use crate::runtime::Interpreter;

fn function(name: &str, args: Vec<Argument>, returns: ValueKind, func: NativeFn) -> Callable {
    Callable::native(name, vec![(Signature::new(args, returns), func)])
}

fn arg(name: &str, kind: ValueKind) -> Argument {
    Argument::required(name, kind)
}

fn text(args: &[Value], index: usize) -> String {
    match args.get(index).map(Value::unbox) {
        Some(Value::String(text)) => text,
        _ => String::new(),
    }
}

fn integer(args: &[Value], index: usize) -> i64 {
    args.get(index).and_then(Value::as_i64).unwrap_or(0)
}

fn number(args: &[Value], index: usize) -> f64 {
    args.get(index).and_then(Value::as_f64).unwrap_or(0.0)
}

fn type_mismatch(interpreter: &mut Interpreter) -> crate::runtime::error::Signal {
    let location = interpreter.location().clone();
    interpreter.add_error(BrsError::runtime(RuntimeErrorDetail::TypeMismatch, location))
}

const MAX_TAB_COLUMN: i64 = 1 << 16;

/// Padding that moves the cursor to column `position`. Only defined inside `print`.
pub fn tab() -> Callable {
    fn tab(interpreter: &mut Interpreter, args: &[Value]) -> RuntimeResult<Value> {
        let target = integer(args, 0);
        let current = interpreter.output_column() as i64;
        if target <= current {
            return Ok(Value::string(""));
        }
        if target > MAX_TAB_COLUMN {
            let location = interpreter.location().clone();
            let detail = RuntimeErrorDetail::OutOfMemoryStringOp;
            return Err(interpreter.runtime_error(detail, &location));
        }
        Ok(Value::String(" ".repeat((target - current) as usize)))
    }
    function("Tab", vec![arg("position", ValueKind::Int32)], ValueKind::String, tab)
}

/// Current output column. Only defined inside `print`.
pub fn pos() -> Callable {
    fn pos(interpreter: &mut Interpreter, _: &[Value]) -> RuntimeResult<Value> {
        Ok(Value::Int32(interpreter.output_column() as i32))
    }
    function("Pos", vec![arg("dummy", ValueKind::Dynamic)], ValueKind::Int32, pos)
}

fn str_value(_: &mut Interpreter, args: &[Value]) -> RuntimeResult<Value> {
    let value = number(args, 0);
    let prefix = if value >= 0.0 || value.is_nan() { " " } else { "" };
    Ok(Value::String(format!("{}{}", prefix, format_general(value))))
}

fn str_i(_: &mut Interpreter, args: &[Value]) -> RuntimeResult<Value> {
    let value = integer(args, 0) as i32;
    let radix = integer(args, 1);
    if radix == 10 {
        let prefix = if value >= 0 { " " } else { "" };
        return Ok(Value::String(format!("{}{}", prefix, value)));
    }
    if !(2..=36).contains(&radix) {
        return Ok(Value::string(""));
    }
    Ok(Value::String(to_radix(value as i64, radix as u32)))
}

fn to_radix(value: i64, radix: u32) -> String {
    let negative = value < 0;
    let mut magnitude = value.unsigned_abs();
    if magnitude == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while magnitude > 0 {
        let digit = (magnitude % radix as u64) as u32;
        digits.push(std::char::from_digit(digit, radix).unwrap_or('0'));
        magnitude /= radix as u64;
    }
    if negative {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

fn int(interpreter: &mut Interpreter, args: &[Value]) -> RuntimeResult<Value> {
    match args.first().and_then(Value::as_f64) {
        Some(value) => Ok(Value::Int32(value.floor() as i32)),
        None => Err(type_mismatch(interpreter)),
    }
}

fn fix(interpreter: &mut Interpreter, args: &[Value]) -> RuntimeResult<Value> {
    match args.first().and_then(Value::as_f64) {
        Some(value) => Ok(Value::Int32(value.trunc() as i32)),
        None => Err(type_mismatch(interpreter)),
    }
}

fn abs(interpreter: &mut Interpreter, args: &[Value]) -> RuntimeResult<Value> {
    match args.first().map(Value::unbox) {
        Some(Value::Int32(v)) => Ok(Value::Int32(v.wrapping_abs())),
        Some(Value::Int64(v)) => Ok(Value::Int64(v.wrapping_abs())),
        Some(Value::Float(v)) => Ok(Value::Float(v.abs())),
        Some(Value::Double(v)) => Ok(Value::Double(v.abs())),
        _ => Err(type_mismatch(interpreter)),
    }
}

fn sqr(_: &mut Interpreter, args: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::float(number(args, 0).sqrt()))
}

fn len(_: &mut Interpreter, args: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::Int32(text(args, 0).chars().count() as i32))
}

fn ucase(_: &mut Interpreter, args: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::String(text(args, 0).to_uppercase()))
}

fn lcase(_: &mut Interpreter, args: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::String(text(args, 0).to_lowercase()))
}

fn left(_: &mut Interpreter, args: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::String(substring(&text(args, 0), 0, Some(integer(args, 1)))))
}

fn right(_: &mut Interpreter, args: &[Value]) -> RuntimeResult<Value> {
    let source = text(args, 0);
    let total = source.chars().count() as i64;
    let count = integer(args, 1).clamp(0, total);
    Ok(Value::String(substring(&source, total - count, None)))
}

fn mid(_: &mut Interpreter, args: &[Value]) -> RuntimeResult<Value> {
    let start = (integer(args, 1) - 1).max(0);
    let length = match args.get(2) {
        Some(Value::Invalid) | None => None,
        Some(value) => value.as_i64(),
    };
    Ok(Value::String(substring(&text(args, 0), start, length)))
}

fn instr(_: &mut Interpreter, args: &[Value]) -> RuntimeResult<Value> {
    let start = integer(args, 0).max(1);
    let haystack = text(args, 1);
    let needle = text(args, 2);
    if needle.is_empty() {
        return Ok(Value::Int32(start as i32));
    }
    let found = find_from(&haystack, &needle, start - 1);
    Ok(Value::Int32((found + 1) as i32))
}

fn chr(_: &mut Interpreter, args: &[Value]) -> RuntimeResult<Value> {
    let code = integer(args, 0);
    let ch = u32::try_from(code).ok().and_then(char::from_u32);
    Ok(Value::String(ch.map(String::from).unwrap_or_default()))
}

fn asc(_: &mut Interpreter, args: &[Value]) -> RuntimeResult<Value> {
    let code = text(args, 0).chars().next().map(|c| c as i32).unwrap_or(0);
    Ok(Value::Int32(code))
}

fn val(_: &mut Interpreter, args: &[Value]) -> RuntimeResult<Value> {
    let source = text(args, 0);
    match args.get(1) {
        Some(radix) if !radix.is_invalid() => {
            let radix = radix.as_i64().unwrap_or(10);
            if !(2..=36).contains(&radix) {
                return Ok(Value::Int32(0));
            }
            let digits = source.trim().to_ascii_lowercase();
            let digits = digits.strip_prefix("0x").filter(|_| radix == 16).unwrap_or(&digits);
            let parsed = i64::from_str_radix(digits, radix as u32).unwrap_or(0);
            Ok(Value::Int32(parsed as i32))
        }
        _ => Ok(Value::float(leading_float(&source))),
    }
}

fn type_of(_: &mut Interpreter, args: &[Value]) -> RuntimeResult<Value> {
    let value = args.first().cloned().unwrap_or(Value::Uninitialized);
    Ok(Value::String(value.type_name()))
}

fn box_value(_: &mut Interpreter, args: &[Value]) -> RuntimeResult<Value> {
    Ok(args.first().map(Value::boxed).unwrap_or(Value::Invalid))
}

fn create(interpreter: &mut Interpreter, args: &[Value]) -> RuntimeResult<Value> {
    let name = text(args, 0);
    match create_object(&name) {
        Some(object) => Ok(object),
        None => {
            let location = format_location(interpreter.location());
            interpreter.write_stderr(&format!(
                "BRIGHTSCRIPT: ERROR: Runtime: unknown classname \"{}\": {}\n",
                name, location
            ));
            Ok(Value::Invalid)
        }
    }
}

fn get_global_aa(interpreter: &mut Interpreter, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::Object(Object::AssocArray(interpreter.environment().root_m())))
}

fn up_time(interpreter: &mut Interpreter, _: &[Value]) -> RuntimeResult<Value> {
    let seconds = interpreter.uptime_ms() as f64 / 1000.0;
    Ok(Value::float((seconds * 100.0).round() / 100.0))
}

pub fn globals() -> Vec<Callable> {
    vec![
        function("Str", vec![arg("value", ValueKind::Float)], ValueKind::String, str_value),
        function(
            "StrI",
            vec![
                arg("value", ValueKind::Int32),
                Argument::optional("radix", ValueKind::Int32, Literal::Integer(10)),
            ],
            ValueKind::String,
            str_i,
        ),
        function("Int", vec![arg("x", ValueKind::Dynamic)], ValueKind::Int32, int),
        function("Fix", vec![arg("x", ValueKind::Dynamic)], ValueKind::Int32, fix),
        function("Abs", vec![arg("x", ValueKind::Dynamic)], ValueKind::Dynamic, abs),
        function("Sqr", vec![arg("x", ValueKind::Float)], ValueKind::Float, sqr),
        function("Len", vec![arg("s", ValueKind::String)], ValueKind::Int32, len),
        function("UCase", vec![arg("s", ValueKind::String)], ValueKind::String, ucase),
        function("LCase", vec![arg("s", ValueKind::String)], ValueKind::String, lcase),
        function("Left", vec![arg("s", ValueKind::String), arg("n", ValueKind::Int32)], ValueKind::String, left),
        function("Right", vec![arg("s", ValueKind::String), arg("n", ValueKind::Int32)], ValueKind::String, right),
        function(
            "Mid",
            vec![
                arg("s", ValueKind::String),
                arg("p", ValueKind::Int32),
                Argument::optional("n", ValueKind::Int32, Literal::Invalid),
            ],
            ValueKind::String,
            mid,
        ),
        function(
            "Instr",
            vec![arg("start", ValueKind::Int32), arg("text", ValueKind::String), arg("substring", ValueKind::String)],
            ValueKind::Int32,
            instr,
        ),
        function("Chr", vec![arg("ch", ValueKind::Int32)], ValueKind::String, chr),
        function("Asc", vec![arg("letter", ValueKind::String)], ValueKind::Int32, asc),
        function(
            "Val",
            vec![
                arg("s", ValueKind::String),
                Argument::optional("radix", ValueKind::Int32, Literal::Invalid),
            ],
            ValueKind::Dynamic,
            val,
        ),
        function(
            "Type",
            vec![
                arg("variable", ValueKind::Dynamic),
                Argument::optional("version", ValueKind::Int32, Literal::Integer(2)),
            ],
            ValueKind::String,
            type_of,
        ),
        function("Box", vec![arg("x", ValueKind::Dynamic)], ValueKind::Object, box_value),
        Callable::native(
            "CreateObject",
            vec![(
                Signature::new(vec![arg("objType", ValueKind::String)], ValueKind::Dynamic).variadic(),
                create,
            )],
        ),
        function("GetGlobalAA", Vec::new(), ValueKind::Dynamic, get_global_aa),
        function("UpTime", vec![arg("dummy", ValueKind::Int32)], ValueKind::Float, up_time),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radix_conversion() {
        assert_eq!(to_radix(255, 16), "ff");
        assert_eq!(to_radix(-5, 2), "-101");
        assert_eq!(to_radix(0, 8), "0");
    }

    #[test]
    fn every_global_has_a_unique_name() {
        let mut names: Vec<String> = globals()
            .iter()
            .map(|callable| callable.name.to_ascii_lowercase())
            .collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}
