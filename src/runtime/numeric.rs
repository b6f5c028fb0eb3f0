//! Per-receiver arithmetic. The left operand's rank decides the result rank,
//! with the right operand's rank breaking ties operator by operator.

use crate::language::ast::BinaryOp;
use crate::runtime::value::{float_to_int32, Value};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum NumericError {
    #[error("divide by zero")]
    DivideByZero,
    #[error("operator not defined for numbers")]
    Unsupported,
}

type NumericResult = Result<Value, NumericError>;

#[derive(Clone, Copy, Debug)]
enum Num {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Num {
    fn of(value: &Value) -> Option<Num> {
        match value.unbox() {
            Value::Int32(v) => Some(Num::I32(v)),
            Value::Int64(v) => Some(Num::I64(v)),
            Value::Float(v) => Some(Num::F32(v)),
            Value::Double(v) => Some(Num::F64(v)),
            _ => None,
        }
    }

    fn f64(self) -> f64 {
        match self {
            Num::I32(v) => v as f64,
            Num::I64(v) => v as f64,
            Num::F32(v) => v as f64,
            Num::F64(v) => v,
        }
    }

    /// Integer view used by shifts and bitwise operators.
    fn i32(self) -> i32 {
        match self {
            Num::I32(v) => v,
            Num::I64(v) => v as i32,
            Num::F32(v) => float_to_int32(v as f64),
            Num::F64(v) => float_to_int32(v),
        }
    }

    fn i64(self) -> i64 {
        match self {
            Num::I32(v) => v as i64,
            Num::I64(v) => v,
            Num::F32(v) => v as i64,
            Num::F64(v) => v as i64,
        }
    }

    fn is_zero(self) -> bool {
        self.f64() == 0.0
    }
}

pub fn apply(op: BinaryOp, lhs: &Value, rhs: &Value) -> NumericResult {
    let (a, b) = match (Num::of(lhs), Num::of(rhs)) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(NumericError::Unsupported),
    };
    match a {
        Num::I32(a) => int32_op(op, a, b),
        Num::I64(a) => int64_op(op, a, b),
        Num::F32(a) => float_op(op, a, b),
        Num::F64(a) => double_op(op, a, b),
    }
}

/// Bitwise complement for `not` on numbers.
pub fn complement(value: &Value) -> Option<Value> {
    match Num::of(value)? {
        Num::I64(v) => Some(Value::Int64(!v)),
        other => Some(Value::Int32(!other.i32())),
    }
}

fn floating(a: f64, b: f64, op: BinaryOp) -> Result<f64, NumericError> {
    Ok(match op {
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::Multiply => a * b,
        BinaryOp::Divide => a / b,
        BinaryOp::Modulo => (a % b).trunc(),
        BinaryOp::Power => a.powf(b),
        _ => return Err(NumericError::Unsupported),
    })
}

fn int_divide(a: Num, b: Num) -> NumericResult {
    if b.is_zero() {
        return Err(NumericError::DivideByZero);
    }
    match (a, b) {
        (Num::I32(x), Num::I32(y)) => Ok(Value::Int32(x.wrapping_div(y))),
        (_, Num::I64(_)) | (Num::I64(_), _) => match (a, b) {
            (Num::I32(_) | Num::I64(_), Num::I32(_) | Num::I64(_)) => {
                Ok(Value::Int64(a.i64().wrapping_div(b.i64())))
            }
            _ => Ok(Value::Int64((a.f64() / b.f64()).trunc() as i64)),
        },
        _ => Ok(Value::Int32(float_to_int32((a.f64() / b.f64()).trunc()))),
    }
}

fn shift(op: BinaryOp, a: i32, b: Num, logical: bool) -> NumericResult {
    let amount = b.i32() as u32;
    match op {
        BinaryOp::LeftShift => Ok(Value::Int32(a.wrapping_shl(amount))),
        BinaryOp::RightShift if logical => {
            // unsigned results past i32::MAX saturate
            let shifted = (a as u32) >> (amount % 32);
            Ok(Value::Int32(i32::try_from(shifted).unwrap_or(i32::MAX)))
        }
        BinaryOp::RightShift => Ok(Value::Int32(a.wrapping_shr(amount))),
        _ => Err(NumericError::Unsupported),
    }
}

fn bitwise(op: BinaryOp, a: Num, b: Num) -> NumericResult {
    let result = match (a, b) {
        (Num::I64(_), _) | (_, Num::I64(_)) => {
            let (x, y) = (a.i64(), b.i64());
            Value::Int64(if op == BinaryOp::And { x & y } else { x | y })
        }
        _ => {
            let (x, y) = (a.i32(), b.i32());
            Value::Int32(if op == BinaryOp::And { x & y } else { x | y })
        }
    };
    Ok(result)
}

fn int32_op(op: BinaryOp, a: i32, b: Num) -> NumericResult {
    match op {
        BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply => match b {
            Num::I32(y) => Ok(Value::Int32(match op {
                BinaryOp::Add => a.wrapping_add(y),
                BinaryOp::Subtract => a.wrapping_sub(y),
                _ => a.wrapping_mul(y),
            })),
            Num::I64(y) => int64_op(op, a as i64, Num::I64(y)),
            Num::F32(y) => Ok(Value::float(floating(a as f64, y as f64, op)?)),
            Num::F64(y) => Ok(Value::Double(floating(a as f64, y, op)?)),
        },
        BinaryOp::Divide => match b {
            Num::F64(y) => Ok(Value::Double(a as f64 / y)),
            other => Ok(Value::float(a as f64 / other.f64())),
        },
        BinaryOp::Modulo => match b {
            Num::I32(0) | Num::I64(0) => Err(NumericError::DivideByZero),
            Num::I32(y) => Ok(Value::Int32(a.wrapping_rem(y))),
            Num::I64(y) => Ok(Value::Int64((a as i64).wrapping_rem(y))),
            Num::F32(y) => Ok(Value::float(floating(a as f64, y as f64, op)?)),
            Num::F64(y) => Ok(Value::Double(floating(a as f64, y, op)?)),
        },
        BinaryOp::IntDivide => int_divide(Num::I32(a), b),
        BinaryOp::Power => match b {
            Num::I64(y) => Ok(Value::Int64((a as f64).powf(y as f64) as i64)),
            Num::F64(y) => Ok(Value::Double((a as f64).powf(y))),
            other => Ok(Value::float((a as f64).powf(other.f64()))),
        },
        BinaryOp::LeftShift | BinaryOp::RightShift => shift(op, a, b, true),
        BinaryOp::And | BinaryOp::Or => bitwise(op, Num::I32(a), b),
        _ => Err(NumericError::Unsupported),
    }
}

fn int64_op(op: BinaryOp, a: i64, b: Num) -> NumericResult {
    match op {
        BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply => match b {
            Num::I32(_) | Num::I64(_) => {
                let y = b.i64();
                Ok(Value::Int64(match op {
                    BinaryOp::Add => a.wrapping_add(y),
                    BinaryOp::Subtract => a.wrapping_sub(y),
                    _ => a.wrapping_mul(y),
                }))
            }
            Num::F32(y) => Ok(Value::float(floating(a as f64, y as f64, op)?)),
            Num::F64(y) => Ok(Value::Double(floating(a as f64, y, op)?)),
        },
        BinaryOp::Divide => match b {
            Num::F64(y) => Ok(Value::Double(a as f64 / y)),
            other => Ok(Value::float(a as f64 / other.f64())),
        },
        BinaryOp::Modulo => match b {
            Num::I32(0) | Num::I64(0) => Err(NumericError::DivideByZero),
            Num::I32(_) | Num::I64(_) => Ok(Value::Int64(a.wrapping_rem(b.i64()))),
            Num::F32(y) => Ok(Value::float(floating(a as f64, y as f64, op)?)),
            Num::F64(y) => Ok(Value::Double(floating(a as f64, y, op)?)),
        },
        BinaryOp::IntDivide => int_divide(Num::I64(a), b),
        BinaryOp::Power => match b {
            Num::F32(y) => Ok(Value::float((a as f64).powf(y as f64))),
            Num::F64(y) => Ok(Value::Double((a as f64).powf(y))),
            other => Ok(Value::Int64((a as f64).powf(other.f64()) as i64)),
        },
        BinaryOp::LeftShift => Ok(Value::Int64(a.wrapping_shl(b.i32() as u32))),
        BinaryOp::RightShift => Ok(Value::Int64(a.wrapping_shr(b.i32() as u32))),
        BinaryOp::And | BinaryOp::Or => bitwise(op, Num::I64(a), b),
        _ => Err(NumericError::Unsupported),
    }
}

fn float_op(op: BinaryOp, a: f32, b: Num) -> NumericResult {
    let x = a as f64;
    match op {
        BinaryOp::Add
        | BinaryOp::Subtract
        | BinaryOp::Multiply
        | BinaryOp::Divide
        | BinaryOp::Modulo
        | BinaryOp::Power => match b {
            Num::F64(y) => Ok(Value::Double(floating(x, y, op)?)),
            other => Ok(Value::float(floating(x, other.f64(), op)?)),
        },
        BinaryOp::IntDivide => int_divide(Num::F32(a), b),
        BinaryOp::LeftShift | BinaryOp::RightShift => {
            shift(op, float_to_int32(x.trunc()), b, false)
        }
        BinaryOp::And | BinaryOp::Or => bitwise(op, Num::F32(a), b),
        _ => Err(NumericError::Unsupported),
    }
}

fn double_op(op: BinaryOp, a: f64, b: Num) -> NumericResult {
    match op {
        BinaryOp::Add
        | BinaryOp::Subtract
        | BinaryOp::Multiply
        | BinaryOp::Divide
        | BinaryOp::Modulo => Ok(Value::Double(floating(a, b.f64(), op)?)),
        BinaryOp::Power => match b {
            Num::I64(y) => Ok(Value::Int64(a.powf(y as f64) as i64)),
            Num::F64(y) => Ok(Value::Double(a.powf(y))),
            other => Ok(Value::float(a.powf(other.f64()))),
        },
        BinaryOp::IntDivide => int_divide(Num::F64(a), b),
        BinaryOp::LeftShift | BinaryOp::RightShift => {
            shift(op, float_to_int32(a.trunc()), b, false)
        }
        BinaryOp::And | BinaryOp::Or => bitwise(op, Num::F64(a), b),
        _ => Err(NumericError::Unsupported),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(op: BinaryOp, lhs: Value, rhs: Value) -> Value {
        apply(op, &lhs, &rhs).expect("numeric op")
    }

    #[test]
    fn integer_division_promotes_to_float() {
        let quotient = eval(BinaryOp::Divide, Value::Int32(6), Value::Int32(4));
        assert!(matches!(quotient, Value::Float(v) if v == 1.5), "{quotient:?}");
        let truncated = eval(BinaryOp::IntDivide, Value::Int32(6), Value::Int32(4));
        assert!(matches!(truncated, Value::Int32(1)), "{truncated:?}");
    }

    #[test]
    fn int32_arithmetic_wraps() {
        let sum = eval(BinaryOp::Add, Value::Int32(i32::MAX), Value::Int32(1));
        assert!(matches!(sum, Value::Int32(i32::MIN)), "{sum:?}");
    }

    #[test]
    fn mixed_ranks_follow_receiver_tables() {
        assert!(matches!(
            eval(BinaryOp::Add, Value::Int32(1), Value::Int64(2)),
            Value::Int64(3)
        ));
        assert!(matches!(
            eval(BinaryOp::Multiply, Value::Int32(2), Value::Double(1.5)),
            Value::Double(v) if v == 3.0
        ));
        assert!(matches!(
            eval(BinaryOp::Add, Value::Float(1.5), Value::Int32(1)),
            Value::Float(v) if v == 2.5
        ));
        assert!(matches!(
            eval(BinaryOp::Power, Value::Int32(2), Value::Int32(3)),
            Value::Float(v) if v == 8.0
        ));
        assert!(matches!(
            eval(BinaryOp::IntDivide, Value::Double(7.9), Value::Int32(2)),
            Value::Int32(3)
        ));
    }

    #[test]
    fn modulo_truncates_floats() {
        assert!(matches!(
            eval(BinaryOp::Modulo, Value::Int32(7), Value::Float(2.5)),
            Value::Float(v) if v == 2.0
        ));
        assert!(matches!(
            eval(BinaryOp::Modulo, Value::Int32(-7), Value::Int32(3)),
            Value::Int32(-1)
        ));
    }

    #[test]
    fn integer_divide_by_zero_is_an_error() {
        assert_eq!(
            apply(BinaryOp::IntDivide, &Value::Int32(1), &Value::Int32(0)).err(),
            Some(NumericError::DivideByZero)
        );
        assert_eq!(
            apply(BinaryOp::Modulo, &Value::Int64(1), &Value::Int32(0)).err(),
            Some(NumericError::DivideByZero)
        );
        let infinite = eval(BinaryOp::Divide, Value::Int32(1), Value::Int32(0));
        assert!(matches!(infinite, Value::Float(v) if v.is_infinite()));
    }

    #[test]
    fn right_shift_is_logical_for_int32_and_arithmetic_for_floats() {
        assert!(matches!(
            eval(BinaryOp::RightShift, Value::Int32(-8), Value::Int32(1)),
            Value::Int32(2147483644)
        ));
        assert!(matches!(
            eval(BinaryOp::RightShift, Value::Int32(-1), Value::Int32(0)),
            Value::Int32(i32::MAX)
        ));
        assert!(matches!(
            eval(BinaryOp::RightShift, Value::Int32(12), Value::Int32(0)),
            Value::Int32(12)
        ));
        assert!(matches!(
            eval(BinaryOp::RightShift, Value::Float(-8.7), Value::Int32(1)),
            Value::Int32(-4)
        ));
    }

    #[test]
    fn bitwise_and_or_on_numbers() {
        assert!(matches!(
            eval(BinaryOp::And, Value::Int32(1), Value::Int32(0)),
            Value::Int32(0)
        ));
        assert!(matches!(
            eval(BinaryOp::Or, Value::Int32(4), Value::Int64(1)),
            Value::Int64(5)
        ));
        assert!(matches!(complement(&Value::Int32(0)), Some(Value::Int32(-1))));
    }
}
