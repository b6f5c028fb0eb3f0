use super::{Interpreter, STACK_GROW_SIZE, STACK_RED_ZONE};
use crate::language::ast::{BinaryOp, Expr, Identifier, UnaryOp};
use crate::language::span::Location;
use crate::runtime::callable::Callable;
use crate::runtime::error::{Operand, RuntimeErrorDetail, RuntimeResult, Signal, TypeMismatch};
use crate::runtime::numeric::{self, NumericError};
use crate::runtime::value::{Object, Value, ValueKind};
use std::rc::Rc;

impl Interpreter {
    pub(crate) fn evaluate(&mut self, expr: &Expr) -> RuntimeResult<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.evaluate_inner(expr))
    }

    fn evaluate_inner(&mut self, expr: &Expr) -> RuntimeResult<Value> {
        self.location = expr.location().clone();
        match expr {
            Expr::Literal(literal, _) => Ok(Value::from_literal(literal)),
            Expr::Grouping { expr, .. } => self.evaluate(expr),
            Expr::Variable(name) => Ok(self.lookup(name)),
            Expr::Binary {
                left,
                op,
                right,
                location,
            } => self.evaluate_binary(left, *op, right, location),
            Expr::Unary { op, expr, location } => self.evaluate_unary(*op, expr, location),
            Expr::Function(func) => Ok(Value::Callable(Rc::new(Callable::user(
                &func.name,
                func.clone(),
            )))),
            Expr::ArrayLiteral { elements, .. } => {
                let values = elements
                    .iter()
                    .map(|element| self.evaluate(element))
                    .collect::<RuntimeResult<Vec<_>>>()?;
                Ok(Value::new_array(values))
            }
            Expr::AALiteral { members, .. } => {
                let mut entries = Vec::with_capacity(members.len());
                for member in members {
                    entries.push((member.name.clone(), self.evaluate(&member.value)?));
                }
                Ok(Value::new_assoc_array(entries))
            }
            Expr::DottedGet {
                object,
                name,
                optional,
                ..
            } => {
                let source = self.evaluate(object)?;
                self.dotted_get(source, name, *optional)
            }
            Expr::AttributeGet { object, name, .. } => {
                let source = self.evaluate(object)?;
                if source.is_invalid() {
                    return Err(self.runtime_error(RuntimeErrorDetail::DotOnNonObject, &name.location));
                }
                Err(self.runtime_error(RuntimeErrorDetail::MemberFunctionNotFound, &name.location))
            }
            Expr::IndexedGet {
                object,
                indexes,
                optional,
                closing,
                location,
            } => self.indexed_get(object, indexes, *optional, closing, location),
            Expr::Call {
                callee,
                args,
                optional,
                closing,
                ..
            } => self.evaluate_call(callee, args, *optional, closing),
        }
    }

    /// Reading an unknown name is not an error; it yields `<UNINITIALIZED>`.
    fn lookup(&self, name: &Identifier) -> Value {
        self.env.get(name).unwrap_or(Value::Uninitialized)
    }

    fn mismatch(&mut self, message: String, left: Operand, right: Option<Operand>) -> Signal {
        self.add_error(TypeMismatch::new(message, left, right).into_error())
    }

    fn operator_mismatch(
        &mut self,
        op: &str,
        left: (&Value, &Expr),
        right: (&Value, &Expr),
    ) -> Signal {
        self.mismatch(
            format!("Operator \"{}\" can't be applied to", op),
            Operand::new(left.0.kind(), left.1.location()),
            Some(Operand::new(right.0.kind(), right.1.location())),
        )
    }

    fn numeric(
        &mut self,
        op: BinaryOp,
        left: (&Value, &Expr),
        right: (&Value, &Expr),
        location: &Location,
    ) -> RuntimeResult<Value> {
        match numeric::apply(op, left.0, right.0) {
            Ok(value) => Ok(value),
            Err(NumericError::DivideByZero) => {
                Err(self.runtime_error(RuntimeErrorDetail::DivideByZero, location))
            }
            Err(NumericError::Unsupported) => Err(self.operator_mismatch(op.symbol(), left, right)),
        }
    }

    fn evaluate_binary(
        &mut self,
        left_expr: &Expr,
        op: BinaryOp,
        right_expr: &Expr,
        location: &Location,
    ) -> RuntimeResult<Value> {
        let left = self.evaluate(left_expr)?.unbox();
        if matches!(op, BinaryOp::And | BinaryOp::Or) {
            return self.evaluate_logical(op, left, left_expr, right_expr, location);
        }
        let right = self.evaluate(right_expr)?.unbox();
        let lhs = (&left, left_expr);
        let rhs = (&right, right_expr);

        match op {
            BinaryOp::LeftShift | BinaryOp::RightShift => {
                if !(left.is_number() && right.is_number()) {
                    return Err(self.operator_mismatch(op.symbol(), lhs, rhs));
                }
                let amount = right.as_f64().unwrap_or(0.0).trunc();
                if !(0.0..32.0).contains(&amount) {
                    return Err(
                        self.runtime_error(RuntimeErrorDetail::BadBitShift, right_expr.location())
                    );
                }
                self.numeric(op, lhs, rhs, location)
            }
            BinaryOp::Subtract
            | BinaryOp::Multiply
            | BinaryOp::Divide
            | BinaryOp::IntDivide
            | BinaryOp::Modulo
            | BinaryOp::Power => {
                if left.is_number() && right.is_number() {
                    self.numeric(op, lhs, rhs, location)
                } else {
                    Err(self.operator_mismatch(op.symbol(), lhs, rhs))
                }
            }
            BinaryOp::Add => match (&left, &right) {
                (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
                (a, b) if a.is_number() && b.is_number() => self.numeric(op, lhs, rhs, location),
                _ => Err(self.operator_mismatch(op.symbol(), lhs, rhs)),
            },
            BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
                let comparable = (left.is_number() && right.is_number())
                    || (matches!(left, Value::String(_)) && matches!(right, Value::String(_)));
                if !comparable {
                    return Err(self.operator_mismatch(op.symbol(), lhs, rhs));
                }
                let result = match op {
                    BinaryOp::Less => left.less_than(&right),
                    BinaryOp::LessEqual => left.less_than(&right) || left.equal_to(&right),
                    BinaryOp::Greater => left.greater_than(&right),
                    _ => left.greater_than(&right) || left.equal_to(&right),
                };
                Ok(Value::Boolean(result))
            }
            BinaryOp::Equal | BinaryOp::NotEqual => {
                let equatable = |value: &Value| {
                    value.kind() < ValueKind::Dynamic
                        || value.is_unboxable()
                        || value.is_comparable()
                };
                let legal = left.is_invalid()
                    || right.is_invalid()
                    || (equatable(&left) && equatable(&right));
                if !legal {
                    return Err(self.operator_mismatch(op.symbol(), lhs, rhs));
                }
                let equal = left.equal_to(&right);
                Ok(Value::Boolean(if op == BinaryOp::Equal { equal } else { !equal }))
            }
            // short-circuited above
            BinaryOp::And | BinaryOp::Or => Err(self.operator_mismatch(op.symbol(), lhs, rhs)),
        }
    }

    /// `and`/`or`: boolean on booleans with short-circuit, bitwise on numbers.
    fn evaluate_logical(
        &mut self,
        op: BinaryOp,
        left: Value,
        left_expr: &Expr,
        right_expr: &Expr,
        location: &Location,
    ) -> RuntimeResult<Value> {
        let is_and = op == BinaryOp::And;
        if let Value::Boolean(lhs) = left {
            if is_and && !lhs {
                return Ok(Value::Boolean(false));
            }
            if !is_and && lhs {
                return Ok(Value::Boolean(true));
            }
        }
        if !matches!(left, Value::Boolean(_)) && !left.is_number() {
            // the right side is never evaluated for a non-boolean, non-numeric left side
            let right = (&Value::Invalid, right_expr);
            return Err(self.operator_mismatch(op.symbol(), (&left, left_expr), right));
        }
        let right = self.evaluate(right_expr)?.unbox();
        match (&left, &right) {
            (Value::Boolean(_), Value::Boolean(rhs)) => Ok(Value::Boolean(*rhs)),
            (Value::Boolean(_), rhs) if rhs.is_number() => Ok(Value::Boolean(rhs.to_bool())),
            (lhs, rhs) if lhs.is_number() && rhs.is_number() => {
                self.numeric(op, (&left, left_expr), (&right, right_expr), location)
            }
            (lhs, Value::Boolean(rhs)) if lhs.is_number() => Ok(Value::Boolean(if is_and {
                lhs.to_bool() && *rhs
            } else {
                lhs.to_bool() || *rhs
            })),
            _ => Err(self.operator_mismatch(op.symbol(), (&left, left_expr), (&right, right_expr))),
        }
    }

    fn evaluate_unary(&mut self, op: UnaryOp, expr: &Expr, location: &Location) -> RuntimeResult<Value> {
        let value = self.evaluate(expr)?.unbox();
        let result = match op {
            UnaryOp::Plus => Some(value.clone()),
            UnaryOp::Negate if value.is_number() => {
                numeric::apply(BinaryOp::Multiply, &value, &Value::Int32(-1)).ok()
            }
            UnaryOp::Not => match &value {
                Value::Boolean(b) => Some(Value::Boolean(!b)),
                other => numeric::complement(other),
            },
            UnaryOp::Negate => None,
        };
        match result {
            Some(value) => Ok(value),
            None => Err(self.mismatch(
                format!("Operator \"{}\" can't be applied to", op.symbol()),
                Operand::new(value.kind(), location),
                None,
            )),
        }
    }

    /// `source.name`: collection element first, then a component method.
    pub(super) fn dotted_get(
        &mut self,
        source: Value,
        name: &Identifier,
        optional: bool,
    ) -> RuntimeResult<Value> {
        if let Value::Object(Object::AssocArray(aa)) = &source {
            let found = aa.borrow().get(&name.name);
            match found {
                Some(Value::Callable(callable)) => {
                    return Ok(Value::Callable(Rc::new(callable.with_context(aa.clone()))))
                }
                Some(value) => return Ok(value),
                None => {}
            }
        }
        if source.is_invalid() && optional {
            return Ok(Value::Invalid);
        }
        if let Some(method) = self.components.lookup_method(&source, &name.name) {
            return Ok(Value::Callable(Rc::new(method)));
        }
        if source.is_collection() {
            return Ok(Value::Invalid);
        }
        let detail = match source {
            Value::Invalid | Value::Uninitialized => RuntimeErrorDetail::DotOnNonObject,
            _ => RuntimeErrorDetail::MemberFunctionNotFound,
        };
        Err(self.runtime_error(detail, &name.location))
    }

    fn indexed_get(
        &mut self,
        object: &Expr,
        indexes: &[Expr],
        optional: bool,
        closing: &Location,
        location: &Location,
    ) -> RuntimeResult<Value> {
        let source = self.evaluate(object)?;
        if !source.is_collection() {
            if source.is_invalid() && optional {
                return Ok(Value::Invalid);
            }
            return Err(self.runtime_error(RuntimeErrorDetail::UndimmedArray, location));
        }

        if let Value::Object(Object::AssocArray(aa)) = &source {
            let key = self.assoc_array_key(indexes, closing)?;
            let found = aa.borrow().get(&key);
            return Ok(match found {
                Some(Value::Callable(callable)) => {
                    Value::Callable(Rc::new(callable.with_context(aa.clone())))
                }
                Some(value) => value,
                None => Value::Invalid,
            });
        }

        let mut current = source;
        for index_expr in indexes {
            let index = self.array_index(index_expr)?;
            current = match &current {
                Value::Object(Object::Array(array)) => array.borrow().get(index),
                _ => {
                    return Err(
                        self.runtime_error(RuntimeErrorDetail::BadNumberOfIndexes, location)
                    )
                }
            };
        }
        Ok(current)
    }

    /// The single string key of an associative-array subscript.
    pub(super) fn assoc_array_key(
        &mut self,
        indexes: &[Expr],
        closing: &Location,
    ) -> RuntimeResult<String> {
        let [index_expr] = indexes else {
            return Err(self.runtime_error(RuntimeErrorDetail::WrongNumberOfParams, closing));
        };
        match self.evaluate(index_expr)?.unbox() {
            Value::String(key) => Ok(key),
            other => Err(self.mismatch(
                "\"String\" should be used as key, but received".to_string(),
                Operand::new(other.kind(), index_expr.location()),
                None,
            )),
        }
    }

    pub(super) fn array_index(&mut self, index_expr: &Expr) -> RuntimeResult<i64> {
        let index = self.evaluate(index_expr)?;
        match index.as_i64() {
            Some(index) => Ok(index),
            None => Err(self.runtime_error(
                RuntimeErrorDetail::NonNumericArrayIndex,
                index_expr.location(),
            )),
        }
    }
}
