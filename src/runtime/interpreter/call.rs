use super::Interpreter;
use crate::language::ast::{Expr, FunctionExpr};
use crate::language::span::Location;
use crate::runtime::callable::{Callable, Implementation, Signature};
use crate::runtime::coercion::try_coerce;
use crate::runtime::components::assoc_array::AssocArrayRef;
use crate::runtime::environment::Scope;
use crate::runtime::error::{
    BrsError, Operand, RuntimeErrorDetail, RuntimeResult, Signal, TracePoint, TypeMismatch,
};
use crate::runtime::value::{Object, Value, ValueKind};

impl Interpreter {
    pub(super) fn evaluate_call(
        &mut self,
        callee_expr: &Expr,
        arg_exprs: &[Expr],
        optional: bool,
        closing: &Location,
    ) -> RuntimeResult<Value> {
        let callee = match self.evaluate(callee_expr)? {
            Value::Object(Object::Boxed(inner)) if matches!(*inner, Value::Callable(_)) => {
                (*inner).clone()
            }
            other => other,
        };
        let mut args = Vec::with_capacity(arg_exprs.len());
        for arg in arg_exprs {
            args.push(self.evaluate(arg)?);
        }

        let callable = match callee {
            Value::Callable(callable) => callable,
            Value::Invalid if optional => return Ok(Value::Invalid),
            _ => return Err(self.runtime_error(RuntimeErrorDetail::NotAFunction, closing)),
        };

        // methods reached through `.` or `[]` run with their source array as `m`
        let context = match callee_expr {
            Expr::DottedGet { .. } | Expr::IndexedGet { .. } => callable.context.clone(),
            _ => None,
        };
        self.call_callable(&callable, args, context, callee_expr.location(), closing)
    }

    /// Picks the matching overload of `callable` and runs it in a new frame.
    pub(crate) fn call_callable(
        &mut self,
        callable: &Callable,
        args: Vec<Value>,
        context: Option<AssocArrayRef>,
        call_location: &Location,
        closing: &Location,
    ) -> RuntimeResult<Value> {
        let Some((index, args)) = callable.first_satisfied(&args) else {
            let error = callable.mismatch_error(&args, closing.clone());
            return Err(self.add_error(error));
        };
        let overload = &callable.overloads[index];
        let signature = overload.signature.clone();
        let implementation = overload.implementation.clone();

        if callable.user_defined && self.stack.len() >= self.options.max_call_depth {
            return Err(self.runtime_error(RuntimeErrorDetail::StackOverflow, call_location));
        }

        let m_pointer = context.unwrap_or_else(|| self.env.root_m());
        let result = self.in_sub_env(|interpreter| {
            interpreter.env.set_m(m_pointer);
            if callable.user_defined {
                interpreter.stack.push(TracePoint {
                    function_name: callable.name.clone(),
                    function_location: callable
                        .location
                        .clone()
                        .unwrap_or_else(|| interpreter.location.clone()),
                    call_location: call_location.clone(),
                    signature: signature.clone(),
                });
            }
            let result = match &implementation {
                Implementation::User(func) => interpreter.run_user_function(func, args),
                Implementation::Native(native) => native(interpreter, &args),
                Implementation::Method(method) => {
                    let receiver = callable.receiver.clone().unwrap_or(Value::Invalid);
                    method(interpreter, &receiver, &args)
                }
            };
            let result = result.map_err(|signal| interpreter.crash_break(signal));
            if callable.user_defined {
                interpreter.stack.pop();
            }
            result
        });

        match result {
            Ok(value) => Ok(value),
            Err(Signal::Return { value, location }) => self.returned(value, &location, &signature),
            Err(signal) => Err(self.escaped_signal(signal)),
        }
    }

    /// Binds parameters, then runs the body, rerunning it in label-search mode
    /// for every `goto` that escapes it.
    fn run_user_function(&mut self, func: &FunctionExpr, args: Vec<Value>) -> RuntimeResult<Value> {
        let mut args = args.into_iter();
        for param in &func.params {
            let value = match args.next() {
                Some(value) => value,
                None => match &param.default {
                    Some(default) => {
                        let value = self.evaluate(default)?;
                        try_coerce(&value, param.kind).unwrap_or(value)
                    }
                    None => Value::Invalid,
                },
            };
            self.env
                .define(Scope::Function, &param.name.name, value, Some(&param.name.location))
                .map_err(|error| self.add_error(error))?;
        }

        self.env.goto_label.clear();
        let mut goto_location = func.location.clone();
        loop {
            match self.execute_statements(&func.body.statements) {
                Ok(()) => break,
                Err(Signal::Goto { label, location }) => {
                    self.env.goto_label = label.to_ascii_lowercase();
                    goto_location = location;
                }
                Err(signal) => return Err(signal),
            }
        }
        if !self.env.goto_label.is_empty() {
            let caller_frames = self.stack[..self.stack.len().saturating_sub(1)].to_vec();
            let error = BrsError::runtime(RuntimeErrorDetail::MissingLineNumber, goto_location)
                .with_backtrace(caller_frames);
            return Err(self.add_error(error));
        }
        Ok(Value::Invalid)
    }

    /// Checks a `return` against the declared return kind.
    fn returned(
        &mut self,
        value: Option<Value>,
        location: &Location,
        signature: &Signature,
    ) -> RuntimeResult<Value> {
        let returns = signature.returns;
        match value {
            Some(_) if returns == ValueKind::Void => {
                Err(self.runtime_error(RuntimeErrorDetail::ReturnWithValue, location))
            }
            None if returns != ValueKind::Void => {
                Err(self.runtime_error(RuntimeErrorDetail::ReturnWithoutValue, location))
            }
            None => Ok(Value::Invalid),
            Some(value) => match try_coerce(&value, returns) {
                Some(coerced) => Ok(coerced),
                None => {
                    let error = TypeMismatch::cast(
                        Operand::new(returns, location),
                        Operand::new(value.kind(), location),
                    )
                    .into_error();
                    Err(self.add_error(error))
                }
            },
        }
    }
}
