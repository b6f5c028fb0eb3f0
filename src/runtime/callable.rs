use crate::language::ast::{Expr, FunctionExpr, Literal};
use crate::language::span::Location;
use crate::runtime::coercion::try_coerce;
use crate::runtime::components::assoc_array::AssocArrayRef;
use crate::runtime::error::{BrsError, RuntimeErrorDetail, RuntimeResult};
use crate::runtime::value::{Value, ValueKind};
use crate::runtime::Interpreter;
use std::fmt;
use std::rc::Rc;

pub type NativeFn = fn(&mut Interpreter, &[Value]) -> RuntimeResult<Value>;
pub type MethodFn = fn(&mut Interpreter, &Value, &[Value]) -> RuntimeResult<Value>;

#[derive(Clone, Debug)]
pub struct Argument {
    pub name: String,
    pub kind: ValueKind,
    pub default: Option<Expr>,
}

impl Argument {
    pub fn required(name: &str, kind: ValueKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            default: None,
        }
    }

    pub fn optional(name: &str, kind: ValueKind, default: Literal) -> Self {
        Self {
            name: name.to_string(),
            kind,
            default: Some(Expr::Literal(default, Location::internal())),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Signature {
    pub args: Vec<Argument>,
    pub returns: ValueKind,
    /// Accept arguments past the declared list.
    pub variadic: bool,
}

impl Signature {
    pub fn new(args: Vec<Argument>, returns: ValueKind) -> Self {
        Self {
            args,
            returns,
            variadic: false,
        }
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    fn required_count(&self) -> usize {
        self.args.iter().filter(|arg| arg.default.is_none()).count()
    }
}

#[derive(Clone)]
pub enum Implementation {
    User(Rc<FunctionExpr>),
    Native(NativeFn),
    /// Component method; receives the object it was looked up on.
    Method(MethodFn),
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Implementation::User(func) => write!(f, "User({})", func.name),
            Implementation::Native(_) => f.write_str("Native"),
            Implementation::Method(_) => f.write_str("Method"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Overload {
    pub signature: Signature,
    pub implementation: Implementation,
}

#[derive(Clone, Debug)]
enum Mismatch {
    TooFewArguments { received: usize },
    TooManyArguments { expected: usize, received: usize },
    ArgumentType { name: String, expected: ValueKind, received: ValueKind },
}

/// A function value: one or more overloads plus the context it was pulled from.
#[derive(Clone)]
pub struct Callable {
    pub name: String,
    pub overloads: Rc<[Overload]>,
    /// Associative array the function was read from; becomes `m` for the call.
    pub context: Option<AssocArrayRef>,
    /// Object a component method is bound to.
    pub receiver: Option<Value>,
    pub location: Option<Location>,
    pub user_defined: bool,
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name)
            .field("overloads", &self.overloads.len())
            .field("user_defined", &self.user_defined)
            .finish()
    }
}

impl Callable {
    pub fn user(name: &str, func: Rc<FunctionExpr>) -> Self {
        let args = func
            .params
            .iter()
            .map(|param| Argument {
                name: param.name.name.clone(),
                kind: param.kind,
                default: param.default.clone(),
            })
            .collect();
        let signature = Signature::new(args, func.returns);
        Self {
            name: name.to_string(),
            location: Some(func.location.clone()),
            overloads: Rc::from(vec![Overload {
                signature,
                implementation: Implementation::User(func),
            }]),
            context: None,
            receiver: None,
            user_defined: true,
        }
    }

    pub fn native(name: &str, overloads: Vec<(Signature, NativeFn)>) -> Self {
        Self::from_overloads(
            name,
            overloads
                .into_iter()
                .map(|(signature, func)| Overload {
                    signature,
                    implementation: Implementation::Native(func),
                })
                .collect(),
        )
    }

    pub fn method(name: &str, overloads: Vec<(Signature, MethodFn)>) -> Self {
        Self::from_overloads(
            name,
            overloads
                .into_iter()
                .map(|(signature, func)| Overload {
                    signature,
                    implementation: Implementation::Method(func),
                })
                .collect(),
        )
    }

    fn from_overloads(name: &str, overloads: Vec<Overload>) -> Self {
        Self {
            name: name.to_string(),
            overloads: Rc::from(overloads),
            context: None,
            receiver: None,
            location: None,
            user_defined: false,
        }
    }

    pub fn with_context(&self, context: AssocArrayRef) -> Self {
        Self {
            context: Some(context),
            ..self.clone()
        }
    }

    pub fn bound_to(&self, receiver: Value) -> Self {
        Self {
            receiver: Some(receiver),
            ..self.clone()
        }
    }

    /// Identity comparison: two values are the same function when they share
    /// their overload table.
    pub fn same_function(&self, other: &Callable) -> bool {
        Rc::ptr_eq(&self.overloads, &other.overloads)
    }

    /// Index of the first overload the arguments satisfy, with the arguments
    /// coerced to its parameter kinds.
    pub fn first_satisfied(&self, args: &[Value]) -> Option<(usize, Vec<Value>)> {
        self.overloads
            .iter()
            .enumerate()
            .find_map(|(index, overload)| {
                satisfy(&overload.signature, args)
                    .ok()
                    .map(|coerced| (index, coerced))
            })
    }

    pub fn mismatch_error(&self, args: &[Value], location: Location) -> BrsError {
        let header = if self.overloads.len() == 1 {
            format!("Provided arguments don't match {}'s signature.", self.name)
        } else {
            format!(
                "Provided arguments don't match any of {}'s signatures.",
                self.name
            )
        };
        let mut parts = vec![header];
        for overload in self.overloads.iter() {
            let mismatches = satisfy(&overload.signature, args).err().unwrap_or_default();
            parts.push(self.describe_mismatch(&overload.signature, &mismatches));
        }
        let detail = RuntimeErrorDetail::TypeMismatch;
        BrsError::with_errno(
            detail.errno(),
            format!("{}: {}", detail, parts.join("\n")),
            location,
        )
    }

    fn describe_mismatch(&self, signature: &Signature, mismatches: &[Mismatch]) -> String {
        let params: Vec<String> = signature
            .args
            .iter()
            .map(|arg| {
                let text = format!("{} as {}", arg.name, arg.kind);
                if arg.default.is_some() {
                    format!("[{}]", text)
                } else {
                    text
                }
            })
            .collect();
        let mut lines = vec![format!(
            "function {}({}) as {}:",
            self.name,
            params.join(", "),
            signature.returns
        )];
        for mismatch in mismatches {
            let line = match mismatch {
                Mismatch::TooFewArguments { received } => format!(
                    "* {} requires at least {} argument(s), but received {}.",
                    self.name,
                    signature.required_count(),
                    received
                ),
                Mismatch::TooManyArguments { expected, received } => format!(
                    "* {} accepts at most {} argument(s), but received {}.",
                    self.name, expected, received
                ),
                Mismatch::ArgumentType {
                    name,
                    expected,
                    received,
                } => format!(
                    "* Argument '{}' must be of type {}, but received {}.",
                    name, expected, received
                ),
            };
            lines.push(format!("    {}", line));
        }
        lines
            .iter()
            .map(|line| format!("    {}", line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn satisfy(signature: &Signature, args: &[Value]) -> Result<Vec<Value>, Vec<Mismatch>> {
    let mut mismatches = Vec::new();
    if args.len() < signature.required_count() {
        mismatches.push(Mismatch::TooFewArguments {
            received: args.len(),
        });
    } else if !signature.variadic && args.len() > signature.args.len() {
        mismatches.push(Mismatch::TooManyArguments {
            expected: signature.args.len(),
            received: args.len(),
        });
    }

    let mut coerced = args.to_vec();
    for (index, (expected, received)) in signature.args.iter().zip(args).enumerate() {
        match try_coerce(received, expected.kind) {
            Some(value) => coerced[index] = value,
            None => mismatches.push(Mismatch::ArgumentType {
                name: expected.name.clone(),
                expected: expected.kind,
                received: received.kind(),
            }),
        }
    }

    if mismatches.is_empty() {
        Ok(coerced)
    } else {
        Err(mismatches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut Interpreter, _: &[Value]) -> RuntimeResult<Value> {
        Ok(Value::Invalid)
    }

    fn left() -> Callable {
        Callable::native(
            "Left",
            vec![(
                Signature::new(
                    vec![
                        Argument::required("s", ValueKind::String),
                        Argument::required("n", ValueKind::Int32),
                    ],
                    ValueKind::String,
                ),
                noop,
            )],
        )
    }

    #[test]
    fn numeric_arguments_are_coerced() {
        let (index, args) = left()
            .first_satisfied(&[Value::string("abc"), Value::Double(2.7)])
            .expect("should satisfy with a coerced double");
        assert_eq!(index, 0);
        assert!(matches!(args[1], Value::Int32(2)));
    }

    #[test]
    fn too_few_arguments_names_function() {
        let callee = left();
        assert!(callee.first_satisfied(&[Value::string("abc")]).is_none());
        let err = callee.mismatch_error(&[Value::string("abc")], Location::internal());
        assert_eq!(err.errno, Some(24));
        assert!(err.message.contains("Left"), "{}", err.message);
        assert!(err.message.contains("arguments"), "{}", err.message);
        assert!(
            err.message
                .contains("* Left requires at least 2 argument(s), but received 1."),
            "{}",
            err.message
        );
    }

    #[test]
    fn wrong_type_names_parameter() {
        let err = left().mismatch_error(&[Value::Int32(1), Value::Int32(2)], Location::internal());
        assert_eq!(
            err.message,
            "Type Mismatch.: Provided arguments don't match Left's signature.\n    \
             function Left(s as String, n as Integer) as String:\n        \
             * Argument 's' must be of type String, but received Integer."
        );
    }

    #[test]
    fn optional_parameters_may_be_omitted() {
        let callee = Callable::native(
            "Pad",
            vec![(
                Signature::new(
                    vec![
                        Argument::required("s", ValueKind::String),
                        Argument::optional("n", ValueKind::Int32, Literal::Integer(1)),
                    ],
                    ValueKind::String,
                ),
                noop,
            )],
        );
        assert!(callee.first_satisfied(&[Value::string("x")]).is_some());
        let err = callee.mismatch_error(&[], Location::internal());
        assert!(err.message.contains("[n as Integer]"), "{}", err.message);
        let too_many = callee.mismatch_error(
            &[Value::string("x"), Value::Int32(1), Value::Int32(2)],
            Location::internal(),
        );
        assert!(
            too_many.message.contains("accepts at most 2 argument(s), but received 3."),
            "{}",
            too_many.message
        );
    }

    #[test]
    fn clones_keep_identity() {
        let callee = left();
        let bound = callee.bound_to(Value::Invalid);
        assert!(callee.same_function(&bound));
        assert!(!callee.same_function(&left()));
    }
}
