pub mod callable;
pub mod coercion;
pub mod components;
pub mod debug;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod numeric;
pub mod platform;
pub mod stdlib;
pub mod value;

pub use interpreter::{ExecFailure, ExecOutcome, Interpreter, TerminationReason};
