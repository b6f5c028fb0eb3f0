//! Tree-walking evaluator.
//!
//! Expressions and statements return [`RuntimeResult`]; every non-local exit
//! (loop exits, `return`, `goto`, `end`, debugger exit and errors) travels as a
//! [`Signal`] in the `Err` arm until the construct that owns it catches it.

mod call;
mod expression;
mod statement;

use crate::config::ExecutionOptions;
use crate::language::ast::{Identifier, Statement};
use crate::language::span::Location;
use crate::runtime::components::ComponentRegistry;
use crate::runtime::debug::{
    BreakContext, ContinueDebugger, DebugAction, DebugCommand, Debugger, SharedSuspension,
    SuspensionProvider,
};
use crate::runtime::environment::{Environment, Scope};
use crate::runtime::error::{
    self, BrsError, ErrorSink, ObserverId, RuntimeErrorDetail, RuntimeResult, Signal, TracePoint,
};
use crate::runtime::platform::{Platform, StdPlatform};
use crate::runtime::stdlib;
use crate::runtime::value::Value;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// Remaining stack below which evaluation moves onto a fresh segment.
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminationReason {
    Completed,
    EndStatement,
    DebugExit,
}

#[derive(Debug)]
pub struct ExecOutcome {
    pub value: Value,
    pub reason: TerminationReason,
}

/// Uncaught error that ended a run.
#[derive(Debug, Error)]
#[error("{formatted}")]
pub struct ExecFailure {
    pub error: BrsError,
    /// Device-style report: the error line, then `BackTrace:` and the frames.
    pub formatted: String,
}

pub struct Interpreter {
    env: Environment,
    options: ExecutionOptions,
    platform: Box<dyn Platform>,
    sink: ErrorSink,
    stack: Vec<TracePoint>,
    location: Location,
    try_mode: bool,
    debug_mode: bool,
    suspension: Box<dyn SuspensionProvider>,
    debugger: Box<dyn Debugger>,
    components: ComponentRegistry,
    output_column: usize,
    printed: bool,
    started_ms: i128,
    /// Element index a `for each` resumes at after a `goto` back into its body.
    for_each_resume: Option<usize>,
}

impl Interpreter {
    pub fn new(options: ExecutionOptions) -> Self {
        Self::with_platform(options, Box::new(StdPlatform))
    }

    pub fn with_platform(options: ExecutionOptions, platform: Box<dyn Platform>) -> Self {
        let root_m = Rc::new(RefCell::new(Default::default()));
        let mut env = Environment::new(root_m);
        for callable in stdlib::globals() {
            let name = callable.name.clone();
            // global definitions never fail: only `global` itself is guarded
            let _ = env.define(Scope::Global, &name, Value::Callable(Rc::new(callable)), None);
        }
        let started_ms = platform.now_ms();
        Self {
            env,
            options,
            platform,
            sink: ErrorSink::new(),
            stack: Vec::new(),
            location: Location::internal(),
            try_mode: false,
            debug_mode: false,
            suspension: Box::new(SharedSuspension::new()),
            debugger: Box::new(ContinueDebugger),
            components: ComponentRegistry::new(),
            output_column: 0,
            printed: false,
            started_ms,
            for_each_resume: None,
        }
    }

    pub fn set_suspension_provider(&mut self, provider: Box<dyn SuspensionProvider>) {
        self.suspension = provider;
    }

    pub fn set_debugger(&mut self, debugger: Box<dyn Debugger>) {
        self.debugger = debugger;
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    /// Runs the top-level statements, then the entry function.
    pub fn exec(
        &mut self,
        statements: &[Statement],
        args: Vec<Value>,
    ) -> Result<ExecOutcome, ExecFailure> {
        let result = self.run_program(statements, args);
        let finished = |value: Value, reason| Ok(ExecOutcome { value, reason });
        let error = match result {
            Ok(value) => return finished(value, TerminationReason::Completed),
            Err(Signal::Return { value, .. }) => {
                return finished(value.unwrap_or(Value::Invalid), TerminationReason::Completed)
            }
            Err(Signal::End(_)) => return finished(Value::Invalid, TerminationReason::EndStatement),
            Err(Signal::DebugExit(_)) => {
                return finished(Value::Invalid, TerminationReason::DebugExit)
            }
            Err(Signal::Error(error)) => *error,
            Err(signal) => match self.escaped_signal(signal) {
                Signal::Error(error) => *error,
                _ => BrsError::runtime(RuntimeErrorDetail::Internal, self.location.clone()),
            },
        };
        let backtrace = error.backtrace.clone().unwrap_or_default();
        let formatted = format!(
            "{}\nBackTrace:\n{}",
            error.format(),
            error::format_backtrace(&error.location, &backtrace)
        );
        Err(ExecFailure { error, formatted })
    }

    fn run_program(&mut self, statements: &[Statement], args: Vec<Value>) -> RuntimeResult<Value> {
        if let Err(signal) = self.execute_statements(statements) {
            return Err(self.crash_break(signal));
        }
        if !self.options.entry_point {
            return Ok(Value::Invalid);
        }
        let entry = ["RunUserInterface", "Main"].iter().find_map(|name| {
            match self.env.get(&Identifier::new(*name, Location::internal())) {
                Ok(Value::Callable(callable)) => Some(callable),
                _ => None,
            }
        });
        let Some(entry) = entry else {
            if !self.printed {
                tracing::warn!(
                    "WARNING! No entry point found! You may need to define a function Main() or RunUserInterface()"
                );
            }
            return Ok(Value::Invalid);
        };
        tracing::debug!(function = %entry.name, "calling entry point");
        let takes_args = entry
            .overloads
            .first()
            .is_some_and(|overload| !overload.signature.args.is_empty());
        let args = if takes_args { args } else { Vec::new() };
        let location = entry.location.clone().unwrap_or_default();
        self.call_callable(&entry, args, None, &location, &location)
    }

    pub fn errors(&self) -> &[BrsError] {
        self.sink.errors()
    }

    pub fn on_error(&mut self, handler: impl FnMut(&BrsError) + 'static) -> ObserverId {
        self.sink.subscribe(false, Box::new(handler))
    }

    pub fn on_error_once(&mut self, handler: impl FnMut(&BrsError) + 'static) -> ObserverId {
        self.sink.subscribe(true, Box::new(handler))
    }

    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        self.sink.unsubscribe(id)
    }

    /// Backtrace text for the current call stack, innermost frame at `location`.
    pub fn format_backtrace(&self, location: &Location) -> String {
        error::format_backtrace(location, &self.stack)
    }

    pub fn backtrace_array(&self, location: &Location) -> Value {
        error::backtrace_array(location, &self.stack)
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Location of the statement or expression being evaluated.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Records `error` (outside `try`) and returns it as a signal to propagate.
    pub(crate) fn add_error(&mut self, mut error: BrsError) -> Signal {
        if error.backtrace.is_none() {
            error.backtrace = Some(self.stack.clone());
        }
        if !self.try_mode {
            self.sink.record(&error);
        }
        Signal::Error(Box::new(error))
    }

    pub(crate) fn runtime_error(&mut self, detail: RuntimeErrorDetail, location: &Location) -> Signal {
        self.add_error(BrsError::runtime(detail, location.clone()))
    }

    pub(crate) fn output_column(&self) -> usize {
        self.output_column
    }

    pub(crate) fn uptime_ms(&self) -> i128 {
        self.platform.now_ms() - self.started_ms
    }

    pub(crate) fn write_stderr(&self, text: &str) {
        self.platform.write_stderr(text);
    }

    fn advance_column(&mut self, text: &str) {
        match text.rfind('\n') {
            Some(index) => self.output_column = text[index + 1..].chars().count(),
            None => self.output_column += text.chars().count(),
        }
    }

    /// Runs `f` in a fresh call frame and restores the caller's frame afterwards.
    fn in_sub_env<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> RuntimeResult<T>,
    ) -> RuntimeResult<T> {
        let child = self.env.create_sub_environment();
        let saved = std::mem::replace(&mut self.env, child);
        let result = f(self);
        self.env = saved;
        result
    }

    /// Polls the suspension provider before a statement.
    fn check_suspension(&mut self, statement: &Statement) -> RuntimeResult<()> {
        match self.suspension.poll(self.debug_mode) {
            DebugCommand::Continue => Ok(()),
            DebugCommand::Break => {
                self.debug_mode = true;
                if matches!(statement, Statement::Block(_)) {
                    return Ok(());
                }
                self.enter_debugger(statement.location(), statement.describe(), None)
            }
            DebugCommand::Exit => {
                tracing::debug!(location = %statement.location(), "debugger requested exit");
                self.options.stop_on_crash = false;
                Err(Signal::DebugExit(statement.location().clone()))
            }
        }
    }

    fn enter_debugger(
        &mut self,
        location: &Location,
        statement: &str,
        error: Option<&BrsError>,
    ) -> RuntimeResult<()> {
        let context = BreakContext {
            location,
            statement,
            backtrace: self.format_backtrace(location),
            variables: self.env.list(Scope::Function),
            error,
        };
        match self.debugger.on_break(&context) {
            DebugAction::Continue => {
                tracing::debug!(%location, "debugger continue");
                self.debug_mode = false;
                Ok(())
            }
            DebugAction::Step => Ok(()),
            DebugAction::Exit => {
                tracing::debug!(%location, "debugger exit");
                self.options.stop_on_crash = false;
                Err(Signal::DebugExit(location.clone()))
            }
        }
    }

    /// Hands an uncaught runtime error to the debugger once when `stop_on_crash` is set.
    fn crash_break(&mut self, signal: Signal) -> Signal {
        let Signal::Error(error) = signal else {
            return signal;
        };
        if self.try_mode || !self.options.stop_on_crash || !error.is_runtime() {
            return Signal::Error(error);
        }
        self.options.stop_on_crash = false;
        let location = self.location.clone();
        match self.enter_debugger(&location, "crash", Some(error.as_ref())) {
            Err(exit) => exit,
            Ok(()) => Signal::Error(error),
        }
    }

    /// Converts a loop or goto signal that left its function into the matching error.
    fn escaped_signal(&mut self, signal: Signal) -> Signal {
        let (detail, location) = match signal {
            Signal::ExitFor(location) => (RuntimeErrorDetail::ExitForWithoutFor, location),
            Signal::ExitWhile(location) => (RuntimeErrorDetail::ExitWhileWithoutWhile, location),
            Signal::ContinueFor(location) => (RuntimeErrorDetail::ContinueForWithoutFor, location),
            Signal::ContinueWhile(location) => {
                (RuntimeErrorDetail::ContinueWhileWithoutWhile, location)
            }
            Signal::Goto { location, .. } => (RuntimeErrorDetail::MissingLineNumber, location),
            other => return other,
        };
        self.runtime_error(detail, &location)
    }
}
