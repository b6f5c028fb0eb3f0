//! Cooperative suspension between statements.
//!
//! The interpreter polls a [`SuspensionProvider`] before every statement that is
//! not a block. A `Break` hands a [`BreakContext`] to the installed
//! [`Debugger`], which decides whether to continue, single-step or abort the run.

use crate::language::span::Location;
use crate::runtime::error::BrsError;
use crate::runtime::value::{Object, Value};
use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebugCommand {
    Continue,
    Break,
    Exit,
}

pub trait SuspensionProvider {
    fn poll(&mut self, debug_mode: bool) -> DebugCommand;
}

const FLAG_NONE: u8 = 0;
const FLAG_BREAK: u8 = 1;
const FLAG_EXIT: u8 = 2;

/// Atomic flag a host thread can raise to pause or stop the interpreter.
#[derive(Clone, Default)]
pub struct SharedSuspension {
    flag: Arc<AtomicU8>,
}

impl SharedSuspension {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_break(&self) {
        self.flag.store(FLAG_BREAK, Ordering::SeqCst);
    }

    pub fn request_exit(&self) {
        self.flag.store(FLAG_EXIT, Ordering::SeqCst);
    }
}

impl SuspensionProvider for SharedSuspension {
    fn poll(&mut self, debug_mode: bool) -> DebugCommand {
        match self.flag.swap(FLAG_NONE, Ordering::SeqCst) {
            FLAG_EXIT => DebugCommand::Exit,
            FLAG_BREAK => DebugCommand::Break,
            _ if debug_mode => DebugCommand::Break,
            _ => DebugCommand::Continue,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebugAction {
    /// Leave debug mode and run freely.
    Continue,
    /// Stay in debug mode; break again before the next statement.
    Step,
    /// Unwind the whole run as a clean termination.
    Exit,
}

pub struct BreakContext<'a> {
    pub location: &'a Location,
    pub statement: &'a str,
    pub backtrace: String,
    pub variables: Vec<(String, Value)>,
    /// Set when the break comes from an uncaught runtime error.
    pub error: Option<&'a BrsError>,
}

pub trait Debugger {
    fn on_break(&mut self, context: &BreakContext<'_>) -> DebugAction;
}

/// Logs every break and keeps running.
#[derive(Default)]
pub struct ContinueDebugger;

impl Debugger for ContinueDebugger {
    fn on_break(&mut self, context: &BreakContext<'_>) -> DebugAction {
        match context.error {
            Some(error) => tracing::debug!(
                location = %context.location,
                errno = error.number(),
                "crash break: {}",
                error.message
            ),
            None => tracing::debug!(
                location = %context.location,
                statement = context.statement,
                "break"
            ),
        }
        DebugAction::Continue
    }
}

/// Interactive line-oriented debugger.
pub struct ConsoleDebugger {
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
}

const HELP: &str = "Commands:\r\n   \
    bt      Print backtrace of call function context frames\r\n   \
    cont|c  Continue script execution\r\n   \
    exit|q  Exit shell\r\n   \
    help    Print this list\r\n   \
    step|s  Step one program statement\r\n   \
    var     Display local variables and their types/values\r\n";

impl ConsoleDebugger {
    pub fn new(input: Box<dyn BufRead>, output: Box<dyn Write>) -> Self {
        Self { input, output }
    }

    pub fn stdio() -> Self {
        Self::new(
            Box::new(std::io::BufReader::new(std::io::stdin())),
            Box::new(std::io::stdout()),
        )
    }

    fn write(&mut self, text: &str) {
        let _ = self.output.write_all(text.as_bytes());
        let _ = self.output.flush();
    }
}

impl Debugger for ConsoleDebugger {
    fn on_break(&mut self, context: &BreakContext<'_>) -> DebugAction {
        match context.error {
            Some(error) => self.write(&format!(
                "{} (runtime error &h{:02x}) in {}\r\n",
                error.message,
                error.number(),
                context.location
            )),
            None => self.write(&format!(
                "BrightScript Micro Debugger.\r\nStopped at {} ({})\r\n",
                context.location, context.statement
            )),
        }
        loop {
            self.write("\r\nBrightScript Debugger> ");
            let mut line = String::new();
            match self.input.read_line(&mut line) {
                Ok(0) | Err(_) => return DebugAction::Continue,
                Ok(_) => {}
            }
            match line.trim().to_ascii_lowercase().as_str() {
                "" => {}
                "c" | "cont" => return DebugAction::Continue,
                "s" | "t" | "step" => return DebugAction::Step,
                "q" | "exit" => return DebugAction::Exit,
                "bt" => {
                    let backtrace = context.backtrace.clone();
                    self.write(&backtrace);
                }
                "var" => {
                    let listing = format_variables(&context.variables);
                    self.write(&listing);
                }
                "help" => self.write(HELP),
                other => self.write(&format!("Unknown command '{}'. Type help.\r\n", other)),
            }
        }
    }
}

/// Local variable listing in the device console layout.
pub fn format_variables(variables: &[(String, Value)]) -> String {
    let mut text = format!("{:<16} Interface:ifGlobal\r\n", "global");
    for (name, value) in variables {
        let description = match value {
            Value::String(s) => format!("String (VT_STR_CONST) val:\"{}\"", s),
            Value::Object(Object::Array(array)) => {
                format!("roArray refcnt={} count:{}", std::rc::Rc::strong_count(array), array.borrow().len())
            }
            Value::Object(Object::AssocArray(aa)) => format!(
                "roAssociativeArray refcnt={} count:{}",
                std::rc::Rc::strong_count(aa),
                aa.borrow().len()
            ),
            Value::Object(object) => format!("{} val:{}", object.component_name(), value),
            Value::Callable(callable) => format!("Function val:{}", callable.name),
            other => format!("{} val:{}", other.kind(), other),
        };
        text.push_str(&format!("{:<17}{}\r\n", name, description));
    }
    text
}
