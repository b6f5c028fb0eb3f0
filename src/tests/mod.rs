//! Script-level behavior tests: parse BrightScript source and run it on a
//! capture platform.

mod control_flow;
mod errors;
mod functions;
mod objects;
mod output;

use crate::config::ExecutionOptions;
use crate::language::parser::parse;
use crate::runtime::error::BrsError;
use crate::runtime::platform::CapturePlatform;
use crate::runtime::{ExecFailure, ExecOutcome, Interpreter};

pub(crate) struct ScriptRun {
    pub stdout: String,
    pub stderr: String,
    pub result: Result<ExecOutcome, ExecFailure>,
    pub errors: Vec<BrsError>,
}

impl ScriptRun {
    /// The uncaught error, panicking with the output when the run succeeded.
    pub fn failure(&self) -> &BrsError {
        match &self.result {
            Err(failure) => &failure.error,
            Ok(_) => panic!("expected the script to fail, stdout:\n{}", self.stdout),
        }
    }
}

pub(crate) fn run_with(options: ExecutionOptions, source: &str) -> ScriptRun {
    let statements = match parse("test.brs", source) {
        Ok(statements) => statements,
        Err(errors) => panic!("script should parse: {:?}", errors.errors),
    };
    let platform = CapturePlatform::new();
    let mut interpreter = Interpreter::with_platform(options, Box::new(platform.clone()));
    let result = interpreter.exec(&statements, Vec::new());
    ScriptRun {
        stdout: platform.stdout(),
        stderr: platform.stderr(),
        result,
        errors: interpreter.errors().to_vec(),
    }
}

pub(crate) fn run(source: &str) -> ScriptRun {
    run_with(ExecutionOptions::default(), source)
}

/// Runs a script that must succeed and returns what it printed.
pub(crate) fn output(source: &str) -> String {
    let run = run(source);
    if let Err(failure) = &run.result {
        panic!("script failed: {}\nstdout:\n{}", failure.formatted, run.stdout);
    }
    run.stdout
}
