use brs_lang::config::ExecutionOptions;
use brs_lang::diagnostics::{
    emit_syntax_errors, install_tracing, report_io_error, report_runtime_error,
};
use brs_lang::language::parser::parse;
use brs_lang::runtime::debug::ConsoleDebugger;
use brs_lang::runtime::Interpreter;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;

const USAGE: &str = "Usage: brs-lang [run|check|debug] <file.brs>";

/// Deep BrightScript recursion maps onto native recursion in the evaluator.
const INTERPRETER_STACK_BYTES: usize = 256 * 1024 * 1024;

fn main() -> ExitCode {
    install_tracing();
    let args: Vec<String> = env::args().collect();

    if args.len() != 3 {
        eprintln!("{}", USAGE);
        return ExitCode::FAILURE;
    }

    let command = args[1].clone();
    let path = PathBuf::from(&args[2]);

    if path.extension().and_then(|ext| ext.to_str()) != Some("brs") {
        eprintln!("Invalid file extension. Only .brs files are allowed.");
        return ExitCode::FAILURE;
    }

    match command.as_str() {
        "check" => check(&path),
        "run" | "debug" => {
            let debug = command == "debug";
            let worker = thread::Builder::new()
                .name("brs-interpreter".into())
                .stack_size(INTERPRETER_STACK_BYTES)
                .spawn(move || run(&path, debug));
            match worker.map(|handle| handle.join()) {
                Ok(Ok(code)) => code,
                _ => {
                    eprintln!("Interpreter thread terminated unexpectedly.");
                    ExitCode::FAILURE
                }
            }
        }
        _ => {
            eprintln!("Invalid command. {}", USAGE);
            ExitCode::FAILURE
        }
    }
}

fn read_source(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(source) => Some(source),
        Err(err) => {
            report_io_error(path, &err);
            None
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn check(path: &Path) -> ExitCode {
    let Some(source) = read_source(path) else {
        return ExitCode::FAILURE;
    };
    match parse(&file_name(path), &source) {
        Ok(statements) => {
            tracing::debug!(statements = statements.len(), "parsed {}", path.display());
            ExitCode::SUCCESS
        }
        Err(errors) => {
            emit_syntax_errors(path, &source, &errors);
            ExitCode::FAILURE
        }
    }
}

fn run(path: &Path, debug: bool) -> ExitCode {
    let mut options = match ExecutionOptions::from_env() {
        Ok(options) => options,
        Err(err) => {
            eprintln!("Invalid configuration: {}", err);
            return ExitCode::FAILURE;
        }
    };
    if options.root_dir.is_none() {
        options.root_dir = path.parent().map(Path::to_path_buf);
    }

    let Some(source) = read_source(path) else {
        return ExitCode::FAILURE;
    };
    let statements = match parse(&file_name(path), &source) {
        Ok(statements) => statements,
        Err(errors) => {
            emit_syntax_errors(path, &source, &errors);
            return ExitCode::FAILURE;
        }
    };

    // the console debugger also takes over uncaught runtime errors
    options.stop_on_crash |= debug;
    let mut interpreter = Interpreter::new(options);
    if debug {
        interpreter.set_debugger(Box::new(ConsoleDebugger::stdio()));
    }
    match interpreter.exec(&statements, Vec::new()) {
        Ok(outcome) => {
            tracing::debug!(reason = ?outcome.reason, "run finished");
            ExitCode::SUCCESS
        }
        Err(failure) => {
            report_runtime_error(&failure);
            ExitCode::FAILURE
        }
    }
}
