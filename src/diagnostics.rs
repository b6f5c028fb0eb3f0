use crate::{
    language::errors::{SyntaxError, SyntaxErrors},
    runtime::ExecFailure,
};
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use std::path::Path;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
pub struct SyntaxDiagnostic {
    #[source_code]
    src: NamedSource,
    #[label("{label}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
    label: String,
}

impl SyntaxDiagnostic {
    pub fn from_error(src: NamedSource, err: &SyntaxError) -> Self {
        Self {
            src,
            span: err.to_source_span(),
            help: err.help.clone(),
            message: err.message.clone(),
            label: format!("{}", err.location),
        }
    }
}

pub fn emit_syntax_errors(path: &Path, source: &str, errors: &SyntaxErrors) {
    for err in &errors.errors {
        let src = NamedSource::new(path.display().to_string(), source.to_string());
        let diagnostic = SyntaxDiagnostic::from_error(src, err);
        eprintln!("{:?}", Report::new(diagnostic));
    }
}

pub fn report_runtime_error(failure: &ExecFailure) {
    eprintln!("{}", failure.formatted);
}

pub fn report_io_error(path: &Path, error: &std::io::Error) {
    eprintln!("Failed to access {}: {}", path.display(), error);
}

/// Installs the fmt subscriber. `RUST_LOG` overrides the default `warn` level.
pub fn install_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
