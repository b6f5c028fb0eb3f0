use crate::language::span::{Location, Span};
use miette::SourceSpan;
use thiserror::Error;

#[derive(Clone, Debug, Error)]
#[error("{location}: {message}")]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
    pub location: Location,
    pub help: Option<String>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span, location: Location) -> Self {
        Self {
            message: message.into(),
            span,
            location,
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn to_source_span(&self) -> SourceSpan {
        (self.span.start, self.span.len()).into()
    }
}

#[derive(Clone, Debug, Error)]
#[error("{} syntax error(s)", errors.len())]
pub struct SyntaxErrors {
    pub errors: Vec<SyntaxError>,
}

impl SyntaxErrors {
    pub fn new(errors: Vec<SyntaxError>) -> Self {
        Self { errors }
    }
}
