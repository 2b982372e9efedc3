//! Parse error types

use vyaz_ast::{Diagnostic, DiagnosticCode, Span};

/// A grammar violation. Recorded once per defect by the statement-level
/// recovery loop and reported as a [`Diagnostic`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl From<ParseError> for Diagnostic {
    fn from(err: ParseError) -> Self {
        Diagnostic::error(DiagnosticCode::ParseError, err.message, err.span)
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
