//! Diagnostics shared by every compiler stage.
//!
//! Diagnostics are plain data: stages return them next to their best-effort
//! result instead of failing.

use super::Span;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Category of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticCode {
    LexError,
    ParseError,
    TypeError,
    ModuleNotFound,
    CircularDependency,
    UnsupportedFormat,
    ModuleRead,
    ExternalImport,
}

impl DiagnosticCode {
    /// Stable code printed next to rendered diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::LexError => "E0001",
            DiagnosticCode::ParseError => "E1000",
            DiagnosticCode::TypeError => "E2000",
            DiagnosticCode::ModuleNotFound => "E3000",
            DiagnosticCode::CircularDependency => "E3001",
            DiagnosticCode::UnsupportedFormat => "E3002",
            DiagnosticCode::ModuleRead => "E3003",
            DiagnosticCode::ExternalImport => "W3004",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            span,
        }
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            span,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(
            f,
            "{}:{}: {}[{}]: {}",
            self.span.line, self.span.column, level, self.code, self.message
        )
    }
}

/// True when any diagnostic is an error; warnings never fail a compile.
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}
