//! Type checking errors

use thiserror::Error;
use vyaz_ast::{AccessModifier, Diagnostic, DiagnosticCode, Severity, Span};

use crate::types::Type;

/// Type error kinds
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeErrorKind {
    #[error("type '{found}' is not assignable to type '{expected}'{}", detail_suffix(.detail))]
    NotAssignable {
        expected: Type,
        found: Type,
        detail: Option<String>,
    },

    #[error("cannot find name '{0}'")]
    UndefinedVariable(String),

    #[error("cannot find type '{0}'")]
    UndefinedType(String),

    #[error("duplicate declaration of '{0}'")]
    DuplicateDeclaration(String),

    #[error("cannot assign to '{0}' because it is a constant")]
    AssignToConst(String),

    #[error("cannot assign to '{0}' because it is a read-only property")]
    ReadonlyAssignment(String),

    #[error("expected {expected} arguments, but got {found}")]
    ArityMismatch { expected: String, found: usize },

    #[error("generic type '{name}' requires {expected} type arguments, but got {found}")]
    TypeArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("property '{property}' does not exist on type '{ty}'")]
    PropertyNotFound { ty: Type, property: String },

    #[error("property '{property}' is {access} and only accessible within class '{class}'{}", protected_suffix(.access))]
    InaccessibleMember {
        property: String,
        access: AccessModifier,
        class: String,
    },

    #[error("this expression of type '{0}' is not callable")]
    NotCallable(Type),

    #[error("this expression of type '{0}' is not constructable")]
    NotConstructable(Type),

    #[error("type '{0}' cannot be indexed")]
    NotIndexable(Type),

    #[error("operator '{op}' cannot be applied to types '{left}' and '{right}'")]
    InvalidOperator { op: String, left: Type, right: Type },

    #[error("operator '{op}' cannot be applied to type '{ty}'")]
    InvalidUnaryOperator { op: String, ty: Type },

    #[error("cannot create an instance of abstract class '{0}'")]
    AbstractInstantiation(String),

    #[error("non-abstract class '{class}' does not implement abstract member '{member}'")]
    MissingAbstractMember { class: String, member: String },

    #[error("class '{class}' incorrectly implements interface '{interface}': {detail}")]
    IncorrectImplementation {
        class: String,
        interface: String,
        detail: String,
    },

    #[error("'{0}' implicitly has type 'любой'")]
    ImplicitAny(String),

    #[error("object is possibly '{0}'")]
    PossiblyNullish(Type),

    #[error("this condition compares 'типа' with '{0}', which it never returns")]
    InvalidTypeofTag(String),

    /// Generic error message
    #[error("{0}")]
    Generic(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail.as_ref().map(|d| format!(": {}", d)).unwrap_or_default()
}

fn protected_suffix(access: &AccessModifier) -> &'static str {
    match access {
        AccessModifier::Protected => " and its subclasses",
        _ => "",
    }
}

impl TypeErrorKind {
    /// Gaps in type information rather than contradictions. They are
    /// warnings unless checking is strict.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            TypeErrorKind::ImplicitAny(_)
                | TypeErrorKind::PossiblyNullish(_)
                | TypeErrorKind::InvalidTypeofTag(_)
        )
    }
}

/// Type error with location information
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}")]
pub struct TypeError {
    pub kind: TypeErrorKind,
    pub span: Span,
}

impl TypeError {
    pub fn new(kind: TypeErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn into_diagnostic(self, strict: bool) -> Diagnostic {
        let severity = if self.kind.is_soft() && !strict {
            Severity::Warning
        } else {
            Severity::Error
        };
        Diagnostic {
            severity,
            code: DiagnosticCode::TypeError,
            message: self.kind.to_string(),
            span: self.span,
        }
    }
}
