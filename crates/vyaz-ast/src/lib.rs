//! # Vyaz AST
//!
//! Abstract Syntax Tree definitions for the Vyaz compiler.
//! The surface language uses Cyrillic keywords with optional static types;
//! every node carries a [`Span`] so diagnostics and source maps can point back
//! at the original text.

use serde::Serialize;
use std::fmt;

// =============================================================================
// Core Types (kept in lib.rs - used by all modules)
// =============================================================================

/// Source location information.
///
/// `start`/`end` are byte offsets; `line`/`column` are 1-based and describe
/// the first character of the span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Combines two spans; line/column follow whichever starts first.
    pub fn merge(&self, other: &Span) -> Span {
        let (line, column) = if other.start < self.start {
            (other.line, other.column)
        } else {
            (self.line, self.column)
        };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line,
            column,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// AST node wrapper that includes span information
#[derive(Debug, Clone, PartialEq)]
pub struct Node<T> {
    pub span: Span,
    pub value: T,
}

impl<T> Node<T> {
    pub fn new(value: T, span: Span) -> Self {
        Self { span, value }
    }
}

/// Identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    pub name: String,
}

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Source file extension used by the module resolver.
pub const SOURCE_EXTENSION: &str = "vz";

// =============================================================================
// Module Declarations
// =============================================================================

pub mod types;
pub mod expr;
pub mod stmt;
pub mod decl;
pub mod module;
pub mod diagnostic;

pub use types::*;
pub use expr::*;
pub use stmt::*;
pub use decl::*;
pub use module::*;
pub use diagnostic::*;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_span() -> Span {
        Span::new(0, 0, 1, 1)
    }

    #[test]
    fn test_span_merge_keeps_earliest_position() {
        let a = Span::new(10, 14, 2, 3);
        let b = Span::new(2, 5, 1, 3);
        let merged = a.merge(&b);
        assert_eq!(merged.start, 2);
        assert_eq!(merged.end, 14);
        assert_eq!((merged.line, merged.column), (1, 3));
        assert_eq!(merged.len(), 12);
    }

    #[test]
    fn test_basic_types() {
        assert_eq!(format!("{}", PrimitiveType::Number), "число");

        let array_type = Type::Array(Box::new(Node::new(
            Type::Primitive(PrimitiveType::String),
            dummy_span(),
        )));

        assert!(matches!(array_type, Type::Array(_)));
    }

    #[test]
    fn test_binary_op() {
        assert_eq!(format!("{}", BinaryOp::Add), "+");
        assert_eq!(format!("{}", BinaryOp::StrictEq), "===");
        assert_eq!(format!("{}", BinaryOp::InstanceOf), "instanceof");
    }

    #[test]
    fn test_var_decl() {
        let decl = VarDecl {
            kind: VarDeclKind::Let,
            declarations: vec![VarDeclarator {
                pattern: Node::new(
                    Pattern::Ident {
                        name: Node::new(Ident::new("икс"), dummy_span()),
                        type_annotation: None,
                    },
                    dummy_span(),
                ),
                init: Some(Node::new(Expr::Literal(Literal::Number(10.0)), dummy_span())),
            }],
        };

        assert_eq!(decl.kind, VarDeclKind::Let);
        assert_eq!(decl.declarations[0].pattern.value.bound_names(), vec!["икс"]);
    }

    #[test]
    fn test_import_sources_in_statement_order() {
        let import = |source: &str| {
            Node::new(
                ModuleItem::Import(ImportDecl {
                    specifiers: vec![],
                    source: source.to_string(),
                    source_span: dummy_span(),
                    type_only: false,
                }),
                dummy_span(),
            )
        };
        let reexport = Node::new(
            ModuleItem::Export(ExportDecl::All {
                source: "./c".to_string(),
                source_span: dummy_span(),
                as_name: None,
            }),
            dummy_span(),
        );
        let program = Program {
            items: vec![import("./b"), reexport, import("./a")],
            span: dummy_span(),
        };
        let sources: Vec<_> = program.import_sources().into_iter().map(|(s, _)| s).collect();
        assert_eq!(sources, vec!["./b", "./c", "./a"]);
    }

    #[test]
    fn test_type_only_import_is_not_a_runtime_dependency() {
        let program = Program {
            items: vec![Node::new(
                ModuleItem::Import(ImportDecl {
                    specifiers: vec![],
                    source: "./types".to_string(),
                    source_span: dummy_span(),
                    type_only: true,
                }),
                dummy_span(),
            )],
            span: dummy_span(),
        };
        assert_eq!(program.import_sources().len(), 1);
    }
}
