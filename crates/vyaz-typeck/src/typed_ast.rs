//! Typed AST (output of type checking)

use std::collections::HashMap;

use vyaz_ast::{Expr, Node, Program, Span};

use crate::types::Type;

/// A checked program: the untouched AST plus the type inferred for each
/// expression, keyed by the expression's span.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedProgram {
    pub program: Program,
    pub expr_types: HashMap<Span, Type>,
}

impl TypedProgram {
    /// Wraps a program that was not checked.
    pub fn unchecked(program: Program) -> Self {
        Self {
            program,
            expr_types: HashMap::new(),
        }
    }

    pub fn type_of(&self, expr: &Node<Expr>) -> Option<&Type> {
        self.expr_types.get(&expr.span)
    }
}
