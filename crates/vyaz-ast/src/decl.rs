//! Declaration definitions for the AST

use super::*;
use std::fmt;

/// Top-level declaration
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    /// Function declaration
    Function(FunctionDecl),

    /// Class declaration
    Class(ClassDecl),

    /// Interface declaration
    Interface(InterfaceDecl),

    /// Type alias declaration
    TypeAlias(TypeAliasDecl),

    /// Variable declaration
    Var(VarDecl),
}

impl Decl {
    /// Interfaces and aliases exist only for the checker.
    pub fn is_type_only(&self) -> bool {
        matches!(self, Decl::Interface(_) | Decl::TypeAlias(_))
    }

    /// Names this declaration binds in its scope.
    pub fn declared_names(&self) -> Vec<&str> {
        match self {
            Decl::Function(f) => vec![f.name.value.name.as_str()],
            Decl::Class(c) => vec![c.name.value.name.as_str()],
            Decl::Interface(i) => vec![i.name.value.name.as_str()],
            Decl::TypeAlias(t) => vec![t.name.value.name.as_str()],
            Decl::Var(v) => v
                .declarations
                .iter()
                .flat_map(|d| d.pattern.value.bound_names())
                .collect(),
        }
    }
}

/// Function declaration
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Node<Ident>,
    pub type_params: Option<Vec<TypeParam>>,
    pub params: Vec<Param>,
    pub return_type: Option<Box<Node<Type>>>,
    pub body: Option<Node<BlockStmt>>,
    pub is_async: bool,
}

/// Function parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub pattern: Node<Pattern>,
    pub type_annotation: Option<Box<Node<Type>>>,
    pub default: Option<Node<Expr>>,
    pub optional: bool,
    pub is_rest: bool,
    /// Constructor parameter property: `конструктор(приватный x: число)`
    pub property: Option<ParamProperty>,
}

impl Param {
    /// A parameter that may be left out of a call.
    pub fn is_omittable(&self) -> bool {
        self.optional || self.default.is_some() || self.is_rest
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamProperty {
    pub access: AccessModifier,
    pub readonly: bool,
}

/// Class declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: Node<Ident>,
    pub type_params: Option<Vec<TypeParam>>,
    pub extends: Option<ClassExtends>,
    pub implements: Vec<Node<Type>>,
    pub members: Vec<ClassMember>,
    pub is_abstract: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassExtends {
    pub base: Box<Node<Expr>>,
    pub type_args: Option<Vec<Node<Type>>>,
}

/// Class member
#[derive(Debug, Clone, PartialEq)]
pub enum ClassMember {
    /// Constructor
    Constructor {
        params: Vec<Param>,
        body: Option<Node<BlockStmt>>,
        access: AccessModifier,
        span: Span,
    },

    /// Method
    Method {
        name: PropertyName,
        type_params: Option<Vec<TypeParam>>,
        params: Vec<Param>,
        return_type: Option<Box<Node<Type>>>,
        body: Option<Node<BlockStmt>>,
        access: AccessModifier,
        is_static: bool,
        is_async: bool,
        is_abstract: bool,
        is_optional: bool,
        span: Span,
    },

    /// Property/field
    Property {
        name: PropertyName,
        type_annotation: Option<Box<Node<Type>>>,
        init: Option<Node<Expr>>,
        access: AccessModifier,
        is_static: bool,
        is_readonly: bool,
        is_abstract: bool,
        is_optional: bool,
        span: Span,
    },

    /// Getter
    Getter {
        name: PropertyName,
        return_type: Option<Box<Node<Type>>>,
        body: Option<Node<BlockStmt>>,
        access: AccessModifier,
        is_static: bool,
        span: Span,
    },

    /// Setter
    Setter {
        name: PropertyName,
        param: Param,
        body: Option<Node<BlockStmt>>,
        access: AccessModifier,
        is_static: bool,
        span: Span,
    },
}

impl ClassMember {
    pub fn span(&self) -> Span {
        match self {
            ClassMember::Constructor { span, .. }
            | ClassMember::Method { span, .. }
            | ClassMember::Property { span, .. }
            | ClassMember::Getter { span, .. }
            | ClassMember::Setter { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccessModifier {
    #[default]
    Public,
    Private,
    Protected,
}

/// Interface declaration
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDecl {
    pub name: Node<Ident>,
    pub type_params: Option<Vec<TypeParam>>,
    pub extends: Vec<Node<Type>>,
    pub members: Vec<ObjectTypeMember>,
}

/// Type alias declaration
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAliasDecl {
    pub name: Node<Ident>,
    pub type_params: Option<Vec<TypeParam>>,
    pub ty: Node<Type>,
}

impl fmt::Display for AccessModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessModifier::Public => write!(f, "публичный"),
            AccessModifier::Private => write!(f, "приватный"),
            AccessModifier::Protected => write!(f, "защищенный"),
        }
    }
}
