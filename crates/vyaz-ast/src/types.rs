//! Type definitions for the AST

use super::*;
use std::fmt;

/// Type expression
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Primitive types: число, строка, логический, пустота, пусто, неопределено, любой, никогда, неизвестно
    Primitive(PrimitiveType),

    /// Array type: T[] or Массив<T>
    Array(Box<Node<Type>>),

    /// Union type: T1 | T2 | ...
    Union(Vec<Node<Type>>),

    /// Function type: (args) => ReturnType
    Function(FunctionType),

    /// Type reference: SomeType<Args>
    TypeRef {
        name: Node<Ident>,
        type_args: Option<Vec<Node<Type>>>,
    },

    /// Object type: { prop1: Type1; prop2?: Type2 }
    Object(ObjectType),

    /// Literal type: "привет" | 42 | истина
    Literal(LiteralType),

    /// Parenthesized type
    Paren(Box<Node<Type>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Number,
    String,
    Boolean,
    Void,
    Null,
    Undefined,
    Any,
    Never,
    Unknown,
}

impl PrimitiveType {
    /// Maps a contextual type name (either spelling) to a primitive.
    pub fn from_name(name: &str) -> Option<PrimitiveType> {
        Some(match name {
            "число" | "number" => PrimitiveType::Number,
            "строка" | "string" => PrimitiveType::String,
            "логический" | "булево" | "boolean" => PrimitiveType::Boolean,
            "любой" | "any" => PrimitiveType::Any,
            "никогда" | "never" => PrimitiveType::Never,
            "неизвестно" | "unknown" => PrimitiveType::Unknown,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub type_params: Option<Vec<TypeParam>>,
    pub params: Vec<FunctionTypeParam>,
    pub return_type: Box<Node<Type>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionTypeParam {
    pub name: Option<Node<Ident>>,
    pub ty: Node<Type>,
    pub optional: bool,
    pub is_rest: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    pub members: Vec<ObjectTypeMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectTypeMember {
    Property {
        name: PropertyName,
        ty: Node<Type>,
        optional: bool,
        readonly: bool,
    },
    Method {
        name: PropertyName,
        type_params: Option<Vec<TypeParam>>,
        params: Vec<FunctionTypeParam>,
        return_type: Node<Type>,
        optional: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralType {
    String(String),
    Number(f64),
    Boolean(bool),
}

/// Type parameter (generic)
#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub name: Node<Ident>,
    pub constraint: Option<Box<Node<Type>>>,
    pub default: Option<Box<Node<Type>>>,
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveType::Number => write!(f, "число"),
            PrimitiveType::String => write!(f, "строка"),
            PrimitiveType::Boolean => write!(f, "логический"),
            PrimitiveType::Void => write!(f, "пустота"),
            PrimitiveType::Null => write!(f, "пусто"),
            PrimitiveType::Undefined => write!(f, "неопределено"),
            PrimitiveType::Any => write!(f, "любой"),
            PrimitiveType::Never => write!(f, "никогда"),
            PrimitiveType::Unknown => write!(f, "неизвестно"),
        }
    }
}
