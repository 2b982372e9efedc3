//! Internal type representation

use std::collections::HashMap;
use std::fmt;

use vyaz_ast::format_number;

/// Internal type representation used by the type checker
#[derive(Debug, Clone)]
pub enum Type {
    /// Primitive types
    Number,
    String,
    Boolean,
    Void,
    Null,
    Undefined,
    Any,
    Unknown,
    Never,

    /// Type of an expression whose error was already reported. It is
    /// assignable to and from everything so one mistake reports once.
    Error,

    /// Literal type
    Literal(LiteralType),

    /// Array type
    Array(Box<Type>),

    /// Union type; equality ignores member order, display keeps it
    Union(Vec<Type>),

    /// Function type
    Function(FunctionSig),

    /// Structural object type
    Object(Vec<PropertySig>),

    /// Reference to a declared interface, alias or class instance type.
    /// Expanded on demand so declarations may refer to each other.
    Named { name: String, args: Vec<Type> },

    /// Generic type parameter, opaque inside its declaration
    Generic(String),

    /// The constructor value of a class
    Class(String),

    /// Promise type wrapping the resolved value type
    Promise(Box<Type>),
}

/// Literal types
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralType {
    String(String),
    Number(f64),
    Boolean(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSig {
    pub type_params: Vec<TypeParamInfo>,
    pub params: Vec<ParamSig>,
    pub ret: Box<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSig {
    pub name: String,
    pub ty: Type,
    pub optional: bool,
    pub rest: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertySig {
    pub name: String,
    pub ty: Type,
    pub optional: bool,
    pub readonly: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeParamInfo {
    pub name: String,
    pub constraint: Option<Type>,
    pub default: Option<Type>,
}

impl FunctionSig {
    pub fn new(params: Vec<ParamSig>, ret: Type) -> Self {
        Self {
            type_params: Vec::new(),
            params,
            ret: Box::new(ret),
        }
    }

    /// Number of arguments a call must supply.
    pub fn required_params(&self) -> usize {
        self.params
            .iter()
            .take_while(|p| !p.optional && !p.rest)
            .count()
    }

    pub fn has_rest(&self) -> bool {
        self.params.last().is_some_and(|p| p.rest)
    }

    /// Parameter type expected at argument position `index`.
    pub fn param_type_at(&self, index: usize) -> Option<Type> {
        match self.params.get(index) {
            Some(param) if param.rest => Some(param.ty.element_type()),
            Some(param) => Some(param.ty.clone()),
            None => match self.params.last() {
                Some(last) if last.rest => Some(last.ty.element_type()),
                _ => None,
            },
        }
    }
}

impl ParamSig {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
            rest: false,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn rest(mut self) -> Self {
        self.rest = true;
        self
    }
}

impl PropertySig {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
            readonly: false,
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Number, Type::Number)
            | (Type::String, Type::String)
            | (Type::Boolean, Type::Boolean)
            | (Type::Void, Type::Void)
            | (Type::Null, Type::Null)
            | (Type::Undefined, Type::Undefined)
            | (Type::Any, Type::Any)
            | (Type::Unknown, Type::Unknown)
            | (Type::Never, Type::Never)
            | (Type::Error, Type::Error) => true,
            (Type::Literal(a), Type::Literal(b)) => a == b,
            (Type::Array(a), Type::Array(b)) | (Type::Promise(a), Type::Promise(b)) => a == b,
            (Type::Union(a), Type::Union(b)) => {
                a.len() == b.len() && a.iter().all(|t| b.contains(t)) && b.iter().all(|t| a.contains(t))
            }
            (Type::Function(a), Type::Function(b)) => a == b,
            (Type::Object(a), Type::Object(b)) => a == b,
            (
                Type::Named { name: n1, args: a1 },
                Type::Named { name: n2, args: a2 },
            ) => n1 == n2 && a1 == a2,
            (Type::Generic(a), Type::Generic(b)) | (Type::Class(a), Type::Class(b)) => a == b,
            _ => false,
        }
    }
}

impl Type {
    /// Builds a union: nested unions are flattened, duplicates and `никогда`
    /// members dropped, and single-member unions collapsed.
    pub fn union(types: impl IntoIterator<Item = Type>) -> Type {
        let mut members: Vec<Type> = Vec::new();
        for ty in types {
            let flattened = match ty {
                Type::Union(inner) => inner,
                other => vec![other],
            };
            for member in flattened {
                match member {
                    Type::Never => {}
                    Type::Any => return Type::Any,
                    Type::Error => return Type::Error,
                    member if !members.contains(&member) => members.push(member),
                    _ => {}
                }
            }
        }

        match members.len() {
            0 => Type::Never,
            1 => members.remove(0),
            _ => Type::Union(members),
        }
    }

    /// The members of a union, or the type itself.
    pub fn members(&self) -> &[Type] {
        match self {
            Type::Union(members) => members,
            other => std::slice::from_ref(other),
        }
    }

    /// Replaces literal types by their primitive, deeply through arrays,
    /// objects and unions. Used where a binding can later hold other values.
    pub fn widen(&self) -> Type {
        match self {
            Type::Literal(LiteralType::String(_)) => Type::String,
            Type::Literal(LiteralType::Number(_)) => Type::Number,
            Type::Literal(LiteralType::Boolean(_)) => Type::Boolean,
            Type::Union(members) => Type::union(members.iter().map(Type::widen)),
            Type::Array(elem) => Type::Array(Box::new(elem.widen())),
            Type::Object(props) => Type::Object(
                props
                    .iter()
                    .map(|p| PropertySig {
                        ty: p.ty.widen(),
                        ..p.clone()
                    })
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// True for `любой` and the error sentinel, which never produce diagnostics.
    pub fn is_permissive(&self) -> bool {
        matches!(self, Type::Any | Type::Error)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Type::Null | Type::Undefined | Type::Void)
    }

    /// True when some member of the type is `пусто` or `неопределено`.
    pub fn contains_nullish(&self) -> bool {
        self.members().iter().any(Type::is_nullish)
    }

    /// The type with `пусто` and `неопределено` removed.
    pub fn non_nullish(&self) -> Type {
        match self {
            Type::Union(members) => {
                Type::union(members.iter().filter(|m| !m.is_nullish()).cloned())
            }
            other => other.clone(),
        }
    }

    pub fn is_number_like(&self) -> bool {
        matches!(self, Type::Number | Type::Literal(LiteralType::Number(_)))
    }

    pub fn is_string_like(&self) -> bool {
        matches!(self, Type::String | Type::Literal(LiteralType::String(_)))
    }

    /// Element type when iterating: array elements, string characters.
    pub fn element_type(&self) -> Type {
        match self {
            Type::Array(elem) => (**elem).clone(),
            Type::Error => Type::Error,
            ty if ty.is_string_like() => Type::String,
            _ => Type::Any,
        }
    }

    /// `T` for `Обещание<T>`.
    pub fn promise_inner(&self) -> Option<&Type> {
        match self {
            Type::Promise(inner) => Some(inner),
            _ => None,
        }
    }

    /// Replaces generic parameters by the types bound in `map`.
    pub fn substitute(&self, map: &HashMap<String, Type>) -> Type {
        if map.is_empty() {
            return self.clone();
        }
        match self {
            Type::Generic(name) => map.get(name).cloned().unwrap_or_else(|| self.clone()),
            Type::Array(elem) => Type::Array(Box::new(elem.substitute(map))),
            Type::Promise(inner) => Type::Promise(Box::new(inner.substitute(map))),
            Type::Union(members) => Type::union(members.iter().map(|m| m.substitute(map))),
            Type::Function(sig) => Type::Function(sig.substitute(map)),
            Type::Object(props) => Type::Object(
                props
                    .iter()
                    .map(|p| PropertySig {
                        ty: p.ty.substitute(map),
                        ..p.clone()
                    })
                    .collect(),
            ),
            Type::Named { name, args } => Type::Named {
                name: name.clone(),
                args: args.iter().map(|a| a.substitute(map)).collect(),
            },
            other => other.clone(),
        }
    }
}

impl FunctionSig {
    pub fn substitute(&self, map: &HashMap<String, Type>) -> FunctionSig {
        // Parameters of this signature shadow outer bindings with the same name.
        let mut inner = map.clone();
        for tp in &self.type_params {
            inner.remove(&tp.name);
        }
        FunctionSig {
            type_params: self.type_params.clone(),
            params: self
                .params
                .iter()
                .map(|p| ParamSig {
                    ty: p.ty.substitute(&inner),
                    ..p.clone()
                })
                .collect(),
            ret: Box::new(self.ret.substitute(&inner)),
        }
    }
}

impl fmt::Display for LiteralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralType::String(s) => write!(f, "\"{}\"", s),
            LiteralType::Number(n) => write!(f, "{}", format_number(*n)),
            LiteralType::Boolean(true) => write!(f, "истина"),
            LiteralType::Boolean(false) => write!(f, "ложь"),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Number => write!(f, "число"),
            Type::String => write!(f, "строка"),
            Type::Boolean => write!(f, "логический"),
            Type::Void => write!(f, "пустота"),
            Type::Null => write!(f, "пусто"),
            Type::Undefined => write!(f, "неопределено"),
            Type::Any | Type::Error => write!(f, "любой"),
            Type::Unknown => write!(f, "неизвестно"),
            Type::Never => write!(f, "никогда"),
            Type::Literal(lit) => write!(f, "{}", lit),
            Type::Array(elem) => match **elem {
                Type::Union(_) | Type::Function(_) => write!(f, "({})[]", elem),
                _ => write!(f, "{}[]", elem),
            },
            Type::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", member)?;
                }
                Ok(())
            }
            Type::Function(sig) => write!(f, "{}", sig),
            Type::Object(props) => {
                if props.is_empty() {
                    return write!(f, "{{}}");
                }
                write!(f, "{{ ")?;
                for (i, prop) in props.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    let readonly = if prop.readonly { "толькочтение " } else { "" };
                    let optional = if prop.optional { "?" } else { "" };
                    write!(f, "{}{}{}: {}", readonly, prop.name, optional, prop.ty)?;
                }
                write!(f, " }}")
            }
            Type::Named { name, args } => {
                write!(f, "{}", name)?;
                write_type_args(f, args)
            }
            Type::Generic(name) => write!(f, "{}", name),
            Type::Class(name) => write!(f, "типа {}", name),
            Type::Promise(inner) => write!(f, "Обещание<{}>", inner),
        }
    }
}

impl fmt::Display for FunctionSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.type_params.is_empty() {
            let names: Vec<&str> = self.type_params.iter().map(|tp| tp.name.as_str()).collect();
            write!(f, "<{}>", names.join(", "))?;
        }
        write!(f, "(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            let rest = if param.rest { "..." } else { "" };
            let optional = if param.optional { "?" } else { "" };
            write!(f, "{}{}{}: {}", rest, param.name, optional, param.ty)?;
        }
        write!(f, ") => {}", self.ret)
    }
}

fn write_type_args(f: &mut fmt::Formatter<'_>, args: &[Type]) -> fmt::Result {
    if args.is_empty() {
        return Ok(());
    }
    write!(f, "<")?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", arg)?;
    }
    write!(f, ">")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_equality_ignores_order() {
        let a = Type::union(vec![Type::String, Type::Number]);
        let b = Type::union(vec![Type::Number, Type::String]);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "строка | число");
        assert_eq!(b.to_string(), "число | строка");
    }

    #[test]
    fn test_union_flattens_and_collapses() {
        let nested = Type::union(vec![
            Type::Number,
            Type::union(vec![Type::Number, Type::Null]),
            Type::Never,
        ]);
        assert_eq!(nested, Type::Union(vec![Type::Number, Type::Null]));
        assert_eq!(Type::union(vec![Type::String]), Type::String);
        assert_eq!(Type::union(Vec::new()), Type::Never);
    }

    #[test]
    fn test_widen_and_nullish() {
        let ty = Type::union(vec![
            Type::Literal(LiteralType::Number(1.0)),
            Type::Literal(LiteralType::Number(2.0)),
            Type::Null,
        ]);
        assert_eq!(ty.widen(), Type::Union(vec![Type::Number, Type::Null]));
        assert!(ty.contains_nullish());
        assert_eq!(ty.widen().non_nullish(), Type::Number);
    }

    #[test]
    fn test_substitute_generic() {
        let mut map = HashMap::new();
        map.insert("Т".to_string(), Type::Number);
        let ty = Type::Array(Box::new(Type::Generic("Т".to_string())));
        assert_eq!(ty.substitute(&map), Type::Array(Box::new(Type::Number)));
    }

    #[test]
    fn test_display_function() {
        let sig = FunctionSig::new(
            vec![
                ParamSig::new("а", Type::Number),
                ParamSig::new("б", Type::String).optional(),
            ],
            Type::Void,
        );
        assert_eq!(Type::Function(sig).to_string(), "(а: число, б?: строка) => пустота");
    }
}
