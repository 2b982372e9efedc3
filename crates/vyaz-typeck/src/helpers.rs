//! Helper methods for type checking

use std::collections::HashMap;

use vyaz_ast::{
    self as ast, AccessModifier, Expr, FunctionTypeParam, Ident, Literal, Node, ObjectTypeMember,
    PrimitiveType, PropertyName, Span, Stmt, TypeParam,
};

use crate::builtins;
use crate::checker::TypeChecker;
use crate::env::{ClassInfo, TypeDef};
use crate::error::TypeErrorKind;
use crate::types::{FunctionSig, LiteralType, ParamSig, PropertySig, Type, TypeParamInfo};

/// Guards lazy expansion of recursive aliases.
const MAX_EXPANSION_DEPTH: usize = 32;

/// Tags `типа` can produce at runtime.
const TYPEOF_TAGS: &[&str] = &[
    "string",
    "number",
    "boolean",
    "undefined",
    "object",
    "function",
    "symbol",
    "bigint",
];

/// Stateless conversions
pub struct TypeHelpers;

impl TypeHelpers {
    pub fn convert_primitive(prim: &PrimitiveType) -> Type {
        match prim {
            PrimitiveType::Number => Type::Number,
            PrimitiveType::String => Type::String,
            PrimitiveType::Boolean => Type::Boolean,
            PrimitiveType::Void => Type::Void,
            PrimitiveType::Null => Type::Null,
            PrimitiveType::Undefined => Type::Undefined,
            PrimitiveType::Any => Type::Any,
            PrimitiveType::Never => Type::Never,
            PrimitiveType::Unknown => Type::Unknown,
        }
    }

    pub fn convert_literal_type(lit: &ast::LiteralType) -> LiteralType {
        match lit {
            ast::LiteralType::String(s) => LiteralType::String(s.clone()),
            ast::LiteralType::Number(n) => LiteralType::Number(*n),
            ast::LiteralType::Boolean(b) => LiteralType::Boolean(*b),
        }
    }

    /// Type of a literal expression, before widening.
    pub fn literal_type(lit: &Literal) -> Type {
        match lit {
            Literal::Number(n) => Type::Literal(LiteralType::Number(*n)),
            Literal::String(s) => Type::Literal(LiteralType::String(s.clone())),
            Literal::Boolean(b) => Type::Literal(LiteralType::Boolean(*b)),
            Literal::Null => Type::Null,
            Literal::Undefined => Type::Undefined,
        }
    }

    pub fn property_key(name: &PropertyName) -> Option<String> {
        name.static_key()
    }

    pub fn is_valid_typeof_tag(tag: &str) -> bool {
        TYPEOF_TAGS.contains(&tag)
    }

    /// The tag `типа` returns for values of `ty`; `None` when any tag is possible.
    pub fn typeof_tag(ty: &Type) -> Option<&'static str> {
        match ty {
            Type::Number | Type::Literal(LiteralType::Number(_)) => Some("number"),
            Type::String | Type::Literal(LiteralType::String(_)) => Some("string"),
            Type::Boolean | Type::Literal(LiteralType::Boolean(_)) => Some("boolean"),
            Type::Undefined | Type::Void => Some("undefined"),
            Type::Function(_) | Type::Class(_) => Some("function"),
            Type::Null | Type::Array(_) | Type::Object(_) | Type::Named { .. } | Type::Promise(_) => {
                Some("object")
            }
            Type::Any | Type::Error | Type::Unknown | Type::Never | Type::Generic(_) | Type::Union(_) => {
                None
            }
        }
    }

    /// True when control never reaches the statement following `stmt`.
    /// With `allow_jumps`, leaving through `прервать`/`продолжить` counts.
    pub fn terminates(stmt: &Stmt, allow_jumps: bool) -> bool {
        match stmt {
            Stmt::Return(_) | Stmt::Throw(_) => true,
            Stmt::Break(_) | Stmt::Continue(_) => allow_jumps,
            Stmt::Block(block) => block
                .stmts
                .iter()
                .any(|s| Self::terminates(&s.value, allow_jumps)),
            Stmt::If {
                then_stmt,
                else_stmt: Some(else_stmt),
                ..
            } => {
                Self::terminates(&then_stmt.value, allow_jumps)
                    && Self::terminates(&else_stmt.value, allow_jumps)
            }
            Stmt::While { condition, body } => {
                matches!(condition.value, Expr::Literal(Literal::Boolean(true)))
                    && !Self::contains_break(&body.value)
            }
            Stmt::DoWhile { body, .. } => Self::terminates(&body.value, false),
            Stmt::Try {
                block,
                catch,
                finally,
            } => {
                let finally_exits = finally.as_ref().is_some_and(|f| {
                    f.value.stmts.iter().any(|s| Self::terminates(&s.value, allow_jumps))
                });
                let block_exits = block
                    .value
                    .stmts
                    .iter()
                    .any(|s| Self::terminates(&s.value, allow_jumps));
                let catch_exits = catch.as_ref().map_or(true, |c| {
                    c.body
                        .value
                        .stmts
                        .iter()
                        .any(|s| Self::terminates(&s.value, allow_jumps))
                });
                finally_exits || (block_exits && catch_exits)
            }
            Stmt::Switch { cases, .. } => {
                cases.iter().any(|c| c.test.is_none())
                    && cases.last().is_some_and(|c| !c.consequent.is_empty())
                    && cases.iter().all(|c| {
                        c.consequent.is_empty()
                            || c.consequent.iter().any(|s| Self::terminates(&s.value, false))
                    })
            }
            _ => false,
        }
    }

    /// Unlabeled `прервать` that leaves the given loop body.
    fn contains_break(stmt: &Stmt) -> bool {
        match stmt {
            Stmt::Break(None) => true,
            Stmt::Block(block) => block.stmts.iter().any(|s| Self::contains_break(&s.value)),
            Stmt::If {
                then_stmt,
                else_stmt,
                ..
            } => {
                Self::contains_break(&then_stmt.value)
                    || else_stmt
                        .as_ref()
                        .is_some_and(|e| Self::contains_break(&e.value))
            }
            Stmt::Try {
                block,
                catch,
                finally,
            } => {
                block.value.stmts.iter().any(|s| Self::contains_break(&s.value))
                    || catch.as_ref().is_some_and(|c| {
                        c.body.value.stmts.iter().any(|s| Self::contains_break(&s.value))
                    })
                    || finally.as_ref().is_some_and(|f| {
                        f.value.stmts.iter().any(|s| Self::contains_break(&s.value))
                    })
            }
            _ => false,
        }
    }

    /// Replaces a signature's own type parameters by `любой`.
    pub fn erase_type_params(sig: &FunctionSig) -> FunctionSig {
        if sig.type_params.is_empty() {
            return sig.clone();
        }
        let map: HashMap<String, Type> = sig
            .type_params
            .iter()
            .map(|tp| (tp.name.clone(), Type::Any))
            .collect();
        FunctionSig {
            type_params: Vec::new(),
            params: sig
                .params
                .iter()
                .map(|p| ParamSig {
                    ty: p.ty.substitute(&map),
                    ..p.clone()
                })
                .collect(),
            ret: Box::new(sig.ret.substitute(&map)),
        }
    }
}

/// Binds declared parameters to arguments, falling back to defaults.
pub(crate) fn bind_type_params(params: &[TypeParamInfo], args: &[Type]) -> HashMap<String, Type> {
    let mut map = HashMap::new();
    for (i, param) in params.iter().enumerate() {
        let ty = match args.get(i) {
            Some(arg) => arg.clone(),
            None => param
                .default
                .as_ref()
                .map(|d| d.substitute(&map))
                .unwrap_or(Type::Any),
        };
        map.insert(param.name.clone(), ty);
    }
    map
}

/// A resolved member.
#[derive(Debug, Clone)]
pub(crate) struct FoundMember {
    pub ty: Type,
    pub readonly: bool,
    /// Declaring class and access level, for class members
    pub owner: Option<(String, AccessModifier)>,
}

impl FoundMember {
    fn plain(ty: Type) -> Self {
        Self {
            ty,
            readonly: false,
            owner: None,
        }
    }
}

impl TypeChecker {
    /// Converts a type annotation, reporting unknown names.
    pub(crate) fn convert_type(&mut self, ty: &Node<ast::Type>) -> Type {
        match &ty.value {
            ast::Type::Primitive(prim) => TypeHelpers::convert_primitive(prim),
            ast::Type::Array(elem) => Type::Array(Box::new(self.convert_type(elem))),
            ast::Type::Union(members) => {
                let members: Vec<Type> = members.iter().map(|m| self.convert_type(m)).collect();
                Type::union(members)
            }
            ast::Type::Function(func) => {
                self.env.push_scope();
                let type_params = self.declare_type_params(func.type_params.as_deref());
                let params = self.convert_function_type_params(&func.params);
                let ret = self.convert_type(&func.return_type);
                self.env.pop_scope();
                Type::Function(FunctionSig {
                    type_params,
                    params,
                    ret: Box::new(ret),
                })
            }
            ast::Type::TypeRef { name, type_args } => {
                self.convert_type_ref(name, type_args.as_deref(), ty.span)
            }
            ast::Type::Object(object) => Type::Object(self.convert_type_members(&object.members)),
            ast::Type::Literal(lit) => Type::Literal(TypeHelpers::convert_literal_type(lit)),
            ast::Type::Paren(inner) => self.convert_type(inner),
        }
    }

    fn convert_function_type_params(&mut self, params: &[FunctionTypeParam]) -> Vec<ParamSig> {
        params
            .iter()
            .enumerate()
            .map(|(i, param)| {
                let name = param
                    .name
                    .as_ref()
                    .map(|n| n.value.name.clone())
                    .unwrap_or_else(|| format!("арг{}", i));
                ParamSig {
                    name,
                    ty: self.convert_type(&param.ty),
                    optional: param.optional,
                    rest: param.is_rest,
                }
            })
            .collect()
    }

    pub(crate) fn convert_type_members(&mut self, members: &[ObjectTypeMember]) -> Vec<PropertySig> {
        let mut props = Vec::new();
        for member in members {
            match member {
                ObjectTypeMember::Property {
                    name,
                    ty,
                    optional,
                    readonly,
                } => {
                    let Some(key) = TypeHelpers::property_key(name) else {
                        continue;
                    };
                    props.push(PropertySig {
                        name: key,
                        ty: self.convert_type(ty),
                        optional: *optional,
                        readonly: *readonly,
                    });
                }
                ObjectTypeMember::Method {
                    name,
                    type_params,
                    params,
                    return_type,
                    optional,
                } => {
                    let Some(key) = TypeHelpers::property_key(name) else {
                        continue;
                    };
                    self.env.push_scope();
                    let type_params = self.declare_type_params(type_params.as_deref());
                    let params = self.convert_function_type_params(params);
                    let ret = self.convert_type(return_type);
                    self.env.pop_scope();
                    props.push(PropertySig {
                        name: key,
                        ty: Type::Function(FunctionSig {
                            type_params,
                            params,
                            ret: Box::new(ret),
                        }),
                        optional: *optional,
                        readonly: false,
                    });
                }
            }
        }
        props
    }

    fn convert_type_ref(
        &mut self,
        name: &Node<Ident>,
        type_args: Option<&[Node<ast::Type>]>,
        span: Span,
    ) -> Type {
        let type_name = name.value.name.as_str();

        let params = match self.env.lookup_type(type_name) {
            Some(TypeDef::Param { .. }) => {
                if type_args.is_some_and(|args| !args.is_empty()) {
                    self.generic_error(format!("type '{}' is not generic", type_name), span);
                }
                return Type::Generic(type_name.to_string());
            }
            Some(TypeDef::Opaque) => {
                for arg in type_args.unwrap_or_default() {
                    self.convert_type(arg);
                }
                return Type::Any;
            }
            Some(TypeDef::Alias { params, .. }) => params.clone(),
            Some(TypeDef::Interface(info)) => info.params.clone(),
            Some(TypeDef::Class(info)) => info.params.clone(),
            None => return self.convert_builtin_type_ref(type_name, type_args, span),
        };

        let args = self.resolve_type_args(type_name, &params, type_args, span);
        Type::Named {
            name: type_name.to_string(),
            args,
        }
    }

    fn convert_builtin_type_ref(
        &mut self,
        name: &str,
        type_args: Option<&[Node<ast::Type>]>,
        span: Span,
    ) -> Type {
        let args: Vec<Type> = type_args
            .unwrap_or_default()
            .iter()
            .map(|arg| self.convert_type(arg))
            .collect();
        let single = |checker: &mut Self, args: Vec<Type>| {
            if args.len() > 1 {
                checker.report(
                    TypeErrorKind::TypeArgumentCount {
                        name: name.to_string(),
                        expected: 1,
                        found: args.len(),
                    },
                    span,
                );
            }
            args.into_iter().next().unwrap_or(Type::Any)
        };

        match name {
            "Обещание" | "Promise" => Type::Promise(Box::new(single(self, args))),
            "Массив" | "Array" => Type::Array(Box::new(single(self, args))),
            "Объект" | "Object" => Type::Object(Vec::new()),
            "Функция" | "Function" => Type::Any,
            _ => {
                self.report(TypeErrorKind::UndefinedType(name.to_string()), span);
                Type::Error
            }
        }
    }

    /// Converts the arguments of a generic reference, checking count and
    /// constraints. Missing trailing arguments take their defaults.
    pub(crate) fn resolve_type_args(
        &mut self,
        name: &str,
        params: &[TypeParamInfo],
        type_args: Option<&[Node<ast::Type>]>,
        span: Span,
    ) -> Vec<Type> {
        let nodes = type_args.unwrap_or_default();
        let converted: Vec<Type> = nodes.iter().map(|arg| self.convert_type(arg)).collect();

        let required = params.iter().filter(|p| p.default.is_none()).count();
        if converted.len() < required || converted.len() > params.len() {
            self.report(
                TypeErrorKind::TypeArgumentCount {
                    name: name.to_string(),
                    expected: params.len(),
                    found: converted.len(),
                },
                span,
            );
            return params.iter().map(|_| Type::Any).collect();
        }

        let map = bind_type_params(params, &converted);
        for (i, param) in params.iter().enumerate() {
            if let (Some(constraint), Some(arg), Some(node)) =
                (&param.constraint, converted.get(i), nodes.get(i))
            {
                let constraint = constraint.substitute(&map);
                self.check_assignable(arg, &constraint, node.span);
            }
        }

        params
            .iter()
            .map(|p| map.get(&p.name).cloned().unwrap_or(Type::Any))
            .collect()
    }

    /// Declares generic parameters in the current scope.
    pub(crate) fn declare_type_params(&mut self, params: Option<&[TypeParam]>) -> Vec<TypeParamInfo> {
        let params = params.unwrap_or_default();
        for param in params {
            self.env.define_type(
                param.name.value.name.clone(),
                TypeDef::Param { constraint: None },
            );
        }

        let mut infos = Vec::with_capacity(params.len());
        for param in params {
            let constraint = param.constraint.as_ref().map(|c| self.convert_type(c));
            let default = param.default.as_ref().map(|d| self.convert_type(d));
            self.env.define_type(
                param.name.value.name.clone(),
                TypeDef::Param {
                    constraint: constraint.clone(),
                },
            );
            infos.push(TypeParamInfo {
                name: param.name.value.name.clone(),
                constraint,
                default,
            });
        }
        infos
    }

    /// Resolves named types to their structure.
    pub(crate) fn expand(&self, ty: &Type) -> Type {
        self.expand_at(ty, 0)
    }

    fn expand_at(&self, ty: &Type, depth: usize) -> Type {
        if depth > MAX_EXPANSION_DEPTH {
            return Type::Any;
        }
        let Type::Named { name, args } = ty else {
            return ty.clone();
        };
        match self.env.lookup_type(name) {
            Some(TypeDef::Alias { params, ty }) => {
                let map = bind_type_params(params, args);
                self.expand_at(&ty.substitute(&map), depth + 1)
            }
            Some(TypeDef::Interface(info)) => {
                let map = bind_type_params(&info.params, args);
                let mut props: Vec<PropertySig> = info
                    .properties
                    .iter()
                    .map(|p| PropertySig {
                        ty: p.ty.substitute(&map),
                        ..p.clone()
                    })
                    .collect();
                for base in &info.extends {
                    if let Type::Object(base_props) = self.expand_at(&base.substitute(&map), depth + 1) {
                        for prop in base_props {
                            if !props.iter().any(|p| p.name == prop.name) {
                                props.push(prop);
                            }
                        }
                    }
                }
                Type::Object(props)
            }
            Some(TypeDef::Class(info)) => Type::Object(self.class_instance_props(info, args, depth)),
            Some(TypeDef::Param { constraint }) => constraint
                .as_ref()
                .map(|c| self.expand_at(c, depth + 1))
                .unwrap_or(Type::Unknown),
            Some(TypeDef::Opaque) | None => Type::Any,
        }
    }

    /// Public instance members of a class and its ancestors.
    fn class_instance_props(&self, info: &ClassInfo, args: &[Type], depth: usize) -> Vec<PropertySig> {
        let map = bind_type_params(&info.params, args);
        let mut props: Vec<PropertySig> = info
            .members
            .iter()
            .filter(|m| !m.is_static && m.access == AccessModifier::Public)
            .map(|m| PropertySig {
                name: m.name.clone(),
                ty: m.ty.substitute(&map),
                optional: m.optional,
                readonly: m.readonly,
            })
            .collect();
        if let Some(base @ Type::Named { .. }) = &info.extends {
            if let Type::Object(base_props) = self.expand_at(&base.substitute(&map), depth + 1) {
                for prop in base_props {
                    if !props.iter().any(|p| p.name == prop.name) {
                        props.push(prop);
                    }
                }
            }
        }
        props
    }

    pub(crate) fn is_assignable(&self, from: &Type, to: &Type) -> bool {
        self.assignable(from, to, 0)
    }

    fn assignable(&self, from: &Type, to: &Type, depth: usize) -> bool {
        if depth > MAX_EXPANSION_DEPTH {
            return true;
        }
        if from.is_permissive() || to.is_permissive() {
            return true;
        }
        if matches!(to, Type::Unknown) || matches!(from, Type::Never) || from == to {
            return true;
        }

        match (from, to) {
            (Type::Union(members), _) => members.iter().all(|m| self.assignable(m, to, depth + 1)),
            (Type::Boolean, Type::Union(members))
                if members.contains(&Type::Literal(LiteralType::Boolean(true)))
                    && members.contains(&Type::Literal(LiteralType::Boolean(false))) =>
            {
                true
            }
            (_, Type::Union(members)) => members.iter().any(|m| self.assignable(from, m, depth + 1)),
            (Type::Literal(lit), _) => match (lit, to) {
                (LiteralType::Number(_), Type::Number)
                | (LiteralType::String(_), Type::String)
                | (LiteralType::Boolean(_), Type::Boolean) => true,
                _ => self.assignable_structurally(from, to, depth),
            },
            (Type::Undefined, Type::Void) => true,
            (Type::Array(a), Type::Array(b)) | (Type::Promise(a), Type::Promise(b)) => {
                self.assignable(a, b, depth + 1)
            }
            (Type::Generic(name), _) => match self.env.lookup_type(name) {
                Some(TypeDef::Param {
                    constraint: Some(constraint),
                }) => self.assignable(constraint, to, depth + 1),
                _ => false,
            },
            (_, Type::Generic(_)) => false,
            (Type::Function(f), Type::Function(g)) => self.function_assignable(f, g, depth),
            (Type::Class(a), Type::Class(b)) => self.env.is_subclass_of(a, b),
            (Type::Named { name: a, args: a_args }, Type::Named { name: b, args: b_args })
                if a == b =>
            {
                a_args.len() == b_args.len()
                    && a_args
                        .iter()
                        .zip(b_args)
                        .all(|(x, y)| self.assignable(x, y, depth + 1))
            }
            (Type::Named { name: a, .. }, Type::Named { name: b, .. })
                if self.env.lookup_class(a).is_some()
                    && self.env.lookup_class(b).is_some()
                    && self.env.is_subclass_of(a, b) =>
            {
                true
            }
            _ => self.assignable_structurally(from, to, depth),
        }
    }

    fn function_assignable(&self, f: &FunctionSig, g: &FunctionSig, depth: usize) -> bool {
        let f = TypeHelpers::erase_type_params(f);
        let g = TypeHelpers::erase_type_params(g);
        if f.required_params() > g.params.len() && !g.has_rest() {
            return false;
        }
        for i in 0..f.params.len() {
            if let (Some(source), Some(target)) = (f.param_type_at(i), g.param_type_at(i)) {
                // Parameters are compared in either direction.
                if !self.assignable(&target, &source, depth + 1)
                    && !self.assignable(&source, &target, depth + 1)
                {
                    return false;
                }
            }
        }
        matches!(*g.ret, Type::Void) || self.assignable(&f.ret, &g.ret, depth + 1)
    }

    fn assignable_structurally(&self, from: &Type, to: &Type, depth: usize) -> bool {
        if from.is_nullish() {
            return false;
        }
        if let Type::Named { name, .. } = from {
            if matches!(self.env.lookup_type(name), Some(TypeDef::Alias { .. })) {
                return self.assignable(&self.expand_at(from, depth + 1), to, depth + 1);
            }
        }
        let props = match self.expand_at(to, depth + 1) {
            Type::Object(props) => props,
            expanded if matches!(to, Type::Named { .. }) && !matches!(expanded, Type::Named { .. }) => {
                return self.assignable(from, &expanded, depth + 1)
            }
            _ => return false,
        };
        if matches!(from, Type::Class(_)) && !props.is_empty() {
            return false;
        }
        props.iter().all(|prop| match self.lookup_member(from, &prop.name) {
            None => prop.optional,
            Some(found) => {
                let expected = if prop.optional {
                    Type::union(vec![prop.ty.clone(), Type::Undefined])
                } else {
                    prop.ty.clone()
                };
                self.assignable(&found.ty, &expected, depth + 1)
            }
        })
    }

    /// Explains why an object type is not assignable, naming the first
    /// offending property.
    pub(crate) fn assignability_detail(&self, from: &Type, to: &Type) -> Option<String> {
        if from.is_nullish() || matches!(to, Type::Union(_)) {
            return None;
        }
        let Type::Object(props) = self.expand(to) else {
            return None;
        };
        for prop in &props {
            match self.lookup_member(from, &prop.name) {
                None if !prop.optional => {
                    return Some(format!(
                        "property '{}' is missing in type '{}'",
                        prop.name, from
                    ))
                }
                Some(found) => {
                    let expected = if prop.optional {
                        Type::union(vec![prop.ty.clone(), Type::Undefined])
                    } else {
                        prop.ty.clone()
                    };
                    if !self.is_assignable(&found.ty, &expected) {
                        return Some(format!("types of property '{}' are incompatible", prop.name));
                    }
                }
                None => {}
            }
        }
        None
    }

    /// Reports `from` not being assignable to `to` at `span`.
    pub(crate) fn check_assignable(&mut self, from: &Type, to: &Type, span: Span) -> bool {
        if self.is_assignable(from, to) {
            return true;
        }
        let detail = self.assignability_detail(from, to);
        self.report(
            TypeErrorKind::NotAssignable {
                expected: to.clone(),
                found: from.clone(),
                detail,
            },
            span,
        );
        false
    }

    /// Finds a member without reporting anything.
    pub(crate) fn lookup_member(&self, ty: &Type, name: &str) -> Option<FoundMember> {
        self.lookup_member_at(ty, name, 0)
    }

    fn lookup_member_at(&self, ty: &Type, name: &str, depth: usize) -> Option<FoundMember> {
        if depth > MAX_EXPANSION_DEPTH {
            return Some(FoundMember::plain(Type::Any));
        }
        match ty {
            Type::Any | Type::Error => Some(FoundMember::plain(ty.clone())),
            Type::Union(members) => {
                let mut types = Vec::with_capacity(members.len());
                let mut readonly = false;
                for member in members {
                    let found = self.lookup_member_at(member, name, depth + 1)?;
                    readonly |= found.readonly;
                    types.push(found.ty);
                }
                Some(FoundMember {
                    ty: Type::union(types),
                    readonly,
                    owner: None,
                })
            }
            t if t.is_string_like() => builtins::string_member(name).map(FoundMember::plain),
            t if t.is_number_like() => builtins::number_member(name).map(FoundMember::plain),
            Type::Boolean | Type::Literal(LiteralType::Boolean(_)) => {
                builtins::universal_member(name).map(FoundMember::plain)
            }
            Type::Array(elem) => builtins::array_member(elem, name).map(FoundMember::plain),
            Type::Promise(inner) => builtins::promise_member(inner, name).map(FoundMember::plain),
            Type::Function(_) => builtins::function_member(name).map(FoundMember::plain),
            Type::Object(props) => match props.iter().find(|p| p.name == name) {
                Some(prop) => Some(FoundMember {
                    ty: if prop.optional {
                        Type::union(vec![prop.ty.clone(), Type::Undefined])
                    } else {
                        prop.ty.clone()
                    },
                    readonly: prop.readonly,
                    owner: None,
                }),
                None => builtins::universal_member(name).map(FoundMember::plain),
            },
            Type::Named { name: type_name, args } => match self.env.lookup_type(type_name) {
                Some(TypeDef::Class(info)) => self.lookup_class_member(info, args, name, false, depth),
                Some(TypeDef::Alias { .. }) | Some(TypeDef::Interface(_)) => {
                    let expanded = self.expand_at(ty, depth + 1);
                    self.lookup_member_at(&expanded, name, depth + 1)
                }
                _ => Some(FoundMember::plain(Type::Any)),
            },
            Type::Class(class_name) => match self.env.lookup_class(class_name) {
                Some(info) => self
                    .lookup_class_member(info, &[], name, true, depth)
                    .or_else(|| builtins::function_member(name).map(FoundMember::plain)),
                None => Some(FoundMember::plain(Type::Any)),
            },
            Type::Generic(param) => match self.env.lookup_type(param) {
                Some(TypeDef::Param {
                    constraint: Some(constraint),
                }) => self.lookup_member_at(constraint, name, depth + 1),
                _ => None,
            },
            _ => None,
        }
    }

    /// Walks the class chain for a member, substituting generic arguments.
    fn lookup_class_member(
        &self,
        info: &ClassInfo,
        args: &[Type],
        name: &str,
        is_static: bool,
        depth: usize,
    ) -> Option<FoundMember> {
        if depth > MAX_EXPANSION_DEPTH {
            return Some(FoundMember::plain(Type::Any));
        }
        let map = bind_type_params(&info.params, args);
        if let Some(member) = info.own_member(name, is_static) {
            let ty = member.ty.substitute(&map);
            return Some(FoundMember {
                ty: if member.optional {
                    Type::union(vec![ty, Type::Undefined])
                } else {
                    ty
                },
                readonly: member.readonly,
                owner: Some((info.name.clone(), member.access)),
            });
        }
        match &info.extends {
            Some(Type::Named {
                name: base,
                args: base_args,
            }) => {
                let base_info = self.env.lookup_class(base)?;
                let base_args: Vec<Type> = base_args.iter().map(|a| a.substitute(&map)).collect();
                self.lookup_class_member(base_info, &base_args, name, is_static, depth + 1)
            }
            Some(_) => Some(FoundMember::plain(Type::Any)),
            None => None,
        }
    }

    /// Constructor signature of a class instantiated with `args`, inherited
    /// when not declared. `None` when the class derives from something
    /// unchecked.
    pub(crate) fn constructor_of(&self, class_name: &str, args: &[Type]) -> Option<FunctionSig> {
        let mut current = self.env.lookup_class(class_name)?;
        let mut map = bind_type_params(&current.params, args);
        for _ in 0..MAX_EXPANSION_DEPTH {
            if let Some(ctor) = &current.ctor {
                return Some(ctor.substitute(&map));
            }
            match &current.extends {
                Some(Type::Named { name, args }) => {
                    let args: Vec<Type> = args.iter().map(|a| a.substitute(&map)).collect();
                    current = self.env.lookup_class(name)?;
                    map = bind_type_params(&current.params, &args);
                }
                Some(_) => return None,
                None => return Some(FunctionSig::new(Vec::new(), Type::Void)),
            }
        }
        None
    }

    /// Binds the generic parameters `names` by matching `param` against `arg`.
    pub(crate) fn infer_type_args(
        &self,
        param: &Type,
        arg: &Type,
        names: &[String],
        bindings: &mut HashMap<String, Type>,
    ) {
        self.infer_at(param, arg, names, bindings, 0);
    }

    fn infer_at(
        &self,
        param: &Type,
        arg: &Type,
        names: &[String],
        bindings: &mut HashMap<String, Type>,
        depth: usize,
    ) {
        if depth > MAX_EXPANSION_DEPTH || matches!(arg, Type::Error) {
            return;
        }
        match (param, arg) {
            (Type::Generic(name), _) if names.contains(name) => {
                if !bindings.contains_key(name) {
                    bindings.insert(name.clone(), arg.widen());
                }
            }
            (Type::Array(p), Type::Array(a)) | (Type::Promise(p), Type::Promise(a)) => {
                self.infer_at(p, a, names, bindings, depth + 1)
            }
            (Type::Union(members), _) => {
                let arg = arg.non_nullish();
                for member in members.iter().filter(|m| !m.is_nullish()) {
                    self.infer_at(member, &arg, names, bindings, depth + 1);
                }
            }
            (Type::Function(p), Type::Function(a)) => {
                for (pp, ap) in p.params.iter().zip(&a.params) {
                    self.infer_at(&pp.ty, &ap.ty, names, bindings, depth + 1);
                }
                self.infer_at(&p.ret, &a.ret, names, bindings, depth + 1);
            }
            (Type::Named { name: pn, args: pa }, Type::Named { name: an, args: aa }) if pn == an => {
                for (p, a) in pa.iter().zip(aa) {
                    self.infer_at(p, a, names, bindings, depth + 1);
                }
            }
            (Type::Object(props), _) => {
                for prop in props {
                    if let Some(found) = self.lookup_member(arg, &prop.name) {
                        self.infer_at(&prop.ty, &found.ty.non_nullish(), names, bindings, depth + 1);
                    }
                }
            }
            (Type::Named { .. }, _) => {
                let expanded = self.expand_at(param, depth + 1);
                if matches!(expanded, Type::Object(_)) {
                    self.infer_at(&expanded, arg, names, bindings, depth + 1);
                }
            }
            _ => {}
        }
    }

    /// Instance type of a class as seen from inside its body.
    pub(crate) fn class_self_type(&self, class_name: &str) -> Type {
        let args = self
            .env
            .lookup_class(class_name)
            .map(|info| {
                info.params
                    .iter()
                    .map(|p| Type::Generic(p.name.clone()))
                    .collect()
            })
            .unwrap_or_default();
        Type::Named {
            name: class_name.to_string(),
            args,
        }
    }
}
