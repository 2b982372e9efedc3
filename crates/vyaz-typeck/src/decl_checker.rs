//! Declaration checking methods

use std::collections::HashSet;

use vyaz_ast::{
    self as ast, BlockStmt, ClassDecl, ClassMember, Decl, Expr, Literal, Node, Param, Pattern,
    Span, Stmt, TypeParam, VarDecl, VarDeclKind, VarDeclarator,
};

use crate::checker::{ClassContext, FunctionContext, TypeChecker};
use crate::env::{ClassInfo, ClassMemberInfo, InterfaceInfo, TypeDef, VarInfo};
use crate::error::TypeErrorKind;
use crate::helpers::TypeHelpers;
use crate::types::{FunctionSig, ParamSig, Type, TypeParamInfo};

/// The parts of a function-like declaration the checker needs.
#[derive(Clone, Copy)]
pub(crate) struct FunctionShape<'a> {
    pub type_params: Option<&'a [TypeParam]>,
    pub params: &'a [Param],
    pub return_type: Option<&'a Node<ast::Type>>,
    pub is_async: bool,
    pub is_constructor: bool,
}

impl<'a> FunctionShape<'a> {
    pub fn new(
        type_params: Option<&'a [TypeParam]>,
        params: &'a [Param],
        return_type: Option<&'a Node<ast::Type>>,
        is_async: bool,
    ) -> Self {
        Self {
            type_params,
            params,
            return_type,
            is_async,
            is_constructor: false,
        }
    }
}

#[derive(Clone, Copy)]
pub(crate) enum FnBody<'a> {
    Block(&'a Node<BlockStmt>),
    Expr(&'a Node<Expr>),
    None,
}

/// Shell parameters used while a declaration's own types are converted.
fn shell_params(params: Option<&[TypeParam]>) -> Vec<TypeParamInfo> {
    params
        .unwrap_or_default()
        .iter()
        .map(|p| TypeParamInfo {
            name: p.name.value.name.clone(),
            constraint: None,
            default: p.default.as_ref().map(|_| Type::Any),
        })
        .collect()
}

impl TypeChecker {
    pub(crate) fn register_type_name(&mut self, decl: &Decl) {
        let (name, def) = match decl {
            Decl::Interface(i) => (
                &i.name,
                TypeDef::Interface(InterfaceInfo {
                    params: shell_params(i.type_params.as_deref()),
                    extends: Vec::new(),
                    properties: Vec::new(),
                }),
            ),
            Decl::TypeAlias(t) => (
                &t.name,
                TypeDef::Alias {
                    params: shell_params(t.type_params.as_deref()),
                    ty: Type::Any,
                },
            ),
            Decl::Class(c) => (
                &c.name,
                TypeDef::Class(ClassInfo {
                    name: c.name.value.name.clone(),
                    params: shell_params(c.type_params.as_deref()),
                    extends: None,
                    is_abstract: c.is_abstract,
                    ctor: None,
                    members: Vec::new(),
                }),
            ),
            Decl::Function(_) | Decl::Var(_) => return,
        };

        if self.env.has_type_in_current_scope(&name.value.name) {
            self.report(
                TypeErrorKind::DuplicateDeclaration(name.value.name.clone()),
                name.span,
            );
            return;
        }
        self.env.define_type(name.value.name.clone(), def);
    }

    pub(crate) fn define_type_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Interface(i) => {
                self.env.push_scope();
                let params = self.declare_type_params(i.type_params.as_deref());
                let extends = i.extends.iter().map(|e| self.convert_type(e)).collect();
                let properties = self.convert_type_members(&i.members);
                self.env.pop_scope();
                self.env.define_type(
                    i.name.value.name.clone(),
                    TypeDef::Interface(InterfaceInfo {
                        params,
                        extends,
                        properties,
                    }),
                );
            }
            Decl::TypeAlias(t) => {
                self.env.push_scope();
                let params = self.declare_type_params(t.type_params.as_deref());
                let ty = self.convert_type(&t.ty);
                self.env.pop_scope();
                self.env
                    .define_type(t.name.value.name.clone(), TypeDef::Alias { params, ty });
            }
            Decl::Class(c) => {
                let info = self.build_class_info(c);
                self.env.define_type(c.name.value.name.clone(), TypeDef::Class(info));
            }
            Decl::Function(_) | Decl::Var(_) => {}
        }
    }

    pub(crate) fn declare_decl_value(&mut self, decl: &Decl) {
        match decl {
            Decl::Function(f) => {
                let name = f.name.value.name.clone();
                if let Some(existing) = self.env.current_scope_entry(&name) {
                    // Bodiless declarations are overload signatures; the first one wins.
                    let is_overload = matches!(existing.ty, Type::Function(_))
                        && (f.body.is_none() || self.overloads.contains(&name));
                    if !is_overload {
                        self.report(TypeErrorKind::DuplicateDeclaration(name), f.name.span);
                    }
                    return;
                }
                if f.body.is_none() {
                    self.overloads.insert(name.clone());
                }
                let sig = self.signature_of(FunctionShape::new(
                    f.type_params.as_deref(),
                    &f.params,
                    f.return_type.as_deref(),
                    f.is_async,
                ));
                self.env.declare(name, VarInfo::new(Type::Function(sig), false));
            }
            Decl::Class(c) => {
                let name = c.name.value.name.clone();
                if self.env.current_scope_entry(&name).is_some() {
                    self.report(TypeErrorKind::DuplicateDeclaration(name), c.name.span);
                    return;
                }
                self.env
                    .declare(name.clone(), VarInfo::new(Type::Class(name), false));
            }
            Decl::Interface(_) | Decl::TypeAlias(_) | Decl::Var(_) => {}
        }
    }

    fn build_class_info(&mut self, class: &ClassDecl) -> ClassInfo {
        let name = class.name.value.name.clone();
        self.env.push_scope();
        let params = self.declare_type_params(class.type_params.as_deref());

        let extends = class.extends.as_ref().map(|ext| self.resolve_base_class(ext));

        let mut ctor = None;
        let mut members: Vec<ClassMemberInfo> = Vec::new();
        for member in &class.members {
            match member {
                ClassMember::Constructor { params, .. } => {
                    let mut shape = FunctionShape::new(None, params, None, false);
                    shape.is_constructor = true;
                    let sig = self.signature_of(shape);
                    ctor = Some(FunctionSig::new(sig.params.clone(), Type::Void));
                    for (param, param_sig) in params.iter().zip(&sig.params) {
                        if let (Some(prop), Pattern::Ident { name, .. }) =
                            (param.property, &param.pattern.value)
                        {
                            members.push(ClassMemberInfo {
                                name: name.value.name.clone(),
                                ty: param_sig.ty.clone(),
                                access: prop.access,
                                is_static: false,
                                readonly: prop.readonly,
                                optional: param_sig.optional,
                                is_abstract: false,
                            });
                        }
                    }
                }
                ClassMember::Method {
                    name,
                    type_params,
                    params,
                    return_type,
                    access,
                    is_static,
                    is_async,
                    is_abstract,
                    is_optional,
                    ..
                } => {
                    let Some(key) = TypeHelpers::property_key(name) else {
                        continue;
                    };
                    let sig = self.signature_of(FunctionShape::new(
                        type_params.as_deref(),
                        params,
                        return_type.as_deref(),
                        *is_async,
                    ));
                    members.push(ClassMemberInfo {
                        name: key,
                        ty: Type::Function(sig),
                        access: *access,
                        is_static: *is_static,
                        readonly: false,
                        optional: *is_optional,
                        is_abstract: *is_abstract,
                    });
                }
                ClassMember::Property {
                    name,
                    type_annotation,
                    init,
                    access,
                    is_static,
                    is_readonly,
                    is_abstract,
                    is_optional,
                    ..
                } => {
                    let Some(key) = TypeHelpers::property_key(name) else {
                        continue;
                    };
                    let ty = match (type_annotation, init) {
                        (Some(ty), _) => self.convert_type(ty),
                        (None, Some(init)) => initializer_hint(init),
                        (None, None) => Type::Any,
                    };
                    members.push(ClassMemberInfo {
                        name: key,
                        ty,
                        access: *access,
                        is_static: *is_static,
                        readonly: *is_readonly,
                        optional: *is_optional,
                        is_abstract: *is_abstract,
                    });
                }
                ClassMember::Getter {
                    name,
                    return_type,
                    access,
                    is_static,
                    ..
                } => {
                    let Some(key) = TypeHelpers::property_key(name) else {
                        continue;
                    };
                    let ty = return_type
                        .as_ref()
                        .map(|t| self.convert_type(t))
                        .unwrap_or(Type::Any);
                    match members
                        .iter_mut()
                        .find(|m| m.name == key && m.is_static == *is_static)
                    {
                        Some(existing) => existing.ty = ty,
                        None => members.push(ClassMemberInfo {
                            name: key,
                            ty,
                            access: *access,
                            is_static: *is_static,
                            // Read-only until a setter is seen.
                            readonly: true,
                            optional: false,
                            is_abstract: false,
                        }),
                    }
                }
                ClassMember::Setter {
                    name,
                    param,
                    access,
                    is_static,
                    ..
                } => {
                    let Some(key) = TypeHelpers::property_key(name) else {
                        continue;
                    };
                    let ty = param
                        .type_annotation
                        .as_ref()
                        .map(|t| self.convert_type(t))
                        .unwrap_or(Type::Any);
                    match members
                        .iter_mut()
                        .find(|m| m.name == key && m.is_static == *is_static)
                    {
                        Some(existing) => existing.readonly = false,
                        None => members.push(ClassMemberInfo {
                            name: key,
                            ty,
                            access: *access,
                            is_static: *is_static,
                            readonly: false,
                            optional: false,
                            is_abstract: false,
                        }),
                    }
                }
            }
        }
        self.env.pop_scope();

        ClassInfo {
            name,
            params,
            extends,
            is_abstract: class.is_abstract,
            ctor,
            members,
        }
    }

    /// Instance type of the base class, or `любой` when the base is unchecked.
    fn resolve_base_class(&mut self, ext: &ast::ClassExtends) -> Type {
        let Expr::Ident(ident) = ext.base.value.unwrap_transparent() else {
            self.check_expr(&ext.base);
            return Type::Any;
        };
        let params = match self.env.lookup_type(&ident.name) {
            Some(TypeDef::Class(info)) => info.params.clone(),
            Some(TypeDef::Opaque) => return Type::Any,
            _ => {
                match self.env.lookup(&ident.name) {
                    Some(info) if info.ty.is_permissive() => {}
                    Some(info) => {
                        let ty = info.ty.clone();
                        self.report(TypeErrorKind::NotConstructable(ty), ext.base.span);
                    }
                    None => self.report(
                        TypeErrorKind::UndefinedVariable(ident.name.clone()),
                        ext.base.span,
                    ),
                }
                return Type::Any;
            }
        };
        let args = self.resolve_type_args(&ident.name, &params, ext.type_args.as_deref(), ext.base.span);
        Type::Named {
            name: ident.name.clone(),
            args,
        }
    }

    /// Signature from annotations alone, used before bodies are checked.
    pub(crate) fn signature_of(&mut self, shape: FunctionShape<'_>) -> FunctionSig {
        self.env.push_scope();
        let type_params = self.declare_type_params(shape.type_params);
        let params = shape
            .params
            .iter()
            .enumerate()
            .map(|(i, param)| self.param_sig(i, param, None, false))
            .collect();
        let ret = match shape.return_type {
            Some(ty) => {
                let ret = self.convert_type(ty);
                if shape.is_async {
                    self.async_return(ret, ty.span)
                } else {
                    ret
                }
            }
            None if shape.is_async => Type::Promise(Box::new(Type::Any)),
            None => Type::Any,
        };
        self.env.pop_scope();
        FunctionSig {
            type_params,
            params,
            ret: Box::new(ret),
        }
    }

    /// An async function's declared return type must be a promise.
    fn async_return(&mut self, ret: Type, span: Span) -> Type {
        match ret {
            Type::Promise(_) | Type::Any | Type::Error => ret,
            other => {
                self.generic_error(
                    format!(
                        "the return type of an async function must be 'Обещание<T>', found '{}'",
                        other
                    ),
                    span,
                );
                Type::Promise(Box::new(other))
            }
        }
    }

    /// Converts one parameter. With `check_default` the default value is
    /// checked as an expression; otherwise only its literal type is used.
    fn param_sig(
        &mut self,
        index: usize,
        param: &Param,
        expected: Option<Type>,
        check_default: bool,
    ) -> ParamSig {
        let (name, annotation) = match &param.pattern.value {
            Pattern::Ident {
                name,
                type_annotation,
            } => (
                name.value.name.clone(),
                param.type_annotation.as_ref().or(type_annotation.as_ref()),
            ),
            other => {
                let names = other.bound_names();
                let name = if names.is_empty() {
                    format!("арг{}", index)
                } else {
                    names.join(", ")
                };
                (name, param.type_annotation.as_ref())
            }
        };

        let ty = match (annotation, expected, &param.default) {
            (Some(annotation), _, default) => {
                let ty = self.convert_type(annotation);
                if let (Some(default), true) = (default, check_default) {
                    let default_ty = self.check_expr_expected(default, Some(&ty));
                    self.check_assignable(&default_ty, &ty, default.span);
                }
                ty
            }
            (None, Some(expected), default) => {
                if let (Some(default), true) = (default, check_default) {
                    self.check_expr_expected(default, Some(&expected));
                }
                expected
            }
            (None, None, Some(default)) => {
                if check_default {
                    self.check_expr(default).widen()
                } else {
                    initializer_hint(default)
                }
            }
            (None, None, None) => {
                self.report(TypeErrorKind::ImplicitAny(name.clone()), param.pattern.span);
                if param.is_rest {
                    Type::Array(Box::new(Type::Any))
                } else {
                    Type::Any
                }
            }
        };

        ParamSig {
            name,
            ty,
            optional: param.optional || param.default.is_some(),
            rest: param.is_rest,
        }
    }

    /// Checks parameters and body of anything callable and returns its
    /// signature. `expected` is the contextual signature for callbacks.
    pub(crate) fn check_function_like(
        &mut self,
        shape: FunctionShape<'_>,
        body: FnBody<'_>,
        expected: Option<&FunctionSig>,
    ) -> FunctionSig {
        self.env.push_scope();
        let type_params = self.declare_type_params(shape.type_params);

        let mut params = Vec::with_capacity(shape.params.len());
        let mut seen_optional = false;
        for (i, param) in shape.params.iter().enumerate() {
            let expected_ty = expected.and_then(|sig| {
                let ty = sig.param_type_at(i)?;
                Some(if param.is_rest {
                    Type::Array(Box::new(ty))
                } else {
                    ty
                })
            });
            let sig = self.param_sig(i, param, expected_ty, true);

            if seen_optional && !sig.optional && !sig.rest {
                self.generic_error(
                    "a required parameter cannot follow an optional parameter",
                    param.pattern.span,
                );
            }
            seen_optional |= sig.optional;
            if param.property.is_some() && !shape.is_constructor {
                self.generic_error(
                    "a parameter property is only allowed in a constructor",
                    param.pattern.span,
                );
            }

            let binding = if param.optional && param.default.is_none() {
                Type::union(vec![sig.ty.clone(), Type::Undefined])
            } else {
                sig.ty.clone()
            };
            self.bind_pattern(&param.pattern, &binding, true, VarDeclKind::Let);
            params.push(sig);
        }

        let declared_ret = shape.return_type.map(|ty| {
            let ret = self.convert_type(ty);
            match (shape.is_async, ret) {
                (true, ret) => match self.async_return(ret, ty.span) {
                    Type::Promise(inner) => *inner,
                    other => other,
                },
                (false, ret) => ret,
            }
        });

        self.functions.push(FunctionContext {
            declared_ret: declared_ret.clone(),
            is_async: shape.is_async,
            returns: Vec::new(),
        });
        let saved_depths = (self.loop_depth, self.switch_depth);
        self.loop_depth = 0;
        self.switch_depth = 0;

        match body {
            FnBody::Block(block) => self.check_block(&block.value.stmts),
            FnBody::Expr(expr) => {
                let ty = self.check_expr_expected(expr, declared_ret.as_ref());
                if let Some(ret) = &declared_ret {
                    self.check_assignable(&ty, ret, expr.span);
                }
                if let Some(ctx) = self.functions.last_mut() {
                    ctx.returns.push(ty);
                }
            }
            FnBody::None => {}
        }

        (self.loop_depth, self.switch_depth) = saved_depths;
        let returns = self.functions.pop().map(|ctx| ctx.returns).unwrap_or_default();
        self.env.pop_scope();

        if let (FnBody::Block(block), Some(ret), Some(ret_node)) =
            (body, &declared_ret, shape.return_type)
        {
            let always_returns = block
                .value
                .stmts
                .iter()
                .any(|s| TypeHelpers::terminates(&s.value, false));
            if !always_returns && !accepts_missing_return(ret) {
                self.generic_error(
                    format!(
                        "a function whose declared type is neither 'пустота' nor 'любой' must return a value of type '{}'",
                        ret
                    ),
                    ret_node.span,
                );
            }
        }

        let ret = declared_ret.unwrap_or_else(|| {
            if returns.is_empty() {
                Type::Void
            } else {
                Type::union(returns.iter().map(Type::widen))
            }
        });
        let ret = if shape.is_async {
            match ret {
                Type::Promise(inner) => Type::Promise(inner),
                other => Type::Promise(Box::new(other)),
            }
        } else {
            ret
        };

        FunctionSig {
            type_params,
            params,
            ret: Box::new(ret),
        }
    }

    pub(crate) fn check_decl(&mut self, decl: &Decl, _span: Span) {
        match decl {
            Decl::Function(f) => {
                let Some(body) = &f.body else {
                    return;
                };
                let sig = self.check_function_like(
                    FunctionShape::new(
                        f.type_params.as_deref(),
                        &f.params,
                        f.return_type.as_deref(),
                        f.is_async,
                    ),
                    FnBody::Block(body),
                    None,
                );
                let name = &f.name.value.name;
                if f.return_type.is_none() && !self.overloads.contains(name) {
                    if let Some(info) = self.env.lookup_mut(name) {
                        if matches!(info.declared, Type::Function(_)) {
                            info.ty = Type::Function(sig.clone());
                            info.declared = Type::Function(sig);
                        }
                    }
                }
            }
            Decl::Class(c) => self.check_class(c),
            Decl::Interface(_) | Decl::TypeAlias(_) => {}
            Decl::Var(var) => self.check_var_decl(var),
        }
    }

    fn check_class(&mut self, class: &ClassDecl) {
        let name = class.name.value.name.clone();
        let Some(info) = self.env.lookup_class(&name).cloned() else {
            return;
        };

        self.env.push_scope();
        for param in &info.params {
            self.env.define_type(
                param.name.clone(),
                TypeDef::Param {
                    constraint: param.constraint.clone(),
                },
            );
        }

        if !class.is_abstract {
            for member in &class.members {
                if let ClassMember::Method {
                    is_abstract: true,
                    span,
                    ..
                }
                | ClassMember::Property {
                    is_abstract: true,
                    span,
                    ..
                } = member
                {
                    self.generic_error(
                        format!("abstract members can only appear in an abstract class '{}'", name),
                        *span,
                    );
                }
            }
            for member in self.missing_abstract_members(&info) {
                self.report(
                    TypeErrorKind::MissingAbstractMember {
                        class: name.clone(),
                        member,
                    },
                    class.name.span,
                );
            }
        }

        for implemented in &class.implements {
            let target = self.convert_type(implemented);
            self.check_implements(&name, &target, implemented.span);
        }

        let base = info.extends.clone();
        let type_args: Vec<Type> = info
            .params
            .iter()
            .map(|p| Type::Generic(p.name.clone()))
            .collect();
        let context = |is_static: bool, in_constructor: bool| ClassContext {
            name: name.clone(),
            type_args: type_args.clone(),
            base: base.clone(),
            is_static,
            in_constructor,
        };

        for member in &class.members {
            match member {
                ClassMember::Constructor {
                    params, body, span, ..
                } => {
                    self.classes.push(context(false, true));
                    let mut shape = FunctionShape::new(None, params, None, false);
                    shape.is_constructor = true;
                    let fn_body = body.as_ref().map_or(FnBody::None, FnBody::Block);
                    self.check_function_like(shape, fn_body, None);
                    if let (Some(Type::Named { .. }), Some(body)) = (&info.extends, body) {
                        if !has_super_call(body) {
                            self.generic_error(
                                "constructors for derived classes must contain a 'родитель' call",
                                *span,
                            );
                        }
                    }
                    self.classes.pop();
                }
                ClassMember::Method {
                    name: key,
                    type_params,
                    params,
                    return_type,
                    body,
                    is_static,
                    is_async,
                    ..
                } => {
                    self.classes.push(context(*is_static, false));
                    let fn_body = body.as_ref().map_or(FnBody::None, FnBody::Block);
                    let sig = self.check_function_like(
                        FunctionShape::new(
                            type_params.as_deref(),
                            params,
                            return_type.as_deref(),
                            *is_async,
                        ),
                        fn_body,
                        None,
                    );
                    self.classes.pop();
                    if return_type.is_none() && body.is_some() {
                        if let Some(key) = TypeHelpers::property_key(key) {
                            self.update_member_type(&name, &key, *is_static, Type::Function(sig));
                        }
                    }
                }
                ClassMember::Property {
                    name: key,
                    type_annotation,
                    init: Some(init),
                    is_static,
                    ..
                } => {
                    self.classes.push(context(*is_static, false));
                    let declared = type_annotation.as_ref().map(|t| self.convert_type(t));
                    let ty = self.check_expr_expected(init, declared.as_ref());
                    self.classes.pop();
                    match declared {
                        Some(declared) => {
                            self.check_assignable(&ty, &declared, init.span);
                        }
                        None => {
                            if let Some(key) = TypeHelpers::property_key(key) {
                                self.update_member_type(&name, &key, *is_static, ty.widen());
                            }
                        }
                    }
                }
                ClassMember::Property { .. } => {}
                ClassMember::Getter {
                    name: key,
                    return_type,
                    body,
                    is_static,
                    ..
                } => {
                    self.classes.push(context(*is_static, false));
                    let fn_body = body.as_ref().map_or(FnBody::None, FnBody::Block);
                    let sig = self.check_function_like(
                        FunctionShape::new(None, &[], return_type.as_deref(), false),
                        fn_body,
                        None,
                    );
                    self.classes.pop();
                    if return_type.is_none() && body.is_some() {
                        if let Some(key) = TypeHelpers::property_key(key) {
                            self.update_member_type(&name, &key, *is_static, *sig.ret);
                        }
                    }
                }
                ClassMember::Setter {
                    param,
                    body,
                    is_static,
                    ..
                } => {
                    self.classes.push(context(*is_static, false));
                    let fn_body = body.as_ref().map_or(FnBody::None, FnBody::Block);
                    self.check_function_like(
                        FunctionShape::new(None, std::slice::from_ref(param), None, false),
                        fn_body,
                        None,
                    );
                    self.classes.pop();
                }
            }
        }

        self.env.pop_scope();
    }

    fn update_member_type(&mut self, class: &str, member: &str, is_static: bool, ty: Type) {
        let Some(mut info) = self.env.lookup_class(class).cloned() else {
            return;
        };
        if let Some(entry) = info
            .members
            .iter_mut()
            .find(|m| m.name == member && m.is_static == is_static)
        {
            entry.ty = ty;
            self.env.update_class(info);
        }
    }

    /// Abstract members of the class chain with no concrete override below them.
    fn missing_abstract_members(&self, info: &ClassInfo) -> Vec<String> {
        let mut implemented: HashSet<String> = HashSet::new();
        let mut missing = Vec::new();
        let mut current = Some(info);
        let mut steps = 0;
        while let Some(class) = current {
            for member in class.members.iter().filter(|m| !m.is_static) {
                if member.is_abstract {
                    if !implemented.contains(&member.name) && !missing.contains(&member.name) {
                        missing.push(member.name.clone());
                    }
                } else {
                    implemented.insert(member.name.clone());
                }
            }
            steps += 1;
            if steps > 64 {
                break;
            }
            current = class.base_name().and_then(|base| self.env.lookup_class(base));
        }
        missing
    }

    fn check_implements(&mut self, class: &str, target: &Type, span: Span) {
        if target.is_permissive() {
            return;
        }
        let Type::Object(props) = self.expand(target) else {
            self.generic_error(
                format!("a class can only implement an object type, found '{}'", target),
                span,
            );
            return;
        };

        let instance = self.class_self_type(class);
        for prop in &props {
            let detail = match self.lookup_member(&instance, &prop.name) {
                None if prop.optional => continue,
                None => format!("property '{}' is missing", prop.name),
                Some(found) => {
                    if let Some((_, access)) = found.owner {
                        if access != ast::AccessModifier::Public {
                            format!("property '{}' is {} in the class", prop.name, access)
                        } else if self.is_assignable(&found.ty, &prop.ty) {
                            continue;
                        } else {
                            format!("types of property '{}' are incompatible", prop.name)
                        }
                    } else if self.is_assignable(&found.ty, &prop.ty) {
                        continue;
                    } else {
                        format!("types of property '{}' are incompatible", prop.name)
                    }
                }
            };
            self.report(
                TypeErrorKind::IncorrectImplementation {
                    class: class.to_string(),
                    interface: target.to_string(),
                    detail,
                },
                span,
            );
            return;
        }
    }

    pub(crate) fn check_var_decl(&mut self, var: &VarDecl) {
        for declarator in &var.declarations {
            self.check_declarator(var.kind, declarator);
        }
    }

    fn check_declarator(&mut self, kind: VarDeclKind, declarator: &VarDeclarator) {
        let annotation = match &declarator.pattern.value {
            Pattern::Ident {
                type_annotation: Some(ty),
                ..
            } => Some(self.convert_type(ty)),
            _ => None,
        };

        let init_ty = declarator.init.as_ref().map(|init| {
            let ty = self.check_expr_expected(init, annotation.as_ref());
            if let Some(annotation) = &annotation {
                self.check_assignable(&ty, annotation, init.span);
            }
            ty
        });

        if kind == VarDeclKind::Const && declarator.init.is_none() {
            self.generic_error("'конст' declarations must be initialized", declarator.pattern.span);
        }

        let ty = match (annotation, init_ty) {
            (Some(annotation), _) => annotation,
            (None, Some(ty)) if kind == VarDeclKind::Const && matches!(ty, Type::Literal(_)) => ty,
            (None, Some(ty)) => ty.widen(),
            (None, None) => {
                if let Pattern::Ident { name, .. } = &declarator.pattern.value {
                    self.report(
                        TypeErrorKind::ImplicitAny(name.value.name.clone()),
                        declarator.pattern.span,
                    );
                }
                Type::Any
            }
        };

        self.bind_pattern(&declarator.pattern, &ty, kind != VarDeclKind::Const, kind);
    }

    /// Declares every name a pattern binds, typed by destructuring `ty`.
    pub(crate) fn bind_pattern(
        &mut self,
        pattern: &Node<Pattern>,
        ty: &Type,
        mutable: bool,
        kind: VarDeclKind,
    ) {
        match &pattern.value {
            Pattern::Ident { name, .. } => {
                self.declare_binding(&name.value.name, ty.clone(), mutable, kind, name.span)
            }
            Pattern::Array { elements, rest } => {
                let elem = if ty.is_permissive() {
                    ty.clone()
                } else {
                    ty.non_nullish().element_type()
                };
                for element in elements.iter().flatten() {
                    self.bind_pattern(element, &elem, mutable, kind);
                }
                if let Some(rest) = rest {
                    self.bind_pattern(rest, &Type::Array(Box::new(elem)), mutable, kind);
                }
            }
            Pattern::Object { properties, rest } => {
                let mut taken = Vec::new();
                for prop in properties {
                    let member_ty = match TypeHelpers::property_key(&prop.key) {
                        _ if ty.is_permissive() => ty.clone(),
                        Some(key) => {
                            let found = self.lookup_member(&ty.non_nullish(), &key);
                            taken.push(key.clone());
                            match found {
                                Some(found) => found.ty,
                                None => {
                                    self.report(
                                        TypeErrorKind::PropertyNotFound {
                                            ty: ty.clone(),
                                            property: key,
                                        },
                                        prop.value.span,
                                    );
                                    Type::Error
                                }
                            }
                        }
                        None => {
                            if let vyaz_ast::PropertyName::Computed(expr) = &prop.key {
                                self.check_expr(expr);
                            }
                            Type::Any
                        }
                    };
                    self.bind_pattern(&prop.value, &member_ty, mutable, kind);
                }
                if let Some(rest) = rest {
                    let rest_ty = match self.expand(ty) {
                        Type::Object(props) => Type::Object(
                            props.into_iter().filter(|p| !taken.contains(&p.name)).collect(),
                        ),
                        _ => Type::Any,
                    };
                    self.bind_pattern(rest, &rest_ty, mutable, kind);
                }
            }
            Pattern::Assignment { pattern, default } => {
                let default_ty = self.check_expr(default).widen();
                let ty = if ty.is_permissive() {
                    default_ty
                } else {
                    Type::union(vec![ty.non_nullish(), default_ty])
                };
                self.bind_pattern(pattern, &ty, mutable, kind);
            }
        }
    }

    fn declare_binding(&mut self, name: &str, ty: Type, mutable: bool, kind: VarDeclKind, span: Span) {
        match self.env.current_scope_entry(name) {
            Some(existing) if existing.hoisted => {}
            Some(existing) if kind == VarDeclKind::Var && existing.mutable => {}
            Some(_) => {
                self.report(TypeErrorKind::DuplicateDeclaration(name.to_string()), span);
                return;
            }
            None => {}
        }
        self.env.declare(name.to_string(), VarInfo::new(ty, mutable));
    }
}

/// Type of an initializer judged without checking it.
fn initializer_hint(init: &Node<Expr>) -> Type {
    match &init.value {
        Expr::Literal(Literal::Null) | Expr::Literal(Literal::Undefined) => Type::Any,
        Expr::Literal(lit) => TypeHelpers::literal_type(lit).widen(),
        Expr::Template { .. } => Type::String,
        _ => Type::Any,
    }
}

fn accepts_missing_return(ret: &Type) -> bool {
    ret.members()
        .iter()
        .any(|m| m.is_permissive() || matches!(m, Type::Void | Type::Undefined | Type::Unknown))
}

fn has_super_call(body: &Node<BlockStmt>) -> bool {
    body.value.stmts.iter().any(|stmt| match &stmt.value {
        Stmt::Expr(expr) => matches!(
            &expr.value,
            Expr::Call { callee, .. } if matches!(callee.value, Expr::Super)
        ),
        _ => false,
    })
}
