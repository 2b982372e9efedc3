//! Expression checking methods

use std::collections::HashMap;

use vyaz_ast::{
    self as ast, AccessModifier, ArrowBody, AssignmentOp, BinaryOp, Expr, Literal, Node,
    ObjectProperty, PropertyName, Span, UnaryOp,
};

use crate::checker::TypeChecker;
use crate::decl_checker::{FnBody, FunctionShape};
use crate::error::TypeErrorKind;
use crate::helpers::{FoundMember, TypeHelpers};
use crate::narrowing::Narrowing;
use crate::types::{FunctionSig, LiteralType, PropertySig, Type};

impl TypeChecker {
    pub(crate) fn check_expr(&mut self, expr: &Node<Expr>) -> Type {
        self.check_expr_expected(expr, None)
    }

    /// Checks an expression against an optional contextual type. The
    /// contextual type only guides inference; callers check assignability.
    pub(crate) fn check_expr_expected(&mut self, expr: &Node<Expr>, expected: Option<&Type>) -> Type {
        let ty = self.infer_expr(expr, expected);
        self.expr_types.insert(expr.span, ty.clone());
        ty
    }

    fn infer_expr(&mut self, expr: &Node<Expr>, expected: Option<&Type>) -> Type {
        let span = expr.span;
        match &expr.value {
            Expr::Literal(lit) => TypeHelpers::literal_type(lit),
            Expr::Ident(ident) => match self.env.lookup(&ident.name) {
                Some(info) => info.ty.clone(),
                None => {
                    self.report(TypeErrorKind::UndefinedVariable(ident.name.clone()), span);
                    Type::Error
                }
            },
            Expr::Binary { left, op, right } => self.check_binary(left, *op, right, span),
            Expr::Unary { op, expr: operand } => self.check_unary(*op, operand, span),
            Expr::Assignment { target, op, value } => self.check_assignment(target, *op, value, span),
            Expr::Call {
                callee,
                type_args,
                args,
            } => {
                if matches!(callee.value, Expr::Super) {
                    return self.check_super_call(args, span);
                }
                let callee_ty = self.check_expr(callee);
                self.call_type(&callee_ty, type_args.as_deref(), args, span, callee.span)
            }
            Expr::Member { object, property } => {
                let object_ty = self.check_expr(object);
                self.member_access(&object_ty, &property.value.name, property.span, object, false)
            }
            Expr::Index { object, index } => {
                let object_ty = self.check_expr(object);
                self.index_access(&object_ty, object, index)
            }
            Expr::Array(elements) => self.check_array(elements, expected),
            Expr::Object(properties) => self.check_object(properties, expected),
            Expr::Arrow {
                type_params,
                params,
                return_type,
                body,
                is_async,
            } => {
                let shape = FunctionShape::new(
                    type_params.as_deref(),
                    params,
                    return_type.as_deref(),
                    *is_async,
                );
                let body = match body {
                    ArrowBody::Expr(expr) => FnBody::Expr(expr),
                    ArrowBody::Block(block) => FnBody::Block(block),
                };
                let contextual = self.contextual_signature(expected);
                Type::Function(self.check_function_like(shape, body, contextual.as_ref()))
            }
            Expr::Function {
                name,
                type_params,
                params,
                return_type,
                body,
                is_async,
            } => {
                self.env.push_scope();
                if let Some(name) = name {
                    self.env.declare(
                        name.value.name.clone(),
                        crate::env::VarInfo::new(Type::Any, false),
                    );
                }
                let contextual = self.contextual_signature(expected);
                let sig = self.check_function_like(
                    FunctionShape::new(
                        type_params.as_deref(),
                        params,
                        return_type.as_deref(),
                        *is_async,
                    ),
                    FnBody::Block(body),
                    contextual.as_ref(),
                );
                self.env.pop_scope();
                Type::Function(sig)
            }
            Expr::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                self.check_expr(condition);
                let positive = self.narrowings(condition, true);
                let then_ty = self.with_narrowings(positive, |c| c.check_expr_expected(then_expr, expected));
                let negative = self.narrowings(condition, false);
                let else_ty = self.with_narrowings(negative, |c| c.check_expr_expected(else_expr, expected));
                Type::union(vec![then_ty, else_ty])
            }
            Expr::Template { exprs, .. } => {
                for part in exprs {
                    self.check_expr(part);
                }
                Type::String
            }
            Expr::New {
                callee,
                type_args,
                args,
            } => self.check_new(callee, type_args.as_deref(), args, span),
            Expr::TypeCast { expr: inner, ty } => {
                let inner_ty = self.check_expr(inner);
                let target = self.convert_type(ty);
                let widened = inner_ty.widen();
                if !self.is_assignable(&inner_ty, &target)
                    && !self.is_assignable(&target, &widened)
                {
                    self.generic_error(
                        format!(
                            "conversion of type '{}' to type '{}' may be a mistake",
                            widened, target
                        ),
                        span,
                    );
                }
                target
            }
            Expr::Await(inner) => {
                if self.functions.last().is_some_and(|ctx| !ctx.is_async) {
                    self.generic_error("'ждать' is only allowed within async functions", span);
                }
                let ty = self.check_expr(inner);
                awaited(&ty)
            }
            Expr::Paren(inner) => self.check_expr_expected(inner, expected),
            Expr::Error => Type::Error,
            Expr::This => match self.classes.last() {
                Some(ctx) if ctx.is_static => Type::Class(ctx.name.clone()),
                Some(ctx) => Type::Named {
                    name: ctx.name.clone(),
                    args: ctx.type_args.clone(),
                },
                None => Type::Any,
            },
            Expr::Super => match self.classes.last().map(|ctx| (ctx.base.clone(), ctx.is_static)) {
                Some((Some(Type::Named { name, .. }), true)) => Type::Class(name),
                Some((Some(base), _)) => base,
                _ => {
                    self.generic_error("'родитель' can only be used in a derived class", span);
                    Type::Error
                }
            },
            Expr::Spread(inner) => self.check_expr(inner),
            Expr::OptionalCall { callee, args } => {
                let callee_ty = self.check_expr(callee);
                if callee_ty.is_permissive() {
                    for arg in args {
                        self.check_expr(arg);
                    }
                    return callee_ty;
                }
                let ret = self.call_type(&callee_ty.non_nullish(), None, args, span, callee.span);
                Type::union(vec![ret, Type::Undefined])
            }
            Expr::OptionalMember { object, property } => {
                let object_ty = self.check_expr(object);
                let base = object_ty.non_nullish();
                if base.is_nullish() {
                    return Type::Undefined;
                }
                let ty = self.member_access(&base, &property.value.name, property.span, object, false);
                optional_result(&object_ty, ty)
            }
            Expr::OptionalIndex { object, index } => {
                let object_ty = self.check_expr(object);
                let base = object_ty.non_nullish();
                if base.is_nullish() {
                    self.check_expr(index);
                    return Type::Undefined;
                }
                let ty = self.index_access(&base, object, index);
                optional_result(&object_ty, ty)
            }
            Expr::NonNullAssertion(inner) => self.check_expr(inner).non_nullish(),
        }
    }

    fn with_narrowings<R>(&mut self, narrowed: Vec<Narrowing>, f: impl FnOnce(&mut Self) -> R) -> R {
        if narrowed.is_empty() {
            return f(self);
        }
        self.env.push_scope();
        self.apply_narrowings(narrowed);
        let result = f(self);
        self.env.pop_scope();
        result
    }

    /// Signature a function literal is checked against, if the context has one.
    fn contextual_signature(&self, expected: Option<&Type>) -> Option<FunctionSig> {
        let expected = self.expand(expected?);
        expected.members().iter().find_map(|member| match self.expand(member) {
            Type::Function(sig) => Some(TypeHelpers::erase_type_params(&sig)),
            _ => None,
        })
    }

    fn check_binary(&mut self, left: &Node<Expr>, op: BinaryOp, right: &Node<Expr>, span: Span) -> Type {
        match op {
            BinaryOp::And => {
                let left_ty = self.check_expr(left);
                let narrowed = self.narrowings(left, true);
                let right_ty = self.with_narrowings(narrowed, |c| c.check_expr(right));
                Type::union(vec![falsy_part(&left_ty), right_ty])
            }
            BinaryOp::Or => {
                let left_ty = self.check_expr(left);
                let narrowed = self.narrowings(left, false);
                let right_ty = self.with_narrowings(narrowed, |c| c.check_expr(right));
                Type::union(vec![truthy_part(&left_ty), right_ty])
            }
            BinaryOp::NullishCoalesce => {
                let left_ty = self.check_expr(left);
                let right_ty = self.check_expr(right);
                if left_ty.is_permissive() {
                    return left_ty;
                }
                Type::union(vec![left_ty.non_nullish(), right_ty])
            }
            _ => {
                let left_ty = self.check_expr(left);
                let right_ty = self.check_expr(right);
                self.binary_result(op, &left_ty, &right_ty, left, right, span)
            }
        }
    }

    fn binary_result(
        &mut self,
        op: BinaryOp,
        left_ty: &Type,
        right_ty: &Type,
        left: &Node<Expr>,
        right: &Node<Expr>,
        span: Span,
    ) -> Type {
        let invalid = |checker: &mut Self| {
            checker.report(
                TypeErrorKind::InvalidOperator {
                    op: op.to_string(),
                    left: left_ty.clone(),
                    right: right_ty.clone(),
                },
                span,
            );
        };

        match op {
            BinaryOp::Add => {
                if left_ty.is_permissive() || right_ty.is_permissive() {
                    return sentinel_or_any(left_ty, right_ty);
                }
                if all_members(left_ty, Type::is_number_like) && all_members(right_ty, Type::is_number_like) {
                    Type::Number
                } else if all_members(left_ty, Type::is_string_like) || all_members(right_ty, Type::is_string_like) {
                    Type::String
                } else {
                    invalid(self);
                    Type::Error
                }
            }
            BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Mod
            | BinaryOp::Pow
            | BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor
            | BinaryOp::LeftShift
            | BinaryOp::RightShift
            | BinaryOp::UnsignedRightShift => {
                if left_ty.is_permissive() || right_ty.is_permissive() {
                    return if matches!(left_ty, Type::Error) || matches!(right_ty, Type::Error) {
                        Type::Error
                    } else {
                        Type::Number
                    };
                }
                if all_members(left_ty, Type::is_number_like) && all_members(right_ty, Type::is_number_like) {
                    Type::Number
                } else {
                    invalid(self);
                    Type::Error
                }
            }
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                let comparable = left_ty.is_permissive()
                    || right_ty.is_permissive()
                    || (all_members(left_ty, Type::is_number_like) && all_members(right_ty, Type::is_number_like))
                    || (all_members(left_ty, Type::is_string_like) && all_members(right_ty, Type::is_string_like));
                if !comparable {
                    invalid(self);
                }
                Type::Boolean
            }
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::StrictEq | BinaryOp::StrictNotEq => {
                self.check_typeof_tag(left, right);
                self.check_typeof_tag(right, left);
                let (l, r) = (left_ty.widen(), right_ty.widen());
                let overlap = l.contains_nullish()
                    || r.contains_nullish()
                    || self.is_assignable(&l, &r)
                    || self.is_assignable(&r, &l);
                if !overlap {
                    self.generic_error(
                        format!(
                            "this comparison appears to be unintentional because the types '{}' and '{}' have no overlap",
                            l, r
                        ),
                        span,
                    );
                }
                Type::Boolean
            }
            BinaryOp::InstanceOf => {
                if !right_ty.is_permissive() && !matches!(right_ty, Type::Class(_) | Type::Function(_)) {
                    self.generic_error(
                        "the right-hand side of an 'экземпляр' expression must be a constructor",
                        right.span,
                    );
                }
                Type::Boolean
            }
            BinaryOp::In => {
                let primitive = right_ty.members().iter().any(|m| {
                    m.is_number_like()
                        || m.is_string_like()
                        || matches!(m, Type::Boolean | Type::Literal(LiteralType::Boolean(_)))
                        || m.is_nullish()
                });
                if primitive && !right_ty.is_permissive() {
                    invalid(self);
                }
                Type::Boolean
            }
            BinaryOp::And | BinaryOp::Or | BinaryOp::NullishCoalesce => Type::union(vec![left_ty.clone(), right_ty.clone()]),
        }
    }

    /// `типа x === "строкк"` can never be true.
    fn check_typeof_tag(&mut self, typeof_side: &Node<Expr>, other: &Node<Expr>) {
        if let (
            Expr::Unary {
                op: UnaryOp::TypeOf,
                ..
            },
            Expr::Literal(Literal::String(tag)),
        ) = (typeof_side.value.unwrap_transparent(), other.value.unwrap_transparent())
        {
            if !TypeHelpers::is_valid_typeof_tag(tag) {
                self.report(TypeErrorKind::InvalidTypeofTag(tag.clone()), other.span);
            }
        }
    }

    fn check_unary(&mut self, op: UnaryOp, operand: &Node<Expr>, span: Span) -> Type {
        match op {
            UnaryOp::Not => {
                self.check_expr(operand);
                Type::Boolean
            }
            UnaryOp::TypeOf => {
                self.check_expr(operand);
                Type::String
            }
            UnaryOp::Void => {
                self.check_expr(operand);
                Type::Undefined
            }
            UnaryOp::Delete => {
                self.check_expr(operand);
                Type::Boolean
            }
            UnaryOp::Plus => {
                self.check_expr(operand);
                Type::Number
            }
            UnaryOp::Minus | UnaryOp::BitNot => {
                let ty = self.check_expr(operand);
                self.numeric_operand(op, &ty, span)
            }
            UnaryOp::PreIncrement
            | UnaryOp::PreDecrement
            | UnaryOp::PostIncrement
            | UnaryOp::PostDecrement => {
                let ty = self.check_assign_target(operand);
                self.numeric_operand(op, &ty, span)
            }
        }
    }

    fn numeric_operand(&mut self, op: UnaryOp, ty: &Type, span: Span) -> Type {
        if matches!(ty, Type::Error) {
            return Type::Error;
        }
        if ty.is_permissive() || all_members(ty, Type::is_number_like) {
            return Type::Number;
        }
        self.report(
            TypeErrorKind::InvalidUnaryOperator {
                op: op.to_string(),
                ty: ty.clone(),
            },
            span,
        );
        Type::Error
    }

    fn check_assignment(&mut self, target: &Node<Expr>, op: AssignmentOp, value: &Node<Expr>, span: Span) -> Type {
        let target_ty = self.check_assign_target(target);
        match op {
            AssignmentOp::Assign => {
                let value_ty = self.check_expr_expected(value, Some(&target_ty));
                if self.check_assignable(&value_ty, &target_ty, value.span) {
                    self.narrow_on_assignment(target, &value_ty);
                }
                value_ty
            }
            AssignmentOp::AndAssign | AssignmentOp::OrAssign | AssignmentOp::NullishAssign => {
                let value_ty = self.check_expr_expected(value, Some(&target_ty));
                self.check_assignable(&value_ty, &target_ty, value.span);
                target_ty
            }
            AssignmentOp::AddAssign => {
                let value_ty = self.check_expr(value);
                let result = self.binary_result(BinaryOp::Add, &target_ty, &value_ty, target, value, span);
                self.check_assignable(&result, &target_ty, span);
                target_ty
            }
            _ => {
                let value_ty = self.check_expr(value);
                let numeric = |ty: &Type| ty.is_permissive() || all_members(ty, Type::is_number_like);
                if !numeric(&target_ty) || !numeric(&value_ty) {
                    self.report(
                        TypeErrorKind::InvalidOperator {
                            op: op.to_string(),
                            left: target_ty.clone(),
                            right: value_ty,
                        },
                        span,
                    );
                }
                Type::Number
            }
        }
    }

    /// After `x = value`, a union-typed variable declared in the current
    /// scope holds the members `value` fits; elsewhere it reverts to its
    /// declared type.
    fn narrow_on_assignment(&mut self, target: &Node<Expr>, value_ty: &Type) {
        let Expr::Ident(ident) = &target.value else {
            return;
        };
        let in_current_scope = self.env.current_scope_entry(&ident.name).is_some();
        let Some(declared) = self.env.lookup(&ident.name).map(|info| info.declared.clone()) else {
            return;
        };
        let widened = value_ty.widen();
        let narrowed = if in_current_scope && matches!(declared, Type::Union(_)) {
            let fitting: Vec<Type> = declared
                .members()
                .iter()
                .filter(|m| self.is_assignable(&widened, m))
                .cloned()
                .collect();
            if fitting.is_empty() {
                declared.clone()
            } else {
                Type::union(fitting)
            }
        } else {
            declared.clone()
        };
        if let Some(info) = self.env.lookup_mut(&ident.name) {
            info.ty = narrowed;
        }
    }

    /// Type an assignment target accepts; reports targets that cannot be written.
    fn check_assign_target(&mut self, target: &Node<Expr>) -> Type {
        let ty = match &target.value {
            Expr::Ident(ident) => match self.env.lookup(&ident.name) {
                None => {
                    self.report(TypeErrorKind::UndefinedVariable(ident.name.clone()), target.span);
                    Type::Error
                }
                Some(info) => {
                    let (declared, mutable) = (info.declared.clone(), info.mutable);
                    if mutable {
                        declared
                    } else {
                        self.report(TypeErrorKind::AssignToConst(ident.name.clone()), target.span);
                        Type::Error
                    }
                }
            },
            Expr::Member { object, property } => {
                let object_ty = self.check_expr(object);
                self.member_access(&object_ty, &property.value.name, property.span, object, true)
            }
            Expr::Index { object, index } => {
                let object_ty = self.check_expr(object);
                self.index_access(&object_ty, object, index)
            }
            Expr::Paren(inner) => return self.check_assign_target(inner),
            Expr::NonNullAssertion(inner) => return self.check_assign_target(inner).non_nullish(),
            Expr::Array(_) | Expr::Object(_) => {
                self.check_expr(target);
                Type::Any
            }
            _ => {
                self.check_expr(target);
                self.generic_error("invalid assignment target", target.span);
                Type::Error
            }
        };
        self.expr_types.insert(target.span, ty.clone());
        ty
    }

    /// Reads (or with `write`, assigns) a named member.
    fn member_access(
        &mut self,
        object_ty: &Type,
        name: &str,
        name_span: Span,
        object: &Node<Expr>,
        write: bool,
    ) -> Type {
        if object_ty.is_permissive() {
            return object_ty.clone();
        }
        if object_ty.is_nullish() {
            self.report(TypeErrorKind::PossiblyNullish(object_ty.clone()), object.span);
            return Type::Error;
        }
        let base = if object_ty.contains_nullish() {
            let nullish = Type::union(object_ty.members().iter().filter(|m| m.is_nullish()).cloned());
            self.report(TypeErrorKind::PossiblyNullish(nullish), object.span);
            object_ty.non_nullish()
        } else {
            object_ty.clone()
        };

        match self.lookup_member(&base, name) {
            Some(found) => {
                self.check_member_visibility(&found, name, name_span);
                if write && found.readonly && !self.may_initialize_readonly(&found, object) {
                    self.report(TypeErrorKind::ReadonlyAssignment(name.to_string()), name_span);
                }
                found.ty
            }
            None if matches!(base, Type::Unknown) => {
                self.generic_error("object is of type 'неизвестно'", object.span);
                Type::Error
            }
            None => {
                self.report(
                    TypeErrorKind::PropertyNotFound {
                        ty: base,
                        property: name.to_string(),
                    },
                    name_span,
                );
                Type::Error
            }
        }
    }

    fn check_member_visibility(&mut self, found: &FoundMember, name: &str, span: Span) {
        let Some((owner, access)) = &found.owner else {
            return;
        };
        let current = self.classes.last().map(|ctx| ctx.name.clone());
        let visible = match access {
            AccessModifier::Public => true,
            AccessModifier::Private => current.as_deref() == Some(owner.as_str()),
            AccessModifier::Protected => current
                .as_deref()
                .is_some_and(|class| self.env.is_subclass_of(class, owner)),
        };
        if !visible {
            self.report(
                TypeErrorKind::InaccessibleMember {
                    property: name.to_string(),
                    access: *access,
                    class: owner.clone(),
                },
                span,
            );
        }
    }

    /// Read-only fields may be assigned through `этот` in their class's constructor.
    fn may_initialize_readonly(&self, found: &FoundMember, object: &Node<Expr>) -> bool {
        let Some((owner, _)) = &found.owner else {
            return false;
        };
        matches!(object.value.unwrap_transparent(), Expr::This)
            && self
                .classes
                .last()
                .is_some_and(|ctx| ctx.in_constructor && ctx.name == *owner)
    }

    fn index_access(&mut self, object_ty: &Type, object: &Node<Expr>, index: &Node<Expr>) -> Type {
        let index_ty = self.check_expr(index);
        if object_ty.is_permissive() {
            return object_ty.clone();
        }
        let base = if object_ty.contains_nullish() && !object_ty.is_nullish() {
            let nullish = Type::union(object_ty.members().iter().filter(|m| m.is_nullish()).cloned());
            self.report(TypeErrorKind::PossiblyNullish(nullish), object.span);
            object_ty.non_nullish()
        } else {
            object_ty.clone()
        };

        let numeric_index = index_ty.is_permissive() || all_members(&index_ty, Type::is_number_like);
        match &base {
            Type::Array(elem) => {
                if !numeric_index {
                    self.generic_error(
                        format!("an array cannot be indexed by type '{}'", index_ty),
                        index.span,
                    );
                }
                (**elem).clone()
            }
            t if t.is_string_like() => Type::String,
            Type::Object(_) | Type::Named { .. } | Type::Class(_) => {
                match index.value.unwrap_transparent() {
                    Expr::Literal(Literal::String(key)) => {
                        self.member_access(&base, key, index.span, object, false)
                    }
                    _ => Type::Any,
                }
            }
            Type::Generic(_) | Type::Union(_) | Type::Promise(_) | Type::Function(_) => Type::Any,
            _ => {
                self.report(TypeErrorKind::NotIndexable(base.clone()), object.span);
                Type::Error
            }
        }
    }

    fn check_array(&mut self, elements: &[Option<Node<Expr>>], expected: Option<&Type>) -> Type {
        let expected_elem = expected.and_then(|ty| {
            let expanded = self.expand(ty);
            expanded.members().iter().find_map(|m| match m {
                Type::Array(elem) => Some((**elem).clone()),
                _ => None,
            })
        });
        if elements.is_empty() {
            return Type::Array(Box::new(expected_elem.unwrap_or(Type::Any)));
        }

        let mut types = Vec::with_capacity(elements.len());
        for element in elements {
            let Some(element) = element else {
                types.push(Type::Undefined);
                continue;
            };
            let ty = match &element.value {
                Expr::Spread(inner) => {
                    let spread = self.check_expr(inner);
                    self.expr_types.insert(element.span, spread.clone());
                    match spread {
                        Type::Array(elem) => *elem,
                        Type::Any | Type::Error => spread,
                        other => {
                            self.generic_error(
                                format!("type '{}' is not an array type", other),
                                inner.span,
                            );
                            Type::Error
                        }
                    }
                }
                _ => self.check_expr_expected(element, expected_elem.as_ref()),
            };
            types.push(ty);
        }
        Type::Array(Box::new(Type::union(types)))
    }

    fn check_object(&mut self, properties: &[ObjectProperty], expected: Option<&Type>) -> Type {
        let expected_props = match expected.map(|ty| self.expand(ty)) {
            Some(Type::Object(props)) => props,
            _ => Vec::new(),
        };
        let expected_for = |key: &Option<String>| -> Option<Type> {
            let key = key.as_ref()?;
            expected_props
                .iter()
                .find(|p| &p.name == key)
                .map(|p| p.ty.clone())
        };

        let mut result: Vec<PropertySig> = Vec::new();

        for property in properties {
            match property {
                ObjectProperty::Property { key, value, .. } => {
                    let name = property_name(self, key);
                    let expected = expected_for(&name);
                    let ty = self.check_expr_expected(value, expected.as_ref());
                    if let Some(name) = name {
                        upsert(&mut result, PropertySig::new(name, ty));
                    }
                }
                ObjectProperty::Method {
                    key,
                    type_params,
                    params,
                    return_type,
                    body,
                    is_async,
                } => {
                    let name = property_name(self, key);
                    let expected = expected_for(&name);
                    let contextual = self.contextual_signature(expected.as_ref());
                    let sig = self.check_function_like(
                        FunctionShape::new(
                            type_params.as_deref(),
                            params,
                            return_type.as_deref(),
                            *is_async,
                        ),
                        FnBody::Block(body),
                        contextual.as_ref(),
                    );
                    if let Some(name) = name {
                        upsert(&mut result, PropertySig::new(name, Type::Function(sig)));
                    }
                }
                ObjectProperty::Spread(inner) => {
                    let ty = self.check_expr(inner);
                    match self.expand(&ty) {
                        Type::Object(props) => {
                            for prop in props {
                                upsert(&mut result, prop);
                            }
                        }
                        Type::Any | Type::Error => {}
                        other if other.is_nullish() => {}
                        other => self.generic_error(
                            format!("spread types may only be created from object types, found '{}'", other),
                            inner.span,
                        ),
                    }
                }
            }
        }
        Type::Object(result)
    }

    /// Return type of calling a value of type `callee_ty`.
    fn call_type(
        &mut self,
        callee_ty: &Type,
        type_args: Option<&[Node<ast::Type>]>,
        args: &[Node<Expr>],
        span: Span,
        callee_span: Span,
    ) -> Type {
        match callee_ty {
            Type::Any | Type::Error => {
                for arg in args {
                    self.check_expr(arg);
                }
                callee_ty.clone()
            }
            Type::Function(sig) => self.check_call_sig(sig, type_args, args, span),
            Type::Union(members) if callee_ty.contains_nullish() => {
                let nullish = Type::union(members.iter().filter(|m| m.is_nullish()).cloned());
                self.report(TypeErrorKind::PossiblyNullish(nullish), callee_span);
                self.call_type(&callee_ty.non_nullish(), type_args, args, span, callee_span)
            }
            Type::Union(members) if members.iter().all(|m| matches!(m, Type::Function(_))) => {
                for arg in args {
                    self.check_expr(arg);
                }
                Type::union(members.iter().filter_map(|m| match m {
                    Type::Function(sig) => Some((*sig.ret).clone()),
                    _ => None,
                }))
            }
            Type::Class(name) => {
                for arg in args {
                    self.check_expr(arg);
                }
                self.generic_error(
                    format!("class constructor '{}' cannot be invoked without 'новый'", name),
                    callee_span,
                );
                Type::Error
            }
            Type::Named { .. } => {
                let expanded = self.expand(callee_ty);
                if matches!(expanded, Type::Named { .. }) {
                    self.report(TypeErrorKind::NotCallable(callee_ty.clone()), callee_span);
                    return Type::Error;
                }
                self.call_type(&expanded, type_args, args, span, callee_span)
            }
            _ => {
                for arg in args {
                    self.check_expr(arg);
                }
                self.report(TypeErrorKind::NotCallable(callee_ty.clone()), callee_span);
                Type::Error
            }
        }
    }

    /// Checks arguments against a signature and returns the instantiated
    /// return type. Generic parameters are inferred from ordinary arguments
    /// first and from function literals after, so callbacks see the types
    /// the other arguments fixed.
    pub(crate) fn check_call_sig(
        &mut self,
        sig: &FunctionSig,
        type_args: Option<&[Node<ast::Type>]>,
        args: &[Node<Expr>],
        span: Span,
    ) -> Type {
        let names: Vec<String> = sig.type_params.iter().map(|tp| tp.name.clone()).collect();
        let mut bindings: HashMap<String, Type> = HashMap::new();

        if let Some(type_args) = type_args {
            if names.is_empty() {
                for arg in type_args {
                    self.convert_type(arg);
                }
                self.report(
                    TypeErrorKind::TypeArgumentCount {
                        name: sig.to_string(),
                        expected: 0,
                        found: type_args.len(),
                    },
                    span,
                );
            } else {
                let resolved = self.resolve_type_args(&sig.to_string(), &sig.type_params, Some(type_args), span);
                bindings.extend(names.iter().cloned().zip(resolved));
            }
        }

        let has_spread = args.iter().any(|a| matches!(a.value, Expr::Spread(_)));
        let required = sig.required_params();
        let too_few = args.len() < required;
        let too_many = !sig.has_rest() && args.len() > sig.params.len();
        if !has_spread && (too_few || too_many) {
            let expected = if sig.has_rest() {
                format!("at least {}", required)
            } else if required == sig.params.len() {
                required.to_string()
            } else {
                format!("{}-{}", required, sig.params.len())
            };
            self.report(
                TypeErrorKind::ArityMismatch {
                    expected,
                    found: args.len(),
                },
                span,
            );
        }

        let mut arg_types: Vec<Type> = vec![Type::Error; args.len()];
        for deferred in [false, true] {
            for (i, arg) in args.iter().enumerate() {
                if is_function_literal(arg) != deferred {
                    continue;
                }
                let param_ty = sig.param_type_at(i);
                let contextual = param_ty
                    .as_ref()
                    .map(|ty| erase_unbound(&ty.substitute(&bindings), &names));
                let ty = match &arg.value {
                    Expr::Spread(inner) => {
                        let spread = self.check_expr(inner);
                        self.expr_types.insert(arg.span, spread.clone());
                        spread.element_type()
                    }
                    _ => self.check_expr_expected(arg, contextual.as_ref()),
                };
                if let (Some(param_ty), false) = (&param_ty, names.is_empty()) {
                    self.infer_type_args(param_ty, &ty, &names, &mut bindings);
                }
                arg_types[i] = ty;
            }
        }

        for tp in &sig.type_params {
            if !bindings.contains_key(&tp.name) {
                let fallback = tp.default.clone().unwrap_or(Type::Unknown);
                bindings.insert(tp.name.clone(), fallback);
            }
        }
        for tp in &sig.type_params {
            if let (Some(constraint), Some(bound)) = (&tp.constraint, bindings.get(&tp.name)) {
                let constraint = constraint.substitute(&bindings);
                let bound = bound.clone();
                self.check_assignable(&bound, &constraint, span);
            }
        }

        for (i, arg) in args.iter().enumerate() {
            if matches!(arg.value, Expr::Spread(_)) {
                continue;
            }
            if let Some(param_ty) = sig.param_type_at(i) {
                let target = param_ty.substitute(&bindings);
                self.check_assignable(&arg_types[i], &target, arg.span);
            }
        }

        sig.ret.substitute(&bindings)
    }

    fn check_super_call(&mut self, args: &[Node<Expr>], span: Span) -> Type {
        let ctx = self.classes.last().map(|ctx| (ctx.base.clone(), ctx.in_constructor));
        match ctx {
            Some((Some(Type::Named { name, args: base_args }), true)) => {
                match self.constructor_of(&name, &base_args) {
                    Some(sig) => {
                        self.check_call_sig(&sig, None, args, span);
                    }
                    None => {
                        for arg in args {
                            self.check_expr(arg);
                        }
                    }
                }
            }
            Some((Some(_), true)) => {
                for arg in args {
                    self.check_expr(arg);
                }
            }
            _ => {
                for arg in args {
                    self.check_expr(arg);
                }
                self.generic_error(
                    "'родитель' calls are only permitted in constructors of derived classes",
                    span,
                );
            }
        }
        Type::Void
    }

    fn check_new(
        &mut self,
        callee: &Node<Expr>,
        type_args: Option<&[Node<ast::Type>]>,
        args: &[Node<Expr>],
        span: Span,
    ) -> Type {
        let callee_ty = self.check_expr(callee);
        match &callee_ty {
            Type::Any | Type::Error | Type::Function(_) => {
                for arg in args {
                    self.check_expr(arg);
                }
                if matches!(callee_ty, Type::Error) {
                    Type::Error
                } else {
                    Type::Any
                }
            }
            Type::Class(name) => {
                let Some(info) = self.env.lookup_class(name).cloned() else {
                    for arg in args {
                        self.check_expr(arg);
                    }
                    return Type::Any;
                };
                if info.is_abstract {
                    self.report(TypeErrorKind::AbstractInstantiation(name.clone()), span);
                }
                let own_args: Vec<Type> = info
                    .params
                    .iter()
                    .map(|p| Type::Generic(p.name.clone()))
                    .collect();
                match self.constructor_of(name, &own_args) {
                    Some(ctor) => {
                        let sig = FunctionSig {
                            type_params: info.params.clone(),
                            params: ctor.params,
                            ret: Box::new(Type::Named {
                                name: name.clone(),
                                args: own_args,
                            }),
                        };
                        self.check_call_sig(&sig, type_args, args, span)
                    }
                    None => {
                        for arg in args {
                            self.check_expr(arg);
                        }
                        Type::Named {
                            name: name.clone(),
                            args: info.params.iter().map(|_| Type::Any).collect(),
                        }
                    }
                }
            }
            other => {
                for arg in args {
                    self.check_expr(arg);
                }
                self.report(TypeErrorKind::NotConstructable(other.clone()), callee.span);
                Type::Error
            }
        }
    }
}

fn property_name(checker: &mut TypeChecker, key: &PropertyName) -> Option<String> {
    if let PropertyName::Computed(expr) = key {
        checker.check_expr(expr);
    }
    TypeHelpers::property_key(key)
}

/// Later properties of an object literal override earlier ones.
fn upsert(result: &mut Vec<PropertySig>, prop: PropertySig) {
    match result.iter_mut().find(|p| p.name == prop.name) {
        Some(existing) => *existing = prop,
        None => result.push(prop),
    }
}

fn is_function_literal(expr: &Node<Expr>) -> bool {
    matches!(
        expr.value.unwrap_transparent(),
        Expr::Arrow { .. } | Expr::Function { .. }
    )
}

/// Replaces generic parameters that are still unbound by `любой`.
fn erase_unbound(ty: &Type, names: &[String]) -> Type {
    if names.is_empty() {
        return ty.clone();
    }
    let map: HashMap<String, Type> = names.iter().map(|n| (n.clone(), Type::Any)).collect();
    ty.substitute(&map)
}

fn all_members(ty: &Type, pred: fn(&Type) -> bool) -> bool {
    ty.members().iter().all(pred)
}

fn sentinel_or_any(left: &Type, right: &Type) -> Type {
    if matches!(left, Type::Error) || matches!(right, Type::Error) {
        Type::Error
    } else {
        Type::Any
    }
}

/// Values of `ty` that are falsy, as far as the type can tell.
fn falsy_part(ty: &Type) -> Type {
    Type::union(ty.members().iter().filter_map(|member| match member {
        Type::Boolean => Some(Type::Literal(LiteralType::Boolean(false))),
        Type::Literal(LiteralType::Boolean(false))
        | Type::Number
        | Type::String
        | Type::Any
        | Type::Unknown
        | Type::Error
        | Type::Generic(_) => Some(member.clone()),
        Type::Literal(LiteralType::Number(n)) if *n == 0.0 => Some(member.clone()),
        Type::Literal(LiteralType::String(s)) if s.is_empty() => Some(member.clone()),
        m if m.is_nullish() => Some(member.clone()),
        _ => None,
    }))
}

fn truthy_part(ty: &Type) -> Type {
    Type::union(
        ty.members()
            .iter()
            .filter(|m| !m.is_nullish() && **m != Type::Literal(LiteralType::Boolean(false)))
            .cloned(),
    )
}

/// Result of `ждать`: the promise's value type, member-wise for unions.
fn awaited(ty: &Type) -> Type {
    Type::union(ty.members().iter().map(|member| match member {
        Type::Promise(inner) => (**inner).clone(),
        other => other.clone(),
    }))
}

/// An optional chain yields `неопределено` when its object was nullish.
fn optional_result(object_ty: &Type, ty: Type) -> Type {
    if object_ty.contains_nullish() {
        Type::union(vec![ty, Type::Undefined])
    } else {
        ty
    }
}
