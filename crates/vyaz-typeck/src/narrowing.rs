//! Flow narrowing of union-typed variables by conditions.

use vyaz_ast::{BinaryOp, Expr, Literal, Node, UnaryOp};

use crate::checker::TypeChecker;
use crate::env::VarInfo;
use crate::helpers::TypeHelpers;
use crate::types::{LiteralType, Type};

/// A variable and the type it has where a condition holds.
pub(crate) type Narrowing = (String, Type);

/// Operand compared against a value.
enum Comparand<'a> {
    Null,
    Undefined,
    Literal(LiteralType),
    TypeofTag(&'a str),
}

impl TypeChecker {
    /// Narrowings that hold where `condition` evaluates to `positive`.
    pub(crate) fn narrowings(&mut self, condition: &Node<Expr>, positive: bool) -> Vec<Narrowing> {
        match &condition.value {
            Expr::Paren(inner) => self.narrowings(inner, positive),
            Expr::Unary {
                op: UnaryOp::Not,
                expr,
            } => self.narrowings(expr, !positive),
            Expr::Binary {
                left,
                op: BinaryOp::And,
                right,
            } if positive => self.sequenced_narrowings(left, right, true),
            Expr::Binary {
                left,
                op: BinaryOp::Or,
                right,
            } if !positive => self.sequenced_narrowings(left, right, false),
            Expr::Binary {
                left,
                op: BinaryOp::Or,
                right,
            } => {
                // Either side may hold: keep variables narrowed on both.
                let on_left = self.narrowings(left, true);
                let on_right = self.narrowings(right, true);
                on_left
                    .into_iter()
                    .filter_map(|(name, ty)| {
                        let (_, other) = on_right.iter().find(|(n, _)| *n == name)?;
                        Some((name, Type::union(vec![ty, other.clone()])))
                    })
                    .collect()
            }
            Expr::Binary { left, op, right } => match op {
                BinaryOp::StrictEq | BinaryOp::StrictNotEq | BinaryOp::Eq | BinaryOp::NotEq => {
                    let equal = matches!(op, BinaryOp::StrictEq | BinaryOp::Eq) == positive;
                    let loose = matches!(op, BinaryOp::Eq | BinaryOp::NotEq);
                    self.equality_narrowing(left, right, equal, loose)
                        .or_else(|| self.equality_narrowing(right, left, equal, loose))
                        .into_iter()
                        .collect()
                }
                BinaryOp::InstanceOf => self.instanceof_narrowing(left, right, positive).into_iter().collect(),
                BinaryOp::In => self.in_narrowing(left, right, positive).into_iter().collect(),
                _ => Vec::new(),
            },
            Expr::Ident(ident) if positive => {
                let Some(current) = self.current_type(&ident.name) else {
                    return Vec::new();
                };
                let truthy = Type::union(
                    current
                        .members()
                        .iter()
                        .filter(|m| !m.is_nullish() && **m != Type::Literal(LiteralType::Boolean(false)))
                        .cloned(),
                );
                changed(&ident.name, &current, truthy)
            }
            _ => Vec::new(),
        }
    }

    /// Narrowings of `left && right` (or the negation of `left || right`):
    /// the right side is evaluated where the left one already holds.
    fn sequenced_narrowings(&mut self, left: &Node<Expr>, right: &Node<Expr>, positive: bool) -> Vec<Narrowing> {
        let mut result = self.narrowings(left, positive);
        if result.is_empty() {
            return self.narrowings(right, positive);
        }
        self.env.push_scope();
        self.apply_narrowings(result.clone());
        let on_right = self.narrowings(right, positive);
        self.env.pop_scope();
        for (name, ty) in on_right {
            match result.iter_mut().find(|(n, _)| *n == name) {
                Some(entry) => entry.1 = ty,
                None => result.push((name, ty)),
            }
        }
        result
    }

    /// Declares narrowed shadows of variables in the current scope.
    pub(crate) fn apply_narrowings(&mut self, narrowings: Vec<Narrowing>) {
        for (name, ty) in narrowings {
            let Some(original) = self.env.lookup(&name) else {
                continue;
            };
            let info = VarInfo {
                ty,
                declared: original.declared.clone(),
                mutable: original.mutable,
                hoisted: false,
            };
            self.env.declare(name, info);
        }
    }

    /// Apparent type of a variable; aliases of unions are seen as the union.
    fn current_type(&self, name: &str) -> Option<Type> {
        let ty = self.env.lookup(name)?.ty.clone();
        Some(match self.expand(&ty) {
            expanded @ Type::Union(_) => expanded,
            _ => ty,
        })
    }

    fn equality_narrowing(
        &mut self,
        subject: &Node<Expr>,
        other: &Node<Expr>,
        equal: bool,
        loose: bool,
    ) -> Option<Narrowing> {
        let comparand = match &other.value.unwrap_transparent() {
            Expr::Literal(Literal::Null) => Comparand::Null,
            Expr::Literal(Literal::Undefined) => Comparand::Undefined,
            Expr::Literal(Literal::String(s)) => match &subject.value.unwrap_transparent() {
                Expr::Unary {
                    op: UnaryOp::TypeOf,
                    ..
                } => Comparand::TypeofTag(s),
                _ => Comparand::Literal(LiteralType::String(s.clone())),
            },
            Expr::Literal(Literal::Number(n)) => Comparand::Literal(LiteralType::Number(*n)),
            Expr::Literal(Literal::Boolean(b)) => Comparand::Literal(LiteralType::Boolean(*b)),
            _ => return None,
        };

        match (subject.value.unwrap_transparent(), comparand) {
            (
                Expr::Unary {
                    op: UnaryOp::TypeOf,
                    expr,
                },
                Comparand::TypeofTag(tag),
            ) => {
                let Expr::Ident(ident) = expr.value.unwrap_transparent() else {
                    return None;
                };
                let current = self.current_type(&ident.name)?;
                let narrowed = narrow_by_typeof(&current, tag, equal);
                changed(&ident.name, &current, narrowed).into_iter().next()
            }
            (Expr::Ident(ident), comparand) => {
                let current = self.current_type(&ident.name)?;
                let narrowed = narrow_by_value(&current, &comparand, equal, loose);
                changed(&ident.name, &current, narrowed).into_iter().next()
            }
            (Expr::Member { object, property }, Comparand::Literal(lit)) => {
                let Expr::Ident(ident) = object.value.unwrap_transparent() else {
                    return None;
                };
                let current = self.current_type(&ident.name)?;
                if !matches!(current, Type::Union(_)) {
                    return None;
                }
                let key = &property.value.name;
                let narrowed = Type::union(current.members().iter().filter(|member| {
                    let Some(found) = self.lookup_member(member, key) else {
                        return !equal;
                    };
                    if equal {
                        could_equal(&found.ty, &lit)
                    } else {
                        found.ty != Type::Literal(lit.clone())
                    }
                }).cloned());
                changed(&ident.name, &current, narrowed).into_iter().next()
            }
            _ => None,
        }
    }

    fn instanceof_narrowing(&mut self, subject: &Node<Expr>, class: &Node<Expr>, positive: bool) -> Option<Narrowing> {
        let Expr::Ident(ident) = subject.value.unwrap_transparent() else {
            return None;
        };
        let Expr::Ident(class_ident) = class.value.unwrap_transparent() else {
            return None;
        };
        let Some(Type::Class(class_name)) = self.current_type(&class_ident.name) else {
            return None;
        };
        let current = self.current_type(&ident.name)?;

        let is_instance = |checker: &Self, ty: &Type| match ty {
            Type::Named { name, .. } => checker.env.is_subclass_of(name, &class_name),
            _ => false,
        };
        let narrowed = if positive {
            let matching: Vec<Type> = current
                .members()
                .iter()
                .filter(|m| is_instance(self, m))
                .cloned()
                .collect();
            if matching.is_empty() {
                self.class_self_type(&class_name)
            } else {
                Type::union(matching)
            }
        } else {
            Type::union(
                current
                    .members()
                    .iter()
                    .filter(|m| !is_instance(self, m))
                    .cloned(),
            )
        };
        changed(&ident.name, &current, narrowed).into_iter().next()
    }

    fn in_narrowing(&mut self, key: &Node<Expr>, subject: &Node<Expr>, positive: bool) -> Option<Narrowing> {
        let Expr::Literal(Literal::String(key)) = key.value.unwrap_transparent() else {
            return None;
        };
        let Expr::Ident(ident) = subject.value.unwrap_transparent() else {
            return None;
        };
        let current = self.current_type(&ident.name)?;
        if !matches!(current, Type::Union(_)) {
            return None;
        }
        let narrowed = Type::union(
            current
                .members()
                .iter()
                .filter(|m| {
                    let has = m.is_permissive() || self.lookup_member(m, key).is_some();
                    has == positive
                })
                .cloned(),
        );
        changed(&ident.name, &current, narrowed).into_iter().next()
    }
}

/// A narrowing when the type actually changed.
fn changed(name: &str, before: &Type, after: Type) -> Vec<Narrowing> {
    if after == *before {
        Vec::new()
    } else {
        vec![(name.to_string(), after)]
    }
}

fn narrow_by_typeof(current: &Type, tag: &str, equal: bool) -> Type {
    if !TypeHelpers::is_valid_typeof_tag(tag) {
        return current.clone();
    }
    if equal && matches!(current, Type::Unknown | Type::Any) {
        return match tag {
            "string" => Type::String,
            "number" => Type::Number,
            "boolean" => Type::Boolean,
            "undefined" => Type::Undefined,
            _ => current.clone(),
        };
    }
    Type::union(
        current
            .members()
            .iter()
            .filter(|member| match TypeHelpers::typeof_tag(member) {
                Some(member_tag) => (member_tag == tag) == equal,
                None => true,
            })
            .cloned(),
    )
}

fn narrow_by_value(current: &Type, comparand: &Comparand<'_>, equal: bool, loose: bool) -> Type {
    let matches_value = |member: &Type| -> bool {
        match comparand {
            Comparand::Null if loose => member.is_nullish(),
            Comparand::Undefined if loose => member.is_nullish(),
            Comparand::Null => matches!(member, Type::Null),
            Comparand::Undefined => matches!(member, Type::Undefined | Type::Void),
            Comparand::Literal(lit) => *member == Type::Literal(lit.clone()),
            Comparand::TypeofTag(_) => false,
        }
    };

    if equal {
        if let Comparand::Literal(lit) = comparand {
            let kept: Vec<Type> = current
                .members()
                .iter()
                .filter(|m| could_equal(m, lit))
                .cloned()
                .collect();
            return if kept.iter().any(|m| !matches!(m, Type::Literal(_))) || kept.is_empty() {
                Type::union(kept)
            } else {
                Type::Literal(lit.clone())
            };
        }
        if current.is_permissive() {
            return current.clone();
        }
        Type::union(current.members().iter().filter(|m| matches_value(m)).cloned())
    } else {
        if current.is_permissive() {
            return current.clone();
        }
        Type::union(current.members().iter().filter(|m| !matches_value(m)).cloned())
    }
}

/// True when a value of type `ty` may equal the literal.
fn could_equal(ty: &Type, lit: &LiteralType) -> bool {
    ty.members().iter().any(|member| match (member, lit) {
        (Type::Literal(l), _) => l == lit,
        (Type::Number, LiteralType::Number(_))
        | (Type::String, LiteralType::String(_))
        | (Type::Boolean, LiteralType::Boolean(_)) => true,
        (Type::Any | Type::Unknown | Type::Error | Type::Generic(_), _) => true,
        _ => false,
    })
}
