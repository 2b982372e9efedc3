//! Statement checking methods

use vyaz_ast::{ForInLeft, ForInit, Node, Pattern, Stmt, SwitchCase, VarDeclKind};

use crate::checker::TypeChecker;
use crate::helpers::TypeHelpers;
use crate::types::Type;

impl TypeChecker {
    /// Checks a statement list in its own scope. Declarations are hoisted
    /// first; an `если` without `иначе` whose branch always leaves the block
    /// narrows the rest of the block by the negated condition.
    pub(crate) fn check_block(&mut self, stmts: &[Node<Stmt>]) {
        let depth = self.env.depth();
        self.env.push_scope();
        self.hoist_block(stmts);

        for stmt in stmts {
            self.check_stmt(stmt);

            if let Stmt::If {
                condition,
                then_stmt,
                else_stmt: None,
            } = &stmt.value
            {
                if TypeHelpers::terminates(&then_stmt.value, true) {
                    let narrowed = self.narrowings(condition, false);
                    if !narrowed.is_empty() {
                        self.env.push_scope();
                        self.apply_narrowings(narrowed);
                    }
                }
            }
        }

        self.env.truncate(depth);
    }

    pub(crate) fn check_stmt(&mut self, stmt: &Node<Stmt>) {
        match &stmt.value {
            Stmt::Expr(expr) => {
                self.check_expr(expr);
            }
            Stmt::VarDecl(var) => self.check_var_decl(var),
            Stmt::Decl(decl) => self.check_decl(decl, stmt.span),
            Stmt::Return(value) => self.check_return(value.as_ref(), stmt),
            Stmt::If {
                condition,
                then_stmt,
                else_stmt,
            } => {
                self.check_expr(condition);
                self.check_narrowed(condition, true, then_stmt);
                if let Some(else_stmt) = else_stmt {
                    self.check_narrowed(condition, false, else_stmt);
                }
            }
            Stmt::For {
                init,
                condition,
                update,
                body,
            } => {
                self.env.push_scope();
                match init {
                    Some(ForInit::VarDecl(var)) => self.check_var_decl(var),
                    Some(ForInit::Expr(expr)) => {
                        self.check_expr(expr);
                    }
                    None => {}
                }
                if let Some(condition) = condition {
                    self.check_expr(condition);
                }
                if let Some(update) = update {
                    self.check_expr(update);
                }
                self.check_loop_body(body);
                self.env.pop_scope();
            }
            Stmt::ForIn { left, right, body } => {
                let right_ty = self.check_expr(right);
                if right_ty.non_nullish().is_nullish() {
                    self.generic_error(
                        format!("the right side of a 'в' loop cannot be of type '{}'", right_ty),
                        right.span,
                    );
                }
                self.env.push_scope();
                self.bind_loop_left(left, &Type::String);
                self.check_loop_body(body);
                self.env.pop_scope();
            }
            Stmt::ForOf { left, right, body } => {
                let right_ty = self.check_expr(right);
                let elem = self.iterated_type(&right_ty, right.span);
                self.env.push_scope();
                self.bind_loop_left(left, &elem);
                self.check_loop_body(body);
                self.env.pop_scope();
            }
            Stmt::While { condition, body } => {
                self.check_expr(condition);
                self.loop_depth += 1;
                self.check_narrowed(condition, true, body);
                self.loop_depth -= 1;
            }
            Stmt::DoWhile { body, condition } => {
                self.check_loop_body(body);
                self.check_expr(condition);
            }
            Stmt::Block(block) => self.check_block(&block.stmts),
            Stmt::Break(label) => {
                if label.is_none() && self.loop_depth == 0 && self.switch_depth == 0 {
                    self.generic_error(
                        "'прервать' can only be used within a loop or 'выбор'",
                        stmt.span,
                    );
                }
            }
            Stmt::Continue(label) => {
                if label.is_none() && self.loop_depth == 0 {
                    self.generic_error("'продолжить' can only be used within a loop", stmt.span);
                }
            }
            Stmt::Throw(expr) => {
                self.check_expr(expr);
            }
            Stmt::Try {
                block,
                catch,
                finally,
            } => {
                self.check_block(&block.value.stmts);
                if let Some(catch) = catch {
                    self.env.push_scope();
                    if let Some(param) = &catch.param {
                        self.bind_pattern(param, &Type::Any, true, VarDeclKind::Let);
                    }
                    self.check_block(&catch.body.value.stmts);
                    self.env.pop_scope();
                }
                if let Some(finally) = finally {
                    self.check_block(&finally.value.stmts);
                }
            }
            Stmt::Switch {
                discriminant,
                cases,
            } => self.check_switch(discriminant, cases),
            Stmt::Empty | Stmt::Error => {}
        }
    }

    fn check_return(&mut self, value: Option<&Node<vyaz_ast::Expr>>, stmt: &Node<Stmt>) {
        let Some(ctx) = self.functions.last() else {
            if let Some(value) = value {
                self.check_expr(value);
            }
            self.generic_error("'вернуть' can only be used within a function body", stmt.span);
            return;
        };
        let declared = ctx.declared_ret.clone();

        let (ty, span) = match value {
            Some(value) => (self.check_expr_expected(value, declared.as_ref()), value.span),
            None => (Type::Undefined, stmt.span),
        };
        if let Some(declared) = &declared {
            self.check_assignable(&ty, declared, span);
        }
        if let Some(ctx) = self.functions.last_mut() {
            ctx.returns.push(ty);
        }
    }

    /// Checks `body` with the narrowings implied by `condition`.
    fn check_narrowed(&mut self, condition: &Node<vyaz_ast::Expr>, positive: bool, body: &Node<Stmt>) {
        let narrowed = self.narrowings(condition, positive);
        if narrowed.is_empty() {
            self.check_stmt(body);
            return;
        }
        self.env.push_scope();
        self.apply_narrowings(narrowed);
        self.check_stmt(body);
        self.env.pop_scope();
    }

    fn check_loop_body(&mut self, body: &Node<Stmt>) {
        self.loop_depth += 1;
        self.check_stmt(body);
        self.loop_depth -= 1;
    }

    fn check_switch(&mut self, discriminant: &Node<vyaz_ast::Expr>, cases: &[SwitchCase]) {
        let discriminant_ty = self.check_expr(discriminant);
        self.env.push_scope();
        self.switch_depth += 1;
        for case in cases {
            if let Some(test) = &case.test {
                let test_ty = self.check_expr(test);
                if !self.is_assignable(&test_ty, &discriminant_ty)
                    && !self.is_assignable(&discriminant_ty, &test_ty)
                {
                    self.generic_error(
                        format!(
                            "type '{}' is not comparable to type '{}'",
                            test_ty, discriminant_ty
                        ),
                        test.span,
                    );
                }
            }
            self.hoist_block(&case.consequent);
            for stmt in &case.consequent {
                self.check_stmt(stmt);
            }
        }
        self.switch_depth -= 1;
        self.env.pop_scope();
    }

    /// Element type produced by `для (... из value)`.
    fn iterated_type(&mut self, ty: &Type, span: vyaz_ast::Span) -> Type {
        match ty {
            Type::Any | Type::Error => ty.clone(),
            Type::Array(elem) => (**elem).clone(),
            t if t.is_string_like() => Type::String,
            Type::Union(members) if members.iter().all(|m| matches!(m, Type::Array(_))) => {
                Type::union(members.iter().map(Type::element_type))
            }
            _ => {
                self.generic_error(format!("type '{}' is not iterable", ty), span);
                Type::Error
            }
        }
    }

    fn bind_loop_left(&mut self, left: &ForInLeft, ty: &Type) {
        match left {
            ForInLeft::VarDecl(var) => {
                for declarator in &var.declarations {
                    let ty = match &declarator.pattern.value {
                        Pattern::Ident {
                            type_annotation: Some(annotation),
                            ..
                        } => {
                            let declared = self.convert_type(annotation);
                            self.check_assignable(ty, &declared, declarator.pattern.span);
                            declared
                        }
                        _ => ty.clone(),
                    };
                    self.bind_pattern(
                        &declarator.pattern,
                        &ty,
                        var.kind != VarDeclKind::Const,
                        var.kind,
                    );
                }
            }
            ForInLeft::Pattern(pattern) => {
                for name in pattern.value.bound_names() {
                    match self.env.lookup(name) {
                        None => self.report(
                            crate::error::TypeErrorKind::UndefinedVariable(name.to_string()),
                            pattern.span,
                        ),
                        Some(info) if !info.mutable => self.report(
                            crate::error::TypeErrorKind::AssignToConst(name.to_string()),
                            pattern.span,
                        ),
                        Some(_) => {}
                    }
                }
            }
        }
    }
}
