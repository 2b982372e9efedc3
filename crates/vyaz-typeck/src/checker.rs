//! Main type checker struct

use std::collections::{HashMap, HashSet};

use vyaz_ast::{
    Decl, Diagnostic, ExportDecl, ImportDecl, ModuleItem, Node, Program, Span, Stmt, VarDecl,
    VarDeclKind,
};

use crate::builtins;
use crate::env::{TypeDef, TypeEnv, VarInfo};
use crate::error::{TypeError, TypeErrorKind};
use crate::typed_ast::TypedProgram;
use crate::types::Type;

/// Options controlling a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckOptions {
    /// Report gaps in type information as errors instead of warnings
    pub strict: bool,
    /// Skip checking entirely
    pub no_type_check: bool,
}

/// State of the function whose body is being checked.
#[derive(Debug, Clone)]
pub(crate) struct FunctionContext {
    /// Declared return type; for async functions the awaited type
    pub declared_ret: Option<Type>,
    pub is_async: bool,
    pub returns: Vec<Type>,
}

/// State of the class whose body is being checked.
#[derive(Debug, Clone)]
pub(crate) struct ClassContext {
    pub name: String,
    pub type_args: Vec<Type>,
    pub base: Option<Type>,
    pub is_static: bool,
    pub in_constructor: bool,
}

/// Main type checker
pub struct TypeChecker {
    pub(crate) env: TypeEnv,
    pub(crate) errors: Vec<TypeError>,
    reported: HashSet<(usize, usize, String)>,
    /// Functions declared with bodiless overload signatures
    pub(crate) overloads: HashSet<String>,
    pub(crate) options: CheckOptions,
    pub(crate) functions: Vec<FunctionContext>,
    pub(crate) classes: Vec<ClassContext>,
    pub(crate) expr_types: HashMap<Span, Type>,
    pub(crate) loop_depth: usize,
    pub(crate) switch_depth: usize,
}

impl TypeChecker {
    pub fn new(options: CheckOptions) -> Self {
        let mut env = TypeEnv::new();
        builtins::install_globals(&mut env);
        // Module scope sits above the globals so user code may shadow them.
        env.push_scope();

        Self {
            env,
            errors: Vec::new(),
            reported: HashSet::new(),
            overloads: HashSet::new(),
            options,
            functions: Vec::new(),
            classes: Vec::new(),
            expr_types: HashMap::new(),
            loop_depth: 0,
            switch_depth: 0,
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(items = program.items.len(), strict = self.options.strict))]
    pub fn check_program(mut self, program: Program) -> (TypedProgram, Vec<Diagnostic>) {
        if self.options.no_type_check {
            tracing::debug!("type checking disabled");
            return (TypedProgram::unchecked(program), Vec::new());
        }

        for item in &program.items {
            if let ModuleItem::Import(import) = &item.value {
                self.declare_import(import);
            }
        }

        let (decls, vars) = module_declarations(&program);
        self.hoist(&decls, &vars);

        for item in &program.items {
            self.check_module_item(item);
        }

        let strict = self.options.strict;
        let mut diagnostics: Vec<Diagnostic> = self
            .errors
            .into_iter()
            .map(|err| err.into_diagnostic(strict))
            .collect();
        // Hoisting reports declarations ahead of the statements around them.
        diagnostics.sort_by_key(|diagnostic| diagnostic.span.start);
        tracing::debug!(diagnostics = diagnostics.len(), "type check finished");

        (
            TypedProgram {
                program,
                expr_types: self.expr_types,
            },
            diagnostics,
        )
    }

    /// Records an error once per span and message.
    pub(crate) fn report(&mut self, kind: TypeErrorKind, span: Span) {
        let key = (span.start, span.end, kind.to_string());
        if self.reported.insert(key) {
            self.errors.push(TypeError::new(kind, span));
        }
    }

    pub(crate) fn generic_error(&mut self, message: impl Into<String>, span: Span) {
        self.report(TypeErrorKind::Generic(message.into()), span);
    }

    /// Bindings from other modules are checked as `любой`.
    fn declare_import(&mut self, import: &ImportDecl) {
        for specifier in &import.specifiers {
            let name = specifier.local_name().to_string();
            self.env.declare(name.clone(), VarInfo::new(Type::Any, false));
            self.env.define_type(name, TypeDef::Opaque);
        }
    }

    fn check_module_item(&mut self, item: &Node<ModuleItem>) {
        match &item.value {
            ModuleItem::Import(_) => {}
            ModuleItem::Stmt(stmt) => self.check_stmt(stmt),
            ModuleItem::Decl(decl) => self.check_decl(&decl.value, decl.span),
            ModuleItem::Export(export) => match export {
                ExportDecl::Decl(decl) | ExportDecl::DefaultDecl(decl) => {
                    self.check_decl(&decl.value, decl.span)
                }
                ExportDecl::Default(expr) => {
                    self.check_expr(expr);
                }
                ExportDecl::Named {
                    specifiers,
                    source: None,
                    ..
                } => {
                    for specifier in specifiers {
                        let name = &specifier.local.value.name;
                        if self.env.lookup(name).is_none() && self.env.lookup_type(name).is_none() {
                            self.report(
                                TypeErrorKind::UndefinedVariable(name.clone()),
                                specifier.local.span,
                            );
                        }
                    }
                }
                ExportDecl::Named { .. } | ExportDecl::All { .. } => {}
            },
        }
    }

    /// Pre-declares every name of a scope so declarations may refer to each
    /// other regardless of order. Type names are registered before any type
    /// is converted; values are declared after all types are known.
    pub(crate) fn hoist(&mut self, decls: &[&Decl], vars: &[&VarDecl]) {
        for decl in decls {
            self.register_type_name(decl);
        }
        for decl in decls {
            self.define_type_decl(decl);
        }
        for decl in decls {
            self.declare_decl_value(decl);
        }
        for var in vars {
            self.hoist_var(var);
        }
    }

    fn hoist_var(&mut self, var: &VarDecl) {
        for declarator in &var.declarations {
            let annotation = match &declarator.pattern.value {
                vyaz_ast::Pattern::Ident {
                    type_annotation: Some(ty),
                    ..
                } => Some(self.convert_type(ty)),
                _ => None,
            };
            for name in declarator.pattern.value.bound_names() {
                if self.env.current_scope_entry(name).is_some() {
                    continue;
                }
                let ty = annotation.clone().unwrap_or(Type::Any);
                let mut info = VarInfo::new(ty, var.kind != VarDeclKind::Const);
                info.hoisted = true;
                self.env.declare(name.to_string(), info);
            }
        }
    }

    /// Collects the declarations directly inside a block.
    pub(crate) fn hoist_block(&mut self, stmts: &[Node<Stmt>]) {
        let mut decls = Vec::new();
        let mut vars = Vec::new();
        for stmt in stmts {
            match &stmt.value {
                Stmt::Decl(decl) => match decl.as_ref() {
                    Decl::Var(var) => vars.push(var),
                    other => decls.push(other),
                },
                Stmt::VarDecl(var) => vars.push(var),
                _ => {}
            }
        }
        self.hoist(&decls, &vars);
    }
}

/// Declarations and variables at module level, including exported ones.
fn module_declarations(program: &Program) -> (Vec<&Decl>, Vec<&VarDecl>) {
    let mut decls = Vec::new();
    let mut vars = Vec::new();

    for item in &program.items {
        let decl = match &item.value {
            ModuleItem::Decl(decl) => Some(&decl.value),
            ModuleItem::Export(ExportDecl::Decl(decl))
            | ModuleItem::Export(ExportDecl::DefaultDecl(decl)) => Some(&decl.value),
            ModuleItem::Stmt(stmt) => match &stmt.value {
                Stmt::VarDecl(var) => {
                    vars.push(var);
                    None
                }
                Stmt::Decl(decl) => Some(decl.as_ref()),
                _ => None,
            },
            _ => None,
        };
        match decl {
            Some(Decl::Var(var)) => vars.push(var),
            Some(other) => decls.push(other),
            None => {}
        }
    }

    (decls, vars)
}
