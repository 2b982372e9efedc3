//! Program, statement and declaration emission

use std::collections::{HashMap, HashSet, VecDeque};

use vyaz_ast::*;

use crate::names::{js_name, quote_string, INTERNAL_PREFIX, PRELUDE};
use crate::sourcemap::Mapping;
use crate::writer::JsWriter;
use crate::{LinkedImport, ModuleFormat};

/// Walks one program and writes its output form.
pub(crate) struct JsGenerator<'a> {
    pub(crate) out: JsWriter,
    format: ModuleFormat<'a>,
    track_positions: bool,
    /// Module-level value bindings, imports included
    top_level: HashSet<String>,
    /// Module-level interfaces and aliases
    type_names: HashSet<String>,
    /// Free identifiers read by emitted code
    value_refs: HashSet<String>,
    /// Names bound inside functions and blocks, innermost last
    scopes: Vec<HashSet<String>>,
    /// Bundled mode: import local name to the expression that reads it
    import_bindings: HashMap<String, String>,
    /// Bundled mode: exported name to the expression that reads it
    exports: Vec<(String, String)>,
    /// Bundled mode: module variables re-exported wholesale
    star_exports: Vec<String>,
    /// Bundled mode: one variable per linked module, in item order
    linked: Vec<LinkedModule>,
    /// Bundled mode: variables of re-export sources not yet emitted
    reexport_vars: VecDeque<String>,
}

struct LinkedModule {
    var: String,
    target: LinkedImport,
    /// Side-effect imports and re-exports are required even when unread.
    always: bool,
    locals: Vec<String>,
}

impl<'a> JsGenerator<'a> {
    pub(crate) fn new(format: ModuleFormat<'a>, track_positions: bool) -> Self {
        Self {
            out: JsWriter::new(track_positions),
            format,
            track_positions,
            top_level: HashSet::new(),
            type_names: HashSet::new(),
            value_refs: HashSet::new(),
            scopes: Vec::new(),
            import_bindings: HashMap::new(),
            exports: Vec::new(),
            star_exports: Vec::new(),
            linked: Vec::new(),
            reexport_vars: VecDeque::new(),
        }
    }

    pub(crate) fn generate_program(mut self, program: &Program) -> (String, Option<Vec<Mapping>>) {
        self.collect_top_level(program);
        if let ModuleFormat::Bundled(linker) = self.format {
            self.link_imports(program, linker);
        }

        for item in &program.items {
            match &item.value {
                ModuleItem::Import(_) => {}
                ModuleItem::Export(export) => self.emit_export(export, item.span),
                ModuleItem::Stmt(stmt) => self.emit_stmt(stmt),
                ModuleItem::Decl(decl) => self.emit_decl(&decl.value, decl.span),
            }
        }

        let mut header = JsWriter::new(self.track_positions);
        match self.format {
            ModuleFormat::Esm => self.write_esm_imports(&mut header, program),
            ModuleFormat::Bundled(_) => self.write_bundled_header(&mut header),
        }
        for (name, declaration) in PRELUDE {
            if self.value_refs.contains(*name) && !self.top_level.contains(*name) {
                header.write(declaration);
                header.newline();
            }
        }
        let body = std::mem::replace(&mut self.out, JsWriter::new(false));
        header.append(body);
        header.finish()
    }

    fn collect_top_level(&mut self, program: &Program) {
        for item in &program.items {
            match &item.value {
                ModuleItem::Import(import) => self
                    .top_level
                    .extend(import.specifiers.iter().map(|s| s.local_name().to_string())),
                ModuleItem::Decl(decl) => self.declare_top_level(&decl.value),
                ModuleItem::Export(ExportDecl::Decl(decl) | ExportDecl::DefaultDecl(decl)) => {
                    self.declare_top_level(&decl.value)
                }
                ModuleItem::Stmt(stmt) => match &stmt.value {
                    Stmt::VarDecl(var) => self.top_level.extend(var_names(var)),
                    Stmt::Decl(decl) => self.declare_top_level(decl),
                    _ => {}
                },
                ModuleItem::Export(_) => {}
            }
        }
    }

    fn declare_top_level(&mut self, decl: &Decl) {
        let target = if decl.is_type_only() {
            &mut self.type_names
        } else {
            &mut self.top_level
        };
        target.extend(decl.declared_names().into_iter().map(str::to_string));
    }

    /// Assigns a module variable to every runtime import and re-export source.
    fn link_imports(&mut self, program: &Program, linker: &dyn crate::ImportLinker) {
        for item in &program.items {
            match &item.value {
                ModuleItem::Import(import) if !import.type_only => {
                    let var = format!("{INTERNAL_PREFIX}import_{}", self.linked.len());
                    let mut locals = Vec::new();
                    for specifier in &import.specifiers {
                        let access = match specifier {
                            ImportSpecifier::Named { type_only: true, .. } => continue,
                            ImportSpecifier::Named { imported, .. } => {
                                format!("{var}.{}", js_name(&imported.value.name))
                            }
                            ImportSpecifier::Default(_) => format!("{var}.default"),
                            ImportSpecifier::Namespace(_) => var.clone(),
                        };
                        let local = specifier.local_name().to_string();
                        self.import_bindings.insert(local.clone(), access);
                        locals.push(local);
                    }
                    self.linked.push(LinkedModule {
                        var,
                        target: linker.link(&import.source),
                        always: import.specifiers.is_empty(),
                        locals,
                    });
                }
                ModuleItem::Export(
                    ExportDecl::Named {
                        source: Some((source, _)),
                        type_only: false,
                        ..
                    }
                    | ExportDecl::All { source, .. },
                ) => {
                    let var = format!("{INTERNAL_PREFIX}import_{}", self.linked.len());
                    self.reexport_vars.push_back(var.clone());
                    self.linked.push(LinkedModule {
                        var,
                        target: linker.link(source),
                        always: true,
                        locals: Vec::new(),
                    });
                }
                _ => {}
            }
        }
    }

    fn write_esm_imports(&self, header: &mut JsWriter, program: &Program) {
        for item in &program.items {
            let ModuleItem::Import(import) = &item.value else {
                continue;
            };
            if import.type_only {
                continue;
            }
            let source = quote_string(&output_specifier(&import.source));
            if import.specifiers.is_empty() {
                header.mark(item.span);
                header.write(&format!("import {source};"));
                header.newline();
                continue;
            }

            let used = |name: &str| self.value_refs.contains(name);
            let mut clauses = Vec::new();
            let mut named = Vec::new();
            for specifier in &import.specifiers {
                if !used(specifier.local_name()) {
                    continue;
                }
                match specifier {
                    ImportSpecifier::Default(local) => clauses.push(js_name(&local.value.name).into_owned()),
                    ImportSpecifier::Namespace(local) => {
                        clauses.push(format!("* as {}", js_name(&local.value.name)))
                    }
                    ImportSpecifier::Named { type_only: true, .. } => {}
                    ImportSpecifier::Named { imported, local, .. } => {
                        let imported = js_name(&imported.value.name);
                        match local {
                            Some(local) if local.value.name != *imported => {
                                named.push(format!("{imported} as {}", js_name(&local.value.name)))
                            }
                            _ => named.push(imported.into_owned()),
                        }
                    }
                }
            }
            if !named.is_empty() {
                clauses.push(format!("{{ {} }}", named.join(", ")));
            }
            if clauses.is_empty() {
                continue;
            }
            header.mark(item.span);
            header.write(&format!("import {} from {source};", clauses.join(", ")));
            header.newline();
        }
    }

    fn write_bundled_header(&self, header: &mut JsWriter) {
        for (name, access) in &self.exports {
            header.write(&format!(
                "{INTERNAL_PREFIX}export({INTERNAL_PREFIX}exports, {}, () => {access});",
                quote_string(name)
            ));
            header.newline();
        }
        for module in &self.linked {
            let used = module.always || module.locals.iter().any(|l| self.value_refs.contains(l));
            if !used {
                continue;
            }
            let load = match &module.target {
                LinkedImport::Module(id) => format!("{INTERNAL_PREFIX}require({})", quote_string(id)),
                LinkedImport::External(package) => {
                    format!("{INTERNAL_PREFIX}external({})", quote_string(package))
                }
            };
            header.write(&format!("const {} = {load};", module.var));
            header.newline();
        }
        for var in &self.star_exports {
            header.write(&format!("{INTERNAL_PREFIX}exportAll({INTERNAL_PREFIX}exports, {var});"));
            header.newline();
        }
    }

    fn emit_export(&mut self, export: &ExportDecl, span: Span) {
        let bundled = matches!(self.format, ModuleFormat::Bundled(_));
        match export {
            ExportDecl::Decl(decl) => {
                if is_erased(&decl.value) {
                    return;
                }
                if bundled {
                    for name in decl.value.declared_names() {
                        let name = js_name(name).into_owned();
                        self.exports.push((name.clone(), name));
                    }
                    self.emit_decl(&decl.value, decl.span);
                } else {
                    self.out.mark(span);
                    self.out.write("export ");
                    self.emit_decl(&decl.value, decl.span);
                }
            }
            ExportDecl::DefaultDecl(decl) => {
                if is_erased(&decl.value) {
                    return;
                }
                let name = decl.value.declared_names().first().map(|n| js_name(n).into_owned());
                if bundled {
                    if let Some(name) = name {
                        self.exports.push(("default".to_string(), name));
                    }
                    self.emit_decl(&decl.value, decl.span);
                } else if matches!(decl.value, Decl::Function(_) | Decl::Class(_)) {
                    self.out.mark(span);
                    self.out.write("export default ");
                    self.emit_decl(&decl.value, decl.span);
                } else {
                    self.emit_decl(&decl.value, decl.span);
                    if let Some(name) = name {
                        self.out.write(&format!("export {{ {name} as default }};"));
                        self.out.newline();
                    }
                }
            }
            ExportDecl::Default(expr) => {
                self.out.mark(span);
                if bundled {
                    let local = format!("{INTERNAL_PREFIX}default");
                    self.out.write(&format!("const {local} = "));
                    self.emit_expr(expr);
                    self.exports.push(("default".to_string(), local));
                } else {
                    self.out.write("export default ");
                    self.emit_expr(expr);
                }
                self.out.write(";");
                self.out.newline();
            }
            ExportDecl::Named {
                specifiers,
                source,
                type_only,
            } => {
                if *type_only {
                    return;
                }
                let kept: Vec<&ExportSpecifier> = specifiers
                    .iter()
                    .filter(|s| {
                        !s.type_only
                            && (source.is_some()
                                || !self.type_names.contains(&s.local.value.name)
                                || self.top_level.contains(&s.local.value.name))
                    })
                    .collect();
                if let Some((source, _)) = source {
                    self.emit_reexport(&kept, source, span);
                    return;
                }
                if bundled {
                    for specifier in kept {
                        let access = self.reference(&specifier.local.value.name);
                        self.exports.push((js_name(specifier.exported_name()).into_owned(), access));
                    }
                    return;
                }
                if kept.is_empty() {
                    return;
                }
                for specifier in &kept {
                    self.value_refs.insert(specifier.local.value.name.clone());
                }
                self.out.mark(span);
                self.out.write(&format!("export {{ {} }};", export_list(&kept)));
                self.out.newline();
            }
            ExportDecl::All { source, as_name, .. } => {
                if bundled {
                    let Some(var) = self.reexport_vars.pop_front() else {
                        return;
                    };
                    match as_name {
                        Some(name) => self.exports.push((js_name(&name.value.name).into_owned(), var)),
                        None => self.star_exports.push(var),
                    }
                    return;
                }
                self.out.mark(span);
                let source = quote_string(&output_specifier(source));
                match as_name {
                    Some(name) => self
                        .out
                        .write(&format!("export * as {} from {source};", js_name(&name.value.name))),
                    None => self.out.write(&format!("export * from {source};")),
                }
                self.out.newline();
            }
        }
    }

    fn emit_reexport(&mut self, specifiers: &[&ExportSpecifier], source: &str, span: Span) {
        if let ModuleFormat::Bundled(_) = self.format {
            let Some(var) = self.reexport_vars.pop_front() else {
                return;
            };
            for specifier in specifiers {
                let access = format!("{var}.{}", js_name(&specifier.local.value.name));
                self.exports.push((js_name(specifier.exported_name()).into_owned(), access));
            }
            return;
        }
        if specifiers.is_empty() {
            return;
        }
        self.out.mark(span);
        self.out.write(&format!(
            "export {{ {} }} from {};",
            export_list(specifiers),
            quote_string(&output_specifier(source))
        ));
        self.out.newline();
    }

    // Scopes

    pub(crate) fn push_scope(&mut self, names: impl IntoIterator<Item = String>) {
        self.scopes.push(names.into_iter().collect());
    }

    pub(crate) fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn is_local(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name))
    }

    /// Output expression reading the variable `name` at this point.
    pub(crate) fn reference(&mut self, name: &str) -> String {
        if !self.is_local(name) {
            self.value_refs.insert(name.to_string());
            if let Some(access) = self.import_bindings.get(name) {
                return access.clone();
            }
        }
        js_name(name).into_owned()
    }

    // Statements

    pub(crate) fn emit_stmt(&mut self, stmt: &Node<Stmt>) {
        match &stmt.value {
            Stmt::Empty | Stmt::Error => return,
            Stmt::Decl(decl) => return self.emit_decl(decl, stmt.span),
            _ => {}
        }
        self.out.mark(stmt.span);
        match &stmt.value {
            Stmt::Expr(expr) => {
                if starts_ambiguously(&expr.value) {
                    self.out.write("(");
                    self.emit_expr(expr);
                    self.out.write(")");
                } else {
                    self.emit_expr(expr);
                }
                self.out.write(";");
            }
            Stmt::VarDecl(var) => {
                self.emit_var_decl(var);
                self.out.write(";");
            }
            Stmt::Return(value) => {
                self.out.write("return");
                if let Some(value) = value {
                    self.out.write(" ");
                    self.emit_expr(value);
                }
                self.out.write(";");
            }
            Stmt::If {
                condition,
                then_stmt,
                else_stmt,
            } => {
                self.emit_if(condition, then_stmt, else_stmt.as_deref());
            }
            Stmt::For {
                init,
                condition,
                update,
                body,
            } => {
                let names = match init {
                    Some(ForInit::VarDecl(var)) => var_names(var),
                    _ => Vec::new(),
                };
                self.push_scope(names);
                self.out.write("for (");
                match init {
                    Some(ForInit::VarDecl(var)) => self.emit_var_decl(var),
                    Some(ForInit::Expr(expr)) => self.emit_expr(expr),
                    None => {}
                }
                self.out.write(";");
                if let Some(condition) = condition {
                    self.out.write(" ");
                    self.emit_expr(condition);
                }
                self.out.write(";");
                if let Some(update) = update {
                    self.out.write(" ");
                    self.emit_expr(update);
                }
                self.out.write(") ");
                self.emit_body(body);
                self.pop_scope();
            }
            Stmt::ForIn { left, right, body } => self.emit_for_each(left, "in", right, body),
            Stmt::ForOf { left, right, body } => self.emit_for_each(left, "of", right, body),
            Stmt::While { condition, body } => {
                self.out.write("while (");
                self.emit_expr(condition);
                self.out.write(") ");
                self.emit_body(body);
            }
            Stmt::DoWhile { body, condition } => {
                self.out.write("do ");
                self.emit_body(body);
                self.out.write(" while (");
                self.emit_expr(condition);
                self.out.write(");");
            }
            Stmt::Block(block) => self.emit_block(block),
            Stmt::Break(label) => self.emit_jump("break", label.as_ref()),
            Stmt::Continue(label) => self.emit_jump("continue", label.as_ref()),
            Stmt::Throw(value) => {
                self.out.write("throw ");
                self.emit_expr(value);
                self.out.write(";");
            }
            Stmt::Try {
                block,
                catch,
                finally,
            } => {
                self.out.write("try ");
                self.emit_block(&block.value);
                if let Some(catch) = catch {
                    self.out.write(" catch ");
                    let names: Vec<String> = catch
                        .param
                        .iter()
                        .flat_map(|p| p.value.bound_names())
                        .map(str::to_string)
                        .collect();
                    self.push_scope(names);
                    if let Some(param) = &catch.param {
                        self.out.write("(");
                        self.emit_pattern(param);
                        self.out.write(") ");
                    }
                    self.emit_block(&catch.body.value);
                    self.pop_scope();
                }
                if let Some(finally) = finally {
                    self.out.write(" finally ");
                    self.emit_block(&finally.value);
                }
            }
            Stmt::Switch {
                discriminant,
                cases,
            } => {
                self.out.write("switch (");
                self.emit_expr(discriminant);
                self.out.write(") {");
                self.out.newline();
                self.out.indent();
                let names: Vec<String> = cases
                    .iter()
                    .flat_map(|case| declared_in(&case.consequent))
                    .collect();
                self.push_scope(names);
                for case in cases {
                    match &case.test {
                        Some(test) => {
                            self.out.write("case ");
                            self.emit_expr(test);
                            self.out.write(":");
                        }
                        None => self.out.write("default:"),
                    }
                    self.out.newline();
                    self.out.indent();
                    for stmt in &case.consequent {
                        self.emit_stmt(stmt);
                    }
                    self.out.dedent();
                }
                self.pop_scope();
                self.out.dedent();
                self.out.write("}");
            }
            Stmt::Empty | Stmt::Error | Stmt::Decl(_) => {}
        }
        self.out.newline();
    }

    fn emit_if(&mut self, condition: &Node<Expr>, then_stmt: &Node<Stmt>, otherwise: Option<&Node<Stmt>>) {
        self.out.write("if (");
        self.emit_expr(condition);
        self.out.write(") ");
        self.emit_body(then_stmt);
        let Some(otherwise) = otherwise else {
            return;
        };
        self.out.write(" else ");
        match &otherwise.value {
            Stmt::If {
                condition,
                then_stmt,
                else_stmt,
            } => {
                self.out.mark(otherwise.span);
                self.emit_if(condition, then_stmt, else_stmt.as_deref());
            }
            _ => self.emit_body(otherwise),
        }
    }

    fn emit_for_each(&mut self, left: &ForInLeft, keyword: &str, right: &Node<Expr>, body: &Node<Stmt>) {
        self.out.write("for (");
        let names = match left {
            ForInLeft::VarDecl(var) => {
                self.emit_var_decl_head(var);
                var_names(var)
            }
            ForInLeft::Pattern(pattern) => {
                self.emit_pattern(pattern);
                Vec::new()
            }
        };
        self.out.write(&format!(" {keyword} "));
        self.emit_expr(right);
        self.out.write(") ");
        self.push_scope(names);
        self.emit_body(body);
        self.pop_scope();
    }

    fn emit_jump(&mut self, keyword: &str, label: Option<&Node<Ident>>) {
        self.out.write(keyword);
        if let Some(label) = label {
            self.out.write(" ");
            self.out.write(&js_name(&label.value.name));
        }
        self.out.write(";");
    }

    /// A loop or branch body, always braced.
    fn emit_body(&mut self, body: &Node<Stmt>) {
        match &body.value {
            Stmt::Block(block) => self.emit_block(block),
            Stmt::Empty => self.out.write("{}"),
            _ => {
                self.out.write("{");
                self.out.newline();
                self.out.indent();
                let names = declared_in(std::slice::from_ref(body));
                self.push_scope(names);
                self.emit_stmt(body);
                self.pop_scope();
                self.out.dedent();
                self.out.write("}");
            }
        }
    }

    pub(crate) fn emit_block(&mut self, block: &BlockStmt) {
        if block.stmts.is_empty() {
            self.out.write("{}");
            return;
        }
        self.out.write("{");
        self.out.newline();
        self.out.indent();
        self.push_scope(declared_in(&block.stmts));
        for stmt in &block.stmts {
            self.emit_stmt(stmt);
        }
        self.pop_scope();
        self.out.dedent();
        self.out.write("}");
    }

    pub(crate) fn emit_var_decl(&mut self, var: &VarDecl) {
        self.emit_var_decl_head(var);
        for (i, declarator) in var.declarations.iter().enumerate() {
            if i == 0 {
                continue;
            }
            self.out.write(", ");
            self.emit_declarator(declarator);
        }
    }

    /// The keyword and first declarator of a declaration.
    fn emit_var_decl_head(&mut self, var: &VarDecl) {
        self.out.write(&format!("{} ", var.kind));
        if let Some(first) = var.declarations.first() {
            self.emit_declarator(first);
        }
    }

    fn emit_declarator(&mut self, declarator: &VarDeclarator) {
        self.emit_pattern(&declarator.pattern);
        if let Some(init) = &declarator.init {
            self.out.write(" = ");
            self.emit_expr(init);
        }
    }

    // Declarations

    pub(crate) fn emit_decl(&mut self, decl: &Decl, span: Span) {
        if is_erased(decl) {
            return;
        }
        self.out.mark(span);
        match decl {
            Decl::Function(function) => {
                let Some(body) = &function.body else {
                    return;
                };
                if function.is_async {
                    self.out.write("async ");
                }
                self.out.write("function ");
                self.out.mark(function.name.span);
                self.out.write(&js_name(&function.name.value.name));
                self.emit_function_rest(&function.params, &body.value);
            }
            Decl::Class(class) => self.emit_class(class),
            Decl::Var(var) => {
                self.emit_var_decl(var);
                self.out.write(";");
            }
            Decl::Interface(_) | Decl::TypeAlias(_) => return,
        }
        self.out.newline();
    }

    /// Parameter list and body of any function form.
    pub(crate) fn emit_function_rest(&mut self, params: &[Param], body: &BlockStmt) {
        self.push_scope(param_names(params));
        self.emit_params(params);
        self.out.write(" ");
        self.emit_block(body);
        self.pop_scope();
    }

    fn emit_class(&mut self, class: &ClassDecl) {
        self.out.write("class ");
        self.out.mark(class.name.span);
        self.out.write(&js_name(&class.name.value.name));
        if let Some(extends) = &class.extends {
            self.out.write(" extends ");
            self.emit_expr(&extends.base);
        }
        self.out.write(" {");
        self.out.newline();
        self.out.indent();
        for member in &class.members {
            self.emit_class_member(member);
        }
        self.out.dedent();
        self.out.write("}");
    }

    fn emit_class_member(&mut self, member: &ClassMember) {
        match member {
            ClassMember::Constructor { params, body, .. } => {
                let Some(body) = body else {
                    return;
                };
                self.out.mark(member.span());
                self.out.write("constructor");
                self.push_scope(param_names(params));
                self.emit_params(params);
                self.out.write(" ");
                self.emit_constructor_body(params, &body.value);
                self.pop_scope();
            }
            ClassMember::Method {
                name,
                params,
                body,
                is_static,
                is_async,
                ..
            } => {
                let Some(body) = body else {
                    return;
                };
                self.out.mark(member.span());
                if *is_static {
                    self.out.write("static ");
                }
                if *is_async {
                    self.out.write("async ");
                }
                self.emit_property_name(name);
                self.emit_function_rest(params, &body.value);
            }
            ClassMember::Property {
                name,
                init,
                is_static,
                is_abstract,
                ..
            } => {
                let (Some(init), false) = (init, *is_abstract) else {
                    return;
                };
                self.out.mark(member.span());
                if *is_static {
                    self.out.write("static ");
                }
                self.emit_property_name(name);
                self.out.write(" = ");
                self.emit_expr(init);
                self.out.write(";");
            }
            ClassMember::Getter {
                name, body, is_static, ..
            } => {
                let Some(body) = body else {
                    return;
                };
                self.out.mark(member.span());
                if *is_static {
                    self.out.write("static ");
                }
                self.out.write("get ");
                self.emit_property_name(name);
                self.emit_function_rest(&[], &body.value);
            }
            ClassMember::Setter {
                name,
                param,
                body,
                is_static,
                ..
            } => {
                let Some(body) = body else {
                    return;
                };
                self.out.mark(member.span());
                if *is_static {
                    self.out.write("static ");
                }
                self.out.write("set ");
                self.emit_property_name(name);
                self.emit_function_rest(std::slice::from_ref(param), &body.value);
            }
        }
        self.out.newline();
    }

    /// Constructor body with parameter properties assigned right after the
    /// parent constructor call, or first when there is none.
    fn emit_constructor_body(&mut self, params: &[Param], body: &BlockStmt) {
        let assignments: Vec<String> = params
            .iter()
            .filter(|p| p.property.is_some())
            .flat_map(|p| p.pattern.value.bound_names())
            .map(|name| {
                let name = js_name(name);
                format!("this.{name} = {name};")
            })
            .collect();
        let super_index = body.stmts.iter().position(|stmt| is_super_call(&stmt.value));

        self.out.write("{");
        self.out.newline();
        self.out.indent();
        self.push_scope(declared_in(&body.stmts));
        let split = super_index.map_or(0, |i| i + 1);
        for stmt in &body.stmts[..split] {
            self.emit_stmt(stmt);
        }
        for assignment in &assignments {
            self.out.write(assignment);
            self.out.newline();
        }
        for stmt in &body.stmts[split..] {
            self.emit_stmt(stmt);
        }
        self.pop_scope();
        self.out.dedent();
        self.out.write("}");
    }
}

/// Declarations that produce no output.
fn is_erased(decl: &Decl) -> bool {
    match decl {
        Decl::Interface(_) | Decl::TypeAlias(_) => true,
        Decl::Function(function) => function.body.is_none(),
        Decl::Class(_) | Decl::Var(_) => false,
    }
}

fn var_names(var: &VarDecl) -> Vec<String> {
    var.declarations
        .iter()
        .flat_map(|d| d.pattern.value.bound_names())
        .map(str::to_string)
        .collect()
}

pub(crate) fn param_names(params: &[Param]) -> Vec<String> {
    params
        .iter()
        .flat_map(|p| p.pattern.value.bound_names())
        .map(str::to_string)
        .collect()
}

/// Names a statement list binds for its whole block.
fn declared_in(stmts: &[Node<Stmt>]) -> Vec<String> {
    let mut names = Vec::new();
    for stmt in stmts {
        match &stmt.value {
            Stmt::VarDecl(var) => names.extend(var_names(var)),
            Stmt::Decl(decl) => names.extend(decl.declared_names().into_iter().map(str::to_string)),
            _ => {}
        }
    }
    names
}

fn is_super_call(stmt: &Stmt) -> bool {
    let Stmt::Expr(expr) = stmt else {
        return false;
    };
    matches!(
        &expr.value,
        Expr::Call { callee, .. } if matches!(callee.value, Expr::Super)
    )
}

/// Expression statements that would otherwise parse as a block or a
/// declaration.
pub(crate) fn starts_ambiguously(expr: &Expr) -> bool {
    matches!(leftmost(expr), Expr::Object(_) | Expr::Function { .. })
}

/// The subexpression written first when `expr` is emitted.
pub(crate) fn leftmost(expr: &Expr) -> &Expr {
    match expr {
        Expr::Binary { left, .. } => leftmost(&left.value),
        Expr::Assignment { target, .. } => leftmost(&target.value),
        Expr::Call { callee, .. } | Expr::OptionalCall { callee, .. } => leftmost(&callee.value),
        Expr::Member { object, .. }
        | Expr::Index { object, .. }
        | Expr::OptionalMember { object, .. }
        | Expr::OptionalIndex { object, .. } => leftmost(&object.value),
        Expr::Ternary { condition, .. } => leftmost(&condition.value),
        Expr::Unary { op, expr } if op.is_postfix() => leftmost(&expr.value),
        Expr::TypeCast { expr, .. } | Expr::NonNullAssertion(expr) => leftmost(&expr.value),
        other => other,
    }
}

/// Rewrites a source-file specifier to the file the output will live in.
fn output_specifier(specifier: &str) -> String {
    match specifier.strip_suffix(&format!(".{SOURCE_EXTENSION}")) {
        Some(stem) => format!("{stem}.js"),
        None => specifier.to_string(),
    }
}

fn export_list(specifiers: &[&ExportSpecifier]) -> String {
    specifiers
        .iter()
        .map(|s| {
            let local = js_name(&s.local.value.name);
            let exported = js_name(s.exported_name());
            if local == exported {
                local.into_owned()
            } else {
                format!("{local} as {exported}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
