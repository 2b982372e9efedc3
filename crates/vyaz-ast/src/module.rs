//! Module system definitions for the AST

use super::*;

/// Module item (top-level in a module)
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleItem {
    /// Import declaration
    Import(ImportDecl),

    /// Export declaration
    Export(ExportDecl),

    /// Statement
    Stmt(Node<Stmt>),

    /// Declaration
    Decl(Node<Decl>),
}

/// Import declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub specifiers: Vec<ImportSpecifier>,
    pub source: String,
    pub source_span: Span,
    pub type_only: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportSpecifier {
    /// импорт name из "module"
    Default(Node<Ident>),

    /// импорт * как name из "module"
    Namespace(Node<Ident>),

    /// импорт { name } из "module" or импорт { name как alias } из "module"
    Named {
        imported: Node<Ident>,
        local: Option<Node<Ident>>,
        type_only: bool,
    },
}

impl ImportSpecifier {
    /// The binding this specifier introduces into the importing module.
    pub fn local_name(&self) -> &str {
        match self {
            ImportSpecifier::Default(name) | ImportSpecifier::Namespace(name) => &name.value.name,
            ImportSpecifier::Named {
                imported, local, ..
            } => &local.as_ref().unwrap_or(imported).value.name,
        }
    }
}

/// Export declaration
#[derive(Debug, Clone, PartialEq)]
pub enum ExportDecl {
    /// экспорт { name } [из "module"]
    Named {
        specifiers: Vec<ExportSpecifier>,
        source: Option<(String, Span)>,
        type_only: bool,
    },

    /// экспорт поумолчанию expr
    Default(Node<Expr>),

    /// экспорт поумолчанию declaration
    DefaultDecl(Box<Node<Decl>>),

    /// экспорт * [как name] из "module"
    All {
        source: String,
        source_span: Span,
        as_name: Option<Node<Ident>>,
    },

    /// экспорт declaration
    Decl(Box<Node<Decl>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSpecifier {
    pub local: Node<Ident>,
    pub exported: Option<Node<Ident>>,
    pub type_only: bool,
}

impl ExportSpecifier {
    pub fn exported_name(&self) -> &str {
        &self.exported.as_ref().unwrap_or(&self.local).value.name
    }
}

/// Root AST node - represents a complete source file
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub items: Vec<Node<ModuleItem>>,
    pub span: Span,
}

impl Program {
    /// Module specifiers this program depends on, in statement order,
    /// including re-exports.
    pub fn import_sources(&self) -> Vec<(String, Span)> {
        self.items
            .iter()
            .filter_map(|item| match &item.value {
                ModuleItem::Import(import) => Some((import.source.clone(), import.source_span)),
                ModuleItem::Export(ExportDecl::Named {
                    source: Some((source, span)),
                    ..
                }) => Some((source.clone(), *span)),
                ModuleItem::Export(ExportDecl::All {
                    source,
                    source_span,
                    ..
                }) => Some((source.clone(), *source_span)),
                _ => None,
            })
            .collect()
    }
}
