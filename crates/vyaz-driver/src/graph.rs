//! Dependency graph for multi-file compilation
//!
//! Modules live in one table indexed by [`ModuleId`]; edges are ids. The
//! graph is discovered depth-first from the entry modules, following imports
//! in the order they appear, so the same files always give the same graph,
//! the same cycle reports and the same emission order.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;
use vyaz_ast::{Diagnostic, DiagnosticCode, Program, Span};

use crate::diagnostics::FileDiagnostic;
use crate::fs::{relative_path, FileSystem};
use crate::resolver::{ModuleResolver, ResolvedModule};
use crate::watch::{CancellationToken, Cancelled};

pub type ModuleId = usize;

/// Identity of a graph node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModuleKey {
    /// Canonical path of a source file
    Local(PathBuf),
    /// Package name of a bare import
    External(String),
}

/// A read and parsed source file.
#[derive(Debug)]
pub struct ParsedModule {
    pub source: String,
    pub program: Program,
    /// Lexer and parser diagnostics
    pub diagnostics: Vec<Diagnostic>,
}

/// Parsed modules by canonical path. One cache belongs to one invocation;
/// watch mode clones it per run and drops changed files between runs.
#[derive(Debug, Clone, Default)]
pub struct ModuleCache {
    modules: HashMap<PathBuf, Arc<ParsedModule>>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<Arc<ParsedModule>> {
        self.modules.get(path).cloned()
    }

    /// Returns the cached module, reading and parsing it on first use.
    pub fn load<F: FileSystem>(&mut self, fs: &F, path: &Path) -> io::Result<Arc<ParsedModule>> {
        if let Some(module) = self.modules.get(path) {
            return Ok(Arc::clone(module));
        }
        let source = fs.read_to_string(path)?;
        let (program, diagnostics) = vyaz_parser::parse_source(&source);
        let module = Arc::new(ParsedModule {
            source,
            program,
            diagnostics,
        });
        self.modules.insert(path.to_path_buf(), Arc::clone(&module));
        Ok(module)
    }

    /// Forgets a module so the next build reads it again.
    pub fn invalidate(&mut self, path: &Path) -> bool {
        self.modules.remove(path).is_some()
    }

    /// Paths of every cached module, in no particular order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> + '_ {
        self.modules.keys().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// An import of a module and the node it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImport {
    pub specifier: String,
    pub span: Span,
    pub target: ModuleId,
}

#[derive(Debug, Clone)]
pub struct ModuleNode {
    pub key: ModuleKey,
    /// `None` for externals and for files that could not be read
    pub module: Option<Arc<ParsedModule>>,
    /// Distinct imported modules, in first-import order
    pub dependencies: Vec<ModuleId>,
    pub imports: Vec<ResolvedImport>,
}

impl ModuleNode {
    pub fn path(&self) -> Option<&Path> {
        match &self.key {
            ModuleKey::Local(path) => Some(path),
            ModuleKey::External(_) => None,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self.key, ModuleKey::External(_))
    }

    /// Where `specifier` points from this module, if it resolved.
    pub fn import_target(&self, specifier: &str) -> Option<ModuleId> {
        self.imports
            .iter()
            .find(|import| import.specifier == specifier)
            .map(|import| import.target)
    }
}

/// An import chain leading back to where it started. `modules` begins and
/// ends with the same module; `span` is the import that closes the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    pub modules: Vec<ModuleId>,
    pub importer: ModuleId,
    pub span: Span,
}

#[derive(Debug, Default)]
pub struct ModuleGraph {
    nodes: Vec<ModuleNode>,
    index: HashMap<ModuleKey, ModuleId>,
    entries: Vec<ModuleId>,
    order: Vec<ModuleId>,
    cycles: Vec<Cycle>,
    back_edges: HashSet<(ModuleId, ModuleId)>,
    diagnostics: Vec<FileDiagnostic>,
}

impl ModuleGraph {
    /// Discovers every module reachable from `entries`. Cancellation is
    /// checked before each module is processed.
    #[tracing::instrument(level = "debug", skip_all, fields(entries = entries.len()))]
    pub fn build<F: FileSystem>(
        fs: &F,
        entries: &[PathBuf],
        cache: &mut ModuleCache,
        token: &CancellationToken,
    ) -> Result<Self, Cancelled> {
        let mut builder = GraphBuilder {
            fs,
            resolver: ModuleResolver::new(fs),
            cache,
            token,
            graph: ModuleGraph::default(),
            state: Vec::new(),
            stack: Vec::new(),
        };
        for entry in entries {
            let path = match fs.canonicalize(entry) {
                Ok(path) => path,
                Err(err) => {
                    builder.graph.diagnostics.push(FileDiagnostic::new(
                        entry,
                        Diagnostic::error(
                            DiagnosticCode::ModuleNotFound,
                            format!("cannot find entry module '{}': {err}", entry.display()),
                            Span::default(),
                        ),
                    ));
                    continue;
                }
            };
            let id = builder.intern(ModuleKey::Local(path));
            builder.graph.entries.push(id);
            if builder.state[id] == VisitState::Unvisited {
                builder.visit(id)?;
            }
        }
        debug!(
            modules = builder.graph.nodes.len(),
            cycles = builder.graph.cycles.len(),
            "module graph built"
        );
        Ok(builder.graph)
    }

    pub fn node(&self, id: ModuleId) -> &ModuleNode {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &[ModuleNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn entries(&self) -> &[ModuleId] {
        &self.entries
    }

    pub fn id_of(&self, key: &ModuleKey) -> Option<ModuleId> {
        self.index.get(key).copied()
    }

    /// Every module, dependencies before dependents. Inside a cycle the
    /// module discovered first comes last.
    pub fn order(&self) -> &[ModuleId] {
        &self.order
    }

    /// Local modules in dependency order.
    pub fn local_order(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.order.iter().copied().filter(|&id| !self.nodes[id].is_external())
    }

    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    /// Read, parse and resolution diagnostics, by module.
    pub fn diagnostics(&self) -> &[FileDiagnostic] {
        &self.diagnostics
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|node| node.dependencies.len()).sum()
    }

    /// Length of the longest import chain from an entry, not counting the
    /// edges that close cycles.
    pub fn max_depth(&self) -> usize {
        let mut depth = vec![0usize; self.nodes.len()];
        for &id in &self.order {
            depth[id] = self.nodes[id]
                .dependencies
                .iter()
                .filter(|&&dep| !self.back_edges.contains(&(id, dep)))
                .map(|&dep| depth[dep] + 1)
                .max()
                .unwrap_or(0);
        }
        self.entries.iter().map(|&id| depth[id]).max().unwrap_or(0)
    }

    /// Display name of a module: its path relative to `base`, or the package
    /// name of an external.
    pub fn module_name(&self, id: ModuleId, base: &Path) -> String {
        match &self.nodes[id].key {
            ModuleKey::Local(path) => relative_path(path, base),
            ModuleKey::External(package) => package.clone(),
        }
    }

    /// Canonical paths of all local modules.
    pub fn local_paths(&self) -> impl Iterator<Item = &Path> + '_ {
        self.nodes.iter().filter_map(ModuleNode::path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    Open,
    Done,
}

struct GraphBuilder<'a, F: FileSystem> {
    fs: &'a F,
    resolver: ModuleResolver<'a, F>,
    cache: &'a mut ModuleCache,
    token: &'a CancellationToken,
    graph: ModuleGraph,
    state: Vec<VisitState>,
    /// Modules whose traversal is in progress, outermost first
    stack: Vec<ModuleId>,
}

impl<F: FileSystem> GraphBuilder<'_, F> {
    fn intern(&mut self, key: ModuleKey) -> ModuleId {
        if let Some(&id) = self.graph.index.get(&key) {
            return id;
        }
        let id = self.graph.nodes.len();
        self.graph.nodes.push(ModuleNode {
            key: key.clone(),
            module: None,
            dependencies: Vec::new(),
            imports: Vec::new(),
        });
        self.graph.index.insert(key, id);
        self.state.push(VisitState::Unvisited);
        id
    }

    fn visit(&mut self, id: ModuleId) -> Result<(), Cancelled> {
        self.token.check()?;
        self.state[id] = VisitState::Open;
        self.stack.push(id);

        if let ModuleKey::Local(path) = self.graph.nodes[id].key.clone() {
            self.load(id, &path);
            let dependencies = self.graph.nodes[id].dependencies.clone();
            for dep in dependencies {
                match self.state[dep] {
                    VisitState::Unvisited => self.visit(dep)?,
                    VisitState::Open => self.record_cycle(id, dep),
                    VisitState::Done => {}
                }
            }
        }

        self.stack.pop();
        self.state[id] = VisitState::Done;
        self.graph.order.push(id);
        Ok(())
    }

    /// Parses the module and resolves its imports into edges.
    fn load(&mut self, id: ModuleId, path: &Path) {
        let module = match self.cache.load(self.fs, path) {
            Ok(module) => module,
            Err(err) => {
                self.graph.diagnostics.push(FileDiagnostic::new(
                    path,
                    Diagnostic::error(
                        DiagnosticCode::ModuleRead,
                        format!("cannot read '{}': {err}", path.display()),
                        Span::default(),
                    ),
                ));
                return;
            }
        };
        debug!(path = %path.display(), "discovered module");

        self.graph.diagnostics.extend(
            module
                .diagnostics
                .iter()
                .map(|diagnostic| FileDiagnostic::new(path, diagnostic.clone())),
        );

        for (specifier, span) in module.program.import_sources() {
            match self.resolver.resolve(&specifier, path) {
                Ok(resolved) => {
                    let key = match resolved {
                        ResolvedModule::Local { path } => ModuleKey::Local(path),
                        ResolvedModule::External { package } => ModuleKey::External(package),
                    };
                    let target = self.intern(key);
                    let node = &mut self.graph.nodes[id];
                    if !node.dependencies.contains(&target) {
                        node.dependencies.push(target);
                    }
                    node.imports.push(ResolvedImport {
                        specifier,
                        span,
                        target,
                    });
                }
                Err(err) => {
                    self.graph
                        .diagnostics
                        .push(FileDiagnostic::new(path, err.into_diagnostic(span)));
                }
            }
        }
        self.graph.nodes[id].module = Some(module);
    }

    fn record_cycle(&mut self, from: ModuleId, to: ModuleId) {
        let Some(start) = self.stack.iter().position(|&id| id == to) else {
            return;
        };
        let mut modules = self.stack[start..].to_vec();
        modules.push(to);
        let span = self.graph.nodes[from]
            .imports
            .iter()
            .find(|import| import.target == to)
            .map(|import| import.span)
            .unwrap_or_default();
        self.graph.back_edges.insert((from, to));
        self.graph.cycles.push(Cycle {
            modules,
            importer: from,
            span,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use pretty_assertions::assert_eq;

    fn build(fs: &MemoryFileSystem, entry: &str) -> ModuleGraph {
        ModuleGraph::build(fs, &[PathBuf::from(entry)], &mut ModuleCache::new(), &CancellationToken::new()).unwrap()
    }

    fn names(graph: &ModuleGraph, ids: &[ModuleId]) -> Vec<String> {
        ids.iter().map(|&id| graph.module_name(id, Path::new("/p"))).collect()
    }

    #[test]
    fn test_cycle_is_reported_from_repeated_module() {
        let fs = MemoryFileSystem::new()
            .with_file("/p/a.vz", "импорт \"./b\";")
            .with_file("/p/b.vz", "импорт \"./c\";")
            .with_file("/p/c.vz", "импорт \"./a\";");
        let graph = build(&fs, "/p/a.vz");
        assert_eq!(graph.cycles().len(), 1);
        assert_eq!(names(&graph, &graph.cycles()[0].modules), vec!["a.vz", "b.vz", "c.vz", "a.vz"]);
        assert_eq!(graph.max_depth(), 2);
        assert_eq!(names(&graph, graph.order()), vec!["c.vz", "b.vz", "a.vz"]);
    }

    #[test]
    fn test_diamond_has_no_cycles() {
        let fs = MemoryFileSystem::new()
            .with_file("/p/a.vz", "импорт \"./b\";\nимпорт \"./c\";")
            .with_file("/p/b.vz", "импорт \"./d\";")
            .with_file("/p/c.vz", "импорт \"./d\";")
            .with_file("/p/d.vz", "");
        let graph = build(&fs, "/p/a.vz");
        assert!(graph.cycles().is_empty());
        assert_eq!(graph.max_depth(), 2);
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(names(&graph, graph.order()), vec!["d.vz", "b.vz", "c.vz", "a.vz"]);
    }

    #[test]
    fn test_duplicate_imports_form_one_edge() {
        let fs = MemoryFileSystem::new()
            .with_file("/p/a.vz", "импорт { x } из \"./b\";\nимпорт { y } из \"./b.vz\";")
            .with_file("/p/b.vz", "экспорт конст x = 1;\nэкспорт конст y = 2;");
        let graph = build(&fs, "/p/a.vz");
        let entry = graph.node(graph.entries()[0]);
        assert_eq!(entry.dependencies.len(), 1);
        assert_eq!(entry.imports.len(), 2);
        assert_eq!(entry.import_target("./b"), entry.import_target("./b.vz"));
    }

    #[test]
    fn test_externals_are_leaves() {
        let fs = MemoryFileSystem::new()
            .with_file("/p/a.vz", "импорт х из \"left-pad\";\nимпорт \"./b\";")
            .with_file("/p/b.vz", "импорт у из \"left-pad\";");
        let graph = build(&fs, "/p/a.vz");
        assert_eq!(graph.len(), 3);
        let external = graph
            .id_of(&ModuleKey::External("left-pad".to_string()))
            .unwrap();
        assert!(graph.node(external).dependencies.is_empty());
        assert!(graph.cycles().is_empty());
        assert_eq!(graph.local_order().count(), 2);
    }

    #[test]
    fn test_missing_import_does_not_stop_siblings() {
        let fs = MemoryFileSystem::new()
            .with_file("/p/a.vz", "импорт \"./нет\";\nимпорт \"./b\";")
            .with_file("/p/b.vz", "");
        let graph = build(&fs, "/p/a.vz");
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.diagnostics().len(), 1);
        let diagnostic = &graph.diagnostics()[0];
        assert_eq!(diagnostic.path, PathBuf::from("/p/a.vz"));
        assert_eq!(diagnostic.diagnostic.code, DiagnosticCode::ModuleNotFound);
        assert_eq!(diagnostic.diagnostic.span.line, 1);
    }

    #[test]
    fn test_cancelled_build_stops() {
        let fs = MemoryFileSystem::new().with_file("/p/a.vz", "");
        let token = CancellationToken::new();
        token.cancel();
        let result = ModuleGraph::build(&fs, &[PathBuf::from("/p/a.vz")], &mut ModuleCache::new(), &token);
        assert!(matches!(result, Err(Cancelled)));
    }

    #[test]
    fn test_cache_is_reused_until_invalidated() {
        let mut fs = MemoryFileSystem::new().with_file("/p/a.vz", "импорт \"./b\";").with_file("/p/b.vz", "");
        let mut cache = ModuleCache::new();
        let token = CancellationToken::new();
        ModuleGraph::build(&fs, &[PathBuf::from("/p/a.vz")], &mut cache, &token).unwrap();
        assert_eq!(cache.len(), 2);

        fs.insert("/p/a.vz", "");
        let stale = ModuleGraph::build(&fs, &[PathBuf::from("/p/a.vz")], &mut cache, &token).unwrap();
        assert_eq!(stale.len(), 2);

        assert!(cache.invalidate(Path::new("/p/a.vz")));
        let fresh = ModuleGraph::build(&fs, &[PathBuf::from("/p/a.vz")], &mut cache, &token).unwrap();
        assert_eq!(fresh.len(), 1);
    }
}
