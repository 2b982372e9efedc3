//! Single-file bundling of a module graph

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use tracing::debug;
use vyaz_ast::{Diagnostic, DiagnosticCode, Span};
use vyaz_codegen::{
    generate_with_format, minify, BundleBuilder, CodegenOptions, ImportLinker, LinkedImport, ModuleFormat,
    SourceMap,
};
use vyaz_typeck::CheckOptions;

use crate::diagnostics::FileDiagnostic;
use crate::fs::FileSystem;
use crate::graph::{ModuleCache, ModuleGraph, ModuleId, ModuleKey, ModuleNode};
use crate::watch::{CancellationToken, Cancelled};

/// Output layout of a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BundleFormat {
    /// One self-invoking function holding a module table
    #[default]
    Iife,
    Esm,
    Cjs,
}

impl BundleFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            BundleFormat::Iife => "iife",
            BundleFormat::Esm => "esm",
            BundleFormat::Cjs => "cjs",
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, BundleFormat::Iife)
    }
}

impl fmt::Display for BundleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown bundle format '{0}' (expected iife, esm or cjs)")]
pub struct UnknownFormat(String);

impl FromStr for BundleFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "iife" => Ok(BundleFormat::Iife),
            "esm" => Ok(BundleFormat::Esm),
            "cjs" => Ok(BundleFormat::Cjs),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleOptions {
    pub format: BundleFormat,
    pub minify: bool,
    pub source_map: bool,
    /// Embed every module's text in the map's `sourcesContent`
    pub inline_sources: bool,
    /// Packages expected from the host; other bare imports are warned about
    pub externals: BTreeSet<String>,
    pub check: CheckOptions,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BundleOutput {
    pub code: String,
    pub source_map: Option<SourceMap>,
    /// Local modules in the bundle
    pub module_count: usize,
    pub diagnostics: Vec<FileDiagnostic>,
}

impl BundleOutput {
    pub fn is_success(&self) -> bool {
        !self.diagnostics.iter().any(FileDiagnostic::is_error)
    }
}

/// Bundles `entry` and everything it imports.
pub fn bundle<F: FileSystem>(fs: &F, entry: &Path, options: &BundleOptions) -> BundleOutput {
    // A token nobody else holds is never cancelled.
    bundle_with(fs, entry, options, &mut ModuleCache::new(), &CancellationToken::new()).unwrap_or_default()
}

/// Bundles with a caller-owned cache, stopping between modules once
/// `token` is cancelled.
#[tracing::instrument(level = "debug", skip_all, fields(entry = %entry.display(), format = %options.format))]
pub fn bundle_with<F: FileSystem>(
    fs: &F,
    entry: &Path,
    options: &BundleOptions,
    cache: &mut ModuleCache,
    token: &CancellationToken,
) -> Result<BundleOutput, Cancelled> {
    if !options.format.is_supported() {
        return Ok(BundleOutput {
            diagnostics: vec![FileDiagnostic::new(
                entry,
                Diagnostic::error(
                    DiagnosticCode::UnsupportedFormat,
                    format!(
                        "bundle format '{}' is not supported; use '{}'",
                        options.format,
                        BundleFormat::Iife
                    ),
                    Span::default(),
                ),
            )],
            ..BundleOutput::default()
        });
    }

    let graph = ModuleGraph::build(fs, &[entry.to_path_buf()], cache, token)?;
    let mut diagnostics = graph.diagnostics().to_vec();
    let Some(&entry_id) = graph.entries().first() else {
        return Ok(BundleOutput {
            diagnostics,
            ..BundleOutput::default()
        });
    };
    let base = graph
        .node(entry_id)
        .path()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_default();

    diagnostics.extend(cycle_warnings(&graph, &base));
    diagnostics.extend(external_warnings(&graph, &options.externals));

    let codegen = CodegenOptions {
        source_map: options.source_map,
        minify: false,
    };
    let mut builder = BundleBuilder::new(options.source_map);
    let mut module_count = 0;
    for id in graph.local_order() {
        token.check()?;
        let node = graph.node(id);
        let (Some(path), Some(module)) = (node.path(), node.module.as_ref()) else {
            continue;
        };
        let (typed, check_diagnostics) = vyaz_typeck::check(module.program.clone(), &options.check);
        diagnostics.extend(
            check_diagnostics
                .into_iter()
                .map(|diagnostic| FileDiagnostic::new(path, diagnostic)),
        );

        let name = graph.module_name(id, &base);
        let linker = GraphLinker {
            graph: &graph,
            node,
            base: &base,
        };
        let generated = generate_with_format(&typed.program, &codegen, ModuleFormat::Bundled(&linker));
        builder.add_module(&name, &name, &module.source, &generated.code, generated.mappings.as_deref());
        module_count += 1;
        debug!(module = %name, "bundled module");
    }

    builder.add_entry(&graph.module_name(entry_id, &base));
    let bundle = builder.finish();
    let (code, mappings) = if options.minify {
        minify(&bundle.code, bundle.mappings.as_deref())
    } else {
        (bundle.code, bundle.mappings)
    };
    let source_map = mappings.map(|mappings| {
        SourceMap::new(
            None,
            bundle.sources,
            options.inline_sources.then_some(bundle.sources_content),
            &mappings,
        )
    });

    Ok(BundleOutput {
        code,
        source_map,
        module_count,
        diagnostics,
    })
}

/// Cycles do not stop bundling: the module reached first runs last and its
/// dependents see its exports once they are installed.
fn cycle_warnings(graph: &ModuleGraph, base: &Path) -> Vec<FileDiagnostic> {
    graph
        .cycles()
        .iter()
        .filter_map(|cycle| {
            let path = graph.node(cycle.importer).path()?;
            let chain: Vec<String> = cycle.modules.iter().map(|&id| graph.module_name(id, base)).collect();
            Some(FileDiagnostic::new(
                path,
                Diagnostic::warning(
                    DiagnosticCode::CircularDependency,
                    format!("circular dependency: {}", chain.join(" -> ")),
                    cycle.span,
                ),
            ))
        })
        .collect()
}

fn external_warnings(graph: &ModuleGraph, externals: &BTreeSet<String>) -> Vec<FileDiagnostic> {
    let mut warnings = Vec::new();
    for id in graph.local_order() {
        let node = graph.node(id);
        let Some(path) = node.path() else {
            continue;
        };
        for import in &node.imports {
            if let ModuleKey::External(package) = &graph.node(import.target).key {
                if !externals.contains(package) {
                    warnings.push(FileDiagnostic::new(
                        path,
                        Diagnostic::warning(
                            DiagnosticCode::ExternalImport,
                            format!("'{package}' is not bundled and not declared external; it is loaded at run time"),
                            import.span,
                        ),
                    ));
                }
            }
        }
    }
    warnings
}

/// Links the imports of one module to the ids of other bundle modules.
struct GraphLinker<'g> {
    graph: &'g ModuleGraph,
    node: &'g ModuleNode,
    base: &'g Path,
}

impl ImportLinker for GraphLinker<'_> {
    fn link(&self, specifier: &str) -> LinkedImport {
        match self.node.import_target(specifier) {
            Some(target) => link_target(self.graph, target, self.base),
            // Unresolved imports are already reported; leave them to the host.
            None => LinkedImport::External(specifier.to_string()),
        }
    }
}

fn link_target(graph: &ModuleGraph, target: ModuleId, base: &Path) -> LinkedImport {
    match &graph.node(target).key {
        ModuleKey::Local(_) => LinkedImport::Module(graph.module_name(target, base)),
        ModuleKey::External(package) => LinkedImport::External(package.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_format_parsing() {
        assert_eq!("iife".parse::<BundleFormat>(), Ok(BundleFormat::Iife));
        assert_eq!("ESM".parse::<BundleFormat>(), Ok(BundleFormat::Esm));
        assert!("umd".parse::<BundleFormat>().is_err());
        assert!(!BundleFormat::Cjs.is_supported());
    }

    #[test]
    fn test_unsupported_format_reads_nothing() {
        let fs = MemoryFileSystem::new();
        let options = BundleOptions {
            format: BundleFormat::Esm,
            ..BundleOptions::default()
        };
        let output = bundle(&fs, Path::new("/нет/main.vz"), &options);
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].diagnostic.code, DiagnosticCode::UnsupportedFormat);
        assert_eq!(output.module_count, 0);
        assert!(output.code.is_empty());
    }

    #[test]
    fn test_imports_link_to_module_ids() {
        let fs = MemoryFileSystem::new()
            .with_file("/p/src/main.vz", "импорт { х } из \"../lib/мат\";\nконсоль.вывод(х);")
            .with_file("/p/lib/мат.vz", "экспорт конст х = 1;");
        let output = bundle(&fs, Path::new("/p/src/main.vz"), &BundleOptions::default());
        assert!(output.is_success(), "{:?}", output.diagnostics);
        assert_eq!(output.module_count, 2);
        assert!(output.code.contains("\"../lib/мат.vz\": function (__exports) {"));
        assert!(output.code.contains("const __import_0 = __require(\"../lib/мат.vz\");"));
        assert!(output.code.contains("  __require(\"main.vz\");\n"));
    }

    #[test]
    fn test_undeclared_external_is_a_warning() {
        let fs = MemoryFileSystem::new().with_file("/p/main.vz", "импорт лп из \"left-pad\";\nлп(1);");
        let output = bundle(&fs, Path::new("/p/main.vz"), &BundleOptions::default());
        assert!(output.is_success());
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].diagnostic.code, DiagnosticCode::ExternalImport);
        assert_eq!(output.module_count, 1);
        assert!(output.code.contains("__external(\"left-pad\")"));

        let declared = BundleOptions {
            externals: BTreeSet::from(["left-pad".to_string()]),
            ..BundleOptions::default()
        };
        assert!(bundle(&fs, Path::new("/p/main.vz"), &declared).diagnostics.is_empty());
    }

    #[test]
    fn test_source_map_covers_every_module() {
        let fs = MemoryFileSystem::new()
            .with_file("/p/main.vz", "импорт \"./а\";\nпусть б = 2;")
            .with_file("/p/а.vz", "пусть а = 1;");
        let options = BundleOptions {
            source_map: true,
            inline_sources: true,
            minify: true,
            ..BundleOptions::default()
        };
        let output = bundle(&fs, Path::new("/p/main.vz"), &options);
        let map = output.source_map.unwrap();
        assert_eq!(map.sources, vec!["а.vz".to_string(), "main.vz".to_string()]);
        assert_eq!(
            map.sources_content,
            Some(vec!["пусть а = 1;".to_string(), "импорт \"./а\";\nпусть б = 2;".to_string()])
        );
        assert!(!output.code.trim_end().contains('\n'));
    }
}
