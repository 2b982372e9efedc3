//! Dependency statistics for an entry module

use std::path::Path;

use serde::Serialize;

use crate::diagnostics::FileDiagnostic;
use crate::fs::FileSystem;
use crate::graph::{ModuleCache, ModuleGraph};
use crate::watch::CancellationToken;

/// Shape of the import graph below an entry module. Module names are paths
/// relative to the entry's directory; external packages count as modules.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInfo {
    pub total_modules: usize,
    pub total_dependencies: usize,
    pub average_dependencies_per_module: f64,
    pub max_depth: usize,
    pub circular_dependencies: Vec<Vec<String>>,
    #[serde(skip)]
    pub diagnostics: Vec<FileDiagnostic>,
}

impl ModuleInfo {
    pub fn from_graph(graph: &ModuleGraph, base: &Path) -> Self {
        let total_modules = graph.len();
        let total_dependencies = graph.edge_count();
        let average_dependencies_per_module = if total_modules == 0 {
            0.0
        } else {
            total_dependencies as f64 / total_modules as f64
        };
        Self {
            total_modules,
            total_dependencies,
            average_dependencies_per_module,
            max_depth: graph.max_depth(),
            circular_dependencies: graph
                .cycles()
                .iter()
                .map(|cycle| cycle.modules.iter().map(|&id| graph.module_name(id, base)).collect())
                .collect(),
            diagnostics: graph.diagnostics().to_vec(),
        }
    }
}

#[tracing::instrument(level = "debug", skip_all, fields(entry = %entry.display()))]
pub fn module_info<F: FileSystem>(fs: &F, entry: &Path) -> ModuleInfo {
    let mut cache = ModuleCache::new();
    // A fresh token is never cancelled.
    let graph = ModuleGraph::build(fs, &[entry.to_path_buf()], &mut cache, &CancellationToken::new())
        .unwrap_or_default();
    let base = graph
        .entries()
        .first()
        .and_then(|&id| graph.node(id).path())
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_default();
    ModuleInfo::from_graph(&graph, &base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_info_for_cycle_with_external() {
        let fs = MemoryFileSystem::new()
            .with_file("/p/a.vz", "импорт \"./b\";\nимпорт \"пакет\";")
            .with_file("/p/b.vz", "импорт \"./a\";");
        let info = module_info(&fs, Path::new("/p/a.vz"));
        assert_eq!(info.total_modules, 3);
        assert_eq!(info.total_dependencies, 3);
        assert_eq!(info.average_dependencies_per_module, 1.0);
        assert_eq!(info.max_depth, 1);
        assert_eq!(info.circular_dependencies, vec![vec!["a.vz".to_string(), "b.vz".to_string(), "a.vz".to_string()]]);
    }

    #[test]
    fn test_info_serializes_camel_case() {
        let fs = MemoryFileSystem::new().with_file("/p/a.vz", "");
        let json = serde_json::to_value(module_info(&fs, Path::new("/p/a.vz"))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "totalModules": 1,
                "totalDependencies": 0,
                "averageDependenciesPerModule": 0.0,
                "maxDepth": 0,
                "circularDependencies": [],
            })
        );
    }
}
