//! Module resolution logic for import statements

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::trace;
use vyaz_ast::{Diagnostic, DiagnosticCode, Span, SOURCE_EXTENSION};

use crate::fs::FileSystem;

/// Where an import specifier points.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ResolvedModule {
    /// A source file, by canonical path
    Local { path: PathBuf },
    /// A package provided by the host; never read
    External { package: String },
}

impl ResolvedModule {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ResolvedModule::Local { path } => Some(path),
            ResolvedModule::External { .. } => None,
        }
    }

    pub fn extension(&self) -> Option<&str> {
        self.path()?.extension()?.to_str()
    }

    pub fn is_external(&self) -> bool {
        matches!(self, ResolvedModule::External { .. })
    }

    pub fn package_name(&self) -> Option<&str> {
        match self {
            ResolvedModule::External { package } => Some(package),
            ResolvedModule::Local { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("cannot find module '{specifier}' from '{}'", from.display())]
    NotFound { specifier: String, from: PathBuf },

    #[error("cannot resolve '{specifier}': '{}' has no parent directory", from.display())]
    NoParent { specifier: String, from: PathBuf },
}

impl ResolveError {
    pub fn into_diagnostic(self, span: Span) -> Diagnostic {
        Diagnostic::error(DiagnosticCode::ModuleNotFound, self.to_string(), span)
    }
}

/// Resolves import specifiers against the importing file.
pub struct ModuleResolver<'fs, F: FileSystem> {
    fs: &'fs F,
}

impl<'fs, F: FileSystem> ModuleResolver<'fs, F> {
    pub fn new(fs: &'fs F) -> Self {
        Self { fs }
    }

    /// Relative and absolute specifiers name files; anything else names a
    /// package.
    pub fn resolve(&self, specifier: &str, from_file: &Path) -> Result<ResolvedModule, ResolveError> {
        if !is_path_specifier(specifier) {
            let package = package_name(specifier);
            trace!(specifier, package, "external module");
            return Ok(ResolvedModule::External { package });
        }

        let target = if specifier.starts_with('/') {
            PathBuf::from(specifier)
        } else {
            let from_dir = from_file.parent().ok_or_else(|| ResolveError::NoParent {
                specifier: specifier.to_string(),
                from: from_file.to_path_buf(),
            })?;
            from_dir.join(specifier)
        };

        for candidate in candidates(&target) {
            trace!(candidate = %candidate.display(), "trying");
            if self.fs.is_file(&candidate) {
                if let Ok(path) = self.fs.canonicalize(&candidate) {
                    return Ok(ResolvedModule::Local { path });
                }
            }
        }

        Err(ResolveError::NotFound {
            specifier: specifier.to_string(),
            from: from_file.to_path_buf(),
        })
    }
}

/// Files tried for a path specifier, in order: the path itself, the path
/// with the source extension, then the directory index file.
fn candidates(target: &Path) -> [PathBuf; 3] {
    let mut with_extension = target.as_os_str().to_owned();
    with_extension.push(format!(".{SOURCE_EXTENSION}"));
    [
        target.to_path_buf(),
        PathBuf::from(with_extension),
        target.join(format!("index.{SOURCE_EXTENSION}")),
    ]
}

fn is_path_specifier(specifier: &str) -> bool {
    specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
        || specifier == "."
        || specifier == ".."
}

/// The package part of a bare specifier: `lodash/fp` is `lodash`,
/// `@scope/pkg/sub` is `@scope/pkg`.
pub fn package_name(specifier: &str) -> String {
    let mut parts = specifier.split('/');
    match (parts.next(), parts.next()) {
        (Some(scope), Some(name)) if scope.starts_with('@') => format!("{scope}/{name}"),
        (Some(name), _) => name.to_string(),
        (None, _) => specifier.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{MemoryFileSystem, OsFileSystem};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extension_is_appended() {
        let fs = MemoryFileSystem::new().with_file("/proj/src/utils.vz", "");
        let resolver = ModuleResolver::new(&fs);
        let resolved = resolver.resolve("./utils", Path::new("/proj/src/main.vz")).unwrap();
        assert_eq!(resolved.path(), Some(Path::new("/proj/src/utils.vz")));
        assert_eq!(resolved.extension(), Some("vz"));
        assert!(!resolved.is_external());
    }

    #[test]
    fn test_directory_index() {
        let fs = MemoryFileSystem::new().with_file("/proj/src/utils/index.vz", "");
        let resolver = ModuleResolver::new(&fs);
        let resolved = resolver.resolve("./utils", Path::new("/proj/src/main.vz")).unwrap();
        assert_eq!(resolved.path(), Some(Path::new("/proj/src/utils/index.vz")));
    }

    #[test]
    fn test_verbatim_path_wins() {
        let fs = MemoryFileSystem::new()
            .with_file("/proj/lib/a.vz", "")
            .with_file("/proj/lib/a.vz.vz", "");
        let resolver = ModuleResolver::new(&fs);
        let resolved = resolver.resolve("../lib/a.vz", Path::new("/proj/src/main.vz")).unwrap();
        assert_eq!(resolved.path(), Some(Path::new("/proj/lib/a.vz")));
    }

    #[test]
    fn test_bare_specifier_is_external() {
        let fs = MemoryFileSystem::new();
        let resolver = ModuleResolver::new(&fs);
        let resolved = resolver.resolve("some-package", Path::new("/proj/src/main.vz")).unwrap();
        assert_eq!(resolved, ResolvedModule::External { package: "some-package".into() });
        assert_eq!(resolved.path(), None);
        assert_eq!(package_name("@scope/pkg/deep"), "@scope/pkg");
        assert_eq!(package_name("lodash/fp"), "lodash");
    }

    #[test]
    fn test_missing_module_is_an_error() {
        let fs = MemoryFileSystem::new();
        let resolver = ModuleResolver::new(&fs);
        let err = resolver.resolve("./нет", Path::new("/proj/main.vz")).unwrap_err();
        let diagnostic = err.into_diagnostic(Span::default());
        assert_eq!(diagnostic.code, DiagnosticCode::ModuleNotFound);
        assert!(diagnostic.message.contains("./нет"));
    }

    #[test]
    fn test_relative_resolution_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("utils")).unwrap();
        std::fs::write(dir.path().join("utils/index.vz"), "экспорт конст x = 1;").unwrap();
        let from = dir.path().join("main.vz");

        let resolver = ModuleResolver::new(&OsFileSystem);
        let resolved = resolver.resolve("./utils", &from).unwrap();
        assert!(resolved.path().unwrap().ends_with("utils/index.vz"));
    }
}
