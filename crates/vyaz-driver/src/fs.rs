//! File system access used by resolution, graph building and bundling

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

/// Read-only view of the files a compilation may touch.
pub trait FileSystem {
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
    /// The canonical form of an existing path, used as a module's identity.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
    /// Last modification time, when the backend tracks one.
    fn modified(&self, _path: &Path) -> Option<SystemTime> {
        None
    }
}

/// The real file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        path.canonicalize()
    }

    fn modified(&self, path: &Path) -> Option<SystemTime> {
        std::fs::metadata(path).and_then(|m| m.modified()).ok()
    }
}

/// Files held in memory under absolute paths. Directories exist implicitly
/// as ancestors of files.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    files: BTreeMap<PathBuf, String>,
    dirs: BTreeSet<PathBuf>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a file.
    pub fn insert(&mut self, path: impl AsRef<Path>, contents: impl Into<String>) {
        let path = normalize(path.as_ref());
        for ancestor in path.ancestors().skip(1) {
            self.dirs.insert(ancestor.to_path_buf());
        }
        self.files.insert(path, contents.into());
    }

    pub fn with_file(mut self, path: impl AsRef<Path>, contents: impl Into<String>) -> Self {
        self.insert(path, contents);
        self
    }
}

impl FileSystem for MemoryFileSystem {
    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(&normalize(path))
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains(&normalize(path))
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(&normalize(path))
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display())))
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        let normalized = normalize(path);
        if self.files.contains_key(&normalized) || self.dirs.contains(&normalized) {
            Ok(normalized)
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display())))
        }
    }
}

/// Resolves `.` and `..` components lexically.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// `path` relative to `base`, with `/` separators.
pub fn relative_path(path: &Path, base: &Path) -> String {
    let path: Vec<Component> = path.components().collect();
    let base: Vec<Component> = base.components().collect();
    let common = path.iter().zip(&base).take_while(|(a, b)| a == b).count();
    let mut parts: Vec<String> = Vec::new();
    for _ in common..base.len() {
        parts.push("..".to_string());
    }
    for component in &path[common..] {
        parts.push(component.as_os_str().to_string_lossy().into_owned());
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_file_system_directories() {
        let fs = MemoryFileSystem::new().with_file("/proj/src/utils/index.vz", "");
        assert!(fs.is_dir(Path::new("/proj/src/utils")));
        assert!(fs.is_dir(Path::new("/proj")));
        assert!(fs.is_file(Path::new("/proj/src/./utils/index.vz")));
        assert!(!fs.is_file(Path::new("/proj/src/utils")));
        assert_eq!(
            fs.canonicalize(Path::new("/proj/src/../src/utils/index.vz")).unwrap(),
            PathBuf::from("/proj/src/utils/index.vz")
        );
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(relative_path(Path::new("/p/src/a/b.vz"), Path::new("/p/src")), "a/b.vz");
        assert_eq!(relative_path(Path::new("/p/lib/c.vz"), Path::new("/p/src")), "../lib/c.vz");
    }
}
