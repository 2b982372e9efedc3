//! Vyaz Compiler Driver Library
//!
//! The multi-file half of the Vyaz pipeline. A single unit goes through
//! [`compile`]; programs spanning several files are resolved
//! ([`ModuleResolver`]), discovered into a [`ModuleGraph`] and either
//! bundled into one script ([`bundle`]) or summarised ([`module_info`]).
//! Everything that touches files goes through a [`FileSystem`], so the same
//! code runs against disk and against [`MemoryFileSystem`].

pub mod bundler;
pub mod compile;
pub mod diagnostics;
pub mod error;
pub mod fs;
pub mod graph;
pub mod info;
pub mod resolver;
pub mod watch;

pub use bundler::{bundle, bundle_with, BundleFormat, BundleOptions, BundleOutput};
pub use compile::{compile, compile_file, CompileOptions, CompileOutput};
pub use diagnostics::{FileDiagnostic, JsonDiagnostic};
pub use error::DriverError;
pub use fs::{FileSystem, MemoryFileSystem, OsFileSystem};
pub use graph::{ModuleCache, ModuleGraph, ModuleId, ModuleKey};
pub use info::{module_info, ModuleInfo};
pub use resolver::{ModuleResolver, ResolveError, ResolvedModule};
pub use watch::{CancellationToken, Cancelled, FileStamps, Recompiler, Task};
