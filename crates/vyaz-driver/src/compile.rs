//! Single compilation unit: source text in, JavaScript out

use std::path::Path;

use serde::Serialize;
use vyaz_ast::{has_errors, Diagnostic};
use vyaz_codegen::{CodegenOptions, SourceMap};
use vyaz_typeck::CheckOptions;

use crate::error::{DriverError, Result};
use crate::fs::FileSystem;

/// Options for one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    pub strict: bool,
    pub type_check: bool,
    pub source_map: bool,
    /// Embed the source text in the map's `sourcesContent`
    pub inline_sources: bool,
    pub minify: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            strict: false,
            type_check: true,
            source_map: false,
            inline_sources: false,
            minify: false,
        }
    }
}

impl CompileOptions {
    pub fn check_options(&self) -> CheckOptions {
        CheckOptions {
            strict: self.strict,
            no_type_check: !self.type_check,
        }
    }

    pub fn codegen_options(&self) -> CodegenOptions {
        CodegenOptions {
            source_map: self.source_map,
            minify: self.minify,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutput {
    pub code: String,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_map: Option<SourceMap>,
}

impl CompileOutput {
    /// No error-severity diagnostics.
    pub fn is_success(&self) -> bool {
        !has_errors(&self.diagnostics)
    }
}

/// Compiles one unit. Code is generated even when diagnostics report
/// errors; callers decide success from the diagnostics. `source_name` is
/// the name the source map gives the input.
#[tracing::instrument(level = "debug", skip_all, fields(bytes = source.len()))]
pub fn compile(source: &str, source_name: &str, options: &CompileOptions) -> CompileOutput {
    let (program, mut diagnostics) = vyaz_parser::parse_source(source);
    let (typed, check_diagnostics) = vyaz_typeck::check(program, &options.check_options());
    diagnostics.extend(check_diagnostics);

    let generated = vyaz_codegen::generate(&typed.program, &options.codegen_options());
    let source_map = generated.source_map(
        Some(output_name(source_name)),
        source_name,
        options.inline_sources.then_some(source),
    );
    tracing::debug!(diagnostics = diagnostics.len(), "unit compiled");
    CompileOutput {
        code: generated.code,
        diagnostics,
        source_map,
    }
}

/// Reads and compiles a file; the map names it by file name.
pub fn compile_file<F: FileSystem>(fs: &F, path: &Path, options: &CompileOptions) -> Result<CompileOutput> {
    let source = fs.read_to_string(path).map_err(|err| DriverError::io(path, err))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(compile(&source, &name, options))
}

/// `main.vz` becomes `main.js`.
pub fn output_name(source_name: &str) -> String {
    match source_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{stem}.js"),
        _ => format!("{source_name}.js"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use pretty_assertions::assert_eq;
    use vyaz_ast::DiagnosticCode;

    #[test]
    fn test_compile_reports_type_errors_and_still_generates() {
        let output = compile("пусть а: число = \"х\";", "main.vz", &CompileOptions::default());
        assert!(!output.is_success());
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].code, DiagnosticCode::TypeError);
        assert_eq!(output.code, "let а = \"х\";\n");
    }

    #[test]
    fn test_type_check_can_be_skipped() {
        let options = CompileOptions {
            type_check: false,
            ..CompileOptions::default()
        };
        let output = compile("пусть а: число = \"х\";", "main.vz", &options);
        assert!(output.is_success());
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_source_map_with_sources_content() {
        let options = CompileOptions {
            source_map: true,
            inline_sources: true,
            ..CompileOptions::default()
        };
        let source = "пусть а = 1;";
        let output = compile(source, "main.vz", &options);
        let map = output.source_map.unwrap();
        assert_eq!(map.file.as_deref(), Some("main.js"));
        assert_eq!(map.sources, vec!["main.vz".to_string()]);
        assert_eq!(map.sources_content, Some(vec![source.to_string()]));
    }

    #[test]
    fn test_compile_is_deterministic() {
        let source = "функция ф(х: число | строка) { если (типа х === \"string\") { вернуть х; } вернуть х + 1; }";
        let options = CompileOptions {
            source_map: true,
            ..CompileOptions::default()
        };
        assert_eq!(compile(source, "a.vz", &options), compile(source, "a.vz", &options));
    }

    #[test]
    fn test_compile_file_reads_through_file_system() {
        let fs = MemoryFileSystem::new().with_file("/p/main.vz", "конст х = 1;");
        let output = compile_file(&fs, Path::new("/p/main.vz"), &CompileOptions::default()).unwrap();
        assert_eq!(output.code, "const х = 1;\n");
        assert!(compile_file(&fs, Path::new("/p/нет.vz"), &CompileOptions::default()).is_err());
        assert_eq!(output_name("main.vz"), "main.js");
    }
}
