//! Integration tests for the Vyaz compiler pipeline.
//!
//! Multi-file behaviour runs against an in-memory file system; the resolver
//! and the `vyaz` binary also run against real files in temporary
//! directories.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use pretty_assertions::assert_eq;
use vyaz_ast::DiagnosticCode;
use vyaz_driver::{
    bundle, bundle_with, compile, module_info, BundleFormat, BundleOptions, CompileOptions, MemoryFileSystem,
    ModuleCache, ModuleResolver, OsFileSystem, Recompiler, ResolvedModule,
};

fn vyaz_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_vyaz"))
}

fn codes(diagnostics: &[vyaz_driver::FileDiagnostic]) -> Vec<DiagnosticCode> {
    diagnostics.iter().map(|d| d.diagnostic.code).collect()
}

fn diamond() -> MemoryFileSystem {
    MemoryFileSystem::new()
        .with_file("/proj/a.vz", "импорт \"./b\";\nимпорт \"./c\";")
        .with_file("/proj/b.vz", "импорт \"./d\";")
        .with_file("/proj/c.vz", "импорт \"./d\";")
        .with_file("/proj/d.vz", "экспорт конст д = 1;")
}

#[test]
fn test_resolver_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("main.vz"), "").unwrap();
    fs::write(src.join("utils.vz"), "").unwrap();

    let resolver = ModuleResolver::new(&OsFileSystem);
    let main = src.join("main.vz");
    let resolved = resolver.resolve("./utils", &main).unwrap();
    assert_eq!(resolved.path(), Some(src.join("utils.vz").canonicalize().unwrap().as_path()));
    assert_eq!(resolved.extension(), Some("vz"));

    fs::remove_file(src.join("utils.vz")).unwrap();
    fs::create_dir_all(src.join("utils")).unwrap();
    fs::write(src.join("utils/index.vz"), "").unwrap();
    let resolved = resolver.resolve("./utils", &main).unwrap();
    assert_eq!(
        resolved.path(),
        Some(src.join("utils/index.vz").canonicalize().unwrap().as_path())
    );

    let external = resolver.resolve("some-package", &main).unwrap();
    assert!(external.is_external());
    assert_eq!(external.package_name(), Some("some-package"));
    assert_eq!(external.path(), None);

    let missing = resolver.resolve("./missing", &main).unwrap_err();
    assert!(missing.to_string().contains("./missing"));
}

#[test]
fn test_cycle_is_reported_once() {
    let fs = MemoryFileSystem::new()
        .with_file("/proj/a.vz", "импорт \"./b\";")
        .with_file("/proj/b.vz", "импорт \"./c\";")
        .with_file("/proj/c.vz", "импорт \"./a\";");
    let info = module_info(&fs, Path::new("/proj/a.vz"));
    assert_eq!(
        info.circular_dependencies,
        vec![vec!["a.vz".to_string(), "b.vz".to_string(), "c.vz".to_string(), "a.vz".to_string()]]
    );
    assert_eq!(info.total_modules, 3);
}

#[test]
fn test_diamond_info() {
    let info = module_info(&diamond(), Path::new("/proj/a.vz"));
    assert!(info.circular_dependencies.is_empty());
    assert_eq!(info.max_depth, 2);
    assert_eq!(info.total_modules, 4);
    assert_eq!(info.total_dependencies, 4);
    assert_eq!(info.average_dependencies_per_module, 1.0);
}

#[test]
fn test_bundle_emits_dependencies_in_import_order() {
    let fs = MemoryFileSystem::new()
        .with_file(
            "/proj/e.vz",
            "импорт { д1 } из \"./d1\";\nимпорт { д2 } из \"./d2\";\nконсоль.вывод(д1, д2);",
        )
        .with_file("/proj/d1.vz", "экспорт конст д1 = 1;")
        .with_file("/proj/d2.vz", "экспорт конст д2 = 2;");
    let output = bundle(&fs, Path::new("/proj/e.vz"), &BundleOptions::default());
    assert!(output.is_success(), "{:?}", output.diagnostics);
    assert_eq!(output.module_count, 3);

    let d1 = output.code.find("const д1 = 1;").unwrap();
    let d2 = output.code.find("const д2 = 2;").unwrap();
    let e = output.code.find("консоль.вывод(").unwrap();
    assert!(d1 < d2);
    assert!(d2 < e);
}

#[test]
fn test_diamond_bundle_includes_shared_module_once() {
    let output = bundle(&diamond(), Path::new("/proj/a.vz"), &BundleOptions::default());
    assert!(output.is_success());
    assert_eq!(output.module_count, 4);
    assert_eq!(output.code.matches("\"d.vz\": function (__exports) {").count(), 1);
    assert!(output.code.find("\"d.vz\": function").unwrap() < output.code.find("\"b.vz\": function").unwrap());
}

#[test]
fn test_cyclic_bundle_still_builds() {
    let fs = MemoryFileSystem::new()
        .with_file("/proj/a.vz", "импорт { б } из \"./b\";\nэкспорт конст а = 1;\nконсоль.вывод(б);")
        .with_file("/proj/b.vz", "импорт { а } из \"./a\";\nэкспорт конст б = 2;\nэкспорт функция ф() { вернуть а; }");
    let output = bundle(&fs, Path::new("/proj/a.vz"), &BundleOptions::default());
    assert!(output.is_success(), "{:?}", output.diagnostics);
    assert_eq!(codes(&output.diagnostics), vec![DiagnosticCode::CircularDependency]);
    assert_eq!(output.diagnostics[0].path, PathBuf::from("/proj/b.vz"));
    assert!(output.diagnostics[0].diagnostic.message.contains("a.vz -> b.vz -> a.vz"));
    assert_eq!(output.module_count, 2);
    // b.vz sits first in the table, but only the entry is started; it pulls
    // b.vz in through its own import.
    assert!(output.code.find("  \"b.vz\": function").unwrap() < output.code.find("  \"a.vz\": function").unwrap());
    assert!(output.code.ends_with("  };\n  __require(\"a.vz\");\n})();\n"));
    assert!(!output.code.contains("  __require(\"b.vz\");"));
    assert!(output.code.contains("const __import_0 = __require(\"b.vz\");"));
}

#[test]
fn test_unsupported_formats_fail_fast() {
    for format in [BundleFormat::Esm, BundleFormat::Cjs] {
        let options = BundleOptions {
            format,
            ..BundleOptions::default()
        };
        let output = bundle(&diamond(), Path::new("/proj/a.vz"), &options);
        assert_eq!(codes(&output.diagnostics), vec![DiagnosticCode::UnsupportedFormat]);
        assert!(!output.is_success());
        assert_eq!(output.module_count, 0);
    }
}

#[test]
fn test_missing_module_is_reported_and_siblings_bundle() {
    let fs = MemoryFileSystem::new()
        .with_file("/proj/main.vz", "импорт \"./нет\";\nимпорт \"./есть\";")
        .with_file("/proj/есть.vz", "пусть х = 1;");
    let output = bundle(&fs, Path::new("/proj/main.vz"), &BundleOptions::default());
    assert_eq!(codes(&output.diagnostics), vec![DiagnosticCode::ModuleNotFound]);
    assert!(!output.is_success());
    assert_eq!(output.module_count, 2);
    assert!(output.code.contains("let х = 1;"));
}

#[test]
fn test_type_errors_are_attributed_to_their_module() {
    let fs = MemoryFileSystem::new()
        .with_file("/proj/main.vz", "импорт \"./плохой\";")
        .with_file("/proj/плохой.vz", "пусть ч: число = \"не число\";");
    let output = bundle(&fs, Path::new("/proj/main.vz"), &BundleOptions::default());
    assert_eq!(codes(&output.diagnostics), vec![DiagnosticCode::TypeError]);
    assert_eq!(output.diagnostics[0].path, PathBuf::from("/proj/плохой.vz"));
}

#[test]
fn test_bundle_is_deterministic() {
    let options = BundleOptions {
        source_map: true,
        ..BundleOptions::default()
    };
    let first = bundle(&diamond(), Path::new("/proj/a.vz"), &options);
    let second = bundle(&diamond(), Path::new("/proj/a.vz"), &options);
    assert_eq!(first, second);
}

#[test]
fn test_compile_is_deterministic() {
    let source = "интерфейс П { имя: строка; }\nпусть п: П = { имя: \"а\" };\nконсоль.вывод(п.имя);";
    let options = CompileOptions {
        source_map: true,
        ..CompileOptions::default()
    };
    let first = compile(source, "main.vz", &options);
    assert!(first.is_success());
    assert_eq!(first, compile(source, "main.vz", &options));
}

#[test]
fn test_superseded_run_is_cancelled() {
    let fs = diamond();
    let mut recompiler = Recompiler::new();
    let stale = recompiler.begin();
    let current = recompiler.begin();

    let mut cache = ModuleCache::new();
    let options = BundleOptions::default();
    let cancelled = bundle_with(&fs, Path::new("/proj/a.vz"), &options, &mut cache.clone(), &stale.token);
    assert!(cancelled.is_err());

    let output = bundle_with(&fs, Path::new("/proj/a.vz"), &options, &mut cache, &current.token).unwrap();
    assert_eq!(recompiler.finish(&current, output.module_count), Some(4));
    assert_eq!(cache.len(), 4);
}

#[test]
fn test_invalidated_module_is_reread() {
    let mut fs = MemoryFileSystem::new()
        .with_file("/proj/main.vz", "импорт { х } из \"./м\";\nконсоль.вывод(х);")
        .with_file("/proj/м.vz", "экспорт конст х = 1;");
    let mut cache = ModuleCache::new();
    let options = BundleOptions::default();
    let token = vyaz_driver::CancellationToken::new();
    let first = bundle_with(&fs, Path::new("/proj/main.vz"), &options, &mut cache, &token).unwrap();
    assert!(first.code.contains("const х = 1;"));

    fs.insert("/proj/м.vz", "экспорт конст х = 2;");
    cache.invalidate(Path::new("/proj/м.vz"));
    let second = bundle_with(&fs, Path::new("/proj/main.vz"), &options, &mut cache, &token).unwrap();
    assert!(second.code.contains("const х = 2;"));
}

#[test]
fn test_cli_compile_writes_output_and_map() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("main.vz");
    fs::write(&input, "пусть а: число = 1;\nконсоль.вывод(а);\n").unwrap();
    let output = dir.path().join("main.js");

    let result = Command::new(vyaz_binary())
        .arg("compile")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("--source-map")
        .output()
        .unwrap();
    assert!(result.status.success(), "stderr: {}", String::from_utf8_lossy(&result.stderr));

    let code = fs::read_to_string(&output).unwrap();
    assert!(code.contains("let а = 1;"));
    assert!(code.ends_with("//# sourceMappingURL=main.js.map\n"));
    let map = fs::read_to_string(dir.path().join("main.js.map")).unwrap();
    let map: serde_json::Value = serde_json::from_str(&map).unwrap();
    assert_eq!(map["version"], 3);
    assert_eq!(map["sources"][0], "main.vz");
}

#[test]
fn test_cli_rejects_esm_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("main.vz");
    fs::write(&input, "пусть а = 1;").unwrap();

    let result = Command::new(vyaz_binary())
        .arg("bundle")
        .arg(&input)
        .arg("--format")
        .arg("esm")
        .output()
        .unwrap();
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("E3002"));
}

#[test]
fn test_cli_info_json() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("main.vz"), "импорт \"./util\";\nимпорт \"left-pad\";").unwrap();
    fs::write(dir.path().join("util.vz"), "").unwrap();

    let result = Command::new(vyaz_binary())
        .arg("info")
        .arg(dir.path().join("main.vz"))
        .arg("--json")
        .output()
        .unwrap();
    assert!(result.status.success());
    let info: serde_json::Value = serde_json::from_slice(&result.stdout).unwrap();
    assert_eq!(info["totalModules"], 3);
    assert_eq!(info["totalDependencies"], 2);
    assert_eq!(info["maxDepth"], 1);
    assert_eq!(info["circularDependencies"], serde_json::json!([]));
}

#[test]
fn test_cli_check_reports_type_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("main.vz");
    fs::write(&input, "пусть а: число = \"х\";").unwrap();

    let result = Command::new(vyaz_binary())
        .arg("--json")
        .arg("check")
        .arg(&input)
        .output()
        .unwrap();
    assert!(!result.status.success());
    let report: serde_json::Value = serde_json::from_slice(&result.stdout).unwrap();
    assert_eq!(report["diagnostics"][0]["code"], "E2000");
    assert_eq!(report["diagnostics"][0]["line"], 1);
}

#[test]
fn test_resolved_module_serializes_kind() {
    let resolved = ResolvedModule::External {
        package: "@scope/pkg".to_string(),
    };
    assert_eq!(
        serde_json::to_value(&resolved).unwrap(),
        serde_json::json!({ "kind": "external", "package": "@scope/pkg" })
    );
}
