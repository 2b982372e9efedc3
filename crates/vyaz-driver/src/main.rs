use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vyaz_ast::{has_errors, Diagnostic};
use vyaz_codegen::SourceMap;
use vyaz_lexer::TokenKind;
use vyaz_typeck::CheckOptions;

use vyaz_driver::compile::output_name;
use vyaz_driver::diagnostics::{render, render_all};
use vyaz_driver::{
    bundle_with, compile_file, module_info, BundleFormat, BundleOptions, CancellationToken, CompileOptions, DriverError,
    FileDiagnostic, FileStamps, FileSystem, JsonDiagnostic, ModuleCache, OsFileSystem, Recompiler, Task,
};

#[derive(Parser)]
#[command(
    name = "vyaz",
    version,
    about = "Vyaz to JavaScript compiler",
    long_about = "Compiles Vyaz, a Cyrillic-keyword language with optional static types,\nto JavaScript modules or single-file bundles."
)]
struct Cli {
    /// Print results and diagnostics as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lex a Vyaz file and show tokens (debug)
    Lex {
        /// Input Vyaz file
        input: PathBuf,

        /// Show token positions
        #[arg(short, long)]
        positions: bool,
    },

    /// Parse a Vyaz file and show the AST (debug)
    Parse {
        /// Input Vyaz file
        input: PathBuf,
    },

    /// Type check a Vyaz file without compiling
    Check {
        /// Input Vyaz file
        input: PathBuf,

        /// Treat gaps in type information as errors
        #[arg(long)]
        strict: bool,
    },

    /// Compile one Vyaz file to an ES module
    Compile {
        /// Input Vyaz file
        input: PathBuf,

        /// Output file path (defaults to the input with a .js extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        check: CheckArgs,

        /// Write a source map next to the output
        #[arg(long)]
        source_map: bool,

        /// Embed the source text in the source map
        #[arg(long)]
        inline_sources: bool,

        /// Strip whitespace and comments
        #[arg(long)]
        minify: bool,
    },

    /// Bundle an entry module and its imports into one script
    Bundle {
        /// Entry Vyaz file
        input: PathBuf,

        /// Output file path (defaults to <entry>.bundle.js)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = BundleFormat::Iife)]
        format: BundleFormat,

        #[command(flatten)]
        check: CheckArgs,

        /// Write a source map next to the output
        #[arg(long)]
        source_map: bool,

        /// Embed module sources in the source map
        #[arg(long)]
        inline_sources: bool,

        /// Strip whitespace and comments
        #[arg(long)]
        minify: bool,

        /// Package provided by the host environment (repeatable)
        #[arg(long = "external", value_name = "PACKAGE")]
        externals: Vec<String>,
    },

    /// Show dependency statistics for an entry module
    Info {
        /// Entry Vyaz file
        input: PathBuf,
    },

    /// Recompile whenever a source file changes
    Watch {
        /// Input Vyaz file
        input: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Bundle instead of compiling a single file
        #[arg(long)]
        bundle: bool,

        #[command(flatten)]
        check: CheckArgs,

        /// Polling interval in milliseconds
        #[arg(long, default_value_t = 300)]
        interval: u64,
    },
}

#[derive(clap::Args, Clone, Copy)]
struct CheckArgs {
    /// Treat gaps in type information as errors
    #[arg(long)]
    strict: bool,

    /// Skip type checking
    #[arg(long)]
    no_type_check: bool,
}

impl CheckArgs {
    fn options(self) -> CheckOptions {
        CheckOptions {
            strict: self.strict,
            no_type_check: self.no_type_check,
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let json = cli.json;

    match cli.command {
        Commands::Lex { input, positions } => lex_command(&input, positions, json),
        Commands::Parse { input } => parse_command(&input, json),
        Commands::Check { input, strict } => check_command(&input, strict, json),
        Commands::Compile {
            input,
            output,
            check,
            source_map,
            inline_sources,
            minify,
        } => {
            let options = CompileOptions {
                strict: check.strict,
                type_check: !check.no_type_check,
                source_map,
                inline_sources,
                minify,
            };
            compile_command(&input, output, &options, json)
        }
        Commands::Bundle {
            input,
            output,
            format,
            check,
            source_map,
            inline_sources,
            minify,
            externals,
        } => {
            let options = BundleOptions {
                format,
                minify,
                source_map,
                inline_sources,
                externals: externals.into_iter().collect::<BTreeSet<_>>(),
                check: check.options(),
            };
            bundle_command(&input, output, &options, json)
        }
        Commands::Info { input } => info_command(&input, json),
        Commands::Watch {
            input,
            output,
            bundle,
            check,
            interval,
        } => watch_command(&input, output, bundle, check, Duration::from_millis(interval)),
    }
}

/// Logging stays off unless `RUST_LOG` asks for it.
fn init_tracing() {
    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .try_init();
}

fn lex_command(input: &Path, positions: bool, json: bool) -> ExitCode {
    let source = match read_source_file(input) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let filename = input.display().to_string();
    let (tokens, diagnostics) = vyaz_lexer::tokenize(&source);

    if json {
        let tokens: Vec<serde_json::Value> = tokens
            .iter()
            .map(|token| {
                serde_json::json!({
                    "kind": format!("{:?}", token.kind),
                    "value": token.value,
                    "line": token.span.line,
                    "column": token.span.column,
                    "start": token.span.start,
                    "end": token.span.end,
                })
            })
            .collect();
        print_json(&serde_json::json!({
            "tokens": tokens,
            "diagnostics": json_diagnostics(input, &diagnostics),
        }));
    } else {
        println!("Tokens for {}:\n", filename);
        println!("{}", "=".repeat(80));
        for (i, token) in tokens.iter().enumerate() {
            if token.kind == TokenKind::Eof {
                println!("\n{:4} | {:?}", i, token.kind);
                break;
            }
            if positions {
                println!(
                    "{:4} | {:20?} | {:?} | {}:{} ({}..{})",
                    i, token.kind, token.value, token.span.line, token.span.column, token.span.start, token.span.end
                );
            } else {
                println!("{:4} | {:20?} | {:?}", i, token.kind, token.value);
            }
        }
        println!("{}", "=".repeat(80));
        println!("\nTotal tokens: {}", tokens.len());
        if !diagnostics.is_empty() {
            println!("\nLexer errors found: {}", diagnostics.len());
        }
        report_diagnostics(&filename, &source, &diagnostics);
    }

    exit_status(&diagnostics)
}

fn parse_command(input: &Path, json: bool) -> ExitCode {
    let source = match read_source_file(input) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let (program, diagnostics) = vyaz_parser::parse_source(&source);

    if json {
        print_json(&serde_json::json!({ "diagnostics": json_diagnostics(input, &diagnostics) }));
    } else {
        println!("{:#?}", program);
        report_diagnostics(&input.display().to_string(), &source, &diagnostics);
    }
    exit_status(&diagnostics)
}

fn check_command(input: &Path, strict: bool, json: bool) -> ExitCode {
    let source = match read_source_file(input) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let (program, mut diagnostics) = vyaz_parser::parse_source(&source);
    let options = CheckOptions {
        strict,
        no_type_check: false,
    };
    let (_typed, check_diagnostics) = vyaz_typeck::check(program, &options);
    diagnostics.extend(check_diagnostics);

    if json {
        print_json(&serde_json::json!({ "diagnostics": json_diagnostics(input, &diagnostics) }));
    } else {
        report_diagnostics(&input.display().to_string(), &source, &diagnostics);
        if !has_errors(&diagnostics) {
            println!("Type check passed!");
        }
    }
    exit_status(&diagnostics)
}

fn compile_command(input: &Path, output: Option<PathBuf>, options: &CompileOptions, json: bool) -> ExitCode {
    let fs = OsFileSystem;
    let result = match compile_file(&fs, input, options) {
        Ok(result) => result,
        Err(e) => return fail(e),
    };
    let output_path = output.unwrap_or_else(|| input.with_extension("js"));

    if !json {
        if let Ok(source) = fs.read_to_string(input) {
            report_diagnostics(&input.display().to_string(), &source, &result.diagnostics);
        }
    }
    if !result.is_success() {
        if json {
            print_json(&serde_json::json!({
                "success": false,
                "diagnostics": json_diagnostics(input, &result.diagnostics),
            }));
        }
        return ExitCode::FAILURE;
    }

    if let Err(e) = write_output(&output_path, result.code, result.source_map.as_ref()) {
        return fail(e);
    }
    if json {
        print_json(&serde_json::json!({
            "success": true,
            "output": output_path.display().to_string(),
            "diagnostics": json_diagnostics(input, &result.diagnostics),
        }));
    } else {
        println!("Compiled {} -> {}", input.display(), output_path.display());
    }
    ExitCode::SUCCESS
}

fn bundle_command(input: &Path, output: Option<PathBuf>, options: &BundleOptions, json: bool) -> ExitCode {
    let fs = OsFileSystem;
    let mut cache = ModuleCache::new();
    let result = match bundle_with(&fs, input, options, &mut cache, &CancellationToken::new()) {
        Ok(result) => result,
        Err(e) => return fail(e),
    };
    let output_path = output.unwrap_or_else(|| input.with_extension("bundle.js"));

    if !json {
        report_file_diagnostics(&result.diagnostics, &cache);
    }
    if !result.is_success() {
        if json {
            print_json(&serde_json::json!({
                "success": false,
                "diagnostics": json_file_diagnostics(&result.diagnostics),
            }));
        }
        return ExitCode::FAILURE;
    }

    if let Err(e) = write_output(&output_path, result.code, result.source_map.as_ref()) {
        return fail(e);
    }
    if json {
        print_json(&serde_json::json!({
            "success": true,
            "output": output_path.display().to_string(),
            "moduleCount": result.module_count,
            "diagnostics": json_file_diagnostics(&result.diagnostics),
        }));
    } else {
        println!(
            "Bundled {} modules from {} -> {}",
            result.module_count,
            input.display(),
            output_path.display()
        );
    }
    ExitCode::SUCCESS
}

fn info_command(input: &Path, json: bool) -> ExitCode {
    let info = module_info(&OsFileSystem, input);
    let failed = info.diagnostics.iter().any(FileDiagnostic::is_error);

    if json {
        print_json(&info);
    } else {
        report_file_diagnostics(&info.diagnostics, &ModuleCache::new());
        println!("Module info for {}:", input.display());
        println!("  Total modules:            {}", info.total_modules);
        println!("  Total dependencies:       {}", info.total_dependencies);
        println!("  Average dependencies:     {:.2}", info.average_dependencies_per_module);
        println!("  Maximum depth:            {}", info.max_depth);
        if info.circular_dependencies.is_empty() {
            println!("  Circular dependencies:    none");
        } else {
            println!("  Circular dependencies:");
            for cycle in &info.circular_dependencies {
                println!("    {}", cycle.join(" -> "));
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// What a finished watch run hands back to the main thread.
struct RunResult {
    /// Code and map to write, absent when the run failed
    artifact: Option<(String, Option<SourceMap>)>,
    report: String,
    watched: Vec<PathBuf>,
    cache: ModuleCache,
}

fn watch_command(input: &Path, output: Option<PathBuf>, bundle: bool, check: CheckArgs, interval: Duration) -> ExitCode {
    let fs = OsFileSystem;
    let input = match fs.canonicalize(input) {
        Ok(path) => path,
        Err(e) => return fail(DriverError::io(input, e)),
    };
    let output_path = output.unwrap_or_else(|| {
        if bundle {
            input.with_extension("bundle.js")
        } else {
            input.with_extension("js")
        }
    });

    let mut recompiler = Recompiler::new();
    let mut cache = ModuleCache::new();
    let mut stamps = FileStamps::default();
    let mut watched: Vec<PathBuf> = vec![input.clone()];
    let (sender, receiver) = mpsc::channel::<(Task, RunResult)>();

    println!("Watching {} (Ctrl+C to stop)", input.display());
    start_run(&mut recompiler, &sender, &input, bundle, check, cache.clone());

    loop {
        while let Ok((task, result)) = receiver.try_recv() {
            let Some(result) = recompiler.finish(&task, result) else {
                continue;
            };
            eprint!("{}", result.report);
            if let Some((code, map)) = result.artifact {
                match write_output(&output_path, code, map.as_ref()) {
                    Ok(()) => println!("[{}] wrote {}", task.generation, output_path.display()),
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            cache = result.cache;
            watched = result.watched;
            stamps = FileStamps::capture(&fs, watched.iter().map(PathBuf::as_path));
        }

        thread::sleep(interval);
        let current = FileStamps::capture(&fs, watched.iter().map(PathBuf::as_path));
        let changed = stamps.changed(&current);
        if changed.is_empty() {
            continue;
        }
        for path in &changed {
            cache.invalidate(path);
            tracing::debug!(path = %path.display(), "file changed");
        }
        stamps = current;
        start_run(&mut recompiler, &sender, &input, bundle, check, cache.clone());
    }
}

/// Spawns a recompilation, superseding the one in flight.
fn start_run(
    recompiler: &mut Recompiler,
    sender: &mpsc::Sender<(Task, RunResult)>,
    input: &Path,
    bundle: bool,
    check: CheckArgs,
    mut cache: ModuleCache,
) {
    let task = recompiler.begin();
    let sender = sender.clone();
    let input = input.to_path_buf();
    thread::spawn(move || {
        let fs = OsFileSystem;
        let color = io::stderr().is_terminal();
        let result = if bundle {
            let options = BundleOptions {
                source_map: true,
                check: check.options(),
                ..BundleOptions::default()
            };
            match bundle_with(&fs, &input, &options, &mut cache, &task.token) {
                Ok(output) => RunResult {
                    report: render_all(&output.diagnostics, |path| fs.read_to_string(path).ok(), color),
                    artifact: output.is_success().then_some((output.code, output.source_map)),
                    watched: cache.paths().map(Path::to_path_buf).collect(),
                    cache,
                },
                // Superseded; the newer run reports instead.
                Err(_) => return,
            }
        } else {
            if task.token.is_cancelled() {
                return;
            }
            let options = CompileOptions {
                strict: check.strict,
                type_check: !check.no_type_check,
                source_map: true,
                ..CompileOptions::default()
            };
            match compile_file(&fs, &input, &options) {
                Ok(output) => {
                    let source = fs.read_to_string(&input).unwrap_or_default();
                    let filename = input.display().to_string();
                    RunResult {
                        report: output
                            .diagnostics
                            .iter()
                            .map(|diagnostic| render(diagnostic, &filename, &source, color))
                            .collect(),
                        artifact: output.is_success().then_some((output.code, output.source_map)),
                        watched: vec![input.clone()],
                        cache,
                    }
                }
                Err(e) => RunResult {
                    report: format!("Error: {}\n", e),
                    artifact: None,
                    watched: vec![input.clone()],
                    cache,
                },
            }
        };
        let _ = sender.send((task, result));
    });
}

// Helper functions

fn read_source_file(path: &Path) -> Result<String, DriverError> {
    fs::read_to_string(path).map_err(|e| DriverError::io(path, e))
}

/// Writes generated code, and its map next to it as `<output>.map`.
fn write_output(path: &Path, mut code: String, map: Option<&SourceMap>) -> Result<(), DriverError> {
    if let Some(map) = map {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| output_name("out"));
        let map_path = path.with_file_name(format!("{file_name}.map"));
        fs::write(&map_path, map.to_json()?).map_err(|e| DriverError::io(&map_path, e))?;
        if !code.ends_with('\n') {
            code.push('\n');
        }
        code.push_str(&format!("//# sourceMappingURL={file_name}.map\n"));
    }
    fs::write(path, code).map_err(|e| DriverError::io(path, e))
}

fn report_diagnostics(filename: &str, source: &str, diagnostics: &[Diagnostic]) {
    let color = io::stderr().is_terminal();
    for diagnostic in diagnostics {
        eprint!("{}", render(diagnostic, filename, source, color));
    }
}

fn report_file_diagnostics(diagnostics: &[FileDiagnostic], cache: &ModuleCache) {
    let color = io::stderr().is_terminal();
    let rendered = render_all(
        diagnostics,
        |path| match cache.get(path) {
            Some(module) => Some(module.source.clone()),
            None => fs::read_to_string(path).ok(),
        },
        color,
    );
    eprint!("{}", rendered);
}

fn json_diagnostics(input: &Path, diagnostics: &[Diagnostic]) -> Vec<JsonDiagnostic> {
    diagnostics
        .iter()
        .map(|diagnostic| JsonDiagnostic::new(Some(input), diagnostic))
        .collect()
}

fn json_file_diagnostics(diagnostics: &[FileDiagnostic]) -> Vec<JsonDiagnostic> {
    diagnostics.iter().map(JsonDiagnostic::from).collect()
}

fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Error: {}", DriverError::from(e)),
    }
}

fn exit_status(diagnostics: &[Diagnostic]) -> ExitCode {
    if has_errors(diagnostics) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn fail(error: impl Into<DriverError>) -> ExitCode {
    eprintln!("Error: {}", error.into());
    ExitCode::FAILURE
}
