//! Vyaz JavaScript Code Generator
//!
//! Translates a checked Vyaz program into JavaScript source text. Types,
//! interfaces and aliases are erased; every runtime construct maps onto its
//! JavaScript counterpart one to one, so the same program always produces
//! the same text. With source maps enabled every emitted statement and
//! expression is paired with the position it came from.
//!
//! Programs are emitted either as standalone ES modules or as bodies for the
//! module table of a bundle (see [`BundleBuilder`]).

mod error;
mod expr;
mod generator;
mod minify;
mod names;
mod runtime;
mod sourcemap;
mod writer;

pub use error::CodegenError;
pub use minify::minify;
pub use names::js_name;
pub use runtime::{Bundle, BundleBuilder};
pub use sourcemap::{encode_mappings, Mapping, SourceMap};

use vyaz_ast::Program;

use crate::generator::JsGenerator;

/// Output options for one program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodegenOptions {
    /// Record a mapping for every emitted construct
    pub source_map: bool,
    /// Strip whitespace and comments after generation
    pub minify: bool,
}

/// Generated text and, when requested, its position mappings.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedCode {
    pub code: String,
    pub mappings: Option<Vec<Mapping>>,
}

impl GeneratedCode {
    /// Source Map v3 for this output, naming `source` as its only input.
    pub fn source_map(&self, file: Option<String>, source: &str, content: Option<&str>) -> Option<SourceMap> {
        let mappings = self.mappings.as_ref()?;
        Some(SourceMap::new(
            file,
            vec![source.to_string()],
            content.map(|c| vec![c.to_string()]),
            mappings,
        ))
    }
}

/// Where a bundled module's import points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkedImport {
    /// Another module of the bundle, by its module id
    Module(String),
    /// A package loaded from the host environment
    External(String),
}

/// Maps import specifiers of one module to bundle targets.
pub trait ImportLinker {
    fn link(&self, specifier: &str) -> LinkedImport;
}

/// How module syntax is emitted.
#[derive(Clone, Copy)]
pub enum ModuleFormat<'a> {
    /// `import`/`export` statements
    Esm,
    /// A module-table body: imports go through `__require`, exports become
    /// getters on `__exports`
    Bundled(&'a dyn ImportLinker),
}

/// Generates a standalone ES module.
pub fn generate(program: &Program, options: &CodegenOptions) -> GeneratedCode {
    generate_with_format(program, options, ModuleFormat::Esm)
}

#[tracing::instrument(level = "debug", skip_all, fields(items = program.items.len()))]
pub fn generate_with_format(program: &Program, options: &CodegenOptions, format: ModuleFormat<'_>) -> GeneratedCode {
    let (code, mappings) = JsGenerator::new(format, options.source_map).generate_program(program);
    if options.minify {
        let (code, mappings) = minify(&code, mappings.as_deref());
        tracing::debug!(bytes = code.len(), "minified output");
        return GeneratedCode { code, mappings };
    }
    GeneratedCode { code, mappings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn program(source: &str) -> Program {
        let (program, diagnostics) = vyaz_parser::parse_source(source);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {:?}", diagnostics);
        program
    }

    fn js(source: &str) -> String {
        generate(&program(source), &CodegenOptions::default()).code
    }

    struct TestLinker(HashMap<&'static str, LinkedImport>);

    impl ImportLinker for TestLinker {
        fn link(&self, specifier: &str) -> LinkedImport {
            self.0
                .get(specifier)
                .cloned()
                .unwrap_or_else(|| LinkedImport::External(specifier.to_string()))
        }
    }

    #[test]
    fn test_types_are_erased() {
        let source = "
            интерфейс Точка { x: число; y: число; }
            тип Ид = строка | число;
            функция длина(т: Точка): число {
                вернуть т.x как число;
            }
            пусть а: Ид = 1;
        ";
        assert_eq!(
            js(source),
            "function длина(т) {\n    return т.x;\n}\nlet а = 1;\n"
        );
    }

    #[test]
    fn test_control_flow() {
        let source = "
            для (пусть и = 0; и < 3; и++) {
                если (и === 1) продолжить;
                иначе если (и === 2) { прервать; }
                иначе { и; }
            }
        ";
        assert_eq!(
            js(source),
            "for (let и = 0; и < 3; и++) {\n    if (и === 1) {\n        continue;\n    } else if (и === 2) {\n        break;\n    } else {\n        и;\n    }\n}\n"
        );
    }

    #[test]
    fn test_reserved_words_are_renamed() {
        let source = "
            пусть class = 1;
            функция let(yield: число) { вернуть yield + class; }
            пусть о = { class };
        ";
        assert_eq!(
            js(source),
            "let class_ = 1;\nfunction let_(yield_) {\n    return yield_ + class_;\n}\nlet о = { class: class_ };\n"
        );
    }

    #[test]
    fn test_prelude_only_when_referenced() {
        let output = js("консоль.вывод(Математика.max(1, 2));");
        assert!(output.starts_with("const консоль = Object.assign("));
        assert!(output.contains("const Математика = Math;\n"));
        assert!(!output.contains("Обещание"));

        let shadowed = js("конст консоль = { вывод: 1 };\nконсоль.вывод;");
        assert!(!shadowed.contains("Object.assign"));
    }

    #[test]
    fn test_type_only_imports_are_elided() {
        let source = "
            импорт { Точка, создать } из \"./точка.vz\";
            импорт { Пусто } из \"./типы\";
            импорт \"./эффект\";
            пусть т: Точка = создать();
        ";
        assert_eq!(
            js(source),
            "import { создать } from \"./точка.js\";\nimport \"./эффект\";\nlet т = создать();\n"
        );
    }

    #[test]
    fn test_exports_of_erased_declarations() {
        let source = "
            экспорт интерфейс Форма { имя: строка; }
            экспорт функция площадь(): число { вернуть 1; }
            тип Метка = строка;
            конст метка = \"а\";
            экспорт { Метка, метка };
        ";
        assert_eq!(
            js(source),
            "export function площадь() {\n    return 1;\n}\nconst метка = \"а\";\nexport { метка };\n"
        );
    }

    #[test]
    fn test_class_with_parameter_properties() {
        let source = "
            класс Животное {
                конструктор(публичный имя: строка) {}
            }
            класс Кот расширяет Животное {
                статический количество: число = 0;
                возраст: число;
                конструктор(имя: строка, приватный лапы: число) {
                    родитель(имя);
                    Кот.количество++;
                }
                получить описание(): строка { вернуть `${этот.имя}: ${этот.лапы}`; }
            }
        ";
        assert_eq!(
            js(source),
            "class Животное {\n    constructor(имя) {\n        this.имя = имя;\n    }\n}\n\
             class Кот extends Животное {\n    static количество = 0;\n    constructor(имя, лапы) {\n        super(имя);\n        this.лапы = лапы;\n        Кот.количество++;\n    }\n    get описание() {\n        return `${this.имя}: ${this.лапы}`;\n    }\n}\n"
        );
    }

    #[test]
    fn test_template_text_is_escaped() {
        let output = js("пусть ш = `а\\nб ${1} \\${в}`;");
        assert_eq!(output, "let ш = `а\\nб ${1} \\${в}`;\n");
    }

    #[test]
    fn test_statement_starting_with_object_is_wrapped() {
        assert_eq!(js("({ а: 1 }).а;"), "({ а: 1 }).а;\n");
        assert_eq!(js("пусть ф = () => ({ а: 1 });"), "let ф = () => ({ а: 1 });\n");
    }

    #[test]
    fn test_source_map_points_at_statements() {
        let program = program("пусть а = 1;\n\nконсоль.вывод(а);");
        let options = CodegenOptions {
            source_map: true,
            ..CodegenOptions::default()
        };
        let output = generate(&program, &options);
        let mappings = output.mappings.clone().unwrap();
        let lines: Vec<&str> = output.code.lines().collect();
        let call = mappings
            .iter()
            .find(|m| m.source_line == 2 && m.source_column == 0)
            .unwrap();
        assert!(lines[call.generated_line as usize][call.generated_column as usize..].starts_with("консоль.вывод"));
        let map = output.source_map(Some("main.js".into()), "main.vz", None).unwrap();
        assert_eq!(map.sources, vec!["main.vz".to_string()]);
        assert!(!map.mappings.is_empty());
    }

    #[test]
    fn test_minified_output_keeps_mappings() {
        let program = program("пусть а = 1;\nпусть б = а + 1;");
        let options = CodegenOptions {
            source_map: true,
            minify: true,
        };
        let output = generate(&program, &options);
        assert_eq!(output.code, "let а=1;let б=а+1;");
        let mappings = output.mappings.unwrap();
        assert!(mappings.iter().all(|m| m.generated_line == 0));
        assert!(mappings.iter().any(|m| m.source_line == 1 && m.generated_column == 8));
    }

    #[test]
    fn test_bundled_module_body() {
        let source = "
            импорт { сумма } из \"./мат\";
            импорт левпад из \"left-pad\";
            экспорт функция удвоить(x: число): число { вернуть сумма(x, x); }
            экспорт поумолчанию удвоить(левпад);
        ";
        let linker = TestLinker(HashMap::from([("./мат", LinkedImport::Module("мат.vz".to_string()))]));
        let output = generate_with_format(
            &program(source),
            &CodegenOptions::default(),
            ModuleFormat::Bundled(&linker),
        );
        assert_eq!(
            output.code,
            "__export(__exports, \"удвоить\", () => удвоить);\n\
             __export(__exports, \"default\", () => __default);\n\
             const __import_0 = __require(\"мат.vz\");\n\
             const __import_1 = __external(\"left-pad\");\n\
             function удвоить(x) {\n    return __import_0.сумма(x, x);\n}\n\
             const __default = удвоить(__import_1.default);\n"
        );
    }

    #[test]
    fn test_generation_is_deterministic() {
        let source = "импорт { а, б } из \"./м\"; консоль.вывод(а, б, Математика.PI);";
        assert_eq!(js(source), js(source));
    }
}
