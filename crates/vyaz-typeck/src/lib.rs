//! # Vyaz Type Checker
//!
//! Structural type checking for Vyaz programs: interfaces and object shapes,
//! unions with flow narrowing, generics inferred at call sites, classes with
//! visibility and abstract members.
//!
//! Every error is a [`Diagnostic`]; after reporting one, checking continues
//! with an error sentinel type that is assignable to and from everything, so a
//! single mistake produces a single diagnostic.

mod builtins;
mod checker;
mod decl_checker;
mod env;
mod error;
mod expr_checker;
mod helpers;
mod narrowing;
mod stmt_checker;
mod typed_ast;
mod types;

pub use checker::{CheckOptions, TypeChecker};
pub use error::{TypeError, TypeErrorKind};
pub use typed_ast::TypedProgram;
pub use types::{FunctionSig, LiteralType, ParamSig, PropertySig, Type, TypeParamInfo};

use vyaz_ast::{Diagnostic, Program};

/// Type checks a parsed program. The program is returned with the type of
/// every checked expression attached, alongside the diagnostics found.
#[tracing::instrument(level = "debug", skip_all)]
pub fn check(program: Program, options: &CheckOptions) -> (TypedProgram, Vec<Diagnostic>) {
    TypeChecker::new(*options).check_program(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vyaz_ast::{has_errors, DiagnosticCode, Severity};

    fn check_source(source: &str, options: CheckOptions) -> Vec<Diagnostic> {
        let (program, parse_diagnostics) = vyaz_parser::parse_source(source);
        assert!(
            parse_diagnostics.is_empty(),
            "unexpected parse diagnostics: {:?}",
            parse_diagnostics
        );
        check(program, &options).1
    }

    fn diagnostics(source: &str) -> Vec<Diagnostic> {
        check_source(source, CheckOptions::default())
    }

    fn messages(diagnostics: &[Diagnostic]) -> Vec<String> {
        diagnostics.iter().map(|d| d.message.clone()).collect()
    }

    const USER: &str = "
        интерфейс Пользователь {
            имя: строка;
            возраст: число;
            почта?: строка;
        }
    ";

    #[test]
    fn test_object_literal_assignable_to_interface() {
        let source = format!("{USER} пусть п: Пользователь = {{ имя: \"а\", возраст: 1 }};");
        assert_eq!(messages(&diagnostics(&source)), Vec::<String>::new());
    }

    #[test]
    fn test_missing_required_field_is_one_error() {
        let source = format!("{USER} пусть п: Пользователь = {{ имя: \"а\" }};");
        let diagnostics = diagnostics(&source);
        assert_eq!(diagnostics.len(), 1, "{:?}", messages(&diagnostics));
        assert_eq!(diagnostics[0].code, DiagnosticCode::TypeError);
        assert_eq!(diagnostics[0].severity, Severity::Error);
        assert!(diagnostics[0].message.contains("возраст"));
    }

    #[test]
    fn test_error_sentinel_stays_contained() {
        let source = "
            функция плохая(): НетТакого {
                вернуть 1;
            }
            функция хорошая(а: число): число {
                вернуть а + 1;
            }
            пусть итог: число = хорошая(2);
        ";
        let diagnostics = diagnostics(source);
        assert_eq!(
            messages(&diagnostics),
            vec!["cannot find type 'НетТакого'".to_string()]
        );
    }

    #[test]
    fn test_undefined_variable() {
        let diagnostics = diagnostics("пусть а: число = б;");
        assert_eq!(messages(&diagnostics), vec!["cannot find name 'б'".to_string()]);
    }

    #[test]
    fn test_forward_references_between_declarations() {
        let source = "
            пусть итог: число = удвоить(2);
            функция удвоить(x: число): число {
                вернуть x * 2;
            }
            функция создать(): Точка {
                вернуть { x: 1, y: 2 };
            }
            интерфейс Точка {
                x: число;
                y: число;
            }
        ";
        assert_eq!(messages(&diagnostics(source)), Vec::<String>::new());
    }

    #[test]
    fn test_generic_inference_and_explicit_arguments() {
        let source = "
            функция тождество<Т>(x: Т): Т {
                вернуть x;
            }
            пусть н: число = тождество(5);
            пусть с: строка = тождество<строка>(5);
        ";
        let diagnostics = diagnostics(source);
        assert_eq!(diagnostics.len(), 1, "{:?}", messages(&diagnostics));
        assert!(diagnostics[0].message.contains("строка"));
    }

    #[test]
    fn test_arity_allows_omitting_optional_tail() {
        let source = "
            функция сложить(а: число, б?: число): число {
                вернуть а;
            }
            сложить();
            сложить(1);
            сложить(1, 2);
            сложить(1, 2, 3);
        ";
        assert_eq!(
            messages(&diagnostics(source)),
            vec![
                "expected 1-2 arguments, but got 0".to_string(),
                "expected 1-2 arguments, but got 3".to_string(),
            ]
        );
    }

    #[test]
    fn test_typeof_narrowing_in_branch_and_after_return() {
        let source = "
            функция длина(x: строка | число): число {
                если (типа x === \"string\") {
                    вернуть x.length;
                }
                вернуть x;
            }
        ";
        assert_eq!(messages(&diagnostics(source)), Vec::<String>::new());
    }

    #[test]
    fn test_narrowing_reverts_at_branch_exit() {
        let source = "
            функция длина(x: строка | число): число {
                если (типа x === \"string\") {
                    x.length;
                }
                вернуть x.length;
            }
        ";
        assert!(has_errors(&diagnostics(source)));
    }

    #[test]
    fn test_discriminated_union_narrowing() {
        let source = "
            тип Фигура = { вид: \"круг\"; радиус: число } | { вид: \"квадрат\"; сторона: число };
            функция площадь(ф: Фигура): число {
                если (ф.вид === \"круг\") {
                    вернуть ф.радиус * ф.радиус;
                } иначе {
                    вернуть ф.сторона * ф.сторона;
                }
            }
        ";
        assert_eq!(messages(&diagnostics(source)), Vec::<String>::new());
    }

    #[test]
    fn test_possibly_null_is_warning_unless_strict() {
        let source = "
            функция длина(x: строка | пусто): число {
                вернуть x.length;
            }
        ";
        let relaxed = diagnostics(source);
        assert_eq!(relaxed.len(), 1);
        assert_eq!(relaxed[0].severity, Severity::Warning);
        assert!(!has_errors(&relaxed));

        let strict = check_source(
            source,
            CheckOptions {
                strict: true,
                ..CheckOptions::default()
            },
        );
        assert_eq!(strict.len(), 1);
        assert_eq!(strict[0].severity, Severity::Error);
    }

    #[test]
    fn test_null_check_removes_warning() {
        let source = "
            функция длина(x: строка | пусто): число {
                если (x === пусто) {
                    вернуть 0;
                }
                вернуть x.length;
            }
        ";
        assert_eq!(messages(&diagnostics(source)), Vec::<String>::new());
    }

    #[test]
    fn test_implicit_any_parameter() {
        let source = "функция ф(x) { вернуть x; }";
        let relaxed = diagnostics(source);
        assert!(!relaxed.is_empty());
        assert!(!has_errors(&relaxed));

        let strict = check_source(
            source,
            CheckOptions {
                strict: true,
                ..CheckOptions::default()
            },
        );
        assert!(has_errors(&strict));
    }

    #[test]
    fn test_diagnostics_follow_source_order() {
        let source = "пусть б;\nфункция ф(х) { вернуть х; }\nпусть в: число = \"с\";";
        let strict = check_source(
            source,
            CheckOptions {
                strict: true,
                ..CheckOptions::default()
            },
        );
        let lines: Vec<u32> = strict.iter().map(|d| d.span.line).collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }

    #[test]
    fn test_contextual_arrow_parameters() {
        let source = "
            пусть числа = [1, 2, 3];
            пусть удвоенные: число[] = числа.map(x => x * 2);
        ";
        assert_eq!(messages(&diagnostics(source)), Vec::<String>::new());
    }

    #[test]
    fn test_assign_to_constant() {
        let diagnostics = diagnostics("конст а = 1;\nа = 2;");
        assert_eq!(
            messages(&diagnostics),
            vec!["cannot assign to 'а' because it is a constant".to_string()]
        );
    }

    #[test]
    fn test_constant_writes_report_once_each() {
        let diagnostics = diagnostics("конст а = 1;\nа = 2;\nа += 3;\nа++;");
        assert_eq!(
            messages(&diagnostics),
            vec!["cannot assign to 'а' because it is a constant".to_string(); 3]
        );
        assert_eq!(
            diagnostics.iter().map(|d| d.span.line).collect::<Vec<_>>(),
            vec![2, 3, 4]
        );
    }

    #[test]
    fn test_private_member_outside_class() {
        let source = "
            класс Счет {
                приватный баланс: число = 0;
                пополнить(сумма: число): пустота {
                    этот.баланс = этот.баланс + сумма;
                }
            }
            пусть с = новый Счет();
            с.пополнить(5);
            с.баланс;
        ";
        let diagnostics = diagnostics(source);
        assert_eq!(diagnostics.len(), 1, "{:?}", messages(&diagnostics));
        assert!(diagnostics[0].message.contains("баланс"));
    }

    #[test]
    fn test_abstract_class_cannot_be_instantiated() {
        let source = "
            абстрактный класс Фигура {
                абстрактный площадь(): число;
            }
            новый Фигура();
        ";
        assert_eq!(
            messages(&diagnostics(source)),
            vec!["cannot create an instance of abstract class 'Фигура'".to_string()]
        );
    }

    #[test]
    fn test_no_type_check_passes_through() {
        let source = "пусть а: число = \"не число\";";
        let diagnostics = check_source(
            source,
            CheckOptions {
                no_type_check: true,
                ..CheckOptions::default()
            },
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_checking_is_deterministic() {
        let source = format!("{USER} пусть п: Пользователь = {{ имя: 1 }}; пусть к: строка = 2;");
        assert_eq!(diagnostics(&source), diagnostics(&source));
    }
}
