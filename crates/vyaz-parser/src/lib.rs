//! # Vyaz Parser
//!
//! Recursive descent parser for Vyaz. Statements and declarations are parsed
//! top-down; expressions use precedence climbing over the table in
//! [`Parser::get_infix_precedence`](parser::Parser).
//!
//! The parser never gives up on a file: a statement that cannot be parsed is
//! reported once and replaced by [`Stmt::Error`], after which parsing resumes
//! at the next statement boundary.

use vyaz_ast::*;
use vyaz_lexer::{Token, TokenKind};

// Module declarations
mod error;
mod parser;
mod expr;
mod stmt;
mod types;
mod decl;
mod pattern;
mod helpers;

// Re-export public types
pub use error::{ParseError, ParseResult};
pub use parser::Parser;

/// Parses a token stream into a program plus parse diagnostics.
pub fn parse(tokens: Vec<Token>) -> (Program, Vec<Diagnostic>) {
    Parser::new(tokens).parse_program()
}

/// Lexes and parses `source`; lexer diagnostics come first.
pub fn parse_source(source: &str) -> (Program, Vec<Diagnostic>) {
    let (tokens, mut diagnostics) = vyaz_lexer::tokenize(source);
    let (program, parse_diagnostics) = parse(tokens);
    diagnostics.extend(parse_diagnostics);
    (program, diagnostics)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Program {
        let (program, diagnostics) = parse_source(source);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {:?}", diagnostics);
        program
    }

    fn first_stmt(program: &Program) -> &Stmt {
        match &program.items[0].value {
            ModuleItem::Stmt(stmt) => &stmt.value,
            other => panic!("expected statement, got {:?}", other),
        }
    }

    fn first_init(program: &Program) -> &Expr {
        match first_stmt(program) {
            Stmt::VarDecl(decl) => &decl.declarations[0].init.as_ref().unwrap().value,
            other => panic!("expected variable declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_variable_declaration() {
        let program = parse_ok("пусть x: число = 42;");
        assert_eq!(program.items.len(), 1);
        match first_stmt(&program) {
            Stmt::VarDecl(decl) => {
                assert_eq!(decl.kind, VarDeclKind::Let);
                match &decl.declarations[0].pattern.value {
                    Pattern::Ident {
                        name,
                        type_annotation: Some(ty),
                    } => {
                        assert_eq!(name.value.name, "x");
                        assert_eq!(ty.value, Type::Primitive(PrimitiveType::Number));
                    }
                    other => panic!("unexpected pattern {:?}", other),
                }
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_parse_function_declaration() {
        let program = parse_ok("функция сложить(а: число, б: число = 1): число { вернуть а + б; }");
        match &program.items[0].value {
            ModuleItem::Decl(decl) => match &decl.value {
                Decl::Function(func) => {
                    assert_eq!(func.name.value.name, "сложить");
                    assert_eq!(func.params.len(), 2);
                    assert!(func.params[1].default.is_some());
                    assert!(func.return_type.is_some());
                    assert!(!func.is_async);
                }
                other => panic!("unexpected decl {:?}", other),
            },
            other => panic!("unexpected item {:?}", other),
        }
    }

    #[test]
    fn test_parse_async_function() {
        let program = parse_ok("асинх функция загрузить(): Обещание<строка> { вернуть ждать получить(); }");
        match &program.items[0].value {
            ModuleItem::Decl(decl) => match &decl.value {
                Decl::Function(func) => assert!(func.is_async),
                other => panic!("unexpected decl {:?}", other),
            },
            other => panic!("unexpected item {:?}", other),
        }
    }

    #[test]
    fn test_parse_class_declaration() {
        let source = r#"
            абстрактный класс Фигура {
                абстрактный площадь(): число;
            }

            класс Точка расширяет Фигура реализует Печатаемое {
                приватный статический счётчик: число = 0;
                толькочтение имя: строка;

                конструктор(публичный x: число, приватный y: число) {
                    родитель();
                    этот.имя = "т";
                }

                площадь(): число { вернуть 0; }
                получить длина(): число { вернуть этот.x; }
                задать длина(v: число) { этот.x = v; }
            }
        "#;
        let program = parse_ok(source);
        assert_eq!(program.items.len(), 2);

        let class = match &program.items[1].value {
            ModuleItem::Decl(decl) => match &decl.value {
                Decl::Class(class) => class,
                other => panic!("unexpected decl {:?}", other),
            },
            other => panic!("unexpected item {:?}", other),
        };
        assert!(class.extends.is_some());
        assert_eq!(class.implements.len(), 1);
        assert_eq!(class.members.len(), 6);

        match &class.members[0] {
            ClassMember::Property {
                access, is_static, ..
            } => {
                assert_eq!(*access, AccessModifier::Private);
                assert!(is_static);
            }
            other => panic!("unexpected member {:?}", other),
        }
        match &class.members[2] {
            ClassMember::Constructor { params, .. } => {
                assert_eq!(
                    params[1].property,
                    Some(ParamProperty {
                        access: AccessModifier::Private,
                        readonly: false
                    })
                );
            }
            other => panic!("unexpected member {:?}", other),
        }
        assert!(matches!(class.members[4], ClassMember::Getter { .. }));
        assert!(matches!(class.members[5], ClassMember::Setter { .. }));
    }

    #[test]
    fn test_parse_interface_and_alias() {
        let source = r#"
            интерфейс Пользователь расширяет Сущность {
                толькочтение имя: строка;
                возраст: число,
                почта?: строка;
                приветствие(другой: Пользователь): пустота;
            }
            тип Результат<Т> = { вид: "ок"; значение: Т } | { вид: "ошибка"; сообщение: строка };
        "#;
        let program = parse_ok(source);
        match &program.items[0].value {
            ModuleItem::Decl(decl) => match &decl.value {
                Decl::Interface(iface) => {
                    assert_eq!(iface.extends.len(), 1);
                    assert_eq!(iface.members.len(), 4);
                    assert!(matches!(
                        iface.members[2],
                        ObjectTypeMember::Property { optional: true, .. }
                    ));
                }
                other => panic!("unexpected decl {:?}", other),
            },
            other => panic!("unexpected item {:?}", other),
        }
        match &program.items[1].value {
            ModuleItem::Decl(decl) => match &decl.value {
                Decl::TypeAlias(alias) => {
                    assert!(alias.type_params.is_some());
                    assert!(matches!(&alias.ty.value, Type::Union(members) if members.len() == 2));
                }
                other => panic!("unexpected decl {:?}", other),
            },
            other => panic!("unexpected item {:?}", other),
        }
    }

    #[test]
    fn test_parse_import_export() {
        let source = r#"
            импорт { а, б как г } из "./модуль";
            импорт * как утилиты из "./утилиты";
            импорт тип { Тип } из "./типы";
            импорт Основной из "./основной";
            экспорт функция баз() {}
            экспорт { а как а2 };
            экспорт * из "./ещё";
            экспорт поумолчанию 42;
        "#;
        let program = parse_ok(source);
        assert_eq!(program.items.len(), 8);

        match &program.items[0].value {
            ModuleItem::Import(import) => {
                assert_eq!(import.source, "./модуль");
                assert_eq!(import.specifiers.len(), 2);
                assert_eq!(import.specifiers[1].local_name(), "г");
            }
            other => panic!("unexpected item {:?}", other),
        }
        assert!(matches!(
            &program.items[2].value,
            ModuleItem::Import(ImportDecl { type_only: true, .. })
        ));
        match &program.items[3].value {
            ModuleItem::Import(import) => {
                assert!(matches!(import.specifiers[0], ImportSpecifier::Default(_)))
            }
            other => panic!("unexpected item {:?}", other),
        }
        assert!(matches!(
            &program.items[6].value,
            ModuleItem::Export(ExportDecl::All { .. })
        ));
        assert!(matches!(
            &program.items[7].value,
            ModuleItem::Export(ExportDecl::Default(_))
        ));

        let sources: Vec<String> = program.import_sources().into_iter().map(|(s, _)| s).collect();
        assert_eq!(sources, vec!["./модуль", "./утилиты", "./типы", "./основной", "./ещё"]);
    }

    #[test]
    fn test_parse_control_flow() {
        let source = r#"
            если (x > 0) {
                консоль.вывод("положительное");
            } иначе {
                консоль.вывод("отрицательное");
            }

            для (пусть i = 0; i < 10; i++) {
                продолжить;
            }

            для (конст ключ в объект) {}
            для (конст элемент из список) {}

            пока (истина) {
                прервать;
            }

            делать { x--; } пока (x > 0);

            выбор (x) {
                случай 1: вернуть "один";
                поумолчанию: вернуть "много";
            }

            попытка { бросить новый Ошибка("х"); } перехват (е) {} наконец {}
        "#;
        let program = parse_ok(source);
        assert_eq!(program.items.len(), 8);
        let kinds: Vec<&str> = program
            .items
            .iter()
            .map(|item| match &item.value {
                ModuleItem::Stmt(stmt) => match stmt.value {
                    Stmt::If { .. } => "if",
                    Stmt::For { .. } => "for",
                    Stmt::ForIn { .. } => "for-in",
                    Stmt::ForOf { .. } => "for-of",
                    Stmt::While { .. } => "while",
                    Stmt::DoWhile { .. } => "do",
                    Stmt::Switch { .. } => "switch",
                    Stmt::Try { .. } => "try",
                    _ => "other",
                },
                _ => "item",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["if", "for", "for-in", "for-of", "while", "do", "switch", "try"]
        );
    }

    #[test]
    fn test_parse_precedence() {
        let program = parse_ok("пусть x = 1 + 2 * 3 ** 2 ** 2;");
        match first_init(&program) {
            Expr::Binary {
                op: BinaryOp::Add,
                right,
                ..
            } => match &right.value {
                Expr::Binary {
                    op: BinaryOp::Mul,
                    right,
                    ..
                } => match &right.value {
                    // right-associative: 3 ** (2 ** 2)
                    Expr::Binary {
                        op: BinaryOp::Pow,
                        right,
                        ..
                    } => assert!(matches!(right.value, Expr::Binary { op: BinaryOp::Pow, .. })),
                    other => panic!("unexpected {:?}", other),
                },
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }

        let program = parse_ok("пусть y = а ?? б || г ? 1 : 2;");
        assert!(matches!(first_init(&program), Expr::Ternary { .. }));
    }

    #[test]
    fn test_parse_arrow_functions() {
        let program = parse_ok("конст f = (a: число, b: число): число => a + b;");
        match first_init(&program) {
            Expr::Arrow {
                params,
                return_type,
                body,
                is_async,
                ..
            } => {
                assert_eq!(params.len(), 2);
                assert!(return_type.is_some());
                assert!(matches!(body, ArrowBody::Expr(_)));
                assert!(!is_async);
            }
            other => panic!("unexpected {:?}", other),
        }

        let program = parse_ok("конст g = x => x * 2;");
        assert!(matches!(first_init(&program), Expr::Arrow { params, .. } if params.len() == 1));

        let program = parse_ok("конст h = асинх () => { ждать пауза(); };");
        assert!(matches!(first_init(&program), Expr::Arrow { is_async: true, .. }));

        let program = parse_ok("конст p = (a + b) * 2;");
        assert!(matches!(first_init(&program), Expr::Binary { .. }));
    }

    #[test]
    fn test_parse_generic_call_and_comparison() {
        let program = parse_ok("пусть r = тождество<число>(5);");
        match first_init(&program) {
            Expr::Call { type_args, args, .. } => {
                assert_eq!(type_args.as_ref().map(Vec::len), Some(1));
                assert_eq!(args.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }

        let program = parse_ok("пусть c = а < б;");
        assert!(matches!(first_init(&program), Expr::Binary { op: BinaryOp::Lt, .. }));

        let program = parse_ok("пусть м: Массив<Массив<число>> = [];");
        match first_stmt(&program) {
            Stmt::VarDecl(decl) => match &decl.declarations[0].pattern.value {
                Pattern::Ident {
                    type_annotation: Some(ty),
                    ..
                } => assert!(matches!(&ty.value, Type::Array(inner) if matches!(inner.value, Type::Array(_)))),
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_template_literal() {
        let program = parse_ok("пусть s = `привет ${имя}, тебе ${возраст + 1}!`;");
        match first_init(&program) {
            Expr::Template { quasis, exprs } => {
                assert_eq!(quasis, &vec!["привет ".to_string(), ", тебе ".to_string(), "!".to_string()]);
                assert_eq!(exprs.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_optional_chaining_and_non_null() {
        let program = parse_ok("пусть x = obj?.prop;");
        assert!(matches!(first_init(&program), Expr::OptionalMember { .. }));

        let program = parse_ok("пусть y = arr?.[0];");
        assert!(matches!(first_init(&program), Expr::OptionalIndex { .. }));

        let program = parse_ok("пусть z = fn?.();");
        assert!(matches!(first_init(&program), Expr::OptionalCall { .. }));

        let program = parse_ok("пусть w = значение!.поле;");
        match first_init(&program) {
            Expr::Member { object, .. } => {
                assert!(matches!(object.value, Expr::NonNullAssertion(_)))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_destructuring() {
        let program = parse_ok("конст { а, б: [д, г = 2], ...остаток } = объект;");
        match first_stmt(&program) {
            Stmt::VarDecl(decl) => {
                let names = decl.declarations[0].pattern.value.bound_names();
                assert_eq!(names, vec!["а", "д", "г", "остаток"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_object_literal_and_type_cast() {
        let program = parse_ok(r#"пусть о = { имя: "а", возраст, метод() { вернуть 1; }, ...другое } как Пользователь;"#);
        match first_init(&program) {
            Expr::TypeCast { expr, .. } => match &expr.value {
                Expr::Object(props) => {
                    assert_eq!(props.len(), 4);
                    assert!(matches!(props[1], ObjectProperty::Property { shorthand: true, .. }));
                    assert!(matches!(props[2], ObjectProperty::Method { .. }));
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_recovery_single_malformed_statement() {
        let source = r#"
            пусть а = 1;
            пусть = 5;
            пусть б = 2;
            функция f() {
                вернуть а + б;
            }
        "#;
        let (program, diagnostics) = parse_source(source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::ParseError);
        assert_eq!(diagnostics[0].span.line, 3);
        assert_eq!(program.items.len(), 4);
        assert!(matches!(
            &program.items[1].value,
            ModuleItem::Stmt(Node { value: Stmt::Error, .. })
        ));
        assert!(matches!(&program.items[2].value, ModuleItem::Stmt(_)));
        assert!(matches!(&program.items[3].value, ModuleItem::Decl(_)));
    }

    #[test]
    fn test_recovery_inside_block() {
        let source = r#"
            функция f() {
                пусть x = ;
                вернуть 1;
            }
            пусть y = 2;
        "#;
        let (program, diagnostics) = parse_source(source);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(program.items.len(), 2);
        match &program.items[0].value {
            ModuleItem::Decl(decl) => match &decl.value {
                Decl::Function(func) => {
                    let body = func.body.as_ref().unwrap();
                    assert_eq!(body.value.stmts.len(), 2);
                    assert!(matches!(body.value.stmts[0].value, Stmt::Error));
                    assert!(matches!(body.value.stmts[1].value, Stmt::Return(Some(_))));
                }
                other => panic!("unexpected decl {:?}", other),
            },
            other => panic!("unexpected item {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_block_reports_once() {
        let (_, diagnostics) = parse_source("функция f() { если (x) {");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_lexer_errors_do_not_cascade() {
        let (program, diagnostics) = parse_source("пусть а = 1; #\nпусть б = 3;");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::LexError);
        assert_eq!(program.items.len(), 2);
    }

    #[test]
    fn test_lexer_error_inside_expression() {
        let (program, diagnostics) = parse_source("пусть а = 1 @ 2;\nпусть б = 3;");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::LexError);
        assert_eq!((diagnostics[0].span.line, diagnostics[0].span.column), (1, 13));
        assert_eq!(program.items.len(), 2);
        assert_eq!(first_init(&program), &Expr::Error);
    }

    #[test]
    fn test_lexer_error_in_operand_and_block() {
        let (program, diagnostics) = parse_source("функция ф() {\n    вернуть @;\n    #\n}\nф(@);");
        assert_eq!(diagnostics.len(), 3);
        assert!(diagnostics.iter().all(|d| d.code == DiagnosticCode::LexError));
        assert_eq!(program.items.len(), 2);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let source = "класс А { метод(x: число) { вернуть x ?? 0; } }";
        assert_eq!(parse_source(source), parse_source(source));
    }

    #[test]
    fn test_empty_source() {
        let (program, diagnostics) = parse_source("// только комментарий");
        assert!(program.items.is_empty());
        assert!(diagnostics.is_empty());
    }
}
