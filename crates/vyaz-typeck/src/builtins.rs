//! Built-in globals and members of primitive types.
//!
//! Global objects are available under their Cyrillic alias and their
//! JavaScript name; the code generator's prelude binds the aliases at runtime.
//! Members of strings, arrays and promises keep their JavaScript names.

use vyaz_ast::AccessModifier;

use crate::env::{ClassInfo, ClassMemberInfo, TypeDef, TypeEnv, VarInfo};
use crate::types::{FunctionSig, ParamSig, PropertySig, Type, TypeParamInfo};

/// Name of the built-in error class.
pub const ERROR_CLASS: &str = "Ошибка";

/// Globals that exist at runtime but are only checked as `любой`.
const ANY_GLOBALS: &[&str] = &[
    "Обещание",
    "Promise",
    "Объект",
    "Object",
    "Массив",
    "Array",
    "Число",
    "Number",
    "Строка",
    "String",
    "Date",
    "Map",
    "Set",
    "Symbol",
    "RegExp",
    "parseInt",
    "parseFloat",
    "isNaN",
    "setTimeout",
    "clearTimeout",
    "setInterval",
    "clearInterval",
    "globalThis",
    "process",
    "require",
    "module",
    "exports",
    "window",
    "document",
    "fetch",
    "NaN",
    "Infinity",
];

fn func(params: Vec<ParamSig>, ret: Type) -> Type {
    Type::Function(FunctionSig::new(params, ret))
}

fn generic_func(type_param: &str, params: Vec<ParamSig>, ret: Type) -> Type {
    Type::Function(FunctionSig {
        type_params: vec![TypeParamInfo {
            name: type_param.to_string(),
            constraint: None,
            default: None,
        }],
        params,
        ret: Box::new(ret),
    })
}

fn param(name: &str, ty: Type) -> ParamSig {
    ParamSig::new(name, ty)
}

fn rest_any() -> ParamSig {
    ParamSig::new("данные", Type::Array(Box::new(Type::Any))).rest()
}

fn array_of(ty: Type) -> Type {
    Type::Array(Box::new(ty))
}

fn readonly(name: &str, ty: Type) -> PropertySig {
    PropertySig {
        readonly: true,
        ..PropertySig::new(name, ty)
    }
}

fn console_type() -> Type {
    let log = || func(vec![rest_any()], Type::Void);
    Type::Object(
        [
            "вывод",
            "ошибка",
            "предупреждение",
            "инфо",
            "log",
            "error",
            "warn",
            "info",
            "debug",
        ]
        .iter()
        .map(|name| readonly(name, log()))
        .collect(),
    )
}

fn math_type() -> Type {
    let unary = || func(vec![param("x", Type::Number)], Type::Number);
    let variadic = || {
        func(
            vec![ParamSig::new("значения", array_of(Type::Number)).rest()],
            Type::Number,
        )
    };

    let mut props: Vec<PropertySig> = [
        "floor", "ceil", "round", "trunc", "abs", "sqrt", "cbrt", "sign", "log", "exp", "sin",
        "cos", "tan",
    ]
    .iter()
    .map(|name| readonly(name, unary()))
    .collect();
    props.push(readonly("max", variadic()));
    props.push(readonly("min", variadic()));
    props.push(readonly(
        "pow",
        func(vec![param("x", Type::Number), param("y", Type::Number)], Type::Number),
    ));
    props.push(readonly(
        "atan2",
        func(vec![param("y", Type::Number), param("x", Type::Number)], Type::Number),
    ));
    props.push(readonly("random", func(Vec::new(), Type::Number)));
    props.push(readonly("PI", Type::Number));
    props.push(readonly("E", Type::Number));
    Type::Object(props)
}

fn json_type() -> Type {
    Type::Object(vec![
        readonly(
            "stringify",
            func(vec![param("значение", Type::Any), rest_any()], Type::String),
        ),
        readonly("parse", func(vec![param("текст", Type::String)], Type::Any)),
    ])
}

fn error_class() -> ClassInfo {
    let field = |name: &str, optional: bool| ClassMemberInfo {
        name: name.to_string(),
        ty: Type::String,
        access: AccessModifier::Public,
        is_static: false,
        readonly: false,
        optional,
        is_abstract: false,
    };
    ClassInfo {
        name: ERROR_CLASS.to_string(),
        params: Vec::new(),
        extends: None,
        is_abstract: false,
        ctor: Some(FunctionSig::new(
            vec![param("сообщение", Type::String).optional()],
            Type::Void,
        )),
        members: vec![field("message", false), field("name", false), field("stack", true)],
    }
}

/// Declares the global scope.
pub(crate) fn install_globals(env: &mut TypeEnv) {
    let globals: [(&[&str], Type); 3] = [
        (&["консоль", "console"], console_type()),
        (&["Математика", "Math"], math_type()),
        (&["JSON"], json_type()),
    ];
    for (names, ty) in globals {
        for name in names.iter() {
            env.declare(name.to_string(), VarInfo::new(ty.clone(), false));
        }
    }

    for name in ANY_GLOBALS {
        env.declare(name.to_string(), VarInfo::new(Type::Any, false));
    }

    env.define_type(ERROR_CLASS.to_string(), TypeDef::Class(error_class()));
    env.define_type(
        "Error".to_string(),
        TypeDef::Alias {
            params: Vec::new(),
            ty: Type::Named {
                name: ERROR_CLASS.to_string(),
                args: Vec::new(),
            },
        },
    );
    for name in [ERROR_CLASS, "Error"] {
        env.declare(
            name.to_string(),
            VarInfo::new(Type::Class(ERROR_CLASS.to_string()), false),
        );
    }
}

/// Members every value has.
pub(crate) fn universal_member(name: &str) -> Option<Type> {
    match name {
        "toString" => Some(func(Vec::new(), Type::String)),
        "valueOf" => Some(func(Vec::new(), Type::Any)),
        _ => None,
    }
}

pub(crate) fn string_member(name: &str) -> Option<Type> {
    let to_string = || func(Vec::new(), Type::String);
    let predicate = || func(vec![param("строка", Type::String)], Type::Boolean);
    let ty = match name {
        "length" => Type::Number,
        "toUpperCase" | "toLowerCase" | "trim" | "trimStart" | "trimEnd" => to_string(),
        "split" => func(vec![param("разделитель", Type::String)], array_of(Type::String)),
        "includes" | "startsWith" | "endsWith" => predicate(),
        "indexOf" | "lastIndexOf" => func(vec![param("строка", Type::String)], Type::Number),
        "slice" | "substring" => func(
            vec![
                param("начало", Type::Number),
                param("конец", Type::Number).optional(),
            ],
            Type::String,
        ),
        "replace" | "replaceAll" => func(
            vec![param("образец", Type::String), param("замена", Type::String)],
            Type::String,
        ),
        "charAt" => func(vec![param("индекс", Type::Number)], Type::String),
        "charCodeAt" => func(vec![param("индекс", Type::Number)], Type::Number),
        "padStart" | "padEnd" => func(
            vec![
                param("длина", Type::Number),
                param("заполнитель", Type::String).optional(),
            ],
            Type::String,
        ),
        "repeat" => func(vec![param("раз", Type::Number)], Type::String),
        "concat" => func(
            vec![ParamSig::new("строки", array_of(Type::String)).rest()],
            Type::String,
        ),
        _ => return universal_member(name),
    };
    Some(ty)
}

pub(crate) fn number_member(name: &str) -> Option<Type> {
    match name {
        "toFixed" => Some(func(
            vec![param("знаки", Type::Number).optional()],
            Type::String,
        )),
        "toString" => Some(func(
            vec![param("основание", Type::Number).optional()],
            Type::String,
        )),
        _ => universal_member(name),
    }
}

pub(crate) fn array_member(elem: &Type, name: &str) -> Option<Type> {
    let t = || elem.clone();
    let callback = |ret: Type| {
        func(
            vec![
                param("значение", t()),
                param("индекс", Type::Number).optional(),
                param("массив", array_of(t())).optional(),
            ],
            ret,
        )
    };
    let maybe = || Type::union(vec![t(), Type::Undefined]);

    let ty = match name {
        "length" => Type::Number,
        "push" | "unshift" => func(
            vec![ParamSig::new("элементы", array_of(t())).rest()],
            Type::Number,
        ),
        "pop" | "shift" => func(Vec::new(), maybe()),
        "slice" => func(
            vec![
                param("начало", Type::Number).optional(),
                param("конец", Type::Number).optional(),
            ],
            array_of(t()),
        ),
        "concat" => func(
            vec![ParamSig::new("элементы", array_of(Type::Any)).rest()],
            array_of(t()),
        ),
        "reverse" => func(Vec::new(), array_of(t())),
        "sort" => func(
            vec![param(
                "сравнить",
                func(vec![param("а", t()), param("б", t())], Type::Number),
            )
            .optional()],
            array_of(t()),
        ),
        "join" => func(
            vec![param("разделитель", Type::String).optional()],
            Type::String,
        ),
        "indexOf" => func(vec![param("элемент", t())], Type::Number),
        "includes" => func(vec![param("элемент", t())], Type::Boolean),
        "map" => generic_func(
            "U",
            vec![param("обработчик", callback(Type::Generic("U".to_string())))],
            array_of(Type::Generic("U".to_string())),
        ),
        "filter" => func(vec![param("условие", callback(Type::Unknown))], array_of(t())),
        "forEach" => func(vec![param("обработчик", callback(Type::Void))], Type::Void),
        "find" => func(vec![param("условие", callback(Type::Unknown))], maybe()),
        "findIndex" => func(vec![param("условие", callback(Type::Unknown))], Type::Number),
        "some" | "every" => func(vec![param("условие", callback(Type::Unknown))], Type::Boolean),
        "reduce" => {
            let acc = || Type::Generic("U".to_string());
            generic_func(
                "U",
                vec![
                    param(
                        "свёртка",
                        func(
                            vec![
                                param("итог", acc()),
                                param("значение", t()),
                                param("индекс", Type::Number).optional(),
                            ],
                            acc(),
                        ),
                    ),
                    param("начальное", acc()),
                ],
                acc(),
            )
        }
        _ => return universal_member(name),
    };
    Some(ty)
}

pub(crate) fn promise_member(inner: &Type, name: &str) -> Option<Type> {
    let ty = match name {
        "then" => generic_func(
            "U",
            vec![param(
                "обработчик",
                func(vec![param("значение", inner.clone())], Type::Generic("U".to_string())),
            )],
            Type::Promise(Box::new(Type::Generic("U".to_string()))),
        ),
        "catch" => func(
            vec![param(
                "обработчик",
                func(vec![param("ошибка", Type::Any)], Type::Any),
            )],
            Type::Promise(Box::new(inner.clone())),
        ),
        "finally" => func(
            vec![param("обработчик", func(Vec::new(), Type::Void))],
            Type::Promise(Box::new(inner.clone())),
        ),
        _ => return universal_member(name),
    };
    Some(ty)
}

pub(crate) fn function_member(name: &str) -> Option<Type> {
    match name {
        "call" | "apply" | "bind" => Some(func(vec![rest_any()], Type::Any)),
        "length" => Some(Type::Number),
        "name" => Some(Type::String),
        _ => universal_member(name),
    }
}
