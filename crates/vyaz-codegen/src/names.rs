//! Output identifiers, the global prelude and literal quoting

use std::borrow::Cow;

/// Words an output identifier may not be.
const RESERVED: &[&str] = &[
    "arguments",
    "await",
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "enum",
    "eval",
    "export",
    "extends",
    "false",
    "finally",
    "for",
    "function",
    "if",
    "implements",
    "import",
    "in",
    "instanceof",
    "interface",
    "let",
    "new",
    "null",
    "package",
    "private",
    "protected",
    "public",
    "return",
    "static",
    "super",
    "switch",
    "this",
    "throw",
    "true",
    "try",
    "typeof",
    "var",
    "void",
    "while",
    "with",
    "yield",
];

/// Prefix of names the generator introduces itself.
pub const INTERNAL_PREFIX: &str = "__";

/// The output spelling of a source identifier.
pub fn js_name(name: &str) -> Cow<'_, str> {
    if RESERVED.binary_search(&name).is_ok() {
        Cow::Owned(format!("{name}_"))
    } else {
        Cow::Borrowed(name)
    }
}

/// Cyrillic global aliases and the declaration each one needs.
pub const PRELUDE: &[(&str, &str)] = &[
    (
        "консоль",
        "const консоль = Object.assign(Object.create(console), { вывод: console.log.bind(console), ошибка: console.error.bind(console), предупреждение: console.warn.bind(console), инфо: console.info.bind(console) });",
    ),
    ("Математика", "const Математика = Math;"),
    ("Обещание", "const Обещание = Promise;"),
    ("Ошибка", "const Ошибка = Error;"),
];

/// A double-quoted string literal.
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\u{2028}' | '\u{2029}' => out.push_str(&format!("\\u{:04x}", ch as u32)),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// The raw text of one template literal chunk. Line breaks are escaped so
/// a literal never spans output lines.
pub fn escape_template(chunk: &str) -> String {
    let mut out = String::with_capacity(chunk.len());
    let mut chars = chunk.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '`' => out.push_str("\\`"),
            '\\' => out.push_str("\\\\"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' | '\u{2029}' => out.push_str(&format!("\\u{:04x}", ch as u32)),
            c => out.push(c),
        }
    }
    out
}

/// A property key that can be written bare.
pub fn is_identifier_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reserved_list_is_sorted() {
        let mut sorted = RESERVED.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, RESERVED);
    }

    #[test]
    fn test_reserved_words_get_suffix() {
        assert_eq!(js_name("class"), "class_");
        assert_eq!(js_name("yield"), "yield_");
        assert_eq!(js_name("счет"), "счет");
        assert_eq!(js_name("classes"), "classes");
    }

    #[test]
    fn test_quote_string() {
        assert_eq!(quote_string("а\"б\\\n"), "\"а\\\"б\\\\\\n\"");
        assert_eq!(quote_string("\u{1}"), "\"\\u0001\"");
    }

    #[test]
    fn test_escape_template() {
        assert_eq!(escape_template("a`b${c}\nd$e"), "a\\`b\\${c}\\nd$e");
    }

    #[test]
    fn test_identifier_names() {
        assert!(is_identifier_name("имя"));
        assert!(is_identifier_name("_x1"));
        assert!(!is_identifier_name("1x"));
        assert!(!is_identifier_name("a-b"));
        assert!(!is_identifier_name(""));
    }
}
