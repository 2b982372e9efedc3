//! Whitespace and comment removal over generated output
//!
//! The input is always generator output: no regular expression literals,
//! every statement ends in `;` or `}`, and template literals never contain
//! raw line breaks. Under those conditions joining everything onto one line
//! keeps the program's meaning.

use crate::sourcemap::Mapping;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    String(char),
    Template,
}

struct Minifier<'m> {
    out: String,
    column: u32,
    last: Option<char>,
    pending_space: bool,
    mappings: Option<&'m [Mapping]>,
    next_mapping: usize,
    remapped: Vec<Mapping>,
}

impl Minifier<'_> {
    /// Moves every mapping at or before the input position onto the next
    /// output character.
    fn settle_mappings(&mut self, line: u32, column: u32) {
        let Some(mappings) = self.mappings else {
            return;
        };
        while let Some(mapping) = mappings.get(self.next_mapping) {
            if (mapping.generated_line, mapping.generated_column) > (line, column) {
                break;
            }
            self.next_mapping += 1;
            let moved = Mapping {
                generated_line: 0,
                generated_column: self.column,
                ..*mapping
            };
            if self.remapped.last().map(|m| m.generated_column) != Some(moved.generated_column) {
                self.remapped.push(moved);
            }
        }
    }

    fn emit(&mut self, ch: char, line: u32, column: u32) {
        if self.pending_space {
            self.pending_space = false;
            if let Some(last) = self.last {
                if needs_separator(last, ch) {
                    self.push(' ');
                }
            }
        }
        self.settle_mappings(line, column);
        self.push(ch);
    }

    /// Copies a character inside a literal, where spacing is content.
    fn copy(&mut self, ch: char) {
        self.push(ch);
    }

    fn push(&mut self, ch: char) {
        self.out.push(ch);
        self.column += ch.len_utf16() as u32;
        self.last = Some(ch);
    }
}

/// Strips comments and insignificant whitespace, joining the output onto a
/// single line. Mappings are moved to where their text ended up.
pub fn minify(code: &str, mappings: Option<&[Mapping]>) -> (String, Option<Vec<Mapping>>) {
    let chars: Vec<char> = code.chars().collect();
    let mut m = Minifier {
        out: String::with_capacity(code.len()),
        column: 0,
        last: None,
        pending_space: false,
        mappings,
        next_mapping: 0,
        remapped: Vec::new(),
    };
    let mut state = State::Code;
    let mut template_braces: Vec<u32> = Vec::new();
    let (mut line, mut column) = (0u32, 0u32);
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let next = chars.get(i + 1).copied();
        let mut consumed = 1;

        match state {
            State::Code => match ch {
                c if c.is_whitespace() => m.pending_space = true,
                '/' if next == Some('/') => {
                    while i + consumed < chars.len() && chars[i + consumed] != '\n' {
                        consumed += 1;
                    }
                    m.pending_space = true;
                }
                '/' if next == Some('*') => {
                    consumed = 2;
                    while i + consumed < chars.len()
                        && !(chars[i + consumed] == '*' && chars.get(i + consumed + 1) == Some(&'/'))
                    {
                        consumed += 1;
                    }
                    consumed = (consumed + 2).min(chars.len() - i);
                    m.pending_space = true;
                }
                '"' | '\'' => {
                    m.emit(ch, line, column);
                    state = State::String(ch);
                }
                '`' => {
                    m.emit(ch, line, column);
                    state = State::Template;
                }
                '{' => {
                    if let Some(depth) = template_braces.last_mut() {
                        *depth += 1;
                    }
                    m.emit(ch, line, column);
                }
                '}' => {
                    m.emit(ch, line, column);
                    if template_braces.last() == Some(&0) {
                        template_braces.pop();
                        state = State::Template;
                    } else if let Some(depth) = template_braces.last_mut() {
                        *depth -= 1;
                    }
                }
                _ => m.emit(ch, line, column),
            },
            State::String(quote) => {
                m.settle_mappings(line, column);
                m.copy(ch);
                if ch == '\\' {
                    if let Some(escaped) = next {
                        m.copy(escaped);
                        consumed = 2;
                    }
                } else if ch == quote {
                    state = State::Code;
                }
            }
            State::Template => {
                m.settle_mappings(line, column);
                m.copy(ch);
                match ch {
                    '\\' => {
                        if let Some(escaped) = next {
                            m.copy(escaped);
                            consumed = 2;
                        }
                    }
                    '`' => state = State::Code,
                    '$' if next == Some('{') => {
                        m.copy('{');
                        consumed = 2;
                        template_braces.push(0);
                        state = State::Code;
                    }
                    _ => {}
                }
            }
        }

        for &skipped in &chars[i..i + consumed] {
            if skipped == '\n' {
                line += 1;
                column = 0;
            } else {
                column += skipped.len_utf16() as u32;
            }
        }
        i += consumed;
    }

    let remapped = if mappings.is_some() {
        m.settle_mappings(u32::MAX, u32::MAX);
        Some(std::mem::take(&mut m.remapped))
    } else {
        None
    };
    (m.out, remapped)
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$' || ch == '\\'
}

/// True when dropping the whitespace between two tokens would merge them.
fn needs_separator(before: char, after: char) -> bool {
    (is_word_char(before) && is_word_char(after))
        || (before == '+' && after == '+')
        || (before == '-' && after == '-')
        || (before == '/' && after == '/')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_whitespace_and_comments_removed() {
        let code = "// заголовок\nconst а = 1;\n/* блок */\nif (а) {\n    консоль.вывод(а + +1);\n}\n";
        let (out, _) = minify(code, None);
        assert_eq!(out, "const а=1;if(а){консоль.вывод(а+ +1);}");
    }

    #[test]
    fn test_literals_are_untouched() {
        let code = "const s = \"a  // b\";\nconst t = `x  ${ s + `y  z` }  w`;\n";
        let (out, _) = minify(code, None);
        assert_eq!(out, "const s=\"a  // b\";const t=`x  ${s+`y  z`}  w`;");
    }

    #[test]
    fn test_object_in_template_expression() {
        let (out, _) = minify("`${ f({ a: 1 }) } b`", None);
        assert_eq!(out, "`${f({a:1})} b`");
    }

    #[test]
    fn test_mappings_follow_their_text() {
        let code = "let a;\n    let b;\n";
        let mappings = [
            Mapping {
                generated_line: 0,
                generated_column: 0,
                source: 0,
                source_line: 0,
                source_column: 0,
            },
            Mapping {
                generated_line: 1,
                generated_column: 4,
                source: 0,
                source_line: 1,
                source_column: 0,
            },
        ];
        let (out, remapped) = minify(code, Some(&mappings));
        assert_eq!(out, "let a;let b;");
        let remapped = remapped.unwrap();
        assert_eq!(remapped.len(), 2);
        assert_eq!((remapped[1].generated_line, remapped[1].generated_column), (0, 6));
        assert_eq!(remapped[1].source_line, 1);
    }
}
