use vyaz_ast::{Diagnostic, DiagnosticCode, Span};

use crate::keywords::keyword_kind;
use crate::token::{Token, TokenKind};

/// Operator spellings, longest first so the scan takes the longest match.
const OPERATORS: &[(&str, TokenKind)] = &[
    (">>>=", TokenKind::GtGtGtEq),
    ("===", TokenKind::EqEqEq),
    ("!==", TokenKind::BangEqEq),
    ("**=", TokenKind::StarStarEq),
    ("&&=", TokenKind::AmpAmpEq),
    ("||=", TokenKind::PipePipeEq),
    ("??=", TokenKind::QuestionQuestionEq),
    ("<<=", TokenKind::LtLtEq),
    (">>=", TokenKind::GtGtEq),
    (">>>", TokenKind::GtGtGt),
    ("...", TokenKind::DotDotDot),
    ("==", TokenKind::EqEq),
    ("!=", TokenKind::BangEq),
    ("<=", TokenKind::LtEq),
    (">=", TokenKind::GtEq),
    ("&&", TokenKind::AmpAmp),
    ("||", TokenKind::PipePipe),
    ("??", TokenKind::QuestionQuestion),
    ("?.", TokenKind::QuestionDot),
    ("**", TokenKind::StarStar),
    ("<<", TokenKind::LtLt),
    (">>", TokenKind::GtGt),
    ("+=", TokenKind::PlusEq),
    ("-=", TokenKind::MinusEq),
    ("*=", TokenKind::StarEq),
    ("/=", TokenKind::SlashEq),
    ("%=", TokenKind::PercentEq),
    ("&=", TokenKind::AmpEq),
    ("|=", TokenKind::PipeEq),
    ("^=", TokenKind::CaretEq),
    ("++", TokenKind::PlusPlus),
    ("--", TokenKind::MinusMinus),
    ("=>", TokenKind::FatArrow),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    ("=", TokenKind::Eq),
    ("!", TokenKind::Bang),
    ("<", TokenKind::Lt),
    (">", TokenKind::Gt),
    ("&", TokenKind::Amp),
    ("|", TokenKind::Pipe),
    ("^", TokenKind::Caret),
    ("~", TokenKind::Tilde),
    ("?", TokenKind::Question),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
    (";", TokenKind::Semicolon),
    (",", TokenKind::Comma),
    (".", TokenKind::Dot),
    (":", TokenKind::Colon),
];

/// Position of the first character of a token.
#[derive(Debug, Clone, Copy)]
struct Mark {
    pos: usize,
    line: u32,
    column: u32,
}

/// The lexer for Vyaz source text.
///
/// A single forward cursor over the text. The lexer is also an [`Iterator`]
/// that yields tokens up to and including [`TokenKind::Eof`], then stops.
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::str::CharIndices<'a>,
    current_pos: usize,
    current_char: Option<char>,
    line: u32,
    column: u32,
    /// Brace depth inside each open `${ ... }` substitution.
    template_depth: Vec<u32>,
    diagnostics: Vec<Diagnostic>,
    finished: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer from source code.
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.char_indices();
        let current_char = chars.next().map(|(_, c)| c);
        Self {
            source,
            chars,
            current_pos: 0,
            current_char,
            line: 1,
            column: 1,
            template_depth: Vec::new(),
            diagnostics: Vec::new(),
            finished: false,
        }
    }

    /// Tokenizes the remaining source and returns all tokens, ending with `Eof`.
    pub fn tokenize(&mut self) -> Vec<Token> {
        self.by_ref().collect()
    }

    /// Diagnostics reported so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Gets the next token from the source.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        let mark = self.mark();

        let Some(ch) = self.current_char else {
            if !self.template_depth.is_empty() {
                self.template_depth.clear();
                self.report("unterminated template substitution", mark);
            }
            return self.make_token(TokenKind::Eof, mark, String::new());
        };

        match ch {
            // String literals
            '"' | '\'' => self.read_string_literal(ch),

            // Template literals
            '`' => {
                self.advance();
                self.read_template_chunk(mark, true)
            }
            '}' if self.template_depth.last() == Some(&0) => {
                self.advance();
                self.read_template_chunk(mark, false)
            }
            '{' => {
                if let Some(depth) = self.template_depth.last_mut() {
                    *depth += 1;
                }
                self.advance();
                self.make_token(TokenKind::LBrace, mark, "{".to_string())
            }
            '}' => {
                if let Some(depth) = self.template_depth.last_mut() {
                    *depth -= 1;
                }
                self.advance();
                self.make_token(TokenKind::RBrace, mark, "}".to_string())
            }

            // Numbers
            '0'..='9' => self.read_number(),
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.read_number(),

            // Identifiers and keywords, including Cyrillic letters
            _ if is_identifier_start(ch) => self.read_identifier_or_keyword(),

            _ => self.read_operator(mark),
        }
    }

    // Helper methods

    fn mark(&self) -> Mark {
        Mark {
            pos: self.current_pos,
            line: self.line,
            column: self.column,
        }
    }

    fn span_from(&self, mark: Mark) -> Span {
        Span::new(mark.pos, self.current_pos, mark.line, mark.column)
    }

    fn make_token(&self, kind: TokenKind, mark: Mark, value: String) -> Token {
        Token::new(kind, self.span_from(mark), value)
    }

    fn report(&mut self, message: impl Into<String>, mark: Mark) {
        let span = self.span_from(mark);
        self.diagnostics
            .push(Diagnostic::error(DiagnosticCode::LexError, message, span));
    }

    fn advance(&mut self) {
        match self.current_char {
            Some('\n') => {
                self.line += 1;
                self.column = 1;
            }
            Some(_) => self.column += 1,
            None => {}
        }
        if let Some((pos, ch)) = self.chars.next() {
            self.current_pos = pos;
            self.current_char = Some(ch);
        } else {
            self.current_pos = self.source.len();
            self.current_char = None;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next().map(|(_, c)| c)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.current_char {
                Some(ch) if ch.is_whitespace() => self.advance(),
                Some('/') if self.peek() == Some('/') => {
                    while let Some(ch) = self.current_char {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek() == Some('*') => {
                    let mark = self.mark();
                    self.advance();
                    self.advance();
                    let mut closed = false;
                    while let Some(ch) = self.current_char {
                        if ch == '*' && self.peek() == Some('/') {
                            self.advance();
                            self.advance();
                            closed = true;
                            break;
                        }
                        self.advance();
                    }
                    if !closed {
                        self.report("unterminated block comment", mark);
                    }
                }
                _ => break,
            }
        }
    }

    fn read_string_literal(&mut self, quote: char) -> Token {
        let mark = self.mark();
        self.advance(); // Skip opening quote

        let mut value = String::new();

        loop {
            match self.current_char {
                Some(ch) if ch == quote => {
                    self.advance();
                    return self.make_token(TokenKind::StringLiteral, mark, value);
                }
                Some('\\') => self.read_escape(&mut value),
                Some('\n') | None => {
                    // Best-effort token; the newline stays for the next token.
                    self.report("unterminated string literal", mark);
                    return self.make_token(TokenKind::StringLiteral, mark, value);
                }
                Some(ch) => {
                    value.push(ch);
                    self.advance();
                }
            }
        }
    }

    /// Reads one escape sequence starting at the backslash.
    fn read_escape(&mut self, value: &mut String) {
        let mark = self.mark();
        self.advance(); // backslash
        let Some(escaped) = self.current_char else {
            return;
        };
        match escaped {
            'u' => {
                self.advance();
                match self.read_unicode_escape() {
                    Some(ch) => value.push(ch),
                    None => self.report("invalid unicode escape sequence", mark),
                }
            }
            'x' => {
                self.advance();
                match self.read_hex_digits(2, 2) {
                    Some(code) => value.push(char::from_u32(code).unwrap_or('\u{FFFD}')),
                    None => self.report("invalid hexadecimal escape sequence", mark),
                }
            }
            '\n' => {
                // Line continuation
                self.advance();
            }
            _ => {
                let unescaped = match escaped {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    'b' => '\u{8}',
                    'f' => '\u{c}',
                    'v' => '\u{b}',
                    '0' => '\0',
                    other => other,
                };
                value.push(unescaped);
                self.advance();
            }
        }
    }

    fn read_unicode_escape(&mut self) -> Option<char> {
        let code = if self.current_char == Some('{') {
            self.advance();
            let code = self.read_hex_digits(1, 6)?;
            if self.current_char != Some('}') {
                return None;
            }
            self.advance();
            code
        } else {
            self.read_hex_digits(4, 4)?
        };
        char::from_u32(code)
    }

    fn read_hex_digits(&mut self, min: usize, max: usize) -> Option<u32> {
        let mut code = 0u32;
        let mut count = 0;
        while count < max {
            match self.current_char.and_then(|c| c.to_digit(16)) {
                Some(digit) => {
                    code = code * 16 + digit;
                    count += 1;
                    self.advance();
                }
                None => break,
            }
        }
        (count >= min).then_some(code)
    }

    /// Scans template text after an opening backtick (`is_start`) or after
    /// the `}` that closes a substitution.
    fn read_template_chunk(&mut self, mark: Mark, is_start: bool) -> Token {
        let mut value = String::new();

        loop {
            match self.current_char {
                Some('`') => {
                    self.advance();
                    return self.finish_template(mark, is_start, value);
                }
                Some('$') if self.peek() == Some('{') => {
                    self.advance();
                    self.advance();
                    let kind = if is_start {
                        self.template_depth.push(0);
                        TokenKind::TemplateHead
                    } else {
                        TokenKind::TemplateMiddle
                    };
                    return self.make_token(kind, mark, value);
                }
                Some('\\') => self.read_escape(&mut value),
                Some(ch) => {
                    value.push(ch);
                    self.advance();
                }
                None => {
                    self.report("unterminated template literal", mark);
                    return self.finish_template(mark, is_start, value);
                }
            }
        }
    }

    fn finish_template(&mut self, mark: Mark, is_start: bool, value: String) -> Token {
        let kind = if is_start {
            TokenKind::TemplateLiteral
        } else {
            self.template_depth.pop();
            TokenKind::TemplateTail
        };
        self.make_token(kind, mark, value)
    }

    fn read_number(&mut self) -> Token {
        let mark = self.mark();

        if self.current_char == Some('0') {
            let radix = match self.peek() {
                Some('x') | Some('X') => Some((16, "0x")),
                Some('o') | Some('O') => Some((8, "0o")),
                Some('b') | Some('B') => Some((2, "0b")),
                _ => None,
            };
            if let Some((radix, prefix)) = radix {
                self.advance();
                self.advance();
                let mut value = String::from(prefix);
                self.read_digits(&mut value, |c| c.is_digit(radix));
                if value.len() == prefix.len() {
                    self.report("missing digits in numeric literal", mark);
                    value.push('0');
                }
                return self.make_token(TokenKind::NumberLiteral, mark, value);
            }
        }

        let mut value = String::new();
        self.read_digits(&mut value, |c| c.is_ascii_digit());

        if self.current_char == Some('.') && self.peek().is_some_and(|c| c.is_ascii_digit()) {
            value.push('.');
            self.advance();
            self.read_digits(&mut value, |c| c.is_ascii_digit());
        }

        if matches!(self.current_char, Some('e') | Some('E')) {
            value.push('e');
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.current_char {
                value.push(sign);
                self.advance();
            }
            let before = value.len();
            self.read_digits(&mut value, |c| c.is_ascii_digit());
            if value.len() == before {
                self.report("missing exponent digits in numeric literal", mark);
                value.push('0');
            }
        }

        self.make_token(TokenKind::NumberLiteral, mark, value)
    }

    /// Reads digits accepted by `accept`, skipping `_` separators.
    fn read_digits(&mut self, value: &mut String, accept: impl Fn(char) -> bool) {
        while let Some(ch) = self.current_char {
            if accept(ch) {
                value.push(ch);
            } else if ch != '_' {
                break;
            }
            self.advance();
        }
    }

    fn read_identifier_or_keyword(&mut self) -> Token {
        let mark = self.mark();

        while let Some(ch) = self.current_char {
            if is_identifier_continue(ch) {
                self.advance();
            } else {
                break;
            }
        }

        let value = &self.source[mark.pos..self.current_pos];
        let kind = keyword_kind(value).unwrap_or(TokenKind::Identifier);
        self.make_token(kind, mark, value.to_string())
    }

    fn read_operator(&mut self, mark: Mark) -> Token {
        let rest = &self.source[self.current_pos..];
        let matched = OPERATORS
            .iter()
            .find(|(op, _)| rest.starts_with(op))
            .map(|&(op, kind)| {
                // `a?.5:b` is a conditional, not optional chaining
                if kind == TokenKind::QuestionDot
                    && rest[2..].starts_with(|c: char| c.is_ascii_digit())
                {
                    ("?", TokenKind::Question)
                } else {
                    (op, kind)
                }
            });

        match matched {
            Some((op, kind)) => {
                for _ in op.chars() {
                    self.advance();
                }
                self.make_token(kind, mark, op.to_string())
            }
            None => {
                let ch = self.current_char.unwrap_or('\0');
                self.advance();
                self.report(format!("unexpected character '{}'", ch), mark);
                self.make_token(TokenKind::Error, mark, ch.to_string())
            }
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            self.finished = true;
        }
        Some(token)
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_identifier_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source).tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("пусть конст функция вернуть если иначе класс интерфейс"),
            vec![
                TokenKind::Let,
                TokenKind::Const,
                TokenKind::Function,
                TokenKind::Return,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::Class,
                TokenKind::Interface,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_alternate_spellings() {
        assert_eq!(
            kinds("константа защищённый правда"),
            vec![
                TokenKind::Const,
                TokenKind::Protected,
                TokenKind::True,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_identifiers() {
        let tokens = Lexer::new("ёжик _счёт2 $x letVar").tokenize();
        assert_eq!(tokens.len(), 5);
        for token in &tokens[..4] {
            assert_eq!(token.kind, TokenKind::Identifier);
        }
        assert_eq!(tokens[0].value, "ёжик");
        assert_eq!(tokens[1].value, "_счёт2");
    }

    #[test]
    fn test_numbers() {
        let tokens = Lexer::new("42 3.14 0xFF 0b1010 1_000 2e10 .5").tokenize();
        let values: Vec<_> = tokens.iter().take(7).map(|t| t.value.as_str()).collect();
        assert_eq!(values, vec!["42", "3.14", "0xFF", "0b1010", "1000", "2e10", ".5"]);
        assert!(tokens[..7].iter().all(|t| t.kind == TokenKind::NumberLiteral));
    }

    #[test]
    fn test_strings() {
        let tokens = Lexer::new(r#""привет" 'мир' "a\nb" "Ж\x41""#).tokenize();
        assert_eq!(tokens[0].value, "привет");
        assert_eq!(tokens[1].value, "мир");
        assert_eq!(tokens[2].value, "a\nb");
        assert_eq!(tokens[3].value, "ЖA");
    }

    #[test]
    fn test_unterminated_string_recovers() {
        let mut lexer = Lexer::new("пусть а = \"abc\nпусть б = 1;");
        let tokens = lexer.tokenize();
        assert_eq!(lexer.diagnostics().len(), 1);
        assert_eq!(lexer.diagnostics()[0].code, DiagnosticCode::LexError);
        assert_eq!(tokens[3].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[3].value, "abc");
        assert_eq!(tokens[4].kind, TokenKind::Let);
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("=== !== => ?. ?? ... >>>= **"),
            vec![
                TokenKind::EqEqEq,
                TokenKind::BangEqEq,
                TokenKind::FatArrow,
                TokenKind::QuestionDot,
                TokenKind::QuestionQuestion,
                TokenKind::DotDotDot,
                TokenKind::GtGtGtEq,
                TokenKind::StarStar,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_question_dot_before_digit_is_conditional() {
        assert_eq!(
            kinds("a?.5:1"),
            vec![
                TokenKind::Identifier,
                TokenKind::Question,
                TokenKind::NumberLiteral,
                TokenKind::Colon,
                TokenKind::NumberLiteral,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_keep_positions() {
        let tokens = Lexer::new("// строка\n/* блок\n */ пусть").tokenize();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::Let);
        assert_eq!((tokens[0].span.line, tokens[0].span.column), (3, 5));
    }

    #[test]
    fn test_unterminated_comment() {
        let mut lexer = Lexer::new("пусть /* без конца");
        let tokens = lexer.tokenize();
        assert_eq!(tokens.len(), 2);
        assert_eq!(lexer.diagnostics().len(), 1);
    }

    #[test]
    fn test_empty_and_comment_only_input() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds("   // только комментарий"), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_unexpected_character() {
        let mut lexer = Lexer::new("а # б");
        let tokens = lexer.tokenize();
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert_eq!(lexer.diagnostics().len(), 1);
        assert_eq!(lexer.diagnostics()[0].span.column, 3);
    }

    #[test]
    fn test_template_with_substitutions() {
        let tokens = Lexer::new("`a${ {x: 1}.x }b${y}c`").tokenize();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::TemplateHead,
                TokenKind::LBrace,
                TokenKind::Identifier,
                TokenKind::Colon,
                TokenKind::NumberLiteral,
                TokenKind::RBrace,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::TemplateMiddle,
                TokenKind::Identifier,
                TokenKind::TemplateTail,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[0].value, "a");
        assert_eq!(tokens[8].value, "b");
        assert_eq!(tokens[10].value, "c");
    }

    #[test]
    fn test_iterator_stops_after_eof() {
        let mut lexer = Lexer::new("x");
        assert_eq!(lexer.next().map(|t| t.kind), Some(TokenKind::Identifier));
        assert_eq!(lexer.next().map(|t| t.kind), Some(TokenKind::Eof));
        assert!(lexer.next().is_none());
    }

    #[test]
    fn test_spans_track_lines_and_columns() {
        let tokens = Lexer::new("пусть\n  икс = 1").tokenize();
        assert_eq!((tokens[1].span.line, tokens[1].span.column), (2, 3));
        assert_eq!(tokens[1].span.len(), "икс".len());
    }
}
