pub mod token;
pub mod lexer;
pub mod keywords;

// Re-export all public types from modules
pub use token::{Token, TokenKind};
pub use lexer::Lexer;
pub use keywords::{keyword_kind, KEYWORDS};

use vyaz_ast::Diagnostic;

/// Tokenizes `source`; the last token is always [`TokenKind::Eof`].
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut lexer = Lexer::new(source);
    let tokens = lexer.tokenize();
    (tokens, lexer.into_diagnostics())
}
