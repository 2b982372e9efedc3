//! Core Parser struct and main parsing methods

use super::*;

/// Recursive descent parser for Vyaz.
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) current: usize,
    pub(crate) diagnostics: Vec<Diagnostic>,
    /// Set while parsing a `для` head, where `в` ends the initializer.
    pub(crate) no_in: bool,
    /// Original tokens replaced while splitting `>>` in type argument lists.
    pub(crate) split_log: Vec<(usize, Token)>,
}

/// Saved position for speculative parsing.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Checkpoint {
    current: usize,
    diagnostics: usize,
    splits: usize,
}

impl Parser {
    /// Creates a new parser from a token stream.
    ///
    /// Lexer error tokens stay in the stream: the lexer already reported
    /// them, so the parser skips them between statements and reads them as
    /// [`Expr::Error`] inside expressions without reporting again.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let span = tokens
                .last()
                .map(|t| Span::new(t.span.end, t.span.end, t.span.line, t.span.column))
                .unwrap_or_else(|| Span::new(0, 0, 1, 1));
            tokens.push(Token::new(TokenKind::Eof, span, String::new()));
        }
        Self {
            tokens,
            current: 0,
            diagnostics: Vec::new(),
            no_in: false,
            split_log: Vec::new(),
        }
    }

    /// Parses a complete program. Always yields a tree; malformed statements
    /// become [`Stmt::Error`] placeholders with one diagnostic each.
    #[tracing::instrument(level = "debug", skip_all, fields(tokens = self.tokens.len()))]
    pub fn parse_program(&mut self) -> (Program, Vec<Diagnostic>) {
        let start_span = self.current_token().span;
        let mut items = Vec::new();

        loop {
            self.skip_lexer_errors();
            if self.is_at_end() {
                break;
            }
            let start = self.current_token().span;
            match self.parse_module_item() {
                Ok(item) => items.push(item),
                Err(err) => {
                    self.record(err);
                    self.synchronize(false);
                    let span = start.merge(&self.previous_token().span);
                    items.push(Node::new(
                        ModuleItem::Stmt(Node::new(Stmt::Error, span)),
                        span,
                    ));
                }
            }
        }

        let end_span = items.last().map(|item| item.span).unwrap_or(start_span);
        let program = Program {
            items,
            span: start_span.merge(&end_span),
        };
        tracing::debug!(diagnostics = self.diagnostics.len(), "parsed program");
        (program, std::mem::take(&mut self.diagnostics))
    }

    /// Records a parse error, collapsing repeats at the same position
    /// (several open constructs failing at end of input).
    /// Keeps a parse error unless one was already recorded at the same place
    /// or it points at a character the lexer has reported.
    pub(crate) fn record(&mut self, err: ParseError) {
        let duplicate = self
            .diagnostics
            .last()
            .is_some_and(|last| last.span.start == err.span.start);
        let lexed_error = self
            .tokens
            .iter()
            .any(|t| t.kind == TokenKind::Error && t.span.start == err.span.start);
        if !duplicate && !lexed_error {
            self.diagnostics.push(err.into());
        }
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            current: self.current,
            diagnostics: self.diagnostics.len(),
            splits: self.split_log.len(),
        }
    }

    pub(crate) fn reset(&mut self, checkpoint: Checkpoint) {
        self.current = checkpoint.current;
        self.diagnostics.truncate(checkpoint.diagnostics);
        while self.split_log.len() > checkpoint.splits {
            if let Some((index, token)) = self.split_log.pop() {
                self.tokens[index] = token;
            }
        }
    }

    // =========================================================================
    // Module Items
    // =========================================================================

    pub(crate) fn parse_module_item(&mut self) -> ParseResult<Node<ModuleItem>> {
        let start = self.current_token().span;

        let item = match self.current_token().kind {
            TokenKind::Import => ModuleItem::Import(self.parse_import_decl()?),
            TokenKind::Export => ModuleItem::Export(self.parse_export_decl()?),
            TokenKind::Interface | TokenKind::Type | TokenKind::Class | TokenKind::Abstract => {
                ModuleItem::Decl(self.parse_declaration()?)
            }
            TokenKind::Function => ModuleItem::Decl(self.parse_declaration()?),
            TokenKind::Async if self.peek_kind(1) == Some(&TokenKind::Function) => {
                ModuleItem::Decl(self.parse_declaration()?)
            }
            _ => ModuleItem::Stmt(self.parse_statement()?),
        };

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(item, span))
    }

    // =========================================================================
    // Import/Export
    // =========================================================================

    fn parse_module_source(&mut self) -> ParseResult<(String, Span)> {
        let token = self.consume(TokenKind::StringLiteral)?;
        Ok((token.value.clone(), token.span))
    }

    pub(crate) fn parse_import_decl(&mut self) -> ParseResult<ImportDecl> {
        self.consume(TokenKind::Import)?;

        // импорт тип { ... }
        let type_only = if self.check(&TokenKind::Type)
            && matches!(
                self.peek_kind(1),
                Some(TokenKind::LBrace) | Some(TokenKind::Identifier) | Some(TokenKind::Star)
            ) {
            self.advance();
            true
        } else {
            false
        };

        let mut specifiers = Vec::new();

        // импорт "module"
        if self.check(&TokenKind::StringLiteral) {
            let (source, source_span) = self.parse_module_source()?;
            self.consume_semicolon();
            return Ok(ImportDecl {
                specifiers,
                source,
                source_span,
                type_only,
            });
        }

        // импорт name из "module"
        if self.check(&TokenKind::Identifier) {
            let name = self.parse_identifier()?;
            specifiers.push(ImportSpecifier::Default(name));

            if self.check(&TokenKind::Comma) {
                self.advance();
            }
        }

        // импорт * как name из "module"
        if self.check(&TokenKind::Star) {
            self.advance();
            self.consume(TokenKind::As)?;
            let name = self.parse_identifier()?;
            specifiers.push(ImportSpecifier::Namespace(name));
        }
        // импорт { a, b как c } из "module"
        else if self.check(&TokenKind::LBrace) {
            self.advance();

            while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
                let spec_type_only = if self.check(&TokenKind::Type)
                    && self.peek_kind(1) == Some(&TokenKind::Identifier)
                {
                    self.advance();
                    true
                } else {
                    false
                };

                let imported = self.parse_property_ident()?;
                let local = if self.check(&TokenKind::As) {
                    self.advance();
                    Some(self.parse_identifier()?)
                } else {
                    None
                };

                specifiers.push(ImportSpecifier::Named {
                    imported,
                    local,
                    type_only: spec_type_only,
                });

                if !self.check(&TokenKind::RBrace) {
                    self.consume(TokenKind::Comma)?;
                }
            }

            self.consume(TokenKind::RBrace)?;
        } else if specifiers.is_empty() {
            return Err(self.unexpected("import specifiers"));
        }

        self.consume(TokenKind::From)?;
        let (source, source_span) = self.parse_module_source()?;
        self.consume_semicolon();

        Ok(ImportDecl {
            specifiers,
            source,
            source_span,
            type_only,
        })
    }

    pub(crate) fn parse_export_decl(&mut self) -> ParseResult<ExportDecl> {
        self.consume(TokenKind::Export)?;

        // экспорт тип { ... }
        let type_only = if self.check(&TokenKind::Type) && self.peek_kind(1) == Some(&TokenKind::LBrace) {
            self.advance();
            true
        } else {
            false
        };

        // экспорт поумолчанию
        if self.check(&TokenKind::Default) {
            self.advance();

            let named_function = match self.current_token().kind {
                TokenKind::Function => self.peek_kind(1) == Some(&TokenKind::Identifier),
                TokenKind::Async => self.peek_kind(2) == Some(&TokenKind::Identifier),
                _ => false,
            };
            if named_function || self.check(&TokenKind::Class) || self.check(&TokenKind::Abstract) {
                let decl = self.parse_declaration()?;
                return Ok(ExportDecl::DefaultDecl(Box::new(decl)));
            }
            let expr = self.parse_expression()?;
            self.consume_semicolon();
            return Ok(ExportDecl::Default(expr));
        }

        // экспорт * [как name] из "module"
        if self.check(&TokenKind::Star) {
            self.advance();

            let as_name = if self.check(&TokenKind::As) {
                self.advance();
                Some(self.parse_identifier()?)
            } else {
                None
            };

            self.consume(TokenKind::From)?;
            let (source, source_span) = self.parse_module_source()?;
            self.consume_semicolon();

            return Ok(ExportDecl::All {
                source,
                source_span,
                as_name,
            });
        }

        // экспорт { ... }
        if self.check(&TokenKind::LBrace) {
            self.advance();
            let mut specifiers = Vec::new();

            while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
                let spec_type_only = if self.check(&TokenKind::Type)
                    && self.peek_kind(1) == Some(&TokenKind::Identifier)
                {
                    self.advance();
                    true
                } else {
                    false
                };

                let local = self.parse_identifier()?;
                let exported = if self.check(&TokenKind::As) {
                    self.advance();
                    Some(self.parse_property_ident()?)
                } else {
                    None
                };

                specifiers.push(ExportSpecifier {
                    local,
                    exported,
                    type_only: spec_type_only,
                });

                if !self.check(&TokenKind::RBrace) {
                    self.consume(TokenKind::Comma)?;
                }
            }

            self.consume(TokenKind::RBrace)?;

            let source = if self.check(&TokenKind::From) {
                self.advance();
                Some(self.parse_module_source()?)
            } else {
                None
            };

            self.consume_semicolon();

            return Ok(ExportDecl::Named {
                specifiers,
                source,
                type_only,
            });
        }

        // экспорт declaration
        let decl = self.parse_declaration()?;
        Ok(ExportDecl::Decl(Box::new(decl)))
    }
}
