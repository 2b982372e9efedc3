//! Helper methods and utilities

use super::*;

impl Parser {
    pub(crate) fn parse_identifier(&mut self) -> ParseResult<Node<Ident>> {
        let token = self.consume(TokenKind::Identifier)?;
        Ok(Node::new(Ident::new(token.value.clone()), token.span))
    }

    /// Identifier in a position where reserved words are allowed too
    /// (member names, object keys, import/export aliases).
    pub(crate) fn parse_property_ident(&mut self) -> ParseResult<Node<Ident>> {
        let token = self.current_token();
        if token.kind == TokenKind::Identifier || token.kind.is_keyword() {
            let node = Node::new(Ident::new(token.value.clone()), token.span);
            self.advance();
            Ok(node)
        } else {
            Err(self.unexpected("property name"))
        }
    }

    pub(crate) fn parse_property_name(&mut self) -> ParseResult<PropertyName> {
        match self.current_token().kind {
            TokenKind::StringLiteral => {
                let value = self.advance().value.clone();
                Ok(PropertyName::String(value))
            }
            TokenKind::NumberLiteral => {
                let token = self.advance().clone();
                let num = parse_number(&token.value)
                    .ok_or_else(|| ParseError::new(format!("invalid number '{}'", token.value), token.span))?;
                Ok(PropertyName::Number(num))
            }
            TokenKind::LBracket => {
                self.advance();
                let expr = Box::new(self.parse_expression()?);
                self.consume(TokenKind::RBracket)?;
                Ok(PropertyName::Computed(expr))
            }
            _ => Ok(PropertyName::Ident(self.parse_property_ident()?)),
        }
    }

    /// Parses parameters up to (not including) the closing `)`.
    pub(crate) fn parse_function_params(&mut self) -> ParseResult<Vec<Param>> {
        let mut params = Vec::new();

        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            params.push(self.parse_function_param()?);
            if !self.check(&TokenKind::RParen) {
                self.consume(TokenKind::Comma)?;
            }
        }

        Ok(params)
    }

    pub(crate) fn parse_function_param(&mut self) -> ParseResult<Param> {
        let property = self.parse_param_property();

        let is_rest = if self.check(&TokenKind::DotDotDot) {
            self.advance();
            true
        } else {
            false
        };

        let pattern = self.parse_binding_target()?;

        let optional = if self.check(&TokenKind::Question) {
            self.advance();
            true
        } else {
            false
        };

        let type_annotation = if self.check(&TokenKind::Colon) {
            self.advance();
            Some(Box::new(self.parse_type()?))
        } else {
            None
        };

        let default = if self.check(&TokenKind::Eq) {
            self.advance();
            Some(self.parse_assignment_expr()?)
        } else {
            None
        };

        Ok(Param {
            pattern,
            type_annotation,
            default,
            optional,
            is_rest,
            property,
        })
    }

    /// Constructor parameter modifiers: `приватный x`, `публичный толькочтение y`.
    fn parse_param_property(&mut self) -> Option<ParamProperty> {
        let mut access = None;
        let mut readonly = false;
        loop {
            let is_modifier = matches!(
                self.current_token().kind,
                TokenKind::Public | TokenKind::Private | TokenKind::Protected | TokenKind::Readonly
            );
            // A modifier keyword followed by `:`/`,`/`)` is not a modifier here.
            let next_starts_binding = matches!(
                self.peek_kind(1),
                Some(TokenKind::Identifier)
                    | Some(TokenKind::Readonly)
                    | Some(TokenKind::LBrace)
                    | Some(TokenKind::LBracket)
            );
            if !is_modifier || !next_starts_binding {
                break;
            }
            match self.advance().kind {
                TokenKind::Public => access = Some(AccessModifier::Public),
                TokenKind::Private => access = Some(AccessModifier::Private),
                TokenKind::Protected => access = Some(AccessModifier::Protected),
                _ => readonly = true,
            }
        }
        if access.is_none() && !readonly {
            return None;
        }
        Some(ParamProperty {
            access: access.unwrap_or_default(),
            readonly,
        })
    }

    pub(crate) fn parse_binary_operator(&mut self) -> ParseResult<BinaryOp> {
        let op = match self.current_token().kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Mod,
            TokenKind::StarStar => BinaryOp::Pow,
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::BangEq => BinaryOp::NotEq,
            TokenKind::EqEqEq => BinaryOp::StrictEq,
            TokenKind::BangEqEq => BinaryOp::StrictNotEq,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::LtEq => BinaryOp::LtEq,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::GtEq => BinaryOp::GtEq,
            TokenKind::AmpAmp => BinaryOp::And,
            TokenKind::PipePipe => BinaryOp::Or,
            TokenKind::QuestionQuestion => BinaryOp::NullishCoalesce,
            TokenKind::Amp => BinaryOp::BitAnd,
            TokenKind::Pipe => BinaryOp::BitOr,
            TokenKind::Caret => BinaryOp::BitXor,
            TokenKind::LtLt => BinaryOp::LeftShift,
            TokenKind::GtGt => BinaryOp::RightShift,
            TokenKind::GtGtGt => BinaryOp::UnsignedRightShift,
            TokenKind::In => BinaryOp::In,
            TokenKind::Instanceof => BinaryOp::InstanceOf,
            _ => return Err(self.unexpected("binary operator")),
        };
        self.advance();
        Ok(op)
    }

    pub(crate) fn parse_assignment_operator(&mut self) -> ParseResult<AssignmentOp> {
        let op = match self.current_token().kind {
            TokenKind::Eq => AssignmentOp::Assign,
            TokenKind::PlusEq => AssignmentOp::AddAssign,
            TokenKind::MinusEq => AssignmentOp::SubAssign,
            TokenKind::StarEq => AssignmentOp::MulAssign,
            TokenKind::SlashEq => AssignmentOp::DivAssign,
            TokenKind::PercentEq => AssignmentOp::ModAssign,
            TokenKind::StarStarEq => AssignmentOp::PowAssign,
            TokenKind::AmpAmpEq => AssignmentOp::AndAssign,
            TokenKind::PipePipeEq => AssignmentOp::OrAssign,
            TokenKind::QuestionQuestionEq => AssignmentOp::NullishAssign,
            TokenKind::LtLtEq => AssignmentOp::LeftShiftAssign,
            TokenKind::GtGtEq => AssignmentOp::RightShiftAssign,
            TokenKind::GtGtGtEq => AssignmentOp::UnsignedRightShiftAssign,
            TokenKind::AmpEq => AssignmentOp::BitAndAssign,
            TokenKind::PipeEq => AssignmentOp::BitOrAssign,
            TokenKind::CaretEq => AssignmentOp::BitXorAssign,
            _ => return Err(self.unexpected("assignment operator")),
        };
        self.advance();
        Ok(op)
    }

    /// `пусть a = 1, b` without the trailing `;`. With `allow_in == false`
    /// initializers stop before `в`, so `для (пусть k в obj)` stays parseable.
    pub(crate) fn parse_var_declaration_without_semicolon(
        &mut self,
        allow_in: bool,
    ) -> ParseResult<VarDecl> {
        let kind = match self.current_token().kind {
            TokenKind::Const => VarDeclKind::Const,
            TokenKind::Let => VarDeclKind::Let,
            TokenKind::Var => VarDeclKind::Var,
            _ => return Err(self.unexpected("пусть, конст or перем")),
        };
        self.advance();

        let mut declarations = Vec::new();

        loop {
            let pattern = self.parse_pattern()?;
            let init = if self.check(&TokenKind::Eq) {
                self.advance();
                Some(if allow_in {
                    self.parse_assignment_expr()?
                } else {
                    self.parse_expression_no_in()?
                })
            } else {
                None
            };

            declarations.push(VarDeclarator { pattern, init });

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        Ok(VarDecl { kind, declarations })
    }

    pub(crate) fn expr_to_param(&self, expr: Node<Expr>) -> ParseResult<Param> {
        let pattern = match expr.value {
            Expr::Ident(ident) => Pattern::Ident {
                name: Node::new(ident, expr.span),
                type_annotation: None,
            },
            _ => return Err(ParseError::new("invalid arrow function parameter", expr.span)),
        };

        Ok(Param {
            pattern: Node::new(pattern, expr.span),
            type_annotation: None,
            default: None,
            optional: false,
            is_rest: false,
            property: None,
        })
    }

    // =========================================================================
    // Operator Precedence
    // =========================================================================

    pub(crate) fn get_infix_precedence(&self) -> u8 {
        match self.current_token().kind {
            TokenKind::Eq
            | TokenKind::PlusEq
            | TokenKind::MinusEq
            | TokenKind::StarEq
            | TokenKind::SlashEq
            | TokenKind::PercentEq
            | TokenKind::StarStarEq
            | TokenKind::AmpAmpEq
            | TokenKind::PipePipeEq
            | TokenKind::QuestionQuestionEq
            | TokenKind::LtLtEq
            | TokenKind::GtGtEq
            | TokenKind::GtGtGtEq
            | TokenKind::AmpEq
            | TokenKind::PipeEq
            | TokenKind::CaretEq => 1,
            TokenKind::Question => 2,
            TokenKind::QuestionQuestion => 3,
            TokenKind::PipePipe => 4,
            TokenKind::AmpAmp => 5,
            TokenKind::Pipe => 6,
            TokenKind::Caret => 7,
            TokenKind::Amp => 8,
            TokenKind::EqEq | TokenKind::BangEq | TokenKind::EqEqEq | TokenKind::BangEqEq => 9,
            TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::LtEq
            | TokenKind::GtEq
            | TokenKind::Instanceof => 10,
            TokenKind::In if !self.no_in => 10,
            TokenKind::LtLt | TokenKind::GtGt | TokenKind::GtGtGt => 11,
            TokenKind::Plus | TokenKind::Minus => 12,
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent | TokenKind::Error => 13,
            TokenKind::StarStar => 14,
            TokenKind::As => 15,
            TokenKind::PlusPlus | TokenKind::MinusMinus | TokenKind::Bang => 16,
            TokenKind::Dot | TokenKind::QuestionDot | TokenKind::LBracket | TokenKind::LParen => 17,
            _ => 0,
        }
    }

    // =========================================================================
    // Utility Methods (Token Manipulation)
    // =========================================================================

    pub(crate) fn current_token(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    pub(crate) fn previous_token(&self) -> &Token {
        &self.tokens[(self.current.saturating_sub(1)).min(self.tokens.len() - 1)]
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous_token()
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        !self.is_at_end() && &self.current_token().kind == kind
    }

    pub(crate) fn peek_kind(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.current + offset).map(|t| &t.kind)
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len() || self.current_token().kind == TokenKind::Eof
    }

    pub(crate) fn consume(&mut self, kind: TokenKind) -> ParseResult<&Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&kind.to_string()))
        }
    }

    /// Steps over characters the lexer could not read.
    pub(crate) fn skip_lexer_errors(&mut self) {
        while self.check(&TokenKind::Error) {
            self.advance();
        }
    }

    pub(crate) fn consume_semicolon(&mut self) {
        if self.check(&TokenKind::Semicolon) {
            self.advance();
        }
    }

    pub(crate) fn is_semicolon_ahead(&self) -> bool {
        self.check(&TokenKind::Semicolon) || self.check(&TokenKind::RBrace) || self.is_at_end()
    }

    /// Current token is the contextual word `word` (an identifier, not a keyword).
    pub(crate) fn check_contextual(&self, word: &str) -> bool {
        let token = self.current_token();
        token.kind == TokenKind::Identifier && token.value == word
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.current_token().span)
    }

    /// "expected X, found Y" at the current token.
    pub(crate) fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.current_token();
        let found = match token.kind {
            TokenKind::Identifier => format!("identifier '{}'", token.value),
            kind => kind.to_string(),
        };
        self.error(format!("expected {}, found {}", expected, found))
    }

    /// Skips to the next statement boundary after an error.
    ///
    /// Stops after a `;`, before a `}` or before a token that starts a
    /// statement. Inside a block a `}` at the error position is left for the
    /// block to consume.
    pub(crate) fn synchronize(&mut self, in_block: bool) {
        if !(in_block && self.check(&TokenKind::RBrace)) {
            self.advance();
        }

        while !self.is_at_end() {
            if self.previous_token().kind == TokenKind::Semicolon {
                return;
            }

            match self.current_token().kind {
                TokenKind::RBrace if in_block => return,
                TokenKind::Class
                | TokenKind::Function
                | TokenKind::Let
                | TokenKind::Const
                | TokenKind::Var
                | TokenKind::Interface
                | TokenKind::Type
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Do
                | TokenKind::Return
                | TokenKind::Switch
                | TokenKind::Try
                | TokenKind::Throw
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Async
                | TokenKind::Abstract
                | TokenKind::Import
                | TokenKind::Export => return,
                _ => {}
            }

            self.advance();
        }
    }
}

/// Parses a numeric lexeme, including `0x`/`0o`/`0b` prefixes.
pub(crate) fn parse_number(text: &str) -> Option<f64> {
    let lower = text.to_ascii_lowercase();
    let radix = match lower.get(..2) {
        Some("0x") => 16,
        Some("0o") => 8,
        Some("0b") => 2,
        _ => return text.parse::<f64>().ok(),
    };
    u64::from_str_radix(&lower[2..], radix).ok().map(|n| n as f64)
}
