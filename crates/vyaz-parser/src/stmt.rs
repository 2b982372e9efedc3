//! Statement parsing

use super::*;

impl Parser {
    pub(crate) fn parse_statement(&mut self) -> ParseResult<Node<Stmt>> {
        let start = self.current_token().span;

        let stmt = match self.current_token().kind {
            TokenKind::LBrace => Stmt::Block(self.parse_block_statement()?.value),
            TokenKind::If => self.parse_if_statement()?,
            TokenKind::For => self.parse_for_statement()?,
            TokenKind::While => self.parse_while_statement()?,
            TokenKind::Do => self.parse_do_while_statement()?,
            TokenKind::Switch => self.parse_switch_statement()?,
            TokenKind::Return => self.parse_return_statement()?,
            TokenKind::Break => {
                self.advance();
                Stmt::Break(self.parse_jump_label()?)
            }
            TokenKind::Continue => {
                self.advance();
                Stmt::Continue(self.parse_jump_label()?)
            }
            TokenKind::Throw => self.parse_throw_statement()?,
            TokenKind::Try => self.parse_try_statement()?,
            TokenKind::Semicolon => {
                self.advance();
                Stmt::Empty
            }
            TokenKind::Const | TokenKind::Let | TokenKind::Var => {
                let var_decl = self.parse_var_declaration()?;
                Stmt::VarDecl(var_decl)
            }
            TokenKind::Function | TokenKind::Class | TokenKind::Abstract | TokenKind::Interface => {
                Stmt::Decl(Box::new(self.parse_declaration()?.value))
            }
            TokenKind::Type if self.peek_kind(1) == Some(&TokenKind::Identifier) => {
                Stmt::Decl(Box::new(self.parse_declaration()?.value))
            }
            TokenKind::Async if self.peek_kind(1) == Some(&TokenKind::Function) => {
                Stmt::Decl(Box::new(self.parse_declaration()?.value))
            }
            _ => {
                let expr = self.parse_expression()?;
                self.expect_statement_end()?;
                Stmt::Expr(expr)
            }
        };

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(stmt, span))
    }

    /// Parses a statement inside a block, turning a grammar error into a
    /// recorded diagnostic and a [`Stmt::Error`] placeholder.
    pub(crate) fn parse_statement_recovering(&mut self) -> Node<Stmt> {
        let start = self.current_token().span;
        match self.parse_statement() {
            Ok(stmt) => stmt,
            Err(err) => {
                self.record(err);
                self.synchronize(true);
                let span = start.merge(&self.previous_token().span);
                Node::new(Stmt::Error, span)
            }
        }
    }

    pub(crate) fn parse_block_statement(&mut self) -> ParseResult<Node<BlockStmt>> {
        let start = self.current_token().span;
        self.consume(TokenKind::LBrace)?;

        let mut stmts = Vec::new();

        loop {
            self.skip_lexer_errors();
            if self.check(&TokenKind::RBrace) || self.is_at_end() {
                break;
            }
            stmts.push(self.parse_statement_recovering());
        }

        self.consume(TokenKind::RBrace)?;
        let span = start.merge(&self.previous_token().span);

        Ok(Node::new(BlockStmt { stmts }, span))
    }

    pub(crate) fn parse_var_declaration(&mut self) -> ParseResult<VarDecl> {
        let decl = self.parse_var_declaration_without_semicolon(true)?;
        self.expect_statement_end()?;
        Ok(decl)
    }

    /// A statement ends at `;`, before `}` or at end of input.
    pub(crate) fn expect_statement_end(&mut self) -> ParseResult<()> {
        if self.check(&TokenKind::Semicolon) {
            self.advance();
            Ok(())
        } else if self.is_semicolon_ahead() || self.current_token().span.line > self.previous_token().span.line {
            Ok(())
        } else {
            Err(self.unexpected("';'"))
        }
    }

    fn parse_if_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::If)?;
        let condition = self.parse_paren_condition()?;

        let then_stmt = Box::new(self.parse_statement()?);

        let else_stmt = if self.check(&TokenKind::Else) {
            self.advance();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_stmt,
            else_stmt,
        })
    }

    fn parse_paren_condition(&mut self) -> ParseResult<Node<Expr>> {
        self.consume(TokenKind::LParen)?;
        let condition = self.parse_expression()?;
        self.consume(TokenKind::RParen)?;
        Ok(condition)
    }

    /// `для (init; cond; update)`, `для (пусть k в obj)` or `для (пусть x из xs)`.
    fn parse_for_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::For)?;
        self.consume(TokenKind::LParen)?;

        let init = if self.check(&TokenKind::Semicolon) {
            None
        } else if matches!(
            self.current_token().kind,
            TokenKind::Const | TokenKind::Let | TokenKind::Var
        ) {
            let var_decl = self.parse_var_declaration_without_semicolon(false)?;
            let single = var_decl.declarations.len() == 1 && var_decl.declarations[0].init.is_none();
            if single && (self.check(&TokenKind::In) || self.check(&TokenKind::From)) {
                return self.parse_for_each(ForInLeft::VarDecl(var_decl));
            }
            Some(ForInit::VarDecl(var_decl))
        } else {
            let checkpoint = self.checkpoint();
            if let Ok(pattern) = self.parse_binding_target() {
                if self.check(&TokenKind::In) || self.check(&TokenKind::From) {
                    return self.parse_for_each(ForInLeft::Pattern(pattern));
                }
            }
            self.reset(checkpoint);
            Some(ForInit::Expr(self.parse_expression_no_in()?))
        };

        self.consume(TokenKind::Semicolon)?;

        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };

        self.consume(TokenKind::Semicolon)?;

        let update = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };

        self.consume(TokenKind::RParen)?;
        let body = Box::new(self.parse_statement()?);

        Ok(Stmt::For {
            init,
            condition,
            update,
            body,
        })
    }

    fn parse_for_each(&mut self, left: ForInLeft) -> ParseResult<Stmt> {
        let is_of = self.advance().kind == TokenKind::From;
        let right = self.parse_expression()?;
        self.consume(TokenKind::RParen)?;
        let body = Box::new(self.parse_statement()?);

        Ok(if is_of {
            Stmt::ForOf { left, right, body }
        } else {
            Stmt::ForIn { left, right, body }
        })
    }

    fn parse_while_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::While)?;
        let condition = self.parse_paren_condition()?;
        let body = Box::new(self.parse_statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn parse_do_while_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::Do)?;
        let body = Box::new(self.parse_statement()?);
        self.consume(TokenKind::While)?;
        let condition = self.parse_paren_condition()?;
        self.consume_semicolon();

        Ok(Stmt::DoWhile { body, condition })
    }

    fn parse_switch_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::Switch)?;
        let discriminant = self.parse_paren_condition()?;

        self.consume(TokenKind::LBrace)?;
        let mut cases = Vec::new();

        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            let test = match self.current_token().kind {
                TokenKind::Case => {
                    self.advance();
                    Some(self.parse_expression()?)
                }
                TokenKind::Default => {
                    self.advance();
                    None
                }
                _ => return Err(self.unexpected("случай or поумолчанию")),
            };
            self.consume(TokenKind::Colon)?;

            let mut consequent = Vec::new();
            while !self.check(&TokenKind::Case)
                && !self.check(&TokenKind::Default)
                && !self.check(&TokenKind::RBrace)
                && !self.is_at_end()
            {
                consequent.push(self.parse_statement_recovering());
            }

            cases.push(SwitchCase { test, consequent });
        }

        self.consume(TokenKind::RBrace)?;

        Ok(Stmt::Switch {
            discriminant,
            cases,
        })
    }

    fn parse_return_statement(&mut self) -> ParseResult<Stmt> {
        let keyword_line = self.consume(TokenKind::Return)?.span.line;

        let expr = if self.is_semicolon_ahead() || self.current_token().span.line > keyword_line {
            None
        } else {
            Some(self.parse_expression()?)
        };

        self.expect_statement_end()?;
        Ok(Stmt::Return(expr))
    }

    fn parse_jump_label(&mut self) -> ParseResult<Option<Node<Ident>>> {
        let label = if self.check(&TokenKind::Identifier)
            && self.current_token().span.line == self.previous_token().span.line
        {
            Some(self.parse_identifier()?)
        } else {
            None
        };

        self.expect_statement_end()?;
        Ok(label)
    }

    fn parse_throw_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::Throw)?;
        let expr = self.parse_expression()?;
        self.expect_statement_end()?;
        Ok(Stmt::Throw(expr))
    }

    fn parse_try_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::Try)?;
        let block = self.parse_block_statement()?;

        let catch = if self.check(&TokenKind::Catch) {
            self.advance();

            let param = if self.check(&TokenKind::LParen) {
                self.advance();
                let param = self.parse_pattern()?;
                self.consume(TokenKind::RParen)?;
                Some(param)
            } else {
                None
            };

            let body = self.parse_block_statement()?;

            Some(CatchClause { param, body })
        } else {
            None
        };

        let finally = if self.check(&TokenKind::Finally) {
            self.advance();
            Some(self.parse_block_statement()?)
        } else {
            None
        };

        if catch.is_none() && finally.is_none() {
            return Err(self.unexpected("перехват or наконец"));
        }

        Ok(Stmt::Try {
            block,
            catch,
            finally,
        })
    }
}
