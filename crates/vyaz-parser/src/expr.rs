//! Expression parsing

use super::*;

impl Parser {
    pub(crate) fn parse_expression(&mut self) -> ParseResult<Node<Expr>> {
        self.parse_expression_with_precedence(0)
    }

    /// One comma-free expression (call argument, array element, initializer).
    pub(crate) fn parse_assignment_expr(&mut self) -> ParseResult<Node<Expr>> {
        self.parse_expression_with_precedence(1)
    }

    /// Expression in a `для` head where `в` terminates instead of acting as an operator.
    pub(crate) fn parse_expression_no_in(&mut self) -> ParseResult<Node<Expr>> {
        let saved = std::mem::replace(&mut self.no_in, true);
        let result = self.parse_assignment_expr();
        self.no_in = saved;
        result
    }

    pub(crate) fn parse_expression_with_precedence(&mut self, min_precedence: u8) -> ParseResult<Node<Expr>> {
        let mut left = self.parse_prefix_expression()?;

        loop {
            let precedence = self.get_infix_precedence();

            if precedence == 0 || precedence < min_precedence {
                break;
            }

            left = self.parse_infix_expression(left)?;
        }

        Ok(left)
    }

    fn parse_prefix_expression(&mut self) -> ParseResult<Node<Expr>> {
        let start = self.current_token().span;

        let op = match self.current_token().kind {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::Typeof => UnaryOp::TypeOf,
            TokenKind::Void => UnaryOp::Void,
            TokenKind::Delete => UnaryOp::Delete,
            TokenKind::PlusPlus => UnaryOp::PreIncrement,
            TokenKind::MinusMinus => UnaryOp::PreDecrement,
            TokenKind::Await => {
                self.advance();
                let expr = Box::new(self.parse_expression_with_precedence(14)?);
                let span = start.merge(&self.previous_token().span);
                return Ok(Node::new(Expr::Await(expr), span));
            }
            TokenKind::DotDotDot => {
                self.advance();
                let expr = Box::new(self.parse_assignment_expr()?);
                let span = start.merge(&self.previous_token().span);
                return Ok(Node::new(Expr::Spread(expr), span));
            }
            _ => return self.parse_primary_expression(),
        };

        self.advance();
        let expr = Box::new(self.parse_expression_with_precedence(14)?);
        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(Expr::Unary { op, expr }, span))
    }

    fn parse_infix_expression(&mut self, left: Node<Expr>) -> ParseResult<Node<Expr>> {
        let start = left.span;

        let expr = match self.current_token().kind {
            // Assignment operators
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
            | TokenKind::CaretEq => {
                if !is_assignment_target(&left.value) {
                    return Err(ParseError::new("invalid assignment target", left.span));
                }
                let op = self.parse_assignment_operator()?;
                let right = Box::new(self.parse_expression_with_precedence(1)?);
                Expr::Assignment {
                    target: Box::new(left),
                    op,
                    value: right,
                }
            }

            // A stray character between operands; the lexer reported it.
            TokenKind::Error => {
                self.advance();
                let checkpoint = self.checkpoint();
                if self.parse_expression_with_precedence(14).is_err() {
                    self.reset(checkpoint);
                }
                Expr::Error
            }

            // Ternary operator
            TokenKind::Question => {
                self.advance();
                let saved = std::mem::replace(&mut self.no_in, false);
                let then_expr = self.parse_assignment_expr();
                self.no_in = saved;
                let then_expr = Box::new(then_expr?);
                self.consume(TokenKind::Colon)?;
                let else_expr = Box::new(self.parse_expression_with_precedence(2)?);
                Expr::Ternary {
                    condition: Box::new(left),
                    then_expr,
                    else_expr,
                }
            }

            // Explicit type arguments: f<число>(x)
            TokenKind::Lt if matches!(left.value, Expr::Ident(_) | Expr::Member { .. }) => {
                let checkpoint = self.checkpoint();
                match self.parse_type_arguments() {
                    Ok(type_args) if self.check(&TokenKind::LParen) => {
                        let args = self.parse_call_arguments()?;
                        Expr::Call {
                            callee: Box::new(left),
                            type_args,
                            args,
                        }
                    }
                    _ => {
                        self.reset(checkpoint);
                        self.parse_binary_rest(left)?
                    }
                }
            }

            // Binary operators
            TokenKind::PipePipe
            | TokenKind::AmpAmp
            | TokenKind::Pipe
            | TokenKind::Caret
            | TokenKind::Amp
            | TokenKind::EqEq
            | TokenKind::BangEq
            | TokenKind::EqEqEq
            | TokenKind::BangEqEq
            | TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::LtEq
            | TokenKind::GtEq
            | TokenKind::In
            | TokenKind::Instanceof
            | TokenKind::LtLt
            | TokenKind::GtGt
            | TokenKind::GtGtGt
            | TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash
            | TokenKind::Percent
            | TokenKind::StarStar
            | TokenKind::QuestionQuestion => self.parse_binary_rest(left)?,

            // Member access
            TokenKind::Dot => {
                self.advance();
                let property = self.parse_property_ident()?;
                Expr::Member {
                    object: Box::new(left),
                    property,
                }
            }

            // Optional chaining
            TokenKind::QuestionDot => {
                self.advance();
                if self.check(&TokenKind::LParen) {
                    let args = self.parse_call_arguments()?;
                    Expr::OptionalCall {
                        callee: Box::new(left),
                        args,
                    }
                } else if self.check(&TokenKind::LBracket) {
                    self.advance();
                    let index = Box::new(self.parse_expression()?);
                    self.consume(TokenKind::RBracket)?;
                    Expr::OptionalIndex {
                        object: Box::new(left),
                        index,
                    }
                } else {
                    let property = self.parse_property_ident()?;
                    Expr::OptionalMember {
                        object: Box::new(left),
                        property,
                    }
                }
            }

            // Index access
            TokenKind::LBracket => {
                self.advance();
                let saved = std::mem::replace(&mut self.no_in, false);
                let index = self.parse_expression();
                self.no_in = saved;
                let index = Box::new(index?);
                self.consume(TokenKind::RBracket)?;
                Expr::Index {
                    object: Box::new(left),
                    index,
                }
            }

            // Function call
            TokenKind::LParen => {
                let args = self.parse_call_arguments()?;
                Expr::Call {
                    callee: Box::new(left),
                    type_args: None,
                    args,
                }
            }

            // Type assertion
            TokenKind::As => {
                self.advance();
                let ty = Box::new(self.parse_type()?);
                Expr::TypeCast {
                    expr: Box::new(left),
                    ty,
                }
            }

            // Postfix operators
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                if !is_assignment_target(&left.value) {
                    return Err(self.error("invalid increment/decrement operand"));
                }
                let op = if self.advance().kind == TokenKind::PlusPlus {
                    UnaryOp::PostIncrement
                } else {
                    UnaryOp::PostDecrement
                };
                Expr::Unary {
                    op,
                    expr: Box::new(left),
                }
            }

            // Non-null assertion: expr!
            TokenKind::Bang => {
                self.advance();
                Expr::NonNullAssertion(Box::new(left))
            }

            _ => return Ok(left),
        };

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(expr, span))
    }

    fn parse_binary_rest(&mut self, left: Node<Expr>) -> ParseResult<Expr> {
        let precedence = self.get_infix_precedence();
        let op = self.parse_binary_operator()?;
        // `**` is right-associative
        let next = if op == BinaryOp::Pow { precedence } else { precedence + 1 };
        let right = Box::new(self.parse_expression_with_precedence(next)?);
        Ok(Expr::Binary {
            left: Box::new(left),
            op,
            right,
        })
    }

    /// `(a, ...b)` including the parentheses.
    pub(crate) fn parse_call_arguments(&mut self) -> ParseResult<Vec<Node<Expr>>> {
        self.consume(TokenKind::LParen)?;
        let saved = std::mem::replace(&mut self.no_in, false);
        let result = self.parse_call_arguments_inner();
        self.no_in = saved;
        result
    }

    fn parse_call_arguments_inner(&mut self) -> ParseResult<Vec<Node<Expr>>> {
        let mut args = Vec::new();
        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            args.push(self.parse_assignment_expr()?);
            if !self.check(&TokenKind::RParen) {
                self.consume(TokenKind::Comma)?;
            }
        }
        self.consume(TokenKind::RParen)?;
        Ok(args)
    }

    pub(crate) fn parse_primary_expression(&mut self) -> ParseResult<Node<Expr>> {
        let saved = std::mem::replace(&mut self.no_in, false);
        let result = self.parse_primary_inner();
        self.no_in = saved;
        result
    }

    fn parse_primary_inner(&mut self) -> ParseResult<Node<Expr>> {
        let start = self.current_token().span;

        let expr = match self.current_token().kind {
            TokenKind::Error => {
                self.advance();
                Expr::Error
            }

            // Literals
            TokenKind::NumberLiteral => {
                let token = self.advance().clone();
                let num = crate::helpers::parse_number(&token.value)
                    .ok_or_else(|| ParseError::new(format!("invalid number '{}'", token.value), token.span))?;
                Expr::Literal(Literal::Number(num))
            }
            TokenKind::StringLiteral => {
                let value = self.advance().value.clone();
                Expr::Literal(Literal::String(value))
            }
            TokenKind::True => {
                self.advance();
                Expr::Literal(Literal::Boolean(true))
            }
            TokenKind::False => {
                self.advance();
                Expr::Literal(Literal::Boolean(false))
            }
            TokenKind::Null => {
                self.advance();
                Expr::Literal(Literal::Null)
            }
            TokenKind::Undefined => {
                self.advance();
                Expr::Literal(Literal::Undefined)
            }

            TokenKind::TemplateLiteral => {
                let value = self.advance().value.clone();
                Expr::Template {
                    quasis: vec![value],
                    exprs: vec![],
                }
            }
            TokenKind::TemplateHead => self.parse_template()?,

            // Identifiers, including the `x => ...` arrow form
            TokenKind::Identifier => {
                if self.peek_kind(1) == Some(&TokenKind::FatArrow) {
                    return self.parse_single_param_arrow(start, false);
                }
                let name = self.advance().value.clone();
                Expr::Ident(Ident::new(name))
            }

            TokenKind::This => {
                self.advance();
                Expr::This
            }

            TokenKind::Super => {
                self.advance();
                Expr::Super
            }

            // Array literal
            TokenKind::LBracket => {
                self.advance();
                let mut elements = Vec::new();

                while !self.check(&TokenKind::RBracket) && !self.is_at_end() {
                    if self.check(&TokenKind::Comma) {
                        elements.push(None);
                        self.advance();
                    } else {
                        elements.push(Some(self.parse_assignment_expr()?));
                        if !self.check(&TokenKind::RBracket) {
                            self.consume(TokenKind::Comma)?;
                        }
                    }
                }

                self.consume(TokenKind::RBracket)?;
                Expr::Array(elements)
            }

            TokenKind::LBrace => self.parse_object_literal()?,

            // Parenthesized expression or arrow function
            TokenKind::LParen | TokenKind::Lt => return self.parse_paren_or_arrow(start, false),

            TokenKind::Function => self.parse_function_expression(false)?,

            TokenKind::New => {
                self.advance();
                let callee = Box::new(self.parse_new_callee()?);
                let type_args = self.parse_type_arguments()?;
                let args = if self.check(&TokenKind::LParen) {
                    self.parse_call_arguments()?
                } else {
                    Vec::new()
                };

                Expr::New {
                    callee,
                    type_args,
                    args,
                }
            }

            // Async function expression or async arrow function
            TokenKind::Async => match self.peek_kind(1) {
                Some(TokenKind::Function) => {
                    self.advance();
                    self.parse_function_expression(true)?
                }
                Some(TokenKind::Identifier) if self.peek_kind(2) == Some(&TokenKind::FatArrow) => {
                    self.advance();
                    return self.parse_single_param_arrow(start, true);
                }
                Some(TokenKind::LParen) | Some(TokenKind::Lt) => {
                    self.advance();
                    return self.parse_paren_or_arrow(start, true);
                }
                _ => return Err(self.unexpected("expression")),
            },

            _ => return Err(self.unexpected("expression")),
        };

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(expr, span))
    }

    /// Template with substitutions, starting at its head token.
    fn parse_template(&mut self) -> ParseResult<Expr> {
        let head = self.consume(TokenKind::TemplateHead)?.value.clone();
        let mut quasis = vec![head];
        let mut exprs = Vec::new();

        loop {
            exprs.push(self.parse_expression()?);
            match self.current_token().kind {
                TokenKind::TemplateMiddle => {
                    quasis.push(self.advance().value.clone());
                }
                TokenKind::TemplateTail => {
                    quasis.push(self.advance().value.clone());
                    break;
                }
                _ => return Err(self.unexpected("'}' closing template substitution")),
            }
        }

        Ok(Expr::Template { quasis, exprs })
    }

    fn parse_object_literal(&mut self) -> ParseResult<Expr> {
        self.consume(TokenKind::LBrace)?;
        let mut properties = Vec::new();

        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            if self.check(&TokenKind::DotDotDot) {
                self.advance();
                let expr = self.parse_assignment_expr()?;
                properties.push(ObjectProperty::Spread(expr));
            } else {
                let is_async = self.check(&TokenKind::Async)
                    && !matches!(
                        self.peek_kind(1),
                        Some(TokenKind::Colon)
                            | Some(TokenKind::LParen)
                            | Some(TokenKind::Comma)
                            | Some(TokenKind::RBrace)
                    );
                if is_async {
                    self.advance();
                }

                let key = self.parse_property_name()?;

                if self.check(&TokenKind::LParen) || self.check(&TokenKind::Lt) {
                    let type_params = self.parse_type_parameters()?;
                    self.consume(TokenKind::LParen)?;
                    let params = self.parse_function_params()?;
                    self.consume(TokenKind::RParen)?;
                    let return_type = self.parse_return_type()?;
                    let body = self.parse_block_statement()?;

                    properties.push(ObjectProperty::Method {
                        key,
                        type_params,
                        params,
                        return_type,
                        body,
                        is_async,
                    });
                } else if is_async {
                    return Err(self.unexpected("'('"));
                } else if self.check(&TokenKind::Colon) {
                    self.advance();
                    let value = self.parse_assignment_expr()?;
                    properties.push(ObjectProperty::Property {
                        key,
                        value,
                        shorthand: false,
                    });
                } else {
                    match &key {
                        PropertyName::Ident(ident)
                            if self.previous_token().kind == TokenKind::Identifier =>
                        {
                            let value = Node::new(Expr::Ident(ident.value.clone()), ident.span);
                            properties.push(ObjectProperty::Property {
                                key,
                                value,
                                shorthand: true,
                            });
                        }
                        _ => return Err(self.unexpected("':'")),
                    }
                }
            }

            if !self.check(&TokenKind::RBrace) {
                self.consume(TokenKind::Comma)?;
            }
        }

        self.consume(TokenKind::RBrace)?;
        Ok(Expr::Object(properties))
    }

    /// `функция имя?<Т>(...) : R { ... }` with the `функция` keyword current.
    fn parse_function_expression(&mut self, is_async: bool) -> ParseResult<Expr> {
        self.consume(TokenKind::Function)?;

        let name = if self.check(&TokenKind::Identifier) {
            Some(self.parse_identifier()?)
        } else {
            None
        };

        let type_params = self.parse_type_parameters()?;
        self.consume(TokenKind::LParen)?;
        let params = self.parse_function_params()?;
        self.consume(TokenKind::RParen)?;
        let return_type = self.parse_return_type()?;
        let body = Box::new(self.parse_block_statement()?);

        Ok(Expr::Function {
            name,
            type_params,
            params,
            return_type,
            body,
            is_async,
        })
    }

    /// Constructor expression of `новый`: a name followed by member accesses.
    fn parse_new_callee(&mut self) -> ParseResult<Node<Expr>> {
        let start = self.current_token().span;
        let mut callee = match self.current_token().kind {
            TokenKind::Identifier => {
                let name = self.advance().value.clone();
                Node::new(Expr::Ident(Ident::new(name)), start)
            }
            TokenKind::LParen | TokenKind::This => self.parse_primary_expression()?,
            _ => return Err(self.unexpected("constructor name")),
        };

        while self.check(&TokenKind::Dot) {
            self.advance();
            let property = self.parse_property_ident()?;
            let span = start.merge(&property.span);
            callee = Node::new(
                Expr::Member {
                    object: Box::new(callee),
                    property,
                },
                span,
            );
        }

        Ok(callee)
    }

    pub(crate) fn parse_return_type(&mut self) -> ParseResult<Option<Box<Node<Type>>>> {
        if self.check(&TokenKind::Colon) {
            self.advance();
            Ok(Some(Box::new(self.parse_type()?)))
        } else {
            Ok(None)
        }
    }

    /// `(` starts either a parenthesized expression or an arrow function's
    /// parameter list. The arrow reading is tried first and abandoned when no
    /// `=>` follows the closing `)`.
    fn parse_paren_or_arrow(&mut self, start: Span, is_async: bool) -> ParseResult<Node<Expr>> {
        let checkpoint = self.checkpoint();
        let generic = self.check(&TokenKind::Lt);

        match self.parse_arrow_signature() {
            Ok((type_params, params, return_type)) if self.check(&TokenKind::FatArrow) => {
                return self.parse_arrow_body(start, type_params, params, return_type, is_async);
            }
            Ok(_) if is_async || generic => return Err(self.unexpected("'=>'")),
            Err(err) if is_async || generic => return Err(err),
            _ => self.reset(checkpoint),
        }

        self.consume(TokenKind::LParen)?;
        let expr = self.parse_expression()?;
        self.consume(TokenKind::RParen)?;

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(Expr::Paren(Box::new(expr)), span))
    }

    #[allow(clippy::type_complexity)]
    fn parse_arrow_signature(
        &mut self,
    ) -> ParseResult<(Option<Vec<TypeParam>>, Vec<Param>, Option<Box<Node<Type>>>)> {
        let type_params = self.parse_type_parameters()?;
        self.consume(TokenKind::LParen)?;
        let params = self.parse_function_params()?;
        self.consume(TokenKind::RParen)?;
        let return_type = self.parse_return_type()?;
        Ok((type_params, params, return_type))
    }

    fn parse_single_param_arrow(&mut self, start: Span, is_async: bool) -> ParseResult<Node<Expr>> {
        let ident = self.parse_identifier()?;
        let param = self.expr_to_param(Node::new(Expr::Ident(ident.value), ident.span))?;
        self.parse_arrow_body(start, None, vec![param], None, is_async)
    }

    fn parse_arrow_body(
        &mut self,
        start: Span,
        type_params: Option<Vec<TypeParam>>,
        params: Vec<Param>,
        return_type: Option<Box<Node<Type>>>,
        is_async: bool,
    ) -> ParseResult<Node<Expr>> {
        self.consume(TokenKind::FatArrow)?;

        let body = if self.check(&TokenKind::LBrace) {
            ArrowBody::Block(Box::new(self.parse_block_statement()?))
        } else {
            ArrowBody::Expr(Box::new(self.parse_assignment_expr()?))
        };

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(
            Expr::Arrow {
                type_params,
                params,
                return_type,
                body,
                is_async,
            },
            span,
        ))
    }
}

fn is_assignment_target(expr: &Expr) -> bool {
    match expr {
        Expr::Ident(_)
        | Expr::Member { .. }
        | Expr::Index { .. }
        | Expr::Array(_)
        | Expr::Object(_) => true,
        Expr::Paren(inner) | Expr::NonNullAssertion(inner) => is_assignment_target(&inner.value),
        Expr::TypeCast { expr, .. } => is_assignment_target(&expr.value),
        _ => false,
    }
}
