//! Type annotation parsing

use super::*;

impl Parser {
    pub(crate) fn parse_type(&mut self) -> ParseResult<Node<Type>> {
        self.parse_union_type()
    }

    pub(crate) fn parse_union_type(&mut self) -> ParseResult<Node<Type>> {
        let start = self.current_token().span;

        // Leading `|` is allowed: `тип Т = | "а" | "б"`
        if self.check(&TokenKind::Pipe) {
            self.advance();
        }

        let first = self.parse_primary_type()?;
        if !self.check(&TokenKind::Pipe) {
            return Ok(first);
        }

        let mut types = vec![first];
        while self.check(&TokenKind::Pipe) {
            self.advance();
            types.push(self.parse_primary_type()?);
        }

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(Type::Union(types), span))
    }

    pub(crate) fn parse_primary_type(&mut self) -> ParseResult<Node<Type>> {
        let start = self.current_token().span;
        let mut ty = self.parse_base_type()?;

        // T[]
        while self.check(&TokenKind::LBracket) && self.peek_kind(1) == Some(&TokenKind::RBracket) {
            self.advance();
            self.advance();
            let span = start.merge(&self.previous_token().span);
            ty = Node::new(Type::Array(Box::new(ty)), span);
        }

        Ok(ty)
    }

    pub(crate) fn parse_base_type(&mut self) -> ParseResult<Node<Type>> {
        let start = self.current_token().span;

        let ty = match self.current_token().kind {
            TokenKind::Identifier => {
                let name = self.current_token().value.clone();
                if let Some(prim) = PrimitiveType::from_name(&name) {
                    self.advance();
                    Type::Primitive(prim)
                } else {
                    let name = self.parse_identifier()?;
                    let type_args = self.parse_type_arguments()?;
                    match (name.value.name.as_str(), type_args) {
                        ("Массив" | "Array", Some(mut args)) if args.len() == 1 => {
                            Type::Array(Box::new(args.remove(0)))
                        }
                        (_, type_args) => Type::TypeRef { name, type_args },
                    }
                }
            }

            TokenKind::Void => {
                self.advance();
                Type::Primitive(PrimitiveType::Void)
            }
            TokenKind::Null => {
                self.advance();
                Type::Primitive(PrimitiveType::Null)
            }
            TokenKind::Undefined => {
                self.advance();
                Type::Primitive(PrimitiveType::Undefined)
            }

            // Literal types
            TokenKind::StringLiteral => {
                let value = self.advance().value.clone();
                Type::Literal(LiteralType::String(value))
            }
            TokenKind::NumberLiteral => {
                let token = self.advance().clone();
                let num = crate::helpers::parse_number(&token.value)
                    .ok_or_else(|| ParseError::new(format!("invalid number '{}'", token.value), token.span))?;
                Type::Literal(LiteralType::Number(num))
            }
            TokenKind::Minus if self.peek_kind(1) == Some(&TokenKind::NumberLiteral) => {
                self.advance();
                let token = self.advance().clone();
                let num = crate::helpers::parse_number(&token.value)
                    .ok_or_else(|| ParseError::new(format!("invalid number '{}'", token.value), token.span))?;
                Type::Literal(LiteralType::Number(-num))
            }
            TokenKind::True => {
                self.advance();
                Type::Literal(LiteralType::Boolean(true))
            }
            TokenKind::False => {
                self.advance();
                Type::Literal(LiteralType::Boolean(false))
            }

            // Function type `(a: T) => R` or parenthesized type `(A | B)`
            TokenKind::LParen | TokenKind::Lt => {
                let checkpoint = self.checkpoint();
                match self.parse_function_type() {
                    Ok(function) => Type::Function(function),
                    Err(err) => {
                        self.reset(checkpoint);
                        if self.check(&TokenKind::Lt) {
                            return Err(err);
                        }
                        self.advance();
                        let inner = self.parse_type()?;
                        self.consume(TokenKind::RParen)?;
                        Type::Paren(Box::new(inner))
                    }
                }
            }

            TokenKind::LBrace => {
                self.advance();
                let mut members = Vec::new();
                while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
                    members.push(self.parse_object_type_member()?);
                }
                self.consume(TokenKind::RBrace)?;
                Type::Object(ObjectType { members })
            }

            _ => return Err(self.unexpected("type")),
        };

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(ty, span))
    }

    fn parse_function_type(&mut self) -> ParseResult<FunctionType> {
        let type_params = self.parse_type_parameters()?;
        self.consume(TokenKind::LParen)?;
        let params = self.parse_function_type_params()?;
        self.consume(TokenKind::RParen)?;
        self.consume(TokenKind::FatArrow)?;
        let return_type = Box::new(self.parse_type()?);

        Ok(FunctionType {
            type_params,
            params,
            return_type,
        })
    }

    /// Interface or object type member, terminated by `;`, `,` or the closing brace.
    pub(crate) fn parse_object_type_member(&mut self) -> ParseResult<ObjectTypeMember> {
        let readonly = if self.check(&TokenKind::Readonly)
            && !matches!(
                self.peek_kind(1),
                Some(TokenKind::Colon) | Some(TokenKind::Question) | Some(TokenKind::LParen)
            ) {
            self.advance();
            true
        } else {
            false
        };

        let name = self.parse_property_name()?;
        let optional = if self.check(&TokenKind::Question) {
            self.advance();
            true
        } else {
            false
        };

        let member = if self.check(&TokenKind::LParen) || self.check(&TokenKind::Lt) {
            let type_params = self.parse_type_parameters()?;
            self.consume(TokenKind::LParen)?;
            let params = self.parse_function_type_params()?;
            self.consume(TokenKind::RParen)?;
            self.consume(TokenKind::Colon)?;
            let return_type = self.parse_type()?;

            ObjectTypeMember::Method {
                name,
                type_params,
                params,
                return_type,
                optional,
            }
        } else {
            self.consume(TokenKind::Colon)?;
            let ty = self.parse_type()?;

            ObjectTypeMember::Property {
                name,
                ty,
                optional,
                readonly,
            }
        };

        if self.check(&TokenKind::Semicolon) || self.check(&TokenKind::Comma) {
            self.advance();
        } else if !self.check(&TokenKind::RBrace) {
            return Err(self.unexpected("';'"));
        }

        Ok(member)
    }

    pub(crate) fn parse_function_type_params(&mut self) -> ParseResult<Vec<FunctionTypeParam>> {
        let mut params = Vec::new();

        while !self.check(&TokenKind::RParen) && !self.is_at_end() {
            let is_rest = if self.check(&TokenKind::DotDotDot) {
                self.advance();
                true
            } else {
                false
            };

            let named = self.check(&TokenKind::Identifier)
                && matches!(
                    self.peek_kind(1),
                    Some(TokenKind::Colon) | Some(TokenKind::Question)
                );
            let (name, optional, ty) = if named {
                let name = self.parse_identifier()?;
                let optional = if self.check(&TokenKind::Question) {
                    self.advance();
                    true
                } else {
                    false
                };
                self.consume(TokenKind::Colon)?;
                (Some(name), optional, self.parse_type()?)
            } else {
                (None, false, self.parse_type()?)
            };

            params.push(FunctionTypeParam {
                name,
                ty,
                optional,
                is_rest,
            });

            if !self.check(&TokenKind::RParen) {
                self.consume(TokenKind::Comma)?;
            }
        }

        Ok(params)
    }

    /// `<Т расширяет Огр = Умолч, ...>`; `None` when no `<` follows.
    pub(crate) fn parse_type_parameters(&mut self) -> ParseResult<Option<Vec<TypeParam>>> {
        if !self.check(&TokenKind::Lt) {
            return Ok(None);
        }

        self.advance();
        let mut params = Vec::new();

        while !self.check(&TokenKind::Gt) && !self.is_at_end() {
            let name = self.parse_identifier()?;

            let constraint = if self.check(&TokenKind::Extends) {
                self.advance();
                Some(Box::new(self.parse_type()?))
            } else {
                None
            };

            let default = if self.check(&TokenKind::Eq) {
                self.advance();
                Some(Box::new(self.parse_type()?))
            } else {
                None
            };

            params.push(TypeParam {
                name,
                constraint,
                default,
            });

            if !self.check(&TokenKind::Gt) {
                self.consume(TokenKind::Comma)?;
            }
        }

        self.consume_type_close()?;
        Ok(Some(params))
    }

    pub(crate) fn parse_type_arguments(&mut self) -> ParseResult<Option<Vec<Node<Type>>>> {
        if !self.check(&TokenKind::Lt) {
            return Ok(None);
        }

        self.advance();
        let mut args = Vec::new();

        while !self.check_type_close() && !self.is_at_end() {
            args.push(self.parse_type()?);
            if !self.check_type_close() {
                self.consume(TokenKind::Comma)?;
            }
        }

        self.consume_type_close()?;
        Ok(Some(args))
    }

    fn check_type_close(&self) -> bool {
        matches!(
            self.current_token().kind,
            TokenKind::Gt | TokenKind::GtGt | TokenKind::GtGtGt
        )
    }

    /// Consumes one `>` of a type argument list, splitting `>>`/`>>>` tokens
    /// so nested lists like `Массив<Массив<число>>` close correctly.
    fn consume_type_close(&mut self) -> ParseResult<()> {
        let kind = self.current_token().kind;
        let rest = match kind {
            TokenKind::Gt => {
                self.advance();
                return Ok(());
            }
            TokenKind::GtGt => TokenKind::Gt,
            TokenKind::GtGtGt => TokenKind::GtGt,
            _ => return Err(self.unexpected("'>'")),
        };

        let index = self.current;
        self.split_log.push((index, self.tokens[index].clone()));
        let token = &mut self.tokens[index];
        token.kind = rest;
        token.value.remove(0);
        token.span.start += 1;
        token.span.column += 1;
        Ok(())
    }
}
