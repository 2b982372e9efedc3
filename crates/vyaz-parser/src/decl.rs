//! Declaration parsing

use super::*;

impl Parser {
    pub(crate) fn parse_declaration(&mut self) -> ParseResult<Node<Decl>> {
        let start = self.current_token().span;

        let decl = match self.current_token().kind {
            TokenKind::Function | TokenKind::Async => {
                Decl::Function(self.parse_function_declaration()?)
            }
            TokenKind::Class | TokenKind::Abstract => Decl::Class(self.parse_class_declaration()?),
            TokenKind::Interface => Decl::Interface(self.parse_interface_declaration()?),
            TokenKind::Type => Decl::TypeAlias(self.parse_type_alias_declaration()?),
            TokenKind::Const | TokenKind::Let | TokenKind::Var => {
                Decl::Var(self.parse_var_declaration()?)
            }
            _ => return Err(self.unexpected("declaration")),
        };

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(decl, span))
    }

    pub(crate) fn parse_function_declaration(&mut self) -> ParseResult<FunctionDecl> {
        let is_async = if self.check(&TokenKind::Async) {
            self.advance();
            true
        } else {
            false
        };

        self.consume(TokenKind::Function)?;
        let name = self.parse_identifier()?;
        let type_params = self.parse_type_parameters()?;

        self.consume(TokenKind::LParen)?;
        let params = self.parse_function_params()?;
        self.consume(TokenKind::RParen)?;

        let return_type = self.parse_return_type()?;

        // Overload signature: `функция f(x: число): число;`
        let body = if self.check(&TokenKind::Semicolon) {
            self.advance();
            None
        } else {
            Some(self.parse_block_statement()?)
        };

        Ok(FunctionDecl {
            name,
            type_params,
            params,
            return_type,
            body,
            is_async,
        })
    }

    pub(crate) fn parse_class_declaration(&mut self) -> ParseResult<ClassDecl> {
        let is_abstract = if self.check(&TokenKind::Abstract) {
            self.advance();
            true
        } else {
            false
        };

        self.consume(TokenKind::Class)?;
        let name = self.parse_identifier()?;
        let type_params = self.parse_type_parameters()?;

        let extends = if self.check(&TokenKind::Extends) {
            self.advance();
            let base = Box::new(self.parse_base_class()?);
            let type_args = self.parse_type_arguments()?;
            Some(ClassExtends { base, type_args })
        } else {
            None
        };

        let mut implements = Vec::new();
        if self.check(&TokenKind::Implements) {
            self.advance();
            loop {
                implements.push(self.parse_type()?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }

        self.consume(TokenKind::LBrace)?;

        let mut members = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            if self.check(&TokenKind::Semicolon) {
                self.advance();
                continue;
            }
            members.push(self.parse_class_member()?);
        }

        self.consume(TokenKind::RBrace)?;

        Ok(ClassDecl {
            name,
            type_params,
            extends,
            implements,
            members,
            is_abstract,
        })
    }

    /// Base class expression after `расширяет`: `База` or `модуль.База`.
    fn parse_base_class(&mut self) -> ParseResult<Node<Expr>> {
        let first = self.parse_identifier()?;
        let start = first.span;
        let mut base = Node::new(Expr::Ident(first.value), first.span);
        while self.check(&TokenKind::Dot) {
            self.advance();
            let property = self.parse_property_ident()?;
            let span = start.merge(&property.span);
            base = Node::new(
                Expr::Member {
                    object: Box::new(base),
                    property,
                },
                span,
            );
        }
        Ok(base)
    }

    /// A modifier keyword is only a modifier when a member name follows it.
    fn is_member_modifier(&self) -> bool {
        let modifier = matches!(
            self.current_token().kind,
            TokenKind::Public
                | TokenKind::Private
                | TokenKind::Protected
                | TokenKind::Static
                | TokenKind::Readonly
                | TokenKind::Abstract
                | TokenKind::Async
        );
        modifier
            && !matches!(
                self.peek_kind(1),
                Some(TokenKind::LParen)
                    | Some(TokenKind::Lt)
                    | Some(TokenKind::Colon)
                    | Some(TokenKind::Eq)
                    | Some(TokenKind::Semicolon)
                    | Some(TokenKind::Question)
                    | Some(TokenKind::RBrace)
            )
    }

    pub(crate) fn parse_class_member(&mut self) -> ParseResult<ClassMember> {
        let start = self.current_token().span;

        let mut access = AccessModifier::Public;
        let mut is_static = false;
        let mut is_readonly = false;
        let mut is_abstract = false;
        let mut is_async = false;

        while self.is_member_modifier() {
            match self.advance().kind {
                TokenKind::Public => access = AccessModifier::Public,
                TokenKind::Private => access = AccessModifier::Private,
                TokenKind::Protected => access = AccessModifier::Protected,
                TokenKind::Static => is_static = true,
                TokenKind::Readonly => is_readonly = true,
                TokenKind::Abstract => is_abstract = true,
                _ => is_async = true,
            }
        }

        // Constructor
        if self.check_contextual("конструктор") && self.peek_kind(1) == Some(&TokenKind::LParen) {
            self.advance();
            self.consume(TokenKind::LParen)?;
            let params = self.parse_function_params()?;
            self.consume(TokenKind::RParen)?;
            let body = self.parse_member_body()?;

            return Ok(ClassMember::Constructor {
                params,
                body,
                access,
                span: start.merge(&self.previous_token().span),
            });
        }

        // `получить имя()` is a getter; `получить()` is a method named получить
        let accessor_follows = !matches!(
            self.peek_kind(1),
            Some(TokenKind::LParen)
                | Some(TokenKind::Lt)
                | Some(TokenKind::Colon)
                | Some(TokenKind::Eq)
                | Some(TokenKind::Semicolon)
                | Some(TokenKind::Question)
        );
        let is_getter = self.check_contextual("получить") && accessor_follows;
        let is_setter = self.check_contextual("задать") && accessor_follows;
        if is_getter || is_setter {
            self.advance();
        }

        let name = self.parse_property_name()?;

        if is_getter {
            self.consume(TokenKind::LParen)?;
            self.consume(TokenKind::RParen)?;
            let return_type = self.parse_return_type()?;
            let body = self.parse_member_body()?;

            return Ok(ClassMember::Getter {
                name,
                return_type,
                body,
                access,
                is_static,
                span: start.merge(&self.previous_token().span),
            });
        }

        if is_setter {
            self.consume(TokenKind::LParen)?;
            let param = self.parse_function_param()?;
            self.consume(TokenKind::RParen)?;
            let body = self.parse_member_body()?;

            return Ok(ClassMember::Setter {
                name,
                param,
                body,
                access,
                is_static,
                span: start.merge(&self.previous_token().span),
            });
        }

        let is_optional = if self.check(&TokenKind::Question) {
            self.advance();
            true
        } else {
            false
        };

        if self.check(&TokenKind::LParen) || self.check(&TokenKind::Lt) {
            let type_params = self.parse_type_parameters()?;
            self.consume(TokenKind::LParen)?;
            let params = self.parse_function_params()?;
            self.consume(TokenKind::RParen)?;
            let return_type = self.parse_return_type()?;
            let body = self.parse_member_body()?;

            return Ok(ClassMember::Method {
                name,
                type_params,
                params,
                return_type,
                body,
                access,
                is_static,
                is_async,
                is_abstract,
                is_optional,
                span: start.merge(&self.previous_token().span),
            });
        }

        if is_async {
            return Err(self.unexpected("'('"));
        }

        let type_annotation = self.parse_return_type()?;

        let init = if self.check(&TokenKind::Eq) {
            self.advance();
            Some(self.parse_assignment_expr()?)
        } else {
            None
        };

        self.expect_statement_end()?;

        Ok(ClassMember::Property {
            name,
            type_annotation,
            init,
            access,
            is_static,
            is_readonly,
            is_abstract,
            is_optional,
            span: start.merge(&self.previous_token().span),
        })
    }

    /// Method body, or `;` for abstract members and overload signatures.
    fn parse_member_body(&mut self) -> ParseResult<Option<Node<BlockStmt>>> {
        if self.check(&TokenKind::Semicolon) {
            self.advance();
            Ok(None)
        } else if self.check(&TokenKind::LBrace) {
            Ok(Some(self.parse_block_statement()?))
        } else if self.check(&TokenKind::RBrace)
            || self.current_token().span.line > self.previous_token().span.line
        {
            Ok(None)
        } else {
            Err(self.unexpected("'{'"))
        }
    }

    pub(crate) fn parse_interface_declaration(&mut self) -> ParseResult<InterfaceDecl> {
        self.consume(TokenKind::Interface)?;
        let name = self.parse_identifier()?;
        let type_params = self.parse_type_parameters()?;

        let mut extends = Vec::new();
        if self.check(&TokenKind::Extends) {
            self.advance();
            loop {
                extends.push(self.parse_primary_type()?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }

        self.consume(TokenKind::LBrace)?;

        let mut members = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            members.push(self.parse_object_type_member()?);
        }

        self.consume(TokenKind::RBrace)?;

        Ok(InterfaceDecl {
            name,
            type_params,
            extends,
            members,
        })
    }

    pub(crate) fn parse_type_alias_declaration(&mut self) -> ParseResult<TypeAliasDecl> {
        self.consume(TokenKind::Type)?;
        let name = self.parse_identifier()?;
        let type_params = self.parse_type_parameters()?;
        self.consume(TokenKind::Eq)?;
        let ty = self.parse_type()?;
        self.expect_statement_end()?;

        Ok(TypeAliasDecl {
            name,
            type_params,
            ty,
        })
    }
}
