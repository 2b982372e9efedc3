//! Pattern parsing

use super::*;

impl Parser {
    /// Binding pattern of a variable declarator; a plain name may carry a
    /// type annotation (`пусть x: число`).
    pub(crate) fn parse_pattern(&mut self) -> ParseResult<Node<Pattern>> {
        let start = self.current_token().span;
        let mut result = self.parse_binding_target()?;

        if let Pattern::Ident {
            type_annotation, ..
        } = &mut result.value
        {
            if self.check(&TokenKind::Colon) {
                self.advance();
                *type_annotation = Some(Box::new(self.parse_type()?));
                result.span = start.merge(&self.previous_token().span);
            }
        }

        Ok(result)
    }

    /// Name or destructuring pattern without annotation or default.
    pub(crate) fn parse_binding_target(&mut self) -> ParseResult<Node<Pattern>> {
        let start = self.current_token().span;

        let pattern = match self.current_token().kind {
            TokenKind::LBracket => self.parse_array_pattern()?,
            TokenKind::LBrace => self.parse_object_pattern()?,
            TokenKind::Identifier => Pattern::Ident {
                name: self.parse_identifier()?,
                type_annotation: None,
            },
            _ => return Err(self.unexpected("binding pattern")),
        };

        Ok(Node::new(pattern, start.merge(&self.previous_token().span)))
    }

    /// Destructuring element, optionally with a default (`[a = 1]`).
    pub(crate) fn parse_pattern_with_default(&mut self) -> ParseResult<Node<Pattern>> {
        let result = self.parse_binding_target()?;
        self.parse_pattern_default(result)
    }

    fn parse_pattern_default(&mut self, pattern: Node<Pattern>) -> ParseResult<Node<Pattern>> {
        if !self.check(&TokenKind::Eq) {
            return Ok(pattern);
        }
        self.advance();
        let default = Box::new(self.parse_assignment_expr()?);
        let span = pattern.span.merge(&default.span);
        Ok(Node::new(
            Pattern::Assignment {
                pattern: Box::new(pattern),
                default,
            },
            span,
        ))
    }

    pub(crate) fn parse_array_pattern(&mut self) -> ParseResult<Pattern> {
        self.consume(TokenKind::LBracket)?;
        let mut elements = Vec::new();
        let mut rest = None;

        while !self.check(&TokenKind::RBracket) && !self.is_at_end() {
            if self.check(&TokenKind::DotDotDot) {
                self.advance();
                rest = Some(Box::new(self.parse_binding_target()?));
                break;
            } else if self.check(&TokenKind::Comma) {
                elements.push(None);
                self.advance();
            } else {
                elements.push(Some(self.parse_pattern_with_default()?));
                if !self.check(&TokenKind::RBracket) {
                    self.consume(TokenKind::Comma)?;
                }
            }
        }

        self.consume(TokenKind::RBracket)?;

        Ok(Pattern::Array { elements, rest })
    }

    pub(crate) fn parse_object_pattern(&mut self) -> ParseResult<Pattern> {
        self.consume(TokenKind::LBrace)?;
        let mut properties = Vec::new();
        let mut rest = None;

        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            if self.check(&TokenKind::DotDotDot) {
                self.advance();
                rest = Some(Box::new(self.parse_binding_target()?));
                break;
            }

            let key = self.parse_property_name()?;

            let (value, shorthand) = if self.check(&TokenKind::Colon) {
                self.advance();
                (self.parse_pattern_with_default()?, false)
            } else if let PropertyName::Ident(ident) = &key {
                // Reserved words are valid keys but not bindings.
                if self.previous_token().kind == TokenKind::Identifier {
                    let pattern = Node::new(
                        Pattern::Ident {
                            name: ident.clone(),
                            type_annotation: None,
                        },
                        ident.span,
                    );
                    (self.parse_pattern_default(pattern)?, true)
                } else {
                    return Err(ParseError::new(
                        format!("'{}' cannot be used as a binding name", ident.value.name),
                        ident.span,
                    ));
                }
            } else {
                return Err(self.unexpected("':'"));
            };

            properties.push(ObjectPatternProperty {
                key,
                value,
                shorthand,
            });

            if !self.check(&TokenKind::RBrace) {
                self.consume(TokenKind::Comma)?;
            }
        }

        self.consume(TokenKind::RBrace)?;

        Ok(Pattern::Object { properties, rest })
    }
}
