//! Expression, pattern and parameter emission

use vyaz_ast::*;

use crate::generator::{leftmost, param_names, JsGenerator};
use crate::names::{escape_template, is_identifier_name, js_name, quote_string};

impl JsGenerator<'_> {
    pub(crate) fn emit_expr(&mut self, expr: &Node<Expr>) {
        self.out.mark(expr.span);
        match &expr.value {
            Expr::Literal(literal) => self.emit_literal(literal),
            Expr::Ident(ident) => {
                let reference = self.reference(&ident.name);
                self.out.write(&reference);
            }
            Expr::Binary { left, op, right } => {
                self.emit_expr(left);
                self.out.write(&format!(" {op} "));
                self.emit_expr(right);
            }
            Expr::Unary { op, expr: operand } => self.emit_unary(*op, operand),
            Expr::Assignment { target, op, value } => {
                self.emit_expr(target);
                self.out.write(&format!(" {op} "));
                self.emit_expr(value);
            }
            Expr::Call { callee, args, .. } => {
                self.emit_callee(callee);
                self.emit_args(args);
            }
            Expr::OptionalCall { callee, args } => {
                self.emit_callee(callee);
                self.out.write("?.");
                self.emit_args(args);
            }
            Expr::Member { object, property } => {
                self.emit_member_object(object);
                self.out.write(".");
                self.out.mark(property.span);
                self.out.write(&property.value.name);
            }
            Expr::OptionalMember { object, property } => {
                self.emit_member_object(object);
                self.out.write("?.");
                self.out.mark(property.span);
                self.out.write(&property.value.name);
            }
            Expr::Index { object, index } => {
                self.emit_member_object(object);
                self.out.write("[");
                self.emit_expr(index);
                self.out.write("]");
            }
            Expr::OptionalIndex { object, index } => {
                self.emit_member_object(object);
                self.out.write("?.[");
                self.emit_expr(index);
                self.out.write("]");
            }
            Expr::Array(elements) => {
                self.out.write("[");
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        self.out.write(", ");
                    }
                    if let Some(element) = element {
                        self.emit_expr(element);
                    }
                }
                // A trailing hole needs its own comma.
                if matches!(elements.last(), Some(None)) {
                    self.out.write(",");
                }
                self.out.write("]");
            }
            Expr::Object(properties) => self.emit_object(properties),
            Expr::Arrow {
                params,
                body,
                is_async,
                ..
            } => {
                if *is_async {
                    self.out.write("async ");
                }
                self.push_scope(param_names(params));
                self.emit_params(params);
                self.out.write(" => ");
                match body {
                    ArrowBody::Block(block) => self.emit_block(&block.value),
                    ArrowBody::Expr(body) if matches!(leftmost(&body.value), Expr::Object(_)) => {
                        self.out.write("(");
                        self.emit_expr(body);
                        self.out.write(")");
                    }
                    ArrowBody::Expr(body) => self.emit_expr(body),
                }
                self.pop_scope();
            }
            Expr::Function {
                name,
                params,
                body,
                is_async,
                ..
            } => {
                if *is_async {
                    self.out.write("async ");
                }
                self.out.write("function");
                let own_name: Vec<String> = name.iter().map(|n| n.value.name.clone()).collect();
                if let Some(name) = name {
                    self.out.write(" ");
                    self.out.write(&js_name(&name.value.name));
                }
                self.push_scope(own_name);
                self.emit_function_rest(params, &body.value);
                self.pop_scope();
            }
            Expr::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                self.emit_expr(condition);
                self.out.write(" ? ");
                self.emit_expr(then_expr);
                self.out.write(" : ");
                self.emit_expr(else_expr);
            }
            Expr::Template { quasis, exprs } => {
                self.out.write("`");
                for (i, quasi) in quasis.iter().enumerate() {
                    self.out.write(&escape_template(quasi));
                    if let Some(expr) = exprs.get(i) {
                        self.out.write("${");
                        self.emit_expr(expr);
                        self.out.write("}");
                    }
                }
                self.out.write("`");
            }
            Expr::New { callee, args, .. } => {
                self.out.write("new ");
                self.emit_callee(callee);
                self.emit_args(args);
            }
            Expr::TypeCast { expr: inner, .. } | Expr::NonNullAssertion(inner) => self.emit_expr(inner),
            Expr::Await(inner) => {
                self.out.write("await ");
                self.emit_expr(inner);
            }
            Expr::Paren(inner) => {
                self.out.write("(");
                self.emit_expr(inner);
                self.out.write(")");
            }
            Expr::This => self.out.write("this"),
            Expr::Super => self.out.write("super"),
            Expr::Error => self.out.write("undefined"),
            Expr::Spread(inner) => {
                self.out.write("...");
                self.emit_expr(inner);
            }
        }
    }

    fn emit_literal(&mut self, literal: &Literal) {
        match literal {
            Literal::Number(n) => self.out.write(&number_literal(*n)),
            Literal::String(s) => self.out.write(&quote_string(s)),
            Literal::Boolean(true) => self.out.write("true"),
            Literal::Boolean(false) => self.out.write("false"),
            Literal::Null => self.out.write("null"),
            Literal::Undefined => self.out.write("undefined"),
        }
    }

    fn emit_unary(&mut self, op: UnaryOp, operand: &Node<Expr>) {
        if op.is_postfix() {
            self.emit_expr(operand);
            self.out.write(&op.to_string());
            return;
        }
        self.out.write(&op.to_string());
        let needs_space = match op {
            UnaryOp::TypeOf | UnaryOp::Void | UnaryOp::Delete => true,
            UnaryOp::Plus | UnaryOp::PreIncrement => starts_with_sign(&operand.value, '+'),
            UnaryOp::Minus | UnaryOp::PreDecrement => starts_with_sign(&operand.value, '-'),
            _ => false,
        };
        if needs_space {
            self.out.write(" ");
        }
        self.emit_expr(operand);
    }

    /// Callees of calls and `new`. A function literal is parenthesized.
    fn emit_callee(&mut self, callee: &Node<Expr>) {
        if matches!(callee.value, Expr::Function { .. } | Expr::Arrow { .. }) {
            self.out.write("(");
            self.emit_expr(callee);
            self.out.write(")");
        } else {
            self.emit_expr(callee);
        }
    }

    /// Objects of member and index access; `1.x` would read as a number.
    fn emit_member_object(&mut self, object: &Node<Expr>) {
        let wrap = matches!(
            object.value,
            Expr::Literal(Literal::Number(_)) | Expr::Function { .. } | Expr::Arrow { .. }
        );
        if wrap {
            self.out.write("(");
            self.emit_expr(object);
            self.out.write(")");
        } else {
            self.emit_expr(object);
        }
    }

    fn emit_args(&mut self, args: &[Node<Expr>]) {
        self.out.write("(");
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.out.write(", ");
            }
            self.emit_expr(arg);
        }
        self.out.write(")");
    }

    fn emit_object(&mut self, properties: &[ObjectProperty]) {
        if properties.is_empty() {
            self.out.write("{}");
            return;
        }
        let multiline = properties.iter().any(|p| match p {
            ObjectProperty::Method { .. } => true,
            ObjectProperty::Property { value, .. } => matches!(
                value.value,
                Expr::Function { .. }
                    | Expr::Arrow {
                        body: ArrowBody::Block(_),
                        ..
                    }
            ),
            ObjectProperty::Spread(_) => false,
        });

        if multiline {
            self.out.write("{");
            self.out.newline();
            self.out.indent();
        } else {
            self.out.write("{ ");
        }
        for (i, property) in properties.iter().enumerate() {
            if i > 0 {
                if multiline {
                    self.out.write(",");
                    self.out.newline();
                } else {
                    self.out.write(", ");
                }
            }
            self.emit_object_property(property);
        }
        if multiline {
            self.out.newline();
            self.out.dedent();
            self.out.write("}");
        } else {
            self.out.write(" }");
        }
    }

    fn emit_object_property(&mut self, property: &ObjectProperty) {
        match property {
            ObjectProperty::Property {
                key,
                value,
                shorthand,
            } => {
                if let (true, PropertyName::Ident(name), Expr::Ident(ident)) = (shorthand, key, &value.value) {
                    let reference = self.reference(&ident.name);
                    self.out.mark(name.span);
                    if reference == name.value.name {
                        self.out.write(&reference);
                    } else {
                        self.out.write(&format!("{}: {reference}", name.value.name));
                    }
                    return;
                }
                self.emit_property_name(key);
                self.out.write(": ");
                self.emit_expr(value);
            }
            ObjectProperty::Method {
                key,
                params,
                body,
                is_async,
                ..
            } => {
                if *is_async {
                    self.out.write("async ");
                }
                self.emit_property_name(key);
                self.emit_function_rest(params, &body.value);
            }
            ObjectProperty::Spread(inner) => {
                self.out.write("...");
                self.emit_expr(inner);
            }
        }
    }

    pub(crate) fn emit_property_name(&mut self, name: &PropertyName) {
        match name {
            PropertyName::Ident(ident) => {
                self.out.mark(ident.span);
                self.out.write(&ident.value.name);
            }
            PropertyName::String(s) if is_identifier_name(s) => self.out.write(s),
            PropertyName::String(s) => self.out.write(&quote_string(s)),
            PropertyName::Number(n) => self.out.write(&number_literal(*n)),
            PropertyName::Computed(expr) => {
                self.out.write("[");
                self.emit_expr(expr);
                self.out.write("]");
            }
        }
    }

    pub(crate) fn emit_params(&mut self, params: &[Param]) {
        self.out.write("(");
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.out.write(", ");
            }
            if param.is_rest {
                self.out.write("...");
            }
            self.emit_pattern(&param.pattern);
            if let Some(default) = &param.default {
                self.out.write(" = ");
                self.emit_expr(default);
            }
        }
        self.out.write(")");
    }

    /// Binding patterns. Bound names are declarations, not references.
    pub(crate) fn emit_pattern(&mut self, pattern: &Node<Pattern>) {
        self.out.mark(pattern.span);
        match &pattern.value {
            Pattern::Ident { name, .. } => self.out.write(&js_name(&name.value.name)),
            Pattern::Array { elements, rest } => {
                self.out.write("[");
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        self.out.write(", ");
                    }
                    if let Some(element) = element {
                        self.emit_pattern(element);
                    }
                }
                if let Some(rest) = rest {
                    if !elements.is_empty() {
                        self.out.write(", ");
                    }
                    self.out.write("...");
                    self.emit_pattern(rest);
                } else if matches!(elements.last(), Some(None)) {
                    self.out.write(",");
                }
                self.out.write("]");
            }
            Pattern::Object { properties, rest } => {
                if properties.is_empty() && rest.is_none() {
                    self.out.write("{}");
                    return;
                }
                self.out.write("{ ");
                for (i, property) in properties.iter().enumerate() {
                    if i > 0 {
                        self.out.write(", ");
                    }
                    self.emit_pattern_property(property);
                }
                if let Some(rest) = rest {
                    if !properties.is_empty() {
                        self.out.write(", ");
                    }
                    self.out.write("...");
                    self.emit_pattern(rest);
                }
                self.out.write(" }");
            }
            Pattern::Assignment { pattern, default } => {
                self.emit_pattern(pattern);
                self.out.write(" = ");
                self.emit_expr(default);
            }
        }
    }

    fn emit_pattern_property(&mut self, property: &ObjectPatternProperty) {
        if property.shorthand {
            if let PropertyName::Ident(key) = &property.key {
                let local = js_name(&key.value.name);
                if local != key.value.name {
                    self.out.write(&format!("{}: ", key.value.name));
                }
                // `{ x = 1 }` keeps its default after the binding.
                match &property.value.value {
                    Pattern::Assignment { default, .. } => {
                        self.out.write(&local);
                        self.out.write(" = ");
                        self.emit_expr(default);
                    }
                    _ => self.out.write(&local),
                }
                return;
            }
        }
        self.emit_property_name(&property.key);
        self.out.write(": ");
        self.emit_pattern(&property.value);
    }
}

/// Number literal text; literals are never negative in the tree.
fn number_literal(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        "Infinity".to_string()
    } else {
        format_number(n)
    }
}

/// True when `expr` is written starting with `sign`, so a prefix operator
/// of the same sign would fuse into `++` or `--`.
fn starts_with_sign(expr: &Expr, sign: char) -> bool {
    match expr {
        Expr::Unary { op, .. } if !op.is_postfix() => op.to_string().starts_with(sign),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::starts_ambiguously;

    #[test]
    fn test_number_literals() {
        assert_eq!(number_literal(1.0), "1");
        assert_eq!(number_literal(0.5), "0.5");
        assert_eq!(number_literal(f64::INFINITY), "Infinity");
    }

    #[test]
    fn test_ambiguous_statement_starts() {
        let object = Expr::Object(Vec::new());
        assert!(starts_ambiguously(&object));
        assert!(!starts_ambiguously(&Expr::This));
    }
}
