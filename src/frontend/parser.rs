use tracing::debug;

use crate::{
    diagnostics::{Diagnostic, DiagnosticKind},
    frontend::{
        SourceFile,
        ast::{
            Expression, ExpressionKind, FunctionDeclaration, Identifier, Parameter, Program,
            Statement, StatementKind,
            operator::Operator,
            ty::{Type, Value},
        },
        lexer::{Keyword, Lexer, Span, Token, TokenKind},
    },
    report,
};

/// Raised once a syntax error has been reported and parsing cannot continue
#[derive(Debug)]
struct Fatal;

type ParseResult<T> = Result<T, Fatal>;

#[derive(Debug)]
pub struct Parser<'source> {
    lexer: Lexer<'source>,
    diagnostics: Vec<Diagnostic>,
}

impl<'source> Parser<'source> {
    /// Parses a whole source file. If a fatal syntax error is hit, the
    /// functions parsed so far are returned along with the diagnostics.
    pub fn parse_program(source_file: &'source SourceFile) -> (Program, Vec<Diagnostic>) {
        let mut parser = Self {
            lexer: Lexer::new(source_file),
            diagnostics: Vec::new(),
        };

        let mut program = Program {
            span: Span::new(0, source_file.contents.len()),
            decls: Vec::new(),
        };

        while parser.lexer.peek().is_some() {
            match parser.parse_function_declaration() {
                Ok(decl) => program.decls.push(decl),
                Err(Fatal) => break,
            }
        }

        debug!(
            functions = program.decls.len(),
            diagnostics = parser.diagnostics.len(),
            "parsed program"
        );

        (program, parser.diagnostics)
    }

    fn report_fatal_error<T>(&mut self, offending_span: Span, message: String) -> ParseResult<T> {
        report!(
            self.diagnostics,
            offending_span,
            DiagnosticKind::ParserError,
            "{message}"
        );

        Err(Fatal)
    }

    fn report_unexpected<T>(&mut self, token: &Token, expecting: &str) -> ParseResult<T> {
        let message = match token.kind {
            TokenKind::UnterminatedString => "Unterminated string literal".to_string(),
            TokenKind::Unknown => format!(
                "Unexpected character `{}`",
                self.lexer.source().value_of_span(token.span)
            ),
            kind => format!(
                "Expected {expecting} but found {:?} ({})",
                kind,
                self.lexer.source().value_of_span(token.span)
            ),
        };

        self.report_fatal_error(token.span, message)
    }

    fn expect_peek(&mut self, expecting: &str) -> ParseResult<Token> {
        match self.lexer.peek() {
            Some(token) => Ok(token),
            None => {
                let end = self.lexer.position();
                self.report_fatal_error(
                    Span::new(end, end),
                    format!("Expected {expecting} but reached end of file"),
                )
            }
        }
    }

    fn expect_next(&mut self, expecting: &str) -> ParseResult<Token> {
        let token = self.expect_peek(expecting)?;
        self.lexer.next();
        Ok(token)
    }

    fn expect_next_to_be(&mut self, kind: TokenKind) -> ParseResult<Token> {
        let token = self.expect_next(&format!("{kind:?}"))?;

        if token.kind != kind {
            return self.report_unexpected(&token, &format!("{kind:?}"));
        }

        Ok(token)
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> ParseResult<Token> {
        self.expect_next_to_be(TokenKind::Keyword(keyword))
    }

    fn next_is(&mut self, kind: TokenKind) -> bool {
        self.lexer.peek().is_some_and(|t| t.kind == kind)
    }

    /// int name(int a, string b) { ... }
    fn parse_function_declaration(&mut self) -> ParseResult<FunctionDeclaration> {
        let (return_type, type_span) = self.parse_type()?;
        let name = self.parse_identifier()?;

        self.expect_next_to_be(TokenKind::OpenParen)?;

        let mut params = Vec::new();

        if !self.next_is(TokenKind::CloseParen) {
            params.push(self.parse_parameter()?);

            while self.next_is(TokenKind::Comma) {
                self.expect_next_to_be(TokenKind::Comma)?;
                params.push(self.parse_parameter()?);
            }
        }

        self.expect_next_to_be(TokenKind::CloseParen)?;

        let body = self.parse_block()?;

        Ok(FunctionDeclaration {
            span: type_span.to(body.span),
            return_type,
            name,
            params,
            body,
        })
    }

    // int a
    fn parse_parameter(&mut self) -> ParseResult<Parameter> {
        let (ty, type_span) = self.parse_type()?;
        let name = self.parse_identifier()?;

        Ok(Parameter {
            span: type_span.to(name.span),
            ty,
            name,
        })
    }

    // int | boolean | string | void
    fn parse_type(&mut self) -> ParseResult<(Type, Span)> {
        let token = self.expect_next("type")?;

        let ty = match token.kind {
            TokenKind::Keyword(Keyword::Int) => Type::Int,
            TokenKind::Keyword(Keyword::Boolean) => Type::Bool,
            TokenKind::Keyword(Keyword::String) => Type::String,
            TokenKind::Keyword(Keyword::Void) => Type::Void,
            _ => return self.report_unexpected(&token, "type"),
        };

        Ok((ty, token.span))
    }

    // main
    fn parse_identifier(&mut self) -> ParseResult<Identifier> {
        let token = self.expect_next_to_be(TokenKind::Identifier)?;

        Ok(Identifier {
            span: token.span,
            name: self.lexer.source().value_of_span(token.span).to_string(),
        })
    }

    fn parse_block(&mut self) -> ParseResult<Statement> {
        let mut statements = Vec::new();

        let open_brace = self.expect_next_to_be(TokenKind::OpenBrace)?;

        while self.expect_peek("statement or closing brace")?.kind != TokenKind::CloseBrace {
            self.parse_statement(&mut statements)?;
        }

        let close_brace = self.expect_next_to_be(TokenKind::CloseBrace)?;

        Ok(Statement::new(
            open_brace.span.to(close_brace.span),
            StatementKind::Block(statements),
        ))
    }

    /// Parses the body of an `if` or `while`. Declarations expand to several
    /// statements, in which case they are wrapped in a block of their own.
    fn parse_embedded_statement(&mut self) -> ParseResult<Statement> {
        let start = self.expect_peek("statement")?.span;
        let mut statements = Vec::new();

        self.parse_statement(&mut statements)?;

        if statements.len() == 1 {
            return Ok(statements.remove(0));
        }

        let span = statements
            .iter()
            .fold(start, |span, statement| span.to(statement.span));

        Ok(Statement::new(span, StatementKind::Block(statements)))
    }

    /// Parses one source statement, appending what it desugars to. An empty
    /// statement (`;`) appends nothing.
    fn parse_statement(&mut self, out: &mut Vec<Statement>) -> ParseResult<()> {
        let peeked = self.expect_peek("statement")?;

        match peeked.kind {
            TokenKind::Semicolon => {
                self.lexer.next();
            }
            TokenKind::OpenBrace => out.push(self.parse_block()?),
            TokenKind::Keyword(Keyword::If) => out.push(self.parse_if_statement()?),
            TokenKind::Keyword(Keyword::While) => out.push(self.parse_while_statement()?),
            TokenKind::Keyword(Keyword::Return) => out.push(self.parse_return_statement()?),
            kind if kind.is_type_keyword() => self.parse_declaration(out)?,
            TokenKind::Identifier => {
                let following = self.lexer.peek_nth(1).map(|t| t.kind);

                match following {
                    Some(TokenKind::Equals) => out.push(self.parse_assignment()?),
                    Some(TokenKind::Increment) => {
                        out.push(self.parse_step_assignment(Operator::Add)?)
                    }
                    Some(TokenKind::Decrement) => {
                        out.push(self.parse_step_assignment(Operator::Subtract)?)
                    }
                    _ => out.push(self.parse_free_expression()?),
                }
            }
            _ => out.push(self.parse_free_expression()?),
        }

        Ok(())
    }

    /// int a = 1, b;
    ///
    /// Every declared name becomes a declaration followed by the assignment
    /// of its initializer (or the type's default value).
    fn parse_declaration(&mut self, out: &mut Vec<Statement>) -> ParseResult<()> {
        let (ty, _) = self.parse_type()?;

        loop {
            let name = self.parse_identifier()?;

            let mut initializer = if self.next_is(TokenKind::Equals) {
                self.expect_next_to_be(TokenKind::Equals)?;
                self.parse_expression()?
            } else {
                self.default_initializer(&ty, &name)
            };

            initializer.ignore_names.push(name.name.clone());

            out.push(Statement::new(
                name.span,
                StatementKind::Declaration {
                    ty: ty.clone(),
                    name: name.clone(),
                },
            ));
            out.push(Statement::new(
                name.span.to(initializer.span),
                StatementKind::Assignment {
                    target: name,
                    expression: Box::new(initializer),
                },
            ));

            if !self.next_is(TokenKind::Comma) {
                break;
            }

            self.expect_next_to_be(TokenKind::Comma)?;
        }

        self.expect_next_to_be(TokenKind::Semicolon)?;

        Ok(())
    }

    fn default_initializer(&mut self, ty: &Type, name: &Identifier) -> Expression {
        let kind = match ty.default_value() {
            Some(Value::Int(value)) => ExpressionKind::IConstant(value),
            Some(Value::Bool(value)) => ExpressionKind::BConstant(value),
            Some(Value::String(value)) => ExpressionKind::SConstant(value),
            None => {
                report!(
                    self.diagnostics,
                    name.span,
                    DiagnosticKind::NoDefaultValue,
                    "Variable {} of type {} has no default value and must be initialized",
                    name.name,
                    ty
                );

                ExpressionKind::Error
            }
        };

        Expression::new(name.span, kind)
    }

    // x = e;
    fn parse_assignment(&mut self) -> ParseResult<Statement> {
        let target = self.parse_identifier()?;

        self.expect_next_to_be(TokenKind::Equals)?;

        let expression = self.parse_expression()?;
        let semicolon = self.expect_next_to_be(TokenKind::Semicolon)?;

        Ok(Statement::new(
            target.span.to(semicolon.span),
            StatementKind::Assignment {
                target,
                expression: Box::new(expression),
            },
        ))
    }

    /// x++; and x--;
    ///
    /// Desugared to `x = x + 1` and `x = x - 1`
    fn parse_step_assignment(&mut self, operator: Operator) -> ParseResult<Statement> {
        let target = self.parse_identifier()?;
        let step = self.expect_next("increment or decrement")?;
        let semicolon = self.expect_next_to_be(TokenKind::Semicolon)?;

        let expression = Expression::operator_application(
            target.span.to(step.span),
            operator,
            step.span,
            vec![
                Expression::new(target.span, ExpressionKind::Variable(target.name.clone())),
                Expression::new(step.span, ExpressionKind::IConstant(1)),
            ],
        );

        Ok(Statement::new(
            target.span.to(semicolon.span),
            StatementKind::Assignment {
                target,
                expression: Box::new(expression),
            },
        ))
    }

    // f(x);
    fn parse_free_expression(&mut self) -> ParseResult<Statement> {
        let expression = self.parse_expression()?;
        let semicolon = self.expect_next_to_be(TokenKind::Semicolon)?;

        Ok(Statement::new(
            expression.span.to(semicolon.span),
            StatementKind::FreeExpression(Box::new(expression)),
        ))
    }

    // return e;
    fn parse_return_statement(&mut self) -> ParseResult<Statement> {
        let return_keyword = self.expect_keyword(Keyword::Return)?;

        let value = if self.next_is(TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };

        let semicolon = self.expect_next_to_be(TokenKind::Semicolon)?;

        Ok(Statement::new(
            return_keyword.span.to(semicolon.span),
            StatementKind::Return(value),
        ))
    }

    /// if (c) s
    /// if (c) s else s
    ///
    /// An `else` always belongs to the closest `if`. When that `if` is itself
    /// the unbraced body of an `if` without an `else`, the reader could have
    /// meant either, so it is reported.
    fn parse_if_statement(&mut self) -> ParseResult<Statement> {
        let if_keyword = self.expect_keyword(Keyword::If)?;
        let condition = self.parse_condition()?;
        let then_branch = self.parse_embedded_statement()?;

        let else_branch = if self.next_is(TokenKind::Keyword(Keyword::Else)) {
            self.expect_keyword(Keyword::Else)?;
            Some(Box::new(self.parse_embedded_statement()?))
        } else {
            None
        };

        if else_branch.is_none()
            && matches!(
                &then_branch.kind,
                StatementKind::If {
                    else_branch: Some(_),
                    ..
                }
            )
        {
            report!(
                self.diagnostics,
                then_branch.span,
                DiagnosticKind::AmbiguousElse,
                "Ambiguous else branch; add braces to show which if it belongs to"
            );
        }

        let end = else_branch
            .as_ref()
            .map(|s| s.span)
            .unwrap_or(then_branch.span);

        Ok(Statement::new(
            if_keyword.span.to(end),
            StatementKind::If {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch,
            },
        ))
    }

    // while (c) s
    fn parse_while_statement(&mut self) -> ParseResult<Statement> {
        let while_keyword = self.expect_keyword(Keyword::While)?;
        let condition = self.parse_condition()?;
        let body = self.parse_embedded_statement()?;

        Ok(Statement::new(
            while_keyword.span.to(body.span),
            StatementKind::While {
                condition: Box::new(condition),
                body: Box::new(body),
            },
        ))
    }

    // ( e )
    fn parse_condition(&mut self) -> ParseResult<Expression> {
        self.expect_next_to_be(TokenKind::OpenParen)?;
        let condition = self.parse_expression()?;
        self.expect_next_to_be(TokenKind::CloseParen)?;

        Ok(condition)
    }

    /// expression     -> logical_or
    /// logical_or     -> logical_and ( "||" logical_and )*
    /// logical_and    -> equality ( "&&" equality )*
    /// equality       -> comparison ( ( "==" | "!=" ) comparison )*
    /// comparison     -> term ( ( "<" | "<=" | ">" | ">=" ) term )*
    /// term           -> factor ( ( "-" | "+" ) factor )*
    /// factor         -> unary ( ( "/" | "*" | "%" ) unary )*
    /// unary          -> ( "!" | "-" ) unary
    ///                   | atom
    /// atom           -> IDENTIFIER ( "(" ( expression ( "," expression )* )? ")" )?
    ///                   | NUMBER | STRING | BOOL
    ///                   | "(" expression ")"
    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_logical_or_expression()
    }

    /// Folds `next ( op next )*` into left associative applications
    fn parse_binary_layer(
        &mut self,
        is_operator: fn(TokenKind) -> bool,
        next: fn(&mut Self) -> ParseResult<Expression>,
    ) -> ParseResult<Expression> {
        let mut expression = next(self)?;

        while self.lexer.peek().is_some_and(|t| is_operator(t.kind)) {
            let operator = self.expect_next("binary operator")?;
            let rhs = next(self)?;

            expression = Expression::operator_application(
                expression.span.to(rhs.span),
                binary_operator(operator.kind),
                operator.span,
                vec![expression, rhs],
            );
        }

        Ok(expression)
    }

    fn parse_logical_or_expression(&mut self) -> ParseResult<Expression> {
        self.parse_binary_layer(
            |kind| kind == TokenKind::LogicalOr,
            Self::parse_logical_and_expression,
        )
    }

    fn parse_logical_and_expression(&mut self) -> ParseResult<Expression> {
        self.parse_binary_layer(
            |kind| kind == TokenKind::LogicalAnd,
            Self::parse_equality_expression,
        )
    }

    fn parse_equality_expression(&mut self) -> ParseResult<Expression> {
        self.parse_binary_layer(
            |kind| kind.is_equality_operator(),
            Self::parse_comparison_expression,
        )
    }

    fn parse_comparison_expression(&mut self) -> ParseResult<Expression> {
        self.parse_binary_layer(
            |kind| kind.is_comparison_operator(),
            Self::parse_term_expression,
        )
    }

    fn parse_term_expression(&mut self) -> ParseResult<Expression> {
        self.parse_binary_layer(
            |kind| kind.is_term_operator(),
            Self::parse_factor_expression,
        )
    }

    fn parse_factor_expression(&mut self) -> ParseResult<Expression> {
        self.parse_binary_layer(
            |kind| kind.is_factor_operator(),
            Self::parse_unary_expression,
        )
    }

    fn parse_unary_expression(&mut self) -> ParseResult<Expression> {
        if !self.expect_peek("expression")?.kind.is_unary_operator() {
            return self.parse_atomic_expression();
        }

        let operator = self.expect_next("unary operator")?;

        // A negated literal is range checked as a whole so the smallest int
        // can be written
        if operator.kind == TokenKind::Minus && self.next_is(TokenKind::IntegerLiteral) {
            let literal = self.expect_next("integer literal")?;
            let value = self.parse_integer_literal(&literal, true)?;

            return Ok(Expression::new(
                operator.span.to(literal.span),
                ExpressionKind::IConstant(value),
            ));
        }

        let operand = self.parse_unary_expression()?;

        let operator_kind = match operator.kind {
            TokenKind::Bang => Operator::Not,
            _ => Operator::Negate,
        };

        Ok(Expression::operator_application(
            operator.span.to(operand.span),
            operator_kind,
            operator.span,
            vec![operand],
        ))
    }

    fn parse_atomic_expression(&mut self) -> ParseResult<Expression> {
        let token = self.expect_next("expression")?;
        let text = self.lexer.source().value_of_span(token.span);

        let kind = match token.kind {
            TokenKind::Identifier if self.next_is(TokenKind::OpenParen) => {
                let function = Expression::new(token.span, ExpressionKind::Variable(text.into()));
                let (arguments, close_paren) = self.parse_parenthesized_list()?;

                return Ok(Expression::new(
                    token.span.to(close_paren),
                    ExpressionKind::Application {
                        function: Box::new(function),
                        arguments,
                    },
                ));
            }
            TokenKind::Identifier => ExpressionKind::Variable(text.into()),
            TokenKind::BooleanLiteral => ExpressionKind::BConstant(text == "true"),
            TokenKind::IntegerLiteral => {
                ExpressionKind::IConstant(self.parse_integer_literal(&token, false)?)
            }
            TokenKind::StringLiteral => ExpressionKind::SConstant(unescape(text)),
            TokenKind::OpenParen => return self.parse_grouping_expression(token),
            _ => return self.report_unexpected(&token, "expression"),
        };

        Ok(Expression::new(token.span, kind))
    }

    fn parse_integer_literal(&mut self, literal: &Token, negated: bool) -> ParseResult<i32> {
        let text = self.lexer.source().value_of_span(literal.span);

        let value = text
            .parse::<i64>()
            .ok()
            .map(|value| if negated { -value } else { value })
            .and_then(|value| i32::try_from(value).ok());

        match value {
            Some(value) => Ok(value),
            None => self.report_fatal_error(
                literal.span,
                format!(
                    "Integer literal {}{text} does not fit in 32 bits",
                    if negated { "-" } else { "" }
                ),
            ),
        }
    }

    /// ( e )
    ///
    /// Anything other than exactly one expression between the parentheses is
    /// reported and replaced by a placeholder.
    fn parse_grouping_expression(&mut self, open_paren: Token) -> ParseResult<Expression> {
        let mut expressions = Vec::new();

        if !self.next_is(TokenKind::CloseParen) {
            expressions.push(self.parse_expression()?);

            while self.next_is(TokenKind::Comma) {
                self.expect_next_to_be(TokenKind::Comma)?;
                expressions.push(self.parse_expression()?);
            }
        }

        let close_paren = self.expect_next_to_be(TokenKind::CloseParen)?;
        let span = open_paren.span.to(close_paren.span);

        if expressions.len() == 1 {
            let mut expression = expressions.remove(0);
            expression.span = span;
            return Ok(expression);
        }

        report!(
            self.diagnostics,
            span,
            DiagnosticKind::MalformedParenExpr,
            "Expected a single expression in parentheses but found {}",
            expressions.len()
        );

        Ok(Expression::new(span, ExpressionKind::Error))
    }

    // (a, b, c)
    fn parse_parenthesized_list(&mut self) -> ParseResult<(Vec<Expression>, Span)> {
        self.expect_next_to_be(TokenKind::OpenParen)?;

        let mut expressions = Vec::new();

        if !self.next_is(TokenKind::CloseParen) {
            expressions.push(self.parse_expression()?);

            while self.next_is(TokenKind::Comma) {
                self.expect_next_to_be(TokenKind::Comma)?;
                expressions.push(self.parse_expression()?);
            }
        }

        let close_paren = self.expect_next_to_be(TokenKind::CloseParen)?;

        Ok((expressions, close_paren.span))
    }
}

fn binary_operator(kind: TokenKind) -> Operator {
    match kind {
        TokenKind::LogicalOr => Operator::LogicalOr,
        TokenKind::LogicalAnd => Operator::LogicalAnd,
        TokenKind::DoubleEquals => Operator::Equals,
        TokenKind::NotEquals => Operator::NotEquals,
        TokenKind::LessThan => Operator::LessThan,
        TokenKind::LessThanOrEqualTo => Operator::LessThanOrEqualTo,
        TokenKind::GreaterThan => Operator::GreaterThan,
        TokenKind::GreaterThanOrEqualTo => Operator::GreaterThanOrEqualTo,
        TokenKind::Plus => Operator::Add,
        TokenKind::Minus => Operator::Subtract,
        TokenKind::Asterisk => Operator::Multiply,
        TokenKind::Divide => Operator::Divide,
        TokenKind::Modulus => Operator::Modulus,
        kind => unreachable!("{kind:?} is not a binary operator"),
    }
}

/// Strips the quotes off a string literal and resolves escape sequences
fn unescape(literal: &str) -> String {
    let inner = &literal[1..literal.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    fn parse(source: &str) -> (Program, Vec<Diagnostic>) {
        let source = SourceFile::from_memory(source);
        Parser::parse_program(&source)
    }

    fn parse_ok(source: &str) -> Program {
        let (program, diagnostics) = parse(source);
        assert!(diagnostics.is_empty(), "{diagnostics:#?}");
        program
    }

    fn body(program: &Program, index: usize) -> &[Statement] {
        match &program.decls[index].body.kind {
            StatementKind::Block(statements) => statements,
            _ => panic!("function body is not a block"),
        }
    }

    fn kinds(source: &str) -> Vec<DiagnosticKind> {
        parse(source).1.into_iter().map(|d| d.kind).collect()
    }

    #[test]
    fn declarations_desugar_to_declaration_and_assignment() {
        let program = parse_ok("int main() { int a = 1, b; return b; }");
        let statements = body(&program, 0);

        assert_eq!(statements.len(), 5);

        let StatementKind::Assignment { target, expression } = &statements[1].kind else {
            panic!("expected assignment");
        };
        assert_eq!(target.name, "a");
        assert_eq!(expression.kind, ExpressionKind::IConstant(1));
        assert_eq!(expression.ignore_names, ["a"]);

        let StatementKind::Assignment { target, expression } = &statements[3].kind else {
            panic!("expected assignment");
        };
        assert_eq!(target.name, "b");
        assert_eq!(expression.kind, ExpressionKind::IConstant(0));
    }

    #[test]
    fn default_values_per_type() {
        let program = parse_ok("void f() { boolean b; string s; }");
        let statements = body(&program, 0);

        let defaults = statements
            .iter()
            .filter_map(|s| match &s.kind {
                StatementKind::Assignment { expression, .. } => Some(expression.kind.clone()),
                _ => None,
            })
            .collect::<Vec<_>>();

        assert_eq!(
            defaults,
            [
                ExpressionKind::BConstant(false),
                ExpressionKind::SConstant(String::new())
            ]
        );
    }

    #[test]
    fn void_variable_has_no_default() {
        assert_eq!(
            kinds("int main() { void v; return 0; }"),
            [DiagnosticKind::NoDefaultValue]
        );
    }

    #[test]
    fn increment_desugars_to_addition() {
        let program = parse_ok("int main() { int x; x++; return x; }");
        let statements = body(&program, 0);

        let StatementKind::Assignment { target, expression } = &statements[2].kind else {
            panic!("expected assignment");
        };
        assert_eq!(target.name, "x");

        let ExpressionKind::Application {
            function,
            arguments,
        } = &expression.kind
        else {
            panic!("expected application");
        };
        assert!(matches!(
            function.kind,
            ExpressionKind::Operator {
                operator: Operator::Add,
                instance: None
            }
        ));
        assert_eq!(arguments[0].kind, ExpressionKind::Variable("x".into()));
        assert_eq!(arguments[1].kind, ExpressionKind::IConstant(1));
    }

    fn operator_of(expression: &Expression) -> Operator {
        match &expression.kind {
            ExpressionKind::Application { function, .. } => match function.kind {
                ExpressionKind::Operator { operator, .. } => operator,
                _ => panic!("not an operator application"),
            },
            _ => panic!("not an application"),
        }
    }

    fn arguments_of(expression: &Expression) -> &[Expression] {
        match &expression.kind {
            ExpressionKind::Application { arguments, .. } => arguments,
            _ => panic!("not an application"),
        }
    }

    #[test]
    fn precedence_and_left_associativity() {
        let program = parse_ok("int main() { return 1 - 2 - 3 * 4 < 5 || !b && c == d; }");
        let StatementKind::Return(Some(value)) = &body(&program, 0)[0].kind else {
            panic!("expected return");
        };

        assert_eq!(operator_of(value), Operator::LogicalOr);

        let [comparison, conjunction] = arguments_of(value) else {
            panic!("expected two operands");
        };
        assert_eq!(operator_of(comparison), Operator::LessThan);
        assert_eq!(operator_of(conjunction), Operator::LogicalAnd);

        // (1 - 2) - (3 * 4)
        let difference = &arguments_of(comparison)[0];
        assert_eq!(operator_of(difference), Operator::Subtract);
        assert_eq!(operator_of(&arguments_of(difference)[0]), Operator::Subtract);
        assert_eq!(operator_of(&arguments_of(difference)[1]), Operator::Multiply);

        assert_eq!(operator_of(&arguments_of(conjunction)[0]), Operator::Not);
        assert_eq!(operator_of(&arguments_of(conjunction)[1]), Operator::Equals);
    }

    #[test]
    fn calls_and_groupings() {
        let program = parse_ok(indoc! {r#"
            void main() {
                printString("a\"b");
                f((1 + 2) * 3, g());
            }
        "#});
        let statements = body(&program, 0);

        let StatementKind::FreeExpression(call) = &statements[0].kind else {
            panic!("expected free expression");
        };
        let ExpressionKind::Application { arguments, .. } = &call.kind else {
            panic!("expected call");
        };
        assert_eq!(arguments[0].kind, ExpressionKind::SConstant("a\"b".into()));

        let StatementKind::FreeExpression(call) = &statements[1].kind else {
            panic!("expected free expression");
        };
        let arguments = arguments_of(call);
        assert_eq!(arguments.len(), 2);
        assert_eq!(operator_of(&arguments[0]), Operator::Multiply);
        assert!(matches!(
            &arguments[1].kind,
            ExpressionKind::Application { arguments, .. } if arguments.is_empty()
        ));
    }

    #[test]
    fn malformed_parens_become_placeholders() {
        let (program, diagnostics) = parse("int main() { return (1, 2); }");

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::MalformedParenExpr);

        let StatementKind::Return(Some(value)) = &body(&program, 0)[0].kind else {
            panic!("expected return");
        };
        assert_eq!(value.kind, ExpressionKind::Error);
    }

    #[test]
    fn dangling_else_is_reported() {
        let source = indoc! {"
            int main() {
                if (a) if (b) return 1; else return 2;
                return 0;
            }
        "};

        assert_eq!(kinds(source), [DiagnosticKind::AmbiguousElse]);

        let braced = indoc! {"
            int main() {
                if (a) { if (b) return 1; else return 2; }
                if (a) if (b) return 1; else return 2; else return 3;
                return 0;
            }
        "};

        assert!(kinds(braced).is_empty());
    }

    #[test]
    fn syntax_error_stops_parsing() {
        let (program, diagnostics) = parse(indoc! {"
            int f() { return 1; }
            int main() { return 1 +; }
            int g() { return 2; }
        "});

        assert_eq!(program.decls.len(), 1);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::ParserError);
    }

    #[test]
    fn integer_literal_must_fit() {
        assert_eq!(
            kinds("int main() { return 2147483648; }"),
            [DiagnosticKind::ParserError]
        );
        assert_eq!(
            kinds("int main() { return -2147483649; }"),
            [DiagnosticKind::ParserError]
        );
    }

    #[test]
    fn negated_literal_is_read_whole() {
        let program = parse_ok("int main() { return -2147483648; }");

        let StatementKind::Return(Some(value)) = &body(&program, 0)[0].kind else {
            panic!("expected return");
        };
        assert_eq!(value.kind, ExpressionKind::IConstant(i32::MIN));

        let program = parse_ok("int main() { return -(1); }");

        let StatementKind::Return(Some(value)) = &body(&program, 0)[0].kind else {
            panic!("expected return");
        };
        assert!(matches!(value.kind, ExpressionKind::Application { .. }));
    }

    #[test]
    fn embedded_declaration_gets_its_own_block() {
        let program = parse_ok("void f() { if (true) int x = 1; while (false) ; }");
        let statements = body(&program, 0);

        let StatementKind::If { then_branch, .. } = &statements[0].kind else {
            panic!("expected if");
        };
        assert!(matches!(&then_branch.kind, StatementKind::Block(s) if s.len() == 2));

        let StatementKind::While { body, .. } = &statements[1].kind else {
            panic!("expected while");
        };
        assert_eq!(body.kind, StatementKind::Block(Vec::new()));
    }
}
