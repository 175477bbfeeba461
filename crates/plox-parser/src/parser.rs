//! Recursive-descent parser with panic-mode recovery.
//!
//! Grounded in the teacher's `vais-parser::Parser` shape — a struct that
//! tracks `current`/`previous` tokens and exposes `advance`/`check`/
//! `match_token`/`expect`/`synchronize` — adapted from streaming-off-a-
//! lexer to indexing into the scanner's pre-materialized `Vec<Token>`,
//! and from a `Result`-returning error type to reporting through the
//! shared `ErrorSink` so the driver can recover and keep parsing after
//! a syntax error instead of aborting on the first one.

use plox_ast::{ClassDecl, Expr, FunctionDecl, LiteralValue, Stmt};
use plox_lexer::{ErrorSink, Token, TokenKind};
use std::rc::Rc;

const MAX_ARGS: usize = 255;

pub struct Parser<'a> {
    tokens: Vec<Token>,
    current: usize,
    sink: &'a mut dyn ErrorSink,
}

/// Unwinds to the nearest `synchronize` point; carries no payload since
/// the error itself was already reported through the sink at the point
/// it was raised.
struct ParseError;

type ParseResult<T> = Result<T, ParseError>;

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, sink: &'a mut dyn ErrorSink) -> Self {
        Self {
            tokens,
            current: 0,
            sink,
        }
    }

    /// Parses a full program, recovering at statement boundaries after
    /// each syntax error so a single file can report more than one.
    pub fn parse(mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(ParseError) => self.synchronize(),
            }
        }
        statements
    }

    // ---- token-stream primitives ----

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn check(&self, kind: &TokenKind) -> bool {
        !self.is_at_end() && &self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous().clone()
    }

    fn matches(&mut self, kinds: &[TokenKind]) -> bool {
        for kind in kinds {
            if self.check(kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> ParseResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error(message))
        }
    }

    fn error(&mut self, message: &str) -> ParseError {
        let token = self.peek().clone();
        self.sink.error(&token, message);
        ParseError
    }

    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }

            if matches!(
                self.peek().kind,
                TokenKind::Class
                    | TokenKind::Fun
                    | TokenKind::Var
                    | TokenKind::For
                    | TokenKind::If
                    | TokenKind::While
                    | TokenKind::Print
                    | TokenKind::Return
            ) {
                return;
            }

            self.advance();
        }
    }

    // ---- declarations ----

    fn declaration(&mut self) -> ParseResult<Stmt> {
        if self.matches(&[TokenKind::Class]) {
            self.class_declaration()
        } else if self.matches(&[TokenKind::Fun]) {
            self.function_declaration("function")
                .map(|f| Stmt::Function(Rc::new(f)))
        } else if self.matches(&[TokenKind::Var]) {
            self.var_declaration()
        } else {
            self.statement()
        }
    }

    fn class_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expect class name.")?;

        let superclass = if self.matches(&[TokenKind::Less]) {
            let super_name = self.consume(TokenKind::Identifier, "Expect superclass name.")?;
            Some(Expr::variable(super_name))
        } else {
            None
        };

        self.consume(TokenKind::LeftBrace, "Expect '{' before class body.")?;

        let mut methods = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            methods.push(Rc::new(self.function_declaration("method")?));
        }

        self.consume(TokenKind::RightBrace, "Expect '}' after class body.")?;

        Ok(Stmt::Class(Rc::new(ClassDecl {
            name,
            superclass,
            methods,
        })))
    }

    fn function_declaration(&mut self, kind: &str) -> ParseResult<FunctionDecl> {
        let name = self.consume(TokenKind::Identifier, &format!("Expect {kind} name."))?;

        self.consume(
            TokenKind::LeftParen,
            &format!("Expect '(' after {kind} name."),
        )?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                if params.len() >= MAX_ARGS {
                    self.error("Can't have more than 255 parameters.");
                }
                params.push(self.consume(TokenKind::Identifier, "Expect parameter name.")?);
                if !self.matches(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.")?;

        self.consume(
            TokenKind::LeftBrace,
            &format!("Expect '{{' before {kind} body."),
        )?;
        let body = self.block()?;

        Ok(FunctionDecl {
            name,
            params,
            body: Rc::new(body),
        })
    }

    fn var_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expect variable name.")?;

        let initializer = if self.matches(&[TokenKind::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenKind::Semicolon,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Stmt::Var { name, initializer })
    }

    // ---- statements ----

    fn statement(&mut self) -> ParseResult<Stmt> {
        if self.matches(&[TokenKind::Print]) {
            self.print_statement()
        } else if self.matches(&[TokenKind::LeftBrace]) {
            self.block().map(Stmt::Block)
        } else if self.matches(&[TokenKind::If]) {
            self.if_statement()
        } else if self.matches(&[TokenKind::While]) {
            self.while_statement()
        } else if self.matches(&[TokenKind::For]) {
            self.for_statement()
        } else if self.matches(&[TokenKind::Return]) {
            self.return_statement()
        } else {
            self.expression_statement()
        }
    }

    fn print_statement(&mut self) -> ParseResult<Stmt> {
        let value = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::Print(value))
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();
        let value = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.matches(&[TokenKind::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after condition.")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    /// Desugars into a `while` wrapped in a block, per the classic
    /// "for is syntactic sugar" treatment — no dedicated AST node.
    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.matches(&[TokenKind::Semicolon]) {
            None
        } else if self.matches(&[TokenKind::Var]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if self.check(&TokenKind::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        let condition = condition.unwrap_or_else(|| Expr::literal(LiteralValue::Boolean(true)));
        body = Stmt::While {
            condition,
            body: Box::new(body),
        };

        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }

        Ok(body)
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    // ---- expressions, lowest to highest precedence ----

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.or()?;

        if self.matches(&[TokenKind::Equal]) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            return match expr {
                Expr::Variable { name, .. } => Ok(Expr::assign(name, value)),
                Expr::Get { object, name, .. } => Ok(Expr::set(*object, name, value)),
                _ => {
                    self.sink.error(&equals, "Invalid assignment target.");
                    Ok(expr)
                }
            };
        }

        Ok(expr)
    }

    fn or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.and()?;
        while self.matches(&[TokenKind::Or]) {
            let op = self.previous().clone();
            let right = self.and()?;
            expr = Expr::logical(expr, op, right);
        }
        Ok(expr)
    }

    fn and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;
        while self.matches(&[TokenKind::And]) {
            let op = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::logical(expr, op, right);
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;
        while self.matches(&[TokenKind::BangEqual, TokenKind::EqualEqual]) {
            let op = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::binary(expr, op, right);
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.term()?;
        while self.matches(&[
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
        ]) {
            let op = self.previous().clone();
            let right = self.term()?;
            expr = Expr::binary(expr, op, right);
        }
        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.factor()?;
        while self.matches(&[TokenKind::Minus, TokenKind::Plus]) {
            let op = self.previous().clone();
            let right = self.factor()?;
            expr = Expr::binary(expr, op, right);
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;
        while self.matches(&[TokenKind::Slash, TokenKind::Star]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::binary(expr, op, right);
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if self.matches(&[TokenKind::Bang, TokenKind::Minus]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expr::unary(op, right));
        }
        self.call()
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.matches(&[TokenKind::LeftParen]) {
                expr = self.finish_call(expr)?;
            } else if self.matches(&[TokenKind::Dot]) {
                let name = self.consume(TokenKind::Identifier, "Expect property name after '.'.")?;
                expr = Expr::get(expr, name);
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let mut args = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                if args.len() >= MAX_ARGS {
                    self.error("Can't have more than 255 arguments.");
                }
                args.push(self.expression()?);
                if !self.matches(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        let closing_paren = self.consume(TokenKind::RightParen, "Expect ')' after arguments.")?;
        Ok(Expr::call(callee, closing_paren, args))
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        if self.matches(&[TokenKind::False]) {
            return Ok(Expr::literal(LiteralValue::Boolean(false)));
        }
        if self.matches(&[TokenKind::True]) {
            return Ok(Expr::literal(LiteralValue::Boolean(true)));
        }
        if self.matches(&[TokenKind::Nil]) {
            return Ok(Expr::literal(LiteralValue::Nil));
        }

        if let TokenKind::Number(n) = self.peek().kind {
            self.advance();
            return Ok(Expr::literal(LiteralValue::Number(n)));
        }
        if matches!(self.peek().kind, TokenKind::String(_)) {
            let TokenKind::String(s) = self.advance().kind else {
                unreachable!()
            };
            return Ok(Expr::literal(LiteralValue::String(s.into())));
        }

        if self.matches(&[TokenKind::Super]) {
            let keyword = self.previous().clone();
            self.consume(TokenKind::Dot, "Expect '.' after 'super'.")?;
            let method = self.consume(TokenKind::Identifier, "Expect superclass method name.")?;
            return Ok(Expr::super_(keyword, method));
        }

        if self.matches(&[TokenKind::This]) {
            return Ok(Expr::this(self.previous().clone()));
        }

        if self.matches(&[TokenKind::Identifier]) {
            return Ok(Expr::variable(self.previous().clone()));
        }

        if self.matches(&[TokenKind::LeftParen]) {
            let expr = self.expression()?;
            self.consume(TokenKind::RightParen, "Expect ')' after expression.")?;
            return Ok(Expr::grouping(expr));
        }

        Err(self.error("Expect expression."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plox_lexer::{RecordingSink, Scanner};
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> (Vec<Stmt>, Vec<String>) {
        let mut sink = RecordingSink::default();
        let tokens = Scanner::new(source).scan_tokens(&mut sink);
        let stmts = Parser::new(tokens, &mut sink).parse();
        (stmts, sink.messages)
    }

    #[test]
    fn arithmetic_precedence_nests_star_under_plus() {
        let (stmts, errors) = parse("1 + 2 * 3;");
        assert!(errors.is_empty());
        match &stmts[0] {
            Stmt::Expression(Expr::Binary { op, right, .. }) => {
                assert_eq!(op.kind, TokenKind::Plus);
                assert!(matches!(**right, Expr::Binary { .. }));
            }
            other => panic!("expected top-level Plus binary, got {other:?}"),
        }
    }

    #[test]
    fn for_loop_desugars_to_while_in_block() {
        let (stmts, errors) = parse("for (var i = 0; i < 3; i = i + 1) print i;");
        assert!(errors.is_empty());
        match &stmts[0] {
            Stmt::Block(inner) => {
                assert_eq!(inner.len(), 2);
                assert!(matches!(inner[0], Stmt::Var { .. }));
                assert!(matches!(inner[1], Stmt::While { .. }));
            }
            other => panic!("expected desugared block, got {other:?}"),
        }
    }

    #[test]
    fn invalid_assignment_target_reports_error_without_raising_target() {
        let (_, errors) = parse("1 + 2 = 3;");
        assert_eq!(errors, vec!["[line 1] Error at '=': Invalid assignment target."]);
    }

    #[test]
    fn missing_semicolon_recovers_at_next_statement() {
        let (stmts, errors) = parse("var a = 1\nvar b = 2;");
        assert_eq!(errors.len(), 1);
        assert_eq!(stmts.len(), 1);
        assert!(matches!(stmts[0], Stmt::Var { .. }));
    }

    #[test]
    fn class_with_superclass_and_methods_parses() {
        let (stmts, errors) = parse("class B < A { greet() { print \"hi\"; } }");
        assert!(errors.is_empty());
        match &stmts[0] {
            Stmt::Class(decl) => {
                assert!(decl.superclass.is_some());
                assert_eq!(decl.methods.len(), 1);
            }
            other => panic!("expected class decl, got {other:?}"),
        }
    }
}
