use std::rc::Rc;

use crate::ast::{BinOp, Expr, FunDecl, LogicalOp, Stmt, UnaryOp};
use crate::ctx::{Context, Symbol};
use crate::diag::{Diagnostics, Position};
use crate::scanner::Scanner;
use crate::token::Token;

/// Marker unwound through `Result` when the parser loses track of the
/// grammar.  It carries nothing: the error has already been reported to the
/// diagnostics context by the time it is raised.  `declaration` catches it
/// and synchronizes to the next statement boundary.
#[derive(Debug)]
struct ParsePanic;

type ParseResult<T> = Result<T, ParsePanic>;

pub struct Parser {
    scanner: Scanner,
    ctx: Rc<Context>,
    diag: Rc<Diagnostics>,
    current_token: Token,
    current_pos: Position,

    // Retained for synchronization after a syntax error.
    prev_token: Token,
}

impl Parser {
    pub fn new(source: &str, ctx: Rc<Context>, diag: Rc<Diagnostics>) -> Parser {
        Parser {
            scanner: Scanner::new(source, ctx.clone(), diag.clone()),
            ctx,
            diag,
            current_token: Token::Eof, // we haven't scanned anything yet
            current_pos: 1,
            prev_token: Token::Eof,
        }
    }

    /// Parses a whole program.
    ///
    /// Syntax errors are reported to the diagnostics context; the slot of a
    /// declaration that failed to parse holds `Stmt::Nop`.  Callers must
    /// check the context before doing anything with the result.
    pub fn parse_program(&mut self) -> Vec<Stmt> {
        let mut prg = vec![];
        self.advance();
        while self.current_token != Token::Eof {
            prg.push(self.declaration());
        }
        prg
    }

    #[allow(dead_code)]
    fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.advance();
        self.expression()
    }

    fn declaration(&mut self) -> Stmt {
        let result = match self.current_token {
            Token::Class => self.class_decl(),
            Token::Fun => self.fun_decl(),
            Token::Var => self.var_decl(),
            _ => self.statement(),
        };
        match result {
            Ok(stmt) => stmt,
            Err(ParsePanic) => {
                self.synchronize();
                Stmt::Nop
            }
        }
    }

    /// Parses a class declaration.  Current token is `class`.
    fn class_decl(&mut self) -> ParseResult<Stmt> {
        self.advance();
        let (pos, name) = self.identifier("Expect class name.")?;
        self.consume(Token::LeftCurly, "Expect '{' before class body.")?;
        let mut methods = vec![];
        while self.current_token != Token::RightCurly && self.current_token != Token::Eof {
            methods.push(Rc::new(self.function("method")?));
        }
        self.consume(Token::RightCurly, "Expect '}' after class body.")?;
        Ok(Stmt::ClassDecl(pos, name, methods))
    }

    /// Parses a function declaration.  Current token is `fun`.
    fn fun_decl(&mut self) -> ParseResult<Stmt> {
        self.advance();
        Ok(Stmt::FunDecl(Rc::new(self.function("function")?)))
    }

    fn function(&mut self, kind: &str) -> ParseResult<FunDecl> {
        let (pos, name) = self.identifier(&format!("Expect {} name.", kind))?;
        self.consume(Token::LeftParen, &format!("Expect '(' after {} name.", kind))?;
        let mut params = vec![];
        if self.current_token != Token::RightParen {
            loop {
                if params.len() >= 255 {
                    // Soft error: the parser is not confused, so no panic.
                    self.diag.error_at(
                        self.current_pos,
                        &self.current_token,
                        "Can't have more than 255 parameters.",
                    );
                }
                params.push(self.identifier("Expect parameter name.")?);
                if !self.matches(Token::Comma) {
                    break;
                }
            }
        }
        self.consume(Token::RightParen, "Expect ')' after parameters.")?;
        self.consume(
            Token::LeftCurly,
            &format!("Expect '{{' before {} body.", kind),
        )?;
        let body = self.block()?;
        Ok(FunDecl {
            pos,
            name,
            params,
            body,
        })
    }

    /// Parses a variable declaration.  Current token is `var`.
    fn var_decl(&mut self) -> ParseResult<Stmt> {
        self.advance();
        let (pos, name) = self.identifier("Expect variable name.")?;
        let init = if self.matches(Token::Equal) {
            Some(Box::new(self.expression()?))
        } else {
            None
        };
        self.consume(Token::Semicolon, "Expect ';' after variable declaration.")?;
        Ok(Stmt::VarDecl(pos, name, init))
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        match self.current_token {
            Token::Print => {
                let pos = self.current_pos;
                self.advance();
                let expr = Box::new(self.expression()?);
                self.consume(Token::Semicolon, "Expect ';' after value.")?;
                Ok(Stmt::Print(pos, expr))
            }
            Token::LeftCurly => {
                self.advance();
                Ok(Stmt::Block(self.block()?))
            }
            Token::If => self.if_statement(),
            Token::While => self.while_statement(),
            Token::For => self.for_statement(),
            Token::Return => self.return_statement(),
            _ => self.expr_statement(),
        }
    }

    fn expr_statement(&mut self) -> ParseResult<Stmt> {
        let expr = Box::new(self.expression()?);
        self.consume(Token::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expr(expr))
    }

    /// Parses declarations up to and including the closing brace.  The
    /// opening brace has already been consumed.
    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut stmts = vec![];
        while self.current_token != Token::RightCurly && self.current_token != Token::Eof {
            stmts.push(self.declaration());
        }
        self.consume(Token::RightCurly, "Expect '}' after block.")?;
        Ok(stmts)
    }

    /// Parses an if statement.  An `else` binds to the nearest `if`.
    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.advance();
        self.consume(Token::LeftParen, "Expect '(' after 'if'.")?;
        let cond = Box::new(self.expression()?);
        self.consume(Token::RightParen, "Expect ')' after 'if' condition.")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.matches(Token::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If(cond, then_branch, else_branch))
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.advance();
        self.consume(Token::LeftParen, "Expect '(' after 'while'.")?;
        let cond = Box::new(self.expression()?);
        self.consume(Token::RightParen, "Expect ')' after 'while' condition.")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While(cond, body))
    }

    /// Parses a for statement by desugaring it into a while loop:
    /// `for (I; C; U) B` becomes `{ I; while (C) { B; U; } }`, with a
    /// missing condition standing for `true`.
    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.advance();
        self.consume(Token::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = match self.current_token {
            Token::Semicolon => {
                self.advance();
                None
            }
            Token::Var => Some(self.var_decl()?),
            _ => Some(self.expr_statement()?),
        };

        let condition = if self.current_token != Token::Semicolon {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(Token::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if self.current_token != Token::RightParen {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(Token::RightParen, "Expect ')' after loop condition.")?;

        let mut body = self.statement()?;
        if let Some(inc) = increment {
            body = Stmt::Block(vec![body, Stmt::Expr(Box::new(inc))]);
        }
        let condition = condition.unwrap_or(Expr::Bool(true));
        body = Stmt::While(Box::new(condition), Box::new(body));
        if let Some(init) = initializer {
            body = Stmt::Block(vec![init, body]);
        }
        Ok(body)
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let pos = self.current_pos;
        self.advance();
        let value = if self.current_token != Token::Semicolon {
            Some(Box::new(self.expression()?))
        } else {
            None
        };
        self.consume(Token::Semicolon, "Expect ';' after return value.")?;
        Ok(Stmt::Return(pos, value))
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    /// Parses an assignment.  The left-hand side is parsed as an ordinary
    /// expression first; only when an `=` shows up do we check that it
    /// names a storage location.
    fn assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.or()?;
        if self.current_token == Token::Equal {
            let equals_pos = self.current_pos;
            self.advance();
            let value = self.assignment()?;
            return match expr {
                Expr::Var(_, pos, name) => Ok(Expr::Assign(
                    self.ctx.next_expr_id(),
                    pos,
                    name,
                    Box::new(value),
                )),
                other => {
                    // Soft error: the parser is not confused, so no panic.
                    self.diag
                        .error_at(equals_pos, &Token::Equal, "Invalid assignment target.");
                    Ok(other)
                }
            };
        }
        Ok(expr)
    }

    fn or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.and()?;
        while self.matches(Token::Or) {
            expr = Expr::Logical(LogicalOp::Or, Box::new(expr), Box::new(self.and()?));
        }
        Ok(expr)
    }

    fn and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;
        while self.matches(Token::And) {
            expr = Expr::Logical(LogicalOp::And, Box::new(expr), Box::new(self.equality()?));
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;
        loop {
            let op = match self.current_token {
                Token::EqualEqual => BinOp::Equal,
                Token::BangEqual => BinOp::NotEqual,
                _ => break,
            };
            let pos = self.current_pos;
            self.advance();
            expr = Expr::Binary(pos, op, Box::new(expr), Box::new(self.comparison()?));
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.term()?;
        loop {
            let op = match self.current_token {
                Token::Less => BinOp::Less,
                Token::LessEqual => BinOp::LessEqual,
                Token::Greater => BinOp::Greater,
                Token::GreaterEqual => BinOp::GreaterEqual,
                _ => break,
            };
            let pos = self.current_pos;
            self.advance();
            expr = Expr::Binary(pos, op, Box::new(expr), Box::new(self.term()?));
        }
        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.factor()?;
        loop {
            let op = match self.current_token {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            let pos = self.current_pos;
            self.advance();
            expr = Expr::Binary(pos, op, Box::new(expr), Box::new(self.factor()?));
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;
        loop {
            let op = match self.current_token {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                _ => break,
            };
            let pos = self.current_pos;
            self.advance();
            expr = Expr::Binary(pos, op, Box::new(expr), Box::new(self.unary()?));
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let op = match self.current_token {
            Token::Bang => UnaryOp::Not,
            Token::Minus => UnaryOp::Neg,
            _ => return self.call(),
        };
        let pos = self.current_pos;
        self.advance();
        Ok(Expr::Unary(pos, op, Box::new(self.unary()?)))
    }

    /// Parses a call chain, so `f()()` works.
    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;
        while self.current_token == Token::LeftParen {
            self.advance();
            expr = self.finish_call(expr)?;
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let mut args = vec![];
        if self.current_token != Token::RightParen {
            loop {
                if args.len() >= 255 {
                    // Soft error: the parser is not confused, so no panic.
                    self.diag.error_at(
                        self.current_pos,
                        &self.current_token,
                        "Can't have more than 255 arguments.",
                    );
                }
                args.push(self.expression()?);
                if !self.matches(Token::Comma) {
                    break;
                }
            }
        }
        let paren_pos = self.current_pos;
        self.consume(Token::RightParen, "Expect ')' after arguments.")?;
        Ok(Expr::Call(paren_pos, Box::new(callee), args))
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let expr = match self.current_token.clone() {
            Token::False => Expr::Bool(false),
            Token::True => Expr::Bool(true),
            Token::Nil => Expr::Nil,
            Token::Number(n) => Expr::Number(n),
            Token::Str(s) => Expr::Str(s),
            Token::Identifier(sym) => Expr::Var(self.ctx.next_expr_id(), self.current_pos, sym),
            Token::LeftParen => {
                self.advance();
                let inner = self.expression()?;
                self.consume(Token::RightParen, "Expect ')' after expression.")?;
                return Ok(Expr::Group(Box::new(inner)));
            }
            _ => return Err(self.error("Expected expression")),
        };
        self.advance();
        Ok(expr)
    }

    fn identifier(&mut self, message: &str) -> ParseResult<(Position, Symbol)> {
        if let Token::Identifier(sym) = self.current_token.clone() {
            let pos = self.current_pos;
            self.advance();
            Ok((pos, sym))
        } else {
            Err(self.error(message))
        }
    }

    fn advance(&mut self) {
        let (pos, token) = self.scanner.get_token();
        self.prev_token = std::mem::replace(&mut self.current_token, token);
        self.current_pos = pos;
    }

    /// Consumes the current token if it equals `expected`.
    fn matches(&mut self, expected: Token) -> bool {
        if self.current_token == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, expected: Token, message: &str) -> ParseResult<()> {
        if self.current_token == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    /// Reports a syntax error at the current token and returns the panic
    /// marker for the caller to raise.
    fn error(&self, message: &str) -> ParsePanic {
        self.diag
            .error_at(self.current_pos, &self.current_token, message);
        ParsePanic
    }

    /// Discards tokens until a statement boundary: just past a semicolon,
    /// or just before a keyword that can start a declaration.
    fn synchronize(&mut self) {
        self.advance();
        while self.current_token != Token::Eof {
            if self.prev_token == Token::Semicolon {
                return;
            }
            match self.current_token {
                Token::Class
                | Token::Fun
                | Token::Var
                | Token::For
                | Token::If
                | Token::While
                | Token::Print
                | Token::Return => return,
                _ => self.advance(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_expr(input: &str) -> Expr {
        let ctx = Context::new();
        parse_expr_with_ctx(ctx, input)
    }

    fn parse_expr_with_ctx(ctx: Rc<Context>, input: &str) -> Expr {
        let diag = Diagnostics::new();
        let mut parser = Parser::new(input, ctx, diag.clone());
        let expr = parser.parse_expression().expect("parse failed");
        assert!(!diag.had_error(), "unexpected: {:?}", diag.take_messages());
        expr
    }

    fn parse_prg(input: &str) -> Vec<Stmt> {
        let ctx = Context::new();
        parse_prg_with_ctx(ctx, input)
    }

    fn parse_prg_with_ctx(ctx: Rc<Context>, input: &str) -> Vec<Stmt> {
        let diag = Diagnostics::new();
        let mut parser = Parser::new(input, ctx, diag.clone());
        let prg = parser.parse_program();
        assert!(!diag.had_error(), "unexpected: {:?}", diag.take_messages());
        prg
    }

    fn parse_prg_with_errors(input: &str) -> (Vec<Stmt>, Vec<String>) {
        let ctx = Context::new();
        let diag = Diagnostics::new();
        let mut parser = Parser::new(input, ctx, diag.clone());
        let prg = parser.parse_program();
        (prg, diag.take_messages())
    }

    #[test]
    fn number() {
        assert_eq!(parse_expr("42"), Expr::Number(42.0));
    }

    #[test]
    fn bool_literals() {
        assert_eq!(parse_expr("true"), Expr::Bool(true));
        assert_eq!(parse_expr("false"), Expr::Bool(false));
    }

    #[test]
    fn string_literal() {
        assert_eq!(parse_expr(r#""abc""#), Expr::Str(Rc::from("abc")));
    }

    #[test]
    fn unary_minus() {
        assert_eq!(
            parse_expr("--42"),
            Expr::Unary(
                1,
                UnaryOp::Neg,
                Box::new(Expr::Unary(
                    1,
                    UnaryOp::Neg,
                    Box::new(Expr::Number(42.0))
                ))
            )
        );
    }

    #[test]
    fn logical_not() {
        assert_eq!(
            parse_expr("!true"),
            Expr::Unary(1, UnaryOp::Not, Box::new(Expr::Bool(true)))
        );
    }

    #[test]
    fn addition() {
        assert_eq!(
            parse_expr("42 + 24"),
            Expr::Binary(
                1,
                BinOp::Add,
                Box::new(Expr::Number(42.0)),
                Box::new(Expr::Number(24.0))
            )
        );
    }

    #[test]
    fn addition_is_left_associative() {
        assert_eq!(
            parse_expr("1 + 2 + 3"),
            Expr::Binary(
                1,
                BinOp::Add,
                Box::new(Expr::Binary(
                    1,
                    BinOp::Add,
                    Box::new(Expr::Number(1.0)),
                    Box::new(Expr::Number(2.0))
                )),
                Box::new(Expr::Number(3.0))
            )
        );
    }

    #[test]
    fn factors_have_precedence_over_terms() {
        assert_eq!(
            parse_expr("1 + 2 * 3"),
            Expr::Binary(
                1,
                BinOp::Add,
                Box::new(Expr::Number(1.0)),
                Box::new(Expr::Binary(
                    1,
                    BinOp::Mul,
                    Box::new(Expr::Number(2.0)),
                    Box::new(Expr::Number(3.0))
                )),
            )
        );
    }

    #[test]
    fn braced_expr_takes_precedence() {
        assert_eq!(
            parse_expr("1 * (2 + 3)"),
            Expr::Binary(
                1,
                BinOp::Mul,
                Box::new(Expr::Number(1.0)),
                Box::new(Expr::Group(Box::new(Expr::Binary(
                    1,
                    BinOp::Add,
                    Box::new(Expr::Number(2.0)),
                    Box::new(Expr::Number(3.0))
                ))))
            ),
        );
    }

    #[test]
    fn comparison_operators() {
        for (src, op) in [
            ("1 < 2", BinOp::Less),
            ("1 <= 2", BinOp::LessEqual),
            ("1 > 2", BinOp::Greater),
            ("1 >= 2", BinOp::GreaterEqual),
            ("1 == 2", BinOp::Equal),
            ("1 != 2", BinOp::NotEqual),
        ] {
            assert_eq!(
                parse_expr(src),
                Expr::Binary(
                    1,
                    op,
                    Box::new(Expr::Number(1.0)),
                    Box::new(Expr::Number(2.0))
                )
            );
        }
    }

    #[test]
    fn logical_operators_build_logical_nodes() {
        assert_eq!(
            parse_expr("true or false and true"),
            Expr::Logical(
                LogicalOp::Or,
                Box::new(Expr::Bool(true)),
                Box::new(Expr::Logical(
                    LogicalOp::And,
                    Box::new(Expr::Bool(false)),
                    Box::new(Expr::Bool(true))
                ))
            )
        );
    }

    #[test]
    fn expr_with_variables() {
        let ctx = Context::new();
        let sym_a = ctx.symbol("a");
        let sym_b = ctx.symbol("b");
        assert_eq!(
            parse_expr_with_ctx(ctx, "a != b"),
            Expr::Binary(
                1,
                BinOp::NotEqual,
                Box::new(Expr::Var(0, 1, sym_a)),
                Box::new(Expr::Var(1, 1, sym_b))
            )
        );
    }

    #[test]
    fn simple_assignment() {
        let ctx = Context::new();
        let sym_a = ctx.symbol("a");
        let sym_b = ctx.symbol("b");
        assert_eq!(
            parse_expr_with_ctx(ctx, "a = b"),
            Expr::Assign(2, 1, sym_a, Box::new(Expr::Var(1, 1, sym_b)))
        );
    }

    #[test]
    fn assignment_is_right_associative() {
        let ctx = Context::new();
        let sym_a = ctx.symbol("a");
        let sym_b = ctx.symbol("b");
        assert_eq!(
            parse_expr_with_ctx(ctx, "a = b = 1"),
            Expr::Assign(
                3,
                1,
                sym_a,
                Box::new(Expr::Assign(2, 1, sym_b, Box::new(Expr::Number(1.0))))
            )
        );
    }

    #[test]
    fn bad_assignment_lhs_is_a_soft_error() {
        let (_, messages) = parse_prg_with_errors("1 + a = b;");
        assert_eq!(
            messages,
            vec!["[line 1] Error at '=': Invalid assignment target.".to_string()]
        );
    }

    #[test]
    fn missing_right_paren() {
        let (_, messages) = parse_prg_with_errors("(1");
        assert_eq!(
            messages,
            vec!["[line 1] Error at end: Expect ')' after expression.".to_string()]
        );
    }

    #[test]
    fn expr_stmts() {
        assert_eq!(
            parse_prg("1; 1+2;"),
            vec![
                Stmt::Expr(Box::new(Expr::Number(1.0))),
                Stmt::Expr(Box::new(Expr::Binary(
                    1,
                    BinOp::Add,
                    Box::new(Expr::Number(1.0)),
                    Box::new(Expr::Number(2.0))
                )))
            ]
        );
    }

    #[test]
    fn print_stmt() {
        assert_eq!(
            parse_prg("print 1;"),
            vec![Stmt::Print(1, Box::new(Expr::Number(1.0)))]
        );
    }

    #[test]
    fn var_decl_with_and_without_initializer() {
        let ctx = Context::new();
        let sym_foo = ctx.symbol("foo");
        let sym_bar = ctx.symbol("bar");
        assert_eq!(
            parse_prg_with_ctx(ctx, "var foo; var bar = 2;"),
            vec![
                Stmt::VarDecl(1, sym_foo, None),
                Stmt::VarDecl(1, sym_bar, Some(Box::new(Expr::Number(2.0))))
            ]
        );
    }

    #[test]
    fn empty_block() {
        assert_eq!(parse_prg("{ }"), vec![Stmt::Block(vec![])]);
    }

    #[test]
    fn block_with_many_stmts() {
        assert_eq!(
            parse_prg("{ 1; 2; }"),
            vec![Stmt::Block(vec![
                Stmt::Expr(Box::new(Expr::Number(1.0))),
                Stmt::Expr(Box::new(Expr::Number(2.0))),
            ])]
        );
    }

    #[test]
    fn if_stmt_without_else() {
        assert_eq!(
            parse_prg("if (true) 1;"),
            vec![Stmt::If(
                Box::new(Expr::Bool(true)),
                Box::new(Stmt::Expr(Box::new(Expr::Number(1.0)))),
                None
            )]
        );
    }

    #[test]
    fn if_else_stmt() {
        assert_eq!(
            parse_prg("if (true) 1; else 2;"),
            vec![Stmt::If(
                Box::new(Expr::Bool(true)),
                Box::new(Stmt::Expr(Box::new(Expr::Number(1.0)))),
                Some(Box::new(Stmt::Expr(Box::new(Expr::Number(2.0))))),
            )]
        );
    }

    #[test]
    fn dangling_else_binds_to_nearest_if() {
        assert_eq!(
            parse_prg("if (true) if (false) 1; else 2;"),
            vec![Stmt::If(
                Box::new(Expr::Bool(true)),
                Box::new(Stmt::If(
                    Box::new(Expr::Bool(false)),
                    Box::new(Stmt::Expr(Box::new(Expr::Number(1.0)))),
                    Some(Box::new(Stmt::Expr(Box::new(Expr::Number(2.0))))),
                )),
                None
            )]
        );
    }

    #[test]
    fn while_stmt() {
        assert_eq!(
            parse_prg("while (true) 1;"),
            vec![Stmt::While(
                Box::new(Expr::Bool(true)),
                Box::new(Stmt::Expr(Box::new(Expr::Number(1.0)))),
            )]
        );
    }

    #[test]
    fn full_for_desugars_to_init_while_increment() {
        let ctx = Context::new();
        let sym_i = ctx.symbol("i");
        assert_eq!(
            parse_prg_with_ctx(ctx, "for (var i = 0; i < 3; i = i + 1) print i;"),
            vec![Stmt::Block(vec![
                Stmt::VarDecl(1, sym_i.clone(), Some(Box::new(Expr::Number(0.0)))),
                Stmt::While(
                    Box::new(Expr::Binary(
                        1,
                        BinOp::Less,
                        Box::new(Expr::Var(0, 1, sym_i.clone())),
                        Box::new(Expr::Number(3.0))
                    )),
                    Box::new(Stmt::Block(vec![
                        Stmt::Print(1, Box::new(Expr::Var(4, 1, sym_i.clone()))),
                        Stmt::Expr(Box::new(Expr::Assign(
                            3,
                            1,
                            sym_i.clone(),
                            Box::new(Expr::Binary(
                                1,
                                BinOp::Add,
                                Box::new(Expr::Var(2, 1, sym_i)),
                                Box::new(Expr::Number(1.0))
                            ))
                        ))),
                    ]))
                ),
            ])]
        );
    }

    #[test]
    fn empty_for_clauses_desugar_to_a_bare_loop() {
        assert_eq!(
            parse_prg("for (;;) 1;"),
            vec![Stmt::While(
                Box::new(Expr::Bool(true)),
                Box::new(Stmt::Expr(Box::new(Expr::Number(1.0)))),
            )]
        );
    }

    #[test]
    fn return_stmt_without_expr() {
        assert_eq!(parse_prg("return;"), vec![Stmt::Return(1, None)]);
    }

    #[test]
    fn return_stmt_with_expr() {
        assert_eq!(
            parse_prg("return false;"),
            vec![Stmt::Return(1, Some(Box::new(Expr::Bool(false))))]
        );
    }

    #[test]
    fn fn_call_without_argument() {
        let ctx = Context::new();
        let sym_foo = ctx.symbol("foo");
        assert_eq!(
            parse_prg_with_ctx(ctx, "foo();"),
            vec![Stmt::Expr(Box::new(Expr::Call(
                1,
                Box::new(Expr::Var(0, 1, sym_foo)),
                vec![]
            )))]
        );
    }

    #[test]
    fn fn_call_with_several_arguments() {
        let ctx = Context::new();
        let sym_foo = ctx.symbol("foo");
        assert_eq!(
            parse_prg_with_ctx(ctx, "foo(1, false);"),
            vec![Stmt::Expr(Box::new(Expr::Call(
                1,
                Box::new(Expr::Var(0, 1, sym_foo)),
                vec![Expr::Number(1.0), Expr::Bool(false)]
            )))]
        );
    }

    #[test]
    fn call_chains_nest_leftward() {
        let ctx = Context::new();
        let sym_f = ctx.symbol("f");
        assert_eq!(
            parse_prg_with_ctx(ctx, "f()();"),
            vec![Stmt::Expr(Box::new(Expr::Call(
                1,
                Box::new(Expr::Call(1, Box::new(Expr::Var(0, 1, sym_f)), vec![])),
                vec![]
            )))]
        );
    }

    #[test]
    fn declare_fn_with_two_parameters() {
        let ctx = Context::new();
        let decl = FunDecl {
            pos: 1,
            name: ctx.symbol("foo"),
            params: vec![(1, ctx.symbol("a")), (1, ctx.symbol("b"))],
            body: vec![Stmt::Expr(Box::new(Expr::Bool(true)))],
        };
        assert_eq!(
            parse_prg_with_ctx(ctx, "fun foo(a, b) { true; }"),
            vec![Stmt::FunDecl(Rc::new(decl))]
        );
    }

    #[test]
    fn class_decl_with_methods() {
        let ctx = Context::new();
        let init = FunDecl {
            pos: 1,
            name: ctx.symbol("init"),
            params: vec![],
            body: vec![],
        };
        let other = FunDecl {
            pos: 1,
            name: ctx.symbol("grow"),
            params: vec![(1, ctx.symbol("n"))],
            body: vec![],
        };
        assert_eq!(
            parse_prg_with_ctx(ctx.clone(), "class Tree { init() {} grow(n) {} }"),
            vec![Stmt::ClassDecl(
                1,
                ctx.symbol("Tree"),
                vec![Rc::new(init), Rc::new(other)]
            )]
        );
    }

    #[test]
    fn panic_mode_recovers_at_statement_boundary() {
        let (prg, messages) = parse_prg_with_errors("var = 1; print 2;");
        assert_eq!(
            messages,
            vec!["[line 1] Error at '=': Expect variable name.".to_string()]
        );
        assert_eq!(
            prg,
            vec![Stmt::Nop, Stmt::Print(1, Box::new(Expr::Number(2.0)))]
        );
    }

    #[test]
    fn panic_mode_recovers_past_semicolon() {
        let (prg, messages) = parse_prg_with_errors("(1; var a = 2;");
        assert_eq!(
            messages,
            vec!["[line 1] Error at ';': Expect ')' after expression.".to_string()]
        );
        match &prg[..] {
            [Stmt::Nop, Stmt::VarDecl(1, name, Some(init))] => {
                assert_eq!(name.name(), "a");
                assert_eq!(**init, Expr::Number(2.0));
            }
            other => panic!("unexpected program: {:?}", other),
        }
    }

    #[test]
    fn bare_semicolon_is_an_error() {
        let (_, messages) = parse_prg_with_errors(";");
        assert_eq!(
            messages,
            vec!["[line 1] Error at ';': Expected expression".to_string()]
        );
    }
}
