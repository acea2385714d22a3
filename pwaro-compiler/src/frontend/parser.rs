//! Recursive-descent parser.
//!
//! Two precedence tiers, both left-associative:
//!
//! ```text
//! operand   := NUMBER | IDENT [ '(' ')' ]
//! factor    := operand ( ('*' | '/') operand )*
//! expr      := factor ( ('+' | '-') factor )*
//! statement := 'print' expr ';'
//!            | 'var' IDENT WIDTH '=' expr ';'
//!            | 'fn' IDENT '(' statement* ')' ';'
//!            | 'prototype' IDENT ';'
//!            | expr ';'
//! ```
//!
//! Number literals take the width of the `var` whose initializer they appear
//! in, and the working width everywhere else.

use crate::frontend::lexer::{Lexer, Token, TokenKind};
use crate::ir::ast::{BinOp, Block, Expr, Program, Stmt, Width};
use std::fmt;
use tracing::{debug, instrument, trace};

/// What the parser wanted when it gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Token(TokenKind),
    Expression,
    Width,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Token(kind) => write!(f, "{kind}"),
            Expected::Expression => write!(f, "number or identifier"),
            Expected::Width => write!(f, "integer width (i8, i16, i32, i64)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub expected: Expected,
    pub found: TokenKind,
    pub found_text: String,
    pub line: usize,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}: expected {}, found {}",
            self.line, self.expected, self.found
        )?;
        if !self.found_text.is_empty() {
            write!(f, " '{}'", self.found_text)?;
        }
        Ok(())
    }
}

impl std::error::Error for SyntaxError {}

pub type ParseResult<T> = Result<T, SyntaxError>;

pub struct Parser<'source> {
    lexer: Lexer<'source>,
    token: Token,
}

impl<'source> Parser<'source> {
    pub fn new(source: &'source str) -> Self {
        Self::from_lexer(Lexer::new(source))
    }

    pub fn from_lexer(mut lexer: Lexer<'source>) -> Self {
        let token = lexer.next_token();
        Self { lexer, token }
    }

    /// Parse statements until end of input.
    #[instrument(skip_all)]
    pub fn parse(mut self) -> ParseResult<Program> {
        let mut stmts = Vec::new();
        while !self.token.is(TokenKind::Eof) {
            stmts.push(self.parse_statement()?);
        }
        debug!(statements = stmts.len(), "parsed program");
        Ok(Program { stmts })
    }

    fn advance(&mut self) -> Token {
        let next = self.lexer.next_token();
        std::mem::replace(&mut self.token, next)
    }

    fn error(&self, expected: Expected) -> SyntaxError {
        SyntaxError {
            expected,
            found: self.token.kind,
            found_text: self.token.text.clone(),
            line: self.token.line,
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.token.is(kind) {
            Ok(self.advance())
        } else {
            Err(self.error(Expected::Token(kind)))
        }
    }

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        trace!(token = ?self.token.kind, line = self.token.line, "statement");
        match self.token.kind {
            TokenKind::Print => {
                let line = self.advance().line;
                let expr = self.parse_expr(Width::WORKING)?;
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::Print { expr, line })
            }
            TokenKind::Var => {
                let line = self.advance().line;
                let name = self.expect(TokenKind::Ident)?.text;
                let Some(width) = Width::from_keyword(self.token.kind) else {
                    return Err(self.error(Expected::Width));
                };
                self.advance();
                self.expect(TokenKind::Assign)?;
                let init = self.parse_expr(width)?;
                self.expect(TokenKind::Semi)?;
                debug!(%name, %width, "variable declaration");
                Ok(Stmt::VarDecl {
                    name,
                    width,
                    init,
                    line,
                })
            }
            TokenKind::Fn => {
                let line = self.advance().line;
                let name = self.expect(TokenKind::Ident)?.text;
                self.expect(TokenKind::LParen)?;
                let body = self.parse_block()?;
                self.expect(TokenKind::RParen)?;
                self.expect(TokenKind::Semi)?;
                debug!(%name, statements = body.stmts.len(), "function declaration");
                Ok(Stmt::FuncDecl { name, body, line })
            }
            TokenKind::Prototype => {
                let line = self.advance().line;
                let name = self.expect(TokenKind::Ident)?.text;
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::Prototype { name, line })
            }
            _ => {
                let expr = self.parse_expr(Width::WORKING)?;
                self.expect(TokenKind::Semi)?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    /// Statements up to (not including) the closing `)`.
    fn parse_block(&mut self) -> ParseResult<Block> {
        let mut stmts = Vec::new();
        while !self.token.is(TokenKind::RParen) {
            if self.token.is(TokenKind::Eof) {
                return Err(self.error(Expected::Token(TokenKind::RParen)));
            }
            stmts.push(self.parse_statement()?);
        }
        Ok(Block { stmts })
    }

    fn parse_expr(&mut self, width: Width) -> ParseResult<Expr> {
        let mut left = self.parse_factor(width)?;
        while matches!(self.token.kind, TokenKind::Plus | TokenKind::Minus) {
            left = self.parse_binary_tail(left, width, Self::parse_factor)?;
        }
        Ok(left)
    }

    fn parse_factor(&mut self, width: Width) -> ParseResult<Expr> {
        let mut left = self.parse_operand(width)?;
        while matches!(self.token.kind, TokenKind::Star | TokenKind::Slash) {
            left = self.parse_binary_tail(left, width, Self::parse_operand)?;
        }
        Ok(left)
    }

    /// Consume one operator and its right operand, folding onto `left`.
    fn parse_binary_tail(
        &mut self,
        left: Expr,
        width: Width,
        operand: fn(&mut Self, Width) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let op_token = self.advance();
        let op = BinOp::from_token(op_token.kind).ok_or_else(|| SyntaxError {
            expected: Expected::Expression,
            found: op_token.kind,
            found_text: op_token.text.clone(),
            line: op_token.line,
        })?;
        let right = operand(self, width)?;
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            line: op_token.line,
        })
    }

    fn parse_operand(&mut self, width: Width) -> ParseResult<Expr> {
        match self.token.kind {
            TokenKind::Number => {
                let token = self.advance();
                Ok(Expr::Number {
                    text: token.text,
                    width,
                    line: token.line,
                })
            }
            TokenKind::Ident => {
                let token = self.advance();
                if self.token.is(TokenKind::LParen) {
                    self.advance();
                    self.expect(TokenKind::RParen)?;
                    return Ok(Expr::Call {
                        name: token.text,
                        line: token.line,
                    });
                }
                Ok(Expr::Ident {
                    name: token.text,
                    line: token.line,
                })
            }
            _ => Err(self.error(Expected::Expression)),
        }
    }
}

/// Parse a complete source text.
pub fn parse_program(source: &str) -> ParseResult<Program> {
    Parser::new(source).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn num(text: &str, width: Width, line: usize) -> Expr {
        Expr::Number {
            text: text.to_string(),
            width,
            line,
        }
    }

    fn bin(op: BinOp, left: Expr, right: Expr, line: usize) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            line,
        }
    }

    fn print_expr(source: &str) -> Expr {
        let program = parse_program(source).unwrap();
        match program.stmts.into_iter().next() {
            Some(Stmt::Print { expr, .. }) => expr,
            other => panic!("expected print statement, got {:?}", other),
        }
    }

    #[test]
    fn multiplication_binds_tighter() {
        let w = Width::WORKING;
        assert_eq!(
            print_expr("print 2 + 3 * 4;"),
            bin(
                BinOp::Add,
                num("2", w, 1),
                bin(BinOp::Mul, num("3", w, 1), num("4", w, 1), 1),
                1
            )
        );
    }

    #[test]
    fn subtraction_is_left_associative() {
        let w = Width::WORKING;
        assert_eq!(
            print_expr("print 10 - 3 - 2;"),
            bin(
                BinOp::Sub,
                bin(BinOp::Sub, num("10", w, 1), num("3", w, 1), 1),
                num("2", w, 1),
                1
            )
        );
    }

    #[test]
    fn division_is_left_associative() {
        let w = Width::WORKING;
        assert_eq!(
            print_expr("print 100 / 10 / 5;"),
            bin(
                BinOp::Div,
                bin(BinOp::Div, num("100", w, 1), num("10", w, 1), 1),
                num("5", w, 1),
                1
            )
        );
    }

    #[test]
    fn identifier_followed_by_parens_is_a_call() {
        assert_eq!(
            print_expr("print f() * x;"),
            bin(
                BinOp::Mul,
                Expr::Call {
                    name: "f".into(),
                    line: 1
                },
                Expr::Ident {
                    name: "x".into(),
                    line: 1
                },
                1
            )
        );
    }

    #[test]
    fn initializer_literals_take_the_declared_width() {
        let program = parse_program("var small i8 = 100 + 100;").unwrap();
        assert_eq!(
            program.stmts,
            vec![Stmt::VarDecl {
                name: "small".into(),
                width: Width::I8,
                init: bin(
                    BinOp::Add,
                    num("100", Width::I8, 1),
                    num("100", Width::I8, 1),
                    1
                ),
                line: 1,
            }]
        );
    }

    #[test]
    fn function_prototype_and_call() {
        let source = "prototype f;\nfn f ( var t i32 = 4; print t; );\nf();\n";
        let program = parse_program(source).unwrap();
        assert_eq!(program.stmts.len(), 3);
        assert_eq!(
            program.stmts[0],
            Stmt::Prototype {
                name: "f".into(),
                line: 1
            }
        );
        match &program.stmts[1] {
            Stmt::FuncDecl { name, body, line } => {
                assert_eq!(name, "f");
                assert_eq!(*line, 2);
                assert_eq!(body.stmts.len(), 2);
            }
            other => panic!("expected function, got {:?}", other),
        }
        assert_eq!(
            program.stmts[2],
            Stmt::Expr(Expr::Call {
                name: "f".into(),
                line: 3
            })
        );
    }

    #[test]
    fn single_statement_body_stays_a_block() {
        let program = parse_program("fn one ( 1; );").unwrap();
        let Stmt::FuncDecl { body, .. } = &program.stmts[0] else {
            panic!("expected function");
        };
        assert_eq!(body.stmts, vec![Stmt::Expr(num("1", Width::WORKING, 1))]);
    }

    #[test]
    fn empty_function_body() {
        let program = parse_program("fn nothing ( );").unwrap();
        assert_eq!(
            program.stmts,
            vec![Stmt::FuncDecl {
                name: "nothing".into(),
                body: Block::default(),
                line: 1
            }]
        );
    }

    #[test]
    fn parsing_is_deterministic() {
        let source = "var a i16 = 3 * 4 - 1;\nfn g ( print a; a / 2; );\nprint g() + 1;";
        assert_eq!(parse_program(source), parse_program(source));
    }

    #[test]
    fn missing_semicolon_reports_expected_and_found() {
        let err = parse_program("print 1\nprint 2;").unwrap_err();
        assert_eq!(err.expected, Expected::Token(TokenKind::Semi));
        assert_eq!(err.found, TokenKind::Print);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn var_without_width_is_rejected() {
        let err = parse_program("var x = 1;").unwrap_err();
        assert_eq!(err.expected, Expected::Width);
        assert_eq!(err.found, TokenKind::Assign);
    }

    #[test]
    fn call_arguments_are_rejected() {
        let err = parse_program("f(1);").unwrap_err();
        assert_eq!(err.expected, Expected::Token(TokenKind::RParen));
        assert_eq!(err.found, TokenKind::Number);
    }

    #[test]
    fn unterminated_function_body() {
        let err = parse_program("fn f ( print 1;").unwrap_err();
        assert_eq!(err.expected, Expected::Token(TokenKind::RParen));
        assert_eq!(err.found, TokenKind::Eof);
    }

    #[test]
    fn unknown_token_is_a_syntax_error() {
        let err = parse_program("print 4 % 2;").unwrap_err();
        assert_eq!(err.found, TokenKind::Unknown);
        assert_eq!(err.found_text, "%");
        assert_eq!(
            err.to_string(),
            "line 1: expected ';', found unknown token '%'"
        );
    }

    #[test]
    fn operator_without_right_operand() {
        let err = parse_program("print 1 + ;").unwrap_err();
        assert_eq!(err.expected, Expected::Expression);
        assert_eq!(err.found, TokenKind::Semi);
    }
}
