use crate::ast::{Expr, FunctionDecl, Stmt};
use crate::error::{Diagnostic, Reporter, Span};
use crate::lexer::{Literal, Token, TokenType};
use crate::stack::ensure_sufficient_stack;
use std::rc::Rc;

/// Most arguments a call, or parameters a declaration, may have.
pub const MAX_ARITY: usize = 255;

/// Deepest syntax tree the parser builds. Past this the parse stops with
/// a diagnostic, which also bounds every later walk over the tree.
pub const MAX_NESTING_DEPTH: usize = 4096;

/// Why a production failed. The diagnostic has already been reported.
#[derive(Debug)]
enum ParseError {
    /// `declaration` synchronizes and carries on.
    Syntax,
    /// Nesting limit hit; the rest of the input is abandoned.
    TooDeep,
}

type ParseResult<T> = Result<T, ParseError>;

/// Parses a token stream into a program, recovering after each broken
/// statement. Returns every statement that parsed cleanly.
pub fn parse(tokens: Vec<Token>, reporter: &mut dyn Reporter) -> Vec<Stmt> {
    Parser::new(tokens, reporter).parse()
}

pub struct Parser<'a> {
    tokens: Vec<Token>,
    current: usize,
    depth: usize,
    reporter: &'a mut dyn Reporter,
}

impl<'a> Parser<'a> {
    pub fn new(mut tokens: Vec<Token>, reporter: &'a mut dyn Reporter) -> Self {
        if tokens.last().map(|t| t.token_type) != Some(TokenType::Eof) {
            let line = tokens.last().map_or(1, |t| t.line);
            let end = tokens.last().map_or(0, |t| t.span.end);
            tokens.push(Token::new(
                TokenType::Eof,
                "",
                None,
                line,
                Span::new(end, end),
            ));
        }

        Self {
            tokens,
            current: 0,
            depth: 0,
            reporter,
        }
    }

    pub fn parse(mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            match self.declaration() {
                Ok(Some(statement)) => statements.push(statement),
                Ok(None) => {}
                Err(_) => {
                    tracing::debug!(limit = MAX_NESTING_DEPTH, "parse abandoned, nesting too deep");
                    break;
                }
            }
        }

        tracing::trace!(count = statements.len(), "parsed statements");
        statements
    }

    /// `Ok(None)` when the declaration was broken and skipped.
    fn declaration(&mut self) -> ParseResult<Option<Stmt>> {
        let result = if self.match_types(&[TokenType::Fun]) {
            self.nested(|parser| parser.function("function"))
                .map(|decl| Stmt::Function(Rc::new(decl)))
        } else if self.match_types(&[TokenType::Var]) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(statement) => Ok(Some(statement)),
            Err(ParseError::Syntax) => {
                self.synchronize();
                Ok(None)
            }
            Err(ParseError::TooDeep) => Err(ParseError::TooDeep),
        }
    }

    fn function(&mut self, kind: &str) -> ParseResult<FunctionDecl> {
        let name = self
            .consume(TokenType::Identifier, &format!("Expect {} name.", kind))?
            .clone();
        self.consume(
            TokenType::LeftParen,
            &format!("Expect '(' after {} name.", kind),
        )?;

        let mut params = Vec::new();
        if !self.check(TokenType::RightParen) {
            loop {
                if params.len() >= MAX_ARITY {
                    self.error_at_current("Can't have more than 255 parameters.");
                }
                params.push(
                    self.consume(TokenType::Identifier, "Expect parameter name.")?
                        .clone(),
                );
                if !self.match_types(&[TokenType::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expect ')' after parameters.")?;

        self.consume(
            TokenType::LeftBrace,
            &format!("Expect '{{' before {} body.", kind),
        )?;
        let body = self.block()?;

        Ok(FunctionDecl { name, params, body })
    }

    fn var_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self
            .consume(TokenType::Identifier, "Expect variable name.")?
            .clone();

        let initializer = if self.match_types(&[TokenType::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::Semicolon,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Stmt::Var { name, initializer })
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        self.nested(Self::statement_inner)
    }

    fn statement_inner(&mut self) -> ParseResult<Stmt> {
        if self.match_types(&[TokenType::For]) {
            self.for_statement()
        } else if self.match_types(&[TokenType::If]) {
            self.if_statement()
        } else if self.match_types(&[TokenType::Print]) {
            self.print_statement()
        } else if self.match_types(&[TokenType::Return]) {
            self.return_statement()
        } else if self.match_types(&[TokenType::While]) {
            self.while_statement()
        } else if self.match_types(&[TokenType::LeftBrace]) {
            Ok(Stmt::Block {
                statements: self.block()?,
            })
        } else {
            self.expression_statement()
        }
    }

    /// Desugars `for (init; cond; incr) body` into
    /// `{ init; while (cond) { body; incr; } }`.
    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_types(&[TokenType::Semicolon]) {
            None
        } else if self.match_types(&[TokenType::Var]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(TokenType::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if !self.check(TokenType::RightParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block {
                statements: vec![body, Stmt::Expression { expr: increment }],
            };
        }

        let condition = condition.unwrap_or(Expr::Literal {
            value: Literal::Bool(true),
        });
        body = Stmt::While {
            condition,
            body: Box::new(body),
        };

        if let Some(initializer) = initializer {
            body = Stmt::Block {
                statements: vec![initializer, body],
            };
        }

        Ok(body)
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_types(&[TokenType::Else]) {
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

    fn print_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::Print { keyword, expr })
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();
        let value = if !self.check(TokenType::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::Semicolon, "Expect ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after condition.")?;
        let body = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    /// Statements up to the closing brace; the opening one is already consumed.
    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = Vec::new();

        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            if let Some(statement) = self.declaration()? {
                statements.push(statement);
            }
        }

        self.consume(TokenType::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expression { expr })
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.nested(Self::assignment)
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.or()?;

        if self.match_types(&[TokenType::Equal]) {
            let equals = self.previous().clone();
            let value = self.nested(Self::assignment)?;

            if let Expr::Variable { name } = expr {
                return Ok(Expr::Assign {
                    name,
                    value: Box::new(value),
                });
            }

            // Reported, not thrown: the parser is still in a sane state.
            self.error(&equals, "Invalid assignment target.");
            return Ok(value);
        }

        Ok(expr)
    }

    fn or(&mut self) -> ParseResult<Expr> {
        let depth = self.depth;
        let mut expr = self.and()?;

        while self.match_types(&[TokenType::Or]) {
            self.deepen()?;
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        self.depth = depth;
        Ok(expr)
    }

    fn and(&mut self) -> ParseResult<Expr> {
        let depth = self.depth;
        let mut expr = self.equality()?;

        while self.match_types(&[TokenType::And]) {
            self.deepen()?;
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        self.depth = depth;
        Ok(expr)
    }

    /// Folds a left-associative binary level. Every fold makes the tree one
    /// level deeper, so it counts against the nesting limit.
    fn binary(
        &mut self,
        operators: &[TokenType],
        operand: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let depth = self.depth;
        let mut expr = operand(self)?;

        while self.match_types(operators) {
            self.deepen()?;
            let operator = self.previous().clone();
            let right = operand(self)?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        self.depth = depth;
        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        self.binary(
            &[TokenType::BangEqual, TokenType::EqualEqual],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        self.binary(
            &[
                TokenType::Greater,
                TokenType::GreaterEqual,
                TokenType::Less,
                TokenType::LessEqual,
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> ParseResult<Expr> {
        self.binary(&[TokenType::Minus, TokenType::Plus], Self::factor)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        self.binary(&[TokenType::Slash, TokenType::Star], Self::unary)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if self.match_types(&[TokenType::Bang, TokenType::Minus]) {
            let operator = self.previous().clone();
            let right = self.nested(Self::unary)?;
            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        self.call()
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let depth = self.depth;
        let mut expr = self.primary()?;

        while self.match_types(&[TokenType::LeftParen]) {
            self.deepen()?;
            expr = self.finish_call(expr)?;
        }

        self.depth = depth;
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let mut arguments = Vec::new();

        if !self.check(TokenType::RightParen) {
            loop {
                if arguments.len() >= MAX_ARITY {
                    self.error_at_current("Can't have more than 255 arguments.");
                }
                arguments.push(self.expression()?);
                if !self.match_types(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        let paren = self
            .consume(TokenType::RightParen, "Expect ')' after arguments.")?
            .clone();

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let token = self.peek().clone();

        let expr = match token.token_type {
            TokenType::False => Expr::Literal {
                value: Literal::Bool(false),
            },
            TokenType::True => Expr::Literal {
                value: Literal::Bool(true),
            },
            TokenType::Nil => Expr::Literal {
                value: Literal::Nil,
            },
            TokenType::Number | TokenType::String => Expr::Literal {
                value: token.literal.clone().unwrap_or(Literal::Nil),
            },
            TokenType::Identifier => Expr::Variable { name: token },
            TokenType::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenType::RightParen, "Expect ')' after expression.")?;
                return Ok(Expr::Grouping {
                    expr: Box::new(expr),
                });
            }
            _ => return Err(self.error(&token, "Expect expression.")),
        };

        self.advance();
        Ok(expr)
    }

    /// Runs a recursive production one level deeper, on a stack that is
    /// grown when it runs low. The depth is restored on every exit.
    fn nested<T>(
        &mut self,
        production: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let depth = self.depth;
        self.deepen()?;
        let result = ensure_sufficient_stack(|| production(self));
        self.depth = depth;
        result
    }

    fn deepen(&mut self) -> ParseResult<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            let token = self.peek().clone();
            self.reporter.report(&Diagnostic::parse_error(
                &token,
                format!("Too much nesting; the limit is {} levels.", MAX_NESTING_DEPTH),
            ));
            return Err(ParseError::TooDeep);
        }

        self.depth += 1;
        Ok(())
    }

    /// Skips tokens until a likely statement boundary.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().token_type == TokenType::Semicolon {
                return;
            }

            match self.peek().token_type {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return => return,
                _ => {}
            }

            self.advance();
        }
    }

    fn match_types(&mut self, types: &[TokenType]) -> bool {
        for token_type in types {
            if self.check(*token_type) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check(&self, token_type: TokenType) -> bool {
        !self.is_at_end() && self.peek().token_type == token_type
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> ParseResult<&Token> {
        if self.check(token_type) {
            Ok(self.advance())
        } else {
            let token = self.peek().clone();
            Err(self.error(&token, message))
        }
    }

    fn error_at_current(&mut self, message: &str) {
        let token = self.peek().clone();
        self.error(&token, message);
    }

    fn error(&mut self, token: &Token, message: &str) -> ParseError {
        self.reporter.report(&Diagnostic::parse_error(token, message));
        ParseError::Syntax
    }
}
