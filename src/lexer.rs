use crate::error::{Diagnostic, Reporter, Span};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // Single-character tokens
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,

    // One or two character tokens
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Literals
    Identifier,
    String,
    Number,

    // Keywords
    And,
    Class,
    Else,
    False,
    For,
    Fun,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    // Special
    Eof,
}

/// Scalar carried by literal tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Bool(bool),
    Nil,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", n),
            Literal::String(s) => write!(f, "{}", s),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Nil => write!(f, "nil"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub line: usize,
    pub span: Span,
}

impl Token {
    pub fn new(
        token_type: TokenType,
        lexeme: impl Into<String>,
        literal: Option<Literal>,
        line: usize,
        span: Span,
    ) -> Self {
        Self {
            token_type,
            lexeme: lexeme.into(),
            literal,
            line,
            span,
        }
    }
}

fn keyword(text: &str) -> Option<TokenType> {
    let token_type = match text {
        "and" => TokenType::And,
        "class" => TokenType::Class,
        "else" => TokenType::Else,
        "false" => TokenType::False,
        "for" => TokenType::For,
        "fun" => TokenType::Fun,
        "if" => TokenType::If,
        "nil" => TokenType::Nil,
        "or" => TokenType::Or,
        "print" => TokenType::Print,
        "return" => TokenType::Return,
        "super" => TokenType::Super,
        "this" => TokenType::This,
        "true" => TokenType::True,
        "var" => TokenType::Var,
        "while" => TokenType::While,
        _ => return None,
    };
    Some(token_type)
}

/// Scans `source` into tokens, reporting lexical errors as it goes.
/// Always ends with exactly one `Eof` token.
pub fn scan(source: &str, reporter: &mut dyn Reporter) -> Vec<Token> {
    Lexer::new(source, reporter).scan_tokens()
}

pub struct Lexer<'a> {
    source: &'a str,
    reporter: &'a mut dyn Reporter,
    tokens: Vec<Token>,
    // byte offsets
    start: usize,
    current: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, reporter: &'a mut dyn Reporter) -> Self {
        Self {
            source,
            reporter,
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
        }
    }

    pub fn scan_tokens(mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }

        self.tokens.push(Token::new(
            TokenType::Eof,
            "",
            None,
            self.line,
            Span::new(self.current, self.current),
        ));

        tracing::trace!(count = self.tokens.len(), "scanned tokens");
        self.tokens
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn scan_token(&mut self) {
        let c = self.advance();

        match c {
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            '{' => self.add_token(TokenType::LeftBrace),
            '}' => self.add_token(TokenType::RightBrace),
            ',' => self.add_token(TokenType::Comma),
            '.' => self.add_token(TokenType::Dot),
            '-' => self.add_token(TokenType::Minus),
            '+' => self.add_token(TokenType::Plus),
            ';' => self.add_token(TokenType::Semicolon),
            '*' => self.add_token(TokenType::Star),
            '!' => {
                let token_type = if self.match_char('=') {
                    TokenType::BangEqual
                } else {
                    TokenType::Bang
                };
                self.add_token(token_type);
            }
            '=' => {
                let token_type = if self.match_char('=') {
                    TokenType::EqualEqual
                } else {
                    TokenType::Equal
                };
                self.add_token(token_type);
            }
            '<' => {
                let token_type = if self.match_char('=') {
                    TokenType::LessEqual
                } else {
                    TokenType::Less
                };
                self.add_token(token_type);
            }
            '>' => {
                let token_type = if self.match_char('=') {
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                };
                self.add_token(token_type);
            }
            '/' => {
                if self.match_char('/') {
                    // Comment goes until end of line
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenType::Slash);
                }
            }
            ' ' | '\r' | '\t' => {}
            '\n' => self.line += 1,
            '"' => self.string(),
            c if c.is_ascii_digit() => self.number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier(),
            _ => {
                let diagnostic = Diagnostic::lex_error(
                    self.line,
                    Span::new(self.start, self.current),
                    "Unexpected character.",
                );
                self.reporter.report(&diagnostic);
            }
        }
    }

    fn advance(&mut self) -> char {
        match self.source[self.current..].chars().next() {
            Some(c) => {
                self.current += c.len_utf8();
                c
            }
            None => '\0',
        }
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.peek() != expected {
            false
        } else {
            self.current += expected.len_utf8();
            true
        }
    }

    fn peek(&self) -> char {
        self.source[self.current..].chars().next().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.source[self.current..].chars().nth(1).unwrap_or('\0')
    }

    fn string(&mut self) {
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            let diagnostic = Diagnostic::lex_error(
                self.line,
                Span::new(self.start, self.current),
                "Unterminated string.",
            );
            self.reporter.report(&diagnostic);

            // Keep the partial literal so the parser still sees a string.
            let value = self.source[self.start + 1..self.current].to_string();
            self.add_literal(TokenType::String, Literal::String(value));
            return;
        }

        // The closing quote
        self.advance();

        let value = self.source[self.start + 1..self.current - 1].to_string();
        self.add_literal(TokenType::String, Literal::String(value));
    }

    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // A trailing '.' without digits stays a separate Dot token.
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text = &self.source[self.start..self.current];
        // digits with at most one interior '.' always parse
        let value = text.parse::<f64>().unwrap_or_default();
        self.add_literal(TokenType::Number, Literal::Number(value));
    }

    fn identifier(&mut self) {
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let text = &self.source[self.start..self.current];
        let token_type = keyword(text).unwrap_or(TokenType::Identifier);
        self.add_token(token_type);
    }

    fn add_token(&mut self, token_type: TokenType) {
        self.push(token_type, None);
    }

    fn add_literal(&mut self, token_type: TokenType, literal: Literal) {
        self.push(token_type, Some(literal));
    }

    fn push(&mut self, token_type: TokenType, literal: Option<Literal>) {
        let text = &self.source[self.start..self.current];
        self.tokens.push(Token::new(
            token_type,
            text,
            literal,
            self.line,
            Span::new(self.start, self.current),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticCollector;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenType> {
        let mut reporter = DiagnosticCollector::new();
        scan(source, &mut reporter)
            .into_iter()
            .map(|token| token.token_type)
            .collect()
    }

    #[test]
    fn two_character_operators_are_greedy() {
        assert_eq!(
            kinds("!= == <= >= ! = < >"),
            vec![
                TokenType::BangEqual,
                TokenType::EqualEqual,
                TokenType::LessEqual,
                TokenType::GreaterEqual,
                TokenType::Bang,
                TokenType::Equal,
                TokenType::Less,
                TokenType::Greater,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn comments_and_whitespace_are_skipped() {
        assert_eq!(
            kinds("// nothing here\n\t 1 / 2 // trailing"),
            vec![
                TokenType::Number,
                TokenType::Slash,
                TokenType::Number,
                TokenType::Eof
            ]
        );
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("var orchid = nil; fun _f1"),
            vec![
                TokenType::Var,
                TokenType::Identifier,
                TokenType::Equal,
                TokenType::Nil,
                TokenType::Semicolon,
                TokenType::Fun,
                TokenType::Identifier,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn number_literals() {
        let mut reporter = DiagnosticCollector::new();
        let tokens = scan("12.5 7.", &mut reporter);

        assert_eq!(tokens[0].literal, Some(Literal::Number(12.5)));
        assert_eq!(tokens[1].literal, Some(Literal::Number(7.0)));
        assert_eq!(tokens[1].lexeme, "7");
        assert_eq!(tokens[2].token_type, TokenType::Dot);
        assert!(!reporter.had_error());
    }

    #[test]
    fn string_literal_strips_quotes_and_counts_lines() {
        let mut reporter = DiagnosticCollector::new();
        let tokens = scan("\"a\nb\" x", &mut reporter);

        assert_eq!(tokens[0].literal, Some(Literal::String("a\nb".to_string())));
        assert_eq!(tokens[0].lexeme, "\"a\nb\"");
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn unterminated_string_is_reported_and_kept() {
        let mut reporter = DiagnosticCollector::new();
        let tokens = scan("\"abc", &mut reporter);

        assert_eq!(reporter.messages(), vec!["[line 1] Error: Unterminated string."]);
        assert_eq!(tokens[0].token_type, TokenType::String);
        assert_eq!(tokens[0].literal, Some(Literal::String("abc".to_string())));
        assert_eq!(tokens.last().map(|t| t.token_type), Some(TokenType::Eof));
    }

    #[test]
    fn unexpected_characters_are_skipped() {
        let mut reporter = DiagnosticCollector::new();
        let tokens = scan("1 @ 2\n#", &mut reporter);

        assert_eq!(
            reporter.messages(),
            vec![
                "[line 1] Error: Unexpected character.",
                "[line 2] Error: Unexpected character.",
            ]
        );
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn eof_appears_once_and_last() {
        for source in ["", "   ", "print 1;", "\"open", "@@@"] {
            let mut reporter = DiagnosticCollector::new();
            let tokens = scan(source, &mut reporter);
            let eofs = tokens
                .iter()
                .filter(|t| t.token_type == TokenType::Eof)
                .count();
            assert_eq!(eofs, 1);
            assert_eq!(tokens.last().map(|t| t.token_type), Some(TokenType::Eof));
        }
    }
}
