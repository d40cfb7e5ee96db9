use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use std::fmt;
use thiserror::Error;

use crate::lexer::{Token, TokenType};

/// Byte range into the source text a token or diagnostic covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    LexError,
    ParseError,
}

/// A compile-time problem found by the lexer or the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub line: usize,
    /// Empty for lexical errors, `" at end"` or `" at '<lexeme>'"` for parse errors.
    pub location: String,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn lex_error(line: usize, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::LexError,
            line,
            location: String::new(),
            message: message.into(),
            span,
        }
    }

    pub fn parse_error(token: &Token, message: impl Into<String>) -> Self {
        let location = if token.token_type == TokenType::Eof {
            " at end".to_string()
        } else {
            format!(" at '{}'", token.lexeme)
        };

        Self {
            kind: ErrorKind::ParseError,
            line: token.line,
            location,
            message: message.into(),
            span: token.span,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[line {}] Error{}: {}", self.line, self.location, self.message)
    }
}

/// A failure raised while evaluating, tied to the token that triggered it.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
}

impl RuntimeError {
    pub fn new(token: &Token, message: impl Into<String>) -> Self {
        Self {
            token: token.clone(),
            message: message.into(),
        }
    }
}

/// Call depth exhausted. Fatal for the current run, never reported as a [`RuntimeError`].
#[derive(Debug, Clone, Error)]
#[error("Stack overflow: call depth exceeded {limit} frames.")]
pub struct StackOverflow {
    pub token: Token,
    pub limit: usize,
}

#[derive(Debug, Clone, Error)]
pub enum ExecError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    StackOverflow(#[from] StackOverflow),
}

/// Sink for every problem the pipeline surfaces to its host.
pub trait Reporter {
    fn report(&mut self, diagnostic: &Diagnostic);

    fn runtime_error(&mut self, error: &RuntimeError);

    fn had_error(&self) -> bool;

    fn had_runtime_error(&self) -> bool;

    /// Clears both flags, used between REPL lines.
    fn reset(&mut self);
}

/// Keeps everything in memory.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    pub diagnostics: Vec<Diagnostic>,
    pub runtime_errors: Vec<RuntimeError>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(ToString::to_string).collect()
    }
}

impl Reporter for DiagnosticCollector {
    fn report(&mut self, diagnostic: &Diagnostic) {
        self.diagnostics.push(diagnostic.clone());
    }

    fn runtime_error(&mut self, error: &RuntimeError) {
        self.runtime_errors.push(error.clone());
    }

    fn had_error(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    fn had_runtime_error(&self) -> bool {
        !self.runtime_errors.is_empty()
    }

    fn reset(&mut self) {
        self.diagnostics.clear();
        self.runtime_errors.clear();
    }
}

/// Renders diagnostics as annotated source snippets on stderr.
pub struct ConsoleReporter {
    source: String,
    filename: String,
    had_error: bool,
    had_runtime_error: bool,
}

impl ConsoleReporter {
    pub fn new(source: &str, filename: Option<&str>) -> Self {
        Self {
            source: source.to_string(),
            filename: filename.unwrap_or("<repl>").to_string(),
            had_error: false,
            had_runtime_error: false,
        }
    }

    /// Points the reporter at a new chunk of source, keeping the flags.
    pub fn set_source(&mut self, source: &str) {
        self.source = source.to_string();
    }

    fn render(&self, span: Span, color: Color, title: String, label: &str, note: Option<String>) {
        let filename = self.filename.as_str();
        // ariadne counts chars, spans are in bytes. A REPL token may come
        // from an earlier line, so clamp to the current source.
        let to_chars = |offset: usize| {
            self.source
                .get(..offset)
                .map_or_else(|| self.source.chars().count(), |prefix| prefix.chars().count())
        };
        let start = to_chars(span.start);
        let end = to_chars(span.end);

        let mut builder = Report::build(ReportKind::Error, filename, start)
            .with_message(title)
            .with_label(
                Label::new((filename, start..end.max(start)))
                    .with_message(label)
                    .with_color(color),
            );

        if let Some(note) = note {
            builder = builder.with_note(note);
        }

        if let Err(error) = builder
            .finish()
            .eprint((filename, Source::from(self.source.as_str())))
        {
            tracing::warn!(%error, "failed to render diagnostic");
        }
    }
}

impl Reporter for ConsoleReporter {
    fn report(&mut self, diagnostic: &Diagnostic) {
        self.had_error = true;

        let (color, kind_str) = match diagnostic.kind {
            ErrorKind::LexError => (Color::Red, "Lexical Error"),
            ErrorKind::ParseError => (Color::Yellow, "Parse Error"),
        };

        self.render(
            diagnostic.span,
            color,
            format!("{}: {}", kind_str.fg(color), diagnostic),
            &diagnostic.message,
            None,
        );
    }

    fn runtime_error(&mut self, error: &RuntimeError) {
        self.had_runtime_error = true;

        self.render(
            error.token.span,
            Color::Magenta,
            format!("{}: {}", "Runtime Error".fg(Color::Magenta), error.message),
            &error.message,
            Some(format!("[line {}]", error.token.line)),
        );
    }

    fn had_error(&self) -> bool {
        self.had_error
    }

    fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    fn reset(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }
}
