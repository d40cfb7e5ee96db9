// Lox Language Interpreter Library
//
// A tree-walking interpreter for Lox: scanning, recursive-descent parsing,
// and evaluation over lexically scoped environments with closures.

// Public modules
pub mod ast;
pub mod callable;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod runner;
pub mod value;

mod stack;

// Re-export commonly used items
pub use ast::{Expr, FunctionDecl, Stmt};
pub use callable::{Callable, LoxFunction, NativeFunction};
pub use environment::{EnvRef, Environment};
pub use error::{
    ConsoleReporter, Diagnostic, DiagnosticCollector, ErrorKind, ExecError, Reporter,
    RuntimeError, Span, StackOverflow,
};
pub use evaluator::{Evaluator, Flow};
pub use lexer::{scan, Lexer, Literal, Token, TokenType};
pub use parser::{parse, Parser};
pub use value::Value;

// Re-export main functions
pub use repl::start as start_repl;
pub use runner::{run, run_source, RunOptions, Status};
