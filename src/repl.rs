use crate::ast::{Expr, Stmt};
use crate::error::{ConsoleReporter, DiagnosticCollector, ExecError, Reporter};
use crate::evaluator::Evaluator;
use crate::lexer::scan;
use crate::parser::parse;
use crate::runner::{run_source, RunOptions};
use std::io::{self, Write};

/// Interactive prompt. State persists between lines; errors only affect
/// the line that caused them.
pub fn start(options: RunOptions) {
    println!("Lox Interpreter v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or press Ctrl+D to quit");
    println!();

    let mut evaluator = Evaluator::new();
    let mut reporter = ConsoleReporter::new("", None);

    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => {
                // EOF (Ctrl+D or end of piped input)
                println!();
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "exit" || line == "quit" {
                    break;
                }

                reporter.set_source(line);
                reporter.reset();
                run_line(line, &mut evaluator, &mut reporter, options);
            }
            Err(error) => {
                eprintln!("Error reading input: {}", error);
                break;
            }
        }
    }
}

fn run_line(
    source: &str,
    evaluator: &mut Evaluator,
    reporter: &mut ConsoleReporter,
    options: RunOptions,
) {
    // A lone expression statement echoes its value, assignments excepted.
    if !options.print_ast {
        if let Some(expr) = lone_expression(source) {
            match evaluator.evaluate(&expr) {
                Ok(value) => println!("{}", value),
                Err(ExecError::Runtime(error)) => reporter.runtime_error(&error),
                Err(ExecError::StackOverflow(overflow)) => {
                    eprintln!("{}\n[line {}]", overflow, overflow.token.line)
                }
            }
            return;
        }
    }

    run_source(source, evaluator, reporter, options);
}

fn lone_expression(source: &str) -> Option<Expr> {
    let mut probe = DiagnosticCollector::new();
    let tokens = scan(source, &mut probe);
    let mut statements = parse(tokens, &mut probe);

    if probe.had_error() || statements.len() != 1 {
        return None;
    }

    match statements.pop() {
        Some(Stmt::Expression { expr }) if !matches!(expr, Expr::Assign { .. }) => Some(expr),
        _ => None,
    }
}
