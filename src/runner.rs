use crate::error::{ConsoleReporter, Reporter};
use crate::evaluator::Evaluator;
use crate::lexer::scan;
use crate::parser::parse;

/// Outcome of running one source text, mapped to the classic sysexits codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    CompileError,
    RuntimeError,
    StackOverflow,
}

impl Status {
    pub fn exit_code(self) -> i32 {
        match self {
            Status::Success => 0,
            Status::CompileError => 65,
            Status::RuntimeError | Status::StackOverflow => 70,
        }
    }
}

/// Options the driver passes through to the pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Print the parsed program instead of executing it.
    pub print_ast: bool,
}

/// Runs a whole script with a fresh evaluator, reporting to stderr.
pub fn run(source: &str, filename: Option<&str>, options: RunOptions) -> Status {
    let mut reporter = ConsoleReporter::new(source, filename);
    let mut evaluator = Evaluator::new();
    run_source(source, &mut evaluator, &mut reporter, options)
}

/// Scan, parse, and (when both were clean) interpret `source`.
pub fn run_source(
    source: &str,
    evaluator: &mut Evaluator,
    reporter: &mut dyn Reporter,
    options: RunOptions,
) -> Status {
    let tokens = scan(source, reporter);
    let statements = parse(tokens, reporter);

    if reporter.had_error() {
        tracing::debug!("skipping evaluation after compile errors");
        return Status::CompileError;
    }

    if options.print_ast {
        if let Err(error) = evaluator.write_program(&statements) {
            tracing::warn!(%error, "failed to write syntax tree");
        }
        return Status::Success;
    }

    match evaluator.interpret(&statements, reporter) {
        Ok(()) if reporter.had_runtime_error() => Status::RuntimeError,
        Ok(()) => Status::Success,
        Err(overflow) => {
            eprintln!("{}\n[line {}]", overflow, overflow.token.line);
            Status::StackOverflow
        }
    }
}
