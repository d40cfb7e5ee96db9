use clap::{Arg, Command};
use lox::RunOptions;
use std::fs;
use std::path::Path;
use std::process;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

fn main() {
    init_tracing();

    let matches = cli().get_matches();

    let options = RunOptions {
        print_ast: matches.get_flag("print-ast"),
    };

    match matches.get_one::<String>("file") {
        Some(file_path) => run_file(file_path, options),
        None => lox::start_repl(options),
    }
}

fn cli() -> Command {
    Command::new("lox")
        .about("A tree-walking interpreter for the Lox language")
        .arg(
            Arg::new("file")
                .help("The script file to execute")
                .value_name("FILE")
                .index(1),
        )
        .arg(
            Arg::new("interactive")
                .short('i')
                .long("interactive")
                .help("Start in interactive REPL mode")
                .conflicts_with("file")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("print-ast")
                .long("print-ast")
                .help("Print the parsed syntax tree instead of running it")
                .action(clap::ArgAction::SetTrue),
        )
}

/// Logs go to stderr, `warn` unless RUST_LOG says otherwise.
fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run_file(path: &str, options: RunOptions) {
    let path = Path::new(path);

    match fs::read_to_string(path) {
        Ok(source) => {
            let filename = path.display().to_string();
            let status = lox::run(&source, Some(&filename), options);
            tracing::debug!(?status, "finished");
            process::exit(status.exit_code());
        }
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path.display(), e);
            process::exit(66);
        }
    }
}
