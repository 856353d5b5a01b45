/// Entry point for the Fescate CLI, a PHP source obfuscator.
///
/// Parses command-line arguments, initialises logging and dispatches to the
/// `obfuscate`, `file` and `clean` subcommands. Failures are logged and turned
/// into the process exit code of the error.
use clap::{ArgAction, Parser};
use fescate_cli::commands::{Cmd, Command};
use fescate_cli::logging;
use std::process::ExitCode;
use tracing::error;

/// Command-line interface for Fescate.
///
/// Fescate renames identifiers, flattens control flow into gotos and shuffles
/// statements of a PHP source tree while keeping its behaviour.
#[derive(Parser)]
#[command(name = "fescate")]
#[command(about = "Fescate: PHP source obfuscator")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Only log warnings and errors
    #[arg(long, global = true)]
    silent: bool,

    /// Log more; repeat for trace output
    #[arg(long, short = 'd', global = true, action = ArgAction::Count)]
    debug: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.debug, cli.silent);

    match cli.command.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(u8::MAX))
        }
    }
}
