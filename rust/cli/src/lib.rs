//! # baccarat-cli
//!
//! Offline front end for the baccarat tracker: card and sequence
//! predictions, statistics and exports of recorded histories, and replays
//! through a fresh table.
//!
//! ## Main Entry Point
//!
//! [`run`] parses the arguments and dispatches to a subcommand, writing to
//! the streams it is given:
//!
//! ```no_run
//! use std::io;
//! let args = vec!["baccarat", "sequence", "--history", "BBPBP"];
//! let code = baccarat_cli::run(args, &mut io::stdout(), &mut io::stderr());
//! assert_eq!(code, 0);
//! ```
//!
//! ## Available Subcommands
//!
//! - `cards --banker 34 --player 99`: formula prediction from two hands
//! - `sequence --history BBPBP [--ai]`: streak heuristic, optionally the forest
//! - `stats --input FILE`: statistics of a recorded history
//! - `export --input FILE --format csv|json [--output FILE]`: convert a history
//! - `replay --input FILE [--train]`: re-predict a history round by round
//! - `cfg`: resolved configuration with value sources

use clap::Parser;
use std::io::Write;

pub mod cli;
mod commands;
pub mod config;
mod error;
pub mod exit_code;
pub mod formatters;
pub mod io_utils;
pub mod ui;
pub mod validation;

use cli::{BaccaratCli, Commands};
use commands::{
    handle_cards_command, handle_cfg_command, handle_export_command, handle_replay_command,
    handle_sequence_command, handle_stats_command,
};

pub use error::{BatchValidationError, CliError};

/// Main entry point for the CLI application.
///
/// Returns the process exit code: `0` on success (help and version
/// included), `2` on any error. Errors are written to `err` with an
/// `Error:` prefix.
///
/// ```
/// use std::io;
/// let args = vec!["baccarat", "cards", "--banker", "34", "--player", "99"];
/// let code = baccarat_cli::run(args, &mut io::stdout(), &mut io::stderr());
/// assert_eq!(code, 0);
/// ```
pub fn run<I, S>(args: I, out: &mut dyn Write, err: &mut dyn Write) -> i32
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    const COMMANDS: &[&str] = &["cards", "sequence", "stats", "export", "replay", "cfg"];
    let argv: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();

    let cli = match BaccaratCli::try_parse_from(&argv) {
        Ok(cli) => cli,
        Err(e) => {
            use clap::error::ErrorKind;

            // Help and version should print to stdout and exit 0
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    if write!(out, "{}", e).is_err() {
                        return exit_code::ERROR;
                    }
                    exit_code::SUCCESS
                }
                _ => {
                    if writeln!(err, "{}", e).is_err()
                        || writeln!(err, "Usage: baccarat <command> [options]\n").is_err()
                        || writeln!(err, "Commands:").is_err()
                    {
                        return exit_code::ERROR;
                    }
                    for c in COMMANDS {
                        if writeln!(err, "  {}", c).is_err() {
                            return exit_code::ERROR;
                        }
                    }
                    let _ = writeln!(err, "\nFor full help, run: baccarat --help");
                    exit_code::ERROR
                }
            };
        }
    };

    let result = match cli.cmd {
        Commands::Cards {
            banker,
            player,
            json,
        } => handle_cards_command(&banker, &player, json, out),
        Commands::Sequence { history, ai, json } => {
            handle_sequence_command(&history, ai, json, out, err)
        }
        Commands::Stats { input, json } => handle_stats_command(&input, json, out, err),
        Commands::Export {
            input,
            format,
            output,
        } => handle_export_command(&input, format, output.as_deref(), out),
        Commands::Replay { input, train } => handle_replay_command(&input, train, out, err),
        Commands::Cfg => handle_cfg_command(out),
    };

    match result {
        Ok(()) => exit_code::SUCCESS,
        Err(e) => {
            let _ = ui::write_error(err, &e.to_string());
            exit_code::ERROR
        }
    }
}
