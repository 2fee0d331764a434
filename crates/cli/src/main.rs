//! memfs console — interactive client for the in-memory transactional
//! file store.
//!
//! Three modes:
//! - **Shell mode**: `memfs [flags] COMMAND` — single command, exit
//! - **REPL mode**: `memfs [flags]` — interactive prompt (if stdin is a TTY)
//! - **Pipe mode**: `echo "write /f hello" | memfs` — line-by-line from stdin
//!
//! The store lives only for the lifetime of the process; exit discards all
//! state.

mod format;
mod parse;
mod repl;
mod state;

use std::io::IsTerminal;
use std::process;

use memfs_executor::MemFs;

use format::{format_error, format_output, OutputMode};
use parse::{build_cmd, matches_to_command};
use state::SessionState;

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let matches = build_cmd(false).get_matches();

    let mode = if matches.get_flag("json") {
        OutputMode::Json
    } else if matches.get_flag("raw") {
        OutputMode::Raw
    } else {
        OutputMode::Human
    };

    let mut state = SessionState::new(MemFs::new());

    if matches.subcommand().is_some() {
        process::exit(run_shell_mode(&matches, &mut state, mode));
    } else if std::io::stdin().is_terminal() {
        repl::run_repl(&mut state, mode);
    } else {
        process::exit(repl::run_pipe(&mut state, mode));
    }
}

fn run_shell_mode(matches: &clap::ArgMatches, state: &mut SessionState, mode: OutputMode) -> i32 {
    let cmd = match matches_to_command(matches) {
        Ok(cmd) => cmd,
        Err(err) => {
            eprintln!("(error) {}", err);
            return 1;
        }
    };
    match state.execute(cmd) {
        Ok(output) => {
            let formatted = format_output(&output, mode);
            if !formatted.is_empty() {
                println!("{}", formatted);
            }
            0
        }
        Err(err) => {
            eprintln!("{}", format_error(&err, mode));
            1
        }
    }
}
