//! REPL loop with rustyline.
//!
//! Interactive mode: prompt, meta-commands, history, TAB completion on
//! command names. Pipe mode: read lines from stdin, execute each.

use std::io::{self, BufRead};
use std::path::PathBuf;

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, Editor, Helper};

use crate::format::{format_error, format_output, OutputMode};
use crate::parse::{build_cmd, check_meta_command, matches_to_command, MetaCommand};
use crate::state::SessionState;

const COMMANDS: &[&str] = &[
    "mkdir", "touch", "open", "read", "write", "rm", "mv", "ls", "cd", "txn_start",
    "txn_commit", "txn_abort", "help", "quit", "exit", "clear",
];

/// Run the interactive REPL.
pub fn run_repl(state: &mut SessionState, mode: OutputMode) {
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .build();

    let mut rl: Editor<MemfsHelper, _> = Editor::with_config(config).unwrap();
    rl.set_helper(Some(MemfsHelper));

    let history_path = history_file();
    if let Some(ref path) = history_path {
        let _ = rl.load_history(path);
    }

    loop {
        match rl.readline(&state.prompt()) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                if let Some(meta) = check_meta_command(trimmed) {
                    match meta {
                        MetaCommand::Quit => break,
                        MetaCommand::Clear => print!("\x1B[2J\x1B[1;1H"),
                        MetaCommand::Help { command } => print_help(command.as_deref()),
                    }
                    continue;
                }

                execute_line(trimmed, state, mode);
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("(error) {:?}", err);
                break;
            }
        }
    }

    if let Some(ref path) = history_path {
        let _ = rl.save_history(path);
    }
}

/// Run in pipe mode: read lines from stdin, execute each.
///
/// Lines starting with `#` are comments. Returns the process exit code.
pub fn run_pipe(state: &mut SessionState, mode: OutputMode) -> i32 {
    let stdin = io::stdin();
    let mut exit_code = 0;

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if !execute_line(trimmed, state, mode) {
            exit_code = 1;
        }
    }

    exit_code
}

/// Tokenize, parse, and execute one line. Returns true on success.
pub fn execute_line(line: &str, state: &mut SessionState, mode: OutputMode) -> bool {
    let tokens = match shlex::split(line) {
        Some(tokens) if !tokens.is_empty() => tokens,
        Some(_) => return true,
        None => {
            eprintln!("(error) invalid quoting: {}", line);
            return false;
        }
    };

    let matches = match build_cmd(true).try_get_matches_from(tokens) {
        Ok(matches) => matches,
        Err(err) => {
            eprintln!("{}", err);
            return false;
        }
    };

    let cmd = match matches_to_command(&matches) {
        Ok(cmd) => cmd,
        Err(err) => {
            eprintln!("(error) {}", err);
            return false;
        }
    };

    match state.execute(cmd) {
        Ok(output) => {
            let formatted = format_output(&output, mode);
            if !formatted.is_empty() {
                println!("{}", formatted);
            }
            true
        }
        Err(err) => {
            eprintln!("{}", format_error(&err, mode));
            false
        }
    }
}

fn print_help(command: Option<&str>) {
    let mut cmd = build_cmd(true);
    match command {
        Some(name) => {
            if let Some(sub) = cmd.find_subcommand_mut(name) {
                let _ = sub.print_help();
            } else {
                eprintln!("(error) unknown command: {}", name);
            }
        }
        None => {
            let _ = cmd.print_help();
        }
    }
}

fn history_file() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".memfs_history"))
}

/// Completion on command names; everything else is left alone.
struct MemfsHelper;

impl Completer for MemfsHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        if prefix.contains(' ') {
            return Ok((pos, Vec::new()));
        }
        let candidates = COMMANDS
            .iter()
            .filter(|name| name.starts_with(prefix))
            .map(|name| Pair {
                display: name.to_string(),
                replacement: name.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Hinter for MemfsHelper {
    type Hint = String;
}

impl Highlighter for MemfsHelper {}
impl Validator for MemfsHelper {}
impl Helper for MemfsHelper {}
