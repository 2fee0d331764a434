//! Command-line grammar and ArgMatches → Command conversion.
//!
//! One console command per line:
//!
//! ```text
//! mkdir <path>              touch <path>
//! open <path>               read <path>  [--txn <id>]
//! write <path> <content>    [--txn <id>]
//! rm <path>                 mv <src> <dst>
//! ls [<path>]               cd <path>
//! txn_start [<isolation>]   txn_commit <id>     txn_abort <id>
//! ```
//!
//! Every filesystem command accepts `--txn` (the grammar shows it where
//! the core scenarios need it; the instruction set supports it uniformly).

use clap::{Arg, ArgMatches};
use memfs_executor::{Command, IsolationLevel, TxnId};

/// REPL meta-commands, handled before clap sees the line.
pub enum MetaCommand {
    /// Print help, optionally for one command.
    Help {
        /// The command to describe.
        command: Option<String>,
    },
    /// Leave the REPL.
    Quit,
    /// Clear the screen.
    Clear,
}

/// Check for REPL meta-commands before delegating to clap.
pub fn check_meta_command(line: &str) -> Option<MetaCommand> {
    let mut parts = line.trim().splitn(2, char::is_whitespace);
    match parts.next()? {
        "quit" | "exit" => Some(MetaCommand::Quit),
        "clear" => Some(MetaCommand::Clear),
        "help" => Some(MetaCommand::Help {
            command: parts.next().map(|s| s.trim().to_string()),
        }),
        _ => None,
    }
}

/// Build the command tree shared by shell mode and the REPL.
///
/// `repl` drops the binary name so lines can be fed straight to
/// `try_get_matches_from`.
pub fn build_cmd(repl: bool) -> clap::Command {
    let mut cmd = clap::Command::new("memfs")
        .about("Interactive console for the memfs transactional file store")
        .subcommand_required(false)
        .disable_help_subcommand(true)
        .subcommand(
            clap::Command::new("mkdir")
                .about("Create a directory")
                .arg(Arg::new("path").required(true))
                .arg(txn_flag()),
        )
        .subcommand(
            clap::Command::new("touch")
                .about("Create an empty file")
                .arg(Arg::new("path").required(true))
                .arg(txn_flag()),
        )
        .subcommand(
            clap::Command::new("open")
                .about("Open a file (required before read)")
                .arg(Arg::new("path").required(true))
                .arg(txn_flag()),
        )
        .subcommand(
            clap::Command::new("read")
                .about("Read a file")
                .arg(Arg::new("path").required(true))
                .arg(txn_flag()),
        )
        .subcommand(
            clap::Command::new("write")
                .about("Write a file")
                .arg(Arg::new("path").required(true))
                .arg(Arg::new("content").required(true))
                .arg(txn_flag()),
        )
        .subcommand(
            clap::Command::new("rm")
                .about("Remove a file or empty directory")
                .arg(Arg::new("path").required(true))
                .arg(txn_flag()),
        )
        .subcommand(
            clap::Command::new("mv")
                .about("Move or rename an entry")
                .arg(Arg::new("src").required(true))
                .arg(Arg::new("dst").required(true))
                .arg(txn_flag()),
        )
        .subcommand(
            clap::Command::new("ls")
                .about("List a directory (defaults to the working directory)")
                .arg(Arg::new("path"))
                .arg(txn_flag()),
        )
        .subcommand(
            clap::Command::new("cd")
                .about("Change the working directory")
                .arg(Arg::new("path").required(true)),
        )
        .subcommand(
            clap::Command::new("txn_start")
                .about("Start a transaction (READ_UNCOMMITTED | READ_COMMITTED | SNAPSHOT)")
                .arg(Arg::new("isolation")),
        )
        .subcommand(
            clap::Command::new("txn_commit")
                .about("Commit a transaction")
                .arg(Arg::new("txn").required(true)),
        )
        .subcommand(
            clap::Command::new("txn_abort")
                .about("Abort a transaction")
                .arg(Arg::new("txn").required(true)),
        );

    if repl {
        cmd = cmd.no_binary_name(true).disable_version_flag(true);
    } else {
        cmd = cmd
            .arg(
                Arg::new("json")
                    .long("json")
                    .help("JSON output mode")
                    .action(clap::ArgAction::SetTrue)
                    .conflicts_with("raw")
                    .global(true),
            )
            .arg(
                Arg::new("raw")
                    .long("raw")
                    .help("Raw output mode (no quotes, no prefixes)")
                    .action(clap::ArgAction::SetTrue)
                    .global(true),
            );
    }
    cmd
}

fn txn_flag() -> Arg {
    Arg::new("txn")
        .long("txn")
        .value_name("id")
        .help("Run under the given transaction")
}

/// Convert parsed matches into a Command.
pub fn matches_to_command(matches: &ArgMatches) -> Result<Command, String> {
    let (name, sub) = matches
        .subcommand()
        .ok_or_else(|| "no command provided".to_string())?;

    let command = match name {
        "mkdir" => Command::Mkdir {
            path: required(sub, "path"),
            txn: txn_arg(sub)?,
        },
        "touch" => Command::Touch {
            path: required(sub, "path"),
            txn: txn_arg(sub)?,
        },
        "open" => Command::Open {
            path: required(sub, "path"),
            txn: txn_arg(sub)?,
        },
        "read" => Command::Read {
            path: required(sub, "path"),
            txn: txn_arg(sub)?,
        },
        "write" => Command::Write {
            path: required(sub, "path"),
            content: required(sub, "content"),
            txn: txn_arg(sub)?,
        },
        "rm" => Command::Rm {
            path: required(sub, "path"),
            txn: txn_arg(sub)?,
        },
        "mv" => Command::Mv {
            src: required(sub, "src"),
            dst: required(sub, "dst"),
            txn: txn_arg(sub)?,
        },
        "ls" => Command::Ls {
            path: sub.get_one::<String>("path").cloned(),
            txn: txn_arg(sub)?,
        },
        "cd" => Command::Cd {
            path: required(sub, "path"),
        },
        "txn_start" => Command::TxnStart {
            isolation: sub
                .get_one::<String>("isolation")
                .map(|token| token.parse::<IsolationLevel>())
                .transpose()
                .map_err(|err| err.to_string())?,
        },
        "txn_commit" => Command::TxnCommit {
            txn: parse_txn(&required(sub, "txn"))?,
        },
        "txn_abort" => Command::TxnAbort {
            txn: parse_txn(&required(sub, "txn"))?,
        },
        other => return Err(format!("unknown command: {}", other)),
    };
    Ok(command)
}

fn required(matches: &ArgMatches, name: &str) -> String {
    matches
        .get_one::<String>(name)
        .cloned()
        .unwrap_or_default()
}

fn txn_arg(matches: &ArgMatches) -> Result<Option<TxnId>, String> {
    matches
        .get_one::<String>("txn")
        .map(|raw| parse_txn(raw))
        .transpose()
}

fn parse_txn(raw: &str) -> Result<TxnId, String> {
    raw.parse::<TxnId>().map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Command, String> {
        let tokens: Vec<String> = line.split_whitespace().map(String::from).collect();
        let matches = build_cmd(true)
            .try_get_matches_from(tokens)
            .map_err(|err| err.to_string())?;
        matches_to_command(&matches)
    }

    #[test]
    fn test_parse_mkdir() {
        assert_eq!(
            parse("mkdir /a/b").unwrap(),
            Command::Mkdir { path: "/a/b".into(), txn: None }
        );
    }

    #[test]
    fn test_parse_write_with_txn() {
        assert_eq!(
            parse("write /f hello --txn txn-3").unwrap(),
            Command::Write {
                path: "/f".into(),
                content: "hello".into(),
                txn: Some(TxnId::from_raw(3)),
            }
        );
    }

    #[test]
    fn test_parse_read_with_bare_txn_id() {
        assert_eq!(
            parse("read /f --txn 7").unwrap(),
            Command::Read { path: "/f".into(), txn: Some(TxnId::from_raw(7)) }
        );
    }

    #[test]
    fn test_parse_ls_default_path() {
        assert_eq!(parse("ls").unwrap(), Command::Ls { path: None, txn: None });
    }

    #[test]
    fn test_parse_txn_start_isolation() {
        assert_eq!(
            parse("txn_start SNAPSHOT").unwrap(),
            Command::TxnStart { isolation: Some(IsolationLevel::Snapshot) }
        );
        assert_eq!(parse("txn_start").unwrap(), Command::TxnStart { isolation: None });
    }

    #[test]
    fn test_parse_unknown_isolation() {
        let err = parse("txn_start SERIALIZABLE").unwrap_err();
        assert!(err.contains("unknown isolation level"));
    }

    #[test]
    fn test_parse_mv() {
        assert_eq!(
            parse("mv /a /b").unwrap(),
            Command::Mv { src: "/a".into(), dst: "/b".into(), txn: None }
        );
    }

    #[test]
    fn test_parse_txn_commit_bad_id() {
        assert!(parse("txn_commit not-a-txn").is_err());
    }

    #[test]
    fn test_missing_required_arg() {
        assert!(parse("mkdir").is_err());
    }

    #[test]
    fn test_meta_commands() {
        assert!(matches!(check_meta_command("quit"), Some(MetaCommand::Quit)));
        assert!(matches!(check_meta_command("exit"), Some(MetaCommand::Quit)));
        assert!(matches!(check_meta_command("clear"), Some(MetaCommand::Clear)));
        assert!(matches!(
            check_meta_command("help read"),
            Some(MetaCommand::Help { command: Some(_) })
        ));
        assert!(check_meta_command("mkdir /d").is_none());
    }
}
