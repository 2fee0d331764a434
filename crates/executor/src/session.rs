//! Per-client session: a working directory plus command dispatch.
//!
//! Commands carry raw path strings; the session resolves them against its
//! working directory before routing them to the transaction manager. `cd`
//! validates the target directory before updating the session.

use crate::command::Command;
use crate::memfs::MemFs;
use crate::output::Output;
use memfs_core::{Path, Result};

/// One client's view of the store: shared data, private working directory.
pub struct Session {
    fs: MemFs,
    cwd: Path,
}

impl Session {
    /// Create a session rooted at `/`.
    pub fn new(fs: MemFs) -> Self {
        Session {
            fs,
            cwd: Path::root(),
        }
    }

    /// The session's working directory.
    pub fn cwd(&self) -> String {
        self.cwd.to_string()
    }

    /// Execute one command, resolving relative paths against the working
    /// directory.
    pub fn execute(&mut self, cmd: Command) -> Result<Output> {
        let manager = &self.fs.manager;
        match cmd {
            Command::Mkdir { path, txn } => {
                manager.mkdir(txn, &self.resolve(&path)?)?;
                Ok(Output::Unit)
            }
            Command::Touch { path, txn } => {
                manager.touch(txn, &self.resolve(&path)?)?;
                Ok(Output::Unit)
            }
            Command::Open { path, txn } => {
                manager.open(txn, &self.resolve(&path)?)?;
                Ok(Output::Unit)
            }
            Command::Read { path, txn } => {
                let content = manager.read(txn, &self.resolve(&path)?)?;
                Ok(Output::Content(content))
            }
            Command::Write { path, content, txn } => {
                manager.write(txn, &self.resolve(&path)?, &content)?;
                Ok(Output::Unit)
            }
            Command::Rm { path, txn } => {
                manager.rm(txn, &self.resolve(&path)?)?;
                Ok(Output::Unit)
            }
            Command::Mv { src, dst, txn } => {
                manager.mv(txn, &self.resolve(&src)?, &self.resolve(&dst)?)?;
                Ok(Output::Unit)
            }
            Command::Ls { path, txn } => {
                let target = match path {
                    Some(path) => self.resolve(&path)?,
                    None => self.cwd.clone(),
                };
                Ok(Output::Names(manager.ls(txn, &target)?))
            }
            Command::Cd { path } => {
                let target = self.resolve(&path)?;
                manager.ensure_dir(None, &target)?;
                self.cwd = target;
                Ok(Output::Cwd(self.cwd()))
            }
            Command::TxnStart { isolation } => {
                let txn = manager.begin(isolation.unwrap_or_default());
                Ok(Output::TxnStarted(txn))
            }
            Command::TxnCommit { txn } => {
                manager.commit(txn)?;
                Ok(Output::Unit)
            }
            Command::TxnAbort { txn } => {
                manager.abort(txn)?;
                Ok(Output::Unit)
            }
        }
    }

    fn resolve(&self, input: &str) -> Result<Path> {
        Path::parse(input, &self.cwd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memfs_core::Error;

    fn session() -> Session {
        MemFs::new().session()
    }

    fn exec(session: &mut Session, cmd: Command) -> Output {
        session.execute(cmd).unwrap()
    }

    #[test]
    fn test_cd_resolves_relative_commands() {
        let mut s = session();
        exec(&mut s, Command::Mkdir { path: "/d".into(), txn: None });
        exec(&mut s, Command::Cd { path: "d".into() });
        assert_eq!(s.cwd(), "/d");

        exec(&mut s, Command::Touch { path: "f".into(), txn: None });
        assert_eq!(
            exec(&mut s, Command::Ls { path: None, txn: None }),
            Output::Names(vec!["f".into()])
        );
        // The file landed under /d.
        assert_eq!(
            exec(&mut s, Command::Ls { path: Some("/d".into()), txn: None }),
            Output::Names(vec!["f".into()])
        );
    }

    #[test]
    fn test_cd_rejects_files_and_missing_dirs() {
        let mut s = session();
        exec(&mut s, Command::Touch { path: "/f".into(), txn: None });
        assert!(matches!(
            s.execute(Command::Cd { path: "/f".into() }).unwrap_err(),
            Error::NotADirectory { .. }
        ));
        assert!(matches!(
            s.execute(Command::Cd { path: "/nope".into() }).unwrap_err(),
            Error::NoSuchDirectory { .. }
        ));
        assert_eq!(s.cwd(), "/");
    }

    #[test]
    fn test_transaction_commands_roundtrip() {
        let mut s = session();
        exec(&mut s, Command::Touch { path: "/f".into(), txn: None });
        exec(&mut s, Command::Open { path: "/f".into(), txn: None });

        let txn = match exec(&mut s, Command::TxnStart { isolation: None }) {
            Output::TxnStarted(txn) => txn,
            other => panic!("unexpected {:?}", other),
        };
        exec(
            &mut s,
            Command::Write { path: "/f".into(), content: "X".into(), txn: Some(txn) },
        );
        assert_eq!(
            exec(&mut s, Command::Read { path: "/f".into(), txn: None }),
            Output::Content(String::new())
        );
        assert_eq!(
            exec(&mut s, Command::Read { path: "/f".into(), txn: Some(txn) }),
            Output::Content("X".into())
        );
        exec(&mut s, Command::TxnCommit { txn });
        assert_eq!(
            exec(&mut s, Command::Read { path: "/f".into(), txn: None }),
            Output::Content("X".into())
        );
    }

    #[test]
    fn test_txn_abort_command() {
        let mut s = session();
        exec(&mut s, Command::Touch { path: "/f".into(), txn: None });
        exec(&mut s, Command::Write { path: "/f".into(), content: "old".into(), txn: None });
        let txn = match exec(&mut s, Command::TxnStart { isolation: None }) {
            Output::TxnStarted(txn) => txn,
            other => panic!("unexpected {:?}", other),
        };
        exec(
            &mut s,
            Command::Write { path: "/f".into(), content: "new".into(), txn: Some(txn) },
        );
        exec(&mut s, Command::TxnAbort { txn });
        assert_eq!(
            exec(&mut s, Command::Read { path: "/f".into(), txn: None }),
            Output::Content("old".into())
        );
    }

    #[test]
    fn test_mv_via_commands() {
        let mut s = session();
        exec(&mut s, Command::Mkdir { path: "/d".into(), txn: None });
        exec(&mut s, Command::Touch { path: "/x".into(), txn: None });
        exec(&mut s, Command::Mv { src: "/x".into(), dst: "/d".into(), txn: None });
        assert_eq!(
            exec(&mut s, Command::Ls { path: Some("/d".into()), txn: None }),
            Output::Names(vec!["x".into()])
        );
    }
}
