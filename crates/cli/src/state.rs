//! Session wrapper with console context.

use memfs_executor::{Command, MemFs, Output, Result, Session};

/// Wraps the executor session and renders the prompt.
pub struct SessionState {
    session: Session,
}

impl SessionState {
    /// Create a state over a fresh session.
    pub fn new(fs: MemFs) -> Self {
        SessionState {
            session: fs.session(),
        }
    }

    /// Execute a command via the session.
    pub fn execute(&mut self, cmd: Command) -> Result<Output> {
        self.session.execute(cmd)
    }

    /// Generate the REPL prompt string.
    pub fn prompt(&self) -> String {
        format!("memfs:{}> ", self.session.cwd())
    }
}
