//! The `MemFs` facade: one value owning the whole store.
//!
//! Instantiate one per process, or one per test; there are no globals. All
//! paths given to these methods resolve against the root; clients that
//! need a working directory use a `Session`.

use crate::session::Session;
use memfs_concurrency::{TransactionManager, TxnState};
use memfs_core::{IsolationLevel, Path, Result, TxnId};
use std::sync::Arc;

/// Handle to an in-memory transactional file store.
///
/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct MemFs {
    pub(crate) manager: Arc<TransactionManager>,
}

impl MemFs {
    /// Create an empty store (a lone root directory).
    pub fn new() -> Self {
        MemFs {
            manager: Arc::new(TransactionManager::new()),
        }
    }

    /// Create a session with its own working directory.
    pub fn session(&self) -> Session {
        Session::new(self.clone())
    }

    // =========================================================================
    // Transaction control
    // =========================================================================

    /// Start a transaction at the given isolation level.
    pub fn begin(&self, isolation: IsolationLevel) -> TxnId {
        self.manager.begin(isolation)
    }

    /// Commit a transaction, making its buffered operations visible.
    pub fn commit(&self, txn: TxnId) -> Result<()> {
        self.manager.commit(txn)
    }

    /// Abort a transaction, discarding its buffered operations.
    pub fn abort(&self, txn: TxnId) -> Result<()> {
        self.manager.abort(txn)
    }

    /// Roll back an active transaction.
    pub fn rollback(&self, txn: TxnId) -> Result<()> {
        self.manager.rollback(txn)
    }

    /// Lifecycle state of a transaction.
    pub fn txn_state(&self, txn: TxnId) -> Result<TxnState> {
        self.manager.txn_state(txn)
    }

    // =========================================================================
    // Filesystem operations (root-relative paths)
    // =========================================================================

    /// Create a directory.
    pub fn mkdir(&self, path: &str, txn: Option<TxnId>) -> Result<()> {
        self.manager.mkdir(txn, &Path::parse_abs(path)?)
    }

    /// Create an empty file.
    pub fn touch(&self, path: &str, txn: Option<TxnId>) -> Result<()> {
        self.manager.touch(txn, &Path::parse_abs(path)?)
    }

    /// Mark a file open.
    pub fn open(&self, path: &str, txn: Option<TxnId>) -> Result<()> {
        self.manager.open(txn, &Path::parse_abs(path)?)
    }

    /// Read a file.
    pub fn read(&self, path: &str, txn: Option<TxnId>) -> Result<String> {
        self.manager.read(txn, &Path::parse_abs(path)?)
    }

    /// Write a file (buffered under a transaction, immediate otherwise).
    pub fn write(&self, path: &str, content: &str, txn: Option<TxnId>) -> Result<()> {
        self.manager.write(txn, &Path::parse_abs(path)?, content)
    }

    /// Remove a file or empty directory.
    pub fn rm(&self, path: &str, txn: Option<TxnId>) -> Result<()> {
        self.manager.rm(txn, &Path::parse_abs(path)?)
    }

    /// Move or rename an entry.
    pub fn mv(&self, src: &str, dst: &str, txn: Option<TxnId>) -> Result<()> {
        self.manager
            .mv(txn, &Path::parse_abs(src)?, &Path::parse_abs(dst)?)
    }

    /// List a directory.
    pub fn ls(&self, path: &str, txn: Option<TxnId>) -> Result<Vec<String>> {
        self.manager.ls(txn, &Path::parse_abs(path)?)
    }
}

impl Default for MemFs {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instances_are_isolated() {
        let a = MemFs::new();
        let b = MemFs::new();
        a.touch("/f", None).unwrap();
        assert!(b.read("/f", None).is_err());
    }

    #[test]
    fn test_clone_shares_store() {
        let a = MemFs::new();
        let b = a.clone();
        a.touch("/f", None).unwrap();
        a.write("/f", "x", None).unwrap();
        assert_eq!(b.read("/f", None).unwrap(), "x");
    }

    #[test]
    fn test_relative_paths_resolve_against_root() {
        let fs = MemFs::new();
        fs.mkdir("dir", None).unwrap();
        fs.touch("dir/file", None).unwrap();
        assert_eq!(fs.ls("/dir", None).unwrap(), vec!["file"]);
    }
}
