//! Command enum defining the file store's operations.
//!
//! Commands are the instruction set of the store: every externally
//! reachable operation is a variant. They are self-contained (all
//! parameters in the variant), serializable (JSON round-trip for
//! cross-process use), and pure data.
//!
//! Paths are carried as raw strings and resolved against the session's
//! working directory at execution time.

use memfs_core::{IsolationLevel, TxnId};
use serde::{Deserialize, Serialize};

/// A self-contained, serializable operation.
///
/// Filesystem commands carry an optional transaction handle; without one
/// they run as implicit auto-commit transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub enum Command {
    /// Create a directory.
    /// Returns: `Output::Unit`
    Mkdir {
        /// Directory path to create.
        path: String,
        /// Optional transaction handle.
        txn: Option<TxnId>,
    },

    /// Create an empty file.
    /// Returns: `Output::Unit`
    Touch {
        /// File path to create.
        path: String,
        /// Optional transaction handle.
        txn: Option<TxnId>,
    },

    /// Mark a file open (required before reads succeed).
    /// Returns: `Output::Unit`
    Open {
        /// File path to open.
        path: String,
        /// Optional transaction handle.
        txn: Option<TxnId>,
    },

    /// Read a file's content under the transaction's isolation level.
    /// Returns: `Output::Content`
    Read {
        /// File path to read.
        path: String,
        /// Optional transaction handle.
        txn: Option<TxnId>,
    },

    /// Buffer a new version of a file.
    /// Returns: `Output::Unit`
    Write {
        /// File path to write.
        path: String,
        /// The new content.
        content: String,
        /// Optional transaction handle.
        txn: Option<TxnId>,
    },

    /// Remove a file or empty directory.
    /// Returns: `Output::Unit`
    Rm {
        /// Path to remove.
        path: String,
        /// Optional transaction handle.
        txn: Option<TxnId>,
    },

    /// Move or rename an entry.
    /// Returns: `Output::Unit`
    Mv {
        /// Source path.
        src: String,
        /// Destination path.
        dst: String,
        /// Optional transaction handle.
        txn: Option<TxnId>,
    },

    /// List a directory; defaults to the session's working directory.
    /// Returns: `Output::Names`
    Ls {
        /// Directory path; `None` lists the working directory.
        path: Option<String>,
        /// Optional transaction handle.
        txn: Option<TxnId>,
    },

    /// Change the session's working directory.
    /// Returns: `Output::Cwd`
    Cd {
        /// New working directory.
        path: String,
    },

    /// Start a transaction.
    /// Returns: `Output::TxnStarted`
    TxnStart {
        /// Isolation level; defaults to READ_COMMITTED.
        isolation: Option<IsolationLevel>,
    },

    /// Commit a transaction.
    /// Returns: `Output::Unit`
    TxnCommit {
        /// The transaction to commit.
        txn: TxnId,
    },

    /// Abort a transaction.
    /// Returns: `Output::Unit`
    TxnAbort {
        /// The transaction to abort.
        txn: TxnId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_json_roundtrip() {
        let cmd = Command::Write {
            path: "/a/b".into(),
            content: "hello".into(),
            txn: Some(TxnId::from_raw(4)),
        };
        let json = serde_json::to_string(&cmd).unwrap();
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn test_command_json_shape() {
        let cmd = Command::TxnStart {
            isolation: Some(IsolationLevel::Snapshot),
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(json, r#"{"TxnStart":{"isolation":"Snapshot"}}"#);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let json = r#"{"Cd":{"path":"/x","extra":1}}"#;
        assert!(serde_json::from_str::<Command>(json).is_err());
    }
}
