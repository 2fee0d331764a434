//! Error types for the memfs file store
//!
//! One unified error enum for every layer. We use `thiserror` for automatic
//! `Display` and `Error` trait implementations.
//!
//! ## Error Categories
//!
//! - **Not Found**: the referenced path, entry, or version doesn't exist
//! - **Structure**: the tree shape rejects the operation
//! - **Transaction**: lifecycle and isolation failures
//! - **Locking**: deadlock and cancelled lock waits (retryable)
//! - **Internal**: rollback failures and invariant breaks

use crate::types::TxnId;
use thiserror::Error;

/// Result type alias for file store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all file store operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The path does not resolve to a file.
    #[error("no such file: {path}")]
    NoSuchFile {
        /// The path that failed to resolve
        path: String,
    },

    /// The path does not resolve to a directory.
    #[error("no such directory: {path}")]
    NoSuchDirectory {
        /// The path that failed to resolve
        path: String,
    },

    /// The path resolves to a directory where a file was required.
    #[error("not a file: {path}")]
    NotAFile {
        /// The offending path
        path: String,
    },

    /// The path resolves to a file where a directory was required.
    #[error("not a directory: {path}")]
    NotADirectory {
        /// The offending path
        path: String,
    },

    /// The target name is already taken in its parent directory.
    #[error("already exists: {path}")]
    AlreadyExists {
        /// The conflicting path
        path: String,
    },

    /// A directory cannot be removed while it still has children.
    #[error("directory not empty: {path}")]
    NotEmpty {
        /// The non-empty directory
        path: String,
    },

    /// The file must be opened before it can be read.
    #[error("file not open: {path}")]
    NotOpen {
        /// The unopened file
        path: String,
    },

    /// The requested version index is outside the file's version chain.
    #[error("no such version: {requested} (latest is {latest})")]
    NoSuchVersion {
        /// The version that was requested
        requested: u64,
        /// The newest version in the chain
        latest: u64,
    },

    /// The transaction id is not known to the transaction manager.
    #[error("unknown transaction: {txn}")]
    UnknownTransaction {
        /// The unknown handle
        txn: TxnId,
    },

    /// The transaction has already reached a terminal state.
    #[error("transaction {txn} is not active (already {state})")]
    TransactionNotActive {
        /// The transaction handle
        txn: TxnId,
        /// The state the transaction is in
        state: String,
    },

    /// The isolation token is not one of the supported levels.
    #[error("unknown isolation level: {token}")]
    IsolationUnknown {
        /// The rejected token
        token: String,
    },

    /// Granting the requested lock would close a cycle in the wait-for graph.
    ///
    /// This error is **retryable**: the caller should abort and re-run the
    /// transaction.
    #[error("deadlock detected while {txn} waited for a lock")]
    Deadlock {
        /// The transaction whose request was refused
        txn: TxnId,
    },

    /// A lock wait was cancelled because the transaction was torn down
    /// (abort from another thread).
    #[error("lock wait cancelled for {txn}")]
    LockCancelled {
        /// The cancelled waiter
        txn: TxnId,
    },

    /// A commit failed and the attempt to restore prior state also failed.
    ///
    /// Carries both the rollback failure (`cause`) and the error that
    /// triggered the rollback (`original`).
    #[error("rollback failed: {cause} (while handling: {original})")]
    RollbackFailed {
        /// Why the rollback could not restore prior state
        cause: Box<Error>,
        /// The failure that triggered the rollback
        original: Box<Error>,
    },

    /// The operation is structurally invalid (moving a directory into its
    /// own subtree, removing the root, malformed input).
    #[error("invalid operation: {reason}")]
    InvalidOperation {
        /// Why the operation is invalid
        reason: String,
    },

    /// An internal invariant was broken (unreconstructible version chain).
    #[error("corruption detected: {message}")]
    Corruption {
        /// Description of the broken invariant
        message: String,
    },
}

impl Error {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a NoSuchFile error.
    pub fn no_such_file(path: impl ToString) -> Self {
        Error::NoSuchFile {
            path: path.to_string(),
        }
    }

    /// Create a NoSuchDirectory error.
    pub fn no_such_directory(path: impl ToString) -> Self {
        Error::NoSuchDirectory {
            path: path.to_string(),
        }
    }

    /// Create a NotAFile error.
    pub fn not_a_file(path: impl ToString) -> Self {
        Error::NotAFile {
            path: path.to_string(),
        }
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl ToString) -> Self {
        Error::NotADirectory {
            path: path.to_string(),
        }
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl ToString) -> Self {
        Error::AlreadyExists {
            path: path.to_string(),
        }
    }

    /// Create a NotEmpty error.
    pub fn not_empty(path: impl ToString) -> Self {
        Error::NotEmpty {
            path: path.to_string(),
        }
    }

    /// Create a NotOpen error.
    pub fn not_open(path: impl ToString) -> Self {
        Error::NotOpen {
            path: path.to_string(),
        }
    }

    /// Create a NoSuchVersion error.
    pub fn no_such_version(requested: u64, latest: u64) -> Self {
        Error::NoSuchVersion { requested, latest }
    }

    /// Create an UnknownTransaction error.
    pub fn unknown_transaction(txn: TxnId) -> Self {
        Error::UnknownTransaction { txn }
    }

    /// Create a TransactionNotActive error.
    pub fn transaction_not_active(txn: TxnId, state: impl Into<String>) -> Self {
        Error::TransactionNotActive {
            txn,
            state: state.into(),
        }
    }

    /// Create a Deadlock error.
    pub fn deadlock(txn: TxnId) -> Self {
        Error::Deadlock { txn }
    }

    /// Create a LockCancelled error.
    pub fn lock_cancelled(txn: TxnId) -> Self {
        Error::LockCancelled { txn }
    }

    /// Create a RollbackFailed error from the rollback failure and the
    /// original trigger.
    pub fn rollback_failed(cause: Error, original: Error) -> Self {
        Error::RollbackFailed {
            cause: Box::new(cause),
            original: Box::new(original),
        }
    }

    /// Create an InvalidOperation error.
    pub fn invalid_operation(reason: impl Into<String>) -> Self {
        Error::InvalidOperation {
            reason: reason.into(),
        }
    }

    /// Create a Corruption error.
    pub fn corruption(message: impl Into<String>) -> Self {
        Error::Corruption {
            message: message.into(),
        }
    }

    // =========================================================================
    // Classification
    // =========================================================================

    /// Check if this is a "not found" type error.
    ///
    /// Returns true for: `NoSuchFile`, `NoSuchDirectory`, `NoSuchVersion`.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NoSuchFile { .. } | Error::NoSuchDirectory { .. } | Error::NoSuchVersion { .. }
        )
    }

    /// Check if this error is retryable.
    ///
    /// Retryable errors may succeed if the transaction is aborted and
    /// re-run: `Deadlock`, `LockCancelled`.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Deadlock { .. } | Error::LockCancelled { .. })
    }

    /// Check if this is a transaction lifecycle error.
    ///
    /// Returns true for: `UnknownTransaction`, `TransactionNotActive`,
    /// `RollbackFailed`.
    pub fn is_transaction_error(&self) -> bool {
        matches!(
            self,
            Error::UnknownTransaction { .. }
                | Error::TransactionNotActive { .. }
                | Error::RollbackFailed { .. }
        )
    }

    /// Check if this is a serious/unrecoverable error.
    ///
    /// Serious errors indicate broken invariants and should be investigated:
    /// `RollbackFailed`, `Corruption`.
    pub fn is_serious(&self) -> bool {
        matches!(self, Error::RollbackFailed { .. } | Error::Corruption { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_no_such_file() {
        let err = Error::no_such_file("/a/b");
        assert_eq!(err.to_string(), "no such file: /a/b");
    }

    #[test]
    fn test_display_no_such_version() {
        let err = Error::no_such_version(9, 4);
        let msg = err.to_string();
        assert!(msg.contains("9"));
        assert!(msg.contains("latest is 4"));
    }

    #[test]
    fn test_display_transaction_not_active() {
        let err = Error::transaction_not_active(TxnId::from_raw(3), "committed");
        assert_eq!(
            err.to_string(),
            "transaction txn-3 is not active (already committed)"
        );
    }

    #[test]
    fn test_display_rollback_failed_carries_both() {
        let err = Error::rollback_failed(
            Error::corruption("chain mismatch"),
            Error::already_exists("/x"),
        );
        let msg = err.to_string();
        assert!(msg.contains("chain mismatch"));
        assert!(msg.contains("already exists: /x"));
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::no_such_file("/f").is_not_found());
        assert!(Error::no_such_directory("/d").is_not_found());
        assert!(Error::no_such_version(2, 1).is_not_found());
        assert!(!Error::already_exists("/f").is_not_found());
    }

    #[test]
    fn test_is_retryable() {
        let txn = TxnId::from_raw(1);
        assert!(Error::deadlock(txn).is_retryable());
        assert!(Error::lock_cancelled(txn).is_retryable());
        assert!(!Error::no_such_file("/f").is_retryable());
        assert!(!Error::not_open("/f").is_retryable());
    }

    #[test]
    fn test_is_transaction_error() {
        let txn = TxnId::from_raw(1);
        assert!(Error::unknown_transaction(txn).is_transaction_error());
        assert!(Error::transaction_not_active(txn, "aborted").is_transaction_error());
        assert!(!Error::deadlock(txn).is_transaction_error());
    }

    #[test]
    fn test_is_serious() {
        assert!(Error::corruption("bad").is_serious());
        assert!(
            Error::rollback_failed(Error::corruption("bad"), Error::no_such_file("/f"))
                .is_serious()
        );
        assert!(!Error::no_such_file("/f").is_serious());
    }

    #[test]
    fn test_pattern_matching_fields() {
        let err = Error::no_such_version(5, 3);
        match err {
            Error::NoSuchVersion { requested, latest } => {
                assert_eq!(requested, 5);
                assert_eq!(latest, 3);
            }
            _ => panic!("wrong variant"),
        }
    }
}
