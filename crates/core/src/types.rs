//! Identifiers and enums shared across the file store
//!
//! - `NodeId`: unique identity of a tree entry, stable across renames/moves
//! - `TxnId`: transaction handle, printable as `txn-<n>`
//! - `IsolationLevel`: read-visibility policy for a transaction
//! - `NodeKind`: tagged discriminator for tree entries

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for an entry in the filesystem tree.
///
/// A `NodeId` is a wrapper around a UUID v4. Identity is assigned when an
/// entry is created and never changes, so locks and snapshot maps keyed by
/// `NodeId` survive renames and moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Create a new random NodeId using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a NodeId from raw bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction handle.
///
/// Internally a monotonically assigned `u64`; rendered as `txn-<n>` so the
/// console can hand the id back to the user as a stable string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxnId(u64);

impl TxnId {
    /// Wrap a raw transaction number.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw transaction number.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn-{}", self.0)
    }
}

impl FromStr for TxnId {
    type Err = Error;

    /// Parse a transaction id from its display form.
    ///
    /// Accepts both `txn-7` and the bare number `7`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("txn-").unwrap_or(s);
        digits
            .parse::<u64>()
            .map(TxnId)
            .map_err(|_| Error::invalid_operation(format!("invalid transaction id: {}", s)))
    }
}

/// What a read observes inside a transaction.
///
/// Because writes are buffered until commit, READ_UNCOMMITTED cannot observe
/// another transaction's in-flight writes and degenerates to READ_COMMITTED.
/// It is kept as a distinct level so callers can state intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IsolationLevel {
    /// Reads observe the current committed version (degenerate, see above).
    ReadUncommitted,
    /// Reads observe the current committed version at read time.
    #[default]
    ReadCommitted,
    /// Reads observe the version captured when the transaction began.
    Snapshot,
}

impl IsolationLevel {
    /// The console token for this level.
    pub fn as_token(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ_UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ_COMMITTED",
            IsolationLevel::Snapshot => "SNAPSHOT",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl FromStr for IsolationLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "READ_UNCOMMITTED" => Ok(IsolationLevel::ReadUncommitted),
            "READ_COMMITTED" => Ok(IsolationLevel::ReadCommitted),
            "SNAPSHOT" => Ok(IsolationLevel::Snapshot),
            _ => Err(Error::IsolationUnknown {
                token: s.to_string(),
            }),
        }
    }
}

/// Tagged discriminator for tree entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// A directory: a named mapping to child entries.
    Directory,
    /// A file: owns a versioned content chain.
    File,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Directory => f.write_str("directory"),
            NodeKind::File => f.write_str("file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_unique() {
        let a = NodeId::new();
        let b = NodeId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_node_id_from_bytes_roundtrip() {
        let id = NodeId::from_bytes([7u8; 16]);
        assert_eq!(id, NodeId::from_bytes([7u8; 16]));
    }

    #[test]
    fn test_txn_id_display() {
        assert_eq!(TxnId::from_raw(42).to_string(), "txn-42");
    }

    #[test]
    fn test_txn_id_parse_prefixed() {
        let id: TxnId = "txn-7".parse().unwrap();
        assert_eq!(id, TxnId::from_raw(7));
    }

    #[test]
    fn test_txn_id_parse_bare() {
        let id: TxnId = "7".parse().unwrap();
        assert_eq!(id, TxnId::from_raw(7));
    }

    #[test]
    fn test_txn_id_parse_invalid() {
        assert!("txn-x".parse::<TxnId>().is_err());
        assert!("".parse::<TxnId>().is_err());
    }

    #[test]
    fn test_txn_id_serde_transparent() {
        let json = serde_json::to_string(&TxnId::from_raw(3)).unwrap();
        assert_eq!(json, "3");
    }

    #[test]
    fn test_isolation_tokens_roundtrip() {
        for level in [
            IsolationLevel::ReadUncommitted,
            IsolationLevel::ReadCommitted,
            IsolationLevel::Snapshot,
        ] {
            let parsed: IsolationLevel = level.as_token().parse().unwrap();
            assert_eq!(parsed, level);
        }
    }

    #[test]
    fn test_isolation_parse_case_insensitive() {
        let parsed: IsolationLevel = "snapshot".parse().unwrap();
        assert_eq!(parsed, IsolationLevel::Snapshot);
    }

    #[test]
    fn test_isolation_parse_unknown() {
        let err = "SERIALIZABLE".parse::<IsolationLevel>().unwrap_err();
        assert!(matches!(err, Error::IsolationUnknown { .. }));
    }

    #[test]
    fn test_isolation_default_is_read_committed() {
        assert_eq!(IsolationLevel::default(), IsolationLevel::ReadCommitted);
    }
}
