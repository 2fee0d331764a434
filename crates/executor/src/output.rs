//! Output enum for command execution results.
//!
//! Every command produces exactly one output variant; the mapping is
//! deterministic and documented on the command definitions.

use memfs_core::TxnId;
use serde::{Deserialize, Serialize};

/// Successful command execution results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Output {
    /// No return value (mkdir, touch, open, write, rm, mv, commit, abort).
    Unit,

    /// File content (read).
    Content(String),

    /// Sorted child names (ls).
    Names(Vec<String>),

    /// Handle of a freshly started transaction (txn_start).
    TxnStarted(TxnId),

    /// The session's working directory after a cd.
    Cwd(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_json_roundtrip() {
        let output = Output::Names(vec!["a".into(), "b".into()]);
        let json = serde_json::to_string(&output).unwrap();
        let back: Output = serde_json::from_str(&json).unwrap();
        assert_eq!(back, output);
    }

    #[test]
    fn test_txn_started_serializes_raw_id() {
        let json = serde_json::to_string(&Output::TxnStarted(TxnId::from_raw(9))).unwrap();
        assert_eq!(json, r#"{"TxnStarted":9}"#);
    }
}
