//! # memfs
//!
//! An in-memory hierarchical file store with ACI transactions: atomicity,
//! consistency, and isolation, with durability explicitly out of scope
//! (process exit discards all state).
//!
//! Clients act directly (auto-commit) or under a named transaction with a
//! configurable isolation level (READ_UNCOMMITTED, READ_COMMITTED,
//! SNAPSHOT). Conflicting mutations are fenced by shared/exclusive
//! whole-file locks with deadlock detection; every file keeps its full
//! version history as a diff chain, so aborted transactions restore prior
//! state exactly.
//!
//! # Quick Start
//!
//! ```
//! use memfs::{IsolationLevel, MemFs};
//!
//! fn main() -> memfs::Result<()> {
//!     let fs = MemFs::new();
//!
//!     fs.touch("/notes", None)?;
//!     fs.open("/notes", None)?;
//!
//!     // Auto-commit write, immediately visible.
//!     fs.write("/notes", "draft", None)?;
//!     assert_eq!(fs.read("/notes", None)?, "draft");
//!
//!     // Buffered under a transaction until commit.
//!     let txn = fs.begin(IsolationLevel::ReadCommitted);
//!     fs.write("/notes", "final", Some(txn))?;
//!     assert_eq!(fs.read("/notes", None)?, "draft");
//!     fs.commit(txn)?;
//!     assert_eq!(fs.read("/notes", None)?, "final");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! The [`MemFs`] struct is the entry point; [`Session`] adds a per-client
//! working directory and executes the serializable [`Command`] /
//! [`Output`] instruction set (which is what the console speaks).
//!
//! Internal crates (storage, concurrency) are not exposed; only the
//! surface re-exported here is stable.

// Re-export the public API from memfs-executor
pub use memfs_executor::*;
