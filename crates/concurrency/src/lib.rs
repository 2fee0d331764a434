//! Concurrency layer for memfs
//!
//! This crate implements the transactional substrate of the file store:
//! - `LockManager`: shared/exclusive whole-file locks with FIFO waiters,
//!   condvar parking, wait-for-graph deadlock detection, and cancellation
//! - `Transaction`: the per-transaction state machine, ordered write
//!   buffer, own-visibility overlay, and SNAPSHOT version map
//! - `TransactionManager`: lifecycle, isolation policy, auto-commit
//!   wrapping, and commit/rollback orchestration against the tree

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod lock;
pub mod manager;
pub mod transaction;

pub use lock::{LockManager, LockMode};
pub use manager::TransactionManager;
pub use transaction::{Transaction, TxnState};
