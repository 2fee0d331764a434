//! Storage layer for memfs
//!
//! This crate owns the two data structures everything else sits on:
//! - `VersionedFile`: a file's content history as an append-only diff chain
//! - `Tree`: the directory hierarchy with atomic structural operations
//!
//! Both types protect their own invariants internally (`parking_lot` locks),
//! so callers can share them freely behind `Arc`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod diff;
pub mod tree;
pub mod versioned;

pub use diff::{Diff, DiffOp};
pub use tree::{DetachedNode, FileRef, Tree};
pub use versioned::VersionedFile;
