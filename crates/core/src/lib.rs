//! Core types for the memfs file store
//!
//! This crate defines the foundational vocabulary shared by every layer:
//! - `Error` / `Result`: the unified error model
//! - `NodeId`: identity of a tree entry (file or directory)
//! - `TxnId`: transaction handle with a stable string rendering
//! - `IsolationLevel`: what a read observes inside a transaction
//! - `Path`: absolute, normalized paths over the directory tree

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod path;
pub mod types;

pub use error::{Error, Result};
pub use path::Path;
pub use types::{IsolationLevel, NodeId, NodeKind, TxnId};
