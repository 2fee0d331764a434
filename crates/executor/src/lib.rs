//! # memfs executor
//!
//! The command execution layer of the file store. Every externally
//! reachable operation is a typed, serializable [`Command`] executed
//! against a [`Session`] to produce a typed [`Output`] or an error.
//!
//! ```text
//! Rust API        Console (CLI)
//!     │                │
//!     └───────┬────────┘
//!             │
//!    ┌────────┴────────┐
//!    │  Command (enum) │   ← typed, serializable
//!    └────────┬────────┘
//!             │
//!    ┌────────┴────────┐
//!    │ Session / MemFs │   ← cwd resolution + dispatch
//!    └────────┬────────┘
//!             │
//!    ┌────────┴────────┐
//!    │  Output (enum)  │   ← typed results
//!    └─────────────────┘
//! ```
//!
//! [`MemFs`] is the owning facade: one value per process or test, no
//! ambient globals. [`Session`] adds a per-client working directory.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod command;
mod memfs;
mod output;
mod session;

pub use command::Command;
pub use memfs::MemFs;
pub use output::Output;
pub use session::Session;

// Re-export the vocabulary callers need alongside the facade.
pub use memfs_concurrency::TxnState;
pub use memfs_core::{Error, IsolationLevel, Result, TxnId};
