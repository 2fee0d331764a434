//! Transaction context
//!
//! A `Transaction` tracks everything a client has done under one handle:
//! the ordered buffer of pending operations, the latest buffered content
//! per file, the SNAPSHOT version map captured at begin, and an overlay
//! that makes buffered structural changes visible to the transaction's own
//! reads while keeping them invisible to everyone else.
//!
//! # Lifecycle
//!
//! ```text
//!         begin
//!          │
//!          ▼
//!       ACTIVE ──commit──▶ COMMITTED
//!          │
//!          ├─abort──▶ ABORTED
//!          │
//!          ├─rollback(ok)──▶ ROLLED_BACK
//!          │
//!          └─rollback(fail)──▶ ROLLBACK_FAILED
//! ```
//!
//! Terminal states are sinks; a terminal transaction holds no locks.

use memfs_core::{Error, IsolationLevel, NodeId, NodeKind, Path, Result, TxnId};
use memfs_storage::VersionedFile;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Where a transaction is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnState {
    /// Executing; accepts reads and buffered writes.
    Active,
    /// Commit applied; buffered effects are visible.
    Committed,
    /// Torn down by the client before commit.
    Aborted,
    /// Undone, either by request or by a failure during commit.
    RolledBack,
    /// A commit failure could not be undone; state may be partial.
    RollbackFailed,
}

impl TxnState {
    /// Whether this state accepts further operations.
    pub fn is_active(&self) -> bool {
        matches!(self, TxnState::Active)
    }
}

impl fmt::Display for TxnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxnState::Active => "active",
            TxnState::Committed => "committed",
            TxnState::Aborted => "aborted",
            TxnState::RolledBack => "rolled back",
            TxnState::RollbackFailed => "rollback failed",
        };
        f.write_str(name)
    }
}

/// A file entry allocated inside a transaction, not yet attached to the
/// tree. The chain and open flag are created eagerly so buffered writes
/// and the commit-time attach share the same objects.
#[derive(Debug, Clone)]
pub struct PendingFile {
    /// Pre-allocated identity of the file.
    pub id: NodeId,
    /// The file's (still private) version chain.
    pub versions: Arc<VersionedFile>,
    /// The file's (still private) open flag.
    pub open: Arc<AtomicBool>,
}

impl PendingFile {
    /// Allocate a fresh pending file.
    pub fn new() -> Self {
        PendingFile {
            id: NodeId::new(),
            versions: Arc::new(VersionedFile::new()),
            open: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for PendingFile {
    fn default() -> Self {
        Self::new()
    }
}

/// One buffered operation. Applied to the tree, in buffer order, at commit.
///
/// Paths are recorded as the transaction saw them when the op was buffered;
/// because commit replays the buffer in order, each recorded path is valid
/// at its point in the replay.
#[derive(Debug)]
pub enum PendingOp {
    /// Append a new version to a file's chain.
    Write {
        /// Identity of the written file.
        file: NodeId,
        /// The chain to append to.
        versions: Arc<VersionedFile>,
        /// The file's open flag (a committed write marks the file open).
        open: Arc<AtomicBool>,
        /// The content of the new version.
        content: String,
    },
    /// Attach a new empty file.
    Touch {
        /// Where the file lands.
        path: Path,
        /// Identity of the parent directory (lock target).
        parent: NodeId,
        /// The pre-allocated entry.
        node: PendingFile,
    },
    /// Attach a new directory.
    Mkdir {
        /// Where the directory lands.
        path: Path,
        /// Identity of the parent directory (lock target).
        parent: NodeId,
        /// Pre-allocated identity of the directory.
        id: NodeId,
    },
    /// Mark an existing file open.
    Open {
        /// Identity of the opened file (lock target).
        file: NodeId,
        /// The flag to set.
        flag: Arc<AtomicBool>,
    },
    /// Remove a file or empty directory.
    Remove {
        /// The entry to remove.
        path: Path,
        /// Identity of the removed entry (lock target).
        target: NodeId,
        /// Identity of its parent (lock target).
        parent: NodeId,
    },
    /// Re-parent or rename an entry.
    Move {
        /// Source path.
        src: Path,
        /// Destination path as given by the caller.
        dst: Path,
        /// Identity of the moved entry (lock target).
        target: NodeId,
        /// Identity of the source parent (lock target).
        src_parent: NodeId,
        /// Identity of the destination parent (lock target).
        dst_parent: NodeId,
    },
}

impl PendingOp {
    /// The entries this op mutates, for commit-time EXCLUSIVE acquisition
    /// under SNAPSHOT isolation.
    pub fn lock_targets(&self) -> impl Iterator<Item = NodeId> + '_ {
        let ids: smallvec::SmallVec<[NodeId; 3]> = match self {
            PendingOp::Write { file, .. } => smallvec::smallvec![*file],
            PendingOp::Touch { parent, node, .. } => smallvec::smallvec![*parent, node.id],
            PendingOp::Mkdir { parent, id, .. } => smallvec::smallvec![*parent, *id],
            PendingOp::Open { file, .. } => smallvec::smallvec![*file],
            PendingOp::Remove { target, parent, .. } => smallvec::smallvec![*target, *parent],
            PendingOp::Move {
                target,
                src_parent,
                dst_parent,
                ..
            } => smallvec::smallvec![*target, *src_parent, *dst_parent],
        };
        ids.into_iter()
    }
}

/// What a path resolves to through a transaction's overlay.
#[derive(Debug)]
pub enum OverlayLookup<'a> {
    /// A file or directory created by this transaction.
    Pending(&'a PendingNode),
    /// Removed by this transaction.
    Removed,
    /// Untouched by structural ops; resolve `base` against the tree.
    Base(Path),
}

/// A node created by this transaction, visible only to it until commit.
#[derive(Debug)]
pub enum PendingNode {
    /// A pending file entry.
    File(PendingFile),
    /// A pending directory entry.
    Dir {
        /// Pre-allocated identity of the directory.
        id: NodeId,
    },
}

impl PendingNode {
    /// Identity of the pending node.
    pub fn id(&self) -> NodeId {
        match self {
            PendingNode::File(file) => file.id,
            PendingNode::Dir { id } => *id,
        }
    }

    /// Kind of the pending node.
    pub fn kind(&self) -> NodeKind {
        match self {
            PendingNode::File(_) => NodeKind::File,
            PendingNode::Dir { .. } => NodeKind::Directory,
        }
    }
}

/// Own-visibility overlay over the shared tree.
///
/// Created entries are keyed by their current path as the transaction sees
/// it ("view" coordinates) and re-keyed when a buffered move affects them.
/// Removed entries and move sources are tracked in tree ("base")
/// coordinates, which are stable because the shared tree does not change
/// under a buffered move.
#[derive(Debug, Default)]
pub struct Overlay {
    created: FxHashMap<Path, PendingNode>,
    removed: FxHashSet<Path>,
    /// Buffered moves of real tree entries: (base source, destination in
    /// view coordinates at buffer time), in buffer order.
    moves: Vec<(Path, Path)>,
    /// Files this transaction opened (pending or real).
    opened: FxHashSet<NodeId>,
}

impl Overlay {
    /// Translate a view path to base (tree) coordinates by undoing the
    /// buffered moves, most recent first.
    ///
    /// Returns `None` when the path lies at or beneath the source of a
    /// buffered move without having arrived there through the move's
    /// destination: that subtree has been vacated in this transaction's
    /// view.
    pub fn rewrite(&self, path: &Path) -> Option<Path> {
        let mut current = path.clone();
        for (src, dst) in self.moves.iter().rev() {
            if let Some(rebased) = current.rebase(dst, src) {
                current = rebased;
            } else if current.starts_with(src) {
                return None;
            }
        }
        Some(current)
    }

    /// Resolve a view path through the overlay.
    pub fn resolve(&self, path: &Path) -> OverlayLookup<'_> {
        if let Some(node) = self.created.get(path) {
            return OverlayLookup::Pending(node);
        }
        let base = match self.rewrite(path) {
            Some(base) => base,
            None => return OverlayLookup::Removed,
        };
        if self.removed.contains(&base) {
            return OverlayLookup::Removed;
        }
        OverlayLookup::Base(base)
    }

    /// Record a created entry at `path`.
    pub fn record_create(&mut self, path: Path, node: PendingNode) {
        // Recreating over a buffered remove shadows the removal marker for
        // resolution purposes; the marker stays, since the created entry is
        // checked first.
        self.created.insert(path, node);
    }

    /// Record that `id` was opened by this transaction.
    pub fn record_open(&mut self, id: NodeId) {
        self.opened.insert(id);
    }

    /// Whether this transaction opened `id`.
    pub fn opened(&self, id: NodeId) -> bool {
        self.opened.contains(&id)
    }

    /// Record a removal of the entry at view path `path`.
    pub fn record_remove(&mut self, path: &Path) {
        if self.created.remove(path).is_some() {
            return;
        }
        if let Some(base) = self.rewrite(path) {
            self.removed.insert(base);
        }
    }

    /// Record a move of the entry at view path `src` to view path `dst`.
    ///
    /// `pending` says whether the source is an entry created by this
    /// transaction (then only the created keys are re-anchored) or a real
    /// tree entry (then a move of its base path is recorded as well).
    pub fn record_move(&mut self, src: &Path, dst: &Path, pending: bool) {
        if !pending {
            if let Some(base_src) = self.rewrite(src) {
                self.moves.push((base_src, dst.clone()));
            }
        }
        // Re-key created entries at or beneath the source, including the
        // source itself when it is pending.
        let affected: Vec<Path> = self
            .created
            .keys()
            .filter(|key| key.starts_with(src))
            .cloned()
            .collect();
        for key in affected {
            let node = self.created.remove(&key).expect("key collected above");
            let new_key = key.rebase(src, dst).expect("key starts with src");
            self.created.insert(new_key, node);
        }
    }

    /// Adjust a base listing of `dir` (view path, `base` its base
    /// translation) to what this transaction should observe.
    pub fn adjust_listing(&self, dir: &Path, base: &Path, names: &mut Vec<String>) {
        let mut set: std::collections::BTreeSet<String> = names.drain(..).collect();
        for removed in &self.removed {
            if removed.parent() == *base {
                if let Some(name) = removed.name() {
                    set.remove(name);
                }
            }
        }
        for (src, _) in &self.moves {
            if src.parent() == *base {
                if let Some(name) = src.name() {
                    set.remove(name);
                }
            }
        }
        for (_, dst) in &self.moves {
            if dst.parent() == *dir {
                if let Some(name) = dst.name() {
                    set.insert(name.to_string());
                }
            }
        }
        for created in self.created.keys() {
            if created.parent() == *dir {
                if let Some(name) = created.name() {
                    set.insert(name.to_string());
                }
            }
        }
        names.extend(set);
    }
}

/// A transaction: identity, isolation, state, and buffered effects.
#[derive(Debug)]
pub struct Transaction {
    /// Stable handle.
    pub id: TxnId,
    /// Read-visibility policy.
    pub isolation: IsolationLevel,
    /// Lifecycle state.
    pub state: TxnState,
    /// Monotonic begin timestamp.
    pub start_ts: u64,
    /// Set while a commit is applying this transaction's buffer.
    pub(crate) committing: bool,
    /// Whether this is an auto-commit transaction wrapping a single direct
    /// call. Implicit read-only operations skip SHARED acquisition: they
    /// observe one committed version atomically, so two-phase locking adds
    /// nothing, and a console client must be able to read while another
    /// transaction holds the writer lock.
    pub(crate) implicit: bool,
    /// Ordered buffer of pending operations.
    pub(crate) ops: Vec<PendingOp>,
    /// Latest buffered content per file (read-your-writes).
    pub(crate) writes: FxHashMap<NodeId, String>,
    /// SNAPSHOT only: file identity -> cur version at begin.
    pub(crate) snapshot: Option<FxHashMap<NodeId, u64>>,
    /// Own-visibility of buffered structural ops.
    pub(crate) overlay: Overlay,
}

impl Transaction {
    /// Create an ACTIVE transaction.
    pub fn new(
        id: TxnId,
        isolation: IsolationLevel,
        start_ts: u64,
        snapshot: Option<FxHashMap<NodeId, u64>>,
    ) -> Self {
        Transaction {
            id,
            isolation,
            state: TxnState::Active,
            start_ts,
            committing: false,
            implicit: false,
            ops: Vec::new(),
            writes: FxHashMap::default(),
            snapshot,
            overlay: Overlay::default(),
        }
    }

    /// Fail unless the transaction still accepts operations.
    pub fn ensure_active(&self) -> Result<()> {
        if self.state.is_active() && !self.committing {
            Ok(())
        } else if self.committing {
            Err(Error::transaction_not_active(self.id, "committing"))
        } else {
            Err(Error::transaction_not_active(
                self.id,
                self.state.to_string(),
            ))
        }
    }

    /// Latest buffered content for `file`, if this transaction wrote it.
    pub fn buffered_content(&self, file: NodeId) -> Option<&str> {
        self.writes.get(&file).map(|content| content.as_str())
    }

    /// Number of buffered operations.
    pub fn pending_ops(&self) -> usize {
        self.ops.len()
    }

    /// Whether the transaction buffered nothing.
    pub fn is_read_only(&self) -> bool {
        self.ops.is_empty()
    }

    /// Buffer a write: the op list keeps every write (each becomes a
    /// version at commit), the write map keeps the latest for own reads.
    pub(crate) fn buffer_write(
        &mut self,
        file: NodeId,
        versions: Arc<VersionedFile>,
        open: Arc<AtomicBool>,
        content: String,
    ) {
        self.writes.insert(file, content.clone());
        self.ops.push(PendingOp::Write {
            file,
            versions,
            open,
            content,
        });
    }

    /// Drop all buffered effects (abort/rollback of an ACTIVE transaction).
    pub(crate) fn discard_buffer(&mut self) {
        self.ops.clear();
        self.writes.clear();
        self.overlay = Overlay::default();
    }
}
