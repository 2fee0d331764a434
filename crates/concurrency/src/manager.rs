//! Transaction manager
//!
//! Coordinates transaction lifecycle, isolation, locking, and commit for
//! the whole file store. Every external operation lands here: either with
//! an explicit transaction handle, or wrapped in an implicit auto-commit
//! transaction.
//!
//! # Lock acquisition policy
//!
//! - READ_UNCOMMITTED / READ_COMMITTED: writes and structural mutations
//!   take EXCLUSIVE locks at operation time and hold them to termination
//!   (strict two-phase locking).
//! - SNAPSHOT: writes and structural mutations are buffered without locks;
//!   the EXCLUSIVE set is acquired at commit time in sorted order and
//!   released after the buffer is applied. Concurrent SNAPSHOT committers
//!   follow last-writer-wins on the version chain by design.
//! - Reads inside an explicit transaction take SHARED locks, held to
//!   termination. Implicit (auto-commit) reads are lock-free: they observe
//!   one committed version atomically.
//!
//! # Commit
//!
//! The buffer is applied in order; each applied step records its inverse.
//! A failure mid-apply unwinds the applied prefix in reverse (version
//! pointer reverts, detach/attach, move-back, open-flag restore) and the
//! transaction lands in ROLLED_BACK with the original error surfaced. A
//! failure during the unwind lands in ROLLBACK_FAILED and surfaces both
//! errors.
//!
//! An abort racing a commit cannot split the outcome: the abort cancels
//! any lock wait the commit is parked on (held locks stay held, so the
//! apply loop keeps its mutual exclusion) and then blocks until the commit
//! call settles, reporting whichever single terminal state the
//! transaction actually reached.

use crate::lock::{LockManager, LockMode};
use crate::transaction::{
    OverlayLookup, PendingFile, PendingNode, PendingOp, Transaction, TxnState,
};
use dashmap::DashMap;
use memfs_core::{Error, IsolationLevel, NodeId, NodeKind, Path, Result, TxnId};
use memfs_storage::{DetachedNode, FileRef, Tree, VersionedFile};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Process-wide transaction manager. Thread-safe; share behind `Arc`.
pub struct TransactionManager {
    tree: Arc<Tree>,
    locks: Arc<LockManager>,
    txns: DashMap<TxnId, Arc<TxnSlot>>,
    next_txn_id: AtomicU64,
    /// Monotonic counter stamped onto transactions at begin.
    clock: AtomicU64,
}

/// Registry slot for one transaction: its state plus a signal raised when
/// a commit call settles (`committing` cleared under the same mutex).
struct TxnSlot {
    txn: Mutex<Transaction>,
    settled: Condvar,
}

/// What a path resolves to through a transaction's view of the tree.
enum ViewEntry {
    PendingFile(PendingFile),
    PendingDir { id: NodeId },
    RealFile(FileRef),
    RealDir { id: NodeId },
}

impl ViewEntry {
    fn id(&self) -> NodeId {
        match self {
            ViewEntry::PendingFile(file) => file.id,
            ViewEntry::PendingDir { id } => *id,
            ViewEntry::RealFile(file) => file.id,
            ViewEntry::RealDir { id } => *id,
        }
    }

    fn is_dir(&self) -> bool {
        matches!(self, ViewEntry::PendingDir { .. } | ViewEntry::RealDir { .. })
    }
}

/// Inverse of an applied commit step.
enum Undo {
    Revert {
        versions: Arc<VersionedFile>,
        prior: u64,
        open: Arc<AtomicBool>,
        prior_open: bool,
    },
    Detach {
        path: Path,
    },
    Attach {
        path: Path,
        node: DetachedNode,
    },
    MoveBack {
        from: Path,
        to: Path,
    },
    SetOpen {
        flag: Arc<AtomicBool>,
        prior: bool,
    },
}

impl TransactionManager {
    /// Create a manager over a fresh tree and lock table.
    pub fn new() -> Self {
        TransactionManager {
            tree: Arc::new(Tree::new()),
            locks: Arc::new(LockManager::new()),
            txns: DashMap::new(),
            next_txn_id: AtomicU64::new(0),
            clock: AtomicU64::new(0),
        }
    }

    /// The lock table, for introspection in tests.
    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start a transaction.
    ///
    /// SNAPSHOT transactions capture `file -> cur version` over every file
    /// currently in the tree; files created afterwards are invisible to
    /// them.
    pub fn begin(&self, isolation: IsolationLevel) -> TxnId {
        self.begin_internal(isolation, false)
    }

    fn begin_internal(&self, isolation: IsolationLevel, implicit: bool) -> TxnId {
        let id = TxnId::from_raw(self.next_txn_id.fetch_add(1, Ordering::SeqCst) + 1);
        let start_ts = self.clock.fetch_add(1, Ordering::SeqCst);
        let snapshot =
            (isolation == IsolationLevel::Snapshot).then(|| self.tree.snapshot_versions());
        let mut txn = Transaction::new(id, isolation, start_ts, snapshot);
        txn.implicit = implicit;
        self.txns.insert(
            id,
            Arc::new(TxnSlot {
                txn: Mutex::new(txn),
                settled: Condvar::new(),
            }),
        );
        tracing::debug!(txn = %id, %isolation, implicit, "transaction started");
        id
    }

    /// Current lifecycle state of a transaction.
    pub fn txn_state(&self, id: TxnId) -> Result<TxnState> {
        Ok(self.slot(id)?.txn.lock().state)
    }

    /// Make the transaction's buffered operations visible.
    pub fn commit(&self, id: TxnId) -> Result<()> {
        // Take the buffer while flagging the transaction so that a
        // concurrent abort routes through lock revocation instead of
        // fighting over the state field.
        let (ops, isolation) = {
            let slot = self.slot(id)?;
            let mut txn = slot.txn.lock();
            txn.ensure_active()?;
            txn.committing = true;
            (std::mem::take(&mut txn.ops), txn.isolation)
        };

        // SNAPSHOT defers its exclusive set to commit; sorted acquisition
        // keeps concurrent snapshot committers from deadlocking each other.
        if isolation == IsolationLevel::Snapshot {
            let mut targets: Vec<NodeId> =
                ops.iter().flat_map(|op| op.lock_targets()).collect();
            targets.sort();
            targets.dedup();
            for node in targets {
                if let Err(err) = self.locks.acquire(id, node, LockMode::Exclusive) {
                    return self.fail_commit(id, Vec::new(), err);
                }
            }
        }

        let mut applied: Vec<Undo> = Vec::with_capacity(ops.len());
        for op in &ops {
            match self.apply_op(op) {
                Ok(undo) => applied.push(undo),
                Err(err) => return self.fail_commit(id, applied, err),
            }
        }

        self.locks.release_all(id);
        self.finish(id, TxnState::Committed);
        tracing::debug!(txn = %id, ops = ops.len(), "transaction committed");
        Ok(())
    }

    /// Client-initiated teardown of an ACTIVE transaction.
    ///
    /// Safe to call from another thread: a transaction parked on a lock
    /// wait is woken with `LockCancelled`. If a commit for this handle is
    /// mid-flight, the call blocks until that commit settles and then
    /// reports the actual outcome, so a transaction can never be observed
    /// in two different terminal states.
    pub fn abort(&self, id: TxnId) -> Result<()> {
        self.terminate(id, TxnState::Aborted)
    }

    /// Undo an ACTIVE transaction. Because writes are buffered, this is
    /// "drop the buffer and release locks".
    pub fn rollback(&self, id: TxnId) -> Result<()> {
        self.terminate(id, TxnState::RolledBack)
    }

    fn terminate(&self, id: TxnId, final_state: TxnState) -> Result<()> {
        let slot = self.slot(id)?;
        let mut txn = slot.txn.lock();

        // A commit may be applying this transaction's buffer. Cancel any
        // lock wait it is parked on and block until the commit call
        // settles in exactly one terminal state. The locks the commit
        // already holds stay held, so the apply loop keeps exclusive
        // access to everything it is mutating.
        let mut interrupted_commit = false;
        while txn.committing {
            interrupted_commit = true;
            self.locks.cancel_wait(id);
            slot.settled.wait(&mut txn);
        }
        if interrupted_commit && txn.state == final_state {
            // The commit observed the cancellation and tore down for us.
            return Ok(());
        }
        txn.ensure_active()?;
        txn.state = final_state;
        txn.discard_buffer();
        drop(txn);
        self.locks.revoke(id);
        tracing::debug!(txn = %id, state = %final_state, "transaction terminated");
        Ok(())
    }

    // =========================================================================
    // Filesystem operations
    // =========================================================================

    /// Create an empty file at `path`.
    pub fn touch(&self, txn: Option<TxnId>, path: &Path) -> Result<()> {
        self.run(txn, |id| self.touch_in(id, path))
    }

    /// Create a directory at `path`.
    pub fn mkdir(&self, txn: Option<TxnId>, path: &Path) -> Result<()> {
        self.run(txn, |id| self.mkdir_in(id, path))
    }

    /// Mark the file at `path` open. Required before reads succeed.
    pub fn open(&self, txn: Option<TxnId>, path: &Path) -> Result<()> {
        self.run(txn, |id| self.open_in(id, path))
    }

    /// Read the file at `path` under the transaction's isolation level.
    pub fn read(&self, txn: Option<TxnId>, path: &Path) -> Result<String> {
        self.run(txn, |id| self.read_in(id, path))
    }

    /// Buffer a new version of the file at `path`.
    pub fn write(&self, txn: Option<TxnId>, path: &Path, content: &str) -> Result<()> {
        self.run(txn, |id| self.write_in(id, path, content))
    }

    /// Remove the file or empty directory at `path`.
    pub fn rm(&self, txn: Option<TxnId>, path: &Path) -> Result<()> {
        self.run(txn, |id| self.rm_in(id, path))
    }

    /// Move the entry at `src` to `dst`.
    pub fn mv(&self, txn: Option<TxnId>, src: &Path, dst: &Path) -> Result<()> {
        self.run(txn, |id| self.mv_in(id, src, dst))
    }

    /// List the directory at `path`.
    pub fn ls(&self, txn: Option<TxnId>, path: &Path) -> Result<Vec<String>> {
        self.run(txn, |id| self.ls_in(id, path))
    }

    /// Validate that `path` is a directory (working-directory changes).
    pub fn ensure_dir(&self, txn: Option<TxnId>, path: &Path) -> Result<()> {
        self.run(txn, |id| self.ensure_dir_in(id, path))
    }

    /// Route an operation through an explicit transaction or wrap it in an
    /// implicit auto-commit transaction.
    fn run<T>(&self, txn: Option<TxnId>, f: impl FnOnce(TxnId) -> Result<T>) -> Result<T> {
        match txn {
            Some(id) => f(id),
            None => {
                let id = self.begin_internal(IsolationLevel::ReadCommitted, true);
                let result = f(id);
                let outcome = match result {
                    Ok(value) => self.commit(id).map(|_| value),
                    Err(err) => {
                        let _ = self.abort(id);
                        Err(err)
                    }
                };
                // Implicit handles are never handed out; drop the record.
                self.txns.remove(&id);
                outcome
            }
        }
    }

    // =========================================================================
    // Per-operation internals
    // =========================================================================
    //
    // Each operation runs in three steps: resolve and validate under the
    // transaction mutex, acquire locks with the mutex released (the caller
    // may park there), then re-check liveness and buffer the op. The tree
    // application at commit time is the authoritative validation; the
    // buffer-time checks exist to fail fast.

    fn touch_in(&self, id: TxnId, path: &Path) -> Result<()> {
        let (parent, pending, locking) = {
            let slot = self.slot(id)?;
            let txn = slot.txn.lock();
            txn.ensure_active()?;
            if path.is_root() || self.view_lookup(&txn, path).is_some() {
                return Err(Error::already_exists(path));
            }
            let parent = self.view_dir(&txn, &path.parent())?.id();
            (parent, PendingFile::new(), self.locks_at_op_time(&txn))
        };

        if locking {
            self.locks.acquire(id, parent, LockMode::Exclusive)?;
            self.locks.acquire(id, pending.id, LockMode::Exclusive)?;
        }

        let slot = self.slot(id)?;
        let mut txn = slot.txn.lock();
        self.recheck_active(&txn, id)?;
        txn.overlay
            .record_create(path.clone(), PendingNode::File(pending.clone()));
        txn.ops.push(PendingOp::Touch {
            path: path.clone(),
            parent,
            node: pending,
        });
        Ok(())
    }

    fn mkdir_in(&self, id: TxnId, path: &Path) -> Result<()> {
        let (parent, dir_id, locking) = {
            let slot = self.slot(id)?;
            let txn = slot.txn.lock();
            txn.ensure_active()?;
            if path.is_root() || self.view_lookup(&txn, path).is_some() {
                return Err(Error::already_exists(path));
            }
            let parent = self.view_dir(&txn, &path.parent())?.id();
            (parent, NodeId::new(), self.locks_at_op_time(&txn))
        };

        if locking {
            self.locks.acquire(id, parent, LockMode::Exclusive)?;
            self.locks.acquire(id, dir_id, LockMode::Exclusive)?;
        }

        let slot = self.slot(id)?;
        let mut txn = slot.txn.lock();
        self.recheck_active(&txn, id)?;
        txn.overlay
            .record_create(path.clone(), PendingNode::Dir { id: dir_id });
        txn.ops.push(PendingOp::Mkdir {
            path: path.clone(),
            parent,
            id: dir_id,
        });
        Ok(())
    }

    fn open_in(&self, id: TxnId, path: &Path) -> Result<()> {
        let (target, locking) = {
            let slot = self.slot(id)?;
            let txn = slot.txn.lock();
            txn.ensure_active()?;
            let target = self.view_file(&txn, path)?;
            (target, self.locks_at_op_time(&txn))
        };

        match target {
            ViewEntry::PendingFile(file) => {
                // The entry is private to this transaction; the flag can be
                // set directly, nothing else can observe it.
                let slot = self.slot(id)?;
                let mut txn = slot.txn.lock();
                self.recheck_active(&txn, id)?;
                file.open.store(true, Ordering::SeqCst);
                txn.overlay.record_open(file.id);
                Ok(())
            }
            ViewEntry::RealFile(file) => {
                if locking {
                    self.locks.acquire(id, file.id, LockMode::Exclusive)?;
                }
                let slot = self.slot(id)?;
                let mut txn = slot.txn.lock();
                self.recheck_active(&txn, id)?;
                txn.overlay.record_open(file.id);
                txn.ops.push(PendingOp::Open {
                    file: file.id,
                    flag: Arc::clone(&file.open),
                });
                Ok(())
            }
            _ => Err(Error::not_a_file(path)),
        }
    }

    fn read_in(&self, id: TxnId, path: &Path) -> Result<String> {
        let (file, shared_lock) = {
            let slot = self.slot(id)?;
            let txn = slot.txn.lock();
            txn.ensure_active()?;
            match self.view_file(&txn, path)? {
                ViewEntry::PendingFile(file) => {
                    if let Some(content) = txn.buffered_content(file.id) {
                        return Ok(content.to_string());
                    }
                    if !txn.overlay.opened(file.id) {
                        return Err(Error::not_open(path));
                    }
                    // A pending file without buffered writes is at v0.
                    return Ok(String::new());
                }
                ViewEntry::RealFile(file) => {
                    // Fail fast before locking; re-validated below.
                    if txn.buffered_content(file.id).is_none()
                        && !file.is_open()
                        && !txn.overlay.opened(file.id)
                    {
                        return Err(Error::not_open(path));
                    }
                    if txn.isolation == IsolationLevel::Snapshot
                        && txn.buffered_content(file.id).is_none()
                        && !self.in_snapshot(&txn, file.id)
                    {
                        return Err(Error::no_such_file(path));
                    }
                    (file, !txn.implicit)
                }
                _ => return Err(Error::not_a_file(path)),
            }
        };

        if shared_lock {
            self.locks.acquire(id, file.id, LockMode::Shared)?;
        }

        let slot = self.slot(id)?;
        let txn = slot.txn.lock();
        self.recheck_active(&txn, id)?;
        if let Some(content) = txn.buffered_content(file.id) {
            return Ok(content.to_string());
        }
        if !file.is_open() && !txn.overlay.opened(file.id) {
            return Err(Error::not_open(path));
        }
        match txn.isolation {
            IsolationLevel::Snapshot => {
                let snapshot = txn
                    .snapshot
                    .as_ref()
                    .ok_or_else(|| Error::corruption("snapshot transaction lost its map"))?;
                match snapshot.get(&file.id) {
                    Some(&version) => file.versions.read(version),
                    None => Err(Error::no_such_file(path)),
                }
            }
            // READ_UNCOMMITTED degenerates to READ_COMMITTED: buffered
            // writes are never staged into shared state before commit.
            IsolationLevel::ReadCommitted | IsolationLevel::ReadUncommitted => {
                file.versions.read_current()
            }
        }
    }

    fn write_in(&self, id: TxnId, path: &Path, content: &str) -> Result<()> {
        let (file_id, versions, open, locking) = {
            let slot = self.slot(id)?;
            let txn = slot.txn.lock();
            txn.ensure_active()?;
            match self.view_file(&txn, path)? {
                ViewEntry::PendingFile(file) => {
                    (file.id, file.versions, file.open, self.locks_at_op_time(&txn))
                }
                ViewEntry::RealFile(file) => {
                    if txn.isolation == IsolationLevel::Snapshot
                        && txn.buffered_content(file.id).is_none()
                        && !self.in_snapshot(&txn, file.id)
                    {
                        return Err(Error::no_such_file(path));
                    }
                    (file.id, file.versions, file.open, self.locks_at_op_time(&txn))
                }
                _ => return Err(Error::not_a_file(path)),
            }
        };

        if locking {
            self.locks.acquire(id, file_id, LockMode::Exclusive)?;
        }

        let slot = self.slot(id)?;
        let mut txn = slot.txn.lock();
        self.recheck_active(&txn, id)?;
        txn.buffer_write(file_id, versions, open, content.to_string());
        Ok(())
    }

    fn rm_in(&self, id: TxnId, path: &Path) -> Result<()> {
        let (target, parent, locking) = {
            let slot = self.slot(id)?;
            let txn = slot.txn.lock();
            txn.ensure_active()?;
            if path.is_root() {
                return Err(Error::invalid_operation("cannot remove the root directory"));
            }
            let target = match self.view_lookup(&txn, path) {
                None => return Err(Error::no_such_file(path)),
                Some(entry) => {
                    if entry.is_dir() && !self.view_listing(&txn, path)?.is_empty() {
                        return Err(Error::not_empty(path));
                    }
                    entry.id()
                }
            };
            let parent = self.view_dir(&txn, &path.parent())?.id();
            (target, parent, self.locks_at_op_time(&txn))
        };

        if locking {
            self.locks.acquire(id, target, LockMode::Exclusive)?;
            self.locks.acquire(id, parent, LockMode::Exclusive)?;
        }

        let slot = self.slot(id)?;
        let mut txn = slot.txn.lock();
        self.recheck_active(&txn, id)?;
        txn.overlay.record_remove(path);
        txn.ops.push(PendingOp::Remove {
            path: path.clone(),
            target,
            parent,
        });
        Ok(())
    }

    fn mv_in(&self, id: TxnId, src: &Path, dst: &Path) -> Result<()> {
        let (target, src_parent, dst_parent, actual_dst, src_pending, locking) = {
            let slot = self.slot(id)?;
            let txn = slot.txn.lock();
            txn.ensure_active()?;
            if src.is_root() {
                return Err(Error::invalid_operation("cannot move the root directory"));
            }
            let source = self
                .view_lookup(&txn, src)
                .ok_or_else(|| Error::no_such_file(src))?;
            let src_pending = matches!(
                source,
                ViewEntry::PendingFile(_) | ViewEntry::PendingDir { .. }
            );

            let src_name = src.name().expect("source is never the root");
            let actual_dst = match self.view_lookup(&txn, dst) {
                Some(entry) if entry.is_dir() => dst.join(src_name),
                Some(_) => return Err(Error::already_exists(dst)),
                None => {
                    self.view_dir(&txn, &dst.parent())?;
                    dst.clone()
                }
            };
            if actual_dst == *src {
                return Err(Error::already_exists(&actual_dst));
            }
            if actual_dst.starts_with(src) {
                return Err(Error::invalid_operation(
                    "cannot move an entry into its own subtree",
                ));
            }
            if self.view_lookup(&txn, &actual_dst).is_some() {
                return Err(Error::already_exists(&actual_dst));
            }

            let src_parent = self.view_dir(&txn, &src.parent())?.id();
            let dst_parent = self.view_dir(&txn, &actual_dst.parent())?.id();
            (
                source.id(),
                src_parent,
                dst_parent,
                actual_dst,
                src_pending,
                self.locks_at_op_time(&txn),
            )
        };

        if locking {
            self.locks.acquire(id, target, LockMode::Exclusive)?;
            self.locks.acquire(id, src_parent, LockMode::Exclusive)?;
            self.locks.acquire(id, dst_parent, LockMode::Exclusive)?;
        }

        let slot = self.slot(id)?;
        let mut txn = slot.txn.lock();
        self.recheck_active(&txn, id)?;
        txn.overlay.record_move(src, &actual_dst, src_pending);
        txn.ops.push(PendingOp::Move {
            src: src.clone(),
            dst: dst.clone(),
            target,
            src_parent,
            dst_parent,
        });
        Ok(())
    }

    fn ls_in(&self, id: TxnId, path: &Path) -> Result<Vec<String>> {
        let (dir_id, shared_lock) = {
            let slot = self.slot(id)?;
            let txn = slot.txn.lock();
            txn.ensure_active()?;
            let dir = self.view_dir(&txn, path)?;
            (dir.id(), !txn.implicit)
        };

        if shared_lock {
            self.locks.acquire(id, dir_id, LockMode::Shared)?;
        }

        let slot = self.slot(id)?;
        let txn = slot.txn.lock();
        self.recheck_active(&txn, id)?;
        self.view_listing(&txn, path)
    }

    fn ensure_dir_in(&self, id: TxnId, path: &Path) -> Result<()> {
        let (dir_id, shared_lock) = {
            let slot = self.slot(id)?;
            let txn = slot.txn.lock();
            txn.ensure_active()?;
            (self.view_dir(&txn, path)?.id(), !txn.implicit)
        };
        if shared_lock {
            self.locks.acquire(id, dir_id, LockMode::Shared)?;
        }
        Ok(())
    }

    // =========================================================================
    // View resolution
    // =========================================================================

    fn view_lookup(&self, txn: &Transaction, path: &Path) -> Option<ViewEntry> {
        match txn.overlay.resolve(path) {
            OverlayLookup::Pending(PendingNode::File(file)) => {
                Some(ViewEntry::PendingFile(file.clone()))
            }
            OverlayLookup::Pending(PendingNode::Dir { id }) => {
                Some(ViewEntry::PendingDir { id: *id })
            }
            OverlayLookup::Removed => None,
            OverlayLookup::Base(base) => match self.tree.lookup(&base) {
                None => None,
                Some((id, NodeKind::Directory)) => Some(ViewEntry::RealDir { id }),
                Some((_, NodeKind::File)) => {
                    self.tree.resolve_file(&base).ok().map(ViewEntry::RealFile)
                }
            },
        }
    }

    fn view_file(&self, txn: &Transaction, path: &Path) -> Result<ViewEntry> {
        match self.view_lookup(txn, path) {
            None => Err(Error::no_such_file(path)),
            Some(entry) if entry.is_dir() => Err(Error::not_a_file(path)),
            Some(entry) => Ok(entry),
        }
    }

    fn view_dir(&self, txn: &Transaction, path: &Path) -> Result<ViewEntry> {
        match self.view_lookup(txn, path) {
            None => Err(Error::no_such_directory(path)),
            Some(entry) if !entry.is_dir() => Err(Error::not_a_directory(path)),
            Some(entry) => Ok(entry),
        }
    }

    /// Listing of a directory as the transaction observes it.
    fn view_listing(&self, txn: &Transaction, path: &Path) -> Result<Vec<String>> {
        let dir = self.view_dir(txn, path)?;
        // Pending directories have no base; any placeholder works because
        // base-coordinate adjustments can only match real tree paths.
        let base = txn.overlay.rewrite(path).unwrap_or_else(|| path.clone());
        let mut names = match dir {
            ViewEntry::RealDir { .. } => self.tree.ls(&base)?,
            _ => Vec::new(),
        };
        txn.overlay.adjust_listing(path, &base, &mut names);
        Ok(names)
    }

    fn in_snapshot(&self, txn: &Transaction, file: NodeId) -> bool {
        txn.snapshot
            .as_ref()
            .map_or(false, |snapshot| snapshot.contains_key(&file))
    }

    fn locks_at_op_time(&self, txn: &Transaction) -> bool {
        txn.isolation != IsolationLevel::Snapshot
    }

    // =========================================================================
    // Commit internals
    // =========================================================================

    fn apply_op(&self, op: &PendingOp) -> Result<Undo> {
        match op {
            PendingOp::Write {
                versions,
                open,
                content,
                ..
            } => {
                let prior = versions.current();
                let prior_open = open.swap(true, Ordering::SeqCst);
                versions.append_version(content);
                Ok(Undo::Revert {
                    versions: Arc::clone(versions),
                    prior,
                    open: Arc::clone(open),
                    prior_open,
                })
            }
            PendingOp::Touch { path, node, .. } => {
                self.tree.create_file(
                    path,
                    node.id,
                    Arc::clone(&node.versions),
                    Arc::clone(&node.open),
                )?;
                Ok(Undo::Detach { path: path.clone() })
            }
            PendingOp::Mkdir { path, id, .. } => {
                self.tree.create_dir(path, *id)?;
                Ok(Undo::Detach { path: path.clone() })
            }
            PendingOp::Open { flag, .. } => {
                let prior = flag.swap(true, Ordering::SeqCst);
                Ok(Undo::SetOpen {
                    flag: Arc::clone(flag),
                    prior,
                })
            }
            PendingOp::Remove { path, .. } => {
                let node = self.tree.detach(path)?;
                Ok(Undo::Attach {
                    path: path.clone(),
                    node,
                })
            }
            PendingOp::Move { src, dst, .. } => {
                let landed = self.tree.mv(src, dst)?;
                Ok(Undo::MoveBack {
                    from: landed,
                    to: src.clone(),
                })
            }
        }
    }

    fn undo_applied(&self, applied: Vec<Undo>) -> Result<()> {
        for undo in applied.into_iter().rev() {
            match undo {
                Undo::Revert {
                    versions,
                    prior,
                    open,
                    prior_open,
                } => {
                    versions.revert_to(prior)?;
                    open.store(prior_open, Ordering::SeqCst);
                }
                Undo::Detach { path } => {
                    self.tree.detach(&path)?;
                }
                Undo::Attach { path, node } => {
                    self.tree.attach(&path, node)?;
                }
                Undo::MoveBack { from, to } => {
                    self.tree.mv(&from, &to)?;
                }
                Undo::SetOpen { flag, prior } => flag.store(prior, Ordering::SeqCst),
            }
        }
        Ok(())
    }

    fn fail_commit(&self, id: TxnId, applied: Vec<Undo>, original: Error) -> Result<()> {
        tracing::warn!(txn = %id, error = %original, "commit failed; rolling back applied steps");
        let unwind = self.undo_applied(applied);
        self.locks.release_all(id);
        match unwind {
            Ok(()) => {
                // A cancelled lock wait means another thread aborted us.
                let state = if matches!(original, Error::LockCancelled { .. }) {
                    TxnState::Aborted
                } else {
                    TxnState::RolledBack
                };
                self.finish(id, state);
                Err(original)
            }
            Err(cause) => {
                tracing::error!(txn = %id, error = %cause, "rollback failed; state may be partial");
                self.finish(id, TxnState::RollbackFailed);
                Err(Error::rollback_failed(cause, original))
            }
        }
    }

    /// Settle a commit call: record the terminal state, clear the
    /// committing flag, and wake anyone blocked in `terminate`.
    fn finish(&self, id: TxnId, state: TxnState) {
        if let Ok(slot) = self.slot(id) {
            let mut txn = slot.txn.lock();
            txn.state = state;
            txn.committing = false;
            txn.discard_buffer();
            slot.settled.notify_all();
        }
    }

    fn slot(&self, id: TxnId) -> Result<Arc<TxnSlot>> {
        self.txns
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::unknown_transaction(id))
    }

    /// Liveness re-check after lock acquisition. The transaction may have
    /// been torn down by another thread while this operation was parked;
    /// any lock granted in that window must be dropped.
    fn recheck_active(&self, txn: &Transaction, id: TxnId) -> Result<()> {
        txn.ensure_active().map_err(|err| {
            self.locks.release_all(id);
            err
        })
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}
