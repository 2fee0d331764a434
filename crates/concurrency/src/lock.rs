//! Whole-file lock manager
//!
//! Grants SHARED and EXCLUSIVE locks on tree entries, scoped to a
//! transaction. Incompatible requests park the caller on a condvar until a
//! compatible release, a deadlock verdict, or cancellation.
//!
//! # Grant rules
//!
//! - EXCLUSIVE: granted iff there is no other holder at all.
//! - SHARED: granted iff there is no EXCLUSIVE holder.
//! - Reentrant: re-requesting a mode at or below what is already held
//!   succeeds immediately.
//! - Upgrade: SHARED → EXCLUSIVE succeeds iff the requester is the sole
//!   holder; otherwise the requester waits.
//!
//! Waiters on a file are served FIFO, except that compatible SHARED waiters
//! at the head of the queue are granted as a batch.
//!
//! # Deadlock avoidance
//!
//! A wait-for graph is implicit in the lock table: an edge `T → T'` exists
//! when `T` waits on a file `T'` holds. Before a request parks, a
//! depth-first search checks whether the new edge would close a cycle back
//! to the requester; if so the request fails with `Deadlock` instead of
//! blocking. Every cycle is completed by some final request, so checking at
//! request time is sufficient.

use memfs_core::{Error, NodeId, Result, TxnId};
use parking_lot::{Condvar, Mutex};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::collections::VecDeque;

/// Lock mode for a whole-file lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Multi-holder read lock.
    Shared,
    /// Single-holder write lock; excludes SHARED.
    Exclusive,
}

#[derive(Debug, Default)]
struct LockEntry {
    /// Current holders. Almost always one or two entries.
    holders: SmallVec<[(TxnId, LockMode); 2]>,
    /// Parked requests in arrival order.
    waiters: VecDeque<(TxnId, LockMode)>,
}

impl LockEntry {
    fn holder_mode(&self, txn: TxnId) -> Option<LockMode> {
        self.holders
            .iter()
            .find(|(holder, _)| *holder == txn)
            .map(|(_, mode)| *mode)
    }

    fn is_unused(&self) -> bool {
        self.holders.is_empty() && self.waiters.is_empty()
    }
}

#[derive(Debug, Default)]
struct LockState {
    entries: FxHashMap<NodeId, LockEntry>,
    /// Reverse index: every file a transaction holds a lock on.
    held: FxHashMap<TxnId, FxHashSet<NodeId>>,
    /// The file each parked transaction is waiting on (wait-for edges).
    waiting_on: FxHashMap<TxnId, NodeId>,
    /// Transactions whose lock waits have been revoked; the flag is
    /// consumed by the next `acquire` touching it.
    cancelled: FxHashSet<TxnId>,
}

/// Process-wide lock table. Thread-safe; share behind `Arc`.
#[derive(Debug, Default)]
pub struct LockManager {
    state: Mutex<LockState>,
    wakeup: Condvar,
}

impl LockManager {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire `mode` on `node` for `txn`, parking until it can be granted.
    ///
    /// Fails with `Deadlock` when parking would close a wait-for cycle, and
    /// with `LockCancelled` when the transaction is torn down while the
    /// request is in flight.
    pub fn acquire(&self, txn: TxnId, node: NodeId, mode: LockMode) -> Result<()> {
        let mut state = self.state.lock();
        let mut queued = false;
        loop {
            if state.cancelled.remove(&txn) {
                if queued {
                    remove_waiter(&mut state, txn, node);
                }
                state.waiting_on.remove(&txn);
                return Err(Error::lock_cancelled(txn));
            }
            if try_grant(&mut state, txn, node, mode) {
                if queued {
                    remove_waiter(&mut state, txn, node);
                }
                state.waiting_on.remove(&txn);
                state.held.entry(txn).or_default().insert(node);
                tracing::trace!(txn = %txn, node = %node, ?mode, "lock granted");
                return Ok(());
            }
            if !queued {
                if would_deadlock(&state, txn, node) {
                    tracing::warn!(txn = %txn, node = %node, "deadlock detected; refusing request");
                    return Err(Error::deadlock(txn));
                }
                state
                    .entries
                    .entry(node)
                    .or_default()
                    .waiters
                    .push_back((txn, mode));
                state.waiting_on.insert(txn, node);
                queued = true;
                tracing::trace!(txn = %txn, node = %node, ?mode, "parking on lock wait");
            }
            self.wakeup.wait(&mut state);
        }
    }

    /// Drop every mode `txn` holds on `node` and wake compatible waiters.
    pub fn release(&self, txn: TxnId, node: NodeId) {
        let mut state = self.state.lock();
        drop_holder(&mut state, txn, node);
        if let Some(held) = state.held.get_mut(&txn) {
            held.remove(&node);
            if held.is_empty() {
                state.held.remove(&txn);
            }
        }
        self.wakeup.notify_all();
    }

    /// Release every lock held by `txn` and clear any stale wait state.
    ///
    /// Called on every terminal transition so that a finished transaction
    /// holds no locks.
    pub fn release_all(&self, txn: TxnId) {
        let mut state = self.state.lock();
        release_everything(&mut state, txn);
        state.cancelled.remove(&txn);
        self.wakeup.notify_all();
    }

    /// Tear down `txn` on behalf of another thread.
    ///
    /// Same as `release_all`, but additionally flags the transaction so
    /// that a lock request currently in flight (parked, or about to park)
    /// wakes with `LockCancelled` instead of being granted.
    pub fn revoke(&self, txn: TxnId) {
        let mut state = self.state.lock();
        release_everything(&mut state, txn);
        state.cancelled.insert(txn);
        self.wakeup.notify_all();
    }

    /// Flag `txn` so that a lock request currently in flight (parked, or
    /// about to park) wakes with `LockCancelled`, without releasing
    /// anything the transaction already holds.
    ///
    /// Used to interrupt a commit that may be parked acquiring its
    /// commit-time lock set: the locks it already holds must stay held so
    /// the apply loop keeps exclusive access to everything it mutates. A
    /// flag never consumed is inert; terminal transactions do not request
    /// locks again.
    pub fn cancel_wait(&self, txn: TxnId) {
        let mut state = self.state.lock();
        state.cancelled.insert(txn);
        self.wakeup.notify_all();
    }

    /// The mode `txn` currently holds on `node`, if any.
    pub fn holds(&self, txn: TxnId, node: NodeId) -> Option<LockMode> {
        let state = self.state.lock();
        state.entries.get(&node).and_then(|e| e.holder_mode(txn))
    }

    /// How many files `txn` currently holds locks on.
    pub fn held_count(&self, txn: TxnId) -> usize {
        let state = self.state.lock();
        state.held.get(&txn).map_or(0, |nodes| nodes.len())
    }

    /// Whether `txn` is currently parked on a lock wait.
    pub fn is_waiting(&self, txn: TxnId) -> bool {
        let state = self.state.lock();
        state.waiting_on.contains_key(&txn)
    }
}

/// Grant check. Mutates the entry (adds a holder or applies an upgrade)
/// when the request can be granted now.
fn try_grant(state: &mut LockState, txn: TxnId, node: NodeId, mode: LockMode) -> bool {
    let entry = state.entries.entry(node).or_default();

    if let Some(held) = entry.holder_mode(txn) {
        return match (held, mode) {
            // Reentrant: already holding an equal or stronger mode.
            (LockMode::Exclusive, _) | (_, LockMode::Shared) => true,
            (LockMode::Shared, LockMode::Exclusive) => {
                if entry.holders.len() == 1 {
                    entry.holders[0].1 = LockMode::Exclusive;
                    true
                } else {
                    false
                }
            }
        };
    }

    let compatible = match mode {
        LockMode::Exclusive => entry.holders.is_empty(),
        LockMode::Shared => entry
            .holders
            .iter()
            .all(|(_, held)| *held == LockMode::Shared),
    };
    if !compatible {
        return false;
    }

    // FIFO fairness: an exclusive request is only granted from the head of
    // the queue; a shared request may join a batch of shared waiters ahead
    // of it.
    let position = entry
        .waiters
        .iter()
        .position(|(waiter, _)| *waiter == txn)
        .unwrap_or(entry.waiters.len());
    let fifo_ok = match mode {
        LockMode::Exclusive => position == 0,
        LockMode::Shared => entry
            .waiters
            .iter()
            .take(position)
            .all(|(_, waiting_mode)| *waiting_mode == LockMode::Shared),
    };
    if !fifo_ok {
        return false;
    }

    entry.holders.push((txn, mode));
    true
}

/// Would parking `txn` on `node` close a cycle in the wait-for graph?
///
/// Walks holder → waiting-on edges depth-first from the current holders of
/// `node`, looking for a path back to the requester.
fn would_deadlock(state: &LockState, txn: TxnId, node: NodeId) -> bool {
    let mut stack: Vec<TxnId> = match state.entries.get(&node) {
        Some(entry) => entry
            .holders
            .iter()
            .map(|(holder, _)| *holder)
            .filter(|holder| *holder != txn)
            .collect(),
        None => return false,
    };
    let mut visited: FxHashSet<TxnId> = FxHashSet::default();

    while let Some(current) = stack.pop() {
        if current == txn {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        if let Some(waited_node) = state.waiting_on.get(&current) {
            if let Some(entry) = state.entries.get(waited_node) {
                stack.extend(
                    entry
                        .holders
                        .iter()
                        .map(|(holder, _)| *holder)
                        .filter(|holder| *holder != current),
                );
            }
        }
    }
    false
}

fn drop_holder(state: &mut LockState, txn: TxnId, node: NodeId) {
    if let Some(entry) = state.entries.get_mut(&node) {
        entry.holders.retain(|(holder, _)| *holder != txn);
        if entry.is_unused() {
            state.entries.remove(&node);
        }
    }
}

fn remove_waiter(state: &mut LockState, txn: TxnId, node: NodeId) {
    if let Some(entry) = state.entries.get_mut(&node) {
        entry.waiters.retain(|(waiter, _)| *waiter != txn);
        if entry.is_unused() {
            state.entries.remove(&node);
        }
    }
}

fn release_everything(state: &mut LockState, txn: TxnId) {
    if let Some(nodes) = state.held.remove(&txn) {
        for node in nodes {
            drop_holder(state, txn, node);
        }
    }
    if let Some(node) = state.waiting_on.remove(&txn) {
        remove_waiter(state, txn, node);
    }
}
