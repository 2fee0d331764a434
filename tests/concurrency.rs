//! Multi-threaded scenarios: writer mutual exclusion, deadlock detection,
//! and cross-thread abort, driven through the public facade.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use memfs::{Error, IsolationLevel, MemFs, TxnState};

#[test]
fn overlapping_writers_execute_one_at_a_time() {
    // Many concurrent auto-commit writers on one file: every write becomes
    // its own version, so mutual exclusion held for all of them.
    let fs = Arc::new(MemFs::new());
    fs.touch("/f", None).unwrap();

    let mut handles = Vec::new();
    for worker in 0..8 {
        let fs = Arc::clone(&fs);
        handles.push(thread::spawn(move || {
            for round in 0..5 {
                fs.write("/f", &format!("w{}-{}", worker, round), None).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    // 40 committed writes, one version each, plus v0.
    let final_content = fs.read("/f", None).unwrap();
    assert!(final_content.starts_with('w'));
}

#[test]
fn deadlock_detected_and_victim_can_retry() {
    // T1 locks x; T2 locks y; T1 requests y and parks; T2 requests x and
    // is refused with Deadlock. After T2 aborts, T1's request is granted.
    let fs = Arc::new(MemFs::new());
    fs.touch("/x", None).unwrap();
    fs.touch("/y", None).unwrap();

    let t1 = fs.begin(IsolationLevel::ReadCommitted);
    let t2 = fs.begin(IsolationLevel::ReadCommitted);

    fs.write("/x", "t1", Some(t1)).unwrap();
    fs.write("/y", "t2", Some(t2)).unwrap();

    let fs_bg = Arc::clone(&fs);
    let parked = thread::spawn(move || fs_bg.write("/y", "t1-too", Some(t1)));
    thread::sleep(Duration::from_millis(80));

    let err = fs.write("/x", "t2-too", Some(t2)).unwrap_err();
    assert!(matches!(err, Error::Deadlock { .. }));
    assert!(err.is_retryable());

    // The victim backs off; the parked writer proceeds.
    fs.abort(t2).unwrap();
    parked.join().unwrap().unwrap();
    fs.commit(t1).unwrap();

    assert_eq!(fs.read("/y", None).unwrap(), "t1-too");
    assert_eq!(fs.read("/x", None).unwrap(), "t1");
}

#[test]
fn abort_from_another_thread_releases_parked_waiter() {
    let fs = Arc::new(MemFs::new());
    fs.touch("/f", None).unwrap();

    let holder = fs.begin(IsolationLevel::ReadCommitted);
    fs.write("/f", "held", Some(holder)).unwrap();

    let waiter = fs.begin(IsolationLevel::ReadCommitted);
    let fs_bg = Arc::clone(&fs);
    let parked = thread::spawn(move || fs_bg.write("/f", "blocked", Some(waiter)));
    thread::sleep(Duration::from_millis(80));

    fs.abort(waiter).unwrap();
    let err = parked.join().unwrap().unwrap_err();
    assert!(matches!(err, Error::LockCancelled { .. }));
    assert_eq!(fs.txn_state(waiter).unwrap(), TxnState::Aborted);

    fs.commit(holder).unwrap();
    assert_eq!(fs.read("/f", None).unwrap(), "held");
}

#[test]
fn abort_racing_commit_apply_yields_one_terminal_state() {
    // Abort fired while commit is applying the buffer must not strip the
    // committer's locks or report a second terminal state: it blocks until
    // the commit settles, and both callers agree on the outcome.
    let fs = Arc::new(MemFs::new());
    fs.touch("/f", None).unwrap();
    fs.open("/f", None).unwrap();

    let txn = fs.begin(IsolationLevel::ReadCommitted);
    // A large buffer keeps the commit's apply loop busy: every buffered
    // write becomes its own version, each diffed against the previous.
    let mut last = String::new();
    for round in 0..300 {
        last = format!("{:03}", round).repeat(200);
        fs.write("/f", &last, Some(txn)).unwrap();
    }

    let fs_commit = Arc::clone(&fs);
    let committer = thread::spawn(move || fs_commit.commit(txn));
    thread::sleep(Duration::from_millis(10));

    let abort_result = fs.abort(txn);
    let commit_result = committer.join().unwrap();
    let final_state = fs.txn_state(txn).unwrap();

    match final_state {
        TxnState::Committed => {
            // The abort arrived too late; it must say so, not claim success.
            commit_result.unwrap();
            assert!(matches!(
                abort_result.unwrap_err(),
                Error::TransactionNotActive { .. }
            ));
            assert_eq!(fs.read("/f", None).unwrap(), last);
        }
        TxnState::Aborted => {
            // The abort won before the commit took the buffer.
            abort_result.unwrap();
            assert!(commit_result.is_err());
            assert_eq!(fs.read("/f", None).unwrap(), "");
        }
        other => panic!("unexpected terminal state: {:?}", other),
    }
    // The state reported above is stable.
    assert_eq!(fs.txn_state(txn).unwrap(), final_state);
}

#[test]
fn commit_before_begin_is_observed() {
    // If commit(A) happens-before begin(B), B observes A's effects under
    // both READ_COMMITTED and SNAPSHOT.
    let fs = MemFs::new();
    fs.touch("/f", None).unwrap();

    let a = fs.begin(IsolationLevel::ReadCommitted);
    fs.write("/f", "from-a", Some(a)).unwrap();
    fs.commit(a).unwrap();

    let rc = fs.begin(IsolationLevel::ReadCommitted);
    let snap = fs.begin(IsolationLevel::Snapshot);
    assert_eq!(fs.read("/f", Some(rc)).unwrap(), "from-a");
    assert_eq!(fs.read("/f", Some(snap)).unwrap(), "from-a");
    fs.commit(rc).unwrap();
    fs.commit(snap).unwrap();
}

#[test]
fn concurrent_snapshot_writers_do_not_block_each_other() {
    // Snapshot writers buffer without locks; both proceed from separate
    // threads without waiting on one another.
    let fs = Arc::new(MemFs::new());
    fs.touch("/f", None).unwrap();
    fs.write("/f", "base", None).unwrap();

    let mut handles = Vec::new();
    for n in 0..4 {
        let fs = Arc::clone(&fs);
        handles.push(thread::spawn(move || {
            let txn = fs.begin(IsolationLevel::Snapshot);
            fs.write("/f", &format!("writer-{}", n), Some(txn)).unwrap();
            fs.commit(txn).unwrap();
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let content = fs.read("/f", None).unwrap();
    assert!(content.starts_with("writer-"));
}
