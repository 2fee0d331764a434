//! End-to-end transaction scenarios driven through the public facade.

use memfs::{Error, IsolationLevel, MemFs, TxnState};

fn setup_open_file(fs: &MemFs, path: &str) {
    fs.touch(path, None).unwrap();
    fs.open(path, None).unwrap();
}

#[test]
fn commit_visibility() {
    // Buffered writes are visible to their own transaction immediately and
    // to everyone else only after commit.
    let fs = MemFs::new();
    setup_open_file(&fs, "/a");

    let txn = fs.begin(IsolationLevel::ReadCommitted);
    fs.write("/a", "X", Some(txn)).unwrap();

    assert_eq!(fs.read("/a", None).unwrap(), "");
    assert_eq!(fs.read("/a", Some(txn)).unwrap(), "X");

    fs.commit(txn).unwrap();
    assert_eq!(fs.read("/a", None).unwrap(), "X");
}

#[test]
fn abort_isolation() {
    let fs = MemFs::new();
    setup_open_file(&fs, "/b");
    fs.write("/b", "old", None).unwrap();

    let txn = fs.begin(IsolationLevel::ReadCommitted);
    fs.write("/b", "new", Some(txn)).unwrap();
    fs.abort(txn).unwrap();

    assert_eq!(fs.read("/b", None).unwrap(), "old");
    assert_eq!(fs.txn_state(txn).unwrap(), TxnState::Aborted);
}

#[test]
fn snapshot_stability() {
    let fs = MemFs::new();
    setup_open_file(&fs, "/c");
    fs.write("/c", "v1", None).unwrap();

    let snap = fs.begin(IsolationLevel::Snapshot);
    fs.write("/c", "v2", None).unwrap();

    assert_eq!(fs.read("/c", Some(snap)).unwrap(), "v1");
    assert_eq!(fs.read("/c", None).unwrap(), "v2");
    fs.commit(snap).unwrap();
}

#[test]
fn read_committed_observes_new_commits() {
    let fs = MemFs::new();
    setup_open_file(&fs, "/c");
    fs.write("/c", "v1", None).unwrap();

    let txn = fs.begin(IsolationLevel::ReadCommitted);
    fs.write("/c", "v2", None).unwrap();
    assert_eq!(fs.read("/c", Some(txn)).unwrap(), "v2");
    fs.commit(txn).unwrap();
}

#[test]
fn snapshot_last_writer_wins() {
    // Two snapshot transactions write the same file; no first-committer
    // check: both commit, and the later commit ends up current.
    let fs = MemFs::new();
    fs.touch("/d", None).unwrap();
    fs.write("/d", "$1000", None).unwrap();

    let a = fs.begin(IsolationLevel::Snapshot);
    let b = fs.begin(IsolationLevel::Snapshot);
    fs.write("/d", "$500", Some(a)).unwrap();
    fs.write("/d", "$2000", Some(b)).unwrap();

    fs.commit(a).unwrap();
    assert_eq!(fs.read("/d", None).unwrap(), "$500");
    fs.commit(b).unwrap();
    assert_eq!(fs.read("/d", None).unwrap(), "$2000");
}

#[test]
fn aborted_transaction_leaves_no_trace() {
    let fs = MemFs::new();
    setup_open_file(&fs, "/keep");
    fs.write("/keep", "original", None).unwrap();

    let txn = fs.begin(IsolationLevel::Snapshot);
    fs.write("/keep", "scribble", Some(txn)).unwrap();
    fs.mkdir("/new-dir", Some(txn)).unwrap();
    fs.touch("/new-file", Some(txn)).unwrap();
    fs.rm("/keep", Some(txn)).unwrap();
    fs.abort(txn).unwrap();

    assert_eq!(fs.read("/keep", None).unwrap(), "original");
    assert_eq!(fs.ls("/", None).unwrap(), vec!["keep"]);
}

#[test]
fn snapshot_does_not_observe_late_files() {
    let fs = MemFs::new();
    let snap = fs.begin(IsolationLevel::Snapshot);

    fs.touch("/late", None).unwrap();
    fs.write("/late", "x", None).unwrap();

    assert!(matches!(
        fs.read("/late", Some(snap)).unwrap_err(),
        Error::NoSuchFile { .. }
    ));
    fs.commit(snap).unwrap();
    // After the snapshot transaction ends, the file is there as usual.
    assert_eq!(fs.read("/late", None).unwrap(), "x");
}

#[test]
fn structural_transaction_roundtrip() {
    let fs = MemFs::new();
    fs.mkdir("/docs", None).unwrap();
    setup_open_file(&fs, "/docs/a");
    fs.write("/docs/a", "text", None).unwrap();

    let txn = fs.begin(IsolationLevel::Snapshot);
    fs.mkdir("/archive", Some(txn)).unwrap();
    fs.mv("/docs/a", "/archive", Some(txn)).unwrap();
    fs.rm("/docs", Some(txn)).unwrap();

    // Own view reflects the buffered restructure.
    assert_eq!(fs.read("/archive/a", Some(txn)).unwrap(), "text");
    assert!(fs.read("/docs/a", Some(txn)).is_err());

    // Shared view is untouched until commit.
    assert_eq!(fs.read("/docs/a", None).unwrap(), "text");
    assert!(fs.ls("/archive", None).is_err());

    fs.commit(txn).unwrap();
    assert_eq!(fs.read("/archive/a", None).unwrap(), "text");
    assert_eq!(fs.ls("/", None).unwrap(), vec!["archive"]);
}

#[test]
fn double_commit_rejected() {
    let fs = MemFs::new();
    let txn = fs.begin(IsolationLevel::ReadCommitted);
    fs.commit(txn).unwrap();
    assert!(matches!(
        fs.commit(txn).unwrap_err(),
        Error::TransactionNotActive { .. }
    ));
}

#[test]
fn version_round_trip_through_commits() {
    // Writing c1..cn in order and committing each, reading after commit i
    // always returns ci.
    let fs = MemFs::new();
    setup_open_file(&fs, "/f");
    let contents = ["alpha", "beta", "gamma", "beta"];
    for content in contents {
        let txn = fs.begin(IsolationLevel::ReadCommitted);
        fs.write("/f", content, Some(txn)).unwrap();
        fs.commit(txn).unwrap();
        assert_eq!(fs.read("/f", None).unwrap(), content);
    }
}
