//! Versioned file contents as an append-only diff chain
//!
//! A file's history is the sequence `v0, v1, .., vn` where `v0` is the empty
//! content established at creation and each later version is stored as a
//! diff against its predecessor. Any version is materialized by folding the
//! chain over the empty baseline.
//!
//! `cur` is a movable pointer into the chain: `revert_to` only moves it, the
//! chain itself is never rewritten or truncated, so versions past `cur`
//! remain addressable for transactions still observing them.

use crate::diff::Diff;
use memfs_core::{Error, Result};
use parking_lot::RwLock;

#[derive(Debug)]
struct Chain {
    /// Diff `i` turns version `i` into version `i + 1`.
    diffs: Vec<Diff>,
    /// The version reads observe by default. Always `<= diffs.len()`.
    cur: u64,
    /// Materialized content of the newest version (the chain tip); keeps
    /// appends from re-folding the whole chain.
    tip: String,
}

/// A file's content history. Thread-safe; share behind `Arc`.
#[derive(Debug)]
pub struct VersionedFile {
    inner: RwLock<Chain>,
}

impl VersionedFile {
    /// Create a chain holding only the empty version `v0`.
    pub fn new() -> Self {
        VersionedFile {
            inner: RwLock::new(Chain {
                diffs: Vec::new(),
                cur: 0,
                tip: String::new(),
            }),
        }
    }

    /// The version index reads observe by default.
    pub fn current(&self) -> u64 {
        self.inner.read().cur
    }

    /// The newest version in the chain.
    pub fn latest(&self) -> u64 {
        self.inner.read().diffs.len() as u64
    }

    /// Materialize version `v`.
    ///
    /// Fails with `NoSuchVersion` when `v` lies past the end of the chain.
    pub fn read(&self, v: u64) -> Result<String> {
        let chain = self.inner.read();
        let latest = chain.diffs.len() as u64;
        if v > latest {
            return Err(Error::no_such_version(v, latest));
        }
        if v == latest {
            return Ok(chain.tip.clone());
        }
        materialize(&chain.diffs, v)
    }

    /// Materialize the `cur` version.
    pub fn read_current(&self) -> Result<String> {
        let chain = self.inner.read();
        let latest = chain.diffs.len() as u64;
        if chain.cur == latest {
            return Ok(chain.tip.clone());
        }
        materialize(&chain.diffs, chain.cur)
    }

    /// Append `content` as a new version and advance `cur` to it.
    ///
    /// The diff is taken against the chain tip so that folding diffs
    /// `1..=v` always reconstructs version `v`, even when `cur` was
    /// previously reverted below the tip. Returns the new version index.
    pub fn append_version(&self, content: &str) -> u64 {
        let mut chain = self.inner.write();
        let diff = Diff::compute(&chain.tip, content);
        chain.diffs.push(diff);
        chain.tip = content.to_string();
        chain.cur = chain.diffs.len() as u64;
        chain.cur
    }

    /// Move `cur` back (or forward) to version `v` without touching the
    /// chain. Fails with `NoSuchVersion` when `v` is out of range.
    pub fn revert_to(&self, v: u64) -> Result<()> {
        let mut chain = self.inner.write();
        let latest = chain.diffs.len() as u64;
        if v > latest {
            return Err(Error::no_such_version(v, latest));
        }
        chain.cur = v;
        Ok(())
    }
}

impl Default for VersionedFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold diffs `1..=v` over the empty baseline.
fn materialize(diffs: &[Diff], v: u64) -> Result<String> {
    let mut content = String::new();
    for diff in &diffs[..v as usize] {
        content = diff.apply(&content)?;
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_file_is_empty_v0() {
        let file = VersionedFile::new();
        assert_eq!(file.current(), 0);
        assert_eq!(file.latest(), 0);
        assert_eq!(file.read(0).unwrap(), "");
    }

    #[test]
    fn test_append_advances_cur() {
        let file = VersionedFile::new();
        assert_eq!(file.append_version("one"), 1);
        assert_eq!(file.append_version("two"), 2);
        assert_eq!(file.current(), 2);
        assert_eq!(file.read_current().unwrap(), "two");
    }

    #[test]
    fn test_every_version_reconstructs() {
        // Round-trip: writing c0..cn in order, version i reads back ci.
        let contents = ["", "alpha", "alphabet", "beta", "", "betamax"];
        let file = VersionedFile::new();
        for content in &contents[1..] {
            file.append_version(content);
        }
        for (i, content) in contents.iter().enumerate() {
            assert_eq!(file.read(i as u64).unwrap(), *content);
        }
    }

    #[test]
    fn test_identical_writes_make_distinct_versions() {
        let file = VersionedFile::new();
        let first = file.append_version("same");
        let second = file.append_version("same");
        assert_ne!(first, second);
        assert_eq!(file.read(first).unwrap(), file.read(second).unwrap());
    }

    #[test]
    fn test_read_past_end() {
        let file = VersionedFile::new();
        file.append_version("x");
        let err = file.read(2).unwrap_err();
        assert_eq!(err, Error::no_such_version(2, 1));
    }

    #[test]
    fn test_revert_moves_pointer_only() {
        let file = VersionedFile::new();
        file.append_version("v1");
        file.append_version("v2");
        file.revert_to(1).unwrap();
        assert_eq!(file.current(), 1);
        assert_eq!(file.read_current().unwrap(), "v1");
        // Later versions stay addressable for in-flight readers.
        assert_eq!(file.latest(), 2);
        assert_eq!(file.read(2).unwrap(), "v2");
    }

    #[test]
    fn test_revert_out_of_range() {
        let file = VersionedFile::new();
        assert!(file.revert_to(3).is_err());
    }

    #[test]
    fn test_append_after_revert_lands_at_tip() {
        let file = VersionedFile::new();
        file.append_version("v1");
        file.append_version("v2");
        file.revert_to(1).unwrap();
        let v = file.append_version("v3");
        assert_eq!(v, 3);
        assert_eq!(file.read(3).unwrap(), "v3");
        // The chain before the revert point is untouched.
        assert_eq!(file.read(1).unwrap(), "v1");
        assert_eq!(file.read(2).unwrap(), "v2");
    }
}
