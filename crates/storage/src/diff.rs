//! Minimal edit scripts between two text contents
//!
//! A `Diff` is an ordered list of `equal`/`delete`/`insert` operations over
//! character runs, sufficient to reconstruct the new content from the old.
//! The algorithm is a longest-common-subsequence dynamic program, chosen
//! because it is deterministic: the same input pair always yields the same
//! script, which keeps version chains reproducible.
//!
//! The only contract callers rely on: `Diff::compute(a, b).apply(a) == b`.

use memfs_core::{Error, Result};

/// One operation in an edit script.
///
/// Operations are expressed against the *old* content: `Equal` and `Delete`
/// consume old characters, `Insert` produces new ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOp {
    /// Copy the next `n` characters of the old content.
    Equal(usize),
    /// Skip the next `n` characters of the old content.
    Delete(usize),
    /// Emit this text.
    Insert(String),
}

/// An edit script from one content to the next.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Diff {
    ops: Vec<DiffOp>,
}

impl Diff {
    /// Compute the edit script turning `old` into `new`.
    ///
    /// Runs the classic LCS dynamic program over characters, then walks the
    /// table front-to-back emitting merged runs. O(len(old) * len(new)) time
    /// and space, which is acceptable for an in-memory store.
    pub fn compute(old: &str, new: &str) -> Diff {
        let a: Vec<char> = old.chars().collect();
        let b: Vec<char> = new.chars().collect();
        let n = a.len();
        let m = b.len();

        // lcs[i][j] = length of the LCS of a[i..] and b[j..]
        let mut lcs = vec![vec![0u32; m + 1]; n + 1];
        for i in (0..n).rev() {
            for j in (0..m).rev() {
                lcs[i][j] = if a[i] == b[j] {
                    lcs[i + 1][j + 1] + 1
                } else {
                    lcs[i + 1][j].max(lcs[i][j + 1])
                };
            }
        }

        let mut ops: Vec<DiffOp> = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < n && j < m {
            if a[i] == b[j] {
                push_equal(&mut ops, 1);
                i += 1;
                j += 1;
            } else if lcs[i + 1][j] >= lcs[i][j + 1] {
                // Preferring deletion on ties keeps the walk deterministic.
                push_delete(&mut ops, 1);
                i += 1;
            } else {
                push_insert(&mut ops, b[j]);
                j += 1;
            }
        }
        if i < n {
            push_delete(&mut ops, n - i);
        }
        while j < m {
            push_insert(&mut ops, b[j]);
            j += 1;
        }

        Diff { ops }
    }

    /// Apply this script to `old`, producing the new content.
    ///
    /// Fails with `Corruption` when the script does not fit the input, which
    /// indicates a broken version chain rather than a caller mistake.
    pub fn apply(&self, old: &str) -> Result<String> {
        let chars: Vec<char> = old.chars().collect();
        let mut out = String::with_capacity(old.len());
        let mut pos = 0usize;

        for op in &self.ops {
            match op {
                DiffOp::Equal(n) => {
                    let end = pos.checked_add(*n).filter(|&e| e <= chars.len());
                    let end = end.ok_or_else(|| {
                        Error::corruption("diff consumes past the end of its base content")
                    })?;
                    out.extend(&chars[pos..end]);
                    pos = end;
                }
                DiffOp::Delete(n) => {
                    let end = pos.checked_add(*n).filter(|&e| e <= chars.len());
                    pos = end.ok_or_else(|| {
                        Error::corruption("diff deletes past the end of its base content")
                    })?;
                }
                DiffOp::Insert(text) => out.push_str(text),
            }
        }

        if pos != chars.len() {
            return Err(Error::corruption(format!(
                "diff consumed {} of {} base characters",
                pos,
                chars.len()
            )));
        }
        Ok(out)
    }

    /// The operations of this script.
    pub fn ops(&self) -> &[DiffOp] {
        &self.ops
    }
}

fn push_equal(ops: &mut Vec<DiffOp>, n: usize) {
    if let Some(DiffOp::Equal(run)) = ops.last_mut() {
        *run += n;
    } else {
        ops.push(DiffOp::Equal(n));
    }
}

fn push_delete(ops: &mut Vec<DiffOp>, n: usize) {
    if let Some(DiffOp::Delete(run)) = ops.last_mut() {
        *run += n;
    } else {
        ops.push(DiffOp::Delete(n));
    }
}

fn push_insert(ops: &mut Vec<DiffOp>, c: char) {
    if let Some(DiffOp::Insert(text)) = ops.last_mut() {
        text.push(c);
    } else {
        ops.push(DiffOp::Insert(c.to_string()));
    }
}
