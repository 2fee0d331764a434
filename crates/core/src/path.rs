//! Path parsing and normalization
//!
//! A `Path` is always absolute and normalized: `.` and `..` are resolved at
//! parse time against a base directory, so the rest of the system only ever
//! sees clean component lists. The root has no name; its parent is itself.

use crate::error::{Error, Result};
use std::fmt;

/// An absolute, normalized path over the filesystem tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    components: Vec<String>,
}

impl Path {
    /// The root directory path.
    pub fn root() -> Self {
        Path {
            components: Vec::new(),
        }
    }

    /// Parse `input` relative to `base`.
    ///
    /// Absolute inputs (leading `/`) ignore `base`. `.` is dropped, `..`
    /// pops a component (the root's parent is the root itself), and empty
    /// components from doubled slashes are skipped.
    pub fn parse(input: &str, base: &Path) -> Result<Path> {
        if input.is_empty() {
            return Err(Error::invalid_operation("empty path"));
        }

        let mut components = if input.starts_with('/') {
            Vec::new()
        } else {
            base.components.clone()
        };

        for part in input.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    components.pop();
                }
                name => components.push(name.to_string()),
            }
        }

        Ok(Path { components })
    }

    /// Parse an absolute-or-root-relative path (no working directory).
    pub fn parse_abs(input: &str) -> Result<Path> {
        Self::parse(input, &Path::root())
    }

    /// Whether this is the root path.
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// The final component, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.components.last().map(|s| s.as_str())
    }

    /// The parent path. The root is its own parent.
    pub fn parent(&self) -> Path {
        let mut components = self.components.clone();
        components.pop();
        Path { components }
    }

    /// Append a component.
    pub fn join(&self, name: &str) -> Path {
        let mut components = self.components.clone();
        components.push(name.to_string());
        Path { components }
    }

    /// The component list, root-first.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Whether `self` equals `prefix` or lies beneath it.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.components.len() >= prefix.components.len()
            && self.components[..prefix.components.len()] == prefix.components[..]
    }

    /// Re-anchor `self` from `from` to `to`.
    ///
    /// Returns `None` when `self` does not lie at or beneath `from`. Used to
    /// rewrite paths through buffered moves.
    pub fn rebase(&self, from: &Path, to: &Path) -> Option<Path> {
        if !self.starts_with(from) {
            return None;
        }
        let mut components = to.components.clone();
        components.extend_from_slice(&self.components[from.components.len()..]);
        Some(Path { components })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return f.write_str("/");
        }
        for component in &self.components {
            write!(f, "/{}", component)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Path {
        Path::parse_abs(s).unwrap()
    }

    #[test]
    fn test_parse_absolute() {
        let path = p("/a/b/c");
        assert_eq!(path.components(), &["a", "b", "c"]);
    }

    #[test]
    fn test_parse_relative_uses_base() {
        let base = p("/a/b");
        let path = Path::parse("c/d", &base).unwrap();
        assert_eq!(path.to_string(), "/a/b/c/d");
    }

    #[test]
    fn test_parse_dot_and_dotdot() {
        let base = p("/a/b");
        assert_eq!(Path::parse(".", &base).unwrap(), base);
        assert_eq!(Path::parse("..", &base).unwrap(), p("/a"));
        assert_eq!(Path::parse("../c", &base).unwrap(), p("/a/c"));
        assert_eq!(Path::parse("/x/./y/../z", &base).unwrap(), p("/x/z"));
    }

    #[test]
    fn test_root_parent_is_root() {
        assert_eq!(Path::parse("/..", &Path::root()).unwrap(), Path::root());
        assert_eq!(Path::root().parent(), Path::root());
    }

    #[test]
    fn test_doubled_slashes_skipped() {
        assert_eq!(p("/a//b"), p("/a/b"));
    }

    #[test]
    fn test_empty_path_rejected() {
        assert!(Path::parse("", &Path::root()).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Path::root().to_string(), "/");
        assert_eq!(p("/a/b").to_string(), "/a/b");
    }

    #[test]
    fn test_name_and_parent() {
        let path = p("/a/b");
        assert_eq!(path.name(), Some("b"));
        assert_eq!(path.parent(), p("/a"));
        assert_eq!(Path::root().name(), None);
    }

    #[test]
    fn test_starts_with() {
        assert!(p("/a/b/c").starts_with(&p("/a/b")));
        assert!(p("/a/b").starts_with(&p("/a/b")));
        assert!(p("/a/b").starts_with(&Path::root()));
        assert!(!p("/a/bc").starts_with(&p("/a/b")));
        assert!(!p("/a").starts_with(&p("/a/b")));
    }

    #[test]
    fn test_rebase() {
        let moved = p("/a/b/c").rebase(&p("/a"), &p("/x")).unwrap();
        assert_eq!(moved, p("/x/b/c"));
        assert_eq!(p("/a").rebase(&p("/a"), &p("/x")).unwrap(), p("/x"));
        assert!(p("/q").rebase(&p("/a"), &p("/x")).is_none());
    }
}
