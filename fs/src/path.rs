//! The `|`-delimited path cursor (spec §4.4 "Path model").
//!
//! A path is the literal `root`, optionally followed by `|name` segments.
//! `/` carries no special meaning here; it is deliberately avoided so no one
//! mistakes this for Unix path semantics.

use nanos_abi::config::{FS_PATH_MAX_LEN, FS_PATH_SEPARATOR, FS_ROOT};

#[derive(Clone, Copy)]
pub struct PathCursor {
    buf: [u8; FS_PATH_MAX_LEN],
    len: usize,
}

impl PathCursor {
    pub const fn at_root() -> Self {
        let mut buf = [0u8; FS_PATH_MAX_LEN];
        let root = FS_ROOT.as_bytes();
        let mut i = 0;
        while i < root.len() {
            buf[i] = root[i];
            i += 1;
        }
        Self { buf, len: root.len() }
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or(FS_ROOT)
    }

    pub fn is_root(&self) -> bool {
        self.as_str() == FS_ROOT
    }

    /// Would `cursor|name` fit in the fixed buffer?
    pub fn fits_child(&self, name: &str) -> bool {
        self.len + 1 + name.len() <= FS_PATH_MAX_LEN
    }

    /// Descend into `name`, appending `|name` to the cursor. Caller must
    /// have already checked [`fits_child`].
    pub fn push(&mut self, name: &str) {
        self.buf[self.len] = FS_PATH_SEPARATOR;
        let start = self.len + 1;
        self.buf[start..start + name.len()].copy_from_slice(name.as_bytes());
        self.len = start + name.len();
    }

    /// Chop the cursor at the last separator, returning to the parent
    /// directory. No-op (returns false) if already at `root`.
    pub fn pop(&mut self) -> bool {
        if self.is_root() {
            return false;
        }
        let last_sep = self.buf[..self.len].iter().rposition(|&b| b == FS_PATH_SEPARATOR).unwrap_or(0);
        self.len = last_sep;
        true
    }

    /// Build `parent|name` into a scratch buffer without mutating the
    /// cursor, for existence checks ahead of an actual descent.
    pub fn child_path(parent: &str, name: &str) -> PathBuf {
        let mut buf = [0u8; FS_PATH_MAX_LEN];
        let mut len = parent.len().min(FS_PATH_MAX_LEN);
        buf[..len].copy_from_slice(&parent.as_bytes()[..len]);
        if len < FS_PATH_MAX_LEN {
            buf[len] = FS_PATH_SEPARATOR;
            len += 1;
        }
        let room = FS_PATH_MAX_LEN - len;
        let take = name.len().min(room);
        buf[len..len + take].copy_from_slice(&name.as_bytes()[..take]);
        len += take;
        PathBuf { buf, len }
    }
}

/// An owned, stack-allocated path string, for building `parent|name`
/// candidates without touching a live [`PathCursor`].
pub struct PathBuf {
    buf: [u8; FS_PATH_MAX_LEN],
    len: usize,
}

impl PathBuf {
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_root() {
        let cursor = PathCursor::at_root();
        assert_eq!(cursor.as_str(), "root");
        assert!(cursor.is_root());
    }

    #[test]
    fn push_then_pop_round_trips() {
        let mut cursor = PathCursor::at_root();
        cursor.push("bin");
        assert_eq!(cursor.as_str(), "root|bin");
        assert!(cursor.pop());
        assert_eq!(cursor.as_str(), "root");
    }

    #[test]
    fn pop_at_root_is_rejected() {
        let mut cursor = PathCursor::at_root();
        assert!(!cursor.pop());
        assert_eq!(cursor.as_str(), "root");
    }

    #[test]
    fn nested_push_builds_pipe_delimited_path() {
        let mut cursor = PathCursor::at_root();
        cursor.push("home");
        cursor.push("welcome.txt");
        assert_eq!(cursor.as_str(), "root|home|welcome.txt");
    }

    #[test]
    fn child_path_joins_with_separator() {
        let joined = PathCursor::child_path("root|home", "welcome.txt");
        assert_eq!(joined.as_str(), "root|home|welcome.txt");
    }
}
