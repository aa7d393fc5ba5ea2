//! The flat entry table and its operations (spec §4.4).

use nanos_abi::config::{FS_CONTENT_MAX_LEN, FS_MAX_ENTRIES, FS_NAME_MAX_LEN, FS_ROOT};
use nanos_abi::error::FsError;
use nanos_abi::fs::FsEntry;

use crate::path::PathCursor;

pub struct FsTable {
    entries: [FsEntry; FS_MAX_ENTRIES],
    cursor: PathCursor,
    last_error: FsError,
}

impl FsTable {
    pub const fn new() -> Self {
        Self {
            entries: [FsEntry::empty(); FS_MAX_ENTRIES],
            cursor: PathCursor::at_root(),
            last_error: FsError::Success,
        }
    }

    fn fail(&mut self, error: FsError) -> FsError {
        self.last_error = error;
        error
    }

    fn ok(&mut self) -> FsError {
        self.last_error = FsError::Success;
        FsError::Success
    }

    pub fn last_error(&self) -> FsError {
        self.last_error
    }

    pub fn cwd(&self) -> &str {
        self.cursor.as_str()
    }

    fn find_slot(&self, name: &str, path: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.in_use && e.name_str() == name && e.path_str() == path)
    }

    fn find_free_slot(&self) -> Option<usize> {
        self.entries.iter().position(|e| !e.in_use)
    }

    /// A directory is indistinguishable from a zero-content file in storage
    /// (spec §4.4): `path` names an existing directory if it is `root`, or
    /// if some stored entry's `path|name` equals it.
    fn directory_exists(&self, path: &str) -> bool {
        if path == FS_ROOT {
            return true;
        }
        self.entries
            .iter()
            .any(|e| e.in_use && PathCursor::child_path(e.path_str(), e.name_str()).as_str() == path)
    }

    /// Internal-only allocation (spec §4.4 "create"): never called directly
    /// by external callers, only by `write`'s retry-once path and `mkdir`.
    fn create(&mut self, name: &str, path: &str, content: &str) -> FsError {
        if name.is_empty() {
            return self.fail(FsError::InvalidInput);
        }
        if name.len() > FS_NAME_MAX_LEN {
            return self.fail(FsError::NameTooLong);
        }
        if self.find_slot(name, path).is_some() {
            return self.fail(FsError::AlreadyExists);
        }
        let Some(slot) = self.find_free_slot() else {
            return self.fail(FsError::NoSpace);
        };

        let entry = &mut self.entries[slot];
        entry.clear();
        entry.in_use = true;
        entry.name[..name.len()].copy_from_slice(name.as_bytes());
        entry.name_len = name.len() as u8;
        entry.path[..path.len()].copy_from_slice(path.as_bytes());
        entry.path_len = path.len() as u8;
        entry.content[..content.len()].copy_from_slice(content.as_bytes());
        entry.content_len = content.len() as u16;
        self.ok()
    }

    pub fn write(&mut self, name: &str, content: &str) -> FsError {
        if name.is_empty() {
            return self.fail(FsError::InvalidInput);
        }
        if content.len() > FS_CONTENT_MAX_LEN {
            return self.fail(FsError::BufferOverflow);
        }

        let cwd = self.cursor.as_str();
        if let Some(slot) = self.find_slot(name, cwd) {
            let entry = &mut self.entries[slot];
            entry.content[..content.len()].copy_from_slice(content.as_bytes());
            entry.content_len = content.len() as u16;
            return self.ok();
        }

        let cwd_owned = heapless_copy(cwd);
        self.create(name, cwd_owned.as_str(), content)
    }

    pub fn read(&mut self, name: &str) -> Option<&str> {
        let cwd = self.cursor.as_str();
        match self.find_slot(name, cwd) {
            Some(slot) => {
                self.last_error = FsError::Success;
                Some(self.entries[slot].content_str())
            }
            None => {
                self.last_error = FsError::NotFound;
                None
            }
        }
    }

    pub fn delete(&mut self, name: &str) -> FsError {
        if name.is_empty() {
            return self.fail(FsError::InvalidInput);
        }
        let cwd = self.cursor.as_str();
        match self.find_slot(name, cwd) {
            Some(slot) => {
                self.entries[slot].clear();
                self.ok()
            }
            None => self.fail(FsError::NotFound),
        }
    }

    pub fn mkdir(&mut self, name: &str) -> FsError {
        if name.is_empty() {
            return self.fail(FsError::InvalidInput);
        }
        if name.len() > FS_NAME_MAX_LEN {
            return self.fail(FsError::NameTooLong);
        }
        if !self.cursor.fits_child(name) {
            return self.fail(FsError::NameTooLong);
        }
        let cwd = self.cursor.as_str();
        if self.find_slot(name, cwd).is_some() {
            return self.fail(FsError::AlreadyExists);
        }
        let cwd_owned = heapless_copy(cwd);
        self.create(name, cwd_owned.as_str(), "")
    }

    pub fn chdir(&mut self, name: &str) -> FsError {
        if name == "back" {
            if self.cursor.is_root() {
                return self.fail(FsError::InvalidOperation);
            }
            self.cursor.pop();
            return self.ok();
        }

        let cwd = self.cursor.as_str();
        if self.find_slot(name, cwd).is_none() {
            return self.fail(FsError::NotFound);
        }
        if !self.cursor.fits_child(name) {
            return self.fail(FsError::NameTooLong);
        }
        self.cursor.push(name);
        self.ok()
    }

    /// Entries whose path equals the current directory, invoked once per
    /// match so callers never need a heap-backed `Vec`.
    pub fn ls(&mut self, mut visit: impl FnMut(&FsEntry)) {
        let cwd = self.cursor.as_str();
        for entry in self.entries.iter().filter(|e| e.in_use && e.path_str() == cwd) {
            visit(entry);
        }
        self.ok();
    }

    pub fn search(&mut self, name: &str) -> Option<PathResult> {
        let found = self.entries.iter().find(|e| e.in_use && e.name_str() == name);
        match found {
            Some(entry) => {
                self.last_error = FsError::Success;
                Some(PathResult::from_path(entry.path_str()))
            }
            None => {
                self.last_error = FsError::NotFound;
                None
            }
        }
    }

    pub fn copy(&mut self, src_name: &str, dest_path: &str) -> FsError {
        let cwd = self.cursor.as_str();
        let Some(src_slot) = self.find_slot(src_name, cwd) else {
            return self.fail(FsError::NotFound);
        };
        if !self.directory_exists(dest_path) {
            return self.fail(FsError::NotFound);
        }
        if self.find_slot(src_name, dest_path).is_some() {
            return self.fail(FsError::AlreadyExists);
        }

        let name = heapless_copy(self.entries[src_slot].name_str());
        let content = heapless_content_copy(self.entries[src_slot].content_str());
        self.create(name.as_str(), dest_path, content.as_str())
    }

    pub fn list_hierarchy(&mut self, mut visit: impl FnMut(&str, &str)) {
        for entry in self.entries.iter().filter(|e| e.in_use) {
            visit(entry.path_str(), entry.name_str());
        }
        self.ok();
    }

    /// Spec §4.4 "Initial seeding".
    pub fn seed(&mut self) {
        self.create(
            "system.info",
            FS_ROOT,
            "NanOS kernel: a small x86-64 preemptive multitasking hobby kernel.",
        );
        self.create("README.txt", FS_ROOT, "Welcome to NanOS. Type `ls` to look around.");
        self.create("bin", FS_ROOT, "");
        self.create("usr", FS_ROOT, "");
        self.create("home", FS_ROOT, "");
        self.create("welcome.txt", "root|home", "Welcome home.");
    }
}

impl Default for FsTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of [`FsTable::search`]: the *path* of the matching entry
/// (spec §4.4 "search"), not the entry itself.
pub struct PathResult {
    buf: [u8; nanos_abi::config::FS_PATH_MAX_LEN],
    len: usize,
}

impl PathResult {
    fn from_path(path: &str) -> Self {
        let mut buf = [0u8; nanos_abi::config::FS_PATH_MAX_LEN];
        let n = path.len().min(buf.len());
        buf[..n].copy_from_slice(&path.as_bytes()[..n]);
        Self { buf, len: n }
    }

    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }
}

/// Small fixed-size string copy helper: every path/name in this table is
/// already bounded by the config constants, so a stack buffer is enough.
fn heapless_copy(s: &str) -> PathResult {
    PathResult::from_path(s)
}

struct ContentBuf {
    buf: [u8; FS_CONTENT_MAX_LEN],
    len: usize,
}

impl ContentBuf {
    fn as_str(&self) -> &str {
        core::str::from_utf8(&self.buf[..self.len]).unwrap_or("")
    }
}

fn heapless_content_copy(s: &str) -> ContentBuf {
    let mut buf = [0u8; FS_CONTENT_MAX_LEN];
    let n = s.len().min(buf.len());
    buf[..n].copy_from_slice(&s.as_bytes()[..n]);
    ContentBuf { buf, len: n }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_creates_then_overwrites() {
        let mut table = FsTable::new();
        assert_eq!(table.write("a.txt", "one"), FsError::Success);
        assert_eq!(table.read("a.txt"), Some("one"));
        assert_eq!(table.write("a.txt", "two"), FsError::Success);
        assert_eq!(table.read("a.txt"), Some("two"));
    }

    #[test]
    fn delete_then_read_reports_not_found() {
        let mut table = FsTable::new();
        table.write("a.txt", "x");
        assert_eq!(table.delete("a.txt"), FsError::Success);
        assert_eq!(table.read("a.txt"), None);
        assert_eq!(table.last_error(), FsError::NotFound);
    }

    #[test]
    fn mkdir_then_chdir_changes_cwd() {
        let mut table = FsTable::new();
        assert_eq!(table.mkdir("docs"), FsError::Success);
        assert_eq!(table.chdir("docs"), FsError::Success);
        assert_eq!(table.cwd(), "root|docs");
        assert_eq!(table.chdir("back"), FsError::Success);
        assert_eq!(table.cwd(), "root");
    }

    #[test]
    fn chdir_back_at_root_is_rejected() {
        let mut table = FsTable::new();
        assert_eq!(table.chdir("back"), FsError::InvalidOperation);
    }

    #[test]
    fn mkdir_duplicate_name_rejected() {
        let mut table = FsTable::new();
        table.mkdir("docs");
        assert_eq!(table.mkdir("docs"), FsError::AlreadyExists);
    }

    #[test]
    fn search_finds_path_regardless_of_directory() {
        let mut table = FsTable::new();
        table.mkdir("docs");
        table.chdir("docs");
        table.write("note.txt", "hi");
        let found = table.search("note.txt").expect("entry should be found");
        assert_eq!(found.as_str(), "root|docs");
    }

    #[test]
    fn copy_into_existing_directory_succeeds() {
        let mut table = FsTable::new();
        table.write("a.txt", "hello");
        table.mkdir("docs");
        assert_eq!(table.copy("a.txt", "root|docs"), FsError::Success);
        table.chdir("docs");
        assert_eq!(table.read("a.txt"), Some("hello"));
    }

    #[test]
    fn copy_into_missing_directory_fails() {
        let mut table = FsTable::new();
        table.write("a.txt", "hello");
        assert_eq!(table.copy("a.txt", "root|ghost"), FsError::NotFound);
    }

    #[test]
    fn seed_populates_expected_entries() {
        let mut table = FsTable::new();
        table.seed();
        assert_eq!(table.read("system.info").is_some(), true);
        assert_eq!(table.read("README.txt").is_some(), true);
        table.chdir("home");
        assert_eq!(table.read("welcome.txt").is_some(), true);
    }
}
