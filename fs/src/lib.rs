//! The flat in-memory filesystem (spec §4.4): a 100-entry table addressed
//! by `|`-delimited paths, guarded by a single lock since the spec requires
//! only that mutations be atomic at the granularity of one entry update.

#![no_std]

pub mod path;
pub mod table;

use nanos_abi::error::FsError;
use nanos_abi::fs::FsEntry;
use nanos_lib::spinlock::IrqMutex;

pub use path::PathCursor;
pub use table::{FsTable, PathResult};

static FS: IrqMutex<FsTable> = IrqMutex::new(FsTable::new());

/// Populate the seed entries (spec §4.4 "Initial seeding"). Call once at
/// boot after the heap (if any) is up; the table itself is static.
pub fn init() {
    FS.lock().seed();
}

pub fn write(name: &str, content: &str) -> FsError {
    FS.lock().write(name, content)
}

/// Copies up to `out.len()` bytes of the entry's content into `out`,
/// returning the number of bytes copied. The spec's "pointer valid until
/// next mutation" contract collapses to a owned copy here, since nothing in
/// `no_std` guards a borrow across the lock being released.
pub fn read(name: &str, out: &mut [u8]) -> Option<usize> {
    let mut guard = FS.lock();
    let content = guard.read(name)?;
    let n = content.len().min(out.len());
    out[..n].copy_from_slice(&content.as_bytes()[..n]);
    Some(n)
}

pub fn delete(name: &str) -> FsError {
    FS.lock().delete(name)
}

pub fn mkdir(name: &str) -> FsError {
    FS.lock().mkdir(name)
}

pub fn chdir(name: &str) -> FsError {
    FS.lock().chdir(name)
}

pub fn ls(visit: impl FnMut(&FsEntry)) {
    FS.lock().ls(visit);
}

pub fn search(name: &str) -> Option<PathResult> {
    FS.lock().search(name)
}

pub fn copy(src_name: &str, dest_path: &str) -> FsError {
    FS.lock().copy(src_name, dest_path)
}

pub fn list_hierarchy(visit: impl FnMut(&str, &str)) {
    FS.lock().list_hierarchy(visit);
}

pub fn cwd(out: &mut [u8]) -> usize {
    let guard = FS.lock();
    let cwd = guard.cwd();
    let n = cwd.len().min(out.len());
    out[..n].copy_from_slice(&cwd.as_bytes()[..n]);
    n
}

pub fn last_error() -> FsError {
    FS.lock().last_error()
}

/// Look an entry up and fill a stat record (spec §4.3's `stat` syscall):
/// regular-file mode, size = content length, default 512-byte blocks,
/// timestamps set to the supplied uptime.
pub fn stat(name: &str, uptime_ms: u64) -> Option<nanos_abi::fs::StatRecord> {
    let mut guard = FS.lock();
    let content_len = guard.read(name)?.len() as u64;
    Some(nanos_abi::fs::StatRecord::for_regular_file(content_len, uptime_ms))
}
