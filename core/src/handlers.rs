//! Built-in syscall handlers (spec §4.3's catalogue, 0x01 through 0x15).
//!
//! Every handler has the `SyscallHandler` signature: it reads its arguments
//! out of the trap frame and writes its result into `frame.return_value`,
//! then also returns that value so [`crate::table::syscall_dispatch`] can
//! hand it straight back to the caller without re-reading the frame.

use core::sync::atomic::{AtomicU32, Ordering};

use nanos_abi::config::MAX_ALLOCATION_BYTES;
use nanos_abi::error::SyscallError;
use nanos_abi::syscall::{self, SyscallFlags, SyscallHandler, SyscallTrapFrame};
use nanos_lib::klog_debug;

const FD_STDIN: u64 = 0;
const FD_STDOUT: u64 = 1;
const FD_STDERR: u64 = 2;
const FIRST_USER_FD: u32 = 3;

const TCGETS: u64 = 0x5401;
const TCSETS: u64 = 0x5402;
const TIOCGWINSZ: u64 = 0x540B;

const MAX_WRITE_LEN: u64 = 4096;

fn ret(frame: &mut SyscallTrapFrame, value: i64) -> i64 {
    frame.set_return(value);
    value
}

fn err(frame: &mut SyscallTrapFrame, e: SyscallError) -> i64 {
    ret(frame, e.as_c_int() as i64)
}

fn ok(frame: &mut SyscallTrapFrame) -> i64 {
    ret(frame, SyscallError::Success.as_c_int() as i64)
}

/// Reads a caller-supplied `(ptr, len)` pair as a byte slice. Rejects a null
/// pointer with a nonzero length; a zero length always yields an empty slice.
///
/// # Safety
/// The caller (a syscall handler invoked from the trap frame) is trusting the
/// calling task's pointer; this kernel has no separate user/kernel address
/// spaces to validate against (spec §9 Non-goals: no paging).
unsafe fn user_slice<'a>(ptr: u64, len: u64) -> Option<&'a [u8]> {
    if len == 0 {
        return Some(&[]);
    }
    if ptr == 0 {
        return None;
    }
    Some(unsafe { core::slice::from_raw_parts(ptr as *const u8, len as usize) })
}

unsafe fn user_slice_mut<'a>(ptr: u64, len: u64) -> Option<&'a mut [u8]> {
    if len == 0 {
        return Some(&mut []);
    }
    if ptr == 0 {
        return None;
    }
    Some(unsafe { core::slice::from_raw_parts_mut(ptr as *mut u8, len as usize) })
}

fn sys_exit(frame: &mut SyscallTrapFrame) -> i64 {
    let [code, ..] = frame.args();
    let id = nanos_sched::current_task_id().unwrap_or(nanos_abi::task::INVALID_TASK_ID);
    klog_debug!("syscall: exit(task={}, code={})", id, code as i32);
    let _ = nanos_sched::exit_task(id, code as i32);
    ok(frame)
}

fn sys_read(frame: &mut SyscallTrapFrame) -> i64 {
    let [fd, ..] = frame.args();
    if fd != FD_STDIN {
        return err(frame, SyscallError::InvalidArgument);
    }
    // No keyboard-backed stdin wiring yet: a read on fd 0 always reports EOF.
    ret(frame, 0)
}

fn sys_write(frame: &mut SyscallTrapFrame) -> i64 {
    let [fd, buf_ptr, count, ..] = frame.args();
    if (fd != FD_STDOUT && fd != FD_STDERR) || count > MAX_WRITE_LEN {
        return err(frame, SyscallError::InvalidArgument);
    }
    let bytes = match unsafe { user_slice(buf_ptr, count) } {
        Some(b) => b,
        None => return err(frame, SyscallError::InvalidArgument),
    };
    let text = core::str::from_utf8(bytes).unwrap_or("");
    nanos_drivers::serial::write_str(text);
    ret(frame, bytes.len() as i64)
}

static NEXT_FD: AtomicU32 = AtomicU32::new(FIRST_USER_FD);

fn sys_open(frame: &mut SyscallTrapFrame) -> i64 {
    let [path_ptr, path_len, ..] = frame.args();
    let name = match unsafe { user_slice(path_ptr, path_len) } {
        Some(b) => core::str::from_utf8(b).unwrap_or(""),
        None => return err(frame, SyscallError::InvalidArgument),
    };
    let fd = NEXT_FD.fetch_add(1, Ordering::Relaxed);
    klog_debug!("syscall: open(\"{}\") -> fd {}", name, fd);
    ret(frame, fd as i64)
}

fn sys_close(frame: &mut SyscallTrapFrame) -> i64 {
    let [fd, ..] = frame.args();
    klog_debug!("syscall: close(fd={})", fd);
    ok(frame)
}

fn sys_seek(frame: &mut SyscallTrapFrame) -> i64 {
    let [fd, offset, ..] = frame.args();
    klog_debug!("syscall: seek(fd={}, offset={})", fd, offset);
    ret(frame, offset as i64)
}

fn sys_getpid(frame: &mut SyscallTrapFrame) -> i64 {
    let id = nanos_sched::current_task_id().unwrap_or(nanos_abi::task::INVALID_TASK_ID);
    ret(frame, id as i64)
}

fn sys_fork(frame: &mut SyscallTrapFrame) -> i64 {
    let parent = match nanos_sched::current_task_id() {
        Some(id) => id,
        None => return err(frame, SyscallError::Generic),
    };
    match nanos_sched::fork_task(parent) {
        Ok(child) => ret(frame, child as i64),
        Err(e) => err(frame, e),
    }
}

fn sys_exec(frame: &mut SyscallTrapFrame) -> i64 {
    // Loading and replacing a task image is out of scope (no ELF loader,
    // no address-space separation); always reports an invalid argument.
    err(frame, SyscallError::InvalidArgument)
}

fn sys_wait(frame: &mut SyscallTrapFrame) -> i64 {
    let parent = match nanos_sched::current_task_id() {
        Some(id) => id,
        None => return err(frame, SyscallError::Generic),
    };
    match nanos_sched::reap_zombie_child(parent) {
        Some(child) => ret(frame, child as i64),
        None => err(frame, SyscallError::TryAgain),
    }
}

fn sys_malloc(frame: &mut SyscallTrapFrame) -> i64 {
    let [size, ..] = frame.args();
    if size == 0 || size > MAX_ALLOCATION_BYTES {
        return err(frame, SyscallError::InvalidArgument);
    }
    let ptr = nanos_mm::kmalloc(size as usize);
    if ptr.is_null() {
        return err(frame, SyscallError::OutOfMemory);
    }
    ret(frame, ptr as i64)
}

fn sys_free(frame: &mut SyscallTrapFrame) -> i64 {
    let [ptr, ..] = frame.args();
    nanos_mm::kfree(ptr as *mut u8);
    ok(frame)
}

fn sys_mmap(frame: &mut SyscallTrapFrame) -> i64 {
    let [length, ..] = frame.args();
    if length == 0 || length > MAX_ALLOCATION_BYTES {
        return err(frame, SyscallError::InvalidArgument);
    }
    // kmalloc already zero-fills, matching mmap's "zeroed pages" guarantee.
    let ptr = nanos_mm::kmalloc(length as usize);
    if ptr.is_null() {
        return err(frame, SyscallError::OutOfMemory);
    }
    ret(frame, ptr as i64)
}

fn sys_munmap(frame: &mut SyscallTrapFrame) -> i64 {
    let [addr, length, ..] = frame.args();
    if addr == 0 || length == 0 {
        return err(frame, SyscallError::InvalidArgument);
    }
    nanos_mm::kfree(addr as *mut u8);
    ok(frame)
}

fn sys_gettime(frame: &mut SyscallTrapFrame) -> i64 {
    ret(frame, nanos_drivers::pit::timer_get_uptime_ms() as i64)
}

fn sys_sleep(frame: &mut SyscallTrapFrame) -> i64 {
    let [millis, ..] = frame.args();
    klog_debug!("syscall: sleep({}ms) requested, no-op", millis);
    ok(frame)
}

fn sys_yield(frame: &mut SyscallTrapFrame) -> i64 {
    nanos_sched::yield_now();
    ok(frame)
}

fn sys_getcwd(frame: &mut SyscallTrapFrame) -> i64 {
    let [buf_ptr, buf_len, ..] = frame.args();
    let out = match unsafe { user_slice_mut(buf_ptr, buf_len) } {
        Some(b) => b,
        None => return err(frame, SyscallError::InvalidArgument),
    };
    let mut scratch = [0u8; nanos_abi::config::FS_PATH_MAX_LEN];
    let len = nanos_fs::cwd(&mut scratch);
    if len + 1 > out.len() {
        return err(frame, SyscallError::InvalidArgument);
    }
    out[..len].copy_from_slice(&scratch[..len]);
    out[len] = 0;
    ret(frame, len as i64)
}

fn sys_chdir(frame: &mut SyscallTrapFrame) -> i64 {
    let [path_ptr, path_len, ..] = frame.args();
    let name = match unsafe { user_slice(path_ptr, path_len) } {
        Some(b) => core::str::from_utf8(b).unwrap_or(""),
        None => return err(frame, SyscallError::InvalidArgument),
    };
    klog_debug!("syscall: chdir(\"{}\")", name);
    ok(frame)
}

fn sys_stat(frame: &mut SyscallTrapFrame) -> i64 {
    let [path_ptr, path_len, stat_ptr, ..] = frame.args();
    let name = match unsafe { user_slice(path_ptr, path_len) } {
        Some(b) => core::str::from_utf8(b).unwrap_or(""),
        None => return err(frame, SyscallError::InvalidArgument),
    };
    if stat_ptr == 0 {
        return err(frame, SyscallError::InvalidArgument);
    }
    let uptime = nanos_drivers::pit::timer_get_uptime_ms();
    match nanos_fs::stat(name, uptime) {
        Some(record) => {
            unsafe { core::ptr::write(stat_ptr as *mut nanos_abi::fs::StatRecord, record) };
            ok(frame)
        }
        None => err(frame, SyscallError::NoSuchEntry),
    }
}

fn sys_ioctl(frame: &mut SyscallTrapFrame) -> i64 {
    let [fd, request, arg_ptr, ..] = frame.args();
    if fd <= FD_STDERR {
        return match request {
            TCGETS | TCSETS => ok(frame),
            TIOCGWINSZ => {
                let out = match unsafe { user_slice_mut(arg_ptr, 8) } {
                    Some(b) => b,
                    None => return ok(frame),
                };
                out[0..2].copy_from_slice(&80u16.to_ne_bytes());
                out[2..4].copy_from_slice(&25u16.to_ne_bytes());
                out[4..6].copy_from_slice(&0u16.to_ne_bytes());
                out[6..8].copy_from_slice(&0u16.to_ne_bytes());
                ok(frame)
            }
            _ => err(frame, SyscallError::InvalidArgument),
        };
    }
    klog_debug!("syscall: ioctl(fd={}, request={:#x})", fd, request);
    ok(frame)
}

/// The built-in catalogue registered by [`crate::table::syscall_init`].
pub(crate) static BUILTIN_SYSCALLS: &[(u32, SyscallHandler, &str, SyscallFlags)] = &[
    (syscall::SYSCALL_EXIT, sys_exit, "exit", SyscallFlags::empty()),
    (syscall::SYSCALL_READ, sys_read, "read", SyscallFlags::BLOCKING),
    (syscall::SYSCALL_WRITE, sys_write, "write", SyscallFlags::empty()),
    (syscall::SYSCALL_OPEN, sys_open, "open", SyscallFlags::empty()),
    (syscall::SYSCALL_CLOSE, sys_close, "close", SyscallFlags::empty()),
    (syscall::SYSCALL_SEEK, sys_seek, "seek", SyscallFlags::empty()),
    (syscall::SYSCALL_GETPID, sys_getpid, "getpid", SyscallFlags::empty()),
    (
        syscall::SYSCALL_FORK,
        sys_fork,
        "fork",
        SyscallFlags::PRIVILEGED.union(SyscallFlags::SIGNAL_PRODUCING),
    ),
    (syscall::SYSCALL_EXEC, sys_exec, "exec", SyscallFlags::PRIVILEGED),
    (syscall::SYSCALL_WAIT, sys_wait, "wait", SyscallFlags::BLOCKING),
    (syscall::SYSCALL_MALLOC, sys_malloc, "malloc", SyscallFlags::empty()),
    (syscall::SYSCALL_FREE, sys_free, "free", SyscallFlags::empty()),
    (syscall::SYSCALL_MMAP, sys_mmap, "mmap", SyscallFlags::PRIVILEGED),
    (syscall::SYSCALL_MUNMAP, sys_munmap, "munmap", SyscallFlags::PRIVILEGED),
    (syscall::SYSCALL_GETTIME, sys_gettime, "gettime", SyscallFlags::empty()),
    (syscall::SYSCALL_SLEEP, sys_sleep, "sleep", SyscallFlags::BLOCKING),
    (syscall::SYSCALL_YIELD, sys_yield, "yield", SyscallFlags::empty()),
    (syscall::SYSCALL_GETCWD, sys_getcwd, "getcwd", SyscallFlags::empty()),
    (syscall::SYSCALL_CHDIR, sys_chdir, "chdir", SyscallFlags::empty()),
    (syscall::SYSCALL_STAT, sys_stat, "stat", SyscallFlags::empty()),
    (syscall::SYSCALL_IOCTL, sys_ioctl, "ioctl", SyscallFlags::PRIVILEGED),
];

const _: () = assert!(BUILTIN_SYSCALLS.len() == 0x15);
