//! Compile-time configuration constants.
//!
//! The kernel has no persisted state and no runtime config file; every
//! tunable in spec's "Configuration constants" table is a `pub const` here
//! so the rest of the tree references one source of truth.

/// Default PIT frequency, in Hz. Valid range is [18, 1_193_182].
pub const TIMER_DEFAULT_FREQUENCY_HZ: u32 = 100;
pub const TIMER_MIN_FREQUENCY_HZ: u32 = 18;
pub const TIMER_MAX_FREQUENCY_HZ: u32 = 1_193_182;
pub const PIT_BASE_FREQUENCY_HZ: u32 = 1_193_182;

/// Default per-task time-slice quantum, in ticks.
pub const DEFAULT_TIME_SLICE_TICKS: u32 = 100;

/// Number of scheduling priority levels.
pub const PRIORITY_LEVELS: usize = 5;

/// Ticks between forced round-robin passes, regardless of remaining quantum.
pub const FORCED_RESCHEDULE_INTERVAL_TICKS: u32 = 10;

/// Static task pool size.
pub const MAX_TASKS: usize = 32;

/// Per-task kernel stack size, in bytes.
pub const TASK_STACK_SIZE: usize = 16 * 1024;

/// Maximum task name length, including the NUL terminator.
pub const TASK_NAME_MAX_LEN: usize = 32;

/// Filesystem entry table capacity.
pub const FS_MAX_ENTRIES: usize = 100;
pub const FS_NAME_MAX_LEN: usize = 14;
pub const FS_CONTENT_MAX_LEN: usize = 999;
pub const FS_PATH_MAX_LEN: usize = 99;
pub const FS_PATH_SEPARATOR: u8 = b'|';
pub const FS_ROOT: &str = "root";

/// Syscall registration table capacity.
pub const SYSCALL_TABLE_SIZE: usize = 32;

/// Kernel heap arena size, in bytes. No paging: this is a flat static
/// region carved up by a first-fit allocator (spec §4.3 malloc/mmap).
pub const KERNEL_HEAP_SIZE: usize = 4 * 1024 * 1024;

/// Largest single allocation the `malloc`/`mmap` syscalls accept.
pub const MAX_ALLOCATION_BYTES: u64 = 1024 * 1024 * 1024;
