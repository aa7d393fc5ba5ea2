//! Task-related types and constants shared between `nanos-sched`, `nanos-core`
//! and `nanos-boot`.
//!
//! Kept here so the scheduler, the syscall dispatcher and the initial-context
//! fabrication code (boot) agree on a single layout without a circular crate
//! dependency.

use crate::config::TASK_STACK_SIZE;

pub const INVALID_TASK_ID: u32 = 0xFFFF_FFFF;

/// Task lifecycle state. Spec §3: {running, ready, blocked, sleeping, zombie}.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskState {
    #[default]
    Ready = 0,
    Running = 1,
    Blocked = 2,
    Sleeping = 3,
    Zombie = 4,
}

/// Scheduling priority. Five levels, idle lowest, realtime highest.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum TaskPriority {
    Idle = 0,
    Low = 1,
    #[default]
    Normal = 2,
    High = 3,
    Realtime = 4,
}

impl TaskPriority {
    pub const COUNT: usize = 5;

    pub const ALL: [TaskPriority; Self::COUNT] = [
        TaskPriority::Idle,
        TaskPriority::Low,
        TaskPriority::Normal,
        TaskPriority::High,
        TaskPriority::Realtime,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Saved processor state of a suspended task (spec §3 "CPU context").
///
/// Field order matches the bottom-to-top layout `context_save`/
/// `context_restore` (in `nanos-sched`) push and pop in inline assembly, so
/// this struct's layout must not be reordered without updating those asm
/// blocks in lockstep.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct CpuContext {
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub r11: u64,
    pub r10: u64,
    pub r9: u64,
    pub r8: u64,
    pub rbp: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rbx: u64,
    pub rax: u64,
    pub rip: u64,
    pub rsp: u64,
    pub rflags: u64,
    pub cs: u64,
    pub ss: u64,
    pub ds: u64,
    pub es: u64,
    pub fs: u64,
    pub gs: u64,
    /// FXSAVE-format extended state (x87/MMX/SSE), 512 bytes, 16-byte aligned.
    pub ext_state: ExtendedState,
    pub fpu_control_word: u16,
}

impl CpuContext {
    pub const fn zero() -> Self {
        Self {
            r15: 0,
            r14: 0,
            r13: 0,
            r12: 0,
            r11: 0,
            r10: 0,
            r9: 0,
            r8: 0,
            rbp: 0,
            rdi: 0,
            rsi: 0,
            rdx: 0,
            rcx: 0,
            rbx: 0,
            rax: 0,
            rip: 0,
            rsp: 0,
            rflags: 0,
            cs: 0,
            ss: 0,
            ds: 0,
            es: 0,
            fs: 0,
            gs: 0,
            ext_state: ExtendedState::zero(),
            fpu_control_word: 0x037F,
        }
    }
}

impl Default for CpuContext {
    fn default() -> Self {
        Self::zero()
    }
}

pub const EXTENDED_STATE_SIZE: usize = 512;

/// Reserved block for floating-point/SIMD state, FXSAVE-compatible.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub struct ExtendedState {
    pub data: [u8; EXTENDED_STATE_SIZE],
}

impl ExtendedState {
    pub const fn zero() -> Self {
        Self {
            data: [0u8; EXTENDED_STATE_SIZE],
        }
    }
}

/// Entry function signature for a task: takes the opaque data pointer it was
/// created with.
pub type TaskEntry = extern "C" fn(*mut core::ffi::c_void) -> !;

/// Sentinel index meaning "no task" in the index-based ready-queue links
/// (spec §9's index-based pool redesign note).
pub const QUEUE_SENTINEL: u8 = u8::MAX;

const _: () = assert!(TASK_STACK_SIZE % 16 == 0);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_ordering_is_idle_lowest_realtime_highest() {
        assert!(TaskPriority::Idle < TaskPriority::Low);
        assert!(TaskPriority::Low < TaskPriority::Normal);
        assert!(TaskPriority::Normal < TaskPriority::High);
        assert!(TaskPriority::High < TaskPriority::Realtime);
    }

    #[test]
    fn priority_all_is_ordered_by_index() {
        for (i, p) in TaskPriority::ALL.iter().enumerate() {
            assert_eq!(p.index(), i);
        }
    }

    #[test]
    fn cpu_context_zero_has_sane_fpu_control_word() {
        let ctx = CpuContext::zero();
        assert_eq!(ctx.fpu_control_word, 0x037F);
        assert_eq!(ctx.rax, 0);
    }
}
