//! Syscall number catalogue and trap-frame layout shared between
//! `nanos-core` (the dispatcher) and `nanos-boot` (the trap trampoline that
//! constructs the frame).

use crate::config::SYSCALL_TABLE_SIZE;

pub const SYSCALL_EXIT: u32 = 0x01;
pub const SYSCALL_READ: u32 = 0x02;
pub const SYSCALL_WRITE: u32 = 0x03;
pub const SYSCALL_OPEN: u32 = 0x04;
pub const SYSCALL_CLOSE: u32 = 0x05;
pub const SYSCALL_SEEK: u32 = 0x06;
pub const SYSCALL_GETPID: u32 = 0x07;
pub const SYSCALL_FORK: u32 = 0x08;
pub const SYSCALL_EXEC: u32 = 0x09;
pub const SYSCALL_WAIT: u32 = 0x0A;
pub const SYSCALL_MALLOC: u32 = 0x0B;
pub const SYSCALL_FREE: u32 = 0x0C;
pub const SYSCALL_MMAP: u32 = 0x0D;
pub const SYSCALL_MUNMAP: u32 = 0x0E;
pub const SYSCALL_GETTIME: u32 = 0x0F;
pub const SYSCALL_SLEEP: u32 = 0x10;
pub const SYSCALL_YIELD: u32 = 0x11;
pub const SYSCALL_GETCWD: u32 = 0x12;
pub const SYSCALL_CHDIR: u32 = 0x13;
pub const SYSCALL_STAT: u32 = 0x14;
pub const SYSCALL_IOCTL: u32 = 0x15;

pub const SYSCALL_VECTOR: u8 = 0x80;
pub const TIMER_VECTOR: u8 = 0x20;
pub const KEYBOARD_VECTOR: u8 = 0x21;

bitflags::bitflags! {
    /// Flag bits recognised on a syscall table entry (spec §3 "Syscall entry").
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SyscallFlags: u8 {
        const PRIVILEGED       = 0b001;
        const BLOCKING         = 0b010;
        const SIGNAL_PRODUCING = 0b100;
    }
}

/// The structure the ISR constructs on entry to syscall vector 0x80
/// (spec §3 "Syscall trap frame").
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct SyscallTrapFrame {
    pub return_value: i64,
    pub arg0: u64,
    pub arg1: u64,
    pub arg2: u64,
    pub arg3: u64,
    pub arg4: u64,
    pub arg5: u64,
    pub user_rsp: u64,
    pub rip: u64,
    pub rflags: u64,
    pub cs: u64,
    pub ss: u64,
}

impl SyscallTrapFrame {
    pub const fn args(&self) -> [u64; 6] {
        [self.arg0, self.arg1, self.arg2, self.arg3, self.arg4, self.arg5]
    }

    pub fn set_return(&mut self, value: i64) {
        self.return_value = value;
    }
}

/// A record of {number, handler, name, flags} in the registration table
/// (spec §3 "Syscall entry"). Table size fixed at `SYSCALL_TABLE_SIZE`.
#[derive(Clone, Copy)]
pub struct SyscallEntry {
    pub number: u32,
    pub handler: SyscallHandler,
    pub name: &'static str,
    pub flags: SyscallFlags,
}

pub type SyscallHandler = fn(&mut SyscallTrapFrame) -> i64;

const _: () = assert!(SYSCALL_TABLE_SIZE >= 0x15);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trap_frame_args_are_in_register_order() {
        let frame = SyscallTrapFrame {
            arg0: 1,
            arg1: 2,
            arg2: 3,
            arg3: 4,
            arg4: 5,
            arg5: 6,
            ..Default::default()
        };
        assert_eq!(frame.args(), [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn flags_combine_with_bitwise_or() {
        let f = SyscallFlags::PRIVILEGED | SyscallFlags::BLOCKING;
        assert!(f.contains(SyscallFlags::PRIVILEGED));
        assert!(f.contains(SyscallFlags::BLOCKING));
        assert!(!f.contains(SyscallFlags::SIGNAL_PRODUCING));
    }

    #[test]
    fn syscall_numbers_match_catalogue() {
        assert_eq!(SYSCALL_EXIT, 0x01);
        assert_eq!(SYSCALL_IOCTL, 0x15);
    }
}
