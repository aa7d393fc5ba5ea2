//! Syscall registration table (spec §4.3 "Syscall dispatcher").

use nanos_abi::config::SYSCALL_TABLE_SIZE;
use nanos_abi::error::SyscallError;
use nanos_abi::syscall::{SyscallEntry, SyscallFlags, SyscallHandler};
use nanos_lib::spinlock::IrqMutex;
use nanos_lib::{klog_debug, klog_warn};

pub(crate) struct SyscallTable {
    entries: [Option<SyscallEntry>; SYSCALL_TABLE_SIZE],
    count: usize,
}

impl SyscallTable {
    const fn new() -> Self {
        Self {
            entries: [None; SYSCALL_TABLE_SIZE],
            count: 0,
        }
    }

    fn clear(&mut self) {
        self.entries = [None; SYSCALL_TABLE_SIZE];
        self.count = 0;
    }

    fn register(
        &mut self,
        number: u32,
        handler: SyscallHandler,
        name: &'static str,
        flags: SyscallFlags,
    ) -> Result<(), SyscallError> {
        if self.count >= SYSCALL_TABLE_SIZE {
            return Err(SyscallError::Generic);
        }
        self.entries[self.count] = Some(SyscallEntry { number, handler, name, flags });
        self.count += 1;
        Ok(())
    }

    fn find(&self, number: u32) -> Option<&SyscallEntry> {
        self.entries[..self.count].iter().flatten().find(|e| e.number == number)
    }
}

static TABLE: IrqMutex<SyscallTable> = IrqMutex::new(SyscallTable::new());

/// Clears the table and registers every built-in handler (spec §4.3's
/// catalogue, 0x01 through 0x15).
pub fn syscall_init() {
    let mut table = TABLE.lock();
    table.clear();
    for (number, handler, name, flags) in crate::handlers::BUILTIN_SYSCALLS {
        let _ = table.register(*number, *handler, name, *flags);
    }
}

/// Registers a single handler, e.g. for a caller extending the catalogue.
pub fn syscall_register(
    number: u32,
    handler: SyscallHandler,
    name: &'static str,
    flags: SyscallFlags,
) -> Result<(), SyscallError> {
    TABLE.lock().register(number, handler, name, flags)
}

/// The single dispatcher registered with `nanos_boot::idt::set_syscall_handler`.
///
/// The trap trampoline hands every `int 0x80` to one fixed function, so the
/// syscall number travels as the first argument register (`arg0`) rather
/// than in a separate field; this shifts it out and looks up the real
/// handler, which then sees its own arguments starting at `arg0` as if it
/// had been called directly. An unknown number yields
/// `SyscallError::InvalidArgument`.
pub fn syscall_dispatch(frame: &mut nanos_abi::syscall::SyscallTrapFrame) -> i64 {
    let number = frame.arg0 as u32;
    frame.arg0 = frame.arg1;
    frame.arg1 = frame.arg2;
    frame.arg2 = frame.arg3;
    frame.arg3 = frame.arg4;
    frame.arg4 = frame.arg5;
    frame.arg5 = 0;

    let handler = { TABLE.lock().find(number).map(|e| e.handler) };
    match handler {
        Some(handler) => handler(frame),
        None => {
            klog_warn!("syscall: unknown number {:#x}", number);
            let code = SyscallError::InvalidArgument.as_c_int() as i64;
            frame.set_return(code);
            code
        }
    }
}

pub fn syscall_is_valid(number: u32) -> bool {
    TABLE.lock().find(number).is_some()
}

pub fn syscall_get_name(number: u32) -> Option<&'static str> {
    TABLE.lock().find(number).map(|e| e.name)
}

pub fn syscall_print_table() {
    let table = TABLE.lock();
    for entry in table.entries[..table.count].iter().flatten() {
        klog_debug!(
            "syscall[{:#04x}] = {} (flags={:?})",
            entry.number,
            entry.name,
            entry.flags
        );
    }
}
