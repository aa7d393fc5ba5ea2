//! Kernel panic: the terminal state for a fatal error (spec §7's
//! "Fatal errors" category). There is no recovery and no unwinding; a task
//! that fails semantically must call `task_exit` instead of reaching here.

use core::arch::asm;
use core::sync::atomic::{AtomicBool, Ordering};

use nanos_lib::klog_error;

static PANIC_IN_PROGRESS: AtomicBool = AtomicBool::new(false);

fn read_control_registers() -> (u64, u64) {
    let (cr0, cr3): (u64, u64);
    unsafe {
        asm!("mov {}, cr0", out(reg) cr0, options(nomem, nostack, preserves_flags));
        asm!("mov {}, cr3", out(reg) cr3, options(nomem, nostack, preserves_flags));
    }
    (cr0, cr3)
}

fn halt_forever() -> ! {
    loop {
        x86_64::instructions::interrupts::disable();
        x86_64::instructions::hlt();
    }
}

fn enter_panic() -> bool {
    !PANIC_IN_PROGRESS.swap(true, Ordering::SeqCst)
}

/// Log a fault taken on `vector` and halt. Called from the exception
/// trampolines installed by [`crate::idt::init`].
pub fn kernel_panic_at(message: &str, vector: u8) -> ! {
    if !enter_panic() {
        halt_forever();
    }
    let (cr0, cr3) = read_control_registers();
    klog_error!("=== KERNEL PANIC ===");
    klog_error!("{} (vector {})", message, vector);
    klog_error!("cr0=0x{:x} cr3=0x{:x}", cr0, cr3);
    klog_error!("system halted");
    halt_forever();
}

/// As [`kernel_panic_at`], additionally reporting the faulting address
/// (used for page faults, where `cr2` holds the address).
pub fn kernel_panic_at_address(message: &str, vector: u8, fault_address: u64) -> ! {
    if !enter_panic() {
        halt_forever();
    }
    klog_error!("=== KERNEL PANIC ===");
    klog_error!("{} (vector {})", message, vector);
    klog_error!("fault address=0x{:x}", fault_address);
    klog_error!("system halted");
    halt_forever();
}

/// Panic with a plain message and no vector context. Used by subsystems
/// outside the trap path (e.g. an allocator that runs out of static
/// backing memory).
pub fn kernel_panic(message: &str) -> ! {
    if !enter_panic() {
        halt_forever();
    }
    klog_error!("=== KERNEL PANIC ===");
    klog_error!("{}", message);
    klog_error!("system halted");
    halt_forever();
}

/// Panic if `condition` is false, otherwise a no-op.
pub fn kernel_assert(condition: bool, message: &str) {
    if !condition {
        kernel_panic(message);
    }
}
