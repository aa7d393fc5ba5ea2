//! IDT construction and the hand-authored ISR/IRQ trampolines.
//!
//! Only three gates are required by contract: 0x20 (timer), 0x21 (keyboard),
//! 0x80 (syscall, DPL 3). A handful of CPU exception vectors are also wired
//! to a common fatal-fault path so a crash is diagnosable over serial
//! instead of triple-faulting silently.

#![allow(static_mut_refs)]

use core::arch::{asm, global_asm};

use nanos_abi::syscall::{SyscallHandler, SyscallTrapFrame, KEYBOARD_VECTOR, SYSCALL_VECTOR, TIMER_VECTOR};
use nanos_drivers::{keyboard, pit};
use nanos_lib::klog_debug;

use crate::gdt::GDT_CODE_SELECTOR;
use crate::panic::kernel_panic_at;

pub const IDT_GATE_INTERRUPT: u8 = 0x8E;
pub const IDT_GATE_TRAP: u8 = 0x8F;
const IDT_GATE_TRAP_USER: u8 = 0xEE;

pub const EXCEPTION_DIVIDE_ERROR: u8 = 0;
pub const EXCEPTION_INVALID_OPCODE: u8 = 6;
pub const EXCEPTION_DOUBLE_FAULT: u8 = 8;
pub const EXCEPTION_GENERAL_PROTECTION: u8 = 13;
pub const EXCEPTION_PAGE_FAULT: u8 = 14;

pub const IDT_ENTRIES: usize = 256;

#[repr(C, packed)]
#[derive(Copy, Clone)]
struct IdtEntry {
    offset_low: u16,
    selector: u16,
    ist: u8,
    type_attr: u8,
    offset_mid: u16,
    offset_high: u32,
    zero: u32,
}

const NULL_ENTRY: IdtEntry = IdtEntry {
    offset_low: 0,
    selector: 0,
    ist: 0,
    type_attr: 0,
    offset_mid: 0,
    offset_high: 0,
    zero: 0,
};

#[repr(C, packed)]
struct IdtPointer {
    limit: u16,
    base: u64,
}

static mut IDT: [IdtEntry; IDT_ENTRIES] = [NULL_ENTRY; IDT_ENTRIES];
static mut IDT_POINTER: IdtPointer = IdtPointer { limit: 0, base: 0 };

static mut SYSCALL_HANDLER: Option<SyscallHandler> = None;

/// Install the dispatcher `nanos-core` registers at startup. Kept as a
/// runtime hook rather than a direct dependency so `nanos-boot` does not
/// need to depend on the syscall/scheduler crates above it.
pub fn set_syscall_handler(handler: SyscallHandler) {
    unsafe { SYSCALL_HANDLER = Some(handler) };
}

fn set_gate(vector: u8, handler: unsafe extern "C" fn(), type_attr: u8) {
    let addr = handler as usize as u64;
    unsafe {
        IDT[vector as usize] = IdtEntry {
            offset_low: (addr & 0xFFFF) as u16,
            selector: GDT_CODE_SELECTOR,
            ist: 0,
            type_attr,
            offset_mid: ((addr >> 16) & 0xFFFF) as u16,
            offset_high: (addr >> 32) as u32,
            zero: 0,
        };
    }
}

/// Populate the IDT and load it. Gates 0x20/0x21/0x80 are always installed;
/// a small set of CPU exceptions route to the fatal-fault trampoline.
pub fn init() {
    klog_debug!("IDT: building gate table");

    set_gate(EXCEPTION_DIVIDE_ERROR, isr_divide_error, IDT_GATE_INTERRUPT);
    set_gate(EXCEPTION_INVALID_OPCODE, isr_invalid_opcode, IDT_GATE_INTERRUPT);
    set_gate(EXCEPTION_DOUBLE_FAULT, isr_double_fault, IDT_GATE_INTERRUPT);
    set_gate(EXCEPTION_GENERAL_PROTECTION, isr_general_protection, IDT_GATE_INTERRUPT);
    set_gate(EXCEPTION_PAGE_FAULT, isr_page_fault, IDT_GATE_INTERRUPT);

    set_gate(TIMER_VECTOR, irq_timer, IDT_GATE_INTERRUPT);
    set_gate(KEYBOARD_VECTOR, irq_keyboard, IDT_GATE_INTERRUPT);
    set_gate(SYSCALL_VECTOR, isr_syscall, IDT_GATE_TRAP_USER);

    unsafe {
        IDT_POINTER.limit = (core::mem::size_of::<IdtEntry>() * IDT_ENTRIES - 1) as u16;
        IDT_POINTER.base = &raw const IDT as u64;
        asm!("lidt [{0}]", in(reg) &raw const IDT_POINTER, options(nostack, preserves_flags));
    }

    klog_debug!("IDT: loaded, {} gates populated", 8);
}

#[unsafe(no_mangle)]
extern "C" fn fault_divide_error() {
    kernel_panic_at("Divide-by-zero exception", EXCEPTION_DIVIDE_ERROR);
}

#[unsafe(no_mangle)]
extern "C" fn fault_invalid_opcode() {
    kernel_panic_at("Invalid opcode exception", EXCEPTION_INVALID_OPCODE);
}

#[unsafe(no_mangle)]
extern "C" fn fault_double_fault() {
    kernel_panic_at("Double fault", EXCEPTION_DOUBLE_FAULT);
}

#[unsafe(no_mangle)]
extern "C" fn fault_general_protection() {
    kernel_panic_at("General protection fault", EXCEPTION_GENERAL_PROTECTION);
}

#[unsafe(no_mangle)]
extern "C" fn fault_page_fault() {
    let cr2: u64;
    unsafe { asm!("mov {}, cr2", out(reg) cr2, options(nomem, nostack, preserves_flags)) };
    crate::panic::kernel_panic_at_address("Page fault", EXCEPTION_PAGE_FAULT, cr2);
}

#[unsafe(no_mangle)]
extern "C" fn timer_tick() {
    pit::on_timer_interrupt(TIMER_VECTOR);
}

#[unsafe(no_mangle)]
extern "C" fn keyboard_tick() {
    keyboard::on_keyboard_interrupt(KEYBOARD_VECTOR);
}

/// Marshal registers into a [`SyscallTrapFrame`], invoke the registered
/// dispatcher, and return the result in `rax`. Arguments arrive in the
/// ordinary SysV integer registers (rdi, rsi, rdx, rcx, r8, r9) since
/// `int 0x80` does not clobber rcx the way the `syscall` instruction does.
#[unsafe(no_mangle)]
extern "C" fn syscall_dispatch(
    arg0: u64,
    arg1: u64,
    arg2: u64,
    arg3: u64,
    arg4: u64,
    arg5: u64,
) -> i64 {
    let mut frame = SyscallTrapFrame {
        return_value: 0,
        arg0,
        arg1,
        arg2,
        arg3,
        arg4,
        arg5,
        user_rsp: current_rsp(),
        rip: 0,
        rflags: current_rflags(),
        cs: GDT_CODE_SELECTOR as u64,
        ss: current_ss(),
    };

    match unsafe { SYSCALL_HANDLER } {
        Some(handler) => handler(&mut frame),
        None => {
            klog_debug!("IDT: syscall received with no dispatcher registered");
            -1
        }
    }
}

fn current_rsp() -> u64 {
    let rsp: u64;
    unsafe { asm!("mov {}, rsp", out(reg) rsp, options(nomem, nostack, preserves_flags)) };
    rsp
}

fn current_rflags() -> u64 {
    let rflags: u64;
    unsafe { asm!("pushfq", "pop {}", out(reg) rflags, options(nomem, preserves_flags)) };
    rflags
}

fn current_ss() -> u64 {
    let ss: u16;
    unsafe { asm!("mov {0:x}, ss", out(reg) ss, options(nomem, nostack, preserves_flags)) };
    ss as u64
}

unsafe extern "C" {
    fn isr_divide_error();
    fn isr_invalid_opcode();
    fn isr_double_fault();
    fn isr_general_protection();
    fn isr_page_fault();
    fn irq_timer();
    fn irq_keyboard();
    fn isr_syscall();
}

// Trampolines: save caller-saved registers, call the Rust top half, issue
// EOI is the driver's job (pic::end_of_interrupt inside on_*_interrupt),
// restore, `iretq`. The syscall trampoline additionally marshals the five
// argument registers and writes the i64 result back into rax.
global_asm!(
    r#"
.macro trap_noerr name, handler
.global \name
\name:
    push rax
    push rbx
    push rcx
    push rdx
    push rsi
    push rdi
    push rbp
    push r8
    push r9
    push r10
    push r11
    push r12
    push r13
    push r14
    push r15
    call \handler
    pop r15
    pop r14
    pop r13
    pop r12
    pop r11
    pop r10
    pop r9
    pop r8
    pop rbp
    pop rdi
    pop rsi
    pop rdx
    pop rcx
    pop rbx
    pop rax
    iretq
.endm

trap_noerr isr_divide_error, fault_divide_error
trap_noerr isr_invalid_opcode, fault_invalid_opcode
trap_noerr isr_general_protection, fault_general_protection
trap_noerr isr_page_fault, fault_page_fault
trap_noerr irq_timer, timer_tick
trap_noerr irq_keyboard, keyboard_tick

.global isr_double_fault
isr_double_fault:
    call fault_double_fault
    iretq

.global isr_syscall
isr_syscall:
    call syscall_dispatch
    iretq
"#
);
