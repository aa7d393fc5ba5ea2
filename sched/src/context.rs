//! The context switch primitive and initial-context fabrication.
//!
//! `context_save`/`context_restore` are hand-authored naked functions: there
//! is no `.s` file to adapt here, so they are written directly against
//! [`CpuContext`]'s field layout using `core::mem::offset_of!`. Both treat a
//! switch the same way the CPU treats an interrupt: `context_save` captures
//! "resume right after this call" as an `iretq`-shaped frame, and
//! `context_restore` never returns — it pops straight into that frame.
//! A freshly created task's context is fabricated to look exactly like a
//! context a running task had saved, so the first dispatch into it is
//! indistinguishable from resuming one that yielded before.

use core::arch::naked_asm;
use core::mem::offset_of;

use nanos_abi::task::CpuContext;

use crate::gdt_selectors::{KERNEL_CODE_SELECTOR, KERNEL_DATA_SELECTOR};

const DEFAULT_RFLAGS: u64 = 0x202;

/// Spill the full register file, segment selectors, flags and the
/// extended-state buffer of the caller into `*ctx`. Returns normally: the
/// caller resumes immediately afterward, same as any other function call.
/// `ctx.rip`/`ctx.rsp` are set so that a later `context_restore(ctx)` lands
/// back at that resume point with the stack exactly as it is right now.
#[unsafe(naked)]
pub unsafe extern "C" fn context_save(ctx: *mut CpuContext) {
    naked_asm!(
        "mov [rdi + {off_rax}], rax",
        "mov [rdi + {off_rbx}], rbx",
        "mov [rdi + {off_rcx}], rcx",
        "mov [rdi + {off_rdx}], rdx",
        "mov [rdi + {off_rsi}], rsi",
        "mov [rdi + {off_rdi}], rdi",
        "mov [rdi + {off_rbp}], rbp",
        "mov [rdi + {off_r8}], r8",
        "mov [rdi + {off_r9}], r9",
        "mov [rdi + {off_r10}], r10",
        "mov [rdi + {off_r11}], r11",
        "mov [rdi + {off_r12}], r12",
        "mov [rdi + {off_r13}], r13",
        "mov [rdi + {off_r14}], r14",
        "mov [rdi + {off_r15}], r15",
        "mov rax, [rsp]",
        "mov [rdi + {off_rip}], rax",
        "lea rax, [rsp + 8]",
        "mov [rdi + {off_rsp}], rax",
        "pushfq",
        "pop rax",
        "mov [rdi + {off_rflags}], rax",
        "mov ax, cs",
        "movzx rax, ax",
        "mov [rdi + {off_cs}], rax",
        "mov ax, ss",
        "movzx rax, ax",
        "mov [rdi + {off_ss}], rax",
        "mov ax, ds",
        "movzx rax, ax",
        "mov [rdi + {off_ds}], rax",
        "mov ax, es",
        "movzx rax, ax",
        "mov [rdi + {off_es}], rax",
        "mov ax, fs",
        "movzx rax, ax",
        "mov [rdi + {off_fs}], rax",
        "mov ax, gs",
        "movzx rax, ax",
        "mov [rdi + {off_gs}], rax",
        "lea rax, [rdi + {off_ext_state}]",
        "fxsave64 [rax]",
        "fnstcw [rdi + {off_fpu_cw}]",
        "ret",
        off_rax = const offset_of!(CpuContext, rax),
        off_rbx = const offset_of!(CpuContext, rbx),
        off_rcx = const offset_of!(CpuContext, rcx),
        off_rdx = const offset_of!(CpuContext, rdx),
        off_rsi = const offset_of!(CpuContext, rsi),
        off_rdi = const offset_of!(CpuContext, rdi),
        off_rbp = const offset_of!(CpuContext, rbp),
        off_r8 = const offset_of!(CpuContext, r8),
        off_r9 = const offset_of!(CpuContext, r9),
        off_r10 = const offset_of!(CpuContext, r10),
        off_r11 = const offset_of!(CpuContext, r11),
        off_r12 = const offset_of!(CpuContext, r12),
        off_r13 = const offset_of!(CpuContext, r13),
        off_r14 = const offset_of!(CpuContext, r14),
        off_r15 = const offset_of!(CpuContext, r15),
        off_rip = const offset_of!(CpuContext, rip),
        off_rsp = const offset_of!(CpuContext, rsp),
        off_rflags = const offset_of!(CpuContext, rflags),
        off_cs = const offset_of!(CpuContext, cs),
        off_ss = const offset_of!(CpuContext, ss),
        off_ds = const offset_of!(CpuContext, ds),
        off_es = const offset_of!(CpuContext, es),
        off_fs = const offset_of!(CpuContext, fs),
        off_gs = const offset_of!(CpuContext, gs),
        off_ext_state = const offset_of!(CpuContext, ext_state),
        off_fpu_cw = const offset_of!(CpuContext, fpu_control_word),
    );
}

/// Load `*ctx` and execute `iretq` into it. Never returns to the caller.
#[unsafe(naked)]
pub unsafe extern "C" fn context_restore(ctx: *const CpuContext) -> ! {
    naked_asm!(
        "fxrstor64 [rdi + {off_ext_state}]",
        "fldcw [rdi + {off_fpu_cw}]",
        "mov ax, [rdi + {off_ds}]",
        "mov ds, ax",
        "mov ax, [rdi + {off_es}]",
        "mov es, ax",
        "mov ax, [rdi + {off_fs}]",
        "mov fs, ax",
        "mov ax, [rdi + {off_gs}]",
        "mov gs, ax",
        "mov rax, [rdi + {off_ss}]",
        "push rax",
        "mov rax, [rdi + {off_rsp}]",
        "push rax",
        "mov rax, [rdi + {off_rflags}]",
        "push rax",
        "mov rax, [rdi + {off_cs}]",
        "push rax",
        "mov rax, [rdi + {off_rip}]",
        "push rax",
        "mov r15, [rdi + {off_r15}]",
        "mov r14, [rdi + {off_r14}]",
        "mov r13, [rdi + {off_r13}]",
        "mov r12, [rdi + {off_r12}]",
        "mov r11, [rdi + {off_r11}]",
        "mov r10, [rdi + {off_r10}]",
        "mov r9, [rdi + {off_r9}]",
        "mov r8, [rdi + {off_r8}]",
        "mov rbp, [rdi + {off_rbp}]",
        "mov rsi, [rdi + {off_rsi}]",
        "mov rdx, [rdi + {off_rdx}]",
        "mov rcx, [rdi + {off_rcx}]",
        "mov rbx, [rdi + {off_rbx}]",
        "mov rax, [rdi + {off_rax}]",
        "mov rdi, [rdi + {off_rdi}]",
        "iretq",
        off_rax = const offset_of!(CpuContext, rax),
        off_rbx = const offset_of!(CpuContext, rbx),
        off_rcx = const offset_of!(CpuContext, rcx),
        off_rdx = const offset_of!(CpuContext, rdx),
        off_rsi = const offset_of!(CpuContext, rsi),
        off_rdi = const offset_of!(CpuContext, rdi),
        off_rbp = const offset_of!(CpuContext, rbp),
        off_r8 = const offset_of!(CpuContext, r8),
        off_r9 = const offset_of!(CpuContext, r9),
        off_r10 = const offset_of!(CpuContext, r10),
        off_r11 = const offset_of!(CpuContext, r11),
        off_r12 = const offset_of!(CpuContext, r12),
        off_r13 = const offset_of!(CpuContext, r13),
        off_r14 = const offset_of!(CpuContext, r14),
        off_r15 = const offset_of!(CpuContext, r15),
        off_rip = const offset_of!(CpuContext, rip),
        off_rsp = const offset_of!(CpuContext, rsp),
        off_rflags = const offset_of!(CpuContext, rflags),
        off_cs = const offset_of!(CpuContext, cs),
        off_ss = const offset_of!(CpuContext, ss),
        off_ds = const offset_of!(CpuContext, ds),
        off_es = const offset_of!(CpuContext, es),
        off_fs = const offset_of!(CpuContext, fs),
        off_gs = const offset_of!(CpuContext, gs),
        off_ext_state = const offset_of!(CpuContext, ext_state),
        off_fpu_cw = const offset_of!(CpuContext, fpu_control_word),
    );
}

/// Build the context a freshly created task would have if it had just
/// yielded at its own entry point: a 40-byte `iretq` frame
/// (`entry`, CS, RFLAGS, stack pointer, SS) at the top of its stack, and a
/// saved register set that is all zero except `rdi` (the entry's data
/// pointer argument) and the flags/selectors/FPU control word needed to
/// resume into it.
pub fn fabricate_initial_context(stack_base: u64, stack_size: u64, entry: nanos_abi::task::TaskEntry, arg: *mut core::ffi::c_void) -> CpuContext {
    let stack_top = (stack_base + stack_size) & !0xF;
    let frame_base = stack_top - 40;

    // SAFETY: frame_base lies within the task's own freshly zeroed stack
    // region, which is live for the lifetime of the task.
    unsafe {
        let frame = frame_base as *mut u64;
        core::ptr::write(frame, entry as usize as u64);
        core::ptr::write(frame.add(1), KERNEL_CODE_SELECTOR as u64);
        core::ptr::write(frame.add(2), DEFAULT_RFLAGS);
        core::ptr::write(frame.add(3), frame_base);
        core::ptr::write(frame.add(4), KERNEL_DATA_SELECTOR as u64);
    }

    let mut ctx = CpuContext::zero();
    ctx.rdi = arg as u64;
    ctx.rip = entry as usize as u64;
    ctx.rsp = frame_base;
    ctx.rflags = DEFAULT_RFLAGS;
    ctx.cs = KERNEL_CODE_SELECTOR as u64;
    ctx.ss = KERNEL_DATA_SELECTOR as u64;
    ctx.ds = KERNEL_DATA_SELECTOR as u64;
    ctx.es = KERNEL_DATA_SELECTOR as u64;
    ctx.fs = KERNEL_DATA_SELECTOR as u64;
    ctx.gs = KERNEL_DATA_SELECTOR as u64;
    ctx.fpu_control_word = 0x037F;
    ctx
}
