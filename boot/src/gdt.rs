//! Kernel GDT and TSS construction.
//!
//! The boot stub hands over an already-valid GDT (spec §1), but the kernel
//! installs its own once control reaches Rust so it owns the selectors the
//! IDT gates and `iretq` depend on, and so a TSS is available for `rsp0`.

#![allow(static_mut_refs)]

use core::arch::asm;

use nanos_lib::klog_debug;

pub const GDT_CODE_SELECTOR: u16 = 0x08;
pub const GDT_DATA_SELECTOR: u16 = 0x10;
pub const GDT_USER_DATA_SELECTOR: u16 = 0x18;
pub const GDT_USER_CODE_SELECTOR: u16 = 0x20;
const GDT_TSS_SELECTOR: u16 = 0x28;

const GDT_ACCESS_PRESENT: u8 = 1 << 7;
const GDT_ACCESS_DPL_KERNEL: u8 = 0 << 5;
const GDT_ACCESS_DPL_USER: u8 = 3 << 5;
const GDT_ACCESS_SEGMENT: u8 = 1 << 4;
const GDT_ACCESS_CODE_TYPE: u8 = 0b1010;
const GDT_ACCESS_DATA_TYPE: u8 = 0b0010;

const GDT_FLAG_GRANULARITY: u8 = 1 << 3;
const GDT_FLAG_LONG_MODE: u8 = 1 << 1;
const GDT_FLAGS_64BIT: u8 = GDT_FLAG_GRANULARITY | GDT_FLAG_LONG_MODE;

const GDT_LIMIT_LOW: u16 = 0xFFFF;
const GDT_LIMIT_HIGH: u8 = 0xF;

/// Builds a flat-model (base 0) 64-bit GDT descriptor: limit covers the
/// full address space via granularity, base is unused in long mode.
const fn gdt_make_descriptor(access: u8, flags: u8) -> u64 {
    (GDT_LIMIT_LOW as u64) | ((access as u64) << 40) | ((GDT_LIMIT_HIGH as u64) << 48) | ((flags as u64) << 52)
}

const GDT_NULL_DESCRIPTOR: u64 = 0;
const GDT_CODE_DESCRIPTOR_64: u64 = gdt_make_descriptor(
    GDT_ACCESS_PRESENT | GDT_ACCESS_DPL_KERNEL | GDT_ACCESS_SEGMENT | GDT_ACCESS_CODE_TYPE,
    GDT_FLAGS_64BIT,
);
const GDT_DATA_DESCRIPTOR_64: u64 = gdt_make_descriptor(
    GDT_ACCESS_PRESENT | GDT_ACCESS_DPL_KERNEL | GDT_ACCESS_SEGMENT | GDT_ACCESS_DATA_TYPE,
    GDT_FLAGS_64BIT,
);
const GDT_USER_DATA_DESCRIPTOR_64: u64 = gdt_make_descriptor(
    GDT_ACCESS_PRESENT | GDT_ACCESS_DPL_USER | GDT_ACCESS_SEGMENT | GDT_ACCESS_DATA_TYPE,
    GDT_FLAGS_64BIT,
);
const GDT_USER_CODE_DESCRIPTOR_64: u64 = gdt_make_descriptor(
    GDT_ACCESS_PRESENT | GDT_ACCESS_DPL_USER | GDT_ACCESS_SEGMENT | GDT_ACCESS_CODE_TYPE,
    GDT_FLAGS_64BIT,
);

#[repr(C, packed)]
struct Tss64 {
    reserved0: u32,
    rsp0: u64,
    rsp1: u64,
    rsp2: u64,
    reserved1: u64,
    ist: [u64; 7],
    reserved2: u64,
    reserved3: u16,
    iomap_base: u16,
}

#[repr(C, packed)]
struct GdtTssEntry {
    limit_low: u16,
    base_low: u16,
    base_mid: u8,
    access: u8,
    granularity: u8,
    base_high: u8,
    base_upper: u32,
    reserved: u32,
}

#[repr(C, packed)]
struct GdtLayout {
    entries: [u64; 5],
    tss_entry: GdtTssEntry,
}

#[repr(C, packed)]
struct GdtDescriptor {
    limit: u16,
    base: u64,
}

static mut GDT_TABLE: GdtLayout = GdtLayout {
    entries: [0; 5],
    tss_entry: GdtTssEntry {
        limit_low: 0,
        base_low: 0,
        base_mid: 0,
        access: 0,
        granularity: 0,
        base_high: 0,
        base_upper: 0,
        reserved: 0,
    },
};

static mut KERNEL_TSS: Tss64 = Tss64 {
    reserved0: 0,
    rsp0: 0,
    rsp1: 0,
    rsp2: 0,
    reserved1: 0,
    ist: [0; 7],
    reserved2: 0,
    reserved3: 0,
    iomap_base: 0,
};

unsafe fn load_gdt(descriptor: &GdtDescriptor) {
    unsafe {
        asm!("lgdt [{0}]", in(reg) descriptor, options(nostack, preserves_flags));
        asm!(
            "push {code}",
            "lea rax, [2f + rip]",
            "push rax",
            "retfq",
            "2:",
            "mov ax, {data:x}",
            "mov ds, ax",
            "mov es, ax",
            "mov ss, ax",
            "mov fs, ax",
            "mov gs, ax",
            code = const GDT_CODE_SELECTOR as u64,
            data = in(reg) GDT_DATA_SELECTOR,
            out("rax") _,
            options(nostack),
        );
    }
}

unsafe fn load_tss() {
    unsafe { asm!("ltr {0:x}", in(reg) GDT_TSS_SELECTOR, options(nostack, preserves_flags)) };
}

/// Build and load the kernel GDT plus a TSS carrying the ring-0 stack
/// pointer used on privilege-level transitions.
pub fn init(kernel_stack_top: u64) {
    klog_debug!("GDT: installing kernel descriptor table");

    unsafe {
        GDT_TABLE.entries = [
            GDT_NULL_DESCRIPTOR,
            GDT_CODE_DESCRIPTOR_64,
            GDT_DATA_DESCRIPTOR_64,
            GDT_USER_DATA_DESCRIPTOR_64,
            GDT_USER_CODE_DESCRIPTOR_64,
        ];

        let tss_base = &raw const KERNEL_TSS as u64;
        let tss_limit = core::mem::size_of::<Tss64>() as u16 - 1;

        let tss_entry = &mut GDT_TABLE.tss_entry;
        tss_entry.limit_low = tss_limit;
        tss_entry.base_low = (tss_base & 0xFFFF) as u16;
        tss_entry.base_mid = ((tss_base >> 16) & 0xFF) as u8;
        tss_entry.access = 0x89; // present, 64-bit available TSS
        tss_entry.granularity = 0;
        tss_entry.base_high = ((tss_base >> 24) & 0xFF) as u8;
        tss_entry.base_upper = (tss_base >> 32) as u32;
        tss_entry.reserved = 0;

        KERNEL_TSS.iomap_base = core::mem::size_of::<Tss64>() as u16;
        KERNEL_TSS.rsp0 = kernel_stack_top;

        let descriptor = GdtDescriptor {
            limit: (core::mem::size_of::<GdtLayout>() - 1) as u16,
            base: &raw const GDT_TABLE as u64,
        };

        load_gdt(&descriptor);
        load_tss();
    }

    klog_debug!("GDT: TSS loaded, rsp0=0x{:x}", kernel_stack_top);
}

/// Update the ring-0 stack pointer used on the next privilege transition.
/// The scheduler calls this on every context switch so a trap taken while
/// a given task is running lands on that task's kernel stack.
pub fn set_kernel_rsp0(rsp0: u64) {
    unsafe { KERNEL_TSS.rsp0 = rsp0 };
}
