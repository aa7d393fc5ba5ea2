//! Boot entry point: wires every subsystem together and drops into the
//! debug shell (spec §4.5).
//!
//! The boot stub that brings the CPU from the bootloader's Multiboot2 hand-
//! off into 64-bit long mode with a valid stack is out of scope (spec §1);
//! by the time [`_start`] runs, `rdi` holds the Multiboot2 info pointer and
//! the stack is already usable, so this is an ordinary `extern "C"` entry
//! point rather than a hand-written trampoline.

#![no_std]
#![no_main]

mod shell;

use core::panic::PanicInfo;

use nanos_abi::syscall::TIMER_VECTOR;
use nanos_abi::task::TaskPriority;
use nanos_abi::config::TIMER_DEFAULT_FREQUENCY_HZ;
use nanos_drivers::{keyboard, pic, pit, serial};
use nanos_lib::{klog_error, klog_info};

const KERNEL_STACK_SIZE: usize = 64 * 1024;

#[repr(align(16))]
struct KernelStack([u8; KERNEL_STACK_SIZE]);

static mut KERNEL_STACK: KernelStack = KernelStack([0; KERNEL_STACK_SIZE]);

fn kernel_stack_top() -> u64 {
    // SAFETY: taken once, before any other CPU or interrupt can observe it.
    unsafe { (&raw const KERNEL_STACK.0 as u64) + KERNEL_STACK_SIZE as u64 }
}

extern "C" fn idle_task_entry(_arg: *mut core::ffi::c_void) -> ! {
    loop {
        x86_64::instructions::interrupts::enable();
        x86_64::instructions::hlt();
    }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    serial::init();
    klog_error!("{}", info);
    nanos_boot::kernel_panic("Rust panic")
}

#[unsafe(no_mangle)]
pub extern "C" fn _start(multiboot_info_address: usize) -> ! {
    let stack_top = kernel_stack_top();

    nanos_boot::gdt::init(stack_top);
    nanos_boot::idt::init();

    serial::init();
    klog_info!("NanOS booting");

    let info = nanos_boot::multiboot::parse(multiboot_info_address);
    klog_info!(
        "multiboot2: bootloader=\"{}\" mem_upper={}KB",
        info.bootloader_name(),
        info.mem_upper_kb
    );

    pic::init();
    pit::timer_init(TIMER_DEFAULT_FREQUENCY_HZ);
    pit::timer_set_tick_handler(nanos_sched::on_tick);
    pic::unmask_line(0);

    keyboard::init();

    nanos_fs::init();
    nanos_core::syscall_init();
    nanos_boot::idt::set_syscall_handler(nanos_core::syscall_dispatch);

    nanos_sched::init(idle_task_entry);
    let _ = nanos_sched::create_task(
        "shell",
        shell::shell_task_entry,
        core::ptr::null_mut(),
        TaskPriority::Normal,
    );

    x86_64::instructions::interrupts::enable();
    pit::timer_enable();

    klog_info!("scheduler live, timer vector {:#x}", TIMER_VECTOR);

    loop {
        x86_64::instructions::hlt();
    }
}
