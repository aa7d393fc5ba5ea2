//! Ambient kernel support shared by every other NanOS crate: port I/O,
//! IRQ-safe synchronization primitives, logging, and the kernel test
//! harness.

#![no_std]

pub mod io;
pub mod klog;
pub mod spinlock;
pub mod testing;

pub use spinlock::{IrqMutex, IrqMutexGuard, Spinlock};
