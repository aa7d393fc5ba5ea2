//! Thin x86 port-I/O wrappers built on `x86_64::instructions::port::Port`.
//!
//! Kept as free functions (rather than exposing the `x86_64` crate's richer
//! `Port`/`PortReadOnly`/`PortWriteOnly` types directly) so callers in
//! `nanos-drivers` read like the spec's `inb`/`outb` primitives.

use x86_64::instructions::port::Port;

/// # Safety
/// Port I/O can have arbitrary side effects on hardware state.
#[inline(always)]
pub unsafe fn outb(port: u16, value: u8) {
    unsafe { Port::new(port).write(value) }
}

/// # Safety
/// Port I/O can have arbitrary side effects on hardware state.
#[inline(always)]
pub unsafe fn inb(port: u16) -> u8 {
    unsafe { Port::new(port).read() }
}

/// # Safety
/// Port I/O can have arbitrary side effects on hardware state.
#[inline(always)]
pub unsafe fn outw(port: u16, value: u16) {
    unsafe { Port::new(port).write(value) }
}

/// # Safety
/// Port I/O can have arbitrary side effects on hardware state.
#[inline(always)]
pub unsafe fn inw(port: u16) -> u16 {
    unsafe { Port::new(port).read() }
}

/// I/O delay via port 0x80 (POST diagnostic port). Used between successive
/// writes to the PIC/PIT during remap/programming so the chip has time to
/// settle on real hardware.
///
/// # Safety
/// Should only be called in contexts where port I/O is appropriate.
#[inline(always)]
pub unsafe fn io_wait() {
    unsafe { outb(0x80, 0) }
}
