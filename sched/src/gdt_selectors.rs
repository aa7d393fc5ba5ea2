//! Segment selector values used when fabricating an `iretq` frame.
//!
//! These mirror `nanos-boot::gdt`'s layout (spec §4.2: code selector 0x08,
//! data selector 0x10) as plain constants rather than a crate dependency —
//! `nanos-boot` never depends on `nanos-sched`, but the reverse would still
//! be an unnecessary coupling for two fixed numbers the spec pins directly.

pub const KERNEL_CODE_SELECTOR: u16 = 0x08;
pub const KERNEL_DATA_SELECTOR: u16 = 0x10;
