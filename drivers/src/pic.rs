//! Legacy 8259 PIC remap and masking.
//!
//! Spec-mandated remap: ICW1 0x11 to both PICs, ICW2 offsets 0x20 (primary)
//! and 0x28 (secondary), ICW3 cascade identity 0/0, ICW4 mode 0x01, then
//! mask everything until individual handlers are ready. The `pic8259` crate
//! performs the ICW sequence; we mask explicitly afterward since the crate
//! restores pre-init masks by default and the spec wants a known-all-masked
//! starting state.

use nanos_lib::IrqMutex;
use pic8259::ChainedPics;

pub const PRIMARY_OFFSET: u8 = 0x20;
pub const SECONDARY_OFFSET: u8 = 0x28;

const MASK_ALL: u8 = 0xFF;

static PICS: IrqMutex<ChainedPics> =
    IrqMutex::new(unsafe { ChainedPics::new(PRIMARY_OFFSET, SECONDARY_OFFSET) });

/// Remap both PICs and mask every line. Must run before any IRQ is unmasked.
pub fn init() {
    let mut pics = PICS.lock();
    unsafe {
        pics.initialize();
        pics.write_masks(MASK_ALL, MASK_ALL);
    }
}

/// Unmask a single IRQ line (0-15).
pub fn unmask_line(line: u8) {
    let mut pics = PICS.lock();
    let masks = unsafe { pics.read_masks() };
    let mut masks = masks;
    if line < 8 {
        masks[0] &= !(1 << line);
    } else {
        masks[1] &= !(1 << (line - 8));
    }
    unsafe { pics.write_masks(masks[0], masks[1]) };
}

/// Mask a single IRQ line (0-15).
pub fn mask_line(line: u8) {
    let mut pics = PICS.lock();
    let masks = unsafe { pics.read_masks() };
    let mut masks = masks;
    if line < 8 {
        masks[0] |= 1 << line;
    } else {
        masks[1] |= 1 << (line - 8);
    }
    unsafe { pics.write_masks(masks[0], masks[1]) };
}

/// Issue end-of-interrupt for the given interrupt vector.
pub fn end_of_interrupt(vector: u8) {
    let mut pics = PICS.lock();
    unsafe { pics.notify_end_of_interrupt(vector) };
}
