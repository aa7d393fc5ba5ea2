//! Hardware drivers: legacy PIC, PIT, serial console, PS/2 keyboard.

#![no_std]

pub mod keyboard;
pub mod pic;
pub mod pit;
pub mod serial;
