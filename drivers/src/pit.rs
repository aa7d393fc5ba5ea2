//! PIT channel-0 programming and the monotonic tick counter (spec §4.1).

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use nanos_abi::config::{PIT_BASE_FREQUENCY_HZ, TIMER_MAX_FREQUENCY_HZ, TIMER_MIN_FREQUENCY_HZ};
use nanos_lib::{io, klog_info};
use x86_64::instructions::hlt;

use crate::pic;

const PIT_CHANNEL0_PORT: u16 = 0x40;
const PIT_COMMAND_PORT: u16 = 0x43;
const PIT_COMMAND_RATE_GENERATOR: u8 = 0x36;
const PIT_IRQ_LINE: u8 = 0;

static TICKS: AtomicU64 = AtomicU64::new(0);
static FREQUENCY_HZ: AtomicU32 = AtomicU32::new(0);
static ACTIVE: AtomicBool = AtomicBool::new(false);

type TickHandler = fn();
static TICK_HANDLER: spin::Mutex<Option<TickHandler>> = spin::Mutex::new(None);

fn clamp_frequency(frequency_hz: u32) -> u32 {
    frequency_hz.clamp(TIMER_MIN_FREQUENCY_HZ, TIMER_MAX_FREQUENCY_HZ)
}

/// Program PIT channel 0 in rate-generator mode, seed the tick counter to
/// zero, and mark the timer inactive. Does not unmask the IRQ line — call
/// [`timer_enable`] once the timer ISR is installed.
pub fn timer_init(frequency_hz: u32) {
    let frequency_hz = clamp_frequency(frequency_hz);
    let divisor = (PIT_BASE_FREQUENCY_HZ / frequency_hz).clamp(1, 0xFFFF);

    unsafe {
        io::outb(PIT_COMMAND_PORT, PIT_COMMAND_RATE_GENERATOR);
        io::outb(PIT_CHANNEL0_PORT, (divisor & 0xFF) as u8);
        io::outb(PIT_CHANNEL0_PORT, ((divisor >> 8) & 0xFF) as u8);
    }

    TICKS.store(0, Ordering::SeqCst);
    FREQUENCY_HZ.store(PIT_BASE_FREQUENCY_HZ / divisor, Ordering::SeqCst);
    ACTIVE.store(false, Ordering::SeqCst);

    klog_info!("PIT: initialized at {} Hz (divisor {})", frequency_hz, divisor);
}

/// Unmask IRQ0, allowing the timer ISR to fire.
pub fn timer_enable() {
    pic::unmask_line(PIT_IRQ_LINE);
    ACTIVE.store(true, Ordering::SeqCst);
}

/// Mask IRQ0.
pub fn timer_disable() {
    pic::mask_line(PIT_IRQ_LINE);
    ACTIVE.store(false, Ordering::SeqCst);
}

pub fn timer_is_active() -> bool {
    ACTIVE.load(Ordering::SeqCst)
}

pub fn timer_get_ticks() -> u64 {
    TICKS.load(Ordering::SeqCst)
}

pub fn timer_get_uptime_ms() -> u64 {
    let freq = FREQUENCY_HZ.load(Ordering::SeqCst).max(1) as u64;
    (TICKS.load(Ordering::SeqCst) * 1000) / freq
}

/// Install the callback invoked at the end of every tick, after EOI. Must
/// be non-blocking and must not allocate; it runs with interrupts disabled.
pub fn timer_set_tick_handler(handler: TickHandler) {
    *TICK_HANDLER.lock() = Some(handler);
}

/// Busy-wait until the tick counter reaches `ticks_now + ms`-worth of ticks.
pub fn timer_delay_ms(ms: u64) {
    if ms == 0 {
        return;
    }
    let freq = FREQUENCY_HZ.load(Ordering::SeqCst).max(1) as u64;
    let ticks_needed = (ms * freq / 1000).max(1);
    let target = TICKS.load(Ordering::SeqCst).wrapping_add(ticks_needed);
    while TICKS.load(Ordering::SeqCst) < target {
        hlt();
    }
}

/// Top-half of the timer ISR: increment the tick counter, invoke the
/// installed callback if any, issue EOI. Runs with interrupts disabled;
/// must not allocate or block.
pub fn on_timer_interrupt(vector: u8) {
    TICKS.fetch_add(1, Ordering::SeqCst);
    if let Some(handler) = *TICK_HANDLER.lock() {
        handler();
    }
    pic::end_of_interrupt(vector);
}
