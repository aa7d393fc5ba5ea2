//! Level-filtered kernel logging onto COM1.
//!
//! Writes directly via [`crate::io`] rather than through `nanos-drivers`'s
//! fuller UART driver, to avoid a dependency cycle (drivers depends on this
//! crate). Uses `core::fmt::Write` instead of the C-varargs/`VaList`
//! approach a printf-style logger would need, since `c_variadic` is an
//! unstable feature this tree has no reason to require.

use core::fmt::{self, Write};
use core::sync::atomic::{AtomicU8, Ordering};

use crate::io;

const COM1_BASE: u16 = 0x3f8;
const LSR_OFFSET: u16 = 5;
const LSR_TX_EMPTY: u8 = 0x20;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum KlogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl KlogLevel {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => KlogLevel::Error,
            1 => KlogLevel::Warn,
            2 => KlogLevel::Info,
            _ => KlogLevel::Debug,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            KlogLevel::Error => "ERROR",
            KlogLevel::Warn => "WARNING",
            KlogLevel::Info => "INFO",
            KlogLevel::Debug => "DEBUG",
        }
    }
}

static CURRENT_LEVEL: AtomicU8 = AtomicU8::new(KlogLevel::Info as u8);

pub fn klog_set_level(level: KlogLevel) {
    CURRENT_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn klog_get_level() -> KlogLevel {
    KlogLevel::from_raw(CURRENT_LEVEL.load(Ordering::Relaxed))
}

#[inline]
pub fn klog_is_enabled(level: KlogLevel) -> bool {
    (level as u8) <= CURRENT_LEVEL.load(Ordering::Relaxed)
}

struct Com1Writer;

impl Write for Com1Writer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for &byte in s.as_bytes() {
            unsafe {
                while io::inb(COM1_BASE + LSR_OFFSET) & LSR_TX_EMPTY == 0 {
                    core::hint::spin_loop();
                }
                if byte == b'\n' {
                    io::outb(COM1_BASE, b'\r');
                    while io::inb(COM1_BASE + LSR_OFFSET) & LSR_TX_EMPTY == 0 {
                        core::hint::spin_loop();
                    }
                }
                io::outb(COM1_BASE, byte);
            }
        }
        Ok(())
    }
}

#[doc(hidden)]
pub fn klog_write_fmt(level: KlogLevel, tag: &str, args: fmt::Arguments<'_>) {
    if !klog_is_enabled(level) {
        return;
    }
    let mut writer = Com1Writer;
    let _ = write!(writer, "[{}] {}", tag, args);
    let _ = writer.write_char('\n');
}

#[macro_export]
macro_rules! klog_error {
    ($($arg:tt)*) => {
        $crate::klog::klog_write_fmt(
            $crate::klog::KlogLevel::Error,
            $crate::klog::KlogLevel::Error.tag(),
            core::format_args!($($arg)*),
        )
    };
}

#[macro_export]
macro_rules! klog_warn {
    ($($arg:tt)*) => {
        $crate::klog::klog_write_fmt(
            $crate::klog::KlogLevel::Warn,
            $crate::klog::KlogLevel::Warn.tag(),
            core::format_args!($($arg)*),
        )
    };
}

#[macro_export]
macro_rules! klog_info {
    ($($arg:tt)*) => {
        $crate::klog::klog_write_fmt(
            $crate::klog::KlogLevel::Info,
            $crate::klog::KlogLevel::Info.tag(),
            core::format_args!($($arg)*),
        )
    };
}

#[macro_export]
macro_rules! klog_debug {
    ($($arg:tt)*) => {
        $crate::klog::klog_write_fmt(
            $crate::klog::KlogLevel::Debug,
            $crate::klog::KlogLevel::Debug.tag(),
            core::format_args!($($arg)*),
        )
    };
}
