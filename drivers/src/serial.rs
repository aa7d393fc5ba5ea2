//! COM1 serial console, backed by the real `uart_16550` crate.

use core::fmt::{self, Write};

use spin::Mutex;
use uart_16550::SerialPort;

const COM1_BASE: u16 = 0x3f8;

static SERIAL: Mutex<SerialPort> = Mutex::new(unsafe { SerialPort::new(COM1_BASE) });

pub fn init() {
    SERIAL.lock().init();
}

pub fn write_str(s: &str) {
    let _ = SERIAL.lock().write_str(s);
}

pub fn write_line(s: &str) {
    let mut guard = SERIAL.lock();
    let _ = guard.write_str(s);
    let _ = guard.write_str("\n");
}

pub fn print_args(args: fmt::Arguments<'_>) {
    let _ = SERIAL.lock().write_fmt(args);
}

/// Prefix tags used by the minimal console stand-in (spec §4.5's
/// print_error/success/info/warning).
fn print_tagged(tag: &str, msg: &str) {
    let mut guard = SERIAL.lock();
    let _ = write!(guard, "{}: {}\n", tag, msg);
}

pub fn print_error(msg: &str) {
    print_tagged("ERROR", msg);
}

pub fn print_success(msg: &str) {
    print_tagged("SUCCESS", msg);
}

pub fn print_info(msg: &str) {
    print_tagged("INFO", msg);
}

pub fn print_warning(msg: &str) {
    print_tagged("WARNING", msg);
}

#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => {{
        $crate::serial::print_args(core::format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! serial_println {
    () => {
        $crate::serial::write_line("");
    };
    ($fmt:expr) => {
        $crate::serial::write_line($fmt);
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::serial::print_args(core::format_args!(concat!($fmt, "\n"), $($arg)*));
    };
}
