//! PS/2 keyboard scancode capture.
//!
//! The shell/line-editor are out of scope (spec §4.5 lists them as an
//! interface only); this module supplies exactly enough of that interface
//! to make typed input observable: scancode-to-ASCII translation for a US
//! layout and a small ring buffer the shell loop polls.

use nanos_lib::{io, Spinlock};

use crate::pic;

const KEYBOARD_DATA_PORT: u16 = 0x60;
const KEYBOARD_IRQ_LINE: u8 = 1;
const BUFFER_CAP: usize = 64;

const SCANCODE_ASCII: [u8; 0x3A] = [
    0, 0, b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'0', b'-', b'=', 0x08, b'\t',
    b'q', b'w', b'e', b'r', b't', b'y', b'u', b'i', b'o', b'p', b'[', b']', b'\n', 0, b'a', b's',
    b'd', b'f', b'g', b'h', b'j', b'k', b'l', b';', b'\'', b'`', 0, b'\\', b'z', b'x', b'c', b'v',
    b'b', b'n', b'm', b',', b'.', b'/', 0, 0, 0, b' ',
];

const SCANCODE_ASCII_SHIFTED: [u8; 0x3A] = [
    0, 0, b'!', b'@', b'#', b'$', b'%', b'^', b'&', b'*', b'(', b')', b'_', b'+', 0x08, b'\t',
    b'Q', b'W', b'E', b'R', b'T', b'Y', b'U', b'I', b'O', b'P', b'{', b'}', b'\n', 0, b'A', b'S',
    b'D', b'F', b'G', b'H', b'J', b'K', b'L', b':', b'"', b'~', 0, b'|', b'Z', b'X', b'C', b'V',
    b'B', b'N', b'M', b'<', b'>', b'?', 0, 0, 0, b' ',
];

const LEFT_SHIFT_MAKE: u8 = 0x2A;
const RIGHT_SHIFT_MAKE: u8 = 0x36;
const RELEASE_BIT: u8 = 0x80;

struct RingBuffer {
    data: [u8; BUFFER_CAP],
    head: usize,
    tail: usize,
    len: usize,
}

impl RingBuffer {
    const fn new() -> Self {
        Self {
            data: [0u8; BUFFER_CAP],
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    fn push(&mut self, byte: u8) {
        if self.len == BUFFER_CAP {
            return;
        }
        self.data[self.tail] = byte;
        self.tail = (self.tail + 1) % BUFFER_CAP;
        self.len += 1;
    }

    fn pop(&mut self) -> Option<u8> {
        if self.len == 0 {
            return None;
        }
        let byte = self.data[self.head];
        self.head = (self.head + 1) % BUFFER_CAP;
        self.len -= 1;
        Some(byte)
    }
}

static LOCK: Spinlock = Spinlock::new();
static mut BUFFER: RingBuffer = RingBuffer::new();
static mut SHIFT_HELD: bool = false;

pub fn init() {
    pic::unmask_line(KEYBOARD_IRQ_LINE);
}

/// Top-half of the keyboard ISR: read the scancode, translate it, push the
/// resulting ASCII byte (if any) into the input buffer, and issue EOI.
pub fn on_keyboard_interrupt(vector: u8) {
    let scancode = unsafe { io::inb(KEYBOARD_DATA_PORT) };

    LOCK.lock();
    unsafe {
        if scancode == LEFT_SHIFT_MAKE || scancode == RIGHT_SHIFT_MAKE {
            SHIFT_HELD = true;
        } else if scancode == (LEFT_SHIFT_MAKE | RELEASE_BIT)
            || scancode == (RIGHT_SHIFT_MAKE | RELEASE_BIT)
        {
            SHIFT_HELD = false;
        } else if scancode & RELEASE_BIT == 0 {
            let index = scancode as usize;
            if index < SCANCODE_ASCII.len() {
                let ascii = if SHIFT_HELD {
                    SCANCODE_ASCII_SHIFTED[index]
                } else {
                    SCANCODE_ASCII[index]
                };
                if ascii != 0 {
                    (*(&raw mut BUFFER)).push(ascii);
                }
            }
        }
    }
    LOCK.unlock();

    pic::end_of_interrupt(vector);
}

/// Poll the input buffer for a single translated character.
pub fn read_char() -> Option<u8> {
    LOCK.lock();
    let byte = unsafe { (*(&raw mut BUFFER)).pop() };
    LOCK.unlock();
    byte
}
