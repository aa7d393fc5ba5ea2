//! Minimal line-based debug shell (spec §4.5): polls the keyboard ring
//! buffer, echoes to serial, and dispatches a handful of commands against
//! the live filesystem and scheduler.

use nanos_drivers::{keyboard, serial, serial_println};

const LINE_MAX: usize = 96;
const ARG_MAX: usize = 32;

struct LineBuffer {
    data: [u8; LINE_MAX],
    len: usize,
}

impl LineBuffer {
    const fn new() -> Self {
        Self { data: [0; LINE_MAX], len: 0 }
    }

    fn push(&mut self, byte: u8) {
        if self.len < LINE_MAX {
            self.data[self.len] = byte;
            self.len += 1;
            serial::write_str(core::str::from_utf8(&[byte]).unwrap_or(""));
        }
    }

    fn backspace(&mut self) {
        if self.len > 0 {
            self.len -= 1;
            serial::write_str("\x08 \x08");
        }
    }

    fn as_str(&self) -> &str {
        core::str::from_utf8(&self.data[..self.len]).unwrap_or("")
    }

    fn clear(&mut self) {
        self.len = 0;
    }
}

fn read_line(buf: &mut LineBuffer) {
    buf.clear();
    loop {
        let Some(byte) = keyboard::read_char() else {
            x86_64::instructions::hlt();
            continue;
        };
        match byte {
            b'\n' => {
                serial::write_str("\n");
                return;
            }
            0x08 => buf.backspace(),
            _ => buf.push(byte),
        }
    }
}

fn split_args(line: &str) -> ([&str; ARG_MAX], usize) {
    let mut out = [""; ARG_MAX];
    let mut n = 0;
    for word in line.split_whitespace() {
        if n == ARG_MAX {
            break;
        }
        out[n] = word;
        n += 1;
    }
    (out, n)
}

fn cmd_ls() {
    nanos_fs::ls(|entry| {
        serial_println!("{:>6}  {}", entry.content_len, entry.path_str());
    });
}

fn cmd_cat(name: &str) {
    let mut buf = [0u8; nanos_abi::config::FS_CONTENT_MAX_LEN];
    match nanos_fs::read(name, &mut buf) {
        Some(n) => serial_println!("{}", core::str::from_utf8(&buf[..n]).unwrap_or("<binary>")),
        None => serial_println!("cat: {}: no such entry", name),
    }
}

fn cmd_write(name: &str, content: &str) {
    let err = nanos_fs::write(name, content);
    if err.is_error() {
        serial_println!("write: {:?}", err);
    }
}

fn cmd_cd(name: &str) {
    let err = nanos_fs::chdir(name);
    if err.is_error() {
        serial_println!("cd: {:?}", err);
    }
}

fn cmd_pwd() {
    let mut buf = [0u8; nanos_abi::config::FS_PATH_MAX_LEN];
    let n = nanos_fs::cwd(&mut buf);
    serial_println!("{}", core::str::from_utf8(&buf[..n]).unwrap_or(""));
}

fn cmd_ps() {
    let stats = nanos_sched::stats();
    serial_println!(
        "tasks={} switches={} voluntary_yields={} ticks={} idle_ticks={}",
        nanos_sched::task_count(),
        stats.context_switches,
        stats.voluntary_yields,
        stats.ticks_observed,
        stats.idle_ticks,
    );
}

fn cmd_selftest() {
    #[cfg(feature = "builtin-tests")]
    {
        let results = nanos_tests::run_all();
        serial_println!("selftest: {}/{} passed", results.passed, results.total);
    }
    #[cfg(not(feature = "builtin-tests"))]
    {
        serial_println!("selftest: built without the builtin-tests feature");
    }
}

fn cmd_help() {
    serial_println!("commands: ls, cat <f>, write <f> <text...>, cd <d>, pwd, ps, selftest, help");
}

fn dispatch(line: &str) {
    let (args, n) = split_args(line);
    if n == 0 {
        return;
    }
    match args[0] {
        "ls" => cmd_ls(),
        "cat" if n >= 2 => cmd_cat(args[1]),
        "write" if n >= 2 => {
            let rest = line.splitn(3, ' ').nth(2).unwrap_or("");
            cmd_write(args[1], rest);
        }
        "cd" if n >= 2 => cmd_cd(args[1]),
        "pwd" => cmd_pwd(),
        "ps" => cmd_ps(),
        "selftest" => cmd_selftest(),
        "help" => cmd_help(),
        other => serial_println!("unknown command: {}", other),
    }
}

pub extern "C" fn shell_task_entry(_arg: *mut core::ffi::c_void) -> ! {
    serial_println!("NanOS debug shell. Type 'help' for commands.");
    let mut line = LineBuffer::new();
    loop {
        serial::write_str("> ");
        read_line(&mut line);
        dispatch(line.as_str());
    }
}
