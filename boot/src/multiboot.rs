//! Multiboot2 system info parsing (spec §3 "Multiboot2 system info", §6
//! "Multiboot2 info layout").
//!
//! The boot stub is out of scope; it hands over 64-bit mode with the info
//! pointer already stashed at a well-known location. This module walks the
//! tagged blob with the `multiboot2` crate and reduces it to the flat value
//! record the rest of the kernel reads.

use multiboot2::{BootInformation, BootInformationHeader};

use nanos_lib::klog_info;

const BOOTLOADER_NAME_MAX_LEN: usize = 63;
const COMMAND_LINE_MAX_LEN: usize = 127;

/// Flat, read-only system info record (spec §3). Filled once during
/// [`parse`]; every other subsystem only ever reads it.
#[derive(Clone, Copy)]
pub struct SystemInfo {
    pub valid: bool,
    bootloader_name: [u8; BOOTLOADER_NAME_MAX_LEN],
    bootloader_name_len: usize,
    command_line: [u8; COMMAND_LINE_MAX_LEN],
    command_line_len: usize,
    pub mem_lower_kb: u32,
    pub mem_upper_kb: u32,
    pub total_available_bytes: u64,
    pub available_region_count: u32,
}

impl SystemInfo {
    const fn invalid() -> Self {
        Self {
            valid: false,
            bootloader_name: [0; BOOTLOADER_NAME_MAX_LEN],
            bootloader_name_len: 0,
            command_line: [0; COMMAND_LINE_MAX_LEN],
            command_line_len: 0,
            mem_lower_kb: 0,
            mem_upper_kb: 0,
            total_available_bytes: 0,
            available_region_count: 0,
        }
    }

    pub fn bootloader_name(&self) -> &str {
        core::str::from_utf8(&self.bootloader_name[..self.bootloader_name_len]).unwrap_or("")
    }

    pub fn command_line(&self) -> &str {
        core::str::from_utf8(&self.command_line[..self.command_line_len]).unwrap_or("")
    }

    fn set_bootloader_name(&mut self, name: &str) {
        let n = name.len().min(BOOTLOADER_NAME_MAX_LEN);
        self.bootloader_name[..n].copy_from_slice(&name.as_bytes()[..n]);
        self.bootloader_name_len = n;
    }

    fn set_command_line(&mut self, cmdline: &str) {
        let n = cmdline.len().min(COMMAND_LINE_MAX_LEN);
        self.command_line[..n].copy_from_slice(&cmdline.as_bytes()[..n]);
        self.command_line_len = n;
    }
}

static mut SYSTEM_INFO: SystemInfo = SystemInfo::invalid();

/// Parse the Multiboot2 info blob at `info_address` and cache the result.
/// Recognised tags: end (0), command line (1), bootloader name (2), basic
/// meminfo (4), memory map (6) — anything else is skipped. Returns the
/// parsed record; `valid` is false if the blob failed to load.
pub fn parse(info_address: usize) -> SystemInfo {
    let mut info = SystemInfo::invalid();

    let boot_info = unsafe {
        BootInformation::load(info_address as *const BootInformationHeader)
    };

    let Ok(boot_info) = boot_info else {
        klog_info!("Multiboot2: failed to load info struct at 0x{:x}", info_address);
        unsafe { SYSTEM_INFO = info };
        return info;
    };

    if let Some(Ok(tag)) = boot_info.boot_loader_name_tag().map(|t| t.name()) {
        info.set_bootloader_name(tag);
    }

    if let Some(Ok(tag)) = boot_info.command_line_tag().map(|t| t.cmdline()) {
        info.set_command_line(tag);
    }

    if let Some(meminfo) = boot_info.basic_memory_info_tag() {
        info.mem_lower_kb = meminfo.memory_lower();
        info.mem_upper_kb = meminfo.memory_upper();
    }

    if let Some(memory_map) = boot_info.memory_map_tag() {
        let mut total_bytes: u64 = 0;
        let mut region_count: u32 = 0;
        for area in memory_map.memory_areas() {
            if area.typ() == multiboot2::MemoryAreaType::Available {
                total_bytes += area.size();
                region_count += 1;
            }
        }
        info.total_available_bytes = total_bytes;
        info.available_region_count = region_count;
    }

    info.valid = true;

    klog_info!(
        "Multiboot2: bootloader=\"{}\" cmdline=\"{}\" mem={}KB/{}KB regions={}",
        info.bootloader_name(),
        info.command_line(),
        info.mem_lower_kb,
        info.mem_upper_kb,
        info.available_region_count,
    );

    unsafe { SYSTEM_INFO = info };
    info
}

/// The most recently parsed system info, or an all-zero invalid record if
/// [`parse`] has not run yet.
pub fn system_info() -> SystemInfo {
    unsafe { SYSTEM_INFO }
}

pub fn get_total_memory() -> u64 {
    system_info().total_available_bytes
}

pub fn get_bootloader_name() -> &'static str {
    // SAFETY: SYSTEM_INFO is only written by `parse`, which runs once
    // during early boot before any other CPU accesses this table.
    unsafe { (&raw const SYSTEM_INFO as *const SystemInfo).as_ref().unwrap().bootloader_name() }
}

pub fn get_command_line() -> &'static str {
    unsafe { (&raw const SYSTEM_INFO as *const SystemInfo).as_ref().unwrap().command_line() }
}

pub fn get_memory_lower() -> u32 {
    system_info().mem_lower_kb
}

pub fn get_memory_upper() -> u32 {
    system_info().mem_upper_kb
}
