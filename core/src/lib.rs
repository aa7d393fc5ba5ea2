//! Syscall registration table and the built-in syscall catalogue
//! (spec §4.3): the dispatcher that vector 0x80's trap trampoline (in
//! `nanos-boot`) calls into for every `int 0x80`.

#![no_std]

mod handlers;
mod table;

pub use table::{
    syscall_dispatch, syscall_get_name, syscall_init, syscall_is_valid, syscall_print_table,
    syscall_register,
};
