//! The kernel heap: no paging, no virtual memory, just a flat static arena
//! (spec §4.3's malloc/free/mmap/munmap; see §9 Non-goals on paging).

#![no_std]

pub mod heap;

pub use heap::{heap_stats, kfree, kmalloc, HeapStats};
