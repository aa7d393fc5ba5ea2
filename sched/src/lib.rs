//! Task control blocks, index-based ready queues, and the context switch
//! primitive (spec §4.2).

#![no_std]

pub mod context;
pub mod gdt_selectors;
pub mod scheduler;
pub mod task;

pub use scheduler::{
    create_task, create_task_with_id, current_task_id, destroy_task, dispatch, exit_task,
    fork_task, init, kill_all_except_idle, on_tick, reap_zombie_child, stats, task_count,
    yield_now, SchedulerStats,
};
pub use task::{ReadyQueue, StackPool, Tcb};
