//! Task control block and the index-based intrusive ready-queue links.
//!
//! Ready queues are doubly-linked lists threaded through the static task
//! pool using `u8` indices rather than pointers: a `Tcb` never moves once
//! allocated, so an index is as good as a pointer and avoids the borrow
//! issues of self-referential structures entirely.

use nanos_abi::config::{MAX_TASKS, TASK_NAME_MAX_LEN, TASK_STACK_SIZE};
use nanos_abi::task::{CpuContext, TaskEntry, TaskPriority, TaskState, INVALID_TASK_ID, QUEUE_SENTINEL};

#[derive(Clone, Copy)]
pub struct Tcb {
    pub in_use: bool,
    pub task_id: u32,
    pub parent_id: u32,
    pub name: [u8; TASK_NAME_MAX_LEN],
    pub name_len: u8,
    pub state: TaskState,
    pub priority: TaskPriority,
    pub context: CpuContext,
    pub stack_base: u64,
    pub stack_size: u64,
    pub entry: Option<TaskEntry>,
    pub arg: usize,
    pub time_slice_ticks: u32,
    pub time_slice_remaining: u32,
    pub total_runtime_ticks: u64,
    pub exit_code: i32,
    pub next: u8,
    pub prev: u8,
}

impl Tcb {
    pub const fn empty() -> Self {
        Self {
            in_use: false,
            task_id: INVALID_TASK_ID,
            parent_id: INVALID_TASK_ID,
            name: [0; TASK_NAME_MAX_LEN],
            name_len: 0,
            state: TaskState::Zombie,
            priority: TaskPriority::Normal,
            context: CpuContext::zero(),
            stack_base: 0,
            stack_size: 0,
            entry: None,
            arg: 0,
            time_slice_ticks: 0,
            time_slice_remaining: 0,
            total_runtime_ticks: 0,
            exit_code: 0,
            next: QUEUE_SENTINEL,
            prev: QUEUE_SENTINEL,
        }
    }

    pub fn name(&self) -> &str {
        core::str::from_utf8(&self.name[..self.name_len as usize]).unwrap_or("")
    }

    pub fn set_name(&mut self, name: &str) {
        let n = name.len().min(TASK_NAME_MAX_LEN);
        self.name[..n].copy_from_slice(&name.as_bytes()[..n]);
        self.name_len = n as u8;
    }

    pub fn is_idle(&self) -> bool {
        self.priority == TaskPriority::Idle
    }
}

/// A doubly-linked list of task-pool indices, one per priority level.
#[derive(Clone, Copy)]
pub struct ReadyQueue {
    pub head: u8,
    pub tail: u8,
}

impl ReadyQueue {
    pub const fn empty() -> Self {
        Self {
            head: QUEUE_SENTINEL,
            tail: QUEUE_SENTINEL,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head == QUEUE_SENTINEL
    }

    /// Append `index` to the tail. Caller guarantees `index` is not already
    /// linked into any queue.
    pub fn push_back(&mut self, tasks: &mut [Tcb; MAX_TASKS], index: u8) {
        tasks[index as usize].next = QUEUE_SENTINEL;
        tasks[index as usize].prev = self.tail;
        if self.tail != QUEUE_SENTINEL {
            tasks[self.tail as usize].next = index;
        } else {
            self.head = index;
        }
        self.tail = index;
    }

    /// Remove `index` from the head, if present, returning it.
    pub fn pop_front(&mut self, tasks: &mut [Tcb; MAX_TASKS]) -> Option<u8> {
        if self.head == QUEUE_SENTINEL {
            return None;
        }
        let index = self.head;
        self.remove(tasks, index);
        Some(index)
    }

    /// Splice `index` out of the list wherever it sits. No-op if `index`
    /// is not linked into this queue.
    pub fn remove(&mut self, tasks: &mut [Tcb; MAX_TASKS], index: u8) {
        let (prev, next) = {
            let t = &tasks[index as usize];
            (t.prev, t.next)
        };

        if prev != QUEUE_SENTINEL {
            tasks[prev as usize].next = next;
        } else if self.head == index {
            self.head = next;
        }

        if next != QUEUE_SENTINEL {
            tasks[next as usize].prev = prev;
        } else if self.tail == index {
            self.tail = prev;
        }

        tasks[index as usize].next = QUEUE_SENTINEL;
        tasks[index as usize].prev = QUEUE_SENTINEL;
    }
}

/// Static backing storage for task kernel stacks (spec §4.2 "Stack
/// allocation"): a pool of `MAX_TASKS` fixed-size regions, handed out once
/// per task and never reclaimed (`free_stack` is a documented no-op). This
/// sidesteps relying on the heap allocator during very early boot or from
/// interrupt context, where it may not yet be safe to call into.
#[repr(align(16))]
pub struct StackPool {
    regions: [[u8; TASK_STACK_SIZE]; MAX_TASKS],
}

impl StackPool {
    pub const fn new() -> Self {
        Self {
            regions: [[0u8; TASK_STACK_SIZE]; MAX_TASKS],
        }
    }

    /// Base address of slot `index`'s stack region, freshly zeroed.
    pub fn acquire(&mut self, index: usize) -> u64 {
        self.regions[index].fill(0);
        self.regions[index].as_ptr() as u64
    }
}
