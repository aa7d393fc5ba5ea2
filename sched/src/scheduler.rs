//! The scheduler singleton: task pool, ready queues, dispatch and the
//! tick-driven preemption policy (spec §4.2).

use nanos_abi::config::{FORCED_RESCHEDULE_INTERVAL_TICKS, MAX_TASKS, PRIORITY_LEVELS, DEFAULT_TIME_SLICE_TICKS};
use nanos_abi::error::SyscallError;
use nanos_abi::task::{TaskEntry, TaskPriority, TaskState, INVALID_TASK_ID, QUEUE_SENTINEL};
use nanos_lib::klog_debug;
use nanos_lib::spinlock::IrqMutex;

use crate::context::{context_restore, context_save, fabricate_initial_context};
use crate::task::{ReadyQueue, StackPool, Tcb};

/// Running totals surfaced to the `getstats`-style diagnostics the spec's
/// supplemented "Scheduler statistics" feature calls for.
#[derive(Clone, Copy, Default)]
pub struct SchedulerStats {
    pub context_switches: u64,
    pub voluntary_yields: u64,
    pub ticks_observed: u64,
    pub idle_ticks: u64,
}

struct SchedulerState {
    tasks: [Tcb; MAX_TASKS],
    queues: [ReadyQueue; PRIORITY_LEVELS],
    current: u8,
    next_id: u32,
    total_tasks: u32,
    ticks_since_force: u32,
    stats: SchedulerStats,
}

impl SchedulerState {
    const fn new() -> Self {
        Self {
            tasks: [Tcb::empty(); MAX_TASKS],
            queues: [ReadyQueue::empty(); PRIORITY_LEVELS],
            current: QUEUE_SENTINEL,
            next_id: 1,
            total_tasks: 0,
            ticks_since_force: 0,
            stats: SchedulerStats {
                context_switches: 0,
                voluntary_yields: 0,
                ticks_observed: 0,
                idle_ticks: 0,
            },
        }
    }

    fn find_free_slot(&self) -> Option<usize> {
        self.tasks.iter().position(|t| !t.in_use)
    }

    fn find_slot_by_id(&self, id: u32) -> Option<usize> {
        self.tasks.iter().position(|t| t.in_use && t.task_id == id)
    }

    #[allow(clippy::too_many_arguments)]
    fn spawn_into_slot(
        &mut self,
        slot: usize,
        id: u32,
        parent_id: u32,
        name: &str,
        priority: TaskPriority,
        stack_base: u64,
        context: nanos_abi::task::CpuContext,
        entry: TaskEntry,
        arg: usize,
    ) {
        let tcb = &mut self.tasks[slot];
        *tcb = Tcb::empty();
        tcb.in_use = true;
        tcb.task_id = id;
        tcb.parent_id = parent_id;
        tcb.set_name(name);
        tcb.state = TaskState::Ready;
        tcb.priority = priority;
        tcb.context = context;
        tcb.stack_base = stack_base;
        tcb.stack_size = nanos_abi::config::TASK_STACK_SIZE as u64;
        tcb.entry = Some(entry);
        tcb.arg = arg;
        tcb.time_slice_ticks = DEFAULT_TIME_SLICE_TICKS;
        tcb.time_slice_remaining = DEFAULT_TIME_SLICE_TICKS;

        self.total_tasks += 1;
        self.queues[priority.index()].push_back(&mut self.tasks, slot as u8);
    }

    /// First in-use zombie whose `parent_id` matches, if any.
    fn find_zombie_child(&self, parent_id: u32) -> Option<usize> {
        self.tasks
            .iter()
            .position(|t| t.in_use && t.state == TaskState::Zombie && t.parent_id == parent_id)
    }

    /// Reap every zombie in the pool: frees its slot, decrements the live
    /// task count, and clears `current` if the reaped task was running.
    fn reap_zombies(&mut self) {
        for slot in 0..MAX_TASKS {
            if self.tasks[slot].in_use && self.tasks[slot].state == TaskState::Zombie {
                let priority = self.tasks[slot].priority;
                self.queues[priority.index()].remove(&mut self.tasks, slot as u8);
                self.tasks[slot].in_use = false;
                self.total_tasks = self.total_tasks.saturating_sub(1);
                if self.current == slot as u8 {
                    self.current = QUEUE_SENTINEL;
                }
            }
        }
    }

    /// Same-level-first, then highest-to-lowest selection (spec §4.2
    /// "Select").
    fn select_next(&mut self) -> Option<u8> {
        let current_priority = if self.current != QUEUE_SENTINEL {
            Some(self.tasks[self.current as usize].priority)
        } else {
            None
        };

        if let Some(priority) = current_priority {
            if !self.queues[priority.index()].is_empty() {
                return self.queues[priority.index()].pop_front(&mut self.tasks);
            }
        }

        for priority in TaskPriority::ALL.into_iter().rev() {
            if Some(priority) == current_priority {
                continue;
            }
            if !self.queues[priority.index()].is_empty() {
                return self.queues[priority.index()].pop_front(&mut self.tasks);
            }
        }

        None
    }
}

static SCHED: IrqMutex<SchedulerState> = IrqMutex::new(SchedulerState::new());
static STACK_POOL: IrqMutex<StackPool> = IrqMutex::new(StackPool::new());

/// Create the idle task (priority `Idle`, always runnable) and seed it as
/// the running task so the scheduler has a `current` to switch away from
/// on the very first dispatch. Must run once, before the timer is armed.
pub fn init(idle_entry: TaskEntry) {
    let id = create_task("idle", idle_entry, core::ptr::null_mut(), TaskPriority::Idle).expect("idle task creation must not fail");

    let mut guard = SCHED.lock();
    let slot = guard.find_slot_by_id(id).expect("idle task must have a slot right after creation");
    {
        let state = &mut *guard;
        state.queues[TaskPriority::Idle.index()].remove(&mut state.tasks, slot as u8);
    }
    guard.tasks[slot].state = TaskState::Running;
    guard.current = slot as u8;
    drop(guard);

    klog_debug!("scheduler: idle task created and running (id={})", id);
}

/// Allocate a task id automatically and create the task.
pub fn create_task(name: &str, entry: TaskEntry, arg: *mut core::ffi::c_void, priority: TaskPriority) -> Result<u32, SyscallError> {
    let mut guard = SCHED.lock();
    let slot = guard.find_free_slot().ok_or(SyscallError::OutOfMemory)?;
    let id = guard.next_id;
    guard.next_id = guard.next_id.wrapping_add(1);
    if guard.next_id == INVALID_TASK_ID {
        guard.next_id = 1;
    }

    let stack_base = STACK_POOL.lock().acquire(slot);
    let context = fabricate_initial_context(stack_base, nanos_abi::config::TASK_STACK_SIZE as u64, entry, arg);
    guard.spawn_into_slot(slot, id, INVALID_TASK_ID, name, priority, stack_base, context, entry, arg as usize);
    Ok(id)
}

/// Create a task with a caller-chosen id. Rejected outright if any live task
/// already holds that id, rather than silently colliding two task records.
pub fn create_task_with_id(id: u32, name: &str, entry: TaskEntry, arg: *mut core::ffi::c_void, priority: TaskPriority) -> Result<u32, SyscallError> {
    if id == INVALID_TASK_ID {
        return Err(SyscallError::InvalidArgument);
    }

    let mut guard = SCHED.lock();
    if guard.find_slot_by_id(id).is_some() {
        return Err(SyscallError::Busy);
    }
    let slot = guard.find_free_slot().ok_or(SyscallError::OutOfMemory)?;

    let stack_base = STACK_POOL.lock().acquire(slot);
    let context = fabricate_initial_context(stack_base, nanos_abi::config::TASK_STACK_SIZE as u64, entry, arg);
    guard.spawn_into_slot(slot, id, INVALID_TASK_ID, name, priority, stack_base, context, entry, arg as usize);
    Ok(id)
}

/// Fork `parent_id`: spawns a new task beginning again at the parent's
/// original entry point, recorded as the child's parent (spec §4.3 `fork`).
///
/// This kernel has no paging or copy-on-write, so a child cannot literally
/// resume mid-function on a duplicated address space; it restarts the
/// parent's entry function on its own freshly allocated stack instead. The
/// spec calls this out explicitly as not POSIX-correct.
pub fn fork_task(parent_id: u32) -> Result<u32, SyscallError> {
    let (entry, arg, priority, name_buf, name_len) = {
        let guard = SCHED.lock();
        let slot = guard.find_slot_by_id(parent_id).ok_or(SyscallError::NoSuchEntry)?;
        let tcb = &guard.tasks[slot];
        let entry = tcb.entry.ok_or(SyscallError::Generic)?;
        (entry, tcb.arg, tcb.priority, tcb.name, tcb.name_len)
    };
    let name = core::str::from_utf8(&name_buf[..name_len as usize]).unwrap_or("child");

    let mut guard = SCHED.lock();
    let slot = guard.find_free_slot().ok_or(SyscallError::OutOfMemory)?;
    let id = guard.next_id;
    guard.next_id = guard.next_id.wrapping_add(1);
    if guard.next_id == INVALID_TASK_ID {
        guard.next_id = 1;
    }

    let stack_base = STACK_POOL.lock().acquire(slot);
    let context = fabricate_initial_context(
        stack_base,
        nanos_abi::config::TASK_STACK_SIZE as u64,
        entry,
        arg as *mut core::ffi::c_void,
    );
    guard.spawn_into_slot(slot, id, parent_id, name, priority, stack_base, context, entry, arg);
    Ok(id)
}

/// Reap the first zombie child of `parent_id`, recording its exit code in
/// `exit_code` if given, returning the reaped child's id (spec §4.3 `wait`).
pub fn reap_zombie_child(parent_id: u32) -> Option<u32> {
    let mut guard = SCHED.lock();
    let slot = guard.find_zombie_child(parent_id)?;
    let id = guard.tasks[slot].task_id;
    guard.tasks[slot].in_use = false;
    guard.total_tasks = guard.total_tasks.saturating_sub(1);
    Some(id)
}

/// Record an exit code on `id` and mark it zombie (spec §4.3 `exit`). The
/// slot itself is reclaimed by [`dispatch`] or [`reap_zombie_child`].
pub fn exit_task(id: u32, exit_code: i32) -> Result<(), SyscallError> {
    let mut guard = SCHED.lock();
    let slot = guard.find_slot_by_id(id).ok_or(SyscallError::NoSuchEntry)?;
    if guard.tasks[slot].state == TaskState::Ready {
        let priority = guard.tasks[slot].priority;
        let state = &mut *guard;
        state.queues[priority.index()].remove(&mut state.tasks, slot as u8);
    }
    guard.tasks[slot].state = TaskState::Zombie;
    guard.tasks[slot].exit_code = exit_code;
    Ok(())
}

/// Locate `id`, unlink it from its ready queue if present, and mark it
/// zombie. The slot itself is reclaimed by the next [`dispatch`] pass, since
/// a task cannot safely free the stack it may currently be running on.
pub fn destroy_task(id: u32) -> Result<(), SyscallError> {
    let mut guard = SCHED.lock();
    let slot = guard.find_slot_by_id(id).ok_or(SyscallError::NoSuchEntry)?;
    if guard.tasks[slot].state == TaskState::Ready {
        let priority = guard.tasks[slot].priority;
        let state = &mut *guard;
        state.queues[priority.index()].remove(&mut state.tasks, slot as u8);
    }
    guard.tasks[slot].state = TaskState::Zombie;
    Ok(())
}

/// Mark every non-idle task zombie. Used by the `selftest` harness between
/// scenarios so each one starts from a clean task table.
pub fn kill_all_except_idle() {
    let mut guard = SCHED.lock();
    for slot in 0..MAX_TASKS {
        if guard.tasks[slot].in_use && !guard.tasks[slot].is_idle() {
            if guard.tasks[slot].state == TaskState::Ready {
                let priority = guard.tasks[slot].priority;
                let state = &mut *guard;
                state.queues[priority.index()].remove(&mut state.tasks, slot as u8);
            }
            guard.tasks[slot].state = TaskState::Zombie;
        }
    }
}

pub fn current_task_id() -> Option<u32> {
    let guard = SCHED.lock();
    if guard.current == QUEUE_SENTINEL {
        None
    } else {
        Some(guard.tasks[guard.current as usize].task_id)
    }
}

pub fn stats() -> SchedulerStats {
    SCHED.lock().stats
}

pub fn task_count() -> u32 {
    SCHED.lock().total_tasks
}

/// Run one dispatch pass: reap zombies, select a successor, switch to it if
/// it differs from the currently running task (spec §4.2 "Dispatch").
pub fn dispatch() {
    let mut guard = SCHED.lock();
    guard.reap_zombies();

    let chosen = match guard.select_next() {
        Some(next) => next,
        None => match guard.current {
            QUEUE_SENTINEL => {
                drop(guard);
                return;
            }
            current if guard.tasks[current as usize].is_idle() => {
                drop(guard);
                return;
            }
            current => {
                guard.tasks[current as usize].time_slice_remaining = guard.tasks[current as usize].time_slice_ticks;
                drop(guard);
                return;
            }
        },
    };

    let previous = guard.current;
    if previous == chosen {
        guard.tasks[chosen as usize].time_slice_remaining = guard.tasks[chosen as usize].time_slice_ticks;
        drop(guard);
        return;
    }

    if previous != QUEUE_SENTINEL && guard.tasks[previous as usize].state == TaskState::Running {
        guard.tasks[previous as usize].state = TaskState::Ready;
        let priority = guard.tasks[previous as usize].priority;
        let state = &mut *guard;
        state.queues[priority.index()].push_back(&mut state.tasks, previous);
    }

    guard.tasks[chosen as usize].state = TaskState::Running;
    guard.tasks[chosen as usize].time_slice_remaining = guard.tasks[chosen as usize].time_slice_ticks;
    guard.current = chosen;
    guard.stats.context_switches += 1;

    let old_ctx: *mut nanos_abi::task::CpuContext = if previous != QUEUE_SENTINEL {
        &mut guard.tasks[previous as usize].context as *mut _
    } else {
        core::ptr::null_mut()
    };
    let new_ctx: *const nanos_abi::task::CpuContext = &guard.tasks[chosen as usize].context as *const _;

    drop(guard);

    // SAFETY: old_ctx/new_ctx point into the static task pool, which
    // outlives both the save and the restore below.
    unsafe {
        if old_ctx.is_null() {
            context_restore(new_ctx);
        } else {
            context_save(old_ctx);
            context_restore(new_ctx);
        }
    }
}

/// Voluntary yield: same dispatch pass, tracked separately for statistics.
pub fn yield_now() {
    SCHED.lock().stats.voluntary_yields += 1;
    dispatch();
}

/// Timer tick callback (spec §4.2 "Preemption policy"). Advances runtime
/// accounting and decides whether this tick should trigger a dispatch pass.
pub fn on_tick() {
    let should_dispatch = {
        let mut guard = SCHED.lock();
        guard.stats.ticks_observed += 1;
        guard.ticks_since_force += 1;

        if guard.current == QUEUE_SENTINEL {
            guard.stats.idle_ticks += 1;
            false
        } else {
            let current = guard.current as usize;
            guard.tasks[current].total_runtime_ticks += 1;
            if guard.tasks[current].time_slice_remaining > 0 {
                guard.tasks[current].time_slice_remaining -= 1;
            }
            if guard.tasks[current].is_idle() {
                guard.stats.idle_ticks += 1;
            }

            let force = guard.ticks_since_force >= FORCED_RESCHEDULE_INTERVAL_TICKS;
            let quantum_expired = guard.tasks[current].time_slice_remaining == 0;
            if force {
                guard.ticks_since_force = 0;
            }
            force || (quantum_expired && guard.total_tasks > 1)
        }
    };

    if should_dispatch {
        dispatch();
    }
}
