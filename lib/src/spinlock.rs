use core::cell::UnsafeCell;
use core::hint::spin_loop;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

use x86_64::instructions::interrupts;

/// Minimal spinlock helper with IRQ save/restore.
///
/// This is the only synchronization primitive the filesystem, scheduler and
/// drivers crates use: the kernel is single-CPU, so there is never real
/// multi-core contention, but the timer ISR can still interleave with task
/// context, which is what the IRQ-disabling half of this type guards
/// against.
pub struct Spinlock {
    locked: AtomicBool,
}

/// Mutex that disables interrupts while held. Essential for kernel code that
/// may be accessed from both normal context and interrupt handlers.
///
/// Unlike `spin::Mutex`, this mutex saves the interrupt-enable state and
/// disables interrupts on lock acquisition, preventing deadlocks when an
/// interrupt fires while the lock is held.
pub struct IrqMutex<T> {
    lock: AtomicBool,
    data: UnsafeCell<T>,
}

// SAFETY: IrqMutex provides exclusive access through atomic locking with
// interrupts disabled, making it safe to share across contexts.
unsafe impl<T: Send> Send for IrqMutex<T> {}
unsafe impl<T: Send> Sync for IrqMutex<T> {}

/// RAII guard for IrqMutex. Restores interrupt state on drop.
pub struct IrqMutexGuard<'a, T> {
    mutex: &'a IrqMutex<T>,
    irqs_were_enabled: bool,
}

impl<T> IrqMutex<T> {
    #[inline]
    pub const fn new(data: T) -> Self {
        Self {
            lock: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    /// Acquire the lock, disabling interrupts. Returns a guard that releases
    /// the lock and restores interrupt state on drop.
    ///
    /// Interrupts remain disabled while spinning for the lock: re-enabling
    /// them would let a nested IRQ storm in while the lock is held, which on
    /// this kernel's fixed per-task stack size can overflow it.
    #[inline]
    pub fn lock(&self) -> IrqMutexGuard<'_, T> {
        let irqs_were_enabled = interrupts::are_enabled();
        interrupts::disable();

        while self
            .lock
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            spin_loop();
        }

        IrqMutexGuard {
            mutex: self,
            irqs_were_enabled,
        }
    }

    /// Try to acquire the lock without blocking. Returns None if already held.
    #[inline]
    pub fn try_lock(&self) -> Option<IrqMutexGuard<'_, T>> {
        let irqs_were_enabled = interrupts::are_enabled();
        interrupts::disable();

        if self
            .lock
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(IrqMutexGuard {
                mutex: self,
                irqs_were_enabled,
            })
        } else {
            if irqs_were_enabled {
                interrupts::enable();
            }
            None
        }
    }
}

impl<'a, T> Deref for IrqMutexGuard<'a, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        // SAFETY: we hold the lock exclusively.
        unsafe { &*self.mutex.data.get() }
    }
}

impl<'a, T> DerefMut for IrqMutexGuard<'a, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: we hold the lock exclusively.
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<'a, T> Drop for IrqMutexGuard<'a, T> {
    #[inline]
    fn drop(&mut self) {
        self.mutex.lock.store(false, Ordering::Release);
        if self.irqs_were_enabled {
            interrupts::enable();
        }
    }
}

impl Spinlock {
    #[inline(always)]
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
        }
    }

    #[inline(always)]
    pub fn lock(&self) {
        while self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            spin_loop();
        }
    }

    #[inline(always)]
    pub fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    /// Acquire the lock and disable interrupts, returning whether they were
    /// enabled beforehand.
    #[inline(always)]
    pub fn lock_irqsave(&self) -> bool {
        let irqs_were_enabled = interrupts::are_enabled();
        interrupts::disable();
        while self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            spin_loop();
        }
        irqs_were_enabled
    }

    /// Release the lock and restore the interrupt-enable state captured by
    /// `lock_irqsave`.
    #[inline(always)]
    pub fn unlock_irqrestore(&self, irqs_were_enabled: bool) {
        self.locked.store(false, Ordering::Release);
        if irqs_were_enabled {
            interrupts::enable();
        }
    }
}

impl Default for Spinlock {
    fn default() -> Self {
        Self::new()
    }
}
