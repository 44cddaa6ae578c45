//! The single process-wide spin lock: a test-and-set flag, acquire on
//! lock, release on unlock, serializing every public operation.

// loom's own `loom::cell::UnsafeCell` tracks aliasing through closures
// rather than a raw `.get()`; the guard's `Deref`/`DerefMut` pair needs a
// plain reference, so this keeps `std::cell::UnsafeCell` even under the
// loom cfg and leaves the atomic flag as the only thing loom replaces.
use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};

#[cfg(not(loom))]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(loom)]
use loom::sync::atomic::{AtomicBool, Ordering};

#[cfg(not(loom))]
fn cpu_relax() {
    std::hint::spin_loop();
}
#[cfg(loom)]
fn cpu_relax() {
    loom::thread::yield_now();
}

pub(crate) struct SpinLock<T> {
    locked: AtomicBool,
    inner: UnsafeCell<T>,
}

impl<T> SpinLock<T> {
    #[cfg(not(loom))]
    pub(crate) const fn new(value: T) -> Self {
        Self { locked: AtomicBool::new(false), inner: UnsafeCell::new(value) }
    }

    #[cfg(loom)]
    pub(crate) fn new(value: T) -> Self {
        Self { locked: AtomicBool::new(false), inner: UnsafeCell::new(value) }
    }

    pub(crate) fn lock(&self) -> SpinLockGuard<'_, T> {
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            cpu_relax();
        }
        SpinLockGuard { lock: self }
    }
}

// SAFETY: access to `inner` is exclusive while `locked` is held, which the
// CAS loop above guarantees.
unsafe impl<T: Send> Sync for SpinLock<T> {}
unsafe impl<T: Send> Send for SpinLock<T> {}

pub(crate) struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<'a, T> Deref for SpinLockGuard<'a, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        unsafe { &*self.lock.inner.get() }
    }
}

impl<'a, T> DerefMut for SpinLockGuard<'a, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        unsafe { &mut *self.lock.inner.get() }
    }
}

impl<'a, T> Drop for SpinLockGuard<'a, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}
