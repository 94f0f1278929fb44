use std::cell::RefCell;

use parking_lot::ReentrantMutex;

use crate::Slot;

/// Storage strategy for a signal's ordered slot list.
///
/// Closures passed to [`Registry::read`] and [`Registry::write`] must not call back into the signal.
pub trait Registry: Default + 'static {
    fn read<T>(&self, f: impl FnOnce(&[Slot]) -> T) -> T;
    fn write<T>(&self, f: impl FnOnce(&mut Vec<Slot>) -> T) -> T;
}

/// Single-threaded registry without any locking. Signals using it are `!Send`.
#[derive(Default)]
pub struct Local(RefCell<Vec<Slot>>);

impl Registry for Local {
    fn read<T>(&self, f: impl FnOnce(&[Slot]) -> T) -> T { f(&self.0.borrow()) }

    fn write<T>(&self, f: impl FnOnce(&mut Vec<Slot>) -> T) -> T { f(&mut self.0.borrow_mut()) }
}

/// Registry guarded by a per-signal re-entrant lock, so the same thread may re-enter the signal from slots.
pub struct ThreadSafe(ReentrantMutex<RefCell<Vec<Slot>>>);

impl Default for ThreadSafe {
    fn default() -> Self { Self(ReentrantMutex::new(RefCell::new(Vec::new()))) }
}

impl Registry for ThreadSafe {
    fn read<T>(&self, f: impl FnOnce(&[Slot]) -> T) -> T {
        let guard = self.0.lock();
        let slots = guard.borrow();
        f(&slots)
    }

    fn write<T>(&self, f: impl FnOnce(&mut Vec<Slot>) -> T) -> T {
        let guard = self.0.lock();
        let mut slots = guard.borrow_mut();
        f(&mut slots)
    }
}
