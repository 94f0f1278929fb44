//! Recurring emission of a signal, serialised by semaphores.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{error, info};

use crate::{Kwargs, Registry, Result, Signal, Value};

/// Emits a signal with fixed kwargs, at most once at a time, and counts consecutive failures.
pub struct Task<R: Registry> {
    signal: Signal<R>,
    kwargs: Kwargs,
    logged: bool,
    failures: AtomicUsize,
    guard: Semaphore,
}

impl<R: Registry> Task<R> {
    pub fn new(signal: Signal<R>, kwargs: Kwargs) -> Self { Self { signal, kwargs, logged: false, failures: AtomicUsize::new(0), guard: Semaphore::new(1) } }

    /// Log failures instead of returning them.
    pub fn logged(mut self) -> Self {
        self.logged = true;
        self
    }

    pub fn signal(&self) -> &Signal<R> { &self.signal }

    pub fn kwargs(&self) -> &Kwargs { &self.kwargs }

    /// Number of runs that failed since the last successful one.
    pub fn failures(&self) -> usize { self.failures.load(Ordering::SeqCst) }

    /// Emits the signal while holding this task's own guard and then each of `semaphores`, in order.
    ///
    /// Returns whether the emission succeeded. Permits are released in reverse order of acquisition.
    ///
    /// # Errors
    ///
    /// A closed semaphore, or the slot error when the task is not [`logged`](Task::logged).
    pub async fn run(&self, semaphores: &[&Semaphore]) -> Result<bool> {
        let mut permits: Vec<SemaphorePermit<'_>> = Vec::with_capacity(semaphores.len() + 1);
        permits.push(self.guard.acquire().await?);
        for semaphore in semaphores {
            permits.push(semaphore.acquire().await?);
        }

        let outcome = self.emit();

        while let Some(permit) = permits.pop() {
            drop(permit);
        }

        match outcome {
            Ok(_) => {
                self.failures.store(0, Ordering::SeqCst);
                Ok(true)
            }
            Err(err) => {
                self.failures.fetch_add(1, Ordering::SeqCst);
                if self.logged {
                    error!("[{}] Raised exception: {}", self, err);
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }

    fn emit(&self) -> Result<Option<Value>> {
        if self.logged {
            info!("[{}] Running", self);
        }
        let result = self.signal.emit(&self.kwargs)?;
        if self.logged {
            info!("[{}] Completed", self);
        }
        Ok(result)
    }
}

impl<R: Registry> PartialEq for Task<R> {
    fn eq(&self, other: &Self) -> bool { self.signal == other.signal && self.kwargs == other.kwargs }
}

impl<R: Registry> fmt::Display for Task<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}: {}", self.signal, Value::Object(self.kwargs.clone())) }
}

impl<R: Registry> fmt::Debug for Task<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("signal", &self.signal).field("kwargs", &self.kwargs).field("failures", &self.failures()).finish()
    }
}

/// Shares tasks between callers: equal tasks are only registered once.
pub struct TaskRegistry<R: Registry> {
    tasks: Mutex<Vec<Arc<Task<R>>>>,
}

impl<R: Registry> Default for TaskRegistry<R> {
    fn default() -> Self { Self { tasks: Mutex::new(Vec::new()) } }
}

impl<R: Registry> TaskRegistry<R> {
    pub fn new() -> Self { Self::default() }

    /// Returns the registered task equal to `task`, registering `task` if there is none.
    pub fn get_or_register(&self, task: Task<R>) -> Arc<Task<R>> {
        let mut tasks = self.tasks.lock().expect("task registry lock is poisoned");
        if let Some(existing) = tasks.iter().find(|existing| ***existing == task) {
            return existing.clone();
        }
        let task = Arc::new(task);
        tasks.push(task.clone());
        task
    }

    /// Returns the registered task for `signal` and `kwargs`, creating it if needed.
    pub fn get_or_create(&self, signal: &Signal<R>, kwargs: Kwargs) -> Arc<Task<R>> { self.get_or_register(Task::new(signal.clone(), kwargs)) }

    pub fn len(&self) -> usize { self.tasks.lock().expect("task registry lock is poisoned").len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}
