//! Slots that run on a dedicated event loop instead of the emitting thread.
//!
//! An [`EventLoop`] owns a thread driving a current-thread tokio runtime, which runs queued callbacks
//! one at a time in FIFO order. Callbacks may `tokio::spawn` follow-up work onto the same loop; it runs
//! whenever the loop is waiting for callbacks, and is dropped unfinished when the loop stops.
//! Bind a slot to a loop with [`Slot::on_loop`](crate::Slot::on_loop).

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc as oneshot, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::{Callable, Kwargs, Result, SignalSlotError, Value};

static NEXT_LOOP_ID: AtomicUsize = AtomicUsize::new(1);

thread_local! {
    static CURRENT_LOOP: Cell<Option<usize>> = const { Cell::new(None) };
}

type Callback = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Callback),
    Stop,
}

/// How a loop-bound slot hands its invocation to the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queue the call and return immediately. The emitting signal always sees an absent result.
    Detached,
    /// Wait for the loop to run the call and forward its result.
    /// Calls made from the loop's own thread run in place.
    Blocking,
    /// Like [`Delivery::Blocking`], but gives up with [`SignalSlotError::Timeout`] after the given duration.
    BlockingTimeout(Duration),
}

/// A cloneable reference to a running [`EventLoop`].
#[derive(Clone)]
pub struct LoopHandle {
    id: usize,
    name: Arc<str>,
    sender: mpsc::UnboundedSender<Message>,
}

impl fmt::Debug for LoopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.debug_struct("LoopHandle").field("id", &self.id).field("name", &self.name).finish() }
}

impl LoopHandle {
    pub fn name(&self) -> &str { &self.name }

    /// Whether the calling thread is this loop's thread.
    pub fn is_current(&self) -> bool { CURRENT_LOOP.with(|current| current.get() == Some(self.id)) }

    /// Queues `callback` to run on the loop.
    ///
    /// # Errors
    ///
    /// [`SignalSlotError::LoopClosed`] once the loop has stopped.
    pub fn add_callback(&self, callback: impl FnOnce() + Send + 'static) -> Result<()> {
        self.sender.send(Message::Run(Box::new(callback))).map_err(|_| SignalSlotError::LoopClosed(self.name.to_string()))
    }

    pub(crate) fn dispatch(&self, func: Callable, kwargs: &Kwargs, delivery: Delivery) -> Result<Option<Value>> {
        match delivery {
            Delivery::Detached => {
                let kwargs = kwargs.clone();
                let name = self.name.clone();
                self.add_callback(move || {
                    if let Err(err) = func.invoke(&kwargs) {
                        warn!("EventLoop {} detached call to {} failed: {}", name, func, err);
                    }
                })?;
                Ok(None)
            }
            Delivery::Blocking => self.call_blocking(func, kwargs, None),
            Delivery::BlockingTimeout(timeout) => self.call_blocking(func, kwargs, Some(timeout)),
        }
    }

    fn call_blocking(&self, func: Callable, kwargs: &Kwargs, timeout: Option<Duration>) -> Result<Option<Value>> {
        // Waiting on ourselves would never finish.
        if self.is_current() {
            return func.invoke(kwargs);
        }

        let (sender, receiver) = oneshot::sync_channel(1);
        let kwargs = kwargs.clone();
        self.add_callback(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| func.invoke(&kwargs)));
            // The caller may have timed out already.
            let _ = sender.send(outcome);
        })?;

        let outcome = match timeout {
            None => receiver.recv().map_err(|_| SignalSlotError::LoopClosed(self.name.to_string()))?,
            Some(timeout) => receiver.recv_timeout(timeout).map_err(|err| match err {
                oneshot::RecvTimeoutError::Timeout => SignalSlotError::Timeout { name: self.name.to_string(), timeout },
                oneshot::RecvTimeoutError::Disconnected => SignalSlotError::LoopClosed(self.name.to_string()),
            })?,
        };

        match outcome {
            Ok(result) => result,
            Err(panic) => panic::resume_unwind(panic),
        }
    }
}

/// A named thread running queued callbacks.
///
/// Dropping the loop (or calling [`EventLoop::shutdown`]) stops it after the callbacks queued so far,
/// and joins its thread. Handles outliving the loop fail with [`SignalSlotError::LoopClosed`].
pub struct EventLoop {
    handle: LoopHandle,
    thread: Option<JoinHandle<()>>,
}

impl EventLoop {
    /// Starts a new loop thread called `name`.
    ///
    /// # Errors
    ///
    /// [`SignalSlotError::Spawn`] if the runtime or the thread can't be created.
    pub fn spawn(name: impl Into<String>) -> Result<Self> {
        let name: String = name.into();
        let id = NEXT_LOOP_ID.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        let thread = thread::Builder::new().name(name.clone()).spawn(move || run(id, runtime, receiver))?;

        debug!("EventLoop {} started", name);
        Ok(Self { handle: LoopHandle { id, name: name.into(), sender }, thread: Some(thread) })
    }

    pub fn handle(&self) -> &LoopHandle { &self.handle }

    /// Stops the loop once the callbacks queued so far have run, and waits for its thread.
    pub fn shutdown(mut self) { self.stop() }

    fn stop(&mut self) {
        let Some(thread) = self.thread.take() else { return };
        // A closed channel means the thread is already gone.
        let _ = self.handle.sender.send(Message::Stop);

        if self.handle.is_current() {
            // Dropped from one of its own callbacks; the loop exits once that callback returns.
            return;
        }
        if thread.join().is_err() {
            error!("EventLoop {} thread panicked", self.handle.name);
        }
        debug!("EventLoop {} stopped", self.handle.name);
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) { self.stop() }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.debug_struct("EventLoop").field("handle", &self.handle).finish() }
}

fn run(id: usize, runtime: Runtime, mut receiver: mpsc::UnboundedReceiver<Message>) {
    CURRENT_LOOP.with(|current| current.set(Some(id)));

    runtime.block_on(async move {
        while let Some(message) = receiver.recv().await {
            match message {
                Message::Run(callback) => {
                    if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(callback)) {
                        error!("EventLoop callback panicked: {}", panic_message(&*panic));
                    }
                }
                Message::Stop => break,
            }
        }
    });
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic.downcast_ref::<&str>().copied().or_else(|| panic.downcast_ref::<String>().map(String::as_str)).unwrap_or("Box<dyn Any>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn test_callbacks_run_on_loop_thread() {
        let event_loop = EventLoop::spawn("callbacks").unwrap();
        let handle = event_loop.handle().clone();
        assert!(!handle.is_current());

        let (sender, receiver) = oneshot::channel();
        let inner = handle.clone();
        handle
            .add_callback(move || {
                sender.send((inner.is_current(), thread::current().name().map(str::to_owned))).unwrap();
            })
            .unwrap();

        assert_eq!(receiver.recv().unwrap(), (true, Some("callbacks".to_owned())));
    }

    #[test]
    fn test_panicking_callback_keeps_loop_alive() {
        let event_loop = EventLoop::spawn("resilient").unwrap();
        let handle = event_loop.handle();

        handle.add_callback(|| panic!("boom")).unwrap();

        let (sender, receiver) = oneshot::channel();
        handle.add_callback(move || sender.send(()).unwrap()).unwrap();
        receiver.recv().unwrap();
    }

    #[test]
    fn test_callbacks_may_spawn_onto_the_loop() {
        let event_loop = EventLoop::spawn("spawning").unwrap();
        let (sender, receiver) = oneshot::channel();

        event_loop
            .handle()
            .add_callback(move || {
                tokio::spawn(async move {
                    tokio::task::yield_now().await;
                    sender.send(thread::current().name().map(str::to_owned)).unwrap();
                });
            })
            .unwrap();

        assert_eq!(receiver.recv_timeout(Duration::from_secs(5)).unwrap(), Some("spawning".to_owned()));
    }

    #[test]
    fn test_spawned_work_is_dropped_on_stop() {
        let event_loop = EventLoop::spawn("abandoning").unwrap();
        let (sender, receiver) = oneshot::channel::<()>();

        event_loop
            .handle()
            .add_callback(move || {
                tokio::spawn(async move {
                    std::future::pending::<()>().await;
                    let _ = sender.send(());
                });
            })
            .unwrap();
        event_loop.shutdown();

        // The pending task, and the sender it owns, went away with the runtime.
        assert_eq!(receiver.recv_timeout(Duration::from_secs(5)), Err(oneshot::RecvTimeoutError::Disconnected));
    }

    #[test]
    fn test_shutdown_drains_queued_callbacks() {
        let event_loop = EventLoop::spawn("draining").unwrap();
        let handle = event_loop.handle().clone();
        let ran = Arc::new(AtomicBool::new(false));

        let flag = ran.clone();
        handle.add_callback(move || flag.store(true, Ordering::SeqCst)).unwrap();
        event_loop.shutdown();

        assert!(ran.load(Ordering::SeqCst));
        assert!(matches!(handle.add_callback(|| ()), Err(SignalSlotError::LoopClosed(name)) if name == "draining"));
    }
}
