use std::collections::VecDeque;

use tracing::trace;

use crate::{Kwargs, Local, Registry, Result, Signal};

/// Defers emissions: [`Queue::queue`] records them and [`Queue::flush`] replays them in order.
///
/// ```rust
/// use signalslot::{kwargs, Kwargs, Queue, Signal};
///
/// let something = Signal::new();
/// something.connect(|kwargs: &Kwargs| println!("I did something with {kwargs:?}")).unwrap();
///
/// let mut queue = Queue::new();
/// queue.queue(&something, kwargs! {});
/// queue.queue(&something, kwargs! { "foo" => "bar" });
/// queue.flush().unwrap();
/// assert!(queue.is_empty());
/// ```
pub struct Queue<R: Registry = Local> {
    pending: VecDeque<(Signal<R>, Kwargs)>,
}

impl<R: Registry> Default for Queue<R> {
    fn default() -> Self { Self { pending: VecDeque::new() } }
}

impl Queue {
    pub fn new() -> Self { Self::default() }
}

impl<R: Registry> Queue<R> {
    pub fn queue(&mut self, signal: &Signal<R>, kwargs: Kwargs) { self.pending.push_back((signal.clone(), kwargs)); }

    /// Emits every queued signal, oldest first, until the queue is empty.
    ///
    /// # Errors
    ///
    /// The first slot error. Emissions queued after the failing one stay queued.
    pub fn flush(&mut self) -> Result<()> {
        trace!("Queue.flush {} emissions", self.pending.len());
        while let Some((signal, kwargs)) = self.pending.pop_front() {
            signal.emit(&kwargs)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize { self.pending.len() }

    pub fn is_empty(&self) -> bool { self.pending.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{kwargs, SignalSlotError, Value};
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_flush_replays_in_order() {
        let signal = Signal::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            signal.connect(move |kwargs: &Kwargs| seen.lock().unwrap().push(kwargs.clone())).unwrap();
        }

        let mut queue = Queue::new();
        queue.queue(&signal, kwargs! {});
        queue.queue(&signal, kwargs! { "x" => 1 });
        assert_eq!(queue.len(), 2);
        assert!(seen.lock().unwrap().is_empty());

        queue.flush().unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![kwargs! {}, kwargs! { "x" => 1 }]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_failure_keeps_the_rest() {
        let signal = Signal::new();
        signal
            .connect(|kwargs: &Kwargs| -> anyhow::Result<()> {
                anyhow::ensure!(kwargs.get("fail") != Some(&Value::Bool(true)), "asked to fail");
                Ok(())
            })
            .unwrap();

        let mut queue = Queue::new();
        queue.queue(&signal, kwargs! { "fail" => true });
        queue.queue(&signal, kwargs! {});

        assert!(matches!(queue.flush(), Err(SignalSlotError::SlotFailed { .. })));
        assert_eq!(queue.len(), 1);
        queue.flush().unwrap();
    }
}
