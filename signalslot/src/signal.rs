pub mod registry;

pub use registry::*;

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::{IntoSlot, Kwargs, Result, SignalSlotError, Slot, Value};

const NO_NAME: &str = "NO_NAME";

struct Inner<R> {
    name: Option<String>,
    args: Vec<String>,
    slots: R,
}

/// A named broadcast point that slots subscribe to.
///
/// Cloning a `Signal` yields another handle to the same slot list.
/// `R` selects whether the slot list is guarded by a lock, see [`Local`] and [`ThreadSafe`].
pub struct Signal<R: Registry = Local>(Arc<Inner<R>>);

impl<R: Registry> Clone for Signal<R> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

/// Builds a [`Signal`] with an optional name and declared args.
#[derive(Debug, Clone, Default)]
pub struct SignalBuilder {
    name: Option<String>,
    args: Vec<String>,
}

impl SignalBuilder {
    pub fn new() -> Self { Self::default() }

    /// Name used in diagnostics only.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Argument names every emission promises to pass. Connected slots must declare exactly these.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Signal { self.build_with() }

    pub fn build_threadsafe(self) -> Signal<ThreadSafe> { self.build_with() }

    /// Builds a signal with any [`Registry`].
    pub fn build_with<R: Registry>(self) -> Signal<R> { Signal(Arc::new(Inner { name: self.name, args: self.args, slots: R::default() })) }
}

impl Signal {
    /// Creates an unnamed signal without an argument contract.
    pub fn new() -> Self { SignalBuilder::new().build() }

    pub fn builder() -> SignalBuilder { SignalBuilder::new() }
}

impl Default for Signal {
    fn default() -> Self { Self::new() }
}

impl Signal<ThreadSafe> {
    pub fn new_threadsafe() -> Self { SignalBuilder::new().build_threadsafe() }
}

impl<R: Registry> Signal<R> {
    pub fn name(&self) -> Option<&str> { self.0.name.as_deref() }

    /// The declared argument names. Empty means no contract is enforced.
    pub fn args(&self) -> &[String] { &self.0.args }

    /// Connects a slot to this signal.
    ///
    /// Raw callables are wrapped in a strongly held [`Slot`] accepting any keywords.
    /// Connecting an already connected slot is a no-op.
    ///
    /// # Errors
    ///
    /// [`SignalSlotError::SlotMustAcceptKeywords`] if the slot's signature has no keyword catch-all,
    /// then [`SignalSlotError::IncompatibleSlotSignature`] if it doesn't match the declared args.
    pub fn connect(&self, slot: impl IntoSlot) -> Result<()> {
        let slot = slot.into_slot();

        if !slot.signature().accepts_keywords() {
            return Err(SignalSlotError::SlotMustAcceptKeywords { signal: self.to_string(), slot: slot.to_string() });
        }

        if !self.is_compatible(&slot) {
            return Err(SignalSlotError::IncompatibleSlotSignature {
                signal: self.to_string(),
                slot: slot.to_string(),
                expected: self.0.args.clone(),
                found: slot.signature().clone(),
            });
        }

        let description = slot.to_string();
        let duplicate = self.0.slots.write(move |slots| {
            if slots.contains(&slot) {
                return Some(slot);
            }
            slots.push(slot);
            None
        });

        match duplicate {
            Some(_) => debug!("{}.connect {} already connected", self, description),
            None => debug!("{}.connect {}", self, description),
        }
        Ok(())
    }

    /// Whether a slot resolving to the same callable is connected.
    pub fn is_connected(&self, slot: &Slot) -> bool { self.0.slots.read(|slots| slots.contains(slot)) }

    /// Alias of [`Signal::is_connected`].
    pub fn connected(&self, slot: &Slot) -> bool { self.is_connected(slot) }

    /// Disconnects a previously connected slot.
    ///
    /// # Errors
    ///
    /// [`SignalSlotError::NotConnected`] if no equal slot is connected.
    pub fn disconnect(&self, slot: &Slot) -> Result<()> {
        let removed = self.0.slots.write(|slots| {
            let index = slots.iter().position(|connected| connected == slot)?;
            Some(slots.remove(index))
        });

        match removed {
            // The removed slot is dropped here, outside the registry, as dropping it may run arbitrary code.
            Some(removed) => {
                debug!("{}.disconnect {}", self, removed);
                Ok(())
            }
            None => Err(SignalSlotError::NotConnected { signal: self.to_string(), slot: slot.to_string() }),
        }
    }

    /// Calls every connected slot in connection order with `kwargs`.
    ///
    /// Returns the first value that is not absent, without calling the remaining slots.
    /// Slots are snapshotted first, so slots connected or disconnected during emission
    /// don't affect the ongoing pass.
    ///
    /// # Errors
    ///
    /// The first error raised by a slot, aborting the remaining slots.
    pub fn emit(&self, kwargs: &Kwargs) -> Result<Option<Value>> {
        let slots = self.slots();
        trace!("{}.emit to {} slots", self, slots.len());

        for slot in &slots {
            if let Some(value) = slot.call(kwargs)? {
                trace!("{}.emit short-circuited by {}", self, slot);
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Whether `slot`'s declared parameters match this signal's declared args.
    pub fn is_compatible(&self, slot: &Slot) -> bool { slot.signature().matches(&self.0.args) }

    /// Snapshot of the connected slots, in connection order.
    pub fn slots(&self) -> Vec<Slot> { self.0.slots.read(<[Slot]>::to_vec) }

    pub fn len(&self) -> usize { self.0.slots.read(<[Slot]>::len) }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl<R: Registry> PartialEq for Signal<R> {
    /// Signals are equal when their slot lists are equal, element-wise.
    fn eq(&self, other: &Self) -> bool {
        // Never hold both locks at once.
        let slots = self.slots();
        other.0.slots.read(|others| slots == others)
    }
}

impl<R: Registry> fmt::Display for Signal<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "<Signal: {}>", self.name().unwrap_or(NO_NAME)) }
}

impl<R: Registry> fmt::Debug for Signal<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal").field("name", &self.name()).field("args", &self.0.args).field("slots", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{kwargs, Signature};

    #[test]
    fn test_connect_is_idempotent() {
        let signal = Signal::new();
        let slot = Slot::new(|_: &Kwargs| ());

        signal.connect(slot.clone()).unwrap();
        signal.connect(slot.clone()).unwrap();

        assert!(signal.is_connected(&slot));
        assert_eq!(signal.len(), 1);
    }

    #[test]
    fn test_disconnect() {
        let signal = Signal::new();
        let slot = Slot::new(|_: &Kwargs| ());

        signal.connect(slot.clone()).unwrap();
        signal.disconnect(&slot).unwrap();
        assert!(!signal.connected(&slot));

        assert!(matches!(signal.disconnect(&slot), Err(SignalSlotError::NotConnected { .. })));
    }

    #[test]
    fn test_keywords_are_checked_before_args() {
        let signal = Signal::builder().args(["x"]).build();

        let err = signal.connect(Slot::new(|_: &Kwargs| ()).with_signature(Signature::new(["x"]))).unwrap_err();
        assert!(matches!(err, SignalSlotError::SlotMustAcceptKeywords { .. }));

        let err = signal.connect(Slot::new(|_: &Kwargs| ()).with_signature(Signature::keywords(["y"]))).unwrap_err();
        assert!(matches!(err, SignalSlotError::IncompatibleSlotSignature { .. }));
        assert!(signal.is_empty());

        signal.connect(Slot::new(|_: &Kwargs| ()).with_signature(Signature::keywords(["x"]))).unwrap();
        assert_eq!(signal.len(), 1);
    }

    #[test]
    fn test_reentrant_connect_during_emit() {
        let signal = Signal::new_threadsafe();
        let inner = signal.clone();
        signal
            .connect(move |_: &Kwargs| {
                inner.connect(|_: &Kwargs| ()).unwrap();
            })
            .unwrap();

        // The slot connected mid-emit is not part of the ongoing pass.
        signal.emit(&kwargs! {}).unwrap();
        assert_eq!(signal.len(), 2);
        // Connecting the same closure again is a no-op.
        signal.emit(&kwargs! {}).unwrap();
        assert_eq!(signal.len(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(Signal::new().to_string(), "<Signal: NO_NAME>");
        assert_eq!(Signal::builder().name("conf_pre_load").build().to_string(), "<Signal: conf_pre_load>");
    }
}
