use std::any::{type_name, TypeId};
use std::fmt;
use std::mem;
use std::sync::{Arc, Weak};

use tracing::trace;

#[cfg(feature = "tokio")]
use crate::event_loop::{Delivery, LoopHandle};
use crate::{IntoSlotResult, Kwargs, Result, Signature, SignalSlotError, SlotResult, Value};

/// A callable that can be invoked by a slot.
///
/// Implemented for every `Fn(&Kwargs) -> R` where `R:` [`IntoSlotResult`].
pub trait SlotFn: Send + Sync + 'static {
    fn call(&self, kwargs: &Kwargs) -> SlotResult;
}

impl<F, R> SlotFn for F
where
    F: Fn(&Kwargs) -> R + Send + Sync + 'static,
    R: IntoSlotResult,
{
    fn call(&self, kwargs: &Kwargs) -> SlotResult { self(kwargs).into_slot_result() }
}

/// Trait for types that can be converted into slots, so `connect` accepts raw callables.
pub trait IntoSlot {
    fn into_slot(self) -> Slot;
}

impl IntoSlot for Slot {
    fn into_slot(self) -> Slot { self }
}

impl<F> IntoSlot for F
where F: SlotFn
{
    fn into_slot(self) -> Slot { Slot::new(self) }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum Identity {
    /// Zero-sized callables (fn items, non-capturing closures) have a unique type each.
    Type { id: TypeId, name: &'static str },
    /// Address of a shared allocation.
    Address(usize),
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Type { name, .. } => write!(f, "fn {name}"),
            Identity::Address(address) => write!(f, "callable@{address:#x}"),
        }
    }
}

/// Identity of a callable.
///
/// Named functions and non-capturing closures are identified by their type, so wrapping the same
/// function twice yields equal slots. Other callables are identified by the address of their shared
/// allocation. Bound methods pair the owner's address with the address of the method function.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct CallableId {
    target: Identity,
    method: Option<usize>,
}

impl fmt::Display for CallableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.method {
            None => fmt::Display::fmt(&self.target, f),
            Some(method) => write!(f, "method {:#x} of {}", method, self.target),
        }
    }
}

fn arc_id<T: ?Sized>(arc: &Arc<T>) -> usize { Arc::as_ptr(arc) as *const () as usize }

fn identity<F: SlotFn>(func: &Arc<F>) -> Identity {
    if mem::size_of::<F>() == 0 {
        Identity::Type { id: TypeId::of::<F>(), name: type_name::<F>() }
    } else {
        Identity::Address(arc_id(func))
    }
}

/// A live callable resolved from a [`Slot`].
#[derive(Clone)]
pub struct Callable {
    id: CallableId,
    func: Arc<dyn SlotFn>,
}

impl Callable {
    pub fn id(&self) -> CallableId { self.id }

    /// Invokes the callable, attributing any error to it.
    pub fn invoke(&self, kwargs: &Kwargs) -> Result<Option<Value>> {
        self.func.call(kwargs).map_err(|source| SignalSlotError::SlotFailed { slot: self.to_string(), source })
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool { self.id == other.id }
}
impl Eq for Callable {}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.debug_tuple("Callable").field(&self.id).finish() }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Display::fmt(&self.id, f) }
}

/// A method bound to an owner, strongly or weakly.
trait MethodRef: Send + Sync {
    fn id(&self) -> CallableId;
    fn is_weak(&self) -> bool;
    fn is_alive(&self) -> bool;
    /// Re-binds the method to its owner, if the owner is still around.
    fn bind(&self) -> Option<Arc<dyn SlotFn>>;
}

enum Owner<T> {
    Strong(Arc<T>),
    Weak(Weak<T>),
}

struct BoundMethod<T, R> {
    owner: Owner<T>,
    owner_id: usize,
    method: fn(&T, &Kwargs) -> R,
}

impl<T, R> MethodRef for BoundMethod<T, R>
where
    T: Send + Sync + 'static,
    R: IntoSlotResult + 'static,
{
    fn id(&self) -> CallableId { CallableId { target: Identity::Address(self.owner_id), method: Some(self.method as usize) } }

    fn is_weak(&self) -> bool { matches!(self.owner, Owner::Weak(_)) }

    fn is_alive(&self) -> bool {
        match &self.owner {
            Owner::Strong(_) => true,
            Owner::Weak(owner) => owner.strong_count() > 0,
        }
    }

    fn bind(&self) -> Option<Arc<dyn SlotFn>> {
        let owner = match &self.owner {
            Owner::Strong(owner) => owner.clone(),
            Owner::Weak(owner) => owner.upgrade()?,
        };
        let method = self.method;
        let bound: Arc<dyn SlotFn> = Arc::new(move |kwargs: &Kwargs| method(&owner, kwargs));
        Some(bound)
    }
}

#[derive(Clone)]
enum Target {
    Strong { id: Identity, func: Arc<dyn SlotFn> },
    Weak { id: Identity, func: Weak<dyn SlotFn> },
    Method(Arc<dyn MethodRef>),
}

#[derive(Clone)]
enum Dispatch {
    Direct,
    #[cfg(feature = "tokio")]
    Loop { handle: LoopHandle, delivery: Delivery },
}

/// A subscriber callable, held strongly or weakly.
///
/// Slots compare equal when they resolve to the same callable, so two wrappers around the same
/// target are interchangeable for connecting and disconnecting. Dead slots compare equal to each other.
#[derive(Clone)]
pub struct Slot {
    target: Target,
    signature: Signature,
    dispatch: Dispatch,
}

impl Slot {
    fn with_target(target: Target) -> Self { Self { target, signature: Signature::any(), dispatch: Dispatch::Direct } }

    /// Wraps `func` in a new strongly held slot.
    pub fn new<F: SlotFn>(func: F) -> Self { Self::from_arc(Arc::new(func)) }

    /// Holds `func` strongly, sharing its identity with every other slot made from the same `Arc`.
    pub fn from_arc<F: SlotFn>(func: Arc<F>) -> Self {
        let id = identity(&func);
        let func: Arc<dyn SlotFn> = func;
        Self::with_target(Target::Strong { id, func })
    }

    /// Holds `func` weakly. The slot dies once every `Arc` to it is dropped.
    pub fn weak<F: SlotFn>(func: &Arc<F>) -> Self {
        let weak: Weak<dyn SlotFn> = Arc::downgrade(func) as Weak<dyn SlotFn>;
        Self::with_target(Target::Weak { id: identity(func), func: weak })
    }

    /// Binds `method` to `owner`, keeping the owner alive.
    pub fn method<T, R>(owner: Arc<T>, method: fn(&T, &Kwargs) -> R) -> Self
    where
        T: Send + Sync + 'static,
        R: IntoSlotResult + 'static,
    {
        let owner_id = arc_id(&owner);
        Self::with_target(Target::Method(Arc::new(BoundMethod { owner: Owner::Strong(owner), owner_id, method })))
    }

    /// Binds `method` to a weak back-reference to `owner`.
    ///
    /// The owner can be dropped independently; the slot then reports itself dead and invoking it is a no-op.
    pub fn weak_method<T, R>(owner: &Arc<T>, method: fn(&T, &Kwargs) -> R) -> Self
    where
        T: Send + Sync + 'static,
        R: IntoSlotResult + 'static,
    {
        let owner_id = arc_id(owner);
        Self::with_target(Target::Method(Arc::new(BoundMethod { owner: Owner::Weak(Arc::downgrade(owner)), owner_id, method })))
    }

    /// Declares the parameters this slot handles. Defaults to [`Signature::any`].
    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    /// Dispatches invocations onto `handle`'s event loop instead of calling in place.
    #[cfg(feature = "tokio")]
    pub fn on_loop(mut self, handle: &LoopHandle, delivery: Delivery) -> Self {
        self.dispatch = Dispatch::Loop { handle: handle.clone(), delivery };
        self
    }

    pub fn signature(&self) -> &Signature { &self.signature }

    pub fn is_weak(&self) -> bool {
        match &self.target {
            Target::Strong { .. } => false,
            Target::Weak { .. } => true,
            Target::Method(method) => method.is_weak(),
        }
    }

    /// True unless the slot is weak and its target has been dropped.
    pub fn is_alive(&self) -> bool {
        match &self.target {
            Target::Strong { .. } => true,
            Target::Weak { func, .. } => func.strong_count() > 0,
            Target::Method(method) => method.is_alive(),
        }
    }

    /// Identity of the target, or `None` for a dead weak slot. Never resolves the target.
    pub fn id(&self) -> Option<CallableId> {
        match &self.target {
            Target::Strong { id, .. } => Some(CallableId { target: *id, method: None }),
            Target::Weak { id, func } => (func.strong_count() > 0).then_some(CallableId { target: *id, method: None }),
            Target::Method(method) => method.is_alive().then(|| method.id()),
        }
    }

    /// Resolves the live callable, or `None` for a dead weak slot.
    pub fn func(&self) -> Option<Callable> {
        match &self.target {
            Target::Strong { id, func } => Some(Callable { id: CallableId { target: *id, method: None }, func: func.clone() }),
            Target::Weak { id, func } => func.upgrade().map(|func| Callable { id: CallableId { target: *id, method: None }, func }),
            Target::Method(method) => method.bind().map(|func| Callable { id: method.id(), func }),
        }
    }

    /// Invokes the slot. A dead slot silently returns `Ok(None)`.
    pub fn call(&self, kwargs: &Kwargs) -> Result<Option<Value>> {
        let Some(func) = self.func() else {
            trace!("Slot.call skipping dead slot");
            return Ok(None);
        };
        match &self.dispatch {
            Dispatch::Direct => func.invoke(kwargs),
            #[cfg(feature = "tokio")]
            Dispatch::Loop { handle, delivery } => handle.dispatch(func, kwargs, *delivery),
        }
    }
}

impl PartialEq for Slot {
    /// Compares identities only, so comparing under a signal's lock never takes or drops a strong
    /// reference to a weakly held target.
    fn eq(&self, other: &Self) -> bool { self.id() == other.id() }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot").field("id", &self.id()).field("weak", &self.is_weak()).field("signature", &self.signature).finish()
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id() {
            Some(id) => write!(f, "<Slot: {id}>"),
            None => write!(f, "<Slot: dead>"),
        }
    }
}
