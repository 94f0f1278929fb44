//! Attributes fetched on first access by decoupled modules.
//!
//! Each type implementing [`DynamicState`] owns a static `fetch_attribute` signal, declared with
//! args `["obj", "name"]`. The first time a missing attribute is read, the signal is emitted with the
//! JSON serialisation of the object and the attribute name; the first slot returning a value provides it,
//! and it is stored so later reads don't emit again.
//!
//! ```rust
//! use serde::Serialize;
//! use signalslot::contrib::{Attributes, DynamicState};
//! use signalslot::{dynamic_state, Kwargs, Signature, Slot, Value};
//!
//! #[derive(Default, Serialize)]
//! struct YourObject {
//!     #[serde(skip)]
//!     attributes: Attributes,
//! }
//! dynamic_state!(YourObject, attributes);
//!
//! fn fetch_foo(kwargs: &Kwargs) -> Option<Value> {
//!     // not my responsibility otherwise
//!     (kwargs["name"] == "foo").then(|| Value::from("bar"))
//! }
//!
//! YourObject::fetch_attribute().connect(Slot::new(fetch_foo).with_signature(Signature::keywords(["obj", "name"]))).unwrap();
//!
//! let test = YourObject::default();
//! assert_eq!(test.attribute("foo").unwrap(), "bar");
//! assert!(test.attribute("oops").is_err());
//! ```

use std::sync::RwLock;

use serde::Serialize;
use tracing::debug;

use crate::{Kwargs, Result, Signal, SignalSlotError, ThreadSafe, Value};

/// Argument names of every `fetch_attribute` signal.
pub const FETCH_ATTRIBUTE_ARGS: [&str; 2] = ["obj", "name"];

/// Storage for fetched attributes.
#[derive(Debug, Default)]
pub struct Attributes(RwLock<Kwargs>);

impl Attributes {
    pub fn get(&self, name: &str) -> Option<Value> { self.0.read().expect("attributes lock is poisoned").get(name).cloned() }

    pub fn set(&self, name: impl Into<String>, value: Value) { self.0.write().expect("attributes lock is poisoned").insert(name.into(), value); }

    pub fn contains(&self, name: &str) -> bool { self.0.read().expect("attributes lock is poisoned").contains_key(name) }
}

/// Types whose missing attributes are fetched through a per-type signal.
///
/// Implement it with [`dynamic_state!`](crate::dynamic_state).
pub trait DynamicState: Serialize {
    /// The signal emitted for missing attributes of this type.
    fn fetch_attribute() -> &'static Signal<ThreadSafe>;

    fn attributes(&self) -> &Attributes;

    /// Returns the attribute `name`, fetching and storing it first if needed.
    ///
    /// # Errors
    ///
    /// [`SignalSlotError::AttributeNotFound`] if every slot returned absent,
    /// or whatever a slot or the serialisation of `self` fails with.
    fn attribute(&self, name: &str) -> Result<Value> {
        if let Some(value) = self.attributes().get(name) {
            return Ok(value);
        }

        let mut kwargs = Kwargs::new();
        kwargs.insert("obj".to_owned(), serde_json::to_value(self)?);
        kwargs.insert("name".to_owned(), Value::from(name));

        match Self::fetch_attribute().emit(&kwargs)? {
            Some(value) => {
                debug!("{}.fetch_attribute provided {}", std::any::type_name::<Self>(), name);
                self.attributes().set(name, value.clone());
                Ok(value)
            }
            None => Err(SignalSlotError::AttributeNotFound { type_name: std::any::type_name::<Self>(), name: name.to_owned() }),
        }
    }

    fn set_attribute(&self, name: impl Into<String>, value: Value) { self.attributes().set(name, value) }
}

/// Implements [`DynamicState`] for `$ty`, storing attributes in its `$field: Attributes`.
///
/// Every type gets its own `fetch_attribute` signal.
#[macro_export]
macro_rules! dynamic_state {
    ($ty:ty, $field:ident) => {
        impl $crate::contrib::DynamicState for $ty {
            fn fetch_attribute() -> &'static $crate::Signal<$crate::ThreadSafe> {
                static FETCH_ATTRIBUTE: ::std::sync::LazyLock<$crate::Signal<$crate::ThreadSafe>> = ::std::sync::LazyLock::new(|| {
                    $crate::Signal::builder()
                        .name(::std::concat!(::std::stringify!($ty), ".fetch_attribute"))
                        .args($crate::contrib::FETCH_ATTRIBUTE_ARGS)
                        .build_threadsafe()
                });
                &FETCH_ATTRIBUTE
            }

            fn attributes(&self) -> &$crate::contrib::Attributes { &self.$field }
        }
    };
}
