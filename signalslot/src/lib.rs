/*!
A simple signal/slot library.

A [`Signal`] is a named broadcast point. Any number of [`Slot`]s connect to it, and emitting the signal calls
them synchronously, in connection order, with keyword arguments ([`Kwargs`]).

# Design requirements:
- A slot is connected at most once; connecting it again is a no-op
- Slots compare by the callable they resolve to, not by wrapper
- A signal may declare the args it passes, and refuses slots whose declared signature doesn't match
- Weak slots don't keep their target alive, and become silent no-ops once it's gone
- The first slot returning a value short-circuits the emission
- Emission works on a snapshot, so slots may connect and disconnect (even on the same signal) while being called

# Basic usage

```rust
use signalslot::*;

let conf_pre_load = Signal::builder().name("conf_pre_load").args(["conf"]).build();

// Slots must accept keywords, and name the declared args.
let yourmodule_conf = Slot::new(|kwargs: &Kwargs| {
    let mut conf = kwargs["conf"].clone();
    conf["yourmodule_option"] = Value::from("foo");
    conf
})
.with_signature(Signature::keywords(["conf"]));

conf_pre_load.connect(yourmodule_conf.clone()).unwrap();
assert!(conf_pre_load.is_connected(&yourmodule_conf));

let conf = conf_pre_load.emit(&kwargs! { "conf" => serde_json::json!({}) }).unwrap();
assert_eq!(conf, Some(serde_json::json!({ "yourmodule_option": "foo" })));

conf_pre_load.disconnect(&yourmodule_conf).unwrap();
assert!(!conf_pre_load.is_connected(&yourmodule_conf));
```

# Short-circuiting

```rust
use signalslot::*;

let need_something = Signal::new();
need_something.connect(|_: &Kwargs| Value::from("got something")).unwrap();
need_something.connect(|_: &Kwargs| -> Option<Value> { unreachable!("I will not be called") }).unwrap();

assert_eq!(need_something.emit(&kwargs! {}).unwrap(), Some(Value::from("got something")));
```

# Threading

[`Signal::new`] uses the [`Local`] registry and can't leave its thread. [`Signal::new_threadsafe`] guards the slot
list with a re-entrant lock; slots themselves are always called outside of it. With the `tokio` feature
(on by default), slots that must run on a particular thread can be bound to an `EventLoop` with
`Slot::on_loop`.
*/

mod error;
mod kwargs;
mod signal;
mod signature;
mod slot;

pub mod contrib;
#[cfg(feature = "tokio")]
pub mod event_loop;
pub mod queue;

pub use error::*;
pub use kwargs::*;
pub use signal::*;
pub use signature::*;
pub use slot::*;

#[cfg(feature = "tokio")]
pub use event_loop::{Delivery, EventLoop, LoopHandle};
pub use queue::Queue;
