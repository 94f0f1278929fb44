//! Collaborators built on top of the signal/slot core.

pub mod dynamic_state;
#[cfg(feature = "tokio")]
pub mod task;

pub use dynamic_state::*;
#[cfg(feature = "tokio")]
pub use task::*;
