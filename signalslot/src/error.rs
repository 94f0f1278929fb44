use std::time::Duration;

use thiserror::Error;

use crate::Signature;

/// Base category of every error raised by signals, slots and their collaborators.
#[derive(Error, Debug)]
pub enum SignalSlotError {
    /// The slot's declared signature has no keyword catch-all, so it would fail on unexpected keywords.
    #[error("{slot} must accept keyword arguments to connect to {signal}")]
    SlotMustAcceptKeywords { signal: String, slot: String },

    /// The signal declares args and the slot's named parameters don't match them exactly.
    #[error("{slot} has signature {found}, which is incompatible with {signal} args {expected:?}")]
    IncompatibleSlotSignature { signal: String, slot: String, expected: Vec<String>, found: Signature },

    #[error("{slot} is not connected to {signal}")]
    NotConnected { signal: String, slot: String },

    /// A slot returned an error while being invoked.
    #[error("{slot} failed: {source}")]
    SlotFailed {
        slot: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("event loop {0} is no longer running")]
    LoopClosed(String),

    #[error("event loop {name} did not complete the call within {timeout:?}")]
    Timeout { name: String, timeout: Duration },

    #[error("failed to spawn event loop thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("{type_name} has no attribute {name}")]
    AttributeNotFound { type_name: &'static str, name: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "tokio")]
    #[error("semaphore closed: {0}")]
    SemaphoreClosed(#[from] tokio::sync::AcquireError),
}

pub type Result<T, E = SignalSlotError> = std::result::Result<T, E>;
