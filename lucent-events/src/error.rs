//! Emitter error types

use serde_json::Value;

/// Errors raised by emitter operations.
///
/// Listener failures are carried through unchanged: whatever a listener
/// returns as `Err` is what the caller of `emit` receives.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EmitterError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An `error` event was emitted with nobody listening; carries the first argument.
    #[error("Unhandled error event: {0}")]
    Unhandled(Value),

    #[error("Unknown emitter error")]
    UnknownError,

    #[error("Listener failed: {0}")]
    ListenerFailed(String),

    #[error("Dispatch of `{event}` exceeded the maximum depth of {depth}")]
    DepthExceeded { event: String, depth: usize },
}

impl EmitterError {
    /// Shorthand for a listener failure.
    pub fn listener(message: impl Into<String>) -> Self {
        Self::ListenerFailed(message.into())
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Build the failure for an `error` event nobody handled.
    pub(crate) fn unhandled(args: &[Value]) -> Self {
        match args.first() {
            Some(value) => Self::Unhandled(value.clone()),
            None => Self::UnknownError,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EmitterError>;
