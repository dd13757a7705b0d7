//! Error types for the Vortex engine

use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, VortexError>;

/// Errors surfaced by the Vortex engine
#[derive(Debug, Error)]
pub enum VortexError {
    /// A non-blocking claim could not acquire the requested range.
    ///
    /// The caller should retry later or treat it as backpressure.
    #[error("insufficient capacity in ring buffer")]
    InsufficientCapacity,

    /// A sequence barrier has been alerted while waiting.
    ///
    /// This is control flow, not a failure: the consumer loop interprets
    /// it together with its own running flag.
    #[error("sequence barrier alerted")]
    Alerted,

    /// An operation was attempted in a state that does not permit it
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// An argument was outside the legal range
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// A failure surfaced from user code via an event handler hook
    #[error("event handler failed at sequence {sequence}")]
    Handler {
        /// Sequence of the event being processed when the handler failed
        sequence: i64,
        /// Underlying failure reported by the handler
        #[source]
        source: anyhow::Error,
    },
}

impl VortexError {
    /// Create an illegal-state error
    pub fn illegal_state(msg: impl Into<String>) -> Self {
        VortexError::IllegalState(msg.into())
    }

    /// Create an out-of-range error
    pub fn out_of_range(msg: impl Into<String>) -> Self {
        VortexError::OutOfRange(msg.into())
    }

    /// Whether the error is a recoverable condition the caller is expected
    /// to handle locally (alert or backpressure) rather than a hard failure
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            VortexError::Alerted | VortexError::InsufficientCapacity
        )
    }
}
