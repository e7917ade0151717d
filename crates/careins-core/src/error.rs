//! # Error Types
//!
//! The top-level error type shared across the workspace. Crates that own a
//! narrower failure domain (the state machine, the round service) define
//! their own `thiserror` enums and convert into [`CareinsError`] at
//! boundaries where callers do not care about the distinction.

use thiserror::Error;

/// Top-level error type for the care insurance back office.
#[derive(Error, Debug)]
pub enum CareinsError {
    /// A lifecycle command was rejected by the caregiving state machine.
    #[error("invalid state transition: {0}")]
    InvalidTransition(String),

    /// Persisted data contradicts its own invariants.
    #[error("integrity error: {0}")]
    Integrity(String),

    /// Input failed validation (malformed identifier, timestamp, etc.).
    #[error("validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
