//! # State Machine Errors
//!
//! Two families, both deterministic and never worth retrying unchanged:
//!
//! - [`TransitionError`]: a lifecycle command was rejected. Either the
//!   operation is not in the transition table for the current status, or
//!   a precondition (assigned caregiver, existing start/end time) is
//!   missing. Client-facing.
//! - [`StateDataError`]: persisted `CaregivingStateData` cannot be turned
//!   back into a runtime state. A data-integrity defect, not a user error.

use thiserror::Error;

use careins_core::{CareinsError, CaregivingRoundId};

use crate::reason::UnmappedClosingReason;
use crate::status::CaregivingProgressingStatus;

/// A lifecycle command rejected by the caregiving state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The operation is not legal from the current status.
    #[error("invalid caregiving progressing status transition: {current} -> {attempted}")]
    InvalidTransition {
        /// Status the round is in.
        current: CaregivingProgressingStatus,
        /// Status the operation would have produced.
        attempted: CaregivingProgressingStatus,
    },

    /// `start` was requested before any caregiver was assigned.
    #[error("no caregiver is assigned to {round_id}")]
    CaregiverNotAssigned { round_id: CaregivingRoundId },

    /// The start time was edited on a round that has none.
    #[error("caregiving has not started for {round_id}")]
    CaregivingNotStarted { round_id: CaregivingRoundId },

    /// The end time was edited on a round that has none.
    #[error("caregiving has not finished for {round_id}")]
    CaregivingNotFinished { round_id: CaregivingRoundId },
}

impl TransitionError {
    pub(crate) fn invalid(
        current: CaregivingProgressingStatus,
        attempted: CaregivingProgressingStatus,
    ) -> Self {
        Self::InvalidTransition { current, attempted }
    }

    /// Whether the rejection is a forbidden status transition rather than
    /// a missing precondition.
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }
}

impl From<TransitionError> for CareinsError {
    fn from(err: TransitionError) -> Self {
        CareinsError::InvalidTransition(err.to_string())
    }
}

/// Persisted state data that contradicts its own discriminator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateDataError {
    /// A field required by the status is absent.
    #[error("{status} state data for {round_id} is missing {field}")]
    MissingField {
        round_id: CaregivingRoundId,
        status: CaregivingProgressingStatus,
        field: &'static str,
    },

    /// The stored closing reason does not fit the status.
    #[error("state data for {round_id}: {source}")]
    UnmappedReason {
        round_id: CaregivingRoundId,
        #[source]
        source: UnmappedClosingReason,
    },
}

impl From<StateDataError> for CareinsError {
    fn from(err: StateDataError) -> Self {
        CareinsError::Integrity(err.to_string())
    }
}
