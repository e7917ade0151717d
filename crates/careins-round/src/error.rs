//! # Round Errors
//!
//! [`RoundError`] is raised by the aggregate and never leaves side effects
//! behind. [`RepositoryError`] comes from the storage seam.
//! [`ServiceError`] is what callers of the round service see.

use thiserror::Error;

use careins_core::{CareinsError, CaregivingRoundId, Timestamp};
use careins_state::{StateDataError, TransitionError};

/// A command rejected by the round aggregate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoundError {
    /// The state machine rejected the command.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// The command would leave the round starting after it ends.
    #[error("caregiving round {round_id} cannot start at {start_date_time}, after its end at {end_date_time}")]
    IllegalCaregivingPeriod {
        round_id: CaregivingRoundId,
        start_date_time: Timestamp,
        end_date_time: Timestamp,
    },

    /// The stored record cannot be rebuilt into a round.
    #[error(transparent)]
    StateData(#[from] StateDataError),
}

impl From<RoundError> for CareinsError {
    fn from(err: RoundError) -> Self {
        match err {
            RoundError::Transition(e) => e.into(),
            RoundError::StateData(e) => e.into(),
            other @ RoundError::IllegalCaregivingPeriod { .. } => {
                CareinsError::Validation(other.to_string())
            }
        }
    }
}

/// Storage failures.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("caregiving round {0} not found")]
    NotFound(CaregivingRoundId),

    #[error("caregiving round {0} already exists")]
    AlreadyExists(CaregivingRoundId),

    /// Someone else saved the round since it was loaded.
    #[error("caregiving round {round_id} was modified concurrently: expected version {expected}, found {actual}")]
    VersionConflict {
        round_id: CaregivingRoundId,
        expected: u64,
        actual: u64,
    },

    /// The backing store failed.
    #[error("round storage error: {0}")]
    Storage(String),
}

impl RepositoryError {
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

/// Errors returned by [`crate::CaregivingRoundService`].
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Round(#[from] RoundError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Every retry after a version conflict hit another conflict.
    #[error("caregiving round {round_id} still conflicting after {attempts} attempts")]
    ConflictRetriesExhausted {
        round_id: CaregivingRoundId,
        attempts: u32,
    },
}

impl ServiceError {
    /// Whether the caller sent a command the round cannot accept, as
    /// opposed to an infrastructure failure.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Round(RoundError::Transition(_) | RoundError::IllegalCaregivingPeriod { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careins_state::CaregivingProgressingStatus as S;

    #[test]
    fn transition_errors_pass_through_unchanged() {
        let err: RoundError = TransitionError::InvalidTransition {
            current: S::Completed,
            attempted: S::CaregivingInProgress,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "invalid caregiving progressing status transition: COMPLETED -> CAREGIVING_IN_PROGRESS"
        );
        assert!(ServiceError::from(err).is_rejection());
    }

    #[test]
    fn storage_failures_are_not_rejections() {
        let err = ServiceError::from(RepositoryError::Storage("disk full".to_string()));
        assert!(!err.is_rejection());
    }

    #[test]
    fn illegal_period_maps_to_validation() {
        let err = RoundError::IllegalCaregivingPeriod {
            round_id: CaregivingRoundId::new(),
            start_date_time: Timestamp::from_ymd_hms(2026, 1, 5, 0, 0, 0).unwrap(),
            end_date_time: Timestamp::from_ymd_hms(2026, 1, 4, 0, 0, 0).unwrap(),
        };
        assert!(matches!(CareinsError::from(err), CareinsError::Validation(_)));
    }
}
