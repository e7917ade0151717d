//! # Closing Reasons
//!
//! `ClosingReasonType` is the broad reason vocabulary persisted on a round
//! and rendered by billing and certificate layers. The state machine works
//! with two narrower enums:
//!
//! - [`CancellationReason`]: why a rematching round was canceled.
//! - [`FinishingReason`]: why a started round was completed.
//!
//! Narrow → broad is total (`From`). Broad → narrow is partial
//! (`TryFrom`): a finishing reason cannot become a cancellation reason and
//! vice versa. Hitting an unmapped value means persisted data is corrupt or
//! a caller wired the wrong enum, so it surfaces as
//! [`UnmappedClosingReason`], never as a user-facing rejection.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reason a caregiving round was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClosingReasonType {
    Finished,
    FinishedContinue,
    FinishedRestarting,
    FinishedChangingCaregiver,
    FinishedChangingHospital,
    FinishedChangingCaregiverAndHospital,
    FinishedUsingPersonalCaregiver,
    CanceledWhileRematching,
    CanceledUsingPersonalCaregiver,
}

impl ClosingReasonType {
    /// The persisted spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Finished => "FINISHED",
            Self::FinishedContinue => "FINISHED_CONTINUE",
            Self::FinishedRestarting => "FINISHED_RESTARTING",
            Self::FinishedChangingCaregiver => "FINISHED_CHANGING_CAREGIVER",
            Self::FinishedChangingHospital => "FINISHED_CHANGING_HOSPITAL",
            Self::FinishedChangingCaregiverAndHospital => {
                "FINISHED_CHANGING_CAREGIVER_AND_HOSPITAL"
            }
            Self::FinishedUsingPersonalCaregiver => "FINISHED_USING_PERSONAL_CAREGIVER",
            Self::CanceledWhileRematching => "CANCELED_WHILE_REMATCHING",
            Self::CanceledUsingPersonalCaregiver => "CANCELED_USING_PERSONAL_CAREGIVER",
        }
    }
}

impl std::fmt::Display for ClosingReasonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A closing reason with no counterpart in the requested narrow enum.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("closing reason {reason} has no {target} equivalent")]
pub struct UnmappedClosingReason {
    /// The broad value that failed to map.
    pub reason: ClosingReasonType,
    /// Name of the narrow enum the caller asked for.
    pub target: &'static str,
}

/// Why a round in the rematching family was canceled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancellationReason {
    CanceledWhileRematching,
    CanceledUsingPersonalCaregiver,
}

impl CancellationReason {
    /// Whether `reason` maps onto a cancellation reason.
    pub fn accepts(reason: ClosingReasonType) -> bool {
        Self::try_from(reason).is_ok()
    }
}

impl From<CancellationReason> for ClosingReasonType {
    fn from(reason: CancellationReason) -> Self {
        match reason {
            CancellationReason::CanceledWhileRematching => Self::CanceledWhileRematching,
            CancellationReason::CanceledUsingPersonalCaregiver => {
                Self::CanceledUsingPersonalCaregiver
            }
        }
    }
}

impl TryFrom<ClosingReasonType> for CancellationReason {
    type Error = UnmappedClosingReason;

    fn try_from(reason: ClosingReasonType) -> Result<Self, Self::Error> {
        match reason {
            ClosingReasonType::CanceledWhileRematching => Ok(Self::CanceledWhileRematching),
            ClosingReasonType::CanceledUsingPersonalCaregiver => {
                Ok(Self::CanceledUsingPersonalCaregiver)
            }
            other => Err(UnmappedClosingReason {
                reason: other,
                target: "CancellationReason",
            }),
        }
    }
}

/// Why a started round was completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishingReason {
    /// Caregiving is over for the reception.
    Finished,
    /// The same caregiver continues in a new round starting immediately.
    FinishedContinue,
    /// A new round will start later.
    FinishedRestarting,
    FinishedChangingCaregiver,
    FinishedChangingHospital,
    FinishedChangingCaregiverAndHospital,
    /// The patient switched to a personally hired caregiver.
    FinishedUsingPersonalCaregiver,
}

impl FinishingReason {
    /// Whether `reason` maps onto a finishing reason.
    pub fn accepts(reason: ClosingReasonType) -> bool {
        Self::try_from(reason).is_ok()
    }
}

impl From<FinishingReason> for ClosingReasonType {
    fn from(reason: FinishingReason) -> Self {
        match reason {
            FinishingReason::Finished => Self::Finished,
            FinishingReason::FinishedContinue => Self::FinishedContinue,
            FinishingReason::FinishedRestarting => Self::FinishedRestarting,
            FinishingReason::FinishedChangingCaregiver => Self::FinishedChangingCaregiver,
            FinishingReason::FinishedChangingHospital => Self::FinishedChangingHospital,
            FinishingReason::FinishedChangingCaregiverAndHospital => {
                Self::FinishedChangingCaregiverAndHospital
            }
            FinishingReason::FinishedUsingPersonalCaregiver => {
                Self::FinishedUsingPersonalCaregiver
            }
        }
    }
}

impl TryFrom<ClosingReasonType> for FinishingReason {
    type Error = UnmappedClosingReason;

    fn try_from(reason: ClosingReasonType) -> Result<Self, Self::Error> {
        match reason {
            ClosingReasonType::Finished => Ok(Self::Finished),
            ClosingReasonType::FinishedContinue => Ok(Self::FinishedContinue),
            ClosingReasonType::FinishedRestarting => Ok(Self::FinishedRestarting),
            ClosingReasonType::FinishedChangingCaregiver => Ok(Self::FinishedChangingCaregiver),
            ClosingReasonType::FinishedChangingHospital => Ok(Self::FinishedChangingHospital),
            ClosingReasonType::FinishedChangingCaregiverAndHospital => {
                Ok(Self::FinishedChangingCaregiverAndHospital)
            }
            ClosingReasonType::FinishedUsingPersonalCaregiver => {
                Ok(Self::FinishedUsingPersonalCaregiver)
            }
            other => Err(UnmappedClosingReason {
                reason: other,
                target: "FinishingReason",
            }),
        }
    }
}
