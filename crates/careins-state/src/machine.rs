//! # Caregiving Round State Machine
//!
//! One tagged union, [`Phase`], with one variant per state object, and one
//! transition function per lifecycle operation switching on the variant.
//! Every function takes `&self` and returns a fresh [`CaregivingState`]; the
//! receiver is never mutated, so a caller that gets an `Err` still holds
//! the untouched previous state.
//!
//! ## Allowed Transitions
//!
//! ```text
//!                     assign (round > 1)
//!   NOT_STARTED ─────────────────────────▶ REMATCHING ◀──── assign ──── PENDING_REMATCHING
//!      │  ▲ assign (round 1)                │   │   └──────── pend ───────────▶ │
//!      │  └─┘                               │   └── cancel ──▶ CANCELED_WHILE_REMATCHING ◀── cancel ─┘
//!      │ start                              │ start                         ▲
//!      ▼                                    ▼                               │ start from PENDING too
//!   CAREGIVING_IN_PROGRESS ◀────────────────┘
//!      │  └── stop ──▶ COMPLETED_RESTARTING ── complete ──┐
//!      │ complete                                         ▼
//!      └──────────────────────────────────────▶ COMPLETED / COMPLETED_USING_PERSONAL_CAREGIVER
//!                                                         │ complete_reconciliation
//!                                                         ▼
//!                                              RECONCILIATION_COMPLETED
//! ```
//!
//! `assign_caregiver` is accepted everywhere. Outside the matching family
//! it only replaces the caregiver and keeps the variant.

use careins_core::Timestamp;

use crate::caregiver::CaregiverInfo;
use crate::data::{CaregivingRoundInfo, CaregivingStateData};
use crate::error::{StateDataError, TransitionError};
use crate::reason::{CancellationReason, ClosingReasonType, FinishingReason};
use crate::status::CaregivingProgressingStatus;

/// The state-specific payload of a caregiving round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// NOT_STARTED. A first round may already carry its caregiver.
    NotStarted { caregiver: Option<CaregiverInfo> },
    /// REMATCHING.
    Rematching { caregiver: CaregiverInfo },
    /// PENDING_REMATCHING.
    PendingRematching { caregiver: CaregiverInfo },
    /// CAREGIVING_IN_PROGRESS.
    InProgress {
        caregiver: CaregiverInfo,
        start: Timestamp,
    },
    /// COMPLETED_RESTARTING. `stopped_at` is persisted as the end time.
    Stopped {
        caregiver: CaregiverInfo,
        start: Timestamp,
        stopped_at: Timestamp,
    },
    /// COMPLETED or COMPLETED_USING_PERSONAL_CAREGIVER, chosen by `reason`.
    Complete {
        caregiver: CaregiverInfo,
        start: Timestamp,
        end: Timestamp,
        reason: FinishingReason,
    },
    /// CANCELED_WHILE_REMATCHING.
    Canceled {
        caregiver: CaregiverInfo,
        reason: CancellationReason,
        detail_reason: String,
        canceled_at: Timestamp,
    },
    /// RECONCILIATION_COMPLETED. Keeps everything the completion recorded.
    ReconciliationCompleted {
        caregiver: CaregiverInfo,
        start: Timestamp,
        end: Timestamp,
        reason: FinishingReason,
    },
}

impl Phase {
    /// The progressing status this payload is persisted under.
    pub fn status(&self) -> CaregivingProgressingStatus {
        use crate::status::CaregivingProgressingStatus as S;
        match self {
            Self::NotStarted { .. } => S::NotStarted,
            Self::Rematching { .. } => S::Rematching,
            Self::PendingRematching { .. } => S::PendingRematching,
            Self::InProgress { .. } => S::CaregivingInProgress,
            Self::Stopped { .. } => S::CompletedRestarting,
            Self::Complete { reason, .. } => match reason {
                FinishingReason::FinishedUsingPersonalCaregiver => {
                    S::CompletedUsingPersonalCaregiver
                }
                _ => S::Completed,
            },
            Self::Canceled { .. } => S::CanceledWhileRematching,
            Self::ReconciliationCompleted { .. } => S::ReconciliationCompleted,
        }
    }
}

/// Runtime state of one caregiving round: its immutable identity plus the
/// current [`Phase`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaregivingState {
    info: CaregivingRoundInfo,
    phase: Phase,
}

impl CaregivingState {
    /// A freshly opened round: NOT_STARTED without a caregiver.
    pub fn initial(info: CaregivingRoundInfo) -> Self {
        Self {
            info,
            phase: Phase::NotStarted { caregiver: None },
        }
    }

    /// Wrap an explicit phase. Used when a round is generated directly in a
    /// later state (e.g. the follow-up round of a `FINISHED_CONTINUE`).
    pub fn new(info: CaregivingRoundInfo, phase: Phase) -> Self {
        Self { info, phase }
    }

    /// Rebuild the runtime state from persisted data.
    ///
    /// Fields the status does not use are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`StateDataError`] when a field the status requires is
    /// absent or the closing reason does not fit the status.
    pub fn from_data(
        info: CaregivingRoundInfo,
        data: &CaregivingStateData,
    ) -> Result<Self, StateDataError> {
        use crate::status::CaregivingProgressingStatus as S;

        let status = data.progressing_status;
        let missing = |field: &'static str| StateDataError::MissingField {
            round_id: info.round_id,
            status,
            field,
        };
        let caregiver = || data.caregiver_info.clone().ok_or_else(|| missing("caregiverInfo"));
        let start = || data.start_date_time.ok_or_else(|| missing("startDateTime"));
        let end = || data.end_date_time.ok_or_else(|| missing("endDateTime"));
        let closing = || data.closing_reason_type.ok_or_else(|| missing("closingReasonType"));
        let unmapped = |source| StateDataError::UnmappedReason {
            round_id: info.round_id,
            source,
        };

        let phase = match status {
            S::NotStarted => Phase::NotStarted {
                caregiver: data.caregiver_info.clone(),
            },
            S::Rematching => Phase::Rematching {
                caregiver: caregiver()?,
            },
            S::PendingRematching => Phase::PendingRematching {
                caregiver: caregiver()?,
            },
            S::CaregivingInProgress => Phase::InProgress {
                caregiver: caregiver()?,
                start: start()?,
            },
            S::CompletedRestarting => Phase::Stopped {
                caregiver: caregiver()?,
                start: start()?,
                stopped_at: end()?,
            },
            S::Completed | S::CompletedUsingPersonalCaregiver => Phase::Complete {
                caregiver: caregiver()?,
                start: start()?,
                end: end()?,
                reason: FinishingReason::try_from(closing()?).map_err(unmapped)?,
            },
            S::ReconciliationCompleted => Phase::ReconciliationCompleted {
                caregiver: caregiver()?,
                start: start()?,
                end: end()?,
                reason: FinishingReason::try_from(closing()?).map_err(unmapped)?,
            },
            S::CanceledWhileRematching => Phase::Canceled {
                caregiver: caregiver()?,
                reason: CancellationReason::try_from(closing()?).map_err(unmapped)?,
                detail_reason: data
                    .detail_closing_reason
                    .clone()
                    .ok_or_else(|| missing("detailClosingReason"))?,
                canceled_at: data
                    .canceled_date_time
                    .ok_or_else(|| missing("canceledDateTime"))?,
            },
        };

        Ok(Self { info, phase })
    }

    /// The persisted snapshot of this state.
    pub fn data(&self) -> CaregivingStateData {
        let mut data = CaregivingStateData::with_status(self.status());
        match &self.phase {
            Phase::NotStarted { caregiver } => {
                data.caregiver_info = caregiver.clone();
            }
            Phase::Rematching { caregiver } | Phase::PendingRematching { caregiver } => {
                data.caregiver_info = Some(caregiver.clone());
            }
            Phase::InProgress { caregiver, start } => {
                data.caregiver_info = Some(caregiver.clone());
                data.start_date_time = Some(*start);
            }
            Phase::Stopped {
                caregiver,
                start,
                stopped_at,
            } => {
                data.caregiver_info = Some(caregiver.clone());
                data.start_date_time = Some(*start);
                data.end_date_time = Some(*stopped_at);
            }
            Phase::Complete {
                caregiver,
                start,
                end,
                reason,
            }
            | Phase::ReconciliationCompleted {
                caregiver,
                start,
                end,
                reason,
            } => {
                data.caregiver_info = Some(caregiver.clone());
                data.start_date_time = Some(*start);
                data.end_date_time = Some(*end);
                data.closing_reason_type = Some(ClosingReasonType::from(*reason));
            }
            Phase::Canceled {
                caregiver,
                reason,
                detail_reason,
                canceled_at,
            } => {
                data.caregiver_info = Some(caregiver.clone());
                data.closing_reason_type = Some(ClosingReasonType::from(*reason));
                data.detail_closing_reason = Some(detail_reason.clone());
                data.canceled_date_time = Some(*canceled_at);
            }
        }
        data
    }

    pub fn info(&self) -> &CaregivingRoundInfo {
        &self.info
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn status(&self) -> CaregivingProgressingStatus {
        self.phase.status()
    }

    pub fn caregiver(&self) -> Option<&CaregiverInfo> {
        match &self.phase {
            Phase::NotStarted { caregiver } => caregiver.as_ref(),
            Phase::Rematching { caregiver }
            | Phase::PendingRematching { caregiver }
            | Phase::InProgress { caregiver, .. }
            | Phase::Stopped { caregiver, .. }
            | Phase::Complete { caregiver, .. }
            | Phase::Canceled { caregiver, .. }
            | Phase::ReconciliationCompleted { caregiver, .. } => Some(caregiver),
        }
    }

    pub fn start_date_time(&self) -> Option<Timestamp> {
        match &self.phase {
            Phase::InProgress { start, .. }
            | Phase::Stopped { start, .. }
            | Phase::Complete { start, .. }
            | Phase::ReconciliationCompleted { start, .. } => Some(*start),
            _ => None,
        }
    }

    pub fn end_date_time(&self) -> Option<Timestamp> {
        match &self.phase {
            Phase::Stopped { stopped_at, .. } => Some(*stopped_at),
            Phase::Complete { end, .. } | Phase::ReconciliationCompleted { end, .. } => Some(*end),
            _ => None,
        }
    }

    // ── Transitions ─────────────────────────────────────────────────────

    /// Attach or replace the caregiver.
    ///
    /// From NOT_STARTED the round stays NOT_STARTED when it is round 1 and
    /// moves to REMATCHING otherwise. PENDING_REMATCHING moves to
    /// REMATCHING. Every other state keeps its variant.
    pub fn assign_caregiver(&self, caregiver: CaregiverInfo) -> Result<Self, TransitionError> {
        let phase = match &self.phase {
            Phase::NotStarted { .. } if self.info.is_first_round() => Phase::NotStarted {
                caregiver: Some(caregiver),
            },
            Phase::NotStarted { .. } | Phase::Rematching { .. } | Phase::PendingRematching { .. } => {
                Phase::Rematching { caregiver }
            }
            Phase::InProgress { start, .. } => Phase::InProgress {
                caregiver,
                start: *start,
            },
            Phase::Stopped {
                start, stopped_at, ..
            } => Phase::Stopped {
                caregiver,
                start: *start,
                stopped_at: *stopped_at,
            },
            Phase::Complete {
                start, end, reason, ..
            } => Phase::Complete {
                caregiver,
                start: *start,
                end: *end,
                reason: *reason,
            },
            Phase::Canceled {
                reason,
                detail_reason,
                canceled_at,
                ..
            } => Phase::Canceled {
                caregiver,
                reason: *reason,
                detail_reason: detail_reason.clone(),
                canceled_at: *canceled_at,
            },
            Phase::ReconciliationCompleted {
                start, end, reason, ..
            } => Phase::ReconciliationCompleted {
                caregiver,
                start: *start,
                end: *end,
                reason: *reason,
            },
        };
        Ok(self.with_phase(phase))
    }

    /// Begin caregiving (→ CAREGIVING_IN_PROGRESS).
    pub fn start(&self, start: Timestamp) -> Result<Self, TransitionError> {
        match &self.phase {
            Phase::NotStarted {
                caregiver: Some(caregiver),
            }
            | Phase::Rematching { caregiver }
            | Phase::PendingRematching { caregiver } => Ok(self.with_phase(Phase::InProgress {
                caregiver: caregiver.clone(),
                start,
            })),
            Phase::NotStarted { caregiver: None } => Err(TransitionError::CaregiverNotAssigned {
                round_id: self.info.round_id,
            }),
            _ => Err(self.reject(CaregivingProgressingStatus::CaregivingInProgress)),
        }
    }

    /// Rewrite the start time without changing status.
    pub fn edit_start_date_time(&self, start: Timestamp) -> Result<Self, TransitionError> {
        let mut phase = self.phase.clone();
        match &mut phase {
            Phase::InProgress { start: s, .. }
            | Phase::Stopped { start: s, .. }
            | Phase::Complete { start: s, .. }
            | Phase::ReconciliationCompleted { start: s, .. } => *s = start,
            _ => {
                return Err(TransitionError::CaregivingNotStarted {
                    round_id: self.info.round_id,
                })
            }
        }
        Ok(self.with_phase(phase))
    }

    /// Rewrite the end time without changing status.
    pub fn edit_end_date_time(&self, end: Timestamp) -> Result<Self, TransitionError> {
        let mut phase = self.phase.clone();
        match &mut phase {
            Phase::Stopped { stopped_at: e, .. }
            | Phase::Complete { end: e, .. }
            | Phase::ReconciliationCompleted { end: e, .. } => *e = end,
            _ => {
                return Err(TransitionError::CaregivingNotFinished {
                    round_id: self.info.round_id,
                })
            }
        }
        Ok(self.with_phase(phase))
    }

    /// Finish caregiving (→ COMPLETED, or COMPLETED_USING_PERSONAL_CAREGIVER
    /// when `reason` is `FinishedUsingPersonalCaregiver`).
    ///
    /// From COMPLETED_RESTARTING the stop time is discarded in favour of `end`.
    pub fn complete(&self, end: Timestamp, reason: FinishingReason) -> Result<Self, TransitionError> {
        match &self.phase {
            Phase::InProgress { caregiver, start } | Phase::Stopped { caregiver, start, .. } => {
                Ok(self.with_phase(Phase::Complete {
                    caregiver: caregiver.clone(),
                    start: *start,
                    end,
                    reason,
                }))
            }
            _ => Err(self.reject(CaregivingProgressingStatus::Completed)),
        }
    }

    /// Pause an in-progress round with an end time (→ COMPLETED_RESTARTING).
    pub fn stop(&self, stopped_at: Timestamp) -> Result<Self, TransitionError> {
        match &self.phase {
            Phase::InProgress { caregiver, start } => Ok(self.with_phase(Phase::Stopped {
                caregiver: caregiver.clone(),
                start: *start,
                stopped_at,
            })),
            _ => Err(self.reject(CaregivingProgressingStatus::CompletedRestarting)),
        }
    }

    /// Cancel a round while matching a caregiver (→ CANCELED_WHILE_REMATCHING).
    ///
    /// `canceled_at` is the instant the command was accepted; callers pass
    /// their clock's "now".
    pub fn cancel(
        &self,
        reason: CancellationReason,
        detail_reason: impl Into<String>,
        canceled_at: Timestamp,
    ) -> Result<Self, TransitionError> {
        match &self.phase {
            Phase::Rematching { caregiver } | Phase::PendingRematching { caregiver } => {
                Ok(self.with_phase(Phase::Canceled {
                    caregiver: caregiver.clone(),
                    reason,
                    detail_reason: detail_reason.into(),
                    canceled_at,
                }))
            }
            _ => Err(self.reject(CaregivingProgressingStatus::CanceledWhileRematching)),
        }
    }

    /// Put rematching on hold (→ PENDING_REMATCHING).
    pub fn pend(&self) -> Result<Self, TransitionError> {
        match &self.phase {
            Phase::Rematching { caregiver } => Ok(self.with_phase(Phase::PendingRematching {
                caregiver: caregiver.clone(),
            })),
            _ => Err(self.reject(CaregivingProgressingStatus::PendingRematching)),
        }
    }

    /// Close out a completed round (→ RECONCILIATION_COMPLETED).
    pub fn complete_reconciliation(&self) -> Result<Self, TransitionError> {
        match &self.phase {
            Phase::Complete {
                caregiver,
                start,
                end,
                reason,
            } => Ok(self.with_phase(Phase::ReconciliationCompleted {
                caregiver: caregiver.clone(),
                start: *start,
                end: *end,
                reason: *reason,
            })),
            _ => Err(self.reject(CaregivingProgressingStatus::ReconciliationCompleted)),
        }
    }

    fn with_phase(&self, phase: Phase) -> Self {
        Self {
            info: self.info,
            phase,
        }
    }

    fn reject(&self, attempted: CaregivingProgressingStatus) -> TransitionError {
        TransitionError::invalid(self.status(), attempted)
    }
}
