//! # Round Events
//!
//! Notifications a round registers on accepted commands. They are held in
//! the round's outbox until the service has saved the round, then handed
//! to the event bus. Payloads are plain serializable data so they can be
//! relayed to out-of-process consumers unchanged.

use serde::{Deserialize, Serialize};

use careins_core::{CaregivingRoundId, Modification, ReceptionId, Timestamp};
use careins_state::{CaregiverInfo, CaregivingProgressingStatus};

use crate::billing::{BillingProgressingStatus, SettlementProgressingStatus};
use crate::subject::Subject;

/// What caused a modification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cause {
    /// A user edited the round.
    DirectEdit,
    /// A system feed changed the round.
    Etc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaregiverAssignedToCaregivingRound {
    pub caregiving_round_id: CaregivingRoundId,
    pub caregiving_round_number: u32,
    pub reception_id: ReceptionId,
    pub caregiver_info: CaregiverInfo,
    pub subject: Subject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaregivingRoundStarted {
    pub caregiving_round_id: CaregivingRoundId,
    pub caregiving_round_number: u32,
    pub reception_id: ReceptionId,
    pub start_date_time: Timestamp,
    pub subject: Subject,
}

/// Baseline → current of every tracked field since the outbox was last
/// drained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaregivingRoundModified {
    pub caregiving_round_id: CaregivingRoundId,
    pub caregiving_round_number: u32,
    pub reception_id: ReceptionId,
    pub billing_progressing_status: Modification<BillingProgressingStatus>,
    pub settlement_progressing_status: Modification<SettlementProgressingStatus>,
    pub caregiving_progressing_status: Modification<CaregivingProgressingStatus>,
    pub caregiver_info: Modification<Option<CaregiverInfo>>,
    pub start_date_time: Modification<Option<Timestamp>>,
    pub end_date_time: Modification<Option<Timestamp>>,
    pub remarks: Modification<String>,
    pub cause: Cause,
    pub editing_subject: Subject,
    pub modified_date_time: Timestamp,
}

/// The reception's last round was completed with `FINISHED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastCaregivingRoundFinished {
    pub reception_id: ReceptionId,
    pub last_caregiving_round_id: CaregivingRoundId,
    pub end_date_time: Timestamp,
}

/// The end time of a reception's last round was edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastCaregivingRoundModified {
    pub reception_id: ReceptionId,
    pub last_caregiving_round_id: CaregivingRoundId,
    pub end_date_time: Modification<Timestamp>,
}

/// Every event a caregiving round emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum RoundEvent {
    CaregiverAssignedToCaregivingRound(CaregiverAssignedToCaregivingRound),
    CaregivingRoundStarted(CaregivingRoundStarted),
    CaregivingRoundModified(CaregivingRoundModified),
    LastCaregivingRoundFinished(LastCaregivingRoundFinished),
    LastCaregivingRoundModified(LastCaregivingRoundModified),
}

impl RoundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CaregiverAssignedToCaregivingRound(_) => "CaregiverAssignedToCaregivingRound",
            Self::CaregivingRoundStarted(_) => "CaregivingRoundStarted",
            Self::CaregivingRoundModified(_) => "CaregivingRoundModified",
            Self::LastCaregivingRoundFinished(_) => "LastCaregivingRoundFinished",
            Self::LastCaregivingRoundModified(_) => "LastCaregivingRoundModified",
        }
    }

    pub fn reception_id(&self) -> ReceptionId {
        match self {
            Self::CaregiverAssignedToCaregivingRound(e) => e.reception_id,
            Self::CaregivingRoundStarted(e) => e.reception_id,
            Self::CaregivingRoundModified(e) => e.reception_id,
            Self::LastCaregivingRoundFinished(e) => e.reception_id,
            Self::LastCaregivingRoundModified(e) => e.reception_id,
        }
    }

    /// The round the event is about. For `CaregivingRoundStarted` raised by
    /// a continued round this is the new round, not the one that emitted it.
    pub fn caregiving_round_id(&self) -> CaregivingRoundId {
        match self {
            Self::CaregiverAssignedToCaregivingRound(e) => e.caregiving_round_id,
            Self::CaregivingRoundStarted(e) => e.caregiving_round_id,
            Self::CaregivingRoundModified(e) => e.caregiving_round_id,
            Self::LastCaregivingRoundFinished(e) => e.last_caregiving_round_id,
            Self::LastCaregivingRoundModified(e) => e.last_caregiving_round_id,
        }
    }
}

impl std::fmt::Display for RoundEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} for {}", self.name(), self.caregiving_round_id())
    }
}
