//! # Progressing Status
//!
//! The discriminator of `CaregivingStateData`, plus the lifecycle
//! operations and the static table of which operation each status permits.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The progressing status of a caregiving round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaregivingProgressingStatus {
    /// Round opened; a caregiver may or may not be attached yet.
    NotStarted,
    /// A caregiver is being re-matched for a round that is not the first.
    Rematching,
    /// Re-matching put on hold.
    PendingRematching,
    /// Caregiver is on duty.
    CaregivingInProgress,
    /// Completed.
    Completed,
    /// Completed because the patient switched to a personal caregiver.
    CompletedUsingPersonalCaregiver,
    /// Stopped with an end time, resumable by a later completion.
    CompletedRestarting,
    /// Canceled while re-matching (terminal for the state machine).
    CanceledWhileRematching,
    /// Financial close-out done.
    ReconciliationCompleted,
}

impl CaregivingProgressingStatus {
    /// Every status, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::NotStarted,
        Self::Rematching,
        Self::PendingRematching,
        Self::CaregivingInProgress,
        Self::Completed,
        Self::CompletedUsingPersonalCaregiver,
        Self::CompletedRestarting,
        Self::CanceledWhileRematching,
        Self::ReconciliationCompleted,
    ];

    /// The persisted spelling (e.g. `"CAREGIVING_IN_PROGRESS"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::Rematching => "REMATCHING",
            Self::PendingRematching => "PENDING_REMATCHING",
            Self::CaregivingInProgress => "CAREGIVING_IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::CompletedUsingPersonalCaregiver => "COMPLETED_USING_PERSONAL_CAREGIVER",
            Self::CompletedRestarting => "COMPLETED_RESTARTING",
            Self::CanceledWhileRematching => "CANCELED_WHILE_REMATCHING",
            Self::ReconciliationCompleted => "RECONCILIATION_COMPLETED",
        }
    }

    /// Plain COMPLETED only. Used to detect the last round of a reception.
    pub fn is_completed_status(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Statuses for which a caregiving charge may be calculated.
    pub fn is_caregiving_charge_actionable(&self) -> bool {
        matches!(self, Self::Completed | Self::CompletedUsingPersonalCaregiver)
    }

    /// Statuses that need no further reconciliation.
    pub fn is_reconciliation_completed_status(&self) -> bool {
        matches!(self, Self::CanceledWhileRematching | Self::ReconciliationCompleted)
    }

    /// Whether `operation` is accepted from this status.
    ///
    /// Precondition failures (no caregiver, no start/end time yet) are not
    /// modelled here: `EditStartDateTime` from NOT_STARTED is "not allowed"
    /// even though the machine reports it as a missing start time.
    pub fn allows(&self, operation: Operation) -> bool {
        use CaregivingProgressingStatus as S;
        use Operation as O;

        match (self, operation) {
            (_, O::AssignCaregiver) => true,

            (S::NotStarted | S::Rematching | S::PendingRematching, O::Start) => true,

            (
                S::CaregivingInProgress
                | S::Completed
                | S::CompletedUsingPersonalCaregiver
                | S::CompletedRestarting
                | S::ReconciliationCompleted,
                O::EditStartDateTime,
            ) => true,

            (
                S::Completed
                | S::CompletedUsingPersonalCaregiver
                | S::CompletedRestarting
                | S::ReconciliationCompleted,
                O::EditEndDateTime,
            ) => true,

            (S::CaregivingInProgress | S::CompletedRestarting, O::Complete) => true,
            (S::CaregivingInProgress, O::Stop) => true,
            (S::Rematching | S::PendingRematching, O::Cancel) => true,
            (S::Rematching, O::Pend) => true,
            (S::Completed | S::CompletedUsingPersonalCaregiver, O::CompleteReconciliation) => true,

            _ => false,
        }
    }
}

/// Operations accepted from each status, in declaration order.
pub fn transition_table() -> Vec<(CaregivingProgressingStatus, Vec<Operation>)> {
    CaregivingProgressingStatus::ALL
        .into_iter()
        .map(|status| {
            let ops = Operation::ALL
                .into_iter()
                .filter(|op| status.allows(*op))
                .collect();
            (status, ops)
        })
        .collect()
}

impl std::fmt::Display for CaregivingProgressingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown caregiving progressing status: {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for CaregivingProgressingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// The nine lifecycle operations of a caregiving round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    AssignCaregiver,
    Start,
    EditStartDateTime,
    EditEndDateTime,
    Complete,
    Stop,
    Cancel,
    Pend,
    CompleteReconciliation,
}

impl Operation {
    /// Every operation, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::AssignCaregiver,
        Self::Start,
        Self::EditStartDateTime,
        Self::EditEndDateTime,
        Self::Complete,
        Self::Stop,
        Self::Cancel,
        Self::Pend,
        Self::CompleteReconciliation,
    ];

    /// Command name as used in logs and the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AssignCaregiver => "assign_caregiver",
            Self::Start => "start",
            Self::EditStartDateTime => "edit_start_date_time",
            Self::EditEndDateTime => "edit_end_date_time",
            Self::Complete => "complete",
            Self::Stop => "stop",
            Self::Cancel => "cancel",
            Self::Pend => "pend",
            Self::CompleteReconciliation => "complete_reconciliation",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_persisted_spelling() {
        assert_eq!(
            CaregivingProgressingStatus::CompletedUsingPersonalCaregiver.to_string(),
            "COMPLETED_USING_PERSONAL_CAREGIVER"
        );
        assert_eq!(
            CaregivingProgressingStatus::NotStarted.to_string(),
            "NOT_STARTED"
        );
    }

    #[test]
    fn serde_matches_display() {
        for status in CaregivingProgressingStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
    }

    #[test]
    fn from_str_roundtrips_every_status() {
        for status in CaregivingProgressingStatus::ALL {
            assert_eq!(status.as_str().parse::<CaregivingProgressingStatus>(), Ok(status));
        }
        assert!("STARTED".parse::<CaregivingProgressingStatus>().is_err());
    }

    #[test]
    fn status_predicates() {
        use CaregivingProgressingStatus as S;
        assert!(S::Completed.is_completed_status());
        assert!(!S::CompletedUsingPersonalCaregiver.is_completed_status());
        assert!(S::CompletedUsingPersonalCaregiver.is_caregiving_charge_actionable());
        assert!(!S::CompletedRestarting.is_caregiving_charge_actionable());
        assert!(S::CanceledWhileRematching.is_reconciliation_completed_status());
        assert!(S::ReconciliationCompleted.is_reconciliation_completed_status());
        assert!(!S::Completed.is_reconciliation_completed_status());
    }

    #[test]
    fn cancel_only_from_rematching_family() {
        use CaregivingProgressingStatus as S;
        let allowed: Vec<_> = S::ALL
            .into_iter()
            .filter(|s| s.allows(Operation::Cancel))
            .collect();
        assert_eq!(allowed, vec![S::Rematching, S::PendingRematching]);
    }

    #[test]
    fn pend_only_from_rematching() {
        use CaregivingProgressingStatus as S;
        assert!(S::Rematching.allows(Operation::Pend));
        assert!(!S::PendingRematching.allows(Operation::Pend));
        assert!(!S::NotStarted.allows(Operation::Pend));
    }

    #[test]
    fn table_lists_every_status_once() {
        let table = transition_table();
        assert_eq!(table.len(), CaregivingProgressingStatus::ALL.len());
        let (status, ops) = &table[0];
        assert_eq!(*status, CaregivingProgressingStatus::NotStarted);
        assert_eq!(ops, &vec![Operation::AssignCaregiver, Operation::Start]);
        let (_, reconciled) = &table[8];
        assert_eq!(reconciled, &vec![Operation::AssignCaregiver, Operation::EditStartDateTime, Operation::EditEndDateTime]);
    }

    #[test]
    fn assign_is_always_allowed() {
        for status in CaregivingProgressingStatus::ALL {
            assert!(status.allows(Operation::AssignCaregiver), "{status}");
        }
    }
}
