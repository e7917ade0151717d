//! # Persisted State Data
//!
//! [`CaregivingStateData`] is the only externally visible shape of a
//! round's progress. It is rewritten whole on every accepted command and
//! read back by detail/list queries. The runtime [`crate::CaregivingState`]
//! is rebuilt from it plus the immutable [`CaregivingRoundInfo`].
//!
//! Which optional fields are populated is fully determined by
//! `progressing_status`:
//!
//! | Status | caregiver | start | end | closing reason | detail | canceled at |
//! |---|---|---|---|---|---|---|
//! | NOT_STARTED | optional | | | | | |
//! | REMATCHING, PENDING_REMATCHING | ✓ | | | | | |
//! | CAREGIVING_IN_PROGRESS | ✓ | ✓ | | | | |
//! | COMPLETED_RESTARTING | ✓ | ✓ | ✓ (stop time) | | | |
//! | COMPLETED, COMPLETED_USING_PERSONAL_CAREGIVER, RECONCILIATION_COMPLETED | ✓ | ✓ | ✓ | finishing | | |
//! | CANCELED_WHILE_REMATCHING | ✓ | | | cancellation | ✓ | ✓ |

use serde::{Deserialize, Serialize};

use careins_core::{CaregivingRoundId, ReceptionId, Timestamp};

use crate::caregiver::CaregiverInfo;
use crate::reason::ClosingReasonType;
use crate::status::CaregivingProgressingStatus;

/// Immutable identity of a caregiving round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaregivingRoundInfo {
    pub round_id: CaregivingRoundId,
    /// 1-based position of the round within its reception.
    pub round_number: u32,
    pub reception_id: ReceptionId,
}

impl CaregivingRoundInfo {
    /// Whether this is the first round of its reception.
    pub fn is_first_round(&self) -> bool {
        self.round_number == 1
    }
}

/// Serializable snapshot of a round's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaregivingStateData {
    pub progressing_status: CaregivingProgressingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caregiver_info: Option<CaregiverInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date_time: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date_time: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_reason_type: Option<ClosingReasonType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_closing_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canceled_date_time: Option<Timestamp>,
}

impl CaregivingStateData {
    /// The data every round is opened with: NOT_STARTED, nothing else.
    pub fn initial() -> Self {
        Self::with_status(CaregivingProgressingStatus::NotStarted)
    }

    /// A record with only the discriminator set.
    pub(crate) fn with_status(progressing_status: CaregivingProgressingStatus) -> Self {
        Self {
            progressing_status,
            caregiver_info: None,
            start_date_time: None,
            end_date_time: None,
            closing_reason_type: None,
            detail_closing_reason: None,
            canceled_date_time: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_data_is_bare_not_started() {
        let data = CaregivingStateData::initial();
        assert_eq!(data.progressing_status, CaregivingProgressingStatus::NotStarted);
        assert!(data.caregiver_info.is_none());
        assert!(data.start_date_time.is_none());
        assert!(data.canceled_date_time.is_none());
    }

    #[test]
    fn initial_data_serializes_to_discriminator_only() {
        let json = serde_json::to_value(CaregivingStateData::initial()).unwrap();
        assert_eq!(json, serde_json::json!({"progressingStatus": "NOT_STARTED"}));
    }

    #[test]
    fn first_round_detection() {
        let info = CaregivingRoundInfo {
            round_id: CaregivingRoundId::new(),
            round_number: 1,
            reception_id: ReceptionId::new(),
        };
        assert!(info.is_first_round());
        assert!(!CaregivingRoundInfo { round_number: 2, ..info }.is_first_round());
    }
}
