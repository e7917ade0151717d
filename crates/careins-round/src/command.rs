//! Commands the round service accepts, as data, so a command can be
//! reapplied to a freshly loaded round after a version conflict.

use serde::{Deserialize, Serialize};

use careins_core::{Modification, Timestamp};
use careins_state::{CancellationReason, CaregiverInfo, FinishingReason};

use crate::billing::{BillingProgressingStatus, SettlementProgressingStatus};
use crate::error::RoundError;
use crate::round::CaregivingRound;
use crate::subject::CommandContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum RoundCommand {
    AssignCaregiver {
        caregiver_info: CaregiverInfo,
    },
    Start {
        start_date_time: Timestamp,
    },
    EditStartDateTime {
        start_date_time: Timestamp,
    },
    EditEndDateTime {
        end_date_time: Timestamp,
    },
    Complete {
        end_date_time: Timestamp,
        reason: FinishingReason,
    },
    Stop {
        stop_date_time: Timestamp,
    },
    Cancel {
        reason: CancellationReason,
        detail_reason: String,
    },
    Pend,
    CompleteReconciliation,
    UpdateRemarks {
        remarks: String,
    },
    BillingModified {
        progressing_status: Modification<BillingProgressingStatus>,
    },
    SettlementModified {
        progressing_status: Modification<SettlementProgressingStatus>,
    },
}

impl RoundCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AssignCaregiver { .. } => "assign_caregiver",
            Self::Start { .. } => "start",
            Self::EditStartDateTime { .. } => "edit_start_date_time",
            Self::EditEndDateTime { .. } => "edit_end_date_time",
            Self::Complete { .. } => "complete",
            Self::Stop { .. } => "stop",
            Self::Cancel { .. } => "cancel",
            Self::Pend => "pend",
            Self::CompleteReconciliation => "complete_reconciliation",
            Self::UpdateRemarks { .. } => "update_remarks",
            Self::BillingModified { .. } => "billing_modified",
            Self::SettlementModified { .. } => "settlement_modified",
        }
    }

    /// Apply to `round`. Returns the follow-up round a completion generated.
    pub fn apply(
        &self,
        round: &mut CaregivingRound,
        ctx: &CommandContext,
    ) -> Result<Option<CaregivingRound>, RoundError> {
        match self {
            Self::AssignCaregiver { caregiver_info } => {
                round.assign_caregiver(caregiver_info.clone(), ctx)?
            }
            Self::Start { start_date_time } => round.start_caregiving(*start_date_time, ctx)?,
            Self::EditStartDateTime { start_date_time } => {
                round.edit_start_date_time(*start_date_time, ctx)?
            }
            Self::EditEndDateTime { end_date_time } => {
                round.edit_end_date_time(*end_date_time, ctx)?
            }
            Self::Complete {
                end_date_time,
                reason,
            } => return Ok(round.finish(*end_date_time, *reason, ctx)?.next_round),
            Self::Stop { stop_date_time } => round.stop(*stop_date_time, ctx)?,
            Self::Cancel {
                reason,
                detail_reason,
            } => round.cancel(*reason, detail_reason.clone(), ctx)?,
            Self::Pend => round.pend(ctx)?,
            Self::CompleteReconciliation => round.complete_reconciliation(ctx)?,
            Self::UpdateRemarks { remarks } => round.update_remarks(remarks.clone(), ctx)?,
            Self::BillingModified { progressing_status } => {
                round.handle_billing_modified(progressing_status, ctx);
            }
            Self::SettlementModified { progressing_status } => {
                round.handle_settlement_modified(progressing_status, ctx);
            }
        }
        Ok(None)
    }
}

impl std::fmt::Display for RoundCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
