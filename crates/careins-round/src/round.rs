//! # Caregiving Round Aggregate
//!
//! Wraps the state machine with everything a round carries beyond its
//! progress: mirrored billing and settlement status, remarks, the
//! persistence version, and an outbox of [`RoundEvent`]s.
//!
//! ## Modification Tracking
//!
//! The first tracked command after the outbox was drained captures a
//! baseline of the tracked fields. After every tracked command the outbox
//! holds at most one `CaregivingRoundModified`, always describing
//! baseline → current, so several edits inside one unit of work collapse
//! into one event. `pend` and the `*_generated` feeds are not tracked.
//!
//! ## Atomicity
//!
//! Every command computes the successor state and validates it before
//! touching the aggregate. A rejected command leaves state, outbox and
//! baseline exactly as they were.

use serde::{Deserialize, Serialize};
use tracing::debug;

use careins_core::{CaregivingRoundId, Modification, ReceptionId, Timestamp};
use careins_state::{
    CancellationReason, CaregiverInfo, CaregivingProgressingStatus, CaregivingRoundInfo,
    CaregivingState, CaregivingStateData, FinishingReason, Phase,
};

use crate::billing::{BillingProgressingStatus, SettlementProgressingStatus};
use crate::error::RoundError;
use crate::events::{
    CaregiverAssignedToCaregivingRound, CaregivingRoundModified, CaregivingRoundStarted, Cause,
    LastCaregivingRoundFinished, LastCaregivingRoundModified, RoundEvent,
};
use crate::subject::CommandContext;

/// The persisted shape of a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaregivingRoundRecord {
    pub id: CaregivingRoundId,
    pub caregiving_round_number: u32,
    pub reception_id: ReceptionId,
    pub caregiving_state_data: CaregivingStateData,
    #[serde(default)]
    pub billing_progressing_status: BillingProgressingStatus,
    #[serde(default)]
    pub settlement_progressing_status: SettlementProgressingStatus,
    #[serde(default)]
    pub remarks: String,
    /// Incremented by the repository on every save.
    #[serde(default)]
    pub version: u64,
}

impl CaregivingRoundRecord {
    pub fn info(&self) -> CaregivingRoundInfo {
        CaregivingRoundInfo {
            round_id: self.id,
            round_number: self.caregiving_round_number,
            reception_id: self.reception_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TrackedData {
    billing_progressing_status: BillingProgressingStatus,
    settlement_progressing_status: SettlementProgressingStatus,
    caregiving_progressing_status: CaregivingProgressingStatus,
    caregiver_info: Option<CaregiverInfo>,
    start_date_time: Option<Timestamp>,
    end_date_time: Option<Timestamp>,
    remarks: String,
    is_last_caregiving_round: bool,
}

/// Outcome of [`CaregivingRound::finish`].
#[derive(Debug)]
pub struct FinishingResult {
    /// The follow-up round the finishing reason calls for, not yet saved.
    pub next_round: Option<CaregivingRound>,
}

#[derive(Debug, Clone)]
pub struct CaregivingRound {
    state: CaregivingState,
    billing_progressing_status: BillingProgressingStatus,
    settlement_progressing_status: SettlementProgressingStatus,
    remarks: String,
    version: u64,
    events: Vec<RoundEvent>,
    baseline: Option<TrackedData>,
}

impl CaregivingRound {
    /// A new round in NOT_STARTED.
    pub fn open(info: CaregivingRoundInfo) -> Self {
        Self::with_state(CaregivingState::initial(info))
    }

    fn with_state(state: CaregivingState) -> Self {
        Self {
            state,
            billing_progressing_status: BillingProgressingStatus::default(),
            settlement_progressing_status: SettlementProgressingStatus::default(),
            remarks: String::new(),
            version: 0,
            events: Vec::new(),
            baseline: None,
        }
    }

    /// Rebuild a round from its stored record.
    pub fn from_record(record: &CaregivingRoundRecord) -> Result<Self, RoundError> {
        let state = CaregivingState::from_data(record.info(), &record.caregiving_state_data)?;
        Ok(Self {
            billing_progressing_status: record.billing_progressing_status,
            settlement_progressing_status: record.settlement_progressing_status,
            remarks: record.remarks.clone(),
            version: record.version,
            ..Self::with_state(state)
        })
    }

    pub fn to_record(&self) -> CaregivingRoundRecord {
        let info = self.state.info();
        CaregivingRoundRecord {
            id: info.round_id,
            caregiving_round_number: info.round_number,
            reception_id: info.reception_id,
            caregiving_state_data: self.state.data(),
            billing_progressing_status: self.billing_progressing_status,
            settlement_progressing_status: self.settlement_progressing_status,
            remarks: self.remarks.clone(),
            version: self.version,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn id(&self) -> CaregivingRoundId {
        self.state.info().round_id
    }

    pub fn round_number(&self) -> u32 {
        self.state.info().round_number
    }

    pub fn reception_id(&self) -> ReceptionId {
        self.state.info().reception_id
    }

    pub fn state(&self) -> &CaregivingState {
        &self.state
    }

    pub fn status(&self) -> CaregivingProgressingStatus {
        self.state.status()
    }

    pub fn billing_progressing_status(&self) -> BillingProgressingStatus {
        self.billing_progressing_status
    }

    pub fn settlement_progressing_status(&self) -> SettlementProgressingStatus {
        self.settlement_progressing_status
    }

    pub fn remarks(&self) -> &str {
        &self.remarks
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Completed with `FINISHED`: caregiving is over for the reception.
    pub fn is_last_caregiving_round(&self) -> bool {
        matches!(
            self.state.phase(),
            Phase::Complete {
                reason: FinishingReason::Finished,
                ..
            }
        )
    }

    /// Events registered since the last [`Self::take_events`].
    pub fn pending_events(&self) -> &[RoundEvent] {
        &self.events
    }

    /// Drain the outbox. The next tracked command starts a new baseline.
    pub fn take_events(&mut self) -> Vec<RoundEvent> {
        self.baseline = None;
        std::mem::take(&mut self.events)
    }

    // ── Commands ────────────────────────────────────────────────────────

    /// Attach or replace the caregiver. Re-assigning the same caregiver is a
    /// no-op.
    pub fn assign_caregiver(
        &mut self,
        caregiver: CaregiverInfo,
        ctx: &CommandContext,
    ) -> Result<(), RoundError> {
        self.tracked(Cause::DirectEdit, ctx, |round| {
            if round.state.caregiver() == Some(&caregiver) {
                debug!(round_id = %round.id(), "caregiver unchanged, skipping assignment");
                return Ok(());
            }
            let next = round.state.assign_caregiver(caregiver.clone())?;
            round.transition(next)?;
            round.events.push(RoundEvent::CaregiverAssignedToCaregivingRound(
                CaregiverAssignedToCaregivingRound {
                    caregiving_round_id: round.id(),
                    caregiving_round_number: round.round_number(),
                    reception_id: round.reception_id(),
                    caregiver_info: caregiver,
                    subject: ctx.subject.clone(),
                },
            ));
            Ok(())
        })
    }

    pub fn start_caregiving(
        &mut self,
        start_date_time: Timestamp,
        ctx: &CommandContext,
    ) -> Result<(), RoundError> {
        self.tracked(Cause::DirectEdit, ctx, |round| {
            let next = round.state.start(start_date_time)?;
            round.transition(next)?;
            round.events.push(RoundEvent::CaregivingRoundStarted(CaregivingRoundStarted {
                caregiving_round_id: round.id(),
                caregiving_round_number: round.round_number(),
                reception_id: round.reception_id(),
                start_date_time,
                subject: ctx.subject.clone(),
            }));
            Ok(())
        })
    }

    pub fn edit_start_date_time(
        &mut self,
        start_date_time: Timestamp,
        ctx: &CommandContext,
    ) -> Result<(), RoundError> {
        self.tracked(Cause::DirectEdit, ctx, |round| {
            if round.state.start_date_time() == Some(start_date_time) {
                return Ok(());
            }
            let next = round.state.edit_start_date_time(start_date_time)?;
            round.transition(next)
        })
    }

    pub fn edit_end_date_time(
        &mut self,
        end_date_time: Timestamp,
        ctx: &CommandContext,
    ) -> Result<(), RoundError> {
        self.tracked(Cause::DirectEdit, ctx, |round| {
            if round.state.end_date_time() == Some(end_date_time) {
                return Ok(());
            }
            let next = round.state.edit_end_date_time(end_date_time)?;
            round.transition(next)
        })
    }

    /// Complete the round. Depending on `reason` a follow-up round is
    /// generated: already in progress for `FINISHED_CONTINUE`, not started
    /// for the restarting and changing reasons.
    pub fn finish(
        &mut self,
        end_date_time: Timestamp,
        reason: FinishingReason,
        ctx: &CommandContext,
    ) -> Result<FinishingResult, RoundError> {
        self.tracked(Cause::DirectEdit, ctx, |round| {
            let next = round.state.complete(end_date_time, reason)?;
            round.transition(next)?;

            if reason == FinishingReason::Finished {
                round.replace_event(RoundEvent::LastCaregivingRoundFinished(
                    LastCaregivingRoundFinished {
                        reception_id: round.reception_id(),
                        last_caregiving_round_id: round.id(),
                        end_date_time,
                    },
                ));
            }

            let next_round = match reason {
                FinishingReason::FinishedContinue => {
                    let continued = round.state.caregiver().cloned().map(|caregiver| {
                        round.next_round(Phase::InProgress {
                            caregiver,
                            start: end_date_time,
                        })
                    });
                    if let Some(continued) = &continued {
                        round.events.push(RoundEvent::CaregivingRoundStarted(
                            CaregivingRoundStarted {
                                caregiving_round_id: continued.id(),
                                caregiving_round_number: continued.round_number(),
                                reception_id: continued.reception_id(),
                                start_date_time: end_date_time,
                                subject: ctx.subject.clone(),
                            },
                        ));
                    }
                    continued
                }
                FinishingReason::FinishedRestarting
                | FinishingReason::FinishedChangingCaregiver
                | FinishingReason::FinishedChangingHospital
                | FinishingReason::FinishedChangingCaregiverAndHospital => {
                    Some(round.next_round(Phase::NotStarted { caregiver: None }))
                }
                FinishingReason::Finished | FinishingReason::FinishedUsingPersonalCaregiver => None,
            };
            Ok(FinishingResult { next_round })
        })
    }

    pub fn stop(&mut self, stop_date_time: Timestamp, ctx: &CommandContext) -> Result<(), RoundError> {
        self.tracked(Cause::DirectEdit, ctx, |round| {
            let next = round.state.stop(stop_date_time)?;
            round.transition(next)
        })
    }

    /// Cancel at `ctx.now`.
    pub fn cancel(
        &mut self,
        reason: CancellationReason,
        detail_reason: impl Into<String>,
        ctx: &CommandContext,
    ) -> Result<(), RoundError> {
        let detail_reason = detail_reason.into();
        self.tracked(Cause::DirectEdit, ctx, |round| {
            let next = round.state.cancel(reason, detail_reason, ctx.now)?;
            round.transition(next)
        })
    }

    pub fn pend(&mut self, _ctx: &CommandContext) -> Result<(), RoundError> {
        let next = self.state.pend()?;
        self.transition(next)
    }

    /// Close out the round after the reconciliation subsystem closed its
    /// reconciliation.
    pub fn complete_reconciliation(&mut self, ctx: &CommandContext) -> Result<(), RoundError> {
        self.tracked(Cause::Etc, ctx, |round| {
            let next = round.state.complete_reconciliation()?;
            round.transition(next)
        })
    }

    pub fn update_remarks(
        &mut self,
        remarks: impl Into<String>,
        ctx: &CommandContext,
    ) -> Result<(), RoundError> {
        let remarks = remarks.into();
        self.tracked(Cause::DirectEdit, ctx, |round| {
            if round.remarks != remarks {
                round.remarks = remarks;
            }
            Ok(())
        })
    }

    // ── Billing and settlement feeds ────────────────────────────────────

    /// Whether a billing status change would alter this round.
    pub fn will_be_affected_by_billing(
        &self,
        status: &Modification<BillingProgressingStatus>,
    ) -> bool {
        status.has_changed() && status.current != self.billing_progressing_status
    }

    /// Whether a settlement status change would alter this round.
    pub fn will_be_affected_by_settlement(
        &self,
        status: &Modification<SettlementProgressingStatus>,
    ) -> bool {
        status.has_changed() && status.current != self.settlement_progressing_status
    }

    /// Mirror a billing status change. Returns whether anything changed.
    pub fn handle_billing_modified(
        &mut self,
        status: &Modification<BillingProgressingStatus>,
        ctx: &CommandContext,
    ) -> bool {
        let baseline = self.begin_tracking();
        let applied = self.will_be_affected_by_billing(status);
        if applied {
            self.billing_progressing_status = status.current;
        }
        self.end_tracking(baseline, Cause::Etc, ctx);
        applied
    }

    /// Mirror a settlement status change. Returns whether anything changed.
    pub fn handle_settlement_modified(
        &mut self,
        status: &Modification<SettlementProgressingStatus>,
        ctx: &CommandContext,
    ) -> bool {
        let baseline = self.begin_tracking();
        let applied = self.will_be_affected_by_settlement(status);
        if applied {
            self.settlement_progressing_status = status.current;
        }
        self.end_tracking(baseline, Cause::Etc, ctx);
        applied
    }

    pub fn handle_billing_generated(&mut self, status: BillingProgressingStatus) {
        self.billing_progressing_status = status;
    }

    pub fn handle_settlement_generated(&mut self, status: SettlementProgressingStatus) {
        self.settlement_progressing_status = status;
    }

    // ── Internals ───────────────────────────────────────────────────────

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    fn transition(&mut self, next: CaregivingState) -> Result<(), RoundError> {
        if let (Some(start), Some(end)) = (next.start_date_time(), next.end_date_time()) {
            if start > end {
                return Err(RoundError::IllegalCaregivingPeriod {
                    round_id: self.id(),
                    start_date_time: start,
                    end_date_time: end,
                });
            }
        }
        self.state = next;
        Ok(())
    }

    fn next_round(&self, phase: Phase) -> CaregivingRound {
        let info = CaregivingRoundInfo {
            round_id: CaregivingRoundId::new(),
            round_number: self.round_number() + 1,
            reception_id: self.reception_id(),
        };
        Self::with_state(CaregivingState::new(info, phase))
    }

    fn replace_event(&mut self, event: RoundEvent) {
        let kind = std::mem::discriminant(&event);
        match self
            .events
            .iter_mut()
            .find(|existing| std::mem::discriminant(&**existing) == kind)
        {
            Some(slot) => *slot = event,
            None => self.events.push(event),
        }
    }

    fn tracked_data(&self) -> TrackedData {
        TrackedData {
            billing_progressing_status: self.billing_progressing_status,
            settlement_progressing_status: self.settlement_progressing_status,
            caregiving_progressing_status: self.state.status(),
            caregiver_info: self.state.caregiver().cloned(),
            start_date_time: self.state.start_date_time(),
            end_date_time: self.state.end_date_time(),
            remarks: self.remarks.clone(),
            is_last_caregiving_round: self.is_last_caregiving_round(),
        }
    }

    fn tracked<R>(
        &mut self,
        cause: Cause,
        ctx: &CommandContext,
        command: impl FnOnce(&mut Self) -> Result<R, RoundError>,
    ) -> Result<R, RoundError> {
        let baseline = self.begin_tracking();
        let result = command(self)?;
        self.end_tracking(baseline, cause, ctx);
        Ok(result)
    }

    fn begin_tracking(&self) -> TrackedData {
        match &self.baseline {
            Some(baseline) => baseline.clone(),
            None => self.tracked_data(),
        }
    }

    fn end_tracking(&mut self, baseline: TrackedData, cause: Cause, ctx: &CommandContext) {
        let current = self.tracked_data();
        if current != baseline {
            let modified = self.modified_event(&baseline, &current, cause, ctx);
            self.replace_event(RoundEvent::CaregivingRoundModified(modified));

            if baseline.is_last_caregiving_round && current.is_last_caregiving_round {
                if let (Some(previous), Some(now)) = (baseline.end_date_time, current.end_date_time) {
                    self.replace_event(RoundEvent::LastCaregivingRoundModified(
                        LastCaregivingRoundModified {
                            reception_id: self.reception_id(),
                            last_caregiving_round_id: self.id(),
                            end_date_time: Modification::new(previous, now),
                        },
                    ));
                }
            }
        }
        self.baseline = Some(baseline);
    }

    fn modified_event(
        &self,
        baseline: &TrackedData,
        current: &TrackedData,
        cause: Cause,
        ctx: &CommandContext,
    ) -> CaregivingRoundModified {
        CaregivingRoundModified {
            caregiving_round_id: self.id(),
            caregiving_round_number: self.round_number(),
            reception_id: self.reception_id(),
            billing_progressing_status: Modification::new(
                baseline.billing_progressing_status,
                current.billing_progressing_status,
            ),
            settlement_progressing_status: Modification::new(
                baseline.settlement_progressing_status,
                current.settlement_progressing_status,
            ),
            caregiving_progressing_status: Modification::new(
                baseline.caregiving_progressing_status,
                current.caregiving_progressing_status,
            ),
            caregiver_info: Modification::new(
                baseline.caregiver_info.clone(),
                current.caregiver_info.clone(),
            ),
            start_date_time: Modification::new(baseline.start_date_time, current.start_date_time),
            end_date_time: Modification::new(baseline.end_date_time, current.end_date_time),
            remarks: Modification::new(baseline.remarks.clone(), current.remarks.clone()),
            cause,
            editing_subject: ctx.subject.clone(),
            modified_date_time: ctx.now,
        }
    }
}
