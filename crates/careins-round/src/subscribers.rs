//! # Downstream Triggers
//!
//! In-process stand-ins for the subsystems that react to round events.
//! Each one records what it would hand to its real collaborator, and each
//! is idempotent under redelivery of the same event.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use careins_core::{CaregivingRoundId, Modification, ReceptionId, Timestamp};
use careins_state::CaregiverInfo;

use crate::bus::RoundEventHandler;
use crate::events::{CaregivingRoundModified, CaregivingRoundStarted, Cause, RoundEvent};
use crate::subject::Subject;

// ─── Reconciliation ─────────────────────────────────────────────────────

/// A round whose billing and settlement are both ready to reconcile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationCandidate {
    pub caregiving_round_id: CaregivingRoundId,
    pub caregiving_round_number: u32,
    pub reception_id: ReceptionId,
    pub issued_date_time: Timestamp,
}

/// Records a round for reconciliation every time a modification makes
/// billing and settlement ready together. A redelivered modification,
/// identified by round and modification instant, is recorded once.
#[derive(Debug, Default)]
pub struct ReconciliationTrigger {
    candidates: RwLock<Vec<ReconciliationCandidate>>,
    seen: RwLock<HashSet<(CaregivingRoundId, Timestamp)>>,
}

impl ReconciliationTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn candidates(&self) -> Vec<ReconciliationCandidate> {
        self.candidates.read().clone()
    }

    fn handle_modified(&self, event: &CaregivingRoundModified) {
        let billing_ready = event
            .billing_progressing_status
            .map(|status| status.is_ready_to_reconcile());
        let settlement_ready = event
            .settlement_progressing_status
            .map(|status| status.is_ready_to_reconcile());

        if !billing_ready.has_changed() && !settlement_ready.has_changed() {
            return;
        }
        if !(billing_ready.current && settlement_ready.current) {
            return;
        }
        if !self
            .seen
            .write()
            .insert((event.caregiving_round_id, event.modified_date_time))
        {
            debug!(
                round_id = %event.caregiving_round_id,
                modified = %event.modified_date_time,
                "reconciliation already recorded for this modification"
            );
            return;
        }

        info!(
            round_id = %event.caregiving_round_id,
            reception_id = %event.reception_id,
            "caregiving round ready for reconciliation"
        );
        self.candidates.write().push(ReconciliationCandidate {
            caregiving_round_id: event.caregiving_round_id,
            caregiving_round_number: event.caregiving_round_number,
            reception_id: event.reception_id,
            issued_date_time: event.modified_date_time,
        });
    }
}

impl RoundEventHandler for ReconciliationTrigger {
    fn name(&self) -> &'static str {
        "reconciliation-trigger"
    }

    fn handle(&self, event: &RoundEvent) {
        if let RoundEvent::CaregivingRoundModified(modified) = event {
            self.handle_modified(modified);
        }
    }
}

// ─── Caregiving start message ───────────────────────────────────────────

/// What the start-message sender is asked to deliver for a reception.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMessageSummary {
    pub reception_id: ReceptionId,
    pub first_caregiving_round_id: CaregivingRoundId,
    pub caregiving_start_date_time: Timestamp,
}

/// Queues one caregiving-start message per reception, on its first round.
#[derive(Debug, Default)]
pub struct CaregivingStartMessageTrigger {
    summaries: RwLock<HashMap<ReceptionId, StartMessageSummary>>,
}

impl CaregivingStartMessageTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self, reception_id: ReceptionId) -> Option<StartMessageSummary> {
        self.summaries.read().get(&reception_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.summaries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn handle_started(&self, event: &CaregivingRoundStarted) {
        if event.caregiving_round_number != 1 {
            return;
        }
        let mut summaries = self.summaries.write();
        if summaries.contains_key(&event.reception_id) {
            return;
        }
        info!(reception_id = %event.reception_id, "caregiving start message queued");
        summaries.insert(
            event.reception_id,
            StartMessageSummary {
                reception_id: event.reception_id,
                first_caregiving_round_id: event.caregiving_round_id,
                caregiving_start_date_time: event.start_date_time,
            },
        );
    }
}

impl RoundEventHandler for CaregivingStartMessageTrigger {
    fn name(&self) -> &'static str {
        "caregiving-start-message-trigger"
    }

    fn handle(&self, event: &RoundEvent) {
        if let RoundEvent::CaregivingRoundStarted(started) = event {
            self.handle_started(started);
        }
    }
}

// ─── Modification history ───────────────────────────────────────────────

/// A field of a round whose edits are kept in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModifiedProperty {
    CaregiverOrganizationId,
    CaregiverName,
    CaregiverSex,
    CaregiverBirthDate,
    CaregiverPhoneNumber,
    DailyCaregivingCharge,
    CommissionFee,
    CaregiverInsured,
    CaregiverAccountBank,
    CaregiverAccountHolder,
    CaregiverAccountNumber,
    StartDateTime,
    EndDateTime,
    Remarks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModificationHistoryEntry {
    pub caregiving_round_number: u32,
    pub modified_property: ModifiedProperty,
    pub previous: Option<String>,
    pub modified: Option<String>,
    pub modifier: Subject,
    pub modified_date_time: Timestamp,
}

/// Keeps one history line per field a user edited, keyed by reception.
///
/// System-driven modifications and the first caregiver registration are
/// not history.
#[derive(Debug, Default)]
pub struct ModificationHistoryRecorder {
    entries: RwLock<HashMap<ReceptionId, Vec<ModificationHistoryEntry>>>,
}

impl ModificationHistoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self, reception_id: ReceptionId) -> Vec<ModificationHistoryEntry> {
        self.entries
            .read()
            .get(&reception_id)
            .cloned()
            .unwrap_or_default()
    }

    fn handle_modified(&self, event: &CaregivingRoundModified) {
        if event.cause != Cause::DirectEdit {
            return;
        }

        let mut changes: Vec<(ModifiedProperty, Modification<Option<String>>)> = Vec::new();
        if let Modification {
            previous: Some(previous),
            current: Some(current),
        } = &event.caregiver_info
        {
            changes.extend(caregiver_changes(previous, current));
        }
        changes.push((
            ModifiedProperty::StartDateTime,
            event.start_date_time.map(|t| t.map(|t| t.to_iso8601())),
        ));
        changes.push((
            ModifiedProperty::EndDateTime,
            event.end_date_time.map(|t| t.map(|t| t.to_iso8601())),
        ));
        changes.push((
            ModifiedProperty::Remarks,
            event.remarks.map(|r| Some(r.clone())),
        ));

        let entries: Vec<_> = changes
            .into_iter()
            .filter(|(_, change)| change.has_changed())
            .map(|(property, change)| ModificationHistoryEntry {
                caregiving_round_number: event.caregiving_round_number,
                modified_property: property,
                previous: change.previous,
                modified: change.current,
                modifier: event.editing_subject.clone(),
                modified_date_time: event.modified_date_time,
            })
            .collect();
        if entries.is_empty() {
            return;
        }

        debug!(
            reception_id = %event.reception_id,
            count = entries.len(),
            "recording caregiving round modification history"
        );
        self.entries
            .write()
            .entry(event.reception_id)
            .or_default()
            .extend(entries);
    }
}

fn caregiver_changes(
    previous: &CaregiverInfo,
    current: &CaregiverInfo,
) -> Vec<(ModifiedProperty, Modification<Option<String>>)> {
    let pair = Modification::new(previous, current);
    let field = |property, f: fn(&CaregiverInfo) -> Option<String>| {
        (property, pair.map(|info| f(info)))
    };
    vec![
        field(ModifiedProperty::CaregiverOrganizationId, |c| {
            c.caregiver_organization_id.clone()
        }),
        field(ModifiedProperty::CaregiverName, |c| Some(c.name.clone())),
        field(ModifiedProperty::CaregiverSex, |c| {
            Some(format!("{:?}", c.sex).to_uppercase())
        }),
        field(ModifiedProperty::CaregiverBirthDate, |c| c.birth_date.clone()),
        field(ModifiedProperty::CaregiverPhoneNumber, |c| Some(c.phone_number.clone())),
        field(ModifiedProperty::DailyCaregivingCharge, |c| {
            Some(c.daily_caregiving_charge.to_string())
        }),
        field(ModifiedProperty::CommissionFee, |c| Some(c.commission_fee.to_string())),
        field(ModifiedProperty::CaregiverInsured, |c| Some(c.insured.to_string())),
        field(ModifiedProperty::CaregiverAccountBank, |c| c.account_info.bank.clone()),
        field(ModifiedProperty::CaregiverAccountHolder, |c| {
            c.account_info.account_holder.clone()
        }),
        field(ModifiedProperty::CaregiverAccountNumber, |c| {
            c.account_info.account_number.clone()
        }),
    ]
}

impl RoundEventHandler for ModificationHistoryRecorder {
    fn name(&self) -> &'static str {
        "modification-history-recorder"
    }

    fn handle(&self, event: &RoundEvent) {
        if let RoundEvent::CaregivingRoundModified(modified) = event {
            self.handle_modified(modified);
        }
    }
}
