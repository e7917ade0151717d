//! Round service tests: commands travel through the repository, the event
//! bus, and the downstream triggers.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use careins_core::{CaregivingRoundId, Modification, ReceptionId, Timestamp};
use careins_round::subscribers::ModifiedProperty;
use careins_round::{
    BillingProgressingStatus, CaregivingRoundRecord, CaregivingRoundRepository,
    CaregivingRoundService, CaregivingStartMessageTrigger, EventBus, FixedClock,
    InMemoryRoundRepository, ModificationHistoryRecorder, RecordingPublisher,
    ReconciliationTrigger, RepositoryError, RoundError, RoundEvent, RoundServiceConfig,
    ServiceError, SettlementProgressingStatus, Subject,
};
use careins_state::{
    AccountInfo, CancellationReason, CaregiverInfo, CaregivingProgressingStatus as S,
    FinishingReason, Sex, TransitionError,
};

// ── Fixtures ────────────────────────────────────────────────────────────

fn at(day: u32) -> Timestamp {
    Timestamp::from_ymd_hms(2026, 5, day, 10, 0, 0).unwrap()
}

fn caregiver(name: &str) -> CaregiverInfo {
    CaregiverInfo {
        caregiver_organization_id: Some("org-12".to_string()),
        name: name.to_string(),
        sex: Sex::Female,
        birth_date: Some("1968-03-02".to_string()),
        phone_number: "01098765432".to_string(),
        daily_caregiving_charge: 150_000,
        commission_fee: 3_000,
        insured: true,
        account_info: AccountInfo::default(),
    }
}

fn manager() -> Subject {
    Subject::user("manager-3")
}

struct Harness {
    service: CaregivingRoundService<InMemoryRoundRepository, EventBus>,
    clock: Arc<FixedClock>,
    reconciliation: Arc<ReconciliationTrigger>,
    start_messages: Arc<CaregivingStartMessageTrigger>,
    history: Arc<ModificationHistoryRecorder>,
    recorded: Arc<RecordingPublisher>,
}

fn harness() -> Harness {
    let bus = EventBus::new();
    let reconciliation = Arc::new(ReconciliationTrigger::new());
    let start_messages = Arc::new(CaregivingStartMessageTrigger::new());
    let history = Arc::new(ModificationHistoryRecorder::new());
    let recorded = Arc::new(RecordingPublisher::new());
    bus.subscribe(reconciliation.clone());
    bus.subscribe(start_messages.clone());
    bus.subscribe(history.clone());
    bus.subscribe(recorded.clone());

    let clock = Arc::new(FixedClock::new(at(1)));
    let service = CaregivingRoundService::new(
        InMemoryRoundRepository::new(),
        bus,
        RoundServiceConfig::default(),
    )
    .with_clock(clock.clone());

    Harness {
        service,
        clock,
        reconciliation,
        start_messages,
        history,
        recorded,
    }
}

/// A round of a fresh reception, with a caregiver, in progress since day 1.
fn in_progress(h: &Harness) -> CaregivingRoundRecord {
    let round = h.service.open_round(ReceptionId::new()).unwrap();
    h.service
        .assign_caregiver(round.id, caregiver("Kim"), &manager())
        .unwrap();
    h.service.start(round.id, at(1), &manager()).unwrap().record
}

// ── Lifecycle ───────────────────────────────────────────────────────────

#[test]
fn full_lifecycle_reaches_reconciliation() {
    let h = harness();
    let round = in_progress(&h);
    let reception = round.reception_id;
    assert_eq!(round.caregiving_state_data.progressing_status, S::CaregivingInProgress);
    assert_eq!(round.version, 3);

    let summary = h.start_messages.summary(reception).unwrap();
    assert_eq!(summary.first_caregiving_round_id, round.id);
    assert_eq!(summary.caregiving_start_date_time, at(1));

    h.clock.set(at(9));
    let finished = h
        .service
        .complete(round.id, at(9), FinishingReason::Finished, &manager())
        .unwrap();
    assert!(finished.next_round.is_none());
    assert_eq!(finished.record.caregiving_state_data.progressing_status, S::Completed);
    let names: Vec<_> = finished.events.iter().map(RoundEvent::name).collect();
    assert!(names.contains(&"LastCaregivingRoundFinished"));
    assert!(names.contains(&"CaregivingRoundModified"));

    h.service
        .handle_billing_modified(
            round.id,
            Modification::new(
                BillingProgressingStatus::WaitingForBilling,
                BillingProgressingStatus::WaitingDeposit,
            ),
            &Subject::System,
        )
        .unwrap();
    assert!(h.reconciliation.candidates().is_empty());

    h.clock.set(at(12));
    h.service
        .handle_settlement_modified(
            round.id,
            Modification::new(
                SettlementProgressingStatus::Confirmed,
                SettlementProgressingStatus::Completed,
            ),
            &Subject::System,
        )
        .unwrap();
    let candidates = h.reconciliation.candidates();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].caregiving_round_id, round.id);
    assert_eq!(candidates[0].issued_date_time, at(12));

    let reconciled = h
        .service
        .complete_reconciliation(round.id, &Subject::System)
        .unwrap();
    assert_eq!(
        reconciled.record.caregiving_state_data.progressing_status,
        S::ReconciliationCompleted
    );
    assert_eq!(h.service.metrics().rejected(), 0);
    assert_eq!(h.service.metrics().accepted(), 6);
}

#[test]
fn every_published_event_reaches_every_subscriber() {
    let h = harness();
    let round = in_progress(&h);
    let names = h.recorded.event_names();
    assert_eq!(
        names
            .iter()
            .filter(|name| **name == "CaregiverAssignedToCaregivingRound")
            .count(),
        1
    );
    assert!(names.contains(&"CaregivingRoundStarted"));
    assert!(h
        .recorded
        .events()
        .iter()
        .all(|event| event.caregiving_round_id() == round.id));
}

// ── Rejections ──────────────────────────────────────────────────────────

#[test]
fn rejected_command_saves_and_publishes_nothing() {
    let h = harness();
    let round = h.service.open_round(ReceptionId::new()).unwrap();

    let err = h.service.start(round.id, at(1), &manager()).unwrap_err();
    assert!(err.is_rejection());
    assert!(matches!(
        err,
        ServiceError::Round(RoundError::Transition(TransitionError::CaregiverNotAssigned { .. }))
    ));

    let stored = h.service.find(round.id).unwrap();
    assert_eq!(stored, round);
    assert!(h.recorded.events().is_empty());
    assert_eq!(h.service.metrics().rejected(), 1);
    assert_eq!(h.service.metrics().accepted(), 0);
}

#[test]
fn start_after_end_is_rejected_without_side_effects() {
    let h = harness();
    let round = in_progress(&h);
    let completed = h
        .service
        .complete(round.id, at(9), FinishingReason::Finished, &manager())
        .unwrap()
        .record;
    h.recorded.clear();

    let err = h
        .service
        .edit_start_date_time(round.id, at(10), &manager())
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Round(RoundError::IllegalCaregivingPeriod { .. })
    ));
    assert!(err.is_rejection());
    assert_eq!(h.service.find(round.id).unwrap(), completed);
    assert!(h.recorded.events().is_empty());
}

#[test]
fn invalid_transition_names_the_attempted_status() {
    let h = harness();
    let round = in_progress(&h);
    let err = h
        .service
        .cancel(
            round.id,
            CancellationReason::CanceledWhileRematching,
            "no longer needed",
            &manager(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Round(RoundError::Transition(TransitionError::InvalidTransition {
            current: S::CaregivingInProgress,
            attempted: S::CanceledWhileRematching,
        }))
    ));
}

// ── Follow-up rounds ────────────────────────────────────────────────────

#[test]
fn finished_continue_opens_next_round_in_progress() {
    let h = harness();
    let round = in_progress(&h);

    let outcome = h
        .service
        .complete(round.id, at(9), FinishingReason::FinishedContinue, &manager())
        .unwrap();
    let next = outcome.next_round.unwrap();
    assert_eq!(next.caregiving_round_number, 2);
    assert_eq!(next.version, 1);
    assert_eq!(next.caregiving_state_data.progressing_status, S::CaregivingInProgress);
    assert_eq!(next.caregiving_state_data.start_date_time, Some(at(9)));
    assert_eq!(
        next.caregiving_state_data
            .caregiver_info
            .as_ref()
            .map(|c| c.name.as_str()),
        Some("Kim")
    );

    let started: Vec<_> = outcome
        .events
        .iter()
        .filter_map(|event| match event {
            RoundEvent::CaregivingRoundStarted(started) => Some(started),
            _ => None,
        })
        .collect();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].caregiving_round_id, next.id);

    let rounds = h.service.rounds_of(round.reception_id).unwrap();
    assert_eq!(rounds.len(), 2);
    // Only the first round sends the start message.
    assert_eq!(h.start_messages.len(), 1);
    assert_eq!(
        h.start_messages
            .summary(round.reception_id)
            .unwrap()
            .first_caregiving_round_id,
        round.id
    );
}

#[test]
fn changing_caregiver_opens_next_round_waiting_for_rematch() {
    let h = harness();
    let round = in_progress(&h);
    let next = h
        .service
        .complete(
            round.id,
            at(9),
            FinishingReason::FinishedChangingCaregiver,
            &manager(),
        )
        .unwrap()
        .next_round
        .unwrap();
    assert_eq!(next.caregiving_state_data.progressing_status, S::NotStarted);
    assert!(next.caregiving_state_data.caregiver_info.is_none());

    let rematching = h
        .service
        .assign_caregiver(next.id, caregiver("Lee"), &manager())
        .unwrap();
    assert_eq!(
        rematching.record.caregiving_state_data.progressing_status,
        S::Rematching
    );

    let pending = h.service.pend(next.id, &Subject::System).unwrap();
    assert_eq!(
        pending.record.caregiving_state_data.progressing_status,
        S::PendingRematching
    );
    assert!(pending.events.is_empty());

    h.clock.set(at(14));
    let canceled = h
        .service
        .cancel(
            next.id,
            CancellationReason::CanceledWhileRematching,
            "guardian declined",
            &manager(),
        )
        .unwrap()
        .record;
    assert_eq!(
        canceled.caregiving_state_data.progressing_status,
        S::CanceledWhileRematching
    );
    assert_eq!(canceled.caregiving_state_data.canceled_date_time, Some(at(14)));
    assert_eq!(
        canceled.caregiving_state_data.detail_closing_reason.as_deref(),
        Some("guardian declined")
    );
}

// ── Modification history ────────────────────────────────────────────────

#[test]
fn direct_edits_become_history_and_feeds_do_not() {
    let h = harness();
    let round = in_progress(&h);
    let after_start = h.history.history(round.reception_id);
    assert_eq!(after_start.len(), 1);
    assert_eq!(after_start[0].modified_property, ModifiedProperty::StartDateTime);
    assert_eq!(after_start[0].previous, None);

    h.clock.set(at(4));
    h.service
        .assign_caregiver(round.id, caregiver("Park"), &manager())
        .unwrap();
    h.service
        .complete(round.id, at(9), FinishingReason::Finished, &manager())
        .unwrap();
    h.service
        .handle_billing_modified(
            round.id,
            Modification::new(
                BillingProgressingStatus::NotStarted,
                BillingProgressingStatus::WaitingForBilling,
            ),
            &Subject::System,
        )
        .unwrap();
    let edited = h
        .service
        .edit_end_date_time(round.id, at(8), &manager())
        .unwrap();
    assert!(edited
        .events
        .iter()
        .any(|event| matches!(event, RoundEvent::LastCaregivingRoundModified(m)
            if m.end_date_time == Modification::new(at(9), at(8)))));

    let history = h.history.history(round.reception_id);
    let properties: Vec<_> = history.iter().map(|entry| entry.modified_property).collect();
    assert_eq!(
        properties,
        vec![
            ModifiedProperty::StartDateTime,
            ModifiedProperty::CaregiverName,
            ModifiedProperty::EndDateTime,
            ModifiedProperty::EndDateTime,
        ]
    );
    assert_eq!(history[1].previous.as_deref(), Some("Kim"));
    assert_eq!(history[1].modified.as_deref(), Some("Park"));
    assert_eq!(history[1].modified_date_time, at(4));
    assert_eq!(history[3].modified.as_deref(), Some("2026-05-08T10:00:00Z"));
}

// ── Optimistic locking ──────────────────────────────────────────────────

/// Simulates a concurrent writer: the first `conflicts` saves find the
/// stored round bumped by someone else.
struct ContendedRepository {
    inner: InMemoryRoundRepository,
    conflicts: AtomicU32,
}

impl ContendedRepository {
    fn new(conflicts: u32) -> Self {
        Self {
            inner: InMemoryRoundRepository::new(),
            conflicts: AtomicU32::new(conflicts),
        }
    }
}

impl CaregivingRoundRepository for ContendedRepository {
    fn find_by_id(
        &self,
        id: CaregivingRoundId,
    ) -> Result<Option<CaregivingRoundRecord>, RepositoryError> {
        self.inner.find_by_id(id)
    }

    fn find_by_reception_id(
        &self,
        reception_id: ReceptionId,
    ) -> Result<Vec<CaregivingRoundRecord>, RepositoryError> {
        self.inner.find_by_reception_id(reception_id)
    }

    fn list(&self) -> Result<Vec<CaregivingRoundRecord>, RepositoryError> {
        self.inner.list()
    }

    fn insert(&self, record: CaregivingRoundRecord) -> Result<u64, RepositoryError> {
        self.inner.insert(record)
    }

    fn save(
        &self,
        record: CaregivingRoundRecord,
        expected_version: u64,
    ) -> Result<u64, RepositoryError> {
        let remaining = self.conflicts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.conflicts.store(remaining - 1, Ordering::SeqCst);
            if let Some(stored) = self.inner.find_by_id(record.id)? {
                let version = stored.version;
                self.inner.save(stored, version)?;
            }
        }
        self.inner.save(record, expected_version)
    }
}

fn contended_service(
    conflicts: u32,
    max_conflict_retries: u32,
) -> CaregivingRoundService<ContendedRepository, RecordingPublisher> {
    CaregivingRoundService::new(
        ContendedRepository::new(conflicts),
        RecordingPublisher::new(),
        RoundServiceConfig {
            max_conflict_retries,
        },
    )
}

#[test]
fn version_conflict_reloads_and_reapplies() {
    let service = contended_service(2, 3);
    let round = service.open_round(ReceptionId::new()).unwrap();

    let outcome = service
        .update_remarks(round.id, "guardian prefers mornings", &manager())
        .unwrap();

    assert_eq!(outcome.record.remarks, "guardian prefers mornings");
    assert_eq!(outcome.record.version, 4);
    assert_eq!(service.metrics().conflict_retries(), 2);
    assert_eq!(service.metrics().accepted(), 1);
    assert_eq!(service.publisher().event_names(), vec!["CaregivingRoundModified"]);
}

#[test]
fn conflict_retries_are_bounded() {
    let service = contended_service(5, 1);
    let round = service.open_round(ReceptionId::new()).unwrap();

    let err = service
        .update_remarks(round.id, "call first", &manager())
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::ConflictRetriesExhausted { attempts: 2, .. }
    ));
    assert!(!err.is_rejection());
    // The final conflict gives up instead of retrying.
    assert_eq!(service.metrics().conflict_retries(), 1);
    assert!(service.publisher().events().is_empty());
    assert_eq!(service.find(round.id).unwrap().remarks, "");
}

// ── Follow-up round storage failures ────────────────────────────────────

/// Stores the first round it is given and refuses every later insert.
struct FullDiskRepository {
    inner: InMemoryRoundRepository,
    inserts: AtomicU32,
}

impl CaregivingRoundRepository for FullDiskRepository {
    fn find_by_id(
        &self,
        id: CaregivingRoundId,
    ) -> Result<Option<CaregivingRoundRecord>, RepositoryError> {
        self.inner.find_by_id(id)
    }

    fn find_by_reception_id(
        &self,
        reception_id: ReceptionId,
    ) -> Result<Vec<CaregivingRoundRecord>, RepositoryError> {
        self.inner.find_by_reception_id(reception_id)
    }

    fn list(&self) -> Result<Vec<CaregivingRoundRecord>, RepositoryError> {
        self.inner.list()
    }

    fn insert(&self, record: CaregivingRoundRecord) -> Result<u64, RepositoryError> {
        if self.inserts.fetch_add(1, Ordering::SeqCst) > 0 {
            return Err(RepositoryError::Storage("disk full".to_string()));
        }
        self.inner.insert(record)
    }

    fn save(
        &self,
        record: CaregivingRoundRecord,
        expected_version: u64,
    ) -> Result<u64, RepositoryError> {
        self.inner.save(record, expected_version)
    }
}

fn full_disk_service() -> CaregivingRoundService<FullDiskRepository, RecordingPublisher> {
    CaregivingRoundService::new(
        FullDiskRepository {
            inner: InMemoryRoundRepository::new(),
            inserts: AtomicU32::new(0),
        },
        RecordingPublisher::new(),
        RoundServiceConfig::default(),
    )
}

#[test]
fn saved_completion_publishes_even_when_follow_up_insert_fails() {
    let service = full_disk_service();
    let round = service.open_round(ReceptionId::new()).unwrap();
    service
        .assign_caregiver(round.id, caregiver("Kim"), &manager())
        .unwrap();
    service.start(round.id, at(1), &manager()).unwrap();
    let published_before = service.publisher().events().len();

    let outcome = service
        .complete(round.id, at(9), FinishingReason::FinishedRestarting, &manager())
        .unwrap();

    assert!(outcome.next_round.is_none());
    assert!(outcome
        .follow_up_error
        .as_deref()
        .is_some_and(|err| err.contains("disk full")));
    assert_eq!(
        service.find(round.id).unwrap().caregiving_state_data.progressing_status,
        S::Completed
    );
    assert_eq!(service.rounds_of(round.reception_id).unwrap().len(), 1);

    let published = service.publisher().events();
    assert_eq!(published.len(), published_before + outcome.events.len());
    assert!(outcome
        .events
        .iter()
        .any(|event| matches!(event, RoundEvent::CaregivingRoundModified(_))));
    assert_eq!(service.metrics().accepted(), 3);
}

#[test]
fn start_of_unstored_follow_up_round_is_withheld() {
    let service = full_disk_service();
    let round = service.open_round(ReceptionId::new()).unwrap();
    service
        .assign_caregiver(round.id, caregiver("Kim"), &manager())
        .unwrap();
    service.start(round.id, at(1), &manager()).unwrap();
    service.publisher().clear();

    let outcome = service
        .complete(round.id, at(9), FinishingReason::FinishedContinue, &manager())
        .unwrap();

    assert!(outcome.next_round.is_none());
    assert!(outcome.follow_up_error.is_some());
    assert!(!outcome
        .events
        .iter()
        .any(|event| matches!(event, RoundEvent::CaregivingRoundStarted(_))));
    let names = service.publisher().event_names();
    assert!(names.contains(&"CaregivingRoundModified"));
    assert!(!names.contains(&"CaregivingRoundStarted"));
}
