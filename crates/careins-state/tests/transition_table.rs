//! The machine and the declarative transition table must agree for every
//! status and every operation.

use careins_core::{CaregivingRoundId, ReceptionId, Timestamp};
use careins_state::{
    AccountInfo, CancellationReason, CaregiverInfo, CaregivingProgressingStatus as S,
    CaregivingRoundInfo, CaregivingState, FinishingReason, Operation, Phase, Sex, TransitionError,
};
use proptest::prelude::*;

fn caregiver(name: &str) -> CaregiverInfo {
    CaregiverInfo {
        caregiver_organization_id: None,
        name: name.to_string(),
        sex: Sex::Male,
        birth_date: None,
        phone_number: "01099998888".to_string(),
        daily_caregiving_charge: 120_000,
        commission_fee: 0,
        insured: false,
        account_info: AccountInfo::default(),
    }
}

fn ts(offset_hours: u32) -> Timestamp {
    Timestamp::from_ymd_hms(2026, 1, 1 + offset_hours / 24, offset_hours % 24, 0, 0).unwrap()
}

/// A round in `status` with a caregiver attached.
fn reach(status: S, round_number: u32) -> CaregivingState {
    let info = CaregivingRoundInfo {
        round_id: CaregivingRoundId::new(),
        round_number,
        reception_id: ReceptionId::new(),
    };
    let opened = CaregivingState::initial(info);
    // A first round never reaches REMATCHING by assignment, so seed it.
    let rematching = || CaregivingState::new(info, Phase::Rematching { caregiver: caregiver("A") });
    let in_progress = || {
        opened
            .assign_caregiver(caregiver("A"))
            .unwrap()
            .start(ts(1))
            .unwrap()
    };

    let state = match status {
        S::NotStarted => CaregivingState::new(
            info,
            Phase::NotStarted {
                caregiver: Some(caregiver("A")),
            },
        ),
        S::Rematching => rematching(),
        S::PendingRematching => rematching().pend().unwrap(),
        S::CaregivingInProgress => in_progress(),
        S::CompletedRestarting => in_progress().stop(ts(30)).unwrap(),
        S::Completed => in_progress().complete(ts(40), FinishingReason::Finished).unwrap(),
        S::CompletedUsingPersonalCaregiver => in_progress()
            .complete(ts(40), FinishingReason::FinishedUsingPersonalCaregiver)
            .unwrap(),
        S::CanceledWhileRematching => rematching()
            .cancel(CancellationReason::CanceledWhileRematching, "closed", ts(5))
            .unwrap(),
        S::ReconciliationCompleted => in_progress()
            .complete(ts(40), FinishingReason::Finished)
            .unwrap()
            .complete_reconciliation()
            .unwrap(),
    };
    assert_eq!(state.status(), status);
    state
}

fn apply(state: &CaregivingState, op: Operation) -> Result<CaregivingState, TransitionError> {
    match op {
        Operation::AssignCaregiver => state.assign_caregiver(caregiver("B")),
        Operation::Start => state.start(ts(2)),
        Operation::EditStartDateTime => state.edit_start_date_time(ts(3)),
        Operation::EditEndDateTime => state.edit_end_date_time(ts(50)),
        Operation::Complete => state.complete(ts(60), FinishingReason::FinishedRestarting),
        Operation::Stop => state.stop(ts(45)),
        Operation::Cancel => {
            state.cancel(CancellationReason::CanceledUsingPersonalCaregiver, "x", ts(6))
        }
        Operation::Pend => state.pend(),
        Operation::CompleteReconciliation => state.complete_reconciliation(),
    }
}

fn attempted_status(op: Operation) -> Option<S> {
    match op {
        Operation::Start => Some(S::CaregivingInProgress),
        Operation::Complete => Some(S::Completed),
        Operation::Stop => Some(S::CompletedRestarting),
        Operation::Cancel => Some(S::CanceledWhileRematching),
        Operation::Pend => Some(S::PendingRematching),
        Operation::CompleteReconciliation => Some(S::ReconciliationCompleted),
        Operation::AssignCaregiver | Operation::EditStartDateTime | Operation::EditEndDateTime => {
            None
        }
    }
}

#[test]
fn machine_agrees_with_transition_table() {
    for status in S::ALL {
        for round_number in [1, 2] {
            let state = reach(status, round_number);
            for op in Operation::ALL {
                let result = apply(&state, op);
                assert_eq!(
                    result.is_ok(),
                    status.allows(op),
                    "{status} / {op} / round {round_number}: {result:?}"
                );
                if let Err(TransitionError::InvalidTransition { current, attempted }) = result {
                    assert_eq!(current, status);
                    assert_eq!(Some(attempted), attempted_status(op));
                }
            }
        }
    }
}

#[test]
fn rejected_edits_report_missing_times() {
    let rematching = reach(S::Rematching, 2);
    assert!(matches!(
        rematching.edit_start_date_time(ts(1)),
        Err(TransitionError::CaregivingNotStarted { .. })
    ));
    let in_progress = reach(S::CaregivingInProgress, 1);
    assert!(matches!(
        in_progress.edit_end_date_time(ts(1)),
        Err(TransitionError::CaregivingNotFinished { .. })
    ));
}

#[test]
fn stop_is_reported_against_restarting_from_every_state() {
    for status in S::ALL {
        if status == S::CaregivingInProgress {
            continue;
        }
        let err = reach(status, 2).stop(ts(10)).unwrap_err();
        assert_eq!(
            err,
            TransitionError::InvalidTransition {
                current: status,
                attempted: S::CompletedRestarting,
            }
        );
    }
}

fn any_status() -> impl Strategy<Value = S> {
    prop::sample::select(S::ALL.to_vec())
}

fn any_operation() -> impl Strategy<Value = Operation> {
    prop::sample::select(Operation::ALL.to_vec())
}

proptest! {
    /// Any accepted sequence of commands yields data that rebuilds to the
    /// same state.
    #[test]
    fn accepted_sequences_roundtrip_through_data(
        start in any_status(),
        round_number in 1u32..5,
        ops in prop::collection::vec(any_operation(), 0..12),
    ) {
        let mut state = reach(start, round_number);
        for op in ops {
            if let Ok(next) = apply(&state, op) {
                state = next;
            }
        }
        let rebuilt = CaregivingState::from_data(*state.info(), &state.data()).unwrap();
        prop_assert_eq!(rebuilt, state);
    }

    /// Assignment never changes status outside the matching family.
    #[test]
    fn assignment_keeps_status_once_started(status in any_status()) {
        prop_assume!(!matches!(status, S::NotStarted | S::Rematching | S::PendingRematching));
        let state = reach(status, 3);
        let assigned = state.assign_caregiver(caregiver("C")).unwrap();
        prop_assert_eq!(assigned.status(), status);
        prop_assert_eq!(assigned.caregiver().map(|c| c.name.clone()), Some("C".to_string()));
    }
}
