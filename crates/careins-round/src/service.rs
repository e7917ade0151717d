//! # Round Service
//!
//! The controller in front of the round aggregate. For every command it
//! loads the stored record, rebuilds the round, applies the command, saves
//! with the version it loaded, and only then publishes the drained events.
//!
//! A rejected command saves nothing and publishes nothing. A version
//! conflict reloads the round and reapplies the command, up to
//! [`RoundServiceConfig::max_conflict_retries`] times.
//!
//! Once the round is saved the command has happened: its events are
//! published even if inserting the follow-up round fails afterwards. That
//! failure is reported in [`CommandOutcome::follow_up_error`], and the
//! start event of the round that was never stored is withheld.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use careins_core::{CaregivingRoundId, Modification, ReceptionId, Timestamp};
use careins_state::{CancellationReason, CaregiverInfo, CaregivingRoundInfo, FinishingReason};

use crate::billing::{BillingProgressingStatus, SettlementProgressingStatus};
use crate::bus::EventPublisher;
use crate::command::RoundCommand;
use crate::config::RoundServiceConfig;
use crate::error::{RepositoryError, ServiceError};
use crate::events::RoundEvent;
use crate::repository::CaregivingRoundRepository;
use crate::round::{CaregivingRound, CaregivingRoundRecord};
use crate::subject::{CommandContext, Subject};

// ─── Clock ──────────────────────────────────────────────────────────────

/// Source of "now" for command contexts.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<Timestamp>,
}

impl FixedClock {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    pub fn set(&self, now: Timestamp) {
        *self.now.write() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        *self.now.read()
    }
}

// ─── Metrics ────────────────────────────────────────────────────────────

/// Command counters.
#[derive(Debug, Clone, Default)]
pub struct RoundMetrics {
    accepted: Arc<AtomicU64>,
    rejected: Arc<AtomicU64>,
    conflict_retries: Arc<AtomicU64>,
}

impl RoundMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn conflict_retries(&self) -> u64 {
        self.conflict_retries.load(Ordering::Relaxed)
    }
}

// ─── Service ────────────────────────────────────────────────────────────

/// Result of an accepted command.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// The round as saved.
    pub record: CaregivingRoundRecord,
    /// The follow-up round a completion generated, as saved.
    pub next_round: Option<CaregivingRoundRecord>,
    /// Why the follow-up round could not be stored, if it could not.
    pub follow_up_error: Option<String>,
    /// Events published for this command.
    pub events: Vec<RoundEvent>,
}

pub struct CaregivingRoundService<R, P> {
    repository: R,
    publisher: P,
    clock: Arc<dyn Clock>,
    config: RoundServiceConfig,
    metrics: RoundMetrics,
}

impl<R, P> std::fmt::Debug for CaregivingRoundService<R, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaregivingRoundService")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl<R: CaregivingRoundRepository, P: EventPublisher> CaregivingRoundService<R, P> {
    pub fn new(repository: R, publisher: P, config: RoundServiceConfig) -> Self {
        Self {
            repository,
            publisher,
            clock: Arc::new(SystemClock),
            config,
            metrics: RoundMetrics::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn metrics(&self) -> &RoundMetrics {
        &self.metrics
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn find(&self, round_id: CaregivingRoundId) -> Result<CaregivingRoundRecord, ServiceError> {
        self.repository
            .find_by_id(round_id)?
            .ok_or_else(|| RepositoryError::NotFound(round_id).into())
    }

    /// Every stored round, ordered by reception then round number.
    pub fn list(&self) -> Result<Vec<CaregivingRoundRecord>, ServiceError> {
        Ok(self.repository.list()?)
    }

    pub fn rounds_of(
        &self,
        reception_id: ReceptionId,
    ) -> Result<Vec<CaregivingRoundRecord>, ServiceError> {
        Ok(self.repository.find_by_reception_id(reception_id)?)
    }

    // ── Commands ────────────────────────────────────────────────────────

    /// Open the next round of a reception in NOT_STARTED.
    pub fn open_round(
        &self,
        reception_id: ReceptionId,
    ) -> Result<CaregivingRoundRecord, ServiceError> {
        let round_number = self
            .repository
            .find_by_reception_id(reception_id)?
            .iter()
            .map(|record| record.caregiving_round_number)
            .max()
            .map_or(1, |last| last + 1);

        let mut round = CaregivingRound::open(CaregivingRoundInfo {
            round_id: CaregivingRoundId::new(),
            round_number,
            reception_id,
        });
        let version = self.repository.insert(round.to_record())?;
        round.set_version(version);
        info!(
            round_id = %round.id(),
            reception_id = %reception_id,
            round_number,
            "caregiving round opened"
        );
        Ok(round.to_record())
    }

    /// Apply `command` to a stored round.
    pub fn execute(
        &self,
        round_id: CaregivingRoundId,
        command: &RoundCommand,
        subject: &Subject,
    ) -> Result<CommandOutcome, ServiceError> {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            let loaded = self.find(round_id)?;
            let mut round = CaregivingRound::from_record(&loaded)?;
            let ctx = CommandContext::new(subject.clone(), self.clock.now());

            let next_round = match command.apply(&mut round, &ctx) {
                Ok(next_round) => next_round,
                Err(err) => {
                    self.metrics.rejected.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        round_id = %round_id,
                        command = command.name(),
                        subject = %subject,
                        error = %err,
                        "caregiving round command rejected"
                    );
                    return Err(err.into());
                }
            };

            match self.repository.save(round.to_record(), loaded.version) {
                Ok(version) => round.set_version(version),
                Err(err) if err.is_version_conflict() => {
                    if attempts > self.config.max_conflict_retries {
                        warn!(round_id = %round_id, attempts, "giving up after version conflicts");
                        return Err(ServiceError::ConflictRetriesExhausted { round_id, attempts });
                    }
                    self.metrics.conflict_retries.fetch_add(1, Ordering::Relaxed);
                    warn!(round_id = %round_id, attempts, "version conflict, reapplying command");
                    continue;
                }
                Err(err) => return Err(err.into()),
            }

            let mut events = round.take_events();
            let mut follow_up_error = None;
            let next_round = match next_round {
                Some(mut next) => match self.repository.insert(next.to_record()) {
                    Ok(version) => {
                        next.set_version(version);
                        info!(
                            round_id = %next.id(),
                            round_number = next.round_number(),
                            status = %next.status(),
                            "follow-up caregiving round opened"
                        );
                        Some(next.to_record())
                    }
                    Err(err) => {
                        warn!(
                            round_id = %round_id,
                            next_round_id = %next.id(),
                            error = %err,
                            "follow-up caregiving round not stored"
                        );
                        let missing = next.id();
                        events.retain(|event| {
                            !matches!(
                                event,
                                RoundEvent::CaregivingRoundStarted(started)
                                    if started.caregiving_round_id == missing
                            )
                        });
                        follow_up_error = Some(err.to_string());
                        None
                    }
                },
                None => None,
            };

            self.publisher.publish_all(&events);
            self.metrics.accepted.fetch_add(1, Ordering::Relaxed);
            info!(
                round_id = %round_id,
                command = command.name(),
                status = %round.status(),
                events = events.len(),
                "caregiving round command accepted"
            );

            return Ok(CommandOutcome {
                record: round.to_record(),
                next_round,
                follow_up_error,
                events,
            });
        }
    }

    pub fn assign_caregiver(
        &self,
        round_id: CaregivingRoundId,
        caregiver_info: CaregiverInfo,
        subject: &Subject,
    ) -> Result<CommandOutcome, ServiceError> {
        self.execute(round_id, &RoundCommand::AssignCaregiver { caregiver_info }, subject)
    }

    pub fn start(
        &self,
        round_id: CaregivingRoundId,
        start_date_time: Timestamp,
        subject: &Subject,
    ) -> Result<CommandOutcome, ServiceError> {
        self.execute(round_id, &RoundCommand::Start { start_date_time }, subject)
    }

    pub fn edit_start_date_time(
        &self,
        round_id: CaregivingRoundId,
        start_date_time: Timestamp,
        subject: &Subject,
    ) -> Result<CommandOutcome, ServiceError> {
        self.execute(round_id, &RoundCommand::EditStartDateTime { start_date_time }, subject)
    }

    pub fn edit_end_date_time(
        &self,
        round_id: CaregivingRoundId,
        end_date_time: Timestamp,
        subject: &Subject,
    ) -> Result<CommandOutcome, ServiceError> {
        self.execute(round_id, &RoundCommand::EditEndDateTime { end_date_time }, subject)
    }

    pub fn complete(
        &self,
        round_id: CaregivingRoundId,
        end_date_time: Timestamp,
        reason: FinishingReason,
        subject: &Subject,
    ) -> Result<CommandOutcome, ServiceError> {
        self.execute(
            round_id,
            &RoundCommand::Complete {
                end_date_time,
                reason,
            },
            subject,
        )
    }

    pub fn stop(
        &self,
        round_id: CaregivingRoundId,
        stop_date_time: Timestamp,
        subject: &Subject,
    ) -> Result<CommandOutcome, ServiceError> {
        self.execute(round_id, &RoundCommand::Stop { stop_date_time }, subject)
    }

    pub fn cancel(
        &self,
        round_id: CaregivingRoundId,
        reason: CancellationReason,
        detail_reason: impl Into<String>,
        subject: &Subject,
    ) -> Result<CommandOutcome, ServiceError> {
        self.execute(
            round_id,
            &RoundCommand::Cancel {
                reason,
                detail_reason: detail_reason.into(),
            },
            subject,
        )
    }

    pub fn pend(
        &self,
        round_id: CaregivingRoundId,
        subject: &Subject,
    ) -> Result<CommandOutcome, ServiceError> {
        self.execute(round_id, &RoundCommand::Pend, subject)
    }

    pub fn complete_reconciliation(
        &self,
        round_id: CaregivingRoundId,
        subject: &Subject,
    ) -> Result<CommandOutcome, ServiceError> {
        self.execute(round_id, &RoundCommand::CompleteReconciliation, subject)
    }

    pub fn update_remarks(
        &self,
        round_id: CaregivingRoundId,
        remarks: impl Into<String>,
        subject: &Subject,
    ) -> Result<CommandOutcome, ServiceError> {
        self.execute(
            round_id,
            &RoundCommand::UpdateRemarks {
                remarks: remarks.into(),
            },
            subject,
        )
    }

    pub fn handle_billing_modified(
        &self,
        round_id: CaregivingRoundId,
        progressing_status: Modification<BillingProgressingStatus>,
        subject: &Subject,
    ) -> Result<CommandOutcome, ServiceError> {
        self.execute(
            round_id,
            &RoundCommand::BillingModified { progressing_status },
            subject,
        )
    }

    pub fn handle_settlement_modified(
        &self,
        round_id: CaregivingRoundId,
        progressing_status: Modification<SettlementProgressingStatus>,
        subject: &Subject,
    ) -> Result<CommandOutcome, ServiceError> {
        self.execute(
            round_id,
            &RoundCommand::SettlementModified { progressing_status },
            subject,
        )
    }
}
