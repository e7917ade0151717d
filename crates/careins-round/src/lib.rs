//! # careins-round: Caregiving Round Orchestration
//!
//! Everything around the caregiving state machine that makes it a round
//! of a reception:
//!
//! - [`CaregivingRound`] aggregate: the state machine plus billing and
//!   settlement mirrors, remarks, modification tracking, and an event
//!   outbox.
//! - [`RoundEvent`] contracts consumed by reconciliation, start messaging
//!   and modification history.
//! - [`CaregivingRoundRepository`] seam with optimistic locking, and an
//!   in-memory implementation.
//! - [`EventBus`] and the downstream [`subscribers`].
//! - [`CaregivingRoundService`], the controller that loads, applies, saves,
//!   and publishes, retrying on version conflicts.
//!
//! ## Data Flow
//!
//! ```text
//! command ─▶ service ─▶ repository.find_by_id ─▶ CaregivingRound::from_record
//!                          │
//!                          ▼
//!               RoundCommand::apply ──Err──▶ nothing saved, nothing published
//!                          │ Ok
//!                          ▼
//!               repository.save(expected_version) ──conflict──▶ reload, reapply
//!                          │
//!                          ▼
//!               take_events ─▶ EventPublisher ─▶ subscribers
//! ```

pub mod billing;
pub mod bus;
pub mod command;
pub mod config;
pub mod error;
pub mod events;
pub mod repository;
pub mod round;
pub mod service;
pub mod subject;
pub mod subscribers;

pub use billing::{BillingProgressingStatus, SettlementProgressingStatus};
pub use bus::{EventBus, EventPublisher, RecordingPublisher, RoundEventHandler};
pub use command::RoundCommand;
pub use config::{ConfigError, RoundServiceConfig};
pub use error::{RepositoryError, RoundError, ServiceError};
pub use events::{
    CaregiverAssignedToCaregivingRound, CaregivingRoundModified, CaregivingRoundStarted, Cause,
    LastCaregivingRoundFinished, LastCaregivingRoundModified, RoundEvent,
};
pub use repository::{sort_records, CaregivingRoundRepository, InMemoryRoundRepository};
pub use round::{CaregivingRound, CaregivingRoundRecord, FinishingResult};
pub use service::{
    CaregivingRoundService, Clock, CommandOutcome, FixedClock, RoundMetrics, SystemClock,
};
pub use subject::{CommandContext, Subject};
pub use subscribers::{
    CaregivingStartMessageTrigger, ModificationHistoryRecorder, ReconciliationTrigger,
};
