//! # careins-state: Caregiving Round Progress
//!
//! The lifecycle of one caregiving round, from the moment it is opened for
//! a reception until it is completed, canceled, or closed out by
//! reconciliation.
//!
//! The round's progress is a single tagged union ([`Phase`]) wrapped with
//! the round's immutable identity in [`CaregivingState`]. Each lifecycle
//! command is one method on `CaregivingState` that matches on the current
//! variant and either returns the successor state or a [`TransitionError`].
//! There is no "current status" flag that can drift from the payload: the
//! status is derived from the variant.
//!
//! What gets persisted is [`CaregivingStateData`], a flat record whose
//! populated fields are determined by its `progressing_status`.
//! [`CaregivingState::from_data`] rebuilds the runtime state and reports a
//! [`StateDataError`] when the record contradicts its own status.
//!
//! ## Crate Policy
//!
//! - No I/O, no clock. Instants are always passed in by the caller.
//! - Transitions never mutate their receiver.
//! - [`CaregivingProgressingStatus::allows`] is the declarative transition
//!   table; the machine agrees with it for every status and operation.

pub mod caregiver;
pub mod data;
pub mod error;
pub mod machine;
pub mod reason;
pub mod status;

pub use caregiver::{AccountInfo, CaregiverInfo, Sex};
pub use data::{CaregivingRoundInfo, CaregivingStateData};
pub use error::{StateDataError, TransitionError};
pub use machine::{CaregivingState, Phase};
pub use reason::{CancellationReason, ClosingReasonType, FinishingReason, UnmappedClosingReason};
pub use status::{transition_table, CaregivingProgressingStatus, Operation, UnknownStatus};
