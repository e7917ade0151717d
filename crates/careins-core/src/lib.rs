//! # careins-core: Foundational Types for the Care Insurance Back Office
//!
//! This crate is the leaf of the workspace. It defines the primitives that
//! every other `careins-*` crate shares: identifier newtypes, the UTC
//! timestamp used for every caregiving instant, the `Modification<T>`
//! before/after pair carried by modification events, and the top-level
//! error type.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `CaregivingRoundId` and
//!    `ReceptionId` are distinct types. A reception id cannot be passed
//!    where a round id is expected.
//!
//! 2. **UTC-only timestamps.** `Timestamp` is always UTC with seconds
//!    precision, so two records describing the same instant compare equal.
//!
//! 3. **Modifications are values.** `Modification<T>` records the previous
//!    and current value of a field; consumers ask `has_changed()` instead
//!    of diffing snapshots themselves.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `careins-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod modification;
pub mod temporal;

pub use error::CareinsError;
pub use identity::{CaregivingRoundId, ReceptionId};
pub use modification::Modification;
pub use temporal::Timestamp;
