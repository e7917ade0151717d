//! # Domain Identity Newtypes
//!
//! Newtype wrappers for the identifiers the caregiving subsystem passes
//! around. You cannot hand a `ReceptionId` to something expecting a
//! `CaregivingRoundId`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CareinsError;

/// Unique identifier for a caregiving round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaregivingRoundId(pub Uuid);

/// Unique identifier for a reception (the parent case of one or more rounds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceptionId(pub Uuid);

impl CaregivingRoundId {
    /// Generate a new random round identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CaregivingRoundId {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceptionId {
    /// Generate a new random reception identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReceptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CaregivingRoundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "round:{}", self.0)
    }
}

impl std::fmt::Display for ReceptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "reception:{}", self.0)
    }
}

/// Parse either the bare UUID or the `prefix:<uuid>` display form.
fn parse_prefixed(s: &str, prefix: &str) -> Result<Uuid, CareinsError> {
    let raw = s.strip_prefix(prefix).unwrap_or(s);
    Uuid::parse_str(raw)
        .map_err(|e| CareinsError::Validation(format!("invalid identifier {s:?}: {e}")))
}

impl FromStr for CaregivingRoundId {
    type Err = CareinsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_prefixed(s, "round:").map(Self)
    }
}

impl FromStr for ReceptionId {
    type Err = CareinsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_prefixed(s, "reception:").map(Self)
    }
}
