//! The actor behind a command, and the context every command runs in.

use careins_core::Timestamp;
use serde::{Deserialize, Serialize};

/// Who issued a command.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Subject {
    /// A back-office user, by user id.
    User(String),
    /// A system-driven feed (billing, settlement, reconciliation).
    System,
}

impl Subject {
    pub fn user(id: impl Into<String>) -> Self {
        Self::User(id.into())
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::System => f.write_str("system"),
        }
    }
}

/// Acting subject plus the instant the command was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandContext {
    pub subject: Subject,
    pub now: Timestamp,
}

impl CommandContext {
    pub fn new(subject: Subject, now: Timestamp) -> Self {
        Self { subject, now }
    }
}
