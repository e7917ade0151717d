//! # Billing and Settlement Feeds
//!
//! The billing and settlement subsystems own their own lifecycles. A round
//! only mirrors their progressing status so that reconciliation can be
//! triggered once both sides are ready.

use serde::{Deserialize, Serialize};

/// Progress of the billing issued for a round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingProgressingStatus {
    #[default]
    NotStarted,
    WaitingForBilling,
    WaitingDeposit,
    OverDeposit,
    UnderDeposit,
    CompletedDeposit,
}

impl BillingProgressingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::WaitingForBilling => "WAITING_FOR_BILLING",
            Self::WaitingDeposit => "WAITING_DEPOSIT",
            Self::OverDeposit => "OVER_DEPOSIT",
            Self::UnderDeposit => "UNDER_DEPOSIT",
            Self::CompletedDeposit => "COMPLETED_DEPOSIT",
        }
    }

    /// Billing has been issued, so the billing side can be reconciled.
    pub fn is_ready_to_reconcile(&self) -> bool {
        matches!(
            self,
            Self::WaitingDeposit | Self::OverDeposit | Self::UnderDeposit | Self::CompletedDeposit
        )
    }
}

impl std::fmt::Display for BillingProgressingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of the caregiver settlement for a round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementProgressingStatus {
    #[default]
    NotStarted,
    Waiting,
    Confirmed,
    Completed,
}

impl SettlementProgressingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::Waiting => "WAITING",
            Self::Confirmed => "CONFIRMED",
            Self::Completed => "COMPLETED",
        }
    }

    /// The caregiver has been paid.
    pub fn is_ready_to_reconcile(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for SettlementProgressingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
