//! Revenue schedule state enums shared across modules.

use serde::{Deserialize, Serialize};

/// Reconciliation progress of a revenue schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    /// Awaiting allocation.
    Pending,
    /// Has at least one applied allocation.
    Allocated,
    /// Flex adjustment child that has been executed.
    Executed,
    /// Replaced or retired (soft-deleted by a bundle operation).
    Closed,
}

/// Billing state of a revenue schedule.
///
/// `Reconciled` is only ever set by the deposit lifecycle finalize path;
/// `InDispute` only by flex resolution/approval paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingStatus {
    /// Open for reconciliation.
    Open,
    /// Locked by deposit finalize.
    Reconciled,
    /// Under dispute via the flex workflow.
    InDispute,
}

impl BillingStatus {
    /// Returns the string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Reconciled => "reconciled",
            Self::InDispute => "in_dispute",
        }
    }
}

impl ScheduleStatus {
    /// Returns the string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Allocated => "allocated",
            Self::Executed => "executed",
            Self::Closed => "closed",
        }
    }
}
