//! Allocation domain types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Deposit line item reconciliation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemStatus {
    /// No allocations.
    Unmatched,
    /// Has suggested (not yet applied) matches only.
    Suggested,
    /// Partially allocated across one or more schedules.
    PartiallyMatched,
    /// Fully allocated.
    Matched,
}

impl LineItemStatus {
    /// Returns the string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unmatched => "unmatched",
            Self::Suggested => "suggested",
            Self::PartiallyMatched => "partially_matched",
            Self::Matched => "matched",
        }
    }
}

/// Status of a line↔schedule match edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// Proposed; dispute resolution or approval still pending.
    Suggested,
    /// Confirmed allocation.
    Applied,
}

/// How a match edge was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    /// Operator-driven apply.
    Manual,
    /// Auto-match batch runner.
    Auto,
}

/// A line's allocation bookkeeping state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmounts {
    /// Total reported usage.
    pub usage: Decimal,
    /// Usage allocated to schedules.
    pub usage_allocated: Decimal,
    /// Usage not yet allocated.
    pub usage_unallocated: Decimal,
    /// Total reported commission.
    pub commission: Decimal,
    /// Commission allocated to schedules.
    pub commission_allocated: Decimal,
    /// Commission not yet allocated.
    pub commission_unallocated: Decimal,
}

impl LineAmounts {
    /// Creates a fresh, fully-unallocated state.
    #[must_use]
    pub const fn new(usage: Decimal, commission: Decimal) -> Self {
        Self {
            usage,
            usage_allocated: Decimal::ZERO,
            usage_unallocated: usage,
            commission,
            commission_allocated: Decimal::ZERO,
            commission_unallocated: commission,
        }
    }

    /// Returns true if both amounts are fully allocated.
    #[must_use]
    pub fn is_fully_allocated(&self) -> bool {
        self.usage_unallocated.is_zero() && self.commission_unallocated.is_zero()
    }

    /// Returns true if nothing is allocated.
    #[must_use]
    pub fn is_unallocated(&self) -> bool {
        self.usage_allocated.is_zero() && self.commission_allocated.is_zero()
    }

    /// Checks the bookkeeping invariant for both amount pairs.
    #[must_use]
    pub fn invariant_holds(&self) -> bool {
        self.usage_allocated + self.usage_unallocated == self.usage
            && self.commission_allocated + self.commission_unallocated == self.commission
    }
}

/// Result of one allocation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationOutcome {
    /// Updated bookkeeping amounts.
    pub amounts: LineAmounts,
    /// Line status implied by the updated amounts.
    pub status: LineItemStatus,
}
