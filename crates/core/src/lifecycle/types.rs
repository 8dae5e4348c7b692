//! Deposit lifecycle types.

use serde::{Deserialize, Serialize};

/// Deposit reconciliation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    /// Imported, reconciliation not started.
    Pending,
    /// Under active reconciliation.
    InReview,
    /// Finalized.
    Completed,
}

impl DepositStatus {
    /// Returns the string form used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InReview => "in_review",
            Self::Completed => "completed",
        }
    }

    /// Returns true if this status is the canonical finalized signal.
    #[must_use]
    pub fn is_finalized(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::str::FromStr for DepositStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "in_review" => Ok(Self::InReview),
            "completed" => Ok(Self::Completed),
            other => Err(format!("Unknown deposit status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_round_trip() {
        for status in [
            DepositStatus::Pending,
            DepositStatus::InReview,
            DepositStatus::Completed,
        ] {
            assert_eq!(DepositStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn test_only_completed_is_finalized() {
        assert!(DepositStatus::Completed.is_finalized());
        assert!(!DepositStatus::Pending.is_finalized());
        assert!(!DepositStatus::InReview.is_finalized());
    }
}
