//! Finalize/unfinalize state transitions.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::error::LifecycleError;
use super::types::DepositStatus;

/// A validated lifecycle transition with its audit payload.
#[derive(Debug, Clone)]
pub enum LifecycleAction {
    /// Lock the deposit as reconciliation-complete.
    Finalize {
        /// Status to write.
        new_status: DepositStatus,
        /// Value for the deposit and per-line reconciled flags.
        reconciled: bool,
        /// Reconciliation timestamp for the deposit and its lines.
        reconciled_at: DateTime<Utc>,
        /// User performing the transition.
        performed_by: Uuid,
    },
    /// Reopen a finalized deposit.
    Unfinalize {
        /// Status to write.
        new_status: DepositStatus,
        /// Value for the deposit and per-line reconciled flags.
        reconciled: bool,
        /// User performing the transition.
        performed_by: Uuid,
    },
}

impl LifecycleAction {
    /// The status this action writes.
    #[must_use]
    pub const fn new_status(&self) -> DepositStatus {
        match self {
            Self::Finalize { new_status, .. } | Self::Unfinalize { new_status, .. } => *new_status,
        }
    }

    /// The reconciled flag this action writes to the deposit and its lines.
    #[must_use]
    pub const fn reconciled(&self) -> bool {
        match self {
            Self::Finalize { reconciled, .. } | Self::Unfinalize { reconciled, .. } => *reconciled,
        }
    }

    /// The reconciliation timestamp to write; `None` clears it.
    #[must_use]
    pub const fn reconciled_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Finalize { reconciled_at, .. } => Some(*reconciled_at),
            Self::Unfinalize { .. } => None,
        }
    }
}

/// Stateless service validating lifecycle transitions.
pub struct LifecycleService;

impl LifecycleService {
    /// Finalize a deposit.
    ///
    /// `status == Completed` is treated as "already finalized" no matter what
    /// the `reconciled` flag says; the flag is accepted here only to make
    /// that asymmetry explicit at the call site.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::AlreadyFinalized` when the deposit status is
    /// `Completed`.
    pub fn finalize(
        current_status: DepositStatus,
        _reconciled: bool,
        performed_by: Uuid,
    ) -> Result<LifecycleAction, LifecycleError> {
        if current_status.is_finalized() {
            return Err(LifecycleError::AlreadyFinalized);
        }

        Ok(LifecycleAction::Finalize {
            new_status: DepositStatus::Completed,
            reconciled: true,
            reconciled_at: Utc::now(),
            performed_by,
        })
    }

    /// Reopen a finalized deposit: the exact inverse of finalize.
    ///
    /// # Errors
    ///
    /// Returns `LifecycleError::NotFinalized` unless the deposit status is
    /// `Completed`.
    pub fn unfinalize(
        current_status: DepositStatus,
        performed_by: Uuid,
    ) -> Result<LifecycleAction, LifecycleError> {
        if !current_status.is_finalized() {
            return Err(LifecycleError::NotFinalized);
        }

        Ok(LifecycleAction::Unfinalize {
            new_status: DepositStatus::InReview,
            reconciled: false,
            performed_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalize_from_pending() {
        let action =
            LifecycleService::finalize(DepositStatus::Pending, false, Uuid::new_v4()).unwrap();
        assert_eq!(action.new_status(), DepositStatus::Completed);
        assert!(matches!(
            action,
            LifecycleAction::Finalize { reconciled: true, .. }
        ));
    }

    #[test]
    fn test_finalize_from_in_review() {
        let action =
            LifecycleService::finalize(DepositStatus::InReview, false, Uuid::new_v4()).unwrap();
        assert_eq!(action.new_status(), DepositStatus::Completed);
    }

    #[test]
    fn test_finalize_completed_fails() {
        let result = LifecycleService::finalize(DepositStatus::Completed, true, Uuid::new_v4());
        assert!(matches!(result, Err(LifecycleError::AlreadyFinalized)));
    }

    #[test]
    fn test_finalize_trusts_status_over_reconciled_flag() {
        // Completed with reconciled=false still counts as finalized.
        let result = LifecycleService::finalize(DepositStatus::Completed, false, Uuid::new_v4());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("already finalized"));
    }

    #[test]
    fn test_unfinalize_completed() {
        let action = LifecycleService::unfinalize(DepositStatus::Completed, Uuid::new_v4()).unwrap();
        assert_eq!(action.new_status(), DepositStatus::InReview);
        assert!(matches!(
            action,
            LifecycleAction::Unfinalize { reconciled: false, .. }
        ));
    }

    #[test]
    fn test_unfinalize_pending_fails() {
        let result = LifecycleService::unfinalize(DepositStatus::Pending, Uuid::new_v4());
        assert!(matches!(result, Err(LifecycleError::NotFinalized)));
    }
}
