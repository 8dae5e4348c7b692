//! Allocation error types.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur during allocation bookkeeping.
#[derive(Debug, Error)]
pub enum AllocationError {
    /// Requested allocation exceeds the line's unallocated amount.
    #[error("Allocation of {requested} exceeds unallocated amount {available}")]
    OverAllocation {
        /// Amount the caller asked to allocate.
        requested: Decimal,
        /// Amount still unallocated on the line.
        available: Decimal,
    },

    /// Negative amounts are chargebacks and never reach the allocator.
    #[error("Allocation amounts cannot be negative")]
    NegativeAmount,
}

impl AllocationError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::OverAllocation { .. } => 409,
            Self::NegativeAmount => 400,
        }
    }
}
