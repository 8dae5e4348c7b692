//! Flex error types.

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during flex resolution.
#[derive(Debug, Error)]
pub enum FlexError {
    /// The review item is not open.
    #[error("Review item {0} is not open")]
    ItemNotOpen(Uuid),

    /// Approve-and-apply requires the source match to be suggested.
    #[error("Match {0} is not in suggested status")]
    MatchNotSuggested(Uuid),

    /// A corrected rate is required for this action.
    #[error("A corrected rate is required for adjust actions")]
    CorrectedRateRequired,
}

impl FlexError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::ItemNotOpen(_) | Self::MatchNotSuggested(_) => 409,
            Self::CorrectedRateRequired => 400,
        }
    }
}
