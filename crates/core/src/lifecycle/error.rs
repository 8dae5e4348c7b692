//! Lifecycle error types.

use thiserror::Error;

/// Errors that can occur during deposit lifecycle transitions.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The deposit is already finalized.
    #[error("Deposit is already finalized")]
    AlreadyFinalized,

    /// Unfinalize requires a finalized deposit.
    #[error("Deposit is not finalized")]
    NotFinalized,
}

impl LifecycleError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::AlreadyFinalized | Self::NotFinalized => 409,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyFinalized => "ALREADY_FINALIZED",
            Self::NotFinalized => "NOT_FINALIZED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_finalized_message() {
        assert!(LifecycleError::AlreadyFinalized
            .to_string()
            .contains("already finalized"));
        assert_eq!(LifecycleError::AlreadyFinalized.http_status_code(), 409);
    }
}
