//! Bundle error types.

use thiserror::Error;
use uuid::Uuid;

fn join_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors that can occur during bundle operations.
///
/// All of these are state conflicts: the operator must change the underlying
/// allocations before retrying, so each message names the blocking condition.
#[derive(Debug, Error)]
pub enum BundleError {
    /// Selected lines already carry applied allocations.
    #[error("Line items already have applied allocations: {joined}", joined = join_ids(.line_ids))]
    AlreadyAllocated {
        /// The offending line item ids.
        line_ids: Vec<Uuid>,
    },

    /// Replaced schedules still hold applied matches somewhere.
    #[error("Revenue schedules cannot be safely replaced; applied allocations exist on: {joined}", joined = join_ids(.schedule_ids))]
    UnsafeReplacement {
        /// The schedules that block replacement.
        schedule_ids: Vec<Uuid>,
    },

    /// Created schedules accumulated applied matches since the operation.
    #[error("Bundle operation cannot be undone safely; applied allocations exist on: {joined}", joined = join_ids(.schedule_ids))]
    UnsafeUndo {
        /// The created schedules that block undo.
        schedule_ids: Vec<Uuid>,
    },

    /// No lines were selected.
    #[error("At least one line item is required")]
    NoLines,

    /// The base schedule's sibling window is empty.
    #[error("Base schedule has no sibling window to split")]
    EmptyWindow,
}

impl BundleError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::AlreadyAllocated { .. }
            | Self::UnsafeReplacement { .. }
            | Self::UnsafeUndo { .. } => 409,
            Self::NoLines | Self::EmptyWindow => 400,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyAllocated { .. } => "ALREADY_ALLOCATED",
            Self::UnsafeReplacement { .. } => "UNSAFE_REPLACEMENT",
            Self::UnsafeUndo { .. } => "UNSAFE_UNDO",
            Self::NoLines => "NO_LINES",
            Self::EmptyWindow => "EMPTY_WINDOW",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_blocking_condition() {
        let id = Uuid::new_v4();
        assert!(BundleError::AlreadyAllocated { line_ids: vec![id] }
            .to_string()
            .contains("already have applied allocations"));
        assert!(BundleError::UnsafeReplacement { schedule_ids: vec![id] }
            .to_string()
            .contains("cannot be safely replaced"));
        assert!(BundleError::UnsafeUndo { schedule_ids: vec![id] }
            .to_string()
            .contains("cannot be undone safely"));
    }

    #[test]
    fn test_conflicts_map_to_409() {
        assert_eq!(
            BundleError::AlreadyAllocated { line_ids: vec![] }.http_status_code(),
            409
        );
        assert_eq!(
            BundleError::UnsafeReplacement { schedule_ids: vec![] }.http_status_code(),
            409
        );
        assert_eq!(
            BundleError::UnsafeUndo { schedule_ids: vec![] }.http_status_code(),
            409
        );
    }
}
