//! Import normalization error types.

use thiserror::Error;

/// Errors that can occur while normalizing a deposit upload.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Neither usage nor commission is mapped.
    #[error("Neither a usage column nor a commission column is mapped")]
    NoAmountColumn,

    /// A mapped header matches more than one column.
    #[error("Column '{header}' is ambiguous; matches: {joined}", joined = .matches.join(", "))]
    AmbiguousColumn {
        /// The mapped header as supplied by the caller.
        header: String,
        /// The column headers it matched.
        matches: Vec<String>,
    },

    /// A mapped header matches no column.
    #[error("Mapped column not found: '{0}'")]
    ColumnNotFound(String),

    /// The payment date is neither an ISO string nor an Excel serial.
    #[error("Unparseable payment date: '{0}'")]
    InvalidPaymentDate(String),

    /// A non-empty amount cell could not be parsed.
    #[error("Row {row}: invalid amount '{value}'")]
    InvalidAmount {
        /// 1-indexed data row.
        row: usize,
        /// The offending cell content.
        value: String,
    },
}

impl ImportError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::NoAmountColumn | Self::InvalidPaymentDate(_) | Self::InvalidAmount { .. } => 400,
            // Ambiguity is a conflict between the mapping and the file shape.
            Self::AmbiguousColumn { .. } => 409,
            Self::ColumnNotFound(_) => 404,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NoAmountColumn => "NO_AMOUNT_COLUMN",
            Self::AmbiguousColumn { .. } => "AMBIGUOUS_COLUMN",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidPaymentDate(_) => "INVALID_PAYMENT_DATE",
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ImportError::NoAmountColumn.http_status_code(), 400);
        assert_eq!(
            ImportError::AmbiguousColumn {
                header: "usage".into(),
                matches: vec!["Usage".into(), "USAGE ".into()],
            }
            .http_status_code(),
            409
        );
        assert_eq!(
            ImportError::ColumnNotFound("Commission".into()).http_status_code(),
            404
        );
    }

    #[test]
    fn test_ambiguous_display_lists_matches() {
        let err = ImportError::AmbiguousColumn {
            header: "usage".into(),
            matches: vec!["Usage".into(), " USAGE".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("ambiguous"));
        assert!(msg.contains("Usage"));
    }
}
