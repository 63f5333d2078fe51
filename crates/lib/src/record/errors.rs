//! Validation error types for late records.

use thiserror::Error;

/// Errors produced when a late record fails structural validation.
///
/// The display strings double as the per-record reasons reported by the
/// remote batch endpoint, so clients see the same wording whether a record
/// was rejected locally or remotely.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// One or more required fields were absent.
    #[error("Missing required fields")]
    MissingFields {
        /// Names of the fields that were missing
        fields: Vec<&'static str>,
    },

    /// An identifier was zero or negative.
    #[error("All IDs must be positive integers")]
    NonPositiveId {
        /// Name of the offending field
        field: &'static str,
        /// The rejected value
        value: i64,
    },

    /// The event date was not a strict `YYYY-MM-DD` calendar date.
    #[error("Invalid date format, expected YYYY-MM-DD")]
    InvalidDate {
        /// The rejected input
        input: String,
    },
}

impl RecordError {
    /// Check if this error is about a missing field.
    pub fn is_missing_field(&self) -> bool {
        matches!(self, RecordError::MissingFields { .. })
    }

    /// Check if this error is about an identifier.
    pub fn is_invalid_id(&self) -> bool {
        matches!(self, RecordError::NonPositiveId { .. })
    }

    /// Check if this error is about the event date.
    pub fn is_invalid_date(&self) -> bool {
        matches!(self, RecordError::InvalidDate { .. })
    }
}

impl From<RecordError> for crate::Error {
    fn from(err: RecordError) -> Self {
        crate::Error::Record(err)
    }
}
