use thiserror::Error;

use tickref_warehouse::WarehouseError;

/// Validation and contract errors exposed by `tickref-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid tenor '{value}': {reason}")]
    InvalidTenor { value: String, reason: String },

    #[error("invalid filter pattern '{pattern}': {reason}")]
    InvalidFilterPattern { pattern: String, reason: String },

    #[error("'{letter}' is not a futures month code")]
    UnknownExpirationLetter { letter: char },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("request_id must be at least 8 characters")]
    InvalidRequestId,
    #[error("trace_id must be 32 hex characters")]
    InvalidTraceId,
    #[error("schema_version must match vMAJOR.MINOR.PATCH: '{value}'")]
    InvalidSchemaVersion { value: String },

    #[error("error code cannot be empty")]
    EmptyErrorCode,
    #[error("error message cannot be empty")]
    EmptyErrorMessage,
}

impl CoreError {
    /// Stable machine-readable code used in envelopes.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidTenor { .. } => "invalid_tenor",
            Self::InvalidFilterPattern { .. } => "invalid_filter_pattern",
            Self::UnknownExpirationLetter { .. } => "unknown_expiration_letter",
            Self::TimestampNotUtc { .. } => "timestamp_not_utc",
            Self::InvalidRequestId => "invalid_request_id",
            Self::InvalidTraceId => "invalid_trace_id",
            Self::InvalidSchemaVersion { .. } => "invalid_schema_version",
            Self::EmptyErrorCode => "empty_error_code",
            Self::EmptyErrorMessage => "empty_error_message",
        }
    }
}

/// Failure to obtain a catalog snapshot from a [`crate::CatalogSource`].
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error("catalog row rejected: {0}")]
    InvalidRow(String),
}
