//! Error types for the synchronization module.

use thiserror::Error;

/// Errors that can occur during synchronization operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyncError {
    /// The request never produced a response (connect failure, timeout, reset).
    #[error("Failed to reach {address}: {reason}")]
    ConnectionFailed { address: String, reason: String },

    /// The remote answered with a non-success status.
    #[error("Server returned error status {status}: {body}")]
    ServerStatus { status: u16, body: String },

    /// The response body was not the expected JSON.
    #[error("Failed to parse response: {0}")]
    InvalidResponse(String),

    /// The response parsed but contradicts the batch it answers.
    #[error("Inconsistent batch response: {0}")]
    InconsistentResponse(String),

    /// The configured endpoint could not be turned into a request URL.
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// Transport initialization error.
    #[error("Failed to initialize transport: {0}")]
    TransportInit(String),

    /// Command channel send error.
    #[error("Failed to send command to background sync: {0}")]
    CommandSendError(String),
}

impl SyncError {
    /// Check if this error means the batch outcome is unknown and every
    /// record must be retained for the next attempt.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            SyncError::ConnectionFailed { .. }
                | SyncError::ServerStatus { .. }
                | SyncError::InvalidResponse(_)
                | SyncError::InconsistentResponse(_)
        )
    }

    /// Check if this is a network/connection error.
    pub fn is_network_error(&self) -> bool {
        matches!(self, SyncError::ConnectionFailed { .. })
    }

    /// Check if this is a protocol error (unusable response).
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidResponse(_) | SyncError::InconsistentResponse(_)
        )
    }

    /// Check if this is a configuration error.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidEndpoint { .. } | SyncError::TransportInit(_)
        )
    }
}

impl From<SyncError> for crate::Error {
    fn from(err: SyncError) -> Self {
        crate::Error::Sync(err)
    }
}
