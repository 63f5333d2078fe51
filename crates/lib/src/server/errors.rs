//! Error types for the remote batch endpoint.

use thiserror::Error;

/// Errors raised by the remote record store and its HTTP server.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ServerError {
    /// The record database failed.
    #[error("Record store error: {reason}")]
    Storage {
        /// What the store was doing when it failed
        reason: String,
        /// The underlying sqlx error, if any
        #[source]
        source: Option<sqlx::Error>,
    },

    /// The request body was not a batch.
    #[error("{0}")]
    BadRequest(String),

    /// The listener could not be bound.
    #[error("Failed to bind server to {address}: {reason}")]
    Bind { address: String, reason: String },

    /// Attempted to start a server that is already running.
    #[error("Server already running on {address}")]
    AlreadyRunning { address: String },

    /// Attempted to stop a server when none is running.
    #[error("Server not running")]
    NotRunning,
}

impl ServerError {
    /// Check if this error came from the record database.
    pub fn is_storage_error(&self) -> bool {
        matches!(self, ServerError::Storage { .. })
    }

    /// Check if the client sent an unusable request.
    pub fn is_bad_request(&self) -> bool {
        matches!(self, ServerError::BadRequest(_))
    }

    /// Check if this is a server lifecycle error.
    pub fn is_lifecycle_error(&self) -> bool {
        matches!(
            self,
            ServerError::Bind { .. } | ServerError::AlreadyRunning { .. } | ServerError::NotRunning
        )
    }
}

impl From<ServerError> for crate::Error {
    fn from(err: ServerError) -> Self {
        crate::Error::Server(err)
    }
}
