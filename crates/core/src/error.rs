//! Error types for the MediaROM core

use thiserror::Error;

use crate::protocol::{ErrorCode, ObjectHandle, RemoteError};

/// Result type alias for MediaROM operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the MediaROM core
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or undecodable protocol message
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Operation addressed an unknown or released handle
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    /// Server-side object construction failed
    #[error("Construction failed: {0}")]
    Construction(String),

    /// Client-side use of a proxy after its handle was released
    #[error("Stale proxy: {0} was already released")]
    StaleHandle(ObjectHandle),

    /// Operation is not part of the target's declared capability set
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// A parameter was missing or had the wrong shape
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    /// An operation was dispatched but the object reported a failure
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    /// Connection-level failure; pending requests on the connection are lost
    #[error("Transport error: {0}")]
    Transport(String),

    /// No response arrived within the configured bound
    #[error("Request {id} timed out after {timeout_ms}ms")]
    Timeout {
        /// Correlation id of the abandoned request
        id: u64,
        /// Timeout bound in milliseconds
        timeout_ms: u64,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Collapse into the wire-level descriptor returned to clients.
    ///
    /// Server faults never cross the transport as raw errors; the dispatcher
    /// calls this at its boundary and ships a typed `RemoteError` instead.
    pub fn to_remote(&self) -> RemoteError {
        let code = match self {
            Error::InvalidHandle(_) | Error::StaleHandle(_) => ErrorCode::InvalidHandle,
            Error::Construction(_) => ErrorCode::ConstructionFailed,
            Error::UnsupportedOperation(_) => ErrorCode::MethodNotFound,
            Error::InvalidParam(_) => ErrorCode::InvalidParam,
            Error::OperationFailed(_) => ErrorCode::OperationFailed,
            Error::Protocol(_)
            | Error::Transport(_)
            | Error::Timeout { .. }
            | Error::Io(_)
            | Error::Serialization(_)
            | Error::Config(_)
            | Error::Other(_) => ErrorCode::Internal,
        };
        RemoteError::new(code, self.to_string())
    }
}

impl From<RemoteError> for Error {
    fn from(err: RemoteError) -> Self {
        match err.code {
            ErrorCode::InvalidHandle => Error::InvalidHandle(err.message),
            ErrorCode::ConstructionFailed => Error::Construction(err.message),
            ErrorCode::MethodNotFound => Error::UnsupportedOperation(err.message),
            ErrorCode::InvalidParam => Error::InvalidParam(err.message),
            ErrorCode::OperationFailed => Error::OperationFailed(err.message),
            ErrorCode::Internal => Error::Other(err.message),
        }
    }
}
