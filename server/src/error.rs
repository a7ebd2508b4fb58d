use std::net::SocketAddr;

use thiserror::Error;

use meshsync_shared::{DecodeError, EncodeError};

/// Errors that can occur while running the relay
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServerError {
    /// Called before `listen`
    #[error("Server is not listening")]
    NotListening,

    /// No session is connected from this address
    #[error("No session from {address}")]
    SessionNotFound { address: SocketAddr },

    /// The transport refused a frame for this session
    #[error("Failed to send to {address}")]
    SendFailed { address: SocketAddr },

    /// The transport stopped delivering events
    #[error("Transport receive failed")]
    ReceiveFailed,

    /// A session sent a frame that could not be decoded
    #[error("Rejected frame from {address}: {error}")]
    Rejected {
        address: SocketAddr,
        error: DecodeError,
    },

    #[error(transparent)]
    Encode(#[from] EncodeError),
}
