use thiserror::Error;

use meshsync_shared::{DecodeError, EncodeError, HistoryError, SceneError};

/// Errors returned by the collaborator-facing client operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// The operation needs a connection and there is none
    #[error("Client is not connected")]
    NotConnected,

    /// The transport failed; the connection has been dropped
    #[error("Transport failure: {reason}")]
    Transport { reason: String },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    History(#[from] HistoryError),
}
