use thiserror::Error;

use crate::wire::PayloadKind;

/// Errors that can occur while reading a frame off the wire
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// Fewer bytes than a full header were supplied
    #[error("Frame header needs 11 bytes, got {len}")]
    HeaderTooShort { len: usize },

    /// A header field is not zero-padded lowercase hex
    #[error("Frame header {header:?} is not valid hex")]
    HeaderMalformed { header: String },

    /// The type code does not name a known payload
    #[error("Unknown frame type code {code:#x}")]
    UnknownType { code: u16 },

    /// The header announces a body larger than the receiver accepts
    #[error("Frame body of {len} bytes exceeds the limit of {limit}")]
    BodyTooLarge { len: usize, limit: usize },

    /// The body is not as long as the header announced
    #[error("Frame body should be {expected} bytes, got {actual}")]
    BodyLengthMismatch { expected: usize, actual: usize },

    /// The body could not be deserialized as the announced payload
    #[error("Malformed {kind} body: {reason}")]
    BodyMalformed { kind: PayloadKind, reason: String },

    /// The nested layout of a paired asset transfer is broken
    #[error("Malformed asset transfer: {reason}")]
    AssetMalformed { reason: String },
}

/// Errors that can occur while framing a payload
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    /// The body does not fit the 8 hex digit length field
    #[error("Frame body of {len} bytes exceeds the length field")]
    BodyTooLarge { len: usize },

    /// The payload could not be serialized
    #[error("Failed to serialize payload: {reason}")]
    Serialize { reason: String },
}
