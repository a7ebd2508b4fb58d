mod asset;
mod error;
mod header;
mod payload;

pub use asset::AssetPair;
pub use error::{DecodeError, EncodeError};
pub use header::{FrameHeader, PayloadKind, RawFrame, HEADER_LEN, MAX_BODY_LEN};
pub use payload::{MeshTransfer, Payload};
