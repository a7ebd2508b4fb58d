use std::fmt;

use crate::wire::{DecodeError, EncodeError};

const LEN_DIGITS: usize = 8;
const TYPE_DIGITS: usize = 3;

/// Size of the fixed frame header: body length then type code, both hex.
pub const HEADER_LEN: usize = LEN_DIGITS + TYPE_DIGITS;

/// Largest body the length field can describe.
pub const MAX_BODY_LEN: usize = 0xFFFF_FFFF;

/// The payload carried by a frame, as named by its type code.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    // Free-form text operation
    Operation,
    // A whole mesh, optionally with its material
    Mesh,
    SceneDiff,
    MeshDiff,
    CameraDiff,
    LightDiff,
    MaterialDiff,
    // Geometry file plus material library, sent together
    Asset,
}

impl PayloadKind {
    pub fn code(&self) -> u16 {
        match self {
            PayloadKind::Operation => 0,
            PayloadKind::Mesh => 1,
            PayloadKind::SceneDiff => 2,
            PayloadKind::MeshDiff => 3,
            PayloadKind::CameraDiff => 4,
            PayloadKind::LightDiff => 5,
            PayloadKind::MaterialDiff => 6,
            PayloadKind::Asset => 7,
        }
    }

    pub fn from_code(code: u16) -> Result<Self, DecodeError> {
        match code {
            0 => Ok(PayloadKind::Operation),
            1 => Ok(PayloadKind::Mesh),
            2 => Ok(PayloadKind::SceneDiff),
            3 => Ok(PayloadKind::MeshDiff),
            4 => Ok(PayloadKind::CameraDiff),
            5 => Ok(PayloadKind::LightDiff),
            6 => Ok(PayloadKind::MaterialDiff),
            7 => Ok(PayloadKind::Asset),
            _ => Err(DecodeError::UnknownType { code }),
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PayloadKind::Operation => "operation",
            PayloadKind::Mesh => "mesh",
            PayloadKind::SceneDiff => "scene diff",
            PayloadKind::MeshDiff => "mesh diff",
            PayloadKind::CameraDiff => "camera diff",
            PayloadKind::LightDiff => "light diff",
            PayloadKind::MaterialDiff => "material diff",
            PayloadKind::Asset => "asset",
        };
        f.write_str(name)
    }
}

/// The fixed-width prefix of every frame.
///
/// Reading a frame is two-phase: decode the header from the first
/// [`HEADER_LEN`] bytes to learn how many body bytes follow, then read
/// exactly that many and build a [`RawFrame`] from both parts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub body_len: usize,
    pub kind: PayloadKind,
}

impl FrameHeader {
    pub fn new(kind: PayloadKind, body_len: usize) -> Result<Self, EncodeError> {
        if body_len > MAX_BODY_LEN {
            return Err(EncodeError::BodyTooLarge { len: body_len });
        }
        Ok(Self { body_len, kind })
    }

    /// Fails if the announced body is larger than `limit`, before any body is read.
    pub fn check_limit(&self, limit: usize) -> Result<(), DecodeError> {
        if self.body_len > limit {
            return Err(DecodeError::BodyTooLarge {
                len: self.body_len,
                limit,
            });
        }
        Ok(())
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let text = format!("{:08x}{:03x}", self.body_len, self.kind.code());
        let mut header = [0; HEADER_LEN];
        header.copy_from_slice(&text.as_bytes()[..HEADER_LEN]);
        header
    }

    /// Decodes the header at the start of `bytes`; anything past the header
    /// is ignored. An unknown type code is rejected here, before any body is read.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < HEADER_LEN {
            return Err(DecodeError::HeaderTooShort { len: bytes.len() });
        }
        let header = &bytes[..HEADER_LEN];
        let malformed = || DecodeError::HeaderMalformed {
            header: String::from_utf8_lossy(header).into_owned(),
        };
        let body_len = parse_hex(&header[..LEN_DIGITS]).ok_or_else(malformed)?;
        let code = parse_hex(&header[LEN_DIGITS..]).ok_or_else(malformed)?;
        // three hex digits always fit a u16
        let kind = PayloadKind::from_code(code as u16)?;
        Ok(Self {
            body_len: body_len as usize,
            kind,
        })
    }
}

/// Parses lowercase hex digits only; signs, whitespace and uppercase are rejected.
pub(crate) fn parse_hex(digits: &[u8]) -> Option<u64> {
    if digits.is_empty() {
        return None;
    }
    digits.iter().try_fold(0u64, |value, digit| {
        let nibble = match digit {
            b'0'..=b'9' => digit - b'0',
            b'a'..=b'f' => digit - b'a' + 10,
            _ => return None,
        };
        Some((value << 4) | u64::from(nibble))
    })
}

pub(crate) fn hex_len(len: usize) -> Result<String, EncodeError> {
    if len > MAX_BODY_LEN {
        return Err(EncodeError::BodyTooLarge { len });
    }
    Ok(format!("{:08x}", len))
}

/// A complete frame whose body has not been deserialized yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFrame {
    pub kind: PayloadKind,
    pub body: Vec<u8>,
}

impl RawFrame {
    pub fn new(kind: PayloadKind, body: Vec<u8>) -> Result<Self, EncodeError> {
        FrameHeader::new(kind, body.len())?;
        Ok(Self { kind, body })
    }

    pub fn header(&self) -> FrameHeader {
        FrameHeader {
            body_len: self.body.len(),
            kind: self.kind,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.body.len());
        bytes.extend_from_slice(&self.header().encode());
        bytes.extend_from_slice(&self.body);
        bytes
    }

    /// Second decode phase: pairs a header with the body read after it.
    pub fn from_parts(header: FrameHeader, body: Vec<u8>) -> Result<Self, DecodeError> {
        if body.len() != header.body_len {
            return Err(DecodeError::BodyLengthMismatch {
                expected: header.body_len,
                actual: body.len(),
            });
        }
        Ok(Self {
            kind: header.kind,
            body,
        })
    }

    /// Decodes one frame that occupies all of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let header = FrameHeader::decode(bytes)?;
        Self::from_parts(header, bytes[HEADER_LEN..].to_vec())
    }
}
