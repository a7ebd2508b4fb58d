use crate::wire::{
    header::{hex_len, parse_hex},
    DecodeError, EncodeError,
};

const LEN_DIGITS: usize = 8;

/// A geometry file and its material library, sent as one message.
///
/// Body layout: `[8 hex: name length][name][8 hex: geometry length][geometry][material library]`,
/// the material library taking whatever remains.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetPair {
    pub name: String,
    pub geometry: Vec<u8>,
    pub material_library: Vec<u8>,
}

impl AssetPair {
    pub fn new(name: impl Into<String>, geometry: Vec<u8>, material_library: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            geometry,
            material_library,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut body = Vec::with_capacity(
            2 * LEN_DIGITS + self.name.len() + self.geometry.len() + self.material_library.len(),
        );
        body.extend_from_slice(hex_len(self.name.len())?.as_bytes());
        body.extend_from_slice(self.name.as_bytes());
        body.extend_from_slice(hex_len(self.geometry.len())?.as_bytes());
        body.extend_from_slice(&self.geometry);
        body.extend_from_slice(&self.material_library);
        Ok(body)
    }

    pub fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        let (name, rest) = take_prefixed(body, "name")?;
        let name = String::from_utf8(name.to_vec()).map_err(|_| DecodeError::AssetMalformed {
            reason: "name is not UTF-8".to_string(),
        })?;
        let (geometry, material_library) = take_prefixed(rest, "geometry")?;
        Ok(Self {
            name,
            geometry: geometry.to_vec(),
            material_library: material_library.to_vec(),
        })
    }
}

fn take_prefixed<'a>(bytes: &'a [u8], field: &str) -> Result<(&'a [u8], &'a [u8]), DecodeError> {
    if bytes.len() < LEN_DIGITS {
        return Err(DecodeError::AssetMalformed {
            reason: format!("{} length is truncated", field),
        });
    }
    let (digits, rest) = bytes.split_at(LEN_DIGITS);
    let len = parse_hex(digits).ok_or_else(|| DecodeError::AssetMalformed {
        reason: format!("{} length is not hex", field),
    })? as usize;
    if rest.len() < len {
        return Err(DecodeError::AssetMalformed {
            reason: format!("{} needs {} bytes, {} remain", field, len, rest.len()),
        });
    }
    Ok(rest.split_at(len))
}
