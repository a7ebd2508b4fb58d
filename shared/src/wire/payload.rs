use log::trace;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    diff::{CameraDiff, LightDiff, MaterialDiff, MeshDiff, SceneDiff},
    mesh::Mesh,
    scene::Material,
    wire::{AssetPair, DecodeError, EncodeError, FrameHeader, PayloadKind, RawFrame},
};

/// A whole mesh, optionally with the material it uses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshTransfer {
    pub mesh: Mesh,
    #[serde(default)]
    pub material: Option<Material>,
}

/// Everything a frame can carry.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Operation(String),
    Mesh(MeshTransfer),
    SceneDiff(SceneDiff),
    MeshDiff(MeshDiff),
    CameraDiff(CameraDiff),
    LightDiff(LightDiff),
    MaterialDiff(MaterialDiff),
    Asset(AssetPair),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Operation(_) => PayloadKind::Operation,
            Payload::Mesh(_) => PayloadKind::Mesh,
            Payload::SceneDiff(_) => PayloadKind::SceneDiff,
            Payload::MeshDiff(_) => PayloadKind::MeshDiff,
            Payload::CameraDiff(_) => PayloadKind::CameraDiff,
            Payload::LightDiff(_) => PayloadKind::LightDiff,
            Payload::MaterialDiff(_) => PayloadKind::MaterialDiff,
            Payload::Asset(_) => PayloadKind::Asset,
        }
    }

    pub fn to_frame(&self) -> Result<RawFrame, EncodeError> {
        let body = match self {
            Payload::Operation(text) => text.as_bytes().to_vec(),
            Payload::Mesh(transfer) => to_json(transfer)?,
            Payload::SceneDiff(diff) => to_json(diff)?,
            Payload::MeshDiff(diff) => to_json(diff)?,
            Payload::CameraDiff(diff) => to_json(diff)?,
            Payload::LightDiff(diff) => to_json(diff)?,
            Payload::MaterialDiff(diff) => to_json(diff)?,
            Payload::Asset(asset) => asset.encode()?,
        };
        RawFrame::new(self.kind(), body)
    }

    /// Frames the payload: header followed by body.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let frame = self.to_frame()?;
        trace!("Encoded {} frame, {} body bytes", frame.kind, frame.body.len());
        Ok(frame.to_bytes())
    }

    /// Decodes one frame that occupies all of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::from_frame(&RawFrame::decode(bytes)?)
    }

    pub fn from_parts(header: FrameHeader, body: Vec<u8>) -> Result<Self, DecodeError> {
        Self::from_frame(&RawFrame::from_parts(header, body)?)
    }

    pub fn from_frame(frame: &RawFrame) -> Result<Self, DecodeError> {
        let kind = frame.kind;
        let body = frame.body.as_slice();
        let payload = match kind {
            PayloadKind::Operation => {
                let text = std::str::from_utf8(body).map_err(|err| DecodeError::BodyMalformed {
                    kind,
                    reason: err.to_string(),
                })?;
                Payload::Operation(text.to_string())
            }
            PayloadKind::Mesh => {
                let transfer: MeshTransfer = from_json(kind, body)?;
                // derived data came over the wire too; refuse a mesh that contradicts itself
                transfer
                    .mesh
                    .validate()
                    .map_err(|err| DecodeError::BodyMalformed {
                        kind,
                        reason: err.to_string(),
                    })?;
                Payload::Mesh(transfer)
            }
            PayloadKind::SceneDiff => Payload::SceneDiff(from_json(kind, body)?),
            PayloadKind::MeshDiff => Payload::MeshDiff(from_json(kind, body)?),
            PayloadKind::CameraDiff => Payload::CameraDiff(from_json(kind, body)?),
            PayloadKind::LightDiff => Payload::LightDiff(from_json(kind, body)?),
            PayloadKind::MaterialDiff => Payload::MaterialDiff(from_json(kind, body)?),
            PayloadKind::Asset => Payload::Asset(AssetPair::decode(body)?),
        };
        Ok(payload)
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>, EncodeError> {
    serde_json::to_vec(value).map_err(|err| EncodeError::Serialize {
        reason: err.to_string(),
    })
}

fn from_json<T: DeserializeOwned>(kind: PayloadKind, body: &[u8]) -> Result<T, DecodeError> {
    serde_json::from_slice(body).map_err(|err| DecodeError::BodyMalformed {
        kind,
        reason: err.to_string(),
    })
}
