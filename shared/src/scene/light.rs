use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{
    frame::Frame,
    types::{EntityId, Revision},
};

/// Point light at `frame.o`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Light {
    #[serde(rename = "_id_")]
    pub id: EntityId,
    #[serde(rename = "_version")]
    pub version: Revision,
    pub frame: Frame,
    pub intensity: Vec3,
}

impl Light {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            version: 0,
            frame: Frame::IDENTITY,
            intensity: Vec3::ONE,
        }
    }
}
