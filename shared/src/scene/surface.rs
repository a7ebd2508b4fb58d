use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{frame::Frame, types::EntityId};

/// Analytic sphere or quad primitive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub frame: Frame,
    pub radius: f32,
    pub is_quad: bool,
    pub material: Option<EntityId>,
    pub animation: Option<EntityId>,
}

impl Default for Surface {
    fn default() -> Self {
        Self {
            frame: Frame::IDENTITY,
            radius: 1.0,
            is_quad: false,
            material: None,
            animation: None,
        }
    }
}

/// Keyframed rigid animation attached to a surface.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameAnimation {
    #[serde(rename = "_id_")]
    pub id: EntityId,
    pub rest_frame: Frame,
    pub keytimes: Vec<u32>,
    pub translation: Vec<Vec3>,
    pub rotation: Vec<Vec3>,
}
