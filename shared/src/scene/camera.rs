use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{
    frame::Frame,
    types::{EntityId, Revision},
};

/// Perspective camera at `frame.o` looking down `-z`; the image plane of
/// size `width` x `height` sits at distance `dist`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    #[serde(rename = "_id_")]
    pub id: EntityId,
    #[serde(rename = "_version")]
    pub version: Revision,
    pub frame: Frame,
    pub width: f32,
    pub height: f32,
    pub dist: f32,
    pub focus: f32,
}

impl Camera {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            version: 0,
            frame: Frame::IDENTITY,
            width: 1.0,
            height: 1.0,
            dist: 1.0,
            focus: 1.0,
        }
    }

    /// Camera at `from` looking at `to`, with a vertical field of view in
    /// degrees and the given image aspect ratio.
    pub fn look_at(id: EntityId, from: Vec3, to: Vec3, up: Vec3, fovy: f32, aspect: f32) -> Self {
        let height = 2.0 * (fovy.to_radians() / 2.0).tan();
        Self {
            frame: Frame::look_at(from, to, up),
            width: height * aspect,
            height,
            dist: 1.0,
            focus: (from - to).length(),
            ..Self::new(id)
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(0)
    }
}
