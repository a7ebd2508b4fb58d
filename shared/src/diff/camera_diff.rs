use serde::{Deserialize, Serialize};

use crate::{
    diff::{changed, patch, DiffError, Diffable},
    frame::Frame,
    scene::Camera,
    types::{EntityId, Revision},
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraDiff {
    #[serde(rename = "_id_")]
    pub id: EntityId,
    #[serde(rename = "_version")]
    pub version: Revision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<Frame>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dist: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<f32>,
}

impl CameraDiff {
    pub fn new(id: EntityId, version: Revision) -> Self {
        Self {
            id,
            version,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_none()
            && self.width.is_none()
            && self.height.is_none()
            && self.dist.is_none()
            && self.focus.is_none()
    }
}

/// A scene has a single camera, so camera diffs are not matched by id.
impl Diffable for Camera {
    type Diff = CameraDiff;

    fn compute_diff(&self, new: &Self) -> CameraDiff {
        CameraDiff {
            id: new.id,
            version: new.version,
            frame: changed(&self.frame, &new.frame),
            width: changed(&self.width, &new.width),
            height: changed(&self.height, &new.height),
            dist: changed(&self.dist, &new.dist),
            focus: changed(&self.focus, &new.focus),
        }
    }

    fn apply_diff(&mut self, diff: &CameraDiff) -> Result<(), DiffError> {
        self.apply_diff_reverse(diff).map(|_| ())
    }

    fn apply_diff_reverse(&mut self, diff: &CameraDiff) -> Result<CameraDiff, DiffError> {
        let mut reverse = CameraDiff::new(self.id, self.version);
        patch(&mut self.frame, diff.frame, &mut reverse.frame);
        patch(&mut self.width, diff.width, &mut reverse.width);
        patch(&mut self.height, diff.height, &mut reverse.height);
        patch(&mut self.dist, diff.dist, &mut reverse.dist);
        patch(&mut self.focus, diff.focus, &mut reverse.focus);
        self.version = diff.version;
        Ok(reverse)
    }
}
