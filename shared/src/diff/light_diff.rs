use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{
    diff::{changed, patch, DiffError, Diffable},
    frame::Frame,
    scene::Light,
    types::{EntityId, Revision},
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LightDiff {
    #[serde(rename = "_id_")]
    pub id: EntityId,
    #[serde(rename = "_version")]
    pub version: Revision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<Frame>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<Vec3>,
}

impl LightDiff {
    pub fn new(id: EntityId, version: Revision) -> Self {
        Self {
            id,
            version,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_none() && self.intensity.is_none()
    }
}

impl Diffable for Light {
    type Diff = LightDiff;

    fn compute_diff(&self, new: &Self) -> LightDiff {
        LightDiff {
            id: new.id,
            version: new.version,
            frame: changed(&self.frame, &new.frame),
            intensity: changed(&self.intensity, &new.intensity),
        }
    }

    fn apply_diff(&mut self, diff: &LightDiff) -> Result<(), DiffError> {
        self.apply_diff_reverse(diff).map(|_| ())
    }

    fn apply_diff_reverse(&mut self, diff: &LightDiff) -> Result<LightDiff, DiffError> {
        if diff.id != self.id {
            return Err(DiffError::EntityIdMismatch {
                expected: self.id,
                actual: diff.id,
            });
        }
        let mut reverse = LightDiff::new(self.id, self.version);
        patch(&mut self.frame, diff.frame, &mut reverse.frame);
        patch(&mut self.intensity, diff.intensity, &mut reverse.intensity);
        self.version = diff.version;
        Ok(reverse)
    }
}
