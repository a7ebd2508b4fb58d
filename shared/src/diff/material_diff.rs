use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{
    diff::{changed, patch, DiffError, Diffable},
    scene::Material,
    types::{EntityId, Revision},
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialDiff {
    #[serde(rename = "_id_")]
    pub id: EntityId,
    #[serde(rename = "_version")]
    pub version: Revision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ke: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kd: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ks: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kr: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub double_sided: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub microfacet: Option<bool>,
}

impl MaterialDiff {
    pub fn new(id: EntityId, version: Revision) -> Self {
        Self {
            id,
            version,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ke.is_none()
            && self.kd.is_none()
            && self.ks.is_none()
            && self.n.is_none()
            && self.kr.is_none()
            && self.double_sided.is_none()
            && self.microfacet.is_none()
    }
}

impl Diffable for Material {
    type Diff = MaterialDiff;

    fn compute_diff(&self, new: &Self) -> MaterialDiff {
        MaterialDiff {
            id: new.id,
            version: new.version,
            ke: changed(&self.ke, &new.ke),
            kd: changed(&self.kd, &new.kd),
            ks: changed(&self.ks, &new.ks),
            n: changed(&self.n, &new.n),
            kr: changed(&self.kr, &new.kr),
            double_sided: changed(&self.double_sided, &new.double_sided),
            microfacet: changed(&self.microfacet, &new.microfacet),
        }
    }

    fn apply_diff(&mut self, diff: &MaterialDiff) -> Result<(), DiffError> {
        self.apply_diff_reverse(diff).map(|_| ())
    }

    fn apply_diff_reverse(&mut self, diff: &MaterialDiff) -> Result<MaterialDiff, DiffError> {
        if diff.id != self.id {
            return Err(DiffError::EntityIdMismatch {
                expected: self.id,
                actual: diff.id,
            });
        }
        let mut reverse = MaterialDiff::new(self.id, self.version);
        patch(&mut self.ke, diff.ke, &mut reverse.ke);
        patch(&mut self.kd, diff.kd, &mut reverse.kd);
        patch(&mut self.ks, diff.ks, &mut reverse.ks);
        patch(&mut self.n, diff.n, &mut reverse.n);
        patch(&mut self.kr, diff.kr, &mut reverse.kr);
        patch(&mut self.double_sided, diff.double_sided, &mut reverse.double_sided);
        patch(&mut self.microfacet, diff.microfacet, &mut reverse.microfacet);
        self.version = diff.version;
        Ok(reverse)
    }
}
