use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::types::{EntityId, Revision};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
    #[serde(rename = "_id_")]
    pub id: EntityId,
    #[serde(rename = "_version")]
    pub version: Revision,
    /// emission
    pub ke: Vec3,
    /// diffuse
    pub kd: Vec3,
    /// specular
    pub ks: Vec3,
    /// specular exponent
    pub n: f32,
    /// reflection
    pub kr: Vec3,
    pub double_sided: bool,
    pub microfacet: bool,
}

impl Material {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            version: 0,
            ke: Vec3::ZERO,
            kd: Vec3::ONE,
            ks: Vec3::ZERO,
            n: 10.0,
            kr: Vec3::ZERO,
            double_sided: false,
            microfacet: false,
        }
    }
}
