use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Rigid transform: an origin plus an orthonormal basis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub o: Vec3,
    pub x: Vec3,
    pub y: Vec3,
    pub z: Vec3,
}

impl Frame {
    pub const IDENTITY: Frame = Frame {
        o: Vec3::ZERO,
        x: Vec3::X,
        y: Vec3::Y,
        z: Vec3::Z,
    };

    pub fn from_origin(o: Vec3) -> Self {
        Self { o, ..Self::IDENTITY }
    }

    /// Frame at `from` looking towards `to`, with `-z` as the view direction.
    pub fn look_at(from: Vec3, to: Vec3, up: Vec3) -> Self {
        let z = (from - to).normalize_or_zero();
        let x = up.cross(z).normalize_or_zero();
        let y = z.cross(x);
        Self { o: from, x, y, z }
    }

    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.o + self.x * p.x + self.y * p.y + self.z * p.z
    }

    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        self.x * v.x + self.y * v.y + self.z * v.z
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::IDENTITY
    }
}

pub fn triangle_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a).normalize_or_zero()
}

/// Quads are split along `a-c`; the normal is the normalized sum of both halves.
pub fn quad_normal(a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> Vec3 {
    (triangle_normal(a, b, c) + triangle_normal(a, c, d)).normalize_or_zero()
}
