use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Material,
    Camera,
    Light,
    Mesh,
    Animation,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Material => "material",
            EntityKind::Camera => "camera",
            EntityKind::Light => "light",
            EntityKind::Mesh => "mesh",
            EntityKind::Animation => "animation",
        };
        f.write_str(name)
    }
}

/// Where an entity lives inside a `Scene`. The payload is the position in
/// the scene's list for that kind; there is only one camera.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityRef {
    Material(usize),
    Camera,
    Light(usize),
    Mesh(usize),
    Animation(usize),
}

impl EntityRef {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Material(_) => EntityKind::Material,
            EntityRef::Camera => EntityKind::Camera,
            EntityRef::Light(_) => EntityKind::Light,
            EntityRef::Mesh(_) => EntityKind::Mesh,
            EntityRef::Animation(_) => EntityKind::Animation,
        }
    }
}
