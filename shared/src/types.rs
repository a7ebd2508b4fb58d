/// Stable identifier of a mesh sub-element (vertex, edge, triangle or quad).
pub type ElementId = u64;
/// Stable identifier of a scene entity (mesh, camera, light, material, animation).
pub type EntityId = u64;
/// Version label stamped on a recorded `SceneDiff`.
pub type VersionLabel = u64;
/// Per-entity revision counter carried by diffs.
pub type Revision = u32;

/// Synthetic label meaning "no diffs applied yet".
pub const BASE_VERSION: VersionLabel = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    Vertex,
    Edge,
    Triangle,
    Quad,
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ElementKind::Vertex => "vertex",
            ElementKind::Edge => "edge",
            ElementKind::Triangle => "triangle",
            ElementKind::Quad => "quad",
        };
        f.write_str(name)
    }
}
