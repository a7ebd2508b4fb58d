mod mesh;

pub use mesh::{EdgeEntry, Mesh, QuadEntry, TriangleEntry, VertexEntry};
pub(crate) use mesh::check_count;
