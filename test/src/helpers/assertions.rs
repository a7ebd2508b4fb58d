use meshsync_shared::{Mesh, Vec3};

/// Cached normals may drift from a from-scratch build by float rounding only.
pub const NORMAL_TOLERANCE: f32 = 1e-4;

/// Returns the first vertex whose cached normal differs from the normal the
/// same vertex has in `reference`.
pub fn normal_mismatch(mesh: &Mesh, reference: &Mesh) -> Option<(u64, Vec3, Vec3)> {
    mesh.vertex_ids().find_map(|id| {
        let actual = mesh.vertex_normal(id)?;
        let expected = reference.vertex_normal(id)?;
        if actual.abs_diff_eq(expected, NORMAL_TOLERANCE) {
            None
        } else {
            Some((*id, actual, expected))
        }
    })
}

/// Assert that two meshes hold the same elements and that the first one's
/// normals agree with the second's
#[macro_export]
macro_rules! assert_mesh_matches {
    ($mesh:expr, $reference:expr) => {
        assert!(
            $mesh.structurally_eq($reference),
            "Mesh {} differs structurally from its reference",
            $mesh.id()
        );
        if let Some((vertex, actual, expected)) =
            $crate::helpers::assertions::normal_mismatch($mesh, $reference)
        {
            panic!(
                "Vertex {} normal is {:?}, expected {:?}",
                vertex, actual, expected
            );
        }
    };
}
