/// PROPERTY-BASED TESTS: Mesh diff invariants
///
/// Uses proptest to verify diff properties hold across random grid edits.
///
/// Key invariants:
/// 1. Applying compute(old, new) to old yields a mesh structurally equal to new
/// 2. The diff returned by a reverse apply undoes the change
/// 3. Compaction is idempotent and leaves a valid mesh
/// 4. Incrementally maintained normals agree with a from-scratch build
/// 5. All of the above also hold going from the edited grid back to the plain one

use proptest::prelude::*;

use meshsync_shared::{DiffOptions, Diffable, MeshDiff, Vec3};
use meshsync_test::{assert_mesh_matches, edited_grid, grid_mesh, GridEdit};

// Strategy for generating grid sizes, in vertices per side
fn grid_size_strategy() -> impl Strategy<Value = usize> {
    2usize..6usize
}

// Strategy for generating vertex offsets that keep faces non-degenerate
fn offset_strategy() -> impl Strategy<Value = Vec3> {
    (-0.3f32..0.3f32, -0.3f32..0.3f32, -1.0f32..1.0f32).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

// Strategy for generating an edit to a grid of any size up to the maximum
fn grid_edit_strategy() -> impl Strategy<Value = GridEdit> {
    (
        prop::collection::vec((0usize..64usize, offset_strategy()), 0..8),
        prop::collection::vec(0usize..64usize, 0..4),
        any::<bool>(),
        prop::option::of(offset_strategy()),
        prop::collection::vec(0usize..64usize, 0..4),
    )
        .prop_map(|(moves, removed_quads, triangulate, extra_vertex, removed_vertices)| GridEdit {
            moves,
            removed_quads,
            triangulate,
            extra_vertex: extra_vertex.map(|offset| offset + Vec3::new(10.0, 10.0, 0.0)),
            removed_vertices,
        })
}

proptest! {
    /// Applying the computed diff reproduces the edited mesh
    #[test]
    fn prop_diff_then_apply_reaches_new(
        size in grid_size_strategy(),
        edit in grid_edit_strategy(),
        assume_ordered in any::<bool>(),
    ) {
        let old = grid_mesh(size);
        let new = edited_grid(size, &edit);
        let options = DiffOptions { assume_ordered, ..DiffOptions::default() };
        let diff = MeshDiff::compute_with(&old, &new, options);

        let mut applied = old.clone();
        applied.apply_diff(&diff).unwrap();

        prop_assert!(applied.structurally_eq(&new));
        prop_assert!(applied.validate().is_ok());
    }

    /// Merge-based and lookup-based diffing agree
    #[test]
    fn prop_ordered_diff_matches_lookup_diff(
        size in grid_size_strategy(),
        edit in grid_edit_strategy(),
    ) {
        let old = grid_mesh(size);
        let new = edited_grid(size, &edit);
        let ordered = MeshDiff::compute_with(
            &old,
            &new,
            DiffOptions { assume_ordered: true, ..DiffOptions::default() },
        );
        prop_assert_eq!(ordered, MeshDiff::compute(&old, &new));
    }

    /// The reverse diff brings the mesh back to where it started
    #[test]
    fn prop_reverse_diff_restores_old(
        size in grid_size_strategy(),
        edit in grid_edit_strategy(),
    ) {
        let old = grid_mesh(size);
        let new = edited_grid(size, &edit);
        let diff = MeshDiff::compute(&old, &new);

        let mut mesh = old.clone();
        let reverse = mesh.apply_diff_reverse(&diff).unwrap();
        mesh.apply_diff(&reverse).unwrap();

        prop_assert!(mesh.structurally_eq(&old));
        prop_assert!(mesh.validate().is_ok());
    }

    /// Compacting twice is the same as compacting once
    #[test]
    fn prop_compaction_is_idempotent(
        size in grid_size_strategy(),
        edit in grid_edit_strategy(),
    ) {
        let old = grid_mesh(size);
        let new = edited_grid(size, &edit);
        let mut mesh = old.clone();
        mesh.apply_diff(&MeshDiff::compute(&old, &new)).unwrap();

        mesh.compact();
        let once = mesh.clone();
        mesh.compact();

        prop_assert_eq!(&mesh, &once);
        prop_assert!(mesh.validate().is_ok());
    }

    /// Diffing from the edited grid back to the plain one adds back what the
    /// edit removed, and its reverse removes it again
    #[test]
    fn prop_backward_diff_round_trips(
        size in grid_size_strategy(),
        edit in grid_edit_strategy(),
    ) {
        let plain = grid_mesh(size);
        let edited = edited_grid(size, &edit);
        let diff = MeshDiff::compute(&edited, &plain);

        let mut mesh = edited.clone();
        let reverse = mesh.apply_diff_reverse(&diff).unwrap();
        prop_assert!(mesh.structurally_eq(&plain));
        assert_mesh_matches!(&mesh, &plain);

        mesh.apply_diff(&reverse).unwrap();
        prop_assert!(mesh.structurally_eq(&edited));
        prop_assert!(mesh.validate().is_ok());
        assert_mesh_matches!(&mesh, &edited);
    }

    /// Normals after an applied diff match a mesh built directly in the new state
    #[test]
    fn prop_normals_track_edits(
        size in grid_size_strategy(),
        edit in grid_edit_strategy(),
    ) {
        let old = grid_mesh(size);
        let new = edited_grid(size, &edit);
        let mut applied = old.clone();
        applied.apply_diff(&MeshDiff::compute(&old, &new)).unwrap();

        assert_mesh_matches!(&applied, &new);
    }
}

#[test]
fn flat_grid_normals_point_up() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mesh = grid_mesh(4);
    for id in mesh.vertex_ids() {
        assert_eq!(mesh.vertex_normal(id), Some(Vec3::Z));
    }
}
