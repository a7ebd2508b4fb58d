/// PROPERTY-BASED TESTS: Version history invariants
///
/// Key invariants:
/// 1. Restoring to any recorded version reproduces the scene as it was then
/// 2. Undo then redo lands back on the newest version unchanged
/// 3. Recording behind the newest version discards the versions after it

use proptest::prelude::*;

use meshsync_shared::{Mesh, MeshDiff, SceneDiff, Vec3, VersionHistory, BASE_VERSION};
use meshsync_test::{assert_mesh_matches, edited_grid, grid_scene, GridEdit, GRID_MESH_ID};

const GRID_SIZE: usize = 4;

fn offset_strategy() -> impl Strategy<Value = Vec3> {
    (-0.3f32..0.3f32, -0.3f32..0.3f32, -1.0f32..1.0f32).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

fn grid_edit_strategy() -> impl Strategy<Value = GridEdit> {
    (
        prop::collection::vec((0usize..16usize, offset_strategy()), 0..6),
        prop::collection::vec(0usize..9usize, 0..3),
        any::<bool>(),
        prop::collection::vec(0usize..16usize, 0..3),
    )
        .prop_map(|(moves, removed_quads, triangulate, removed_vertices)| GridEdit {
            moves,
            removed_quads,
            triangulate,
            extra_vertex: None,
            removed_vertices,
        })
}

// Strategy for generating a run of edits, each one building on the last
fn edit_run_strategy() -> impl Strategy<Value = Vec<GridEdit>> {
    prop::collection::vec(grid_edit_strategy(), 1..6)
}

/// Records every edit as its own version and returns the mesh state after each
fn record_run(
    edits: &[GridEdit],
) -> (meshsync_shared::Scene, VersionHistory, Vec<Mesh>) {
    let mut scene = grid_scene(GRID_SIZE);
    let mut history = VersionHistory::new();
    let mut states = vec![scene.mesh(GRID_MESH_ID).unwrap().clone()];

    for (step, edit) in edits.iter().enumerate() {
        let current = scene.mesh(GRID_MESH_ID).unwrap().clone();
        let target = edited_grid(GRID_SIZE, edit);
        let diff = SceneDiff::default().with_mesh(MeshDiff::compute(&current, &target));
        history
            .apply_change(&mut scene, diff, step as u64 + 1)
            .unwrap();
        states.push(target);
    }
    (scene, history, states)
}

proptest! {
    /// Every recorded version can be restored exactly
    #[test]
    fn prop_restore_reproduces_each_version(
        edits in edit_run_strategy(),
        pick in any::<prop::sample::Index>(),
    ) {
        let (mut scene, mut history, states) = record_run(&edits);
        let position = pick.index(states.len());
        let label = if position == 0 { BASE_VERSION } else { position as u64 };

        history.restore_to_version(&mut scene, label).unwrap();

        prop_assert_eq!(history.current_version_label(), label);
        let mesh = scene.mesh(GRID_MESH_ID).unwrap();
        assert_mesh_matches!(mesh, &states[position]);
    }

    /// Going back to the base and forward again is lossless
    #[test]
    fn prop_undo_redo_round_trip(edits in edit_run_strategy()) {
        let (mut scene, mut history, states) = record_run(&edits);
        let newest = history.current_version_label();

        history.restore_to_version(&mut scene, BASE_VERSION).unwrap();
        assert_mesh_matches!(scene.mesh(GRID_MESH_ID).unwrap(), &states[0]);

        history.restore_to_version(&mut scene, newest).unwrap();
        assert_mesh_matches!(scene.mesh(GRID_MESH_ID).unwrap(), &states[states.len() - 1]);
    }

    /// A new version recorded after an undo truncates the redo tail
    #[test]
    fn prop_recording_after_undo_truncates(
        edits in edit_run_strategy(),
        branch in grid_edit_strategy(),
    ) {
        let (mut scene, mut history, _) = record_run(&edits);
        history.restore_to_version(&mut scene, BASE_VERSION).unwrap();

        let current = scene.mesh(GRID_MESH_ID).unwrap().clone();
        let target = edited_grid(GRID_SIZE, &branch);
        let diff = SceneDiff::default().with_mesh(MeshDiff::compute(&current, &target));
        history.apply_change(&mut scene, diff, 1_000).unwrap();

        prop_assert_eq!(history.labels(), vec![BASE_VERSION, 1_000]);
        for label in 1..=edits.len() as u64 {
            prop_assert!(!history.contains(label));
        }
    }
}
