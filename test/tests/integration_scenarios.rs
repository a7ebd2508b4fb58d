/// INTEGRATION TESTS: Worked scenarios across mesh, scene, history and wire

use meshsync_shared::{
    Camera, Diffable, HistoryError, Mesh, MeshDiff, Payload, PayloadKind, RawFrame, Scene,
    SceneDiff, SceneError, Vec3, VersionHistory, BASE_VERSION,
};
use meshsync_test::{grid_scene, quad_id, vertex_id, GRID_MESH_ID};

fn single_triangle() -> Mesh {
    let mut mesh = Mesh::new(1);
    mesh.add_vertex(1, Vec3::new(0.0, 0.0, 0.0)).unwrap();
    mesh.add_vertex(2, Vec3::new(1.0, 0.0, 0.0)).unwrap();
    mesh.add_vertex(3, Vec3::new(0.0, 1.0, 0.0)).unwrap();
    mesh.add_triangle(4, [1, 2, 3]).unwrap();
    mesh
}

#[test]
fn moving_a_vertex_refreshes_the_face_normal() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut mesh = single_triangle();
    assert_eq!(mesh.vertex_normal(&1), Some(Vec3::Z));

    let mut diff = MeshDiff::new(1, 1);
    diff.update_vertex.insert(1, Vec3::new(0.0, 0.0, 1.0));
    mesh.apply_diff(&diff).unwrap();

    assert_eq!(mesh.vertex_position(&1), Some(Vec3::new(0.0, 0.0, 1.0)));
    let face = mesh.triangle(&4).unwrap().normal;
    assert!(face.abs_diff_eq(Vec3::ONE.normalize(), 1e-6), "{:?}", face);
    // every vertex has this triangle as its only face
    for id in [1, 2, 3] {
        assert_eq!(mesh.vertex_normal(&id), Some(face));
    }
    assert_eq!(mesh.version(), 1);
}

#[test]
fn removing_a_shared_face_reaverages_neighbours() {
    let mut scene = grid_scene(3);
    let mesh = scene.mesh(GRID_MESH_ID).unwrap();
    let centre = vertex_id(3, 1, 1);
    assert_eq!(mesh.vertex(&centre).unwrap().faces.len(), 4);

    let mut diff = MeshDiff::new(GRID_MESH_ID, 1);
    diff.remove_quad.insert(quad_id(3, 0, 0));
    scene
        .apply_diff(&SceneDiff::new(1).with_mesh(diff))
        .unwrap();

    let mesh = scene.mesh(GRID_MESH_ID).unwrap();
    assert_eq!(mesh.vertex(&centre).unwrap().faces.len(), 3);
    assert_eq!(mesh.vertex_normal(&vertex_id(3, 0, 0)), Some(Vec3::ZERO));
    assert_eq!(mesh.vertex_normal(&centre), Some(Vec3::Z));
    assert!(mesh.validate().is_ok());
}

#[test]
fn failing_scene_diff_leaves_scene_untouched() {
    let mut scene = grid_scene(2);
    let before = scene.mesh(GRID_MESH_ID).unwrap().clone();

    let mut good = MeshDiff::new(GRID_MESH_ID, 1);
    good.update_vertex.insert(vertex_id(2, 0, 0), Vec3::ONE);
    let mut bad = MeshDiff::new(999, 1);
    bad.update_vertex.insert(1, Vec3::ONE);
    let diff = SceneDiff::new(1).with_mesh(good).with_mesh(bad);

    assert!(matches!(
        scene.apply_diff(&diff),
        Err(SceneError::ReferenceUnresolved { id: 999 })
    ));
    assert_eq!(scene.mesh(GRID_MESH_ID).unwrap(), &before);
}

#[test]
fn history_walks_three_versions() {
    let mut scene = Scene::new(Camera::default());
    scene.insert_mesh(single_triangle()).unwrap();
    let mut history = VersionHistory::new();

    for (label, height) in [(10, 1.0), (20, 2.0), (30, 3.0)] {
        let mut diff = MeshDiff::new(1, label as u32);
        diff.update_vertex.insert(3, Vec3::new(0.0, height, 0.0));
        history
            .apply_change(&mut scene, SceneDiff::default().with_mesh(diff), label)
            .unwrap();
    }
    assert_eq!(history.labels(), vec![BASE_VERSION, 10, 20, 30]);

    history.restore_to_version(&mut scene, 10).unwrap();
    assert_eq!(
        scene.mesh(1).unwrap().vertex_position(&3),
        Some(Vec3::new(0.0, 1.0, 0.0))
    );
    history.restore_to_version(&mut scene, 30).unwrap();
    assert_eq!(
        scene.mesh(1).unwrap().vertex_position(&3),
        Some(Vec3::new(0.0, 3.0, 0.0))
    );

    assert!(matches!(
        history.restore_to_version(&mut scene, 40),
        Err(HistoryError::VersionNotFound { label: 40 })
    ));
    assert_eq!(history.current_version_label(), 30);
}

#[test]
fn wire_header_for_a_thirty_byte_mesh_body() {
    let frame = RawFrame::new(PayloadKind::Mesh, vec![b'x'; 30]).unwrap();
    let bytes = frame.to_bytes();
    assert_eq!(&bytes[..11], b"0000001e001");

    let decoded = RawFrame::decode(&bytes).unwrap();
    assert_eq!(decoded.kind, PayloadKind::Mesh);
    assert_eq!(decoded.body.len(), 30);
    assert_eq!(decoded.to_bytes(), bytes);
}

#[test]
fn scene_diff_survives_the_wire() {
    let mut diff = MeshDiff::new(GRID_MESH_ID, 4);
    diff.update_vertex.insert(vertex_id(3, 2, 2), Vec3::new(2.0, 2.0, 0.5));
    diff.remove_quad.insert(quad_id(3, 1, 1));
    let payload = Payload::SceneDiff(SceneDiff::new(77).with_mesh(diff));

    let bytes = payload.encode().unwrap();
    assert_eq!(&bytes[8..11], b"002");
    assert_eq!(Payload::decode(&bytes).unwrap(), payload);

    let mut scene = grid_scene(3);
    let Payload::SceneDiff(received) = Payload::decode(&bytes).unwrap() else {
        panic!("decoded to another payload kind");
    };
    scene.apply_diff(&received).unwrap();
    let mesh = scene.mesh(GRID_MESH_ID).unwrap();
    assert_eq!(mesh.quad_count(), 3);
    assert_eq!(mesh.version(), 4);
}
