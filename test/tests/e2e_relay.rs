/// E2E TESTS: Editors sharing a scene through the in-memory relay
///
/// Every test drives a real Server and real Clients over the channel transport.

use std::net::SocketAddr;

use meshsync_client::ClientConfig;
use meshsync_server::{ServerError, ServerEvent};
use meshsync_shared::{AssetPair, Payload, PayloadKind, Vec3};
use meshsync_test::{
    edited_grid, grid_scene_json, vertex_id, GridEdit, LocalRoom, GRID_MESH_ID,
};

const GRID_SIZE: usize = 3;

fn room(client_count: usize) -> LocalRoom {
    let _ = env_logger::builder().is_test(true).try_init();
    LocalRoom::with_clients(client_count, &grid_scene_json(GRID_SIZE))
}

fn moved(vertex: usize, offset: Vec3) -> GridEdit {
    GridEdit {
        moves: vec![(vertex, offset)],
        ..GridEdit::default()
    }
}

#[test]
fn edit_reaches_every_other_client() {
    let mut room = room(3);
    let target = edited_grid(GRID_SIZE, &moved(4, Vec3::new(0.0, 0.0, 1.0)));

    let label = room.clients[0]
        .submit_local_mesh_edit(target.clone())
        .unwrap()
        .unwrap();
    let (events, applied) = room.pump();

    assert!(events.contains(&ServerEvent::Frame {
        from: LocalRoom::client_address(0),
        kind: PayloadKind::SceneDiff,
    }));
    // the sender is not echoed
    assert!(applied[0].as_ref().unwrap().is_empty());
    for index in 1..3 {
        assert_eq!(applied[index].as_ref().unwrap().len(), 1);
    }

    for client in &room.clients {
        let mesh = client.current_scene().mesh(GRID_MESH_ID).unwrap();
        assert!(mesh.structurally_eq(&target));
        assert_eq!(client.current_version_label(), label);
    }
}

#[test]
fn edits_arrive_in_the_order_they_were_sent() {
    let mut room = room(2);
    let first = edited_grid(GRID_SIZE, &moved(0, Vec3::new(0.0, 0.0, 1.0)));
    let second = edited_grid(GRID_SIZE, &moved(0, Vec3::new(0.0, 0.0, 2.0)));

    room.clients[0].submit_local_mesh_edit(first).unwrap();
    room.clients[0].submit_local_mesh_edit(second).unwrap();
    room.pump();

    assert_eq!(room.clients[1].versions(), room.clients[0].versions());
    let position = room.clients[1]
        .current_scene()
        .mesh(GRID_MESH_ID)
        .unwrap()
        .vertex_position(&vertex_id(GRID_SIZE, 0, 0));
    assert_eq!(position, Some(Vec3::new(0.0, 0.0, 2.0)));
}

#[test]
fn disjoint_concurrent_edits_converge() {
    let mut room = room(2);
    let left = edited_grid(GRID_SIZE, &moved(0, Vec3::new(0.0, 0.0, 1.0)));
    let right = edited_grid(GRID_SIZE, &moved(8, Vec3::new(0.0, 0.0, -1.0)));

    room.clients[0].submit_local_mesh_edit(left).unwrap();
    room.clients[1].submit_local_mesh_edit(right).unwrap();
    room.pump();

    let both = edited_grid(
        GRID_SIZE,
        &GridEdit {
            moves: vec![(0, Vec3::new(0.0, 0.0, 1.0)), (8, Vec3::new(0.0, 0.0, -1.0))],
            ..GridEdit::default()
        },
    );
    for client in &room.clients {
        let mesh = client.current_scene().mesh(GRID_MESH_ID).unwrap();
        assert!(mesh.structurally_eq(&both));
        assert_eq!(client.versions().len(), 3);
    }
}

#[test]
fn restoring_is_local_to_one_client() {
    let mut room = room(2);
    let target = edited_grid(GRID_SIZE, &moved(4, Vec3::new(0.0, 0.0, 1.0)));
    room.clients[0].submit_local_mesh_edit(target.clone()).unwrap();
    room.pump();

    room.clients[1].restore_to_version(0).unwrap();
    room.pump();

    let original = edited_grid(GRID_SIZE, &GridEdit::default());
    let restored = room.clients[1].current_scene().mesh(GRID_MESH_ID).unwrap();
    assert!(restored.structurally_eq(&original));
    let untouched = room.clients[0].current_scene().mesh(GRID_MESH_ID).unwrap();
    assert!(untouched.structurally_eq(&target));
}

#[test]
fn operations_and_assets_are_relayed() {
    let mut room = room(2);
    let asset = AssetPair::new("crate", b"v 0 0 0\n".to_vec(), b"newmtl wood\n".to_vec());

    room.clients[0].send_operation("select 100").unwrap();
    room.clients[0].send_asset(asset.clone()).unwrap();
    let (_, applied) = room.pump();

    assert_eq!(
        applied[1].as_ref().unwrap(),
        &vec![
            Payload::Operation("select 100".to_string()),
            Payload::Asset(asset.clone())
        ]
    );
    assert_eq!(room.clients[1].take_assets(), vec![asset]);
    assert!(room.clients[1].take_assets().is_empty());
}

#[test]
fn departed_client_no_longer_receives() {
    let mut room = room(3);
    room.clients[2].disconnect();
    let (events, _) = room.pump();
    assert!(events.contains(&ServerEvent::Disconnect(LocalRoom::client_address(2))));
    assert_eq!(room.server.room().session_count(), 2);

    let target = edited_grid(GRID_SIZE, &moved(4, Vec3::ONE));
    room.clients[0].submit_local_mesh_edit(target).unwrap();
    let (events, _) = room.pump();
    assert!(events.iter().any(|event| matches!(event, ServerEvent::Frame { .. })));
    assert_eq!(
        room.clients[2]
            .current_scene()
            .mesh(GRID_MESH_ID)
            .unwrap()
            .vertex_position(&vertex_id(GRID_SIZE, 1, 1)),
        Some(Vec3::new(1.0, 1.0, 0.0))
    );
}

#[test]
fn malformed_peer_is_cut_off_without_disturbing_others() {
    let mut room = room(2);
    let rogue: SocketAddr = SocketAddr::from(([127, 0, 0, 1], 9));
    let (rogue_tx, rogue_rx) = room.connector().connect(rogue).unwrap();
    room.pump();

    rogue_tx.send(b"00000002002{}".to_vec()).unwrap();
    let (events, applied) = room.pump();

    assert!(events.iter().any(|event| matches!(
        event,
        ServerEvent::Error(ServerError::Rejected { address, .. }) if *address == rogue
    )));
    assert!(rogue_rx.recv().is_err());
    assert!(applied.iter().all(|result| result.as_ref().unwrap().is_empty()));
    assert_eq!(room.server.room().session_count(), 2);
}

#[test]
fn client_without_history_still_applies() {
    let mut room = room(1);
    let index = room.add_client(ClientConfig {
        record_history: false,
        ..ClientConfig::default()
    });
    room.clients[index]
        .load_initial_scene(&grid_scene_json(GRID_SIZE))
        .unwrap();
    room.pump();

    let target = edited_grid(GRID_SIZE, &moved(4, Vec3::ONE));
    room.clients[0].submit_local_mesh_edit(target.clone()).unwrap();
    room.pump();

    let listener = &room.clients[index];
    assert!(listener
        .current_scene()
        .mesh(GRID_MESH_ID)
        .unwrap()
        .structurally_eq(&target));
    assert_eq!(listener.versions().len(), 1);
}
