/// E2E TESTS: Editors sharing a scene through the TCP relay on loopback

use std::{
    net::SocketAddr,
    thread,
    time::{Duration, Instant},
};

use meshsync_client::{Client, ClientConfig};
use meshsync_server::{transport::tcp, Server, ServerConfig};
use meshsync_shared::{Payload, Vec3};
use meshsync_test::{edited_grid, grid_scene_json, GridEdit, GRID_MESH_ID};

const GRID_SIZE: usize = 3;
const DEADLINE: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

fn start_server() -> (Server, SocketAddr) {
    let config = ServerConfig {
        listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        ..ServerConfig::default()
    };
    let socket = tcp::Socket::bind(&config).expect("bind loopback");
    let address = socket.local_addr().expect("bound address");
    let mut server = Server::new(config);
    server.listen(socket);
    (server, address)
}

fn start_client(server_addr: SocketAddr) -> Client {
    let mut client = Client::new(ClientConfig {
        server_addr,
        ..ClientConfig::default()
    });
    client
        .load_initial_scene(&grid_scene_json(GRID_SIZE))
        .expect("fixture scene loads");
    client.connect_to_server();
    client
}

/// Polls the server until `done` holds, failing after the deadline
fn relay_until(server: &mut Server, mut done: impl FnMut(&mut Server) -> bool) {
    let started = Instant::now();
    loop {
        server.receive();
        server.send_all_updates();
        if done(server) {
            return;
        }
        assert!(started.elapsed() < DEADLINE, "relay timed out");
        thread::sleep(POLL_INTERVAL);
    }
}

#[test]
fn edit_crosses_the_loopback_relay() {
    let _ = env_logger::builder().is_test(true).try_init();

    let (mut server, address) = start_server();
    let mut sender = start_client(address);
    let mut receiver = start_client(address);
    relay_until(&mut server, |server| server.room().session_count() == 2);

    let target = edited_grid(
        GRID_SIZE,
        &GridEdit {
            moves: vec![(4, Vec3::new(0.0, 0.0, 1.5))],
            ..GridEdit::default()
        },
    );
    let label = sender
        .submit_local_mesh_edit(target.clone())
        .unwrap()
        .unwrap();

    let mut received = Vec::new();
    relay_until(&mut server, |_| {
        received.extend(receiver.pending_incoming().unwrap());
        !received.is_empty()
    });

    assert!(matches!(received[0], Payload::SceneDiff(_)));
    let mesh = receiver.current_scene().mesh(GRID_MESH_ID).unwrap();
    assert!(mesh.structurally_eq(&target));
    assert_eq!(receiver.current_version_label(), label);
    assert_eq!(sender.pending_incoming().unwrap().count(), 0);
}

#[test]
fn closing_a_client_ends_its_session() {
    let _ = env_logger::builder().is_test(true).try_init();

    let (mut server, address) = start_server();
    let mut client = start_client(address);
    relay_until(&mut server, |server| server.room().session_count() == 1);

    client.disconnect();
    relay_until(&mut server, |server| server.room().session_count() == 0);
}
