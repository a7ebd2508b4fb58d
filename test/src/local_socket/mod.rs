/// In-memory relay for E2E testing
/// Routes frames between one server and any number of clients without network I/O

use std::net::SocketAddr;

use meshsync_client::{transport::channel as client_channel, Client, ClientConfig, ClientError};
use meshsync_server::{
    transport::channel::{Connector, Socket as ServerSocket},
    Server, ServerConfig, ServerEvent,
};
use meshsync_shared::Payload;

const FIRST_CLIENT_PORT: u16 = 20_000;

/// A channel-transport server with clients attached to it
pub struct LocalRoom {
    pub server: Server,
    pub clients: Vec<Client>,
    connector: Connector,
}

impl LocalRoom {
    pub fn new(server_config: ServerConfig) -> Self {
        let socket = ServerSocket::new();
        let connector = socket.connector();
        let mut server = Server::new(server_config);
        server.listen(socket);
        Self {
            server,
            clients: Vec::new(),
            connector,
        }
    }

    /// A room whose clients all start from the same loaded scene
    pub fn with_clients(client_count: usize, scene_json: &str) -> Self {
        let mut room = Self::new(ServerConfig::default());
        for _ in 0..client_count {
            let index = room.add_client(ClientConfig::default());
            room.clients[index]
                .load_initial_scene(scene_json)
                .expect("fixture scene loads");
        }
        room.server.receive();
        room
    }

    pub fn client_address(index: usize) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], FIRST_CLIENT_PORT + index as u16))
    }

    /// For peers that talk to the server without a [`Client`]
    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    /// Connects a new client and returns its index
    pub fn add_client(&mut self, config: ClientConfig) -> usize {
        let index = self.clients.len();
        let (to_server, from_server) = self
            .connector
            .connect(Self::client_address(index))
            .expect("server socket is listening");
        let mut client = Client::new(config);
        client.connect(client_channel::Socket::new(to_server, from_server));
        self.clients.push(client);
        index
    }

    /// Lets the server relay everything sent so far, then has every client
    /// apply what reached it. Returns the server's events and, per client,
    /// the payloads it applied.
    pub fn pump(&mut self) -> (Vec<ServerEvent>, Vec<Result<Vec<Payload>, ClientError>>) {
        let events: Vec<ServerEvent> = self.server.receive().into_iter().collect();
        let errors = self.server.send_all_updates();
        assert!(errors.is_empty(), "Relay failed to send: {:?}", errors);

        let applied = self
            .clients
            .iter_mut()
            .map(|client| client.pending_incoming().map(Iterator::collect))
            .collect();
        (events, applied)
    }
}
