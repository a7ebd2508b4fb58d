use std::{default::Default, net::SocketAddr};

use meshsync_shared::MAX_BODY_LEN;

/// Contains Config properties which will be used by the Server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Address the TCP transport binds to
    pub listen_addr: SocketAddr,
    /// How many of the most recent fanned-out frames the Room keeps
    pub pending_capacity: usize,
    /// Largest frame body accepted from a session. A session announcing a
    /// larger body is disconnected.
    pub max_body_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 14191)),
            pending_capacity: 100,
            max_body_len: MAX_BODY_LEN,
        }
    }
}
