use std::{default::Default, net::SocketAddr};

/// Contains Config properties which will be used by a Client
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Address of the relay server the TCP transport connects to
    pub server_addr: SocketAddr,
    /// Record every applied diff so the scene can be restored to any version.
    /// When false, diffs are applied without being kept.
    pub record_history: bool,
    /// Compute mesh diffs with a single merge pass over both meshes' sorted
    /// id maps instead of per-id lookups
    pub assume_ordered: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 14191)),
            record_history: true,
            assume_ordered: false,
        }
    }
}
