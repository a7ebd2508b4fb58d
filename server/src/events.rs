use std::{collections::VecDeque, net::SocketAddr};

use meshsync_shared::PayloadKind;

use crate::ServerError;

#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    Connect(SocketAddr),
    Disconnect(SocketAddr),
    /// A frame from `from` was accepted and queued for every other session
    Frame {
        from: SocketAddr,
        kind: PayloadKind,
    },
    Error(ServerError),
}

/// Everything that happened during one call to [`crate::Server::receive`].
#[derive(Debug, Default)]
pub struct Events {
    events: VecDeque<ServerEvent>,
}

impl Events {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, event: ServerEvent) {
        self.events.push_back(event);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServerEvent> {
        self.events.iter()
    }
}

impl IntoIterator for Events {
    type Item = ServerEvent;
    type IntoIter = std::collections::vec_deque::IntoIter<ServerEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}
