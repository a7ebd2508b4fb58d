use std::{
    collections::{HashMap, VecDeque},
    net::SocketAddr,
};

use log::{debug, info};

use meshsync_shared::RawFrame;

use crate::room::Session;

/// The set of connected sessions that share one scene.
///
/// A frame from one session is queued on every other session, never echoed
/// back to its sender. The most recent frames are kept in a bounded log.
#[derive(Debug)]
pub struct Room {
    sessions: HashMap<SocketAddr, Session>,
    recent: VecDeque<RawFrame>,
    capacity: usize,
}

impl Room {
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            recent: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    // Sessions

    /// Returns false if a session from `address` already exists.
    pub fn add_session(&mut self, address: SocketAddr) -> bool {
        if self.sessions.contains_key(&address) {
            return false;
        }
        self.sessions.insert(address, Session::new(address));
        info!("Session {} joined, {} in room", address, self.sessions.len());
        true
    }

    /// Frames still queued for the session are discarded with it.
    pub fn remove_session(&mut self, address: &SocketAddr) -> Option<Session> {
        let session = self.sessions.remove(address)?;
        if session.queued() > 0 {
            debug!(
                "Discarding {} frames queued for {}",
                session.queued(),
                address
            );
        }
        info!("Session {} left, {} in room", address, self.sessions.len());
        Some(session)
    }

    pub fn has_session(&self, address: &SocketAddr) -> bool {
        self.sessions.contains_key(address)
    }

    pub fn session(&self, address: &SocketAddr) -> Option<&Session> {
        self.sessions.get(address)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    // Fan-out

    /// Queues `frame` on every session except `origin` and records it in the
    /// recent log. Returns how many sessions it was queued on.
    pub fn fan_out(&mut self, origin: Option<&SocketAddr>, frame: RawFrame) -> usize {
        if let Some(sender) = origin.and_then(|address| self.sessions.get_mut(address)) {
            sender.mark_received();
        }

        let bytes = frame.to_bytes();
        let mut recipients = 0;
        for (address, session) in self.sessions.iter_mut() {
            if Some(address) == origin {
                continue;
            }
            session.enqueue(bytes.clone());
            recipients += 1;
        }

        if self.capacity > 0 {
            if self.recent.len() == self.capacity {
                self.recent.pop_front();
            }
            self.recent.push_back(frame);
        }
        recipients
    }

    /// The most recent fanned-out frames, oldest first.
    pub fn recent(&self) -> impl Iterator<Item = &RawFrame> {
        self.recent.iter()
    }

    /// Takes every queued frame, grouped by session in queue order.
    pub(crate) fn drain_outbound(&mut self) -> Vec<(SocketAddr, Vec<Vec<u8>>)> {
        self.sessions
            .iter_mut()
            .filter(|(_, session)| session.queued() > 0)
            .map(|(address, session)| (*address, session.drain().collect()))
            .collect()
    }
}
