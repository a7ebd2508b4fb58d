use std::{collections::VecDeque, net::SocketAddr};

/// One connected editor and the frames waiting to be written to it.
#[derive(Debug)]
pub struct Session {
    address: SocketAddr,
    outbound: VecDeque<Vec<u8>>,
    frames_received: u64,
    frames_sent: u64,
}

impl Session {
    pub(crate) fn new(address: SocketAddr) -> Self {
        Self {
            address,
            outbound: VecDeque::new(),
            frames_received: 0,
            frames_sent: 0,
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Frames queued for this session and not yet handed to the transport
    pub fn queued(&self) -> usize {
        self.outbound.len()
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub(crate) fn enqueue(&mut self, frame: Vec<u8>) {
        self.outbound.push_back(frame);
    }

    pub(crate) fn mark_received(&mut self) {
        self.frames_received += 1;
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = Vec<u8>> + '_ {
        let sent = self.outbound.len() as u64;
        self.frames_sent += sent;
        self.outbound.drain(..)
    }
}
