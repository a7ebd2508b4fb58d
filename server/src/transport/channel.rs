use std::{
    collections::{HashMap, VecDeque},
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use log::debug;

use super::{
    FrameReceiver as TransportReceiver, FrameSender as TransportSender, RecvError, SendError,
    Socket as TransportSocket, SocketEvent,
};

type Links = Arc<Mutex<HashMap<SocketAddr, Link>>>;

struct Link {
    to_peer: Sender<Vec<u8>>,
    from_peer: Receiver<Vec<u8>>,
}

struct Handshake {
    address: SocketAddr,
    link: Link,
}

/// In-process transport: peers connect through a [`Connector`] and exchange
/// whole frames over crossbeam channels.
pub struct Socket {
    handshakes: Receiver<Handshake>,
    connector: Connector,
}

impl Socket {
    pub fn new() -> Self {
        let (sender, receiver) = channel::unbounded();
        Self {
            handshakes: receiver,
            connector: Connector { handshakes: sender },
        }
    }

    pub fn connector(&self) -> Connector {
        self.connector.clone()
    }
}

impl Default for Socket {
    fn default() -> Self {
        Self::new()
    }
}

/// Hands out peer endpoints for a channel [`Socket`].
#[derive(Clone)]
pub struct Connector {
    handshakes: Sender<Handshake>,
}

impl Connector {
    /// Opens a connection that the server will see as coming from `address`.
    /// Returns the peer's ends: frames sent on the `Sender` reach the server,
    /// frames from the server arrive on the `Receiver`. Dropping the `Sender`
    /// disconnects.
    pub fn connect(
        &self,
        address: SocketAddr,
    ) -> Result<(Sender<Vec<u8>>, Receiver<Vec<u8>>), SendError> {
        let (peer_sender, server_receiver) = channel::unbounded();
        let (server_sender, peer_receiver) = channel::unbounded();
        self.handshakes
            .send(Handshake {
                address,
                link: Link {
                    to_peer: server_sender,
                    from_peer: server_receiver,
                },
            })
            .map_err(|_| SendError)?;
        Ok((peer_sender, peer_receiver))
    }
}

impl From<Socket> for Box<dyn TransportSocket> {
    fn from(socket: Socket) -> Self {
        Box::new(socket)
    }
}

impl TransportSocket for Socket {
    fn listen(self: Box<Self>) -> (Box<dyn TransportSender>, Box<dyn TransportReceiver>) {
        let links: Links = Arc::new(Mutex::new(HashMap::new()));
        let sender = ChannelFrameSender {
            links: links.clone(),
        };
        let receiver = ChannelFrameReceiver {
            handshakes: self.handshakes,
            links,
            pending: VecDeque::new(),
        };
        (Box::new(sender), Box::new(receiver))
    }
}

struct ChannelFrameSender {
    links: Links,
}

impl TransportSender for ChannelFrameSender {
    fn send(&self, address: &SocketAddr, frame: &[u8]) -> Result<(), SendError> {
        let links = self.links.lock().map_err(|_| SendError)?;
        let link = links.get(address).ok_or(SendError)?;
        link.to_peer.send(frame.to_vec()).map_err(|_| SendError)
    }

    fn disconnect(&self, address: &SocketAddr) {
        if let Ok(mut links) = self.links.lock() {
            if links.remove(address).is_some() {
                debug!("Closed channel link to {}", address);
            }
        }
    }
}

struct ChannelFrameReceiver {
    handshakes: Receiver<Handshake>,
    links: Links,
    pending: VecDeque<SocketEvent>,
}

impl ChannelFrameReceiver {
    fn poll(&mut self) -> Result<(), RecvError> {
        let mut links = self.links.lock().map_err(|_| RecvError)?;

        while let Ok(Handshake { address, link }) = self.handshakes.try_recv() {
            links.insert(address, link);
            self.pending.push_back(SocketEvent::Connected(address));
        }

        let mut closed = Vec::new();
        for (address, link) in links.iter() {
            loop {
                match link.from_peer.try_recv() {
                    Ok(frame) => self.pending.push_back(SocketEvent::Frame(*address, frame)),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        closed.push(*address);
                        break;
                    }
                }
            }
        }
        for address in closed {
            links.remove(&address);
            self.pending.push_back(SocketEvent::Disconnected(address));
        }
        Ok(())
    }
}

impl TransportReceiver for ChannelFrameReceiver {
    fn receive(&mut self) -> Result<Option<SocketEvent>, RecvError> {
        if self.pending.is_empty() {
            self.poll()?;
        }
        Ok(self.pending.pop_front())
    }
}
