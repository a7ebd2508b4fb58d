cfg_if! {
    if #[cfg(feature = "transport_tcp")] {
        pub mod tcp;
    } else {}
}

pub mod channel;

pub use inner::{FrameReceiver, FrameSender, RecvError, SendError, Socket, SocketEvent};

mod inner {

    use std::net::SocketAddr;

    #[derive(Debug)]
    pub struct SendError;

    #[derive(Debug)]
    pub struct RecvError;

    /// Something that happened on one peer connection.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum SocketEvent {
        Connected(SocketAddr),
        /// Bytes of one frame: header and body as read off the wire. A
        /// connection whose header could not be read delivers just the header
        /// bytes, so decoding reports the failure.
        Frame(SocketAddr, Vec<u8>),
        Disconnected(SocketAddr),
    }

    pub trait Socket {
        fn listen(self: Box<Self>) -> (Box<dyn FrameSender>, Box<dyn FrameReceiver>);
    }

    pub trait FrameSender: Send + Sync {
        /// Queues a whole frame for the peer at `address`
        fn send(&self, address: &SocketAddr, frame: &[u8]) -> Result<(), SendError>;
        /// Closes the connection to `address`, dropping anything still queued for it
        fn disconnect(&self, address: &SocketAddr);
    }

    pub trait FrameReceiver: Send + Sync {
        /// Returns the next connection event, if any
        fn receive(&mut self) -> Result<Option<SocketEvent>, RecvError>;
    }
}
