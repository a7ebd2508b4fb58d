cfg_if! {
    if #[cfg(feature = "transport_tcp")] {
        pub mod tcp;
    } else {}
}

pub mod channel;

pub use inner::{FrameReceiver, FrameSender, RecvError, SendError, Socket};

mod inner {

    #[derive(Debug)]
    pub struct SendError;

    /// The connection to the server is closed
    #[derive(Debug)]
    pub struct RecvError;

    pub trait Socket {
        fn connect(self: Box<Self>) -> (Box<dyn FrameSender>, Box<dyn FrameReceiver>);
    }

    pub trait FrameSender: Send + Sync {
        /// Queues a whole frame for the server
        fn send(&self, frame: &[u8]) -> Result<(), SendError>;
    }

    pub trait FrameReceiver: Send + Sync {
        /// Returns the bytes of the next frame from the server, if any. A
        /// frame whose header could not be read arrives as just its header.
        fn receive(&mut self) -> Result<Option<Vec<u8>>, RecvError>;
    }
}
