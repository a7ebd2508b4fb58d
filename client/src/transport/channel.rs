use crossbeam::channel::{Receiver, Sender, TryRecvError};

use super::{
    FrameReceiver as TransportReceiver, FrameSender as TransportSender, RecvError, SendError,
    Socket as TransportSocket,
};

/// In-process transport over a pair of crossbeam channels, typically the
/// ends handed out by the server's channel connector.
pub struct Socket {
    to_server: Sender<Vec<u8>>,
    from_server: Receiver<Vec<u8>>,
}

impl Socket {
    pub fn new(to_server: Sender<Vec<u8>>, from_server: Receiver<Vec<u8>>) -> Self {
        Self {
            to_server,
            from_server,
        }
    }
}

impl From<Socket> for Box<dyn TransportSocket> {
    fn from(socket: Socket) -> Self {
        Box::new(socket)
    }
}

impl TransportSocket for Socket {
    fn connect(self: Box<Self>) -> (Box<dyn TransportSender>, Box<dyn TransportReceiver>) {
        (
            Box::new(ChannelFrameSender {
                sender: self.to_server,
            }),
            Box::new(ChannelFrameReceiver {
                receiver: self.from_server,
            }),
        )
    }
}

struct ChannelFrameSender {
    sender: Sender<Vec<u8>>,
}

impl TransportSender for ChannelFrameSender {
    fn send(&self, frame: &[u8]) -> Result<(), SendError> {
        self.sender.send(frame.to_vec()).map_err(|_| SendError)
    }
}

struct ChannelFrameReceiver {
    receiver: Receiver<Vec<u8>>,
}

impl TransportReceiver for ChannelFrameReceiver {
    fn receive(&mut self) -> Result<Option<Vec<u8>>, RecvError> {
        match self.receiver.try_recv() {
            Ok(frame) => Ok(Some(frame)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(RecvError),
        }
    }
}
