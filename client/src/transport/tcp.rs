use std::{
    collections::VecDeque,
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use meshsync_shared::{FrameHeader, HEADER_LEN};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
};

use super::{
    FrameReceiver as TransportReceiver, FrameSender as TransportSender, RecvError, SendError,
    Socket as TransportSocket,
};

// Constants
const CONNECT_ATTEMPTS: u32 = 20;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(50);

#[derive(Default)]
struct Inbox {
    frames: VecDeque<Vec<u8>>,
    closed: bool,
}

type SharedInbox = Arc<Mutex<Inbox>>;

// Socket
pub struct Socket {
    server_addr: SocketAddr,
}

impl Socket {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self { server_addr }
    }
}

impl From<Socket> for Box<dyn TransportSocket> {
    fn from(socket: Socket) -> Self {
        Box::new(socket)
    }
}

impl TransportSocket for Socket {
    /// Returns immediately; frames sent before the connection is up are
    /// queued and written once it is.
    fn connect(self: Box<Self>) -> (Box<dyn TransportSender>, Box<dyn TransportReceiver>) {
        let inbox: SharedInbox = Arc::new(Mutex::new(Inbox::default()));
        let (sender, queue) = mpsc::unbounded_channel();

        spawn_connection(self.server_addr, queue, inbox.clone());

        (
            Box::new(TcpFrameSender { sender }),
            Box::new(TcpFrameReceiver { inbox }),
        )
    }
}

fn spawn_connection(server_addr: SocketAddr, queue: UnboundedReceiver<Vec<u8>>, inbox: SharedInbox) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                log::error!("Failed to create tokio runtime: {}", err);
                close(&inbox);
                return;
            }
        };

        runtime.block_on(async move {
            let Some(stream) = connect_with_retry(server_addr).await else {
                close(&inbox);
                return;
            };
            log::info!("Connected to {}", server_addr);
            if let Err(err) = stream.set_nodelay(true) {
                log::warn!("Failed to set TCP_NODELAY: {}", err);
            }
            let (read_half, write_half) = stream.into_split();

            let writer = tokio::spawn(write_frames(write_half, queue));
            read_frames(read_half, &inbox).await;
            close(&inbox);
            writer.abort();
            log::info!("Disconnected from {}", server_addr);
        });
    });
}

async fn connect_with_retry(server_addr: SocketAddr) -> Option<TcpStream> {
    for attempt in 1..=CONNECT_ATTEMPTS {
        match TcpStream::connect(server_addr).await {
            Ok(stream) => return Some(stream),
            Err(err) => {
                log::debug!(
                    "Connect to {} failed (attempt {}): {}",
                    server_addr,
                    attempt,
                    err
                );
                tokio::time::sleep(CONNECT_RETRY_DELAY).await;
            }
        }
    }
    log::warn!("Giving up on {}", server_addr);
    None
}

fn close(inbox: &SharedInbox) {
    if let Ok(mut inbox) = inbox.lock() {
        inbox.closed = true;
    }
}

fn deliver(inbox: &SharedInbox, frame: Vec<u8>) {
    if let Ok(mut inbox) = inbox.lock() {
        inbox.frames.push_back(frame);
    }
}

// Two-phase read: the header gives the body length, then exactly that many bytes follow
async fn read_frames(mut stream: OwnedReadHalf, inbox: &SharedInbox) {
    loop {
        let mut header_bytes = [0u8; HEADER_LEN];
        if stream.read_exact(&mut header_bytes).await.is_err() {
            return;
        }
        let header = match FrameHeader::decode(&header_bytes) {
            Ok(header) => header,
            Err(_) => {
                // the client decodes this again and reports the error
                deliver(inbox, header_bytes.to_vec());
                return;
            }
        };

        let mut frame = vec![0u8; HEADER_LEN + header.body_len];
        frame[..HEADER_LEN].copy_from_slice(&header_bytes);
        if let Err(err) = stream.read_exact(&mut frame[HEADER_LEN..]).await {
            log::debug!("Dropping partial frame: {}", err);
            return;
        }
        deliver(inbox, frame);
    }
}

async fn write_frames(mut stream: OwnedWriteHalf, mut queue: UnboundedReceiver<Vec<u8>>) {
    while let Some(frame) = queue.recv().await {
        if let Err(err) = stream.write_all(&frame).await {
            log::warn!("Write failed: {}", err);
            break;
        }
    }
    let _ = stream.shutdown().await;
}

// Frame Sender
struct TcpFrameSender {
    sender: UnboundedSender<Vec<u8>>,
}

impl TransportSender for TcpFrameSender {
    fn send(&self, frame: &[u8]) -> Result<(), SendError> {
        self.sender.send(frame.to_vec()).map_err(|_| SendError)
    }
}

// Frame Receiver
struct TcpFrameReceiver {
    inbox: SharedInbox,
}

impl TransportReceiver for TcpFrameReceiver {
    fn receive(&mut self) -> Result<Option<Vec<u8>>, RecvError> {
        let mut inbox = self.inbox.lock().map_err(|_| RecvError)?;
        match inbox.frames.pop_front() {
            Some(frame) => Ok(Some(frame)),
            None if inbox.closed => Err(RecvError),
            None => Ok(None),
        }
    }
}
