use std::{
    collections::{HashMap, VecDeque},
    io,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use meshsync_shared::{FrameHeader, HEADER_LEN};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpListener,
    },
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::AbortHandle,
};

use super::{
    FrameReceiver as TransportReceiver, FrameSender as TransportSender, RecvError, SendError,
    Socket as TransportSocket, SocketEvent,
};
use crate::ServerConfig;

type Connections = Arc<Mutex<HashMap<SocketAddr, Connection>>>;
type EventBuffer = Arc<Mutex<VecDeque<SocketEvent>>>;

struct Connection {
    writer: UnboundedSender<Vec<u8>>,
    reader: AbortHandle,
}

// Socket
pub struct Socket {
    listener: std::net::TcpListener,
    max_body_len: usize,
}

impl Socket {
    /// Binds the listen address right away, so peers can connect as soon as
    /// this returns.
    pub fn bind(config: &ServerConfig) -> io::Result<Self> {
        let listener = std::net::TcpListener::bind(config.listen_addr)?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            max_body_len: config.max_body_len,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl From<Socket> for Box<dyn TransportSocket> {
    fn from(socket: Socket) -> Self {
        Box::new(socket)
    }
}

impl TransportSocket for Socket {
    fn listen(self: Box<Self>) -> (Box<dyn TransportSender>, Box<dyn TransportReceiver>) {
        let connections: Connections = Arc::new(Mutex::new(HashMap::new()));
        let events: EventBuffer = Arc::new(Mutex::new(VecDeque::new()));

        spawn_acceptor(
            self.listener,
            self.max_body_len,
            connections.clone(),
            events.clone(),
        );

        (
            Box::new(TcpFrameSender { connections }),
            Box::new(TcpFrameReceiver { events }),
        )
    }
}

// Runs the accept loop inside its own runtime on a dedicated thread
fn spawn_acceptor(
    listener: std::net::TcpListener,
    max_body_len: usize,
    connections: Connections,
    events: EventBuffer,
) {
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                log::error!("Failed to create tokio runtime: {}", err);
                return;
            }
        };

        runtime.block_on(async move {
            let listener = match TcpListener::from_std(listener) {
                Ok(listener) => listener,
                Err(err) => {
                    log::error!("Failed to register TCP listener: {}", err);
                    return;
                }
            };
            log::info!("Listening for sessions on {:?}", listener.local_addr());

            loop {
                match listener.accept().await {
                    Ok((stream, address)) => {
                        log::info!("Session connected from {}", address);
                        if let Err(err) = stream.set_nodelay(true) {
                            log::warn!("Failed to set TCP_NODELAY for {}: {}", address, err);
                        }
                        let (read_half, write_half) = stream.into_split();
                        let (writer, queue) = mpsc::unbounded_channel();

                        push_event(&events, SocketEvent::Connected(address));
                        tokio::spawn(write_frames(address, write_half, queue));

                        // registered before the reader can observe a close and deregister
                        match connections.lock() {
                            Ok(mut open) => {
                                let reader = tokio::spawn(read_frames(
                                    address,
                                    read_half,
                                    max_body_len,
                                    connections.clone(),
                                    events.clone(),
                                ));
                                open.insert(
                                    address,
                                    Connection {
                                        writer,
                                        reader: reader.abort_handle(),
                                    },
                                );
                            }
                            Err(_) => push_event(&events, SocketEvent::Disconnected(address)),
                        }
                    }
                    Err(err) => {
                        log::warn!("Failed to accept session: {}", err);
                    }
                }
            }
        });
    });
}

fn push_event(events: &EventBuffer, event: SocketEvent) {
    if let Ok(mut events) = events.lock() {
        events.push_back(event);
    }
}

// Two-phase read: the header gives the body length, then exactly that many bytes follow
async fn read_frames(
    address: SocketAddr,
    mut stream: OwnedReadHalf,
    max_body_len: usize,
    connections: Connections,
    events: EventBuffer,
) {
    loop {
        let mut header_bytes = [0u8; HEADER_LEN];
        if let Err(err) = stream.read_exact(&mut header_bytes).await {
            log::debug!("Read from {} ended: {}", address, err);
            break;
        }

        let header = match FrameHeader::decode(&header_bytes) {
            Ok(header) if header.body_len <= max_body_len => header,
            _ => {
                // the server decodes this again and rejects the session
                push_event(&events, SocketEvent::Frame(address, header_bytes.to_vec()));
                return;
            }
        };

        let mut frame = Vec::with_capacity(HEADER_LEN + header.body_len);
        frame.extend_from_slice(&header_bytes);
        frame.resize(HEADER_LEN + header.body_len, 0);
        if let Err(err) = stream.read_exact(&mut frame[HEADER_LEN..]).await {
            log::debug!("Dropping partial frame from {}: {}", address, err);
            break;
        }
        log::trace!("Read {} frame from {}", header.kind, address);
        push_event(&events, SocketEvent::Frame(address, frame));
    }

    let was_open = connections
        .lock()
        .map(|mut connections| connections.remove(&address).is_some())
        .unwrap_or(false);
    if was_open {
        push_event(&events, SocketEvent::Disconnected(address));
    }
}

// Drains the session's outbound queue; frames go out one at a time, in order
async fn write_frames(
    address: SocketAddr,
    mut stream: OwnedWriteHalf,
    mut queue: UnboundedReceiver<Vec<u8>>,
) {
    while let Some(frame) = queue.recv().await {
        if let Err(err) = stream.write_all(&frame).await {
            log::warn!("Write to {} failed: {}", address, err);
            break;
        }
    }
    let _ = stream.shutdown().await;
    log::debug!("Writer for {} finished", address);
}

// Frame Sender
struct TcpFrameSender {
    connections: Connections,
}

impl TransportSender for TcpFrameSender {
    fn send(&self, address: &SocketAddr, frame: &[u8]) -> Result<(), SendError> {
        let connections = self.connections.lock().map_err(|_| SendError)?;
        let connection = connections.get(address).ok_or(SendError)?;
        connection.writer.send(frame.to_vec()).map_err(|_| SendError)
    }

    fn disconnect(&self, address: &SocketAddr) {
        if let Ok(mut connections) = self.connections.lock() {
            if let Some(connection) = connections.remove(address) {
                // dropping the writer lets queued frames drain, then closes the stream
                connection.reader.abort();
                log::info!("Closed session {}", address);
            }
        }
    }
}

// Frame Receiver
struct TcpFrameReceiver {
    events: EventBuffer,
}

impl TransportReceiver for TcpFrameReceiver {
    fn receive(&mut self) -> Result<Option<SocketEvent>, RecvError> {
        let mut events = self.events.lock().map_err(|_| RecvError)?;
        Ok(events.pop_front())
    }
}
