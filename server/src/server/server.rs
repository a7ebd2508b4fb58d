use std::net::SocketAddr;

use log::{debug, info, warn};

use meshsync_shared::{DecodeError, FrameHeader, Payload, RawFrame};

use crate::{
    events::{Events, ServerEvent},
    room::Room,
    transport::{FrameReceiver, FrameSender, Socket, SocketEvent},
    ServerConfig, ServerError,
};

/// Poll-driven relay: every accepted frame is fanned out to all other sessions.
///
/// Call [`Server::receive`] to take in connection events and frames, then
/// [`Server::send_all_updates`] to hand queued frames to the transport.
pub struct Server {
    config: ServerConfig,
    io: Option<(Box<dyn FrameSender>, Box<dyn FrameReceiver>)>,
    room: Room,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        let room = Room::new(config.pending_capacity);
        Self {
            config,
            io: None,
            room,
        }
    }

    /// Starts accepting sessions on the given socket
    pub fn listen<S: Into<Box<dyn Socket>>>(&mut self, socket: S) {
        let boxed_socket: Box<dyn Socket> = socket.into();
        self.io = Some(boxed_socket.listen());
        info!("Server listening");
    }

    pub fn is_listening(&self) -> bool {
        self.io.is_some()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    /// Drains the transport: registers and drops sessions, and fans out every
    /// frame that decodes. A session that sends an undecodable frame is
    /// disconnected.
    pub fn receive(&mut self) -> Events {
        let mut events = Events::new();
        let Some((sender, receiver)) = self.io.as_mut() else {
            events.push(ServerEvent::Error(ServerError::NotListening));
            return events;
        };

        loop {
            let event = match receiver.receive() {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(_) => {
                    events.push(ServerEvent::Error(ServerError::ReceiveFailed));
                    break;
                }
            };

            match event {
                SocketEvent::Connected(address) => {
                    if self.room.add_session(address) {
                        events.push(ServerEvent::Connect(address));
                    }
                }
                SocketEvent::Disconnected(address) => {
                    if self.room.remove_session(&address).is_some() {
                        events.push(ServerEvent::Disconnect(address));
                    }
                }
                SocketEvent::Frame(address, bytes) => {
                    if !self.room.has_session(&address) {
                        debug!("Dropping frame from unknown session {}", address);
                        continue;
                    }
                    match decode_frame(&bytes, self.config.max_body_len) {
                        Ok(frame) => {
                            let kind = frame.kind;
                            let recipients = self.room.fan_out(Some(&address), frame);
                            debug!(
                                "Relayed {} frame from {} to {} sessions",
                                kind, address, recipients
                            );
                            events.push(ServerEvent::Frame {
                                from: address,
                                kind,
                            });
                        }
                        Err(error) => {
                            warn!("Rejected frame from {}: {}", address, error);
                            sender.disconnect(&address);
                            self.room.remove_session(&address);
                            events.push(ServerEvent::Error(ServerError::Rejected { address, error }));
                            events.push(ServerEvent::Disconnect(address));
                        }
                    }
                }
            }
        }
        events
    }

    /// Hands every queued frame to the transport. A session the transport can
    /// no longer reach is dropped; its error is returned.
    pub fn send_all_updates(&mut self) -> Vec<ServerError> {
        let Some((sender, _)) = self.io.as_ref() else {
            return vec![ServerError::NotListening];
        };

        let mut errors = Vec::new();
        for (address, frames) in self.room.drain_outbound() {
            for frame in frames {
                if sender.send(&address, &frame).is_err() {
                    warn!("Dropping session {}, send failed", address);
                    errors.push(ServerError::SendFailed { address });
                    break;
                }
            }
        }
        for error in &errors {
            if let ServerError::SendFailed { address } = error {
                sender.disconnect(address);
                self.room.remove_session(address);
            }
        }
        errors
    }

    /// Queues a frame originating at the server on every session.
    pub fn broadcast(&mut self, payload: &Payload) -> Result<usize, ServerError> {
        if !self.is_listening() {
            return Err(ServerError::NotListening);
        }
        let frame = payload.to_frame()?;
        Ok(self.room.fan_out(None, frame))
    }

    pub fn disconnect(&mut self, address: &SocketAddr) -> Result<(), ServerError> {
        let (sender, _) = self.io.as_ref().ok_or(ServerError::NotListening)?;
        self.room
            .remove_session(address)
            .ok_or(ServerError::SessionNotFound { address: *address })?;
        sender.disconnect(address);
        Ok(())
    }
}

/// The body is deserialized only to reject garbage; the bytes are relayed as received.
fn decode_frame(bytes: &[u8], max_body_len: usize) -> Result<RawFrame, DecodeError> {
    let header = FrameHeader::decode(bytes)?;
    header.check_limit(max_body_len)?;
    let frame = RawFrame::from_parts(header, bytes[meshsync_shared::HEADER_LEN..].to_vec())?;
    Payload::from_frame(&frame)?;
    Ok(frame)
}
