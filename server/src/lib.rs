//! # Meshsync Server
//! A relay that accepts editor sessions over TCP or in-memory channels and
//! fans every scene diff a session sends out to all other sessions.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

#[macro_use]
extern crate cfg_if;

pub mod transport;
pub mod shared {
    pub use meshsync_shared::{
        DecodeError, EncodeError, FrameHeader, Payload, PayloadKind, RawFrame,
    };
}

mod error;
mod events;
mod room;
mod server;

pub use error::ServerError;
pub use events::{Events, ServerEvent};
pub use room::{Room, Session};
pub use server::{Server, ServerConfig};
