//! # Meshsync Client
//! Keeps an editor's local copy of a shared scene in step with its peers:
//! local edits go out as diffs, peers' diffs come in and are applied, and
//! every applied change is recorded so the scene can be moved to any
//! earlier or later version.

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
        AssetPair, Mesh, MeshDiff, Payload, Scene, SceneDiff, VersionLabel, BASE_VERSION,
    };
}

mod client;
mod error;

pub use client::{Client, ClientConfig};
pub use error::ClientError;
