//! # Meshsync Shared
//! Scene model, diff engine, version history and wire codec shared between
//! meshsync-server & meshsync-client crates.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

#[macro_use]
extern crate cfg_if;

cfg_if! {
    if #[cfg(target_arch = "wasm32")]
    {
        // Ids and labels are derived from the system clock
        compile_error!("'meshsync_shared' needs a native target with a system clock, wasm32 is not supported.");
    }
}

mod backends;
mod diff;
mod frame;
mod history;
mod id_generator;
mod mesh;
mod scene;
mod types;
mod wire;

pub use backends::{TimeError, Timestamp};
pub use diff::{
    CameraDiff, DiffError, DiffOptions, Diffable, LightDiff, MaterialDiff, MeshDiff, SceneDiff,
};
pub use frame::{quad_normal, triangle_normal, Frame};
pub use history::{HistoryError, VersionHistory};
pub use id_generator::IdGenerator;
pub use mesh::{EdgeEntry, Mesh, QuadEntry, TriangleEntry, VertexEntry};
pub use scene::{
    Camera, EntityKind, EntityRef, FrameAnimation, Light, LoaderPolicy, Material, Scene,
    SceneError, SceneLoader, Surface,
};
pub use types::{ElementId, ElementKind, EntityId, Revision, VersionLabel, BASE_VERSION};
pub use wire::{
    AssetPair, DecodeError, EncodeError, FrameHeader, MeshTransfer, Payload, PayloadKind,
    RawFrame, HEADER_LEN, MAX_BODY_LEN,
};

pub use glam::Vec3;
