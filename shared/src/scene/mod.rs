mod camera;
mod entity_ref;
mod error;
mod light;
mod loader;
mod material;
mod scene;
mod surface;

pub use camera::Camera;
pub use entity_ref::{EntityKind, EntityRef};
pub use error::SceneError;
pub use light::Light;
pub use loader::{LoaderPolicy, SceneLoader};
pub use material::Material;
pub use scene::Scene;
pub use surface::{FrameAnimation, Surface};
