use glam::Vec3;
use log::{info, warn};
use serde::Deserialize;

use crate::{
    frame::Frame,
    id_generator::IdGenerator,
    mesh::Mesh,
    scene::{Camera, FrameAnimation, Light, Material, Scene, SceneError, Surface},
    types::{ElementId, EntityId, Revision},
};

/// What to do when a mesh or surface names a material that is not defined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoaderPolicy {
    /// Fail with `SceneError::ReferenceUnresolved`
    Strict,
    /// Substitute a shared default material and log a warning
    #[default]
    Lenient,
}

/// Builds a `Scene` from a JSON scene description.
pub struct SceneLoader {
    policy: LoaderPolicy,
    ids: IdGenerator,
}

impl SceneLoader {
    pub fn new(policy: LoaderPolicy) -> Self {
        Self {
            policy,
            ids: IdGenerator::new(),
        }
    }

    pub fn from_json(text: &str) -> Result<Scene, SceneError> {
        Self::new(LoaderPolicy::default()).load(text)
    }

    pub fn load(&mut self, text: &str) -> Result<Scene, SceneError> {
        let description: SceneDescription =
            serde_json::from_str(text).map_err(|err| SceneError::Parse {
                reason: err.to_string(),
            })?;
        self.build(description)
    }

    fn entity_id(&mut self, id: Option<EntityId>) -> EntityId {
        match id {
            Some(id) if id != 0 => {
                self.ids.observe(id);
                id
            }
            _ => self.ids.generate(),
        }
    }

    fn build(&mut self, description: SceneDescription) -> Result<Scene, SceneError> {
        let camera = match (description.camera, description.lookat_camera) {
            (_, Some(lookat)) => {
                let id = self.entity_id(lookat.id);
                let mut camera = Camera::look_at(
                    id,
                    lookat.from,
                    lookat.to,
                    lookat.up,
                    lookat.fovy,
                    lookat.aspect,
                );
                camera.version = lookat.version;
                camera
            }
            (Some(desc), None) => {
                let mut camera = Camera::new(self.entity_id(desc.id));
                camera.version = desc.version;
                camera.frame = desc.frame.map(FrameDescription::into_frame).unwrap_or_default();
                camera.width = desc.width.unwrap_or(camera.width);
                camera.height = desc.height.unwrap_or(camera.height);
                camera.dist = desc.dist.unwrap_or(camera.dist);
                camera.focus = desc.focus.unwrap_or(camera.focus);
                camera
            }
            (None, None) => Camera::new(self.ids.generate()),
        };
        let mut scene = Scene::new(camera);

        for desc in description.materials {
            let mut material = Material::new(self.entity_id(desc.id));
            material.version = desc.version;
            material.ke = desc.ke.unwrap_or(material.ke);
            material.kd = desc.kd.unwrap_or(material.kd);
            material.ks = desc.ks.unwrap_or(material.ks);
            material.n = desc.n.unwrap_or(material.n);
            material.kr = desc.kr.unwrap_or(material.kr);
            material.double_sided = desc.double_sided;
            material.microfacet = desc.microfacet;
            scene.insert_material(material)?;
        }

        for desc in description.lights {
            let mut light = Light::new(self.entity_id(desc.id));
            light.version = desc.version;
            light.frame = desc.frame.map(FrameDescription::into_frame).unwrap_or_default();
            light.intensity = desc.intensity.unwrap_or(light.intensity);
            scene.insert_light(light)?;
        }

        // material references resolve once every material is known
        let mut fallback: Option<EntityId> = None;

        for desc in description.meshes {
            let id = self.entity_id(desc.id);
            let material = self.resolve_material(&mut scene, &mut fallback, desc.material, id)?;
            let mut mesh = Mesh::new(id);
            mesh.set_version(desc.version);
            mesh.set_material(material);
            if let Some(frame) = desc.frame {
                mesh.set_frame(frame.into_frame());
            }
            for vertex in desc.vertices {
                self.ids.observe(vertex.id);
                mesh.add_vertex(vertex.id, vertex.pos)?;
            }
            for edge in desc.edges {
                self.ids.observe(edge.id);
                mesh.add_edge(edge.id, edge.ver_ids)?;
            }
            for triangle in desc.triangles {
                self.ids.observe(triangle.id);
                mesh.add_triangle(triangle.id, triangle.ver_ids)?;
            }
            for quad in desc.quads {
                self.ids.observe(quad.id);
                mesh.add_quad(quad.id, quad.ver_ids)?;
            }
            scene.insert_mesh(mesh)?;
        }

        for desc in description.surfaces {
            let owner = self.ids.generate();
            let material = self.resolve_material(&mut scene, &mut fallback, desc.material, owner)?;
            let animation = match desc.animation {
                Some(animation) => {
                    let id = self.entity_id(animation.id);
                    scene.insert_animation(FrameAnimation {
                        id,
                        rest_frame: animation
                            .rest_frame
                            .map(FrameDescription::into_frame)
                            .unwrap_or_default(),
                        keytimes: animation.keytimes,
                        translation: animation.translation,
                        rotation: animation.rotation,
                    })?;
                    Some(id)
                }
                None => None,
            };
            scene.add_surface(Surface {
                frame: desc.frame.map(FrameDescription::into_frame).unwrap_or_default(),
                radius: desc.radius.unwrap_or(1.0),
                is_quad: desc.isquad,
                material,
                animation,
            })?;
        }

        info!(
            "Loaded scene: {} meshes, {} lights, {} materials, {} surfaces",
            scene.meshes().len(),
            scene.lights().len(),
            scene.materials().len(),
            scene.surfaces().len()
        );
        Ok(scene)
    }

    fn resolve_material(
        &mut self,
        scene: &mut Scene,
        fallback: &mut Option<EntityId>,
        requested: Option<EntityId>,
        owner: EntityId,
    ) -> Result<Option<EntityId>, SceneError> {
        let Some(id) = requested else {
            return Ok(None);
        };
        if scene.material(id).is_some() {
            return Ok(Some(id));
        }
        match self.policy {
            LoaderPolicy::Strict => Err(SceneError::ReferenceUnresolved { id }),
            LoaderPolicy::Lenient => {
                warn!(
                    "Entity {} references missing material {}, using the default material",
                    owner, id
                );
                match fallback {
                    Some(existing) => Ok(Some(*existing)),
                    None => {
                        let default_id = self.ids.generate();
                        scene.insert_material(Material::new(default_id))?;
                        *fallback = Some(default_id);
                        Ok(Some(default_id))
                    }
                }
            }
        }
    }
}

// Description

#[derive(Deserialize)]
struct SceneDescription {
    #[serde(default)]
    camera: Option<CameraDescription>,
    #[serde(default)]
    lookat_camera: Option<LookAtDescription>,
    #[serde(default)]
    lights: Vec<LightDescription>,
    #[serde(default)]
    materials: Vec<MaterialDescription>,
    #[serde(default)]
    meshes: Vec<MeshDescription>,
    #[serde(default)]
    surfaces: Vec<SurfaceDescription>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FrameDescription {
    // tried first: every basis field is optional, so it matches any object
    LookAt {
        from: Vec3,
        to: Vec3,
        #[serde(default = "up_axis")]
        up: Vec3,
    },
    Basis {
        #[serde(default)]
        o: Option<Vec3>,
        #[serde(default)]
        x: Option<Vec3>,
        #[serde(default)]
        y: Option<Vec3>,
        #[serde(default)]
        z: Option<Vec3>,
    },
}

impl FrameDescription {
    fn into_frame(self) -> Frame {
        match self {
            FrameDescription::LookAt { from, to, up } => Frame::look_at(from, to, up),
            FrameDescription::Basis { o, x, y, z } => Frame {
                o: o.unwrap_or(Frame::IDENTITY.o),
                x: x.unwrap_or(Frame::IDENTITY.x),
                y: y.unwrap_or(Frame::IDENTITY.y),
                z: z.unwrap_or(Frame::IDENTITY.z),
            },
        }
    }
}

fn up_axis() -> Vec3 {
    Vec3::Y
}

fn default_fovy() -> f32 {
    45.0
}

fn default_aspect() -> f32 {
    1.0
}

#[derive(Deserialize)]
struct CameraDescription {
    #[serde(rename = "_id_", default)]
    id: Option<EntityId>,
    #[serde(default)]
    version: Revision,
    #[serde(default)]
    frame: Option<FrameDescription>,
    width: Option<f32>,
    height: Option<f32>,
    dist: Option<f32>,
    focus: Option<f32>,
}

#[derive(Deserialize)]
struct LookAtDescription {
    #[serde(rename = "_id_", default)]
    id: Option<EntityId>,
    #[serde(default)]
    version: Revision,
    from: Vec3,
    to: Vec3,
    #[serde(default = "up_axis")]
    up: Vec3,
    #[serde(default = "default_fovy")]
    fovy: f32,
    #[serde(default = "default_aspect")]
    aspect: f32,
}

#[derive(Deserialize)]
struct LightDescription {
    #[serde(rename = "_id_", default)]
    id: Option<EntityId>,
    #[serde(default)]
    version: Revision,
    #[serde(default)]
    frame: Option<FrameDescription>,
    intensity: Option<Vec3>,
}

#[derive(Deserialize)]
struct MaterialDescription {
    #[serde(rename = "_id_", default)]
    id: Option<EntityId>,
    #[serde(default)]
    version: Revision,
    ke: Option<Vec3>,
    kd: Option<Vec3>,
    ks: Option<Vec3>,
    n: Option<f32>,
    kr: Option<Vec3>,
    #[serde(default)]
    double_sided: bool,
    #[serde(default)]
    microfacet: bool,
}

#[derive(Deserialize)]
struct ElementDescription<const N: usize> {
    #[serde(rename = "_id_")]
    id: ElementId,
    #[serde(with = "ver_ids")]
    ver_ids: [ElementId; N],
}

#[derive(Deserialize)]
struct VertexDescription {
    #[serde(rename = "_id_")]
    id: ElementId,
    pos: Vec3,
}

#[derive(Deserialize)]
struct MeshDescription {
    #[serde(rename = "_id_", default)]
    id: Option<EntityId>,
    #[serde(default)]
    version: Revision,
    #[serde(default)]
    frame: Option<FrameDescription>,
    #[serde(default)]
    material: Option<EntityId>,
    #[serde(default)]
    vertices: Vec<VertexDescription>,
    #[serde(default)]
    edges: Vec<ElementDescription<2>>,
    #[serde(default)]
    triangles: Vec<ElementDescription<3>>,
    #[serde(default)]
    quads: Vec<ElementDescription<4>>,
}

#[derive(Deserialize)]
struct AnimationDescription {
    #[serde(rename = "_id_", default)]
    id: Option<EntityId>,
    #[serde(default)]
    rest_frame: Option<FrameDescription>,
    #[serde(default)]
    keytimes: Vec<u32>,
    #[serde(default)]
    translation: Vec<Vec3>,
    #[serde(default)]
    rotation: Vec<Vec3>,
}

#[derive(Deserialize)]
struct SurfaceDescription {
    #[serde(default)]
    frame: Option<FrameDescription>,
    radius: Option<f32>,
    #[serde(default)]
    isquad: bool,
    #[serde(default)]
    material: Option<EntityId>,
    #[serde(default)]
    animation: Option<AnimationDescription>,
}

/// Fixed-size id tuples arrive as JSON arrays of any length; check the arity here.
mod ver_ids {
    use serde::{de::Error, Deserialize, Deserializer};

    use crate::types::ElementId;

    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[ElementId; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let ids = Vec::<ElementId>::deserialize(deserializer)?;
        let len = ids.len();
        ids.try_into()
            .map_err(|_| D::Error::custom(format!("expected {} vertex ids, found {}", N, len)))
    }
}
