use std::collections::HashMap;

use log::{debug, info};

use crate::{
    mesh::Mesh,
    scene::{
        Camera, EntityKind, EntityRef, FrameAnimation, Light, Material, SceneError, Surface,
    },
    types::EntityId,
};

/// One camera plus ordered meshes, lights, materials and surfaces.
///
/// `ids_map` resolves any entity id to where it lives, so an incoming diff
/// can be dispatched without knowing its target kind up front. Meshes and
/// surfaces refer to materials by id; the material table is owned here.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    camera: Camera,
    meshes: Vec<Mesh>,
    lights: Vec<Light>,
    materials: Vec<Material>,
    surfaces: Vec<Surface>,
    animations: Vec<FrameAnimation>,
    ids_map: HashMap<EntityId, EntityRef>,
}

impl Scene {
    pub fn new(camera: Camera) -> Self {
        let mut ids_map = HashMap::new();
        ids_map.insert(camera.id, EntityRef::Camera);
        Self {
            camera,
            meshes: Vec::new(),
            lights: Vec::new(),
            materials: Vec::new(),
            surfaces: Vec::new(),
            animations: Vec::new(),
            ids_map,
        }
    }

    // Lookup

    pub fn resolve(&self, id: EntityId) -> Result<EntityRef, SceneError> {
        self.ids_map
            .get(&id)
            .copied()
            .ok_or(SceneError::ReferenceUnresolved { id })
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.ids_map.contains_key(&id)
    }

    fn resolve_kind(&self, id: EntityId, expected: EntityKind) -> Result<EntityRef, SceneError> {
        let entity = self.resolve(id)?;
        if entity.kind() != expected {
            return Err(SceneError::WrongEntityKind {
                id,
                expected,
                actual: entity.kind(),
            });
        }
        Ok(entity)
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    pub fn animations(&self) -> &[FrameAnimation] {
        &self.animations
    }

    pub fn mesh(&self, id: EntityId) -> Option<&Mesh> {
        match self.ids_map.get(&id) {
            Some(EntityRef::Mesh(index)) => self.meshes.get(*index),
            _ => None,
        }
    }

    pub fn light(&self, id: EntityId) -> Option<&Light> {
        match self.ids_map.get(&id) {
            Some(EntityRef::Light(index)) => self.lights.get(*index),
            _ => None,
        }
    }

    pub fn material(&self, id: EntityId) -> Option<&Material> {
        match self.ids_map.get(&id) {
            Some(EntityRef::Material(index)) => self.materials.get(*index),
            _ => None,
        }
    }

    pub fn animation(&self, id: EntityId) -> Option<&FrameAnimation> {
        match self.ids_map.get(&id) {
            Some(EntityRef::Animation(index)) => self.animations.get(*index),
            _ => None,
        }
    }

    pub(crate) fn mesh_mut(&mut self, id: EntityId) -> Result<&mut Mesh, SceneError> {
        match self.resolve_kind(id, EntityKind::Mesh)? {
            EntityRef::Mesh(index) => self
                .meshes
                .get_mut(index)
                .ok_or(SceneError::ReferenceUnresolved { id }),
            _ => Err(SceneError::ReferenceUnresolved { id }),
        }
    }

    pub(crate) fn light_mut(&mut self, id: EntityId) -> Result<&mut Light, SceneError> {
        match self.resolve_kind(id, EntityKind::Light)? {
            EntityRef::Light(index) => self
                .lights
                .get_mut(index)
                .ok_or(SceneError::ReferenceUnresolved { id }),
            _ => Err(SceneError::ReferenceUnresolved { id }),
        }
    }

    pub(crate) fn material_mut(&mut self, id: EntityId) -> Result<&mut Material, SceneError> {
        match self.resolve_kind(id, EntityKind::Material)? {
            EntityRef::Material(index) => self
                .materials
                .get_mut(index)
                .ok_or(SceneError::ReferenceUnresolved { id }),
            _ => Err(SceneError::ReferenceUnresolved { id }),
        }
    }

    /// Fails unless `id` is absent or names a registered material.
    pub fn check_material_ref(&self, id: Option<EntityId>) -> Result<(), SceneError> {
        match id {
            Some(id) => self.resolve_kind(id, EntityKind::Material).map(|_| ()),
            None => Ok(()),
        }
    }

    // Insertion

    fn claim_id(&self, id: EntityId) -> Result<(), SceneError> {
        if self.ids_map.contains_key(&id) {
            return Err(SceneError::DuplicateEntity { id });
        }
        Ok(())
    }

    pub fn insert_material(&mut self, material: Material) -> Result<(), SceneError> {
        self.claim_id(material.id)?;
        self.ids_map
            .insert(material.id, EntityRef::Material(self.materials.len()));
        self.materials.push(material);
        Ok(())
    }

    pub fn insert_light(&mut self, light: Light) -> Result<(), SceneError> {
        self.claim_id(light.id)?;
        self.ids_map.insert(light.id, EntityRef::Light(self.lights.len()));
        self.lights.push(light);
        Ok(())
    }

    pub fn insert_animation(&mut self, animation: FrameAnimation) -> Result<(), SceneError> {
        self.claim_id(animation.id)?;
        self.ids_map
            .insert(animation.id, EntityRef::Animation(self.animations.len()));
        self.animations.push(animation);
        Ok(())
    }

    pub fn insert_mesh(&mut self, mesh: Mesh) -> Result<(), SceneError> {
        self.claim_id(mesh.id())?;
        self.check_material_ref(mesh.material())?;
        self.ids_map.insert(mesh.id(), EntityRef::Mesh(self.meshes.len()));
        self.meshes.push(mesh);
        Ok(())
    }

    pub fn add_surface(&mut self, surface: Surface) -> Result<(), SceneError> {
        self.check_material_ref(surface.material)?;
        if let Some(animation) = surface.animation {
            self.resolve_kind(animation, EntityKind::Animation)?;
        }
        self.surfaces.push(surface);
        Ok(())
    }

    // Whole-object replacement

    /// Installs `mesh` as the current version of the mesh with the same id,
    /// or inserts it if the id is new. A material delivered with the mesh is
    /// swapped into the material table first.
    ///
    /// Everything is checked before anything is replaced: on error the scene
    /// is unchanged. Returns the mesh that was replaced, if any.
    pub fn swap_mesh(
        &mut self,
        mesh: Mesh,
        material: Option<Material>,
    ) -> Result<Option<Mesh>, SceneError> {
        let id = mesh.id();
        let slot = match self.ids_map.get(&id) {
            Some(EntityRef::Mesh(index)) => Some(*index),
            Some(other) => {
                return Err(SceneError::WrongEntityKind {
                    id,
                    expected: EntityKind::Mesh,
                    actual: other.kind(),
                })
            }
            None => None,
        };

        if let Some(material) = &material {
            if let Some(other) = self.ids_map.get(&material.id) {
                if other.kind() != EntityKind::Material {
                    return Err(SceneError::WrongEntityKind {
                        id: material.id,
                        expected: EntityKind::Material,
                        actual: other.kind(),
                    });
                }
            }
            if material.id == id {
                return Err(SceneError::DuplicateEntity { id });
            }
        }
        let material_id = material.as_ref().map(|material| material.id);
        if mesh.material().is_some() && mesh.material() != material_id {
            self.check_material_ref(mesh.material())?;
        }

        if let Some(material) = material {
            self.swap_material(material)?;
        }

        match slot {
            Some(index) => {
                debug!("Swapping mesh {} (version {})", id, mesh.version());
                Ok(Some(std::mem::replace(&mut self.meshes[index], mesh)))
            }
            None => {
                info!("Installing new mesh {}", id);
                self.ids_map.insert(id, EntityRef::Mesh(self.meshes.len()));
                self.meshes.push(mesh);
                Ok(None)
            }
        }
    }

    /// Replaces the material with the same id, or inserts it.
    pub fn swap_material(&mut self, material: Material) -> Result<Option<Material>, SceneError> {
        let id = material.id;
        match self.ids_map.get(&id) {
            Some(EntityRef::Material(index)) => {
                Ok(Some(std::mem::replace(&mut self.materials[*index], material)))
            }
            Some(other) => Err(SceneError::WrongEntityKind {
                id,
                expected: EntityKind::Material,
                actual: other.kind(),
            }),
            None => {
                self.insert_material(material)?;
                Ok(None)
            }
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(Camera::default())
    }
}
