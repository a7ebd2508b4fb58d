use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    diff::{CameraDiff, Diffable, LightDiff, MaterialDiff, MeshDiff},
    mesh::Mesh,
    scene::{EntityKind, EntityRef, Scene, SceneError},
    types::{EntityId, VersionLabel},
};

/// Zero or more per-entity diffs applied together under one version label.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneDiff {
    #[serde(default)]
    pub cameras: Vec<CameraDiff>,
    #[serde(default)]
    pub lights: Vec<LightDiff>,
    #[serde(default)]
    pub materials: Vec<MaterialDiff>,
    #[serde(default)]
    pub meshes: Vec<MeshDiff>,
    #[serde(rename = "_label")]
    pub label: VersionLabel,
}

impl SceneDiff {
    pub fn new(label: VersionLabel) -> Self {
        Self {
            label,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
            && self.lights.is_empty()
            && self.materials.is_empty()
            && self.meshes.is_empty()
    }

    pub fn with_mesh(mut self, diff: MeshDiff) -> Self {
        self.meshes.push(diff);
        self
    }

    pub fn with_camera(mut self, diff: CameraDiff) -> Self {
        self.cameras.push(diff);
        self
    }

    pub fn with_light(mut self, diff: LightDiff) -> Self {
        self.lights.push(diff);
        self
    }

    pub fn with_material(mut self, diff: MaterialDiff) -> Self {
        self.materials.push(diff);
        self
    }

    /// Diffs every entity present in both scenes, matched by id.
    /// Entities that exist on only one side cannot be expressed as a diff
    /// and are skipped.
    pub fn compute(old: &Scene, new: &Scene, label: VersionLabel) -> Self {
        let mut diff = SceneDiff::new(label);

        let camera = old.camera().compute_diff(new.camera());
        if !camera.is_empty() {
            diff.cameras.push(camera);
        }
        for material in new.materials() {
            match old.material(material.id) {
                Some(previous) => {
                    let change = previous.compute_diff(material);
                    if !change.is_empty() {
                        diff.materials.push(change);
                    }
                }
                None => debug!("Material {} only exists in the newer scene", material.id),
            }
        }
        for light in new.lights() {
            match old.light(light.id) {
                Some(previous) => {
                    let change = previous.compute_diff(light);
                    if !change.is_empty() {
                        diff.lights.push(change);
                    }
                }
                None => debug!("Light {} only exists in the newer scene", light.id),
            }
        }
        for mesh in new.meshes() {
            match old.mesh(mesh.id()) {
                Some(previous) => {
                    let change = MeshDiff::compute(previous, mesh);
                    if !change.is_empty() {
                        diff.meshes.push(change);
                    }
                }
                None => debug!("Mesh {} only exists in the newer scene", mesh.id()),
            }
        }
        diff
    }
}

impl Scene {
    /// Resolves every sub-diff target and dry-runs each mesh diff, so a diff
    /// that cannot apply is rejected before the scene is touched.
    ///
    /// Mesh diffs run in order. When several target the same mesh, each one
    /// is checked against a scratch copy that already carries the earlier ones.
    pub fn check_diff(&self, diff: &SceneDiff) -> Result<(), SceneError> {
        for material in &diff.materials {
            expect_kind(self.resolve(material.id)?, material.id, EntityKind::Material)?;
        }
        for light in &diff.lights {
            expect_kind(self.resolve(light.id)?, light.id, EntityKind::Light)?;
        }
        let mut scratch: BTreeMap<EntityId, Mesh> = BTreeMap::new();
        for (position, mesh_diff) in diff.meshes.iter().enumerate() {
            expect_kind(self.resolve(mesh_diff.id)?, mesh_diff.id, EntityKind::Mesh)?;
            let revisited = diff.meshes[position + 1..]
                .iter()
                .any(|later| later.id == mesh_diff.id);
            if let Some(copy) = scratch.get_mut(&mesh_diff.id) {
                copy.apply_diff(mesh_diff)?;
            } else if let Some(mesh) = self.mesh(mesh_diff.id) {
                if revisited {
                    let mut copy = mesh.clone();
                    copy.apply_diff(mesh_diff)?;
                    scratch.insert(mesh_diff.id, copy);
                } else {
                    mesh.check_diff(mesh_diff)?;
                }
            }
            if let Some(material) = mesh_diff.material {
                self.check_material_ref(material)?;
            }
        }
        Ok(())
    }

    /// Dispatches each sub-diff to its target through the id map. Camera
    /// diffs always go to the scene camera.
    pub fn apply_diff(&mut self, diff: &SceneDiff) -> Result<(), SceneError> {
        self.check_diff(diff)?;
        for material in &diff.materials {
            self.material_mut(material.id)?.apply_diff(material)?;
        }
        for camera in &diff.cameras {
            self.camera_mut().apply_diff(camera)?;
        }
        for light in &diff.lights {
            self.light_mut(light.id)?.apply_diff(light)?;
        }
        for mesh in &diff.meshes {
            self.mesh_mut(mesh.id)?.apply_diff(mesh)?;
        }
        Ok(())
    }

    /// Like [`Scene::apply_diff`], also returning the diff that undoes it.
    /// The inverse carries the same label.
    pub fn apply_diff_reverse(&mut self, diff: &SceneDiff) -> Result<SceneDiff, SceneError> {
        self.check_diff(diff)?;
        let mut reverse = SceneDiff::new(diff.label);
        for material in &diff.materials {
            let undo = self.material_mut(material.id)?.apply_diff_reverse(material)?;
            reverse.materials.push(undo);
        }
        for camera in &diff.cameras {
            let undo = self.camera_mut().apply_diff_reverse(camera)?;
            reverse.cameras.push(undo);
        }
        for light in &diff.lights {
            let undo = self.light_mut(light.id)?.apply_diff_reverse(light)?;
            reverse.lights.push(undo);
        }
        for mesh in &diff.meshes {
            let undo = self.mesh_mut(mesh.id)?.apply_diff_reverse(mesh)?;
            reverse.meshes.push(undo);
        }
        // several diffs may hit the same entity; undo them last-first
        reverse.materials.reverse();
        reverse.cameras.reverse();
        reverse.lights.reverse();
        reverse.meshes.reverse();
        Ok(reverse)
    }
}

fn expect_kind(
    entity: EntityRef,
    id: EntityId,
    expected: EntityKind,
) -> Result<(), SceneError> {
    if entity.kind() == expected {
        Ok(())
    } else {
        Err(SceneError::WrongEntityKind {
            id,
            expected,
            actual: entity.kind(),
        })
    }
}
