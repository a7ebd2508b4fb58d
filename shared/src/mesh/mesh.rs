use std::collections::{BTreeMap, BTreeSet};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{
    diff::DiffError,
    frame::{quad_normal, triangle_normal, Frame},
    types::{ElementId, ElementKind, EntityId, Revision},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VertexEntry {
    /// Position of this vertex in `pos` / `norm`
    pub index: usize,
    /// Ids of the triangles and quads that reference this vertex
    pub faces: BTreeSet<ElementId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeEntry {
    pub index: usize,
    pub vertices: [ElementId; 2],
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriangleEntry {
    pub index: usize,
    pub vertices: [ElementId; 3],
    pub normal: Vec3,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuadEntry {
    pub index: usize,
    pub vertices: [ElementId; 4],
    pub normal: Vec3,
}

/// Indexed polygon mesh addressed by stable element ids.
///
/// Every cross reference is stored as an id. Dense positions (`index` fields
/// and the `*_index` arrays) are a rendering-side view that is rebuilt by
/// [`Mesh::compact`] whenever elements are removed. A dead slot in a face
/// index array is `None` until the next compaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    id: EntityId,
    version: Revision,
    frame: Frame,
    material: Option<EntityId>,

    vertices: BTreeMap<ElementId, VertexEntry>,
    pos: Vec<Vec3>,
    norm: Vec<Vec3>,

    edges: BTreeMap<ElementId, EdgeEntry>,
    triangles: BTreeMap<ElementId, TriangleEntry>,
    quads: BTreeMap<ElementId, QuadEntry>,

    edge_index: Vec<Option<[usize; 2]>>,
    triangle_index: Vec<Option<[usize; 3]>>,
    quad_index: Vec<Option<[usize; 4]>>,
}

impl Mesh {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            version: 0,
            frame: Frame::IDENTITY,
            material: None,
            vertices: BTreeMap::new(),
            pos: Vec::new(),
            norm: Vec::new(),
            edges: BTreeMap::new(),
            triangles: BTreeMap::new(),
            quads: BTreeMap::new(),
            edge_index: Vec::new(),
            triangle_index: Vec::new(),
            quad_index: Vec::new(),
        }
    }

    // Identity

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn version(&self) -> Revision {
        self.version
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn material(&self) -> Option<EntityId> {
        self.material
    }

    pub fn set_frame(&mut self, frame: Frame) {
        self.frame = frame;
    }

    pub fn set_material(&mut self, material: Option<EntityId>) {
        self.material = material;
    }

    pub fn set_version(&mut self, version: Revision) {
        self.version = version;
    }

    // Vertices

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn has_vertex(&self, id: &ElementId) -> bool {
        self.vertices.contains_key(id)
    }

    pub fn vertex_ids(&self) -> impl Iterator<Item = &ElementId> {
        self.vertices.keys()
    }

    pub fn vertex(&self, id: &ElementId) -> Option<&VertexEntry> {
        self.vertices.get(id)
    }

    pub fn vertex_position(&self, id: &ElementId) -> Option<Vec3> {
        self.vertices.get(id).map(|entry| self.pos[entry.index])
    }

    pub fn vertex_normal(&self, id: &ElementId) -> Option<Vec3> {
        self.vertices.get(id).map(|entry| self.norm[entry.index])
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.pos
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.norm
    }

    // Faces

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn quad_count(&self) -> usize {
        self.quads.len()
    }

    pub fn edge(&self, id: &ElementId) -> Option<&EdgeEntry> {
        self.edges.get(id)
    }

    pub fn triangle(&self, id: &ElementId) -> Option<&TriangleEntry> {
        self.triangles.get(id)
    }

    pub fn quad(&self, id: &ElementId) -> Option<&QuadEntry> {
        self.quads.get(id)
    }

    pub fn edges(&self) -> impl Iterator<Item = (&ElementId, &EdgeEntry)> {
        self.edges.iter()
    }

    pub fn triangles(&self) -> impl Iterator<Item = (&ElementId, &TriangleEntry)> {
        self.triangles.iter()
    }

    pub fn quads(&self) -> impl Iterator<Item = (&ElementId, &QuadEntry)> {
        self.quads.iter()
    }

    pub fn edge_index(&self) -> &[Option<[usize; 2]>] {
        &self.edge_index
    }

    pub fn triangle_index(&self) -> &[Option<[usize; 3]>] {
        &self.triangle_index
    }

    pub fn quad_index(&self) -> &[Option<[usize; 4]>] {
        &self.quad_index
    }

    /// Whether `id` names any element of this mesh, whatever its kind.
    pub fn has_element(&self, id: &ElementId) -> bool {
        self.vertices.contains_key(id)
            || self.edges.contains_key(id)
            || self.triangles.contains_key(id)
            || self.quads.contains_key(id)
    }

    // Building

    /// Adds a vertex, failing if the id is already used.
    pub fn add_vertex(&mut self, id: ElementId, position: Vec3) -> Result<(), DiffError> {
        if self.has_element(&id) {
            return Err(DiffError::ElementAlreadyExists {
                kind: ElementKind::Vertex,
                id,
            });
        }
        self.push_vertex(id, position);
        Ok(())
    }

    pub fn add_edge(&mut self, id: ElementId, vertices: [ElementId; 2]) -> Result<(), DiffError> {
        self.check_new_element(ElementKind::Edge, id, &vertices)?;
        self.push_edge(id, vertices);
        Ok(())
    }

    pub fn add_triangle(
        &mut self,
        id: ElementId,
        vertices: [ElementId; 3],
    ) -> Result<(), DiffError> {
        self.check_new_element(ElementKind::Triangle, id, &vertices)?;
        self.push_triangle(id, vertices);
        Ok(())
    }

    pub fn add_quad(&mut self, id: ElementId, vertices: [ElementId; 4]) -> Result<(), DiffError> {
        self.check_new_element(ElementKind::Quad, id, &vertices)?;
        self.push_quad(id, vertices);
        Ok(())
    }

    fn check_new_element(
        &self,
        kind: ElementKind,
        id: ElementId,
        vertices: &[ElementId],
    ) -> Result<(), DiffError> {
        if self.has_element(&id) {
            return Err(DiffError::ElementAlreadyExists { kind, id });
        }
        for (i, vertex) in vertices.iter().enumerate() {
            if !self.vertices.contains_key(vertex) {
                return Err(DiffError::ElementNotFound {
                    kind: ElementKind::Vertex,
                    id: *vertex,
                });
            }
            if vertices[..i].contains(vertex) {
                return Err(DiffError::DegenerateFace { kind, id });
            }
        }
        Ok(())
    }

    // Primitive mutations. Callers validate first; these assume every
    // referenced id is live.

    pub(crate) fn push_vertex(&mut self, id: ElementId, position: Vec3) {
        let index = self.pos.len();
        self.pos.push(position);
        self.norm.push(Vec3::ZERO);
        self.vertices.insert(
            id,
            VertexEntry {
                index,
                faces: BTreeSet::new(),
            },
        );
    }

    /// Moves a vertex and incrementally refreshes the normals around it.
    /// Returns the previous position.
    pub(crate) fn move_vertex(&mut self, id: ElementId, position: Vec3) -> Option<Vec3> {
        let entry = self.vertices.get(&id)?;
        let index = entry.index;
        let faces: Vec<ElementId> = entry.faces.iter().copied().collect();

        let old_position = std::mem::replace(&mut self.pos[index], position);

        for face in faces {
            if let Some(triangle) = self.triangles.get(&face) {
                let vertices = triangle.vertices;
                let old_normal = triangle.normal;
                let new_normal = self.compute_triangle_normal(&vertices);
                if let Some(triangle) = self.triangles.get_mut(&face) {
                    triangle.normal = new_normal;
                }
                self.shift_vertex_normals(&vertices, old_normal, new_normal);
            } else if let Some(quad) = self.quads.get(&face) {
                let vertices = quad.vertices;
                let old_normal = quad.normal;
                let new_normal = self.compute_quad_normal(&vertices);
                if let Some(quad) = self.quads.get_mut(&face) {
                    quad.normal = new_normal;
                }
                self.shift_vertex_normals(&vertices, old_normal, new_normal);
            }
        }

        Some(old_position)
    }

    /// Removes a vertex entry and returns its last position.
    /// The dense slot stays behind until the next compaction.
    pub(crate) fn take_vertex(&mut self, id: &ElementId) -> Option<Vec3> {
        let entry = self.vertices.remove(id)?;
        Some(self.pos[entry.index])
    }

    pub(crate) fn push_edge(&mut self, id: ElementId, vertices: [ElementId; 2]) {
        let index = self.edge_index.len();
        self.edge_index.push(Some(self.slots(&vertices)));
        self.edges.insert(id, EdgeEntry { index, vertices });
    }

    pub(crate) fn take_edge(&mut self, id: &ElementId) -> Option<[ElementId; 2]> {
        let entry = self.edges.remove(id)?;
        self.edge_index[entry.index] = None;
        Some(entry.vertices)
    }

    pub(crate) fn push_triangle(&mut self, id: ElementId, vertices: [ElementId; 3]) {
        let normal = self.compute_triangle_normal(&vertices);
        let index = self.triangle_index.len();
        self.triangle_index.push(Some(self.slots(&vertices)));
        self.triangles.insert(
            id,
            TriangleEntry {
                index,
                vertices,
                normal,
            },
        );
        self.fold_face(id, &vertices, normal);
    }

    pub(crate) fn take_triangle(&mut self, id: &ElementId) -> Option<[ElementId; 3]> {
        let entry = self.triangles.remove(id)?;
        self.unfold_face(*id, &entry.vertices, entry.normal);
        self.triangle_index[entry.index] = None;
        Some(entry.vertices)
    }

    pub(crate) fn push_quad(&mut self, id: ElementId, vertices: [ElementId; 4]) {
        let normal = self.compute_quad_normal(&vertices);
        let index = self.quad_index.len();
        self.quad_index.push(Some(self.slots(&vertices)));
        self.quads.insert(
            id,
            QuadEntry {
                index,
                vertices,
                normal,
            },
        );
        self.fold_face(id, &vertices, normal);
    }

    pub(crate) fn take_quad(&mut self, id: &ElementId) -> Option<[ElementId; 4]> {
        let entry = self.quads.remove(id)?;
        self.unfold_face(*id, &entry.vertices, entry.normal);
        self.quad_index[entry.index] = None;
        Some(entry.vertices)
    }

    // Normals

    fn compute_triangle_normal(&self, vertices: &[ElementId; 3]) -> Vec3 {
        let [a, b, c] = vertices.map(|v| self.position_of(&v));
        triangle_normal(a, b, c)
    }

    fn compute_quad_normal(&self, vertices: &[ElementId; 4]) -> Vec3 {
        let [a, b, c, d] = vertices.map(|v| self.position_of(&v));
        quad_normal(a, b, c, d)
    }

    fn position_of(&self, id: &ElementId) -> Vec3 {
        self.vertices
            .get(id)
            .map(|entry| self.pos[entry.index])
            .unwrap_or(Vec3::ZERO)
    }

    fn slots<const N: usize>(&self, vertices: &[ElementId; N]) -> [usize; N] {
        vertices.map(|v| self.vertices.get(&v).map(|entry| entry.index).unwrap_or(0))
    }

    /// Adds a face normal into the running average of each of its vertices.
    fn fold_face(&mut self, face: ElementId, vertices: &[ElementId], normal: Vec3) {
        for vertex in vertices {
            let Some(entry) = self.vertices.get_mut(vertex) else {
                continue;
            };
            let count = entry.faces.len() as f32;
            let average = &mut self.norm[entry.index];
            *average = *average * count + normal;
            entry.faces.insert(face);
            *average /= entry.faces.len() as f32;
        }
    }

    /// Takes a face normal back out of the running average of each of its vertices.
    fn unfold_face(&mut self, face: ElementId, vertices: &[ElementId], normal: Vec3) {
        for vertex in vertices {
            let Some(entry) = self.vertices.get_mut(vertex) else {
                continue;
            };
            if entry.faces.is_empty() {
                continue;
            }
            let count = entry.faces.len() as f32;
            let average = &mut self.norm[entry.index];
            *average = *average * count - normal;
            entry.faces.remove(&face);
            match entry.faces.len() {
                0 => *average = Vec3::ZERO,
                remaining => *average /= remaining as f32,
            }
        }
    }

    /// Moves each vertex average by the change of one adjacent face normal.
    fn shift_vertex_normals(&mut self, vertices: &[ElementId], old_normal: Vec3, new_normal: Vec3) {
        for vertex in vertices {
            let Some(entry) = self.vertices.get(vertex) else {
                continue;
            };
            match entry.faces.len() {
                0 => {}
                // the only adjacent face is the one that moved
                1 => self.norm[entry.index] = new_normal,
                count => self.norm[entry.index] += (new_normal - old_normal) / count as f32,
            }
        }
    }

    // Compaction

    /// Re-packs the dense arrays so that no slot is dead.
    ///
    /// Live elements keep their relative order. Every `index` field and every
    /// face index array entry is rewritten in the same pass, so no lookup is
    /// left pointing at a removed slot. Calling this on a packed mesh changes
    /// nothing.
    pub fn compact(&mut self) {
        let vertices_moved = self.pos.len() != self.vertices.len();
        if vertices_moved {
            self.compact_vertices();
        }
        if vertices_moved || self.edge_index.iter().any(Option::is_none) {
            self.compact_edges();
        }
        if vertices_moved || self.triangle_index.iter().any(Option::is_none) {
            self.compact_triangles();
        }
        if vertices_moved || self.quad_index.iter().any(Option::is_none) {
            self.compact_quads();
        }
    }

    fn compact_vertices(&mut self) {
        let mut live: Vec<(usize, ElementId)> = self
            .vertices
            .iter()
            .map(|(id, entry)| (entry.index, *id))
            .collect();
        live.sort_unstable();

        let mut pos = Vec::with_capacity(live.len());
        let mut norm = Vec::with_capacity(live.len());
        for (new_index, (old_index, id)) in live.into_iter().enumerate() {
            pos.push(self.pos[old_index]);
            norm.push(self.norm[old_index]);
            if let Some(entry) = self.vertices.get_mut(&id) {
                entry.index = new_index;
            }
        }
        self.pos = pos;
        self.norm = norm;
    }

    fn compact_edges(&mut self) {
        let mut live: Vec<(usize, ElementId)> =
            self.edges.iter().map(|(id, e)| (e.index, *id)).collect();
        live.sort_unstable();

        let mut index = Vec::with_capacity(live.len());
        for (new_index, (_, id)) in live.into_iter().enumerate() {
            let Some(vertices) = self.edges.get(&id).map(|e| e.vertices) else {
                continue;
            };
            index.push(Some(self.slots(&vertices)));
            if let Some(entry) = self.edges.get_mut(&id) {
                entry.index = new_index;
            }
        }
        self.edge_index = index;
    }

    fn compact_triangles(&mut self) {
        let mut live: Vec<(usize, ElementId)> =
            self.triangles.iter().map(|(id, t)| (t.index, *id)).collect();
        live.sort_unstable();

        let mut index = Vec::with_capacity(live.len());
        for (new_index, (_, id)) in live.into_iter().enumerate() {
            let Some(vertices) = self.triangles.get(&id).map(|t| t.vertices) else {
                continue;
            };
            index.push(Some(self.slots(&vertices)));
            if let Some(entry) = self.triangles.get_mut(&id) {
                entry.index = new_index;
            }
        }
        self.triangle_index = index;
    }

    fn compact_quads(&mut self) {
        let mut live: Vec<(usize, ElementId)> =
            self.quads.iter().map(|(id, q)| (q.index, *id)).collect();
        live.sort_unstable();

        let mut index = Vec::with_capacity(live.len());
        for (new_index, (_, id)) in live.into_iter().enumerate() {
            let Some(vertices) = self.quads.get(&id).map(|q| q.vertices) else {
                continue;
            };
            index.push(Some(self.slots(&vertices)));
            if let Some(entry) = self.quads.get_mut(&id) {
                entry.index = new_index;
            }
        }
        self.quad_index = index;
    }

    // Checks

    /// Same element ids, same vertex positions and same face vertex tuples.
    /// Dense positions, cached normals and the version are ignored.
    pub fn structurally_eq(&self, other: &Mesh) -> bool {
        self.id == other.id
            && self.vertices.len() == other.vertices.len()
            && self
                .vertices
                .keys()
                .all(|id| self.vertex_position(id) == other.vertex_position(id))
            && self.edges.len() == other.edges.len()
            && self
                .edges
                .iter()
                .all(|(id, e)| other.edges.get(id).map(|o| o.vertices) == Some(e.vertices))
            && self.triangles.len() == other.triangles.len()
            && self
                .triangles
                .iter()
                .all(|(id, t)| other.triangles.get(id).map(|o| o.vertices) == Some(t.vertices))
            && self.quads.len() == other.quads.len()
            && self
                .quads
                .iter()
                .all(|(id, q)| other.quads.get(id).map(|o| o.vertices) == Some(q.vertices))
    }

    /// Verifies every structural invariant of a packed mesh.
    pub fn validate(&self) -> Result<(), DiffError> {
        check_count("positions", self.vertices.len(), self.pos.len())?;
        check_count("normals", self.vertices.len(), self.norm.len())?;
        check_count("edge index", self.edges.len(), self.edge_index.len())?;
        check_count("triangle index", self.triangles.len(), self.triangle_index.len())?;
        check_count("quad index", self.quads.len(), self.quad_index.len())?;

        let mut taken = vec![false; self.pos.len()];
        for (id, entry) in &self.vertices {
            if entry.index >= taken.len() || taken[entry.index] {
                return Err(DiffError::SlotMismatch {
                    kind: ElementKind::Vertex,
                    id: *id,
                });
            }
            taken[entry.index] = true;
        }

        let mut expected: BTreeMap<ElementId, BTreeSet<ElementId>> = BTreeMap::new();
        let faces = self
            .triangles
            .iter()
            .map(|(id, t)| (ElementKind::Triangle, *id, t.vertices.to_vec()))
            .chain(
                self.quads
                    .iter()
                    .map(|(id, q)| (ElementKind::Quad, *id, q.vertices.to_vec())),
            );
        for (_, face, vertices) in faces {
            for vertex in vertices {
                if !self.vertices.contains_key(&vertex) {
                    return Err(DiffError::ElementNotFound {
                        kind: ElementKind::Vertex,
                        id: vertex,
                    });
                }
                expected.entry(vertex).or_default().insert(face);
            }
        }
        for edge in self.edges.values() {
            for vertex in edge.vertices {
                if !self.vertices.contains_key(&vertex) {
                    return Err(DiffError::ElementNotFound {
                        kind: ElementKind::Vertex,
                        id: vertex,
                    });
                }
            }
        }
        self.check_slots(
            ElementKind::Edge,
            self.edges.iter().map(|(id, e)| (*id, e.index, e.vertices)),
            &self.edge_index,
        )?;
        self.check_slots(
            ElementKind::Triangle,
            self.triangles.iter().map(|(id, t)| (*id, t.index, t.vertices)),
            &self.triangle_index,
        )?;
        self.check_slots(
            ElementKind::Quad,
            self.quads.iter().map(|(id, q)| (*id, q.index, q.vertices)),
            &self.quad_index,
        )?;

        for (id, entry) in &self.vertices {
            let adjacent = expected.remove(id).unwrap_or_default();
            if adjacent != entry.faces {
                return Err(DiffError::ConsistencyMismatch {
                    step: "vertex adjacency",
                    expected: adjacent.len(),
                    actual: entry.faces.len(),
                });
            }
        }
        Ok(())
    }

    /// Every element owns exactly one slot of `index`, and that slot holds
    /// the dense positions of its vertices.
    fn check_slots<const N: usize>(
        &self,
        kind: ElementKind,
        elements: impl Iterator<Item = (ElementId, usize, [ElementId; N])>,
        index: &[Option<[usize; N]>],
    ) -> Result<(), DiffError> {
        let mut taken = vec![false; index.len()];
        for (id, slot, vertices) in elements {
            let owned = slot < index.len()
                && !taken[slot]
                && index[slot] == Some(self.slots(&vertices));
            if !owned {
                return Err(DiffError::SlotMismatch { kind, id });
            }
            taken[slot] = true;
        }
        Ok(())
    }
}

pub(crate) fn check_count(
    step: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), DiffError> {
    if expected == actual {
        Ok(())
    } else {
        log::error!(
            "Mesh consistency check failed at {}: expected {}, found {}",
            step,
            expected,
            actual
        );
        Err(DiffError::ConsistencyMismatch {
            step,
            expected,
            actual,
        })
    }
}
