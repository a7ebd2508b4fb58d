use std::{
    collections::{BTreeMap, BTreeSet},
    iter::Peekable,
    time::Instant,
};

use glam::Vec3;
use log::trace;
use serde::{Deserialize, Serialize};

use crate::{
    diff::{double_option, DiffError, Diffable},
    frame::Frame,
    mesh::{check_count, Mesh},
    types::{ElementId, ElementKind, EntityId, Revision},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// Only compare elements; leave frame and material out of the diff
    pub geometric_only: bool,
    /// Walk both id maps in a single merge pass instead of per-id lookups
    pub assume_ordered: bool,
}

/// Sparse change set between two versions of one mesh.
///
/// Structural sets are always present (possibly empty); `frame` and
/// `material` are `None` when unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshDiff {
    #[serde(rename = "_id_")]
    pub id: EntityId,
    #[serde(rename = "_version")]
    pub version: Revision,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<Frame>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "double_option")]
    pub material: Option<Option<EntityId>>,

    #[serde(default)]
    pub remove_vertex: BTreeSet<ElementId>,
    #[serde(default)]
    pub add_vertex: BTreeMap<ElementId, Vec3>,
    #[serde(default)]
    pub update_vertex: BTreeMap<ElementId, Vec3>,

    #[serde(default)]
    pub remove_edge: BTreeSet<ElementId>,
    #[serde(default)]
    pub add_edge: BTreeMap<ElementId, [ElementId; 2]>,

    #[serde(default)]
    pub remove_triangle: BTreeSet<ElementId>,
    #[serde(default)]
    pub add_triangle: BTreeMap<ElementId, [ElementId; 3]>,

    #[serde(default)]
    pub remove_quad: BTreeSet<ElementId>,
    #[serde(default)]
    pub add_quad: BTreeMap<ElementId, [ElementId; 4]>,
}

impl MeshDiff {
    pub fn new(id: EntityId, version: Revision) -> Self {
        Self {
            id,
            version,
            ..Default::default()
        }
    }

    /// True when applying the diff would only bump the version.
    pub fn is_empty(&self) -> bool {
        self.frame.is_none()
            && self.material.is_none()
            && self.remove_vertex.is_empty()
            && self.add_vertex.is_empty()
            && self.update_vertex.is_empty()
            && self.remove_edge.is_empty()
            && self.add_edge.is_empty()
            && self.remove_triangle.is_empty()
            && self.add_triangle.is_empty()
            && self.remove_quad.is_empty()
            && self.add_quad.is_empty()
    }

    pub fn compute(old: &Mesh, new: &Mesh) -> Self {
        Self::compute_with(old, new, DiffOptions::default())
    }

    pub fn compute_with(old: &Mesh, new: &Mesh, options: DiffOptions) -> Self {
        let mut diff = MeshDiff::new(new.id(), new.version());

        let vertices = element_changes(
            old.vertex_ids().map(|id| (*id, old.vertex_position(id).unwrap_or(Vec3::ZERO))),
            |id| old.vertex_position(id),
            new.vertex_ids().map(|id| (*id, new.vertex_position(id).unwrap_or(Vec3::ZERO))),
            |id| new.vertex_position(id),
            options.assume_ordered,
        );
        diff.remove_vertex = vertices.removed;
        diff.add_vertex = vertices.added;
        diff.update_vertex = vertices.changed;

        let edges = element_changes(
            old.edges().map(|(id, e)| (*id, e.vertices)),
            |id| old.edge(id).map(|e| e.vertices),
            new.edges().map(|(id, e)| (*id, e.vertices)),
            |id| new.edge(id).map(|e| e.vertices),
            options.assume_ordered,
        )
        .into_replacements();
        diff.remove_edge = edges.removed;
        diff.add_edge = edges.added;

        let triangles = element_changes(
            old.triangles().map(|(id, t)| (*id, t.vertices)),
            |id| old.triangle(id).map(|t| t.vertices),
            new.triangles().map(|(id, t)| (*id, t.vertices)),
            |id| new.triangle(id).map(|t| t.vertices),
            options.assume_ordered,
        )
        .into_replacements();
        diff.remove_triangle = triangles.removed;
        diff.add_triangle = triangles.added;

        let quads = element_changes(
            old.quads().map(|(id, q)| (*id, q.vertices)),
            |id| old.quad(id).map(|q| q.vertices),
            new.quads().map(|(id, q)| (*id, q.vertices)),
            |id| new.quad(id).map(|q| q.vertices),
            options.assume_ordered,
        )
        .into_replacements();
        diff.remove_quad = quads.removed;
        diff.add_quad = quads.added;

        if !options.geometric_only {
            if old.frame() != new.frame() {
                diff.frame = Some(*new.frame());
            }
            if old.material() != new.material() {
                diff.material = Some(new.material());
            }
        }

        diff
    }
}

struct Changes<V> {
    removed: BTreeSet<ElementId>,
    added: BTreeMap<ElementId, V>,
    changed: BTreeMap<ElementId, V>,
}

impl<V> Changes<V> {
    fn new() -> Self {
        Self {
            removed: BTreeSet::new(),
            added: BTreeMap::new(),
            changed: BTreeMap::new(),
        }
    }

    /// Faces and edges are immutable per id: a changed tuple becomes a
    /// remove followed by an add of the same id.
    fn into_replacements(mut self) -> Self {
        for (id, value) in std::mem::take(&mut self.changed) {
            self.removed.insert(id);
            self.added.insert(id, value);
        }
        self
    }
}

fn element_changes<V, OI, OG, NI, NG>(
    old: OI,
    old_get: OG,
    new: NI,
    new_get: NG,
    assume_ordered: bool,
) -> Changes<V>
where
    V: Copy + PartialEq,
    OI: Iterator<Item = (ElementId, V)>,
    OG: Fn(&ElementId) -> Option<V>,
    NI: Iterator<Item = (ElementId, V)>,
    NG: Fn(&ElementId) -> Option<V>,
{
    if assume_ordered {
        return merge_changes(old.peekable(), new.peekable());
    }

    let mut changes = Changes::new();
    for (id, _) in old {
        if new_get(&id).is_none() {
            changes.removed.insert(id);
        }
    }
    for (id, value) in new {
        match old_get(&id) {
            None => {
                changes.added.insert(id, value);
            }
            Some(previous) if previous != value => {
                changes.changed.insert(id, value);
            }
            Some(_) => {}
        }
    }
    changes
}

/// Single pass over two id-sorted sequences.
fn merge_changes<V, OI, NI>(mut old: Peekable<OI>, mut new: Peekable<NI>) -> Changes<V>
where
    V: Copy + PartialEq,
    OI: Iterator<Item = (ElementId, V)>,
    NI: Iterator<Item = (ElementId, V)>,
{
    let mut changes = Changes::new();
    loop {
        let old_id = old.peek().map(|(id, _)| *id);
        let new_id = new.peek().map(|(id, _)| *id);
        match (old_id, new_id) {
            (None, None) => break,
            (Some(old_id), Some(new_id)) if old_id == new_id => {
                if let (Some((_, previous)), Some((id, value))) = (old.next(), new.next()) {
                    if previous != value {
                        changes.changed.insert(id, value);
                    }
                }
            }
            (Some(old_id), new_id) if new_id.map_or(true, |new_id| old_id < new_id) => {
                old.next();
                changes.removed.insert(old_id);
            }
            (_, Some(_)) => {
                if let Some((id, value)) = new.next() {
                    changes.added.insert(id, value);
                }
            }
            (Some(_), None) => {
                old.next();
            }
        }
    }
    changes
}

// Apply

impl Mesh {
    /// Checks that `diff` can be applied to this mesh as a whole.
    ///
    /// Nothing is mutated; a diff that passes will not fail any of the
    /// per-step consistency checks.
    pub fn check_diff(&self, diff: &MeshDiff) -> Result<(), DiffError> {
        if diff.id != self.id() {
            return Err(DiffError::EntityIdMismatch {
                expected: self.id(),
                actual: diff.id,
            });
        }

        // Vertices
        for id in diff.add_vertex.keys() {
            if self.has_element(id) {
                return Err(DiffError::ElementAlreadyExists {
                    kind: ElementKind::Vertex,
                    id: *id,
                });
            }
        }
        for id in diff.update_vertex.keys() {
            if !self.has_vertex(id) && !diff.add_vertex.contains_key(id) {
                return Err(not_found(ElementKind::Vertex, *id));
            }
        }

        // Removals
        for id in &diff.remove_edge {
            if self.edge(id).is_none() {
                return Err(not_found(ElementKind::Edge, *id));
            }
        }
        for id in &diff.remove_triangle {
            if self.triangle(id).is_none() {
                return Err(not_found(ElementKind::Triangle, *id));
            }
        }
        for id in &diff.remove_quad {
            if self.quad(id).is_none() {
                return Err(not_found(ElementKind::Quad, *id));
            }
        }
        for id in &diff.remove_vertex {
            let Some(vertex) = self.vertex(id) else {
                return Err(not_found(ElementKind::Vertex, *id));
            };
            for face in &vertex.faces {
                if !diff.remove_triangle.contains(face) && !diff.remove_quad.contains(face) {
                    return Err(DiffError::VertexStillReferenced {
                        vertex: *id,
                        element: *face,
                    });
                }
            }
        }
        if !diff.remove_vertex.is_empty() {
            for (edge_id, edge) in self.edges() {
                if diff.remove_edge.contains(edge_id) {
                    continue;
                }
                if let Some(vertex) = edge.vertices.iter().find(|v| diff.remove_vertex.contains(*v)) {
                    return Err(DiffError::VertexStillReferenced {
                        vertex: *vertex,
                        element: *edge_id,
                    });
                }
            }
        }

        // Additions
        let mut claimed: BTreeSet<ElementId> = diff.add_vertex.keys().copied().collect();
        let mut check_added = |kind: ElementKind, id: ElementId, vertices: &[ElementId]| {
            let still_used = (self.has_vertex(&id) && !diff.remove_vertex.contains(&id))
                || (self.edge(&id).is_some() && !diff.remove_edge.contains(&id))
                || (self.triangle(&id).is_some() && !diff.remove_triangle.contains(&id))
                || (self.quad(&id).is_some() && !diff.remove_quad.contains(&id));
            if still_used || !claimed.insert(id) {
                return Err(DiffError::ElementAlreadyExists { kind, id });
            }
            for (i, vertex) in vertices.iter().enumerate() {
                let live = (self.has_vertex(vertex) || diff.add_vertex.contains_key(vertex))
                    && !diff.remove_vertex.contains(vertex);
                if !live {
                    return Err(not_found(ElementKind::Vertex, *vertex));
                }
                if vertices[..i].contains(vertex) {
                    return Err(DiffError::DegenerateFace { kind, id });
                }
            }
            Ok(())
        };
        for (id, vertices) in &diff.add_edge {
            check_added(ElementKind::Edge, *id, &vertices[..])?;
        }
        for (id, vertices) in &diff.add_triangle {
            check_added(ElementKind::Triangle, *id, &vertices[..])?;
        }
        for (id, vertices) in &diff.add_quad {
            check_added(ElementKind::Quad, *id, &vertices[..])?;
        }

        Ok(())
    }

    /// Runs the apply pipeline. When `reverse` is given, every mutation also
    /// records the datum needed to undo it.
    fn apply_steps(
        &mut self,
        diff: &MeshDiff,
        mut reverse: Option<&mut MeshDiff>,
    ) -> Result<(), DiffError> {
        self.check_diff(diff)?;
        let started = Instant::now();

        // add vertices
        let expected = self.vertex_count() + diff.add_vertex.len();
        for (id, position) in &diff.add_vertex {
            self.push_vertex(*id, *position);
            if let Some(reverse) = reverse.as_deref_mut() {
                reverse.remove_vertex.insert(*id);
            }
        }
        check_count("add vertices", expected, self.vertex_count())?;
        trace!("mesh {}: add vertices done in {:?}", self.id(), started.elapsed());

        // update vertices
        for (id, position) in &diff.update_vertex {
            let previous = self
                .move_vertex(*id, *position)
                .ok_or_else(|| not_found(ElementKind::Vertex, *id))?;
            if diff.add_vertex.contains_key(id) {
                continue;
            }
            if let Some(reverse) = reverse.as_deref_mut() {
                reverse.update_vertex.insert(*id, previous);
            }
        }
        check_count("update vertices", expected, self.vertex_count())?;
        trace!("mesh {}: update vertices done in {:?}", self.id(), started.elapsed());

        // remove edges, triangles, quads
        let expected = self.edge_count() - diff.remove_edge.len();
        for id in &diff.remove_edge {
            let vertices = self
                .take_edge(id)
                .ok_or_else(|| not_found(ElementKind::Edge, *id))?;
            if let Some(reverse) = reverse.as_deref_mut() {
                reverse.add_edge.insert(*id, vertices);
            }
        }
        check_count("remove edges", expected, self.edge_count())?;

        let expected = self.triangle_count() - diff.remove_triangle.len();
        for id in &diff.remove_triangle {
            let vertices = self
                .take_triangle(id)
                .ok_or_else(|| not_found(ElementKind::Triangle, *id))?;
            if let Some(reverse) = reverse.as_deref_mut() {
                reverse.add_triangle.insert(*id, vertices);
            }
        }
        check_count("remove triangles", expected, self.triangle_count())?;

        let expected = self.quad_count() - diff.remove_quad.len();
        for id in &diff.remove_quad {
            let vertices = self
                .take_quad(id)
                .ok_or_else(|| not_found(ElementKind::Quad, *id))?;
            if let Some(reverse) = reverse.as_deref_mut() {
                reverse.add_quad.insert(*id, vertices);
            }
        }
        check_count("remove quads", expected, self.quad_count())?;
        trace!("mesh {}: removals done in {:?}", self.id(), started.elapsed());

        // delete vertices
        let expected = self.vertex_count() - diff.remove_vertex.len();
        for id in &diff.remove_vertex {
            let position = self
                .take_vertex(id)
                .ok_or_else(|| not_found(ElementKind::Vertex, *id))?;
            if let Some(reverse) = reverse.as_deref_mut() {
                reverse.add_vertex.insert(*id, position);
            }
        }
        check_count("delete vertices", expected, self.vertex_count())?;

        // add edges, triangles, quads
        let expected = self.edge_count() + diff.add_edge.len();
        for (id, vertices) in &diff.add_edge {
            self.push_edge(*id, *vertices);
            if let Some(reverse) = reverse.as_deref_mut() {
                reverse.remove_edge.insert(*id);
            }
        }
        check_count("add edges", expected, self.edge_count())?;

        let expected = self.triangle_count() + diff.add_triangle.len();
        for (id, vertices) in &diff.add_triangle {
            self.push_triangle(*id, *vertices);
            if let Some(reverse) = reverse.as_deref_mut() {
                reverse.remove_triangle.insert(*id);
            }
        }
        check_count("add triangles", expected, self.triangle_count())?;

        let expected = self.quad_count() + diff.add_quad.len();
        for (id, vertices) in &diff.add_quad {
            self.push_quad(*id, *vertices);
            if let Some(reverse) = reverse.as_deref_mut() {
                reverse.remove_quad.insert(*id);
            }
        }
        check_count("add quads", expected, self.quad_count())?;
        trace!("mesh {}: additions done in {:?}", self.id(), started.elapsed());

        // version, frame, material
        if let Some(reverse) = reverse.as_deref_mut() {
            reverse.id = self.id();
            reverse.version = self.version();
        }
        self.set_version(diff.version);
        if let Some(frame) = diff.frame {
            if *self.frame() != frame {
                if let Some(reverse) = reverse.as_deref_mut() {
                    reverse.frame = Some(*self.frame());
                }
                self.set_frame(frame);
            }
        }
        if let Some(material) = diff.material {
            if self.material() != material {
                if let Some(reverse) = reverse.as_deref_mut() {
                    reverse.material = Some(self.material());
                }
                self.set_material(material);
            }
        }

        // re-pack
        self.compact();
        check_count("compact positions", self.vertex_count(), self.positions().len())?;
        check_count("compact triangles", self.triangle_count(), self.triangle_index().len())?;
        check_count("compact quads", self.quad_count(), self.quad_index().len())?;
        check_count("compact edges", self.edge_count(), self.edge_index().len())?;
        trace!("mesh {}: apply done in {:?}", self.id(), started.elapsed());

        Ok(())
    }
}

impl Diffable for Mesh {
    type Diff = MeshDiff;

    fn compute_diff(&self, new: &Self) -> MeshDiff {
        MeshDiff::compute(self, new)
    }

    fn apply_diff(&mut self, diff: &MeshDiff) -> Result<(), DiffError> {
        self.apply_steps(diff, None)
    }

    fn apply_diff_reverse(&mut self, diff: &MeshDiff) -> Result<MeshDiff, DiffError> {
        let mut reverse = MeshDiff::new(self.id(), self.version());
        self.apply_steps(diff, Some(&mut reverse))?;
        Ok(reverse)
    }
}

fn not_found(kind: ElementKind, id: ElementId) -> DiffError {
    DiffError::ElementNotFound { kind, id }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::{DiffOptions, MeshDiff};
    use crate::{diff::Diffable, frame::Frame, mesh::Mesh};

    fn single_triangle() -> Mesh {
        let mut mesh = Mesh::new(1);
        mesh.add_vertex(1, Vec3::new(0.0, 0.0, 0.0)).unwrap();
        mesh.add_vertex(2, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        mesh.add_vertex(3, Vec3::new(0.0, 1.0, 0.0)).unwrap();
        mesh.add_triangle(1000, [1, 2, 3]).unwrap();
        mesh
    }

    #[test]
    fn compute_finds_added_removed_and_moved_vertices() {
        let old = single_triangle();
        let mut new = Mesh::new(1);
        new.add_vertex(1, Vec3::new(0.0, 0.0, 1.0)).unwrap();
        new.add_vertex(2, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        new.add_vertex(4, Vec3::new(5.0, 5.0, 5.0)).unwrap();

        let diff = MeshDiff::compute(&old, &new);

        assert!(diff.remove_vertex.contains(&3));
        assert_eq!(diff.add_vertex.get(&4), Some(&Vec3::new(5.0, 5.0, 5.0)));
        assert_eq!(diff.update_vertex.len(), 1);
        assert!(diff.remove_triangle.contains(&1000));
        assert!(diff.add_triangle.is_empty());
    }

    #[test]
    fn ordered_walk_matches_lookup_walk() {
        let old = single_triangle();
        let mut new = single_triangle();
        new.add_vertex(9, Vec3::ONE).unwrap();
        new.add_edge(10, [1, 9]).unwrap();
        new.set_frame(Frame::from_origin(Vec3::ONE));

        let lookup = MeshDiff::compute(&old, &new);
        let ordered = MeshDiff::compute_with(
            &old,
            &new,
            DiffOptions {
                assume_ordered: true,
                ..Default::default()
            },
        );
        assert_eq!(lookup, ordered);
    }

    #[test]
    fn geometric_only_skips_frame() {
        let old = single_triangle();
        let mut new = single_triangle();
        new.set_frame(Frame::from_origin(Vec3::ONE));
        new.set_material(Some(44));

        let diff = MeshDiff::compute_with(
            &old,
            &new,
            DiffOptions {
                geometric_only: true,
                ..Default::default()
            },
        );
        assert!(diff.is_empty());
        assert!(!MeshDiff::compute(&old, &new).is_empty());
    }

    #[test]
    fn moving_a_vertex_updates_neighbour_normals_by_delta() {
        let mut mesh = single_triangle();
        let old_face = mesh.triangle(&1000).unwrap().normal;
        let old_normal_2 = mesh.vertex_normal(&2).unwrap();

        let mut diff = MeshDiff::new(1, 1);
        diff.update_vertex.insert(1, Vec3::new(0.0, 0.0, 1.0));
        mesh.apply_diff(&diff).unwrap();

        let new_face = mesh.triangle(&1000).unwrap().normal;
        assert_ne!(old_face, new_face);
        assert_eq!(mesh.vertex_position(&1), Some(Vec3::new(0.0, 0.0, 1.0)));
        assert_eq!(mesh.vertex_normal(&1), Some(new_face));
        let expected_2 = old_normal_2 + (new_face - old_face);
        assert!((mesh.vertex_normal(&2).unwrap() - expected_2).length() < 1e-6);
        assert_eq!(mesh.version(), 1);
    }

    #[test]
    fn rejected_diff_leaves_mesh_untouched() {
        let mut mesh = single_triangle();
        let before = mesh.clone();

        let mut diff = MeshDiff::new(1, 1);
        diff.add_vertex.insert(50, Vec3::ONE);
        diff.remove_vertex.insert(2);

        assert!(mesh.apply_diff(&diff).is_err());
        assert_eq!(mesh, before);
    }

    #[test]
    fn reverse_restores_removed_faces_and_vertices() {
        let mut mesh = single_triangle();
        let before = mesh.clone();

        let mut diff = MeshDiff::new(1, 2);
        diff.remove_triangle.insert(1000);
        diff.remove_vertex.insert(3);
        diff.add_vertex.insert(4, Vec3::new(1.0, 1.0, 0.0));
        diff.add_triangle.insert(1001, [1, 2, 4]);

        let reverse = mesh.apply_diff_reverse(&diff).unwrap();
        assert_eq!(reverse.add_triangle.get(&1000), Some(&[1, 2, 3]));
        assert!(reverse.remove_vertex.contains(&4));
        assert_eq!(reverse.version, 0);

        mesh.apply_diff(&reverse).unwrap();
        assert!(mesh.structurally_eq(&before));
        mesh.validate().unwrap();
    }

    #[test]
    fn body_round_trips_through_json() {
        let mut diff = MeshDiff::new(3, 4);
        diff.material = Some(None);
        diff.add_triangle.insert(5, [1, 2, 3]);
        let text = serde_json::to_string(&diff).unwrap();
        let back: MeshDiff = serde_json::from_str(&text).unwrap();
        assert_eq!(back, diff);
    }
}
