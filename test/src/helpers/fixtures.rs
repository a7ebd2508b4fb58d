use meshsync_shared::{Camera, ElementId, EntityId, Mesh, Scene, Vec3};

/// Id of the grid mesh in every fixture scene.
pub const GRID_MESH_ID: EntityId = 100;

const QUAD_IDS: ElementId = 10_000;
const TRIANGLE_IDS: ElementId = 20_000;
const EXTRA_VERTEX_ID: ElementId = 30_000;

pub fn vertex_id(size: usize, row: usize, col: usize) -> ElementId {
    1 + (row * size + col) as ElementId
}

pub fn quad_id(size: usize, row: usize, col: usize) -> ElementId {
    QUAD_IDS + (row * (size - 1) + col) as ElementId
}

fn quad_corners(size: usize, row: usize, col: usize) -> [ElementId; 4] {
    [
        vertex_id(size, row, col),
        vertex_id(size, row, col + 1),
        vertex_id(size, row + 1, col + 1),
        vertex_id(size, row + 1, col),
    ]
}

/// Changes applied to a flat grid to get an edited copy of it.
#[derive(Clone, Debug, Default)]
pub struct GridEdit {
    /// Vertex (by row-major position) and the offset added to it
    pub moves: Vec<(usize, Vec3)>,
    /// Quads (by row-major position) taken out of the grid
    pub removed_quads: Vec<usize>,
    /// Replace each removed quad with two triangles over the same corners
    pub triangulate: bool,
    /// An unconnected vertex added to the grid
    pub extra_vertex: Option<Vec3>,
    /// Vertices (by row-major position) taken out, along with every face on them
    pub removed_vertices: Vec<usize>,
}

/// `size` x `size` vertices on the z = 0 plane, one unit apart, joined by
/// counter-clockwise quads.
pub fn grid_mesh(size: usize) -> Mesh {
    edited_grid(size, &GridEdit::default())
}

pub fn edited_grid(size: usize, edit: &GridEdit) -> Mesh {
    let mut mesh = Mesh::new(GRID_MESH_ID);
    let vertex_count = size * size;
    let removed_vertices: Vec<ElementId> = edit
        .removed_vertices
        .iter()
        .map(|removed| {
            let index = removed % vertex_count;
            vertex_id(size, index / size, index % size)
        })
        .collect();

    for index in 0..vertex_count {
        let (row, col) = (index / size, index % size);
        if removed_vertices.contains(&vertex_id(size, row, col)) {
            continue;
        }
        let offset: Vec3 = edit
            .moves
            .iter()
            .filter(|(moved, _)| moved % vertex_count == index)
            .map(|(_, offset)| *offset)
            .sum();
        let position = Vec3::new(col as f32, row as f32, 0.0) + offset;
        mesh.add_vertex(vertex_id(size, row, col), position)
            .expect("fresh vertex id");
    }
    if let Some(position) = edit.extra_vertex {
        mesh.add_vertex(EXTRA_VERTEX_ID, position)
            .expect("fresh vertex id");
    }

    let quad_count = (size - 1) * (size - 1);
    for index in 0..quad_count {
        let (row, col) = (index / (size - 1), index % (size - 1));
        let corners = quad_corners(size, row, col);
        if corners.iter().any(|corner| removed_vertices.contains(corner)) {
            continue;
        }
        let removed = edit
            .removed_quads
            .iter()
            .any(|removed| removed % quad_count == index);
        if !removed {
            mesh.add_quad(quad_id(size, row, col), corners)
                .expect("fresh quad id");
        } else if edit.triangulate {
            let [a, b, c, d] = corners;
            let first = TRIANGLE_IDS + 2 * index as ElementId;
            mesh.add_triangle(first, [a, b, c]).expect("fresh triangle id");
            mesh.add_triangle(first + 1, [a, c, d])
                .expect("fresh triangle id");
        }
    }
    mesh
}

/// A scene holding only the grid mesh.
pub fn grid_scene(size: usize) -> Scene {
    let mut scene = Scene::new(Camera::new(1));
    scene.insert_mesh(grid_mesh(size)).expect("empty scene");
    scene
}

/// The loader description of [`grid_scene`], for clients.
pub fn grid_scene_json(size: usize) -> String {
    let mut vertices = Vec::new();
    for row in 0..size {
        for col in 0..size {
            vertices.push(format!(
                r#"{{ "_id_": {}, "pos": [{}, {}, 0] }}"#,
                vertex_id(size, row, col),
                col,
                row
            ));
        }
    }
    let mut quads = Vec::new();
    for row in 0..size - 1 {
        for col in 0..size - 1 {
            let [a, b, c, d] = quad_corners(size, row, col);
            quads.push(format!(
                r#"{{ "_id_": {}, "ver_ids": [{}, {}, {}, {}] }}"#,
                quad_id(size, row, col),
                a,
                b,
                c,
                d
            ));
        }
    }
    format!(
        r#"{{ "camera": {{ "_id_": 1 }}, "meshes": [ {{ "_id_": {}, "vertices": [{}], "quads": [{}] }} ] }}"#,
        GRID_MESH_ID,
        vertices.join(", "),
        quads.join(", ")
    )
}
