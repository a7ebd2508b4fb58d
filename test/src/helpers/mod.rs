pub mod assertions;
pub mod fixtures;

pub use fixtures::{
    edited_grid, grid_mesh, grid_scene, grid_scene_json, quad_id, vertex_id, GridEdit,
    GRID_MESH_ID,
};
