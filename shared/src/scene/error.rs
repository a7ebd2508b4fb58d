use thiserror::Error;

use crate::{diff::DiffError, scene::EntityKind, types::EntityId};

/// Errors that can occur while resolving or mutating scene entities
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    /// No entity with this id is registered in the scene
    #[error("Entity {id} could not be resolved")]
    ReferenceUnresolved { id: EntityId },

    /// The id resolves, but to an entity of another kind
    #[error("Entity {id} is a {actual}, expected a {expected}")]
    WrongEntityKind {
        id: EntityId,
        expected: EntityKind,
        actual: EntityKind,
    },

    /// An entity with this id is already registered
    #[error("Entity id {id} is already in use")]
    DuplicateEntity { id: EntityId },

    /// The scene description could not be read
    #[error("Malformed scene description: {reason}")]
    Parse { reason: String },

    #[error(transparent)]
    Diff(#[from] DiffError),
}
