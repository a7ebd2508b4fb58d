use thiserror::Error;

use crate::types::{ElementId, ElementKind, EntityId};

/// Errors that can occur while applying a diff to an entity
///
/// A diff is validated against the target before anything is mutated, so
/// every variant except `ConsistencyMismatch` leaves the entity untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    /// Diff addressed to a different entity
    #[error("Diff targets entity {actual} but was applied to entity {expected}")]
    EntityIdMismatch { expected: EntityId, actual: EntityId },

    /// Diff removes, updates or references an element the entity does not have
    #[error("No {kind} with id {id}")]
    ElementNotFound { kind: ElementKind, id: ElementId },

    /// Diff adds an element whose id is already in use
    #[error("A {kind} with id {id} already exists")]
    ElementAlreadyExists { kind: ElementKind, id: ElementId },

    /// Diff removes a vertex while a face or edge that survives the diff still uses it
    #[error("Vertex {vertex} is still referenced by element {element}")]
    VertexStillReferenced {
        vertex: ElementId,
        element: ElementId,
    },

    /// Diff adds a face or edge that lists the same vertex more than once
    #[error("{kind} {id} references the same vertex more than once")]
    DegenerateFace { kind: ElementKind, id: ElementId },

    /// An element's dense slot is out of range, shared with another element,
    /// or disagrees with the face index arrays
    #[error("{kind} {id} has no consistent dense slot")]
    SlotMismatch { kind: ElementKind, id: ElementId },

    /// An element count after an apply step does not match the diff
    #[error("Consistency check failed at {step}: expected {expected}, found {actual}")]
    ConsistencyMismatch {
        step: &'static str,
        expected: usize,
        actual: usize,
    },
}
