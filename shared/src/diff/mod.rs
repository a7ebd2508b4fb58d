mod camera_diff;
mod error;
mod light_diff;
mod material_diff;
mod mesh_diff;
mod scene_diff;

pub use camera_diff::CameraDiff;
pub use error::DiffError;
pub use light_diff::LightDiff;
pub use material_diff::MaterialDiff;
pub use mesh_diff::{DiffOptions, MeshDiff};
pub use scene_diff::SceneDiff;

/// An entity that can be diffed against a newer state of itself and patched in place.
pub trait Diffable {
    type Diff;

    /// Builds the diff that turns `self` into `new`.
    fn compute_diff(&self, new: &Self) -> Self::Diff;

    /// Applies `diff` destructively.
    fn apply_diff(&mut self, diff: &Self::Diff) -> Result<(), DiffError>;

    /// Applies `diff` destructively and returns the diff that undoes it.
    fn apply_diff_reverse(&mut self, diff: &Self::Diff) -> Result<Self::Diff, DiffError>;
}

pub(crate) fn changed<T: PartialEq + Copy>(old: &T, new: &T) -> Option<T> {
    if old != new {
        Some(*new)
    } else {
        None
    }
}

/// Overwrites `field` with `value` if present, recording the old value in `undo`
/// when it actually changes.
pub(crate) fn patch<T: PartialEq + Copy>(field: &mut T, value: Option<T>, undo: &mut Option<T>) {
    if let Some(value) = value {
        if *field != value {
            *undo = Some(*field);
        }
        *field = value;
    }
}

/// Serde adapter telling "absent" apart from "explicitly cleared".
pub(crate) mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}
