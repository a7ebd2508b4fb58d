use thiserror::Error;

use crate::{scene::SceneError, types::VersionLabel};

/// Errors that can occur while recording or replaying version history
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HistoryError {
    /// The requested label was never recorded, nothing was replayed
    #[error("Version {label} is not in the history")]
    VersionNotFound { label: VersionLabel },

    /// The label is the base version or is already recorded
    #[error("Version {label} is already recorded")]
    DuplicateLabel { label: VersionLabel },

    /// Applying a recorded or new diff to the scene failed
    #[error(transparent)]
    Scene(#[from] SceneError),
}
