use std::collections::BTreeMap;

use log::{debug, info};

use crate::{
    diff::SceneDiff,
    history::HistoryError,
    mesh::Mesh,
    scene::Scene,
    types::{EntityId, VersionLabel, BASE_VERSION},
};

/// Labeled scene diffs that have been applied, with their inverses, and a
/// pointer to the version the scene currently reflects.
///
/// Position `p` in the history is the state after the first `p` forward diffs
/// have been applied; position 0 is [`BASE_VERSION`]. Recording a new change
/// while positioned behind the newest entry discards the entries past the
/// current position, so the history always describes one linear timeline.
#[derive(Clone, Debug, Default)]
pub struct VersionHistory {
    forward: Vec<SceneDiff>,
    reverse: Vec<SceneDiff>,
    position: usize,
    snapshots: BTreeMap<(EntityId, VersionLabel), Mesh>,
}

impl VersionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_version_label(&self) -> VersionLabel {
        self.label_at(self.position)
    }

    /// Recorded labels in application order, base version first.
    pub fn labels(&self) -> Vec<VersionLabel> {
        std::iter::once(BASE_VERSION)
            .chain(self.forward.iter().map(|diff| diff.label))
            .collect()
    }

    pub fn contains(&self, label: VersionLabel) -> bool {
        self.position_of(label).is_some()
    }

    pub fn forward(&self) -> &[SceneDiff] {
        &self.forward
    }

    pub fn reverse(&self) -> &[SceneDiff] {
        &self.reverse
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Applies `diff` to `scene` under `label` and records it.
    pub fn apply_change(
        &mut self,
        scene: &mut Scene,
        diff: SceneDiff,
        label: VersionLabel,
    ) -> Result<(), HistoryError> {
        self.apply_change_reverse(scene, diff, label).map(drop)
    }

    /// Applies `diff` to `scene` under `label`, records it with its inverse,
    /// and returns the inverse.
    ///
    /// A diff the scene rejects is not recorded and leaves the scene unchanged.
    pub fn apply_change_reverse(
        &mut self,
        scene: &mut Scene,
        mut diff: SceneDiff,
        label: VersionLabel,
    ) -> Result<SceneDiff, HistoryError> {
        if label == BASE_VERSION || self.position_of(label).is_some_and(|p| p <= self.position) {
            return Err(HistoryError::DuplicateLabel { label });
        }
        diff.label = label;
        let mut reverse = scene.apply_diff_reverse(&diff)?;
        reverse.label = label;

        if self.position < self.forward.len() {
            info!(
                "Discarding {} versions after {} to record {}",
                self.forward.len() - self.position,
                self.current_version_label(),
                label
            );
            let dropped: Vec<VersionLabel> = self.forward[self.position..]
                .iter()
                .map(|diff| diff.label)
                .collect();
            self.snapshots
                .retain(|(_, snapshot_label), _| !dropped.contains(snapshot_label));
            self.forward.truncate(self.position);
            self.reverse.truncate(self.position);
        }

        self.forward.push(diff);
        self.reverse.push(reverse.clone());
        self.position = self.forward.len();
        debug!("Recorded version {}", label);
        Ok(reverse)
    }

    /// Undoes or redoes recorded diffs until `scene` reflects `target`.
    ///
    /// An unknown label fails before anything is replayed. If a replayed diff
    /// fails, the history points at the last version actually reached.
    pub fn restore_to_version(
        &mut self,
        scene: &mut Scene,
        target: VersionLabel,
    ) -> Result<(), HistoryError> {
        let target_position = self
            .position_of(target)
            .ok_or(HistoryError::VersionNotFound { label: target })?;
        if target_position == self.position {
            return Ok(());
        }
        info!(
            "Restoring from version {} to {}",
            self.current_version_label(),
            target
        );

        while self.position > target_position {
            scene.apply_diff(&self.reverse[self.position - 1])?;
            self.position -= 1;
        }
        while self.position < target_position {
            scene.apply_diff(&self.forward[self.position])?;
            self.position += 1;
        }
        info!("Restored version {}", target);
        Ok(())
    }

    /// Keeps a full copy of a mesh as it was at `label`.
    pub fn record_mesh_snapshot(&mut self, label: VersionLabel, mesh: Mesh) {
        self.snapshots.insert((mesh.id(), label), mesh);
    }

    pub fn mesh_snapshot(&self, id: EntityId, label: VersionLabel) -> Option<&Mesh> {
        self.snapshots.get(&(id, label))
    }

    fn position_of(&self, label: VersionLabel) -> Option<usize> {
        if label == BASE_VERSION {
            return Some(0);
        }
        self.forward
            .iter()
            .position(|diff| diff.label == label)
            .map(|index| index + 1)
    }

    fn label_at(&self, position: usize) -> VersionLabel {
        match position {
            0 => BASE_VERSION,
            p => self.forward[p - 1].label,
        }
    }
}
