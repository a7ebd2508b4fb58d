use log::{debug, info, warn};

use meshsync_shared::{
    AssetPair, DiffOptions, IdGenerator, Material, Mesh, MeshDiff, MeshTransfer, Payload, Scene,
    SceneDiff, SceneError, SceneLoader, VersionHistory, VersionLabel, BASE_VERSION,
};

use crate::{
    transport::{FrameReceiver, FrameSender, Socket},
    ClientConfig, ClientError,
};

/// One editor's view of the shared scene.
///
/// Local edits are applied to the local scene first, recorded under a fresh
/// version label and then sent to the relay. Frames from peers are decoded,
/// applied and recorded the same way by [`Client::pending_incoming`].
pub struct Client {
    config: ClientConfig,
    scene: Scene,
    history: VersionHistory,
    ids: IdGenerator,
    io: Option<(Box<dyn FrameSender>, Box<dyn FrameReceiver>)>,
    assets: Vec<AssetPair>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            scene: Scene::default(),
            history: VersionHistory::new(),
            ids: IdGenerator::new(),
            io: None,
            assets: Vec::new(),
        }
    }

    // Connection

    pub fn connect<S: Into<Box<dyn Socket>>>(&mut self, socket: S) {
        let boxed_socket: Box<dyn Socket> = socket.into();
        self.io = Some(boxed_socket.connect());
    }

    /// Connects over TCP to `server_addr` from the config.
    #[cfg(feature = "transport_tcp")]
    pub fn connect_to_server(&mut self) {
        let socket = crate::transport::tcp::Socket::new(self.config.server_addr);
        info!("Connecting to {}", self.config.server_addr);
        self.connect(socket);
    }

    pub fn is_connected(&self) -> bool {
        self.io.is_some()
    }

    pub fn disconnect(&mut self) {
        if self.io.take().is_some() {
            info!("Disconnected");
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // Scene

    /// Replaces the local scene with one read from a JSON description and
    /// starts a fresh history at the base version.
    pub fn load_initial_scene(&mut self, source: &str) -> Result<&Scene, ClientError> {
        let scene = SceneLoader::from_json(source)?;
        for mesh in scene.meshes() {
            self.ids.observe(mesh.id());
            let elements = mesh
                .vertex_ids()
                .chain(mesh.edges().map(|(id, _)| id))
                .chain(mesh.triangles().map(|(id, _)| id))
                .chain(mesh.quads().map(|(id, _)| id));
            for id in elements {
                self.ids.observe(*id);
            }
        }
        for light in scene.lights() {
            self.ids.observe(light.id);
        }
        for material in scene.materials() {
            self.ids.observe(material.id);
        }
        self.scene = scene;
        self.history = VersionHistory::new();
        Ok(&self.scene)
    }

    pub fn current_scene(&self) -> &Scene {
        &self.scene
    }

    pub fn history(&self) -> &VersionHistory {
        &self.history
    }

    pub fn current_version_label(&self) -> VersionLabel {
        self.history.current_version_label()
    }

    /// Recorded versions in application order, base version first.
    pub fn versions(&self) -> Vec<VersionLabel> {
        self.history.labels()
    }

    /// Fresh id for a new element or entity, never equal to one seen before.
    pub fn generate_id(&mut self) -> u64 {
        self.ids.generate()
    }

    // Local edits

    /// Diffs `new_mesh` against the local mesh with the same id, applies the
    /// diff under a new version label and sends it. Returns the label, or
    /// `None` if nothing changed.
    pub fn submit_local_mesh_edit(
        &mut self,
        mut new_mesh: Mesh,
    ) -> Result<Option<VersionLabel>, ClientError> {
        let old = self
            .scene
            .mesh(new_mesh.id())
            .ok_or(SceneError::ReferenceUnresolved { id: new_mesh.id() })?;
        if new_mesh.version() <= old.version() {
            new_mesh.set_version(old.version() + 1);
        }
        let options = DiffOptions {
            assume_ordered: self.config.assume_ordered,
            ..DiffOptions::default()
        };
        let diff = MeshDiff::compute_with(old, &new_mesh, options);
        if diff.is_empty() {
            debug!("Mesh {} is unchanged", new_mesh.id());
            return Ok(None);
        }
        let label = self.submit_local_scene_diff(SceneDiff::default().with_mesh(diff))?;
        Ok(Some(label))
    }

    /// Applies `diff` under a new version label and sends it.
    pub fn submit_local_scene_diff(&mut self, mut diff: SceneDiff) -> Result<VersionLabel, ClientError> {
        let label = self.ids.generate();
        diff.label = label;
        self.apply_scene_diff(diff.clone(), label)?;
        self.send(&Payload::SceneDiff(diff))?;
        Ok(label)
    }

    /// Installs a whole mesh (and optionally its material) and sends it.
    /// Recorded as a snapshot; whole-mesh swaps are not replayed by restores.
    pub fn submit_mesh(
        &mut self,
        mesh: Mesh,
        material: Option<Material>,
    ) -> Result<VersionLabel, ClientError> {
        let label = self.ids.generate();
        self.install_mesh(label, mesh.clone(), material.clone())?;
        self.send(&Payload::Mesh(MeshTransfer { mesh, material }))?;
        Ok(label)
    }

    pub fn send_operation(&mut self, operation: &str) -> Result<(), ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        self.send(&Payload::Operation(operation.to_string()))
    }

    pub fn send_asset(&mut self, asset: AssetPair) -> Result<(), ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        self.send(&Payload::Asset(asset))
    }

    /// Asset transfers received from peers, oldest first.
    pub fn take_assets(&mut self) -> Vec<AssetPair> {
        std::mem::take(&mut self.assets)
    }

    // History

    pub fn restore_to_version(&mut self, label: VersionLabel) -> Result<(), ClientError> {
        self.history.restore_to_version(&mut self.scene, label)?;
        Ok(())
    }

    // Incoming

    /// Decodes and applies every frame the transport has delivered, returning
    /// the payloads that were applied.
    ///
    /// A payload the local scene rejects is logged and skipped. A frame that
    /// does not decode closes the connection and is returned as an error.
    pub fn pending_incoming(&mut self) -> Result<std::vec::IntoIter<Payload>, ClientError> {
        let mut applied = Vec::new();
        loop {
            let Some((_, receiver)) = self.io.as_mut() else {
                return Err(ClientError::NotConnected);
            };
            let bytes = match receiver.receive() {
                Ok(Some(bytes)) => bytes,
                Ok(None) => break,
                Err(_) => {
                    self.io = None;
                    warn!("Connection to server closed");
                    return Err(ClientError::Transport {
                        reason: "connection closed".to_string(),
                    });
                }
            };
            let payload = match Payload::decode(&bytes) {
                Ok(payload) => payload,
                Err(err) => {
                    warn!("Closing connection, undecodable frame: {}", err);
                    self.io = None;
                    return Err(err.into());
                }
            };
            match self.apply_incoming(payload.clone()) {
                Ok(()) => applied.push(payload),
                Err(err) => warn!("Skipping incoming {}: {}", payload.kind(), err),
            }
        }
        Ok(applied.into_iter())
    }

    /// Applies one payload received from a peer.
    pub fn apply_incoming(&mut self, payload: Payload) -> Result<(), ClientError> {
        match payload {
            Payload::Operation(operation) => {
                info!("Peer operation: {}", operation);
            }
            Payload::Asset(asset) => {
                debug!("Received asset {}", asset.name);
                self.assets.push(asset);
            }
            Payload::Mesh(MeshTransfer { mesh, material }) => {
                let label = self.ids.generate();
                self.install_mesh(label, mesh, material)?;
            }
            Payload::SceneDiff(diff) => {
                let label = self.incoming_label(diff.label);
                self.apply_scene_diff(diff, label)?;
            }
            Payload::MeshDiff(diff) => {
                let label = self.ids.generate();
                self.apply_scene_diff(SceneDiff::default().with_mesh(diff), label)?;
            }
            Payload::CameraDiff(diff) => {
                let label = self.ids.generate();
                self.apply_scene_diff(SceneDiff::default().with_camera(diff), label)?;
            }
            Payload::LightDiff(diff) => {
                let label = self.ids.generate();
                self.apply_scene_diff(SceneDiff::default().with_light(diff), label)?;
            }
            Payload::MaterialDiff(diff) => {
                let label = self.ids.generate();
                self.apply_scene_diff(SceneDiff::default().with_material(diff), label)?;
            }
        }
        Ok(())
    }

    // Internal

    // A peer's label is kept unless it collides with one already recorded here
    fn incoming_label(&mut self, label: VersionLabel) -> VersionLabel {
        if label == BASE_VERSION || self.history.contains(label) {
            let fresh = self.ids.generate();
            debug!("Relabelling incoming version {} as {}", label, fresh);
            fresh
        } else {
            self.ids.observe(label);
            label
        }
    }

    fn apply_scene_diff(&mut self, diff: SceneDiff, label: VersionLabel) -> Result<(), ClientError> {
        if self.config.record_history {
            self.history.apply_change(&mut self.scene, diff, label)?;
        } else {
            self.scene.apply_diff(&diff)?;
        }
        Ok(())
    }

    fn install_mesh(
        &mut self,
        label: VersionLabel,
        mesh: Mesh,
        material: Option<Material>,
    ) -> Result<(), ClientError> {
        let snapshot = self.config.record_history.then(|| mesh.clone());
        self.scene.swap_mesh(mesh, material)?;
        if let Some(snapshot) = snapshot {
            self.history.record_mesh_snapshot(label, snapshot);
        }
        Ok(())
    }

    // Sending is best effort when offline: the local scene already has the edit
    fn send(&mut self, payload: &Payload) -> Result<(), ClientError> {
        let Some((sender, _)) = self.io.as_ref() else {
            debug!("Not connected, {} kept local", payload.kind());
            return Ok(());
        };
        let frame = payload.encode()?;
        if sender.send(&frame).is_err() {
            self.io = None;
            return Err(ClientError::Transport {
                reason: "send failed".to_string(),
            });
        }
        Ok(())
    }
}
