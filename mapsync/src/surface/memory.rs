use std::collections::VecDeque;

use ahash::{HashMap, HashMapExt};
use log::{debug, info};
use mapsync_types::{
    Camera, DescriptorError, FilterExpression, LayerDescriptor, LngLat, SourceDescriptor,
    SourceKind, Terrain, Visibility,
};

use super::{LayerStack, MapSurface, SurfaceOp};
use crate::config::{PreReadyCamera, SurfaceConfig};
use crate::error::SyncError;
use crate::messenger::Messenger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SurfaceState {
    Loading,
    Ready,
    TornDown,
}

/// Headless map surface that keeps its state in memory.
///
/// The surface follows the [`MapSurface`] contract exactly and records every applied operation in
/// a journal, which makes it useful for tests and for running the synchronization logic without a
/// rendering engine.
///
/// The surface starts in the loading state. [`MemorySurface::load`] fires the one-time ready
/// signal, after which structural operations are accepted.
///
/// ```
/// use mapsync::{MapSurface, MemorySurface, SurfaceConfig};
/// use mapsync_types::SourceDescriptor;
///
/// let mut surface = MemorySurface::new(SurfaceConfig::default());
/// assert!(surface.load());
///
/// let source = SourceDescriptor::geojson_url("s1", "https://example.com/data.geojson").unwrap();
/// surface.add_source(&source).unwrap();
///
/// assert!(surface.has_source("s1"));
/// assert_eq!(surface.journal()[0].to_string(), "addSource(s1)");
/// ```
pub struct MemorySurface {
    config: SurfaceConfig,
    state: SurfaceState,
    sources: HashMap<String, SourceDescriptor>,
    layers: LayerStack,
    terrain: Option<Terrain>,
    camera: Camera,
    pending_camera: VecDeque<SurfaceOp>,
    journal: Vec<SurfaceOp>,
    messenger: Option<Box<dyn Messenger>>,
}

impl MemorySurface {
    /// Creates a surface with the initial camera of the configuration.
    pub fn new(config: SurfaceConfig) -> Self {
        Self {
            camera: config.camera,
            config,
            state: SurfaceState::Loading,
            sources: HashMap::new(),
            layers: LayerStack::default(),
            terrain: None,
            pending_camera: VecDeque::new(),
            journal: vec![],
            messenger: None,
        }
    }

    /// Sets the messenger that is notified after every change of the surface.
    pub fn set_messenger(&mut self, messenger: Option<impl Messenger + 'static>) {
        self.messenger = messenger.map(|m| Box::new(m) as Box<dyn Messenger>);
    }

    /// Fires the ready signal and applies camera changes queued before it.
    ///
    /// Returns false if the surface was already loaded or torn down.
    pub fn load(&mut self) -> bool {
        if self.state != SurfaceState::Loading {
            return false;
        }

        self.state = SurfaceState::Ready;
        info!("Surface with style {} is ready", self.config.style);

        while let Some(op) = self.pending_camera.pop_front() {
            self.apply_camera(op);
        }

        self.redraw();
        true
    }

    /// Returns true after [`MapSurface::teardown`] was called.
    pub fn is_torn_down(&self) -> bool {
        self.state == SurfaceState::TornDown
    }

    /// Configuration the surface was created with.
    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    /// Operations applied to the surface so far, in order.
    pub fn journal(&self) -> &[SurfaceOp] {
        &self.journal
    }

    /// Returns the journal and starts a new one.
    pub fn take_journal(&mut self) -> Vec<SurfaceOp> {
        std::mem::take(&mut self.journal)
    }

    /// Registered source with the id.
    pub fn source(&self, id: &str) -> Option<&SourceDescriptor> {
        self.sources.get(id)
    }

    /// Layers of the surface.
    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    /// Current terrain.
    pub fn terrain(&self) -> Option<&Terrain> {
        self.terrain.as_ref()
    }

    fn ensure_ready(&self) -> Result<bool, SyncError> {
        match self.state {
            SurfaceState::Loading => Err(SyncError::NotReady),
            SurfaceState::Ready => Ok(true),
            SurfaceState::TornDown => Ok(false),
        }
    }

    fn record(&mut self, op: SurfaceOp) {
        debug!("Applied {op}");
        self.journal.push(op);
        self.redraw();
    }

    fn redraw(&self) {
        if let Some(messenger) = &self.messenger {
            messenger.request_redraw();
        }
    }

    fn request_camera(&mut self, op: SurfaceOp) {
        match self.state {
            SurfaceState::Ready => self.apply_camera(op),
            SurfaceState::Loading => match self.config.pre_ready_camera {
                PreReadyCamera::Queue => {
                    debug!("Queued {op} until the surface is ready");
                    self.pending_camera.push_back(op);
                }
                PreReadyCamera::Drop => debug!("Dropped {op}, the surface is not ready"),
            },
            SurfaceState::TornDown => {}
        }
    }

    fn apply_camera(&mut self, op: SurfaceOp) {
        if op.is_structural() {
            return;
        }

        let mut camera = self.camera;
        match op {
            SurfaceOp::SetCenter(center) => camera.center = center,
            SurfaceOp::SetZoom(zoom) => camera.zoom = zoom,
            SurfaceOp::SetPitch(pitch) => camera.pitch = pitch,
            SurfaceOp::SetBearing(bearing) => camera.bearing = bearing,
            _ => {}
        }

        self.camera = camera.validated();
        self.record(op);
    }
}

impl MapSurface for MemorySurface {
    fn is_ready(&self) -> bool {
        self.state == SurfaceState::Ready
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layers.contains(id)
    }

    fn add_source(&mut self, source: &SourceDescriptor) -> Result<(), SyncError> {
        if !self.ensure_ready()? {
            return Ok(());
        }

        if self.sources.contains_key(source.id()) {
            return Err(SyncError::DuplicateSource(source.id().to_owned()));
        }

        source.validate()?;
        self.sources.insert(source.id().to_owned(), source.clone());
        self.record(SurfaceOp::AddSource(source.clone()));

        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<(), SyncError> {
        if !self.ensure_ready()? || !self.sources.contains_key(id) {
            return Ok(());
        }

        if let Some(layer) = self.layers.first_referencing(id) {
            return Err(SyncError::DanglingReference {
                source_id: id.to_owned(),
                referenced_by: layer.id().to_owned(),
            });
        }

        if self.terrain.as_ref().is_some_and(|t| t.source == id) {
            return Err(SyncError::DanglingReference {
                source_id: id.to_owned(),
                referenced_by: "terrain".to_owned(),
            });
        }

        self.sources.remove(id);
        self.record(SurfaceOp::RemoveSource(id.to_owned()));

        Ok(())
    }

    fn add_layer(
        &mut self,
        layer: &LayerDescriptor,
        before: Option<&str>,
    ) -> Result<(), SyncError> {
        if !self.ensure_ready()? {
            return Ok(());
        }

        if self.layers.contains(layer.id()) {
            return Err(SyncError::DuplicateLayer(layer.id().to_owned()));
        }

        if let Some(source_id) = layer.source() {
            let source = self
                .sources
                .get(source_id)
                .ok_or_else(|| SyncError::UnknownSource(source_id.to_owned()))?;

            if layer.source_layer().is_some() && !matches!(source.kind(), SourceKind::Vector(_)) {
                return Err(DescriptorError::UnexpectedSourceLayer {
                    id: layer.id().to_owned(),
                    source_id: source_id.to_owned(),
                }
                .into());
            }
        }

        match before {
            Some(before) => {
                let index = self
                    .layers
                    .position(before)
                    .ok_or_else(|| SyncError::UnknownLayer(before.to_owned()))?;
                self.layers.insert(index, layer.clone());
            }
            None => self.layers.push(layer.clone()),
        }

        self.record(SurfaceOp::AddLayer {
            layer: layer.clone(),
            before: before.map(str::to_owned),
        });

        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), SyncError> {
        if !self.ensure_ready()? {
            return Ok(());
        }

        if self.layers.remove(id).is_some() {
            self.record(SurfaceOp::RemoveLayer(id.to_owned()));
        }

        Ok(())
    }

    fn set_filter(
        &mut self,
        layer_id: &str,
        filter: Option<&FilterExpression>,
    ) -> Result<(), SyncError> {
        if !self.ensure_ready()? {
            return Ok(());
        }

        if !self.layers.set_filter(layer_id, filter.cloned()) {
            return Err(SyncError::UnknownLayer(layer_id.to_owned()));
        }

        self.record(SurfaceOp::SetFilter {
            layer: layer_id.to_owned(),
            filter: filter.cloned(),
        });

        Ok(())
    }

    fn set_visibility(&mut self, layer_id: &str, visibility: Visibility) -> Result<(), SyncError> {
        if !self.ensure_ready()? {
            return Ok(());
        }

        if !self.layers.set_visibility(layer_id, visibility) {
            return Err(SyncError::UnknownLayer(layer_id.to_owned()));
        }

        self.record(SurfaceOp::SetVisibility {
            layer: layer_id.to_owned(),
            visibility,
        });

        Ok(())
    }

    fn set_terrain(&mut self, terrain: Option<&Terrain>) -> Result<(), SyncError> {
        if !self.ensure_ready()? {
            return Ok(());
        }

        if let Some(terrain) = terrain {
            let source = self
                .sources
                .get(&terrain.source)
                .ok_or_else(|| SyncError::UnknownSource(terrain.source.clone()))?;

            if !source.kind().is_elevation() {
                return Err(DescriptorError::NotElevation {
                    id: terrain.source.clone(),
                }
                .into());
            }
        }

        self.terrain = terrain.cloned();
        self.record(SurfaceOp::SetTerrain(terrain.cloned()));

        Ok(())
    }

    fn camera(&self) -> Camera {
        self.camera
    }

    fn set_center(&mut self, center: LngLat) {
        self.request_camera(SurfaceOp::SetCenter(center));
    }

    fn set_zoom(&mut self, zoom: f64) {
        self.request_camera(SurfaceOp::SetZoom(zoom));
    }

    fn set_pitch(&mut self, pitch: f64) {
        self.request_camera(SurfaceOp::SetPitch(pitch));
    }

    fn set_bearing(&mut self, bearing: f64) {
        self.request_camera(SurfaceOp::SetBearing(bearing));
    }

    fn teardown(&mut self) {
        if self.state == SurfaceState::TornDown {
            return;
        }

        self.state = SurfaceState::TornDown;
        self.layers.clear();
        self.sources.clear();
        self.terrain = None;
        self.pending_camera.clear();
        info!("Surface with style {} is torn down", self.config.style);
    }
}
