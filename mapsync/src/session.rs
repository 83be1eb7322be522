//! Drives reconciliation of one surface from a stream of desired-state snapshots.

use std::sync::Arc;

use log::{debug, info, warn};
use mapsync_types::Camera;

use crate::error::SyncError;
use crate::reconciler::{ReconcileReport, Reconciler};
use crate::store::DesiredState;
use crate::surface::MapSurface;

/// Owns a surface and keeps it in sync with the latest submitted [`DesiredState`].
///
/// Snapshots are submitted with [`SyncSession::submit`] and applied with [`SyncSession::flush`].
/// At most one snapshot waits to be applied; submitting a new one replaces it, so rapid changes
/// are coalesced and only the latest state reaches the surface. Until the surface is ready the
/// snapshot stays pending; call [`SyncSession::on_ready`] from the ready event to apply it.
///
/// ```
/// use mapsync::{DesiredState, MemorySurface, SurfaceConfig, SyncSession};
///
/// let mut session = SyncSession::new(MemorySurface::new(SurfaceConfig::default()));
/// let state = DesiredState::from_json(r#"{
///     "sources": [{"id": "s1", "type": "geojson", "data": "https://example.com/s1.geojson"}],
///     "layers": [{"id": "l1", "type": "fill", "source": "s1"}]
/// }"#).unwrap();
///
/// session.submit(state);
/// assert!(session.flush().unwrap().is_none());
///
/// session.surface_mut().load();
/// let report = session.on_ready().unwrap().unwrap();
/// assert_eq!(report.applied.len(), 2);
/// ```
pub struct SyncSession<S: MapSurface> {
    surface: S,
    reconciler: Reconciler,
    pending: Option<Arc<DesiredState>>,
    camera: Option<Camera>,
    is_torn_down: bool,
}

impl<S: MapSurface> SyncSession<S> {
    /// Creates a session for the surface. The surface may or may not be ready yet.
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            reconciler: Reconciler::new(),
            pending: None,
            camera: None,
            is_torn_down: false,
        }
    }

    /// The synchronized surface.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutable access to the surface, e.g. to fire its ready signal.
    ///
    /// Changes made directly on the surface are not tracked. Sources and layers removed this way
    /// are added back by the next pass if they are still desired.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Reconciler state of the session.
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Returns true if a submitted snapshot has not been applied yet.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Returns true after [`SyncSession::teardown`].
    pub fn is_torn_down(&self) -> bool {
        self.is_torn_down
    }

    /// Makes the snapshot the next one to apply, replacing a pending one.
    ///
    /// The desired camera of the snapshot is sent to the surface right away if it differs from
    /// the last one sent. Surfaces queue camera changes until they are ready.
    pub fn submit(&mut self, snapshot: impl Into<Arc<DesiredState>>) {
        if self.is_torn_down {
            debug!("Session is torn down, snapshot is ignored");
            return;
        }

        let snapshot = snapshot.into();
        if let Some(camera) = snapshot.camera() {
            self.forward_camera(*camera);
        }

        if self.pending.replace(snapshot).is_some() {
            debug!("Pending snapshot is superseded by a newer one");
        }
    }

    /// Applies the pending snapshot if the surface is ready.
    ///
    /// Returns `Ok(None)` if nothing was applied: there is no pending snapshot, the surface is not
    /// ready yet, or the session is torn down. A failed pass consumes the snapshot; the error is
    /// returned and the surface is left with the operations applied before the failure.
    pub fn flush(&mut self) -> Result<Option<ReconcileReport>, SyncError> {
        if self.is_torn_down || !self.surface.is_ready() {
            return Ok(None);
        }

        let Some(snapshot) = self.pending.take() else {
            return Ok(None);
        };

        self.reconciler
            .reconcile(&snapshot, &mut self.surface)
            .map(Some)
    }

    /// Handler of the surface ready signal. Applies the pending snapshot.
    pub fn on_ready(&mut self) -> Result<Option<ReconcileReport>, SyncError> {
        debug!("Surface is ready, flushing pending snapshot");
        self.flush()
    }

    /// Discards the pending snapshot and tears the surface down. Later calls to
    /// [`SyncSession::submit`] and [`SyncSession::flush`] do nothing.
    pub fn teardown(&mut self) {
        if self.is_torn_down {
            return;
        }

        if self.pending.take().is_some() {
            debug!("Pending snapshot is discarded");
        }

        self.surface.teardown();
        self.is_torn_down = true;
        info!("Sync session is torn down");
    }

    fn forward_camera(&mut self, camera: Camera) {
        if !camera.is_finite() {
            warn!("Desired camera {camera:?} has non-finite values and is ignored");
            return;
        }

        let camera = camera.validated();
        let last = self.camera.unwrap_or_else(|| self.surface.camera());

        if camera.center != last.center {
            self.surface.set_center(camera.center);
        }
        if camera.zoom != last.zoom {
            self.surface.set_zoom(camera.zoom);
        }
        if camera.pitch != last.pitch {
            self.surface.set_pitch(camera.pitch);
        }
        if camera.bearing != last.bearing {
            self.surface.set_bearing(camera.bearing);
        }

        self.camera = Some(camera);
    }
}
