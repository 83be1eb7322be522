//! [Map surfaces](MapSurface) are the live, stateful rendering targets the desired state is
//! synchronized to.

use std::fmt::{Display, Formatter};

use mapsync_types::{
    Camera, FilterExpression, LayerDescriptor, LngLat, SourceDescriptor, Terrain, Visibility,
};

use crate::error::SyncError;

mod layer_stack;
mod memory;

pub use layer_stack::LayerStack;
pub use memory::MemorySurface;

/// Adapter over an external rendering surface.
///
/// The surface owns the actual sources and layers. Callers can only observe it through the query
/// methods ([`MapSurface::is_ready`], [`MapSurface::has_source`], [`MapSurface::has_layer`]) and
/// change it through the primitive operations below.
///
/// A surface becomes ready exactly once. Structural operations (sources, layers, filters,
/// visibility, terrain) are only permitted after that. Camera setters are accepted at any time;
/// before the ready signal they are queued or dropped depending on the
/// [configuration](crate::PreReadyCamera).
///
/// After [`MapSurface::teardown`] all operations are no-ops that return `Ok(())`, and the query
/// methods report that nothing exists.
pub trait MapSurface {
    /// True after the one-time ready signal has fired.
    fn is_ready(&self) -> bool;
    /// True if a source with the id exists.
    fn has_source(&self, id: &str) -> bool;
    /// True if a layer with the id exists.
    fn has_layer(&self, id: &str) -> bool;

    /// Registers a source. Fails with [`SyncError::DuplicateSource`] if the id is taken and with
    /// [`SyncError::InvalidDescriptor`] if the descriptor is malformed for its type.
    fn add_source(&mut self, source: &SourceDescriptor) -> Result<(), SyncError>;
    /// Removes a source. Does nothing if the source does not exist.
    fn remove_source(&mut self, id: &str) -> Result<(), SyncError>;
    /// Adds a layer under the layer `before`, or on top of all layers if `before` is `None`.
    ///
    /// Fails with [`SyncError::UnknownSource`] if the layer source does not exist and with
    /// [`SyncError::DuplicateLayer`] if the id is taken.
    fn add_layer(&mut self, layer: &LayerDescriptor, before: Option<&str>)
        -> Result<(), SyncError>;
    /// Removes a layer. Does nothing if the layer does not exist.
    fn remove_layer(&mut self, id: &str) -> Result<(), SyncError>;
    /// Replaces the filter of a layer. `None` removes the filter.
    fn set_filter(
        &mut self,
        layer_id: &str,
        filter: Option<&FilterExpression>,
    ) -> Result<(), SyncError>;
    /// Shows or hides a layer.
    fn set_visibility(&mut self, layer_id: &str, visibility: Visibility) -> Result<(), SyncError>;
    /// Enables 3D terrain from an elevation source, or disables it with `None`.
    fn set_terrain(&mut self, terrain: Option<&Terrain>) -> Result<(), SyncError>;

    /// Currently applied camera.
    fn camera(&self) -> Camera;
    /// Moves the center of the map.
    fn set_center(&mut self, center: LngLat);
    /// Changes the zoom level.
    fn set_zoom(&mut self, zoom: f64);
    /// Changes the pitch.
    fn set_pitch(&mut self, pitch: f64);
    /// Changes the bearing.
    fn set_bearing(&mut self, bearing: f64);

    /// Releases all sources and layers. Calling it again does nothing.
    fn teardown(&mut self);

    /// Applies a single operation.
    fn apply(&mut self, op: &SurfaceOp) -> Result<(), SyncError> {
        match op {
            SurfaceOp::AddSource(source) => self.add_source(source),
            SurfaceOp::RemoveSource(id) => self.remove_source(id),
            SurfaceOp::AddLayer { layer, before } => self.add_layer(layer, before.as_deref()),
            SurfaceOp::RemoveLayer(id) => self.remove_layer(id),
            SurfaceOp::SetFilter { layer, filter } => self.set_filter(layer, filter.as_ref()),
            SurfaceOp::SetVisibility { layer, visibility } => {
                self.set_visibility(layer, *visibility)
            }
            SurfaceOp::SetTerrain(terrain) => self.set_terrain(terrain.as_ref()),
            SurfaceOp::SetCenter(center) => {
                self.set_center(*center);
                Ok(())
            }
            SurfaceOp::SetZoom(zoom) => {
                self.set_zoom(*zoom);
                Ok(())
            }
            SurfaceOp::SetPitch(pitch) => {
                self.set_pitch(*pitch);
                Ok(())
            }
            SurfaceOp::SetBearing(bearing) => {
                self.set_bearing(*bearing);
                Ok(())
            }
        }
    }
}

/// Primitive operation on a [`MapSurface`].
///
/// The [`Display`] implementation gives a short form, e.g. `addLayer(l2, before l3)`, that is used
/// in logs.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOp {
    /// See [`MapSurface::add_source`].
    AddSource(SourceDescriptor),
    /// See [`MapSurface::remove_source`].
    RemoveSource(String),
    /// See [`MapSurface::add_layer`].
    AddLayer {
        /// Layer to add.
        layer: LayerDescriptor,
        /// Layer the new one is placed under.
        before: Option<String>,
    },
    /// See [`MapSurface::remove_layer`].
    RemoveLayer(String),
    /// See [`MapSurface::set_filter`].
    SetFilter {
        /// Layer id.
        layer: String,
        /// New filter.
        filter: Option<FilterExpression>,
    },
    /// See [`MapSurface::set_visibility`].
    SetVisibility {
        /// Layer id.
        layer: String,
        /// New visibility.
        visibility: Visibility,
    },
    /// See [`MapSurface::set_terrain`].
    SetTerrain(Option<Terrain>),
    /// See [`MapSurface::set_center`].
    SetCenter(LngLat),
    /// See [`MapSurface::set_zoom`].
    SetZoom(f64),
    /// See [`MapSurface::set_pitch`].
    SetPitch(f64),
    /// See [`MapSurface::set_bearing`].
    SetBearing(f64),
}

impl SurfaceOp {
    /// Returns true for operations that change sources, layers or terrain.
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            SurfaceOp::SetCenter(_)
                | SurfaceOp::SetZoom(_)
                | SurfaceOp::SetPitch(_)
                | SurfaceOp::SetBearing(_)
        )
    }
}

impl Display for SurfaceOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceOp::AddSource(source) => write!(f, "addSource({})", source.id()),
            SurfaceOp::RemoveSource(id) => write!(f, "removeSource({id})"),
            SurfaceOp::AddLayer {
                layer,
                before: Some(before),
            } => write!(f, "addLayer({}, before {before})", layer.id()),
            SurfaceOp::AddLayer {
                layer,
                before: None,
            } => write!(f, "addLayer({})", layer.id()),
            SurfaceOp::RemoveLayer(id) => write!(f, "removeLayer({id})"),
            SurfaceOp::SetFilter {
                layer,
                filter: Some(filter),
            } => write!(f, "setFilter({layer}, {})", filter.to_json()),
            SurfaceOp::SetFilter { layer, filter: None } => write!(f, "setFilter({layer}, null)"),
            SurfaceOp::SetVisibility { layer, visibility } => {
                let value = match visibility {
                    Visibility::Visible => "visible",
                    Visibility::None => "none",
                };
                write!(f, "setVisibility({layer}, {value})")
            }
            SurfaceOp::SetTerrain(Some(terrain)) => write!(f, "setTerrain({})", terrain.source),
            SurfaceOp::SetTerrain(None) => write!(f, "setTerrain(null)"),
            SurfaceOp::SetCenter(center) => {
                write!(f, "setCenter([{}, {}])", center.lng(), center.lat())
            }
            SurfaceOp::SetZoom(zoom) => write!(f, "setZoom({zoom})"),
            SurfaceOp::SetPitch(pitch) => write!(f, "setPitch({pitch})"),
            SurfaceOp::SetBearing(bearing) => write!(f, "setBearing({bearing})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use mapsync_types::{lnglat, LayerKind};

    use super::*;

    #[test]
    fn camera_operations_are_not_structural() {
        let layer = LayerDescriptor::new("l1", LayerKind::Fill, "s1").unwrap();
        let structural = [
            SurfaceOp::AddLayer {
                layer,
                before: Some("l2".into()),
            },
            SurfaceOp::RemoveSource("s1".into()),
            SurfaceOp::SetVisibility {
                layer: "l1".into(),
                visibility: Visibility::None,
            },
            SurfaceOp::SetTerrain(None),
        ];
        let camera = [
            SurfaceOp::SetCenter(lnglat!(-111.65, 40.581)),
            SurfaceOp::SetZoom(12.0),
            SurfaceOp::SetPitch(60.0),
            SurfaceOp::SetBearing(-20.0),
        ];

        assert!(structural.iter().all(SurfaceOp::is_structural));
        assert!(!camera.iter().any(SurfaceOp::is_structural));
        assert_eq!(structural[0].to_string(), "addLayer(l1, before l2)");
        assert_eq!(camera[3].to_string(), "setBearing(-20)");
    }
}
