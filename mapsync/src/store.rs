//! Desired state of a map: what the caller wants the surface to show.
//!
//! [`DesiredState`] is an immutable snapshot. Every update operation returns a new snapshot and
//! leaves the original untouched, so consumers can detect changes by comparing snapshots.
//! Unchanged parts are shared between snapshots.
//!
//! [`DesiredStateStore`] holds the latest snapshot for several readers (e.g. the map session and
//! the filter widgets) and serializes writers.

use std::sync::Arc;

use ahash::{HashSet, HashSetExt};
use log::{debug, warn};
use mapsync_types::{
    Camera, FilterExpression, FilterValue, LayerDescriptor, SourceDescriptor, Terrain, Visibility,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// One selectable value of a [`FilterControl`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOption {
    /// Property value.
    pub value: FilterValue,
    /// Text shown to the user.
    pub label: String,
}

/// Multi-select filter widget bound to one property of one layer.
///
/// A layer with a control shows only the features whose `field` equals one of the selected
/// values. If nothing is selected the layer has no filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterControl {
    /// Id of the filtered layer.
    pub layer: String,
    /// Feature property the filter checks.
    pub field: String,
    /// Title of the widget.
    pub title: String,
    /// Values the user can select.
    #[serde(default)]
    pub options: Vec<FilterOption>,
    /// Currently selected values, in selection order.
    #[serde(default)]
    pub selected: Vec<FilterValue>,
}

impl FilterControl {
    /// Creates a control without options.
    pub fn new(
        layer: impl Into<String>,
        field: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            layer: layer.into(),
            field: field.into(),
            title: title.into(),
            options: vec![],
            selected: vec![],
        }
    }

    /// Adds an option.
    pub fn with_option(mut self, value: impl Into<FilterValue>, label: impl Into<String>) -> Self {
        self.options.push(FilterOption {
            value: value.into(),
            label: label.into(),
        });
        self
    }

    /// Selects the value if it is not selected, and deselects it otherwise.
    pub fn toggle(&mut self, value: &FilterValue) {
        match self.selected.iter().position(|v| v == value) {
            Some(index) => {
                self.selected.remove(index);
            }
            None => self.selected.push(value.clone()),
        }
    }

    /// Returns true if the value is selected.
    pub fn is_selected(&self, value: &FilterValue) -> bool {
        self.selected.contains(value)
    }

    /// Filter for the current selection.
    pub fn expression(&self) -> Option<FilterExpression> {
        if self.selected.is_empty() {
            None
        } else {
            Some(FilterExpression::matching(
                self.field.clone(),
                self.selected.iter().cloned(),
            ))
        }
    }
}

/// Snapshot of the sources, layers, filter widgets, terrain and camera a map should have.
///
/// ```
/// use mapsync::DesiredState;
///
/// let state = DesiredState::from_json(r#"{
///     "sources": [{"id": "s1", "type": "geojson", "data": "https://example.com/s1.geojson"}],
///     "layers": [{"id": "l1", "type": "fill", "source": "s1"}]
/// }"#).unwrap();
///
/// let hidden = state.set_visibility("l1", false);
///
/// assert!(state.layer("l1").unwrap().visibility().is_visible());
/// assert!(!hidden.layer("l1").unwrap().visibility().is_visible());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesiredState {
    sources: Arc<Vec<SourceDescriptor>>,
    layers: Arc<Vec<LayerDescriptor>>,
    filters: Arc<Vec<FilterControl>>,
    terrain: Option<Terrain>,
    camera: Option<Camera>,
}

#[derive(Deserialize, Serialize)]
struct StyleDocument {
    #[serde(default)]
    sources: Vec<SourceDescriptor>,
    #[serde(default)]
    layers: Vec<LayerDescriptor>,
    #[serde(default)]
    filters: Vec<FilterControl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    terrain: Option<Terrain>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    camera: Option<Camera>,
}

impl DesiredState {
    /// Decodes a state from a JSON document with `sources`, `layers`, `filters`, `terrain` and
    /// `camera` members. All members are optional.
    ///
    /// A filter widget with selected values sets the filter of its layer. A widget with an empty
    /// selection keeps the filter written on the layer.
    pub fn from_json(json: &str) -> Result<Self, SyncError> {
        let document: StyleDocument = serde_json::from_str(json)?;
        let state = Self {
            sources: Arc::new(document.sources),
            layers: Arc::new(document.layers),
            filters: Arc::new(vec![]),
            terrain: document.terrain,
            camera: document.camera,
        };

        Ok(document
            .filters
            .into_iter()
            .fold(state, |state, control| {
                if control.selected.is_empty() {
                    state.with_control(control)
                } else {
                    state.add_filter_control(control)
                }
            }))
    }

    /// Encodes the state into the JSON document form.
    pub fn to_json(&self) -> Result<String, SyncError> {
        let document = StyleDocument {
            sources: self.sources.to_vec(),
            layers: self.layers.to_vec(),
            filters: self.filters.to_vec(),
            terrain: self.terrain.clone(),
            camera: self.camera,
        };

        Ok(serde_json::to_string(&document)?)
    }

    /// Desired sources.
    pub fn sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    /// Desired layers from bottom to top.
    pub fn layers(&self) -> &[LayerDescriptor] {
        &self.layers
    }

    /// Filter widgets.
    pub fn filter_controls(&self) -> &[FilterControl] {
        &self.filters
    }

    /// Desired terrain.
    pub fn terrain(&self) -> Option<&Terrain> {
        self.terrain.as_ref()
    }

    /// Desired camera. `None` leaves the camera to the user.
    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    /// Source with the id.
    pub fn source(&self, id: &str) -> Option<&SourceDescriptor> {
        self.sources.iter().find(|s| s.id() == id)
    }

    /// Layer with the id.
    pub fn layer(&self, id: &str) -> Option<&LayerDescriptor> {
        self.layers.iter().find(|l| l.id() == id)
    }

    /// Filter widget of the layer.
    pub fn filter_control(&self, layer_id: &str) -> Option<&FilterControl> {
        self.filters.iter().find(|c| c.layer == layer_id)
    }

    /// Returns true if the two snapshots share all their data.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.sources, &other.sources)
            && Arc::ptr_eq(&self.layers, &other.layers)
            && Arc::ptr_eq(&self.filters, &other.filters)
            && self.terrain == other.terrain
            && self.camera == other.camera
    }

    /// Checks that source and layer ids are unique.
    pub fn validate(&self) -> Result<(), SyncError> {
        let mut ids = HashSet::with_capacity(self.sources.len());
        for source in self.sources.iter() {
            if !ids.insert(source.id()) {
                return Err(SyncError::DuplicateSource(source.id().to_owned()));
            }
        }

        let mut ids = HashSet::with_capacity(self.layers.len());
        for layer in self.layers.iter() {
            if !ids.insert(layer.id()) {
                return Err(SyncError::DuplicateLayer(layer.id().to_owned()));
            }
        }

        Ok(())
    }

    /// Replaces the sources.
    pub fn set_sources(&self, sources: impl IntoIterator<Item = SourceDescriptor>) -> Self {
        Self {
            sources: Arc::new(sources.into_iter().collect()),
            ..self.clone()
        }
    }

    /// Replaces the layers. The order is the stacking order, the last layer is drawn on top.
    pub fn set_layers(&self, layers: impl IntoIterator<Item = LayerDescriptor>) -> Self {
        Self {
            layers: Arc::new(layers.into_iter().collect()),
            ..self.clone()
        }
    }

    /// Sets the filter of a layer to pass features whose `field` equals any of `values`. An
    /// empty `values` list removes the filter.
    ///
    /// If the layer has a filter widget for the same field, its selection is updated too.
    pub fn set_filter_value<V: Into<FilterValue>>(
        &self,
        layer_id: &str,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values: Vec<FilterValue> = values.into_iter().map(Into::into).collect();
        let filter = if values.is_empty() {
            None
        } else {
            Some(FilterExpression::matching(field, values.iter().cloned()))
        };

        let Some(mut next) = self.update_layer(layer_id, |layer| layer.with_filter(filter)) else {
            return self.clone();
        };

        if let Some(index) = next
            .filters
            .iter()
            .position(|c| c.layer == layer_id && c.field == field)
        {
            Arc::make_mut(&mut next.filters)[index].selected = values;
        }

        next
    }

    /// Shows or hides a layer.
    pub fn set_visibility(&self, layer_id: &str, visible: bool) -> Self {
        self.update_layer(layer_id, |layer| {
            layer.with_visibility(Visibility::from(visible))
        })
        .unwrap_or_else(|| self.clone())
    }

    /// Adds a filter widget, replacing the existing widget of the same layer. The layer filter is
    /// set from the widget selection.
    pub fn add_filter_control(&self, control: FilterControl) -> Self {
        let filter = control.expression();
        let layer_id = control.layer.clone();
        let next = self.with_control(control);

        next.update_layer(&layer_id, |layer| layer.with_filter(filter))
            .unwrap_or(next)
    }

    /// Toggles a value in the filter widget of the layer and updates the layer filter.
    pub fn toggle_filter_value(&self, layer_id: &str, value: impl Into<FilterValue>) -> Self {
        let Some(index) = self.filters.iter().position(|c| c.layer == layer_id) else {
            warn!("Layer {layer_id} has no filter control, toggle is ignored");
            return self.clone();
        };

        let mut next = self.clone();
        let control = &mut Arc::make_mut(&mut next.filters)[index];
        control.toggle(&value.into());
        let filter = control.expression();

        next.update_layer(layer_id, |layer| layer.with_filter(filter))
            .unwrap_or(next)
    }

    /// Sets or removes the terrain.
    pub fn set_terrain(&self, terrain: Option<Terrain>) -> Self {
        Self {
            terrain,
            ..self.clone()
        }
    }

    /// Sets or removes the desired camera.
    pub fn set_camera(&self, camera: Option<Camera>) -> Self {
        Self {
            camera,
            ..self.clone()
        }
    }

    fn with_control(&self, control: FilterControl) -> Self {
        let mut next = self.clone();
        let filters = Arc::make_mut(&mut next.filters);
        match filters.iter().position(|c| c.layer == control.layer) {
            Some(index) => filters[index] = control,
            None => filters.push(control),
        }

        next
    }

    fn update_layer(
        &self,
        layer_id: &str,
        update: impl FnOnce(LayerDescriptor) -> LayerDescriptor,
    ) -> Option<Self> {
        let Some(index) = self.layers.iter().position(|l| l.id() == layer_id) else {
            warn!("Layer {layer_id} is not in the desired state, update is ignored");
            return None;
        };

        let mut next = self.clone();
        let layers = Arc::make_mut(&mut next.layers);
        layers[index] = update(layers[index].clone());

        Some(next)
    }
}

/// Shared holder of the latest [`DesiredState`] snapshot.
///
/// Readers get the current snapshot with [`DesiredStateStore::snapshot`]. Writers go through
/// [`DesiredStateStore::update`], which produces the next snapshot from the current one. The
/// generation counter increases only when an update actually changes the state.
#[derive(Debug, Default)]
pub struct DesiredStateStore {
    inner: RwLock<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    snapshot: Arc<DesiredState>,
    generation: u64,
}

impl DesiredStateStore {
    /// Creates a store with the initial state.
    pub fn new(initial: DesiredState) -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                snapshot: Arc::new(initial),
                generation: 0,
            }),
        }
    }

    /// Latest snapshot.
    pub fn snapshot(&self) -> Arc<DesiredState> {
        self.inner.read().snapshot.clone()
    }

    /// Number of changes applied to the store.
    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    /// Replaces the snapshot with the result of `update` and returns the new snapshot.
    ///
    /// If the result equals the current state, the current snapshot is kept and returned.
    ///
    /// `update` runs without holding the lock, so it may read the store. If another writer
    /// replaced the snapshot in the meantime, `update` is called again with the newer one.
    pub fn update(
        &self,
        mut update: impl FnMut(&DesiredState) -> DesiredState,
    ) -> Arc<DesiredState> {
        loop {
            let current = self.snapshot();
            let next = update(&current);

            let mut inner = self.inner.write();
            if !Arc::ptr_eq(&inner.snapshot, &current) {
                debug!("Desired state changed during update, retrying");
                continue;
            }

            if next != *inner.snapshot {
                inner.snapshot = Arc::new(next);
                inner.generation += 1;
            }

            return inner.snapshot.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use mapsync_types::LayerKind;

    use super::*;
    use crate::tests::{fill_layer, geojson_source, ski_state};

    #[test]
    fn updates_do_not_touch_previous_snapshot() {
        let state = DesiredState::default()
            .set_sources([geojson_source("s1")])
            .set_layers([fill_layer("l1", "s1")]);

        let hidden = state.set_visibility("l1", false);

        assert_eq!(state.layer("l1").unwrap().visibility(), Visibility::Visible);
        assert_eq!(hidden.layer("l1").unwrap().visibility(), Visibility::None);
        assert!(Arc::ptr_eq(&state.sources, &hidden.sources));
        assert!(!Arc::ptr_eq(&state.layers, &hidden.layers));
    }

    #[test]
    fn set_filter_value_builds_match_filter() {
        let state = DesiredState::default()
            .set_sources([geojson_source("s1")])
            .set_layers([fill_layer("l1", "s1")]);

        let filtered = state.set_filter_value("l1", "X", ["v1"]);
        assert_eq!(
            filtered.layer("l1").unwrap().filter(),
            Some(&FilterExpression::matching("X", ["v1"]))
        );

        let cleared = filtered.set_filter_value("l1", "X", Vec::<FilterValue>::new());
        assert_eq!(cleared.layer("l1").unwrap().filter(), None);
    }

    #[test]
    fn unknown_layer_updates_are_ignored() {
        let state = DesiredState::default().set_layers([fill_layer("l1", "s1")]);

        assert!(state.set_visibility("missing", false).ptr_eq(&state));
        assert!(state
            .set_filter_value("missing", "X", ["v1"])
            .ptr_eq(&state));
        assert!(state.toggle_filter_value("l1", "v1").ptr_eq(&state));
    }

    #[test]
    fn toggle_filter_value_selects_and_deselects() {
        let state = ski_state();
        let control = state.filter_control("ski-lifts-line").unwrap();
        assert!(control.selected.is_empty());
        assert_eq!(state.layer("ski-lifts-line").unwrap().filter(), None);

        let state = state
            .toggle_filter_value("ski-lifts-line", "Alta Ski Area")
            .toggle_filter_value("ski-lifts-line", "Brighton Ski Resort");
        assert_eq!(
            state.layer("ski-lifts-line").unwrap().filter(),
            Some(&FilterExpression::matching(
                "RESORT",
                ["Alta Ski Area", "Brighton Ski Resort"]
            ))
        );

        let state = state.toggle_filter_value("ski-lifts-line", "Alta Ski Area");
        let control = state.filter_control("ski-lifts-line").unwrap();
        assert_eq!(control.selected, [FilterValue::from("Brighton Ski Resort")]);
        assert!(!control.is_selected(&"Alta Ski Area".into()));

        let state = state.toggle_filter_value("ski-lifts-line", "Brighton Ski Resort");
        assert_eq!(state.layer("ski-lifts-line").unwrap().filter(), None);
    }

    #[test]
    fn set_filter_value_updates_widget_selection() {
        let state = ski_state().set_filter_value(
            "avalanche-paths-fill",
            "RETURN_INTERVAL",
            ["FREQUENT"],
        );

        assert_eq!(
            state.filter_control("avalanche-paths-fill").unwrap().selected,
            [FilterValue::from("FREQUENT")]
        );
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let state = DesiredState::default().set_sources([geojson_source("s1"), geojson_source("s1")]);
        assert_matches!(state.validate(), Err(SyncError::DuplicateSource(id)) if id == "s1");

        let state = DesiredState::default().set_layers([
            fill_layer("l1", "s1"),
            LayerDescriptor::new("l1", LayerKind::Line, "s1").unwrap(),
        ]);
        assert_matches!(state.validate(), Err(SyncError::DuplicateLayer(id)) if id == "l1");
    }

    #[test]
    fn json_document_round_trip_keeps_filters() {
        let state = ski_state().toggle_filter_value("ski-lifts-line", "Alta Ski Area");
        let decoded = DesiredState::from_json(&state.to_json().unwrap()).unwrap();

        assert_eq!(decoded, state);
    }

    #[test]
    fn from_json_keeps_layer_filter_without_selection() {
        let state = DesiredState::from_json(
            r#"{
                "sources": [{"id": "s1", "type": "geojson", "data": "https://example.com/s1.geojson"}],
                "layers": [{
                    "id": "l1",
                    "type": "fill",
                    "source": "s1",
                    "filter": ["all", ["match", ["get", "X"], ["v1"], true, false]]
                }],
                "filters": [
                    {"layer": "l1", "field": "X", "title": "X", "options": [{"value": "v1", "label": "V1"}]}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(
            state.layer("l1").unwrap().filter(),
            Some(&FilterExpression::matching("X", ["v1"]))
        );
        assert!(state.filter_control("l1").unwrap().selected.is_empty());
    }

    #[test]
    fn update_closure_can_read_the_store() {
        let store = DesiredStateStore::new(ski_state());

        let hidden = store.update(|state| {
            assert_eq!(store.generation(), 0);
            assert!(store.snapshot().layer("ski-lifts-line").is_some());
            state.set_visibility("ski-lifts-line", false)
        });

        assert_eq!(store.generation(), 1);
        assert!(Arc::ptr_eq(&hidden, &store.snapshot()));
    }

    #[test]
    fn store_bumps_generation_on_change_only() {
        let store = DesiredStateStore::new(ski_state());
        let first = store.snapshot();

        let same = store.update(|state| state.set_visibility("missing", false));
        assert!(Arc::ptr_eq(&first, &same));
        assert_eq!(store.generation(), 0);

        let hidden = store.update(|state| state.set_visibility("ski-lifts-line", false));
        assert!(!Arc::ptr_eq(&first, &hidden));
        assert_eq!(store.generation(), 1);
        assert!(Arc::ptr_eq(&hidden, &store.snapshot()));
        assert!(first.layer("ski-lifts-line").unwrap().visibility().is_visible());
    }
}
