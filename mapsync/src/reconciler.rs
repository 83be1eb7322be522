//! Converges a [map surface](MapSurface) to a [desired state](DesiredState).

use ahash::{HashMap, HashMapExt, HashSet};
use log::{debug, warn};
use mapsync_types::{FilterExpression, LayerDescriptor, Terrain, Visibility};

use crate::error::SyncError;
use crate::store::DesiredState;
use crate::surface::{MapSurface, SurfaceOp};

/// Computes and applies the operations that make a surface match a desired state.
///
/// The reconciler remembers which sources and layers it put on the surface, and the filter and
/// visibility it last applied to each layer. Entities it did not add (e.g. the layers of the base
/// style) are never removed. A layer of the desired state that already exists on the surface
/// without being added by the reconciler is adopted: its filter and visibility are set once and it
/// is managed from then on.
///
/// Sources and layers are matched by id only. Apart from the filter and the visibility, a changed
/// descriptor with the same id is not applied; remove it from the desired state and add it again
/// to replace it.
///
/// A pass is planned completely before any operation is applied. Within a pass the operations
/// always go in this order:
///
/// 1. terrain is disabled if it is no longer desired or its source is going away;
/// 2. layers are removed, top first;
/// 3. sources are removed;
/// 4. sources are added;
/// 5. layers are added in the desired order, and filters and visibility of existing layers are
///    updated;
/// 6. terrain is set.
#[derive(Debug, Default)]
pub struct Reconciler {
    sources: Vec<String>,
    layers: Vec<String>,
    applied: HashMap<String, AppliedLayer>,
    terrain: Option<Terrain>,
}

#[derive(Debug, Default)]
struct AppliedLayer {
    source: Option<String>,
    filter: Option<FilterExpression>,
    visibility: Visibility,
}

/// Result of a successful reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    /// Operations applied to the surface, in order.
    pub applied: Vec<SurfaceOp>,
}

impl ReconcileReport {
    /// Returns true if the surface already matched the desired state.
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}

impl Reconciler {
    /// Creates a reconciler that manages nothing yet.
    pub fn new() -> Self {
        Self {
            sources: vec![],
            layers: vec![],
            applied: HashMap::new(),
            terrain: None,
        }
    }

    /// Ids of the sources the reconciler manages, in the order they were added.
    pub fn managed_sources(&self) -> impl DoubleEndedIterator<Item = &str> + '_ {
        self.sources.iter().map(String::as_str)
    }

    /// Ids of the layers the reconciler manages, in the order they were added.
    pub fn managed_layers(&self) -> impl DoubleEndedIterator<Item = &str> + '_ {
        self.layers.iter().map(String::as_str)
    }

    /// Computes the operations needed to converge the surface to `desired` without applying them.
    ///
    /// Fails with [`SyncError::DanglingReference`] if a source that must be removed is still used
    /// by a desired layer or by the desired terrain, and with [`SyncError::DuplicateSource`] or
    /// [`SyncError::DuplicateLayer`] if the desired state repeats an id.
    pub fn plan<S: MapSurface + ?Sized>(
        &self,
        desired: &DesiredState,
        surface: &S,
    ) -> Result<Vec<SurfaceOp>, SyncError> {
        desired.validate()?;

        let desired_sources: HashSet<&str> = desired.sources().iter().map(|s| s.id()).collect();
        let desired_layers: HashSet<&str> = desired.layers().iter().map(|l| l.id()).collect();

        let removed_sources: Vec<&str> = self
            .managed_sources()
            .rev()
            .filter(|id| !desired_sources.contains(id) && surface.has_source(id))
            .collect();

        for &source_id in &removed_sources {
            if let Some(layer) = desired
                .layers()
                .iter()
                .find(|layer| self.draws_from(layer, source_id, surface))
            {
                return Err(SyncError::DanglingReference {
                    source_id: source_id.to_owned(),
                    referenced_by: layer.id().to_owned(),
                });
            }

            if desired.terrain().is_some_and(|t| t.source == source_id) {
                return Err(SyncError::DanglingReference {
                    source_id: source_id.to_owned(),
                    referenced_by: "terrain".to_owned(),
                });
            }
        }

        let mut ops = vec![];

        if let Some(applied) = &self.terrain {
            let desired_terrain = desired.terrain();
            if desired_terrain != Some(applied)
                && (desired_terrain.is_none() || removed_sources.contains(&applied.source.as_str()))
            {
                ops.push(SurfaceOp::SetTerrain(None));
            }
        }

        ops.extend(
            self.managed_layers()
                .rev()
                .filter(|id| !desired_layers.contains(id) && surface.has_layer(id))
                .map(|id| SurfaceOp::RemoveLayer(id.to_owned())),
        );

        ops.extend(
            removed_sources
                .iter()
                .map(|&id| SurfaceOp::RemoveSource(id.to_owned())),
        );

        ops.extend(
            desired
                .sources()
                .iter()
                .filter(|source| !surface.has_source(source.id()))
                .cloned()
                .map(SurfaceOp::AddSource),
        );

        for (index, layer) in desired.layers().iter().enumerate() {
            if surface.has_layer(layer.id()) {
                self.plan_patches(layer, &mut ops);
            } else {
                let before = desired.layers()[index + 1..]
                    .iter()
                    .map(|l| l.id())
                    .find(|id| surface.has_layer(id))
                    .map(str::to_owned);

                ops.push(SurfaceOp::AddLayer {
                    layer: layer.clone(),
                    before,
                });
            }
        }

        if let Some(terrain) = desired.terrain() {
            if self.terrain.as_ref() != Some(terrain) {
                ops.push(SurfaceOp::SetTerrain(Some(terrain.clone())));
            }
        }

        Ok(ops)
    }

    /// Runs a reconciliation pass: plans the operations and applies them in order.
    ///
    /// The pass stops at the first failed operation and returns its error. All operations before
    /// it stay applied and are remembered, so the next pass continues from there.
    pub fn reconcile<S: MapSurface + ?Sized>(
        &mut self,
        desired: &DesiredState,
        surface: &mut S,
    ) -> Result<ReconcileReport, SyncError> {
        if !surface.is_ready() {
            return Err(SyncError::NotReady);
        }

        let ops = self.plan(desired, surface)?;
        debug!("Reconciliation pass planned {} operations", ops.len());

        let mut applied = Vec::with_capacity(ops.len());
        for op in ops {
            if let Err(err) = surface.apply(&op) {
                debug!(
                    "Reconciliation pass stopped at {op} after {} operations: {err}",
                    applied.len()
                );
                self.prune(surface);
                return Err(err);
            }

            self.record(&op);
            applied.push(op);
        }

        self.prune(surface);
        Ok(ReconcileReport { applied })
    }

    /// Returns true if the layer will draw from the source after the pass. A layer that stays on
    /// the surface keeps the source it was added with.
    fn draws_from<S: MapSurface + ?Sized>(
        &self,
        layer: &LayerDescriptor,
        source_id: &str,
        surface: &S,
    ) -> bool {
        if layer.source() == Some(source_id) {
            return true;
        }

        surface.has_layer(layer.id())
            && self
                .applied
                .get(layer.id())
                .is_some_and(|applied| applied.source.as_deref() == Some(source_id))
    }

    fn plan_patches(&self, layer: &LayerDescriptor, ops: &mut Vec<SurfaceOp>) {
        let Some(applied) = self.applied.get(layer.id()) else {
            debug!("Adopting layer {} that is already on the surface", layer.id());
            ops.push(SurfaceOp::SetFilter {
                layer: layer.id().to_owned(),
                filter: layer.filter().cloned(),
            });
            ops.push(SurfaceOp::SetVisibility {
                layer: layer.id().to_owned(),
                visibility: layer.visibility(),
            });
            return;
        };

        if applied.source.is_some() && applied.source.as_deref() != layer.source() {
            warn!(
                "Source of layer {} changed, the layer must be removed and added again to apply it",
                layer.id()
            );
        }

        if applied.filter.as_ref() != layer.filter() {
            ops.push(SurfaceOp::SetFilter {
                layer: layer.id().to_owned(),
                filter: layer.filter().cloned(),
            });
        }

        if applied.visibility != layer.visibility() {
            ops.push(SurfaceOp::SetVisibility {
                layer: layer.id().to_owned(),
                visibility: layer.visibility(),
            });
        }
    }

    fn record(&mut self, op: &SurfaceOp) {
        match op {
            SurfaceOp::AddSource(source) => {
                if !self.sources.iter().any(|id| id == source.id()) {
                    self.sources.push(source.id().to_owned());
                }
            }
            SurfaceOp::RemoveSource(id) => self.sources.retain(|s| s != id),
            SurfaceOp::AddLayer { layer, .. } => {
                let applied = self.applied_mut(layer.id());
                applied.source = layer.source().map(str::to_owned);
                applied.filter = layer.filter().cloned();
                applied.visibility = layer.visibility();
            }
            SurfaceOp::RemoveLayer(id) => {
                self.layers.retain(|l| l != id);
                self.applied.remove(id);
            }
            SurfaceOp::SetFilter { layer, filter } => {
                self.applied_mut(layer).filter = filter.clone();
            }
            SurfaceOp::SetVisibility { layer, visibility } => {
                self.applied_mut(layer).visibility = *visibility;
            }
            SurfaceOp::SetTerrain(terrain) => self.terrain = terrain.clone(),
            SurfaceOp::SetCenter(_)
            | SurfaceOp::SetZoom(_)
            | SurfaceOp::SetPitch(_)
            | SurfaceOp::SetBearing(_) => {}
        }
    }

    fn applied_mut(&mut self, layer_id: &str) -> &mut AppliedLayer {
        if !self.layers.iter().any(|id| id == layer_id) {
            self.layers.push(layer_id.to_owned());
        }

        self.applied.entry(layer_id.to_owned()).or_default()
    }

    /// Forgets entities that are no longer on the surface.
    fn prune<S: MapSurface + ?Sized>(&mut self, surface: &S) {
        self.sources.retain(|id| surface.has_source(id));

        let applied = &mut self.applied;
        self.layers.retain(|id| {
            let present = surface.has_layer(id);
            if !present {
                applied.remove(id);
            }
            present
        });

        if self
            .terrain
            .as_ref()
            .is_some_and(|t| !surface.has_source(&t.source))
        {
            self.terrain = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use insta::assert_compact_debug_snapshot;
    use mapsync_types::{LayerKind, SourceDescriptor, SourceKind, TileEndpoint};

    use super::*;
    use crate::surface::MemorySurface;
    use crate::tests::{fill_layer, geojson_source, journal, ready_surface};

    fn pass(reconciler: &mut Reconciler, state: &DesiredState, surface: &mut MemorySurface) {
        surface.take_journal();
        reconciler.reconcile(state, surface).unwrap();
    }

    fn single_layer_state() -> DesiredState {
        DesiredState::default()
            .set_sources([geojson_source("s1")])
            .set_layers([fill_layer("l1", "s1")])
    }

    #[test]
    fn adds_and_removes_in_dependency_order() {
        let mut surface = ready_surface();
        let mut reconciler = Reconciler::new();

        pass(&mut reconciler, &single_layer_state(), &mut surface);
        assert_compact_debug_snapshot!(journal(&surface), @r#"["addSource(s1)", "addLayer(l1)"]"#);

        pass(&mut reconciler, &DesiredState::default(), &mut surface);
        assert_compact_debug_snapshot!(journal(&surface), @r#"["removeLayer(l1)", "removeSource(s1)"]"#);
        assert!(!surface.has_source("s1"));
        assert_eq!(reconciler.managed_sources().count(), 0);
    }

    #[test]
    fn second_pass_is_empty() {
        let mut surface = ready_surface();
        let mut reconciler = Reconciler::new();
        let state = crate::tests::ski_state()
            .toggle_filter_value("ski-lifts-line", "Alta Ski Area")
            .set_visibility("avalanche-paths-fill", false);

        let first = reconciler.reconcile(&state, &mut surface).unwrap();
        assert_eq!(first.applied.len(), 4);

        let second = reconciler.reconcile(&state, &mut surface).unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn layers_are_added_in_desired_order() {
        let mut surface = ready_surface();
        let mut reconciler = Reconciler::new();
        let state = DesiredState::default()
            .set_sources([geojson_source("s1")])
            .set_layers([
                fill_layer("A", "s1"),
                fill_layer("B", "s1"),
                fill_layer("C", "s1"),
            ]);

        pass(&mut reconciler, &state, &mut surface);

        assert_compact_debug_snapshot!(journal(&surface), @r#"["addSource(s1)", "addLayer(A)", "addLayer(B)", "addLayer(C)"]"#);
        assert_eq!(surface.layers().ids().collect::<Vec<_>>(), ["A", "B", "C"]);
    }

    #[test]
    fn new_layer_is_inserted_under_following_layer() {
        let mut surface = ready_surface();
        let mut reconciler = Reconciler::new();
        let state = DesiredState::default()
            .set_sources([geojson_source("s1")])
            .set_layers([fill_layer("A", "s1"), fill_layer("C", "s1")]);
        pass(&mut reconciler, &state, &mut surface);

        let state = state.set_layers([
            fill_layer("A", "s1"),
            fill_layer("B", "s1"),
            fill_layer("C", "s1"),
        ]);
        pass(&mut reconciler, &state, &mut surface);

        assert_compact_debug_snapshot!(journal(&surface), @r#"["addLayer(B, before C)"]"#);
        assert_eq!(surface.layers().ids().collect::<Vec<_>>(), ["A", "B", "C"]);
    }

    #[test]
    fn dangling_reference_applies_nothing() {
        let mut surface = ready_surface();
        let mut reconciler = Reconciler::new();
        let state = single_layer_state();
        pass(&mut reconciler, &state, &mut surface);
        surface.take_journal();

        let result = reconciler.reconcile(&state.set_sources([]), &mut surface);

        assert_matches!(
            result,
            Err(SyncError::DanglingReference { source_id, referenced_by })
                if source_id == "s1" && referenced_by == "l1"
        );
        assert!(surface.journal().is_empty());
        assert!(surface.has_source("s1"));
    }

    #[test]
    fn kept_layer_guards_the_source_it_was_added_with() {
        let mut surface = ready_surface();
        let mut reconciler = Reconciler::new();
        let state = DesiredState::default()
            .set_sources([geojson_source("s1"), geojson_source("s2")])
            .set_layers([fill_layer("l0", "s2"), fill_layer("l1", "s1")]);
        pass(&mut reconciler, &state, &mut surface);
        surface.take_journal();

        let moved = DesiredState::default()
            .set_sources([geojson_source("s2")])
            .set_layers([fill_layer("l1", "s2")]);
        let result = reconciler.reconcile(&moved, &mut surface);

        assert_matches!(
            result,
            Err(SyncError::DanglingReference { source_id, referenced_by })
                if source_id == "s1" && referenced_by == "l1"
        );
        assert!(surface.journal().is_empty());
        assert!(surface.has_layer("l0"));
    }

    #[test]
    fn filter_is_set_once() {
        let mut surface = ready_surface();
        let mut reconciler = Reconciler::new();
        let state = single_layer_state();
        pass(&mut reconciler, &state, &mut surface);

        let state = state.set_filter_value("l1", "X", ["v1"]);
        pass(&mut reconciler, &state, &mut surface);
        assert_compact_debug_snapshot!(journal(&surface), @r#"["setFilter(l1, [\"all\",[\"match\",[\"get\",\"X\"],[\"v1\"],true,false]])"]"#);

        pass(&mut reconciler, &state, &mut surface);
        assert!(surface.journal().is_empty());
    }

    #[test]
    fn visibility_toggle_issues_two_calls() {
        let mut surface = ready_surface();
        let mut reconciler = Reconciler::new();
        let visible = single_layer_state();
        reconciler.reconcile(&visible, &mut surface).unwrap();
        surface.take_journal();

        let hidden = visible.set_visibility("l1", false);
        reconciler.reconcile(&hidden, &mut surface).unwrap();
        reconciler.reconcile(&hidden.set_visibility("l1", true), &mut surface).unwrap();

        assert_compact_debug_snapshot!(journal(&surface), @r#"["setVisibility(l1, none)", "setVisibility(l1, visible)"]"#);
        assert_eq!(surface.layers().visibility("l1"), Some(Visibility::Visible));
    }

    #[test]
    fn failed_operation_keeps_earlier_ones() {
        let mut surface = ready_surface();
        let mut reconciler = Reconciler::new();
        let broken = DesiredState::default()
            .set_sources([geojson_source("s1")])
            .set_layers([fill_layer("l1", "s1"), fill_layer("l2", "s2")]);

        let result = reconciler.reconcile(&broken, &mut surface);
        assert_matches!(result, Err(SyncError::UnknownSource(id)) if id == "s2");
        assert_compact_debug_snapshot!(journal(&surface), @r#"["addSource(s1)", "addLayer(l1)"]"#);

        let fixed = broken.set_sources([geojson_source("s1"), geojson_source("s2")]);
        pass(&mut reconciler, &fixed, &mut surface);
        assert_compact_debug_snapshot!(journal(&surface), @r#"["addSource(s2)", "addLayer(l2)"]"#);
    }

    #[test]
    fn externally_removed_layer_is_added_again() {
        let mut surface = ready_surface();
        let mut reconciler = Reconciler::new();
        let state = single_layer_state();
        pass(&mut reconciler, &state, &mut surface);

        surface.remove_layer("l1").unwrap();
        pass(&mut reconciler, &state, &mut surface);

        assert_compact_debug_snapshot!(journal(&surface), @r#"["addLayer(l1)"]"#);
    }

    #[test]
    fn unmanaged_entities_are_kept() {
        let mut surface = ready_surface();
        surface.add_source(&geojson_source("base")).unwrap();
        surface.add_layer(&fill_layer("water", "base"), None).unwrap();
        let mut reconciler = Reconciler::new();

        pass(&mut reconciler, &single_layer_state(), &mut surface);
        pass(&mut reconciler, &DesiredState::default(), &mut surface);

        assert_compact_debug_snapshot!(journal(&surface), @r#"["removeLayer(l1)", "removeSource(s1)"]"#);
        assert!(surface.has_layer("water"));
        assert!(surface.has_source("base"));
    }

    #[test]
    fn existing_layer_is_adopted() {
        let mut surface = ready_surface();
        surface.add_source(&geojson_source("s1")).unwrap();
        surface.add_layer(&fill_layer("l1", "s1"), None).unwrap();
        let mut reconciler = Reconciler::new();

        let state = single_layer_state().set_visibility("l1", false);
        pass(&mut reconciler, &state, &mut surface);
        assert_compact_debug_snapshot!(journal(&surface), @r#"["setFilter(l1, null)", "setVisibility(l1, none)"]"#);

        pass(&mut reconciler, &state.set_layers([]), &mut surface);
        assert_compact_debug_snapshot!(journal(&surface), @r#"["removeLayer(l1)"]"#);
        assert!(surface.has_source("s1"));
    }

    #[test]
    fn terrain_is_set_after_its_source_and_cleared_first() {
        let mut surface = ready_surface();
        let mut reconciler = Reconciler::new();
        let dem = SourceDescriptor::new(
            "mapbox-dem",
            SourceKind::RasterDem(
                TileEndpoint::url("mapbox://mapbox.mapbox-terrain-dem-v1")
                    .with_tile_size(512)
                    .with_max_zoom(14),
            ),
        )
        .unwrap();
        let state = DesiredState::default()
            .set_sources([dem])
            .set_layers([LayerDescriptor::sky("sky").unwrap()])
            .set_terrain(Some(Terrain::new("mapbox-dem").with_exaggeration(1.5)));

        pass(&mut reconciler, &state, &mut surface);
        assert_compact_debug_snapshot!(journal(&surface), @r#"["addSource(mapbox-dem)", "addLayer(sky)", "setTerrain(mapbox-dem)"]"#);

        pass(&mut reconciler, &DesiredState::default(), &mut surface);
        assert_compact_debug_snapshot!(journal(&surface), @r#"["setTerrain(null)", "removeLayer(sky)", "removeSource(mapbox-dem)"]"#);
        assert!(surface.terrain().is_none());
    }

    #[test]
    fn terrain_keeps_its_source() {
        let mut surface = ready_surface();
        let mut reconciler = Reconciler::new();
        let dem = SourceDescriptor::new(
            "dem",
            SourceKind::RasterDem(TileEndpoint::url("mapbox://mapbox.terrain-rgb")),
        )
        .unwrap();
        let state = DesiredState::default()
            .set_sources([dem])
            .set_terrain(Some(Terrain::new("dem")));
        pass(&mut reconciler, &state, &mut surface);

        let result = reconciler.reconcile(&state.set_sources([]), &mut surface);

        assert_matches!(
            result,
            Err(SyncError::DanglingReference { referenced_by, .. }) if referenced_by == "terrain"
        );
    }

    #[test]
    fn duplicate_layer_ids_are_rejected_before_applying() {
        let mut surface = ready_surface();
        let mut reconciler = Reconciler::new();
        let state = DesiredState::default()
            .set_sources([geojson_source("s1")])
            .set_layers([
                fill_layer("l1", "s1"),
                LayerDescriptor::new("l1", LayerKind::Line, "s1").unwrap(),
            ]);

        let result = reconciler.reconcile(&state, &mut surface);

        assert_matches!(result, Err(SyncError::DuplicateLayer(_)));
        assert!(surface.journal().is_empty());
    }

    #[test]
    fn surface_must_be_ready() {
        let mut surface = MemorySurface::new(Default::default());
        let mut reconciler = Reconciler::new();

        let result = reconciler.reconcile(&single_layer_state(), &mut surface);

        assert_matches!(result, Err(SyncError::NotReady));
    }
}
