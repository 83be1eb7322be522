use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use mapsync_types::{LayerDescriptor, LayerKind, SourceDescriptor};
use serde_json::json;

use crate::messenger::Messenger;
use crate::store::{DesiredState, FilterControl};
use crate::surface::MemorySurface;
use crate::SurfaceConfig;

pub(crate) fn ready_surface() -> MemorySurface {
    let mut surface = MemorySurface::new(SurfaceConfig::default());
    surface.load();
    surface
}

pub(crate) fn geojson_source(id: &str) -> SourceDescriptor {
    SourceDescriptor::geojson_inline(
        id,
        json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"name": id},
                "geometry": {"type": "Point", "coordinates": [-111.65, 40.581]}
            }]
        }),
    )
    .unwrap()
}

pub(crate) fn fill_layer(id: &str, source: &str) -> LayerDescriptor {
    LayerDescriptor::new(id, LayerKind::Fill, source).unwrap()
}

/// Operations applied to the surface in their short form.
pub(crate) fn journal(surface: &MemorySurface) -> Vec<String> {
    surface.journal().iter().map(ToString::to_string).collect()
}

/// Desired state of the ski area demo with two filter widgets.
pub(crate) fn ski_state() -> DesiredState {
    let avalanche = SourceDescriptor::geojson_url(
        "avalanche-paths",
        "https://opendata.arcgis.com/datasets/0df199cef1704e5287ae675ee3dbd3bd_0.geojson",
    )
    .unwrap();
    let lifts = SourceDescriptor::geojson_url(
        "ski-lifts",
        "https://opendata.arcgis.com/datasets/51d8a963411d4356ab3fa7a24146d203_0.geojson",
    )
    .unwrap();

    DesiredState::default()
        .set_sources([avalanche, lifts])
        .set_layers([
            LayerDescriptor::new("avalanche-paths-fill", LayerKind::Fill, "avalanche-paths")
                .unwrap()
                .with_paint("fill-color", json!("#f05c5c"))
                .with_paint("fill-opacity", json!(0.5)),
            LayerDescriptor::new("ski-lifts-line", LayerKind::Line, "ski-lifts")
                .unwrap()
                .with_paint("line-color", json!("#403965"))
                .with_paint("line-width", json!(2.5)),
        ])
        .add_filter_control(
            FilterControl::new("avalanche-paths-fill", "RETURN_INTERVAL", "Avalanche Frequency")
                .with_option("FREQUENT", "Frequent")
                .with_option("OCCASIONAL", "Occasional"),
        )
        .add_filter_control(
            FilterControl::new("ski-lifts-line", "RESORT", "Ski Resort")
                .with_option("Alta Ski Area", "Alta")
                .with_option("Brighton Ski Resort", "Brighton"),
        )
}

/// Messenger that counts redraw requests.
#[derive(Debug, Clone, Default)]
pub(crate) struct CountingMessenger {
    count: Arc<AtomicUsize>,
}

impl CountingMessenger {
    pub(crate) fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

impl Messenger for CountingMessenger {
    fn request_redraw(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }
}
