//! This example shows how filter widgets narrow down the features a layer draws.
//!
//! Selecting a value in a widget produces a new desired state, and the session applies only the
//! changed filter to the surface.

use mapsync::mapsync_types::{LayerDescriptor, LayerKind, SourceDescriptor};
use mapsync::{
    DesiredState, DesiredStateStore, FilterControl, MemorySurface, SurfaceConfig, SyncSession,
};
use serde_json::json;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = SurfaceConfig::builder()
        .with_style("mapbox://styles/mapbox/outdoors-v11")
        .with_lnglat(-111.65, 40.581)
        .with_zoom(12.0)
        .with_access_token(std::env::var("MAPBOX_TOKEN").unwrap_or_default())
        .build()?;

    let store = DesiredStateStore::new(initial_state()?);
    let mut session = SyncSession::new(MemorySurface::new(config));

    session.submit(store.snapshot());
    session.surface_mut().load();
    session.on_ready()?;

    for value in ["Alta Ski Area", "Brighton Ski Resort", "Alta Ski Area"] {
        let snapshot = store.update(|state| state.toggle_filter_value("ski-lifts-line", value));
        session.submit(snapshot);
        if let Some(report) = session.flush()? {
            for op in &report.applied {
                println!("{op}");
            }
        }
    }

    let snapshot = store.update(|state| {
        state.set_filter_value("avalanche-paths-fill", "RETURN_INTERVAL", ["FREQUENT"])
    });
    session.submit(snapshot);
    session.flush()?;

    for control in store.snapshot().filter_controls() {
        let selected: Vec<_> = control
            .options
            .iter()
            .filter(|option| control.is_selected(&option.value))
            .map(|option| option.label.as_str())
            .collect();
        println!("{}: {selected:?}", control.title);
    }

    Ok(())
}

fn initial_state() -> anyhow::Result<DesiredState> {
    let sources = [
        SourceDescriptor::geojson_url(
            "avalanche-paths",
            "https://opendata.arcgis.com/datasets/0df199cef1704e5287ae675ee3dbd3bd_0.geojson",
        )?,
        SourceDescriptor::geojson_url(
            "ski-lifts",
            "https://opendata.arcgis.com/datasets/51d8a963411d4356ab3fa7a24146d203_0.geojson",
        )?,
    ];

    let layers = [
        LayerDescriptor::new("avalanche-paths-fill", LayerKind::Fill, "avalanche-paths")?
            .with_paint("fill-opacity", json!(0.5))
            .with_paint("fill-color", json!("#f05c5c")),
        LayerDescriptor::new("ski-lifts-line", LayerKind::Line, "ski-lifts")?
            .with_paint("line-color", json!("#403965"))
            .with_paint("line-width", json!(2.5)),
    ];

    Ok(DesiredState::default()
        .set_sources(sources)
        .set_layers(layers)
        .add_filter_control(
            FilterControl::new("ski-lifts-line", "RESORT", "Ski Resort")
                .with_option("Snowbird Ski and Summer Resort", "Snowbird Ski and Summer Resort")
                .with_option("Alta Ski Area", "Alta Ski Area")
                .with_option("Solitude Mountain Resort", "Solitude Mountain Resort")
                .with_option("Brighton Ski Resort", "Brighton Ski Resort"),
        )
        .add_filter_control(
            FilterControl::new("avalanche-paths-fill", "RETURN_INTERVAL", "Avalanche Frequency")
                .with_option("INFREQUENT", "Infrequent")
                .with_option("OCCASIONAL", "Occasional")
                .with_option("OCCASIONAL TO FREQUENT", "Occasional to Frequent")
                .with_option("FREQUENT", "Frequent"),
        ))
}
