//! This example enables 3D terrain from an elevation source and adds an atmosphere sky layer.

use mapsync::mapsync_types::{LayerDescriptor, SourceDescriptor, SourceKind, Terrain, TileEndpoint};
use mapsync::{DesiredState, MemorySurface, SurfaceConfig, SyncSession};
use serde_json::json;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = SurfaceConfig::builder()
        .with_style("mapbox://styles/mapbox/satellite-streets-v11")
        .with_lnglat(-119.99959421984575, 38.619551620333496)
        .with_zoom(14.0)
        .with_pitch(60.0)
        .build()?;
    let mut session = SyncSession::new(MemorySurface::new(config));

    let dem = SourceDescriptor::new(
        "mapbox-dem",
        SourceKind::RasterDem(
            TileEndpoint::url("mapbox://mapbox.mapbox-terrain-dem-v1")
                .with_tile_size(512)
                .with_max_zoom(16),
        ),
    )?;
    let sky = LayerDescriptor::sky("sky")?
        .with_paint("sky-type", json!("atmosphere"))
        .with_paint("sky-atmosphere-sun", json!([0.0, 90.0]))
        .with_paint("sky-atmosphere-sun-intensity", json!(15));

    let state = DesiredState::default()
        .set_sources([dem])
        .set_layers([sky])
        .set_terrain(Some(Terrain::new("mapbox-dem").with_exaggeration(1.5)));

    session.submit(state.clone());
    session.surface_mut().load();
    let report = session.on_ready()?.unwrap_or_default();
    for op in &report.applied {
        println!("{op}");
    }

    let ops = session
        .reconciler()
        .plan(&state.set_terrain(None), session.surface())?;
    println!("disabling terrain would take {} operation(s)", ops.len());

    Ok(())
}
