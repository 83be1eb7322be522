//! This example loads sources and layers from a style document and toggles layer visibility.

use mapsync::{DesiredState, MapSurface, MemorySurface, SurfaceConfig, SyncSession};

const STYLE: &str = r##"{
    "sources": [
        {"id": "avalanche-paths", "type": "vector", "url": "mapbox://lcdesigns.arckuvnm"},
        {"id": "ski-lifts", "type": "vector", "url": "mapbox://lcdesigns.485yh7ox"},
        {
            "id": "weather-stations",
            "type": "geojson",
            "data": "https://opendata.arcgis.com/datasets/f325911db6d9499fb935494c01fc3f94_0.geojson"
        }
    ],
    "layers": [
        {
            "id": "avalanche-paths-fill",
            "type": "fill",
            "source": "avalanche-paths",
            "source-layer": "Utah_Avalanche_Paths-9s9ups",
            "paint": {"fill-opacity": 0.5, "fill-color": "#f05c5c"},
            "layout": {"visibility": "visible"}
        },
        {
            "id": "ski-lifts-line",
            "type": "line",
            "source": "ski-lifts",
            "source-layer": "SkiLifts",
            "paint": {"line-width": 2, "line-color": "#252526"},
            "layout": {"visibility": "visible"}
        },
        {
            "id": "weather-stations-circle",
            "type": "circle",
            "source": "weather-stations",
            "paint": {"circle-color": "#4094ae", "circle-radius": 4},
            "layout": {"visibility": "none"}
        }
    ],
    "camera": {"center": [-111.75, 40.581], "zoom": 11}
}"##;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = SurfaceConfig::from_json(
        r#"{"style": "mapbox://styles/mapbox/outdoors-v11", "center": [0, 0], "zoom": 2}"#,
    )?;
    let mut session = SyncSession::new(MemorySurface::new(config));

    let state = DesiredState::from_json(STYLE)?;
    session.submit(state.clone());
    session.surface_mut().load();
    session.on_ready()?;

    let state = state
        .set_visibility("weather-stations-circle", true)
        .set_visibility("avalanche-paths-fill", false);
    session.submit(state);
    session.flush()?;

    let surface = session.surface();
    for op in surface.journal() {
        println!("{op}");
    }

    let visible: Vec<_> = surface.layers().iter_visible().map(|l| l.id()).collect();
    println!("visible layers: {visible:?}");
    println!("camera: {:?}", surface.camera());

    session.teardown();

    Ok(())
}
