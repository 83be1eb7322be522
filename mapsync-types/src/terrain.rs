use serde::{Deserialize, Serialize};

fn default_exaggeration() -> f64 {
    1.0
}

/// 3D terrain settings. The terrain takes its elevation from a `raster-dem` source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terrain {
    /// Id of the elevation source.
    pub source: String,
    /// Vertical scale applied to the elevation values.
    #[serde(default = "default_exaggeration")]
    pub exaggeration: f64,
}

impl Terrain {
    /// Terrain from the given source with no exaggeration.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            exaggeration: default_exaggeration(),
        }
    }

    /// Returns the terrain with the given exaggeration.
    pub fn with_exaggeration(self, exaggeration: f64) -> Self {
        Self {
            exaggeration,
            ..self
        }
    }
}
