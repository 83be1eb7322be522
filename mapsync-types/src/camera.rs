//! See [`Camera`].

use serde::{Deserialize, Serialize};

use crate::LngLat;

/// Highest zoom level a camera can be set to.
pub const MAX_ZOOM: f64 = 24.0;
/// Highest pitch (tilt from the nadir) in degrees.
pub const MAX_PITCH: f64 = 85.0;

/// Camera position of a map surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Camera {
    /// Geographic point in the center of the viewport.
    pub center: LngLat,
    /// Zoom level.
    pub zoom: f64,
    /// Tilt of the camera in degrees, `0` looks straight down.
    pub pitch: f64,
    /// Rotation of the map in degrees clockwise from north.
    pub bearing: f64,
}

impl Camera {
    /// Creates a top-down, north-up camera.
    pub fn new(center: LngLat, zoom: f64) -> Self {
        Self {
            center,
            zoom,
            ..Default::default()
        }
    }

    /// Returns the camera with the given pitch.
    pub fn with_pitch(self, pitch: f64) -> Self {
        Self { pitch, ..self }
    }

    /// Returns the camera with the given bearing.
    pub fn with_bearing(self, bearing: f64) -> Self {
        Self { bearing, ..self }
    }

    /// Returns true if all camera parameters are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.center.is_finite()
            && self.zoom.is_finite()
            && self.pitch.is_finite()
            && self.bearing.is_finite()
    }

    /// Clamps zoom and pitch into their supported ranges and normalizes bearing into
    /// `(-180, 180]`.
    pub fn validated(&self) -> Self {
        Self {
            center: self.center,
            zoom: self.zoom.clamp(0.0, MAX_ZOOM),
            pitch: self.pitch.clamp(0.0, MAX_PITCH),
            bearing: normalize_bearing(self.bearing),
        }
    }
}

fn normalize_bearing(bearing: f64) -> f64 {
    let bearing = bearing % 360.0;
    if bearing <= -180.0 {
        bearing + 360.0
    } else if bearing > 180.0 {
        bearing - 360.0
    } else {
        bearing
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::lnglat;

    #[test]
    fn validated_clamps_and_normalizes() {
        let camera = Camera::new(lnglat!(-119.99, 38.61), 30.0)
            .with_pitch(120.0)
            .with_bearing(270.0)
            .validated();

        assert_relative_eq!(camera.zoom, MAX_ZOOM);
        assert_relative_eq!(camera.pitch, MAX_PITCH);
        assert_relative_eq!(camera.bearing, -90.0);
    }

    #[test]
    fn bearing_boundaries() {
        assert_relative_eq!(normalize_bearing(-180.0), 180.0);
        assert_relative_eq!(normalize_bearing(540.0), 180.0);
        assert_relative_eq!(normalize_bearing(-45.0), -45.0);
    }

    #[test]
    fn deserializes_from_style_camera() {
        let camera: Camera =
            serde_json::from_str(r#"{"center": [-111.75, 40.581], "zoom": 11, "pitch": 60}"#)
                .unwrap();

        assert_eq!(camera.center, lnglat!(-111.75, 40.581));
        assert_relative_eq!(camera.zoom, 11.0);
        assert_relative_eq!(camera.pitch, 60.0);
        assert_relative_eq!(camera.bearing, 0.0);
    }
}
