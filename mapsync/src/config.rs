//! Construction parameters of a map surface.

use mapsync_types::{Camera, LngLat};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Base style used when none is set.
pub const DEFAULT_STYLE: &str = "mapbox://styles/mapbox/outdoors-v11";
/// Zoom level used when none is set.
pub const DEFAULT_ZOOM: f64 = 12.0;

/// What a surface does with camera changes requested before it is ready.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreReadyCamera {
    /// Changes are kept in order and applied when the surface becomes ready.
    #[default]
    Queue,
    /// Changes are discarded.
    Drop,
}

/// Parameters a map surface is created with.
///
/// The access token of the map service is a part of the configuration, so two surfaces in one
/// process can use different accounts.
///
/// The JSON form is flat, the same as the options object of web map engines:
///
/// ```
/// use mapsync::SurfaceConfig;
///
/// let config = SurfaceConfig::from_json(r#"{
///     "style": "mapbox://styles/mapbox/satellite-streets-v11",
///     "center": [-119.99959421984575, 38.619551620333496],
///     "zoom": 14,
///     "pitch": 60
/// }"#).unwrap();
///
/// assert_eq!(config.camera.pitch, 60.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceConfig {
    /// URL of the base style.
    pub style: String,
    /// Access token of the map service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Initial camera.
    #[serde(flatten)]
    pub camera: Camera,
    /// Handling of camera changes before the ready signal.
    #[serde(default)]
    pub pre_ready_camera: PreReadyCamera,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            style: DEFAULT_STYLE.to_owned(),
            access_token: None,
            camera: Camera::new(LngLat::default(), DEFAULT_ZOOM),
            pre_ready_camera: PreReadyCamera::default(),
        }
    }
}

impl SurfaceConfig {
    /// Creates a builder with default values.
    pub fn builder() -> SurfaceConfigBuilder {
        SurfaceConfigBuilder::default()
    }

    /// Decodes and checks a configuration.
    pub fn from_json(json: &str) -> Result<Self, SyncError> {
        let config: SurfaceConfig = serde_json::from_str(json)?;
        config.check()
    }

    fn check(self) -> Result<Self, SyncError> {
        if self.style.is_empty() {
            return Err(SyncError::Configuration(
                "style url must not be empty".into(),
            ));
        }

        if !self.camera.is_finite() {
            return Err(SyncError::Configuration(
                "camera parameters must be finite numbers".into(),
            ));
        }

        Ok(Self {
            camera: self.camera.validated(),
            ..self
        })
    }
}

/// Convenience type to create a [`SurfaceConfig`].
///
/// ```
/// use mapsync::SurfaceConfigBuilder;
///
/// let config = SurfaceConfigBuilder::default()
///     .with_lnglat(-111.65, 40.581)
///     .with_zoom(12.0)
///     .with_access_token("pk.token")
///     .build()
///     .unwrap();
///
/// assert_eq!(config.camera.zoom, 12.0);
/// ```
#[derive(Debug, Default)]
pub struct SurfaceConfigBuilder {
    style: Option<String>,
    access_token: Option<String>,
    center: Option<LngLat>,
    zoom: Option<f64>,
    pitch: Option<f64>,
    bearing: Option<f64>,
    pre_ready_camera: Option<PreReadyCamera>,
}

impl SurfaceConfigBuilder {
    /// Sets the base style URL.
    ///
    /// Defaults to [`DEFAULT_STYLE`].
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Sets the access token of the map service.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Sets the initial center of the map.
    ///
    /// Defaults to `[0, 0]`.
    pub fn with_center(mut self, center: LngLat) -> Self {
        self.center = Some(center);
        self
    }

    /// Sets the initial center of the map from longitude and latitude.
    pub fn with_lnglat(self, lng: f64, lat: f64) -> Self {
        self.with_center(LngLat::new(lng, lat))
    }

    /// Sets the initial zoom level.
    ///
    /// Defaults to [`DEFAULT_ZOOM`].
    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = Some(zoom);
        self
    }

    /// Sets the initial pitch in degrees.
    pub fn with_pitch(mut self, pitch: f64) -> Self {
        self.pitch = Some(pitch);
        self
    }

    /// Sets the initial bearing in degrees.
    pub fn with_bearing(mut self, bearing: f64) -> Self {
        self.bearing = Some(bearing);
        self
    }

    /// Sets the handling of camera changes requested before the surface is ready.
    ///
    /// Defaults to [`PreReadyCamera::Queue`].
    pub fn with_pre_ready_camera(mut self, policy: PreReadyCamera) -> Self {
        self.pre_ready_camera = Some(policy);
        self
    }

    /// Consumes the builder and creates the configuration.
    ///
    /// Fails if the style URL is empty or any camera value is not finite. Zoom and pitch are
    /// clamped into their ranges.
    pub fn build(self) -> Result<SurfaceConfig, SyncError> {
        let camera = Camera {
            center: self.center.unwrap_or_default(),
            zoom: self.zoom.unwrap_or(DEFAULT_ZOOM),
            pitch: self.pitch.unwrap_or_default(),
            bearing: self.bearing.unwrap_or_default(),
        };

        SurfaceConfig {
            style: self.style.unwrap_or_else(|| DEFAULT_STYLE.to_owned()),
            access_token: self.access_token,
            camera,
            pre_ready_camera: self.pre_ready_camera.unwrap_or_default(),
        }
        .check()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use insta::assert_compact_debug_snapshot;
    use mapsync_types::lnglat;

    use super::*;

    #[test]
    fn builder_defaults() {
        let config = SurfaceConfigBuilder::default().build().unwrap();

        assert_eq!(config.style, DEFAULT_STYLE);
        assert_eq!(config.camera.center, lnglat!(0.0, 0.0));
        assert_relative_eq!(config.camera.zoom, DEFAULT_ZOOM);
        assert_eq!(config.pre_ready_camera, PreReadyCamera::Queue);
        assert!(config.access_token.is_none());
    }

    #[test]
    fn build_clamps_camera() {
        let config = SurfaceConfig::builder()
            .with_zoom(40.0)
            .with_pitch(90.0)
            .with_bearing(-200.0)
            .build()
            .unwrap();

        assert_relative_eq!(config.camera.zoom, 24.0);
        assert_relative_eq!(config.camera.pitch, 85.0);
        assert_relative_eq!(config.camera.bearing, 160.0);
    }

    #[test]
    fn build_fails_with_empty_style() {
        let result = SurfaceConfig::builder().with_style("").build();

        assert_compact_debug_snapshot!(result, @r#"Err(Configuration("style url must not be empty"))"#);
    }

    #[test]
    fn build_fails_with_nan_zoom() {
        let result = SurfaceConfig::builder().with_zoom(f64::NAN).build();

        assert_compact_debug_snapshot!(result, @r#"Err(Configuration("camera parameters must be finite numbers"))"#);
    }

    #[test]
    fn decodes_flat_json() {
        let config = SurfaceConfig::from_json(
            r#"{
                "style": "mapbox://styles/mapbox/outdoors-v11",
                "accessToken": "pk.test",
                "center": [-111.75, 40.581],
                "zoom": 11,
                "preReadyCamera": "drop"
            }"#,
        )
        .unwrap();

        assert_eq!(config.access_token.as_deref(), Some("pk.test"));
        assert_eq!(config.camera.center, lnglat!(-111.75, 40.581));
        assert_relative_eq!(config.camera.zoom, 11.0);
        assert_eq!(config.pre_ready_camera, PreReadyCamera::Drop);
    }

    #[test]
    fn from_json_reports_decode_errors() {
        let result = SurfaceConfig::from_json(r#"{"center": [0, 0]}"#);

        assert!(matches!(result, Err(SyncError::Json(_))));
    }
}
