//! See [`SourceDescriptor`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DescriptorError;

/// Maximum `maxZoom` value accepted for tiled sources.
pub const MAX_SOURCE_ZOOM: u8 = 24;

/// Named data provider registered with a map surface.
///
/// A descriptor is validated when it is created (with one of the constructors or when decoded
/// from JSON), so any existing value has all fields required by its type.
///
/// ```
/// use mapsync_types::SourceDescriptor;
///
/// let dem = SourceDescriptor::from_json(r#"{
///     "id": "mapbox-dem",
///     "type": "raster-dem",
///     "url": "mapbox://mapbox.mapbox-terrain-dem-v1",
///     "tileSize": 512,
///     "maxZoom": 16
/// }"#).unwrap();
///
/// assert_eq!(dem.id(), "mapbox-dem");
/// assert_eq!(dem.kind().type_name(), "raster-dem");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSourceDescriptor", into = "RawSourceDescriptor")]
pub struct SourceDescriptor {
    id: String,
    kind: SourceKind,
}

/// Type of a source together with the fields specific to the type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SourceKind {
    /// Raw feature geometry.
    #[serde(rename = "geojson")]
    GeoJson {
        /// URL of the document or the document itself.
        data: GeoJsonData,
    },
    /// Vector tiles.
    Vector(TileEndpoint),
    /// Prerendered image tiles.
    Raster(TileEndpoint),
    /// Elevation tiles used for terrain and hillshading.
    RasterDem(TileEndpoint),
}

impl SourceKind {
    /// Value of the `type` tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            SourceKind::GeoJson { .. } => "geojson",
            SourceKind::Vector(_) => "vector",
            SourceKind::Raster(_) => "raster",
            SourceKind::RasterDem(_) => "raster-dem",
        }
    }

    /// Returns true for `raster-dem` sources.
    pub fn is_elevation(&self) -> bool {
        matches!(self, SourceKind::RasterDem(_))
    }
}

/// Payload of a GeoJSON source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeoJsonData {
    /// Document is fetched from the URL by the rendering engine.
    Url(String),
    /// Inline GeoJSON object.
    Inline(Value),
}

/// Connection and tiling parameters of a tiled source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileEndpoint {
    /// TileJSON URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Tile URL templates.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tiles: Vec<String>,
    /// Size of a tile in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_size: Option<u32>,
    /// Highest zoom level tiles are available for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_zoom: Option<u8>,
}

impl TileEndpoint {
    /// Endpoint described by a TileJSON URL.
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Endpoint described by tile URL templates.
    pub fn tiles(tiles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            tiles: tiles.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Sets tile size.
    pub fn with_tile_size(self, tile_size: u32) -> Self {
        Self {
            tile_size: Some(tile_size),
            ..self
        }
    }

    /// Sets max zoom.
    pub fn with_max_zoom(self, max_zoom: u8) -> Self {
        Self {
            max_zoom: Some(max_zoom),
            ..self
        }
    }

    fn validate(&self, id: &str, kind: &'static str) -> Result<(), DescriptorError> {
        let has_url = self.url.as_deref().is_some_and(|url| !url.is_empty());
        if !has_url && self.tiles.is_empty() {
            return Err(DescriptorError::MissingField {
                id: id.to_owned(),
                kind,
                requirement: "`url` or `tiles`",
            });
        }

        if let Some(tile_size) = self.tile_size {
            if !tile_size.is_power_of_two() {
                return Err(DescriptorError::InvalidTileSize {
                    id: id.to_owned(),
                    tile_size,
                });
            }
        }

        if let Some(max_zoom) = self.max_zoom {
            if max_zoom > MAX_SOURCE_ZOOM {
                return Err(DescriptorError::InvalidMaxZoom {
                    id: id.to_owned(),
                    max_zoom,
                    limit: MAX_SOURCE_ZOOM,
                });
            }
        }

        Ok(())
    }
}

impl SourceDescriptor {
    /// Creates a source, checking the fields required by its type.
    pub fn new(id: impl Into<String>, kind: SourceKind) -> Result<Self, DescriptorError> {
        let descriptor = Self {
            id: id.into(),
            kind,
        };
        descriptor.validate()?;

        Ok(descriptor)
    }

    /// GeoJSON source loaded by the rendering engine from `url`.
    pub fn geojson_url(
        id: impl Into<String>,
        url: impl Into<String>,
    ) -> Result<Self, DescriptorError> {
        Self::new(
            id,
            SourceKind::GeoJson {
                data: GeoJsonData::Url(url.into()),
            },
        )
    }

    /// GeoJSON source with inline data.
    pub fn geojson_inline(id: impl Into<String>, data: Value) -> Result<Self, DescriptorError> {
        Self::new(
            id,
            SourceKind::GeoJson {
                data: GeoJsonData::Inline(data),
            },
        )
    }

    /// Decodes a source from its JSON form, e.g.
    /// `{"id": "ski-lifts", "type": "geojson", "data": "https://..."}`.
    pub fn from_json(json: &str) -> Result<Self, DescriptorError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Unique identifier of the source.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Type of the source.
    pub fn kind(&self) -> &SourceKind {
        &self.kind
    }

    /// Checks that all fields required by the source type are present and in range.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.id.is_empty() {
            return Err(DescriptorError::EmptyId);
        }

        match &self.kind {
            SourceKind::GeoJson { data } => match data {
                GeoJsonData::Url(url) if url.is_empty() => Err(DescriptorError::MissingField {
                    id: self.id.clone(),
                    kind: "geojson",
                    requirement: "`data`",
                }),
                GeoJsonData::Url(_) => Ok(()),
                GeoJsonData::Inline(value) => {
                    if value.get("type").is_some_and(Value::is_string) {
                        Ok(())
                    } else {
                        Err(DescriptorError::InvalidGeoJson {
                            id: self.id.clone(),
                        })
                    }
                }
            },
            SourceKind::Vector(endpoint)
            | SourceKind::Raster(endpoint)
            | SourceKind::RasterDem(endpoint) => endpoint.validate(&self.id, self.kind.type_name()),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
struct RawSourceDescriptor {
    id: String,
    #[serde(flatten)]
    kind: SourceKind,
}

impl TryFrom<RawSourceDescriptor> for SourceDescriptor {
    type Error = DescriptorError;

    fn try_from(value: RawSourceDescriptor) -> Result<Self, Self::Error> {
        Self::new(value.id, value.kind)
    }
}

impl From<SourceDescriptor> for RawSourceDescriptor {
    fn from(value: SourceDescriptor) -> Self {
        Self {
            id: value.id,
            kind: value.kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_geojson_url_source() {
        let source = SourceDescriptor::from_json(
            r#"{"id": "ski-lifts", "type": "geojson", "data": "https://example.com/lifts.geojson"}"#,
        )
        .unwrap();

        assert_eq!(source.id(), "ski-lifts");
        assert_matches!(
            source.kind(),
            SourceKind::GeoJson { data: GeoJsonData::Url(url) } if url == "https://example.com/lifts.geojson"
        );
    }

    #[test]
    fn decodes_inline_geojson_source() {
        let source = SourceDescriptor::from_json(
            r#"{"id": "s1", "type": "geojson", "data": {"type": "FeatureCollection", "features": []}}"#,
        )
        .unwrap();

        assert_matches!(
            source.kind(),
            SourceKind::GeoJson {
                data: GeoJsonData::Inline(_)
            }
        );
    }

    #[test]
    fn serializes_with_type_tag() {
        let source = SourceDescriptor::new(
            "dem",
            SourceKind::RasterDem(
                TileEndpoint::url("mapbox://mapbox.mapbox-terrain-dem-v1")
                    .with_tile_size(512)
                    .with_max_zoom(16),
            ),
        )
        .unwrap();

        assert_eq!(
            serde_json::to_value(&source).unwrap(),
            json!({
                "id": "dem",
                "type": "raster-dem",
                "url": "mapbox://mapbox.mapbox-terrain-dem-v1",
                "tileSize": 512,
                "maxZoom": 16
            })
        );
    }

    #[test]
    fn rejects_invalid_descriptors() {
        assert_matches!(
            SourceDescriptor::new("", SourceKind::Vector(TileEndpoint::url("mapbox://x"))),
            Err(DescriptorError::EmptyId)
        );
        assert_matches!(
            SourceDescriptor::new("v", SourceKind::Vector(TileEndpoint::default())),
            Err(DescriptorError::MissingField { kind: "vector", .. })
        );
        assert_matches!(
            SourceDescriptor::new(
                "r",
                SourceKind::Raster(TileEndpoint::tiles(["https://t/{z}/{x}/{y}.png"]).with_tile_size(300))
            ),
            Err(DescriptorError::InvalidTileSize { tile_size: 300, .. })
        );
        assert_matches!(
            SourceDescriptor::geojson_inline("g", json!([1, 2])),
            Err(DescriptorError::InvalidGeoJson { .. })
        );
        assert_matches!(
            SourceDescriptor::from_json(r#"{"id": "d", "type": "raster-dem", "url": "u", "maxZoom": 30}"#),
            Err(DescriptorError::Malformed(_))
        );
        assert_matches!(
            SourceDescriptor::from_json(r#"{"id": "x", "type": "video"}"#),
            Err(DescriptorError::Malformed(_))
        );
    }
}
