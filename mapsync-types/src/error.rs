//! Error type used by the crate.

use thiserror::Error;

/// Reasons a source, layer or filter descriptor is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// Sources and layers must have a non-empty identifier.
    #[error("descriptor id must not be empty")]
    EmptyId,
    /// A field required by the descriptor type is missing.
    #[error("source `{id}` of type {kind} requires {requirement}")]
    MissingField {
        /// Id of the source.
        id: String,
        /// Type tag of the source.
        kind: &'static str,
        /// Human readable name of the missing field(s).
        requirement: &'static str,
    },
    /// Tile size is not a positive power of two.
    #[error("source `{id}` has invalid tile size {tile_size}")]
    InvalidTileSize {
        /// Id of the source.
        id: String,
        /// Rejected tile size.
        tile_size: u32,
    },
    /// Max zoom is above the supported limit.
    #[error("source `{id}` has max zoom {max_zoom}, the limit is {limit}")]
    InvalidMaxZoom {
        /// Id of the source.
        id: String,
        /// Rejected max zoom.
        max_zoom: u8,
        /// Maximum supported zoom level.
        limit: u8,
    },
    /// Inline GeoJSON payload is not a GeoJSON object.
    #[error("inline geojson of source `{id}` must be an object with a `type` member")]
    InvalidGeoJson {
        /// Id of the source.
        id: String,
    },
    /// Layer type draws features but no source was given.
    #[error("layer `{id}` of type {kind} requires a source")]
    MissingSource {
        /// Id of the layer.
        id: String,
        /// Type tag of the layer.
        kind: &'static str,
    },
    /// Layer type does not draw features but a source was given.
    #[error("layer `{id}` of type {kind} cannot reference a source")]
    UnexpectedSource {
        /// Id of the layer.
        id: String,
        /// Type tag of the layer.
        kind: &'static str,
    },
    /// Layer reads a `source-layer` from a source that has no layers.
    #[error("layer `{id}` sets `source-layer`, but source `{source_id}` is not a vector source")]
    UnexpectedSourceLayer {
        /// Id of the layer.
        id: String,
        /// Id of the referenced source.
        source_id: String,
    },
    /// Terrain references a source that does not provide elevation.
    #[error("source `{id}` is not a raster-dem source and cannot be used for terrain")]
    NotElevation {
        /// Id of the source.
        id: String,
    },
    /// Layout property has a value the layer model does not understand.
    #[error("layer `{id}` has invalid layout value for `{property}`")]
    InvalidLayout {
        /// Id of the layer.
        id: String,
        /// Name of the layout property.
        property: String,
    },
    /// Filter expression cannot be parsed.
    #[error("malformed filter expression: {0}")]
    Filter(String),
    /// Descriptor JSON cannot be decoded.
    #[error("malformed descriptor: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for DescriptorError {
    fn from(value: serde_json::Error) -> Self {
        Self::Malformed(value.to_string())
    }
}
