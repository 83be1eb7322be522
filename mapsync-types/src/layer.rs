//! See [`LayerDescriptor`].

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DescriptorError;
use crate::filter::FilterExpression;

/// Paint or layout properties of a layer, ordered by name.
pub type PropertyMap = BTreeMap<String, Value>;

const VISIBILITY_PROPERTY: &str = "visibility";

/// Rendering type of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerKind {
    /// Filled polygons.
    Fill,
    /// Stroked lines.
    Line,
    /// Circles at point features.
    Circle,
    /// Icons and text labels.
    Symbol,
    /// Raster tiles.
    Raster,
    /// Elevation shading from a `raster-dem` source.
    Hillshade,
    /// Sky and atmosphere around a pitched map. Does not use a source.
    Sky,
}

impl LayerKind {
    /// Value of the `type` tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Fill => "fill",
            LayerKind::Line => "line",
            LayerKind::Circle => "circle",
            LayerKind::Symbol => "symbol",
            LayerKind::Raster => "raster",
            LayerKind::Hillshade => "hillshade",
            LayerKind::Sky => "sky",
        }
    }

    /// Returns false for layer types that draw without a source.
    pub fn requires_source(&self) -> bool {
        !matches!(self, LayerKind::Sky)
    }
}

impl Display for LayerKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a layer is drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Layer is drawn.
    #[default]
    Visible,
    /// Layer keeps its place in the stack but is not drawn.
    None,
}

impl Visibility {
    /// Returns true for [`Visibility::Visible`].
    pub fn is_visible(&self) -> bool {
        matches!(self, Visibility::Visible)
    }
}

impl From<bool> for Visibility {
    fn from(visible: bool) -> Self {
        if visible {
            Visibility::Visible
        } else {
            Visibility::None
        }
    }
}

/// Named rendering rule that draws features from one source.
///
/// In JSON form the visibility is stored as the `visibility` layout property. In this type it is
/// a separate typed field, and the `layout` map never contains it.
///
/// ```
/// use mapsync_types::{FilterExpression, LayerDescriptor, LayerKind, Visibility};
/// use serde_json::json;
///
/// let layer = LayerDescriptor::new("ski-lifts-line", LayerKind::Line, "ski-lifts")
///     .unwrap()
///     .with_paint("line-color", json!("#403965"))
///     .with_filter(FilterExpression::matching("RESORT", ["Alta Ski Area"]))
///     .with_visibility(Visibility::None);
///
/// assert_eq!(layer.source(), Some("ski-lifts"));
/// assert!(!layer.visibility().is_visible());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLayerDescriptor", into = "RawLayerDescriptor")]
pub struct LayerDescriptor {
    id: String,
    kind: LayerKind,
    source: Option<String>,
    source_layer: Option<String>,
    paint: PropertyMap,
    layout: PropertyMap,
    filter: Option<FilterExpression>,
    visibility: Visibility,
}

impl LayerDescriptor {
    /// Creates a visible layer without filter drawing features from `source`.
    pub fn new(
        id: impl Into<String>,
        kind: LayerKind,
        source: impl Into<String>,
    ) -> Result<Self, DescriptorError> {
        Self::with_parts(id.into(), kind, Some(source.into()))
    }

    /// Creates a sky layer.
    pub fn sky(id: impl Into<String>) -> Result<Self, DescriptorError> {
        Self::with_parts(id.into(), LayerKind::Sky, None)
    }

    fn with_parts(
        id: String,
        kind: LayerKind,
        source: Option<String>,
    ) -> Result<Self, DescriptorError> {
        if id.is_empty() {
            return Err(DescriptorError::EmptyId);
        }

        let has_source = source.as_deref().is_some_and(|source| !source.is_empty());
        if kind.requires_source() && !has_source {
            return Err(DescriptorError::MissingSource {
                id,
                kind: kind.as_str(),
            });
        }

        if !kind.requires_source() && source.is_some() {
            return Err(DescriptorError::UnexpectedSource {
                id,
                kind: kind.as_str(),
            });
        }

        Ok(Self {
            id,
            kind,
            source,
            source_layer: None,
            paint: PropertyMap::new(),
            layout: PropertyMap::new(),
            filter: None,
            visibility: Visibility::Visible,
        })
    }

    /// Decodes a layer from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, DescriptorError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets a paint property.
    pub fn with_paint(mut self, name: impl Into<String>, value: Value) -> Self {
        self.paint.insert(name.into(), value);
        self
    }

    /// Sets a layout property. Setting `visibility` changes [`LayerDescriptor::visibility`].
    pub fn with_layout(mut self, name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        if name == VISIBILITY_PROPERTY {
            if let Some(visibility) = parse_visibility(&value) {
                self.visibility = visibility;
            }
        } else {
            self.layout.insert(name, value);
        }

        self
    }

    /// Sets or clears the filter.
    pub fn with_filter(mut self, filter: impl Into<Option<FilterExpression>>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Sets the visibility.
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Sets the layer of a vector source the features are taken from.
    pub fn with_source_layer(mut self, source_layer: impl Into<String>) -> Self {
        self.source_layer = Some(source_layer.into());
        self
    }

    /// Unique identifier of the layer.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Rendering type.
    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    /// Id of the source the layer draws from.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Layer of a vector source.
    pub fn source_layer(&self) -> Option<&str> {
        self.source_layer.as_deref()
    }

    /// Paint properties.
    pub fn paint(&self) -> &PropertyMap {
        &self.paint
    }

    /// Layout properties, without `visibility`.
    pub fn layout(&self) -> &PropertyMap {
        &self.layout
    }

    /// Filter expression. `None` means all features are drawn.
    pub fn filter(&self) -> Option<&FilterExpression> {
        self.filter.as_ref()
    }

    /// Visibility of the layer.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }
}

fn parse_visibility(value: &Value) -> Option<Visibility> {
    match value.as_str() {
        Some("visible") => Some(Visibility::Visible),
        Some("none") => Some(Visibility::None),
        _ => None,
    }
}

#[derive(Serialize, Deserialize)]
struct RawLayerDescriptor {
    id: String,
    #[serde(rename = "type")]
    kind: LayerKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(
        rename = "source-layer",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    source_layer: Option<String>,
    #[serde(default, skip_serializing_if = "PropertyMap::is_empty")]
    paint: PropertyMap,
    #[serde(default, skip_serializing_if = "PropertyMap::is_empty")]
    layout: PropertyMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filter: Option<FilterExpression>,
}

impl TryFrom<RawLayerDescriptor> for LayerDescriptor {
    type Error = DescriptorError;

    fn try_from(value: RawLayerDescriptor) -> Result<Self, Self::Error> {
        let RawLayerDescriptor {
            id,
            kind,
            source,
            source_layer,
            paint,
            mut layout,
            filter,
        } = value;

        let visibility = match layout.remove(VISIBILITY_PROPERTY) {
            None => Visibility::Visible,
            Some(value) => {
                parse_visibility(&value).ok_or_else(|| DescriptorError::InvalidLayout {
                    id: id.clone(),
                    property: VISIBILITY_PROPERTY.to_owned(),
                })?
            }
        };

        let mut descriptor = Self::with_parts(id, kind, source)?;
        descriptor.source_layer = source_layer;
        descriptor.paint = paint;
        descriptor.layout = layout;
        descriptor.filter = filter;
        descriptor.visibility = visibility;

        Ok(descriptor)
    }
}

impl From<LayerDescriptor> for RawLayerDescriptor {
    fn from(value: LayerDescriptor) -> Self {
        let mut layout = value.layout;
        if value.visibility == Visibility::None {
            layout.insert(VISIBILITY_PROPERTY.to_owned(), Value::from("none"));
        }

        Self {
            id: value.id,
            kind: value.kind,
            source: value.source,
            source_layer: value.source_layer,
            paint: value.paint,
            layout,
            filter: value.filter,
        }
    }
}
